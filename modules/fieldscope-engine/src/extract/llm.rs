// The minimal opaque boundary for text-only extraction. Kept deliberately
// thin: this crate's job is to cross the boundary and whitelist-filter what
// comes back, not to own a model client. A real implementation backs onto
// whatever provider the deployment wires up; tests and lens-absent runs use
// `NullLlmExtractor`.

use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait LlmExtractor: Send + Sync {
    /// Attempt to pull schema primitives out of one raw, unstructured
    /// payload. Implementations may return any JSON object; the caller
    /// whitelist-filters the result, so over-generation is harmless, not a
    /// contract violation.
    async fn extract(&self, raw: &Value) -> anyhow::Result<Value>;
}

/// Always returns an empty object. Used where no extraction provider is
/// configured; unstructured candidates fall back to their adapter-mapped
/// baseline fields only.
pub struct NullLlmExtractor;

#[async_trait]
impl LlmExtractor for NullLlmExtractor {
    async fn extract(&self, _raw: &Value) -> anyhow::Result<Value> {
        Ok(Value::Object(serde_json::Map::new()))
    }
}
