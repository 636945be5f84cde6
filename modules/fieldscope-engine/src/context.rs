use std::sync::Arc;

use fieldscope_lens::LensContract;

/// Frozen, shareable context for one request. Safe to clone and hand to
/// every concurrently-spawned adapter task — nothing in here is mutated
/// after construction. Distinct from `OrchestratorState`, which is owned
/// exclusively by the orchestrator and never shared.
#[derive(Clone)]
pub struct ExecutionContext {
    pub lens_id: String,
    pub lens_contract: Arc<LensContract>,
    pub lens_hash: String,
}

impl ExecutionContext {
    pub fn new(lens_contract: LensContract) -> Self {
        let lens_id = lens_contract.lens_id.clone();
        let lens_hash = lens_contract.lens_hash.clone();
        Self {
            lens_id,
            lens_contract: Arc::new(lens_contract),
            lens_hash,
        }
    }
}
