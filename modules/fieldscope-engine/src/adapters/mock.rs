// In-memory adapters for deterministic tests: no network, no database.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{ContentAdapter, RawBatch, RawItem};

/// Returns a fixed batch of raw items after an optional delay, useful for
/// asserting phase-barrier ordering.
pub struct FixedAdapter {
    name: String,
    items: Vec<RawItem>,
    delay: Duration,
    calls: AtomicUsize,
}

impl FixedAdapter {
    pub fn new(name: impl Into<String>, items: Vec<RawItem>) -> Self {
        Self {
            name: name.into(),
            items,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentAdapter for FixedAdapter {
    fn source_name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, _query: &str) -> anyhow::Result<RawBatch> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(RawBatch {
            results: self.items.clone(),
            ..RawBatch::default()
        })
    }
}

/// Always fails, for exercising non-fatal adapter-exception handling.
pub struct FailingAdapter {
    name: String,
}

impl FailingAdapter {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl ContentAdapter for FailingAdapter {
    fn source_name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, _query: &str) -> anyhow::Result<RawBatch> {
        anyhow::bail!("{} is unreachable", self.name)
    }
}

/// Never completes within any reasonable per-call timeout, for exercising
/// timeout handling.
pub struct HangingAdapter {
    name: String,
}

impl HangingAdapter {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl ContentAdapter for HangingAdapter {
    fn source_name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, _query: &str) -> anyhow::Result<RawBatch> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(RawBatch::default())
    }
}
