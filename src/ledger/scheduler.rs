//! Cooperative yield points for the proof-of-work search.

use async_trait::async_trait;

/// Hands control back to the host runtime between units of work.
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Suspend the current task so other ready work can run.
    async fn yield_now(&self);
}

/// Scheduler backed by `tokio::task::yield_now`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioScheduler;

#[async_trait]
impl Scheduler for TokioScheduler {
    async fn yield_now(&self) {
        tokio::task::yield_now().await;
    }
}
