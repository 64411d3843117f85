//! Proof-of-work search.
//!
//! The search yields to a [`Scheduler`] between nonce attempts so it never
//! monopolizes the runtime, and gives up after a configurable number of
//! attempts.

use crate::core::{Error, Result};
use crate::ledger::block::AuditBlock;
use crate::ledger::config::ChainConfig;
use crate::ledger::scheduler::Scheduler;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Cooperative nonce searcher.
#[derive(Clone)]
pub struct Miner {
    difficulty: usize,
    max_attempts: Option<u64>,
    yield_every: u64,
    scheduler: Arc<dyn Scheduler>,
}

impl Miner {
    pub fn new(config: &ChainConfig, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            difficulty: config.difficulty,
            max_attempts: config.max_nonce_attempts,
            yield_every: config.yield_every.max(1),
            scheduler,
        }
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    /// Search for a nonce whose hash meets the difficulty.
    ///
    /// Starts from the candidate's current nonce. `cancel` is checked at
    /// every yield point; once set, the search stops with
    /// [`Error::MiningAborted`].
    pub async fn seal(&self, mut candidate: AuditBlock, cancel: &AtomicBool) -> Result<AuditBlock> {
        let data = candidate.canonical_data()?;
        let mut nonce = candidate.nonce;
        let mut attempts: u64 = 0;

        loop {
            let hash = candidate.hash_with(&data, nonce);
            attempts += 1;

            if hash.meets_difficulty(self.difficulty) {
                debug!(
                    index = candidate.index,
                    nonce,
                    attempts,
                    hash = %hash,
                    "Proof-of-work found"
                );
                candidate.nonce = nonce;
                candidate.hash = hash;
                return Ok(candidate);
            }

            if self.max_attempts.is_some_and(|max| attempts >= max) {
                return Err(Error::MiningExhausted {
                    attempts,
                    difficulty: self.difficulty,
                });
            }

            nonce = nonce
                .checked_add(1)
                .ok_or_else(|| Error::Internal("nonce space exhausted".into()))?;

            if attempts % self.yield_every == 0 {
                self.scheduler.yield_now().await;
                if cancel.load(Ordering::Acquire) {
                    return Err(Error::MiningAborted);
                }
            }
        }
    }
}
