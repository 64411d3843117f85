//! Executive audit ledger
//!
//! Append-only, hash-linked chain of executive-action records:
//! - Records are queued on submission and sealed in FIFO batches
//! - Blocks are sealed by a cooperative, bounded proof-of-work search
//! - The whole chain can be re-verified for tamper detection at any time
//! - Snapshots can be exported, imported and saved to a store

pub mod block;
pub mod chain;
pub mod config;
pub mod miner;
pub mod query;
pub mod queue;
pub mod record;
pub mod scheduler;
pub mod service;
pub mod snapshot;
pub mod verify;

pub use block::{AuditBlock, BlockContext, BlockData};
pub use chain::ChainStore;
pub use config::ChainConfig;
pub use query::{ChainStats, VerificationStatusCounts};
pub use record::{AuditAction, AuditRecord, Executive, RecordId, RiskLevel, VerificationStatus};
pub use scheduler::{Scheduler, TokioScheduler};
pub use service::{AuditChain, AuditChainBuilder};
pub use snapshot::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore};
pub use verify::{ChainDefect, ChainVerification};
