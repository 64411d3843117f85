//! # Audit Chain
//!
//! An in-memory, tamper-evident ledger of executive actions:
//! - **Records**: signed executive-action facts, queued on submission
//! - **Blocks**: FIFO batches sealed by cooperative proof-of-work
//! - **Verification**: full-chain re-hashing that reports every defect
//! - **Snapshots**: JSON export/import with atomic swap-or-reject
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use audit_chain::ledger::{AuditAction, AuditChain, ChainConfig, Executive};
//!
//! #[tokio::main]
//! async fn main() {
//!     let chain = AuditChain::new(ChainConfig::default()).unwrap();
//!     let ceo = Executive::new("exec-1", "Ada Chief");
//!     let action = AuditAction::new("approve_budget", "FY budget").with_value(1.2e6);
//!
//!     let id = chain.add_audit_record(&ceo, &action, None);
//!     chain.flush().await;
//!
//!     println!("{} sealed: {:?}", id, chain.get_record_status(&id));
//!     assert!(chain.verify_chain().is_valid);
//! }
//! ```

pub mod core;
pub mod ledger;

pub use crate::core::error::{Error, Result};
pub use crate::core::logging::init_tracing;
