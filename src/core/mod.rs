//! Core utilities and common types for the audit chain.

pub mod error;
pub mod hash;
pub mod logging;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
