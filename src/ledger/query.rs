//! Read-only queries over committed blocks.
//!
//! Every query scans all blocks; no index is maintained.

use crate::core::Timestamp;
use crate::ledger::block::AuditBlock;
use crate::ledger::record::{AuditRecord, VerificationStatus};
use serde::{Deserialize, Serialize};

/// Record counts per verification status.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationStatusCounts {
    pub pending: usize,
    pub verified: usize,
    pub failed: usize,
}

impl VerificationStatusCounts {
    fn add(&mut self, status: VerificationStatus) {
        match status {
            VerificationStatus::Pending => self.pending += 1,
            VerificationStatus::Verified => self.verified += 1,
            VerificationStatus::Failed => self.failed += 1,
        }
    }
}

/// Aggregate statistics over the committed chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainStats {
    /// Blocks including genesis
    pub total_blocks: usize,
    /// Committed records (genesis carries none)
    pub total_records: usize,
    /// Seal time of the newest block
    pub last_block_time: Timestamp,
    /// Mean milliseconds between consecutive blocks
    pub average_block_time: f64,
    /// Committed records by status, plus queued records as pending
    pub verification_status_counts: VerificationStatusCounts,
    /// Records still waiting in the queue
    pub pending_records: usize,
}

fn newest_first(mut records: Vec<AuditRecord>) -> Vec<AuditRecord> {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    records
}

fn matching<F>(blocks: &[AuditBlock], predicate: F) -> Vec<AuditRecord>
where
    F: Fn(&AuditRecord) -> bool,
{
    let records = blocks
        .iter()
        .flat_map(|b| b.records())
        .filter(|&r| predicate(r))
        .cloned()
        .collect();
    newest_first(records)
}

/// Records submitted by one executive, newest first.
pub fn records_by_executive(blocks: &[AuditBlock], executive_id: &str) -> Vec<AuditRecord> {
    matching(blocks, |r| r.executive_id == executive_id)
}

/// Records with `start <= timestamp <= end`, newest first.
pub fn records_by_time_range(
    blocks: &[AuditBlock],
    start: Timestamp,
    end: Timestamp,
) -> Vec<AuditRecord> {
    matching(blocks, |r| r.timestamp >= start && r.timestamp <= end)
}

/// Compute chain statistics.
///
/// `pending_records` is the current queue length and is folded into the
/// pending status count.
pub fn chain_stats(blocks: &[AuditBlock], pending_records: usize) -> ChainStats {
    let mut counts = VerificationStatusCounts {
        pending: pending_records,
        ..Default::default()
    };
    let mut total_records = 0;
    for record in blocks.iter().flat_map(|b| b.records()) {
        total_records += 1;
        counts.add(record.verification_status);
    }

    let average_block_time = if blocks.len() > 1 {
        let span: i64 = blocks
            .windows(2)
            .map(|pair| pair[1].timestamp - pair[0].timestamp)
            .sum();
        span as f64 / (blocks.len() - 1) as f64
    } else {
        0.0
    };

    ChainStats {
        total_blocks: blocks.len(),
        total_records,
        last_block_time: blocks.last().map(|b| b.timestamp).unwrap_or_default(),
        average_block_time,
        verification_status_counts: counts,
        pending_records,
    }
}
