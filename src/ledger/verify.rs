//! Chain verification.
//!
//! Recomputes block hashes and re-checks links and proof-of-work. Every
//! function here is read-only; defects are returned as values so a single
//! pass reports every problem in the chain.

use crate::core::Hash256;
use crate::ledger::block::AuditBlock;
use crate::ledger::record::VerificationStatus;
use serde::Serialize;
use thiserror::Error;

/// A structural defect found in a block or chain.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize)]
pub enum ChainDefect {
    #[error("Chain is empty: genesis block missing")]
    EmptyChain,

    #[error("Block 0: invalid genesis ({0})")]
    InvalidGenesis(String),

    #[error("Block at position {position}: index {index} out of place")]
    IndexMismatch { position: u64, index: u64 },

    #[error("Block {index}: hash mismatch (stored {stored}, computed {computed})")]
    HashMismatch {
        index: u64,
        stored: String,
        computed: String,
    },

    #[error("Block {index}: payload cannot be hashed ({reason})")]
    Unhashable { index: u64, reason: String },

    #[error("Block {index}: hash does not meet difficulty {difficulty}")]
    DifficultyNotMet { index: u64, difficulty: usize },

    #[error("Block {index}: previous hash does not match block {}", .index.saturating_sub(1))]
    BrokenLink { index: u64 },

    #[error("Block {index}: predecessor missing")]
    MissingPredecessor { index: u64 },
}

/// Result of chain verification.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChainVerification {
    /// Whether the chain is valid
    pub is_valid: bool,
    /// One message per detected defect
    pub errors: Vec<String>,
    /// Structured form of `errors`
    pub defects: Vec<ChainDefect>,
    /// Number of blocks that passed every check
    pub blocks_verified: u64,
}

impl ChainVerification {
    fn from_defects(defects: Vec<ChainDefect>, blocks_verified: u64) -> Self {
        Self {
            is_valid: defects.is_empty(),
            errors: defects.iter().map(ToString::to_string).collect(),
            defects,
            blocks_verified,
        }
    }
}

/// Check a block's own hash, its proof-of-work, and its link to `previous`.
///
/// `previous` is ignored for genesis. Genesis is exempt from the
/// difficulty predicate.
pub fn block_defects(
    block: &AuditBlock,
    previous: Option<&AuditBlock>,
    difficulty: usize,
) -> Vec<ChainDefect> {
    let mut defects = Vec::new();

    match block.compute_hash() {
        Ok(computed) if computed != block.hash => defects.push(ChainDefect::HashMismatch {
            index: block.index,
            stored: block.hash.to_hex(),
            computed: computed.to_hex(),
        }),
        Ok(_) => {}
        Err(err) => defects.push(ChainDefect::Unhashable {
            index: block.index,
            reason: err.to_string(),
        }),
    }

    if block.is_genesis() {
        return defects;
    }

    if !block.hash.meets_difficulty(difficulty) {
        defects.push(ChainDefect::DifficultyNotMet {
            index: block.index,
            difficulty,
        });
    }

    match previous {
        Some(prev) if block.previous_hash != prev.hash => {
            defects.push(ChainDefect::BrokenLink { index: block.index })
        }
        Some(_) => {}
        None => defects.push(ChainDefect::MissingPredecessor { index: block.index }),
    }

    defects
}

/// Verify a single block against the chain it claims to extend.
///
/// The predecessor is the chain element at `index - 1`, so a candidate for
/// the next slot is checked against the current tip.
pub fn verify_block(block: &AuditBlock, chain: &[AuditBlock], difficulty: usize) -> bool {
    let previous = block
        .index
        .checked_sub(1)
        .and_then(|i| chain.get(i as usize));
    block_defects(block, previous, difficulty).is_empty()
}

fn genesis_defects(genesis: &AuditBlock) -> Vec<ChainDefect> {
    let mut defects = Vec::new();
    if genesis.index != 0 {
        defects.push(ChainDefect::InvalidGenesis(format!(
            "index is {}",
            genesis.index
        )));
    }
    if genesis.previous_hash != Hash256::zero() {
        defects.push(ChainDefect::InvalidGenesis(
            "previous hash is not the zero sentinel".into(),
        ));
    }
    if genesis.data.verification_status != VerificationStatus::Verified {
        defects.push(ChainDefect::InvalidGenesis("status is not verified".into()));
    }
    if defects.is_empty() {
        defects.extend(block_defects(genesis, None, 0));
    }
    defects
}

/// Verify an entire chain.
///
/// Genesis is checked for shape and self-consistency only. Every later
/// block is checked for position, hash, difficulty and link.
pub fn verify_chain(blocks: &[AuditBlock], difficulty: usize) -> ChainVerification {
    let Some(genesis) = blocks.first() else {
        return ChainVerification::from_defects(vec![ChainDefect::EmptyChain], 0);
    };

    let mut defects = genesis_defects(genesis);
    let mut blocks_verified = u64::from(defects.is_empty());

    for (position, pair) in blocks.windows(2).enumerate() {
        let (previous, block) = (&pair[0], &pair[1]);
        let position = position as u64 + 1;
        let mut found = Vec::new();

        if block.index != position {
            found.push(ChainDefect::IndexMismatch {
                position,
                index: block.index,
            });
        }
        found.extend(block_defects(block, Some(previous), difficulty));

        if found.is_empty() {
            blocks_verified += 1;
        }
        defects.extend(found);
    }

    ChainVerification::from_defects(defects, blocks_verified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::block::BlockData;
    use crate::ledger::record::{AuditAction, AuditRecord, Executive};

    const DIFFICULTY: usize = 1;

    fn mine(previous: &AuditBlock, difficulty: usize) -> AuditBlock {
        let exec = Executive::new("exec-1", "Ada Chief");
        let record = AuditRecord::new(&exec, &AuditAction::new("approve", "deal"), None);
        let mut block = AuditBlock::candidate(
            previous.index + 1,
            previous.hash.clone(),
            BlockData::aggregate(&[record], 1),
        );
        loop {
            block.hash = block.compute_hash().unwrap();
            if block.hash.meets_difficulty(difficulty) {
                return block;
            }
            block.nonce += 1;
        }
    }

    fn chain_of(len: usize) -> Vec<AuditBlock> {
        let mut blocks = vec![AuditBlock::genesis().unwrap()];
        while blocks.len() < len {
            let next = mine(blocks.last().unwrap(), DIFFICULTY);
            blocks.push(next);
        }
        blocks
    }

    #[test]
    fn test_valid_chain() {
        let blocks = chain_of(4);
        let result = verify_chain(&blocks, DIFFICULTY);
        assert!(result.is_valid, "{:?}", result.errors);
        assert!(result.errors.is_empty());
        assert_eq!(result.blocks_verified, 4);
    }

    #[test]
    fn test_genesis_only_chain_is_valid() {
        let blocks = chain_of(1);
        assert!(verify_chain(&blocks, 4).is_valid);
    }

    #[test]
    fn test_empty_chain_is_invalid() {
        let result = verify_chain(&[], DIFFICULTY);
        assert!(!result.is_valid);
        assert_eq!(result.defects, vec![ChainDefect::EmptyChain]);
    }

    #[test]
    fn test_tampered_hash_reported_by_index() {
        let mut blocks = chain_of(3);
        blocks[1].hash = Hash256::new([0x0a; 32]);

        let result = verify_chain(&blocks, DIFFICULTY);
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.starts_with("Block 1:")));
        // Block 2 still points at the original hash of block 1.
        assert!(result
            .defects
            .contains(&ChainDefect::BrokenLink { index: 2 }));
    }

    #[test]
    fn test_collects_every_defect() {
        let mut blocks = chain_of(4);
        blocks[1].data.context.records[0].value = 1e9;
        blocks[3].previous_hash = Hash256::zero();

        let result = verify_chain(&blocks, DIFFICULTY);
        assert!(matches!(
            result.defects[0],
            ChainDefect::HashMismatch { index: 1, .. }
        ));
        assert!(result
            .defects
            .iter()
            .any(|d| matches!(d, ChainDefect::HashMismatch { index: 3, .. })));
        assert!(result.defects.contains(&ChainDefect::BrokenLink { index: 3 }));
        assert_eq!(result.errors.len(), result.defects.len());
    }

    #[test]
    fn test_difficulty_not_met() {
        let blocks = chain_of(2);
        let result = verify_chain(&blocks, 64);
        assert!(result.defects.contains(&ChainDefect::DifficultyNotMet {
            index: 1,
            difficulty: 64
        }));
    }

    #[test]
    fn test_index_out_of_place() {
        let mut blocks = chain_of(3);
        blocks.swap(1, 2);
        let result = verify_chain(&blocks, DIFFICULTY);
        assert!(result.defects.contains(&ChainDefect::IndexMismatch {
            position: 1,
            index: 2
        }));
    }

    #[test]
    fn test_invalid_genesis() {
        let mut blocks = chain_of(2);
        blocks[0].previous_hash = Hash256::new([1u8; 32]);
        let result = verify_chain(&blocks, DIFFICULTY);
        assert!(!result.is_valid);
        assert!(matches!(result.defects[0], ChainDefect::InvalidGenesis(_)));
    }

    #[test]
    fn test_verify_block_against_tip() {
        let blocks = chain_of(2);
        let candidate = mine(&blocks[1], DIFFICULTY);
        assert!(verify_block(&candidate, &blocks, DIFFICULTY));
        assert!(verify_block(&blocks[0], &blocks, DIFFICULTY));

        let mut stale = mine(&blocks[0], DIFFICULTY);
        stale.index = 2;
        assert!(!verify_block(&stale, &blocks, DIFFICULTY));
    }

    #[test]
    fn test_verify_block_missing_predecessor() {
        let blocks = chain_of(2);
        let mut orphan = mine(&blocks[1], DIFFICULTY);
        orphan.index = 9;
        let defects = block_defects(&orphan, None, DIFFICULTY);
        assert!(defects.contains(&ChainDefect::MissingPredecessor { index: 9 }));
        assert!(!verify_block(&orphan, &blocks, DIFFICULTY));
    }

    #[test]
    fn test_verification_idempotent() {
        let mut blocks = chain_of(3);
        blocks[2].nonce += 1;
        let first = verify_chain(&blocks, DIFFICULTY);
        let second = verify_chain(&blocks, DIFFICULTY);
        assert_eq!(first, second);
    }
}
