//! Chain store.
//!
//! The ordered, append-only sequence of sealed blocks rooted at genesis.

use crate::core::{Error, Hash256, Result};
use crate::ledger::block::{AuditBlock, BlockData};
use crate::ledger::record::{AuditRecord, RecordId};
use crate::ledger::verify::{block_defects, verify_chain, ChainVerification};

/// Append-only block storage.
#[derive(Clone, Debug)]
pub struct ChainStore {
    blocks: Vec<AuditBlock>,
}

impl ChainStore {
    /// Create a new chain holding only a genesis block.
    pub fn new() -> Result<Self> {
        Ok(Self {
            blocks: vec![AuditBlock::genesis()?],
        })
    }

    /// Number of blocks, genesis included.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the store holds no blocks at all.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Most recently appended block.
    pub fn tip(&self) -> Option<&AuditBlock> {
        self.blocks.last()
    }

    /// Get block by index.
    pub fn get(&self, index: u64) -> Option<&AuditBlock> {
        self.blocks.get(index as usize)
    }

    /// Get block by hash.
    pub fn get_by_hash(&self, hash: &Hash256) -> Option<&AuditBlock> {
        self.blocks.iter().find(|b| &b.hash == hash)
    }

    /// Get all blocks.
    pub fn blocks(&self) -> &[AuditBlock] {
        &self.blocks
    }

    /// Every committed record, oldest block first.
    pub fn records(&self) -> impl Iterator<Item = &AuditRecord> {
        self.blocks.iter().flat_map(|b| b.records())
    }

    /// Find a committed record by id.
    pub fn find_record(&self, id: &RecordId) -> Option<&AuditRecord> {
        self.records().find(|r| &r.id == id)
    }

    /// Unsealed candidate for the next slot.
    pub fn next_candidate(&self, data: BlockData) -> Result<AuditBlock> {
        let tip = self
            .tip()
            .ok_or_else(|| Error::Internal("chain has no genesis block".into()))?;
        Ok(AuditBlock::candidate(
            self.blocks.len() as u64,
            tip.hash.clone(),
            data,
        ))
    }

    /// Append a sealed block after verifying it against the current tip.
    pub fn append(&mut self, block: AuditBlock, difficulty: usize) -> Result<Hash256> {
        let expected = self.blocks.len() as u64;
        if block.index != expected {
            return Err(Error::BlockRejected(format!(
                "Invalid index: expected {}, got {}",
                expected, block.index
            )));
        }

        let defects = block_defects(&block, self.tip(), difficulty);
        if let Some(defect) = defects.first() {
            return Err(Error::BlockRejected(defect.to_string()));
        }

        let hash = block.hash.clone();
        self.blocks.push(block);
        Ok(hash)
    }

    /// Verify entire chain integrity.
    pub fn verify(&self, difficulty: usize) -> ChainVerification {
        verify_chain(&self.blocks, difficulty)
    }

    /// Swap in a new block list, returning the previous one.
    pub(crate) fn replace(&mut self, blocks: Vec<AuditBlock>) -> Vec<AuditBlock> {
        std::mem::replace(&mut self.blocks, blocks)
    }
}
