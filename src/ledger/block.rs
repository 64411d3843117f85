//! Audit block structure.
//!
//! A block seals a batch of records behind a proof-of-work hash.

use crate::core::hash::sha3_256_fields;
use crate::core::{now_millis, Hash256, Result, Timestamp};
use crate::ledger::record::{finite_value, AuditRecord, RecordId, RiskLevel, VerificationStatus};
use serde::{Deserialize, Serialize};

/// Executive id carried by synthetic aggregate records.
pub const SYSTEM_EXECUTIVE: &str = "system";

/// Action type of the genesis aggregate.
pub const GENESIS_ACTION: &str = "genesis";

/// Action type of a mined batch aggregate.
pub const BATCH_ACTION: &str = "block_batch";

/// Records sealed by a block.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockContext {
    /// Batch in submission order
    pub records: Vec<AuditRecord>,
}

/// Synthetic aggregate record stored as a block's payload.
///
/// Mirrors the shape of an [`AuditRecord`] so a block reads like one
/// system-issued record whose context is the batch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockData {
    pub id: RecordId,
    pub executive_id: String,
    pub executive_name: String,
    pub action_type: String,
    pub description: String,
    /// Sum of the batch values
    pub value: f64,
    pub risk_level: RiskLevel,
    pub timestamp: Timestamp,
    pub context: BlockContext,
    pub signature: Hash256,
    pub verification_status: VerificationStatus,
}

impl BlockData {
    /// Aggregate a batch into a block payload.
    ///
    /// The copies stored in the payload are marked verified, so the block
    /// hash commits to their accepted state. The risk level is the highest
    /// in the batch. The value sum saturates instead of overflowing.
    pub fn aggregate(batch: &[AuditRecord], timestamp: Timestamp) -> Self {
        let value = finite_value(batch.iter().map(|r| r.value).sum());
        let risk_level = batch
            .iter()
            .map(|r| r.risk_level)
            .max()
            .unwrap_or_default();
        let description = format!("Batch of {} audit records", batch.len());

        Self::system(
            BATCH_ACTION,
            description,
            value,
            risk_level,
            timestamp,
            batch.iter().map(AuditRecord::sealed).collect(),
        )
    }

    /// Payload of the genesis block.
    pub fn genesis(timestamp: Timestamp) -> Self {
        Self::system(
            GENESIS_ACTION,
            "Chain initialization".to_string(),
            0.0,
            RiskLevel::Low,
            timestamp,
            Vec::new(),
        )
    }

    fn system(
        action_type: &str,
        description: String,
        value: f64,
        risk_level: RiskLevel,
        timestamp: Timestamp,
        records: Vec<AuditRecord>,
    ) -> Self {
        let signature = AuditRecord::compute_signature(
            SYSTEM_EXECUTIVE,
            action_type,
            &description,
            value,
            timestamp,
        );

        Self {
            id: RecordId::generate(),
            executive_id: SYSTEM_EXECUTIVE.to_string(),
            executive_name: "Audit Chain".to_string(),
            action_type: action_type.to_string(),
            description,
            value,
            risk_level,
            timestamp,
            context: BlockContext { records },
            signature,
            verification_status: VerificationStatus::Verified,
        }
    }

    /// Records sealed by this payload.
    pub fn records(&self) -> &[AuditRecord] {
        &self.context.records
    }
}

/// A sealed block in the audit chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditBlock {
    /// Position in the chain (genesis is 0)
    pub index: u64,
    /// Seal time
    pub timestamp: Timestamp,
    /// Hash of the preceding block
    pub previous_hash: Hash256,
    /// Content hash of this block
    pub hash: Hash256,
    /// Aggregated batch
    pub data: BlockData,
    /// Proof-of-work counter
    pub nonce: u64,
}

impl AuditBlock {
    /// Create an unsealed candidate block (nonce 0, hash not yet computed).
    pub fn candidate(index: u64, previous_hash: Hash256, data: BlockData) -> Self {
        Self {
            index,
            timestamp: now_millis(),
            previous_hash,
            hash: Hash256::zero(),
            data,
            nonce: 0,
        }
    }

    /// Create genesis block.
    ///
    /// Genesis is exempt from proof-of-work; its hash is computed once.
    pub fn genesis() -> Result<Self> {
        let timestamp = now_millis();
        let mut block = Self {
            index: 0,
            timestamp,
            previous_hash: Hash256::zero(),
            hash: Hash256::zero(),
            data: BlockData::genesis(timestamp),
            nonce: 0,
        };
        block.hash = block.compute_hash()?;
        Ok(block)
    }

    /// Whether this block sits at the root of the chain.
    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }

    /// Canonical JSON of the payload.
    ///
    /// Object keys in `serde_json::Value` are sorted, so caller context
    /// serializes identically before and after a snapshot round trip.
    pub fn canonical_data(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.data)?)
    }

    /// Compute content hash (SHA3-256).
    /// Hash covers all fields except the hash itself.
    pub fn compute_hash(&self) -> Result<Hash256> {
        let data = self.canonical_data()?;
        Ok(self.hash_with(&data, self.nonce))
    }

    /// Hash with a pre-serialized payload and an explicit nonce.
    ///
    /// The miner serializes the payload once per search and calls this for
    /// each nonce attempt.
    pub fn hash_with(&self, canonical_data: &str, nonce: u64) -> Hash256 {
        let index = self.index.to_string();
        let timestamp = self.timestamp.to_string();
        let previous = self.previous_hash.to_hex();
        let nonce = nonce.to_string();

        sha3_256_fields(&[
            index.as_bytes(),
            timestamp.as_bytes(),
            previous.as_bytes(),
            canonical_data.as_bytes(),
            nonce.as_bytes(),
        ])
    }

    /// Records sealed by this block.
    pub fn records(&self) -> &[AuditRecord] {
        self.data.records()
    }

    /// Serialize block to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize block from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
