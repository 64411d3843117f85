//! Audit record structure.
//!
//! An executive action plus its context, signed at submission time.

use crate::core::hash::sha3_256_fields;
use crate::core::{now_millis, Hash256, Timestamp};
use serde::{Deserialize, Serialize};

/// Unique record identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    /// Create a record ID from an existing string.
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    /// Generate a unique ID.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the ID string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Categorical severity of an action.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

/// Lifecycle of a record's inclusion in the chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    /// Queued, not yet sealed
    Pending,
    /// Sealed into an accepted block
    Verified,
    /// Carried by a block that failed verification
    Failed,
}

/// The executive performing an action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Executive {
    pub id: String,
    pub name: String,
}

impl Executive {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
        }
    }
}

/// What the executive did.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditAction {
    pub action_type: String,
    pub description: String,
    pub value: f64,
    pub risk_level: RiskLevel,
}

impl AuditAction {
    /// Create a zero-value, low-risk action.
    pub fn new(action_type: &str, description: &str) -> Self {
        Self {
            action_type: action_type.to_string(),
            description: description.to_string(),
            value: 0.0,
            risk_level: RiskLevel::Low,
        }
    }

    /// Set the numeric magnitude.
    pub fn with_value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    /// Set the risk level.
    pub fn with_risk(mut self, risk_level: RiskLevel) -> Self {
        self.risk_level = risk_level;
        self
    }
}

/// Clamp a magnitude into the finite range.
///
/// NaN maps to zero and infinities saturate, so every stored value has a
/// JSON number representation.
pub fn finite_value(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(f64::MIN, f64::MAX)
    }
}

/// A single audited executive action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique record ID
    pub id: RecordId,
    /// Executive identity
    pub executive_id: String,
    pub executive_name: String,
    /// Action performed
    pub action_type: String,
    pub description: String,
    /// Magnitude (e.g. monetary value)
    pub value: f64,
    pub risk_level: RiskLevel,
    /// Submission time
    pub timestamp: Timestamp,
    /// Opaque caller metadata
    #[serde(default)]
    pub context: serde_json::Value,
    /// Provenance digest over identity, action and time
    pub signature: Hash256,
    pub verification_status: VerificationStatus,
}

impl AuditRecord {
    /// Create a pending record stamped with the current time.
    pub fn new(
        executive: &Executive,
        action: &AuditAction,
        context: Option<serde_json::Value>,
    ) -> Self {
        Self::at(executive, action, context, now_millis())
    }

    /// Create a pending record with an explicit submission time.
    pub fn at(
        executive: &Executive,
        action: &AuditAction,
        context: Option<serde_json::Value>,
        timestamp: Timestamp,
    ) -> Self {
        let value = finite_value(action.value);
        let signature = Self::compute_signature(
            &executive.id,
            &action.action_type,
            &action.description,
            value,
            timestamp,
        );

        Self {
            id: RecordId::generate(),
            executive_id: executive.id.clone(),
            executive_name: executive.name.clone(),
            action_type: action.action_type.clone(),
            description: action.description.clone(),
            value,
            risk_level: action.risk_level,
            timestamp,
            context: context.unwrap_or(serde_json::Value::Null),
            signature,
            verification_status: VerificationStatus::Pending,
        }
    }

    /// Digest binding executive, action and submission time.
    pub fn compute_signature(
        executive_id: &str,
        action_type: &str,
        description: &str,
        value: f64,
        timestamp: Timestamp,
    ) -> Hash256 {
        let value = value.to_string();
        let timestamp = timestamp.to_string();
        sha3_256_fields(&[
            executive_id.as_bytes(),
            action_type.as_bytes(),
            description.as_bytes(),
            value.as_bytes(),
            timestamp.as_bytes(),
        ])
    }

    /// Check the stored signature against the record's own fields.
    pub fn verify_signature(&self) -> bool {
        let expected = Self::compute_signature(
            &self.executive_id,
            &self.action_type,
            &self.description,
            self.value,
            self.timestamp,
        );
        expected == self.signature
    }

    /// Clone of this record marked as sealed.
    pub fn sealed(&self) -> Self {
        Self {
            verification_status: VerificationStatus::Verified,
            ..self.clone()
        }
    }
}
