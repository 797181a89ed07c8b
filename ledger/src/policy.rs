//! # Admission Policy
//!
//! Decides whether a certificate record is well-formed enough to be
//! admitted to the ledger. The ledger core only consumes the boolean —
//! the full verdict (score, rule names) is passed back to the caller so a
//! rejected submitter knows exactly what to fix.
//!
//! The policy sits behind a trait so deployments can swap rule sets
//! without touching the chain. The default [`RulePolicy`] checks four
//! things: certificate number present, owner id present, file hash
//! present, and confidence score above a threshold.

use serde::{Deserialize, Serialize};

use crate::config::MIN_CONFIDENCE_SCORE;
use crate::transaction::CertificateRecord;

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

/// The outcome of evaluating a record against the admission rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyVerdict {
    /// `true` iff no rule failed. Only this field gates admission.
    pub valid: bool,
    /// Percentage of rules passed, 0.0–100.0, rounded to two decimals.
    pub score: f64,
    /// Names of the rules the record satisfied.
    pub rules_passed: Vec<String>,
    /// Names of the rules the record failed.
    pub rules_failed: Vec<String>,
}

impl PolicyVerdict {
    /// Total number of rules evaluated.
    pub fn total_rules(&self) -> usize {
        self.rules_passed.len() + self.rules_failed.len()
    }
}

// ---------------------------------------------------------------------------
// AdmissionPolicy
// ---------------------------------------------------------------------------

/// The seam between the ledger and whatever decides what may enter it.
pub trait AdmissionPolicy: Send + Sync {
    /// Evaluate a record. Must be pure — the ledger may call this any
    /// number of times without side effects.
    fn evaluate(&self, record: &CertificateRecord) -> PolicyVerdict;
}

/// Default rule set: presence of the identifying fields plus a minimum
/// confidence score.
#[derive(Debug, Clone)]
pub struct RulePolicy {
    min_confidence: u32,
}

impl RulePolicy {
    /// Policy with an explicit confidence threshold.
    pub fn new(min_confidence: u32) -> Self {
        Self { min_confidence }
    }
}

impl Default for RulePolicy {
    fn default() -> Self {
        Self::new(MIN_CONFIDENCE_SCORE)
    }
}

impl AdmissionPolicy for RulePolicy {
    fn evaluate(&self, record: &CertificateRecord) -> PolicyVerdict {
        let mut rules_passed = Vec::new();
        let mut rules_failed = Vec::new();

        let mut check = |ok: bool, pass: String, fail: String| {
            if ok {
                rules_passed.push(pass);
            } else {
                rules_failed.push(fail);
            }
        };

        check(
            record
                .certificate_number
                .as_deref()
                .is_some_and(|n| !n.is_empty()),
            "certificate_number_present".into(),
            "certificate_number_missing".into(),
        );
        check(
            record.owner_id.as_deref().is_some_and(|o| !o.is_empty()),
            "owner_id_present".into(),
            "owner_id_missing".into(),
        );
        check(
            record.file_hash.as_deref().is_some_and(|f| !f.is_empty()),
            "file_hash_present".into(),
            "file_hash_missing".into(),
        );
        check(
            record.confidence_score.unwrap_or(0) >= self.min_confidence,
            format!("confidence_score_above_{}", self.min_confidence),
            format!("confidence_score_below_{}", self.min_confidence),
        );

        let total = rules_passed.len() + rules_failed.len();
        let score = if total > 0 {
            (rules_passed.len() as f64 / total as f64 * 10_000.0).round() / 100.0
        } else {
            0.0
        };

        PolicyVerdict {
            valid: rules_failed.is_empty(),
            score,
            rules_passed,
            rules_failed,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
