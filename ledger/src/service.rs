//! # Ledger Service
//!
//! The façade callers actually talk to. One explicitly-constructed,
//! explicitly-owned instance per ledger — construct it once with
//! [`LedgerService::open`], share it behind an `Arc`, and wire it into
//! whatever surface needs it. There is no hidden global and no implicit
//! re-entry; if two parts of a program want the same ledger, someone
//! hands them the same handle.
//!
//! ## Write path
//!
//! `register` → admission policy → codec (content hash + canonical
//! payload) → `Chain::append` (seal) → snapshot save. The policy verdict
//! always travels back to the caller, pass or fail. A save failure after
//! a successful seal does not roll back the in-memory append — the error
//! is surfaced alongside the success, never swallowed.
//!
//! ## Lock discipline
//!
//! The chain sits behind a `parking_lot::RwLock`: queries take the
//! shared lock, `register` takes the exclusive lock for the whole
//! construct-seal-link-save sequence. Sealing is CPU-bound and blocks
//! the writer; readers queue behind it rather than observing a
//! half-linked chain.

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::block::Block;
use crate::chain::{rfc3339_from_millis, Chain, ChainError, ChainStats, RecentEntry};
use crate::policy::{AdmissionPolicy, PolicyVerdict};
use crate::store::{SnapshotStore, StoreError};
use crate::transaction::{content_hash, registration_payload, CertificateRecord};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that abort a service operation outright. Policy rejections and
/// persistence failures are NOT here — those are structured results.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Operation Results
// ---------------------------------------------------------------------------

/// A successful registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    /// Index of the block now holding the registration.
    pub block_index: u64,
    /// Hash of that block (leading zeros per the chain difficulty).
    pub block_hash: String,
    /// Content hash fingerprinting this registration — the key for
    /// later verification. Keep it; it is not recomputable.
    pub content_hash: String,
    /// The admission verdict that let the record in.
    pub verdict: PolicyVerdict,
    /// Proof-of-work attempts spent sealing the block.
    pub seal_attempts: u64,
    /// Registration time, RFC 3339.
    pub timestamp: String,
    /// Set when the snapshot save failed after the append succeeded.
    /// The in-memory chain is authoritative; the caller decides whether
    /// to retry persistence.
    pub persistence_error: Option<String>,
}

/// Outcome of [`LedgerService::register`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RegisterOutcome {
    /// The record passed policy and was sealed into the chain.
    Registered(Registration),
    /// The record failed the admission policy. Nothing was appended;
    /// the verdict says which rules failed.
    Rejected { verdict: PolicyVerdict },
}

/// Result of a content-hash verification lookup. Absence is a report,
/// not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Whether a registration with this content hash exists.
    pub exists: bool,
    /// Mirrors `exists` — a found registration is a verified one.
    pub verified: bool,
    /// "VALID" when found, "NOT_FOUND" otherwise.
    pub verification_status: String,
    pub block_index: Option<u64>,
    pub block_hash: Option<String>,
    /// Block time, RFC 3339.
    pub timestamp: Option<String>,
    /// The stored transaction payload.
    pub transaction: Option<Value>,
}

/// One step of a certificate's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub block_index: u64,
    /// Block time, RFC 3339.
    pub timestamp: String,
    pub transaction: Value,
    pub block_hash: String,
}

/// Full history of a certificate id, earliest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryReport {
    pub certificate_id: String,
    pub total_transactions: usize,
    pub exists: bool,
    pub entries: Vec<HistoryEntry>,
}

/// Snapshot of the ledger's shape: statistics plus its boundary blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerInfo {
    pub stats: ChainStats,
    pub genesis_block: Block,
    pub latest_block: Block,
}

/// Result of an explicit full-chain validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub chain_valid: bool,
    pub total_blocks: u64,
    /// Index of the first failing block, when invalid.
    pub failed_index: Option<u64>,
    /// Human-readable description of the failure, when invalid.
    pub failure: Option<String>,
    /// When this validation ran, RFC 3339.
    pub checked_at: String,
}

// ---------------------------------------------------------------------------
// LedgerService
// ---------------------------------------------------------------------------

/// The certificate ledger: chain + policy + persistence, wired together.
pub struct LedgerService {
    chain: RwLock<Chain>,
    store: Box<dyn SnapshotStore>,
    policy: Box<dyn AdmissionPolicy>,
}

impl LedgerService {
    /// Load the chain from `store`, or create a fresh one at `difficulty`
    /// if no snapshot exists yet (the fresh genesis is persisted
    /// immediately; a failure there is logged, not fatal).
    ///
    /// # Errors
    ///
    /// A corrupt or unreadable snapshot, or an out-of-range difficulty.
    /// Corruption at startup is terminal for that snapshot — this
    /// service never repairs a broken chain.
    pub fn open(
        difficulty: u32,
        store: Box<dyn SnapshotStore>,
        policy: Box<dyn AdmissionPolicy>,
    ) -> Result<Self, ServiceError> {
        let chain = match store.load()? {
            Some(chain) => {
                tracing::info!(
                    blocks = chain.len(),
                    difficulty = chain.difficulty(),
                    "ledger loaded from snapshot"
                );
                chain
            }
            None => {
                let chain = Chain::new(difficulty)?;
                if let Err(e) = store.save(&chain) {
                    tracing::warn!(error = %e, "could not persist the initial snapshot");
                }
                tracing::info!(difficulty, "new ledger created");
                chain
            }
        };

        Ok(Self {
            chain: RwLock::new(chain),
            store,
            policy,
        })
    }

    // -- Write path ---------------------------------------------------------

    /// Register a certificate-verification event.
    ///
    /// Runs the admission policy first; a failing verdict mutates
    /// nothing and comes back as [`RegisterOutcome::Rejected`]. On pass,
    /// the record is canonicalized, fingerprinted, sealed into a new
    /// block, and the snapshot is saved — all under the exclusive lock.
    ///
    /// # Errors
    ///
    /// Only sealing failures (exhausted attempt budget) abort the call.
    pub fn register(&self, record: &CertificateRecord) -> Result<RegisterOutcome, ServiceError> {
        let verdict = self.policy.evaluate(record);
        if !verdict.valid {
            tracing::warn!(
                certificate_number = record.certificate_number.as_deref().unwrap_or("<none>"),
                rules_failed = ?verdict.rules_failed,
                "registration rejected by admission policy"
            );
            return Ok(RegisterOutcome::Rejected { verdict });
        }

        let at = Utc::now();
        let content = content_hash(record, at);
        let payload = registration_payload(record, &content, at);

        let mut chain = self.chain.write();
        let (block_index, block_hash, seal_attempts) = {
            let (block, report) = chain.append(payload)?;
            (block.index, block.hash.clone(), report.attempts)
        };

        let persistence_error = match self.store.save(&chain) {
            Ok(()) => None,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    block_index,
                    "snapshot save failed after append; in-memory chain remains authoritative"
                );
                Some(e.to_string())
            }
        };
        drop(chain);

        tracing::info!(
            block_index,
            content_hash = %content,
            "certificate registered"
        );
        Ok(RegisterOutcome::Registered(Registration {
            block_index,
            block_hash,
            content_hash: content,
            verdict,
            seal_attempts,
            timestamp: at.to_rfc3339(),
            persistence_error,
        }))
    }

    // -- Read path ----------------------------------------------------------

    /// Look up a registration by its content hash.
    pub fn verify(&self, content_hash: &str) -> VerificationReport {
        let chain = self.chain.read();
        match chain.find_by_content_hash(content_hash) {
            Some(found) => VerificationReport {
                exists: true,
                verified: true,
                verification_status: "VALID".to_string(),
                block_index: Some(found.block_index),
                block_hash: Some(found.block_hash),
                timestamp: Some(rfc3339_from_millis(found.timestamp)),
                transaction: Some(found.transaction),
            },
            None => VerificationReport {
                exists: false,
                verified: false,
                verification_status: "NOT_FOUND".to_string(),
                block_index: None,
                block_hash: None,
                timestamp: None,
                transaction: None,
            },
        }
    }

    /// All registrations for a certificate id, earliest first.
    pub fn history(&self, certificate_id: &str) -> HistoryReport {
        let chain = self.chain.read();
        let entries: Vec<HistoryEntry> = chain
            .history(certificate_id)
            .into_iter()
            .map(|m| HistoryEntry {
                block_index: m.block_index,
                timestamp: rfc3339_from_millis(m.timestamp),
                transaction: m.transaction,
                block_hash: m.block_hash,
            })
            .collect();

        HistoryReport {
            certificate_id: certificate_id.to_string(),
            total_transactions: entries.len(),
            exists: !entries.is_empty(),
            entries,
        }
    }

    /// Up to `limit` registrations, most recent first.
    pub fn recent(&self, limit: usize) -> Vec<RecentEntry> {
        self.chain.read().recent(limit)
    }

    /// Statistics plus the chain's boundary blocks.
    ///
    /// # Errors
    ///
    /// [`ChainError::EmptyChain`] — unreachable via public construction.
    pub fn info(&self) -> Result<LedgerInfo, ServiceError> {
        let chain = self.chain.read();
        Ok(LedgerInfo {
            stats: chain.stats(),
            genesis_block: chain.genesis()?.clone(),
            latest_block: chain.latest()?.clone(),
        })
    }

    /// Run a full integrity verification and report the result.
    pub fn validate(&self) -> ValidationReport {
        let chain = self.chain.read();
        let (chain_valid, failed_index, failure) = match chain.verify_integrity() {
            Ok(()) => (true, None, None),
            Err(e) => (false, Some(e.index), Some(e.to_string())),
        };
        ValidationReport {
            chain_valid,
            total_blocks: chain.len() as u64,
            failed_index,
            failure,
            checked_at: Utc::now().to_rfc3339(),
        }
    }

    #[cfg(test)]
    pub(crate) fn chain_for_tampering(&self) -> &RwLock<Chain> {
        &self.chain
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
