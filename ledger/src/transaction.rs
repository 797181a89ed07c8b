//! # Certificate Transaction Codec
//!
//! Turns a caller-supplied certificate record into the canonical payload
//! shape stored inside a block, and computes the content hash that later
//! serves as the lookup key for verification.
//!
//! Canonicalization is deterministic by construction: everything goes
//! through `serde_json`, whose maps are `BTreeMap`s, so key order is
//! stable at every nesting level. Missing optional fields get defined
//! defaults (unknown owner name, zero confidence, empty file hash,
//! pending status) rather than failing — a half-filled record is still a
//! registrable record.
//!
//! ## The content hash is a fingerprint, not an identifier
//!
//! `content_hash` digests the certificate number, owner id, file hash,
//! *and the registration instant*. Registering byte-identical certificate
//! data twice therefore yields two different content hashes. That is the
//! inherited contract: the hash fingerprints a registration event, it
//! does not name a certificate. Callers wanting "the" hash for a
//! certificate must keep the one returned at registration time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::{
    STATUS_PENDING, TX_KIND_CERTIFICATE_VERIFICATION, TX_TYPE_CERTIFICATE_REGISTRATION,
    UNKNOWN_OWNER_NAME,
};
use crate::hash::sha256_hex;

// ---------------------------------------------------------------------------
// CertificateRecord
// ---------------------------------------------------------------------------

/// A certificate-verification event as submitted by a caller.
///
/// Every field is optional; the codec substitutes defaults where the
/// payload shape demands a value. The admission policy, not the codec,
/// decides whether a sparse record is *acceptable*.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRecord {
    /// Stable identifier of the certificate in the caller's system.
    pub certificate_id: Option<String>,
    /// Human-facing certificate number (e.g. printed on the document).
    pub certificate_number: Option<String>,
    /// Kind of certificate (diploma, license, attestation, …).
    pub certificate_type: Option<String>,
    /// Identifier of the certificate's owner.
    pub owner_id: Option<String>,
    /// Display name of the owner.
    pub owner_name: Option<String>,
    /// Verification status at registration time.
    pub verification_status: Option<String>,
    /// Identity of the verifier that produced this event.
    pub verified_by: Option<String>,
    /// Confidence score of the verification, 0–100.
    pub confidence_score: Option<u32>,
    /// Digest of the certificate file itself, if one was inspected.
    pub file_hash: Option<String>,
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Compute the content hash fingerprinting this registration event.
///
/// SHA-256 over the canonical JSON of `{certificate_number, owner_id,
/// file_hash, timestamp}`. Absent number/owner serialize as `null`; an
/// absent file hash serializes as the empty string. The timestamp is the
/// registration instant — see the module docs for why that makes this a
/// fingerprint rather than a stable identifier.
pub fn content_hash(record: &CertificateRecord, at: DateTime<Utc>) -> String {
    let fingerprint = json!({
        "certificate_number": record.certificate_number,
        "owner_id": record.owner_id,
        "file_hash": record.file_hash.clone().unwrap_or_default(),
        "timestamp": at.to_rfc3339(),
    });
    sha256_hex(fingerprint.to_string().as_bytes())
}

/// Build the canonical block payload for a certificate registration.
///
/// The outer layer tags the block so query operations can tell
/// registrations from genesis (and any future payload kinds); the inner
/// `transaction` carries the certificate fields, the content hash, and a
/// metadata sub-map.
pub fn registration_payload(
    record: &CertificateRecord,
    content_hash: &str,
    at: DateTime<Utc>,
) -> Value {
    json!({
        "transaction_type": TX_TYPE_CERTIFICATE_REGISTRATION,
        "transaction": {
            "type": TX_KIND_CERTIFICATE_VERIFICATION,
            "certificate_id": record.certificate_id,
            "certificate_number": record.certificate_number,
            "certificate_type": record.certificate_type,
            "owner_id": record.owner_id,
            "owner_name": record
                .owner_name
                .clone()
                .unwrap_or_else(|| UNKNOWN_OWNER_NAME.to_string()),
            "verification_status": record
                .verification_status
                .clone()
                .unwrap_or_else(|| STATUS_PENDING.to_string()),
            "verified_by": record.verified_by,
            "verified_at": at.to_rfc3339(),
            "hash": content_hash,
            "metadata": {
                "confidence_score": record.confidence_score.unwrap_or(0),
                "file_hash": record.file_hash.clone().unwrap_or_default(),
                "timestamp": at.to_rfc3339(),
            },
        },
    })
}

/// Extract the certificate transaction from a block payload, or `None`
/// if the payload is not a certificate registration.
///
/// This is the single filter every chain query goes through — genesis
/// blocks and any non-registration payloads fall out here.
pub fn registration_transaction(payload: &Value) -> Option<&Value> {
    if payload.get("transaction_type").and_then(Value::as_str)
        != Some(TX_TYPE_CERTIFICATE_REGISTRATION)
    {
        return None;
    }
    payload.get("transaction")
}

/// Read a string field out of a transaction value. Missing keys and
/// non-string values both come back as `None`.
pub fn transaction_str<'a>(transaction: &'a Value, key: &str) -> Option<&'a str> {
    transaction.get(key).and_then(Value::as_str)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
