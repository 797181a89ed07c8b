//! # Block Structure
//!
//! A block is the atomic unit of the ledger. Each block carries a
//! structured payload, a link to the previous block's hash (forming the
//! chain), and its own proof-of-work-sealed hash.
//!
//! ## Block Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │  Block                                           │
//! │  ├── index: u64          (position in the chain) │
//! │  ├── timestamp: u64      (unix ms, fixed at new) │
//! │  ├── payload: Value      (string-keyed JSON map) │
//! │  ├── previous_hash: String  (hex, 64 zeros @ 0)  │
//! │  ├── nonce: u64          (mutated only by seal)  │
//! │  └── hash: String        (hex SHA-256, below)    │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Hash Computation
//!
//! The block hash is SHA-256 over the canonical JSON serialization of
//! `{index, nonce, payload, previous_hash, timestamp}`. Canonical means
//! stable key order: `serde_json`'s default map is a `BTreeMap`, so keys
//! serialize sorted at every nesting level and the same fields always
//! produce the same bytes. The `hash` field itself is never part of its
//! own pre-image.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::hash::{meets_difficulty, sha256_hex};

// ---------------------------------------------------------------------------
// Block
// ---------------------------------------------------------------------------

/// One entry in the ledger, bound to its predecessor by hash.
///
/// Blocks are constructed with `nonce = 0` and an immediately-computed
/// hash, then handed to the sealer which mutates the nonce until the hash
/// satisfies the chain's difficulty. After sealing, a block is treated as
/// immutable — any later mutation is detectable because the stored hash
/// no longer matches the recomputed one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain. Genesis is 0.
    pub index: u64,
    /// Unix timestamp in milliseconds, assigned at construction.
    pub timestamp: u64,
    /// Structured payload: a map of string keys to nested JSON values.
    pub payload: Value,
    /// Hex hash of the block at `index - 1`; 64 zeros for genesis.
    pub previous_hash: String,
    /// Proof-of-work counter. Zero at construction, mutated only during
    /// sealing.
    pub nonce: u64,
    /// Hex SHA-256 of the canonical form of the other five fields.
    pub hash: String,
}

impl Block {
    /// Construct a block and compute its hash immediately.
    ///
    /// `previous_hash` is taken on faith — linkage is the chain's
    /// responsibility, not the block's.
    pub fn new(index: u64, timestamp: u64, payload: Value, previous_hash: String) -> Self {
        let mut block = Block {
            index,
            timestamp,
            payload,
            previous_hash,
            nonce: 0,
            hash: String::new(),
        };
        block.hash = block.compute_hash();
        block
    }

    /// Recompute the hash from the current field values.
    ///
    /// Pure function of `{index, timestamp, payload, previous_hash,
    /// nonce}`. Used both to set `hash` after a mutation and to re-derive
    /// the expected hash during validation — a stored hash is never
    /// trusted on its own.
    pub fn compute_hash(&self) -> String {
        let preimage = serde_json::json!({
            "index": self.index,
            "timestamp": self.timestamp,
            "payload": self.payload,
            "previous_hash": self.previous_hash,
            "nonce": self.nonce,
        });
        sha256_hex(preimage.to_string().as_bytes())
    }

    /// Recompute and store the hash. Called by the sealer after each
    /// nonce increment.
    pub fn refresh_hash(&mut self) {
        self.hash = self.compute_hash();
    }

    /// `true` iff the stored hash matches the recomputed one.
    pub fn validate(&self) -> bool {
        self.compute_hash() == self.hash
    }

    /// `true` iff the first `difficulty` hex characters of the hash are
    /// all `'0'` — the sealed condition.
    pub fn meets_difficulty(&self, difficulty: u32) -> bool {
        meets_difficulty(&self.hash, difficulty)
    }

    /// First characters of the hash, for summaries and log lines.
    pub fn short_hash(&self) -> String {
        let prefix: String = self
            .hash
            .chars()
            .take(crate::config::SUMMARY_HASH_PREFIX_LEN)
            .collect();
        format!("{prefix}...")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
