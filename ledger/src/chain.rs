//! # Chain
//!
//! The ordered, append-only sequence of blocks, plus everything that
//! reads it: integrity verification, certificate lookups, history,
//! recency listings, and aggregate statistics.
//!
//! ## Lifecycle
//!
//! A chain is born with a sealed genesis block (index 0, previous-hash
//! sentinel of 64 zeros, fixed payload — no caller input, so two chains
//! at the same difficulty share a genesis hash byte for byte). It grows
//! by exactly one block per successful [`Chain::append`] and never
//! shrinks, reorders, or deletes. `append` is the only mutation entry
//! point.
//!
//! ## Integrity
//!
//! `verify_integrity` recomputes every block's hash from its fields and
//! checks every predecessor link; no stored hash is trusted without
//! recomputation. Violations are reported with the failing index for
//! diagnosis — the ledger never repairs a broken chain, it only detects
//! the break.
//!
//! ## Lookup indexes
//!
//! Certificate queries used to be linear scans in the ancestry of this
//! design; here the chain keeps two secondary indexes, built
//! incrementally on append and rebuilt on snapshot restore:
//!
//! | Index               | Key            | Value                        |
//! |---------------------|----------------|------------------------------|
//! | `content_index`     | content hash   | first containing block index |
//! | `certificate_index` | certificate id | ascending block indices      |
//!
//! First-registration-wins tie semantics of the scan are preserved by
//! only recording the first block per content hash. `recent` and
//! `stats` remain single-pass scans — they are inherently whole-chain.

use std::collections::HashMap;

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::block::Block;
use crate::config::{
    GENESIS_CREATOR, GENESIS_MESSAGE, GENESIS_PREVIOUS_HASH, STATUS_PENDING, STATUS_VERIFIED,
};
use crate::sealer::{SealError, SealReport, Sealer};
use crate::transaction::{registration_transaction, transaction_str};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by chain construction and mutation.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// The chain holds no blocks. Unreachable through the public
    /// constructors (genesis is created before a chain is handed out),
    /// but a defined error beats undefined behavior if a restore path
    /// ever produces an empty block list.
    #[error("chain has no blocks; genesis is missing")]
    EmptyChain,

    /// Sealing failed — misconfigured difficulty or exhausted budget.
    #[error(transparent)]
    Seal(#[from] SealError),
}

/// How a block failed integrity verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityViolation {
    /// The stored hash does not match the hash recomputed from the
    /// block's fields — the block itself was altered.
    #[error("stored hash does not match recomputed hash")]
    HashMismatch,
    /// The block's `previous_hash` does not match its predecessor's
    /// hash — the linkage was severed.
    #[error("previous_hash does not match predecessor")]
    BrokenLink,
}

/// An integrity violation, located. Reported, never repaired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("integrity violation at block {index}: {violation}")]
pub struct IntegrityError {
    /// Index of the first block that failed verification.
    pub index: u64,
    /// What failed there.
    pub violation: IntegrityViolation,
}

// ---------------------------------------------------------------------------
// Query Result Types
// ---------------------------------------------------------------------------

/// A certificate transaction located in the chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionMatch {
    /// Index of the containing block.
    pub block_index: u64,
    /// Full hex hash of the containing block.
    pub block_hash: String,
    /// Block timestamp, unix milliseconds.
    pub timestamp: u64,
    /// The transaction payload as stored.
    pub transaction: Value,
}

/// One row of the recent-registrations listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentEntry {
    /// Index of the containing block.
    pub block_index: u64,
    /// Block time as an RFC 3339 string.
    pub timestamp: String,
    /// Certificate number, or "Unknown" when the record carried none.
    pub certificate_number: String,
    /// Certificate type, or "Unknown".
    pub certificate_type: String,
    /// Verification status, or "pending".
    pub status: String,
    /// Truncated block hash for display.
    pub block_hash: String,
}

/// Aggregate chain statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStats {
    /// Every block, genesis included.
    pub total_blocks: u64,
    /// Blocks carrying a certificate registration.
    pub total_certificates: u64,
    /// Registrations whose status is the literal string `"verified"`.
    /// Other spellings ("VALID", "Verified") are not counted — exact
    /// matching is inherited behavior, preserved deliberately.
    pub verified_certificates: u64,
    /// Result of a full integrity verification at the time of the call.
    pub chain_valid: bool,
    /// The chain's sealing difficulty.
    pub difficulty: u32,
    /// Hash of the latest block.
    pub latest_block_hash: String,
    /// Index of the latest block.
    pub latest_block_index: u64,
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// The append-only ledger: an ordered block sequence with block `i`
/// stored at position `i`, a fixed sealing difficulty, and secondary
/// lookup indexes maintained alongside.
#[derive(Debug, Clone)]
pub struct Chain {
    blocks: Vec<Block>,
    sealer: Sealer,
    /// content hash -> index of the first block containing it.
    content_index: HashMap<String, usize>,
    /// certificate id -> ascending indices of containing blocks.
    certificate_index: HashMap<String, Vec<usize>>,
}

impl Chain {
    /// Create a chain with a freshly sealed genesis block.
    ///
    /// # Errors
    ///
    /// [`SealError::DifficultyTooHigh`] (via [`ChainError::Seal`]) for a
    /// difficulty above the supported ceiling.
    pub fn new(difficulty: u32) -> Result<Self, ChainError> {
        let sealer = Sealer::new(difficulty)?;
        let mut chain = Self {
            blocks: Vec::new(),
            sealer,
            content_index: HashMap::new(),
            certificate_index: HashMap::new(),
        };

        let mut genesis = Block::new(0, 0, genesis_payload(), GENESIS_PREVIOUS_HASH.to_string());
        chain.sealer.seal(&mut genesis)?;
        tracing::info!(hash = %genesis.short_hash(), difficulty, "genesis block sealed");
        chain.blocks.push(genesis);
        Ok(chain)
    }

    /// Rebuild a chain from previously stored blocks (snapshot restore).
    ///
    /// Recreates the lookup indexes from scratch. Does NOT verify
    /// integrity — the store does that and decides what a violation
    /// means for the load.
    ///
    /// # Errors
    ///
    /// [`ChainError::EmptyChain`] for an empty block list, or a sealer
    /// configuration error for an out-of-range difficulty.
    pub fn from_blocks(difficulty: u32, blocks: Vec<Block>) -> Result<Self, ChainError> {
        if blocks.is_empty() {
            return Err(ChainError::EmptyChain);
        }
        let sealer = Sealer::new(difficulty)?;
        let mut chain = Self {
            blocks: Vec::new(),
            sealer,
            content_index: HashMap::new(),
            certificate_index: HashMap::new(),
        };
        for block in blocks {
            let position = chain.blocks.len();
            chain.index_block(&block, position);
            chain.blocks.push(block);
        }
        Ok(chain)
    }

    // -- Accessors ----------------------------------------------------------

    /// Number of blocks, genesis included.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always `false` for a constructed chain; present for completeness.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The chain's sealing difficulty.
    pub fn difficulty(&self) -> u32 {
        self.sealer.difficulty()
    }

    /// All blocks in order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// The genesis block.
    ///
    /// # Errors
    ///
    /// [`ChainError::EmptyChain`] — unreachable via public construction.
    pub fn genesis(&self) -> Result<&Block, ChainError> {
        self.blocks.first().ok_or(ChainError::EmptyChain)
    }

    /// The most recently appended block.
    ///
    /// # Errors
    ///
    /// [`ChainError::EmptyChain`] — unreachable via public construction.
    pub fn latest(&self) -> Result<&Block, ChainError> {
        self.blocks.last().ok_or(ChainError::EmptyChain)
    }

    // -- Mutation -----------------------------------------------------------

    /// Construct, seal, link, and store a new block carrying `payload`.
    ///
    /// The sole mutation entry point: index is the current length,
    /// timestamp is now, `previous_hash` is the latest block's hash.
    /// Sealing blocks the calling thread until a qualifying nonce is
    /// found. Returns the sealed block and the seal report.
    pub fn append(&mut self, payload: Value) -> Result<(&Block, SealReport), ChainError> {
        let previous_hash = self.latest()?.hash.clone();
        let index = self.blocks.len();
        let timestamp = Utc::now().timestamp_millis() as u64;

        let mut block = Block::new(index as u64, timestamp, payload, previous_hash);
        let report = self.sealer.seal(&mut block)?;

        self.index_block(&block, index);
        self.blocks.push(block);
        tracing::info!(
            index,
            attempts = report.attempts,
            hash = %self.blocks[index].short_hash(),
            "block appended"
        );
        Ok((&self.blocks[index], report))
    }

    /// Feed one block into the lookup indexes. `position` is where the
    /// block will sit in `blocks`.
    fn index_block(&mut self, block: &Block, position: usize) {
        let Some(tx) = registration_transaction(&block.payload) else {
            return;
        };
        if let Some(content_hash) = transaction_str(tx, "hash") {
            // First registration wins; later duplicates keep scan-order
            // tie semantics.
            self.content_index
                .entry(content_hash.to_string())
                .or_insert(position);
        }
        if let Some(certificate_id) = transaction_str(tx, "certificate_id") {
            self.certificate_index
                .entry(certificate_id.to_string())
                .or_default()
                .push(position);
        }
    }

    // -- Integrity ----------------------------------------------------------

    /// Verify the whole chain: for every block after genesis, recompute
    /// its hash and check the link to its predecessor. Short-circuits at
    /// the first failure, reporting its index.
    pub fn verify_integrity(&self) -> Result<(), IntegrityError> {
        for index in 1..self.blocks.len() {
            let current = &self.blocks[index];
            let previous = &self.blocks[index - 1];

            if !current.validate() {
                return Err(IntegrityError {
                    index: index as u64,
                    violation: IntegrityViolation::HashMismatch,
                });
            }
            if current.previous_hash != previous.hash {
                return Err(IntegrityError {
                    index: index as u64,
                    violation: IntegrityViolation::BrokenLink,
                });
            }
        }
        Ok(())
    }

    /// Boolean convenience over [`Chain::verify_integrity`].
    pub fn is_valid(&self) -> bool {
        self.verify_integrity().is_ok()
    }

    // -- Certificate queries ------------------------------------------------

    /// Locate the first (oldest) registration carrying `content_hash`.
    pub fn find_by_content_hash(&self, content_hash: &str) -> Option<TransactionMatch> {
        let position = *self.content_index.get(content_hash)?;
        self.match_at(position)
    }

    /// All registrations for `certificate_id`, earliest first.
    pub fn history(&self, certificate_id: &str) -> Vec<TransactionMatch> {
        let Some(positions) = self.certificate_index.get(certificate_id) else {
            return Vec::new();
        };
        positions
            .iter()
            .filter_map(|&position| self.match_at(position))
            .collect()
    }

    /// Up to `limit` certificate registrations, most recent first.
    pub fn recent(&self, limit: usize) -> Vec<RecentEntry> {
        let mut entries = Vec::new();
        for block in self.blocks.iter().rev() {
            if entries.len() >= limit {
                break;
            }
            let Some(tx) = registration_transaction(&block.payload) else {
                continue;
            };
            entries.push(RecentEntry {
                block_index: block.index,
                timestamp: rfc3339_from_millis(block.timestamp),
                certificate_number: transaction_str(tx, "certificate_number")
                    .unwrap_or("Unknown")
                    .to_string(),
                certificate_type: transaction_str(tx, "certificate_type")
                    .unwrap_or("Unknown")
                    .to_string(),
                status: transaction_str(tx, "verification_status")
                    .unwrap_or(STATUS_PENDING)
                    .to_string(),
                block_hash: block.short_hash(),
            });
        }
        entries
    }

    /// Aggregate statistics: one pass over the chain plus a full
    /// integrity verification.
    pub fn stats(&self) -> ChainStats {
        let mut total_certificates = 0u64;
        let mut verified_certificates = 0u64;

        for block in &self.blocks {
            let Some(tx) = registration_transaction(&block.payload) else {
                continue;
            };
            total_certificates += 1;
            if transaction_str(tx, "verification_status") == Some(STATUS_VERIFIED) {
                verified_certificates += 1;
            }
        }

        let (latest_block_hash, latest_block_index) = match self.latest() {
            Ok(block) => (block.hash.clone(), block.index),
            Err(_) => (String::new(), 0),
        };

        ChainStats {
            total_blocks: self.blocks.len() as u64,
            total_certificates,
            verified_certificates,
            chain_valid: self.is_valid(),
            difficulty: self.difficulty(),
            latest_block_hash,
            latest_block_index,
        }
    }

    /// Build a [`TransactionMatch`] for the block at `position`, if it
    /// holds a registration.
    fn match_at(&self, position: usize) -> Option<TransactionMatch> {
        let block = self.blocks.get(position)?;
        let tx = registration_transaction(&block.payload)?;
        Some(TransactionMatch {
            block_index: block.index,
            block_hash: block.hash.clone(),
            timestamp: block.timestamp,
            transaction: tx.clone(),
        })
    }

    #[cfg(test)]
    pub(crate) fn blocks_mut_for_tampering(&mut self) -> &mut Vec<Block> {
        &mut self.blocks
    }
}

/// The fixed genesis payload. No external input, no clock — fully
/// deterministic.
fn genesis_payload() -> Value {
    json!({
        "type": "genesis",
        "message": GENESIS_MESSAGE,
        "creator": GENESIS_CREATOR,
    })
}

/// Millisecond unix timestamp as an RFC 3339 string. Out-of-range values
/// (which cannot come from `append`) render as an empty string rather
/// than panicking.
pub(crate) fn rfc3339_from_millis(millis: u64) -> String {
    Utc.timestamp_millis_opt(millis as i64)
        .single()
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{content_hash, registration_payload, CertificateRecord};
    use chrono::Duration;

    /// Difficulty 1 keeps tests fast (~16 hash computations per seal)
    /// while still exercising a real proof-of-work search.
    const TEST_DIFFICULTY: u32 = 1;

    fn record(number: &str, id: &str, status: &str) -> CertificateRecord {
        CertificateRecord {
            certificate_id: Some(id.into()),
            certificate_number: Some(number.into()),
            certificate_type: Some("diploma".into()),
            owner_id: Some("U1".into()),
            verification_status: Some(status.into()),
            confidence_score: Some(80),
            file_hash: Some("abc123".into()),
            ..Default::default()
        }
    }

    /// Registers a record and returns its content hash.
    fn register(chain: &mut Chain, rec: &CertificateRecord, at: chrono::DateTime<Utc>) -> String {
        let hash = content_hash(rec, at);
        let payload = registration_payload(rec, &hash, at);
        chain.append(payload).expect("append must succeed");
        hash
    }

    #[test]
    fn new_chain_holds_a_sealed_genesis() {
        let chain = Chain::new(TEST_DIFFICULTY).expect("chain");
        assert_eq!(chain.len(), 1);

        let genesis = chain.genesis().expect("genesis exists");
        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.previous_hash, GENESIS_PREVIOUS_HASH);
        assert!(genesis.meets_difficulty(TEST_DIFFICULTY));
        assert!(genesis.validate());
    }

    #[test]
    fn genesis_is_deterministic_across_chains() {
        let a = Chain::new(TEST_DIFFICULTY).expect("chain a");
        let b = Chain::new(TEST_DIFFICULTY).expect("chain b");
        assert_eq!(
            a.genesis().unwrap().hash,
            b.genesis().unwrap().hash,
            "same difficulty must produce the same genesis"
        );
    }

    #[test]
    fn append_links_seals_and_grows_by_one() {
        let mut chain = Chain::new(TEST_DIFFICULTY).expect("chain");
        let genesis_hash = chain.genesis().unwrap().hash.clone();

        let (block, report) = chain
            .append(json!({ "transaction_type": "certificate_registration" }))
            .expect("append");
        assert_eq!(block.index, 1);
        assert_eq!(block.previous_hash, genesis_hash);
        assert!(block.meets_difficulty(TEST_DIFFICULTY));
        assert!(report.elapsed.as_nanos() > 0 || report.attempts == 0);

        assert_eq!(chain.len(), 2);
        assert!(chain.is_valid());
        assert_eq!(chain.latest().unwrap().index, 1);
    }

    #[test]
    fn appended_indices_match_positions() {
        let mut chain = Chain::new(0).expect("chain");
        for _ in 0..4 {
            chain.append(json!({})).expect("append");
        }
        for (position, block) in chain.blocks().iter().enumerate() {
            assert_eq!(block.index as usize, position);
        }
        assert!(chain.is_valid());
    }

    #[test]
    fn tampering_with_a_stored_payload_is_detected_at_its_index() {
        let mut chain = Chain::new(TEST_DIFFICULTY).expect("chain");
        let at = Utc::now();
        register(&mut chain, &record("C-1", "cert-1", "verified"), at);
        register(&mut chain, &record("C-2", "cert-2", "verified"), at);
        assert!(chain.is_valid());

        chain.blocks_mut_for_tampering()[1].payload = json!({ "forged": true });

        let err = chain.verify_integrity().expect_err("must detect tampering");
        assert_eq!(err.index, 1);
        assert_eq!(err.violation, IntegrityViolation::HashMismatch);
        assert!(!chain.is_valid());
    }

    #[test]
    fn tampering_plus_rehash_breaks_the_successor_link() {
        let mut chain = Chain::new(TEST_DIFFICULTY).expect("chain");
        let at = Utc::now();
        register(&mut chain, &record("C-1", "cert-1", "verified"), at);
        register(&mut chain, &record("C-2", "cert-2", "verified"), at);

        // An attacker who re-hashes the tampered block just moves the
        // breakage one block forward.
        let blocks = chain.blocks_mut_for_tampering();
        blocks[1].payload = json!({ "forged": true });
        blocks[1].refresh_hash();

        let err = chain.verify_integrity().expect_err("must detect relink");
        assert_eq!(err.index, 2);
        assert_eq!(err.violation, IntegrityViolation::BrokenLink);
    }

    #[test]
    fn find_by_content_hash_misses_unregistered_hashes() {
        let chain = Chain::new(TEST_DIFFICULTY).expect("chain");
        assert!(chain.find_by_content_hash("0".repeat(64).as_str()).is_none());
    }

    #[test]
    fn find_by_content_hash_returns_the_exact_block() {
        let mut chain = Chain::new(TEST_DIFFICULTY).expect("chain");
        let at = Utc::now();
        let first = register(&mut chain, &record("C-1", "cert-1", "verified"), at);
        let second = register(&mut chain, &record("C-2", "cert-2", "pending"), at);

        let found = chain.find_by_content_hash(&second).expect("must find");
        assert_eq!(found.block_index, 2);
        assert_eq!(found.block_hash, chain.blocks()[2].hash);
        assert_eq!(
            transaction_str(&found.transaction, "certificate_number"),
            Some("C-2")
        );

        let found_first = chain.find_by_content_hash(&first).expect("must find");
        assert_eq!(found_first.block_index, 1);
    }

    #[test]
    fn duplicate_content_hashes_resolve_to_the_oldest_block() {
        let mut chain = Chain::new(TEST_DIFFICULTY).expect("chain");
        let at = Utc::now();
        let rec = record("C-1", "cert-1", "verified");
        // Force the same content hash into two blocks by reusing the
        // instant (the codec would normally fingerprint each call).
        let hash = content_hash(&rec, at);
        chain
            .append(registration_payload(&rec, &hash, at))
            .expect("append");
        chain
            .append(registration_payload(&rec, &hash, at))
            .expect("append");

        let found = chain.find_by_content_hash(&hash).expect("must find");
        assert_eq!(found.block_index, 1, "oldest registration wins");
    }

    #[test]
    fn history_returns_all_matches_in_ascending_order() {
        let mut chain = Chain::new(TEST_DIFFICULTY).expect("chain");
        let at = Utc::now();
        register(&mut chain, &record("C-1", "cert-same", "pending"), at);
        register(&mut chain, &record("C-1b", "cert-other", "pending"), at);
        register(
            &mut chain,
            &record("C-1", "cert-same", "verified"),
            at + Duration::seconds(5),
        );

        let history = chain.history("cert-same");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].block_index, 1);
        assert_eq!(history[1].block_index, 3);
        assert_eq!(
            transaction_str(&history[1].transaction, "verification_status"),
            Some("verified")
        );

        assert!(chain.history("cert-unseen").is_empty());
    }

    #[test]
    fn recent_lists_newest_first_and_skips_genesis() {
        let mut chain = Chain::new(TEST_DIFFICULTY).expect("chain");
        let at = Utc::now();
        for n in 1..=3 {
            register(&mut chain, &record(&format!("C-{n}"), "cert", "pending"), at);
        }

        let recent = chain.recent(10);
        assert_eq!(recent.len(), 3, "genesis must not appear");
        assert_eq!(recent[0].block_index, 3);
        assert_eq!(recent[0].certificate_number, "C-3");
        assert_eq!(recent[2].block_index, 1);
        assert!(recent[0].block_hash.ends_with("..."));

        let capped = chain.recent(2);
        assert_eq!(capped.len(), 2);
        assert_eq!(capped[0].block_index, 3);
        assert_eq!(capped[1].block_index, 2);
    }

    #[test]
    fn stats_count_the_verified_literal_only() {
        let mut chain = Chain::new(TEST_DIFFICULTY).expect("chain");
        let at = Utc::now();
        register(&mut chain, &record("C-1", "a", "verified"), at);
        register(&mut chain, &record("C-2", "b", "VALID"), at);
        register(&mut chain, &record("C-3", "c", "pending"), at);

        let stats = chain.stats();
        assert_eq!(stats.total_blocks, 4);
        assert_eq!(stats.total_certificates, 3);
        assert_eq!(stats.verified_certificates, 1, "only the exact literal counts");
        assert!(stats.chain_valid);
        assert_eq!(stats.difficulty, TEST_DIFFICULTY);
        assert_eq!(stats.latest_block_index, 3);
        assert_eq!(stats.latest_block_hash, chain.latest().unwrap().hash);
    }

    #[test]
    fn from_blocks_rebuilds_indexes() {
        let mut chain = Chain::new(TEST_DIFFICULTY).expect("chain");
        let at = Utc::now();
        let hash = register(&mut chain, &record("C-1", "cert-1", "verified"), at);

        let restored =
            Chain::from_blocks(TEST_DIFFICULTY, chain.blocks().to_vec()).expect("restore");
        assert_eq!(restored.len(), chain.len());
        assert!(restored.find_by_content_hash(&hash).is_some());
        assert_eq!(restored.history("cert-1").len(), 1);
        assert!(restored.is_valid());
    }

    #[test]
    fn from_blocks_rejects_an_empty_list() {
        let err = Chain::from_blocks(TEST_DIFFICULTY, Vec::new()).expect_err("must reject");
        assert!(matches!(err, ChainError::EmptyChain));
    }

    #[test]
    fn rfc3339_roundtrips_block_timestamps() {
        let rendered = rfc3339_from_millis(1_700_000_000_000);
        assert!(rendered.starts_with("2023-11-14T"));
        // Nonsense input degrades to empty, not a panic.
        assert_eq!(rfc3339_from_millis(u64::MAX), "");
    }
}
