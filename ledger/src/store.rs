//! # Snapshot Store
//!
//! Durable persistence for the ledger. The chain is saved as a whole —
//! one snapshot per save, loaded once at startup — behind the
//! [`SnapshotStore`] trait so the service layer never knows what disk
//! format (or disk) it is talking to.
//!
//! ## On-disk schema
//!
//! [`JsonSnapshotStore`] writes an explicit, versioned, language-neutral
//! JSON document:
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "difficulty": 2,
//!   "blocks": [ { "index": 0, "timestamp": 0, "payload": {…},
//!                 "previous_hash": "00…0", "nonce": 41, "hash": "0a…" }, … ]
//! }
//! ```
//!
//! Nothing about the schema assumes a Rust reader: field names are
//! explicit, hashes are hex strings, timestamps are integers. Unknown
//! `format_version`s are rejected, not guessed at.
//!
//! Writes go to a sibling temp file first and land via `rename`, so a
//! crash mid-save leaves the previous snapshot intact. Loads verify the
//! full chain integrity — a snapshot that fails verification is corrupt,
//! and corruption is terminal: reported, never repaired.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::chain::{Chain, ChainError, IntegrityError};
use crate::config::SNAPSHOT_FORMAT_VERSION;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while loading or saving a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("unsupported snapshot format version {found} (this build reads {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// The snapshot parsed but its chain fails integrity verification.
    #[error("snapshot is corrupt: {0}")]
    Corrupt(#[from] IntegrityError),

    /// The snapshot parsed but cannot be rebuilt into a chain (empty
    /// block list, out-of-range difficulty).
    #[error("snapshot holds an unusable chain: {0}")]
    InvalidChain(#[from] ChainError),
}

// ---------------------------------------------------------------------------
// SnapshotStore
// ---------------------------------------------------------------------------

/// The persistence seam. `load` is called once at startup (load-or-
/// create); `save` after every successful append. Implementations must
/// tolerate being called from behind a lock — keep `save` bounded.
pub trait SnapshotStore: Send + Sync {
    /// Read the stored chain, or `None` if no snapshot exists yet.
    fn load(&self) -> Result<Option<Chain>, StoreError>;

    /// Persist the chain, replacing any previous snapshot.
    fn save(&self, chain: &Chain) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// JSON snapshot store
// ---------------------------------------------------------------------------

/// Owned form of the on-disk document, used for reading.
#[derive(Debug, Deserialize)]
struct Snapshot {
    format_version: u32,
    difficulty: u32,
    blocks: Vec<Block>,
}

/// Borrowed form of the on-disk document, used for writing without
/// cloning the block list.
#[derive(Debug, Serialize)]
struct SnapshotRef<'a> {
    format_version: u32,
    difficulty: u32,
    blocks: &'a [Block],
}

/// File-backed [`SnapshotStore`] writing the versioned JSON schema.
#[derive(Debug, Clone)]
pub struct JsonSnapshotStore {
    path: PathBuf,
}

impl JsonSnapshotStore {
    /// Store backed by the given snapshot file. The file need not exist
    /// yet; parent directories must.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The snapshot file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling path used for the write-then-rename dance.
    fn staging_path(&self) -> PathBuf {
        let mut staged = self.path.as_os_str().to_owned();
        staged.push(".tmp");
        PathBuf::from(staged)
    }
}

impl SnapshotStore for JsonSnapshotStore {
    fn load(&self) -> Result<Option<Chain>, StoreError> {
        let raw = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let snapshot: Snapshot = serde_json::from_slice(&raw)?;
        if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(StoreError::UnsupportedVersion {
                found: snapshot.format_version,
                supported: SNAPSHOT_FORMAT_VERSION,
            });
        }

        let chain = Chain::from_blocks(snapshot.difficulty, snapshot.blocks)?;
        chain.verify_integrity()?;

        tracing::info!(
            path = %self.path.display(),
            blocks = chain.len(),
            "snapshot loaded"
        );
        Ok(Some(chain))
    }

    fn save(&self, chain: &Chain) -> Result<(), StoreError> {
        let document = SnapshotRef {
            format_version: SNAPSHOT_FORMAT_VERSION,
            difficulty: chain.difficulty(),
            blocks: chain.blocks(),
        };
        let encoded = serde_json::to_vec_pretty(&document)?;

        let staged = self.staging_path();
        fs::write(&staged, &encoded)?;
        fs::rename(&staged, &self.path)?;

        tracing::debug!(
            path = %self.path.display(),
            blocks = chain.len(),
            bytes = encoded.len(),
            "snapshot saved"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn populated_chain() -> Chain {
        let mut chain = Chain::new(1).expect("chain");
        chain
            .append(json!({ "transaction_type": "certificate_registration",
                            "transaction": { "certificate_id": "cert-1", "hash": "aa" } }))
            .expect("append");
        chain
    }

    fn store_in(dir: &tempfile::TempDir) -> JsonSnapshotStore {
        JsonSnapshotStore::new(dir.path().join("ledger.snapshot.json"))
    }

    #[test]
    fn load_returns_none_before_first_save() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);
        assert!(store.load().expect("load").is_none());
    }

    #[test]
    fn save_then_load_roundtrips_the_chain() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);
        let chain = populated_chain();

        store.save(&chain).expect("save");
        let restored = store.load().expect("load").expect("snapshot exists");

        assert_eq!(restored.len(), chain.len());
        assert_eq!(restored.difficulty(), chain.difficulty());
        assert_eq!(restored.blocks(), chain.blocks());
        assert!(restored.is_valid());
        // Indexes are rebuilt, not stored.
        assert!(restored.find_by_content_hash("aa").is_some());
    }

    #[test]
    fn save_replaces_the_previous_snapshot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);
        let mut chain = populated_chain();

        store.save(&chain).expect("first save");
        chain.append(json!({})).expect("append");
        store.save(&chain).expect("second save");

        let restored = store.load().expect("load").expect("snapshot exists");
        assert_eq!(restored.len(), 3);
        // No staging residue.
        assert!(!store.staging_path().exists());
    }

    #[test]
    fn tampered_snapshot_is_rejected_as_corrupt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);
        store.save(&populated_chain()).expect("save");

        // Flip a payload field directly in the file.
        let text = fs::read_to_string(store.path()).expect("read");
        let tampered = text.replace("certificate_registration", "certificate_forgery");
        fs::write(store.path(), tampered).expect("write");

        let err = store.load().expect_err("must reject");
        assert!(matches!(err, StoreError::Corrupt(_)));
    }

    #[test]
    fn unknown_format_version_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);
        store.save(&populated_chain()).expect("save");

        let text = fs::read_to_string(store.path()).expect("read");
        let bumped = text.replace("\"format_version\": 1", "\"format_version\": 99");
        fs::write(store.path(), bumped).expect("write");

        let err = store.load().expect_err("must reject");
        match err {
            StoreError::UnsupportedVersion { found, supported } => {
                assert_eq!(found, 99);
                assert_eq!(supported, SNAPSHOT_FORMAT_VERSION);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn garbage_on_disk_is_an_encoding_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);
        fs::write(store.path(), b"not json at all").expect("write");

        let err = store.load().expect_err("must reject");
        assert!(matches!(err, StoreError::Encoding(_)));
    }

    #[test]
    fn empty_block_list_is_an_unusable_chain() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store_in(&dir);
        fs::write(
            store.path(),
            serde_json::to_vec(&json!({
                "format_version": SNAPSHOT_FORMAT_VERSION,
                "difficulty": 1,
                "blocks": [],
            }))
            .expect("encode"),
        )
        .expect("write");

        let err = store.load().expect_err("must reject");
        assert!(matches!(err, StoreError::InvalidChain(_)));
    }
}
