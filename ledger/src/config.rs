//! # Ledger Configuration & Constants
//!
//! Every magic number in Attest lives here. If you're hardcoding a constant
//! somewhere else, you're doing it wrong and you owe the team coffee.
//!
//! Several of these values participate in hashing (the genesis payload, the
//! sentinel, the transaction-type tag). Changing them invalidates every
//! snapshot ever written, so treat this file as consensus-critical even
//! though there is no network to disagree with you.

// ---------------------------------------------------------------------------
// Hashing & Chain Linkage
// ---------------------------------------------------------------------------

/// Hex digest length of SHA-256. Every block hash and content hash is
/// exactly this many characters.
pub const HASH_HEX_LENGTH: usize = 64;

/// The `previous_hash` of the genesis block: 64 zero characters. There is
/// no block before the first one, and this is how we spell that.
pub const GENESIS_PREVIOUS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Message embedded in the genesis payload — the ledger's birth
/// certificate. Fixed so that genesis is deterministic: two ledgers
/// created at the same difficulty agree on block 0 byte for byte.
pub const GENESIS_MESSAGE: &str = "Attest certificate-verification ledger";

/// The `creator` field of the genesis payload.
pub const GENESIS_CREATOR: &str = "system";

// ---------------------------------------------------------------------------
// Proof-of-Work
// ---------------------------------------------------------------------------

/// Default sealing difficulty: number of leading zero hex characters a
/// block hash must carry. Expected cost is 16^difficulty attempts, so 2
/// means ~256 hash computations per block — instant, but enough to make
/// tampering with a stored block annoying.
pub const DEFAULT_DIFFICULTY: u32 = 2;

/// Hard ceiling on difficulty. 16^6 is ~16.7M expected attempts per seal,
/// already several seconds of single-threaded SHA-256. Anything above this
/// is a configuration error, not a use case, and the sealer refuses it.
pub const MAX_DIFFICULTY: u32 = 6;

/// Attempt-budget multiplier: the sealer gives up after
/// `16^difficulty * SEAL_BUDGET_MULTIPLIER` nonces. The probability of a
/// legitimate seal missing that budget is below e^-4096 — if we ever hit
/// it, the hash function is broken, not unlucky.
pub const SEAL_BUDGET_MULTIPLIER: u64 = 4096;

// ---------------------------------------------------------------------------
// Transaction Payload Vocabulary
// ---------------------------------------------------------------------------

/// Payload tag marking a block as a certificate registration. Query
/// operations only look inside blocks carrying this tag.
pub const TX_TYPE_CERTIFICATE_REGISTRATION: &str = "certificate_registration";

/// Inner transaction type for certificate-verification events.
pub const TX_KIND_CERTIFICATE_VERIFICATION: &str = "certificate_verification";

/// The status literal that `stats()` counts as verified. Matching is
/// exact: `"VALID"`, `"Verified"` and `"pending"` do not count. This
/// asymmetry is inherited behavior and preserved deliberately.
pub const STATUS_VERIFIED: &str = "verified";

/// Default verification status stamped on records that arrive without one.
pub const STATUS_PENDING: &str = "pending";

/// Default owner name for records that arrive without one.
pub const UNKNOWN_OWNER_NAME: &str = "Unknown";

// ---------------------------------------------------------------------------
// Admission Policy
// ---------------------------------------------------------------------------

/// Minimum confidence score (0–100) a certificate record must carry to
/// pass the default admission policy.
pub const MIN_CONFIDENCE_SCORE: u32 = 60;

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// On-disk snapshot schema version. Bump on any breaking change to the
/// snapshot layout; the store rejects versions it does not know.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Default snapshot filename inside a node's data directory.
pub const SNAPSHOT_FILENAME: &str = "ledger.snapshot.json";

// ---------------------------------------------------------------------------
// Query Defaults
// ---------------------------------------------------------------------------

/// Default number of entries returned by the recent-registrations query.
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// Length of the truncated block-hash prefix in recent-entry summaries.
pub const SUMMARY_HASH_PREFIX_LEN: usize = 16;

// ---------------------------------------------------------------------------
// Network Defaults (node binary)
// ---------------------------------------------------------------------------

/// Default REST API port.
pub const DEFAULT_RPC_PORT: u16 = 9650;

/// Default Prometheus metrics port.
pub const DEFAULT_METRICS_PORT: u16 = 9651;
