//! # Proof-of-Work Sealer
//!
//! The iterative search that turns a freshly-constructed block into a
//! sealed one: bump the nonce, recompute the hash, repeat until the hash
//! carries the required number of leading zero hex characters.
//!
//! The sealer is deliberately separate from [`Block`]'s data shape — the
//! block knows how to hash itself, the sealer knows when to stop. The
//! search is deterministic (nonce 0, 1, 2, …), so sealing the same block
//! twice from the same starting state lands on the same nonce. Expected
//! cost is 16^difficulty hash computations.
//!
//! Two guard rails keep a bad configuration from hanging the writer
//! thread forever: difficulties above [`MAX_DIFFICULTY`] are rejected at
//! construction, and the search gives up once an attempt budget is spent.
//! The budget is sized so that exhausting it legitimately is not a thing
//! that happens in this universe (miss probability under e^-4096).

use std::time::{Duration, Instant};

use crate::block::Block;
use crate::config::{MAX_DIFFICULTY, SEAL_BUDGET_MULTIPLIER};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by sealer construction or the sealing loop.
#[derive(Debug, thiserror::Error)]
pub enum SealError {
    /// The configured difficulty exceeds the supported ceiling. This is a
    /// fatal configuration error — there is no difficulty-7 use case, only
    /// a typo.
    #[error("difficulty {requested} exceeds the maximum of {max}")]
    DifficultyTooHigh { requested: u32, max: u32 },

    /// The attempt budget ran out before a qualifying nonce was found.
    #[error("sealing gave up after {attempts} attempts at difficulty {difficulty}")]
    AttemptsExhausted { difficulty: u32, attempts: u64 },
}

// ---------------------------------------------------------------------------
// Sealer
// ---------------------------------------------------------------------------

/// Outcome of a successful seal, for logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SealReport {
    /// Number of nonce increments performed. Zero when the construction
    /// hash already satisfied the difficulty (always the case at 0).
    pub attempts: u64,
    /// Wall-clock time spent in the search loop.
    pub elapsed: Duration,
}

/// The proof-of-work search. Cheap to construct, cheap to copy; one per
/// chain, configured once with the chain's difficulty.
#[derive(Debug, Clone, Copy)]
pub struct Sealer {
    difficulty: u32,
    attempt_budget: u64,
}

impl Sealer {
    /// Create a sealer for the given difficulty with the default attempt
    /// budget (`16^difficulty * SEAL_BUDGET_MULTIPLIER`).
    ///
    /// # Errors
    ///
    /// [`SealError::DifficultyTooHigh`] above [`MAX_DIFFICULTY`].
    pub fn new(difficulty: u32) -> Result<Self, SealError> {
        Self::with_attempt_budget(difficulty, default_attempt_budget(difficulty))
    }

    /// Create a sealer with an explicit attempt budget. Mainly for tests
    /// that want to watch the budget run out without waiting for the
    /// heat death of the universe.
    pub fn with_attempt_budget(difficulty: u32, attempt_budget: u64) -> Result<Self, SealError> {
        if difficulty > MAX_DIFFICULTY {
            return Err(SealError::DifficultyTooHigh {
                requested: difficulty,
                max: MAX_DIFFICULTY,
            });
        }
        Ok(Self {
            difficulty,
            attempt_budget,
        })
    }

    /// The difficulty this sealer enforces.
    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Mutate `block.nonce` until the block's hash satisfies the
    /// difficulty predicate.
    ///
    /// Deterministic: the nonce sequence is 0, 1, 2, … from whatever the
    /// block currently holds, so the same starting state always lands on
    /// the same winning nonce. Blocks whose construction hash already
    /// qualifies are returned untouched with zero attempts.
    ///
    /// # Errors
    ///
    /// [`SealError::AttemptsExhausted`] once the budget is spent. The
    /// block is left at its last tried nonce with a consistent hash.
    pub fn seal(&self, block: &mut Block) -> Result<SealReport, SealError> {
        let started = Instant::now();
        let mut attempts: u64 = 0;

        while !block.meets_difficulty(self.difficulty) {
            if attempts >= self.attempt_budget {
                return Err(SealError::AttemptsExhausted {
                    difficulty: self.difficulty,
                    attempts,
                });
            }
            block.nonce += 1;
            block.refresh_hash();
            attempts += 1;
        }

        let report = SealReport {
            attempts,
            elapsed: started.elapsed(),
        };
        tracing::debug!(
            index = block.index,
            hash = %block.short_hash(),
            attempts = report.attempts,
            "block sealed"
        );
        Ok(report)
    }
}

/// Default attempt budget for a difficulty: expected cost times a margin
/// large enough that running out means the hash function is broken.
fn default_attempt_budget(difficulty: u32) -> u64 {
    16u64
        .saturating_pow(difficulty)
        .saturating_mul(SEAL_BUDGET_MULTIPLIER)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GENESIS_PREVIOUS_HASH;
    use serde_json::json;

    fn unsealed_block() -> Block {
        Block::new(
            1,
            1_700_000_000_000,
            json!({ "transaction_type": "certificate_registration" }),
            GENESIS_PREVIOUS_HASH.into(),
        )
    }

    #[test]
    fn difficulty_zero_seals_immediately() {
        let sealer = Sealer::new(0).expect("difficulty 0 is valid");
        let mut block = unsealed_block();
        let before = block.clone();

        let report = sealer.seal(&mut block).expect("must seal");
        assert_eq!(report.attempts, 0);
        assert_eq!(block, before, "difficulty 0 must not touch the block");
    }

    #[test]
    fn sealed_block_satisfies_difficulty_and_validates() {
        let sealer = Sealer::new(1).expect("difficulty 1 is valid");
        let mut block = unsealed_block();

        sealer.seal(&mut block).expect("must seal");
        assert!(block.hash.starts_with('0'));
        assert!(block.meets_difficulty(1));
        assert!(block.validate(), "stored hash must match recomputed hash");
    }

    #[test]
    fn sealing_is_deterministic() {
        let sealer = Sealer::new(2).expect("difficulty 2 is valid");
        let mut a = unsealed_block();
        let mut b = unsealed_block();

        sealer.seal(&mut a).expect("must seal");
        sealer.seal(&mut b).expect("must seal");
        assert_eq!(a.nonce, b.nonce);
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn resealing_a_sealed_block_is_a_noop() {
        let sealer = Sealer::new(1).expect("difficulty 1 is valid");
        let mut block = unsealed_block();
        sealer.seal(&mut block).expect("must seal");
        let sealed = block.clone();

        let report = sealer.seal(&mut block).expect("must seal again");
        assert_eq!(report.attempts, 0);
        assert_eq!(block, sealed);
    }

    #[test]
    fn difficulty_above_cap_is_rejected() {
        let err = Sealer::new(MAX_DIFFICULTY + 1).expect_err("must reject");
        assert!(matches!(err, SealError::DifficultyTooHigh { .. }));
    }

    #[test]
    fn exhausted_budget_reports_attempts() {
        // A 2-attempt budget at difficulty 4 all but guarantees failure.
        let sealer = Sealer::with_attempt_budget(4, 2).expect("cap is fine");
        let mut block = unsealed_block();
        assert!(
            !block.meets_difficulty(4),
            "test premise: construction hash must not already qualify"
        );

        let err = sealer.seal(&mut block).expect_err("budget must run out");
        match err {
            SealError::AttemptsExhausted {
                difficulty,
                attempts,
            } => {
                assert_eq!(difficulty, 4);
                assert_eq!(attempts, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        // The block is abandoned mid-search but still self-consistent.
        assert!(block.validate());
    }

    #[test]
    fn default_budget_scales_with_difficulty() {
        assert!(default_attempt_budget(2) > default_attempt_budget(1));
        // No overflow at the cap.
        assert!(default_attempt_budget(MAX_DIFFICULTY) > 0);
    }
}
