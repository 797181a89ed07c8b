// Copyright (c) 2026 Attest Labs. MIT License.
// See LICENSE for details.

//! # Attest Ledger — Core Library
//!
//! A tamper-evident, append-only ledger of certificate-verification
//! events. Every entry is bound to its predecessor by a SHA-256 hash
//! chain, and every block is sealed by a proof-of-work puzzle before it
//! is accepted. This is deliberately *not* a blockchain in the
//! distributed sense — there are no peers, no consensus, no forks. One
//! writer, one machine, one chain; the cryptography is there to make
//! after-the-fact tampering loud, not to coordinate strangers.
//!
//! ## Architecture
//!
//! The modules mirror the actual concerns of the ledger:
//!
//! - **block** — The atomic unit: payload, linkage, canonical hashing.
//! - **sealer** — The proof-of-work search, with guard rails.
//! - **chain** — Ordering, integrity verification, certificate queries.
//! - **transaction** — Canonical codec for certificate records.
//! - **policy** — Admission rules; what may enter the ledger.
//! - **store** — Versioned snapshot persistence behind a trait.
//! - **service** — The façade wiring policy, chain, and store together.
//! - **hash** — SHA-256-to-hex helpers everything above leans on.
//! - **config** — Every constant, in one place, with commentary.
//!
//! ## Design Philosophy
//!
//! 1. Hashes are recomputed, never trusted. Validation re-derives every
//!    digest from first principles.
//! 2. Append is the only mutation. There is no API for inserting,
//!    reordering, or deleting blocks, and no code path that repairs a
//!    broken chain — corruption is detected and reported, full stop.
//! 3. Rejections and failures are data, not exceptions. Policy verdicts
//!    and persistence errors ride back to the caller in structured
//!    results.

pub mod block;
pub mod chain;
pub mod config;
pub mod hash;
pub mod policy;
pub mod sealer;
pub mod service;
pub mod store;
pub mod transaction;

pub use block::Block;
pub use chain::{Chain, ChainError, ChainStats, IntegrityError, RecentEntry};
pub use policy::{AdmissionPolicy, PolicyVerdict, RulePolicy};
pub use sealer::{SealError, SealReport, Sealer};
pub use service::{LedgerService, RegisterOutcome, Registration, ServiceError};
pub use store::{JsonSnapshotStore, SnapshotStore, StoreError};
pub use transaction::CertificateRecord;
