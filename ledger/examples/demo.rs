//! Interactive CLI demo of the full Attest ledger lifecycle.
//!
//! Walks through ledger creation, certificate registration with
//! proof-of-work sealing, content-hash verification, history queries,
//! tamper detection, and snapshot persistence. The output uses ANSI
//! escape codes for colored, storytelling-style terminal rendering.
//!
//! Run with:
//!   cargo run --example demo --release

use std::time::Instant;

use attest_ledger::chain::Chain;
use attest_ledger::policy::RulePolicy;
use attest_ledger::service::RegisterOutcome;
use attest_ledger::{CertificateRecord, JsonSnapshotStore, LedgerService, Registration};

// ---------------------------------------------------------------------------
// ANSI color constants
// ---------------------------------------------------------------------------

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const MAGENTA: &str = "\x1b[35m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";

const BG_BLUE: &str = "\x1b[44m";

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

fn banner() {
    println!();
    println!(
        "{BG_BLUE}{BOLD}{WHITE}                                                                    {RESET}"
    );
    println!(
        "{BG_BLUE}{BOLD}{WHITE}    ATTEST LEDGER  --  Interactive Lifecycle Demo                   {RESET}"
    );
    println!(
        "{BG_BLUE}{BOLD}{WHITE}    Version 0.1.0  |  SHA-256 hash chain + proof-of-work seals      {RESET}"
    );
    println!(
        "{BG_BLUE}{BOLD}{WHITE}                                                                    {RESET}"
    );
    println!();
}

fn section(num: u32, title: &str) {
    println!();
    println!(
        "{BOLD}{CYAN}===[{YELLOW} Step {num} {CYAN}]=============================================================={RESET}"
    );
    println!("{BOLD}{WHITE}  {title}{RESET}");
    println!(
        "{CYAN}------------------------------------------------------------------------{RESET}"
    );
}

fn subsection(text: &str) {
    println!("{DIM}{CYAN}  >> {text}{RESET}");
}

fn success(text: &str) {
    println!("{GREEN}  [OK] {text}{RESET}");
}

fn failure(text: &str) {
    println!("{RED}  [!!] {text}{RESET}");
}

fn info(label: &str, value: &str) {
    println!("{WHITE}  {BOLD}{label}:{RESET} {YELLOW}{value}{RESET}");
}

fn timing(label: &str, elapsed: std::time::Duration) {
    let ms = elapsed.as_secs_f64() * 1000.0;
    println!("{DIM}{MAGENTA}  [{label}: {ms:.2} ms]{RESET}");
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn certificate(number: &str, id: &str, status: &str, confidence: u32) -> CertificateRecord {
    CertificateRecord {
        certificate_id: Some(id.into()),
        certificate_number: Some(number.into()),
        certificate_type: Some("diploma".into()),
        owner_id: Some("U-1001".into()),
        owner_name: Some("Ada Lovelace".into()),
        verification_status: Some(status.into()),
        verified_by: Some("registrar-01".into()),
        confidence_score: Some(confidence),
        file_hash: Some("3f1d7a0c9b2e".into()),
    }
}

fn must_register(service: &LedgerService, record: &CertificateRecord) -> Registration {
    match service.register(record).expect("registration call") {
        RegisterOutcome::Registered(reg) => reg,
        RegisterOutcome::Rejected { verdict } => {
            panic!("unexpected policy rejection: {:?}", verdict.rules_failed)
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    let demo_start = Instant::now();

    banner();

    // -----------------------------------------------------------------------
    // Step 1: Ledger Creation
    // -----------------------------------------------------------------------

    section(1, "Ledger Creation (difficulty 2)");
    subsection("Opening a fresh ledger with a sealed genesis block...");

    let dir = tempfile::tempdir().expect("tempdir");
    let snapshot_path = dir.path().join("ledger.snapshot.json");
    let store = JsonSnapshotStore::new(snapshot_path.clone());

    let t = Instant::now();
    let service = LedgerService::open(2, Box::new(store), Box::<RulePolicy>::default())
        .expect("ledger open");
    timing("genesis seal + snapshot", t.elapsed());

    let info_report = service.info().expect("ledger info");
    info("Genesis hash", &info_report.genesis_block.hash);
    info("Genesis nonce", &info_report.genesis_block.nonce.to_string());
    success("Genesis block sealed with two leading zero hex characters");

    // -----------------------------------------------------------------------
    // Step 2: Certificate Registration
    // -----------------------------------------------------------------------

    section(2, "Certificate Registration");
    subsection("Running three records through policy, codec, and sealer...");

    let t = Instant::now();
    let reg1 = must_register(&service, &certificate("C-100", "cert-100", "verified", 92));
    let reg2 = must_register(&service, &certificate("C-101", "cert-101", "pending", 71));
    let reg3 = must_register(&service, &certificate("C-100", "cert-100", "verified", 95));
    timing("3x seal at difficulty 2", t.elapsed());

    for (name, reg) in [("C-100", &reg1), ("C-101", &reg2), ("C-100 (again)", &reg3)] {
        println!(
            "  {GREEN}[SEALED]{RESET} {BOLD}{name:<14}{RESET} block #{} {DIM}hash {}... nonce {}{RESET}",
            reg.block_index,
            &reg.block_hash[..16],
            reg.seal_attempts,
        );
    }
    success("Every block hash opens with '00' -- the difficulty-2 seal");

    // -----------------------------------------------------------------------
    // Step 3: The Rejection Path
    // -----------------------------------------------------------------------

    section(3, "Admission Policy Rejection");
    subsection("Submitting a record with no file hash and confidence 12...");

    let mut bad = certificate("C-666", "cert-666", "pending", 12);
    bad.file_hash = None;
    match service.register(&bad).expect("registration call") {
        RegisterOutcome::Rejected { verdict } => {
            info("Verdict score", &format!("{:.1}%", verdict.score));
            for rule in &verdict.rules_failed {
                failure(&format!("rule failed: {rule}"));
            }
            success("Record refused; chain untouched");
        }
        RegisterOutcome::Registered(_) => unreachable!("the policy must reject this"),
    }

    // -----------------------------------------------------------------------
    // Step 4: Verification by Content Hash
    // -----------------------------------------------------------------------

    section(4, "Verification by Content Hash");
    subsection("Looking up the first registration's fingerprint...");

    let t = Instant::now();
    let report = service.verify(&reg1.content_hash);
    timing("indexed lookup", t.elapsed());

    info("Exists", &report.exists.to_string());
    info("Status", &report.verification_status);
    info("Block index", &format!("{:?}", report.block_index));
    assert!(report.exists && report.verified);

    let miss = service.verify(&"f".repeat(64));
    info("Unknown hash", &miss.verification_status);
    success("Present fingerprints verify; absent ones report NOT_FOUND, not an error");

    // -----------------------------------------------------------------------
    // Step 5: History & Recency
    // -----------------------------------------------------------------------

    section(5, "History & Recent Registrations");
    subsection("cert-100 was registered twice -- its history shows both events...");

    let history = service.history("cert-100");
    info("History entries", &history.total_transactions.to_string());
    for entry in &history.entries {
        println!(
            "  {DIM}block #{:<3} at {} {}...{RESET}",
            entry.block_index,
            entry.timestamp,
            &entry.block_hash[..16],
        );
    }
    assert_eq!(history.total_transactions, 2);

    let recent = service.recent(2);
    subsection("Two most recent registrations, newest first:");
    for entry in &recent {
        println!(
            "  {DIM}block #{:<3} {} [{}]{RESET}",
            entry.block_index, entry.certificate_number, entry.status,
        );
    }
    success("History ascends, recency descends");

    // -----------------------------------------------------------------------
    // Step 6: Tamper Detection
    // -----------------------------------------------------------------------

    section(6, "Tamper Detection");
    subsection("Rebuilding the chain with a doctored block #2 payload...");

    use attest_ledger::store::SnapshotStore;
    let snapshot_store = JsonSnapshotStore::new(snapshot_path.clone());
    let mut doctored = snapshot_store
        .load()
        .expect("snapshot readable")
        .expect("snapshot exists")
        .blocks()
        .to_vec();
    doctored[2].payload = serde_json::json!({ "transaction_type": "forged" });
    let tampered_chain = Chain::from_blocks(2, doctored).expect("rebuild");

    match tampered_chain.verify_integrity() {
        Err(violation) => {
            failure(&format!("integrity violation: {violation}"));
            success("The forgery is pinpointed to its exact block index");
        }
        Ok(()) => unreachable!("the tampered chain must fail verification"),
    }

    // -----------------------------------------------------------------------
    // Final Summary
    // -----------------------------------------------------------------------

    let stats = service.info().expect("ledger info").stats;
    let total_elapsed = demo_start.elapsed();

    println!();
    println!(
        "{BG_BLUE}{BOLD}{WHITE}                                                                    {RESET}"
    );
    println!(
        "{BG_BLUE}{BOLD}{WHITE}    DEMO COMPLETE -- Final Summary                                  {RESET}"
    );
    println!(
        "{BG_BLUE}{BOLD}{WHITE}                                                                    {RESET}"
    );
    println!();

    println!("  {BOLD}{WHITE}Ledger Statistics:{RESET}");
    println!("  {DIM}----------------------------------------------{RESET}");
    info("Total blocks", &stats.total_blocks.to_string());
    info("Certificates", &stats.total_certificates.to_string());
    info("Verified (literal)", &stats.verified_certificates.to_string());
    info("Chain valid", &stats.chain_valid.to_string());
    info("Difficulty", &stats.difficulty.to_string());
    info("Latest hash", &stats.latest_block_hash);
    info("Hash function", "SHA-256 over canonical JSON");
    info("Snapshot", "versioned JSON, atomic rename");
    println!();

    println!(
        "  {BOLD}{GREEN}Total demo time: {:.2}s{RESET}",
        total_elapsed.as_secs_f64()
    );
    println!();
}
