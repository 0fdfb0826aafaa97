//! `lendkeep` (lk) - Lending ledger for small collections
//!
//! Catalog items with multiple copies, register borrowers, and issue or
//! return copies. Every change is written through to a JSONL snapshot.

use lendkeep::run;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
