// src/record/mod.rs

//! Persistent run records kept in the pipeline root:
//! the run ledger ([`ledger`]) and the timing history ([`timing`]).

pub mod ledger;
pub mod timing;

pub use ledger::{read_ledger, interrupted_stage, LedgerEntry, LedgerEvent, RunLedger};
pub use timing::{TimingRecord, TimingStore};
