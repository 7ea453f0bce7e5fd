//! Cumplir — declarative package-state reconciliation.
//!
//! Loads SLS-style policy documents, plans against the live package database,
//! and converges each declaration in require order with per-state retry.
//! Runs leave a BLAKE3-fingerprinted JSONL trace.

pub mod cli;
pub mod core;
pub mod pkg;
pub mod trace;
pub mod transport;
