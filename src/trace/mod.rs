//! Run tracing — JSONL event log and content fingerprints.

pub mod eventlog;
pub mod hasher;
