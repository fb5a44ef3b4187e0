//! check_confdrift — Nagios-style configuration drift check.
//!
//! Snapshots the 11 configuration domains of one (instance, database)
//! target on every run, diffs each against its last committed revision,
//! and reports which domains changed. Runs sharing an invocation
//! signature are serialized by an advisory execution lock.

pub mod args;
pub mod engine;
pub mod output;
pub mod source;
