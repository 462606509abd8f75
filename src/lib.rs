//! qgate core library.
//!
//! This crate exposes programmatic APIs for running a configurable list of
//! quality-gate shell checks with per-check watchdog timeouts, failure
//! categorization, and human/JSON reporting.
//!
//! High-level modules:
//! - `cli`: CLI argument parsing (binary uses this).
//! - `config`: Config discovery, schema validation, and effective resolution.
//! - `runner`: Single-check shell execution with SIGTERM→SIGKILL escalation.
//! - `categorize`: First-match regex categorization of failure output.
//! - `report`: Reporter state plus human/JSON rendering.
//! - `orchestrate`: Sequential/parallel drives with stop-on-fail and
//!   panic isolation.
//! - `utils`: Supporting helpers.

pub mod categorize;
pub mod cli;
pub mod config;
pub mod orchestrate;
pub mod report;
pub mod runner;
pub mod utils;
