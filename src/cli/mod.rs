//! Command-line interface for baseline-forge.
//!
//! Provides commands for schema setup, catalog ingestion, baseline
//! generation and model route inspection.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli, Commands};
