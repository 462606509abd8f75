//! CLI argument parsing via `clap`.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "qgate",
    version,
    about = "qgate — local quality-gate runner",
    long_about = "qgate — a tiny, fast runner for local quality-gate checks.\n\nRuns the shell commands listed in .code-quality.json sequentially or in\nparallel, enforces per-check timeouts, and reports pass/fail with failure\ncategorization.\n\nConfiguration precedence: CLI > config file > defaults.",
    after_help = "Examples:\n  qgate\n  qgate --parallel\n  qgate --config ci/.code-quality.json --output json\n  qgate --stop-on-fail"
)]
/// Top-level CLI options. Behavior is otherwise config-driven.
pub struct Cli {
    #[arg(long, help = "Repository root (default: current dir)")]
    pub repo_root: Option<String>,
    #[arg(long, help = "Path to config file (default: .code-quality.json in repo root)")]
    pub config: Option<String>,
    #[arg(long, value_parser = ["human", "json"], help = "Output mode: human|json (default: human)")]
    pub output: Option<String>,
    #[arg(long, action = clap::ArgAction::SetTrue, help = "Run all checks in parallel (overrides config)")]
    pub parallel: bool,
    #[arg(long, action = clap::ArgAction::SetTrue, help = "Stop after the first failing check (sequential mode only)")]
    pub stop_on_fail: bool,
}
