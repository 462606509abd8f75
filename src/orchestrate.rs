//! Run orchestration: drive every configured check to completion and feed
//! results to the reporter.
//!
//! Sequential mode executes and reports strictly in declared order and can
//! stop at the first failure. Parallel mode launches every check at once on
//! a rayon pool sized to the check count — each task blocks for its check's
//! full duration, so the global CPU-sized pool would serialize batches
//! larger than the core count. Results are still attributed and reported in
//! declared order so output is deterministic regardless of which subprocess
//! finishes first. A panic inside one check is converted into a synthetic
//! failing result instead of aborting the batch.

use crate::config::{Check, Config};
use crate::report::Reporter;
use crate::runner::{self, ExecutionResult};
use rayon::prelude::*;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

/// Run the whole check list from `root`. Returns true iff every executed
/// check passed.
pub fn run(config: &Config, root: &Path, reporter: &mut Reporter) -> bool {
    reporter.start_run();
    if config.run_in_parallel {
        let results = run_all_concurrently(config, root);
        // collect() keeps index order, so reporting follows the declared list
        for (check, result) in config.checks.iter().zip(results) {
            dispatch(reporter, check, result);
        }
    } else {
        for check in &config.checks {
            reporter.command_start(check);
            let result =
                runner::run_command(&check.command, config.effective_timeout_ms(check), root);
            let failed = !result.success;
            dispatch(reporter, check, result);
            if failed && config.stop_on_fail {
                break;
            }
        }
    }
    reporter.finalize()
}

/// Run the full batch with one pool thread per check, so every subprocess
/// is spawned immediately and total wall time tracks the slowest check,
/// not the sum. Falls back to the global pool if pool construction fails.
fn run_all_concurrently(config: &Config, root: &Path) -> Vec<ExecutionResult> {
    let batch = || {
        config
            .checks
            .par_iter()
            .map(|check| run_isolated(check, config.effective_timeout_ms(check), root))
            .collect()
    };
    match rayon::ThreadPoolBuilder::new()
        .num_threads(config.checks.len())
        .build()
    {
        Ok(pool) => pool.install(batch),
        Err(e) => {
            eprintln!(
                "{} could not size worker pool ({e}); using default",
                crate::utils::warn_prefix()
            );
            batch()
        }
    }
}

fn dispatch(reporter: &mut Reporter, check: &Check, result: ExecutionResult) {
    if result.success {
        reporter.command_success(check, result);
    } else {
        reporter.command_failure(check, result);
    }
}

/// Execute one check with panic isolation.
fn run_isolated(check: &Check, timeout_ms: u64, root: &Path) -> ExecutionResult {
    match catch_unwind(AssertUnwindSafe(|| {
        runner::run_command(&check.command, timeout_ms, root)
    })) {
        Ok(result) => result,
        Err(payload) => synthetic_failure(&panic_message(payload.as_ref())),
    }
}

fn synthetic_failure(message: &str) -> ExecutionResult {
    ExecutionResult {
        success: false,
        output: format!("Internal error: {message}"),
        exit_code: None,
        signal: None,
        timed_out: false,
        duration_ms: 0,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
