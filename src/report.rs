//! Run reporting: per-check progress, failure blocks, and the final summary.
//!
//! One `Reporter` instance exists per run: construct → feed results →
//! `finalize()` → discard. Supports `human` (default) and `json` outputs;
//! the JSON form is composed by a pure function so its shape can be tested
//! without capturing stdout.

use crate::categorize::{categorize, Categorization};
use crate::config::{Check, Config};
use crate::runner::ExecutionResult;
use crate::utils;
use owo_colors::OwoColorize;
use serde_json::json;
use serde_json::Value as JsonVal;
use std::time::Instant;

/// Failure snippets are capped at this many characters, fixed.
pub const SNIPPET_MAX_CHARS: usize = 300;

/// One reported check outcome, retained for the final summary and JSON.
pub struct CheckRecord {
    pub check: Check,
    pub result: ExecutionResult,
    pub categorization: Categorization,
}

/// Accumulates per-check outcomes and renders progress and summary.
pub struct Reporter {
    output: String,
    color: bool,
    parallel: bool,
    error_categories: Vec<crate::config::ErrorCategory>,
    total: usize,
    completed: usize,
    started_at: Option<Instant>,
    records: Vec<CheckRecord>,
}

impl Reporter {
    pub fn new(config: &Config, output: &str) -> Self {
        Reporter {
            output: output.to_string(),
            color: utils::use_colors(output),
            parallel: config.run_in_parallel,
            error_categories: config.error_categories.clone(),
            total: config.checks.len(),
            completed: 0,
            started_at: None,
            records: Vec::new(),
        }
    }

    /// Recorded outcomes in reporting order.
    pub fn records(&self) -> &[CheckRecord] {
        &self.records
    }

    /// Record the run start and emit the banner.
    pub fn start_run(&mut self) {
        self.started_at = Some(Instant::now());
        if self.output == "json" {
            return;
        }
        let mode = if self.parallel { "parallel" } else { "sequential" };
        let banner = format!("— Running {} checks ({mode}) —", self.total);
        if self.color {
            println!("{}", banner.bold());
        } else {
            println!("{banner}");
        }
    }

    /// Announce a check before it runs. Sequential mode only; parallel runs
    /// have no meaningful per-check start ordering.
    pub fn command_start(&self, check: &Check) {
        if self.output == "json" {
            return;
        }
        if self.color {
            println!("▶ {} {}", check.name.bold(), check.command.bright_black());
        } else {
            println!("▶ {} {}", check.name, check.command);
        }
    }

    pub fn command_success(&mut self, check: &Check, result: ExecutionResult) {
        self.completed += 1;
        if self.output != "json" {
            let line = format!("✔ {} ({})", check.name, format_elapsed(result.duration_ms));
            if self.color {
                println!("{}", line.green());
            } else {
                println!("{line}");
            }
        }
        self.records.push(CheckRecord {
            check: check.clone(),
            result,
            categorization: Categorization::default(),
        });
    }

    pub fn command_failure(&mut self, check: &Check, result: ExecutionResult) {
        self.completed += 1;
        let categorization = categorize(&result.output, &self.error_categories);
        if self.output != "json" {
            let line = format!(
                "✖ {} — {} ({})",
                check.name,
                failure_cause(&result),
                format_elapsed(result.duration_ms)
            );
            if self.color {
                println!("{}", line.red().bold());
            } else {
                println!("{line}");
            }
            let snip = snippet(&result.output);
            if !snip.is_empty() {
                for snip_line in snip.lines() {
                    if self.color {
                        println!("  {}", snip_line.bright_black());
                    } else {
                        println!("  {snip_line}");
                    }
                }
            }
        }
        self.records.push(CheckRecord {
            check: check.clone(),
            result,
            categorization,
        });
    }

    /// Emit the final summary. Returns true iff zero failures were recorded;
    /// the caller turns this into the process exit status.
    pub fn finalize(&mut self) -> bool {
        let duration_ms = self
            .started_at
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);
        let failed = self.records.iter().filter(|r| !r.result.success).count();
        let passed = self.completed - failed;

        if self.output == "json" {
            let doc = compose_run_json(&self.records, self.completed, self.total, duration_ms);
            match serde_json::to_string_pretty(&doc) {
                Ok(s) => println!("{s}"),
                Err(e) => eprintln!("{} could not serialize report: {e}", utils::error_prefix()),
            }
            return failed == 0;
        }

        let summary = format!(
            "— Summary — passed={passed} failed={failed} completed={}/{} ({})",
            self.completed,
            self.total,
            format_elapsed(duration_ms)
        );
        if self.color {
            println!("{}", summary.bold());
        } else {
            println!("{summary}");
        }
        for record in self.records.iter().filter(|r| !r.result.success) {
            let head = match record.categorization.category.as_deref() {
                Some(cat) => format!("✖ {} [{cat}]", record.check.name),
                None => format!("✖ {}", record.check.name),
            };
            if self.color {
                println!("{}", head.red());
            } else {
                println!("{head}");
            }
            if let Some(suggestion) = record.categorization.suggestion.as_deref() {
                if self.color {
                    println!("  ↳ {}", suggestion.yellow());
                } else {
                    println!("  ↳ {suggestion}");
                }
            }
        }
        failed == 0
    }
}

/// Classify a failure for the per-check failure line.
pub fn failure_cause(result: &ExecutionResult) -> String {
    if result.timed_out {
        format!("Timeout after {}s", (result.duration_ms + 500) / 1000)
    } else {
        match result.exit_code {
            Some(code) => format!("Failed with code {code}"),
            None => "Failed with code N/A".to_string(),
        }
    }
}

/// First [`SNIPPET_MAX_CHARS`] characters of `output`, char-boundary safe.
pub fn snippet(output: &str) -> String {
    let mut out: String = output.chars().take(SNIPPET_MAX_CHARS).collect();
    if output.chars().count() > SNIPPET_MAX_CHARS {
        out.push('…');
    }
    out
}

/// Compose the run report JSON object (pure) for testing/snapshot purposes.
pub fn compose_run_json(
    records: &[CheckRecord],
    completed: usize,
    total: usize,
    duration_ms: u64,
) -> JsonVal {
    let results: Vec<_> = records
        .iter()
        .map(|r| {
            json!({
                "id": r.check.id,
                "name": r.check.name,
                "success": r.result.success,
                "exitCode": r.result.exit_code,
                "signal": r.result.signal,
                "timedOut": r.result.timed_out,
                "durationMs": r.result.duration_ms,
                "output": r.result.output,
                "category": r.categorization.category,
                "suggestion": r.categorization.suggestion,
            })
        })
        .collect();
    let failed = records.iter().filter(|r| !r.result.success).count();
    let summary = json!({
        "passed": completed - failed,
        "failed": failed,
        "completed": completed,
        "total": total,
        "durationMs": duration_ms,
    });
    json!({"results": results, "summary": summary})
}

fn format_elapsed(ms: u64) -> String {
    format!("{:.1}s", ms as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ErrorCategory;

    fn result(success: bool, exit_code: Option<i32>, output: &str) -> ExecutionResult {
        ExecutionResult {
            success,
            output: output.to_string(),
            exit_code,
            signal: None,
            timed_out: false,
            duration_ms: 42,
        }
    }

    fn check(id: &str, name: &str) -> Check {
        Check {
            id: id.to_string(),
            name: name.to_string(),
            command: "exit 0".to_string(),
            timeout_ms: None,
        }
    }

    fn config_with_category() -> Config {
        Config {
            error_categories: vec![ErrorCategory {
                name: "x".to_string(),
                patterns: vec![".".to_string()],
                suggestion: Some("fix it".to_string()),
            }],
            checks: vec![check("bad", "Bad")],
            ..Config::default()
        }
    }

    #[test]
    fn test_finalize_true_iff_no_failures() {
        let cfg = Config::default();
        let mut rep = Reporter::new(&cfg, "human");
        rep.start_run();
        rep.command_success(&check("a", "A"), result(true, Some(0), ""));
        assert!(rep.finalize());

        let mut rep = Reporter::new(&cfg, "human");
        rep.start_run();
        rep.command_success(&check("a", "A"), result(true, Some(0), ""));
        rep.command_failure(&check("b", "B"), result(false, Some(1), "boom"));
        assert!(!rep.finalize());
    }

    #[test]
    fn test_failure_records_carry_categorization() {
        let cfg = config_with_category();
        let mut rep = Reporter::new(&cfg, "human");
        rep.start_run();
        rep.command_failure(&check("bad", "Bad"), result(false, Some(1), "anything"));
        let record = &rep.records[0];
        assert_eq!(record.categorization.category.as_deref(), Some("x"));
        assert_eq!(record.categorization.suggestion.as_deref(), Some("fix it"));
    }

    #[test]
    fn test_compose_run_json_shape() {
        let records = vec![
            CheckRecord {
                check: check("ok", "OK"),
                result: result(true, Some(0), "fine"),
                categorization: Categorization::default(),
            },
            CheckRecord {
                check: check("bad", "Bad"),
                result: result(false, Some(2), "nope"),
                categorization: Categorization {
                    category: Some("x".to_string()),
                    suggestion: Some("fix it".to_string()),
                },
            },
        ];
        let out = compose_run_json(&records, 2, 2, 1234);
        assert_eq!(out["summary"]["passed"], 1);
        assert_eq!(out["summary"]["failed"], 1);
        assert_eq!(out["summary"]["total"], 2);
        assert_eq!(out["results"][0]["success"], true);
        assert_eq!(out["results"][1]["exitCode"], 2);
        assert_eq!(out["results"][1]["category"], "x");
        assert_eq!(out["results"][1]["suggestion"], "fix it");
    }

    #[test]
    fn test_failure_cause_wording() {
        let mut r = result(false, Some(2), "");
        assert_eq!(failure_cause(&r), "Failed with code 2");
        r.exit_code = None;
        assert_eq!(failure_cause(&r), "Failed with code N/A");
        r.timed_out = true;
        r.duration_ms = 1600;
        assert_eq!(failure_cause(&r), "Timeout after 2s");
    }

    #[test]
    fn test_snippet_truncates_at_300_chars() {
        let short = "x".repeat(300);
        assert_eq!(snippet(&short), short);
        let long = "y".repeat(301);
        let snip = snippet(&long);
        assert_eq!(snip.chars().count(), 301); // 300 + ellipsis
        assert!(snip.ends_with('…'));
    }

    #[test]
    fn test_snippet_respects_char_boundaries() {
        let long = "é".repeat(400);
        let snip = snippet(&long);
        assert!(snip.starts_with('é'));
        assert_eq!(snip.chars().count(), 301);
    }
}
