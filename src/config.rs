//! Configuration loading, schema validation, and effective settings resolution.
//!
//! qgate reads `.code-quality.json` (or `.code-quality.toml|yaml|yml`) from
//! the repository root and merges it with CLI flags to produce an `Effective`
//! config. A missing file is treated as an empty document: every field has a
//! default. Defaults:
//! - `runInParallel`: false
//! - `stopOnFail`: false
//! - `commandTimeout`: 300000 (milliseconds)
//! - `checks`: built-in format/lint/typecheck/build list
//! - `errorCategories`: empty
//!
//! Overrides precedence: CLI > config file > defaults.
//!
//! Validation is collected, not fail-fast: every schema violation is reported
//! with its field path before the run aborts.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fallback timeout for checks without a per-check override.
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 300_000;

/// Config file name tried first in the repo root.
pub const CONFIG_FILE_JSON: &str = ".code-quality.json";

/// One named, independently executable shell command.
#[derive(Debug, Clone)]
pub struct Check {
    pub id: String,
    pub name: String,
    pub command: String,
    /// Per-check timeout override in milliseconds.
    pub timeout_ms: Option<u64>,
}

/// A named failure class: regex patterns plus an optional remediation hint.
#[derive(Debug, Clone)]
pub struct ErrorCategory {
    pub name: String,
    pub patterns: Vec<String>,
    pub suggestion: Option<String>,
}

/// Fully-validated, fully-defaulted run configuration. Read-only after load.
#[derive(Debug, Clone)]
pub struct Config {
    pub run_in_parallel: bool,
    pub stop_on_fail: bool,
    pub command_timeout_ms: u64,
    pub checks: Vec<Check>,
    /// Ordered as declared in the config file; categorization is first-match.
    pub error_categories: Vec<ErrorCategory>,
}

impl Config {
    /// A check's own timeout if set, otherwise the global `commandTimeout`.
    pub fn effective_timeout_ms(&self, check: &Check) -> u64 {
        check.timeout_ms.unwrap_or(self.command_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            run_in_parallel: false,
            stop_on_fail: false,
            command_timeout_ms: DEFAULT_COMMAND_TIMEOUT_MS,
            checks: default_checks(),
            error_categories: Vec::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Raw on-disk schema before validation. All fields optional.
pub struct RawConfig {
    pub run_in_parallel: Option<bool>,
    pub stop_on_fail: Option<bool>,
    pub command_timeout: Option<i64>,
    pub checks: Option<Vec<RawCheck>>,
    /// Kept as a `serde_json::Map` so insertion order survives (the crate is
    /// built with `preserve_order`); category precedence follows file order.
    pub error_categories: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawCheck {
    pub id: Option<String>,
    pub name: Option<String>,
    pub command: Option<String>,
    pub timeout: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawCategory {
    patterns: Vec<String>,
    #[serde(default)]
    suggestion: Option<String>,
}

/// A single schema violation: field path plus message.
#[derive(Debug)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {message}")]
    Read { path: String, message: String },
    #[error("config file {path} could not be parsed: {message}")]
    Parse { path: String, message: String },
    #[error("invalid configuration ({} violation(s))", violations.len())]
    Invalid { violations: Vec<Violation> },
}

/// Built-in check list used when the config declares none.
pub fn default_checks() -> Vec<Check> {
    [
        ("format", "Formatting", "npm run format"),
        ("lint", "Linting", "npm run lint"),
        ("typecheck", "Type Check", "npm run typecheck"),
        ("build", "Build", "npm run build"),
    ]
    .iter()
    .map(|(id, name, command)| Check {
        id: (*id).to_string(),
        name: (*name).to_string(),
        command: (*command).to_string(),
        timeout_ms: None,
    })
    .collect()
}

fn candidate_paths(root: &Path) -> [PathBuf; 4] {
    [
        root.join(CONFIG_FILE_JSON),
        root.join(".code-quality.toml"),
        root.join(".code-quality.yaml"),
        root.join(".code-quality.yml"),
    ]
}

/// First existing config file candidate in `root`, if any. JSON wins when
/// several formats coexist.
pub fn find_config_path(root: &Path) -> Option<PathBuf> {
    candidate_paths(root).into_iter().find(|p| p.exists())
}

/// Load and validate the config for `root`.
///
/// With `explicit` set the file must exist; otherwise the first existing
/// candidate is used and a missing file means full defaults.
pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let raw = match explicit {
        Some(path) => {
            let path = if path.is_absolute() {
                path.to_path_buf()
            } else {
                root.join(path)
            };
            parse_file(&path)?
        }
        None => match find_config_path(root) {
            Some(path) => parse_file(&path)?,
            None => RawConfig::default(),
        },
    };
    validate(raw).map_err(|violations| ConfigError::Invalid { violations })
}

fn parse_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let display = path.to_string_lossy().to_string();
    let text = fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: display.clone(),
        message: e.to_string(),
    })?;
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext {
        "toml" => toml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: display,
            message: e.to_string(),
        }),
        "yaml" | "yml" => serde_yaml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: display,
            message: e.to_string(),
        }),
        _ => {
            // Two stages for JSON: syntax errors are parse failures, while a
            // wrong-typed field surfaces as a schema violation.
            let value: serde_json::Value =
                serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
                    path: display,
                    message: e.to_string(),
                })?;
            serde_json::from_value(value).map_err(|e| ConfigError::Invalid {
                violations: vec![Violation {
                    path: "$".to_string(),
                    message: e.to_string(),
                }],
            })
        }
    }
}

/// Apply defaults and collect every schema violation.
pub fn validate(raw: RawConfig) -> Result<Config, Vec<Violation>> {
    let mut violations: Vec<Violation> = Vec::new();

    let run_in_parallel = raw.run_in_parallel.unwrap_or(false);
    let stop_on_fail = raw.stop_on_fail.unwrap_or(false);

    let command_timeout_ms = match raw.command_timeout {
        None => DEFAULT_COMMAND_TIMEOUT_MS,
        Some(ms) if ms > 0 => ms as u64,
        Some(ms) => {
            violations.push(Violation {
                path: "commandTimeout".to_string(),
                message: format!("must be a positive number of milliseconds, got {ms}"),
            });
            DEFAULT_COMMAND_TIMEOUT_MS
        }
    };

    let checks = match raw.checks {
        None => default_checks(),
        Some(list) if list.is_empty() => {
            violations.push(Violation {
                path: "checks".to_string(),
                message: "must contain at least one check".to_string(),
            });
            default_checks()
        }
        Some(list) => {
            let mut out: Vec<Check> = Vec::with_capacity(list.len());
            let mut seen: std::collections::HashSet<String> = std::collections::HashSet::new();
            for (i, rc) in list.into_iter().enumerate() {
                let at = |field: &str| format!("checks[{i}].{field}");
                let id = rc.id.unwrap_or_default();
                if id.is_empty() {
                    violations.push(Violation {
                        path: at("id"),
                        message: "must be a non-empty string".to_string(),
                    });
                } else if !seen.insert(id.clone()) {
                    violations.push(Violation {
                        path: at("id"),
                        message: format!("duplicate check id '{id}'"),
                    });
                }
                let name = rc.name.unwrap_or_default();
                if name.is_empty() {
                    violations.push(Violation {
                        path: at("name"),
                        message: "must be a non-empty string".to_string(),
                    });
                }
                let command = rc.command.unwrap_or_default();
                if command.is_empty() {
                    violations.push(Violation {
                        path: at("command"),
                        message: "must be a non-empty string".to_string(),
                    });
                }
                let timeout_ms = match rc.timeout {
                    None => None,
                    Some(ms) if ms > 0 => Some(ms as u64),
                    Some(ms) => {
                        violations.push(Violation {
                            path: at("timeout"),
                            message: format!(
                                "must be a positive number of milliseconds, got {ms}"
                            ),
                        });
                        None
                    }
                };
                out.push(Check {
                    id,
                    name,
                    command,
                    timeout_ms,
                });
            }
            out
        }
    };

    let mut error_categories: Vec<ErrorCategory> = Vec::new();
    if let Some(map) = raw.error_categories {
        for (name, value) in map {
            let at = format!("errorCategories.{name}");
            match serde_json::from_value::<RawCategory>(value) {
                Ok(cat) if cat.patterns.is_empty() => {
                    violations.push(Violation {
                        path: format!("{at}.patterns"),
                        message: "must contain at least one pattern".to_string(),
                    });
                }
                Ok(cat) => error_categories.push(ErrorCategory {
                    name,
                    patterns: cat.patterns,
                    suggestion: cat.suggestion,
                }),
                Err(e) => violations.push(Violation {
                    path: at,
                    message: e.to_string(),
                }),
            }
        }
    }

    if violations.is_empty() {
        Ok(Config {
            run_in_parallel,
            stop_on_fail,
            command_timeout_ms,
            checks,
            error_categories,
        })
    } else {
        Err(violations)
    }
}

#[derive(Debug)]
/// Fully-resolved settings used by the run after applying precedence.
pub struct Effective {
    pub repo_root: PathBuf,
    pub output: String,
    pub config: Config,
}

/// Resolve `Effective` by merging CLI flags, the discovered config file, and
/// defaults. Flags can only tighten behavior; they never bypass validation.
pub fn resolve_effective(
    cli_repo_root: Option<&str>,
    cli_config: Option<&str>,
    cli_output: Option<&str>,
    cli_parallel: bool,
    cli_stop_on_fail: bool,
) -> Result<Effective, ConfigError> {
    let repo_root = PathBuf::from(cli_repo_root.unwrap_or("."));
    let mut config = load(&repo_root, cli_config.map(Path::new))?;
    if cli_parallel {
        config.run_in_parallel = true;
    }
    if cli_stop_on_fail {
        config.stop_on_fail = true;
    }
    let output = cli_output.unwrap_or("human").to_string();
    Ok(Effective {
        repo_root,
        output,
        config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_and_empty_object_produce_identical_defaults() {
        let dir = tempdir().unwrap();
        let root = dir.path();

        let from_missing = load(root, None).unwrap();

        std::fs::write(root.join(CONFIG_FILE_JSON), "{}").unwrap();
        let from_empty = load(root, None).unwrap();

        for cfg in [&from_missing, &from_empty] {
            assert!(!cfg.run_in_parallel);
            assert!(!cfg.stop_on_fail);
            assert_eq!(cfg.command_timeout_ms, DEFAULT_COMMAND_TIMEOUT_MS);
            assert!(cfg.error_categories.is_empty());
        }
        let ids = |cfg: &Config| {
            cfg.checks
                .iter()
                .map(|c| c.id.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(&from_missing), ids(&from_empty));
        assert_eq!(ids(&from_missing), ["format", "lint", "typecheck", "build"]);
    }

    #[test]
    fn test_invalid_json_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        std::fs::write(root.join(CONFIG_FILE_JSON), "{not json").unwrap();
        match load(root, None) {
            Err(ConfigError::Parse { .. }) => {}
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_schema_violations_are_collected_with_paths() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut f = std::fs::File::create(root.join(CONFIG_FILE_JSON)).unwrap();
        writeln!(
            f,
            "{}",
            r#"{
  "commandTimeout": 0,
  "checks": [
    {"id": "a", "name": "", "command": "exit 0", "timeout": -5},
    {"id": "a", "name": "Dup", "command": "exit 0"}
  ]
}"#
        )
        .unwrap();
        match load(root, None) {
            Err(ConfigError::Invalid { violations }) => {
                let paths: Vec<&str> = violations.iter().map(|v| v.path.as_str()).collect();
                assert!(paths.contains(&"commandTimeout"));
                assert!(paths.contains(&"checks[0].name"));
                assert!(paths.contains(&"checks[0].timeout"));
                assert!(paths.contains(&"checks[1].id"));
            }
            other => panic!("expected violations, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_checks_list_is_rejected() {
        let raw: RawConfig = serde_json::from_str(r#"{"checks": []}"#).unwrap();
        let err = validate(raw).unwrap_err();
        assert!(err.iter().any(|v| v.path == "checks"));
    }

    #[test]
    fn test_category_order_follows_file_order() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        std::fs::write(
            root.join(CONFIG_FILE_JSON),
            r#"{
  "checks": [{"id": "x", "name": "X", "command": "exit 0"}],
  "errorCategories": {
    "zeta": {"patterns": ["z"]},
    "alpha": {"patterns": ["a"], "suggestion": "run install"}
  }
}"#,
        )
        .unwrap();
        let cfg = load(root, None).unwrap();
        let names: Vec<&str> = cfg
            .error_categories
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, ["zeta", "alpha"]);
        assert_eq!(
            cfg.error_categories[1].suggestion.as_deref(),
            Some("run install")
        );
    }

    #[test]
    fn test_category_without_patterns_is_rejected() {
        let raw: RawConfig = serde_json::from_str(
            r#"{"checks":[{"id":"x","name":"X","command":"exit 0"}],
                "errorCategories":{"empty":{"patterns":[]}}}"#,
        )
        .unwrap();
        let err = validate(raw).unwrap_err();
        assert!(err.iter().any(|v| v.path == "errorCategories.empty.patterns"));
    }

    #[test]
    fn test_toml_config_variant() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        std::fs::write(
            root.join(".code-quality.toml"),
            r#"
runInParallel = true
commandTimeout = 1000

[[checks]]
id = "ok"
name = "OK"
command = "exit 0"
timeout = 250
"#,
        )
        .unwrap();
        let cfg = load(root, None).unwrap();
        assert!(cfg.run_in_parallel);
        assert_eq!(cfg.command_timeout_ms, 1000);
        assert_eq!(cfg.checks.len(), 1);
        assert_eq!(cfg.effective_timeout_ms(&cfg.checks[0]), 250);
    }

    #[test]
    fn test_yaml_config_variant() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        std::fs::write(
            root.join(".code-quality.yaml"),
            r#"
stopOnFail: true
checks:
  - id: ok
    name: OK
    command: exit 0
"#,
        )
        .unwrap();
        let cfg = load(root, None).unwrap();
        assert!(cfg.stop_on_fail);
        assert_eq!(cfg.checks[0].id, "ok");
        // No per-check override: global default applies
        assert_eq!(
            cfg.effective_timeout_ms(&cfg.checks[0]),
            DEFAULT_COMMAND_TIMEOUT_MS
        );
    }

    #[test]
    fn test_explicit_config_path_must_exist() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        match load(root, Some(Path::new("nope.json"))) {
            Err(ConfigError::Read { .. }) => {}
            other => panic!("expected read error, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_overrides_take_precedence() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        std::fs::write(
            root.join(CONFIG_FILE_JSON),
            r#"{"checks":[{"id":"x","name":"X","command":"exit 0"}]}"#,
        )
        .unwrap();
        let eff =
            resolve_effective(root.to_str(), None, Some("json"), true, true).unwrap();
        assert!(eff.config.run_in_parallel);
        assert!(eff.config.stop_on_fail);
        assert_eq!(eff.output, "json");
    }
}
