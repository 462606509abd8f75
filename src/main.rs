//! qgate CLI binary entry point.
//! Loads config, drives the check run, and sets the process exit code.

mod categorize;
mod cli;
mod config;
mod orchestrate;
mod report;
mod runner;
mod utils;

use clap::Parser;
use cli::Cli;
use config::ConfigError;

fn main() {
    let cli = Cli::parse();
    let eff = match config::resolve_effective(
        cli.repo_root.as_deref(),
        cli.config.as_deref(),
        cli.output.as_deref(),
        cli.parallel,
        cli.stop_on_fail,
    ) {
        Ok(eff) => eff,
        Err(ConfigError::Invalid { violations }) => {
            eprintln!("{} invalid configuration:", utils::error_prefix());
            for v in &violations {
                eprintln!("  {}: {}", v.path, v.message);
            }
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("{} {}", utils::error_prefix(), e);
            std::process::exit(1);
        }
    };

    // Friendly note when running purely on built-in defaults
    if cli.config.is_none()
        && eff.output != "json"
        && config::find_config_path(&eff.repo_root).is_none()
    {
        eprintln!(
            "{} no .code-quality config found; using default checks.",
            utils::note_prefix()
        );
    }

    let mut reporter = report::Reporter::new(&eff.config, &eff.output);
    let ok = orchestrate::run(&eff.config, &eff.repo_root, &mut reporter);
    std::process::exit(if ok { 0 } else { 1 });
}
