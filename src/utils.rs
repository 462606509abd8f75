//! Supporting helpers: color gating and console message prefixes.

use owo_colors::OwoColorize;

/// True when colored output is appropriate for the chosen output mode.
/// JSON output is always plain; `NO_COLOR` disables colors everywhere.
pub fn use_colors(output: &str) -> bool {
    output != "json" && std::env::var_os("NO_COLOR").is_none()
}

fn colors_on() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

pub fn error_prefix() -> String {
    if colors_on() {
        "✖ error:".red().bold().to_string()
    } else {
        "✖ error:".to_string()
    }
}

pub fn warn_prefix() -> String {
    if colors_on() {
        "▲ warn:".yellow().bold().to_string()
    } else {
        "▲ warn:".to_string()
    }
}

pub fn note_prefix() -> String {
    if colors_on() {
        "◆ note:".blue().bold().to_string()
    } else {
        "◆ note:".to_string()
    }
}
