pub mod aliases;
pub mod completions;
pub mod history;
pub mod list;
pub mod man_pages;
pub mod promote;
pub mod register;
pub mod resolve;
pub mod show;
pub mod verify;
pub mod versions;

use indicatif::{ProgressBar, ProgressStyle};
use modelreg_core::CoreError;
use std::time::Duration;
use thiserror::Error;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_REGISTRY_ERROR: u8 = 1;
pub const EXIT_UNEXPECTED: u8 = 2;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Registry(#[from] CoreError),
    #[error("{0}")]
    Input(String),
}

impl CommandError {
    /// Typed registry conditions exit 1; everything else is a fault and exits 2.
    pub fn exit_code(&self) -> u8 {
        match self {
            CommandError::Registry(e) if e.is_domain_error() => EXIT_REGISTRY_ERROR,
            _ => EXIT_UNEXPECTED,
        }
    }
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, CommandError> {
    serde_json::to_string_pretty(value).map_err(|e| CommandError::Registry(e.into()))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .map(|s| s.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]))
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn finish(pb: &ProgressBar, msg: String) {
    if let Ok(style) = ProgressStyle::with_template("{msg}") {
        pb.set_style(style);
    }
    pb.finish_with_message(msg);
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    finish(pb, format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    finish(pb, format!("✗ {msg}"));
}

pub fn colorize_alias(alias: &str) -> String {
    use console::Style;
    match alias {
        "production" => Style::new().green().bold().apply_to(alias).to_string(),
        "staging" => Style::new().yellow().apply_to(alias).to_string(),
        "latest" => Style::new().cyan().apply_to(alias).to_string(),
        other => other.to_owned(),
    }
}

pub fn status_ok(word: &str) -> String {
    console::Style::new().green().apply_to(word).to_string()
}
