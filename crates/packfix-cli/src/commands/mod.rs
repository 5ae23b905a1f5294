pub mod completions;
pub mod fix;
pub mod inspect;
pub mod man_pages;
pub mod validate;

use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_INVALID_PACK: u8 = 2;
pub const EXIT_ARCHIVE_ERROR: u8 = 3;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn colorize_verdict(valid: bool) -> String {
    use console::Style;
    if valid {
        Style::new().green().apply_to("valid").to_string()
    } else {
        Style::new().red().bold().apply_to("invalid").to_string()
    }
}

pub fn colorize_issue(issue: &str) -> String {
    console::Style::new()
        .yellow()
        .apply_to(format!("  - {issue}"))
        .to_string()
}

/// `<dir>/<stem>_fixed.<ext>`, keeping the input's extension (`.mcpack` if none).
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "pack".into(), |s| s.to_string_lossy());
    let ext = input
        .extension()
        .map_or_else(|| "mcpack".into(), |e| e.to_string_lossy());
    input.with_file_name(format!("{stem}_fixed.{ext}"))
}
