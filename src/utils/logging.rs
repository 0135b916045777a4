// file: src/utils/logging.rs
// description: tracing subscriber setup and colored terminal message helpers
// reference: https://docs.rs/tracing-subscriber

use colored::*;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber. `RUST_LOG` wins over the verbosity flag when set.
pub fn init_logger(colored_output: bool, verbose: bool) {
    let level = if verbose { "shelfsync=debug" } else { "shelfsync=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_file(verbose)
        .with_line_number(verbose)
        .compact()
        .with_ansi(colored_output)
        .with_writer(std::io::stderr);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

/// Toggle `colored` globally; piping output should not carry escape codes.
pub fn set_color_output(enabled: bool) {
    colored::control::set_override(enabled);
}

pub fn format_success(msg: &str) -> String {
    format!("{} {}", "✓".green().bold(), msg.green())
}

pub fn format_error(msg: &str) -> String {
    format!("{} {}", "✗".red().bold(), msg.red())
}

pub fn format_warning(msg: &str) -> String {
    format!("{} {}", "⚠".yellow().bold(), msg.yellow())
}

pub fn format_info(msg: &str) -> String {
    format!("{} {}", "ℹ".blue().bold(), msg)
}

/// One line of a difference report, prefixed with its kind.
pub fn format_difference(kind: &str, msg: &str) -> String {
    let tag = format!("[{}]", kind);
    let tag = match kind {
        "added" => tag.green(),
        "removed" => tag.red(),
        "modified" => tag.yellow(),
        "validation_warning" => tag.dimmed(),
        _ => tag.cyan(),
    };
    format!("  {} {}", tag.bold(), msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatters_keep_message() {
        set_color_output(false);
        assert_eq!(format_success("saved"), "✓ saved");
        assert_eq!(format_error("failed"), "✗ failed");
        assert_eq!(format_difference("added", "x"), "  [added] x");
    }
}
