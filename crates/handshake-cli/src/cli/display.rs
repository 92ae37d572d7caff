//! Common display utilities for CLI commands.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

/// Maximum users listed per depth level in text output.
pub const MAX_PER_DEPTH: usize = 25;

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a bulleted list, cut after `limit` items with an "and N more" line.
pub fn print_bullets<I, S>(items: I, total: usize, limit: usize)
where
    I: IntoIterator<Item = S>,
    S: std::fmt::Display,
{
    for item in items.into_iter().take(limit) {
        println!("    {} {item}", "•".dimmed());
    }
    if total > limit {
        println!("    {} ... and {} more", "•".dimmed(), total - limit);
    }
}

/// Note printed under results that hit a size cap.
pub fn print_truncation_note(truncated: bool) {
    if truncated {
        println!();
        println!(
            "  {}: result capped; more users are reachable within the depth limit",
            "Note".yellow().bold()
        );
    }
}

/// Header label for a handshake level.
pub fn depth_label(depth: u32) -> String {
    match depth {
        0 => "Root".to_string(),
        1 => "Depth 1 (direct)".to_string(),
        d => format!("Depth {d}"),
    }
}
