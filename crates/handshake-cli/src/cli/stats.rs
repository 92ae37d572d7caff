//! `handshake stats` command implementation.

use anyhow::Result;
use colored::Colorize;
use handshake::{CallContext, UserId};

use super::GlobalOpts;
use super::display::{depth_label, print_json, print_truncation_note};

/// Run the stats command.
pub async fn run(global: &GlobalOpts, user: &str) -> Result<()> {
    let engine = global.engine().await?;
    let root = UserId::new(user);

    let histogram = engine.stats_by_depth(&CallContext::new(), &root).await?;

    if global.json {
        return print_json(&histogram);
    }

    println!(
        "{} for \"{}\"",
        "Network Statistics".cyan().bold(),
        root.as_str().cyan()
    );
    println!();
    for (depth, count) in &histogram.counts {
        println!("  {}: {}", depth_label(*depth).white().bold(), count.to_string().green());
    }
    println!();
    println!(
        "  {}: {}",
        "Total".white().bold(),
        histogram.total().to_string().green()
    );
    print_truncation_note(histogram.truncated);
    Ok(())
}
