//! `handshake reach` command implementation.

use std::collections::BTreeMap;

use anyhow::Result;
use colored::Colorize;
use handshake::{CallContext, Reachability, ReachabilityParams, Reached, UserId};

use super::GlobalOpts;
use super::display::{MAX_PER_DEPTH, depth_label, print_bullets, print_json, print_truncation_note};

/// Run the reach command.
pub async fn run(
    global: &GlobalOpts,
    user: &str,
    max_depth: u32,
    max_total: usize,
    exclude: &[String],
) -> Result<()> {
    let engine = global.engine().await?;
    let root = UserId::new(user);
    let params =
        ReachabilityParams::new(max_depth, max_total).excluding(exclude.iter().map(String::as_str));

    let result = engine
        .reachability(&CallContext::new(), &root, &params)
        .await?;

    if global.json {
        return print_json(&result);
    }
    print_reachability(&root, &result, max_depth);
    Ok(())
}

fn print_reachability(root: &UserId, result: &Reachability, max_depth: u32) {
    if result.is_empty() {
        println!(
            "No users reachable from \"{}\" (max depth: {max_depth})",
            root.as_str().cyan()
        );
        return;
    }

    println!(
        "{} from \"{}\":",
        "Reachable users".white().bold(),
        root.as_str().cyan().bold()
    );
    println!();

    let mut by_depth: BTreeMap<u32, Vec<&Reached>> = BTreeMap::new();
    for entry in &result.entries {
        by_depth.entry(entry.depth).or_default().push(entry);
    }
    for (depth, entries) in &by_depth {
        println!("  {} ({}):", depth_label(*depth).yellow(), entries.len());
        print_bullets(
            entries.iter().map(|r| r.user_id.as_str()),
            entries.len(),
            MAX_PER_DEPTH,
        );
    }

    println!();
    println!(
        "{}: {} users within {max_depth} handshakes",
        "Summary".dimmed(),
        result.len().to_string().green()
    );
    print_truncation_note(result.truncated);
}
