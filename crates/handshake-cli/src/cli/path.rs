//! `handshake path` command implementation.

use anyhow::Result;
use colored::Colorize;
use handshake::{CallContext, PathOutcome, UserId};

use super::GlobalOpts;
use super::display::print_json;

/// Run the path command.
pub async fn run(global: &GlobalOpts, from: &str, to: &str, max_depth: u32) -> Result<()> {
    let engine = global.engine().await?;
    let (source, target) = (UserId::new(from), UserId::new(to));

    let outcome = engine
        .shortest_path(&CallContext::new(), &source, &target, max_depth)
        .await?;

    if global.json {
        return print_json(&outcome);
    }

    match &outcome {
        PathOutcome::Found(path) => {
            let chain: Vec<String> = path.iter().map(|id| id.as_str().cyan().to_string()).collect();
            println!("{}", chain.join(&format!(" {} ", "→".dimmed())));
            println!();
            println!(
                "{}: {} handshakes",
                "Distance".dimmed(),
                outcome.hops().unwrap_or(0).to_string().green()
            );
        }
        PathOutcome::NotFound => {
            println!(
                "No chain between \"{}\" and \"{}\" within {max_depth} handshakes",
                from.cyan(),
                to.cyan()
            );
        }
    }
    Ok(())
}
