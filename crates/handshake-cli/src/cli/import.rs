//! `handshake import` command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use handshake::store::{ImportReport, LoadWarning, SqliteConnectionStore, load_from_jsonl};
use serde::Serialize;

use super::GlobalOpts;
use super::display::{print_bullets, print_json};

/// Warnings and rejections listed before cutting off.
const MAX_LISTED: usize = 20;

#[derive(Debug, Serialize)]
struct ImportSummary {
    users_added: usize,
    connections_added: usize,
    skipped_lines: Vec<String>,
    rejected: Vec<String>,
}

/// Run the import command.
pub async fn run(global: &GlobalOpts, snapshot: &Path, db: &Path) -> Result<()> {
    let (config, _) = global.load_config().await?;
    let max = config.store.max_connections_per_user;

    let (memory, warnings) = load_from_jsonl(snapshot, max)
        .await
        .with_context(|| format!("failed to read snapshot {}", snapshot.display()))?;
    let (users, connections) = memory.export_all().await;

    let store = SqliteConnectionStore::open(db, max)
        .await
        .with_context(|| format!("failed to open database {}", db.display()))?;
    let report = store.import(users, connections).await?;

    let summary = summarize(&report, &warnings);
    if global.json {
        return print_json(&summary);
    }

    println!(
        "{} {} into {}",
        "Imported".green().bold(),
        snapshot.display(),
        db.display()
    );
    println!("  {}: {}", "Users added".white().bold(), summary.users_added);
    println!(
        "  {}: {}",
        "Connections added".white().bold(),
        summary.connections_added
    );

    if !summary.skipped_lines.is_empty() {
        println!();
        println!(
            "  {}: {} snapshot lines skipped",
            "Warning".yellow().bold(),
            summary.skipped_lines.len()
        );
        print_bullets(&summary.skipped_lines, summary.skipped_lines.len(), MAX_LISTED);
    }
    if !summary.rejected.is_empty() {
        println!();
        println!(
            "  {}: {} connections rejected by the database",
            "Warning".yellow().bold(),
            summary.rejected.len()
        );
        print_bullets(&summary.rejected, summary.rejected.len(), MAX_LISTED);
    }
    Ok(())
}

fn summarize(report: &ImportReport, warnings: &[LoadWarning]) -> ImportSummary {
    ImportSummary {
        users_added: report.users_added,
        connections_added: report.connections_added,
        skipped_lines: warnings.iter().map(describe).collect(),
        rejected: report.rejected.iter().map(ToString::to_string).collect(),
    }
}

fn describe(warning: &LoadWarning) -> String {
    match warning {
        LoadWarning::MalformedJson { line_number, error } => {
            format!("line {line_number}: malformed record ({error})")
        }
        LoadWarning::InvalidUserId { line_number, error } => {
            format!("line {line_number}: {error}")
        }
        LoadWarning::SelfConnection { line_number, user } => {
            format!("line {line_number}: {user} connected to themselves")
        }
        LoadWarning::DuplicateConnection { line_number, a, b } => {
            format!("line {line_number}: duplicate connection {a} <-> {b}")
        }
        LoadWarning::ConnectionLimit {
            line_number,
            user,
            limit,
        } => format!("line {line_number}: {user} exceeds {limit} connections"),
    }
}
