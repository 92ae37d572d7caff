//! `handshake growth` command implementation.

use anyhow::Result;
use chrono::NaiveDate;
use colored::Colorize;
use handshake::{CallContext, GrowthPoint, UserId};

use super::GlobalOpts;
use super::display::print_json;

/// Width of the widest bar in text output.
const BAR_WIDTH: u64 = 40;

/// Run the growth command.
pub async fn run(
    global: &GlobalOpts,
    user: &str,
    days: u32,
    until: Option<NaiveDate>,
) -> Result<()> {
    let engine = global.engine().await?;
    let root = UserId::new(user);
    let ctx = CallContext::new();

    let series = match until {
        Some(end) => engine.growth_series_until(&ctx, &root, days, end).await?,
        None => engine.growth_series(&ctx, &root, days).await?,
    };

    if global.json {
        return print_json(&series);
    }

    println!(
        "{} of \"{}\" over {days} days",
        "Connection growth".white().bold(),
        root.as_str().cyan().bold()
    );
    println!();
    let peak = series.last().map_or(0, |p| p.cumulative);
    for point in &series {
        println!(
            "  {} {:>6} {}",
            point.date.to_string().dimmed(),
            point.cumulative,
            bar(point, peak).green()
        );
    }
    Ok(())
}

/// Bar proportional to the point's share of the final total.
fn bar(point: &GrowthPoint, peak: u64) -> String {
    if peak == 0 {
        return String::new();
    }
    let len = point.cumulative.saturating_mul(BAR_WIDTH) / peak;
    "█".repeat(usize::try_from(len).unwrap_or(0))
}
