#![warn(clippy::all, clippy::pedantic)]

//! Terminal and JSON reporting for cleaning runs.

use anyhow::Result;
use chrono::{DateTime, Local, TimeZone};
use colored::Colorize;
use serde::Serialize;

use crate::{
    cleaner::{self, CleanOutcome, CleanPlan, CleanStats, Settings},
    exits::ExitLog,
    history::HistoryFile,
    shell,
};

/// Format a unix timestamp as a human-readable local datetime.
fn format_time(timestamp: i64) -> String {
    Local.timestamp_opt(timestamp, 0).single().map_or_else(
        || "?".to_string(),
        |datetime: DateTime<Local>| datetime.format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}

/// Report of one cleaning run, as printed after `clean` and `stats`.
pub fn print_clean_report(outcome: &CleanOutcome, settings: &Settings) {
    if !settings.quiet {
        if let Some(backup) = &outcome.backup {
            println!("Created backup: {}", backup.display());
        }
    }

    let action = if settings.dry_run {
        "Would remove"
    } else {
        "Removed"
    };

    // Dry runs report even in quiet mode; reporting is all they do.
    if settings.dry_run || !settings.quiet {
        print_stats_block(&outcome.plan.stats);
        println!("  {action}: {}", outcome.removed.to_string().bold());
    }

    if settings.quiet {
        return;
    }

    if outcome.removed > 0 {
        println!("\n{action} {} entries:", outcome.removed);
        for (label, count) in outcome.plan.reason_counts() {
            println!("  {}: {count}", label.bright_red());
        }
    } else {
        println!("\nNo commands to remove 🧹");
    }
}

fn print_stats_block(stats: &CleanStats) {
    println!("\n{}", "Stats:".bold());
    println!("  Total entries: {}", stats.total);
    println!("  Unique commands: {}", stats.unique);
    println!("  Successful: {}", stats.successful.to_string().bright_green());
    println!("  Failed: {}", stats.failed.to_string().bright_red());
    println!("  Duplicates: {}", stats.duplicates);
    if stats.skipped_lines > 0 {
        println!(
            "  Skipped malformed lines: {}",
            stats.skipped_lines.to_string().yellow()
        );
    }
}

/// Analysis-only report for the `stats` subcommand.
pub fn print_stats_report(file: &HistoryFile, exits: &ExitLog, plan: &CleanPlan) {
    print_stats_block(&plan.stats);
    println!("  Removable: {}", plan.removal_count().to_string().bold());

    let first = file.entries.iter().map(|e| e.timestamp).min();
    let last = file.entries.iter().map(|e| e.timestamp).max();
    if let (Some(first), Some(last)) = (first, last) {
        println!(
            "\nHistory spans {} – {}",
            format_time(first).dimmed(),
            format_time(last).dimmed()
        );
    }
    println!("Exit records: {}", exits.len());

    if plan.removal_count() > 0 {
        println!("\n{}", "Removal candidates:".bold());
        for (label, count) in plan.reason_counts() {
            println!("  {}: {count}", label.bright_red());
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    stats: &'a CleanStats,
    removable: usize,
    reasons: Vec<ReasonCount>,
}

#[derive(Serialize)]
struct ReasonCount {
    reason: String,
    count: usize,
}

/// The `stats --json` payload.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_json_report(plan: &CleanPlan) -> Result<String> {
    let report = JsonReport {
        stats: &plan.stats,
        removable: plan.removal_count(),
        reasons: plan
            .reason_counts()
            .into_iter()
            .map(|(reason, count)| ReasonCount { reason, count })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

/// The `info` subcommand: resolved paths, thresholds, environment.
pub fn print_info(settings: &Settings) {
    println!("{}", "🧹 Clean History configuration".bold());

    let history_state = if settings.history_file.exists() {
        "exists".bright_green().to_string()
    } else {
        "missing".bright_red().to_string()
    };
    println!(
        "  History file: {} ({history_state})",
        settings.history_file.display()
    );

    let exit_state = if settings.exit_file.exists() {
        "exists".bright_green().to_string()
    } else {
        "missing, will be created by the shell hook".yellow().to_string()
    };
    println!(
        "  Exit-code file: {} ({exit_state})",
        settings.exit_file.display()
    );
    println!(
        "  Backup file: {}",
        cleaner::backup_path(&settings.history_file).display()
    );

    println!("  Similarity threshold: {}", settings.similarity_threshold);
    println!("  Rare threshold: {}", settings.rare_threshold);

    if shell::is_installed() {
        println!("  Shell integration: {}", "installed".bright_green());
    } else {
        println!(
            "  Shell integration: {} (run '{}')",
            "not installed".yellow(),
            "clean_history install".bright_yellow()
        );
    }

    println!("\n{}", "Environment:".bold());
    for name in [
        cleaner::SIMILARITY_ENV,
        cleaner::RARE_THRESHOLD_ENV,
        cleaner::HISTORY_FILE_ENV,
        cleaner::EXIT_FILE_ENV,
        "ZSH_CLEAN_HISTORY_AUTO_CLEAN",
    ] {
        match std::env::var(name) {
            Ok(value) => println!("  {name}={value}"),
            Err(_) => println!("  {name} {}", "(unset)".dimmed()),
        }
    }
}
