#![warn(clippy::all, clippy::pedantic)]

//! Classification of history entries into keepers and removals, and the
//! backup/rewrite machinery that applies the result.

use anyhow::{Context, Result, bail};
use log::{debug, info};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::{
    collections::{BTreeMap, HashMap},
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::{
    exits::ExitLog,
    history::{HistoryEntry, HistoryFile},
    similarity,
};

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.8;
pub const DEFAULT_RARE_THRESHOLD: usize = 3;
pub const BACKUP_SUFFIX: &str = ".backup";

pub const SIMILARITY_ENV: &str = "ZSH_CLEAN_HISTORY_SIMILARITY";
pub const RARE_THRESHOLD_ENV: &str = "ZSH_CLEAN_HISTORY_RARE_THRESHOLD";
pub const HISTORY_FILE_ENV: &str = "ZSH_CLEAN_HISTORY_FILE";
pub const EXIT_FILE_ENV: &str = "ZSH_CLEAN_HISTORY_EXIT_FILE";

static HISTORY_PATH: Lazy<PathBuf> = Lazy::new(|| {
    if let Ok(path) = std::env::var(HISTORY_FILE_ENV) {
        return PathBuf::from(path);
    }
    let home = dirs::home_dir()
        .expect("Failed to locate home directory. HOME environment variable may not be set.");
    home.join(".zsh_history")
});

static EXIT_PATH: Lazy<PathBuf> = Lazy::new(|| {
    if let Ok(path) = std::env::var(EXIT_FILE_ENV) {
        return PathBuf::from(path);
    }
    let home = dirs::home_dir()
        .expect("Failed to locate home directory. HOME environment variable may not be set.");
    home.join(".zsh_history_exits")
});

/// Knobs for one cleaning run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub history_file: PathBuf,
    pub exit_file: PathBuf,
    /// Minimum similarity ratio (0–1 inclusive) for two commands to count
    /// as variants of each other.
    pub similarity_threshold: f64,
    /// Maximum occurrence count at which a command counts as rare.
    pub rare_threshold: usize,
    /// Whether the rare-variant rule runs at all.
    pub remove_rare: bool,
    pub dry_run: bool,
    pub quiet: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            history_file: HISTORY_PATH.clone(),
            exit_file: EXIT_PATH.clone(),
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            rare_threshold: DEFAULT_RARE_THRESHOLD,
            remove_rare: false,
            dry_run: false,
            quiet: false,
        }
    }
}

impl Settings {
    /// Defaults overlaid with the `ZSH_CLEAN_HISTORY_*` environment
    /// variables. Unparseable or out-of-range values are ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Some(threshold) = env_var::<f64>(SIMILARITY_ENV) {
            if (0.0..=1.0).contains(&threshold) {
                settings.similarity_threshold = threshold;
            }
        }
        if let Some(rare) = env_var::<usize>(RARE_THRESHOLD_ENV) {
            if rare > 0 {
                settings.rare_threshold = rare;
            }
        }
        settings
    }

    /// # Errors
    ///
    /// Returns an error if a threshold is out of range.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            bail!(
                "similarity threshold must be between 0.0 and 1.0, got {}",
                self.similarity_threshold
            );
        }
        if self.rare_threshold == 0 {
            bail!("rare threshold must be a positive integer");
        }
        Ok(())
    }
}

fn env_var<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|value| value.parse().ok())
}

/// Why an entry is being removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RemovalReason {
    Duplicate,
    FailedPrefixOf(String),
    FailedSimilarTo(String),
    RareVariantOf(String),
}

impl RemovalReason {
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Duplicate => "duplicate".to_string(),
            Self::FailedPrefixOf(cmd) => format!("failed prefix of '{cmd}'"),
            Self::FailedSimilarTo(cmd) => format!("failed, similar to '{cmd}'"),
            Self::RareVariantOf(cmd) => format!("rare variant of '{cmd}'"),
        }
    }
}

/// Aggregate counts for one run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct CleanStats {
    /// Parsed entries.
    pub total: usize,
    /// Distinct command strings.
    pub unique: usize,
    /// Occurrences with a recorded zero exit code.
    pub successful: usize,
    /// Occurrences with a recorded non-zero exit code.
    pub failed: usize,
    /// Entries removed as exact duplicates.
    pub duplicates: usize,
    /// Malformed lines dropped by the parser.
    pub skipped_lines: usize,
}

/// The removal decisions for one run, keyed by entry index.
#[derive(Debug, Default)]
pub struct CleanPlan {
    pub removals: BTreeMap<usize, RemovalReason>,
    pub stats: CleanStats,
}

impl CleanPlan {
    #[must_use]
    pub fn removal_count(&self) -> usize {
        self.removals.len()
    }

    /// Removal counts grouped by reason label, sorted by label.
    #[must_use]
    pub fn reason_counts(&self) -> Vec<(String, usize)> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for reason in self.removals.values() {
            *counts.entry(reason.label()).or_insert(0) += 1;
        }
        counts.into_iter().collect()
    }
}

/// Result of a full cleaning run.
#[derive(Debug)]
pub struct CleanOutcome {
    pub plan: CleanPlan,
    pub removed: usize,
    /// Backup location; `None` on dry runs.
    pub backup: Option<PathBuf>,
}

/// First whitespace-delimited token, used to group candidate pairs.
/// Similarity is only ever consulted within one base-command group.
#[must_use]
pub fn base_command(cmd: &str) -> &str {
    cmd.split_whitespace().next().unwrap_or(cmd)
}

/// Decides which entries to remove. Entries are examined in file order
/// and unique commands in first-seen order, so the plan is deterministic
/// for a given input.
#[must_use]
pub fn plan(file: &HistoryFile, exits: &ExitLog, settings: &Settings) -> CleanPlan {
    let entries = &file.entries;

    let mut order: Vec<&str> = Vec::new();
    let mut indices: HashMap<&str, Vec<usize>> = HashMap::new();
    let mut success_counts: HashMap<&str, usize> = HashMap::new();
    let mut fail_counts: HashMap<&str, usize> = HashMap::new();

    for (idx, entry) in entries.iter().enumerate() {
        let cmd = entry.command.as_str();
        let slots = indices.entry(cmd).or_default();
        if slots.is_empty() {
            order.push(cmd);
        }
        slots.push(idx);

        match exits.get(entry.timestamp) {
            Some(0) => *success_counts.entry(cmd).or_insert(0) += 1,
            Some(_) => *fail_counts.entry(cmd).or_insert(0) += 1,
            None => {}
        }
    }

    let mut removals: BTreeMap<usize, RemovalReason> = BTreeMap::new();

    // Exact duplicates: the first occurrence survives.
    let mut duplicates = 0usize;
    for &cmd in &order {
        for &idx in &indices[cmd][1..] {
            removals.insert(idx, RemovalReason::Duplicate);
            duplicates += 1;
        }
    }

    // Failed commands shadowed by a successful sibling. A command that
    // ever succeeded is not a typo and is never a candidate here.
    for &cmd in &order {
        let Some(&fail_count) = fail_counts.get(cmd) else {
            continue;
        };
        if success_counts.contains_key(cmd) {
            continue;
        }
        let base = base_command(cmd);

        for &candidate in &order {
            let Some(&success_count) = success_counts.get(candidate) else {
                continue;
            };
            if base_command(candidate) != base {
                continue;
            }

            // The prefix rule is the more aggressive of the two, so it
            // additionally demands that the completed command clearly won
            // out over the abandoned one.
            let reason = if success_count > fail_count && extends_at_word_boundary(cmd, candidate) {
                Some(RemovalReason::FailedPrefixOf(candidate.to_string()))
            } else if similarity::meets_threshold(cmd, candidate, settings.similarity_threshold) {
                Some(RemovalReason::FailedSimilarTo(candidate.to_string()))
            } else {
                None
            };

            if let Some(reason) = reason {
                debug!("removing '{cmd}': {}", reason.label());
                for &idx in &indices[cmd] {
                    removals.insert(idx, reason.clone());
                }
                break;
            }
        }
    }

    // Rare variants of much more common commands. Opt-in, and never
    // overrides a removal already planned above.
    if settings.remove_rare {
        let total_count = |cmd: &str| {
            success_counts.get(cmd).copied().unwrap_or(0)
                + fail_counts.get(cmd).copied().unwrap_or(0)
        };

        for &cmd in &order {
            let count = total_count(cmd);
            if count == 0 || count > settings.rare_threshold {
                continue;
            }
            let base = base_command(cmd);

            for &candidate in &order {
                let common = total_count(candidate);
                if candidate == cmd || common <= count * 3 || base_command(candidate) != base {
                    continue;
                }
                if similarity::meets_threshold(cmd, candidate, settings.similarity_threshold) {
                    debug!("removing rare '{cmd}' in favor of '{candidate}'");
                    for &idx in &indices[cmd] {
                        removals
                            .entry(idx)
                            .or_insert_with(|| RemovalReason::RareVariantOf(candidate.to_string()));
                    }
                    break;
                }
            }
        }
    }

    let stats = CleanStats {
        total: entries.len(),
        unique: order.len(),
        successful: success_counts.values().sum(),
        failed: fail_counts.values().sum(),
        duplicates,
        skipped_lines: file.skipped,
    };

    CleanPlan { removals, stats }
}

/// The successful command extends the failed one with further words.
fn extends_at_word_boundary(prefix: &str, full: &str) -> bool {
    full.len() > prefix.len()
        && full.starts_with(prefix)
        && full.as_bytes()[prefix.len()] == b' '
}

/// Loads history and exit log, plans, and applies the plan unless this
/// is a dry run. The destructive path copies the history file aside,
/// renders survivors into a temp file, and atomically renames it over
/// the original, so an I/O failure never leaves a half-written history.
///
/// # Errors
///
/// Returns an error on invalid settings, on a missing or unreadable
/// history file, or on any I/O failure while backing up or rewriting.
pub fn run(settings: &Settings) -> Result<CleanOutcome> {
    settings.validate()?;

    let file = HistoryFile::load(&settings.history_file)?;
    let exits = ExitLog::load(&settings.exit_file)?;
    let plan = plan(&file, &exits, settings);
    let removed = plan.removal_count();

    if settings.dry_run {
        return Ok(CleanOutcome {
            plan,
            removed,
            backup: None,
        });
    }

    let backup = write_backup(&settings.history_file)?;
    if removed > 0 {
        rewrite_history(&settings.history_file, &file, &plan)?;
        info!(
            "removed {removed} of {} entries from {}",
            plan.stats.total,
            settings.history_file.display()
        );
    }

    Ok(CleanOutcome {
        plan,
        removed,
        backup: Some(backup),
    })
}

/// Where the backup for a history file lives.
#[must_use]
pub fn backup_path(history: &Path) -> PathBuf {
    history.with_file_name(suffixed_name(history, BACKUP_SUFFIX))
}

fn temp_path(history: &Path) -> PathBuf {
    history.with_file_name(suffixed_name(history, ".tmp"))
}

fn suffixed_name(path: &Path, suffix: &str) -> OsString {
    let mut name = path
        .file_name()
        .map_or_else(|| OsString::from("history"), ToOwned::to_owned);
    name.push(suffix);
    name
}

fn write_backup(history: &Path) -> Result<PathBuf> {
    let backup = backup_path(history);
    fs::copy(history, &backup)
        .with_context(|| format!("failed to create backup: {}", backup.display()))?;
    Ok(backup)
}

fn rewrite_history(path: &Path, file: &HistoryFile, plan: &CleanPlan) -> Result<()> {
    let survivors: Vec<HistoryEntry> = file
        .entries
        .iter()
        .enumerate()
        .filter(|(idx, _)| !plan.removals.contains_key(idx))
        .map(|(_, entry)| entry.clone())
        .collect();

    let rendered = HistoryFile {
        entries: survivors,
        skipped: 0,
    }
    .render();

    let tmp = temp_path(path);
    fs::write(&tmp, rendered)
        .with_context(|| format!("failed to write temporary history file: {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to replace history file: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_settings() -> Settings {
        Settings {
            history_file: PathBuf::from("/tmp/unused"),
            exit_file: PathBuf::from("/tmp/unused_exits"),
            similarity_threshold: 0.8,
            rare_threshold: 3,
            remove_rare: false,
            dry_run: true,
            quiet: true,
        }
    }

    fn history(lines: &[(i64, &str)]) -> HistoryFile {
        let entries = lines
            .iter()
            .map(|&(timestamp, command)| HistoryEntry {
                timestamp,
                duration: 0,
                command: command.to_string(),
            })
            .collect();
        HistoryFile {
            entries,
            skipped: 0,
        }
    }

    #[test]
    fn base_command_takes_first_word() {
        assert_eq!(base_command("git status -s"), "git");
        assert_eq!(base_command("ls"), "ls");
        assert_eq!(base_command(""), "");
    }

    #[test]
    fn duplicates_keep_first_occurrence() {
        let file = history(&[(1, "ls -la"), (2, "git status"), (3, "ls -la"), (4, "ls -la")]);
        let plan = plan(&file, &ExitLog::default(), &test_settings());

        assert_eq!(plan.stats.duplicates, 2);
        assert_eq!(plan.removals.get(&0), None);
        assert_eq!(plan.removals.get(&2), Some(&RemovalReason::Duplicate));
        assert_eq!(plan.removals.get(&3), Some(&RemovalReason::Duplicate));
    }

    #[test]
    fn failed_typo_removed_when_successful_variant_exists() {
        let file = history(&[(100, "git comit -m \"x\""), (200, "git commit -m \"x\"")]);
        let exits = ExitLog::parse("100:127\n200:0\n");
        let plan = plan(&file, &exits, &test_settings());

        assert_eq!(
            plan.removals.get(&0),
            Some(&RemovalReason::FailedSimilarTo("git commit -m \"x\"".to_string()))
        );
        assert_eq!(plan.removals.get(&1), None);
    }

    #[test]
    fn command_with_recorded_success_is_never_a_failure_candidate() {
        // "git status" both failed and succeeded; the failure rule must
        // leave it alone even with a similar, more successful sibling.
        let file = history(&[
            (100, "git status"),
            (200, "git status"),
            (300, "git stash"),
            (400, "git stash"),
            (500, "git stash"),
        ]);
        let exits = ExitLog::parse("100:1\n200:0\n300:0\n400:0\n500:0\n");
        let mut settings = test_settings();
        settings.similarity_threshold = 0.5;
        let plan = plan(&file, &exits, &settings);

        assert!(
            !plan
                .removals
                .values()
                .any(|r| matches!(r, RemovalReason::FailedSimilarTo(_))),
            "zero-exit command must survive the failure rule"
        );
    }

    #[test]
    fn single_failure_against_single_success_is_removed() {
        let file = history(&[(100, "git statsu"), (200, "git status")]);
        let exits = ExitLog::parse("100:1\n200:0\n");
        let plan = plan(&file, &exits, &test_settings());
        assert_eq!(
            plan.removals.get(&0),
            Some(&RemovalReason::FailedSimilarTo("git status".to_string()))
        );
    }

    #[test]
    fn prefix_rule_requires_more_successes_than_failures() {
        let file = history(&[(100, "git commit"), (200, "git commit -m \"wip\"")]);
        // One abandoned prefix, one completed run: counts tie, keep it.
        let exits = ExitLog::parse("100:1\n200:0\n");
        let plan = plan(&file, &exits, &test_settings());
        assert!(
            !plan
                .removals
                .values()
                .any(|r| matches!(r, RemovalReason::FailedPrefixOf(_)))
        );
    }

    #[test]
    fn failure_rule_only_compares_same_base_command() {
        let file = history(&[(100, "gti status"), (200, "git status"), (300, "git status")]);
        let exits = ExitLog::parse("100:127\n200:0\n300:0\n");
        let plan = plan(&file, &exits, &test_settings());

        // "gti status" is similar but its base command differs.
        assert_eq!(plan.removals.get(&0), None);
    }

    #[test]
    fn failed_prefix_removed_at_word_boundary() {
        let file = history(&[
            (100, "git commit"),
            (200, "git commit -m \"done\""),
            (300, "git commit -m \"done\""),
        ]);
        let exits = ExitLog::parse("100:1\n200:0\n300:0\n");
        let plan = plan(&file, &exits, &test_settings());

        assert_eq!(
            plan.removals.get(&0),
            Some(&RemovalReason::FailedPrefixOf(
                "git commit -m \"done\"".to_string()
            ))
        );
    }

    #[test]
    fn prefix_without_word_boundary_is_not_a_prefix_match() {
        assert!(extends_at_word_boundary("git com", "git com mit"));
        assert!(!extends_at_word_boundary("git com", "git commit"));
        assert!(!extends_at_word_boundary("git commit", "git commit"));
    }

    #[test]
    fn rare_rule_is_opt_in() {
        let file = history(&[
            (100, "cargo biuld"),
            (200, "cargo build"),
            (300, "cargo build"),
            (400, "cargo build"),
            (500, "cargo build"),
        ]);
        let exits = ExitLog::parse("100:0\n200:0\n300:0\n400:0\n500:0\n");

        let plan_default = plan(&file, &exits, &test_settings());
        assert_eq!(plan_default.removals.get(&0), None);

        let mut settings = test_settings();
        settings.remove_rare = true;
        let plan_rare = plan(&file, &exits, &settings);
        assert_eq!(
            plan_rare.removals.get(&0),
            Some(&RemovalReason::RareVariantOf("cargo build".to_string()))
        );
    }

    #[test]
    fn rare_rule_requires_triple_count_margin() {
        let file = history(&[
            (100, "cargo biuld"),
            (200, "cargo build"),
            (300, "cargo build"),
            (400, "cargo build"),
        ]);
        // 3 common vs 1 rare: not more than 3x, so it stays.
        let exits = ExitLog::parse("100:0\n200:0\n300:0\n400:0\n");
        let mut settings = test_settings();
        settings.remove_rare = true;
        let plan = plan(&file, &exits, &settings);
        assert_eq!(plan.removals.get(&0), None);
    }

    #[test]
    fn rare_rule_ignores_commands_without_exit_records() {
        let file = history(&[
            (100, "cargo biuld"),
            (200, "cargo build"),
            (300, "cargo build"),
            (400, "cargo build"),
            (500, "cargo build"),
        ]);
        // Only the common command has exit records.
        let exits = ExitLog::parse("200:0\n300:0\n400:0\n500:0\n");
        let mut settings = test_settings();
        settings.remove_rare = true;
        let plan = plan(&file, &exits, &settings);
        assert_eq!(plan.removals.get(&0), None);
    }

    #[test]
    fn failure_reason_overrides_duplicate_reason() {
        let file = history(&[
            (100, "git comit"),
            (200, "git comit"),
            (300, "git commit"),
            (400, "git commit"),
            (500, "git commit"),
        ]);
        let exits = ExitLog::parse("100:127\n200:127\n300:0\n400:0\n500:0\n");
        let plan = plan(&file, &exits, &test_settings());

        assert_eq!(
            plan.removals.get(&1),
            Some(&RemovalReason::FailedSimilarTo("git commit".to_string()))
        );
        // First occurrence of the typo goes too; it never succeeded.
        assert_eq!(
            plan.removals.get(&0),
            Some(&RemovalReason::FailedSimilarTo("git commit".to_string()))
        );
    }

    #[test]
    fn stats_count_occurrences() {
        let file = history(&[(100, "ls"), (200, "ls"), (300, "pwd"), (400, "make")]);
        let exits = ExitLog::parse("100:0\n200:0\n300:1\n");
        let plan = plan(&file, &exits, &test_settings());

        assert_eq!(plan.stats.total, 4);
        assert_eq!(plan.stats.unique, 3);
        assert_eq!(plan.stats.successful, 2);
        assert_eq!(plan.stats.failed, 1);
        assert_eq!(plan.stats.duplicates, 1);
    }

    #[test]
    fn settings_validation_rejects_out_of_range() {
        let mut settings = test_settings();
        settings.similarity_threshold = 1.5;
        assert!(settings.validate().is_err());

        let mut settings = test_settings();
        settings.rare_threshold = 0;
        assert!(settings.validate().is_err());

        assert!(test_settings().validate().is_ok());
    }

    #[test]
    fn backup_path_appends_suffix() {
        assert_eq!(
            backup_path(Path::new("/home/u/.zsh_history")),
            PathBuf::from("/home/u/.zsh_history.backup")
        );
    }

    #[test]
    fn reason_counts_group_by_label() {
        let file = history(&[(1, "ls"), (2, "ls"), (3, "ls")]);
        let plan = plan(&file, &ExitLog::default(), &test_settings());
        assert_eq!(plan.reason_counts(), vec![("duplicate".to_string(), 2)]);
    }
}
