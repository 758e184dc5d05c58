#![warn(clippy::all, clippy::pedantic)]

//! Parsing and reserialization of the zsh extended history format.
//!
//! Each entry is a line of the form `: <timestamp>:<duration>;<command>`.
//! Multiline commands keep their embedded newlines in the file, so any
//! line that does not carry the entry prefix belongs to the command of
//! the entry before it.

use anyhow::{Context, Result};
use fancy_regex::Regex;
use log::debug;
use once_cell::sync::Lazy;
use std::{fs, path::Path};

static ENTRY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^: (\d+):(\d+);(.*)$").expect("valid history line pattern"));

/// A single history entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Seconds since the epoch, recorded by zsh when the command started.
    pub timestamp: i64,
    /// Wall-clock duration in seconds.
    pub duration: i64,
    /// Command text; contains `\n` for multiline commands.
    pub command: String,
}

impl HistoryEntry {
    /// Reserialize into the on-disk format. Multiline commands span
    /// several physical lines, exactly as zsh writes them.
    #[must_use]
    pub fn to_line(&self) -> String {
        format!(": {}:{};{}", self.timestamp, self.duration, self.command)
    }
}

/// A parsed history file.
#[derive(Debug, Default)]
pub struct HistoryFile {
    pub entries: Vec<HistoryEntry>,
    /// Malformed lines dropped during parsing.
    pub skipped: usize,
}

impl HistoryFile {
    /// Reads and parses a history file. Invalid UTF-8 is tolerated via
    /// lossy decoding, matching how zsh itself treats the file as bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .with_context(|| format!("failed to read history file: {}", path.display()))?;
        Ok(Self::parse(&String::from_utf8_lossy(&bytes)))
    }

    /// Parses history text into structured entries.
    ///
    /// Lines without the entry prefix continue the previous entry's
    /// command. A continuation with no entry before it, or an entry
    /// whose numbers don't fit, is counted in `skipped`.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut entries: Vec<HistoryEntry> = Vec::new();
        let mut skipped = 0usize;

        for line in text.lines() {
            if let Some(entry) = parse_line(line) {
                entries.push(entry);
            } else if has_entry_prefix(line) {
                // Prefix matched but the numbers were unusable.
                debug!("skipping malformed entry line: {line}");
                skipped += 1;
            } else if let Some(last) = entries.last_mut() {
                last.command.push('\n');
                last.command.push_str(line);
            } else {
                debug!("skipping orphan continuation line: {line}");
                skipped += 1;
            }
        }

        Self { entries, skipped }
    }

    /// Serialize all entries back into history-file text.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&entry.to_line());
            out.push('\n');
        }
        out
    }
}

/// Parses one physical line as the start of an entry. The command's
/// first segment is trimmed of surrounding whitespace.
fn parse_line(line: &str) -> Option<HistoryEntry> {
    let caps = ENTRY_RE.captures(line).ok().flatten()?;
    let timestamp = caps.get(1)?.as_str().parse::<i64>().ok()?;
    let duration = caps.get(2)?.as_str().parse::<i64>().ok()?;
    let command = caps.get(3)?.as_str().trim().to_string();
    Some(HistoryEntry {
        timestamp,
        duration,
        command,
    })
}

fn has_entry_prefix(line: &str) -> bool {
    ENTRY_RE.is_match(line).unwrap_or(false)
}
