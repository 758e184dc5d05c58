#![warn(clippy::all, clippy::pedantic)]

//! The exit-code side-file written by the shell hook: one
//! `<timestamp>:<exit_code>` line per executed command, append-only
//! across shell sessions.

use anyhow::{Context, Result};
use log::debug;
use std::{collections::HashMap, fs, path::Path};

/// Recorded exit codes, keyed by the history entry's timestamp.
#[derive(Debug, Default)]
pub struct ExitLog {
    codes: HashMap<i64, i32>,
}

impl ExitLog {
    /// Reads the side-file. A missing file yields an empty log, since
    /// the hook may simply not have run yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("no exit-code file at {}", path.display());
            return Ok(Self::default());
        }
        let bytes = fs::read(path)
            .with_context(|| format!("failed to read exit-code file: {}", path.display()))?;
        Ok(Self::parse(&String::from_utf8_lossy(&bytes)))
    }

    /// Parses side-file text. Malformed lines are skipped; duplicate
    /// timestamps resolve last-write-wins.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut codes = HashMap::new();

        for line in text.lines() {
            let line = line.trim();
            let Some((timestamp, code)) = line.split_once(':') else {
                continue;
            };
            match (timestamp.parse::<i64>(), code.parse::<i32>()) {
                (Ok(timestamp), Ok(code)) => {
                    codes.insert(timestamp, code);
                }
                _ => debug!("skipping malformed exit-code line: {line}"),
            }
        }

        Self { codes }
    }

    /// The exit code recorded for a timestamp, if any.
    #[must_use]
    pub fn get(&self, timestamp: i64) -> Option<i32> {
        self.codes.get(&timestamp).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
