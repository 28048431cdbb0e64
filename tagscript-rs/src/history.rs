//! REPL input history.
//!
//! Lines are kept newest first in a bounded buffer.  The on-disk format is
//! one entry per line, oldest first, so the file reads chronologically.

use std::collections::VecDeque;
use std::io;
use std::path::Path;

/// Bounded buffer of input lines.
///
/// The newest entry is at index 0.
#[derive(Debug, Clone)]
pub struct InputHistory {
    /// Past input lines, newest first.
    entries: VecDeque<String>,
    /// Maximum number of entries to keep.
    max_size: usize,
}

impl InputHistory {
    /// Create an empty history with the given capacity.
    pub fn new(max_size: usize) -> Self {
        Self { entries: VecDeque::new(), max_size: max_size.max(1) }
    }

    /// Number of entries stored.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recent entry.
    pub fn last(&self) -> Option<&str> {
        self.entries.front().map(String::as_str)
    }

    /// Entries from oldest to newest.
    pub fn iter_oldest_first(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().rev().map(String::as_str)
    }

    // ── Recording ─────────────────────────────────────────────────────────────

    /// Record `line` as the most recent input.
    ///
    /// Blank lines are ignored and consecutive duplicates are collapsed.
    pub fn record(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        if self.entries.front().is_some_and(|e| e == line) {
            return;
        }
        self.entries.push_front(line.to_owned());
        while self.entries.len() > self.max_size {
            self.entries.pop_back();
        }
    }

    // ── Persistence ───────────────────────────────────────────────────────────

    /// Load a history file.  A missing file yields an empty history.
    pub fn load(path: &Path, max_size: usize) -> io::Result<Self> {
        let mut history = Self::new(max_size);
        match std::fs::read_to_string(path) {
            Ok(text) => {
                for line in text.lines() {
                    history.record(line);
                }
                Ok(history)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(history),
            Err(e) => Err(e),
        }
    }

    /// Write the history to `path`, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut text = String::new();
        for line in self.iter_oldest_first() {
            text.push_str(line);
            text.push('\n');
        }
        std::fs::write(path, text)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
