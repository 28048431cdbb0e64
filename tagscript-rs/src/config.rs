//! rc file parser.
//!
//! | Line | Action |
//! |------|--------|
//! | `key = value` | set a recognised key |
//! | `key = "value "` | quoted values keep surrounding whitespace |
//! | Lines starting with `#` | comment, ignored |
//!
//! Recognised keys: `prompt`, `history_file`, `history_size`, `max_depth`,
//! `import_path`, `log`.  Unknown keys and malformed values are reported and
//! skipped; the rest of the file still loads.

use std::path::{Path, PathBuf};

use directories::{BaseDirs, ProjectDirs};

use crate::script::interp::{Interpreter, DEFAULT_MAX_DEPTH};

// ── Public API ────────────────────────────────────────────────────────────────

/// Largest accepted `max_depth`.
pub const MAX_DEPTH_LIMIT: usize = 5_000;

/// A non-fatal error encountered while loading an rc file.
#[derive(Debug)]
pub struct ConfigError {
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Host settings read from the rc file.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// REPL prompt.
    pub prompt: String,
    /// Where REPL history persists; `None` uses [`default_history_file`].
    pub history_file: Option<PathBuf>,
    /// Maximum history entries kept.
    pub history_size: usize,
    /// Bound on nested script calls.
    pub max_depth: usize,
    /// Directory relative imports resolve against.
    pub import_path: Option<PathBuf>,
    /// Log filter directive, used when `TAGSCRIPT_LOG` is unset.
    pub log: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            prompt: "> ".to_owned(),
            history_file: None,
            history_size: 500,
            max_depth: DEFAULT_MAX_DEPTH,
            import_path: None,
            log: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse rc text.
    /// Returns the config and a list of any errors on individual lines.
    pub fn load_str(s: &str) -> (Self, Vec<ConfigError>) {
        let mut config = Config::new();
        let mut errors = Vec::new();

        for (i, raw) in s.lines().enumerate() {
            let lineno = i + 1;
            let line = raw.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                errors.push(ConfigError { line: lineno, message: format!("expected 'key = value', got '{line}'") });
                continue;
            };

            if let Err(message) = config.set(key.trim(), unquote(value.trim())) {
                errors.push(ConfigError { line: lineno, message });
            }
        }

        (config, errors)
    }

    /// Read and parse an rc file from disk.
    pub fn load_file(path: &Path) -> std::io::Result<(Self, Vec<ConfigError>)> {
        let s = std::fs::read_to_string(path)?;
        Ok(Self::load_str(&s))
    }

    /// Set one key.  The config is unchanged on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "prompt" => self.prompt = value.to_owned(),
            "history_file" => self.history_file = Some(expand_home(value)),
            "history_size" => self.history_size = parse_count(key, value)?,
            "max_depth" => {
                let depth = parse_count(key, value)?;
                if !(1..=MAX_DEPTH_LIMIT).contains(&depth) {
                    return Err(format!("max_depth must be between 1 and {MAX_DEPTH_LIMIT}"));
                }
                self.max_depth = depth;
            }
            "import_path" => self.import_path = Some(expand_home(value)),
            "log" => self.log = Some(value.to_owned()),
            _ => return Err(format!("unknown key '{key}'")),
        }
        Ok(())
    }

    /// Copy the interpreter-facing settings onto `interp`.
    pub fn apply(&self, interp: &mut Interpreter) {
        interp.max_depth = self.max_depth;
        if let Some(root) = &self.import_path {
            interp.import_root = root.clone();
        }
    }

    /// The history file to use: the configured one, else the platform default.
    pub fn history_path(&self) -> Option<PathBuf> {
        self.history_file.clone().or_else(default_history_file)
    }
}

/// `<platform data dir>/tagscript/history`.
pub fn default_history_file() -> Option<PathBuf> {
    ProjectDirs::from("", "", "tagscript").map(|dirs| dirs.data_dir().join("history"))
}

// ── Value helpers ─────────────────────────────────────────────────────────────

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn parse_count(key: &str, value: &str) -> Result<usize, String> {
    value
        .parse()
        .map_err(|_| format!("{key}: expected a non-negative integer, got '{value}'"))
}

fn expand_home(value: &str) -> PathBuf {
    match value.strip_prefix("~/") {
        Some(rest) => match BaseDirs::new() {
            Some(dirs) => dirs.home_dir().join(rest),
            None => PathBuf::from(value),
        },
        None => PathBuf::from(value),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
