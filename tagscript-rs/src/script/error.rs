//! Error taxonomy for compilation and execution.
//!
//! Compile-time failures ([`LexError`], [`ParseError`], malformed IR JSON) are
//! collected under [`CompileError`] and abort before anything runs.  Runtime
//! failures are [`ScriptError`]s; every one of them is catchable by a script
//! `try` block.  The `return`/`break` signals are *not* errors and never appear
//! here; see [`ControlFlow`](super::interp::ControlFlow).

use thiserror::Error;

// ── Compile time ──────────────────────────────────────────────────────────────

/// A character in the source matched no token pattern.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("unexpected character '{ch}' at line {line}")]
    UnexpectedChar { ch: char, line: usize },

    #[error("unterminated string literal starting at line {line}")]
    UnterminatedString { line: usize },
}

/// A grammar violation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("unexpected end of input (expected {expected})")]
    UnexpectedEof { expected: String },

    #[error("expected {expected}, found {found} ('{text}') at line {line}")]
    Mismatch {
        expected: String,
        found: String,
        text: String,
        line: usize,
    },

    #[error("unknown statement '{text}' at line {line}")]
    UnknownStatement { text: String, line: usize },

    #[error("invalid expression '{text}' at line {line}")]
    InvalidExpression { text: String, line: usize },

    #[error("nesting deeper than {limit} levels at line {line}")]
    TooDeep { limit: usize, line: usize },
}

/// Anything that stops a program from being turned into IR.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("invalid IR: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid IR: {0}")]
    Shape(String),
}

// ── Runtime ───────────────────────────────────────────────────────────────────

/// A runtime failure.  All variants are catchable by `try`/`catch`; the
/// message bound to the catch variable is the `Display` form.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("{0}")]
    Name(String),

    #[error("{kind} '{name}' expects {expected} args, got {got}")]
    Arity {
        kind: &'static str,
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("index {index} out of range (length {len})")]
    Index { index: i64, len: usize },

    #[error("key '{0}' not found")]
    Key(String),

    #[error("division by zero")]
    DivisionByZero,

    /// Raised by `throw`; displays as the bare message.
    #[error("{0}")]
    User(String),

    #[error("Assertion Failed: {0}")]
    Assertion(String),

    #[error("error in native '{name}': {message}")]
    Native { name: String, message: String },

    #[error("invalid instruction: {0}")]
    InvalidInstruction(String),

    #[error("maximum call depth {0} exceeded")]
    RecursionLimit(usize),

    #[error("'return' used outside of a function")]
    ReturnOutsideFunction,

    #[error("'break' used outside of a loop")]
    BreakOutsideLoop,

    #[error(transparent)]
    Compile(#[from] CompileError),
}

impl ScriptError {
    pub fn undefined(what: &str, name: &str) -> Self {
        ScriptError::Name(format!("{what} '{name}' is not defined."))
    }

    pub fn native(name: impl Into<String>, message: impl Into<String>) -> Self {
        ScriptError::Native {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn mismatch(message: impl Into<String>) -> Self {
        ScriptError::TypeMismatch(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ScriptError::InvalidInstruction(message.into())
    }
}

pub type Result<T, E = ScriptError> = std::result::Result<T, E>;

// ── Tests ─────────────────────────────────────────────────────────────────────
