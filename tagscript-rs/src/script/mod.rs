//! The tagscript language core.
//!
//! Source text is tokenized ([`lexer`]) and parsed ([`parser`]) into a
//! JSON-compatible tagged-sequence IR ([`ir`]).  The [`Interpreter`] executes
//! that IR against an [`Environment`], delegating non-core operations to
//! pluggable [`Capability`] providers ([`builtins`] holds the defaults).
//!
//! # Quick start
//!
//! ```rust
//! use tagscript::script::{Environment, Interpreter};
//!
//! let mut interp = Interpreter::new();
//! let mut env = Environment::new();
//! interp.exec_source("var x = 6\nprint x * 7", &mut env).unwrap();
//! assert_eq!(interp.output, vec!["42"]);
//! ```
//!
//! Pre-built IR runs without compiling:
//!
//! ```rust
//! use tagscript::script::{ir, Environment, Interpreter};
//!
//! let program = ir::parse_ir(r#"[["print", ["+", "a", 1]]]"#).unwrap();
//! let mut interp = Interpreter::new();
//! interp.run(&program, &mut Environment::new()).unwrap();
//! assert_eq!(interp.output, vec!["a1"]);
//! ```

pub mod builtins;
pub mod env;
pub mod error;
pub mod eval;
pub mod interp;
pub mod ir;
pub mod lexer;
pub mod parser;
pub mod value;

// Re-exports for convenience.
pub use env::Environment;
pub use error::{CompileError, ScriptError};
pub use eval::{Capability, EvalContext};
pub use interp::{ControlFlow, Interpreter};
pub use ir::Node;
pub use value::Value;

/// Compile source text to a top-level instruction list.
pub fn compile(src: &str) -> Result<Vec<Node>, CompileError> {
    let tokens = lexer::tokenize(src)?;
    Ok(parser::parse(tokens)?)
}
