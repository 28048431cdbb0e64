//! tagscript: a small dynamically typed scripting language compiled to a
//! JSON tagged-sequence IR and run by a capability-based tree walker.
//!
//! The language core lives in [`script`]; the remaining modules make up the
//! `tagscript` command-line host.

pub mod cli;
pub mod config;
pub mod history;
pub mod repl;
pub mod script;
