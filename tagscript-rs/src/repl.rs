//! Interactive read-eval-print loop.
//!
//! Each line runs against one persistent [`Environment`].  A line starting
//! with `[` is IR JSON; anything else is compiled as source.  Failures are
//! printed and the loop carries on.

use std::io::{self, Write};
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::config::Config;
use crate::history::InputHistory;
use crate::script::{self, ir, CompileError, Environment, Interpreter, ScriptError};

/// What the loop should do after a line.
#[derive(Debug, PartialEq, Eq)]
pub enum Step {
    Continue,
    Exit,
}

enum LineError {
    Compile(CompileError),
    Runtime(ScriptError),
}

pub struct Repl {
    pub interp: Interpreter,
    pub env: Environment,
    pub history: InputHistory,
    history_size: usize,
    history_path: Option<PathBuf>,
    prompt: String,
    /// Show the prompt before each line.
    pub interactive: bool,
}

impl Repl {
    /// Build a loop around `interp`.  History starts empty; see
    /// [`Repl::load_history`].
    pub fn new(mut interp: Interpreter, config: &Config) -> Self {
        interp.echo = false;
        Repl {
            interp,
            env: Environment::new(),
            history: InputHistory::new(config.history_size),
            history_size: config.history_size,
            history_path: config.history_path(),
            prompt: config.prompt.clone(),
            interactive: false,
        }
    }

    /// Replace the in-memory history with the contents of the history file.
    pub fn load_history(&mut self) {
        let Some(path) = &self.history_path else { return };
        match InputHistory::load(path, self.history_size) {
            Ok(history) => self.history = history,
            Err(e) => warn!("cannot read history {}: {e}", path.display()),
        }
    }

    /// Skip reading and writing the history file.
    pub fn without_history_file(mut self) -> Self {
        self.history_path = None;
        self
    }

    pub fn banner(out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "tagscript {}", env!("CARGO_PKG_VERSION"))?;
        writeln!(out, "Type `exit' or `quit' to leave, `:history' to list input, `:reset' to clear state.")
    }

    /// Read lines from `next_line` until it runs dry or `exit` is entered.
    pub fn run(
        &mut self,
        mut next_line: impl FnMut() -> Option<String>,
        out: &mut impl Write,
    ) -> io::Result<()> {
        loop {
            if self.interactive {
                write!(out, "{}", self.prompt)?;
                out.flush()?;
            }
            let Some(line) = next_line() else { break };
            if self.handle_line(&line, out)? == Step::Exit {
                break;
            }
        }
        self.save_history();
        Ok(())
    }

    /// Process one input line.
    pub fn handle_line(&mut self, line: &str, out: &mut impl Write) -> io::Result<Step> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Step::Continue);
        }
        match line {
            "exit" | "quit" => return Ok(Step::Exit),
            ":history" => {
                for (n, entry) in self.history.iter_oldest_first().enumerate() {
                    writeln!(out, "{:>4}  {entry}", n + 1)?;
                }
                return Ok(Step::Continue);
            }
            _ => {}
        }
        self.history.record(line);
        if line == ":reset" {
            debug!("environment reset");
            self.env = Environment::new();
            return Ok(Step::Continue);
        }

        let result = self.eval_line(line);
        for produced in self.interp.take_output() {
            writeln!(out, "{produced}")?;
        }
        match result {
            Ok(()) => {}
            Err(LineError::Compile(e)) => writeln!(out, "Compile Error: {e}")?,
            Err(LineError::Runtime(ScriptError::Compile(e))) => writeln!(out, "Compile Error: {e}")?,
            Err(LineError::Runtime(e)) => writeln!(out, "Runtime Error: {e}")?,
        }
        Ok(Step::Continue)
    }

    fn eval_line(&mut self, line: &str) -> Result<(), LineError> {
        let program = if ir::looks_like_ir(line) {
            ir::parse_ir(line)
        } else {
            script::compile(line)
        }
        .map_err(LineError::Compile)?;
        self.interp.run(&program, &mut self.env).map_err(LineError::Runtime)
    }

    fn save_history(&self) {
        if let Some(path) = &self.history_path {
            if let Err(e) = self.history.save(path) {
                warn!("cannot write history {}: {e}", path.display());
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
