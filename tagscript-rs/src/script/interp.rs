//! Instruction executor.
//!
//! The [`Interpreter`] runs instruction lists against an [`Environment`].
//! `return` and `break` unwind as [`ControlFlow`] values returned alongside
//! `Ok`, never as errors, so `try` blocks cannot intercept them.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use super::builtins::default_capabilities;
use super::env::{Class, Environment, Function, Method};
use super::error::{Result, ScriptError};
use super::eval::{eval_expr, is_expression_tag, Capability, EvalContext, Frame, Registry};
use super::ir::{self, split_tag, Node};
use super::value::Value;

/// Default bound on nested function and method calls.
pub const DEFAULT_MAX_DEPTH: usize = 200;

// ── ControlFlow ───────────────────────────────────────────────────────────────

/// Non-error control-flow signals that unwind the statement loop.
#[derive(Debug)]
pub enum ControlFlow {
    Break,
    Return(Value),
}

/// Callback used to load `import` targets.  Receives the resolved path.
pub type FileLoader = Arc<dyn Fn(&str) -> std::result::Result<String, String>>;

/// Callback used by `input`.  Receives the prompt; `None` means end of input.
pub type LineReader = Box<dyn FnMut(&str) -> Option<String>>;

// ── Interpreter ───────────────────────────────────────────────────────────────

pub struct Interpreter {
    registry: Registry,
    /// Lines produced by `print` and import diagnostics (when not echoing).
    pub output: Vec<String>,
    /// Write output lines to stdout as they are produced instead of buffering.
    pub echo: bool,
    /// Optional override for reading `import` targets.
    pub file_loader: Option<FileLoader>,
    /// Optional override for `input`; defaults to stdin.
    pub line_reader: Option<LineReader>,
    /// Directory relative `import` paths resolve against.
    pub import_root: PathBuf,
    /// Maximum nesting of script calls.
    pub max_depth: usize,
    depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// An interpreter with the default capability providers.
    pub fn new() -> Self {
        let mut interp = Self::bare();
        for cap in default_capabilities() {
            interp.register_capability(cap);
        }
        interp
    }

    /// An interpreter with no capability providers.
    pub fn bare() -> Self {
        Interpreter {
            registry: Registry::new(),
            output: Vec::new(),
            echo: false,
            file_loader: None,
            line_reader: None,
            import_root: PathBuf::from("."),
            max_depth: DEFAULT_MAX_DEPTH,
            depth: 0,
        }
    }

    pub fn register_capability(&mut self, cap: Rc<dyn Capability>) {
        self.registry.register(cap);
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Drain buffered output.
    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }

    fn emit(&mut self, line: String) {
        if self.echo {
            println!("{line}");
        } else {
            self.output.push(line);
        }
    }

    /// Run a whole program.  A `return` or `break` escaping the top level is
    /// an error.
    pub fn run(&mut self, program: &[Node], env: &mut Environment) -> Result<()> {
        match self.exec_block(program, env)? {
            None => Ok(()),
            Some(ControlFlow::Return(_)) => Err(ScriptError::ReturnOutsideFunction),
            Some(ControlFlow::Break) => Err(ScriptError::BreakOutsideLoop),
        }
    }

    /// Compile and run source text.
    pub fn exec_source(&mut self, src: &str, env: &mut Environment) -> Result<()> {
        let program = super::compile(src)?;
        self.run(&program, env)
    }

    /// Evaluate one expression node.
    pub fn eval(&mut self, node: &Node, env: &mut Environment) -> Result<Value> {
        eval_expr(node, env, self)
    }

    /// Execute instructions in order, stopping at the first control signal.
    pub fn exec_block(&mut self, stmts: &[Node], env: &mut Environment) -> Result<Option<ControlFlow>> {
        for stmt in stmts {
            if let Some(cf) = self.exec_instruction(stmt, env)? {
                return Ok(Some(cf));
            }
        }
        Ok(None)
    }

    /// Execute a single instruction.
    pub fn exec_instruction(&mut self, node: &Node, env: &mut Environment) -> Result<Option<ControlFlow>> {
        let Some((tag, args)) = split_tag(node) else {
            return Err(ScriptError::invalid(format!(
                "instruction must be a tagged sequence, got {node}"
            )));
        };
        trace!(tag, "exec");

        match tag {
            "comment" => Ok(None),

            "set" => {
                let name = ir::name_operand(tag, args, 0)?;
                let value = self.eval(ir::operand(tag, args, 1)?, env)?;
                env.set(name, value);
                Ok(None)
            }

            "print" => {
                let mut line = String::new();
                for arg in args {
                    line.push_str(&self.eval(arg, env)?.to_string());
                }
                self.emit(line);
                Ok(None)
            }

            "function" => {
                let name = ir::name_operand(tag, args, 0)?;
                let params = ir::params_operand(tag, ir::operand(tag, args, 1)?)?;
                let body = ir::block_operand(tag, args, 2)?.to_vec();
                env.define_function(Function::Script {
                    name: name.to_owned(),
                    params,
                    body,
                });
                Ok(None)
            }

            "return" => {
                let value = match args.first() {
                    Some(expr) => self.eval(expr, env)?,
                    None => Value::Null,
                };
                Ok(Some(ControlFlow::Return(value)))
            }

            "break" => Ok(Some(ControlFlow::Break)),

            "while" => {
                let cond = ir::operand(tag, args, 0)?;
                let body = ir::block_operand(tag, args, 1)?;
                while self.eval(cond, env)?.truthy() {
                    match self.exec_block(body, env)? {
                        Some(ControlFlow::Break) => break,
                        Some(cf @ ControlFlow::Return(_)) => return Ok(Some(cf)),
                        None => {}
                    }
                }
                Ok(None)
            }

            "for_range" => self.exec_for_range(args, env),

            "if" => {
                let cond = self.eval(ir::operand(tag, args, 0)?, env)?;
                if cond.truthy() {
                    self.exec_block(ir::block_operand(tag, args, 1)?, env)
                } else {
                    match args.get(2) {
                        Some(Node::Null) | None => Ok(None),
                        Some(block) => self.exec_block(ir::as_block(tag, block)?, env),
                    }
                }
            }

            "switch" => self.exec_switch(args, env),

            "push" => {
                let target = self.eval(ir::operand(tag, args, 0)?, env)?;
                let Value::List(items) = target else {
                    return Err(ScriptError::mismatch(format!(
                        "push target is not a list (got {})",
                        target.type_name()
                    )));
                };
                let value = self.eval(ir::operand(tag, args, 1)?, env)?;
                items.borrow_mut().push(value);
                Ok(None)
            }

            "put" => {
                let target = self.eval(ir::operand(tag, args, 0)?, env)?;
                let Value::Map(map) = target else {
                    return Err(ScriptError::mismatch(format!(
                        "put target is not a dict (got {})",
                        target.type_name()
                    )));
                };
                let key = self.eval(ir::operand(tag, args, 1)?, env)?.to_string();
                let value = self.eval(ir::operand(tag, args, 2)?, env)?;
                map.borrow_mut().insert(key, value);
                Ok(None)
            }

            "input" => {
                let name = ir::name_operand(tag, args, 0)?;
                let prompt = match args.get(1) {
                    Some(p) => self.eval(p, env)?.to_string(),
                    None => String::new(),
                };
                let line = self.read_line(&prompt);
                env.set(name, parse_input(&line));
                Ok(None)
            }

            "write_file" => {
                let path = self.eval(ir::operand(tag, args, 0)?, env)?.to_string();
                let content = self.eval(ir::operand(tag, args, 1)?, env)?.to_string();
                std::fs::write(&path, content)
                    .map_err(|e| ScriptError::native("write_file", format!("{path}: {e}")))?;
                Ok(None)
            }

            "import" => {
                let path = self.eval(ir::operand(tag, args, 0)?, env)?.to_string();
                self.exec_import(&path, env);
                Ok(None)
            }

            "try" => {
                let body = ir::block_operand(tag, args, 0)?;
                let var = ir::name_operand(tag, args, 1)?;
                let handler = ir::block_operand(tag, args, 2)?;
                match self.exec_block(body, env) {
                    Ok(cf) => Ok(cf),
                    Err(e) => {
                        debug!(error = %e, "caught");
                        env.set(var, Value::Str(e.to_string()));
                        self.exec_block(handler, env)
                    }
                }
            }

            "sleep" => {
                let secs = self.eval(ir::operand(tag, args, 0)?, env)?.to_float()?;
                let duration = Duration::try_from_secs_f64(secs)
                    .map_err(|e| ScriptError::native("sleep", e.to_string()))?;
                std::thread::sleep(duration);
                Ok(None)
            }

            "class" => {
                let class = parse_class(args)?;
                if let Some(parent) = &class.parent {
                    warn!(
                        class = %class.name,
                        parent = %parent,
                        "class inheritance is not resolved; parent methods are not visible"
                    );
                }
                env.define_class(class);
                Ok(None)
            }

            "throw" => {
                let msg = self.eval(ir::operand(tag, args, 0)?, env)?;
                Err(ScriptError::User(msg.to_string()))
            }

            "assert" => {
                if self.eval(ir::operand(tag, args, 0)?, env)?.truthy() {
                    return Ok(None);
                }
                let msg = self.eval(ir::operand(tag, args, 1)?, env)?;
                Err(ScriptError::Assertion(msg.to_string()))
            }

            _ if is_expression_tag(tag, &*self) => {
                self.eval(node, env)?;
                Ok(None)
            }

            _ => Err(ScriptError::Name(format!("Unknown instruction '{tag}'."))),
        }
    }

    fn exec_for_range(&mut self, args: &[Node], env: &mut Environment) -> Result<Option<ControlFlow>> {
        const TAG: &str = "for_range";
        let var = ir::name_operand(TAG, args, 0)?;
        let start = self.eval(ir::operand(TAG, args, 1)?, env)?.to_int()?;
        let end = self.eval(ir::operand(TAG, args, 2)?, env)?.to_int()?;
        let step = self.eval(ir::operand(TAG, args, 3)?, env)?.to_int()?;
        let body = ir::block_operand(TAG, args, 4)?;
        if step == 0 {
            return Err(ScriptError::invalid("for_range step must not be zero"));
        }

        let mut i = start;
        while (step > 0 && i < end) || (step < 0 && i > end) {
            env.set(var, Value::Int(i));
            match self.exec_block(body, env)? {
                Some(ControlFlow::Break) => break,
                Some(cf @ ControlFlow::Return(_)) => return Ok(Some(cf)),
                None => {}
            }
            match i.checked_add(step) {
                Some(next) => i = next,
                None => break,
            }
        }
        Ok(None)
    }

    fn exec_switch(&mut self, args: &[Node], env: &mut Environment) -> Result<Option<ControlFlow>> {
        const TAG: &str = "switch";
        let subject = self.eval(ir::operand(TAG, args, 0)?, env)?;
        let cases = ir::block_operand(TAG, args, 1)?;
        for case in cases {
            let pair = case
                .as_array()
                .filter(|p| p.len() == 2)
                .ok_or_else(|| ScriptError::invalid(format!("malformed switch case: {case}")))?;
            if self.eval(&pair[0], env)? == subject {
                // Not a break target: a break here unwinds to the enclosing loop.
                return self.exec_block(ir::as_block(TAG, &pair[1])?, env);
            }
        }
        match args.get(2) {
            Some(Node::Null) | None => Ok(None),
            Some(default) => self.exec_block(ir::as_block(TAG, default)?, env),
        }
    }

    // ── Import ────────────────────────────────────────────────────────────────

    fn resolve_import(&self, path: &str) -> PathBuf {
        let p = PathBuf::from(path);
        if p.is_absolute() {
            p
        } else {
            self.import_root.join(p)
        }
    }

    fn load_import(&self, path: &str) -> std::result::Result<String, String> {
        let resolved = self.resolve_import(path);
        match &self.file_loader {
            Some(loader) => loader(&resolved.to_string_lossy()),
            None => std::fs::read_to_string(&resolved).map_err(|e| e.to_string()),
        }
    }

    /// Load and run `path` inside `env`.  Failures are reported, not raised.
    fn exec_import(&mut self, path: &str, env: &mut Environment) {
        info!(path, "import");
        let result = self
            .load_import(path)
            .map_err(|e| format!("File '{path}' could not be read: {e}"))
            .and_then(|text| ir::load_program(&text).map_err(|e| e.to_string()))
            .and_then(|program| self.run(&program, env).map_err(|e| e.to_string()));
        if let Err(msg) = result {
            warn!(path, error = %msg, "import failed");
            self.emit(format!("Import Error in '{path}': {msg}"));
        }
    }

    // ── Input ─────────────────────────────────────────────────────────────────

    fn read_line(&mut self, prompt: &str) -> String {
        if let Some(reader) = self.line_reader.as_mut() {
            return reader(prompt).unwrap_or_default();
        }
        print!("{prompt}");
        let _ = io::stdout().flush();
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(_) => line.trim_end_matches(['\n', '\r']).to_owned(),
            Err(e) => {
                warn!(error = %e, "input failed");
                String::new()
            }
        }
    }
}

impl EvalContext for Interpreter {
    fn capability(&self, tag: &str) -> Option<Rc<dyn Capability>> {
        self.registry.get(tag)
    }

    fn call_frame(&mut self, frame: Frame<'_>, env: &mut Environment) -> Result<Value> {
        if self.depth >= self.max_depth {
            return Err(ScriptError::RecursionLimit(self.max_depth));
        }
        debug!(kind = frame.kind, name = frame.name, "enter");
        self.depth += 1;
        env.push_scope();
        for (name, value) in frame.bindings {
            env.set(name, value);
        }
        let result = self.exec_block(frame.body, env);
        env.pop_scope();
        self.depth -= 1;
        debug!(kind = frame.kind, name = frame.name, "exit");

        match result? {
            Some(ControlFlow::Return(v)) => Ok(v),
            Some(ControlFlow::Break) => Err(ScriptError::BreakOutsideLoop),
            None => Ok(Value::Null),
        }
    }
}

/// Build a class descriptor from `["class", name, params, methods, parent?]`
/// operands.
fn parse_class(args: &[Node]) -> Result<Class> {
    const TAG: &str = "class";
    let name = ir::name_operand(TAG, args, 0)?.to_owned();
    let params = ir::params_operand(TAG, ir::operand(TAG, args, 1)?)?;
    let table = ir::operand(TAG, args, 2)?;
    let table = table
        .as_object()
        .ok_or_else(|| ScriptError::invalid(format!("'class' expects a method table, got {table}")))?;

    let mut methods = std::collections::HashMap::with_capacity(table.len());
    for (method, def) in table {
        let pair = def
            .as_array()
            .filter(|p| p.len() == 2)
            .ok_or_else(|| ScriptError::invalid(format!("malformed method '{method}': {def}")))?;
        methods.insert(
            method.clone(),
            Method {
                params: ir::params_operand(TAG, &pair[0])?,
                body: ir::as_block(TAG, &pair[1])?.to_vec(),
            },
        );
    }

    let parent = match args.get(3) {
        Some(Node::String(p)) => Some(p.clone()),
        Some(Node::Null) | None => None,
        Some(other) => {
            return Err(ScriptError::invalid(format!(
                "'class' parent must be a name, got {other}"
            )))
        }
    };

    Ok(Class {
        name,
        params,
        methods,
        parent,
    })
}

/// Convert an `input` line: all digits → int, parseable → float, else string.
fn parse_input(line: &str) -> Value {
    if !line.is_empty() && line.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(n) = line.parse::<i64>() {
            return Value::Int(n);
        }
    }
    match line.trim().parse::<f64>() {
        Ok(x) => Value::Float(x),
        Err(_) => Value::Str(line.to_owned()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
