use std::io;
use std::path::Path;
use std::process::ExitCode;

use tracing::{debug, warn};
use tracing_subscriber::{fmt, EnvFilter};

use tagscript::cli::{self, CliArgs, ConfigFile, Program};
use tagscript::config::Config;
use tagscript::repl::Repl;
use tagscript::script::{self, ir, CompileError, Interpreter, Node, ScriptError};

enum Failure {
    Compile(CompileError),
    Runtime(ScriptError),
    Io(String),
}

impl From<CompileError> for Failure {
    fn from(e: CompileError) -> Self {
        Failure::Compile(e)
    }
}

impl From<ScriptError> for Failure {
    fn from(e: ScriptError) -> Self {
        match e {
            ScriptError::Compile(c) => Failure::Compile(c),
            other => Failure::Runtime(other),
        }
    }
}

fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("tagscript: {e}");
            eprintln!("{}", cli::USAGE);
            return ExitCode::FAILURE;
        }
    };

    let config = load_config(&args.config);
    init_logging(&args, &config);

    match run_on_script_thread(&args, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(Failure::Compile(e)) => {
            eprintln!("Compile Error: {e}");
            ExitCode::FAILURE
        }
        Err(Failure::Runtime(e)) => {
            eprintln!("Runtime Error: {e}");
            ExitCode::FAILURE
        }
        Err(Failure::Io(msg)) => {
            eprintln!("tagscript: {msg}");
            ExitCode::FAILURE
        }
    }
}

// ── Startup ───────────────────────────────────────────────────────────────────

fn load_config(spec: &ConfigFile) -> Config {
    let path = match spec {
        ConfigFile::Skip => return Config::default(),
        ConfigFile::Explicit(path) => path.clone(),
        ConfigFile::Search => match cli::find_user_config() {
            Some(path) => path,
            None => return Config::default(),
        },
    };
    match Config::load_file(&path) {
        Ok((config, errors)) => {
            for e in errors {
                eprintln!("tagscript: {}: {e}", path.display());
            }
            config
        }
        Err(e) => {
            eprintln!("tagscript: warning: {}: {e}", path.display());
            Config::default()
        }
    }
}

/// `TAGSCRIPT_LOG`, else `-d`, else the rc file's `log` key, else `warn`.
fn init_logging(args: &CliArgs, config: &Config) {
    let fallback = if args.debug {
        "debug".to_owned()
    } else {
        config.log.clone().unwrap_or_else(|| "warn".to_owned())
    };
    let filter = EnvFilter::try_from_env("TAGSCRIPT_LOG")
        .or_else(|_| EnvFilter::try_new(&fallback))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

// ── Execution ─────────────────────────────────────────────────────────────────

/// Stack reserved per allowed call frame, sized for unoptimised builds.
const FRAME_STACK: usize = 128 * 1024;
/// Stack for compiling and everything outside call frames.
const BASE_STACK: usize = 16 * 1024 * 1024;

/// Compile and run on a thread whose stack covers `max_depth` nested calls,
/// so the depth limit fires before the native stack runs out.
fn run_on_script_thread(args: &CliArgs, config: &Config) -> Result<(), Failure> {
    let stack = BASE_STACK.saturating_add(config.max_depth.saturating_mul(FRAME_STACK));
    debug!(stack, "starting script thread");
    std::thread::scope(|scope| {
        let handle = std::thread::Builder::new()
            .name("script".to_owned())
            .stack_size(stack)
            .spawn_scoped(scope, || run(args, config))
            .map_err(|e| Failure::Io(format!("cannot start script thread: {e}")))?;
        handle
            .join()
            .unwrap_or_else(|_| Err(Failure::Io("script thread panicked".to_owned())))
    })
}

fn run(args: &CliArgs, config: &Config) -> Result<(), Failure> {
    let program: Vec<Node> = match &args.program {
        Program::Repl => return run_repl(args, config),
        Program::Source(src) => script::compile(src)?,
        Program::Ir(text) => ir::parse_ir(text)?,
        Program::File(path) => load_file(path)?,
    };

    if args.print_ir {
        let pretty = serde_json::to_string_pretty(&Node::Array(program))
            .map_err(|e| Failure::Io(e.to_string()))?;
        println!("{pretty}");
        return Ok(());
    }

    let mut interp = Interpreter::new();
    config.apply(&mut interp);
    interp.echo = true;
    debug!(instructions = program.len(), "running program");
    interp.run(&program, &mut script::Environment::new())?;
    Ok(())
}

fn load_file(path: &Path) -> Result<Vec<Node>, Failure> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Failure::Io(format!("{}: {e}", path.display())))?;
    Ok(ir::load_program(&text)?)
}

fn run_repl(args: &CliArgs, config: &Config) -> Result<(), Failure> {
    if args.print_ir {
        return Err(Failure::Io("-p needs a program (-c, -e or <file>)".to_owned()));
    }
    let is_tty = unsafe { libc::isatty(libc::STDIN_FILENO) != 0 && libc::isatty(libc::STDOUT_FILENO) != 0 };

    let mut interp = Interpreter::new();
    config.apply(&mut interp);
    let mut repl = Repl::new(interp, config);
    repl.load_history();
    repl.interactive = is_tty;

    let mut stdout = io::stdout();
    if is_tty && !args.quiet {
        Repl::banner(&mut stdout).map_err(|e| Failure::Io(e.to_string()))?;
    }

    let stdin = io::stdin();
    let next_line = || {
        let mut buf = String::new();
        match stdin.read_line(&mut buf) {
            Ok(0) => None,
            Ok(_) => Some(buf),
            Err(e) => {
                warn!("stdin: {e}");
                None
            }
        }
    };
    repl.run(next_line, &mut stdout).map_err(|e| Failure::Io(e.to_string()))
}
