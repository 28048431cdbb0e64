//! Command-line argument parsing.
//!
//! Usage:
//!   tagscript [-dqp] [-r[<rcfile>]] [-c<source>] [-e<ir-json>] [<file>]
//!
//! The rc file name must be attached to the flag (`-r~/my.rc`).  A bare `-r`
//! skips the rc file, and the argument after it is never taken as one.

use std::path::PathBuf;

use directories::ProjectDirs;

pub const USAGE: &str = "Usage: tagscript [-dqp] [-r[<rcfile>]] [-c<source>] [-e<ir-json>] [<file>]
  -r          skip the rc file
  -r<rcfile>  load <rcfile> (no space) instead of searching for one";

// ── Public types ──────────────────────────────────────────────────────────────

/// Parsed command-line arguments.
#[derive(Debug, Default)]
pub struct CliArgs {
    /// Which rc file to load.
    pub config: ConfigFile,
    /// What to run.
    pub program: Program,
    /// Print the compiled IR instead of running it (`-p`).
    pub print_ir: bool,
    /// Suppress the REPL banner (`-q`).
    pub quiet: bool,
    /// Debug logging (`-d`).
    pub debug: bool,
}

/// How to choose the rc file.
#[derive(Debug, Default)]
pub enum ConfigFile {
    /// Search the platform config dir, then `./.tagscriptrc` (default).
    #[default]
    Search,
    /// `-r` with no file argument: skip the rc file.
    Skip,
    /// `-r<file>`: load this specific file.
    Explicit(PathBuf),
}

/// The program to execute.
#[derive(Debug, Default, PartialEq)]
pub enum Program {
    /// No program given: start the interactive loop.
    #[default]
    Repl,
    /// `-c<source>`
    Source(String),
    /// `-e<ir-json>`
    Ir(String),
    /// `<file>`, source or IR detected from its contents.
    File(PathBuf),
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `std::env::args()` and return [`CliArgs`] or an error message.
pub fn parse_args() -> Result<CliArgs, String> {
    let raw: Vec<String> = std::env::args().collect();
    parse_argv(raw.get(1..).unwrap_or_default())
}

fn set_program(args: &mut CliArgs, program: Program) -> Result<(), String> {
    if args.program != Program::Repl {
        return Err("only one of -c, -e or <file> may be given".to_owned());
    }
    args.program = program;
    Ok(())
}

/// Parse a slice of argument strings (exposed for testing).
pub fn parse_argv(argv: &[String]) -> Result<CliArgs, String> {
    let mut args = CliArgs::default();
    let mut positional: Vec<String> = Vec::new();
    let mut i = 0;

    while i < argv.len() {
        let arg = argv[i].as_str();

        if arg == "--" {
            i += 1;
            positional.extend(argv[i..].iter().cloned());
            break;
        }

        if !arg.starts_with('-') || arg == "-" {
            positional.push(arg.to_owned());
            i += 1;
            continue;
        }

        let chars: Vec<char> = arg[1..].chars().collect();
        let mut j = 0;
        while j < chars.len() {
            match chars[j] {
                'd' => args.debug = true,
                'q' => args.quiet = true,
                'p' => args.print_ir = true,

                // -r[<file>]; only an attached file counts.
                'r' => {
                    if j + 1 < chars.len() {
                        let file: String = chars[j + 1..].iter().collect();
                        args.config = ConfigFile::Explicit(PathBuf::from(file));
                        j = chars.len();
                    } else {
                        args.config = ConfigFile::Skip;
                    }
                }

                flag @ ('c' | 'e') => {
                    let text = if j + 1 < chars.len() {
                        let s: String = chars[j + 1..].iter().collect();
                        j = chars.len();
                        s
                    } else if i + 1 < argv.len() {
                        i += 1;
                        argv[i].clone()
                    } else if flag == 'c' {
                        return Err("-c requires a source argument".to_owned());
                    } else {
                        return Err("-e requires an IR argument".to_owned());
                    };
                    let program = if flag == 'c' { Program::Source(text) } else { Program::Ir(text) };
                    set_program(&mut args, program)?;
                }

                c => return Err(format!("unknown option: -{c}")),
            }
            j += 1;
        }
        i += 1;
    }

    match positional.len() {
        0 => {}
        1 => set_program(&mut args, Program::File(PathBuf::from(positional.remove(0))))?,
        n => return Err(format!("too many arguments ({n})")),
    }

    Ok(args)
}

// ── Path helpers ──────────────────────────────────────────────────────────────

/// Search for the rc file in the standard locations.
/// Returns the first path that exists, or `None`.
pub fn find_user_config() -> Option<PathBuf> {
    let platform = ProjectDirs::from("", "", "tagscript").map(|dirs| dirs.config_dir().join("tagscriptrc"));
    platform
        .into_iter()
        .chain(std::iter::once(PathBuf::from("./.tagscriptrc")))
        .find(|p| p.exists())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|&s| s.to_owned()).collect()
    }

    #[test]
    fn empty_args_start_repl() {
        let a = parse_argv(&argv(&[])).unwrap();
        assert_eq!(a.program, Program::Repl);
        assert!(matches!(a.config, ConfigFile::Search));
        assert!(!a.print_ir);
    }

    #[test]
    fn file_positional() {
        let a = parse_argv(&argv(&["prog.ts"])).unwrap();
        assert_eq!(a.program, Program::File(PathBuf::from("prog.ts")));
    }

    #[test]
    fn bool_flags() {
        let a = parse_argv(&argv(&["-d", "-q", "-p"])).unwrap();
        assert!(a.debug && a.quiet && a.print_ir);
    }

    #[test]
    fn combined_bool_flags() {
        let a = parse_argv(&argv(&["-dqp"])).unwrap();
        assert!(a.debug && a.quiet && a.print_ir);
    }

    #[test]
    fn source_embedded() {
        let a = parse_argv(&argv(&["-cprint 1"])).unwrap();
        assert_eq!(a.program, Program::Source("print 1".to_owned()));
    }

    #[test]
    fn source_separate() {
        let a = parse_argv(&argv(&["-c", "print 1"])).unwrap();
        assert_eq!(a.program, Program::Source("print 1".to_owned()));
    }

    #[test]
    fn ir_after_combined_flags() {
        let a = parse_argv(&argv(&["-pe", r#"[["print", 1]]"#])).unwrap();
        assert!(a.print_ir);
        assert_eq!(a.program, Program::Ir(r#"[["print", 1]]"#.to_owned()));
    }

    #[test]
    fn rc_skip() {
        let a = parse_argv(&argv(&["-r"])).unwrap();
        assert!(matches!(a.config, ConfigFile::Skip));
    }

    #[test]
    fn rc_skip_before_script() {
        let a = parse_argv(&argv(&["-r", "prog.ts"])).unwrap();
        assert!(matches!(a.config, ConfigFile::Skip));
        assert_eq!(a.program, Program::File(PathBuf::from("prog.ts")));
    }

    #[test]
    fn rc_explicit_embedded() {
        let a = parse_argv(&argv(&["-rmy.conf"])).unwrap();
        assert!(matches!(&a.config, ConfigFile::Explicit(p) if p == &PathBuf::from("my.conf")));
    }

    #[test]
    fn rc_file_must_be_attached() {
        let a = parse_argv(&argv(&["-r", "tagscriptrc"])).unwrap();
        assert!(matches!(a.config, ConfigFile::Skip));
        assert_eq!(a.program, Program::File(PathBuf::from("tagscriptrc")));

        assert!(parse_argv(&argv(&["-r", "my.conf", "prog.ts"])).is_err());

        let a = parse_argv(&argv(&["-dr.tagscriptrc", "prog.ts"])).unwrap();
        assert!(a.debug);
        assert!(matches!(&a.config, ConfigFile::Explicit(p) if p == &PathBuf::from(".tagscriptrc")));
        assert_eq!(a.program, Program::File(PathBuf::from("prog.ts")));
    }

    #[test]
    fn two_programs_rejected() {
        assert!(parse_argv(&argv(&["-cprint 1", "prog.ts"])).is_err());
        assert!(parse_argv(&argv(&["-cprint 1", "-e[]"])).is_err());
    }

    #[test]
    fn missing_source_argument() {
        assert!(parse_argv(&argv(&["-c"])).is_err());
    }

    #[test]
    fn too_many_positional() {
        assert!(parse_argv(&argv(&["a", "b"])).is_err());
    }

    #[test]
    fn unknown_flag() {
        assert!(parse_argv(&argv(&["-z"])).is_err());
    }
}
