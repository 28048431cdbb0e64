//! Default capability providers.
//!
//! Each provider evaluates its operands through the evaluator callback and
//! then does its native work on plain [`Value`]s.  Providers are registered
//! with the interpreter in the order returned by [`default_capabilities`].

use std::path::Path;
use std::process::Command;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use regex::Regex;
use tracing::debug;

use super::env::Environment;
use super::error::{Result, ScriptError};
use super::eval::{Capability, EvalContext};
use super::ir::Node;
use super::value::Value;

/// The providers an [`Interpreter::new`](super::Interpreter::new) starts with.
pub fn default_capabilities() -> Vec<Rc<dyn Capability>> {
    vec![
        Rc::new(MathCapability),
        Rc::new(StringCapability),
        Rc::new(IoCapability),
        Rc::new(SysCapability),
        Rc::new(TimeCapability),
        Rc::new(FsCapability),
    ]
}

// ── Math ──────────────────────────────────────────────────────────────────────

pub struct MathCapability;

impl Capability for MathCapability {
    fn name(&self) -> &'static str {
        "math"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["random", "randint", "sqrt", "pow", "abs", "round", "floor", "ceil", "PI", "to_int"]
    }

    fn handle(
        &self,
        tag: &str,
        args: &[Node],
        env: &mut Environment,
        ctx: &mut dyn EvalContext,
    ) -> Result<Value> {
        let args = ctx.eval_all(args, env)?;
        Ok(match tag {
            "random" => Value::Float(random_unit()),
            "randint" => {
                let lo = get_int(&args, 0, tag)?;
                let hi = get_int(&args, 1, tag)?;
                if lo > hi {
                    return Err(ScriptError::native(tag, format!("empty range ({lo}, {hi})")));
                }
                let span = (hi as i128 - lo as i128 + 1) as u128;
                Value::Int((lo as i128 + (random_u64() as u128 % span) as i128) as i64)
            }
            "sqrt" => {
                let x = get_float(&args, 0, tag)?;
                if x < 0.0 {
                    return Err(ScriptError::native(tag, "math domain error"));
                }
                Value::Float(x.sqrt())
            }
            "pow" => Value::Float(get_float(&args, 0, tag)?.powf(get_float(&args, 1, tag)?)),
            "abs" => match get(&args, 0, tag)? {
                Value::Int(n) => n.checked_abs().map_or(Value::Float((*n as f64).abs()), Value::Int),
                v => Value::Float(v.to_float()?.abs()),
            },
            "round" => {
                let digits = match args.get(1) {
                    Some(d) => Some(d.to_int()?),
                    None => None,
                };
                round(get(&args, 0, tag)?, digits)?
            }
            "floor" | "ceil" => match get(&args, 0, tag)? {
                Value::Int(n) => Value::Int(*n),
                v => {
                    let x = v.to_float()?;
                    float_to_int(tag, if tag == "floor" { x.floor() } else { x.ceil() })?
                }
            },
            "PI" => Value::Float(std::f64::consts::PI),
            "to_int" => Value::Int(get(&args, 0, tag)?.to_int()?),
            _ => return Err(unclaimed(self, tag)),
        })
    }
}

/// `round(x)` rounds half to even and yields an int; `round(x, digits)`
/// keeps the input's type.
fn round(value: &Value, digits: Option<i64>) -> Result<Value> {
    match (value, digits) {
        (Value::Int(n), Some(d)) if d >= 0 => Ok(Value::Int(*n)),
        (Value::Int(n), None) => Ok(Value::Int(*n)),
        (v, None) => float_to_int("round", v.to_float()?.round_ties_even()),
        (v, Some(d)) => {
            let scale = 10f64.powi(d.clamp(-308, 308) as i32);
            let rounded = (v.to_float()? * scale).round_ties_even() / scale;
            match v {
                Value::Int(_) => float_to_int("round", rounded),
                _ => Ok(Value::Float(rounded)),
            }
        }
    }
}

fn float_to_int(tag: &str, x: f64) -> Result<Value> {
    if !x.is_finite() || x.abs() >= 9.2e18 {
        return Err(ScriptError::native(tag, format!("cannot convert {x} to int")));
    }
    Ok(Value::Int(x as i64))
}

// ── xorshift PRNG ─────────────────────────────────────────────────────────────

/// Xorshift64 seeded from the clock on first use.  Not cryptographically
/// secure.
fn random_u64() -> u64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    static STATE: AtomicU64 = AtomicU64::new(0);
    let mut s = STATE.load(Ordering::Relaxed);
    if s == 0 {
        s = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0xdeadbeef);
        if s == 0 {
            s = 0xdeadbeef;
        }
    }
    s ^= s << 13;
    s ^= s >> 7;
    s ^= s << 17;
    STATE.store(s, Ordering::Relaxed);
    s
}

/// Uniform float in `[0, 1)`.
fn random_unit() -> f64 {
    (random_u64() >> 11) as f64 / (1u64 << 53) as f64
}

// ── String ────────────────────────────────────────────────────────────────────

pub struct StringCapability;

impl Capability for StringCapability {
    fn name(&self) -> &'static str {
        "string"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["concat", "split", "replace", "upper", "lower", "parse_json", "regex_match"]
    }

    fn handle(
        &self,
        tag: &str,
        args: &[Node],
        env: &mut Environment,
        ctx: &mut dyn EvalContext,
    ) -> Result<Value> {
        let args = ctx.eval_all(args, env)?;
        Ok(match tag {
            "concat" => Value::Str(args.iter().map(Value::to_string).collect()),
            "split" => {
                let s = get_str(&args, 0, tag)?;
                let sep = get_str(&args, 1, tag)?;
                if sep.is_empty() {
                    return Err(ScriptError::native(tag, "empty separator"));
                }
                s.split(sep.as_str()).map(Value::from).collect::<Vec<_>>().into()
            }
            "replace" => {
                let s = get_str(&args, 0, tag)?;
                Value::Str(s.replace(&get_str(&args, 1, tag)?, &get_str(&args, 2, tag)?))
            }
            "upper" => Value::Str(get_str(&args, 0, tag)?.to_uppercase()),
            "lower" => Value::Str(get_str(&args, 0, tag)?.to_lowercase()),
            "parse_json" => {
                let text = get_str(&args, 0, tag)?;
                let doc: Node = serde_json::from_str(&text).map_err(|e| {
                    ScriptError::native(tag, format!("Failed to parse JSON string: {e}"))
                })?;
                Value::from_json(&doc)
            }
            "regex_match" => {
                let text = get_str(&args, 0, tag)?;
                let pattern = get_str(&args, 1, tag)?;
                let re = Regex::new(&pattern)
                    .map_err(|e| ScriptError::native(tag, format!("regex error: {e}")))?;
                Value::Bool(re.is_match(&text))
            }
            _ => return Err(unclaimed(self, tag)),
        })
    }
}

// ── IO ────────────────────────────────────────────────────────────────────────

pub struct IoCapability;

impl Capability for IoCapability {
    fn name(&self) -> &'static str {
        "io"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["read_file"]
    }

    fn handle(
        &self,
        tag: &str,
        args: &[Node],
        env: &mut Environment,
        ctx: &mut dyn EvalContext,
    ) -> Result<Value> {
        let args = ctx.eval_all(args, env)?;
        let path = get_str(&args, 0, tag)?;
        std::fs::read_to_string(&path)
            .map(Value::Str)
            .map_err(|e| ScriptError::native(tag, format!("{path}: {e}")))
    }
}

// ── Sys ───────────────────────────────────────────────────────────────────────

pub struct SysCapability;

impl Capability for SysCapability {
    fn name(&self) -> &'static str {
        "sys"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["exec", "os_name", "cwd", "env"]
    }

    fn handle(
        &self,
        tag: &str,
        args: &[Node],
        env: &mut Environment,
        ctx: &mut dyn EvalContext,
    ) -> Result<Value> {
        let args = ctx.eval_all(args, env)?;
        Ok(match tag {
            "exec" => Value::Str(shell(&get_str(&args, 0, tag)?)?),
            "os_name" => Value::from(os_name()),
            "cwd" => std::env::current_dir()
                .map(|p| Value::Str(p.display().to_string()))
                .map_err(|e| ScriptError::native(tag, e.to_string()))?,
            "env" => Value::Str(std::env::var(get_str(&args, 0, tag)?).unwrap_or_default()),
            _ => return Err(unclaimed(self, tag)),
        })
    }
}

/// Run `cmd` through `sh -c` and return its trimmed stdout.
fn shell(cmd: &str) -> Result<String> {
    debug!(command = cmd, "exec");
    let out = Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .output()
        .map_err(|e| ScriptError::native("exec", e.to_string()))?;
    if !out.status.success() {
        let code = out.status.code().map_or("signal".to_owned(), |c| c.to_string());
        return Err(ScriptError::native(
            "exec",
            format!(
                "Command failed (code {code}): {}",
                String::from_utf8_lossy(&out.stderr).trim()
            ),
        ));
    }
    Ok(String::from_utf8_lossy(&out.stdout).trim().to_owned())
}

fn os_name() -> &'static str {
    match std::env::consts::OS {
        "linux" => "Linux",
        "macos" => "Darwin",
        "windows" => "Windows",
        other => other,
    }
}

// ── Time ──────────────────────────────────────────────────────────────────────

pub struct TimeCapability;

impl Capability for TimeCapability {
    fn name(&self) -> &'static str {
        "time"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["timestamp"]
    }

    fn handle(
        &self,
        tag: &str,
        _args: &[Node],
        _env: &mut Environment,
        _ctx: &mut dyn EvalContext,
    ) -> Result<Value> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| Value::Float(d.as_secs_f64()))
            .map_err(|e| ScriptError::native(tag, e.to_string()))
    }
}

// ── Filesystem ────────────────────────────────────────────────────────────────

pub struct FsCapability;

impl Capability for FsCapability {
    fn name(&self) -> &'static str {
        "fs"
    }

    fn tags(&self) -> &'static [&'static str] {
        &["fs_exists", "fs_list", "fs_remove", "fs_mkdir", "fs_copy"]
    }

    fn handle(
        &self,
        tag: &str,
        args: &[Node],
        env: &mut Environment,
        ctx: &mut dyn EvalContext,
    ) -> Result<Value> {
        let args = ctx.eval_all(args, env)?;
        let path = get_str(&args, 0, tag)?;
        let path = Path::new(&path);
        Ok(match tag {
            "fs_exists" => Value::Bool(path.exists()),
            "fs_list" => {
                let entries = std::fs::read_dir(path)
                    .map_err(|e| ScriptError::native(tag, format!("{}: {e}", path.display())))?;
                let mut names = Vec::new();
                for entry in entries {
                    let entry = entry.map_err(|e| ScriptError::native(tag, e.to_string()))?;
                    names.push(entry.file_name().to_string_lossy().into_owned());
                }
                names.sort();
                names.into_iter().map(Value::Str).collect::<Vec<_>>().into()
            }
            "fs_remove" => {
                let result = if path.is_dir() {
                    std::fs::remove_dir_all(path)
                } else {
                    std::fs::remove_file(path)
                };
                Value::Bool(result.is_ok())
            }
            "fs_mkdir" => Value::Bool(std::fs::create_dir_all(path).is_ok()),
            "fs_copy" => {
                let dest = get_str(&args, 1, tag)?;
                Value::Bool(std::fs::copy(path, dest).is_ok())
            }
            _ => return Err(unclaimed(self, tag)),
        })
    }
}

// ── Argument accessors ────────────────────────────────────────────────────────

fn unclaimed(cap: &dyn Capability, tag: &str) -> ScriptError {
    ScriptError::invalid(format!("{} cannot handle '{tag}'", cap.name()))
}

fn get<'a>(args: &'a [Value], idx: usize, name: &str) -> Result<&'a Value> {
    args.get(idx)
        .ok_or_else(|| ScriptError::native(name, format!("argument {idx} missing")))
}

fn get_str(args: &[Value], idx: usize, name: &str) -> Result<String> {
    get(args, idx, name).map(Value::to_string)
}

fn get_int(args: &[Value], idx: usize, name: &str) -> Result<i64> {
    get(args, idx, name)?.to_int()
}

fn get_float(args: &[Value], idx: usize, name: &str) -> Result<f64> {
    get(args, idx, name)?.to_float()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::parser::NATIVE_COMMANDS;
    use crate::script::Interpreter;
    use serde_json::json;

    fn eval(node: Node) -> Result<Value> {
        Interpreter::new().eval(&node, &mut Environment::new())
    }

    fn call(node: Node) -> Value {
        eval(node).expect("call failed")
    }

    #[test]
    fn every_provider_tag_compiles_as_native() {
        for cap in default_capabilities() {
            for tag in cap.tags() {
                assert!(NATIVE_COMMANDS.contains(tag), "{tag} missing from NATIVE_COMMANDS");
            }
        }
    }

    #[test]
    fn providers_registered_in_order() {
        let interp = Interpreter::new();
        assert_eq!(interp.registry().providers(), &["math", "string", "io", "sys", "time", "fs"]);
        assert!(Interpreter::bare().registry().tags().is_empty());
    }

    #[test]
    fn random_in_range() {
        for _ in 0..100 {
            let Value::Float(x) = call(json!(["random"])) else { panic!("not a float") };
            assert!((0.0..1.0).contains(&x));
            let Value::Int(n) = call(json!(["randint", 1, 6])) else { panic!("not an int") };
            assert!((1..=6).contains(&n));
        }
        assert_eq!(call(json!(["randint", 4, 4])), Value::Int(4));
        assert!(eval(json!(["randint", 5, 1])).is_err());
    }

    #[test]
    fn math_functions() {
        assert_eq!(call(json!(["sqrt", 16])), Value::Float(4.0));
        assert!(matches!(eval(json!(["sqrt", -1])), Err(ScriptError::Native { .. })));
        assert_eq!(call(json!(["pow", 2, 10])), Value::Float(1024.0));
        assert_eq!(call(json!(["abs", -3])), Value::Int(3));
        assert_eq!(call(json!(["abs", -2.5])), Value::Float(2.5));
        assert_eq!(call(json!(["floor", 2.7])), Value::Int(2));
        assert_eq!(call(json!(["ceil", 2.1])), Value::Int(3));
        assert_eq!(call(json!(["to_int", "42"])), Value::Int(42));
        assert_eq!(call(json!(["to_int", 3.9])), Value::Int(3));
    }

    #[test]
    fn round_half_even() {
        assert_eq!(call(json!(["round", 2.5])), Value::Int(2));
        assert_eq!(call(json!(["round", 3.5])), Value::Int(4));
        assert_eq!(call(json!(["round", 3.14159, 2])), Value::Float(3.14));
        assert_eq!(call(json!(["round", 7])), Value::Int(7));
    }

    #[test]
    fn string_functions() {
        assert_eq!(call(json!(["concat", "a", 1, true])), Value::from("a1true"));
        assert_eq!(call(json!(["split", "a,b,c", ","])).to_string(), r#"["a", "b", "c"]"#);
        assert!(eval(json!(["split", "abc", ""])).is_err());
        assert_eq!(call(json!(["replace", "aXbX", "X", "-"])), Value::from("a-b-"));
        assert_eq!(call(json!(["upper", "abc"])), Value::from("ABC"));
        assert_eq!(call(json!(["lower", "ABC"])), Value::from("abc"));
    }

    #[test]
    fn parse_json_builds_containers() {
        let v = call(json!(["parse_json", r#"{"a": [1, 2], "b": null}"#]));
        assert_eq!(v.to_string(), r#"{"a": [1, 2], "b": null}"#);
        assert!(matches!(eval(json!(["parse_json", "{"])), Err(ScriptError::Native { .. })));
    }

    #[test]
    fn regex_match() {
        assert_eq!(call(json!(["regex_match", "abc123", r"\d+$"])), Value::Bool(true));
        assert_eq!(call(json!(["regex_match", "abc", r"^\d"])), Value::Bool(false));
        assert!(eval(json!(["regex_match", "abc", "("])).is_err());
    }

    #[test]
    fn missing_argument_is_native_error() {
        let err = eval(json!(["upper"])).unwrap_err();
        assert_eq!(err.to_string(), "error in native 'upper': argument 0 missing");
    }

    #[test]
    fn exec_captures_stdout() {
        assert_eq!(call(json!(["exec", "echo hello"])), Value::from("hello"));
        let err = eval(json!(["exec", "exit 3"])).unwrap_err();
        assert!(err.to_string().contains("code 3"), "{err}");
    }

    #[test]
    fn env_and_os() {
        assert_eq!(call(json!(["env", "TAGSCRIPT_SURELY_UNSET_VAR"])), Value::from(""));
        assert!(matches!(call(json!(["os_name"])), Value::Str(_)));
        assert!(matches!(call(json!(["cwd"])), Value::Str(_)));
    }

    #[test]
    fn timestamp_is_recent() {
        let Value::Float(t) = call(json!(["timestamp"])) else { panic!("not a float") };
        assert!(t > 1.6e9);
    }

    #[test]
    fn filesystem_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().display().to_string();
        let sub = format!("{base}/sub");
        let file = format!("{sub}/a.txt");

        assert_eq!(call(json!(["fs_mkdir", sub])), Value::Bool(true));
        std::fs::write(&file, "data").unwrap();
        assert_eq!(call(json!(["fs_exists", file])), Value::Bool(true));
        assert_eq!(call(json!(["read_file", file])), Value::from("data"));
        assert_eq!(
            call(json!(["fs_copy", file, format!("{sub}/b.txt")])),
            Value::Bool(true)
        );
        assert_eq!(call(json!(["fs_list", sub])).to_string(), r#"["a.txt", "b.txt"]"#);
        assert_eq!(call(json!(["fs_remove", sub])), Value::Bool(true));
        assert_eq!(call(json!(["fs_exists", sub])), Value::Bool(false));
        assert!(eval(json!(["read_file", file])).is_err());
    }
}
