//! Expression evaluator and capability registry.
//!
//! [`eval_expr`] resolves one IR node to a [`Value`].  Core tags (variable
//! lookup, calls, operators, container access and the object model) are
//! handled here; every other tag is looked up in the [`Registry`] of
//! [`Capability`] providers.  A string-headed sequence whose tag nobody claims
//! is returned as raw data.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use tracing::warn;

use super::env::{Environment, Function, Instance};
use super::error::{Result, ScriptError};
use super::ir::{self, split_tag, Node};
use super::value::Value;

/// Tags evaluated by the core and never delegated to a capability.
pub const CORE_TAGS: &[&str] = &[
    "get", "call", "type", "==", "!=", "<", ">", "<=", ">=", "+", "-", "*", "/", "%", "len",
    "at", "list", "new", "get_attr", "set_attr", "call_method",
];

// ── Capability ────────────────────────────────────────────────────────────────

/// A provider of native operations, claiming a fixed set of tags.
///
/// `handle` receives the raw operand nodes and resolves the ones it needs
/// through `ctx`.
pub trait Capability {
    /// Provider name, used in diagnostics.
    fn name(&self) -> &'static str;

    /// Tags this provider claims.
    fn tags(&self) -> &'static [&'static str];

    fn handle(
        &self,
        tag: &str,
        args: &[Node],
        env: &mut Environment,
        ctx: &mut dyn EvalContext,
    ) -> Result<Value>;
}

/// Tag → provider lookup table.  The first provider to claim a tag keeps it.
#[derive(Default, Clone)]
pub struct Registry {
    handlers: HashMap<&'static str, Rc<dyn Capability>>,
    providers: Vec<&'static str>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, cap: Rc<dyn Capability>) {
        for &tag in cap.tags() {
            if CORE_TAGS.contains(&tag) {
                warn!(tag, provider = cap.name(), "capability claims a core tag; ignored");
                continue;
            }
            match self.handlers.entry(tag) {
                Entry::Occupied(existing) => warn!(
                    tag,
                    kept = existing.get().name(),
                    ignored = cap.name(),
                    "capability tag collision"
                ),
                Entry::Vacant(slot) => {
                    slot.insert(Rc::clone(&cap));
                }
            }
        }
        self.providers.push(cap.name());
    }

    pub fn get(&self, tag: &str) -> Option<Rc<dyn Capability>> {
        self.handlers.get(tag).cloned()
    }

    pub fn claims(&self, tag: &str) -> bool {
        self.handlers.contains_key(tag)
    }

    /// Registered provider names, in registration order.
    pub fn providers(&self) -> &[&'static str] {
        &self.providers
    }

    /// Every claimed tag, sorted.
    pub fn tags(&self) -> Vec<&'static str> {
        let mut tags: Vec<_> = self.handlers.keys().copied().collect();
        tags.sort_unstable();
        tags
    }
}

// ── EvalContext ───────────────────────────────────────────────────────────────

/// A script-level call about to be entered.
pub struct Frame<'a> {
    /// `"Function"` or `"Method"`, for diagnostics.
    pub kind: &'static str,
    pub name: &'a str,
    pub body: &'a [Node],
    /// Bindings for the fresh scope, in binding order.
    pub bindings: Vec<(String, Value)>,
}

/// Interface the evaluator needs from the statement executor.
///
/// The [`Interpreter`](super::interp::Interpreter) implements this to give the
/// evaluator its capability registry and to run function and method bodies.
pub trait EvalContext {
    /// Provider claiming `tag`, if any.
    fn capability(&self, tag: &str) -> Option<Rc<dyn Capability>>;

    /// Push a scope, bind the frame, run the body, pop the scope and return
    /// the body's return value (null when it falls through).
    fn call_frame(&mut self, frame: Frame<'_>, env: &mut Environment) -> Result<Value>;
}

impl dyn EvalContext + '_ {
    /// Evaluate one node.
    pub fn eval(&mut self, node: &Node, env: &mut Environment) -> Result<Value> {
        eval_expr(node, env, self)
    }

    /// Evaluate nodes left to right.
    pub fn eval_all(&mut self, nodes: &[Node], env: &mut Environment) -> Result<Vec<Value>> {
        nodes.iter().map(|n| eval_expr(n, env, self)).collect()
    }
}

/// Whether `tag` names an expression: a core tag or one claimed by `ctx`.
pub fn is_expression_tag(tag: &str, ctx: &dyn EvalContext) -> bool {
    CORE_TAGS.contains(&tag) || ctx.capability(tag).is_some()
}

// ── Evaluation ────────────────────────────────────────────────────────────────

/// Evaluate an IR node.
pub fn eval_expr(node: &Node, env: &mut Environment, ctx: &mut dyn EvalContext) -> Result<Value> {
    match node {
        Node::Array(items) => match split_tag(node) {
            Some((tag, args)) => eval_tagged(tag, args, node, env, ctx),
            None => Ok(ctx.eval_all(items, env)?.into()),
        },
        Node::Object(map) => {
            let mut out = BTreeMap::new();
            for (k, v) in map {
                out.insert(k.clone(), ctx.eval(v, env)?);
            }
            Ok(out.into())
        }
        scalar => Ok(Value::from_json(scalar)),
    }
}

fn eval_tagged(
    tag: &str,
    args: &[Node],
    node: &Node,
    env: &mut Environment,
    ctx: &mut dyn EvalContext,
) -> Result<Value> {
    match tag {
        "get" => env.get(ir::name_operand(tag, args, 0)?),
        "call" => eval_call(args, env, ctx),
        "type" => {
            let v = ctx.eval(ir::operand(tag, args, 0)?, env)?;
            Ok(Value::from(v.type_name()))
        }
        "==" | "!=" | "<" | ">" | "<=" | ">=" => {
            let (a, b) = eval_pair(tag, args, env, ctx)?;
            Ok(Value::Bool(a.compare(tag, &b)?))
        }
        "+" | "-" | "*" | "/" | "%" => {
            let (a, b) = eval_pair(tag, args, env, ctx)?;
            match tag {
                "+" => a.add(&b),
                "-" => a.sub(&b),
                "*" => a.mul(&b),
                "/" => a.div(&b),
                _ => a.rem(&b),
            }
        }
        "len" => {
            let v = ctx.eval(ir::operand(tag, args, 0)?, env)?;
            let n = match &v {
                Value::Str(s) => s.chars().count(),
                Value::List(items) => items.borrow().len(),
                Value::Map(map) => map.borrow().len(),
                Value::Instance(inst) => inst.attrs.borrow().len(),
                other => {
                    return Err(ScriptError::mismatch(format!(
                        "object of type '{}' has no length",
                        other.type_name()
                    )))
                }
            };
            Ok(Value::Int(n as i64))
        }
        "at" => {
            let (target, key) = eval_pair(tag, args, env, ctx)?;
            index(&target, &key)
        }
        "list" => Ok(ctx.eval_all(args, env)?.into()),
        "new" => eval_new(args, env, ctx),
        "get_attr" => {
            let target = ctx.eval(ir::operand(tag, args, 0)?, env)?;
            let attr = ir::name_operand(tag, args, 1)?;
            Ok(instance(&target)?.get(attr))
        }
        "set_attr" => {
            let target = ctx.eval(ir::operand(tag, args, 0)?, env)?;
            let attr = ir::name_operand(tag, args, 1)?;
            let value = ctx.eval(ir::operand(tag, args, 2)?, env)?;
            instance(&target)?.set(attr, value.clone());
            Ok(value)
        }
        "call_method" => eval_call_method(args, env, ctx),
        _ => match ctx.capability(tag) {
            Some(cap) => cap.handle(tag, args, env, ctx),
            None => Ok(Value::from_json(node)),
        },
    }
}

fn eval_pair(
    tag: &str,
    args: &[Node],
    env: &mut Environment,
    ctx: &mut dyn EvalContext,
) -> Result<(Value, Value)> {
    let a = ctx.eval(ir::operand(tag, args, 0)?, env)?;
    let b = ctx.eval(ir::operand(tag, args, 1)?, env)?;
    Ok((a, b))
}

fn instance(target: &Value) -> Result<&Instance> {
    match target {
        Value::Instance(inst) => Ok(inst),
        other => Err(ScriptError::mismatch(format!(
            "target is not a class instance (got {})",
            other.type_name()
        ))),
    }
}

/// Resolve a possibly negative sequence index against `len`.
fn resolve_index(key: &Value, len: usize) -> Result<usize> {
    let i = key.to_int()?;
    let resolved = if i < 0 { i + len as i64 } else { i };
    if resolved < 0 || resolved >= len as i64 {
        return Err(ScriptError::Index { index: i, len });
    }
    Ok(resolved as usize)
}

/// `at`: sequence, string or mapping access.
pub fn index(target: &Value, key: &Value) -> Result<Value> {
    match target {
        Value::List(items) => {
            let items = items.borrow();
            Ok(items[resolve_index(key, items.len())?].clone())
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let i = resolve_index(key, chars.len())?;
            Ok(Value::Str(chars[i].to_string()))
        }
        Value::Map(map) => {
            let key = key.to_string();
            map.borrow().get(&key).cloned().ok_or(ScriptError::Key(key))
        }
        other => Err(ScriptError::mismatch(format!(
            "cannot index into {}",
            other.type_name()
        ))),
    }
}

fn check_arity(kind: &'static str, name: &str, expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(ScriptError::Arity {
            kind,
            name: name.to_owned(),
            expected,
            got,
        });
    }
    Ok(())
}

fn eval_call(args: &[Node], env: &mut Environment, ctx: &mut dyn EvalContext) -> Result<Value> {
    let name = ir::name_operand("call", args, 0)?;
    let func = env.function(name)?;
    let values = ctx.eval_all(&args[1..], env)?;
    match &*func {
        Function::Native { func, .. } => func(&values).map_err(|e| ScriptError::native(name, e)),
        Function::Script { params, body, .. } => {
            check_arity("Function", name, params.len(), values.len())?;
            let bindings = params.iter().cloned().zip(values).collect();
            ctx.call_frame(
                Frame {
                    kind: "Function",
                    name,
                    body,
                    bindings,
                },
                env,
            )
        }
    }
}

fn eval_new(args: &[Node], env: &mut Environment, ctx: &mut dyn EvalContext) -> Result<Value> {
    let name = ir::name_operand("new", args, 0)?;
    let class = env.class(name)?;
    let arg_nodes = &args[1..];
    check_arity("Constructor", name, class.params.len(), arg_nodes.len())?;
    let values = ctx.eval_all(arg_nodes, env)?;
    let attrs = class.params.iter().cloned().zip(values).collect();
    Ok(Value::Instance(Rc::new(Instance::new(name, attrs))))
}

fn eval_call_method(
    args: &[Node],
    env: &mut Environment,
    ctx: &mut dyn EvalContext,
) -> Result<Value> {
    let target = ctx.eval(ir::operand("call_method", args, 0)?, env)?;
    let method_name = ir::name_operand("call_method", args, 1)?;
    let inst = match &target {
        Value::Instance(inst) => Rc::clone(inst),
        other => {
            return Err(ScriptError::mismatch(format!(
                "cannot call method '{method_name}' on {}",
                other.type_name()
            )))
        }
    };
    let class = env.class(&inst.class)?;
    let method = class.methods.get(method_name).ok_or_else(|| {
        ScriptError::Name(format!(
            "Method '{method_name}' not found in class '{}'.",
            class.name
        ))
    })?;
    let arg_nodes = &args[2..];
    check_arity("Method", method_name, method.params.len(), arg_nodes.len())?;
    let values = ctx.eval_all(arg_nodes, env)?;

    let mut bindings = Vec::with_capacity(values.len() + 1);
    bindings.push(("this".to_owned(), target));
    bindings.extend(method.params.iter().cloned().zip(values));
    ctx.call_frame(
        Frame {
            kind: "Method",
            name: method_name,
            body: &method.body,
            bindings,
        },
        env,
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
