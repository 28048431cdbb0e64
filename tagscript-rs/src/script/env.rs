//! Runtime environment: the scope stack plus the global function and class
//! tables for one execution.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use super::error::{Result, ScriptError};
use super::ir::Node;
use super::value::Value;

// ── Descriptors ───────────────────────────────────────────────────────────────

/// A host function callable from scripts with already-evaluated arguments.
pub type NativeFn = Rc<dyn Fn(&[Value]) -> std::result::Result<Value, String>>;

/// A callable registered in the function table.
pub enum Function {
    Script {
        name: String,
        params: Vec<String>,
        body: Vec<Node>,
    },
    Native {
        name: String,
        func: NativeFn,
    },
}

impl Function {
    pub fn name(&self) -> &str {
        match self {
            Function::Script { name, .. } | Function::Native { name, .. } => name,
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Script { name, params, .. } => f
                .debug_struct("Script")
                .field("name", name)
                .field("params", params)
                .finish_non_exhaustive(),
            Function::Native { name, .. } => {
                f.debug_struct("Native").field("name", name).finish_non_exhaustive()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Method {
    pub params: Vec<String>,
    pub body: Vec<Node>,
}

/// A class: constructor parameters, method table, and the declared parent.
///
/// The parent name is recorded but never consulted during lookup.
#[derive(Debug)]
pub struct Class {
    pub name: String,
    pub params: Vec<String>,
    pub methods: HashMap<String, Method>,
    pub parent: Option<String>,
}

/// An object: its class name plus a mutable attribute map.
#[derive(Debug)]
pub struct Instance {
    pub class: String,
    pub attrs: RefCell<BTreeMap<String, Value>>,
}

impl Instance {
    pub fn new(class: impl Into<String>, attrs: BTreeMap<String, Value>) -> Self {
        Instance {
            class: class.into(),
            attrs: RefCell::new(attrs),
        }
    }

    /// Read an attribute; absent attributes read as null.
    pub fn get(&self, name: &str) -> Value {
        self.attrs.borrow().get(name).cloned().unwrap_or_default()
    }

    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.attrs.borrow_mut().insert(name.into(), value);
    }
}

// ── Environment ───────────────────────────────────────────────────────────────

/// Scope stack (innermost last) and global tables.
///
/// The global scope at the bottom of the stack is never popped.
#[derive(Debug)]
pub struct Environment {
    scopes: Vec<HashMap<String, Value>>,
    functions: HashMap<String, Rc<Function>>,
    classes: HashMap<String, Rc<Class>>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            scopes: vec![HashMap::new()],
            functions: HashMap::new(),
            classes: HashMap::new(),
        }
    }

    /// Number of scopes on the stack, global included.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Pop the innermost scope.  Returns `false` (and pops nothing) when only
    /// the global scope is left.
    pub fn pop_scope(&mut self) -> bool {
        if self.scopes.len() > 1 {
            self.scopes.pop();
            true
        } else {
            false
        }
    }

    /// Bind `name` in the innermost scope.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.into(), value);
        }
    }

    /// Innermost binding of `name`, if any.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Resolve the variable `name` through the scope stack.  Functions and
    /// classes live in their own tables and are not variables.
    pub fn get(&self, name: &str) -> Result<Value> {
        self.lookup(name)
            .cloned()
            .ok_or_else(|| ScriptError::undefined("Variable", name))
    }

    // ── Functions ─────────────────────────────────────────────────────────────

    /// Define or replace a function.
    pub fn define_function(&mut self, func: Function) {
        self.functions.insert(func.name().to_owned(), Rc::new(func));
    }

    /// Register a host closure under `name`.
    pub fn register_native<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(&[Value]) -> std::result::Result<Value, String> + 'static,
    {
        self.define_function(Function::Native {
            name: name.into(),
            func: Rc::new(func),
        });
    }

    pub fn function(&self, name: &str) -> Result<Rc<Function>> {
        self.functions
            .get(name)
            .cloned()
            .ok_or_else(|| ScriptError::undefined("Function", name))
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    // ── Classes ───────────────────────────────────────────────────────────────

    /// Define or replace a class.
    pub fn define_class(&mut self, class: Class) {
        self.classes.insert(class.name.clone(), Rc::new(class));
    }

    pub fn class(&self, name: &str) -> Result<Rc<Class>> {
        self.classes
            .get(name)
            .cloned()
            .ok_or_else(|| ScriptError::undefined("Class", name))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
