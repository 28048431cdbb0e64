//! The tagged-sequence IR.
//!
//! Statements and expressions share one encoding: a JSON array whose first
//! element is a string tag and whose remaining elements are operands.  Scalars,
//! bare arrays and objects are literal forms.  Nodes are plain
//! [`serde_json::Value`]s so a program can be loaded straight from a JSON
//! document without going through the compiler.

use serde_json::Value as Json;

use super::error::{CompileError, Result, ScriptError};

/// One IR node.
pub type Node = Json;

/// Split a tagged sequence into `(tag, operands)`.  Returns `None` for
/// scalars, objects, empty arrays and arrays whose head is not a string.
pub fn split_tag(node: &Node) -> Option<(&str, &[Node])> {
    let items = node.as_array()?;
    let (head, rest) = items.split_first()?;
    Some((head.as_str()?, rest))
}

/// Parse a JSON document into a top-level instruction list.
///
/// The document must be an array.  An array whose head is a string is taken
/// as a single instruction; otherwise every element must itself be a tagged
/// sequence.
pub fn parse_ir(text: &str) -> Result<Vec<Node>, CompileError> {
    let doc: Json = serde_json::from_str(text)?;
    let Json::Array(items) = doc else {
        return Err(CompileError::Shape(
            "a program must be an array of instructions".into(),
        ));
    };
    if matches!(items.first(), Some(Json::String(_))) {
        return Ok(vec![Json::Array(items)]);
    }
    for (i, item) in items.iter().enumerate() {
        if split_tag(item).is_none() {
            return Err(CompileError::Shape(format!(
                "instruction {i} is not a tagged sequence: {item}"
            )));
        }
    }
    Ok(items)
}

/// Whether `text` looks like serialized IR rather than source.
pub fn looks_like_ir(text: &str) -> bool {
    text.trim_start().starts_with('[')
}

/// Load a program from text, auto-detecting serialized IR versus source.
///
/// Text that starts with `[` and parses as a JSON document is IR; anything
/// else is compiled as source.
pub fn load_program(text: &str) -> Result<Vec<Node>, CompileError> {
    if looks_like_ir(text) {
        match parse_ir(text) {
            Ok(program) => return Ok(program),
            // Valid JSON with the wrong shape is still an IR error.
            Err(e @ CompileError::Shape(_)) => return Err(e),
            Err(_) => {}
        }
    }
    super::compile(text)
}

// ── Operand accessors ─────────────────────────────────────────────────────────

/// The operand at `index`, or an `InvalidInstruction` naming the tag.
pub fn operand<'a>(tag: &str, args: &'a [Node], index: usize) -> Result<&'a Node> {
    args.get(index)
        .ok_or_else(|| ScriptError::invalid(format!("'{tag}' is missing operand {}", index + 1)))
}

/// A string operand used as a name (variable, function, class, attribute).
pub fn name_operand<'a>(tag: &str, args: &'a [Node], index: usize) -> Result<&'a str> {
    let node = operand(tag, args, index)?;
    node.as_str()
        .ok_or_else(|| ScriptError::invalid(format!("'{tag}' expects a name, got {node}")))
}

/// An operand that must be an instruction block.
pub fn block_operand<'a>(tag: &str, args: &'a [Node], index: usize) -> Result<&'a [Node]> {
    as_block(tag, operand(tag, args, index)?)
}

/// Interpret `node` as an instruction block.
pub fn as_block<'a>(tag: &str, node: &'a Node) -> Result<&'a [Node]> {
    node.as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| ScriptError::invalid(format!("'{tag}' expects a block, got {node}")))
}

/// A parameter list: an array of names.
pub fn params_operand(tag: &str, node: &Node) -> Result<Vec<String>> {
    let items = node
        .as_array()
        .ok_or_else(|| ScriptError::invalid(format!("'{tag}' expects a parameter list, got {node}")))?;
    items
        .iter()
        .map(|p| {
            p.as_str().map(str::to_owned).ok_or_else(|| {
                ScriptError::invalid(format!("'{tag}' parameter names must be strings, got {p}"))
            })
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
