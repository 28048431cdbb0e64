//! End-to-end language behaviour: programs run through the public API, both
//! compiled from source and supplied as hand-built IR.

use pretty_assertions::assert_eq;
use serde_json::json;

use tagscript::script::{self, ir, Environment, Interpreter, Node, ScriptError, Value};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn run_ir(program: Node) -> Result<Vec<String>, ScriptError> {
    let program = ir::parse_ir(&program.to_string())?;
    let mut interp = Interpreter::new();
    interp.run(&program, &mut Environment::new())?;
    Ok(interp.output)
}

fn run_src(src: &str) -> Result<Vec<String>, ScriptError> {
    let mut interp = Interpreter::new();
    interp.exec_source(src, &mut Environment::new())?;
    Ok(interp.output)
}

fn out_src(src: &str) -> Vec<String> {
    run_src(src).unwrap_or_else(|e| panic!("{src:?} failed: {e}"))
}

// ── Arithmetic and coercion ───────────────────────────────────────────────────

#[test]
fn addition_and_string_coercion() {
    assert_eq!(run_ir(json!([["print", ["+", 2, 3]]])).unwrap(), ["5"]);
    assert_eq!(run_ir(json!([["print", ["+", "a", 1]]])).unwrap(), ["a1"]);
    assert_eq!(run_ir(json!([["print", ["+", 1.5, "x"]]])).unwrap(), ["1.5x"]);
}

#[test]
fn division_is_true_division() {
    assert_eq!(run_ir(json!([["print", ["/", 5, 2]]])).unwrap(), ["2.5"]);
    assert_eq!(run_ir(json!([["print", ["/", 4, 2]]])).unwrap(), ["2.0"]);
    let err = run_ir(json!([["print", ["/", 4, 0]]])).unwrap_err();
    assert!(matches!(err, ScriptError::DivisionByZero));
}

#[test]
fn division_by_zero_is_catchable() {
    let out = run_ir(json!([
        ["try", [["print", ["/", 1, 0]]], "e", [["print", "caught: ", ["get", "e"]]]]
    ]))
    .unwrap();
    assert_eq!(out, ["caught: division by zero"]);
}

#[test]
fn huge_repetition_is_catchable() {
    let out = run_ir(json!([
        ["try", [["print", ["len", ["*", "ab", 9223372036854775807i64]]]], "e", [["print", "caught"]]],
        ["try", [["print", ["len", ["*", ["list", 1, 2], 9223372036854775807i64]]]], "e", [["print", "caught"]]],
        ["print", ["len", ["*", "ab", 4]]]
    ]))
    .unwrap();
    assert_eq!(out, ["caught", "caught", "8"]);
}

// ── Scoping and calls ─────────────────────────────────────────────────────────

#[test]
fn function_locals_stay_local() {
    let out = out_src(
        "var x = \"global\"\n\
         func f(y) { var x = \"local\"\n var z = y\n return x }\n\
         print f(1)\n\
         print x",
    );
    assert_eq!(out, ["local", "global"]);
    let err = run_src("func f() { var z = 1 }\nf()\nprint z").unwrap_err();
    assert_eq!(err.to_string(), "Variable 'z' is not defined.");
}

#[test]
fn arity_is_exact() {
    let def = "func add(a, b) { return a + b }\n";
    assert_eq!(out_src(&format!("{def}print add(1, 2)")), ["3"]);
    for call in ["add(1)", "add(1, 2, 3)"] {
        let err = run_src(&format!("{def}{call}")).unwrap_err();
        assert!(matches!(err, ScriptError::Arity { expected: 2, .. }), "{call}: {err}");
    }
}

#[test]
fn arguments_evaluate_in_caller_scope() {
    let out = out_src(
        "var n = 10\n\
         func show(n) { return n }\n\
         print show(n + 1)",
    );
    assert_eq!(out, ["11"]);
}

#[test]
fn lists_are_shared_by_reference() {
    let out = out_src(
        "func add_item(xs) { push(xs, 3) }\n\
         var items = [1, 2]\n\
         var alias = items\n\
         add_item(alias)\n\
         print len(items), \" \", items",
    );
    assert_eq!(out, ["3 [1, 2, 3]"]);
}

#[test]
fn self_containing_list_prints_and_compares() {
    let out = run_ir(json!([
        ["set", "xs", ["list", 1]],
        ["push", ["get", "xs"], ["get", "xs"]],
        ["try", [["print", ["get", "xs"]]], "e", [["print", "caught"]]],
        ["set", "ys", ["list", 1]],
        ["push", ["get", "ys"], ["get", "ys"]],
        ["print", ["==", ["get", "xs"], ["get", "ys"]]],
        ["print", ["len", ["get", "xs"]]]
    ]))
    .unwrap();
    assert_eq!(out, ["[1, [...]]", "true", "2"]);
}

#[test]
fn function_names_are_not_variables() {
    let err = run_ir(json!([["function", "f", [], []], ["print", ["get", "f"]]])).unwrap_err();
    assert!(matches!(err, ScriptError::Name(_)), "{err:?}");

    let out = run_ir(json!([
        ["function", "f", [], [["return", 1]]],
        ["try", [["print", ["get", "f"]]], "e", [["print", "caught: ", ["get", "e"]]]],
        ["print", ["call", "f"]]
    ]))
    .unwrap();
    assert_eq!(out, ["caught: Variable 'f' is not defined.", "1"]);
}

// ── Control signals ───────────────────────────────────────────────────────────

#[test]
fn return_passes_through_try() {
    let out = run_ir(json!([
        ["function", "f", [], [
            ["try", [["return", "early"]], "e", [["print", "caught"]]],
            ["print", "after try"]
        ]],
        ["print", ["call", "f"]]
    ]))
    .unwrap();
    assert_eq!(out, ["early"]);
}

#[test]
fn break_stops_loop_without_error() {
    let out = out_src(
        "var i = 0\n\
         while (i < 10) {\n\
           if (i == 3) { break }\n\
           print i\n\
           i = i + 1\n\
         }\n\
         print \"done\"",
    );
    assert_eq!(out, ["0", "1", "2", "done"]);
}

#[test]
fn switch_has_no_fallthrough() {
    let out = out_src(
        "var v = 2\n\
         switch (v) {\n\
           case 1 + 1: print \"first\"\n\
           case 2: print \"second\"\n\
           default: print \"default\"\n\
         }",
    );
    assert_eq!(out, ["first"]);
    assert_eq!(out_src("switch (9) { case 1: print 1 default: print \"d\" }"), ["d"]);
}

#[test]
fn throw_and_assert_are_catchable() {
    let out = run_ir(json!([
        ["try", [["throw", "boom"]], "e", [["print", ["get", "e"]]]],
        ["try", [["assert", false, "bad state"]], "e", [["print", ["get", "e"]]]],
        ["assert", true, "never"]
    ]))
    .unwrap();
    assert_eq!(out, ["boom", "Assertion Failed: bad state"]);
}

#[test]
fn top_level_signals_are_reported() {
    assert!(matches!(run_src("return 1").unwrap_err(), ScriptError::ReturnOutsideFunction));
    assert!(matches!(run_src("break").unwrap_err(), ScriptError::BreakOutsideLoop));
}

// ── Objects ───────────────────────────────────────────────────────────────────

#[test]
fn objects_and_methods() {
    let out = out_src(
        "class Counter(start) {\n\
           bump(by) { this.start = this.start + by\n return this }\n\
           value() { return this.start }\n\
         }\n\
         var c = new Counter(5)\n\
         print c.start\n\
         c.bump(2)\n\
         print c.value()\n\
         c.start = 100\n\
         print c.start\n\
         print c.bump(1).value()\n\
         print c.missing",
    );
    assert_eq!(out, ["5", "7", "100", "101", "null"]);
}

#[test]
fn constructor_arity_is_checked() {
    let err = run_src("class P(x, y) { }\nvar p = new P(1)").unwrap_err();
    assert_eq!(err.to_string(), "Constructor 'P' expects 2 args, got 1");
}

// ── Round trip ────────────────────────────────────────────────────────────────

#[test]
fn compiled_source_matches_hand_built_ir() {
    let src = "\
var total = 0
func square(n) { return n * n }
var i = 1
while (i <= 4) {
  total = total + square(i)
  i = i + 1
}
if (total > 20) { print \"big \", total } else { print \"small\" }
print type(total), \" \", total % 7";

    let hand_built = json!([
        ["set", "total", 0],
        ["function", "square", ["n"], [["return", ["*", ["get", "n"], ["get", "n"]]]]],
        ["set", "i", 1],
        ["while", ["<=", ["get", "i"], 4], [
            ["set", "total", ["+", ["get", "total"], ["call", "square", ["get", "i"]]]],
            ["set", "i", ["+", ["get", "i"], 1]]
        ]],
        ["if", [">", ["get", "total"], 20], [["print", "big ", ["get", "total"]]], [["print", "small"]]],
        ["print", ["type", ["get", "total"]], " ", ["%", ["get", "total"], 7]]
    ]);

    let compiled = script::compile(src).unwrap();
    assert_eq!(Node::Array(compiled), hand_built);
    assert_eq!(out_src(src), run_ir(hand_built).unwrap());
    assert_eq!(out_src(src), ["big 30", "int 2"]);
}

// ── Capabilities ──────────────────────────────────────────────────────────────

#[test]
fn default_capabilities_are_reachable_from_source() {
    let out = out_src(
        "print upper(\"abc\"), \" \", sqrt(16), \" \", floor(2.7)\n\
         print split(\"a,b\", \",\")\n\
         print regex_match(\"abc123\", \"[0-9]+\")",
    );
    assert_eq!(out, ["ABC 4.0 2", "[\"a\", \"b\"]", "true"]);
}

#[test]
fn natives_registered_on_the_environment() {
    let mut env = Environment::new();
    env.register_native("double", |args: &[Value]| match args {
        [Value::Int(n)] => Ok(Value::Int(n * 2)),
        _ => Err("expected one int".to_owned()),
    });
    let mut interp = Interpreter::new();
    interp.exec_source("print double(21)", &mut env).unwrap();
    assert_eq!(interp.output, ["42"]);
    let err = interp.exec_source("double(\"x\")", &mut env).unwrap_err();
    assert_eq!(err.to_string(), "error in native 'double': expected one int");
}

#[test]
fn compile_errors_surface_before_running() {
    let err = run_src("print 1\nvar = 2").unwrap_err();
    assert!(matches!(err, ScriptError::Compile(_)));
    let err = run_src("print 1 @ 2").unwrap_err();
    assert!(err.to_string().contains("'@'"), "{err}");
}
