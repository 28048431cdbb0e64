//! Recursive-descent parser producing tagged-sequence IR.
//!
//! Expression precedence (lowest → highest):
//!   comparison  →  additive  →  multiplicative  →  unary  →  postfix  →  primary
//!
//! Calls to names in [`NATIVE_COMMANDS`] compile to `[name, args...]`; every
//! other call compiles to `["call", name, args...]`.

use serde_json::{json, Map};

use super::error::ParseError;
use super::ir::Node;
use super::lexer::{Token, TokenKind};

/// Names compiled to direct native commands instead of `call`.
pub const NATIVE_COMMANDS: &[&str] = &[
    // math
    "random", "randint", "sqrt", "pow", "abs", "round", "floor", "ceil", "PI", "to_int",
    // string
    "concat", "split", "replace", "upper", "lower", "parse_json", "regex_match",
    // io / sys / time / fs
    "read_file", "exec", "os_name", "cwd", "env", "timestamp", "fs_exists", "fs_list",
    "fs_remove", "fs_mkdir", "fs_copy",
    // core
    "len", "at", "type",
    // statement commands
    "push", "put", "throw", "assert", "sleep", "write_file",
];

/// Deepest nesting of expressions and blocks the parser accepts.
pub const MAX_NESTING: usize = 100;

type Result<T> = std::result::Result<T, ParseError>;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    /// Run `parse` one nesting level deeper, failing past [`MAX_NESTING`].
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_NESTING {
            let line = self
                .peek()
                .or_else(|| self.tokens.last())
                .map_or(1, |t| t.line);
            return Err(ParseError::TooDeep {
                limit: MAX_NESTING,
                line,
            });
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().is_some_and(|t| t.kind == kind)
    }

    fn check_keyword(&self, word: &str) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(word))
    }

    fn advance(&mut self, expected: &str) -> Result<Token> {
        let tok = self.peek().cloned().ok_or_else(|| ParseError::UnexpectedEof {
            expected: expected.to_owned(),
        })?;
        self.pos += 1;
        Ok(tok)
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        let tok = self.advance(&kind.to_string())?;
        if tok.kind != kind {
            return Err(ParseError::Mismatch {
                expected: kind.to_string(),
                found: tok.kind.to_string(),
                text: tok.text,
                line: tok.line,
            });
        }
        Ok(tok)
    }

    fn expect_ident(&mut self) -> Result<String> {
        Ok(self.expect(TokenKind::Ident)?.text)
    }

    // ── Statements ────────────────────────────────────────────────────────────

    fn parse_program(&mut self) -> Result<Vec<Node>> {
        let mut program = Vec::new();
        while !self.is_at_end() {
            program.push(self.parse_statement()?);
        }
        Ok(program)
    }

    fn parse_statement(&mut self) -> Result<Node> {
        self.nested(Self::parse_statement_inner)
    }

    fn parse_statement_inner(&mut self) -> Result<Node> {
        let tok = self.peek().cloned().ok_or_else(|| ParseError::UnexpectedEof {
            expected: "statement".into(),
        })?;

        if tok.kind == TokenKind::Keyword {
            return match tok.text.as_str() {
                "var" => self.parse_var(),
                "print" => self.parse_print(),
                "if" => self.parse_if(),
                "while" => self.parse_while(),
                "func" => self.parse_func(),
                "return" => self.parse_return(),
                "break" => {
                    self.pos += 1;
                    Ok(json!(["break"]))
                }
                "class" => self.parse_class(),
                "input" => self.parse_input(),
                "import" => self.parse_import(),
                "switch" => self.parse_switch(),
                "new" => self.parse_expr_statement(),
                _ => Err(ParseError::UnknownStatement {
                    text: tok.text,
                    line: tok.line,
                }),
            };
        }

        if tok.kind == TokenKind::Ident
            && self.peek_at(1).is_some_and(|t| t.kind == TokenKind::Assign)
        {
            self.pos += 2;
            let value = self.parse_expr()?;
            return Ok(json!(["set", tok.text, value]));
        }

        self.parse_expr_statement()
    }

    /// A bare expression, or `obj.attr = expr`.
    fn parse_expr_statement(&mut self) -> Result<Node> {
        let expr = self.parse_expr()?;
        if let Some(assign) = self.peek().filter(|t| t.kind == TokenKind::Assign).cloned() {
            let target = expr.as_array().filter(|a| a.len() == 3 && a[0] == "get_attr");
            let Some(target) = target else {
                return Err(ParseError::InvalidExpression {
                    text: assign.text,
                    line: assign.line,
                });
            };
            let (obj, attr) = (target[1].clone(), target[2].clone());
            self.pos += 1;
            let value = self.parse_expr()?;
            return Ok(json!(["set_attr", obj, attr, value]));
        }
        Ok(expr)
    }

    fn parse_block(&mut self) -> Result<Vec<Node>> {
        self.expect(TokenKind::LBrace)?;
        let mut block = Vec::new();
        while !self.is_at_end() && !self.check(TokenKind::RBrace) {
            block.push(self.parse_statement()?);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(block)
    }

    fn parse_params(&mut self) -> Result<Vec<String>> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            params.push(self.expect_ident()?);
            while self.eat(TokenKind::Comma) {
                params.push(self.expect_ident()?);
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(params)
    }

    fn parse_condition(&mut self) -> Result<Node> {
        self.expect(TokenKind::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        Ok(cond)
    }

    fn parse_var(&mut self) -> Result<Node> {
        self.pos += 1;
        let name = self.expect_ident()?;
        self.expect(TokenKind::Assign)?;
        let value = self.parse_expr()?;
        Ok(json!(["set", name, value]))
    }

    fn parse_print(&mut self) -> Result<Node> {
        self.pos += 1;
        let mut node = vec![json!("print"), self.parse_expr()?];
        while self.eat(TokenKind::Comma) {
            node.push(self.parse_expr()?);
        }
        Ok(Node::Array(node))
    }

    fn parse_if(&mut self) -> Result<Node> {
        self.pos += 1;
        let cond = self.parse_condition()?;
        let then_block = self.parse_block()?;
        if !self.check_keyword("else") {
            return Ok(json!(["if", cond, then_block]));
        }
        self.pos += 1;
        let else_block = if self.check_keyword("if") {
            vec![self.parse_if()?]
        } else {
            self.parse_block()?
        };
        Ok(json!(["if", cond, then_block, else_block]))
    }

    fn parse_while(&mut self) -> Result<Node> {
        self.pos += 1;
        let cond = self.parse_condition()?;
        let body = self.parse_block()?;
        Ok(json!(["while", cond, body]))
    }

    fn parse_func(&mut self) -> Result<Node> {
        self.pos += 1;
        let name = self.expect_ident()?;
        let params = self.parse_params()?;
        let body = self.parse_block()?;
        Ok(json!(["function", name, params, body]))
    }

    fn parse_return(&mut self) -> Result<Node> {
        self.pos += 1;
        if self.is_at_end() || self.check(TokenKind::RBrace) {
            return Ok(json!(["return"]));
        }
        let value = self.parse_expr()?;
        Ok(json!(["return", value]))
    }

    fn parse_class(&mut self) -> Result<Node> {
        self.pos += 1;
        let name = self.expect_ident()?;
        let params = self.parse_params()?;
        let parent = if self.check_keyword("extends") {
            self.pos += 1;
            Node::String(self.expect_ident()?)
        } else {
            Node::Null
        };
        self.expect(TokenKind::LBrace)?;
        let mut methods = Map::new();
        while !self.is_at_end() && !self.check(TokenKind::RBrace) {
            let method = self.expect_ident()?;
            let m_params = self.parse_params()?;
            let m_body = self.parse_block()?;
            methods.insert(method, json!([m_params, m_body]));
        }
        self.expect(TokenKind::RBrace)?;
        Ok(json!(["class", name, params, methods, parent]))
    }

    fn parse_input(&mut self) -> Result<Node> {
        self.pos += 1;
        let name = self.expect_ident()?;
        if self.eat(TokenKind::Comma) {
            let prompt = self.parse_expr()?;
            return Ok(json!(["input", name, prompt]));
        }
        Ok(json!(["input", name]))
    }

    fn parse_import(&mut self) -> Result<Node> {
        self.pos += 1;
        let path = self.parse_expr()?;
        Ok(json!(["import", path]))
    }

    fn parse_switch(&mut self) -> Result<Node> {
        self.pos += 1;
        let subject = self.parse_condition()?;
        self.expect(TokenKind::LBrace)?;
        let mut cases = Vec::new();
        let mut default: Option<Vec<Node>> = None;
        while !self.is_at_end() && !self.check(TokenKind::RBrace) {
            let tok = self.advance("case")?;
            if tok.is_keyword("case") {
                let value = self.parse_expr()?;
                self.expect(TokenKind::Colon)?;
                let body = self.parse_case_body()?;
                cases.push(json!([value, body]));
            } else if tok.is_keyword("default") && default.is_none() {
                self.expect(TokenKind::Colon)?;
                default = Some(self.parse_case_body()?);
            } else {
                return Err(ParseError::UnknownStatement {
                    text: tok.text,
                    line: tok.line,
                });
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(match default {
            Some(body) => json!(["switch", subject, cases, body]),
            None => json!(["switch", subject, cases]),
        })
    }

    /// Statements up to the next `case`, `default` or closing brace.
    fn parse_case_body(&mut self) -> Result<Vec<Node>> {
        let mut body = Vec::new();
        while !self.is_at_end()
            && !self.check(TokenKind::RBrace)
            && !self.check_keyword("case")
            && !self.check_keyword("default")
        {
            body.push(self.parse_statement()?);
        }
        Ok(body)
    }

    // ── Expressions ───────────────────────────────────────────────────────────

    fn parse_expr(&mut self) -> Result<Node> {
        self.nested(Self::parse_comparison)
    }

    fn parse_comparison(&mut self) -> Result<Node> {
        let mut left = self.parse_additive()?;
        while self.check(TokenKind::Compare) {
            let op = self.advance("operator")?.text;
            let right = self.parse_additive()?;
            left = json!([op, left, right]);
        }
        Ok(left)
    }

    fn check_arith(&self, ops: &[&str]) -> bool {
        self.peek()
            .is_some_and(|t| t.kind == TokenKind::Arith && ops.contains(&t.text.as_str()))
    }

    fn parse_additive(&mut self) -> Result<Node> {
        let mut left = self.parse_multiplicative()?;
        while self.check_arith(&["+", "-"]) {
            let op = self.advance("operator")?.text;
            let right = self.parse_multiplicative()?;
            left = json!([op, left, right]);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Node> {
        let mut left = self.parse_unary()?;
        while self.check_arith(&["*", "/", "%"]) {
            let op = self.advance("operator")?.text;
            let right = self.parse_unary()?;
            left = json!([op, left, right]);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Node> {
        if !self.check_arith(&["-"]) {
            return self.parse_postfix();
        }
        self.pos += 1;
        if self.check(TokenKind::Number) {
            let lit = self.parse_number()?;
            if let Some(n) = lit.as_i64() {
                return Ok(json!(-n));
            }
            if let Some(x) = lit.as_f64() {
                return Ok(json!(-x));
            }
        }
        let operand = self.nested(Self::parse_unary)?;
        Ok(json!(["-", 0, operand]))
    }

    fn parse_postfix(&mut self) -> Result<Node> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat(TokenKind::Dot) {
                let member = self.expect_ident()?;
                if self.eat(TokenKind::LParen) {
                    let mut node = vec![json!("call_method"), expr, json!(member)];
                    node.extend(self.parse_args()?);
                    expr = Node::Array(node);
                } else {
                    expr = json!(["get_attr", expr, member]);
                }
            } else if self.eat(TokenKind::LBracket) {
                let index = self.parse_expr()?;
                self.expect(TokenKind::RBracket)?;
                expr = json!(["at", expr, index]);
            } else {
                return Ok(expr);
            }
        }
    }

    /// Comma-separated arguments up to and including `)`.  The opening
    /// parenthesis has already been consumed.
    fn parse_args(&mut self) -> Result<Vec<Node>> {
        let args = self.parse_list(TokenKind::RParen)?;
        self.expect(TokenKind::RParen)?;
        Ok(args)
    }

    fn parse_list(&mut self, close: TokenKind) -> Result<Vec<Node>> {
        let mut items = Vec::new();
        if !self.check(close) {
            items.push(self.parse_expr()?);
            while self.eat(TokenKind::Comma) {
                items.push(self.parse_expr()?);
            }
        }
        Ok(items)
    }

    fn parse_number(&mut self) -> Result<Node> {
        let tok = self.expect(TokenKind::Number)?;
        let invalid = || ParseError::InvalidExpression {
            text: tok.text.clone(),
            line: tok.line,
        };
        if tok.text.contains('.') {
            let x: f64 = tok.text.parse().map_err(|_| invalid())?;
            return Ok(json!(x));
        }
        match tok.text.parse::<i64>() {
            Ok(n) => Ok(json!(n)),
            Err(_) => {
                let x: f64 = tok.text.parse().map_err(|_| invalid())?;
                Ok(json!(x))
            }
        }
    }

    fn parse_object(&mut self) -> Result<Node> {
        let mut map = Map::new();
        if !self.check(TokenKind::RBrace) {
            loop {
                let key = self.expect(TokenKind::Str)?.text;
                self.expect(TokenKind::Colon)?;
                map.insert(key, self.parse_expr()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Node::Object(map))
    }

    fn parse_primary(&mut self) -> Result<Node> {
        let tok = self.peek().cloned().ok_or_else(|| ParseError::UnexpectedEof {
            expected: "expression".into(),
        })?;

        match tok.kind {
            TokenKind::Number => self.parse_number(),
            TokenKind::Str => {
                self.pos += 1;
                Ok(Node::String(tok.text))
            }
            TokenKind::LBracket => {
                self.pos += 1;
                let mut node = vec![json!("list")];
                node.extend(self.parse_list(TokenKind::RBracket)?);
                self.expect(TokenKind::RBracket)?;
                Ok(Node::Array(node))
            }
            TokenKind::LBrace => {
                self.pos += 1;
                self.parse_object()
            }
            TokenKind::LParen => {
                self.pos += 1;
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::Keyword if tok.text == "new" => {
                self.pos += 1;
                let class = self.expect_ident()?;
                self.expect(TokenKind::LParen)?;
                let mut node = vec![json!("new"), json!(class)];
                node.extend(self.parse_args()?);
                Ok(Node::Array(node))
            }
            TokenKind::Ident => {
                self.pos += 1;
                let name = tok.text;
                match name.as_str() {
                    "true" => return Ok(json!(true)),
                    "false" => return Ok(json!(false)),
                    "null" => return Ok(Node::Null),
                    _ => {}
                }
                if !self.eat(TokenKind::LParen) {
                    return Ok(json!(["get", name]));
                }
                let args = self.parse_args()?;
                let mut node = if NATIVE_COMMANDS.contains(&name.as_str()) {
                    vec![json!(name)]
                } else {
                    vec![json!("call"), json!(name)]
                };
                node.extend(args);
                Ok(Node::Array(node))
            }
            _ => Err(ParseError::InvalidExpression {
                text: tok.text,
                line: tok.line,
            }),
        }
    }
}

/// Parse a token stream into a top-level instruction list.
pub fn parse(tokens: Vec<Token>) -> Result<Vec<Node>> {
    Parser::new(tokens).parse_program()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::lexer::tokenize;
    use pretty_assertions::assert_eq;

    fn compile(src: &str) -> Vec<Node> {
        parse(tokenize(src).expect("lex failed")).expect("parse failed")
    }

    fn compile_one(src: &str) -> Node {
        let mut prog = compile(src);
        assert_eq!(prog.len(), 1, "expected one statement in {src:?}");
        prog.remove(0)
    }

    fn parse_err(src: &str) -> ParseError {
        parse(tokenize(src).expect("lex failed")).expect_err("expected parse error")
    }

    #[test]
    fn var_and_assignment() {
        assert_eq!(compile_one("var x = 1"), json!(["set", "x", 1]));
        assert_eq!(compile_one("x = \"a\""), json!(["set", "x", "a"]));
    }

    #[test]
    fn precedence() {
        assert_eq!(
            compile_one("var r = 1 + 2 * 3 == 7"),
            json!(["set", "r", ["==", ["+", 1, ["*", 2, 3]], 7]])
        );
    }

    #[test]
    fn additive_is_left_associative() {
        assert_eq!(compile_one("print 1 - 2 - 3"), json!(["print", ["-", ["-", 1, 2], 3]]));
    }

    #[test]
    fn parentheses_group() {
        assert_eq!(compile_one("print (1 + 2) * 3"), json!(["print", ["*", ["+", 1, 2], 3]]));
    }

    #[test]
    fn repeated_comparison_left_associates() {
        assert_eq!(
            compile_one("print 1 < 2 == 1"),
            json!(["print", ["==", ["<", 1, 2], 1]])
        );
    }

    #[test]
    fn if_without_else_has_three_elements() {
        let node = compile_one("if (x > 1) { print x }");
        assert_eq!(node, json!(["if", [">", ["get", "x"], 1], [["print", ["get", "x"]]]]));
        assert_eq!(node.as_array().unwrap().len(), 3);
    }

    #[test]
    fn else_if_chains_nest() {
        let node = compile_one("if (a) { print 1 } else if (b) { print 2 } else { print 3 }");
        assert_eq!(
            node,
            json!([
                "if", ["get", "a"], [["print", 1]],
                [["if", ["get", "b"], [["print", 2]], [["print", 3]]]]
            ])
        );
    }

    #[test]
    fn while_and_break() {
        assert_eq!(
            compile_one("while (1) { break }"),
            json!(["while", 1, [["break"]]])
        );
    }

    #[test]
    fn func_definition() {
        assert_eq!(
            compile_one("func add(a, b) { return a + b }"),
            json!(["function", "add", ["a", "b"], [["return", ["+", ["get", "a"], ["get", "b"]]]]])
        );
    }

    #[test]
    fn bare_return() {
        assert_eq!(compile_one("func f() { return }"), json!(["function", "f", [], [["return"]]]));
    }

    #[test]
    fn native_vs_user_calls() {
        assert_eq!(compile_one("print len(xs)"), json!(["print", ["len", ["get", "xs"]]]));
        assert_eq!(compile_one("greet(\"bob\")"), json!(["call", "greet", "bob"]));
        assert_eq!(compile_one("push(items, 3)"), json!(["push", ["get", "items"], 3]));
    }

    #[test]
    fn member_access_and_calls() {
        assert_eq!(compile_one("print d.name"), json!(["print", ["get_attr", ["get", "d"], "name"]]));
        assert_eq!(
            compile_one("d.bark(2)"),
            json!(["call_method", ["get", "d"], "bark", 2])
        );
        assert_eq!(
            compile_one("print a.b.c"),
            json!(["print", ["get_attr", ["get_attr", ["get", "a"], "b"], "c"]])
        );
    }

    #[test]
    fn attribute_assignment() {
        assert_eq!(
            compile_one("this.count = this.count + 1"),
            json!(["set_attr", ["get", "this"], "count",
                ["+", ["get_attr", ["get", "this"], "count"], 1]])
        );
    }

    #[test]
    fn indexing() {
        assert_eq!(compile_one("print xs[0]"), json!(["print", ["at", ["get", "xs"], 0]]));
    }

    #[test]
    fn literals() {
        assert_eq!(
            compile_one("var x = [1, \"a\", true, null, 1.5]"),
            json!(["set", "x", ["list", 1, "a", true, null, 1.5]])
        );
        assert_eq!(
            compile_one("var m = {\"k\": 1 + 1}"),
            json!(["set", "m", {"k": ["+", 1, 1]}])
        );
    }

    #[test]
    fn unary_minus() {
        assert_eq!(compile_one("print -3"), json!(["print", -3]));
        assert_eq!(compile_one("print -x"), json!(["print", ["-", 0, ["get", "x"]]]));
    }

    #[test]
    fn new_instance() {
        assert_eq!(compile_one("var d = new Dog(\"Rex\")"), json!(["set", "d", ["new", "Dog", "Rex"]]));
    }

    #[test]
    fn class_definition() {
        assert_eq!(
            compile_one("class Dog(name) extends Animal { bark() { print this.name } }"),
            json!([
                "class", "Dog", ["name"],
                {"bark": [[], [["print", ["get_attr", ["get", "this"], "name"]]]]},
                "Animal"
            ])
        );
        assert_eq!(compile_one("class A() {}"), json!(["class", "A", [], {}, null]));
    }

    #[test]
    fn switch_cases_and_default() {
        let node = compile_one("switch (x) { case 1: print \"one\" case 2: print \"two\" default: print \"other\" }");
        assert_eq!(
            node,
            json!([
                "switch", ["get", "x"],
                [[1, [["print", "one"]]], [2, [["print", "two"]]]],
                [["print", "other"]]
            ])
        );
    }

    #[test]
    fn switch_without_default() {
        assert_eq!(
            compile_one("switch (x) { case 1: print 1 }"),
            json!(["switch", ["get", "x"], [[1, [["print", 1]]]]])
        );
    }

    #[test]
    fn print_multiple_and_input_import() {
        assert_eq!(compile_one("print \"a\", 1"), json!(["print", "a", 1]));
        assert_eq!(compile_one("input name"), json!(["input", "name"]));
        assert_eq!(compile_one("input age, \"Age? \""), json!(["input", "age", "Age? "]));
        assert_eq!(compile_one("import \"lib.tags\""), json!(["import", "lib.tags"]));
    }

    #[test]
    fn unexpected_eof() {
        assert!(matches!(parse_err("var x ="), ParseError::UnexpectedEof { .. }));
        assert!(matches!(parse_err("if (x) {"), ParseError::UnexpectedEof { .. }));
    }

    #[test]
    fn mismatch_reports_expected_and_line() {
        let err = parse_err("var x = 1\nvar = 2");
        assert_eq!(
            err,
            ParseError::Mismatch {
                expected: "ID".into(),
                found: "ASSIGN".into(),
                text: "=".into(),
                line: 2,
            }
        );
    }

    #[test]
    fn unknown_statement_keyword() {
        assert!(matches!(parse_err("else { }"), ParseError::UnknownStatement { .. }));
    }

    #[test]
    fn nesting_limit() {
        let ok = format!("print {}1{}", "(".repeat(MAX_NESTING - 2), ")".repeat(MAX_NESTING - 2));
        assert_eq!(compile(&ok), vec![json!(["print", 1])]);

        let deep = format!("print {}1{}", "(".repeat(20_000), ")".repeat(20_000));
        assert_eq!(
            parse_err(&deep),
            ParseError::TooDeep {
                limit: MAX_NESTING,
                line: 1,
            }
        );
        let minus = format!("print {}x", "-".repeat(20_000));
        assert!(matches!(parse_err(&minus), ParseError::TooDeep { .. }));
        let blocks = format!("{}{}", "while (1) { ".repeat(500), "}".repeat(500));
        assert!(matches!(parse_err(&blocks), ParseError::TooDeep { .. }));
    }

    #[test]
    fn invalid_primary() {
        assert!(matches!(parse_err("print )"), ParseError::InvalidExpression { .. }));
        assert!(matches!(parse_err("1 = 2"), ParseError::InvalidExpression { .. }));
    }
}
