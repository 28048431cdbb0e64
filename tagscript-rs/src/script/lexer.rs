//! Source lexer.
//!
//! Turns source text into a flat list of [`Token`]s.  Whitespace and `//`
//! comments are skipped without producing tokens; newlines (including those
//! inside string literals) advance the line counter.

use std::fmt;

use super::error::LexError;

/// Reserved words.  Matched as whole words only: `variable` is an identifier.
pub const KEYWORDS: &[&str] = &[
    "var", "if", "else", "while", "func", "return", "print", "class", "new", "extends", "import",
    "break", "input", "switch", "case", "default",
];

// ── Token ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Str,
    Number,
    Keyword,
    Ident,
    /// `==`, `!=`, `<`, `>`, `<=`, `>=`
    Compare,
    /// `+`, `-`, `*`, `/`, `%`
    Arith,
    Assign,
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Colon,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Str => "STRING",
            TokenKind::Number => "NUMBER",
            TokenKind::Keyword => "KEYWORD",
            TokenKind::Ident => "ID",
            TokenKind::Compare => "OP_CMP",
            TokenKind::Arith => "OP_MATH",
            TokenKind::Assign => "ASSIGN",
            TokenKind::LBrace => "LBRACE",
            TokenKind::RBrace => "RBRACE",
            TokenKind::LParen => "LPAREN",
            TokenKind::RParen => "RPAREN",
            TokenKind::LBracket => "LBRACKET",
            TokenKind::RBracket => "RBRACKET",
            TokenKind::Comma => "COMMA",
            TokenKind::Dot => "DOT",
            TokenKind::Colon => "COLON",
        };
        f.write_str(s)
    }
}

/// A lexed token.  `text` holds the literal text; string literals have their
/// enclosing quotes stripped.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
}

impl Token {
    pub fn is(&self, kind: TokenKind, text: &str) -> bool {
        self.kind == kind && self.text == text
    }

    pub fn is_keyword(&self, word: &str) -> bool {
        self.is(TokenKind::Keyword, word)
    }
}

// ── Lexer ─────────────────────────────────────────────────────────────────────

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Lexer {
            chars: src.chars().peekable(),
            line: 1,
            tokens: Vec::new(),
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn eat(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn push(&mut self, kind: TokenKind, text: impl Into<String>) {
        self.tokens.push(Token {
            kind,
            text: text.into(),
            line: self.line,
        });
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.chars.next();
        }
    }

    fn read_string(&mut self) -> Result<(), LexError> {
        let start_line = self.line;
        let mut s = String::new();
        loop {
            match self.chars.next() {
                None => return Err(LexError::UnterminatedString { line: start_line }),
                Some('"') => break,
                Some(c) => {
                    if c == '\n' {
                        self.line += 1;
                    }
                    s.push(c);
                }
            }
        }
        self.tokens.push(Token {
            kind: TokenKind::Str,
            text: s,
            line: start_line,
        });
        Ok(())
    }

    fn read_number(&mut self, first: char) {
        let mut s = String::from(first);
        while let Some(c @ '0'..='9') = self.peek() {
            s.push(c);
            self.chars.next();
        }
        // A fraction needs a digit after the dot; `1.` stays Number + Dot.
        let mut lookahead = self.chars.clone();
        if lookahead.next() == Some('.') && matches!(lookahead.next(), Some('0'..='9')) {
            self.chars.next();
            s.push('.');
            while let Some(c @ '0'..='9') = self.peek() {
                s.push(c);
                self.chars.next();
            }
        }
        self.push(TokenKind::Number, s);
    }

    fn read_word(&mut self, first: char) {
        let mut s = String::from(first);
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                s.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        let kind = if KEYWORDS.contains(&s.as_str()) {
            TokenKind::Keyword
        } else {
            TokenKind::Ident
        };
        self.push(kind, s);
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        while let Some(ch) = self.chars.next() {
            match ch {
                '\n' => self.line += 1,
                c if c.is_whitespace() => {}
                '/' if self.peek() == Some('/') => self.skip_comment(),
                '"' => self.read_string()?,
                '0'..='9' => self.read_number(ch),
                c if c.is_alphabetic() || c == '_' => self.read_word(c),
                '=' => {
                    if self.eat('=') {
                        self.push(TokenKind::Compare, "==");
                    } else {
                        self.push(TokenKind::Assign, "=");
                    }
                }
                '!' => {
                    if self.eat('=') {
                        self.push(TokenKind::Compare, "!=");
                    } else {
                        return Err(LexError::UnexpectedChar { ch, line: self.line });
                    }
                }
                '<' | '>' => {
                    if self.eat('=') {
                        self.push(TokenKind::Compare, format!("{ch}="));
                    } else {
                        self.push(TokenKind::Compare, ch.to_string());
                    }
                }
                '+' | '-' | '*' | '/' | '%' => self.push(TokenKind::Arith, ch.to_string()),
                '{' => self.push(TokenKind::LBrace, "{"),
                '}' => self.push(TokenKind::RBrace, "}"),
                '(' => self.push(TokenKind::LParen, "("),
                ')' => self.push(TokenKind::RParen, ")"),
                '[' => self.push(TokenKind::LBracket, "["),
                ']' => self.push(TokenKind::RBracket, "]"),
                ',' => self.push(TokenKind::Comma, ","),
                '.' => self.push(TokenKind::Dot, "."),
                ':' => self.push(TokenKind::Colon, ":"),
                c => return Err(LexError::UnexpectedChar { ch: c, line: self.line }),
            }
        }
        Ok(self.tokens)
    }
}

/// Tokenize source text.
pub fn tokenize(src: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(src).run()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
