//! Recursive-descent parser from tokens to a flat statement tree.
//!
//! The grammar is deliberately closed: a Brewfile is a sequence of
//! `name arg, arg, key: value` calls with optional `do ... end` or `{ ... }`
//! blocks. Arguments are literals only. There are no variables, method
//! calls, or expressions, so nothing in a Brewfile is ever executed.

use crate::error::ParseError;
use crate::lexer::{tokenize, Token, TokenKind};
use crate::types::Value;
use std::collections::BTreeMap;

/// Deepest allowed nesting of blocks, arrays, and hashes.
pub const MAX_NESTING: usize = 64;

/// One call-shaped statement. Keyword arguments (and `key => value` pairs)
/// are collected into a trailing [`Value::Hash`] in `args`, mirroring how a
/// trailing hash is passed to a Ruby method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub name: String,
    pub args: Vec<Value>,
    pub block: Option<Vec<Statement>>,
    pub line: usize,
}

pub fn parse_statements(source: &str) -> Result<Vec<Statement>, ParseError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let statements = parser.statements(None)?;
    parser.expect(&TokenKind::Eof, "end of file")?;
    Ok(statements)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        // The lexer always terminates the stream with Eof.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn at(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<Token, ParseError> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            let tok = self.peek();
            Err(ParseError::expected(what, tok.kind.to_string(), tok.line))
        }
    }

    /// Run `f` one nesting level deeper, failing past [`MAX_NESTING`].
    fn nested<T>(
        &mut self,
        line: usize,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::TooDeep { line });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn skip_newlines(&mut self) {
        while self.at(&TokenKind::Newline) {
            self.advance();
        }
    }

    /// Parse statements until `terminator` (not consumed) or end of file.
    fn statements(&mut self, terminator: Option<&TokenKind>) -> Result<Vec<Statement>, ParseError> {
        let mut out = Vec::new();
        loop {
            self.skip_newlines();
            let Token { kind, line } = self.peek().clone();
            if terminator.is_some_and(|t| &kind == t) {
                return Ok(out);
            }
            match kind {
                TokenKind::Eof => {
                    if let Some(t) = terminator {
                        return Err(ParseError::expected(t.to_string(), "end of file", line));
                    }
                    return Ok(out);
                }
                TokenKind::Ident(_) => out.push(self.statement()?),
                other => {
                    return Err(ParseError::expected("statement", other.to_string(), line));
                }
            }
        }
    }

    fn statement(&mut self) -> Result<Statement, ParseError> {
        let head = self.advance();
        let name = match head.kind {
            TokenKind::Ident(name) => name,
            other => return Err(ParseError::expected("statement", other.to_string(), head.line)),
        };

        let args = if self.at(&TokenKind::LParen) {
            self.advance();
            let args = if self.at(&TokenKind::RParen) {
                Vec::new()
            } else {
                self.arguments()?
            };
            self.expect(&TokenKind::RParen, "')'")?;
            args
        } else if starts_argument(&self.peek().kind) {
            self.arguments()?
        } else {
            Vec::new()
        };

        let block = match self.peek().kind {
            TokenKind::Do => {
                let line = self.advance().line;
                let body = self.nested(line, |p| p.statements(Some(&TokenKind::End)))?;
                self.expect(&TokenKind::End, "'end'")?;
                Some(body)
            }
            TokenKind::LBrace => {
                let line = self.advance().line;
                let body = self.nested(line, |p| p.statements(Some(&TokenKind::RBrace)))?;
                self.expect(&TokenKind::RBrace, "'}'")?;
                Some(body)
            }
            _ => None,
        };

        match self.peek().kind {
            TokenKind::Newline => {
                self.advance();
            }
            TokenKind::Eof | TokenKind::End | TokenKind::RBrace => {}
            ref other => {
                return Err(ParseError::expected(
                    "end of statement",
                    other.to_string(),
                    self.peek().line,
                ));
            }
        }

        Ok(Statement {
            name,
            args,
            block,
            line: head.line,
        })
    }

    fn arguments(&mut self) -> Result<Vec<Value>, ParseError> {
        let mut positional = Vec::new();
        let mut keywords: Option<BTreeMap<String, Value>> = None;

        loop {
            let line = self.peek().line;
            if let TokenKind::Label(key) = &self.peek().kind {
                let key = key.clone();
                self.advance();
                let value = self.value()?;
                keywords.get_or_insert_with(BTreeMap::new).insert(key, value);
            } else {
                let value = self.value()?;
                if self.at(&TokenKind::Arrow) {
                    self.advance();
                    let key = hash_key(value, line)?;
                    let value = self.value()?;
                    keywords.get_or_insert_with(BTreeMap::new).insert(key, value);
                } else if keywords.is_some() {
                    return Err(ParseError::expected(
                        "keyword argument",
                        value.to_string(),
                        line,
                    ));
                } else {
                    positional.push(value);
                }
            }

            if self.at(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        if let Some(kw) = keywords {
            positional.push(Value::Hash(kw));
        }
        Ok(positional)
    }

    fn value(&mut self) -> Result<Value, ParseError> {
        let tok = self.advance();
        match tok.kind {
            TokenKind::Str(s) => Ok(Value::Str(s)),
            TokenKind::Int(n) => Ok(Value::Int(n)),
            TokenKind::Symbol(s) => Ok(Value::Symbol(s)),
            TokenKind::True => Ok(Value::Bool(true)),
            TokenKind::False => Ok(Value::Bool(false)),
            TokenKind::Nil => Ok(Value::Nil),
            TokenKind::LBracket => self.nested(tok.line, Self::array),
            TokenKind::LBrace => self.nested(tok.line, |p| p.hash(tok.line)),
            other => Err(ParseError::expected("value", other.to_string(), tok.line)),
        }
    }

    fn array(&mut self) -> Result<Value, ParseError> {
        let mut items = Vec::new();
        loop {
            if self.at(&TokenKind::RBracket) {
                self.advance();
                return Ok(Value::Array(items));
            }
            items.push(self.value()?);
            if self.at(&TokenKind::Comma) {
                self.advance();
            } else {
                self.expect(&TokenKind::RBracket, "']'")?;
                return Ok(Value::Array(items));
            }
        }
    }

    fn hash(&mut self, open_line: usize) -> Result<Value, ParseError> {
        let mut map = BTreeMap::new();
        loop {
            self.skip_newlines();
            match self.peek().kind.clone() {
                TokenKind::RBrace => {
                    self.advance();
                    return Ok(Value::Hash(map));
                }
                TokenKind::Eof => {
                    return Err(ParseError::UnclosedDelimiter {
                        delimiter: '{',
                        line: open_line,
                    });
                }
                TokenKind::Label(key) => {
                    self.advance();
                    let value = self.value()?;
                    map.insert(key, value);
                }
                _ => {
                    let line = self.peek().line;
                    let key = hash_key(self.value()?, line)?;
                    self.expect(&TokenKind::Arrow, "'=>'")?;
                    let value = self.value()?;
                    map.insert(key, value);
                }
            }
            self.skip_newlines();
            if self.at(&TokenKind::Comma) {
                self.advance();
            } else if !self.at(&TokenKind::RBrace) {
                let tok = self.peek();
                return Err(ParseError::expected("',' or '}'", tok.kind.to_string(), tok.line));
            }
        }
    }
}

fn starts_argument(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Str(_)
            | TokenKind::Int(_)
            | TokenKind::Symbol(_)
            | TokenKind::Label(_)
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Nil
            | TokenKind::LBracket
            | TokenKind::LBrace
    )
}

fn hash_key(value: Value, line: usize) -> Result<String, ParseError> {
    match value {
        Value::Str(s) | Value::Symbol(s) => Ok(s),
        other => Err(ParseError::expected(
            "string or symbol hash key",
            other.to_string(),
            line,
        )),
    }
}
