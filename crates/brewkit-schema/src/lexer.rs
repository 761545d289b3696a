//! Tokenizer for Brewfile source text.
//!
//! Produces a flat token stream with line numbers. Comments are dropped.
//! Newlines and `;` are kept as statement separators, except where the
//! statement obviously continues: inside `()` / `[]`, and right after a
//! `,`, `=>`, or `key:` label. Braces are left alone since they may open
//! either a hash or a block; the parser skips newlines inside them.

use crate::error::ParseError;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Ident(String),
    /// `key:` in keyword-argument or hash position.
    Label(String),
    /// `:name`
    Symbol(String),
    Str(String),
    Int(i64),
    True,
    False,
    Nil,
    Do,
    End,
    Comma,
    Arrow,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Newline,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(s) => write!(f, "identifier '{s}'"),
            TokenKind::Label(s) => write!(f, "label '{s}:'"),
            TokenKind::Symbol(s) => write!(f, "symbol ':{s}'"),
            TokenKind::Str(s) => write!(f, "string {s:?}"),
            TokenKind::Int(n) => write!(f, "integer {n}"),
            TokenKind::True => f.write_str("'true'"),
            TokenKind::False => f.write_str("'false'"),
            TokenKind::Nil => f.write_str("'nil'"),
            TokenKind::Do => f.write_str("'do'"),
            TokenKind::End => f.write_str("'end'"),
            TokenKind::Comma => f.write_str("','"),
            TokenKind::Arrow => f.write_str("'=>'"),
            TokenKind::LParen => f.write_str("'('"),
            TokenKind::RParen => f.write_str("')'"),
            TokenKind::LBracket => f.write_str("'['"),
            TokenKind::RBracket => f.write_str("']'"),
            TokenKind::LBrace => f.write_str("'{'"),
            TokenKind::RBrace => f.write_str("'}'"),
            TokenKind::Newline => f.write_str("end of line"),
            TokenKind::Eof => f.write_str("end of file"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    Lexer::new(source).run()
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    source: &'a str,
    line: usize,
    /// Open `(` and `[` delimiters, with the line they opened on.
    nesting: Vec<(char, usize)>,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.char_indices().peekable(),
            source,
            line: 1,
            nesting: Vec::new(),
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        while let Some(&(start, c)) = self.chars.peek() {
            match c {
                ' ' | '\t' | '\r' => {
                    self.chars.next();
                }
                '\\' => {
                    // Explicit line continuation.
                    self.chars.next();
                    if let Some((_, '\n')) = self.chars.peek().copied() {
                        self.chars.next();
                        self.line += 1;
                    } else {
                        return Err(ParseError::UnexpectedChar {
                            found: '\\',
                            line: self.line,
                        });
                    }
                }
                '#' => {
                    while let Some(&(_, c)) = self.chars.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.chars.next();
                    }
                }
                '\n' | ';' => {
                    self.chars.next();
                    self.separator();
                    if c == '\n' {
                        self.line += 1;
                    }
                }
                '"' | '\'' => {
                    self.chars.next();
                    let s = self.string(c)?;
                    self.push(TokenKind::Str(s));
                }
                ':' => {
                    self.chars.next();
                    let name = self.word();
                    if name.is_empty() {
                        return Err(ParseError::UnexpectedChar {
                            found: ':',
                            line: self.line,
                        });
                    }
                    self.push(TokenKind::Symbol(name));
                }
                '=' => {
                    self.chars.next();
                    match self.chars.next() {
                        Some((_, '>')) => self.push(TokenKind::Arrow),
                        _ => {
                            return Err(ParseError::UnexpectedChar {
                                found: '=',
                                line: self.line,
                            })
                        }
                    }
                }
                ',' => {
                    self.chars.next();
                    self.push(TokenKind::Comma);
                }
                '(' | '[' => {
                    self.chars.next();
                    self.nesting.push((c, self.line));
                    self.push(if c == '(' {
                        TokenKind::LParen
                    } else {
                        TokenKind::LBracket
                    });
                }
                ')' | ']' => {
                    self.chars.next();
                    let open = if c == ')' { '(' } else { '[' };
                    match self.nesting.pop() {
                        Some((o, _)) if o == open => {}
                        _ => {
                            return Err(ParseError::UnexpectedChar {
                                found: c,
                                line: self.line,
                            })
                        }
                    }
                    self.push(if c == ')' {
                        TokenKind::RParen
                    } else {
                        TokenKind::RBracket
                    });
                }
                '{' => {
                    self.chars.next();
                    self.push(TokenKind::LBrace);
                }
                '}' => {
                    self.chars.next();
                    self.push(TokenKind::RBrace);
                }
                c if c.is_ascii_digit() || (c == '-' && self.next_is_digit(start)) => {
                    self.number()?;
                }
                c if is_word_start(c) => {
                    let word = self.word();
                    // `key:` is a label unless it is really `key::` or the
                    // start of a symbol argument (`brew :foo` has a space).
                    if let Some(&(_, ':')) = self.chars.peek() {
                        let mut lookahead = self.chars.clone();
                        lookahead.next();
                        let is_label = !matches!(lookahead.peek(), Some(&(_, ':')));
                        if is_label {
                            self.chars.next();
                            self.push(TokenKind::Label(word));
                            continue;
                        }
                    }
                    let kind = match word.as_str() {
                        "true" => TokenKind::True,
                        "false" => TokenKind::False,
                        "nil" => TokenKind::Nil,
                        "do" => TokenKind::Do,
                        "end" => TokenKind::End,
                        _ => TokenKind::Ident(word),
                    };
                    self.push(kind);
                }
                other => {
                    return Err(ParseError::UnexpectedChar {
                        found: other,
                        line: self.line,
                    })
                }
            }
        }

        if let Some((delimiter, line)) = self.nesting.pop() {
            return Err(ParseError::UnclosedDelimiter { delimiter, line });
        }

        self.separator();
        self.push(TokenKind::Eof);
        Ok(self.tokens)
    }

    fn push(&mut self, kind: TokenKind) {
        self.tokens.push(Token {
            kind,
            line: self.line,
        });
    }

    /// Emit a statement separator unless the statement is still open.
    fn separator(&mut self) {
        if !self.nesting.is_empty() {
            return;
        }
        let continues = matches!(
            self.tokens.last().map(|t| &t.kind),
            None | Some(
                TokenKind::Newline | TokenKind::Comma | TokenKind::Arrow | TokenKind::Label(_)
            )
        );
        if !continues {
            self.push(TokenKind::Newline);
        }
    }

    fn next_is_digit(&self, start: usize) -> bool {
        self.source[start + 1..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit())
    }

    fn word(&mut self) -> String {
        let mut out = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if is_word_char(c) {
                out.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        // Ruby predicate and bang method names.
        if let Some(&(_, c @ ('?' | '!'))) = self.chars.peek() {
            if !out.is_empty() {
                out.push(c);
                self.chars.next();
            }
        }
        out
    }

    fn number(&mut self) -> Result<(), ParseError> {
        let mut text = String::new();
        if let Some(&(_, '-')) = self.chars.peek() {
            text.push('-');
            self.chars.next();
        }
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                text.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        let value = text
            .replace('_', "")
            .parse::<i64>()
            .map_err(|_| ParseError::InvalidNumber {
                text: text.clone(),
                line: self.line,
            })?;
        self.push(TokenKind::Int(value));
        Ok(())
    }

    fn string(&mut self, quote: char) -> Result<String, ParseError> {
        let start_line = self.line;
        let mut out = String::new();
        loop {
            let Some((_, c)) = self.chars.next() else {
                return Err(ParseError::UnterminatedString { line: start_line });
            };
            match c {
                c if c == quote => return Ok(out),
                '\n' => {
                    self.line += 1;
                    out.push('\n');
                }
                '\\' => {
                    let Some((_, esc)) = self.chars.next() else {
                        return Err(ParseError::UnterminatedString { line: start_line });
                    };
                    if quote == '\'' {
                        // Single quotes only escape the quote and the backslash.
                        if esc != '\'' && esc != '\\' {
                            out.push('\\');
                        }
                        out.push(esc);
                        continue;
                    }
                    match esc {
                        '"' => out.push('"'),
                        '\\' => out.push('\\'),
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        other => {
                            return Err(ParseError::InvalidEscape {
                                found: other,
                                line: self.line,
                            })
                        }
                    }
                }
                '#' if quote == '"' && matches!(self.chars.peek(), Some(&(_, '{'))) => {
                    return Err(ParseError::Shape {
                        statement: "string".to_owned(),
                        message: "interpolation is not supported".to_owned(),
                        line: self.line,
                    });
                }
                other => out.push(other),
            }
        }
    }
}

fn is_word_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn simple_statement() {
        assert_eq!(
            kinds("brew 'mysql'"),
            vec![
                TokenKind::Ident("brew".to_owned()),
                TokenKind::Str("mysql".to_owned()),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn labels_symbols_and_arrows() {
        assert_eq!(
            kinds("mas \"1Password\", id: 443987910, :greedy => true"),
            vec![
                TokenKind::Ident("mas".to_owned()),
                TokenKind::Str("1Password".to_owned()),
                TokenKind::Comma,
                TokenKind::Label("id".to_owned()),
                TokenKind::Int(443_987_910),
                TokenKind::Comma,
                TokenKind::Symbol("greedy".to_owned()),
                TokenKind::Arrow,
                TokenKind::True,
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comments_are_dropped_and_blank_lines_collapse() {
        let toks = kinds("# header\n\n\nbrew \"git\" # trailing\n\n");
        assert_eq!(
            toks,
            vec![
                TokenKind::Ident("brew".to_owned()),
                TokenKind::Str("git".to_owned()),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn newline_after_comma_continues_statement() {
        let toks = kinds("brew \"a\",\n  args: [\"x\",\n \"y\"]\n");
        assert!(!toks[..toks.len() - 2].contains(&TokenKind::Newline));
    }

    #[test]
    fn line_numbers_track_newlines() {
        let toks = tokenize("tap \"a/b\"\n\nbrew \"c\"").unwrap();
        let brew = toks
            .iter()
            .find(|t| t.kind == TokenKind::Ident("brew".to_owned()))
            .unwrap();
        assert_eq!(brew.line, 3);
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            kinds(r#""a\"b\n""#)[0],
            TokenKind::Str("a\"b\n".to_owned())
        );
        assert_eq!(kinds(r"'a\'b\d'")[0], TokenKind::Str("a'b\\d".to_owned()));
    }

    #[test]
    fn rejects_unterminated_string() {
        let err = tokenize("brew \"mysql\nbrew 'git'").unwrap_err();
        assert_eq!(err, ParseError::UnterminatedString { line: 1 });
    }

    #[test]
    fn rejects_interpolation() {
        assert!(tokenize("brew \"#{name}\"").is_err());
    }

    #[test]
    fn rejects_unbalanced_delimiters() {
        assert!(matches!(
            tokenize("brew(\"a\"").unwrap_err(),
            ParseError::UnclosedDelimiter { delimiter: '(', .. }
        ));
        assert!(tokenize("brew \"a\")").is_err());
    }

    #[test]
    fn negative_and_underscored_integers() {
        assert_eq!(kinds("x -5")[1], TokenKind::Int(-5));
        assert_eq!(kinds("x 1_000")[1], TokenKind::Int(1000));
        assert!(tokenize("x 12abc").is_err());
    }

    #[test]
    fn keywords() {
        assert_eq!(
            kinds("group \"w\" do\nend"),
            vec![
                TokenKind::Ident("group".to_owned()),
                TokenKind::Str("w".to_owned()),
                TokenKind::Do,
                TokenKind::Newline,
                TokenKind::End,
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }
}
