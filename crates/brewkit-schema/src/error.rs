//! Error types for manifest lexing, parsing, and evaluation.
//!
//! `ParseError` carries the 1-based source line of the offending token or
//! statement. It never escapes the crate on its own: `parse_manifest_str`
//! wraps every variant into [`ManifestError::Invalid`], so callers see one
//! uniform "invalid manifest" error that still holds the original message.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("No Brewfile found")]
    NotFound,
    #[error("failed to read Brewfile: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid Brewfile: {0}")]
    Invalid(String),
}

impl From<ParseError> for ManifestError {
    fn from(err: ParseError) -> Self {
        ManifestError::Invalid(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line {line}: unexpected character {found:?}")]
    UnexpectedChar { found: char, line: usize },

    #[error("line {line}: unterminated string literal")]
    UnterminatedString { line: usize },

    #[error("line {line}: invalid escape sequence '\\{found}'")]
    InvalidEscape { found: char, line: usize },

    #[error("line {line}: invalid integer literal '{text}'")]
    InvalidNumber { text: String, line: usize },

    #[error("line {line}: expected {expected}, found {found}")]
    Expected {
        expected: String,
        found: String,
        line: usize,
    },

    #[error("line {line}: unclosed '{delimiter}'")]
    UnclosedDelimiter { delimiter: char, line: usize },

    #[error("line {line}: unknown statement '{name}'")]
    UnknownStatement { name: String, line: usize },

    #[error("line {line}: values nested too deeply")]
    TooDeep { line: usize },

    #[error("line {line}: {statement}: {message}")]
    Shape {
        statement: String,
        message: String,
        line: usize,
    },
}

impl ParseError {
    pub fn expected(expected: impl Into<String>, found: impl Into<String>, line: usize) -> Self {
        ParseError::Expected {
            expected: expected.into(),
            found: found.into(),
            line,
        }
    }

    pub fn shape(statement: &str, message: impl Into<String>, line: usize) -> Self {
        ParseError::Shape {
            statement: statement.to_owned(),
            message: message.into(),
            line,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            ParseError::UnexpectedChar { line, .. }
            | ParseError::UnterminatedString { line }
            | ParseError::InvalidEscape { line, .. }
            | ParseError::InvalidNumber { line, .. }
            | ParseError::Expected { line, .. }
            | ParseError::UnclosedDelimiter { line, .. }
            | ParseError::UnknownStatement { line, .. }
            | ParseError::TooDeep { line }
            | ParseError::Shape { line, .. } => *line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_error_names_statement_and_line() {
        let err = ParseError::shape("mas", "options[:id] must be an integer", 4);
        assert_eq!(err.to_string(), "line 4: mas: options[:id] must be an integer");
        assert_eq!(err.line(), 4);
    }

    #[test]
    fn parse_errors_wrap_into_invalid_manifest() {
        let err: ManifestError = ParseError::UnterminatedString { line: 2 }.into();
        assert_eq!(
            err.to_string(),
            "Invalid Brewfile: line 2: unterminated string literal"
        );
    }
}
