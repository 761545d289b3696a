use crate::entry::{Entry, Options, DEFAULT_GROUP};
use crate::error::{ManifestError, ParseError};
use crate::parser::{parse_statements, Statement};
use crate::types::{EntryKind, Value};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

/// The evaluated contents of a Brewfile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    /// Entries in declaration order.
    pub entries: Vec<Entry>,
    /// Cask defaults in effect at the end of evaluation.
    pub cask_arguments: BTreeMap<String, Value>,
}

impl Manifest {
    pub fn entries_of(&self, kind: EntryKind) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(move |e| e.kind() == kind)
    }

    pub fn declares(&self, kind: EntryKind) -> bool {
        self.entries_of(kind).next().is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn parse_manifest_str(input: &str) -> Result<Manifest, ManifestError> {
    let statements = parse_statements(input)?;
    let mut evaluator = Evaluator::new();
    evaluator.block(&statements)?;
    Ok(evaluator.finish())
}

pub fn parse_manifest_file(path: impl AsRef<Path>) -> Result<Manifest, ManifestError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(ManifestError::NotFound),
        Err(e) => return Err(ManifestError::Io(e)),
    };
    parse_manifest_str(&content)
}

struct Evaluator {
    entries: Vec<Entry>,
    cask_arguments: BTreeMap<String, Value>,
    groups: Vec<String>,
}

impl Evaluator {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            cask_arguments: BTreeMap::new(),
            groups: vec![DEFAULT_GROUP.to_owned()],
        }
    }

    fn finish(self) -> Manifest {
        Manifest {
            entries: self.entries,
            cask_arguments: self.cask_arguments,
        }
    }

    fn block(&mut self, statements: &[Statement]) -> Result<(), ParseError> {
        for stmt in statements {
            self.statement(stmt)?;
        }
        Ok(())
    }

    fn statement(&mut self, stmt: &Statement) -> Result<(), ParseError> {
        if stmt.name != "group" && stmt.block.is_some() {
            return Err(ParseError::shape(&stmt.name, "does not take a block", stmt.line));
        }
        match stmt.name.as_str() {
            "brew" => self.package(EntryKind::Brew, stmt),
            "cask" => self.cask(stmt),
            "mas" => self.mas(stmt),
            "whalebrew" => self.whalebrew(stmt),
            "tap" => self.tap(stmt),
            "cask_args" => self.cask_args(stmt),
            "group" => self.group(stmt),
            other => Err(ParseError::UnknownStatement {
                name: other.to_owned(),
                line: stmt.line,
            }),
        }
    }

    fn push(&mut self, kind: EntryKind, name: &str, options: Options) {
        self.entries
            .push(Entry::new(kind, name, options, self.groups.clone()));
    }

    fn package(&mut self, kind: EntryKind, stmt: &Statement) -> Result<(), ParseError> {
        let (name, options) = name_and_options(stmt)?;
        self.push(kind, name, options);
        Ok(())
    }

    fn cask(&mut self, stmt: &Statement) -> Result<(), ParseError> {
        let (name, mut options) = name_and_options(stmt)?;
        let mut args = self.cask_arguments.clone();
        match options.remove("args") {
            None | Some(Value::Nil) => {}
            Some(Value::Hash(own)) => args.extend(own),
            Some(other) => {
                return Err(ParseError::shape(
                    &stmt.name,
                    format!("args must be a hash, found {}", other.type_name()),
                    stmt.line,
                ));
            }
        }
        options.insert("args".to_owned(), Value::Hash(args));
        self.push(EntryKind::Cask, name, options);
        Ok(())
    }

    fn mas(&mut self, stmt: &Statement) -> Result<(), ParseError> {
        let (name, options) = name_and_options(stmt)?;
        if options.get("id").and_then(Value::as_int).is_none() {
            return Err(ParseError::shape(
                &stmt.name,
                "options[:id] must be an integer",
                stmt.line,
            ));
        }
        self.push(EntryKind::Mas, name, options);
        Ok(())
    }

    fn whalebrew(&mut self, stmt: &Statement) -> Result<(), ParseError> {
        self.package(EntryKind::Whalebrew, stmt)
    }

    fn tap(&mut self, stmt: &Statement) -> Result<(), ParseError> {
        let (mut positional, mut options) = split_trailing_hash(stmt);
        if positional.is_empty() || positional.len() > 2 {
            return Err(arity(stmt, positional.len(), "1..2"));
        }
        let name = required_name(stmt, positional.remove(0))?;

        // A positional clone target wins over the keyword form.
        if let Some(target) = positional.pop() {
            options.insert("clone_target".to_owned(), target.clone());
        }
        match options.get("clone_target") {
            None | Some(Value::Str(_)) => {}
            Some(Value::Nil) => {
                options.remove("clone_target");
            }
            Some(other) => {
                return Err(ParseError::shape(
                    &stmt.name,
                    format!("clone_target must be a string, found {}", other.type_name()),
                    stmt.line,
                ));
            }
        }
        self.push(EntryKind::Tap, name, options);
        Ok(())
    }

    fn cask_args(&mut self, stmt: &Statement) -> Result<(), ParseError> {
        match stmt.args.as_slice() {
            [Value::Hash(args)] => {
                self.cask_arguments = args.clone();
                Ok(())
            }
            [other] => Err(ParseError::shape(
                &stmt.name,
                format!("arguments must be a hash, found {}", other.type_name()),
                stmt.line,
            )),
            args => Err(arity(stmt, args.len(), "1")),
        }
    }

    fn group(&mut self, stmt: &Statement) -> Result<(), ParseError> {
        let name = match stmt.args.as_slice() {
            [Value::Str(name)] if !name.is_empty() => name.clone(),
            [other] => {
                return Err(ParseError::shape(
                    &stmt.name,
                    format!("name must be a non-empty string, found {other}"),
                    stmt.line,
                ));
            }
            args => return Err(arity(stmt, args.len(), "1")),
        };
        let Some(body) = &stmt.block else {
            return Err(ParseError::shape(&stmt.name, "requires a block", stmt.line));
        };

        self.groups.push(name);
        let result = self.block(body);
        self.groups.pop();
        result
    }
}

/// Split off a trailing keyword hash from the positional arguments.
fn split_trailing_hash(stmt: &Statement) -> (Vec<&Value>, Options) {
    let mut positional: Vec<&Value> = stmt.args.iter().collect();
    // A lone hash is the (invalid) name, not options.
    if positional.len() > 1 {
        if let Some(Value::Hash(options)) = positional.last() {
            let options = options.clone();
            positional.pop();
            return (positional, options);
        }
    }
    (positional, Options::new())
}

fn name_and_options(stmt: &Statement) -> Result<(&str, Options), ParseError> {
    let (positional, options) = split_trailing_hash(stmt);
    match positional.as_slice() {
        [name] => Ok((required_name(stmt, name)?, options)),
        [_, extra, ..] if positional.len() == 2 => Err(ParseError::shape(
            &stmt.name,
            format!("options must be a hash, found {}", extra.type_name()),
            stmt.line,
        )),
        other => Err(arity(stmt, other.len(), "1..2")),
    }
}

fn required_name<'a>(stmt: &Statement, value: &'a Value) -> Result<&'a str, ParseError> {
    match value {
        Value::Str(name) if !name.trim().is_empty() => Ok(name),
        other => Err(ParseError::shape(
            &stmt.name,
            format!("name must be a non-empty string, found {other}"),
            stmt.line,
        )),
    }
}

fn arity(stmt: &Statement, given: usize, expected: &str) -> ParseError {
    ParseError::shape(
        &stmt.name,
        format!("wrong number of arguments (given {given}, expected {expected})"),
        stmt.line,
    )
}
