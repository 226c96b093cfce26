//! Type references used throughout the goal model.
//!
//! A [`TypeRef`] is a small tree over Rust type syntax: generic type
//! variables, (possibly path-qualified) named types with generic
//! arguments, and tuples. Only as much structure as the liveness analysis
//! and the emitter need is kept; references, lifetimes and trait objects
//! are not representable.

use crate::error::StructuralError;
use crate::lexer::{self, Token};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// A generic type variable declared by a goal (`K`, `V`, `T`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeVar(String);

impl TypeVar {
    pub fn new(name: impl Into<String>) -> Self {
        TypeVar(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build a list of type variables from names.
pub fn vars<I, S>(names: I) -> Vec<TypeVar>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names.into_iter().map(TypeVar::new).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Var(TypeVar),
    Named { path: String, args: Vec<TypeRef> },
    /// The empty tuple is the unit type.
    Tuple(Vec<TypeRef>),
}

impl TypeRef {
    pub fn var(name: impl Into<String>) -> Self {
        TypeRef::Var(TypeVar::new(name))
    }

    pub fn named(path: impl Into<String>, args: Vec<TypeRef>) -> Self {
        TypeRef::Named {
            path: path.into(),
            args,
        }
    }

    /// A named type without generic arguments.
    pub fn simple(path: impl Into<String>) -> Self {
        TypeRef::named(path, Vec::new())
    }

    pub fn unit() -> Self {
        TypeRef::Tuple(Vec::new())
    }

    /// Reference to a generated type parameterized by the given variables.
    pub fn generated(name: &str, params: &[TypeVar]) -> Self {
        TypeRef::named(name, params.iter().cloned().map(TypeRef::Var).collect())
    }

    /// Parse Rust-style type syntax. Single-segment identifiers naming one
    /// of `declared` become type variables.
    pub fn parse(text: &str, declared: &[TypeVar]) -> Result<TypeRef, StructuralError> {
        let tokens = lexer::lex(text)?;
        let mut parser = TypeParser {
            src: text,
            tokens,
            pos: 0,
            declared,
        };
        let ty = parser.parse_type()?;
        if parser.peek() != &Token::Eof {
            return Err(lexer::invalid(text, "trailing input after type"));
        }
        Ok(ty)
    }

    /// Type variables occurring in this type, in first-occurrence order.
    pub fn type_vars(&self) -> Vec<TypeVar> {
        let mut out = Vec::new();
        self.collect_vars(&mut out);
        out
    }

    fn collect_vars(&self, out: &mut Vec<TypeVar>) {
        match self {
            TypeRef::Var(v) => {
                if !out.contains(v) {
                    out.push(v.clone());
                }
            }
            TypeRef::Named { args, .. } => args.iter().for_each(|a| a.collect_vars(out)),
            TypeRef::Tuple(items) => items.iter().for_each(|a| a.collect_vars(out)),
        }
    }

    pub fn mentions(&self, var: &TypeVar) -> bool {
        match self {
            TypeRef::Var(v) => v == var,
            TypeRef::Named { args, .. } => args.iter().any(|a| a.mentions(var)),
            TypeRef::Tuple(items) => items.iter().any(|a| a.mentions(var)),
        }
    }

    /// The `T` of an `Option<T>`, the only shape that can be absent.
    pub fn option_inner(&self) -> Option<&TypeRef> {
        match self {
            TypeRef::Named { path, args }
                if args.len() == 1
                    && matches!(
                        path.as_str(),
                        "Option" | "std::option::Option" | "core::option::Option"
                    ) =>
            {
                args.first()
            }
            _ => None,
        }
    }

    /// Last path segment of a named type (`Person` for `crate::model::Person<T>`).
    pub fn simple_name(&self) -> Option<&str> {
        match self {
            TypeRef::Named { path, .. } => path.rsplit("::").next(),
            TypeRef::Var(v) => Some(v.name()),
            TypeRef::Tuple(_) => None,
        }
    }

    /// The type without generic arguments, in expression position
    /// (`HashMap` for `HashMap<K, V>`), used to spell `Type::function(..)`.
    pub fn path(&self) -> Option<&str> {
        match self {
            TypeRef::Named { path, .. } => Some(path),
            _ => None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Var(v) => write!(f, "{}", v),
            TypeRef::Named { path, args } => {
                f.write_str(path)?;
                if !args.is_empty() {
                    f.write_str("<")?;
                    write_list(f, args)?;
                    f.write_str(">")?;
                }
                Ok(())
            }
            TypeRef::Tuple(items) => {
                f.write_str("(")?;
                write_list(f, items)?;
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[TypeRef]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl Serialize for TypeRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct TypeParser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    declared: &'a [TypeVar],
}

impl<'a> TypeParser<'a> {
    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn err(&self, reason: impl Into<String>) -> StructuralError {
        lexer::invalid(self.src, reason)
    }

    fn parse_type(&mut self) -> Result<TypeRef, StructuralError> {
        match self.advance() {
            Token::LParen => {
                let items = self.parse_list(Token::RParen)?;
                Ok(TypeRef::Tuple(items))
            }
            Token::Word(first) => {
                let mut path = first;
                let mut segments = 1;
                while self.peek() == &Token::PathSep {
                    self.advance();
                    match self.advance() {
                        Token::Word(w) => {
                            path.push_str("::");
                            path.push_str(&w);
                            segments += 1;
                        }
                        other => {
                            return Err(self.err(format!("expected path segment, found {:?}", other)))
                        }
                    }
                }

                let args = if self.peek() == &Token::Lt {
                    self.advance();
                    let args = self.parse_list(Token::Gt)?;
                    if args.is_empty() {
                        return Err(self.err("empty generic argument list"));
                    }
                    args
                } else {
                    Vec::new()
                };

                if segments == 1 {
                    if let Some(var) = self.declared.iter().find(|v| v.name() == path) {
                        if !args.is_empty() {
                            return Err(
                                self.err(format!("type variable '{}' cannot take arguments", var))
                            );
                        }
                        return Ok(TypeRef::Var(var.clone()));
                    }
                }
                Ok(TypeRef::Named { path, args })
            }
            other => Err(self.err(format!("expected a type, found {:?}", other))),
        }
    }

    /// Comma-separated types up to `close`, trailing comma allowed.
    fn parse_list(&mut self, close: Token) -> Result<Vec<TypeRef>, StructuralError> {
        let mut items = Vec::new();
        loop {
            if self.peek() == &close {
                self.advance();
                return Ok(items);
            }
            items.push(self.parse_type()?);
            match self.advance() {
                Token::Comma => continue,
                t if t == close => return Ok(items),
                other => {
                    return Err(self.err(format!("expected ',' or {:?}, found {:?}", close, other)))
                }
            }
        }
    }
}
