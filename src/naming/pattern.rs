//! `{placeholder}` name patterns, e.g. `Ts{node}` → `TsFunctionDeclaration`.
use std::sync::Arc;
use indexmap::IndexMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (pattern: {pattern:?})")]
pub struct PatternError {
    pub pattern: String,
    pub message: String,
}

type Resolve<D> = Arc<dyn Fn(&D) -> String + Send + Sync>;

/// The placeholders a pattern may use, by name.
pub struct Placeholders<D> {
    resolvers: IndexMap<String, Resolve<D>>,
}

enum Piece<D> {
    Literal(String),
    Placeholder(Resolve<D>),
}

/// A parsed pattern; apply it to any number of values.
pub struct NamePattern<D> {
    source: String,
    pieces: Vec<Piece<D>>,
}

impl<D> Placeholders<D> {
    pub fn new() -> Self {
        Self { resolvers: IndexMap::new() }
    }
    pub fn with(mut self, name: &str, resolve: impl Fn(&D) -> String + Send + Sync + 'static) -> Self {
        self.resolvers.insert(name.to_string(), Arc::new(resolve));
        self
    }

    pub fn parse(&self, pattern: &str) -> Result<NamePattern<D>, PatternError> {
        let error = |message: String| PatternError { pattern: pattern.to_string(), message };
        if self.resolvers.is_empty() {
            return Err(error("Must specify at least one placeholder".to_string()))
        }
        if pattern.is_empty() {
            return Err(error("Pattern string must not be empty".to_string()))
        }

        let mut pieces = Vec::new();
        let mut rest = pattern;
        while let Some(start) = rest.find('{') {
            let literal = &rest[..start];
            if literal.contains('}') {
                return Err(error("Unpaired closing '}'".to_string()))
            }
            let after_start = &rest[start + 1..];
            let Some(end) = after_start.find('}') else {
                return Err(error("Missing closing '}'".to_string()))
            };
            let name = &after_start[..end];
            if name.contains('{') {
                return Err(error("Unexpected '{' in placeholder name".to_string()))
            }
            if name.is_empty() {
                return Err(error("Placeholder name cannot be empty".to_string()))
            }
            let Some(resolve) = self.resolvers.get(name) else {
                return Err(error(format!("Unknown placeholder: {name}")))
            };
            if !literal.is_empty() {
                pieces.push(Piece::Literal(literal.to_string()));
            }
            pieces.push(Piece::Placeholder(resolve.clone()));
            rest = &after_start[end + 1..];
        }
        if rest.contains('}') {
            return Err(error("Unpaired closing '}'".to_string()))
        }
        if !rest.is_empty() {
            pieces.push(Piece::Literal(rest.to_string()));
        }
        Ok(NamePattern { source: pattern.to_string(), pieces })
    }
}

impl<D> Default for Placeholders<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> NamePattern<D> {
    pub fn apply(&self, data: &D) -> String {
        let mut name = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Literal(literal) => name.push_str(literal),
                Piece::Placeholder(resolve) => name.push_str(&resolve(data)),
            }
        }
        name
    }
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl<D> std::fmt::Debug for NamePattern<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("NamePattern").field(&self.source).finish()
    }
}
