//! Error taxonomy for a generation run.
//!
//! Every configuration problem fails the whole run; resolution gaps (no
//! common return type) are not errors and never show up here.
use thiserror::Error;

use crate::naming::pattern::PatternError;

pub type Result<T, E = GenError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum GenError {
    #[error("Invalid name pattern: {0}")]
    InvalidPattern(#[from] PatternError),

    /// One entry per `(parent, field, token)` triple the token table misses.
    #[error("{}", render_unmapped(.0))]
    TokensNotMapped(Vec<UnmappedToken>),

    #[error("Unknown type name: {name} (referenced by '{referenced_by}')")]
    UnknownType { referenced_by: String, name: String },

    #[error("Duplicate node type name: {0}")]
    DuplicateType(String),

    #[error("Duplicate generated type name '{name}' for '{first}' and '{second}'")]
    DuplicateGeneratedName { name: String, first: String, second: String },

    #[error("Invalid generated name '{name}': {message}")]
    InvalidGeneratedName { name: String, message: String },

    #[error("{0}")]
    InvalidGrammar(String),

    #[error("Common methods have already been set for '{0}'")]
    CommonMethodsAlreadySet(String),

    #[error("Duplicate method {method} in '{owner}'")]
    DuplicateMethod { owner: String, method: String },

    #[error("Element '{from}' references unknown element '{to}'")]
    UnknownReference { from: String, to: String },

    #[error("Invalid type string {input:?}: {message}\n\t{input}\n\t{}^", caret_indent(.position))]
    InvalidTypeString { input: String, message: String, position: usize },

    #[error("at JSON path {path} → {message}")]
    Deserialize { path: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnmappedToken {
    pub parent: String,
    pub field: String,
    pub token: String,
}

impl std::fmt::Display for UnmappedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Token type not mapped: type = {}, field = {}, token = {}",
            self.parent, self.field, self.token
        )
    }
}

fn caret_indent(position: &usize) -> String {
    " ".repeat(*position)
}

fn render_unmapped(missing: &[UnmappedToken]) -> String {
    missing
        .iter()
        .map(|x| x.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
