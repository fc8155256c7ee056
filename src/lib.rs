//! Resolves tree-sitter `node-types.json` grammars into a typed class
//! hierarchy: interfaces for supertypes and multi-type children, accessors
//! with precise return types, and methods hoisted into an interface when
//! every implementation shares them.
pub mod custom;
pub mod error;
pub mod grammar;
pub mod graph;
pub mod ir;
pub mod lower;
pub mod lub;
pub mod memo;
pub mod method;
pub mod naming;
pub mod path_de;
pub mod pipeline;
pub mod resolve;
pub mod topo;

pub use error::{GenError, Result};
pub use grammar::Grammar;
pub use lower::Model;
pub use pipeline::{generate, GenConfig};
