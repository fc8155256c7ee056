//! One generation run: grammar in, emission model out.
//!
//! Every run owns its graph, its names and its memoized values; nothing is
//! shared between runs, so independent grammars may be processed in parallel.
use std::path::Path;
use indexmap::IndexMap;
use serde::Deserialize;
use tracing::{debug, info, info_span};

use crate::custom::CustomMethodsConfig;
use crate::error::Result;
use crate::grammar::Grammar;
use crate::graph::{BuildOptions, TypeGraph};
use crate::ir::ClassName;
use crate::lower::{lower, Model};
use crate::naming::token::{default_token_name, TokenNameTable, TokenNamer};
use crate::naming::{DefaultNameGenerator, Names};
use crate::path_de;
use crate::resolve::resolve_common_methods;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct GenConfig {
    /// Package of all generated types.
    pub package: String,
    /// Replaces the default `Node{node}` class naming.
    pub type_name_pattern: Option<String>,
    /// When present, must name every token of the grammar.
    pub token_names: Option<TokenNameTable>,
    pub fallback_node_types: IndexMap<String, String>,
    /// Root node type, for grammars that do not mark one.
    pub root_node: Option<String>,
    pub custom_methods: CustomMethodsConfig,
    /// Qualified name of the annotation for optional single children;
    /// `java.util.Optional` is used when absent.
    pub nullable_annotation: Option<String>,
    /// Qualified name of the untyped tree node class.
    pub node_class: String,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            package: "org.example.treesitter".to_string(),
            type_name_pattern: None,
            token_names: None,
            fallback_node_types: IndexMap::new(),
            root_node: None,
            custom_methods: CustomMethodsConfig::default(),
            nullable_annotation: None,
            node_class: "io.github.treesitter.jtreesitter.Node".to_string(),
        }
    }
}

impl GenConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        path_de::from_slice_with_path(&bytes)
    }

    pub fn name_generator(&self) -> Result<DefaultNameGenerator> {
        let tokens = match &self.token_names {
            Some(table) => TokenNamer::from_table(table.clone(), true),
            None => TokenNamer::automatic(),
        };
        let generator = DefaultNameGenerator::new(tokens);
        match &self.type_name_pattern {
            Some(pattern) => Ok(generator.with_type_pattern(pattern)?),
            None => Ok(generator),
        }
    }
}

/// Builds, resolves and lowers the types of `grammar`.
pub fn generate(grammar: &Grammar, config: &GenConfig) -> Result<Model> {
    let graph = build_graph(grammar, config)?;
    lower(&graph)
}

/// Runs everything up to and including common-method resolution.
pub fn build_graph(grammar: &Grammar, config: &GenConfig) -> Result<TypeGraph> {
    let span = info_span!("generate", package = %config.package);
    let _guard = span.enter();

    let generator = config.name_generator()?;
    generator.tokens().validate(grammar.token_usages())?;
    let valid = grammar.validate(config.root_node.as_deref())?;

    let names = Names::new(&generator, grammar.named_types());
    let nullable = config.nullable_annotation.as_deref().map(ClassName::from_qualified);
    let non_empty = ClassName::new(config.package.as_str(), "NonEmpty");
    let node_class = ClassName::from_qualified(&config.node_class);
    let options = BuildOptions {
        package: &config.package,
        fallback_node_types: &config.fallback_node_types,
        custom_methods: &config.custom_methods,
        nullable_annotation: nullable.as_ref(),
        non_empty_annotation: &non_empty,
        node_class: &node_class,
    };
    let mut graph = TypeGraph::build(&valid, &names, &options)?;
    debug!(types = graph.len(), "resolving common methods");
    resolve_common_methods(&mut graph)?;
    info!(types = graph.len(), "generated type graph");
    Ok(graph)
}

/// Every token of the grammar as a token name table with default names,
/// as a starting point for an exhaustive table.
pub fn token_table_skeleton(grammar: &Grammar) -> TokenNameTable {
    let mut table = TokenNameTable::new();
    for (parent, field, token) in grammar.token_usages() {
        let tokens = table
            .entry(parent.to_string())
            .or_default()
            .entry(field.to_string())
            .or_default();
        let index = tokens.len();
        tokens.insert(token.to_string(), default_token_name(token, index));
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn config_defaults_and_kebab_case_keys() {
        let config: GenConfig = path_de::from_value_with_path(json!({
            "package": "com.example",
            "type-name-pattern": "Ts{node}",
            "root-node": "program",
            "nullable-annotation": "org.jspecify.annotations.Nullable",
        })).unwrap();
        assert_eq!(config.package, "com.example");
        assert_eq!(config.root_node.as_deref(), Some("program"));
        assert_eq!(config.node_class, GenConfig::default().node_class);

        let error = path_de::from_value_with_path::<GenConfig>(json!({"packages": "x"})).unwrap_err();
        assert!(error.to_string().contains("unknown field `packages`"), "{error}");
    }

    #[test]
    fn invalid_pattern_fails_the_run() {
        let config = GenConfig { type_name_pattern: Some("Ts{name}".into()), ..GenConfig::default() };
        let error = generate(&Grammar::default(), &config).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Invalid name pattern: Unknown placeholder: name (pattern: \"Ts{name}\")",
        );
    }

    #[test]
    fn skeleton_lists_every_token() {
        let grammar = Grammar::from_value(json!([
            {"type": "binary", "named": true, "fields": {
                "operator": {"multiple": false, "required": true, "types": [
                    {"type": "+", "named": false},
                    {"type": "==", "named": false},
                ]},
            }},
        ])).unwrap();
        let table = token_table_skeleton(&grammar);
        assert_eq!(serde_json::to_value(&table).unwrap(), json!({
            "binary": {"operator": {"+": "PLUS_SIGN", "==": "TOKEN_1"}},
        }));
    }
}
