//! The tree-sitter `node-types.json` grammar description.
//!
//! [`Grammar::validate`] performs the structural checks the graph builder
//! relies on; everything else about the file is taken as given.
use std::path::Path;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GenError, Result};
use crate::naming::token::FALLBACK_KEY;
use crate::path_de;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// One entry of the `node-types.json` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeTypeSpec {
    #[serde(rename = "type")]
    pub type_name: String,
    pub named: bool,
    #[serde(default)]
    pub extra: bool,
    #[serde(default)]
    pub root: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<IndexMap<String, ChildSpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<ChildSpec>,
    /// Present only for supertypes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtypes: Option<Vec<TypeRefSpec>>,
}

/// A field or the unnamed children of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildSpec {
    pub multiple: bool,
    pub required: bool,
    pub types: Vec<TypeRefSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeRefSpec {
    #[serde(rename = "type")]
    pub type_name: String,
    pub named: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grammar {
    pub node_types: Vec<NodeTypeSpec>,
}

/// A grammar that passed [`Grammar::validate`].
#[derive(Debug, Clone)]
pub struct ValidGrammar<'a> {
    /// Named, non-supertype node types in input order.
    pub regular: Vec<&'a NodeTypeSpec>,
    /// Named supertypes in input order.
    pub supertypes: Vec<&'a NodeTypeSpec>,
    pub root: Option<String>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl NodeTypeSpec {
    pub fn is_supertype(&self) -> bool {
        self.subtypes.is_some()
    }
    pub fn has_fields(&self) -> bool {
        self.fields.as_ref().is_some_and(|fields| !fields.is_empty())
    }
    pub fn fields(&self) -> impl Iterator<Item = (&String, &ChildSpec)> {
        self.fields.iter().flat_map(|fields| fields.iter())
    }
}

impl ChildSpec {
    pub fn named_types(&self) -> impl Iterator<Item = &str> {
        self.types.iter().filter(|t| t.named).map(|t| t.type_name.as_str())
    }
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.types.iter().filter(|t| !t.named).map(|t| t.type_name.as_str())
    }
}

impl Grammar {
    pub fn new(node_types: Vec<NodeTypeSpec>) -> Self {
        Self { node_types }
    }
    pub fn parse(source: &str) -> Result<Self> {
        Ok(Self::new(path_de::from_str_with_path(source)?))
    }
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        Ok(Self::new(path_de::from_value_with_path(value)?))
    }
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        let grammar = Self::new(path_de::from_slice_with_path(&bytes)?);
        debug!(path = %path.as_ref().display(), node_types = grammar.node_types.len(), "loaded grammar");
        Ok(grammar)
    }

    /// Names of all named node types, supertypes included, in input order.
    pub fn named_types(&self) -> Vec<String> {
        self.node_types.iter()
            .filter(|n| n.named)
            .map(|n| n.type_name.clone())
            .collect()
    }

    /// Every `(parent, field, token)` triple the grammar mentions. Tokens of
    /// unnamed children use the fallback key as field.
    pub fn token_usages(&self) -> IndexSet<(&str, &str, &str)> {
        let mut usages = IndexSet::new();
        for node in self.node_types.iter().filter(|n| n.named) {
            let parent = node.type_name.as_str();
            for (field, spec) in node.fields() {
                usages.extend(spec.tokens().map(|token| (parent, field.as_str(), token)));
            }
            if let Some(children) = &node.children {
                usages.extend(children.tokens().map(|token| (parent, FALLBACK_KEY, token)));
            }
        }
        usages
    }

    /// Structural checks, and root node selection. `custom_root` is the
    /// root requested by configuration, if any.
    pub fn validate(&self, custom_root: Option<&str>) -> Result<ValidGrammar<'_>> {
        let invalid = |message: String| Err(GenError::InvalidGrammar(message));
        let mut all_type_names = IndexSet::new();
        let mut regular = Vec::new();
        let mut supertypes = Vec::new();
        let mut json_root: Option<&str> = None;

        for node in &self.node_types {
            let name = node.type_name.as_str();
            if !node.named {
                if node.subtypes.is_some() {
                    return invalid(format!("Non-named node type '{name}' should not have subtypes"))
                }
                if node.children.is_some() {
                    return invalid(format!("Non-named node type '{name}' should not have children"))
                }
                if node.has_fields() {
                    return invalid(format!("Non-named node type '{name}' should not have fields"))
                }
                if node.root {
                    return invalid(format!("Non-named node type '{name}' should not be root node"))
                }
                continue
            }
            if !all_type_names.insert(name) {
                return Err(GenError::DuplicateType(name.to_string()))
            }
            if node.root {
                if custom_root.is_some() {
                    return invalid(format!(
                        "Should not explicitly specify root node type when 'node-types.json' already specifies root node ('{name}')"
                    ))
                }
                if let Some(previous) = json_root {
                    return invalid(format!(
                        "Only a single root node type is supported; found node types: {previous}, {name}"
                    ))
                }
                json_root = Some(name);
            }
            match &node.subtypes {
                Some(subtypes) => {
                    if node.children.is_some() {
                        return invalid(format!("Supertype '{name}' should not have children"))
                    }
                    if node.has_fields() {
                        return invalid(format!("Supertype '{name}' should not have fields"))
                    }
                    if subtypes.len() < 2 {
                        return invalid(format!("Supertype '{name}' has less than 2 subtypes"))
                    }
                    supertypes.push(node);
                }
                None => regular.push(node),
            }
        }

        let root = custom_root.or(json_root).map(str::to_string);
        if let Some(custom_root) = custom_root {
            if !all_type_names.contains(custom_root) {
                return invalid(format!("Root node type '{custom_root}' not found"))
            }
        }
        debug!(
            regular = regular.len(),
            supertypes = supertypes.len(),
            root = root.as_deref().unwrap_or("-"),
            "validated grammar",
        );
        Ok(ValidGrammar { regular, supertypes, root })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn grammar(value: serde_json::Value) -> Grammar {
        Grammar::from_value(value).unwrap()
    }

    fn validation_error(value: serde_json::Value, custom_root: Option<&str>) -> String {
        grammar(value).validate(custom_root).unwrap_err().to_string()
    }

    #[test]
    fn parses_node_types() {
        let grammar = grammar(json!([
            {"type": "expression", "named": true, "subtypes": [
                {"type": "identifier", "named": true},
                {"type": "binary", "named": true},
            ]},
            {"type": "binary", "named": true, "fields": {
                "operator": {"multiple": false, "required": true, "types": [
                    {"type": "+", "named": false},
                    {"type": "-", "named": false},
                ]},
                "left": {"multiple": false, "required": true, "types": [{"type": "expression", "named": true}]},
            }},
            {"type": "identifier", "named": true, "extra": true},
            {"type": "+", "named": false},
            {"type": "-", "named": false},
        ]));
        assert_eq!(grammar.named_types(), vec!["expression", "binary", "identifier"]);
        assert!(grammar.node_types[0].is_supertype());
        assert!(grammar.node_types[2].extra);
        let usages = grammar.token_usages().into_iter().collect::<Vec<_>>();
        assert_eq!(usages, vec![("binary", "operator", "+"), ("binary", "operator", "-")]);

        let valid = grammar.validate(None).unwrap();
        let names = |nodes: &[&NodeTypeSpec]| nodes.iter().map(|n| n.type_name.clone()).collect::<Vec<_>>();
        assert_eq!(names(&valid.regular), vec!["binary", "identifier"]);
        assert_eq!(names(&valid.supertypes), vec!["expression"]);
        assert_eq!(valid.root, None);
    }

    #[test]
    fn reports_malformed_json_with_path() {
        let error = Grammar::parse(r#"[{"type": "a", "named": true}, {"type": "b"}]"#).unwrap_err();
        assert!(error.to_string().starts_with("at JSON path [1]"), "{error}");
    }

    #[test]
    fn rejects_structure_on_non_named_types() {
        let cases = [
            (json!({"type": "+", "named": false, "subtypes": []}), "Non-named node type '+' should not have subtypes"),
            (
                json!({"type": "+", "named": false, "children": {"multiple": false, "required": false, "types": []}}),
                "Non-named node type '+' should not have children",
            ),
            (
                json!({"type": "+", "named": false, "fields": {"x": {"multiple": false, "required": false, "types": []}}}),
                "Non-named node type '+' should not have fields",
            ),
            (json!({"type": "+", "named": false, "root": true}), "Non-named node type '+' should not be root node"),
        ];
        for (node, expected) in cases {
            assert_eq!(validation_error(json!([node]), None), expected);
        }
        // empty field maps are fine
        assert!(grammar(json!([{"type": "+", "named": false, "fields": {}}])).validate(None).is_ok());
    }

    #[test]
    fn rejects_invalid_supertypes() {
        let children = json!({"multiple": false, "required": false, "types": [{"type": "a", "named": true}]});
        let two = json!([{"type": "a", "named": true}, {"type": "b", "named": true}]);
        assert_eq!(
            validation_error(json!([{"type": "s", "named": true, "subtypes": two, "children": children}]), None),
            "Supertype 's' should not have children",
        );
        assert_eq!(
            validation_error(json!([{"type": "s", "named": true, "subtypes": two, "fields": {"f": children}}]), None),
            "Supertype 's' should not have fields",
        );
        assert_eq!(
            validation_error(json!([{"type": "s", "named": true, "subtypes": [{"type": "a", "named": true}]}]), None),
            "Supertype 's' has less than 2 subtypes",
        );
    }

    #[test]
    fn rejects_duplicates() {
        assert_eq!(
            validation_error(json!([{"type": "a", "named": true}, {"type": "a", "named": true}]), None),
            "Duplicate node type name: a",
        );
        // non-named types may share names with anything
        let value = json!([{"type": "a", "named": true}, {"type": "a", "named": false}, {"type": "a", "named": false}]);
        assert!(grammar(value).validate(None).is_ok());
    }

    #[test]
    fn selects_root_node() {
        let value = json!([{"type": "a", "named": true, "root": true}, {"type": "b", "named": true}]);
        assert_eq!(grammar(value.clone()).validate(None).unwrap().root.as_deref(), Some("a"));
        assert_eq!(
            validation_error(value, Some("b")),
            "Should not explicitly specify root node type when 'node-types.json' already specifies root node ('a')",
        );

        let value = json!([{"type": "a", "named": true}, {"type": "b", "named": true}]);
        assert_eq!(grammar(value.clone()).validate(Some("b")).unwrap().root.as_deref(), Some("b"));
        assert_eq!(validation_error(value, Some("c")), "Root node type 'c' not found");

        let value = json!([{"type": "a", "named": true, "root": true}, {"type": "b", "named": true, "root": true}]);
        assert_eq!(
            validation_error(value, None),
            "Only a single root node type is supported; found node types: a, b",
        );
    }
}
