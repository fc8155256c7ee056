//! Deterministic names for everything generated from a grammar.
//!
//! [`NameGenerator`] is the customization seam; [`DefaultNameGenerator`]
//! produces `NodeFooBar` classes, `FIELD_X` constants and `getFieldX`
//! getters. [`Names`] wraps a generator for one run: it checks every name is
//! a usable Java identifier and keeps the collision-checked class name table.
pub mod case;
pub mod pattern;
pub mod token;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{GenError, Result};
use crate::memo::Memoized;
use pattern::{NamePattern, PatternError, Placeholders};
use token::{TokenNamer, FALLBACK_KEY};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

pub trait NameGenerator: Send + Sync {
    /// Class name for a named node type.
    fn java_type_name(&self, type_name: &str) -> String;
    fn type_name_constant(&self, type_name: &str) -> String;
    fn type_id_constant(&self, type_name: &str) -> String;

    /// Interface implemented by all possible child types.
    fn children_types_name(&self, parent: &str, child_types: &[String]) -> String;
    fn children_token_type_name(&self, parent: &str, tokens: &[String]) -> String;
    fn children_token_name(&self, parent: &str, token: &str, index: usize) -> Result<String>;
    fn children_getter_name(&self, parent: &str, child_types: &[String], multiple: bool, required: bool) -> String;

    fn field_name_constant(&self, parent: &str, field: &str) -> String;
    fn field_id_constant(&self, parent: &str, field: &str) -> String;
    fn field_types_name(&self, parent: &str, field: &str, field_types: &[String]) -> String;
    fn field_token_type_name(&self, parent: &str, field: &str, tokens: &[String]) -> String;
    fn field_token_name(&self, parent: &str, field: &str, token: &str, index: usize) -> Result<String>;
    fn field_getter_name(&self, parent: &str, field: &str, field_types: &[String], multiple: bool, required: bool) -> String;

    /// Getter for non-named children, if one should be generated.
    fn unnamed_children_getter(&self, parent: &str, has_named_children: bool, has_fields: bool) -> Option<String>;
}

#[derive(Debug)]
pub struct DefaultNameGenerator {
    tokens: TokenNamer,
    type_pattern: Option<NamePattern<String>>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

/// Placeholders for custom class name patterns: `{node}` is the UpperCamel
/// form of the grammar type name.
pub fn type_name_placeholders() -> Placeholders<String> {
    Placeholders::new().with("node", |type_name: &String| case::type_name_to_upper_camel(type_name))
}

impl DefaultNameGenerator {
    pub fn new(tokens: TokenNamer) -> Self {
        Self { tokens, type_pattern: None }
    }
    /// Replaces `Node{node}` class naming with `pattern`, e.g. `Ts{node}`.
    pub fn with_type_pattern(mut self, pattern: &str) -> std::result::Result<Self, PatternError> {
        self.type_pattern = Some(type_name_placeholders().parse(pattern)?);
        Ok(self)
    }
    pub fn tokens(&self) -> &TokenNamer {
        &self.tokens
    }
}

impl NameGenerator for DefaultNameGenerator {
    fn java_type_name(&self, type_name: &str) -> String {
        match &self.type_pattern {
            Some(pattern) => pattern.apply(&type_name.to_string()),
            None => format!("Node{}", case::type_name_to_upper_camel(type_name)),
        }
    }
    fn type_name_constant(&self, _type_name: &str) -> String {
        "TYPE_NAME".to_string()
    }
    fn type_id_constant(&self, _type_name: &str) -> String {
        "TYPE_ID".to_string()
    }

    fn children_types_name(&self, _parent: &str, _child_types: &[String]) -> String {
        "Child".to_string()
    }
    fn children_token_type_name(&self, parent: &str, tokens: &[String]) -> String {
        format!("{}TokenType", self.children_types_name(parent, tokens))
    }
    fn children_token_name(&self, parent: &str, token: &str, index: usize) -> Result<String> {
        self.tokens.name(parent, FALLBACK_KEY, token, index)
    }
    fn children_getter_name(&self, _parent: &str, _child_types: &[String], multiple: bool, _required: bool) -> String {
        let name = if multiple { "getChildren" } else { "getChild" };
        name.to_string()
    }

    fn field_name_constant(&self, _parent: &str, field: &str) -> String {
        format!("FIELD_{}", case::constant_name(field))
    }
    fn field_id_constant(&self, _parent: &str, field: &str) -> String {
        format!("FIELD_{}_ID", case::constant_name(field))
    }
    fn field_types_name(&self, _parent: &str, field: &str, _field_types: &[String]) -> String {
        format!("Field{}", case::upper_first(&case::snake_to_camel(field)))
    }
    fn field_token_type_name(&self, _parent: &str, field: &str, _tokens: &[String]) -> String {
        format!("FieldToken{}", case::upper_first(&case::snake_to_camel(field)))
    }
    fn field_token_name(&self, parent: &str, field: &str, token: &str, index: usize) -> Result<String> {
        self.tokens.name(parent, field, token, index)
    }
    fn field_getter_name(&self, _parent: &str, field: &str, _field_types: &[String], _multiple: bool, _required: bool) -> String {
        format!("getField{}", case::upper_first(&case::snake_to_camel(field)))
    }

    fn unnamed_children_getter(&self, _parent: &str, _has_named_children: bool, has_fields: bool) -> Option<String> {
        // with fields present, relevant unnamed children are usually fields already
        if has_fields { None } else { Some("getUnnamedChildren".to_string()) }
    }
}

// ---- Per-run naming ----

#[derive(Debug, Clone, PartialEq, Eq)]
struct NameClash {
    name: String,
    first: String,
    second: String,
}

type ClassNameTable = std::result::Result<IndexMap<String, String>, NameClash>;
type ClassNameDelegate<'g> = Box<dyn Fn() -> ClassNameTable + Send + Sync + 'g>;

/// Naming for one generation run.
pub struct Names<'g> {
    generator: &'g dyn NameGenerator,
    class_names: Memoized<ClassNameTable, ClassNameDelegate<'g>>,
}

impl<'g> Names<'g> {
    /// `named_types` are all named grammar types that become classes.
    pub fn new(generator: &'g dyn NameGenerator, named_types: Vec<String>) -> Self {
        let delegate: ClassNameDelegate<'g> = Box::new(move || {
            let mut by_class = IndexMap::<String, String>::new();
            let mut table = IndexMap::new();
            for type_name in &named_types {
                let class_name = generator.java_type_name(type_name);
                if let Some(first) = by_class.insert(class_name.clone(), type_name.clone()) {
                    return Err(NameClash { name: class_name, first, second: type_name.clone() })
                }
                table.insert(type_name.clone(), class_name);
            }
            Ok(table)
        });
        Self { generator, class_names: Memoized::new(delegate) }
    }

    pub fn generator(&self) -> &dyn NameGenerator {
        self.generator
    }

    /// Validated, collision-free class name of a named grammar type.
    pub fn class_name(&self, type_name: &str) -> Result<String> {
        let table = self.class_names.get().as_ref().map_err(|clash| GenError::DuplicateGeneratedName {
            name: clash.name.clone(),
            first: clash.first.clone(),
            second: clash.second.clone(),
        })?;
        let name = table.get(type_name).ok_or_else(|| GenError::UnknownType {
            referenced_by: "name generator".to_string(),
            name: type_name.to_string(),
        })?;
        check_type_name(name)?;
        Ok(name.clone())
    }

    pub fn type_name(&self, name: String) -> Result<String> {
        check_type_name(&name)?;
        Ok(name)
    }

    pub fn member_name(&self, name: String) -> Result<String> {
        check_member_name(&name)?;
        Ok(name)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

const JAVA_KEYWORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "final", "finally", "float",
    "for", "goto", "if", "implements", "import", "instanceof", "int", "interface", "long", "native",
    "new", "package", "private", "protected", "public", "return", "short", "static", "strictfp",
    "super", "switch", "synchronized", "this", "throw", "throws", "transient", "try", "void",
    "volatile", "while", "true", "false", "null", "_",
];

fn check_member_name(name: &str) -> Result<()> {
    static IDENTIFIER: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^[\p{L}_$][\p{L}\p{N}_$]*$").expect("valid regex"));
    let invalid = |message: &str| GenError::InvalidGeneratedName {
        name: name.to_string(),
        message: message.to_string(),
    };
    if name.is_empty() {
        return Err(invalid("name is empty"))
    }
    if !IDENTIFIER.is_match(name) {
        return Err(invalid("not a Java identifier"))
    }
    if JAVA_KEYWORDS.contains(&name) {
        return Err(invalid("reserved Java keyword"))
    }
    Ok(())
}

fn check_type_name(name: &str) -> Result<()> {
    check_member_name(name)?;
    if matches!(name, "var" | "record" | "yield" | "sealed" | "permits") {
        return Err(GenError::InvalidGeneratedName {
            name: name.to_string(),
            message: "restricted identifier cannot name a type".to_string(),
        })
    }
    Ok(())
}
