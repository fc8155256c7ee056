//! User-supplied methods added to generated node types.
//!
//! ```json
//! {"node-types": {"expression": [
//!     {"name": "text", "return-type": "java.lang.String", "receiver": "com.example.Util#text"}
//! ]}}
//! ```
//!
//! Types are written as Java source types and parsed with [`TypeRef::parse`].
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{GenError, Result};
use crate::ir::{ClassName, TypeRef};
use crate::method::{GeneratedMethod, MethodKind, Param, ReturnType, Signature, TypeVarDecl};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomMethodsConfig {
    /// Grammar type name → methods.
    #[serde(rename = "node-types", default)]
    pub node_types: IndexMap<String, Vec<MethodConfig>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct MethodConfig {
    pub name: String,
    #[serde(default)]
    pub type_variables: Vec<TypeVariableConfig>,
    #[serde(default)]
    pub parameters: IndexMap<String, String>,
    /// `void` when absent.
    #[serde(default)]
    pub return_type: Option<String>,
    #[serde(default)]
    pub javadoc: Option<String>,
    /// `<qualified type>#<method name>`
    #[serde(default)]
    pub receiver: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeVariableConfig {
    pub name: String,
    #[serde(default)]
    pub bounds: Vec<String>,
}

/// The method the generated code delegates to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receiver {
    #[serde(rename = "type")]
    pub class: ClassName,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomMethod {
    #[serde(flatten)]
    pub method: GeneratedMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub javadoc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver: Option<Receiver>,
}

impl CustomMethodsConfig {
    pub fn is_empty(&self) -> bool {
        self.node_types.is_empty()
    }

    /// Methods configured for `type_name`, in configuration order.
    pub fn for_node_type(&self, type_name: &str) -> Result<Vec<CustomMethod>> {
        self.node_types
            .get(type_name)
            .map(|methods| methods.iter().map(MethodConfig::to_custom_method).collect())
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    /// Configured node types which are not named types of the grammar.
    pub fn unknown_node_types<'a>(&'a self, known: &'a [String]) -> impl Iterator<Item = &'a str> + 'a {
        self.node_types
            .keys()
            .filter(move |name| !known.contains(name))
            .map(String::as_str)
    }
}

impl MethodConfig {
    pub fn to_custom_method(&self) -> Result<CustomMethod> {
        let type_vars = self.type_variables
            .iter()
            .map(|var| {
                let bounds = var.bounds.iter().map(|b| TypeRef::parse(b)).collect::<Result<Vec<_>>>()?;
                Ok(TypeVarDecl { name: var.name.clone(), bounds })
            })
            .collect::<Result<Vec<_>>>()?;
        let params = self.parameters
            .iter()
            .map(|(name, ty)| Ok(Param { name: name.clone(), ty: TypeRef::parse(ty)? }))
            .collect::<Result<Vec<_>>>()?;
        let return_type = match self.return_type.as_deref() {
            None | Some("void") => None,
            Some(ty) => Some(ReturnType::new(TypeRef::parse(ty)?)),
        };
        let receiver = self.receiver.as_deref().map(parse_receiver).transpose()?;

        let signature = Signature { name: self.name.clone(), type_vars, params };
        Ok(CustomMethod {
            method: GeneratedMethod::new(MethodKind::Custom, signature, return_type),
            javadoc: self.javadoc.clone(),
            receiver,
        })
    }
}

fn parse_receiver(receiver: &str) -> Result<Receiver> {
    let Some((class, method)) = receiver.split_once('#') else {
        return Err(GenError::InvalidGrammar(format!("Missing '#': {receiver}")))
    };
    if class.is_empty() || method.is_empty() {
        return Err(GenError::InvalidGrammar(format!("Invalid receiver: {receiver}")))
    }
    Ok(Receiver { class: ClassName::from_qualified(class), method: method.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::path_de;

    fn config(value: serde_json::Value) -> CustomMethodsConfig {
        path_de::from_value_with_path(value).unwrap()
    }

    #[test]
    fn builds_custom_methods() {
        let config = config(json!({"node-types": {"expression": [
            {
                "name": "find",
                "type-variables": [{"name": "T", "bounds": ["java.lang.CharSequence"]}],
                "parameters": {"type": "java.lang.Class<T>", "limit": "int"},
                "return-type": "java.util.List<? extends T>",
                "receiver": "com.example.Util#find",
            },
            {"name": "reset"},
        ]}}));
        let methods = config.for_node_type("expression").unwrap();
        assert_eq!(methods.len(), 2);

        let find = &methods[0];
        assert_eq!(find.method.kind, MethodKind::Custom);
        assert_eq!(
            find.method.to_string(),
            "java.util.List<? extends T> <T> find(java.lang.Class<T> type, int limit)",
        );
        assert_eq!(find.method.signature.type_vars[0].bounds, vec![TypeRef::parse("java.lang.CharSequence").unwrap()]);
        assert_eq!(
            find.receiver,
            Some(Receiver { class: ClassName::from_qualified("com.example.Util"), method: "find".into() }),
        );
        assert_eq!(methods[1].method.to_string(), "void reset()");
        assert!(config.for_node_type("statement").unwrap().is_empty());
    }

    #[test]
    fn rejects_bad_types_and_receivers() {
        let bad_type = config(json!({"node-types": {"a": [{"name": "m", "return-type": "java.util.List<"}]}}));
        assert!(matches!(bad_type.for_node_type("a"), Err(GenError::InvalidTypeString { .. })));

        let bad_receiver = config(json!({"node-types": {"a": [{"name": "m", "receiver": "com.example.Util"}]}}));
        assert_eq!(
            bad_receiver.for_node_type("a").unwrap_err().to_string(),
            "Missing '#': com.example.Util",
        );
    }

    #[test]
    fn lists_unknown_node_types() {
        let config = config(json!({"node-types": {"a": [], "b": []}}));
        let known = vec!["a".to_string()];
        assert_eq!(config.unknown_node_types(&known).collect::<Vec<_>>(), vec!["b"]);
    }
}
