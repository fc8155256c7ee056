//! Lowering of the resolved [`TypeGraph`] into the serializable model that
//! code emission consumes.
use serde::Serialize;
use tracing::debug;

use crate::custom::CustomMethod;
use crate::error::Result;
use crate::graph::{Constant, TokenConstant, TypeGraph, TypeId, TypeKind};
use crate::ir::ClassName;
use crate::method::{GeneratedMethod, MethodKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Model {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<ClassName>,
    /// In declaration order.
    pub declarations: Vec<Declaration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Declaration {
    pub kind: TypeKind,
    pub identity: String,
    pub name: ClassName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enclosing: Option<ClassName>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub extra: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub root: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub supertypes: Vec<ClassName>,
    /// Permitted subtypes of an interface.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subtypes: Vec<ClassName>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub constants: Vec<Constant>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tokens: Vec<TokenConstant>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<GeneratedMethod>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub custom_methods: Vec<CustomMethod>,
    /// Hoisted from the subtypes.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub common_methods: Vec<GeneratedMethod>,
}

pub fn lower(graph: &TypeGraph) -> Result<Model> {
    let declarations = graph
        .declaration_order()?
        .into_iter()
        .map(|id| lower_node(graph, id))
        .collect::<Vec<_>>();
    debug!(declarations = declarations.len(), "lowered type graph");
    Ok(Model {
        root: graph.root().map(|root| graph.node(root).name.clone()),
        declarations,
    })
}

fn lower_node(graph: &TypeGraph, id: TypeId) -> Declaration {
    let node = graph.node(id);
    let names = |ids: &indexmap::IndexSet<TypeId>| {
        ids.iter().map(|id| graph.node(*id).name.clone()).collect::<Vec<_>>()
    };
    Declaration {
        kind: node.kind,
        identity: node.identity.clone(),
        name: node.name.clone(),
        enclosing: node.name.enclosing(),
        extra: node.extra,
        root: graph.root() == Some(id),
        supertypes: names(node.supertypes()),
        subtypes: match node.kind {
            TypeKind::Supertype | TypeKind::ChildTypes => names(node.subtypes()),
            TypeKind::Regular | TypeKind::Tokens => Vec::new(),
        },
        constants: node.constants().to_vec(),
        tokens: node.tokens().to_vec(),
        // custom methods are listed separately, with their receivers
        methods: node.own_methods()
            .iter()
            .filter(|m| m.kind != MethodKind::Custom)
            .cloned()
            .collect(),
        custom_methods: node.custom_methods().to_vec(),
        common_methods: node.common_methods().to_vec(),
    }
}
