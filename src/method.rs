//! Methods generated on node classes and interfaces.
//!
//! A method is identified for hoisting by `(kind, signature)`; the return
//! type only matters once a group of candidates has been found.
use std::fmt;
use std::sync::Arc;
use indexmap::IndexMap;
use serde::Serialize;

use crate::ir::{ClassName, TypeRef};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "name", rename_all = "kebab-case")]
pub enum MethodKind {
    /// User-supplied method, see `custom.rs`.
    Custom,
    Children { multiple: bool, required: bool },
    Field { field: String, multiple: bool, required: bool },
    UnnamedChildren,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TypeVarDecl {
    pub name: String,
    pub bounds: Vec<TypeRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
}

/// Name, type variables and parameters; order and names are significant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Signature {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub type_vars: Vec<TypeVarDecl>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Param>,
}

type ResolveFn = dyn Fn(&ClassName) -> Option<Vec<ClassName>> + Send + Sync;

/// Lazily yields the ordered ancestors of a class; `None` if the class is
/// unknown to this resolver. Only consulted while computing a LUB.
#[derive(Clone, Default)]
pub struct SupertypesResolver(Option<Arc<ResolveFn>>);

#[derive(Debug, Clone, Serialize)]
pub struct ReturnType {
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(skip)]
    pub resolver: SupertypesResolver,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct GeneratedMethod {
    pub kind: MethodKind,
    pub signature: Signature,
    /// `None` for `void`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_type: Option<ReturnType>,
}

/// Grouping key for hoisting.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodKey {
    pub signature: Signature,
    pub kind: MethodKind,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Signature {
    pub fn getter(name: impl Into<String>) -> Self {
        Self { name: name.into(), type_vars: Vec::new(), params: Vec::new() }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.type_vars.is_empty() {
            let vars = self.type_vars.iter().map(|v| v.name.as_str()).collect::<Vec<_>>();
            write!(f, "<{}> ", vars.join(", "))?;
        }
        let params = self.params.iter()
            .map(|p| format!("{} {}", p.ty, p.name))
            .collect::<Vec<_>>();
        write!(f, "{}({})", self.name, params.join(", "))
    }
}

impl SupertypesResolver {
    pub fn empty() -> Self {
        Self(None)
    }
    pub fn new<F>(resolve: F) -> Self
    where
        F: Fn(&ClassName) -> Option<Vec<ClassName>> + Send + Sync + 'static,
    {
        Self(Some(Arc::new(resolve)))
    }
    pub fn from_map(map: IndexMap<ClassName, Vec<ClassName>>) -> Self {
        Self::new(move |class| map.get(class).cloned())
    }
    /// First resolver that knows a class wins.
    pub fn collection(resolvers: Vec<SupertypesResolver>) -> Self {
        let resolvers = resolvers.into_iter().filter(|r| !r.is_empty()).collect::<Vec<_>>();
        match resolvers.len() {
            0 => Self::empty(),
            1 => resolvers.into_iter().next().unwrap_or_default(),
            _ => Self::new(move |class| resolvers.iter().find_map(|r| r.supertypes(class))),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
    pub fn supertypes(&self, class: &ClassName) -> Option<Vec<ClassName>> {
        self.0.as_ref().and_then(|resolve| resolve(class))
    }
}

impl fmt::Debug for SupertypesResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => write!(f, "SupertypesResolver(..)"),
            None => write!(f, "SupertypesResolver(empty)"),
        }
    }
}

impl ReturnType {
    pub fn new(ty: TypeRef) -> Self {
        Self { ty, resolver: SupertypesResolver::empty() }
    }
    pub fn with_resolver(ty: TypeRef, resolver: SupertypesResolver) -> Self {
        Self { ty, resolver }
    }
}

// resolvers are transient helpers and never part of a method's identity
impl PartialEq for ReturnType {
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty
    }
}

impl Eq for ReturnType {}

impl GeneratedMethod {
    pub fn new(kind: MethodKind, signature: Signature, return_type: Option<ReturnType>) -> Self {
        Self { kind, signature, return_type }
    }
    pub fn key(&self) -> MethodKey {
        MethodKey { signature: self.signature.clone(), kind: self.kind.clone() }
    }
}

impl fmt::Display for GeneratedMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.return_type {
            Some(r) => write!(f, "{} {}", r.ty, self.signature),
            None => write!(f, "void {}", self.signature),
        }
    }
}
