//! The graph of generated types.
//!
//! [`TypeGraph`] is an arena: it owns every [`TypeNode`], and supertype and
//! subtype edges are plain [`TypeId`] sets in both directions. It is built
//! once per run by [`TypeGraph::build`], then only grows common methods.
use std::fmt;
use std::sync::Arc;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use tracing::{debug, trace};

use crate::custom::{CustomMethod, CustomMethodsConfig};
use crate::error::{GenError, Result};
use crate::grammar::{ChildSpec, NodeTypeSpec, ValidGrammar};
use crate::ir::{ClassName, TypeRef};
use crate::memo::Memoized;
use crate::method::{GeneratedMethod, MethodKind, ReturnType, Signature, SupertypesResolver};
use crate::naming::Names;
use crate::topo::{topo_sort, UnknownReferences};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TypeKind {
    /// Class for a named, concrete node type.
    Regular,
    /// Interface for a grammar supertype.
    Supertype,
    /// Interface implemented by every possible type of a field or of the
    /// unnamed children.
    ChildTypes,
    /// Class for the anonymous tokens of a field or of the unnamed children.
    Tokens,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Constant {
    pub name: String,
    /// Known at generation time; `None` for values only the loaded grammar
    /// provides, such as numeric type ids.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenConstant {
    pub name: String,
    pub token: String,
}

/// Hoisted methods of an interface; assigned exactly once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CommonMethods {
    #[default]
    Unresolved,
    Resolved(Vec<GeneratedMethod>),
}

#[derive(Debug, Clone)]
pub struct TypeNode {
    /// Grammar type name for node types; `parent.field` (or `parent.*` for
    /// unnamed children) for child types, suffixed with `#tokens` for tokens.
    pub identity: String,
    pub name: ClassName,
    pub kind: TypeKind,
    pub extra: bool,
    supertypes: IndexSet<TypeId>,
    subtypes: IndexSet<TypeId>,
    methods: Vec<GeneratedMethod>,
    custom_methods: Vec<CustomMethod>,
    constants: Vec<Constant>,
    tokens: Vec<TokenConstant>,
    common: CommonMethods,
}

#[derive(Debug, Default)]
pub struct TypeGraph {
    nodes: Vec<TypeNode>,
    by_identity: IndexMap<String, TypeId>,
    root: Option<TypeId>,
}

/// Everything besides the grammar and the names that shapes the graph.
#[derive(Debug, Clone)]
pub struct BuildOptions<'a> {
    pub package: &'a str,
    /// Alias name → actual type name, for grammars whose child types use
    /// aliases that are not declared as node types.
    pub fallback_node_types: &'a IndexMap<String, String>,
    pub custom_methods: &'a CustomMethodsConfig,
    /// Marks optional single-child getters; `java.util.Optional` otherwise.
    pub nullable_annotation: Option<&'a ClassName>,
    pub non_empty_annotation: &'a ClassName,
    /// Untyped tree node, returned by the unnamed children getter.
    pub node_class: &'a ClassName,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl TypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl TypeKind {
    pub fn is_interface(self) -> bool {
        matches!(self, Self::Supertype | Self::ChildTypes)
    }
}

impl TypeNode {
    pub fn supertypes(&self) -> &IndexSet<TypeId> {
        &self.supertypes
    }
    pub fn subtypes(&self) -> &IndexSet<TypeId> {
        &self.subtypes
    }
    /// Methods declared by the type itself, custom methods included.
    pub fn own_methods(&self) -> &[GeneratedMethod] {
        &self.methods
    }
    pub fn custom_methods(&self) -> &[CustomMethod] {
        &self.custom_methods
    }
    pub fn constants(&self) -> &[Constant] {
        &self.constants
    }
    pub fn tokens(&self) -> &[TokenConstant] {
        &self.tokens
    }
    pub fn common_state(&self) -> &CommonMethods {
        &self.common
    }
    /// Hoisted methods; empty until resolved.
    pub fn common_methods(&self) -> &[GeneratedMethod] {
        match &self.common {
            CommonMethods::Unresolved => &[],
            CommonMethods::Resolved(methods) => methods,
        }
    }
    pub fn all_methods(&self) -> impl Iterator<Item = &GeneratedMethod> {
        self.methods.iter().chain(self.common_methods())
    }
}

impl TypeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- Mutation ----

    pub fn add_node(&mut self, identity: impl Into<String>, name: ClassName, kind: TypeKind) -> Result<TypeId> {
        let identity = identity.into();
        if self.by_identity.contains_key(&identity) {
            return Err(GenError::DuplicateType(identity))
        }
        let id = TypeId(self.nodes.len() as u32);
        trace!(%id, %identity, %name, ?kind, "added type");
        self.by_identity.insert(identity.clone(), id);
        self.nodes.push(TypeNode {
            identity,
            name,
            kind,
            extra: false,
            supertypes: IndexSet::new(),
            subtypes: IndexSet::new(),
            methods: Vec::new(),
            custom_methods: Vec::new(),
            constants: Vec::new(),
            tokens: Vec::new(),
            common: CommonMethods::Unresolved,
        });
        Ok(id)
    }

    pub fn add_subtype(&mut self, supertype: TypeId, subtype: TypeId) {
        self.nodes[supertype.index()].subtypes.insert(subtype);
        self.nodes[subtype.index()].supertypes.insert(supertype);
    }

    pub fn add_method(&mut self, id: TypeId, method: GeneratedMethod) {
        self.nodes[id.index()].methods.push(method);
    }

    pub fn add_custom_method(&mut self, id: TypeId, custom: CustomMethod) {
        let node = &mut self.nodes[id.index()];
        node.methods.push(custom.method.clone());
        node.custom_methods.push(custom);
    }

    pub fn add_constant(&mut self, id: TypeId, name: String, value: Option<String>) {
        self.nodes[id.index()].constants.push(Constant { name, value });
    }

    pub fn add_token(&mut self, id: TypeId, name: String, token: String) {
        self.nodes[id.index()].tokens.push(TokenConstant { name, token });
    }

    pub fn set_extra(&mut self, id: TypeId, extra: bool) {
        self.nodes[id.index()].extra = extra;
    }

    pub fn set_root(&mut self, id: TypeId) {
        self.root = Some(id);
    }

    /// Unresolved → resolved; a second assignment is an error.
    pub fn set_common_methods(&mut self, id: TypeId, methods: Vec<GeneratedMethod>) -> Result<()> {
        let node = &mut self.nodes[id.index()];
        if let CommonMethods::Resolved(_) = node.common {
            return Err(GenError::CommonMethodsAlreadySet(node.identity.clone()))
        }
        node.common = CommonMethods::Resolved(methods);
        Ok(())
    }

    // ---- Queries ----

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
    pub fn node(&self, id: TypeId) -> &TypeNode {
        &self.nodes[id.index()]
    }
    pub fn id(&self, identity: &str) -> Option<TypeId> {
        self.by_identity.get(identity).copied()
    }
    pub fn ids(&self) -> impl DoubleEndedIterator<Item = TypeId> {
        (0..self.nodes.len() as u32).map(TypeId)
    }
    pub fn root(&self) -> Option<TypeId> {
        self.root
    }

    pub fn interfaces(&self) -> Vec<TypeId> {
        self.ids().filter(|id| self.node(*id).kind.is_interface()).collect()
    }

    pub fn sub_interfaces(&self, id: TypeId) -> Vec<TypeId> {
        self.node(id)
            .subtypes
            .iter()
            .copied()
            .filter(|sub| self.node(*sub).kind.is_interface())
            .collect()
    }

    /// All direct and indirect supertypes, each before its own supertypes.
    pub fn ancestors(&self, id: TypeId) -> Result<Vec<TypeId>> {
        // independent elements come out reversed, so feed them reversed
        let direct = self.node(id).supertypes.iter().rev().copied().collect::<Vec<_>>();
        topo_sort(
            &direct,
            |s| self.node(*s).supertypes.iter().copied().collect::<Vec<_>>(),
            UnknownReferences::Add,
        )
    }

    /// Order in which declarations are emitted: interfaces before the types
    /// implementing them, otherwise creation order.
    pub fn declaration_order(&self) -> Result<Vec<TypeId>> {
        // independent elements come out reversed, so feed them reversed
        let ids = self.ids().rev().collect::<Vec<_>>();
        topo_sort(
            &ids,
            |id| self.node(*id).subtypes.iter().copied().collect::<Vec<_>>(),
            UnknownReferences::Throw,
        )
    }

    /// Lazily computed ancestors of all node types, restricted to grammar
    /// supertypes. Used by the LUB of getter return types.
    ///
    /// Snapshots the supertype edges present at the time of the call.
    pub fn supertypes_resolver(&self) -> SupertypesResolver {
        let direct = self.nodes
            .iter()
            .filter(|n| matches!(n.kind, TypeKind::Regular | TypeKind::Supertype))
            .map(|n| {
                let supertypes = n.supertypes
                    .iter()
                    .map(|s| self.node(*s))
                    .filter(|s| s.kind == TypeKind::Supertype)
                    .map(|s| s.name.clone())
                    .collect::<Vec<_>>();
                (n.name.clone(), supertypes)
            })
            .collect::<IndexMap<_, _>>();
        let delegate: Box<dyn Fn() -> AncestorTable + Send + Sync> = Box::new(move || {
            let table = ancestor_table(&direct);
            trace!(classes = table.len(), "computed ancestor table");
            table
        });
        let table = Arc::new(Memoized::new(delegate));
        SupertypesResolver::new(move |class| table.get().get(class).cloned())
    }
}

// ---- Building ----

impl TypeGraph {
    /// Creates one node per named grammar type, the child types of every
    /// field and of the unnamed children, and all edges between them.
    pub fn build(grammar: &ValidGrammar<'_>, names: &Names<'_>, options: &BuildOptions<'_>) -> Result<Self> {
        let known = grammar.regular
            .iter()
            .chain(&grammar.supertypes)
            .map(|n| n.type_name.clone())
            .collect::<Vec<_>>();
        if let Some(unknown) = options.custom_methods.unknown_node_types(&known).next() {
            return Err(GenError::UnknownType {
                referenced_by: "custom methods config".to_string(),
                name: unknown.to_string(),
            })
        }

        let mut builder = GraphBuilder {
            graph: TypeGraph::new(),
            names,
            options,
            named: IndexMap::new(),
            nested_names: IndexMap::new(),
        };
        for spec in &grammar.regular {
            builder.add_node_type(spec, TypeKind::Regular)?;
        }
        for spec in &grammar.supertypes {
            builder.add_node_type(spec, TypeKind::Supertype)?;
        }
        // all node types exist now, so supertypes may refer to other supertypes
        for spec in &grammar.supertypes {
            let supertype = builder.lookup(&spec.type_name, &spec.type_name)?;
            for subtype in spec.subtypes.iter().flatten().filter(|s| s.named) {
                let subtype = builder.lookup(&subtype.type_name, &spec.type_name)?;
                builder.graph.add_subtype(supertype, subtype);
            }
        }

        let resolver = builder.graph.supertypes_resolver();
        for spec in &grammar.regular {
            let parent = builder.lookup(&spec.type_name, &spec.type_name)?;
            if let Some(children) = &spec.children {
                builder.add_accessor(parent, spec, None, children, &resolver)?;
            }
            for (field, child) in spec.fields() {
                builder.add_accessor(parent, spec, Some(field), child, &resolver)?;
            }
        }

        if let Some(root) = &grammar.root {
            let root = builder.lookup(root, "root node")?;
            builder.graph.set_root(root);
        }
        let graph = builder.graph;
        debug!(
            types = graph.len(),
            interfaces = graph.interfaces().len(),
            root = graph.root().map(|r| graph.node(r).identity.as_str()).unwrap_or("-"),
            "built type graph",
        );
        Ok(graph)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

type AncestorTable = IndexMap<ClassName, Vec<ClassName>>;

fn ancestor_table(direct: &IndexMap<ClassName, Vec<ClassName>>) -> AncestorTable {
    direct
        .iter()
        .map(|(class, supertypes)| {
            // keeps declaration order among unrelated supertypes
            let supertypes = supertypes.iter().rev().cloned().collect::<Vec<_>>();
            let ancestors = topo_sort(
                &supertypes,
                |s| direct.get(s).cloned().unwrap_or_default(),
                UnknownReferences::Add,
            );
            (class.clone(), ancestors.unwrap_or_default())
        })
        .collect()
}

struct GraphBuilder<'a, 'g> {
    graph: TypeGraph,
    names: &'a Names<'g>,
    options: &'a BuildOptions<'a>,
    /// Grammar type name → node.
    named: IndexMap<String, TypeId>,
    /// Per enclosing type: nested simple name → slot that claimed it.
    nested_names: IndexMap<TypeId, IndexMap<String, String>>,
}

/// Where a child descriptor sits in its parent.
enum Slot<'s> {
    Children,
    Field(&'s str),
}

impl Slot<'_> {
    fn identity(&self, parent: &str) -> String {
        match self {
            Self::Children => format!("{parent}.*"),
            Self::Field(field) => format!("{parent}.{field}"),
        }
    }
}

impl<'a, 'g> GraphBuilder<'a, 'g> {
    fn lookup(&self, type_name: &str, referenced_by: &str) -> Result<TypeId> {
        let named = |name: &str| self.named.get(name).copied();
        named(type_name)
            .or_else(|| {
                let actual = self.options.fallback_node_types.get(type_name)?;
                trace!(alias = type_name, %actual, "resolved type through fallback mapping");
                named(actual)
            })
            .ok_or_else(|| GenError::UnknownType {
                referenced_by: referenced_by.to_string(),
                name: type_name.to_string(),
            })
    }

    fn add_node_type(&mut self, spec: &NodeTypeSpec, kind: TypeKind) -> Result<TypeId> {
        let type_name = spec.type_name.as_str();
        let generator = self.names.generator();
        let class = ClassName::new(self.options.package, self.names.class_name(type_name)?);
        let id = self.graph.add_node(type_name, class, kind)?;
        self.named.insert(type_name.to_string(), id);
        self.graph.set_extra(id, spec.extra);

        let type_name_constant = self.names.member_name(generator.type_name_constant(type_name))?;
        self.graph.add_constant(id, type_name_constant, Some(type_name.to_string()));
        let type_id_constant = self.names.member_name(generator.type_id_constant(type_name))?;
        self.graph.add_constant(id, type_id_constant, None);

        if kind == TypeKind::Regular {
            let unnamed_getter = generator.unnamed_children_getter(type_name, spec.children.is_some(), spec.has_fields());
            if let Some(getter) = unnamed_getter {
                let list = TypeRef::parameterized(java_util("List"), vec![TypeRef::class(self.options.node_class.clone())]);
                let method = GeneratedMethod::new(
                    MethodKind::UnnamedChildren,
                    Signature::getter(self.names.member_name(getter)?),
                    Some(ReturnType::new(list)),
                );
                self.graph.add_method(id, method);
            }
        }
        for custom in self.options.custom_methods.for_node_type(type_name)? {
            self.names.member_name(custom.method.signature.name.clone())?;
            self.graph.add_custom_method(id, custom);
        }
        Ok(id)
    }

    /// Claims `simple_name` inside `parent` for `slot`.
    fn nested_class(&mut self, parent: TypeId, simple_name: String, slot: String) -> Result<ClassName> {
        let simple_name = self.names.type_name(simple_name)?;
        let claimed = self.nested_names.entry(parent).or_default();
        if let Some(first) = claimed.get(&simple_name) {
            return Err(GenError::DuplicateGeneratedName {
                name: simple_name,
                first: first.clone(),
                second: slot,
            })
        }
        claimed.insert(simple_name.clone(), slot);
        Ok(self.graph.node(parent).name.nested(simple_name))
    }

    fn add_accessor(
        &mut self,
        parent: TypeId,
        spec: &NodeTypeSpec,
        field: Option<&str>,
        child: &ChildSpec,
        resolver: &SupertypesResolver,
    ) -> Result<()> {
        let parent_name = spec.type_name.as_str();
        let slot = match field {
            Some(field) => Slot::Field(field),
            None => Slot::Children,
        };
        let slot_identity = slot.identity(parent_name);
        if child.types.is_empty() {
            return Err(GenError::InvalidGrammar(format!("Child type '{slot_identity}' has no types")))
        }
        let generator = self.names.generator();
        let all_types = child.types.iter().map(|t| t.type_name.clone()).collect::<Vec<_>>();
        let named = child.named_types().collect::<Vec<_>>();
        let tokens = child.tokens().map(str::to_string).collect::<Vec<_>>();
        let (multiple, required) = (child.multiple, child.required);

        let getter = match slot {
            Slot::Field(field) => {
                let name_constant = self.names.member_name(generator.field_name_constant(parent_name, field))?;
                self.graph.add_constant(parent, name_constant, Some(field.to_string()));
                let id_constant = self.names.member_name(generator.field_id_constant(parent_name, field))?;
                self.graph.add_constant(parent, id_constant, None);
                generator.field_getter_name(parent_name, field, &all_types, multiple, required)
            }
            Slot::Children => generator.children_getter_name(parent_name, &all_types, multiple, required),
        };
        let getter = self.names.member_name(getter)?;

        let mut target = None;
        let mut target_resolver = SupertypesResolver::empty();
        if tokens.is_empty() && named.len() == 1 {
            target = Some(self.lookup(named[0], parent_name)?);
            target_resolver = resolver.clone();
        }

        let mut tokens_class = None;
        if !tokens.is_empty() {
            let simple_name = match slot {
                Slot::Field(field) => generator.field_token_type_name(parent_name, field, &tokens),
                Slot::Children => generator.children_token_type_name(parent_name, &tokens),
            };
            let identity = format!("{slot_identity}#tokens");
            let class = self.nested_class(parent, simple_name, identity.clone())?;
            let id = self.graph.add_node(identity, class, TypeKind::Tokens)?;
            let mut constants = IndexMap::<String, String>::new();
            for (index, token) in tokens.iter().enumerate() {
                let name = match slot {
                    Slot::Field(field) => generator.field_token_name(parent_name, field, token, index)?,
                    Slot::Children => generator.children_token_name(parent_name, token, index)?,
                };
                let name = self.names.member_name(name)?;
                if constants.values().any(|t| t == token) {
                    return Err(GenError::InvalidGrammar(format!(
                        "Duplicate non-named type '{token}' for enclosing type '{parent_name}'"
                    )))
                }
                if let Some(first) = constants.insert(name.clone(), token.clone()) {
                    return Err(GenError::DuplicateGeneratedName { name, first, second: token.clone() })
                }
                self.graph.add_token(id, name, token.clone());
            }
            tokens_class = Some(id);
            if named.is_empty() {
                target = Some(id);
            }
        }

        let target = match target {
            Some(target) => target,
            None => {
                let simple_name = match slot {
                    Slot::Field(field) => generator.field_types_name(parent_name, field, &all_types),
                    Slot::Children => generator.children_types_name(parent_name, &all_types),
                };
                let class = self.nested_class(parent, simple_name, slot_identity.clone())?;
                let interface = self.graph.add_node(slot_identity.clone(), class, TypeKind::ChildTypes)?;
                for type_name in &named {
                    let subtype = self.lookup(type_name, parent_name)?;
                    self.graph.add_subtype(interface, subtype);
                }
                if let Some(tokens_class) = tokens_class {
                    self.graph.add_subtype(interface, tokens_class);
                }
                interface
            }
        };

        let return_type = self.getter_return_type(TypeRef::class(self.graph.node(target).name.clone()), multiple, required);
        let kind = match slot {
            Slot::Field(field) => MethodKind::Field { field: field.to_string(), multiple, required },
            Slot::Children => MethodKind::Children { multiple, required },
        };
        let method = GeneratedMethod::new(
            kind,
            Signature::getter(getter),
            Some(ReturnType::with_resolver(return_type, target_resolver)),
        );
        trace!(parent = parent_name, %method, "added accessor");
        self.graph.add_method(parent, method);
        Ok(())
    }

    /// `List<T>` (`@NonEmpty` if required) for multiple children, the
    /// nullable form of `T` for an optional single child, else `T`.
    fn getter_return_type(&self, base: TypeRef, multiple: bool, required: bool) -> TypeRef {
        if multiple {
            let list = TypeRef::parameterized(java_util("List"), vec![base]);
            if required {
                return list.annotated([self.options.non_empty_annotation.clone()])
            }
            return list
        }
        if required {
            return base
        }
        match self.options.nullable_annotation {
            Some(nullable) => base.annotated([nullable.clone()]),
            None => TypeRef::parameterized(java_util("Optional"), vec![base]),
        }
    }
}

fn java_util(simple_name: &str) -> ClassName {
    ClassName::new("java.util", simple_name)
}
