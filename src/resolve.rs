//! Hoisting of methods shared by all subtypes of an interface.
//!
//! Interfaces are processed bottom-up. A sub-interface contributes its own
//! methods plus what was hoisted into it one step earlier, so hoisting
//! compounds upward without flattening the hierarchy.
use indexmap::{IndexMap, IndexSet};
use tracing::{debug, trace};

use crate::error::{GenError, Result};
use crate::graph::{TypeGraph, TypeId};
use crate::lub::common_return_type;
use crate::method::{GeneratedMethod, MethodKey, ReturnType};
use crate::topo::{topo_sort, UnknownReferences};

/// Candidate group: one return type per subtype seen so far, deduplicated.
/// `None` entries are `void`.
type Candidates = IndexMap<MethodKey, Vec<Option<ReturnType>>>;

/// Computes and records the common methods of every interface of `graph`.
pub fn resolve_common_methods(graph: &mut TypeGraph) -> Result<()> {
    let interfaces = graph.interfaces();
    // sub-interfaces first
    let mut sorted = topo_sort(&interfaces, |i| graph.sub_interfaces(*i), UnknownReferences::Throw)?;
    sorted.reverse();

    let mut hoisted = IndexMap::<TypeId, Vec<GeneratedMethod>>::new();
    for interface in sorted {
        let methods = common_methods(graph, interface, &hoisted)?;
        hoisted.insert(interface, methods);
    }

    let mut total = 0;
    for (interface, methods) in hoisted {
        total += methods.len();
        graph.set_common_methods(interface, methods)?;
    }
    debug!(interfaces = interfaces.len(), hoisted = total, "resolved common methods");
    Ok(())
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn common_methods(
    graph: &TypeGraph,
    interface: TypeId,
    hoisted: &IndexMap<TypeId, Vec<GeneratedMethod>>,
) -> Result<Vec<GeneratedMethod>> {
    let node = graph.node(interface);
    // declared by the interface itself or any interface above it
    let mut declared = node.own_methods().iter().map(GeneratedMethod::key).collect::<IndexSet<_>>();
    for ancestor in graph.ancestors(interface)? {
        declared.extend(graph.node(ancestor).own_methods().iter().map(GeneratedMethod::key));
    }
    let mut candidates: Option<Candidates> = None;

    for &subtype in node.subtypes() {
        let sub_node = graph.node(subtype);
        let inherited = hoisted.get(&subtype).map(Vec::as_slice).unwrap_or_default();
        let mut methods = IndexMap::<MethodKey, Option<ReturnType>>::new();
        for method in sub_node.own_methods().iter().chain(inherited) {
            if methods.insert(method.key(), method.return_type.clone()).is_some() {
                return Err(GenError::DuplicateMethod {
                    owner: sub_node.identity.clone(),
                    method: method.to_string(),
                })
            }
        }

        candidates = Some(match candidates.take() {
            None => methods.into_iter().map(|(key, ret)| (key, vec![ret])).collect(),
            Some(mut candidates) => {
                candidates.retain(|key, _| methods.contains_key(key));
                for (key, return_types) in candidates.iter_mut() {
                    if let Some(ret) = methods.swap_remove(key) {
                        if !return_types.contains(&ret) {
                            return_types.push(ret);
                        }
                    }
                }
                candidates
            }
        });
        if candidates.as_ref().is_some_and(IndexMap::is_empty) {
            break
        }
    }

    let mut common = Vec::new();
    for (key, return_types) in candidates.unwrap_or_default() {
        if declared.contains(&key) {
            trace!(interface = %node.identity, method = %key.signature, "already declared, not hoisted");
            continue
        }
        let return_type = if matches!(return_types.as_slice(), [None]) {
            None
        } else {
            let Some(return_types) = return_types.into_iter().collect::<Option<Vec<_>>>() else {
                trace!(interface = %node.identity, method = %key.signature, "void and non-void mixed");
                continue
            };
            match common_return_type(&return_types) {
                Some(return_type) => Some(return_type),
                None => {
                    trace!(interface = %node.identity, method = %key.signature, "no common return type");
                    continue
                }
            }
        };
        let method = GeneratedMethod::new(key.kind, key.signature, return_type);
        debug!(interface = %node.identity, %method, "hoisted common method");
        common.push(method);
    }
    Ok(common)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use crate::graph::TypeKind;
    use crate::ir::{ClassName, Primitive, TypeRef};
    use crate::method::{MethodKind, Signature, SupertypesResolver};

    fn class(name: &str) -> ClassName {
        ClassName::from_qualified(name)
    }

    fn method(kind: MethodKind, name: &str, return_type: Option<ReturnType>) -> GeneratedMethod {
        GeneratedMethod::new(kind, Signature::getter(name), return_type)
    }

    fn common(graph: &TypeGraph, identity: &str) -> Vec<GeneratedMethod> {
        graph.node(graph.id(identity).unwrap()).common_methods().to_vec()
    }

    /// `root` with subtypes `subtype1` and `subInterface2`; the latter with
    /// subtypes `subtype21` and `subtype22`.
    fn hierarchy(reverse_creation: bool) -> TypeGraph {
        let children = MethodKind::Children { multiple: true, required: false };
        let number = class("java.lang.Number");
        let integer = class("java.lang.Integer");
        let long = class("java.lang.Long");
        let resolver = |sub: &ClassName| {
            SupertypesResolver::from_map(IndexMap::from([(sub.clone(), vec![number.clone()])]))
        };

        let mut graph = TypeGraph::new();
        let mut add = |identity: &str, kind| graph_add(&mut graph, identity, kind);
        let (root, sub_interface2) = if reverse_creation {
            let sub_interface2 = add("subInterface2", TypeKind::Supertype);
            (add("root", TypeKind::Supertype), sub_interface2)
        } else {
            let root = add("root", TypeKind::Supertype);
            (root, add("subInterface2", TypeKind::Supertype))
        };
        let subtype1 = add("subtype1", TypeKind::Regular);
        let subtype21 = add("subtype21", TypeKind::Regular);
        let subtype22 = add("subtype22", TypeKind::Regular);
        graph.add_subtype(root, subtype1);
        graph.add_subtype(root, sub_interface2);
        graph.add_subtype(sub_interface2, subtype21);
        graph.add_subtype(sub_interface2, subtype22);

        // common with sibling subInterface2
        graph.add_method(subtype1, method(MethodKind::Custom, "method1", None));
        // common once inherited by subInterface2
        graph.add_method(subtype1, method(children.clone(), "children1", None));
        graph.add_method(
            subtype1,
            method(children.clone(), "children2", Some(ReturnType::with_resolver(TypeRef::class(integer.clone()), resolver(&integer)))),
        );

        graph.add_method(subtype21, method(MethodKind::Custom, "method2", None));
        graph.add_method(subtype21, method(children.clone(), "children1", None));
        graph.add_method(subtype21, method(children.clone(), "children2", Some(ReturnType::new(TypeRef::class(number.clone())))));
        graph.add_method(
            subtype21,
            method(children.clone(), "differentReturn", Some(ReturnType::new(TypeRef::primitive(Primitive::Int)))),
        );

        // same signature as subtype21's method2, but a different kind
        graph.add_method(subtype22, method(children.clone(), "method2", None));
        graph.add_method(subtype22, method(children.clone(), "children1", None));
        graph.add_method(
            subtype22,
            method(children.clone(), "children2", Some(ReturnType::with_resolver(TypeRef::class(long.clone()), resolver(&long)))),
        );
        graph.add_method(
            subtype22,
            method(children.clone(), "differentReturn", Some(ReturnType::new(TypeRef::primitive(Primitive::Boolean)))),
        );

        graph.add_method(sub_interface2, method(MethodKind::Custom, "method1", None));
        graph
    }

    fn graph_add(graph: &mut TypeGraph, identity: &str, kind: TypeKind) -> TypeId {
        graph.add_node(identity, class(&format!("p.{identity}")), kind).unwrap()
    }

    #[test]
    fn hoists_methods_bottom_up() {
        for reverse_creation in [false, true] {
            let mut graph = hierarchy(reverse_creation);
            resolve_common_methods(&mut graph).unwrap();

            let children = MethodKind::Children { multiple: true, required: false };
            let number = ReturnType::new(TypeRef::class(class("java.lang.Number")));
            assert_eq!(common(&graph, "root"), vec![
                method(MethodKind::Custom, "method1", None),
                method(children.clone(), "children1", None),
                method(children.clone(), "children2", Some(number.clone())),
            ]);
            assert_eq!(common(&graph, "subInterface2"), vec![
                method(children.clone(), "children1", None),
                method(children.clone(), "children2", Some(number.clone())),
            ]);
        }
    }

    #[test]
    fn methods_on_only_some_subtypes_stay_put() {
        let mut graph = TypeGraph::new();
        let interface = graph_add(&mut graph, "i", TypeKind::Supertype);
        let a = graph_add(&mut graph, "a", TypeKind::Regular);
        let b = graph_add(&mut graph, "b", TypeKind::Regular);
        graph.add_subtype(interface, a);
        graph.add_subtype(interface, b);
        graph.add_method(a, method(MethodKind::Custom, "shared", None));
        graph.add_method(a, method(MethodKind::Custom, "onlyA", None));
        graph.add_method(b, method(MethodKind::Custom, "shared", None));
        // void and non-void under the same signature
        graph.add_method(a, method(MethodKind::Custom, "mixed", None));
        graph.add_method(b, method(MethodKind::Custom, "mixed", Some(ReturnType::new(TypeRef::primitive(Primitive::Int)))));

        resolve_common_methods(&mut graph).unwrap();
        assert_eq!(common(&graph, "i"), vec![method(MethodKind::Custom, "shared", None)]);
        assert_eq!(graph.node(a).own_methods().len(), 3);
    }

    #[test]
    fn does_not_redeclare_methods_of_the_interface() {
        let mut graph = TypeGraph::new();
        let interface = graph_add(&mut graph, "i", TypeKind::Supertype);
        let a = graph_add(&mut graph, "a", TypeKind::Regular);
        let b = graph_add(&mut graph, "b", TypeKind::Regular);
        graph.add_subtype(interface, a);
        graph.add_subtype(interface, b);
        for id in [interface, a, b] {
            graph.add_method(id, method(MethodKind::Custom, "text", None));
        }
        resolve_common_methods(&mut graph).unwrap();
        assert_eq!(common(&graph, "i"), vec![]);
    }

    #[test]
    fn does_not_redeclare_methods_of_an_ancestor_interface() {
        let mut graph = TypeGraph::new();
        let root = graph_add(&mut graph, "root", TypeKind::Supertype);
        let sub = graph_add(&mut graph, "sub", TypeKind::Supertype);
        let a = graph_add(&mut graph, "a", TypeKind::Regular);
        let b = graph_add(&mut graph, "b", TypeKind::Regular);
        let c = graph_add(&mut graph, "c", TypeKind::Regular);
        graph.add_subtype(root, sub);
        graph.add_subtype(root, c);
        graph.add_subtype(sub, a);
        graph.add_subtype(sub, b);
        graph.add_method(root, method(MethodKind::Custom, "text", None));
        for id in [a, b, c] {
            graph.add_method(id, method(MethodKind::Custom, "text", None));
        }
        resolve_common_methods(&mut graph).unwrap();
        assert_eq!(common(&graph, "sub"), vec![]);
        assert_eq!(common(&graph, "root"), vec![]);
        assert_eq!(graph.node(root).own_methods().len(), 1);
    }

    #[test]
    fn rejects_duplicate_methods_in_a_subtype() {
        let mut graph = TypeGraph::new();
        let interface = graph_add(&mut graph, "i", TypeKind::Supertype);
        let a = graph_add(&mut graph, "a", TypeKind::Regular);
        graph.add_subtype(interface, a);
        graph.add_method(a, method(MethodKind::Custom, "twice", None));
        graph.add_method(a, method(MethodKind::Custom, "twice", None));
        let error = resolve_common_methods(&mut graph).unwrap_err();
        assert_eq!(error.to_string(), "Duplicate method void twice() in 'a'");
    }

    #[test]
    fn resolution_happens_once() {
        let mut graph = hierarchy(false);
        resolve_common_methods(&mut graph).unwrap();
        assert!(matches!(
            resolve_common_methods(&mut graph),
            Err(GenError::CommonMethodsAlreadySet(_)),
        ));
    }
}
