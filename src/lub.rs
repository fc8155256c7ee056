//! Least upper bound of method return types.
//!
//! Candidates are folded left to right. Plain classes and parameterized types
//! narrow a set of "type choices" (the class itself plus its ancestors, as
//! reported by the candidate's supertypes resolver); every other shape must be
//! structurally identical across all candidates.
//!
//! - Annotations must match exactly between candidates, otherwise there is no
//!   common type.
//! - Type arguments are narrowed independently of the raw type. A narrowed
//!   argument no longer denotes the original type and becomes `? extends X`.
//! - The order of the choices of the first candidate decides which of several
//!   common ancestors is picked: the most specific one comes first.
use indexmap::IndexSet;

use crate::ir::{ClassName, Shape, TypeRef, Wildcard};
use crate::method::{ReturnType, SupertypesResolver};

// ------------------------------- Choices --------------------------------- //

enum TypeChoices {
    /// Every candidate seen so far was this exact type.
    Original { ty: TypeRef, resolver: SupertypesResolver },
    /// Ordered common ancestors, stripped of `annotations`.
    Supertypes { supertypes: IndexSet<TypeRef>, annotations: Vec<ClassName> },
}

/// `? extends X` → `X`, as long as nothing is lost.
fn unwrap_wildcard(ty: &TypeRef) -> TypeRef {
    match &ty.shape {
        Shape::Wildcard(Wildcard::Extends(upper)) if !ty.is_annotated() => (**upper).clone(),
        _ => ty.clone(),
    }
}

fn type_choices(ty: &TypeRef, resolver: &SupertypesResolver) -> IndexSet<TypeRef> {
    debug_assert!(!ty.is_annotated());
    let mut choices = IndexSet::from([ty.clone()]);
    if let Shape::Class(class) = &ty.shape {
        if let Some(supertypes) = resolver.supertypes(class) {
            choices.extend(supertypes.into_iter().map(TypeRef::class));
        }
    }
    choices
}

impl TypeChoices {
    fn original(ty: TypeRef, resolver: &SupertypesResolver) -> Self {
        Self::Original { ty, resolver: resolver.clone() }
    }

    fn resulting(self, other: &TypeRef, other_resolver: &SupertypesResolver) -> Option<Self> {
        if let Self::Original { ty, .. } = &self {
            if ty == other {
                return Some(self)
            }
        }
        let other = unwrap_wildcard(other);
        let (mut common, annotations) = match self {
            Self::Original { ty, resolver } => {
                let ty = unwrap_wildcard(&ty);
                if ty.annotations != other.annotations {
                    return None
                }
                (type_choices(&ty.without_annotations(), &resolver), ty.annotations)
            }
            Self::Supertypes { supertypes, annotations } => {
                if annotations != other.annotations {
                    return None
                }
                (supertypes, annotations)
            }
        };
        let other_choices = type_choices(&other.without_annotations(), other_resolver);
        common.retain(|choice| other_choices.contains(choice));
        if common.is_empty() {
            return None
        }
        Some(Self::Supertypes { supertypes: common, annotations })
    }

    fn final_type(&self) -> Option<TypeRef> {
        match self {
            Self::Original { ty, .. } => Some(ty.clone()),
            Self::Supertypes { supertypes, annotations } => {
                let first = supertypes.first()?;
                Some(first.clone().annotated(annotations.iter().cloned()))
            }
        }
    }

    fn final_type_as_arg(&self) -> Option<TypeRef> {
        match self {
            Self::Original { .. } => self.final_type(),
            Self::Supertypes { .. } => self.final_type().map(TypeRef::extends),
        }
    }
}

// --------------------------------- LUB ----------------------------------- //

/// Most specific return type every candidate is assignable to, or `None` when
/// there is no such type (which only means the method is not hoisted).
///
/// The result carries the combination of all candidate resolvers, so it can
/// take part in a later LUB one level further up the hierarchy.
pub fn common_return_type(return_types: &[ReturnType]) -> Option<ReturnType> {
    let mut raw_choices: Option<TypeChoices> = None;
    let mut arg_choices: Option<Vec<TypeChoices>> = None;
    let mut other_type: Option<&TypeRef> = None;

    for return_type in return_types {
        let resolver = &return_type.resolver;
        match &return_type.ty.shape {
            Shape::Class(_) => {
                if arg_choices.is_some() || other_type.is_some() {
                    return None
                }
                raw_choices = Some(match raw_choices.take() {
                    None => TypeChoices::original(return_type.ty.clone(), resolver),
                    Some(choices) => choices.resulting(&return_type.ty, resolver)?,
                });
            }
            Shape::Parameterized { raw, args } => {
                if (raw_choices.is_some() && arg_choices.is_none()) || other_type.is_some() {
                    return None
                }
                // annotations of a parameterized type travel with its raw type
                let raw_type = TypeRef::class(raw.clone())
                    .annotated(return_type.ty.annotations.iter().cloned());
                match (raw_choices.take(), arg_choices.take()) {
                    (Some(choices), Some(previous_args)) => {
                        raw_choices = Some(choices.resulting(&raw_type, resolver)?);
                        if previous_args.len() != args.len() {
                            return None
                        }
                        let narrowed = previous_args
                            .into_iter()
                            .zip(args)
                            .map(|(choices, arg)| choices.resulting(arg, resolver))
                            .collect::<Option<Vec<_>>>()?;
                        arg_choices = Some(narrowed);
                    }
                    _ => {
                        raw_choices = Some(TypeChoices::original(raw_type, resolver));
                        arg_choices = Some(
                            args.iter()
                                .map(|arg| TypeChoices::original(arg.clone(), resolver))
                                .collect(),
                        );
                    }
                }
            }
            Shape::Primitive(_) | Shape::Array(_) | Shape::Wildcard(_) | Shape::TypeVar(_) => {
                if raw_choices.is_some() {
                    return None
                }
                match other_type {
                    None => other_type = Some(&return_type.ty),
                    Some(previous) if *previous != return_type.ty => return None,
                    Some(_) => {}
                }
            }
        }
    }

    let resolver = SupertypesResolver::collection(
        return_types.iter().map(|r| r.resolver.clone()).collect(),
    );
    if let Some(other_type) = other_type {
        return Some(ReturnType::with_resolver(other_type.clone(), resolver))
    }

    let raw_type = raw_choices?.final_type()?;
    let ty = match arg_choices {
        None => raw_type,
        Some(arg_choices) => {
            let Shape::Class(raw) = raw_type.shape else {
                return None
            };
            let args = arg_choices
                .iter()
                .map(TypeChoices::final_type_as_arg)
                .collect::<Option<Vec<_>>>()?;
            TypeRef::parameterized(raw, args).annotated(raw_type.annotations)
        }
    };
    Some(ReturnType::with_resolver(ty, resolver))
}
