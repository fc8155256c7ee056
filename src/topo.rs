//! Dependency ordering: every element is placed before everything it
//! (transitively) references.
//!
//! Post-order depth-first walk over the input in the given order, reversed at
//! the end. Independent elements therefore come out in reverse input order,
//! which callers and tests rely on.
use std::collections::HashSet;
use std::fmt::Display;
use std::hash::Hash;

use crate::error::{GenError, Result};

/// What to do with a referenced element that is not part of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownReferences {
    /// Include it, and recurse into its own references.
    Add,
    /// Drop the reference.
    Ignore,
    /// Fail naming both elements.
    Throw,
}

/// Orders `elements` so that each one precedes all elements returned by
/// `references` for it, directly or transitively.
///
/// Elements already visited are never entered again, so cycles terminate;
/// within a cycle the order is the traversal order.
pub fn topo_sort<T, F, I>(elements: &[T], references: F, unknown: UnknownReferences) -> Result<Vec<T>>
where
    T: Clone + Eq + Hash + Display,
    F: Fn(&T) -> I,
    I: IntoIterator<Item = T>,
{
    let mut walk = Walk {
        known: elements.iter().cloned().collect(),
        visited: HashSet::new(),
        post_order: Vec::with_capacity(elements.len()),
        references: &references,
        unknown,
    };
    for element in elements {
        walk.visit(element)?;
    }
    let mut sorted = walk.post_order;
    sorted.reverse();
    Ok(sorted)
}

struct Walk<'a, T, F> {
    known: HashSet<T>,
    visited: HashSet<T>,
    post_order: Vec<T>,
    references: &'a F,
    unknown: UnknownReferences,
}

impl<'a, T, F, I> Walk<'a, T, F>
where
    T: Clone + Eq + Hash + Display,
    F: Fn(&T) -> I,
    I: IntoIterator<Item = T>,
{
    fn visit(&mut self, element: &T) -> Result<()> {
        if !self.visited.insert(element.clone()) {
            return Ok(())
        }
        for reference in (self.references)(element) {
            if !self.known.contains(&reference) {
                match self.unknown {
                    UnknownReferences::Add => {}
                    UnknownReferences::Ignore => continue,
                    UnknownReferences::Throw => {
                        return Err(GenError::UnknownReference {
                            from: element.to_string(),
                            to: reference.to_string(),
                        })
                    }
                }
            }
            self.visit(&reference)?;
        }
        self.post_order.push(element.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn split(s: &str) -> Vec<String> {
        if s.is_empty() {
            return Vec::new()
        }
        s.split(',').map(str::to_string).collect()
    }

    fn sort_with(input: &str, references: &[(&str, &str)], unknown: UnknownReferences) -> Result<String> {
        let references = references
            .iter()
            .map(|(from, to)| (from.to_string(), split(to)))
            .collect::<HashMap<_, _>>();
        let sorted = topo_sort(
            &split(input),
            |x: &String| references.get(x).cloned().unwrap_or_default(),
            unknown,
        )?;
        Ok(sorted.join(","))
    }

    fn sort(input: &str, references: &[(&str, &str)]) -> String {
        sort_with(input, references, UnknownReferences::Throw).unwrap()
    }

    #[test]
    fn empty() {
        assert_eq!(sort("", &[]), "");
    }

    #[test]
    fn independent_elements_come_out_reversed() {
        assert_eq!(sort("A", &[]), "A");
        assert_eq!(sort("A,B,C", &[]), "C,B,A");
    }

    #[test]
    fn chain_order_is_independent_of_input_order() {
        let references = [("A", "A1"), ("A1", "A2")];
        for input in ["A,A1,A2", "A,A2,A1", "A1,A,A2", "A1,A2,A", "A2,A,A1", "A2,A1,A"] {
            assert_eq!(sort(input, &references), "A,A1,A2", "input {input}");
        }
    }

    #[test]
    fn diamond() {
        let references = [("A", "B"), ("B", "C1,C2"), ("C1", "D"), ("C2", "C1")];
        assert_eq!(sort("A,B,C1,D,C2", &references), "A,B,C2,C1,D");
        assert_eq!(sort("C2,B,C1,A,D", &references), "A,B,C2,C1,D");
    }

    #[test]
    fn cycles_terminate() {
        let references = [("A", "B"), ("B", "A")];
        assert_eq!(sort("A,B", &references), "A,B");
    }

    #[test]
    fn unknown_references() {
        let references = [("A", "B"), ("B", "X"), ("X", "Y")];
        assert_eq!(sort_with("A,B", &references, UnknownReferences::Add).unwrap(), "A,B,X,Y");
        assert_eq!(sort_with("A,B", &references, UnknownReferences::Ignore).unwrap(), "A,B");

        let error = sort_with("A,B", &references, UnknownReferences::Throw).unwrap_err();
        assert!(matches!(
            &error,
            GenError::UnknownReference { from, to } if from == "B" && to == "X"
        ));
        assert_eq!(error.to_string(), "Element 'B' references unknown element 'X'");
    }
}
