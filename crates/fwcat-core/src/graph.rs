//! # Extends Graph
//!
//! The explicit inheritance graph over definition names.
//!
//! An edge child → parent exists iff the child declares `extends: parent`.
//! Every node has at most one parent (single inheritance) and any number of
//! children. All adjacency is kept in `BTreeMap`s for deterministic ordering.

use crate::{CatalogError, DefinitionStore};
use std::collections::{BTreeMap, BTreeSet};

/// Visit state used by the topological walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Adjacency-by-name view of a [`DefinitionStore`].
#[derive(Debug, Clone, Default)]
pub struct ExtendsGraph {
    /// child -> parent (None for roots)
    parents: BTreeMap<String, Option<String>>,
    /// parent -> children
    children: BTreeMap<String, BTreeSet<String>>,
}

impl ExtendsGraph {
    /// Build the graph, failing on the first reference to a missing parent
    /// (in child-name order).
    pub fn from_store(store: &DefinitionStore) -> Result<Self, CatalogError> {
        let mut graph = Self::default();

        for definition in store.iter() {
            if let Some(parent) = &definition.extends {
                if !store.contains(parent) {
                    return Err(CatalogError::MissingParent {
                        child: definition.name.clone(),
                        parent: parent.clone(),
                    });
                }
                graph
                    .children
                    .entry(parent.clone())
                    .or_default()
                    .insert(definition.name.clone());
            }
            graph
                .parents
                .insert(definition.name.clone(), definition.extends.clone());
        }

        Ok(graph)
    }

    /// Direct parent of a node.
    #[must_use]
    pub fn parent_of(&self, name: &str) -> Option<&str> {
        self.parents.get(name).and_then(|p| p.as_deref())
    }

    /// Direct children of a node, in name order.
    pub fn children_of(&self, name: &str) -> impl Iterator<Item = &str> {
        self.children
            .get(name)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Nodes without a parent.
    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.parents
            .iter()
            .filter(|(_, parent)| parent.is_none())
            .map(|(name, _)| name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// Every node with parents strictly before children.
    ///
    /// Walks parent links from each node in name order. A node met again
    /// while still in progress closes a cycle; the error lists the members
    /// of that cycle in chain order, starting from the first one reached.
    pub fn topological_order(&self) -> Result<Vec<String>, CatalogError> {
        let mut marks: BTreeMap<&str, Mark> = BTreeMap::new();
        let mut order = Vec::with_capacity(self.parents.len());

        for start in self.parents.keys() {
            let mut path: Vec<&str> = Vec::new();
            let mut current = Some(start.as_str());

            while let Some(name) = current {
                match marks.get(name) {
                    Some(Mark::Done) => break,
                    Some(Mark::InProgress) => {
                        let from = path.iter().position(|n| *n == name).unwrap_or(0);
                        let cycle = path[from..].iter().map(|n| (*n).to_string()).collect();
                        return Err(CatalogError::CyclicExtends(cycle));
                    }
                    None => {
                        marks.insert(name, Mark::InProgress);
                        path.push(name);
                        current = self.parent_of(name);
                    }
                }
            }

            // Path runs child -> ancestor; emit ancestors first.
            for name in path.into_iter().rev() {
                marks.insert(name, Mark::Done);
                order.push(name.to_string());
            }
        }

        Ok(order)
    }

    /// Ancestors of a node, root first. Assumes an acyclic graph; stops if a
    /// cycle is met rather than looping.
    #[must_use]
    pub fn ancestors(&self, name: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut seen = BTreeSet::from([name]);
        let mut current = self.parent_of(name);

        while let Some(parent) = current {
            if !seen.insert(parent) {
                break;
            }
            chain.push(parent.to_string());
            current = self.parent_of(parent);
        }

        chain.reverse();
        chain
    }
}

// =============================================================================
// TESTS
// =============================================================================
