//! Category hierarchy resolution.
//!
//! Walks the externally-owned category tree to produce ancestor chains,
//! descendant sets, and the full list of scopes whose grants apply to an
//! object. Corrupted trees that loop back on themselves are reported as
//! [`Error::CyclicHierarchy`] instead of being walked forever.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use futures::future::try_join_all;
use uuid::Uuid;

use crate::directory::CategoryTree;
use crate::error::{Error, Graph, Result};
use crate::types::Aco;
use crate::INTEGRITY_LOG_TARGET;

/// An object whose grants apply to the object being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InheritedScope {
    /// Steps from the resolved object: 0 is the object itself, 1 a category
    /// it is filed in (or a category's parent), and so on up the tree.
    pub distance: usize,
    /// The object carrying grants.
    pub aco: Aco,
}

/// Resolves ancestor chains over a [`CategoryTree`].
#[derive(Clone)]
pub struct HierarchyResolver {
    tree: Arc<dyn CategoryTree>,
}

impl HierarchyResolver {
    /// Wrap a category tree.
    pub fn new(tree: Arc<dyn CategoryTree>) -> Self {
        Self { tree }
    }

    /// Ancestors of `category`, nearest parent first, root last.
    pub async fn ancestors(&self, category: Uuid) -> Result<Vec<Uuid>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::from([category]);
        let mut current = category;

        while let Some(parent) = self.tree.parent_of(current).await? {
            if !seen.insert(parent) {
                return Err(cycle(category, parent));
            }
            chain.push(parent);
            current = parent;
        }
        Ok(chain)
    }

    /// Categories `resource` is filed in, sorted and deduplicated.
    pub async fn categories_of(&self, resource: Uuid) -> Result<Vec<Uuid>> {
        let mut categories = self.tree.categories_of(resource).await?;
        categories.sort();
        categories.dedup();
        Ok(categories)
    }

    /// Every category beneath `category`, breadth first.
    ///
    /// A node reached twice means the tree is not a tree.
    pub async fn descendants(&self, category: Uuid) -> Result<Vec<Uuid>> {
        let mut out = Vec::new();
        let mut seen = HashSet::from([category]);
        let mut frontier = vec![category];

        while !frontier.is_empty() {
            let children = try_join_all(frontier.iter().map(|c| self.tree.children_of(*c))).await?;
            let mut next = Vec::new();
            for child in children.into_iter().flatten() {
                if !seen.insert(child) {
                    return Err(cycle(category, child));
                }
                out.push(child);
                next.push(child);
            }
            frontier = next;
        }
        Ok(out)
    }

    /// Every scope whose grants apply to `aco`, nearest first.
    ///
    /// For a resource: the resource, each category it is filed in, and each
    /// of those categories' ancestors. For a category: the category and its
    /// ancestors. A scope reachable along several paths keeps its shortest
    /// distance.
    pub async fn inherited_scopes(&self, aco: Aco) -> Result<Vec<InheritedScope>> {
        let (roots, base) = match aco {
            Aco::Resource(id) => (self.categories_of(id).await?, 1),
            Aco::Category(id) => (vec![id], 0),
        };

        let chains = try_join_all(roots.iter().map(|c| self.ancestors(*c))).await?;

        let mut distances: BTreeMap<Aco, usize> = BTreeMap::new();
        distances.insert(aco, 0);
        for (root, chain) in roots.iter().zip(chains) {
            let path = std::iter::once(*root).chain(chain);
            for (step, category) in path.enumerate() {
                let distance = base + step;
                distances
                    .entry(Aco::Category(category))
                    .and_modify(|d| *d = (*d).min(distance))
                    .or_insert(distance);
            }
        }

        let mut scopes: Vec<InheritedScope> = distances
            .into_iter()
            .map(|(aco, distance)| InheritedScope { distance, aco })
            .collect();
        scopes.sort();
        Ok(scopes)
    }
}

fn cycle(start: Uuid, at: Uuid) -> Error {
    log::error!(
        target: INTEGRITY_LOG_TARGET,
        "category tree is cyclic: walking from {start} revisited {at}"
    );
    Error::CyclicHierarchy {
        graph: Graph::Category,
        id: at,
    }
}
