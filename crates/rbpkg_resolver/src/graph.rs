//! A minimal directed graph over opaque items, with a cycle-tolerant
//! topological iteration order.

use std::collections::HashMap;
use std::hash::Hash;

/// A directed graph whose vertices are identified by an opaque, hashable
/// item (a bundle name, in [`crate::engine::PendingInstall`]'s use).
///
/// Cycles are permitted: they never cause an error, and
/// [`DependencyGraph::iter_sorted`] is total over whatever has been added.
#[derive(Debug, Clone)]
pub struct DependencyGraph<T> {
    insertion_order: Vec<T>,
    indices: HashMap<T, usize>,
    edges: Vec<Vec<usize>>,
}

impl<T> Default for DependencyGraph<T> {
    fn default() -> Self {
        Self {
            insertion_order: Vec::new(),
            indices: HashMap::new(),
            edges: Vec::new(),
        }
    }
}

impl<T: Eq + Hash + Clone> DependencyGraph<T> {
    /// Construct an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotently creates a vertex for `item` (if it doesn't already
    /// exist) and appends an edge `item -> dep` for each of `deps`, also
    /// creating any dependency vertex that doesn't already exist.
    pub fn add(&mut self, item: T, deps: impl IntoIterator<Item = T>) {
        let idx = self.ensure_vertex(item);
        for dep in deps {
            let dep_idx = self.ensure_vertex(dep);
            self.edges[idx].push(dep_idx);
        }
    }

    /// Whether `item` has a vertex in this graph.
    pub fn contains(&self, item: &T) -> bool {
        self.indices.contains_key(item)
    }

    /// Returns every added item in dependency order: a vertex always
    /// comes after every dependency reachable from it that isn't part of
    /// a cycle back to it, and before whatever added it as a dependency.
    ///
    /// Implemented as an iterative, explicit-stack depth-first post-order
    /// traversal (so pathologically deep chains can't overflow the call
    /// stack), visiting roots in the order they were first inserted. A
    /// global visited set is shared across roots, so every vertex is
    /// yielded exactly once; because a vertex is marked visited before
    /// its own children are explored, a back-edge onto an
    /// already-visited ancestor is silently skipped rather than
    /// recursing forever.
    pub fn iter_sorted(&self) -> Vec<T> {
        let mut visited = vec![false; self.insertion_order.len()];
        let mut order = Vec::with_capacity(self.insertion_order.len());

        for root in 0..self.insertion_order.len() {
            if visited[root] {
                continue;
            }
            self.dfs_from(root, &mut visited, &mut order);
        }

        order
            .into_iter()
            .map(|idx| self.insertion_order[idx].clone())
            .collect()
    }

    fn dfs_from(&self, start: usize, visited: &mut [bool], order: &mut Vec<usize>) {
        // (vertex, index of the next outgoing edge to examine)
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
        visited[start] = true;

        while let Some(&mut (node, ref mut next_edge)) = stack.last_mut() {
            match self.edges[node].get(*next_edge) {
                Some(&child) => {
                    *next_edge += 1;
                    if !visited[child] {
                        visited[child] = true;
                        stack.push((child, 0));
                    }
                }
                None => {
                    order.push(node);
                    stack.pop();
                }
            }
        }
    }

    fn ensure_vertex(&mut self, item: T) -> usize {
        if let Some(&idx) = self.indices.get(&item) {
            return idx;
        }
        let idx = self.insertion_order.len();
        self.indices.insert(item.clone(), idx);
        self.insertion_order.push(item);
        self.edges.push(Vec::new());
        idx
    }
}
