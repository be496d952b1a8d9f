//! Dependency ordering of source units by `require` edges.
//!
//! Units live in a tree under a virtual root. A unit's position is its
//! index path from the root, and paths compare lexicographically, so a
//! parent always sorts before its children. Each sweep looks at every
//! require edge `unit -> dependency`:
//!
//! - if `unit` already sorts after `dependency`, nothing happens;
//! - if `dependency` is inside `unit`'s subtree, `dependency` is lifted out
//!   and placed directly in front of `unit`;
//! - otherwise `unit` (with its subtree) is re-parented as the last child of
//!   `dependency`.
//!
//! Sweeps repeat until nothing moves. Require cycles never settle, so the
//! number of sweeps is capped and running past the cap is reported as
//! [`OrderError::CycleDetected`].

use std::collections::BTreeMap;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error("require cycle suspected: ordering did not settle within {limit} sweeps; units still out of order: {}", units.join(", "))]
    CycleDetected { limit: usize, units: Vec<String> },
}

pub type OrderResult<T> = Result<T, OrderError>;

/// A settled ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyOrder {
    /// Unit ids, dependencies first.
    pub order: Vec<String>,
    /// Sweeps it took to settle.
    pub iterations: usize,
}

/// Index of the virtual root in the arena.
const ROOT: usize = 0;

#[derive(Debug, Clone)]
struct Node {
    parent: usize,
    children: Vec<usize>,
}

/// Arena tree of units. Node `i + 1` is unit `i`.
#[derive(Debug)]
struct OrderTree {
    nodes: Vec<Node>,
}

impl OrderTree {
    fn new(unit_count: usize) -> Self {
        let mut nodes = Vec::with_capacity(unit_count + 1);
        nodes.push(Node {
            parent: ROOT,
            children: (1..=unit_count).collect(),
        });
        for _ in 0..unit_count {
            nodes.push(Node {
                parent: ROOT,
                children: Vec::new(),
            });
        }
        OrderTree { nodes }
    }

    fn path(&self, mut node: usize) -> Vec<usize> {
        let mut path = Vec::new();
        while node != ROOT {
            let parent = self.nodes[node].parent;
            let index = self.nodes[parent]
                .children
                .iter()
                .position(|&c| c == node)
                .unwrap_or(0);
            path.push(index);
            node = parent;
        }
        path.reverse();
        path
    }

    fn is_descendant(&self, mut node: usize, ancestor: usize) -> bool {
        while node != ROOT {
            node = self.nodes[node].parent;
            if node == ancestor {
                return true;
            }
        }
        false
    }

    fn detach(&mut self, node: usize) {
        let parent = self.nodes[node].parent;
        self.nodes[parent].children.retain(|&c| c != node);
    }

    fn append_child(&mut self, parent: usize, node: usize) {
        self.detach(node);
        self.nodes[parent].children.push(node);
        self.nodes[node].parent = parent;
    }

    fn insert_before(&mut self, sibling: usize, node: usize) {
        self.detach(node);
        let parent = self.nodes[sibling].parent;
        let index = self.nodes[parent]
            .children
            .iter()
            .position(|&c| c == sibling)
            .unwrap_or(0);
        self.nodes[parent].children.insert(index, node);
        self.nodes[node].parent = parent;
    }

    fn preorder(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.nodes.len() - 1);
        let mut stack: Vec<usize> = self.nodes[ROOT].children.iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.nodes[node].children.iter().rev().copied());
        }
        out
    }
}

/// Resolve a require path to a unit index: exact module key, else a unit
/// whose key ends with `/path`. Ids are expected sorted so the first match
/// is deterministic.
pub fn resolve_require(ids: &[String], require: &str) -> Option<usize> {
    let suffix = format!("/{}", require);
    ids.iter()
        .position(|id| id == require)
        .or_else(|| ids.iter().position(|id| id.ends_with(&suffix)))
}

/// Order `units` (id, required paths) so each unit follows what it requires.
///
/// Unresolvable requires and self-requires are ignored.
pub fn order_units(units: &[(String, Vec<String>)], max_iterations: usize) -> OrderResult<DependencyOrder> {
    let ids: Vec<String> = units.iter().map(|(id, _)| id.clone()).collect();
    let mut edges: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (i, (_, requires)) in units.iter().enumerate() {
        for require in requires {
            match resolve_require(&ids, require) {
                Some(dep) if dep != i => edges.entry(i).or_default().push(dep),
                Some(_) => {}
                None => tracing::debug!("{}: require {} not found among units", ids[i], require),
            }
        }
    }

    let mut tree = OrderTree::new(units.len());
    let mut iterations = 0;
    loop {
        let mut moved = false;
        for (&unit, deps) in &edges {
            let node = unit + 1;
            for &dep in deps {
                let dep_node = dep + 1;
                if tree.path(node) > tree.path(dep_node) {
                    continue;
                }
                if tree.is_descendant(dep_node, node) {
                    tree.insert_before(node, dep_node);
                } else {
                    tree.append_child(dep_node, node);
                }
                moved = true;
            }
        }
        if !moved {
            break;
        }
        iterations += 1;
        if iterations > max_iterations {
            let mut stuck: Vec<String> = edges
                .iter()
                .filter(|(unit, deps)| {
                    let node = **unit + 1;
                    deps.iter().any(|&dep| tree.path(node) <= tree.path(dep + 1))
                })
                .map(|(unit, _)| ids[*unit].clone())
                .collect();
            stuck.sort();
            return Err(OrderError::CycleDetected {
                limit: max_iterations,
                units: stuck,
            });
        }
    }

    Ok(DependencyOrder {
        order: tree.preorder().into_iter().map(|node| ids[node - 1].clone()).collect(),
        iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `(id, "space separated requires")` pairs.
    fn units(spec: &[(&str, &str)]) -> Vec<(String, Vec<String>)> {
        spec.iter()
            .map(|(id, reqs)| {
                let reqs = reqs.split_whitespace().map(str::to_string).collect();
                (id.to_string(), reqs)
            })
            .collect()
    }

    fn position(order: &[String], id: &str) -> usize {
        order.iter().position(|o| o == id).unwrap()
    }

    #[test]
    fn test_no_requires_keeps_input_order() {
        let result = order_units(&units(&[("a", ""), ("b", ""), ("c", "")]), 10).unwrap();
        assert_eq!(result.order, vec!["a", "b", "c"]);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_dependencies_come_first() {
        let input = units(&[
            ("client/A", "shared/C"),
            ("client/B", "A"),
            ("shared/C", ""),
        ]);
        let result = order_units(&input, 20).unwrap();
        let order = &result.order;
        assert_eq!(order.len(), 3);
        assert!(position(order, "shared/C") < position(order, "client/A"));
        assert!(position(order, "client/A") < position(order, "client/B"));
    }

    #[test]
    fn test_chain_against_input_order() {
        let input = units(&[("a", "b"), ("b", "c"), ("c", "d"), ("d", "")]);
        let result = order_units(&input, 50).unwrap();
        assert_eq!(result.order, vec!["d", "c", "b", "a"]);
    }

    #[test]
    fn test_diamond() {
        let input = units(&[
            ("app", "left right"),
            ("base", ""),
            ("left", "base"),
            ("right", "base"),
        ]);
        let result = order_units(&input, 20).unwrap();
        let order = &result.order;
        assert_eq!(order.len(), 4);
        assert_eq!(order[0], "base");
        assert!(position(order, "left") < position(order, "app"));
        assert!(position(order, "right") < position(order, "app"));
    }

    #[test]
    fn test_cap_counts_only_moving_sweeps() {
        let input = units(&[("a", "b"), ("b", "")]);
        let result = order_units(&input, 1).unwrap();
        assert_eq!(result.order, vec!["b", "a"]);
        assert_eq!(result.iterations, 1);
    }

    #[test]
    fn test_cycle_detected() {
        let input = units(&[("a", "b"), ("b", "a"), ("c", "")]);
        let err = order_units(&input, 8).unwrap_err();
        let OrderError::CycleDetected { limit, units } = err;
        assert_eq!(limit, 8);
        assert!(units.contains(&"a".to_string()) || units.contains(&"b".to_string()));
        assert!(!units.contains(&"c".to_string()));
    }

    #[test]
    fn test_resolve_require_suffix() {
        let ids = vec!["client/ISUI/ISPanel".to_string(), "shared/ISUI/ISPanel".to_string()];
        assert_eq!(resolve_require(&ids, "ISUI/ISPanel"), Some(0));
        assert_eq!(resolve_require(&ids, "shared/ISUI/ISPanel"), Some(1));
        assert_eq!(resolve_require(&ids, "Panel"), None);
        assert_eq!(resolve_require(&ids, "UI/ISPanel"), None);
    }
}
