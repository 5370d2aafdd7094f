//! Hierarchical roll-up
//!
//! A parent/child tree (geographic divisions, HIP taxonomy) stored as an
//! arena: nodes in a flat `Vec`, links as indices. Construction validates the
//! tree once; traversals are iterative so deep trees cannot overflow the stack.
//!
//! `rolled_up(n) = own(n) + Σ rolled_up(child)` with missing own values as 0.

pub mod divisions;
pub mod hip;

use crate::{HeError, HeResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::ops::Add;

/// Input node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyNode {
    pub id: String,
    pub parent_id: Option<String>,
    pub name: String,
}

impl HierarchyNode {
    pub fn new(id: impl Into<String>, parent_id: Option<&str>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id: parent_id.map(str::to_string),
            name: name.into(),
        }
    }
}

/// Node with its own and rolled-up value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationNode<V> {
    pub id: String,
    pub parent_id: Option<String>,
    pub name: String,
    pub own_value: V,
    pub rolled_up_value: V,
}

/// Validated, acyclic forest
#[derive(Debug, Clone)]
pub struct Hierarchy {
    nodes: Vec<HierarchyNode>,
    index: HashMap<String, usize>,
    parents: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
}

impl Hierarchy {
    /// Build and validate
    ///
    /// Fails on duplicate ids, parents that are not in the node set, and
    /// cycles (any node unreachable from a root lies on or below a cycle).
    pub fn build(nodes: Vec<HierarchyNode>) -> HeResult<Self> {
        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.id.clone(), i).is_some() {
                return Err(HeError::InvalidHierarchy(format!("duplicate node id '{}'", node.id)));
            }
        }

        let mut parents = vec![None; nodes.len()];
        let mut children = vec![Vec::new(); nodes.len()];
        let mut roots = Vec::new();
        for (i, node) in nodes.iter().enumerate() {
            match &node.parent_id {
                None => roots.push(i),
                Some(parent) => {
                    let p = *index.get(parent).ok_or_else(|| {
                        HeError::InvalidHierarchy(format!(
                            "node '{}' references unknown parent '{}'",
                            node.id, parent
                        ))
                    })?;
                    parents[i] = Some(p);
                    children[p].push(i);
                }
            }
        }

        let hierarchy = Self {
            nodes,
            index,
            parents,
            children,
            roots,
        };
        hierarchy.check_acyclic()?;
        Ok(hierarchy)
    }

    fn check_acyclic(&self) -> HeResult<()> {
        let n = self.nodes.len();
        let mut reached = vec![false; n];
        let mut stack: Vec<usize> = self.roots.clone();
        while let Some(node) = stack.pop() {
            reached[node] = true;
            stack.extend(self.children[node].iter().copied());
        }

        let Some(start) = reached.iter().position(|r| !r) else {
            return Ok(());
        };

        // Follow parent links from the unreached node until one repeats; that
        // node is on the cycle.
        let mut seen = vec![false; n];
        let mut node = start;
        while !seen[node] {
            seen[node] = true;
            match self.parents[node] {
                Some(p) => node = p,
                None => break,
            }
        }
        Err(HeError::CyclicHierarchy {
            node: self.nodes[node].id.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&HierarchyNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn nodes(&self) -> &[HierarchyNode] {
        &self.nodes
    }

    pub fn roots(&self) -> impl Iterator<Item = &HierarchyNode> {
        self.roots.iter().map(|&i| &self.nodes[i])
    }

    pub fn children_of(&self, id: &str) -> Vec<&HierarchyNode> {
        self.index
            .get(id)
            .map(|&i| self.children[i].iter().map(|&c| &self.nodes[c]).collect())
            .unwrap_or_default()
    }

    /// Distance from the root (roots are 0)
    pub fn depth(&self, id: &str) -> Option<usize> {
        let mut node = *self.index.get(id)?;
        let mut depth = 0;
        while let Some(p) = self.parents[node] {
            node = p;
            depth += 1;
        }
        Some(depth)
    }

    /// Node indices with every child before its parent
    fn post_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        for &root in &self.roots {
            let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
            while let Some((node, next_child)) = stack.pop() {
                if let Some(&child) = self.children[node].get(next_child) {
                    stack.push((node, next_child + 1));
                    stack.push((child, 0));
                } else {
                    order.push(node);
                }
            }
        }
        order
    }

    fn rolled_up_values<V, F>(&self, own_value_of: F) -> (Vec<V>, Vec<V>)
    where
        V: Copy + Default + Add<Output = V>,
        F: Fn(&HierarchyNode) -> Option<V>,
    {
        let own: Vec<V> = self.nodes.iter().map(|n| own_value_of(n).unwrap_or_default()).collect();
        let mut rolled = own.clone();
        for node in self.post_order() {
            if let Some(p) = self.parents[node] {
                rolled[p] = rolled[p] + rolled[node];
            }
        }
        (own, rolled)
    }

    /// Rolled-up value per node id
    pub fn aggregate<V, F>(&self, own_value_of: F) -> BTreeMap<String, V>
    where
        V: Copy + Default + Add<Output = V>,
        F: Fn(&HierarchyNode) -> Option<V>,
    {
        let (_, rolled) = self.rolled_up_values(own_value_of);
        self.nodes.iter().map(|n| n.id.clone()).zip(rolled).collect()
    }

    /// Own and rolled-up value per node, in input order
    pub fn rollup<V, F>(&self, own_value_of: F) -> Vec<AggregationNode<V>>
    where
        V: Copy + Default + Add<Output = V>,
        F: Fn(&HierarchyNode) -> Option<V>,
    {
        let (own, rolled) = self.rolled_up_values(own_value_of);
        self.nodes
            .iter()
            .zip(own)
            .zip(rolled)
            .map(|((node, own_value), rolled_up_value)| AggregationNode {
                id: node.id.clone(),
                parent_id: node.parent_id.clone(),
                name: node.name.clone(),
                own_value,
                rolled_up_value,
            })
            .collect()
    }
}

/// Build a hierarchy and roll up own values keyed by node id
pub fn aggregate<V>(nodes: Vec<HierarchyNode>, own_values: &HashMap<String, V>) -> HeResult<BTreeMap<String, V>>
where
    V: Copy + Default + Add<Output = V>,
{
    let hierarchy = Hierarchy::build(nodes)?;
    Ok(hierarchy.aggregate(|n| own_values.get(&n.id).copied()))
}
