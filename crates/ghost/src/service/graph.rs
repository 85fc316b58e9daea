//! Logical issue structure using petgraph.
//!
//! [`IssueGraph`] is built from a storage snapshot and holds the hierarchy
//! and the dependency edges independently of where records live on disk.
//! Nodes are issue ids in a petgraph arena; `node_map` indexes them by id.
//!
//! # Edge Direction
//!
//! - [`Link::DependsOn`]: dependent -> dependency
//! - [`Link::ChildOf`]: child -> parent
//!
//! Edges to ids missing from the snapshot are dropped when the graph is built.

use crate::domain::{Issue, IssueId};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet};

/// Kind of relation between two issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    /// Source depends on target
    DependsOn,
    /// Source is a child of target
    ChildOf,
}

/// Arena of issues plus an id index.
#[derive(Debug, Default)]
pub struct IssueGraph {
    graph: DiGraph<IssueId, Link>,
    node_map: HashMap<IssueId, NodeIndex>,
}

impl IssueGraph {
    /// Build the graph for a snapshot of issues.
    pub fn from_issues(issues: &[Issue]) -> Self {
        let mut graph = DiGraph::with_capacity(issues.len(), issues.len());
        let mut node_map = HashMap::with_capacity(issues.len());
        for issue in issues {
            let node = graph.add_node(issue.id.clone());
            node_map.insert(issue.id.clone(), node);
        }

        for issue in issues {
            let source = node_map[&issue.id];
            if let Some(parent) = issue.parent_id.as_ref().and_then(|p| node_map.get(p)) {
                graph.add_edge(source, *parent, Link::ChildOf);
            }
            for dependency in &issue.depends_on {
                if let Some(target) = node_map.get(dependency) {
                    graph.add_edge(source, *target, Link::DependsOn);
                }
            }
        }

        Self { graph, node_map }
    }

    /// Whether `id` is part of the snapshot.
    pub fn contains(&self, id: &IssueId) -> bool {
        self.node_map.contains_key(id)
    }

    /// Number of issues in the snapshot.
    pub fn len(&self) -> usize {
        self.node_map.len()
    }

    /// Whether the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.node_map.is_empty()
    }

    /// Current parent of `id`.
    pub fn parent(&self, id: &IssueId) -> Option<&IssueId> {
        let node = *self.node_map.get(id)?;
        self.graph
            .edges(node)
            .find(|edge| *edge.weight() == Link::ChildOf)
            .map(|edge| &self.graph[edge.target()])
    }

    /// Direct children of `id`, in ascending id order.
    pub fn children(&self, id: &IssueId) -> Vec<IssueId> {
        self.neighbors(id, Link::ChildOf, Direction::Incoming)
    }

    /// Direct dependencies of `id`, in ascending id order.
    pub fn dependencies(&self, id: &IssueId) -> Vec<IssueId> {
        self.neighbors(id, Link::DependsOn, Direction::Outgoing)
    }

    /// Parent chain of `id`, nearest first.
    ///
    /// Stops at the first repeated id so a corrupted (cyclic) chain terminates.
    pub fn ancestors(&self, id: &IssueId) -> Vec<IssueId> {
        let mut chain = Vec::new();
        let mut seen = HashSet::from([id.clone()]);
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            if !seen.insert(parent.clone()) {
                break;
            }
            chain.push(parent.clone());
            current = parent;
        }
        chain
    }

    /// Whether `candidate` is `id` itself or one of its ancestors.
    pub fn is_self_or_ancestor(&self, candidate: &IssueId, id: &IssueId) -> bool {
        candidate == id || self.ancestors(id).contains(candidate)
    }

    /// Hierarchy level of `id`; a root issue is at level 1.
    pub fn level(&self, id: &IssueId) -> usize {
        self.ancestors(id).len() + 1
    }

    /// Number of levels in the subtree rooted at `id`; a leaf has height 1.
    pub fn subtree_height(&self, id: &IssueId) -> usize {
        let mut seen = HashSet::new();
        self.height(id, &mut seen)
    }

    fn height(&self, id: &IssueId, seen: &mut HashSet<IssueId>) -> usize {
        if !seen.insert(id.clone()) {
            return 0;
        }
        1 + self
            .children(id)
            .iter()
            .map(|child| self.height(child, seen))
            .max()
            .unwrap_or(0)
    }

    /// All descendants of `id` in post-order (children before their parent).
    pub fn descendants_post_order(&self, id: &IssueId) -> Vec<IssueId> {
        let mut order = Vec::new();
        let mut seen = HashSet::from([id.clone()]);
        self.collect_post_order(id, &mut seen, &mut order);
        order
    }

    fn collect_post_order(
        &self,
        id: &IssueId,
        seen: &mut HashSet<IssueId>,
        order: &mut Vec<IssueId>,
    ) {
        for child in self.children(id) {
            if seen.insert(child.clone()) {
                self.collect_post_order(&child, seen, order);
                order.push(child);
            }
        }
    }

    /// The cycle that adding `issue -> depends_on` would close, if any.
    ///
    /// The returned path starts and ends at `issue`:
    /// `[issue, depends_on, ..., issue]`. A self-dependency yields `[issue, issue]`.
    pub fn cycle_through(&self, issue: &IssueId, depends_on: &IssueId) -> Option<Vec<IssueId>> {
        if issue == depends_on {
            return Some(vec![issue.clone(), issue.clone()]);
        }
        let path = self.dependency_path(depends_on, issue)?;
        let mut cycle = Vec::with_capacity(path.len() + 1);
        cycle.push(issue.clone());
        cycle.extend(path);
        Some(cycle)
    }

    /// A path `from -> ... -> to` over dependency edges, if `to` is reachable.
    ///
    /// Iterative depth-first search that explores dependencies in ascending id
    /// order, so the same graph always yields the same path.
    pub fn dependency_path(&self, from: &IssueId, to: &IssueId) -> Option<Vec<IssueId>> {
        let start = *self.node_map.get(from)?;
        let goal = *self.node_map.get(to)?;
        if start == goal {
            return Some(vec![from.clone()]);
        }

        let mut visited = HashSet::from([start]);
        let mut path = vec![start];
        let mut frontier = vec![self.pending_dependencies(start)];

        while let Some(pending) = frontier.last_mut() {
            match pending.pop() {
                Some(next) if next == goal => {
                    path.push(next);
                    return Some(path.iter().map(|node| self.graph[*node].clone()).collect());
                }
                Some(next) => {
                    if visited.insert(next) {
                        path.push(next);
                        frontier.push(self.pending_dependencies(next));
                    }
                }
                None => {
                    frontier.pop();
                    path.pop();
                }
            }
        }
        None
    }

    /// Dependencies of `node` ordered so that `pop()` yields the smallest id first.
    fn pending_dependencies(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut targets: Vec<NodeIndex> = self
            .graph
            .edges(node)
            .filter(|edge| *edge.weight() == Link::DependsOn)
            .map(|edge| edge.target())
            .collect();
        targets.sort_by(|a, b| self.graph[*b].cmp(&self.graph[*a]));
        targets.dedup();
        targets
    }

    fn neighbors(&self, id: &IssueId, link: Link, direction: Direction) -> Vec<IssueId> {
        let Some(&node) = self.node_map.get(id) else {
            return Vec::new();
        };
        let mut ids: Vec<IssueId> = self
            .graph
            .edges_directed(node, direction)
            .filter(|edge| *edge.weight() == link)
            .map(|edge| {
                let other = match direction {
                    Direction::Outgoing => edge.target(),
                    Direction::Incoming => edge.source(),
                };
                self.graph[other].clone()
            })
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }
}
