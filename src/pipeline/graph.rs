//! Message graph arena and the canonical-path walker.
//!
//! Nodes live in a flat arena addressed by index; parent and child links
//! are indices, never owning pointers. Every traversal here is iterative
//! and tracks visited nodes, so malformed input (dangling parents, cycles,
//! duplicate ids) always terminates.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::model::NormalizedMessage;
use crate::pipeline::branch::{BranchCandidate, BranchPolicy, LatestBranchPolicy};

/// One node of a raw conversation graph, after message normalization.
#[derive(Debug, Clone, Default)]
pub struct RawNode {
    pub id: String,
    /// `None` for sentinel roots and messages that failed normalization.
    pub message: Option<NormalizedMessage>,
    pub parent_id: Option<String>,
    pub children_ids: Vec<String>,
}

#[derive(Debug)]
struct ArenaNode {
    id: String,
    message: Option<NormalizedMessage>,
    /// Tree children in declared order (each node has exactly one tree parent).
    children: Vec<usize>,
    /// Latest message timestamp in this node's subtree.
    latest: Option<DateTime<Utc>>,
    /// Longest downward path length, counting this node.
    height: usize,
}

/// Index-addressed forest built from raw nodes.
#[derive(Debug, Default)]
pub struct NodeArena {
    nodes: Vec<ArenaNode>,
    roots: Vec<usize>,
}

impl NodeArena {
    /// Resolve links and derive the spanning forest.
    ///
    /// - A node's parent is its `parent_id` when that resolves; a dangling
    ///   `parent_id` makes the node a root. Nodes without `parent_id` adopt
    ///   the first node listing them as a child.
    /// - Children are the declared `children_ids` that agree with the
    ///   resolved parent, followed by undeclared nodes pointing at it.
    /// - Roots are discovered in input order. Components with no root
    ///   (cycles) are broken at their first node in input order.
    pub fn build(raw: Vec<RawNode>) -> Self {
        let mut index: HashMap<String, usize> = HashMap::with_capacity(raw.len());
        let mut kept: Vec<RawNode> = Vec::with_capacity(raw.len());
        for node in raw {
            if index.contains_key(&node.id) {
                warn!(node = %node.id, "Duplicate node id, keeping first occurrence");
                continue;
            }
            index.insert(node.id.clone(), kept.len());
            kept.push(node);
        }
        let n = kept.len();

        let mut claimed: Vec<Option<usize>> = vec![None; n];
        for (i, node) in kept.iter().enumerate() {
            for child in &node.children_ids {
                if let Some(&c) = index.get(child)
                    && c != i
                    && claimed[c].is_none()
                {
                    claimed[c] = Some(i);
                }
            }
        }

        let parent: Vec<Option<usize>> = kept
            .iter()
            .enumerate()
            .map(|(i, node)| match node.parent_id.as_deref() {
                Some(pid) => match index.get(pid) {
                    Some(&p) if p != i => Some(p),
                    Some(_) => None,
                    None => {
                        warn!(node = %node.id, parent = %pid, "Dangling parent reference, treating node as a root");
                        None
                    }
                },
                None => claimed[i],
            })
            .collect();

        // Declared children first, then undeclared ones in input order.
        let mut links: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (i, node) in kept.iter().enumerate() {
            for child in &node.children_ids {
                if let Some(&c) = index.get(child)
                    && parent[c] == Some(i)
                    && !links[i].contains(&c)
                {
                    links[i].push(c);
                }
            }
        }
        for (c, p) in parent.iter().enumerate() {
            if let Some(p) = *p
                && !links[p].contains(&c)
            {
                links[p].push(c);
            }
        }

        let mut visited = vec![false; n];
        let mut tree_children: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut preorder: Vec<usize> = Vec::with_capacity(n);
        let mut roots: Vec<usize> = (0..n).filter(|&i| parent[i].is_none()).collect();

        let mut span = |root: usize, visited: &mut Vec<bool>| {
            let mut stack = vec![root];
            visited[root] = true;
            while let Some(cur) = stack.pop() {
                preorder.push(cur);
                for &c in links[cur].iter().rev() {
                    if !visited[c] {
                        visited[c] = true;
                        tree_children[cur].push(c);
                        stack.push(c);
                    }
                }
                tree_children[cur].reverse();
            }
        };

        for &root in &roots {
            span(root, &mut visited);
        }
        while let Some(start) = (0..n).find(|&i| !visited[i]) {
            warn!(node = %kept[start].id, "Cycle in message graph, breaking it at this node");
            roots.push(start);
            span(start, &mut visited);
        }

        let mut latest: Vec<Option<DateTime<Utc>>> = kept
            .iter()
            .map(|node| node.message.as_ref().and_then(|m| m.created_at))
            .collect();
        let mut height = vec![1usize; n];
        for &i in preorder.iter().rev() {
            for &c in &tree_children[i] {
                latest[i] = latest[i].max(latest[c]);
                height[i] = height[i].max(height[c] + 1);
            }
        }

        let nodes = kept
            .into_iter()
            .zip(tree_children)
            .enumerate()
            .map(|(i, (node, children))| ArenaNode {
                id: node.id,
                message: node.message,
                children,
                latest: latest[i],
                height: height[i],
            })
            .collect();

        Self { nodes, roots }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Root ids in discovery order.
    pub fn root_ids(&self) -> Vec<&str> {
        self.roots.iter().map(|&r| self.nodes[r].id.as_str()).collect()
    }
}

/// Resolves the canonical path through a node arena.
pub struct GraphWalker {
    policy: Box<dyn BranchPolicy>,
}

impl Default for GraphWalker {
    fn default() -> Self {
        Self::new(Box::new(LatestBranchPolicy::default()))
    }
}

impl GraphWalker {
    pub fn new(policy: Box<dyn BranchPolicy>) -> Self {
        Self { policy }
    }

    pub fn policy_name(&self) -> &str {
        self.policy.name()
    }

    /// One message sequence per root, in root-discovery order.
    pub fn walk_roots(&self, arena: &NodeArena) -> Vec<Vec<NormalizedMessage>> {
        arena
            .roots
            .iter()
            .map(|&root| self.walk_from(arena, root))
            .collect()
    }

    /// The canonical path: every root's sequence, concatenated in
    /// root-discovery order.
    ///
    /// Roots are not reordered by time. When a later-discovered root holds
    /// older messages, `created_at` along the path is not monotonic across
    /// the seam; within one root it follows the reply chain.
    pub fn walk(&self, arena: &NodeArena) -> Vec<NormalizedMessage> {
        self.walk_roots(arena).into_iter().flatten().collect()
    }

    fn walk_from(&self, arena: &NodeArena, root: usize) -> Vec<NormalizedMessage> {
        let mut path = Vec::new();
        let mut seen = HashSet::new();
        let mut cur = root;

        while seen.insert(cur) {
            let node = &arena.nodes[cur];
            if let Some(message) = &node.message {
                path.push(message.clone());
            }

            cur = match node.children.as_slice() {
                [] => break,
                [only] => *only,
                children => {
                    let candidates: Vec<BranchCandidate<'_>> = children
                        .iter()
                        .enumerate()
                        .map(|(position, &c)| BranchCandidate {
                            node_id: &arena.nodes[c].id,
                            position,
                            latest: arena.nodes[c].latest,
                            height: arena.nodes[c].height,
                        })
                        .collect();
                    let pick = self.policy.select(&candidates).min(children.len() - 1);
                    debug!(
                        node = %node.id,
                        policy = self.policy.name(),
                        chosen = %arena.nodes[children[pick]].id,
                        discarded = children.len() - 1,
                        "Selected branch"
                    );
                    children[pick]
                }
            };
        }

        path
    }
}
