//! Append-only arena of RRT nodes linked by parent index.

use serde::{Deserialize, Serialize};

use super::geometry::Point;

/// A node in the RRT tree
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RrtNode {
    /// X position
    pub x: f64,
    /// Y position
    pub y: f64,
    /// Index of parent node in the tree (None for root)
    pub parent: Option<usize>,
}

impl RrtNode {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, parent: None }
    }

    pub fn with_parent(x: f64, y: f64, parent: usize) -> Self {
        Self {
            x,
            y,
            parent: Some(parent),
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    fn distance_squared_to(&self, p: &Point) -> f64 {
        let dx = self.x - p.x;
        let dy = self.y - p.y;
        dx * dx + dy * dy
    }
}

/// Ordered node store; index 0 is the root and every other node points at
/// a strictly earlier index.
#[derive(Debug, Clone)]
pub struct RrtTree {
    nodes: Vec<RrtNode>,
}

impl RrtTree {
    /// Create a tree holding only the root
    pub fn new(root: Point) -> Self {
        Self {
            nodes: vec![RrtNode::new(root.x, root.y)],
        }
    }

    pub fn with_capacity(root: Point, capacity: usize) -> Self {
        let mut nodes = Vec::with_capacity(capacity.max(1));
        nodes.push(RrtNode::new(root.x, root.y));
        Self { nodes }
    }

    /// Append a node under `parent` and return its index.
    ///
    /// Panics if `parent` does not reference an existing node, since that
    /// would break the backward-reference invariant.
    pub fn push(&mut self, p: Point, parent: usize) -> usize {
        assert!(
            parent < self.nodes.len(),
            "parent index {} out of range for tree of {} nodes",
            parent,
            self.nodes.len()
        );
        self.nodes.push(RrtNode::with_parent(p.x, p.y, parent));
        self.nodes.len() - 1
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the root is never removed
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[RrtNode] {
        &self.nodes
    }

    pub fn root(&self) -> &RrtNode {
        &self.nodes[0]
    }

    /// Most recently appended node
    pub fn frontier(&self) -> (usize, &RrtNode) {
        let index = self.nodes.len() - 1;
        (index, &self.nodes[index])
    }

    /// Find the node nearest to `p` by squared Euclidean distance.
    ///
    /// Ties go to the lowest index.
    pub fn nearest(&self, p: &Point) -> (usize, &RrtNode) {
        let mut min_dist = f64::INFINITY;
        let mut nearest_idx = 0;

        for (i, node) in self.nodes.iter().enumerate() {
            let dist = node.distance_squared_to(p);
            if dist < min_dist {
                min_dist = dist;
                nearest_idx = i;
            }
        }

        (nearest_idx, &self.nodes[nearest_idx])
    }

    /// Extract the path from the root to the last node (backtrack then reverse).
    ///
    /// Panics if the parent chain does not reach the root within `len()`
    /// steps or points forward; either means the tree invariant was broken.
    pub fn extract_path(&self) -> Vec<RrtNode> {
        let mut path = Vec::new();
        let mut current_idx = self.nodes.len() - 1;

        loop {
            if path.len() >= self.nodes.len() {
                panic!(
                    "invariant violation: parent chain from node {} does not reach the root within {} steps",
                    self.nodes.len() - 1,
                    self.nodes.len()
                );
            }
            let node = &self.nodes[current_idx];
            path.push(*node);

            match node.parent {
                Some(parent_idx) if parent_idx < current_idx => current_idx = parent_idx,
                Some(parent_idx) => panic!(
                    "invariant violation: node {} references non-earlier parent {}",
                    current_idx, parent_idx
                ),
                None if current_idx == 0 => break,
                None => panic!(
                    "invariant violation: parentless node {} is not the root",
                    current_idx
                ),
            }
        }

        path.reverse();
        path
    }

    /// Consume the tree, yielding its nodes
    pub fn into_nodes(self) -> Vec<RrtNode> {
        self.nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_tree() -> RrtTree {
        let mut tree = RrtTree::new(Point::new(0.0, 0.0));
        let a = tree.push(Point::new(1.0, 0.0), 0);
        let b = tree.push(Point::new(2.0, 0.0), a);
        tree.push(Point::new(0.0, 5.0), 0);
        tree.push(Point::new(3.0, 0.0), b);
        tree
    }

    #[test]
    fn test_tree_starts_with_root() {
        let tree = RrtTree::new(Point::new(1.5, 2.5));
        assert_eq!(tree.len(), 1);
        assert!(!tree.is_empty());
        assert_eq!(tree.root().parent, None);
        assert_eq!(tree.root().x, 1.5);
        assert_eq!(tree.frontier().0, 0);
    }

    #[test]
    fn test_push_returns_index_and_links_parent() {
        let tree = chain_tree();
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.nodes()[2].parent, Some(1));
        assert_eq!(tree.frontier().0, 4);
        for (i, node) in tree.nodes().iter().enumerate().skip(1) {
            assert!(node.parent.unwrap() < i);
        }
    }

    #[test]
    #[should_panic]
    fn test_push_rejects_forward_parent() {
        let mut tree = RrtTree::new(Point::new(0.0, 0.0));
        tree.push(Point::new(1.0, 1.0), 3);
    }

    #[test]
    fn test_nearest_picks_closest() {
        let tree = chain_tree();
        let (idx, node) = tree.nearest(&Point::new(0.2, 4.0));
        assert_eq!(idx, 3);
        assert_eq!(node.y, 5.0);
    }

    #[test]
    fn test_nearest_breaks_ties_by_lowest_index() {
        let mut tree = RrtTree::new(Point::new(-1.0, 0.0));
        tree.push(Point::new(1.0, 0.0), 0);
        let (idx, _) = tree.nearest(&Point::new(0.0, 0.0));
        assert_eq!(idx, 0);
    }

    #[test]
    fn test_nearest_is_idempotent() {
        let tree = chain_tree();
        let p = Point::new(2.4, 0.3);
        assert_eq!(tree.nearest(&p).0, tree.nearest(&p).0);
    }

    #[test]
    fn test_extract_path_runs_root_to_last() {
        let tree = chain_tree();
        let path = tree.extract_path();
        let xs: Vec<f64> = path.iter().map(|n| n.x).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(path[0].parent, None);
    }

    #[test]
    fn test_extract_path_on_root_only() {
        let tree = RrtTree::new(Point::new(4.0, 4.0));
        let path = tree.extract_path();
        assert_eq!(path.len(), 1);
    }

    #[test]
    #[should_panic(expected = "invariant violation")]
    fn test_extract_path_detects_corruption() {
        let mut tree = chain_tree();
        tree.nodes[2].parent = Some(4);
        tree.extract_path();
    }
}
