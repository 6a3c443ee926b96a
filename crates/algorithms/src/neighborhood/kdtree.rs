//! 2D k-d tree for fixed-radius point queries
//!
//! Replaces the O(n) scan per query of the brute-force neighbor search with
//! an O(log n + m) descent for point sets that are sparse relative to the
//! radius.
//!
//! Reference:
//! Bentley, J.L. (1975). Multidimensional binary search trees used
//! for associative searching. CACM, 18(9).

use spatassoc_core::Point;

/// A 2D k-d tree over a slice of points.
///
/// Query results are indices into the slice the tree was built from.
#[derive(Debug)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    points: Vec<Point>,
}

#[derive(Debug)]
struct KdNode {
    /// Index into `points`
    point_idx: usize,
    /// Split dimension: 0 = x, 1 = y
    split_dim: u8,
    left: Option<usize>,
    right: Option<usize>,
}

impl KdTree {
    /// Build a k-d tree from points.
    ///
    /// Construction is O(n log² n) using median-of-coordinate splitting.
    pub fn build(points: &[Point]) -> Self {
        let mut nodes = Vec::with_capacity(points.len());
        if !points.is_empty() {
            let mut indices: Vec<usize> = (0..points.len()).collect();
            build_recursive(points, &mut indices, 0, &mut nodes);
        }

        Self {
            nodes,
            points: points.to_vec(),
        }
    }

    /// Number of points in the tree.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the tree is empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Indices of all points `p` with `query.dist_sq(p) <= radius_sq`,
    /// in ascending order.
    ///
    /// The comparison is inclusive and uses the same distance expression as
    /// a brute-force scan, so both return identical sets.
    pub fn within_radius_sq(&self, query: &Point, radius_sq: f64) -> Vec<usize> {
        let mut results = Vec::new();
        if self.nodes.is_empty() || radius_sq < 0.0 {
            return results;
        }

        self.radius_recursive(0, query, radius_sq, &mut results);
        results.sort_unstable();
        results
    }

    fn radius_recursive(
        &self,
        node_idx: usize,
        query: &Point,
        radius_sq: f64,
        results: &mut Vec<usize>,
    ) {
        let node = &self.nodes[node_idx];
        let p = &self.points[node.point_idx];

        if query.dist_sq(p) <= radius_sq {
            results.push(node.point_idx);
        }

        let diff = if node.split_dim == 0 {
            query.x - p.x
        } else {
            query.y - p.y
        };

        // Left holds coordinates <= the split: always visit the query's own
        // side, the other one only when the splitting line is within reach
        if let Some(left) = node.left
            && (diff <= 0.0 || diff * diff <= radius_sq)
        {
            self.radius_recursive(left, query, radius_sq, results);
        }

        if let Some(right) = node.right
            && (diff >= 0.0 || diff * diff <= radius_sq)
        {
            self.radius_recursive(right, query, radius_sq, results);
        }
    }
}

/// Recursively build the k-d tree, returning the index of the subtree root.
fn build_recursive(
    points: &[Point],
    indices: &mut [usize],
    depth: usize,
    nodes: &mut Vec<KdNode>,
) -> usize {
    let split_dim = (depth % 2) as u8;
    let coord = |i: usize| {
        if split_dim == 0 {
            points[i].x
        } else {
            points[i].y
        }
    };

    indices.sort_by(|&a, &b| coord(a).total_cmp(&coord(b)));

    let median = indices.len() / 2;
    let node_idx = nodes.len();
    nodes.push(KdNode {
        point_idx: indices[median],
        split_dim,
        left: None,
        right: None,
    });

    let (lower, rest) = indices.split_at_mut(median);
    let upper = &mut rest[1..];

    if !lower.is_empty() {
        let left_idx = build_recursive(points, lower, depth + 1, nodes);
        nodes[node_idx].left = Some(left_idx);
    }

    if !upper.is_empty() {
        let right_idx = build_recursive(points, upper, depth + 1, nodes);
        nodes[node_idx].right = Some(right_idx);
    }

    node_idx
}
