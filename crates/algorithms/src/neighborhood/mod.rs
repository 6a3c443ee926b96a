//! Fixed-radius neighbor counting
//!
//! - **NeighborhoodIndex**: per-point count of other points within a radius,
//!   over the full set or the Marked-only view
//! - **marked_neighbor_counts**: per-point count of Marked neighbors over the
//!   full set
//! - **KdTree**: optional spatial index; gives the same counts as the
//!   brute-force scan

pub mod kdtree;

pub use kdtree::KdTree;

use crate::execution::ProcessingMode;
use serde::{Deserialize, Serialize};
use spatassoc_core::{Error, Point, PointSet, Result, Selection};
use tracing::debug;

/// How candidate neighbors are located
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NeighborSearch {
    /// O(n) scan per query point
    #[default]
    BruteForce,
    /// k-d tree radius query
    KdTree,
}

/// Parameters for neighbor scans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NeighborParams {
    /// Candidate search strategy
    pub search: NeighborSearch,
    /// Sequential or parallel outer loop
    pub mode: ProcessingMode,
}

/// Reject radii that are not finite and strictly positive.
pub fn validate_radius(radius: f64) -> Result<()> {
    if radius.is_finite() && radius > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidRadius { radius })
    }
}

/// Per-point neighbor counts for one view of a point set at one radius.
///
/// Built once, never patched: a different radius or view needs a new index.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborhoodIndex {
    selection: Selection,
    radius: f64,
    counts: Vec<usize>,
    corrected_count: usize,
}

impl NeighborhoodIndex {
    /// Count, for every point of the `selection` view, the other points of
    /// the same view within `radius` (inclusive).
    ///
    /// Position `k` of the index is the k-th point of the view in set order.
    pub fn build(
        points: &PointSet,
        selection: Selection,
        radius: f64,
        params: &NeighborParams,
    ) -> Result<Self> {
        validate_radius(radius)?;

        let view = points.subset(selection);
        let counts = count_within(&view, radius * radius, params, |_| true)?;
        let index = Self::from_counts(selection, radius, counts);

        debug!(
            view = ?selection,
            points = index.len(),
            corrected = index.corrected_count,
            radius,
            "neighborhood index built"
        );
        Ok(index)
    }

    pub(crate) fn from_counts(selection: Selection, radius: f64, counts: Vec<usize>) -> Self {
        let corrected_count = counts.iter().filter(|&&c| c > 0).count();
        Self {
            selection,
            radius,
            counts,
            corrected_count,
        }
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Number of points in the view
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Neighbor count of the i-th point of the view (self excluded)
    pub fn count(&self, i: usize) -> usize {
        self.counts[i]
    }

    pub fn has_neighbor(&self, i: usize) -> bool {
        self.counts[i] > 0
    }

    /// Number of points with at least one neighbor
    pub fn corrected_count(&self) -> usize {
        self.corrected_count
    }

    /// Number of points with no neighbor at all
    pub fn isolated_count(&self) -> usize {
        self.counts.len() - self.corrected_count
    }
}

/// For every point of the full set, the number of OTHER points within
/// `radius` that are Marked.
pub fn marked_neighbor_counts(
    points: &PointSet,
    radius: f64,
    params: &NeighborParams,
) -> Result<Vec<usize>> {
    validate_radius(radius)?;
    count_within(points.points(), radius * radius, params, |p| p.label.is_marked())
}

/// Locates points within a squared distance of a query point.
///
/// Both strategies report candidates in ascending index order and use the
/// same inclusive `dist_sq <= radius_sq` test.
pub(crate) enum RadiusLocator<'a> {
    BruteForce(&'a [Point]),
    Tree(KdTree),
}

impl<'a> RadiusLocator<'a> {
    pub(crate) fn new(points: &'a [Point], search: NeighborSearch) -> Self {
        match search {
            NeighborSearch::BruteForce => RadiusLocator::BruteForce(points),
            NeighborSearch::KdTree => RadiusLocator::Tree(KdTree::build(points)),
        }
    }

    pub(crate) fn for_each_within<F>(&self, query: &Point, radius_sq: f64, mut f: F)
    where
        F: FnMut(usize),
    {
        match self {
            RadiusLocator::BruteForce(points) => {
                for (j, p) in points.iter().enumerate() {
                    if query.dist_sq(p) <= radius_sq {
                        f(j);
                    }
                }
            }
            RadiusLocator::Tree(tree) => {
                for j in tree.within_radius_sq(query, radius_sq) {
                    f(j);
                }
            }
        }
    }
}

/// Count, for each point, the other points within `radius_sq` accepted by `scored`.
fn count_within<S>(
    points: &[Point],
    radius_sq: f64,
    params: &NeighborParams,
    scored: S,
) -> Result<Vec<usize>>
where
    S: Fn(&Point) -> bool + Sync,
{
    let locator = RadiusLocator::new(points, params.search);

    params.mode.map_indexed(0..points.len(), |i| {
        let mut count = 0;
        locator.for_each_within(&points[i], radius_sq, |j| {
            if j != i && scored(&points[j]) {
                count += 1;
            }
        });
        count
    })
}
