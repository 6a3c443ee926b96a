//! Same-label association statistic
//!
//! For every Marked point the share of its neighbors that are Marked is
//! averaged into `S_NA_NT`, then rescaled by the population sizes into
//! `a_AA`:
//!
//! ```text
//! a_AA = (N_corrected - 1) * S_NA_NT / (N_marked - 1)
//! ```
//!
//! `a_AA` near 1 means Marked points see Marked neighbors at the overall
//! Marked frequency; above 1 suggests attraction, below 1 repulsion.

use crate::neighborhood::NeighborhoodIndex;
use serde::{Deserialize, Serialize};
use spatassoc_core::{Error, PointSet, Result, Selection};

/// Observed association between Marked points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationStatistic {
    /// Mean Marked-neighbor share over Marked points
    pub s_na_nt: f64,
    /// Normalized statistic
    pub a_aa: f64,
    /// Full-set points with at least one neighbor
    pub n_corrected: usize,
    /// Number of Marked points
    pub n_marked: usize,
    /// Per-Marked-point share, in set order
    pub ratios: Vec<f64>,
}

/// Compute `S_NA_NT` and `a_AA`.
///
/// # Arguments
/// * `points` - The analyzed point set
/// * `full` - Neighbor counts over the full set
/// * `marked` - Neighbor counts over the Marked-only view
/// * `marked_neighbors` - Full-set count of Marked neighbors per point
///
/// A Marked point with no neighbor at all contributes a share of exactly 1.
pub fn association_statistic(
    points: &PointSet,
    full: &NeighborhoodIndex,
    marked: &NeighborhoodIndex,
    marked_neighbors: &[usize],
) -> Result<AssociationStatistic> {
    check_shapes(points, full, marked, marked_neighbors)?;

    let n_marked = marked.len();
    if n_marked < 2 {
        return Err(Error::degenerate(format!(
            "need at least 2 marked points, got {}",
            n_marked
        )));
    }
    let n_corrected = full.corrected_count();
    if n_corrected < 2 {
        return Err(Error::degenerate(format!(
            "need at least 2 points with a neighbor, got {}",
            n_corrected
        )));
    }

    let mut ratios = Vec::with_capacity(n_marked);
    for (k, i) in points.marked_indices().into_iter().enumerate() {
        let total = full.count(i);
        let same = marked_neighbors[i];

        if marked.count(k) != same {
            return Err(Error::InconsistentNeighborState {
                index: i,
                detail: format!(
                    "marked-only index counts {} marked neighbors, full-set scan counts {}",
                    marked.count(k),
                    same
                ),
            });
        }

        let ratio = if total > 0 {
            same as f64 / total as f64
        } else if same == 0 {
            1.0
        } else {
            return Err(Error::InconsistentNeighborState {
                index: i,
                detail: format!("no neighbors but {} marked neighbors", same),
            });
        };
        ratios.push(ratio);
    }

    let mut sum = 0.0;
    for r in &ratios {
        sum += r;
    }
    let s_na_nt = sum / n_marked as f64;
    let a_aa = (n_corrected as f64 - 1.0) * s_na_nt / (n_marked as f64 - 1.0);

    Ok(AssociationStatistic {
        s_na_nt,
        a_aa,
        n_corrected,
        n_marked,
        ratios,
    })
}

fn check_shapes(
    points: &PointSet,
    full: &NeighborhoodIndex,
    marked: &NeighborhoodIndex,
    marked_neighbors: &[usize],
) -> Result<()> {
    let mismatch = |name: &'static str, value: String, reason: &str| Error::InvalidParameter {
        name,
        value,
        reason: reason.into(),
    };

    if full.selection() != Selection::All || full.len() != points.len() {
        return Err(mismatch(
            "full",
            format!("{:?} view of {} points", full.selection(), full.len()),
            "expected a full-set index of the analyzed points",
        ));
    }
    if marked.selection() != Selection::Marked || marked.len() != points.marked_count() {
        return Err(mismatch(
            "marked",
            format!("{:?} view of {} points", marked.selection(), marked.len()),
            "expected a Marked-only index of the analyzed points",
        ));
    }
    if marked_neighbors.len() != points.len() {
        return Err(mismatch(
            "marked_neighbors",
            marked_neighbors.len().to_string(),
            "expected one count per point",
        ));
    }
    Ok(())
}
