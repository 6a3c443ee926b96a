//! Full association analysis: neighbor indices → `a_AA` → variance → threshold
//!
//! One call per (point set, radius, alpha). Nothing is cached between calls;
//! the same inputs always produce bit-identical results.

use crate::association::association_statistic;
use crate::execution::available_threads;
use crate::neighborhood::{
    marked_neighbor_counts, validate_radius, NeighborParams, NeighborhoodIndex,
};
use crate::variance::{
    inverse_count_mean, pair_aggregates, threshold, validate_alpha, variance_terms,
    XtAccumulation,
};
use serde::{Deserialize, Serialize};
use spatassoc_core::{Algorithm, Error, PointSet, Result, Selection};
use tracing::{debug, info};

/// Parameters for the association analysis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociationParams {
    /// Neighborhood radius, in coordinate units
    pub radius: f64,
    /// Significance level used for the threshold
    pub alpha: f64,
    /// Neighbor search and processing mode
    pub neighbors: NeighborParams,
    /// Folding of lens counts into `xt`
    pub xt_accumulation: XtAccumulation,
}

impl Default for AssociationParams {
    fn default() -> Self {
        Self {
            radius: 1.0,
            alpha: 0.05,
            neighbors: NeighborParams::default(),
            xt_accumulation: XtAccumulation::default(),
        }
    }
}

impl AssociationParams {
    pub fn with_radius(radius: f64) -> Self {
        Self {
            radius,
            ..Default::default()
        }
    }
}

/// Intermediate quantities of one analysis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssociationDiagnostics {
    pub radius: f64,
    pub alpha: f64,
    /// All points in the set
    pub n_total: usize,
    /// Points with at least one neighbor (xnt)
    pub n_corrected: usize,
    /// Marked points (xna)
    pub n_marked: usize,
    pub s_na_nt: f64,
    pub ave1tot: f64,
    pub ave2tot: f64,
    pub xt: f64,
    pub non0: u64,
}

/// Result of an association analysis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssociationResult {
    /// Normalized same-label association statistic
    pub a_aa: f64,
    pub var1: f64,
    pub var2: f64,
    pub var3: f64,
    pub var4: f64,
    /// var1 + var2 + var3 + var4
    pub total_variance: f64,
    /// sqrt(total_variance / alpha)
    pub threshold: f64,
    pub diagnostics: AssociationDiagnostics,
}

impl AssociationResult {
    /// Column names of the flat output record
    pub const COLUMNS: [&'static str; 6] = ["a_AA", "Var1", "Var2", "Var3", "Var4", "q_AA_al"];

    /// Values in [`Self::COLUMNS`] order
    pub fn row(&self) -> [f64; 6] {
        [
            self.a_aa,
            self.var1,
            self.var2,
            self.var3,
            self.var4,
            self.threshold,
        ]
    }
}

/// Association analysis as an [`Algorithm`]
#[derive(Debug, Clone, Default)]
pub struct AssociationAnalysis;

impl Algorithm for AssociationAnalysis {
    type Input = PointSet;
    type Output = AssociationResult;
    type Params = AssociationParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Label Association (a_AA)"
    }

    fn description(&self) -> &'static str {
        "Radius-based same-label association statistic with design-based variance"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        association_analysis(&input, &params)
    }
}

/// Run the whole pipeline on a point set.
///
/// # Errors
/// - `InvalidRadius` for a non-positive or non-finite radius
/// - `InvalidParameter` for alpha outside (0, 1)
/// - `DegenerateInput` when fewer than 2 Marked or 2 Unmarked points exist,
///   fewer than 2 points have a neighbor, or a variance denominator vanishes
/// - `InconsistentNeighborState` if the neighbor counts contradict each other
pub fn association_analysis(
    points: &PointSet,
    params: &AssociationParams,
) -> Result<AssociationResult> {
    validate_radius(params.radius)?;
    validate_alpha(params.alpha)?;

    let n_marked = points.marked_count();
    let n_unmarked = points.unmarked_count();
    if n_marked < 2 || n_unmarked < 2 {
        return Err(Error::degenerate(format!(
            "need at least 2 marked and 2 unmarked points, got {} and {}",
            n_marked, n_unmarked
        )));
    }

    debug!(
        points = points.len(),
        marked = n_marked,
        radius = params.radius,
        mode = ?params.neighbors.mode,
        search = ?params.neighbors.search,
        threads = available_threads(),
        "starting association analysis"
    );

    let radius = params.radius;
    let full = NeighborhoodIndex::build(points, Selection::All, radius, &params.neighbors)?;
    if full.corrected_count() < 2 {
        return Err(Error::degenerate(format!(
            "need at least 2 points with a neighbor within {}, got {}",
            radius,
            full.corrected_count()
        )));
    }
    let marked = NeighborhoodIndex::build(points, Selection::Marked, radius, &params.neighbors)?;
    let marked_neighbors = marked_neighbor_counts(points, radius, &params.neighbors)?;

    let stat = association_statistic(points, &full, &marked, &marked_neighbors)?;
    let ave1tot = inverse_count_mean(&full)?;
    let pairs = pair_aggregates(points, &full, &params.neighbors, params.xt_accumulation)?;

    debug!(
        s_na_nt = stat.s_na_nt,
        ave1tot,
        ave2tot = pairs.ave2tot,
        xt = pairs.xt,
        non0 = pairs.non0,
        "aggregates computed"
    );

    let terms = variance_terms(stat.n_corrected, stat.n_marked, ave1tot, &pairs)?;
    let q = threshold(terms.total, params.alpha)?;

    info!(
        a_aa = stat.a_aa,
        total_variance = terms.total,
        threshold = q,
        "association analysis complete"
    );

    Ok(AssociationResult {
        a_aa: stat.a_aa,
        var1: terms.var1,
        var2: terms.var2,
        var3: terms.var3,
        var4: terms.var4,
        total_variance: terms.total,
        threshold: q,
        diagnostics: AssociationDiagnostics {
            radius,
            alpha: params.alpha,
            n_total: points.len(),
            n_corrected: stat.n_corrected,
            n_marked: stat.n_marked,
            s_na_nt: stat.s_na_nt,
            ave1tot,
            ave2tot: pairs.ave2tot,
            xt: pairs.xt,
            non0: pairs.non0,
        },
    })
}
