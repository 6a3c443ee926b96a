//! Design-based variance of `a_AA`
//!
//! Under the null hypothesis the labels are a uniformly random permutation
//! over fixed locations. The variance of `a_AA` is then a finite-population
//! sum of four terms built from the full-set neighbor counts:
//!
//! - `ave1tot`: mean of `1 / n_i` over points with a neighbor
//! - `ave2tot`: sum of `1 / (n_i n_j)` over neighboring pairs
//! - `xt`: sum of `niv / (n_i n_j)` over pairs closer than `2r`, where `niv`
//!   counts the third points inside the lens of the pair
//! - `non0`: number of pairs whose points both have a neighbor
//!
//! Summation order: pair terms are accumulated row by row (ascending `i`,
//! then ascending `j`), whatever the processing mode or neighbor search.

use crate::neighborhood::{NeighborParams, NeighborhoodIndex, RadiusLocator};
use serde::{Deserialize, Serialize};
use spatassoc_core::{Error, Point, PointSet, Result, Selection};

/// How lens counts are folded into `xt`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum XtAccumulation {
    /// Each pair adds `(third points in lens) / (n_i n_j)` once
    #[default]
    Single,
    /// Reproduces the reference tables exactly: each pair adds its term
    /// twice, and pairs farther apart than `r` count the pair's own two
    /// points in `niv`
    Legacy,
}

/// Pairwise and triple-wise aggregates over the full set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairAggregates {
    pub ave2tot: f64,
    pub xt: f64,
    pub non0: u64,
}

/// The four variance components and their sum
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VarianceTerms {
    pub var1: f64,
    pub var2: f64,
    pub var3: f64,
    pub var4: f64,
    pub total: f64,
}

/// `ave1tot`: sum of `1 / n_i` over points with a neighbor, divided by the
/// number of such points.
pub fn inverse_count_mean(full: &NeighborhoodIndex) -> Result<f64> {
    if full.corrected_count() == 0 {
        return Err(Error::degenerate("no point has a neighbor"));
    }

    let mut sum = 0.0;
    for &n in full.counts() {
        if n > 0 {
            sum += 1.0 / n as f64;
        }
    }
    Ok(sum / full.corrected_count() as f64)
}

/// Per-row contributions, kept in accumulation order
#[derive(Debug, Default)]
struct RowTerms {
    ave2: Vec<f64>,
    xt: Vec<f64>,
}

/// Compute `ave2tot`, `xt` and `non0` over all pairs `i < j` of the full set
/// whose points both have at least one neighbor.
///
/// `full` must be the full-set index of `points`; its radius is used.
/// The lens search for `niv` scans every point of the set, including
/// isolated ones.
pub fn pair_aggregates(
    points: &PointSet,
    full: &NeighborhoodIndex,
    params: &NeighborParams,
    accumulation: XtAccumulation,
) -> Result<PairAggregates> {
    if full.selection() != Selection::All || full.len() != points.len() {
        return Err(Error::InvalidParameter {
            name: "full",
            value: format!("{:?} view of {} points", full.selection(), full.len()),
            reason: "expected a full-set index of the analyzed points".into(),
        });
    }

    let pts = points.points();
    let counts = full.counts();
    let radius = full.radius();
    let radius_sq = radius * radius;
    let reach_sq = 4.0 * radius * radius;
    let locator = RadiusLocator::new(pts, params.search);

    let rows = params.mode.map_indexed(0..pts.len(), |i| {
        let mut row = RowTerms::default();
        let ni = counts[i];
        if ni == 0 {
            return row;
        }

        locator.for_each_within(&pts[i], reach_sq, |j| {
            let nj = counts[j];
            if j <= i || nj == 0 {
                return;
            }

            let dd = pts[i].dist_sq(&pts[j]);
            let third = lens_third_points(&locator, pts, i, j, dd);
            let term = |niv: usize| niv as f64 / ni as f64 / nj as f64;

            if dd <= radius_sq {
                row.ave2.push(1.0 / ni as f64 / nj as f64);
                match accumulation {
                    XtAccumulation::Single => row.xt.push(term(third)),
                    XtAccumulation::Legacy => {
                        row.xt.push(term(third));
                        row.xt.push(term(third));
                    }
                }
            } else {
                match accumulation {
                    XtAccumulation::Single => row.xt.push(term(third)),
                    XtAccumulation::Legacy => {
                        // The pair's own two points count in this range
                        row.xt.push(term(third + 2));
                        row.xt.push(term(third + 2));
                    }
                }
            }
        });
        row
    })?;

    let mut ave2tot = 0.0;
    let mut xt = 0.0;
    for row in &rows {
        for t in &row.ave2 {
            ave2tot += t;
        }
        for t in &row.xt {
            xt += t;
        }
    }

    Ok(PairAggregates {
        ave2tot,
        xt,
        non0: pair_count(full.corrected_count()),
    })
}

/// `c (c - 1) / 2`, in 64 bits so large sets don't overflow a 32-bit `usize`.
fn pair_count(c: usize) -> u64 {
    let c = c as u64;
    c * c.saturating_sub(1) / 2
}

/// Points `k` other than `i` and `j` within `sqrt(dd)` of both `i` and `j`.
fn lens_third_points(
    locator: &RadiusLocator<'_>,
    pts: &[Point],
    i: usize,
    j: usize,
    dd: f64,
) -> usize {
    let mut n = 0;
    locator.for_each_within(&pts[i], dd, |k| {
        if k != i && k != j && pts[j].dist_sq(&pts[k]) <= dd {
            n += 1;
        }
    });
    n
}

/// Combine the aggregates into the four variance terms.
///
/// `xnt` is the full-set corrected count, `xna` the number of Marked points.
pub fn variance_terms(
    xnt: usize,
    xna: usize,
    ave1tot: f64,
    pairs: &PairAggregates,
) -> Result<VarianceTerms> {
    if xnt == 2 || xnt == 3 {
        return Err(Error::degenerate(format!(
            "variance needs xnt - 2 and xnt - 3 non-zero, xnt = {}",
            xnt
        )));
    }
    if xna == 0 || xna == 1 {
        return Err(Error::degenerate(format!(
            "variance needs xna and xna - 1 non-zero, xna = {}",
            xna
        )));
    }
    if pairs.non0 == 0 {
        return Err(Error::degenerate("no pair of points with neighbors"));
    }

    let xnt = xnt as f64;
    let xna = xna as f64;
    let non0 = pairs.non0 as f64;

    let var1 = -(xnt - xna) / (xnt - 2.0) / (xna - 1.0);

    let v2 = (xnt - 1.0) * (xnt - xna) / xna / (xna - 1.0) / (xnt - 2.0);
    let var2 = v2 * ave1tot;

    let v3 = (xnt - 1.0) * (xnt - 1.0) * (xnt - xna) * (xnt - xna - 1.0)
        / (xnt - 2.0)
        / (xnt - 3.0)
        / xna
        / (xna - 1.0);
    let var3 = v3 * pairs.ave2tot / non0;

    let v4 = (xnt - 1.0) * (xnt - 1.0) * (xnt - xna) * (xna - 2.0)
        / (xnt - 2.0)
        / (xnt - 3.0)
        / xna
        / (xna - 1.0);
    let var4 = v4 * pairs.xt / non0;

    let total = var1 + var2 + var3 + var4;

    Ok(VarianceTerms {
        var1,
        var2,
        var3,
        var4,
        total,
    })
}

/// Reject significance levels outside `(0, 1)`.
pub fn validate_alpha(alpha: f64) -> Result<()> {
    if alpha > 0.0 && alpha < 1.0 {
        Ok(())
    } else {
        Err(Error::InvalidParameter {
            name: "alpha",
            value: alpha.to_string(),
            reason: "significance level must be in (0, 1)".into(),
        })
    }
}

/// `sqrt(total / alpha)`, the value `a_AA` is compared against.
pub fn threshold(total_variance: f64, alpha: f64) -> Result<f64> {
    validate_alpha(alpha)?;
    if !total_variance.is_finite() || total_variance < 0.0 {
        return Err(Error::degenerate(format!(
            "total variance {} has no square root",
            total_variance
        )));
    }
    Ok((total_variance / alpha).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::ProcessingMode;
    use crate::neighborhood::NeighborSearch;
    use approx::assert_relative_eq;
    use spatassoc_core::Label;

    /// Five points on a line, unit spacing; Marked = first three.
    fn line() -> PointSet {
        PointSet::new(vec![
            Point::marked(0.0, 0.0),
            Point::marked(1.0, 0.0),
            Point::marked(2.0, 0.0),
            Point::unmarked(3.0, 0.0),
            Point::unmarked(4.0, 0.0),
        ])
        .unwrap()
    }

    fn full(points: &PointSet, radius: f64) -> NeighborhoodIndex {
        NeighborhoodIndex::build(points, Selection::All, radius, &NeighborParams::default())
            .unwrap()
    }

    /// 120 scattered points on a coarse lattice, every third Marked
    fn jittered() -> PointSet {
        PointSet::new(
            (0..120)
                .map(|i| {
                    let x = ((i * 37 + 11) % 53) as f64 * 0.31;
                    let y = ((i * 29 + 5) % 47) as f64 * 0.27;
                    let label = if i % 3 == 0 { Label::Marked } else { Label::Unmarked };
                    Point::new(x, y, label)
                })
                .collect(),
        )
        .unwrap()
    }

    /// Plain triple loop over all pairs `i < j`, folding `xt` the legacy way:
    /// lens counts start at -2 inside `r` and at 0 up to `2r`, and every pair
    /// adds its term twice.
    fn legacy_triple_loop(pts: &[Point], counts: &[usize], radius: f64) -> (f64, f64) {
        let reach_sq = 4.0 * radius * radius;
        let mut ave2tot = 0.0;
        let mut xt = 0.0;

        for i in 0..pts.len().saturating_sub(1) {
            for j in i + 1..pts.len() {
                let ni = counts[i] as f64;
                let nj = counts[j] as f64;
                if ni * nj <= 0.0 {
                    continue;
                }

                let dd = pts[i].dist_sq(&pts[j]);
                let lens = |start: i64| {
                    let mut niv = start;
                    for k in pts {
                        if pts[i].dist_sq(k) <= dd && pts[j].dist_sq(k) <= dd {
                            niv += 1;
                        }
                    }
                    niv
                };

                let niv = if dd <= radius * radius {
                    ave2tot += 1.0 / ni / nj;
                    let niv = lens(-2);
                    xt += niv as f64 / ni / nj;
                    niv
                } else if dd <= reach_sq {
                    let niv = lens(0);
                    xt += niv as f64 / ni / nj;
                    niv
                } else {
                    0
                };
                xt += niv as f64 / ni / nj;
            }
        }
        (ave2tot, xt)
    }

    #[test]
    fn test_inverse_count_mean() {
        let pts = line();
        // counts [1, 2, 2, 2, 1] -> (1 + 0.5 * 3 + 1) / 5
        let ave1 = inverse_count_mean(&full(&pts, 1.0)).unwrap();
        assert_relative_eq!(ave1, 0.7, epsilon = 1e-15);
    }

    #[test]
    fn test_inverse_count_mean_skips_isolated() {
        let idx = NeighborhoodIndex::from_counts(Selection::All, 1.0, vec![0, 2, 4, 0]);
        assert_relative_eq!(inverse_count_mean(&idx).unwrap(), 0.375);

        let empty = NeighborhoodIndex::from_counts(Selection::All, 1.0, vec![0, 0]);
        assert!(matches!(
            inverse_count_mean(&empty),
            Err(Error::DegenerateInput { .. })
        ));
    }

    #[test]
    fn test_pair_aggregates_line() {
        let pts = line();
        let idx = full(&pts, 1.0);
        let agg = pair_aggregates(&pts, &idx, &NeighborParams::default(), XtAccumulation::Single)
            .unwrap();

        assert_eq!(agg.non0, 10);
        // adjacent pairs: 1/2 + 1/4 + 1/4 + 1/2
        assert_relative_eq!(agg.ave2tot, 1.5, epsilon = 1e-15);
        // distance-2 pairs each hold their midpoint: 1/2 + 1/4 + 1/2
        assert_relative_eq!(agg.xt, 1.25, epsilon = 1e-15);
    }

    #[test]
    fn test_pair_aggregates_legacy() {
        let pts = line();
        let idx = full(&pts, 1.0);
        let agg = pair_aggregates(&pts, &idx, &NeighborParams::default(), XtAccumulation::Legacy)
            .unwrap();

        assert_relative_eq!(agg.ave2tot, 1.5, epsilon = 1e-15);
        // distance-2 pairs count 3 lens points, added twice
        assert_relative_eq!(agg.xt, 7.5, epsilon = 1e-15);
    }

    #[test]
    fn test_lens_third_point() {
        // Equilateral-ish triangle: the apex lies in the lens of the base pair
        let pts = PointSet::new(vec![
            Point::marked(0.0, 0.0),
            Point::marked(2.0, 0.0),
            Point::unmarked(1.0, 1.0),
            Point::unmarked(1.0, -3.0),
        ])
        .unwrap();
        let idx = full(&pts, 2.0);
        assert_eq!(idx.counts(), &[2, 2, 2, 0]);

        let agg = pair_aggregates(&pts, &idx, &NeighborParams::default(), XtAccumulation::Single)
            .unwrap();
        assert_eq!(agg.non0, 3);
        assert_relative_eq!(agg.ave2tot, 0.75, epsilon = 1e-15);
        // only the (0, 1) pair has a third point (2) in its lens
        assert_relative_eq!(agg.xt, 0.25, epsilon = 1e-15);
    }

    #[test]
    fn test_pair_aggregates_strategies_bit_identical() {
        let pts = jittered();
        let idx = full(&pts, 1.2);

        for accumulation in [XtAccumulation::Single, XtAccumulation::Legacy] {
            let reference = pair_aggregates(
                &pts,
                &idx,
                &NeighborParams {
                    search: NeighborSearch::BruteForce,
                    mode: ProcessingMode::Sequential,
                },
                accumulation,
            )
            .unwrap();

            for search in [NeighborSearch::BruteForce, NeighborSearch::KdTree] {
                for mode in [ProcessingMode::Parallel, ProcessingMode::ParallelWith(2)] {
                    let params = NeighborParams { search, mode };
                    let agg = pair_aggregates(&pts, &idx, &params, accumulation).unwrap();
                    assert_eq!(agg.ave2tot.to_bits(), reference.ave2tot.to_bits());
                    assert_eq!(agg.xt.to_bits(), reference.xt.to_bits());
                    assert_eq!(agg.non0, reference.non0);
                }
            }
        }
    }

    #[test]
    fn test_legacy_matches_triple_loop() {
        let pts = jittered();
        for radius in [0.6, 1.2, 2.5] {
            let idx = full(&pts, radius);
            let (ave2tot, xt) = legacy_triple_loop(pts.points(), idx.counts(), radius);

            for search in [NeighborSearch::BruteForce, NeighborSearch::KdTree] {
                let params = NeighborParams {
                    search,
                    mode: ProcessingMode::Parallel,
                };
                let agg = pair_aggregates(&pts, &idx, &params, XtAccumulation::Legacy).unwrap();
                assert_eq!(agg.ave2tot.to_bits(), ave2tot.to_bits(), "r={} {:?}", radius, search);
                assert_eq!(agg.xt.to_bits(), xt.to_bits(), "r={} {:?}", radius, search);
            }
        }
    }

    #[test]
    fn test_lens_skips_pair_but_keeps_coincident_points() {
        // Point 2 sits on top of point 0 and lies in the lens of (0, 1)
        let pts = vec![
            Point::marked(0.0, 0.0),
            Point::marked(1.0, 0.0),
            Point::unmarked(0.0, 0.0),
            Point::unmarked(0.5, 0.5),
        ];
        for search in [NeighborSearch::BruteForce, NeighborSearch::KdTree] {
            let locator = RadiusLocator::new(&pts, search);
            assert_eq!(lens_third_points(&locator, &pts, 0, 1, 1.0), 2);
            assert_eq!(lens_third_points(&locator, &pts, 0, 2, 0.0), 0);
        }
    }

    #[test]
    fn test_pair_count() {
        assert_eq!(pair_count(0), 0);
        assert_eq!(pair_count(1), 0);
        assert_eq!(pair_count(5), 10);
        assert_eq!(pair_count(100_000), 4_999_950_000);
    }

    #[test]
    fn test_variance_terms_line() {
        let agg = PairAggregates {
            ave2tot: 1.5,
            xt: 1.25,
            non0: 10,
        };
        let v = variance_terms(5, 3, 0.7, &agg).unwrap();
        assert_relative_eq!(v.var1, -1.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(v.var2, 2.8 / 9.0, epsilon = 1e-12);
        assert_relative_eq!(v.var3, 2.0 / 15.0, epsilon = 1e-12);
        assert_relative_eq!(v.var4, 1.0 / 9.0, epsilon = 1e-12);
        assert_relative_eq!(v.total, 2.0 / 9.0, epsilon = 1e-12);
    }

    #[test]
    fn test_variance_zero_denominators() {
        let agg = PairAggregates {
            ave2tot: 1.0,
            xt: 1.0,
            non0: 3,
        };
        for (xnt, xna) in [(2, 2), (3, 2), (5, 1), (5, 0)] {
            assert!(
                matches!(
                    variance_terms(xnt, xna, 0.5, &agg),
                    Err(Error::DegenerateInput { .. })
                ),
                "xnt={} xna={}",
                xnt,
                xna
            );
        }
        let none = PairAggregates { non0: 0, ..agg };
        assert!(variance_terms(5, 2, 0.5, &none).is_err());
    }

    #[test]
    fn test_threshold() {
        let expected = (40.0_f64 / 9.0).sqrt();
        assert_relative_eq!(threshold(2.0 / 9.0, 0.05).unwrap(), expected, epsilon = 1e-12);
        assert_relative_eq!(threshold(0.0, 0.05).unwrap(), 0.0);
        assert!(matches!(threshold(-0.1, 0.05), Err(Error::DegenerateInput { .. })));
        assert!(matches!(threshold(f64::NAN, 0.05), Err(Error::DegenerateInput { .. })));
        assert!(matches!(
            threshold(1.0, 0.0),
            Err(Error::InvalidParameter { name: "alpha", .. })
        ));
        assert!(threshold(1.0, 1.0).is_err());
    }
}
