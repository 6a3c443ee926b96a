//! Labeled 2-D point patterns

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Binary classification of a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    /// Member of the sub-population under test (e.g. stem cells)
    Marked,
    /// Every other point
    Unmarked,
}

impl Label {
    /// Map a classification string to a label.
    ///
    /// Surrounding whitespace is ignored on both sides, the comparison itself
    /// is exact. Anything other than `marked_class` is `Unmarked`.
    ///
    /// ```
    /// use spatassoc_core::Label;
    ///
    /// assert_eq!(Label::from_classification(" Positive ", "Positive"), Label::Marked);
    /// assert_eq!(Label::from_classification("Negative", "Positive"), Label::Unmarked);
    /// ```
    pub fn from_classification(value: &str, marked_class: &str) -> Self {
        if value.trim() == marked_class.trim() {
            Label::Marked
        } else {
            Label::Unmarked
        }
    }

    /// The opposite label
    pub fn swapped(self) -> Self {
        match self {
            Label::Marked => Label::Unmarked,
            Label::Unmarked => Label::Marked,
        }
    }

    #[inline]
    pub fn is_marked(self) -> bool {
        self == Label::Marked
    }
}

/// A labeled point (e.g. a cell centroid).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub label: Label,
}

impl Point {
    pub fn new(x: f64, y: f64, label: Label) -> Self {
        Self { x, y, label }
    }

    pub fn marked(x: f64, y: f64) -> Self {
        Self::new(x, y, Label::Marked)
    }

    pub fn unmarked(x: f64, y: f64) -> Self {
        Self::new(x, y, Label::Unmarked)
    }

    /// Squared Euclidean distance to another point
    #[inline]
    pub fn dist_sq(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Euclidean distance to another point
    #[inline]
    pub fn dist(&self, other: &Point) -> f64 {
        self.dist_sq(other).sqrt()
    }
}

/// Which view of a [`PointSet`] an operation works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Selection {
    /// Every point
    #[default]
    All,
    /// Marked points only, in set order
    Marked,
}

impl Selection {
    #[inline]
    pub fn contains(self, point: &Point) -> bool {
        match self {
            Selection::All => true,
            Selection::Marked => point.label.is_marked(),
        }
    }
}

/// An immutable, ordered collection of labeled points.
///
/// Coordinates are guaranteed finite. Whether the set has enough points of
/// each label for a statistic to be defined is checked by the algorithms,
/// not here.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point>", into = "Vec<Point>")]
pub struct PointSet {
    points: Vec<Point>,
}

impl PointSet {
    /// Create a point set, rejecting NaN or infinite coordinates.
    pub fn new(points: Vec<Point>) -> Result<Self> {
        if let Some(index) = points
            .iter()
            .position(|p| !p.x.is_finite() || !p.y.is_finite())
        {
            return Err(Error::NonFiniteCoordinate { index });
        }
        Ok(Self { points })
    }

    /// Build from parallel coordinate and label slices.
    pub fn from_columns(xs: &[f64], ys: &[f64], labels: &[Label]) -> Result<Self> {
        if xs.len() != ys.len() || xs.len() != labels.len() {
            return Err(Error::InvalidParameter {
                name: "columns",
                value: format!("{}/{}/{}", xs.len(), ys.len(), labels.len()),
                reason: "x, y and label columns must have the same length".into(),
            });
        }
        let points = xs
            .iter()
            .zip(ys)
            .zip(labels)
            .map(|((&x, &y), &label)| Point::new(x, y, label))
            .collect();
        Self::new(points)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn get(&self, index: usize) -> Option<&Point> {
        self.points.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Point> {
        self.points.iter()
    }

    pub fn marked_count(&self) -> usize {
        self.points.iter().filter(|p| p.label.is_marked()).count()
    }

    pub fn unmarked_count(&self) -> usize {
        self.len() - self.marked_count()
    }

    /// Indices (into this set) of the Marked points, ascending
    pub fn marked_indices(&self) -> Vec<usize> {
        self.points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.label.is_marked())
            .map(|(i, _)| i)
            .collect()
    }

    /// The points of a view, in set order
    pub fn subset(&self, selection: Selection) -> Vec<Point> {
        self.points
            .iter()
            .filter(|p| selection.contains(p))
            .copied()
            .collect()
    }

    /// Same locations with Marked and Unmarked exchanged
    pub fn with_swapped_labels(&self) -> Self {
        Self {
            points: self
                .points
                .iter()
                .map(|p| Point::new(p.x, p.y, p.label.swapped()))
                .collect(),
        }
    }
}

impl TryFrom<Vec<Point>> for PointSet {
    type Error = Error;

    fn try_from(points: Vec<Point>) -> Result<Self> {
        Self::new(points)
    }
}

impl From<PointSet> for Vec<Point> {
    fn from(set: PointSet) -> Self {
        set.points
    }
}

impl<'a> IntoIterator for &'a PointSet {
    type Item = &'a Point;
    type IntoIter = std::slice::Iter<'a, Point>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
