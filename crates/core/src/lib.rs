//! # Spatassoc Core
//!
//! Core types and traits for the spatassoc point-pattern library.
//!
//! This crate provides:
//! - `Point`, `Label`: labeled 2-D points (e.g. classified cell centroids)
//! - `PointSet`: immutable, validated collection of points
//! - `Selection`: full-set or Marked-only views
//! - Algorithm trait for consistent API

pub mod error;
pub mod point;

pub use error::{Error, Result};
pub use point::{Label, Point, PointSet, Selection};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::point::{Label, Point, PointSet, Selection};
    pub use crate::Algorithm;
}

/// Core trait for all algorithms in spatassoc.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(
        &self,
        input: Self::Input,
        params: Self::Params,
    ) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(
        &self,
        input: Self::Input,
    ) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
