//! # Spatassoc Algorithms
//!
//! Radius-based association analysis for labeled point patterns.
//!
//! ## Modules
//!
//! - **neighborhood**: fixed-radius neighbor counts (brute force or k-d tree)
//! - **association**: same-label association statistic `a_AA`
//! - **variance**: design-based variance of `a_AA` under random labeling
//! - **analysis**: the full pipeline and its result record
//! - **execution**: sequential / parallel processing modes

pub mod analysis;
pub mod association;
pub mod execution;
pub mod neighborhood;
pub mod variance;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::analysis::{
        association_analysis, AssociationAnalysis, AssociationDiagnostics, AssociationParams,
        AssociationResult,
    };
    pub use crate::association::{association_statistic, AssociationStatistic};
    pub use crate::execution::ProcessingMode;
    pub use crate::neighborhood::{
        marked_neighbor_counts, NeighborParams, NeighborSearch, NeighborhoodIndex,
    };
    pub use crate::variance::{
        inverse_count_mean, pair_aggregates, threshold, variance_terms, PairAggregates,
        VarianceTerms, XtAccumulation,
    };
    pub use spatassoc_core::prelude::*;
}
