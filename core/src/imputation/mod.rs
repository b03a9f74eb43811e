//! Similarity imputation of an absent modality
//!
//! [`ReferenceStats`] is computed (or loaded) once per run and passed by
//! reference into [`impute`].

mod imputer;
mod stats;

pub use imputer::{impute, ImputationProfile};
pub use stats::{compute_reference_stats, IntensityStats, ReferenceStats, StatsAccumulator};
