//! Shape reconciliation
//!
//! Resamples every channel and the label of a case onto a single reference
//! grid, chosen from the modality most often present across the corpus.

mod corpus;
mod reconciler;
mod resample;

pub use corpus::CorpusProfile;
pub use reconciler::{reconcile, reference_grid, ResolvedCase};
pub use resample::{resample_image, resample_label};
