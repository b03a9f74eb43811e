pub mod api;
pub mod assembly;
pub mod cli;
pub mod collection;
pub mod error;
pub mod evaluation;
pub mod imputation;
pub mod reconcile;
pub mod types;
pub mod volume;

pub use api::DatasetConverter;
pub use assembly::{OutputManifest, RunReport, Split};
pub use cli::report::TextReport;
pub use collection::{normalize_case_id, CaseCollector, CaseRecord};
pub use error::{ConvertError, Result};
pub use evaluation::{evaluate, ChannelPlan, ChannelSource, Decision, ExclusionReason};
pub use imputation::{impute, ImputationProfile, IntensityStats, ReferenceStats};
pub use reconcile::{reconcile, ResolvedCase};
pub use types::*;
pub use volume::{LabelVolume, NiftiIo, Volume, VolumeIo};
