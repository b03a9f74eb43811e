//! Case discovery
//!
//! Walks the source tree and groups modality and label files of the same
//! patient into [`CaseRecord`]s.

mod case_id;
mod collector;
mod record;

pub use case_id::normalize_case_id;
pub use collector::CaseCollector;
pub use record::CaseRecord;
