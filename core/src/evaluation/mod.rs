//! Modality policy evaluation
//!
//! Turns a [`CaseRecord`](crate::collection::CaseRecord) into an include or
//! exclude [`Decision`] under a
//! [`ModalityCompletenessPolicy`](crate::types::ModalityCompletenessPolicy).

mod decision;
mod evaluator;

pub use decision::{ChannelPlan, ChannelSource, Decision, ExclusionReason};
pub use evaluator::evaluate;
