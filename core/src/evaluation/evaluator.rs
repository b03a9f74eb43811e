use super::decision::{ChannelPlan, ChannelSource, Decision, ExclusionReason};
use crate::collection::CaseRecord;
use crate::types::{Modality, ModalityCompletenessPolicy};

/// Decides whether a case is usable under `policy` and which channels it emits
///
/// Rules are checked in this order:
///
/// 1. No label: `NoLabel`, whatever the policy
/// 2. Ambiguous label: `DuplicateCaseId`
/// 3. The policy's own rule
///
/// Only modalities with a file count as present. Channel plans are always in
/// canonical modality order.
///
/// # Arguments
///
/// * `record` - Case to evaluate
/// * `policy` - Completeness policy of the run
///
/// # Returns
///
/// `Decision::Include` with the channel plan, or `Decision::Exclude` with the reason
pub fn evaluate(record: &CaseRecord, policy: &ModalityCompletenessPolicy) -> Decision {
    if !record.has_label() {
        return Decision::Exclude(ExclusionReason::NoLabel);
    }
    if record.label_ambiguous {
        return Decision::Exclude(ExclusionReason::DuplicateCaseId);
    }

    match *policy {
        ModalityCompletenessPolicy::Strict => {
            require_all(record, &Modality::ALL, ExclusionReason::IncompleteStrict)
        }
        ModalityCompletenessPolicy::CoreSubset => {
            require_all(record, &Modality::CORE, ExclusionReason::IncompleteCore)
        }
        ModalityCompletenessPolicy::MinimumCount(k) => {
            if record.present_count() < k {
                return Decision::Exclude(ExclusionReason::InsufficientModalities);
            }
            let channels = Modality::ALL
                .iter()
                .filter(|m| record.has(**m))
                .map(|m| ChannelSource::Real(*m))
                .collect();
            Decision::Include(ChannelPlan::new(channels))
        }
        ModalityCompletenessPolicy::ZeroFill { min_count } => {
            if record.present_count() < min_count {
                return Decision::Exclude(ExclusionReason::InsufficientModalities);
            }
            Decision::Include(full_plan(record, |m| ChannelSource::Placeholder(m)))
        }
        ModalityCompletenessPolicy::SimilarityFill {
            min_count,
            estimable,
            source,
        } => {
            if !record.has(estimable) && !record.has(source) {
                return Decision::Exclude(ExclusionReason::NoImputationSource);
            }
            if record.present_count() < min_count {
                return Decision::Exclude(ExclusionReason::InsufficientModalities);
            }
            Decision::Include(full_plan(record, |m| {
                if m == estimable {
                    ChannelSource::NeedsImputation { target: m, source }
                } else {
                    ChannelSource::Placeholder(m)
                }
            }))
        }
    }
}

fn require_all(record: &CaseRecord, required: &[Modality], reason: ExclusionReason) -> Decision {
    if required.iter().all(|m| record.has(*m)) {
        Decision::Include(ChannelPlan::new(
            required.iter().map(|m| ChannelSource::Real(*m)).collect(),
        ))
    } else {
        Decision::Exclude(reason)
    }
}

/// Plan over the whole vocabulary; `absent` decides what stands in for a missing modality
fn full_plan(record: &CaseRecord, absent: impl Fn(Modality) -> ChannelSource) -> ChannelPlan {
    ChannelPlan::new(
        Modality::ALL
            .iter()
            .map(|m| {
                if record.has(*m) {
                    ChannelSource::Real(*m)
                } else {
                    absent(*m)
                }
            })
            .collect(),
    )
}
