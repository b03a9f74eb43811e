use crate::types::Modality;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where one output channel comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelSource {
    /// Read from the case's own file for this modality
    Real(Modality),

    /// Synthesized from the case's `source` modality
    NeedsImputation { target: Modality, source: Modality },

    /// Absent modality emitted as an all-zero channel
    Placeholder(Modality),
}

impl ChannelSource {
    /// Modality this channel stands for in the output
    pub fn modality(&self) -> Modality {
        match self {
            ChannelSource::Real(m) | ChannelSource::Placeholder(m) => *m,
            ChannelSource::NeedsImputation { target, .. } => *target,
        }
    }

    pub fn is_real(&self) -> bool {
        matches!(self, ChannelSource::Real(_))
    }
}

impl fmt::Display for ChannelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelSource::Real(m) => write!(f, "{}", m),
            ChannelSource::NeedsImputation { target, source } => {
                write!(f, "{}<-{}", target, source)
            }
            ChannelSource::Placeholder(m) => write!(f, "{}(zero)", m),
        }
    }
}

/// Ordered channel list of one case, in canonical modality order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChannelPlan {
    pub channels: Vec<ChannelSource>,
}

impl ChannelPlan {
    pub fn new(channels: Vec<ChannelSource>) -> Self {
        Self { channels }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Output modality of every channel, in order
    pub fn modalities(&self) -> Vec<Modality> {
        self.channels.iter().map(|c| c.modality()).collect()
    }

    /// Modalities read from the case's own files, in order
    pub fn real_modalities(&self) -> impl Iterator<Item = Modality> + '_ {
        self.channels.iter().filter_map(|c| match c {
            ChannelSource::Real(m) => Some(*m),
            _ => None,
        })
    }

    pub fn imputed_count(&self) -> usize {
        self.channels
            .iter()
            .filter(|c| matches!(c, ChannelSource::NeedsImputation { .. }))
            .count()
    }
}

impl fmt::Display for ChannelPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.channels.iter().map(|c| c.to_string()).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

/// Reason a case was left out of the dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ExclusionReason {
    /// No label file matched the case
    NoLabel,
    /// More than one label file normalized to the case id
    DuplicateCaseId,
    /// Strict policy and a vocabulary modality is absent
    IncompleteStrict,
    /// Core-subset policy and a core modality is absent
    IncompleteCore,
    /// Fewer present modalities than the policy's minimum
    InsufficientModalities,
    /// Estimable modality and its imputation source are both absent
    NoImputationSource,
    /// A case file could not be decoded
    UnreadableVolume,
    /// A grid lacks the metadata needed to resample it
    UnresamplableGeometry,
    /// Writing the case output failed
    WriteFailure,
}

impl ExclusionReason {
    pub fn simple_name(&self) -> &'static str {
        match self {
            ExclusionReason::NoLabel => "NoLabel",
            ExclusionReason::DuplicateCaseId => "DuplicateCaseId",
            ExclusionReason::IncompleteStrict => "IncompleteStrict",
            ExclusionReason::IncompleteCore => "IncompleteCore",
            ExclusionReason::InsufficientModalities => "InsufficientModalities",
            ExclusionReason::NoImputationSource => "NoImputationSource",
            ExclusionReason::UnreadableVolume => "UnreadableVolume",
            ExclusionReason::UnresamplableGeometry => "UnresamplableGeometry",
            ExclusionReason::WriteFailure => "WriteFailure",
        }
    }
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())
    }
}

/// Outcome of evaluating one case against a policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Include(ChannelPlan),
    Exclude(ExclusionReason),
}

impl Decision {
    pub fn is_included(&self) -> bool {
        matches!(self, Decision::Include(_))
    }

    /// Returns the channel plan of an included case
    pub fn plan(&self) -> Option<&ChannelPlan> {
        match self {
            Decision::Include(plan) => Some(plan),
            Decision::Exclude(_) => None,
        }
    }

    /// Returns the reason of an excluded case
    pub fn reason(&self) -> Option<ExclusionReason> {
        match self {
            Decision::Include(_) => None,
            Decision::Exclude(reason) => Some(*reason),
        }
    }
}
