use super::Modality;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Completeness policy deciding which cases are usable and which channels they emit
///
/// A closed set of behaviours; evaluation lives in
/// [`evaluate`](crate::evaluation::evaluate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModalityCompletenessPolicy {
    /// Every vocabulary modality must be present
    Strict,

    /// Every modality of [`Modality::CORE`] must be present; others are ignored
    CoreSubset,

    /// At least `k` modalities present; only present ones are emitted,
    /// so channel counts may vary between cases
    MinimumCount(usize),

    /// As `MinimumCount`, but absent modalities become zero channels so
    /// every case emits the full vocabulary
    ZeroFill { min_count: usize },

    /// As `ZeroFill`, except that an absent `estimable` modality is
    /// synthesized from `source` instead of zero-filled
    SimilarityFill {
        min_count: usize,
        estimable: Modality,
        source: Modality,
    },
}

impl Default for ModalityCompletenessPolicy {
    fn default() -> Self {
        ModalityCompletenessPolicy::SimilarityFill {
            min_count: 4,
            estimable: Modality::T2HighRes,
            source: Modality::T2NoFatSat,
        }
    }
}

impl ModalityCompletenessPolicy {
    /// Returns the minimum modality count, if this policy has one
    pub fn min_count(&self) -> Option<usize> {
        match self {
            ModalityCompletenessPolicy::Strict | ModalityCompletenessPolicy::CoreSubset => None,
            ModalityCompletenessPolicy::MinimumCount(k) => Some(*k),
            ModalityCompletenessPolicy::ZeroFill { min_count }
            | ModalityCompletenessPolicy::SimilarityFill { min_count, .. } => Some(*min_count),
        }
    }

    /// Returns the channels every included case emits, or `None` when they
    /// depend on the case
    pub fn fixed_channels(&self) -> Option<&'static [Modality]> {
        match self {
            ModalityCompletenessPolicy::CoreSubset => Some(&Modality::CORE),
            ModalityCompletenessPolicy::MinimumCount(_) => None,
            _ => Some(&Modality::ALL),
        }
    }

    /// Returns `(source, estimable)` for a policy that synthesizes a channel
    pub fn imputation_pair(&self) -> Option<(Modality, Modality)> {
        match self {
            ModalityCompletenessPolicy::SimilarityFill {
                estimable, source, ..
            } => Some((*source, *estimable)),
            _ => None,
        }
    }

    /// Returns simple name for display
    pub fn simple_name(&self) -> &'static str {
        match self {
            ModalityCompletenessPolicy::Strict => "strict",
            ModalityCompletenessPolicy::CoreSubset => "core",
            ModalityCompletenessPolicy::MinimumCount(_) => "min-count",
            ModalityCompletenessPolicy::ZeroFill { .. } => "zero-fill",
            ModalityCompletenessPolicy::SimilarityFill { .. } => "similarity-fill",
        }
    }
}

impl fmt::Display for ModalityCompletenessPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModalityCompletenessPolicy::SimilarityFill {
                min_count,
                estimable,
                source,
            } => write!(
                f,
                "{} (k={}, {} from {})",
                self.simple_name(),
                min_count,
                estimable,
                source
            ),
            _ => match self.min_count() {
                Some(k) => write!(f, "{} (k={})", self.simple_name(), k),
                None => write!(f, "{}", self.simple_name()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_channels() {
        assert_eq!(
            ModalityCompletenessPolicy::Strict.fixed_channels(),
            Some(&Modality::ALL[..])
        );
        assert_eq!(
            ModalityCompletenessPolicy::CoreSubset.fixed_channels(),
            Some(&Modality::CORE[..])
        );
        assert_eq!(ModalityCompletenessPolicy::MinimumCount(3).fixed_channels(), None);
        assert_eq!(
            ModalityCompletenessPolicy::default().fixed_channels().map(<[_]>::len),
            Some(5)
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(ModalityCompletenessPolicy::Strict.to_string(), "strict");
        assert_eq!(
            ModalityCompletenessPolicy::MinimumCount(3).to_string(),
            "min-count (k=3)"
        );
        assert_eq!(
            ModalityCompletenessPolicy::default().to_string(),
            "similarity-fill (k=4, T2_HighRes from T2_NoFatSat)"
        );
    }

    #[test]
    fn test_only_similarity_fill_imputes() {
        assert_eq!(
            ModalityCompletenessPolicy::default().imputation_pair(),
            Some((Modality::T2NoFatSat, Modality::T2HighRes))
        );
        assert_eq!(
            ModalityCompletenessPolicy::ZeroFill { min_count: 4 }.imputation_pair(),
            None
        );
    }
}
