use crate::evaluation::ChannelPlan;
use crate::types::Modality;
use std::collections::BTreeMap;

/// How often each modality is present as a real channel across included cases
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorpusProfile {
    pub real_counts: BTreeMap<Modality, usize>,
}

impl CorpusProfile {
    /// Counts real channels over the plans of all included cases
    pub fn from_plans<'a, I>(plans: I) -> Self
    where
        I: IntoIterator<Item = &'a ChannelPlan>,
    {
        let mut real_counts = BTreeMap::new();
        for plan in plans {
            for modality in plan.real_modalities() {
                *real_counts.entry(modality).or_insert(0) += 1;
            }
        }
        Self { real_counts }
    }

    /// Most frequent real modality; ties go to the earlier canonical modality
    pub fn primary_modality(&self) -> Option<Modality> {
        let mut best: Option<(Modality, usize)> = None;
        for modality in Modality::ALL {
            let count = self.real_counts.get(&modality).copied().unwrap_or(0);
            if count > 0 && best.map_or(true, |(_, c)| count > c) {
                best = Some((modality, count));
            }
        }
        best.map(|(m, _)| m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::ChannelSource;

    #[test]
    fn test_primary_is_most_frequent() {
        let plans = vec![
            ChannelPlan::new(vec![ChannelSource::Real(Modality::Dwi)]),
            ChannelPlan::new(vec![
                ChannelSource::Real(Modality::T2FatSat),
                ChannelSource::Real(Modality::Dwi),
            ]),
            ChannelPlan::new(vec![ChannelSource::Placeholder(Modality::Adc)]),
        ];
        let profile = CorpusProfile::from_plans(&plans);

        assert_eq!(profile.real_counts.get(&Modality::Dwi), Some(&2));
        assert_eq!(profile.real_counts.get(&Modality::Adc), None);
        assert_eq!(profile.primary_modality(), Some(Modality::Dwi));
    }

    #[test]
    fn test_tie_goes_to_canonical_order() {
        let plans = vec![ChannelPlan::new(vec![
            ChannelSource::Real(Modality::T2HighRes),
            ChannelSource::Real(Modality::Adc),
        ])];
        let profile = CorpusProfile::from_plans(&plans);
        assert_eq!(profile.primary_modality(), Some(Modality::Adc));
    }

    #[test]
    fn test_empty_corpus() {
        assert_eq!(CorpusProfile::default().primary_modality(), None);
    }
}
