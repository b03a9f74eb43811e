use crate::assembly::RunReport;
use crate::types::Modality;
use std::fmt;

/// Text report formatter for a conversion run
pub struct TextReport<'a> {
    report: &'a RunReport,
}

impl<'a> TextReport<'a> {
    /// Creates a new text report
    pub fn new(report: &'a RunReport) -> Self {
        Self { report }
    }
}

impl<'a> fmt::Display for TextReport<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.report;

        writeln!(f, "Dataset Conversion")?;
        writeln!(f, "==================")?;
        writeln!(f)?;
        writeln!(f, "Dataset:        {}", report.dataset_dir.display())?;
        writeln!(f, "Policy:         {}", report.policy)?;
        match &report.channel_names {
            Some(names) => writeln!(f, "Channels:       {}", names.join(", "))?,
            None => writeln!(f, "Channels:       vary per case")?,
        }
        writeln!(f, "Discovered:     {}", report.discovered)?;
        writeln!(
            f,
            "Included:       {} ({} train, {} test)",
            report.included_count(),
            report.train.len(),
            report.test.len()
        )?;
        writeln!(f, "Imputed:        {}", report.imputed.len())?;
        writeln!(f, "Excluded:       {}", report.excluded_count())?;
        writeln!(f, "Degraded:       {}", report.degraded.len())?;

        if !report.included_by_class.is_empty() {
            writeln!(f)?;
            writeln!(f, "Included by Class")?;
            writeln!(f, "-----------------")?;
            for (class, count) in &report.included_by_class {
                writeln!(f, "  {:<14}{}", class.to_string(), count)?;
            }
        }

        if !report.available.is_empty() || !report.channel_usage.is_empty() {
            writeln!(f)?;
            writeln!(f, "Modalities")?;
            writeln!(f, "----------")?;
            for modality in Modality::ALL {
                let available = report.available.get(&modality).copied().unwrap_or(0);
                let usage = report
                    .channel_usage
                    .get(&modality)
                    .copied()
                    .unwrap_or_default();
                writeln!(
                    f,
                    "  {:<14}available {}, real {}, imputed {}, zero-filled {}",
                    modality.simple_name(),
                    available,
                    usage.real,
                    usage.imputed,
                    usage.placeholder
                )?;
            }
        }

        if !report.excluded.is_empty() {
            writeln!(f)?;
            writeln!(f, "Exclusions")?;
            writeln!(f, "----------")?;
            for (reason, keys) in &report.excluded {
                writeln!(f, "{} ({}):", reason, keys.len())?;
                for key in keys {
                    writeln!(f, "  {}", key)?;
                }
            }
        }

        if !report.degraded.is_empty() {
            writeln!(f)?;
            writeln!(f, "Degraded Cases")?;
            writeln!(f, "--------------")?;
            for key in &report.degraded {
                writeln!(f, "  {}", key)?;
            }
        }

        Ok(())
    }
}
