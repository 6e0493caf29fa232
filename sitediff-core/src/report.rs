// Comparison report rendering

use crate::classify::Classification;
use crate::compare::ComparisonEntry;
use colored::{ColoredString, Colorize};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";
const THIN_RULE: &str = "────────────────────────────────────────────────────────────────────────────────";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Csv,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "csv" => Some(ReportFormat::Csv),
            _ => None,
        }
    }
}

/// Ranked result of one comparison job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub job_id: String,
    pub site_a: String,
    pub site_b: String,
    /// RFC 3339 generation time.
    pub generated_at: String,
    pub entries: Vec<ComparisonEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total: usize,
    pub matched: usize,
    pub only_a: usize,
    pub only_b: usize,
    pub by_classification: BTreeMap<Classification, usize>,
}

impl ComparisonReport {
    pub fn new(
        job_id: impl Into<String>,
        site_a: impl Into<String>,
        site_b: impl Into<String>,
        entries: Vec<ComparisonEntry>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            site_a: site_a.into(),
            site_b: site_b.into(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            entries,
        }
    }

    pub fn summary(&self) -> ReportSummary {
        let mut by_classification = BTreeMap::new();
        let mut summary = ReportSummary {
            total: self.entries.len(),
            matched: 0,
            only_a: 0,
            only_b: 0,
            by_classification: BTreeMap::new(),
        };

        for entry in &self.entries {
            match (entry.image_a.is_some(), entry.image_b.is_some()) {
                (true, true) => summary.matched += 1,
                (true, false) => summary.only_a += 1,
                (false, true) => summary.only_b += 1,
                (false, false) => {}
            }
            *by_classification.entry(entry.classification).or_insert(0) += 1;
        }

        summary.by_classification = by_classification;
        summary
    }

    pub fn render(&self, format: ReportFormat) -> Result<String, serde_json::Error> {
        match format {
            ReportFormat::Text => Ok(self.to_text()),
            ReportFormat::Json => self.to_json(),
            ReportFormat::Csv => Ok(self.to_csv()),
        }
    }

    pub fn to_text(&self) -> String {
        let mut report = String::new();
        let summary = self.summary();

        report.push_str(RULE);
        report.push('\n');
        report.push_str("                       SITEDIFF VISUAL COMPARISON REPORT\n");
        report.push_str(RULE);
        report.push_str("\n\n");

        report.push_str(&format!("Job ID:       {}\n", self.job_id));
        report.push_str(&format!("Generated:    {}\n", self.generated_at));
        report.push_str(&format!("Site A:       {}\n", self.site_a));
        report.push_str(&format!("Site B:       {}\n", self.site_b));
        report.push_str(&format!("Page Paths:   {}\n", summary.total));
        report.push_str(&format!(
            "Matched:      {}  (only A: {}, only B: {})\n\n",
            summary.matched, summary.only_a, summary.only_b
        ));

        report.push_str(RULE);
        report.push_str("\nSUMMARY\n");
        report.push_str(RULE);
        report.push_str("\n\n");
        for (classification, count) in &summary.by_classification {
            report.push_str(&format!(
                "  {:<22} {:<24} {}\n",
                colorize(*classification, classification.label()),
                classification.range_display(),
                count
            ));
        }
        report.push('\n');

        if !self.entries.is_empty() {
            report.push_str(RULE);
            report.push_str("\nPAGES\n");
            report.push_str(RULE);
            report.push_str("\n\n");

            for (idx, entry) in self.entries.iter().enumerate() {
                let path = if entry.normalized_path.is_empty() {
                    "/"
                } else {
                    entry.normalized_path.as_str()
                };
                report.push_str(&format!(
                    "[{}] {}  {}\n",
                    idx + 1,
                    path.bold(),
                    colorize(entry.classification, entry.classification.label())
                ));
                report.push_str(&format!(
                    "Site A:       {}\n",
                    describe_side(entry.url_a.as_deref(), entry.title_a.as_deref())
                ));
                report.push_str(&format!(
                    "Site B:       {}\n",
                    describe_side(entry.url_b.as_deref(), entry.title_b.as_deref())
                ));

                if let Some(analysis) = &entry.analysis {
                    report.push_str(&format!("SSIM:         {}\n", fmt_score(analysis.ssim_score)));
                    report.push_str(&format!(
                        "Diff Pixels:  {}\n",
                        analysis
                            .diff_percent
                            .map(|p| format!("{:.2}%", p))
                            .unwrap_or_else(|| "N/A".to_string())
                    ));
                    report.push_str(&format!(
                        "Regions:      {} (largest {:.2}%)\n",
                        analysis.region_count, analysis.largest_region_percent
                    ));
                    if let Some(diff) = &analysis.diff_image {
                        report.push_str(&format!("Diff Image:   {}\n", diff.display()));
                    }
                }

                report.push_str(THIN_RULE);
                report.push_str("\n\n");
            }
        }

        report.push_str(RULE);
        report.push('\n');
        report.push_str("                          End of Report\n");
        report.push_str(RULE);
        report.push('\n');

        report
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let json_report = serde_json::json!({
            "report": {
                "metadata": {
                    "generator": "Sitediff",
                    "version": env!("CARGO_PKG_VERSION"),
                    "generated_at": self.generated_at,
                    "format": "json",
                },
                "job": {
                    "id": self.job_id,
                    "site_a": self.site_a,
                    "site_b": self.site_b,
                },
                "summary": self.summary(),
                "entries": self.entries,
            }
        });

        serde_json::to_string_pretty(&json_report)
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::from(
            "normalized_path,classification,ssim_score,diff_percent,region_count,\
             largest_region_percent,title_a,title_b,url_a,url_b,image_a,image_b,diff_image\n",
        );

        for entry in &self.entries {
            let analysis = entry.analysis.as_ref();
            let path_field = |p: Option<&std::path::PathBuf>| {
                p.map(|p| p.display().to_string()).unwrap_or_default()
            };
            let fields = [
                entry.normalized_path.clone(),
                entry.classification.label().to_string(),
                analysis
                    .and_then(|a| a.ssim_score)
                    .map(|s| format!("{:.6}", s))
                    .unwrap_or_default(),
                analysis
                    .and_then(|a| a.diff_percent)
                    .map(|p| format!("{:.4}", p))
                    .unwrap_or_default(),
                analysis.map(|a| a.region_count.to_string()).unwrap_or_default(),
                analysis
                    .map(|a| format!("{:.4}", a.largest_region_percent))
                    .unwrap_or_default(),
                entry.title_a.clone().unwrap_or_default(),
                entry.title_b.clone().unwrap_or_default(),
                entry.url_a.clone().unwrap_or_default(),
                entry.url_b.clone().unwrap_or_default(),
                path_field(entry.image_a.as_ref()),
                path_field(entry.image_b.as_ref()),
                path_field(analysis.and_then(|a| a.diff_image.as_ref())),
            ];
            let row: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
            out.push_str(&row.join(","));
            out.push('\n');
        }

        out
    }
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

fn colorize(classification: Classification, text: &str) -> ColoredString {
    match classification {
        Classification::PerfectMatch | Classification::VerySimilar => text.green(),
        Classification::GoodSimilarity | Classification::FairSimilarity => text.yellow(),
        Classification::ModerateSimilarity | Classification::LowSimilarity => text.red(),
        Classification::NotAvailable => text.dimmed(),
    }
}

fn describe_side(url: Option<&str>, title: Option<&str>) -> String {
    match (url, title) {
        (Some(url), Some(title)) if !title.is_empty() => format!("{} ({})", url, title),
        (Some(url), _) => url.to_string(),
        (None, _) => "(not found)".to_string(),
    }
}

fn fmt_score(score: Option<f64>) -> String {
    score
        .map(|s| format!("{:.4}", s))
        .unwrap_or_else(|| "N/A".to_string())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_str() {
        assert_eq!(ReportFormat::from_str("JSON"), Some(ReportFormat::Json));
        assert_eq!(ReportFormat::from_str("Csv"), Some(ReportFormat::Csv));
        assert_eq!(ReportFormat::from_str("text"), Some(ReportFormat::Text));
        assert_eq!(ReportFormat::from_str("html"), None);
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a, b"), "\"a, b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
