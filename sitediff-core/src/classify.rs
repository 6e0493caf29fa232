// Similarity tiers and report ordering

use crate::compare::ComparisonEntry;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Classification {
    #[serde(rename = "Perfect Match")]
    PerfectMatch,
    #[serde(rename = "Very Similar")]
    VerySimilar,
    #[serde(rename = "Good Similarity")]
    GoodSimilarity,
    #[serde(rename = "Fair Similarity")]
    FairSimilarity,
    #[serde(rename = "Moderate Similarity")]
    ModerateSimilarity,
    #[serde(rename = "Low Similarity")]
    LowSimilarity,
    #[serde(rename = "N/A")]
    NotAvailable,
}

impl Classification {
    /// Every tier, best first.
    pub const ALL: [Classification; 7] = [
        Classification::PerfectMatch,
        Classification::VerySimilar,
        Classification::GoodSimilarity,
        Classification::FairSimilarity,
        Classification::ModerateSimilarity,
        Classification::LowSimilarity,
        Classification::NotAvailable,
    ];

    /// Tier of an SSIM score. The score is clamped to `[-1, 1]`; a missing
    /// or NaN score is `NotAvailable`.
    pub fn from_score(score: Option<f64>) -> Self {
        let Some(score) = score.filter(|s| !s.is_nan()) else {
            return Classification::NotAvailable;
        };
        let score = score.clamp(-1.0, 1.0);
        if score >= 1.0 {
            Classification::PerfectMatch
        } else if score > 0.95 {
            Classification::VerySimilar
        } else if score > 0.90 {
            Classification::GoodSimilarity
        } else if score > 0.80 {
            Classification::FairSimilarity
        } else if score > 0.60 {
            Classification::ModerateSimilarity
        } else {
            Classification::LowSimilarity
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Classification::PerfectMatch => "Perfect Match",
            Classification::VerySimilar => "Very Similar",
            Classification::GoodSimilarity => "Good Similarity",
            Classification::FairSimilarity => "Fair Similarity",
            Classification::ModerateSimilarity => "Moderate Similarity",
            Classification::LowSimilarity => "Low Similarity",
            Classification::NotAvailable => "N/A",
        }
    }

    /// Score interval covered by this tier, for display.
    pub fn range_display(&self) -> &'static str {
        match self {
            Classification::PerfectMatch => "[1.0]",
            Classification::VerySimilar => "(> 0.95 & < 1.0)",
            Classification::GoodSimilarity => "(0.90 - 0.95]",
            Classification::FairSimilarity => "(0.80 - 0.90]",
            Classification::ModerateSimilarity => "(0.60 - 0.80]",
            Classification::LowSimilarity => "(<= 0.60)",
            Classification::NotAvailable => "(Score not available)",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Descending on (has score, score). Scored items come first, best first;
/// unscored items keep their relative order.
fn rank_order(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable sort of `items` by their score, see [`rank_entries`].
pub fn rank_by_score<T>(items: &mut [T], score: impl Fn(&T) -> Option<f64>) {
    items.sort_by(|a, b| {
        rank_order(
            score(a).filter(|s| !s.is_nan()),
            score(b).filter(|s| !s.is_nan()),
        )
    });
}

/// Order entries for presentation: scored pairs by descending SSIM, then
/// every unscored entry in its existing (path) order.
pub fn rank_entries(entries: &mut [ComparisonEntry]) {
    rank_by_score(entries, |entry| entry.ssim_score());
}
