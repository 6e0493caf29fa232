pub mod analyzer;
pub mod classify;
pub mod compare;
pub mod config;
pub mod error;
pub mod job;
pub mod matcher;
pub mod regions;
pub mod report;
pub mod ssim;
pub mod workspace;

pub use analyzer::{DiffAnalysis, analyze};
pub use classify::{Classification, rank_entries};
pub use compare::{ComparisonEntry, compare_pages};
pub use config::{AnalysisConfig, CompareConfig};
pub use error::{AnalysisError, ConfigError, JobError};
pub use job::{CompareRequest, JobHandle, JobRunner, JobState, JobStatus, SiteSource};
pub use matcher::match_pages;
pub use report::{ComparisonReport, ReportFormat};
pub use workspace::Side;
