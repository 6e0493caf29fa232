use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use sitediff_scanner::{CaptureConfig, SiteProfile};
use std::fs;
use std::path::{Path, PathBuf};

/// Tunables of the image difference analyzer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Luminance delta (0-255) a pixel must exceed to count as different.
    pub pixel_threshold: u8,
    /// Regions enclosing less than this many square pixels are ignored.
    pub min_region_area: u32,
    /// Images wider than this are downscaled before comparison.
    pub max_dimension: u32,
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            pixel_threshold: 30,
            min_region_area: 100,
            max_dimension: 1920,
            thumbnail_width: 50,
            thumbnail_height: 100,
        }
    }
}

/// Settings for a whole comparison job, loadable from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompareConfig {
    /// Root of the `{site}/{timestamp}/` run directories.
    pub output_root: PathBuf,
    /// Concurrent page visits per crawl.
    pub workers: usize,
    /// Concurrent image pair analyses.
    pub analysis_workers: usize,
    /// Timeout of the HTTP fetch used for link discovery.
    pub request_timeout_secs: u64,
    pub analysis: AnalysisConfig,
    pub capture: CaptureConfig,
    pub site_a: SiteProfile,
    pub site_b: SiteProfile,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("screenshots"),
            workers: 4,
            analysis_workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            request_timeout_secs: 10,
            analysis: AnalysisConfig::default(),
            capture: CaptureConfig::default(),
            site_a: SiteProfile::default(),
            site_b: SiteProfile::default(),
        }
    }
}

impl CompareConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_reference_configuration() {
        let config = CompareConfig::default();
        assert_eq!(config.analysis.pixel_threshold, 30);
        assert_eq!(config.analysis.min_region_area, 100);
        assert_eq!(config.analysis.max_dimension, 1920);
        assert_eq!(config.capture.viewport_width, 1920);
        assert_eq!(config.capture.min_height, 1080);
        assert_eq!(config.output_root, PathBuf::from("screenshots"));
        assert!(config.analysis_workers >= 1);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r##"{{
                "workers": 2,
                "analysis": {{ "pixel_threshold": 12 }},
                "site_b": {{ "hide_selectors": ["#alertBanner", ".usa-accordion"] }}
            }}"##
        )
        .unwrap();

        let config = CompareConfig::load(file.path()).unwrap();
        assert_eq!(config.workers, 2);
        assert_eq!(config.analysis.pixel_threshold, 12);
        assert_eq!(config.analysis.min_region_area, 100);
        assert_eq!(config.site_b.hide_selectors.len(), 2);
        assert!(config.site_a.hide_selectors.is_empty());
        assert_eq!(config.request_timeout_secs, 10);
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = CompareConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_reports_missing_file() {
        let err = CompareConfig::load(Path::new("/nonexistent/sitediff.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
