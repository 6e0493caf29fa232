use sitediff::handlers::*;
use sitediff_core::{AnalysisConfig, DiffAnalysis, analyze};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use tempfile::{NamedTempFile, TempDir};

#[test]
fn test_parse_site_url_with_scheme() {
    let result = parse_site_url("https://example.com/start");
    assert_eq!(result, Some("https://example.com/start".to_string()));
}

#[test]
fn test_parse_site_url_without_scheme() {
    let result = parse_site_url("legacy.example.com");
    assert_eq!(result, Some("http://legacy.example.com".to_string()));
}

#[test]
fn test_parse_site_url_invalid() {
    assert_eq!(parse_site_url(""), None);
    assert_eq!(parse_site_url("not a valid url!!!"), None);
}

#[test]
fn test_parse_run_ref() {
    assert_eq!(
        parse_run_ref("example_com/20240101120000"),
        Some("example_com/20240101120000".to_string())
    );
    assert_eq!(
        parse_run_ref("/example_com/20240101120000/"),
        Some("example_com/20240101120000".to_string())
    );
    assert_eq!(parse_run_ref("example_com"), None);
    assert_eq!(parse_run_ref("a/b/c"), None);
    assert_eq!(parse_run_ref("../20240101120000"), None);
}

#[test]
fn test_load_config_defaults_without_file() {
    let config = load_config(None).unwrap();
    assert_eq!(config.workers, 4);
    assert_eq!(config.output_root, PathBuf::from("screenshots"));
}

#[test]
fn test_load_config_from_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut temp_file = NamedTempFile::new()?;
    writeln!(
        temp_file,
        r#"{{ "output_root": "/tmp/shots", "site_a": {{ "stop_urls": ["/archive"] }} }}"#
    )?;

    let path = PathBuf::from(temp_file.path());
    let config = load_config(Some(&path))?;

    assert_eq!(config.output_root, PathBuf::from("/tmp/shots"));
    assert_eq!(config.site_a.stop_urls, vec!["/archive".to_string()]);
    Ok(())
}

#[test]
fn test_load_config_invalid_file() {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file, "workers = 3").unwrap();

    let path = PathBuf::from(temp_file.path());
    let err = load_config(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("invalid config"));
}

#[test]
fn test_apply_overrides() {
    let config = load_config(None).unwrap();
    let output = PathBuf::from("/tmp/elsewhere");
    let config = apply_overrides(config, Some(&output), Some(0));
    assert_eq!(config.output_root, output);
    assert_eq!(config.workers, 1);

    let untouched = apply_overrides(load_config(None).unwrap(), None, None);
    assert_eq!(untouched.workers, 4);
}

#[test]
fn test_format_crawl_listing() {
    let mut crawls = BTreeMap::new();
    crawls.insert(
        "legacy_example_com".to_string(),
        vec!["20240301120000".to_string(), "20240101120000".to_string()],
    );

    let listing = format_crawl_listing(&crawls);
    assert!(listing.contains("legacy_example_com\n"));
    assert!(listing.contains("├── legacy_example_com/20240301120000"));
    assert!(listing.contains("└── legacy_example_com/20240101120000"));

    assert_eq!(format_crawl_listing(&BTreeMap::new()), "No previous crawls found.\n");
}

#[test]
fn test_format_analysis() {
    let dir = TempDir::new().unwrap();
    let img = image::GrayImage::from_fn(40, 30, |x, _| image::Luma([(x * 6) as u8]));
    let a = dir.path().join("a.png");
    let b = dir.path().join("b.png");
    img.save(&a).unwrap();
    img.save(&b).unwrap();

    let analysis = analyze(&a, &b, None, &AnalysisConfig::default());
    let text = format_analysis(&analysis);
    assert!(text.contains("Classification: Perfect Match [1.0]"));
    assert!(text.contains("SSIM:           1.0000"));
    assert!(text.contains("Diff pixels:    0.00%"));
}

#[test]
fn test_format_missing_analysis() {
    let text = format_analysis(&DiffAnalysis::default());
    assert!(text.contains("Classification: N/A (Score not available)"));
    assert!(text.contains("SSIM:           N/A"));
    assert!(!text.contains("Diff image"));
}
