use anyhow::{Context, Result, anyhow, bail};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use sitediff_core::report::save_report;
use sitediff_core::workspace::{Side, list_available_crawls, run_dir, run_timestamp, site_dir_name};
use sitediff_core::{
    Classification, CompareConfig, CompareRequest, ComparisonReport, DiffAnalysis, JobRunner,
    ReportFormat, analyze,
};
use sitediff_scanner::crawler::ProgressCallback;
use sitediff_scanner::{Crawler, chrome_factory};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use url::Url;

pub fn print_banner() {
    let banner = r#"
   ▄▄▄▄▄   ▄█    ▄▄▄▄▀ ▄███▄   ██▄   ▄█ ▄████  ▄████
  █     ▀▄ ██ ▀▀▀ █    █▀   ▀  █  █  ██ █▀   ▀ █▀   ▀
▄  ▀▀▀▀▄   ██     █    ██▄▄    █   █ ██ █▀▀    █▀▀
 ▀▄▄▄▄▀    ▐█    █     █▄   ▄▀ █  █  ▐█ █      █
            ▐   ▀      ▀███▀   ███▀   ▐  █      █
"#;
    println!("{}", banner.bright_cyan());
    println!(
        "  {} {}\n",
        "visual regression crawler".bright_white().bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}

/// Cancel the running job or crawl when the user hits Ctrl-C.
fn cancel_on_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling");
            cancel.cancel();
        }
    });
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

// Helpers shared by the handlers

/// Parse a site URL, adding `http://` when the scheme is missing.
pub fn parse_site_url(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if let Ok(url) = Url::parse(line)
        && url.host_str().is_some()
    {
        return Some(line.to_string());
    }

    let with_scheme = format!("http://{}", line);
    match Url::parse(&with_scheme) {
        Ok(url) if url.host_str().is_some() => Some(with_scheme),
        _ => None,
    }
}

/// Validate a previous-run reference of the form `SITE/TIMESTAMP`.
pub fn parse_run_ref(run: &str) -> Option<String> {
    let run = run.trim().trim_matches('/');
    let mut parts = run.split('/');
    let (Some(site), Some(timestamp), None) = (parts.next(), parts.next(), parts.next()) else {
        return None;
    };
    let valid = |s: &str| !s.is_empty() && s != "." && s != "..";
    if valid(site) && valid(timestamp) {
        Some(format!("{}/{}", site, timestamp))
    } else {
        None
    }
}

/// Load the configuration file if one was given, else the defaults.
pub fn load_config(path: Option<&PathBuf>) -> Result<CompareConfig> {
    match path {
        Some(path) => {
            let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
            Ok(CompareConfig::load(Path::new(&expanded))?)
        }
        None => Ok(CompareConfig::default()),
    }
}

/// Apply command-line overrides on top of the loaded configuration.
pub fn apply_overrides(
    mut config: CompareConfig,
    output: Option<&PathBuf>,
    workers: Option<usize>,
) -> CompareConfig {
    if let Some(output) = output {
        config.output_root =
            PathBuf::from(shellexpand::tilde(&output.to_string_lossy()).into_owned());
    }
    if let Some(workers) = workers {
        config.workers = workers.max(1);
    }
    config
}

pub fn format_crawl_listing(crawls: &BTreeMap<String, Vec<String>>) -> String {
    if crawls.is_empty() {
        return "No previous crawls found.\n".to_string();
    }
    let mut out = String::new();
    for (site, timestamps) in crawls {
        out.push_str(&format!("{}\n", site));
        for (i, timestamp) in timestamps.iter().enumerate() {
            let prefix = if i == timestamps.len() - 1 { "└── " } else { "├── " };
            out.push_str(&format!("{}{}/{}\n", prefix, site, timestamp));
        }
    }
    out
}

pub fn format_analysis(analysis: &DiffAnalysis) -> String {
    let classification = Classification::from_score(analysis.ssim_score);
    let mut out = String::new();
    out.push_str(&format!(
        "Classification: {} {}\n",
        classification.label(),
        classification.range_display()
    ));
    out.push_str(&format!(
        "SSIM:           {}\n",
        analysis
            .ssim_score
            .map(|s| format!("{:.4}", s))
            .unwrap_or_else(|| "N/A".to_string())
    ));
    out.push_str(&format!(
        "Diff pixels:    {}\n",
        analysis
            .diff_percent
            .map(|p| format!("{:.2}%", p))
            .unwrap_or_else(|| "N/A".to_string())
    ));
    out.push_str(&format!(
        "Regions:        {} (largest {:.2}%)\n",
        analysis.region_count, analysis.largest_region_percent
    ));
    if let Some(diff) = &analysis.diff_image {
        out.push_str(&format!("Diff image:     {}\n", diff.display()));
    }
    out
}

fn new_spinner(quiet: bool) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}

fn spinner_progress(spinner: &ProgressBar) -> ProgressCallback {
    let spinner = spinner.clone();
    Arc::new(move |worker_id: usize, url: String| {
        spinner.set_message(format!("Worker {}: {}", worker_id, url));
    })
}

fn print_summary(report: &ComparisonReport) {
    let summary = report.summary();
    print_divider();
    println!("{}", "  COMPARISON COMPLETE".green().bold());
    print_divider();
    println!(
        "{} {} page paths, {} matched, {} only in site 1, {} only in site 2",
        "✓".green().bold(),
        summary.total.to_string().cyan(),
        summary.matched.to_string().cyan(),
        summary.only_a,
        summary.only_b
    );
    for (classification, count) in &summary.by_classification {
        println!("  {} {:<20} {}", "•".blue(), classification.label(), count);
    }
    println!();
}

// Command handlers

pub async fn handle_compare(args: &ArgMatches, quiet: bool) -> Result<()> {
    let config = load_config(args.get_one::<PathBuf>("config"))?;
    let config = apply_overrides(
        config,
        args.get_one::<PathBuf>("output"),
        args.get_one::<usize>("workers").copied(),
    );

    let url1 = args
        .get_one::<String>("url1")
        .and_then(|u| parse_site_url(u))
        .ok_or_else(|| anyhow!("--url1 is not a valid URL"))?;
    let url2 = args
        .get_one::<String>("url2")
        .and_then(|u| parse_site_url(u))
        .ok_or_else(|| anyhow!("--url2 is not a valid URL"))?;

    let mut request = CompareRequest::crawl(url1.clone(), url2.clone());
    if let Some(run) = args.get_one::<String>("load1") {
        let run = parse_run_ref(run).ok_or_else(|| anyhow!("--load1 must be SITE/TIMESTAMP"))?;
        request = request.with_load_a(run);
    }
    if let Some(run) = args.get_one::<String>("load2") {
        let run = parse_run_ref(run).ok_or_else(|| anyhow!("--load2 must be SITE/TIMESTAMP"))?;
        request = request.with_load_b(run);
    }

    let format = args
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);

    if !quiet {
        println!("{} Site 1: {}", "→".blue(), url1.bright_white());
        println!("{} Site 2: {}", "→".blue(), url2.bright_white());
        println!(
            "{} Output: {}\n",
            "→".blue(),
            config.output_root.display().to_string().bright_white()
        );
    }

    let spinner = new_spinner(quiet)?;
    spinner.set_message("Processing... preparing to crawl or load data.");
    let runner =
        JobRunner::new(config, chrome_factory()).with_progress_callback(spinner_progress(&spinner));

    let handle = runner.try_start(request)?;
    cancel_on_ctrl_c(handle.cancel_token());

    let result = handle.wait().await;
    spinner.finish_and_clear();

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            warn!("Comparison failed: {}", e);
            bail!("{}", runner.status().message);
        }
    };

    if !quiet {
        print_summary(&report);
    }

    let content = report.render(format)?;
    match args.get_one::<PathBuf>("report") {
        Some(path) => {
            save_report(&content, path)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            println!(
                "{} Report saved: {}",
                "✓".green().bold(),
                path.display().to_string().bright_white()
            );
        }
        None => print!("{}", content),
    }
    Ok(())
}

pub async fn handle_crawl(args: &ArgMatches, quiet: bool) -> Result<()> {
    let config = load_config(args.get_one::<PathBuf>("config"))?;
    let config = apply_overrides(
        config,
        args.get_one::<PathBuf>("output"),
        args.get_one::<usize>("workers").copied(),
    );
    let url = args
        .get_one::<String>("url")
        .and_then(|u| parse_site_url(u))
        .ok_or_else(|| anyhow!("--url is not a valid URL"))?;
    let (side, profile) = match args.get_one::<String>("site").map(String::as_str) {
        Some("b") => (Side::B, config.site_b.clone()),
        _ => (Side::A, config.site_a.clone()),
    };

    let dir = run_dir(&config.output_root, &site_dir_name(&url, side), &run_timestamp());
    if !quiet {
        println!("\n🕷️  Crawling {}", url.bright_white());
        println!("Workers: {}", config.workers);
        println!("Output: {}\n", dir.display());
    }

    let spinner = new_spinner(quiet)?;
    spinner.set_message("Launching browser...");
    let capture_config = config.capture.clone();
    let capture = tokio::task::spawn_blocking(move || chrome_factory()(&capture_config))
        .await?
        .context("Failed to launch headless browser")?;

    let cancel = CancellationToken::new();
    let crawler = Crawler::with_timeout(capture, &dir, config.request_timeout_secs)?
        .with_profile(profile)
        .with_capture_config(config.capture.clone())
        .with_workers(config.workers)
        .with_cancel_token(cancel.clone())
        .with_progress_callback(spinner_progress(&spinner));
    cancel_on_ctrl_c(cancel);

    let result = crawler.crawl(&url).await;
    spinner.finish_and_clear();
    let result = result?;

    if result.is_empty() {
        bail!("No pages captured from {}", url);
    }
    let saved = result.save(&dir)?;

    println!("\n{} Crawl complete!\n", "✓".green().bold());
    println!("  Pages captured: {}", result.len().to_string().cyan());
    if let Some(saved) = saved {
        println!("  Crawl data: {}", saved.display().to_string().bright_white());
    }
    println!();
    for page in result.pages() {
        let key = if page.normalized_path.is_empty() {
            "/"
        } else {
            page.normalized_path.as_str()
        };
        println!("  {} {}  {}", "✓".green(), key, page.title.dimmed());
    }
    Ok(())
}

pub fn handle_list(args: &ArgMatches) -> Result<()> {
    let default_root = PathBuf::from("screenshots");
    let root = args.get_one::<PathBuf>("output").unwrap_or(&default_root);
    let root = PathBuf::from(shellexpand::tilde(&root.to_string_lossy()).into_owned());
    let crawls = list_available_crawls(&root)
        .with_context(|| format!("Failed to list crawls under {}", root.display()))?;
    print!("{}", format_crawl_listing(&crawls));
    Ok(())
}

pub fn handle_diff(args: &ArgMatches) -> Result<()> {
    let config = load_config(args.get_one::<PathBuf>("config"))?;
    let image_a = args
        .get_one::<PathBuf>("IMAGE_A")
        .ok_or_else(|| anyhow!("IMAGE_A is required"))?;
    let image_b = args
        .get_one::<PathBuf>("IMAGE_B")
        .ok_or_else(|| anyhow!("IMAGE_B is required"))?;
    let out = args.get_one::<PathBuf>("out");

    let analysis = analyze(image_a, image_b, out.map(PathBuf::as_path), &config.analysis);
    if analysis.ssim_score.is_none() {
        println!(
            "{} The images could not be compared (see log output with -v)",
            "⚠".yellow().bold()
        );
    }
    print!("{}", format_analysis(&analysis));
    Ok(())
}
