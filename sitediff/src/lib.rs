pub mod handlers;

// Re-export commonly used helpers for convenience
pub use handlers::{
    apply_overrides, format_analysis, format_crawl_listing, load_config, parse_run_ref,
    parse_site_url,
};
