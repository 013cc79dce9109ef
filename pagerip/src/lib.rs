// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{load_urls_from_file, load_urls_from_source, parse_url_line};

// Re-export crawl functionality from pagerip-core
pub use pagerip_core::crawl::{CrawlOptions, CrawlProgressCallback, CrawlSummary, execute_crawl};
pub use pagerip_core::report::{ReportFormat, render_json, render_text};
