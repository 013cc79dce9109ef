pub mod config;
pub mod crawler;
pub mod error;
pub mod event;
pub mod extract;
pub mod fetch;
pub mod queue;
pub mod resolver;
pub mod result;
pub mod scope;
pub mod store;

pub use config::CrawlerConfig;
pub use crawler::{CancelToken, CrawlHandle, Crawler};
pub use error::{Result, ScanError};
pub use event::{CrawlEvent, UrlFlags};
pub use fetch::{Fetch, Fetched, HttpFetcher};
pub use result::{CrawlOutcome, RunState};
pub use scope::{RootSite, derive_file_path};
