use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_THREADS: usize = 10;
pub const DEFAULT_PROTOCOL: &str = "https";

/// Crawl a URL when it has no extension or its extension is one of these.
pub const DEFAULT_CRAWL_EXTENSIONS: &[&str] =
    &["html", "css", "php", "asp", "aspx", "cshtml", "jsp", "cgi"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of concurrent task slots.
    pub threads: usize,

    /// Scheme used when a URL does not carry one.
    pub default_protocol: String,

    pub crawl_extensions: Vec<String>,

    /// Skip TLS certificate validation.
    pub accept_invalid_certs: bool,

    /// Per-request timeout applied by the HTTP transport.
    pub timeout: Duration,

    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            threads: DEFAULT_THREADS,
            default_protocol: DEFAULT_PROTOCOL.to_string(),
            crawl_extensions: DEFAULT_CRAWL_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            accept_invalid_certs: false,
            timeout: Duration::from_secs(30),
            user_agent: format!("PageRip/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl CrawlerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn with_default_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.default_protocol = protocol.into();
        self
    }

    pub fn with_crawl_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.crawl_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Slot count actually used by the scheduler.
    pub fn slot_count(&self) -> usize {
        self.threads.max(1)
    }
}
