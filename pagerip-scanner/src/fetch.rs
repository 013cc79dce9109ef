use crate::config::CrawlerConfig;
use crate::error::{Result, ScanError};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// A fetched resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl Fetched {
    pub fn new(url: impl Into<String>, content_type: Option<&str>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            url: url.into(),
            status_code: 200,
            content_type: content_type.map(str::to_string),
            body: body.into(),
        }
    }

    /// Body decoded as UTF-8, invalid sequences replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Transport used by the scheduler's workers. Fetches are the only
/// suspension points of a crawl.
pub trait Fetch: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Fetched>> + Send;
}

/// `reqwest` backed transport.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .connect_timeout(config.timeout / 2)
            .pool_max_idle_per_host(config.slot_count())
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(ScanError::Client)?;

        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Fetched> {
        debug!("Fetching {}", url);

        let http_error = |source| ScanError::Http {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(http_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // HeaderMap lookups are case-insensitive.
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = response.bytes().await.map_err(http_error)?;

        Ok(Fetched {
            url: url.to_string(),
            status_code: status.as_u16(),
            content_type,
            body: body.to_vec(),
        })
    }
}
