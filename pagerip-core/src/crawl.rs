use crate::download::save_download;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use pagerip_scanner::{CrawlEvent, CrawlOutcome, Crawler, CrawlerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Options for configuring a crawl operation
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub urls: Vec<String>,
    pub threads: usize,
    pub protocol: String,
    /// Save every fetched resource under this directory when set.
    pub download_dir: Option<PathBuf>,
    pub accept_invalid_certs: bool,
    pub show_progress: bool,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            threads: pagerip_scanner::config::DEFAULT_THREADS,
            protocol: pagerip_scanner::config::DEFAULT_PROTOCOL.to_string(),
            download_dir: None,
            accept_invalid_certs: false,
            show_progress: false,
        }
    }
}

impl CrawlOptions {
    pub fn config(&self) -> CrawlerConfig {
        CrawlerConfig::new()
            .with_threads(self.threads)
            .with_default_protocol(self.protocol.clone())
            .with_accept_invalid_certs(self.accept_invalid_certs)
    }
}

/// Callback for reporting crawl progress
pub type CrawlProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

#[derive(Debug, Clone, Default)]
pub struct CrawlSummary {
    /// `None` when the crawl was cancelled.
    pub outcome: Option<CrawlOutcome>,
    pub crawled: usize,
    pub errors: usize,
    pub downloaded: usize,
    pub saved_files: Vec<PathBuf>,
}

impl CrawlSummary {
    pub fn is_cancelled(&self) -> bool {
        self.outcome.is_none()
    }
}

/// Execute a crawl with the given options, consuming its events until the
/// run ends. Ctrl-C cancels the run.
pub async fn execute_crawl(
    options: CrawlOptions,
    progress_callback: Option<CrawlProgressCallback>,
) -> Result<CrawlSummary> {
    let config = options.config();
    let CrawlOptions {
        urls,
        download_dir,
        show_progress,
        ..
    } = options;

    let mut crawler = Crawler::new(config)?.with_downloads(download_dir.is_some());
    for url in &urls {
        crawler
            .add_url(url)
            .with_context(|| format!("Cannot crawl '{}'", url))?;
    }
    let mut handle = crawler.start()?;

    let cancel = handle.cancel_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling crawl");
            cancel.cancel();
        }
    });

    // Set up single progress bar for overall crawl progress (only if enabled)
    let progress_bar = if show_progress {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Starting crawl...");
        Some(pb)
    } else {
        None
    };

    let report = |msg: String| {
        if let Some(ref callback) = progress_callback {
            match progress_bar {
                Some(ref pb) => pb.suspend(|| callback(msg)),
                None => callback(msg),
            }
        }
    };

    let mut summary = CrawlSummary::default();
    while let Some(event) = handle.next_event().await {
        match event {
            CrawlEvent::Classified { url, flags, .. } => {
                if !flags.is_external {
                    report(format!("ADDED: {}", url));
                }
            }
            CrawlEvent::CrawlStarted { url, slot } => {
                summary.crawled += 1;
                if let Some(ref pb) = progress_bar {
                    pb.set_message(format!(
                        "Crawling... {} URLs processed [{}] {}",
                        summary.crawled, slot, url
                    ));
                }
            }
            CrawlEvent::Downloaded {
                url, path, bytes, ..
            } => {
                let Some(ref dir) = download_dir else {
                    continue;
                };
                match save_download(dir, &path, &bytes).await {
                    Ok(saved) => {
                        summary.downloaded += 1;
                        report(format!("DOWNLOADED: {} -> {}", url, saved.display()));
                        summary.saved_files.push(saved);
                    }
                    Err(e) => {
                        warn!("Failed to save {}: {:#}", url, e);
                        summary.errors += 1;
                    }
                }
            }
            CrawlEvent::Error(e) => {
                warn!("{}", e);
                summary.errors += 1;
            }
            CrawlEvent::Complete(_) => {
                info!("Crawl of {} root(s) complete", urls.len());
            }
        }
    }

    interrupt.abort();
    let state = handle.wait().await?;
    summary.outcome = state.into_outcome();

    // Finish progress bar (only if enabled)
    if let Some(pb) = progress_bar {
        let message = if summary.is_cancelled() {
            format!("Crawl cancelled after {} URLs", summary.crawled)
        } else {
            format!("Crawl complete! {} URLs processed", summary.crawled)
        };
        pb.finish_with_message(message);
    }

    Ok(summary)
}
