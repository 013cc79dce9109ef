use crate::error::ScanError;
use crate::result::CrawlOutcome;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlFlags {
    pub is_action: bool,
    pub is_external: bool,
    pub is_crawlable: bool,
}

/// Everything a crawl reports to its collaborators, in the order it happens.
#[derive(Debug)]
pub enum CrawlEvent {
    /// A URL was accepted into one of the result sets. Never sent for duplicates.
    Classified {
        url: String,
        flags: UrlFlags,
        /// Slot whose task discovered the URL; `None` for registered roots.
        slot: Option<usize>,
    },
    CrawlStarted {
        url: String,
        slot: usize,
    },
    /// Content fetched while downloads are enabled, with the relative path it
    /// should be stored under.
    Downloaded {
        url: String,
        path: String,
        bytes: Vec<u8>,
        slot: usize,
    },
    /// Recoverable per-URL failure. The crawl carries on.
    Error(ScanError),
    /// Terminal. Sent exactly once per completed run and never after a cancel.
    Complete(CrawlOutcome),
}

impl CrawlEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CrawlEvent::Complete(_))
    }
}
