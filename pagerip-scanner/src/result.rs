use crate::scope::RootSite;
use serde::{Deserialize, Serialize};

/// Result collections of a completed crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlOutcome {
    pub roots: Vec<RootSite>,
    /// One list per root, same order as `roots`, in discovery order.
    pub urls: Vec<Vec<String>>,
    pub external: Vec<String>,
}

impl CrawlOutcome {
    pub fn new(roots: Vec<RootSite>, urls: Vec<Vec<String>>, external: Vec<String>) -> Self {
        Self {
            roots,
            urls,
            external,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Completed(CrawlOutcome),
    Cancelled,
}

impl RunState {
    pub fn outcome(&self) -> Option<&CrawlOutcome> {
        match self {
            RunState::Completed(outcome) => Some(outcome),
            RunState::Cancelled => None,
        }
    }

    pub fn into_outcome(self) -> Option<CrawlOutcome> {
        match self {
            RunState::Completed(outcome) => Some(outcome),
            RunState::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunState::Cancelled)
    }
}
