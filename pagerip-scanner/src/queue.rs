use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueueId {
    Crawl,
    Download,
}

/// Append-only sequence of URLs with a read cursor that only moves forward.
#[derive(Debug, Default, Clone)]
pub struct WorkQueue {
    items: Vec<String>,
    cursor: usize,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, url: String) {
        self.items.push(url);
    }

    pub fn claim_next(&mut self) -> Option<String> {
        let url = self.items.get(self.cursor)?.clone();
        self.cursor += 1;
        Some(url)
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor == self.items.len()
    }

    pub fn claimed(&self) -> usize {
        self.cursor
    }

    pub fn pending(&self) -> usize {
        self.items.len() - self.cursor
    }
}

/// The crawl and download queues of one run.
///
/// Only the scheduler's dispatcher mutates it, so a claim can never be
/// handed out twice.
#[derive(Debug, Default)]
pub struct QueueManager {
    crawl: WorkQueue,
    download: WorkQueue,
}

impl QueueManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn queue(&self, id: QueueId) -> &WorkQueue {
        match id {
            QueueId::Crawl => &self.crawl,
            QueueId::Download => &self.download,
        }
    }

    fn queue_mut(&mut self, id: QueueId) -> &mut WorkQueue {
        match id {
            QueueId::Crawl => &mut self.crawl,
            QueueId::Download => &mut self.download,
        }
    }

    pub fn push(&mut self, id: QueueId, url: impl Into<String>) {
        self.queue_mut(id).push(url.into());
    }

    pub fn claim_next(&mut self, id: QueueId) -> Option<String> {
        self.queue_mut(id).claim_next()
    }

    pub fn is_exhausted(&self, id: QueueId) -> bool {
        self.queue(id).is_exhausted()
    }

    pub fn claimed(&self, id: QueueId) -> usize {
        self.queue(id).claimed()
    }

    pub fn pending(&self, id: QueueId) -> usize {
        self.queue(id).pending()
    }
}
