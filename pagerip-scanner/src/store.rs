use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    Accepted,
    Duplicate,
}

impl Recorded {
    pub fn is_accepted(self) -> bool {
        self == Recorded::Accepted
    }
}

/// Insertion-ordered set of distinct URLs.
#[derive(Debug, Default, Clone)]
pub struct UrlSet {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl UrlSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: &str) -> Recorded {
        if self.contains(url) {
            return Recorded::Duplicate;
        }
        self.seen.insert(url.to_string());
        self.order.push(url.to_string());
        Recorded::Accepted
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.order
    }
}

/// Every URL seen so far: one set per root (internal and action links) plus a
/// pooled set of external URLs.
///
/// Recording never touches the work queues; enqueueing accepted URLs is up
/// to the caller.
#[derive(Debug, Default)]
pub struct DedupStore {
    per_root: Vec<UrlSet>,
    external: UrlSet,
}

impl DedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the set for a newly registered root and return its index.
    pub fn add_root(&mut self) -> usize {
        self.per_root.push(UrlSet::new());
        self.per_root.len() - 1
    }

    /// Record an internal or action URL for `root_index`.
    ///
    /// # Panics
    /// When `root_index` was never handed out by [`DedupStore::add_root`].
    pub fn try_record_internal(&mut self, root_index: usize, url: &str) -> Recorded {
        self.per_root[root_index].insert(url)
    }

    pub fn try_record_external(&mut self, url: &str) -> Recorded {
        self.external.insert(url)
    }

    /// Total number of distinct URLs recorded across all sets.
    pub fn len(&self) -> usize {
        self.per_root.iter().map(UrlSet::len).sum::<usize>() + self.external.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_parts(self) -> (Vec<Vec<String>>, Vec<String>) {
        (
            self.per_root.into_iter().map(UrlSet::into_vec).collect(),
            self.external.into_vec(),
        )
    }
}
