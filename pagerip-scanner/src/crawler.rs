use crate::config::CrawlerConfig;
use crate::error::{Result, ScanError};
use crate::event::{CrawlEvent, UrlFlags};
use crate::extract::extract_references;
use crate::fetch::{Fetch, HttpFetcher};
use crate::queue::{QueueId, QueueManager};
use crate::resolver::extract_base;
use crate::result::{CrawlOutcome, RunState};
use crate::scope::{
    Classification, DiscoveredUrl, RootSite, classify, derive_file_path, find_root,
};
use crate::store::DedupStore;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Notify, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

/// Shared, idempotent cancellation flag for a run.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelState>,
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once `cancel` has been called.
    pub async fn cancelled(&self) {
        loop {
            // Registered before the flag check so a concurrent cancel is not missed.
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// A crawler that has not started yet. Roots are registered with
/// [`Crawler::add_url`]; [`Crawler::start`] or [`Crawler::run`] consume it.
pub struct Crawler<F: Fetch = HttpFetcher> {
    config: CrawlerConfig,
    fetcher: Arc<F>,
    roots: Vec<RootSite>,
    store: DedupStore,
    queues: QueueManager,
    seeded: Vec<CrawlEvent>,
    downloads: bool,
    cancel: CancelToken,
}

impl Crawler<HttpFetcher> {
    pub fn new(config: CrawlerConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config)?;
        Ok(Self::with_fetcher(config, fetcher))
    }
}

impl<F: Fetch> Crawler<F> {
    pub fn with_fetcher(config: CrawlerConfig, fetcher: F) -> Self {
        Self {
            config,
            fetcher: Arc::new(fetcher),
            roots: Vec::new(),
            store: DedupStore::new(),
            queues: QueueManager::new(),
            seeded: Vec::new(),
            downloads: false,
            cancel: CancelToken::new(),
        }
    }

    /// Also fetch non-crawlable internal resources and report every fetched
    /// body as a `Downloaded` event.
    pub fn with_downloads(mut self, enabled: bool) -> Self {
        self.downloads = enabled;
        self
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    pub fn roots(&self) -> &[RootSite] {
        &self.roots
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Register a root and seed its base into the crawl queue.
    ///
    /// A base whose host an earlier root already covers is recorded against
    /// that earlier root, so it is never fetched twice.
    pub fn add_url(&mut self, url: &str) -> Result<()> {
        let root = RootSite::new(url, &self.config.default_protocol)?;
        let index = self.store.add_root();
        let owner = find_root(&self.roots, &root.normalized_base).unwrap_or(index);
        debug!("Registered root {} as #{} (owner #{})", root.base, index, owner);

        if self.store.try_record_internal(owner, &root.base).is_accepted() {
            self.seeded.push(CrawlEvent::Classified {
                url: root.base.clone(),
                flags: UrlFlags {
                    is_crawlable: true,
                    ..UrlFlags::default()
                },
                slot: None,
            });
            self.queues.push(QueueId::Crawl, root.base.clone());
        }
        self.roots.push(root);
        Ok(())
    }

    /// Spawn the run onto the tokio runtime.
    pub fn start(self) -> Result<CrawlHandle> {
        if self.roots.is_empty() {
            return Err(ScanError::NoRoots);
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = self.cancel.clone();
        let task = tokio::spawn(self.run(tx));
        Ok(CrawlHandle {
            events: rx,
            cancel,
            task,
        })
    }

    /// Drive the run to its end on the current task.
    pub async fn run(self, events: mpsc::UnboundedSender<CrawlEvent>) -> Result<RunState> {
        if self.roots.is_empty() {
            return Err(ScanError::NoRoots);
        }

        let Crawler {
            config,
            fetcher,
            roots,
            store,
            queues,
            seeded,
            downloads,
            cancel,
        } = self;

        let slots = config.slot_count();
        info!(
            "Starting crawl of {} root(s) with {} workers (downloads: {})",
            roots.len(),
            slots,
            downloads
        );

        let (results_tx, results_rx) = mpsc::channel(slots);
        let mut workers = JoinSet::new();
        let mut senders = Vec::with_capacity(slots);
        for slot in 0..slots {
            let (task_tx, task_rx) = mpsc::channel(1);
            workers.spawn(worker(slot, fetcher.clone(), task_rx, results_tx.clone()));
            senders.push(task_tx);
        }
        drop(results_tx);

        let mut dispatcher = Dispatcher {
            config,
            roots,
            store,
            queues,
            downloads,
            busy: vec![false; slots],
            senders,
            events,
        };
        for event in seeded {
            dispatcher.emit(event);
        }

        let state = dispatcher.drive(results_rx, &mut workers, &cancel).await;
        // In-flight fetches finish on their own; their results go nowhere.
        workers.detach_all();
        state
    }
}

/// A running crawl.
pub struct CrawlHandle {
    events: mpsc::UnboundedReceiver<CrawlEvent>,
    cancel: CancelToken,
    task: JoinHandle<Result<RunState>>,
}

impl CrawlHandle {
    /// Next event; `None` once the run has ended and every event was read.
    pub async fn next_event(&mut self) -> Option<CrawlEvent> {
        self.events.recv().await
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Wait for the run to end. Unread events are dropped.
    pub async fn wait(self) -> Result<RunState> {
        self.task.await?
    }
}

struct Task {
    queue: QueueId,
    url: String,
}

struct Page {
    body: Vec<u8>,
    references: Vec<String>,
}

struct TaskResult {
    slot: usize,
    task: Task,
    outcome: Result<Page>,
}

async fn worker<F: Fetch>(
    slot: usize,
    fetcher: Arc<F>,
    mut tasks: mpsc::Receiver<Task>,
    results: mpsc::Sender<TaskResult>,
) {
    debug!("Worker {} started", slot);

    while let Some(task) = tasks.recv().await {
        let outcome = fetcher.fetch(&task.url).await.map(|fetched| {
            let references = match task.queue {
                QueueId::Crawl => {
                    extract_references(&fetched.text(), fetched.content_type.as_deref()).collect()
                }
                QueueId::Download => Vec::new(),
            };
            Page {
                body: fetched.body,
                references,
            }
        });

        if results.send(TaskResult { slot, task, outcome }).await.is_err() {
            break;
        }
    }

    debug!("Worker {} finished", slot);
}

/// Sole owner of queues, store and slot table while a run is active.
struct Dispatcher {
    config: CrawlerConfig,
    roots: Vec<RootSite>,
    store: DedupStore,
    queues: QueueManager,
    downloads: bool,
    busy: Vec<bool>,
    senders: Vec<mpsc::Sender<Task>>,
    events: mpsc::UnboundedSender<CrawlEvent>,
}

impl Dispatcher {
    async fn drive(
        mut self,
        mut results: mpsc::Receiver<TaskResult>,
        workers: &mut JoinSet<()>,
        cancel: &CancelToken,
    ) -> Result<RunState> {
        loop {
            if cancel.is_cancelled() {
                info!("Crawl cancelled");
                return Ok(RunState::Cancelled);
            }

            self.tick();
            if self.is_complete() {
                info!(
                    "Crawl complete. {} URLs recorded across {} root(s), {} pages crawled, {} downloads",
                    self.store.len(),
                    self.roots.len(),
                    self.queues.claimed(QueueId::Crawl),
                    self.queues.claimed(QueueId::Download)
                );
                let outcome = self.complete();
                return Ok(RunState::Completed(outcome));
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {}
                Some(done) = results.recv() => self.finish_task(done),
                Some(Err(err)) = workers.join_next() => return Err(err.into()),
            }
        }
    }

    fn emit(&self, event: CrawlEvent) {
        // A consumer that stopped listening does not stop the crawl.
        let _ = self.events.send(event);
    }

    fn tick(&mut self) {
        for slot in 0..self.busy.len() {
            if self.busy[slot] {
                continue;
            }

            let task = if let Some(url) = self.queues.claim_next(QueueId::Crawl) {
                debug!("[Worker {}] Crawling {}", slot, url);
                self.emit(CrawlEvent::CrawlStarted {
                    url: url.clone(),
                    slot,
                });
                Task {
                    queue: QueueId::Crawl,
                    url,
                }
            } else if self.downloads
                && let Some(url) = self.queues.claim_next(QueueId::Download)
            {
                debug!("[Worker {}] Downloading {}", slot, url);
                Task {
                    queue: QueueId::Download,
                    url,
                }
            } else {
                // Nothing left to hand out to any idle slot.
                break;
            };

            // Idle slots have an empty channel, so this only fails if the
            // worker is gone; the join set reports that.
            if self.senders[slot].try_send(task).is_err() {
                warn!("Worker {} is not accepting tasks", slot);
            }
            self.busy[slot] = true;
        }
    }

    fn is_complete(&self) -> bool {
        !self.busy.iter().any(|busy| *busy)
            && self.queues.is_exhausted(QueueId::Crawl)
            && (!self.downloads || self.queues.is_exhausted(QueueId::Download))
    }

    fn finish_task(&mut self, done: TaskResult) {
        let TaskResult { slot, task, outcome } = done;
        self.busy[slot] = false;

        let page = match outcome {
            Ok(page) => page,
            Err(err) => {
                warn!("[Worker {}] {}", slot, err);
                self.emit(CrawlEvent::Error(err));
                return;
            }
        };

        if self.downloads {
            self.emit(CrawlEvent::Downloaded {
                path: derive_file_path(&task.url),
                url: task.url.clone(),
                bytes: page.body,
                slot,
            });
        }

        if task.queue == QueueId::Crawl {
            self.discover(&task.url, page.references, slot);
        }
    }

    fn discover(&mut self, page_url: &str, references: Vec<String>, slot: usize) {
        let page_base = match extract_base(page_url, &self.config.default_protocol) {
            Ok(base) => base,
            Err(err) => {
                warn!("[Worker {}] {}", slot, err);
                self.emit(CrawlEvent::Error(err));
                return;
            }
        };

        debug!(
            "[Worker {}] {} references found on {}",
            slot,
            references.len(),
            page_url
        );

        for reference in references {
            match classify(&reference, &page_base, page_url, &self.roots, &self.config) {
                Ok(Some(found)) => self.record(found, slot),
                Ok(None) => debug!("Dropping action link {} on {}", reference, page_url),
                Err(err) => {
                    let err = ScanError::Parse {
                        reason: err.to_string(),
                        reference,
                        page: page_url.to_string(),
                    };
                    warn!("[Worker {}] {}", slot, err);
                    self.emit(CrawlEvent::Error(err));
                }
            }
        }
    }

    fn record(&mut self, found: DiscoveredUrl, slot: usize) {
        let DiscoveredUrl {
            absolute,
            classification,
            crawlable,
            ..
        } = found;

        let (recorded, flags) = match classification {
            Classification::Action(root) => (
                self.store.try_record_internal(root, &absolute),
                UrlFlags {
                    is_action: true,
                    ..UrlFlags::default()
                },
            ),
            Classification::Internal(root) => (
                self.store.try_record_internal(root, &absolute),
                UrlFlags {
                    is_crawlable: crawlable,
                    ..UrlFlags::default()
                },
            ),
            Classification::External => (
                self.store.try_record_external(&absolute),
                UrlFlags {
                    is_external: true,
                    ..UrlFlags::default()
                },
            ),
        };

        if !recorded.is_accepted() {
            return;
        }

        debug!(
            "[Worker {}] Recorded {} {:?} ({} pages pending)",
            slot,
            absolute,
            flags,
            self.queues.pending(QueueId::Crawl)
        );
        self.emit(CrawlEvent::Classified {
            url: absolute.clone(),
            flags,
            slot: Some(slot),
        });

        match classification {
            Classification::Internal(_) if crawlable => self.queues.push(QueueId::Crawl, absolute),
            Classification::Internal(_) if self.downloads => {
                self.queues.push(QueueId::Download, absolute)
            }
            _ => {}
        }
    }

    fn complete(self) -> CrawlOutcome {
        let (urls, external) = self.store.into_parts();
        let outcome = CrawlOutcome::new(self.roots, urls, external);
        let _ = self.events.send(CrawlEvent::Complete(outcome.clone()));
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::Fetched;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    /// In-memory site; unknown URLs answer 404.
    #[derive(Default)]
    struct StaticFetcher {
        pages: HashMap<String, (String, String)>,
        requested: Arc<Mutex<Vec<String>>>,
    }

    impl StaticFetcher {
        fn page(mut self, url: &str, content_type: &str, body: &str) -> Self {
            self.pages
                .insert(url.to_string(), (content_type.to_string(), body.to_string()));
            self
        }

        fn html(self, url: &str, body: &str) -> Self {
            self.page(url, "text/html", body)
        }
    }

    impl Fetch for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<Fetched> {
            self.requested.lock().unwrap().push(url.to_string());
            match self.pages.get(url) {
                Some((content_type, body)) => {
                    Ok(Fetched::new(url, Some(content_type.as_str()), body.as_bytes()))
                }
                None => Err(ScanError::Status {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        }
    }

    /// Never answers.
    struct HangingFetcher;

    impl Fetch for HangingFetcher {
        async fn fetch(&self, _url: &str) -> Result<Fetched> {
            std::future::pending().await
        }
    }

    async fn collect<F: Fetch>(crawler: Crawler<F>) -> (RunState, Vec<CrawlEvent>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let state = crawler.run(tx).await.unwrap();
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        (state, events)
    }

    fn started(events: &[CrawlEvent]) -> Vec<(String, usize)> {
        events
            .iter()
            .filter_map(|event| match event {
                CrawlEvent::CrawlStarted { url, slot } => Some((url.clone(), *slot)),
                _ => None,
            })
            .collect()
    }

    fn classified(events: &[CrawlEvent]) -> Vec<(String, UrlFlags)> {
        events
            .iter()
            .filter_map(|event| match event {
                CrawlEvent::Classified { url, flags, .. } => Some((url.clone(), *flags)),
                _ => None,
            })
            .collect()
    }

    fn complete_count(events: &[CrawlEvent]) -> usize {
        events.iter().filter(|event| event.is_terminal()).count()
    }

    #[tokio::test]
    async fn test_end_to_end_internal_and_external() {
        let fetcher = StaticFetcher::default()
            .html("https://a.com", r#"<a href="/b.html">b</a>"#)
            .html(
                "https://a.com/b.html",
                r#"<a href="https://other.com/c.html">c</a>"#,
            );
        let mut crawler = Crawler::with_fetcher(CrawlerConfig::default(), fetcher);
        crawler.add_url("https://a.com").unwrap();

        let (state, events) = collect(crawler).await;

        let outcome = state.into_outcome().expect("run should complete");
        assert_eq!(outcome.urls, vec![vec!["https://a.com", "https://a.com/b.html"]]);
        assert_eq!(outcome.external, vec!["https://other.com/c.html"]);
        assert_eq!(complete_count(&events), 1);
        assert!(events.last().is_some_and(CrawlEvent::is_terminal));
    }

    #[tokio::test]
    async fn test_root_is_classified_before_start() {
        let fetcher = StaticFetcher::default().html("https://a.com", "");
        let mut crawler = Crawler::with_fetcher(CrawlerConfig::default(), fetcher);
        crawler.add_url("https://a.com/start/page.html").unwrap();

        let (_, events) = collect(crawler).await;

        match &events[0] {
            CrawlEvent::Classified { url, flags, slot } => {
                assert_eq!(url, "https://a.com");
                assert!(flags.is_crawlable);
                assert_eq!(*slot, None);
            }
            other => panic!("unexpected first event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_roots_is_fatal() {
        let crawler = Crawler::with_fetcher(CrawlerConfig::default(), StaticFetcher::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(matches!(crawler.run(tx).await, Err(ScanError::NoRoots)));

        let crawler = Crawler::with_fetcher(CrawlerConfig::default(), StaticFetcher::default());
        assert!(matches!(crawler.start(), Err(ScanError::NoRoots)));
    }

    #[test]
    fn test_malformed_root_is_rejected() {
        let mut crawler =
            Crawler::with_fetcher(CrawlerConfig::default(), StaticFetcher::default());
        assert!(matches!(
            crawler.add_url("localhost"),
            Err(ScanError::MalformedUrl(_))
        ));
        assert!(crawler.roots().is_empty());
    }

    #[tokio::test]
    async fn test_cycles_terminate_and_record_once() {
        let fetcher = StaticFetcher::default()
            .html("https://a.com", "<a href='/x.html'></a><a href='/y.html'></a>")
            .html("https://a.com/x.html", "<a href='/y.html'></a><a href='/'></a>")
            .html("https://a.com/y.html", "<a href='/x.html'></a><a href='https://a.com'></a>")
            .html("https://a.com/", "<a href='/x.html'></a>");
        let requested = fetcher.requested.clone();
        let mut crawler =
            Crawler::with_fetcher(CrawlerConfig::default().with_threads(3), fetcher);
        crawler.add_url("https://a.com").unwrap();

        let (state, events) = collect(crawler).await;

        let outcome = state.into_outcome().unwrap();
        let mut urls = outcome.urls[0].clone();
        urls.sort();
        assert_eq!(
            urls,
            [
                "https://a.com",
                "https://a.com/",
                "https://a.com/x.html",
                "https://a.com/y.html"
            ]
        );
        assert_eq!(classified(&events).len(), 4);
        assert_eq!(requested.lock().unwrap().len(), 4);
        assert_eq!(complete_count(&events), 1);
    }

    #[tokio::test]
    async fn test_single_slot_claims_in_fifo_order() {
        let fetcher = StaticFetcher::default()
            .html("https://a.com", "<a href='/1.html'></a><a href='/2.html'></a>")
            .html("https://a.com/1.html", "<a href='/3.html'></a>")
            .html("https://a.com/2.html", "")
            .html("https://a.com/3.html", "");
        let mut crawler =
            Crawler::with_fetcher(CrawlerConfig::default().with_threads(1), fetcher);
        crawler.add_url("https://a.com").unwrap();

        let (_, events) = collect(crawler).await;

        assert_eq!(
            started(&events),
            [
                ("https://a.com".to_string(), 0),
                ("https://a.com/1.html".to_string(), 0),
                ("https://a.com/2.html".to_string(), 0),
                ("https://a.com/3.html".to_string(), 0),
            ]
        );
    }

    #[tokio::test]
    async fn test_downloadable_urls_are_recorded_but_not_fetched() {
        let fetcher = StaticFetcher::default().html(
            "https://a.com",
            "<img src='/logo.png'><a href='/about'></a>",
        )
        .html("https://a.com/about", "");
        let requested = fetcher.requested.clone();
        let mut crawler = Crawler::with_fetcher(CrawlerConfig::default(), fetcher);
        crawler.add_url("https://a.com").unwrap();

        let (state, events) = collect(crawler).await;

        let outcome = state.into_outcome().unwrap();
        assert_eq!(
            outcome.urls[0],
            ["https://a.com", "https://a.com/logo.png", "https://a.com/about"]
        );
        assert!(!requested.lock().unwrap().contains(&"https://a.com/logo.png".to_string()));
        assert!(!events.iter().any(|e| matches!(e, CrawlEvent::Downloaded { .. })));

        let logo = classified(&events)
            .into_iter()
            .find(|(url, _)| url.ends_with("logo.png"))
            .unwrap();
        assert_eq!(logo.1, UrlFlags::default());
    }

    #[tokio::test]
    async fn test_downloads_fetch_resources_and_pages() {
        let fetcher = StaticFetcher::default()
            .html("https://a.com", "<img src='/img/logo.png'>")
            .page("https://a.com/img/logo.png", "image/png", "PNG");
        let mut crawler = Crawler::with_fetcher(CrawlerConfig::default(), fetcher)
            .with_downloads(true);
        crawler.add_url("https://a.com").unwrap();

        let (state, events) = collect(crawler).await;

        let mut downloads: Vec<(String, String, Vec<u8>)> = events
            .into_iter()
            .filter_map(|event| match event {
                CrawlEvent::Downloaded {
                    url, path, bytes, ..
                } => Some((url, path, bytes)),
                _ => None,
            })
            .collect();
        downloads.sort();

        assert_eq!(
            downloads,
            [
                (
                    "https://a.com".to_string(),
                    "a.com/index.html".to_string(),
                    b"<img src='/img/logo.png'>".to_vec()
                ),
                (
                    "https://a.com/img/logo.png".to_string(),
                    "a.com/img/logo.png".to_string(),
                    b"PNG".to_vec()
                ),
            ]
        );
        assert!(!state.is_cancelled());
    }

    #[tokio::test]
    async fn test_actions_belong_to_page_root() {
        let fetcher = StaticFetcher::default().html(
            "https://a.com",
            "<a href='mailto:test@x.com'></a><a href='tel:5555555555'></a>",
        );
        let mut crawler = Crawler::with_fetcher(CrawlerConfig::default(), fetcher);
        crawler.add_url("https://a.com").unwrap();

        let (state, events) = collect(crawler).await;

        let outcome = state.into_outcome().unwrap();
        assert_eq!(
            outcome.urls[0],
            ["https://a.com", "mailto:test@x.com", "tel:5555555555"]
        );
        let actions: Vec<_> = classified(&events)
            .into_iter()
            .filter(|(_, flags)| flags.is_action)
            .collect();
        assert_eq!(actions.len(), 2);
    }

    #[tokio::test]
    async fn test_errors_do_not_stop_the_crawl() {
        let fetcher = StaticFetcher::default()
            .html("https://a.com", "<a href='/gone.html'></a><a href='//'></a><a href='/ok.html'></a>")
            .html("https://a.com/ok.html", "");
        let mut crawler = Crawler::with_fetcher(CrawlerConfig::default(), fetcher);
        crawler.add_url("https://a.com").unwrap();

        let (state, events) = collect(crawler).await;

        let errors: Vec<&ScanError> = events
            .iter()
            .filter_map(|event| match event {
                CrawlEvent::Error(err) => Some(err),
                _ => None,
            })
            .collect();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|err| matches!(err, ScanError::Parse { reference, .. } if reference == "//")));
        assert!(errors.iter().any(|err| matches!(err, ScanError::Status { status: 404, .. })));

        let outcome = state.into_outcome().unwrap();
        assert!(outcome.urls[0].contains(&"https://a.com/ok.html".to_string()));
        assert_eq!(complete_count(&events), 1);
    }

    #[tokio::test]
    async fn test_first_registered_root_wins() {
        let fetcher = StaticFetcher::default()
            .html("https://a.com", "<a href='https://b.com/x.html'></a>")
            .html("https://b.com", "<a href='https://a.com/y.html'></a>")
            .html("https://b.com/x.html", "")
            .html("https://a.com/y.html", "");
        let mut crawler = Crawler::with_fetcher(CrawlerConfig::default(), fetcher);
        crawler.add_url("https://a.com").unwrap();
        crawler.add_url("https://b.com").unwrap();

        let (state, _) = collect(crawler).await;

        let outcome = state.into_outcome().unwrap();
        assert_eq!(outcome.urls[0], ["https://a.com", "https://a.com/y.html"]);
        assert_eq!(outcome.urls[1], ["https://b.com", "https://b.com/x.html"]);
        assert!(outcome.external.is_empty());
    }

    #[tokio::test]
    async fn test_roots_sharing_a_host_fetch_the_base_once() {
        let fetcher = StaticFetcher::default()
            .html("https://a.com", "<a href='/x.html'></a>")
            .html("https://a.com/x.html", "");
        let requested = fetcher.requested.clone();
        let mut crawler = Crawler::with_fetcher(CrawlerConfig::default(), fetcher);
        crawler.add_url("https://a.com").unwrap();
        crawler.add_url("https://a.com/other").unwrap();
        crawler.add_url("https://u:p@a.com").unwrap();
        assert_eq!(crawler.roots().len(), 3);

        let (state, events) = collect(crawler).await;

        let requested = requested.lock().unwrap().clone();
        assert_eq!(
            requested.iter().filter(|url| *url == "https://a.com").count(),
            1
        );
        let outcome = state.into_outcome().unwrap();
        assert_eq!(outcome.roots.len(), 3);
        assert!(outcome.urls[1].is_empty());
        assert!(outcome.urls[2].is_empty());
        assert_eq!(outcome.urls[0][0], "https://a.com");
        assert!(outcome.urls[0].contains(&"https://a.com/x.html".to_string()));
        assert_eq!(
            classified(&events)
                .iter()
                .filter(|(url, _)| url == "https://a.com")
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_cancel_before_start_never_completes() {
        let fetcher = StaticFetcher::default().html("https://a.com", "");
        let requested = fetcher.requested.clone();
        let mut crawler = Crawler::with_fetcher(CrawlerConfig::default(), fetcher);
        crawler.add_url("https://a.com").unwrap();
        crawler.cancel_token().cancel();

        let (state, events) = collect(crawler).await;

        assert_eq!(state, RunState::Cancelled);
        assert_eq!(complete_count(&events), 0);
        assert!(started(&events).is_empty());
        assert!(requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_while_fetches_are_in_flight() {
        let mut crawler = Crawler::with_fetcher(CrawlerConfig::default(), HangingFetcher);
        crawler.add_url("https://a.com").unwrap();

        let mut handle = crawler.start().unwrap();
        loop {
            match handle.next_event().await {
                Some(CrawlEvent::CrawlStarted { .. }) => break,
                Some(_) => continue,
                None => panic!("run ended before the root was claimed"),
            }
        }
        handle.cancel();
        handle.cancel();

        let mut rest = Vec::new();
        while let Some(event) = handle.next_event().await {
            rest.push(event);
        }
        assert_eq!(complete_count(&rest), 0);
        assert_eq!(handle.wait().await.unwrap(), RunState::Cancelled);
    }

    #[test]
    fn test_cancel_token_is_idempotent_and_shared() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        token.cancel();
        assert!(other.is_cancelled());
    }

    /// Test that crawler discovers and follows links with a real HTTP server
    #[tokio::test]
    async fn test_link_discovery() {
        let mock_server = MockServer::start().await;

        let root_html = r#"<html><body>
            <a href="/page1">Page 1</a>
            <a href="/page2">Page 2</a>
        </body></html>"#;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_bytes(root_html.as_bytes()),
            )
            .mount(&mock_server)
            .await;

        for page in ["/page1", "/page2"] {
            Mock::given(method("GET"))
                .and(path(page))
                .respond_with(
                    ResponseTemplate::new(200)
                        .insert_header("content-type", "text/html")
                        .set_body_bytes(b"<html><body>Page</body></html>".as_slice()),
                )
                .expect(1)
                .mount(&mock_server)
                .await;
        }

        let mut crawler = Crawler::new(CrawlerConfig::default().with_threads(2)).unwrap();
        crawler.add_url(&mock_server.uri()).unwrap();

        let (state, events) = collect(crawler).await;
        let outcome = state.into_outcome().unwrap();

        let base = mock_server.uri();
        assert_eq!(
            outcome.urls[0],
            [base.clone(), format!("{}/page1", base), format!("{}/page2", base)]
        );
        assert_eq!(started(&events).len(), 3);
    }

    /// Test that multiple workers are actually used during crawling
    #[tokio::test]
    async fn test_multiple_workers_are_used() {
        let mock_server = MockServer::start().await;

        let mut root_html = String::from("<html><body>");
        for i in 1..=10 {
            root_html.push_str(&format!(r#"<a href="/page{}">Page {}</a>"#, i, i));
        }
        root_html.push_str("</body></html>");

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_bytes(root_html.as_bytes()),
            )
            .mount(&mock_server)
            .await;

        for i in 1..=10 {
            Mock::given(method("GET"))
                .and(path(format!("/page{}", i)))
                .respond_with(
                    ResponseTemplate::new(200)
                        .insert_header("content-type", "text/html")
                        .set_body_bytes(b"<html><body>Page</body></html>".as_slice())
                        .set_delay(std::time::Duration::from_millis(20)),
                )
                .mount(&mock_server)
                .await;
        }

        let num_workers = 4;
        let mut crawler =
            Crawler::new(CrawlerConfig::default().with_threads(num_workers)).unwrap();
        crawler.add_url(&mock_server.uri()).unwrap();

        let (_, events) = collect(crawler).await;

        let mut activity: HashMap<usize, usize> = HashMap::new();
        for (_, slot) in started(&events) {
            *activity.entry(slot).or_insert(0) += 1;
        }

        assert_eq!(activity.values().sum::<usize>(), 11);
        assert_eq!(
            activity.len(),
            num_workers,
            "Expected every worker to be used. Distribution: {:?}",
            activity
        );
        assert!(activity.keys().all(|slot| *slot < num_workers));
    }
}
