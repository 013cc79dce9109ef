use crate::config::CrawlerConfig;
use crate::error::Result;
use crate::resolver::{extract_base, resolve_relative, strip_credentials};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

// mailto:test@test.com, tel:5555555555
static URL_ACTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[a-z0-9]+:(.+)$").unwrap());

const DEFAULT_PAGE_NAME: &str = "index";
const DEFAULT_PAGE_EXTENSION: &str = "html";

/// A user-registered starting point. Its index in the root list is its identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootSite {
    /// Base as supplied, credentials included.
    pub base: String,
    /// Base with credentials stripped; what discovered URLs are matched against.
    pub normalized_base: String,
}

impl RootSite {
    pub fn new(url: &str, default_protocol: &str) -> Result<Self> {
        let base = extract_base(url, default_protocol)?;
        let normalized_base = strip_credentials(&base);
        Ok(Self {
            base,
            normalized_base,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Non-fetchable scheme usage, owned by the root the page belongs to.
    Action(usize),
    Internal(usize),
    External,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredUrl {
    pub raw: String,
    pub absolute: String,
    pub classification: Classification,
    pub crawlable: bool,
}

pub fn is_action(url: &str) -> bool {
    URL_ACTION
        .captures(url)
        .is_some_and(|caps| !caps[1].starts_with("//"))
}

/// First root (in registration order) whose normalized base equals `base`.
pub fn find_root(roots: &[RootSite], base: &str) -> Option<usize> {
    roots.iter().position(|root| root.normalized_base == base)
}

/// Classify a URL that is already absolute.
pub fn classify_absolute(
    absolute: &str,
    roots: &[RootSite],
    default_protocol: &str,
) -> Result<Classification> {
    let base = strip_credentials(&extract_base(absolute, default_protocol)?);
    Ok(match find_root(roots, &base) {
        Some(index) => Classification::Internal(index),
        None => Classification::External,
    })
}

/// Resolve and classify a reference found on `current_document`, whose base is
/// `page_base`.
///
/// Returns `Ok(None)` for action links on pages that belong to no root.
pub fn classify(
    reference: &str,
    page_base: &str,
    current_document: &str,
    roots: &[RootSite],
    config: &CrawlerConfig,
) -> Result<Option<DiscoveredUrl>> {
    if is_action(reference) {
        // Action URLs have no host, so they belong to the page's root.
        let owner = find_root(roots, &strip_credentials(page_base));
        return Ok(owner.map(|index| DiscoveredUrl {
            raw: reference.to_string(),
            absolute: reference.to_string(),
            classification: Classification::Action(index),
            crawlable: false,
        }));
    }

    let absolute = resolve_relative(
        reference,
        page_base,
        current_document,
        &config.default_protocol,
    )?;
    let classification = classify_absolute(&absolute, roots, &config.default_protocol)?;
    let crawlable = matches!(classification, Classification::Internal(_))
        && is_crawlable(&absolute, &config.crawl_extensions);

    Ok(Some(DiscoveredUrl {
        raw: reference.to_string(),
        absolute,
        classification,
        crawlable,
    }))
}

// scheme, authority and path of an absolute URL; query and fragment dropped
fn split_url(url: &str) -> (&str, &str) {
    let rest = match url.find("://") {
        Some(idx) => &url[idx + 3..],
        None => url.strip_prefix("//").unwrap_or(url),
    };
    let rest = match rest.find(['?', '#']) {
        Some(idx) => &rest[..idx],
        None => rest,
    };
    match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, ""),
    }
}

fn segment_extension(segment: &str) -> Option<&str> {
    match segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
        _ => None,
    }
}

/// Lower-cased extension of the last path segment of an absolute URL.
pub fn url_extension(url: &str) -> Option<String> {
    let (_, path) = split_url(url);
    let segment = path.rsplit('/').next()?;
    segment_extension(segment).map(|ext| ext.to_ascii_lowercase())
}

pub fn is_crawlable(url: &str, crawl_extensions: &[String]) -> bool {
    match url_extension(url) {
        None => true,
        Some(ext) => crawl_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&ext)),
    }
}

/// Relative file path downloaded content for `url` is saved under:
/// authority followed by the path, with `index` standing in for a missing
/// file name and `.html` appended when the file has no extension.
pub fn derive_file_path(url: &str) -> String {
    let stripped = strip_credentials(url);
    let (authority, path) = split_url(&stripped);

    let mut segments: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .collect();
    let file_name = if path.ends_with('/') {
        None
    } else {
        segments.pop()
    };

    let mut file_name = file_name.unwrap_or(DEFAULT_PAGE_NAME).to_string();
    if segment_extension(&file_name).is_none() {
        file_name.push('.');
        file_name.push_str(DEFAULT_PAGE_EXTENSION);
    }

    let mut parts = vec![authority.replace(':', "_")];
    parts.extend(segments.iter().map(|s| s.to_string()));
    parts.push(file_name);
    parts.join("/")
}
