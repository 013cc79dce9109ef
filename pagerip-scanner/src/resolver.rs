use crate::error::{Result, ScanError};
use regex::Regex;
use std::sync::LazyLock;

// Delimiter (`https://`, `//`, `://`) followed by a dotted authority. Bare
// domains without any delimiter are accepted too.
static URL_BASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(([a-z0-9]+)?:?//)?([^/\s?#]+\.[^/\s?#]+)").unwrap()
});

static URL_IS_ABSOLUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[a-z0-9]*://.").unwrap());

// username:password@example.com
static URL_BASIC_AUTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^((?:[a-z0-9]+)?:?//)?[^/@\s:]+:[^/@\s]*@").unwrap()
});

// scheme://authority plus the path up to and including its last slash
static URL_DIRECTORY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[a-z0-9]+://[^/]+(?:.*/)?").unwrap());

/// Extract `scheme://authority` from a URL-like string.
///
/// Accepts fully qualified (`https://example.com/x`), protocol-relative
/// (`//example.com/x`) and bare (`example.com/x`) forms. When the string
/// carries no scheme, `default_protocol` is used.
pub fn extract_base(url: &str, default_protocol: &str) -> Result<String> {
    let caps = URL_BASE
        .captures(url)
        .ok_or_else(|| ScanError::MalformedUrl(url.to_string()))?;

    let protocol = caps
        .get(2)
        .map(|m| m.as_str())
        .unwrap_or(default_protocol);
    let authority = &caps[3];

    Ok(format!("{}://{}", protocol, authority))
}

/// Best-effort base exactly as written in `url` (delimiter included), or
/// `None` when nothing domain-like is present. Never fails.
pub fn extract_raw_base(url: &str) -> Option<&str> {
    URL_BASE.find(url).map(|m| m.as_str())
}

pub fn is_absolute(url: &str) -> bool {
    URL_IS_ABSOLUTE.is_match(url)
}

/// Remove a `user:pass@` segment directly following the scheme delimiter.
pub fn strip_credentials(url: &str) -> String {
    URL_BASIC_AUTH.replace(url, "$1").into_owned()
}

/// The URL with its raw base removed. Strings without a base come back as-is.
pub fn get_path(url: &str) -> &str {
    match extract_raw_base(url) {
        Some(base) => &url[base.len()..],
        None => url,
    }
}

/// Join a host (or directory) and a path with exactly one `/` between them.
pub fn join_url(host: &str, path: &str) -> String {
    match (host.ends_with('/'), path.starts_with('/')) {
        (false, false) => format!("{}/{}", host, path),
        (true, true) => format!("{}{}", &host[..host.len() - 1], path),
        _ => format!("{}{}", host, path),
    }
}

/// Directory of an absolute document URL: scheme, authority and the path up
/// to and including its last `/`. Query and fragment are ignored.
/// Non-absolute input is returned unchanged.
pub fn directory_of(url: &str) -> &str {
    let without_query = match url.find(['?', '#']) {
        Some(idx) => &url[..idx],
        None => url,
    };
    URL_DIRECTORY
        .find(without_query)
        .map(|m| m.as_str())
        .unwrap_or(url)
}

/// Resolve a reference found on `current_document` into an absolute URL.
///
/// Paths starting with `.` resolve against the directory of the current
/// document; leading `./` segments are dropped but `..` segments are kept
/// verbatim. Everything else resolves against `base`, unless the reference
/// carries its own authority (`//cdn.example.com/app.js`), in which case that
/// authority wins.
pub fn resolve_relative(
    reference: &str,
    base: &str,
    current_document: &str,
    default_protocol: &str,
) -> Result<String> {
    if is_absolute(reference) {
        return Ok(reference.to_string());
    }

    let (own_base, path) = if reference.starts_with("//") {
        (
            Some(extract_base(reference, default_protocol)?),
            get_path(reference),
        )
    } else {
        (None, reference)
    };

    if path.starts_with('.') {
        let mut path = path;
        while let Some(rest) = path.strip_prefix("./") {
            path = rest;
        }
        return Ok(join_url(directory_of(current_document), path));
    }

    let host = match own_base {
        Some(ref own) if own != base => own.as_str(),
        _ => base,
    };
    Ok(join_url(host, path))
}
