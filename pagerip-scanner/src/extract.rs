use regex::Regex;
use std::collections::VecDeque;
use std::sync::LazyLock;

static MIME_HTML: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^\s*text/html\b").unwrap());
static MIME_CSS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^\s*text/css\b").unwrap());

static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\s(?:[^>]*?\s)?href\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});
static STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<link\s(?:[^>]*?\s)?href\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});
static SCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script\s(?:[^>]*?\s)?src\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});
static IMG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<img\s(?:[^>]*?\s)?src\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});
static SOURCE_SET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<source\s(?:[^>]*?\s)?srcset\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});
static CSS_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)@import\s*(?:url\(\s*)?(?:"([^"]*)"|'([^']*)')"#).unwrap()
});
static CSS_RESOURCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)url\(\s*(?:"([^"]*)"|'([^']*)'|([^)'"]*))\s*\)"#).unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Css,
    Other,
}

impl ContentKind {
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        match content_type {
            Some(ct) if MIME_HTML.is_match(ct) => ContentKind::Html,
            Some(ct) if MIME_CSS.is_match(ct) => ContentKind::Css,
            _ => ContentKind::Other,
        }
    }

    fn patterns(self) -> &'static [Pattern] {
        static HTML: LazyLock<Vec<Pattern>> = LazyLock::new(|| {
            vec![
                Pattern::single(&LINK),
                Pattern::single(&STYLE),
                Pattern::single(&SCRIPT),
                Pattern::single(&IMG).without_data(),
                Pattern::srcset(&SOURCE_SET).without_data(),
                Pattern::single(&CSS_IMPORT),
                Pattern::single(&CSS_RESOURCE).without_data(),
            ]
        });
        static CSS: LazyLock<Vec<Pattern>> = LazyLock::new(|| {
            vec![
                Pattern::single(&CSS_IMPORT),
                Pattern::single(&CSS_RESOURCE).without_data(),
            ]
        });

        match self {
            ContentKind::Html => HTML.as_slice(),
            ContentKind::Css => CSS.as_slice(),
            ContentKind::Other => &[],
        }
    }
}

struct Pattern {
    regex: &'static Regex,
    srcset: bool,
    skip_data: bool,
}

impl Pattern {
    fn single(regex: &'static Regex) -> Self {
        Self {
            regex,
            srcset: false,
            skip_data: false,
        }
    }

    fn srcset(regex: &'static Regex) -> Self {
        Self {
            regex,
            srcset: true,
            skip_data: false,
        }
    }

    // Embedded resources only; data: links and scripts are still reported.
    fn without_data(mut self) -> Self {
        self.skip_data = true;
        self
    }
}

struct Found {
    start: usize,
    end: usize,
    values: Vec<String>,
}

struct Source {
    pattern: &'static Pattern,
    next: Option<Found>,
}

impl Source {
    fn search(&mut self, body: &str, from: usize) {
        self.next = self.pattern.regex.captures_at(body, from).map(|caps| {
            let whole = caps.get_match();
            let value = caps.iter().skip(1).flatten().next();
            let text = value.map(|m| m.as_str()).unwrap_or("");
            let mut values = if self.pattern.srcset {
                split_srcset(text)
            } else {
                vec![text.to_string()]
            };
            if self.pattern.skip_data {
                values.retain(|value| !is_data_uri(value.trim()));
            }
            // Ordered by where the reference itself sits, so a url() inside a
            // tag's style attribute comes before that tag's src.
            Found {
                start: value.map(|m| m.start()).unwrap_or(whole.start()),
                end: whole.end(),
                values,
            }
        });
    }
}

/// Lazy, single-pass sequence of raw reference strings in document order.
pub struct References {
    body: String,
    sources: Vec<Source>,
    ready: VecDeque<String>,
}

impl References {
    fn new(body: String, kind: ContentKind) -> Self {
        let mut sources: Vec<Source> = kind
            .patterns()
            .iter()
            .map(|pattern| Source {
                pattern,
                next: None,
            })
            .collect();
        for source in &mut sources {
            source.search(&body, 0);
        }
        Self {
            body,
            sources,
            ready: VecDeque::new(),
        }
    }

    // Pull the earliest pending match across all patterns into `ready`.
    fn fill(&mut self) -> bool {
        let earliest = self
            .sources
            .iter()
            .enumerate()
            .filter_map(|(idx, source)| source.next.as_ref().map(|found| (found.start, idx)))
            .min();

        let Some((_, idx)) = earliest else {
            return false;
        };
        let source = &mut self.sources[idx];
        if let Some(found) = source.next.take() {
            self.ready.extend(found.values);
            source.search(&self.body, found.end);
        }
        true
    }
}

impl Iterator for References {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            while let Some(value) = self.ready.pop_front() {
                let value = value.trim();
                if is_extractable(value) {
                    return Some(value.to_string());
                }
            }
            if !self.fill() {
                return None;
            }
        }
    }
}

/// Undo the two entity encodings that commonly wrap quoted attribute values.
pub fn unescape_entities(body: &str) -> String {
    body.replace("&#34;", "\"").replace("&#39;", "'")
}

/// Candidate references in `body`, according to its declared content type.
pub fn extract_references(body: &str, content_type: Option<&str>) -> References {
    let kind = ContentKind::from_content_type(content_type);
    let body = match kind {
        ContentKind::Other => String::new(),
        _ => unescape_entities(body),
    };
    References::new(body, kind)
}

// "a.jpg 1x, b.jpg 2x" -> ["a.jpg", "b.jpg"]
fn split_srcset(value: &str) -> Vec<String> {
    value
        .split(',')
        .filter_map(|candidate| candidate.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

fn is_data_uri(value: &str) -> bool {
    value
        .get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
}

fn is_extractable(value: &str) -> bool {
    !value.is_empty() && !value.starts_with('#')
}
