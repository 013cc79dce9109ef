// Report generation from a completed crawl

use anyhow::{Context, Result};
use pagerip_scanner::CrawlOutcome;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub const DEFAULT_OUTPUT_PATH: &str = "./output.txt";
pub const EXTERNAL_TITLE: &str = "EXTERNAL URLS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportData {
    pub generator: String,
    pub version: String,
    pub roots: Vec<RootReport>,
    pub external: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootReport {
    pub base: String,
    pub urls: Vec<String>,
}

impl ReportData {
    /// Sorted copy of the outcome, one entry per root.
    pub fn from_outcome(outcome: &CrawlOutcome) -> Self {
        let roots = outcome
            .roots
            .iter()
            .zip(&outcome.urls)
            .map(|(root, urls)| RootReport {
                base: root.base.clone(),
                urls: sorted(urls),
            })
            .collect();

        Self {
            generator: crate::NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            roots,
            external: sorted(&outcome.external),
        }
    }
}

fn sorted(urls: &[String]) -> Vec<String> {
    let mut urls = urls.to_vec();
    urls.sort();
    urls
}

fn push_section(report: &mut String, title: &str, urls: &[String]) {
    let separator = "=".repeat(title.chars().count());
    report.push('\n');
    report.push_str(&separator);
    report.push('\n');
    report.push_str(title);
    report.push('\n');
    report.push_str(&separator);
    report.push_str("\n\n");
    for url in urls {
        report.push_str(url);
        report.push('\n');
    }
    report.push('\n');
}

/// One block per root (its base framed by `=` rules, then its URLs sorted),
/// followed by the external URLs in the same layout.
pub fn render_text(outcome: &CrawlOutcome) -> String {
    let data = ReportData::from_outcome(outcome);
    let mut report = String::new();
    for root in &data.roots {
        push_section(&mut report, &root.base, &root.urls);
    }
    push_section(&mut report, EXTERNAL_TITLE, &data.external);
    report
}

pub fn render_json(outcome: &CrawlOutcome) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&ReportData::from_outcome(outcome))
}

pub fn render(outcome: &CrawlOutcome, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Text => Ok(render_text(outcome)),
        ReportFormat::Json => render_json(outcome).context("Failed to serialize report"),
    }
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

pub fn write_report(outcome: &CrawlOutcome, format: ReportFormat, path: &Path) -> Result<()> {
    let content = render(outcome, format)?;
    save_report(&content, path)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}
