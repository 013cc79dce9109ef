use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use colored::Colorize;
use pagerip_core::crawl::{CrawlOptions, CrawlProgressCallback, CrawlSummary, execute_crawl};
use pagerip_core::report::{ReportFormat, render, write_report};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;
use url::Url;

// Helper functions for crawl handler

/// Combine URLs given on the command line with those listed in a hosts file
pub fn load_urls_from_source(
    urls: &[String],
    hosts_file: Option<&Path>,
    default_protocol: &str,
) -> Result<Vec<String>> {
    let mut all: Vec<String> = urls
        .iter()
        .filter_map(|url| parse_url_line(url.trim(), default_protocol))
        .collect();

    if let Some(hosts_file) = hosts_file {
        all.extend(load_urls_from_file(hosts_file, default_protocol)?);
    }

    if all.is_empty() {
        bail!("Either a URL or --hosts-file must be provided");
    }
    Ok(all)
}

/// Load and parse URLs from a newline-delimited file, skipping blank lines
pub fn load_urls_from_file(path: &Path, default_protocol: &str) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read hosts file {}", path.display()))?;

    let urls: Vec<String> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| parse_url_line(line.trim(), default_protocol))
        .collect();

    if urls.is_empty() {
        bail!("No valid URLs found in {}", path.display());
    }

    Ok(urls)
}

/// Accept a line as a URL, as written when it parses and with the default
/// protocol prepended when it only parses that way
pub fn parse_url_line(line: &str, default_protocol: &str) -> Option<String> {
    if line.contains("://") && Url::parse(line).is_ok() {
        return Some(line.to_string());
    }

    let with_scheme = format!("{}://{}", default_protocol, line.trim_start_matches("//"));
    if Url::parse(&with_scheme).is_ok_and(|url| url.host_str().is_some()) {
        return Some(line.to_string());
    }

    warn!("Skipping invalid URL '{}'", line);
    None
}

/// Expand `~` in a user-supplied path
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// Build crawl options from the `crawl` subcommand arguments
pub fn crawl_options_from_args(sub_matches: &ArgMatches, quiet: bool) -> Result<CrawlOptions> {
    let protocol = sub_matches
        .get_one::<String>("protocol")
        .cloned()
        .unwrap_or_else(|| pagerip_scanner::config::DEFAULT_PROTOCOL.to_string());
    let urls: Vec<String> = sub_matches
        .get_many::<String>("URL")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let hosts_file = sub_matches
        .get_one::<String>("hosts-file")
        .map(|path| expand_path(path));

    Ok(CrawlOptions {
        urls: load_urls_from_source(&urls, hosts_file.as_deref(), &protocol)?,
        threads: *sub_matches.get_one::<usize>("threads").unwrap_or(&10),
        protocol,
        download_dir: sub_matches
            .get_one::<String>("download")
            .map(|dir| expand_path(dir)),
        accept_invalid_certs: sub_matches.get_flag("insecure"),
        show_progress: !quiet,
    })
}

fn print_summary(summary: &CrawlSummary) {
    println!(
        "{} {} URLs crawled, {} errors",
        "→".blue(),
        summary.crawled.to_string().cyan(),
        summary.errors.to_string().cyan()
    );
    if summary.downloaded > 0 {
        println!(
            "{} {} files downloaded",
            "→".blue(),
            summary.downloaded.to_string().cyan()
        );
    }
}

pub async fn handle_crawl(sub_matches: &ArgMatches, quiet: bool) -> Result<()> {
    let options = crawl_options_from_args(sub_matches, quiet)?;
    let format = sub_matches
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);
    let output = sub_matches
        .get_one::<String>("output")
        .map(|path| expand_path(path));

    if !quiet {
        println!(
            "\n{} Crawling {} host(s)",
            "→".blue().bold(),
            options.urls.len().to_string().bright_white()
        );
        println!("Workers: {}", options.threads);
        println!("Default protocol: {}", options.protocol);
        if let Some(ref dir) = options.download_dir {
            println!("Downloading to: {}", dir.display());
        }
        println!();
    }

    let progress_callback: Option<CrawlProgressCallback> = if quiet {
        None
    } else {
        Some(Arc::new(|msg: String| {
            println!("{}", msg);
        }))
    };

    let summary = execute_crawl(options, progress_callback).await?;

    let Some(ref outcome) = summary.outcome else {
        println!("\n{} Crawl cancelled, no report written", "✗".yellow().bold());
        return Ok(());
    };

    match output {
        Some(path) => {
            println!("Writing file {}", path.display());
            write_report(outcome, format, &path)?;
        }
        None => print!("{}", render(outcome, format)?),
    }

    if !quiet {
        println!("\n{} Crawl complete!", "✓".green().bold());
        print_summary(&summary);
    }
    Ok(())
}
