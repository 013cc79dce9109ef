use crate::CLAP_STYLING;
use clap::{arg, command};
use pagerip_core::download::DEFAULT_DOWNLOAD_PATH;
use pagerip_core::report::DEFAULT_OUTPUT_PATH;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("pagerip")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("pagerip")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("crawl")
                .about(
                    "Crawl one or more sites, recording every URL they reference. Optionally \
                download everything that was fetched.",
                )
                .arg(
                    arg!([URL])
                        .required(false)
                        .num_args(1..)
                        .help("Root URLs to crawl (scheme optional)"),
                )
                .arg(
                    arg!(-H --"hosts-file" <PATH>)
                        .required(false)
                        .help("Path to a newline-delimited file of URLs to crawl")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(-o --"output" [PATH])
                        .required(false)
                        .help("Save report to file (default: display to screen)")
                        .num_args(0..=1)
                        .default_missing_value(DEFAULT_OUTPUT_PATH),
                )
                .arg(
                    arg!(-d --"download" [DIR])
                        .required(false)
                        .help("Download everything fetched while crawling into DIR")
                        .num_args(0..=1)
                        .default_missing_value(DEFAULT_DOWNLOAD_PATH),
                )
                .arg(
                    arg!(-p --"protocol" <PROTOCOL>)
                        .required(false)
                        .help("Protocol used for URLs that do not specify one")
                        .default_value(pagerip_scanner::config::DEFAULT_PROTOCOL),
                )
                .arg(
                    arg!(-t --"threads" <NUM_WORKERS>)
                        .required(false)
                        .help("The number of concurrent fetches in the worker pool.")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("10"),
                )
                .arg(
                    arg!(-k --"insecure")
                        .required(false)
                        .help("Accept invalid TLS certificates")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                ),
        )
}
