pub mod crawl;
pub mod download;
pub mod report;

use colored::Colorize;

pub const NAME: &str = "PageRip";

pub fn print_banner() {
    let banner = r#"
    ██████╗  █████╗  ██████╗ ███████╗██████╗ ██╗██████╗
    ██╔══██╗██╔══██╗██╔════╝ ██╔════╝██╔══██╗██║██╔══██╗
    ██████╔╝███████║██║  ███╗█████╗  ██████╔╝██║██████╔╝
    ██╔═══╝ ██╔══██║██║   ██║██╔══╝  ██╔══██╗██║██╔═══╝
    ██║     ██║  ██║╚██████╔╝███████╗██║  ██║██║██║
    ╚═╝     ╚═╝  ╚═╝ ╚═════╝ ╚══════╝╚═╝  ╚═╝╚═╝╚═╝
"#;
    println!("{}", banner.bright_cyan());
    println!(
        "    {} {}\n",
        NAME.bright_white().bold(),
        env!("CARGO_PKG_VERSION").bright_black()
    );
}
