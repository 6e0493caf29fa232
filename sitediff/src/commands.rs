use crate::CLAP_STYLING;
use clap::{arg, command};
use std::path::PathBuf;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("sitediff")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("sitediff")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner and progress spinners")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-v --"verbose" "Show debug logging")
                .required(false)
                .global(true),
        )
        .subcommand_required(false)
        .subcommand(
            command!("compare")
                .about(
                    "Crawl (or load) two renditions of a website, screenshot every page and rank \
                the matched pages by visual similarity.",
                )
                .arg(
                    arg!(--"url1" <URL>)
                        .required(true)
                        .help("URL of the first (reference) site"),
                )
                .arg(
                    arg!(--"url2" <URL>)
                        .required(true)
                        .help("URL of the second (candidate) site"),
                )
                .arg(
                    arg!(--"load1" <RUN>)
                        .required(false)
                        .help("Reuse a previous crawl for site 1, as SITE/TIMESTAMP (see `sitediff list`)"),
                )
                .arg(
                    arg!(--"load2" <RUN>)
                        .required(false)
                        .help("Reuse a previous crawl for site 2, as SITE/TIMESTAMP"),
                )
                .arg(
                    arg!(-o --"output" <DIR>)
                        .required(false)
                        .help("Root directory for screenshots and crawl data (default: screenshots)")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-c --"config" <PATH>)
                        .required(false)
                        .help("JSON configuration file")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-t --"workers" <NUM_WORKERS>)
                        .required(false)
                        .help("Concurrent page visits per crawl")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json, csv")
                        .value_parser(["text", "json", "csv"])
                        .default_value("text"),
                )
                .arg(
                    arg!(-r --"report" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            command!("crawl")
                .about("Crawl a single site and store its screenshots and crawl data")
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The URL to crawl"),
                )
                .arg(
                    arg!(-s --"site" <SIDE>)
                        .required(false)
                        .help("Which site profile from the configuration to apply")
                        .value_parser(["a", "b"])
                        .default_value("a"),
                )
                .arg(
                    arg!(-o --"output" <DIR>)
                        .required(false)
                        .help("Root directory for screenshots and crawl data (default: screenshots)")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-c --"config" <PATH>)
                        .required(false)
                        .help("JSON configuration file")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-t --"workers" <NUM_WORKERS>)
                        .required(false)
                        .help("Concurrent page visits")
                        .value_parser(clap::value_parser!(usize)),
                ),
        )
        .subcommand(
            command!("list")
                .about("List previous crawls grouped by site, newest first")
                .arg(
                    arg!(-o --"output" <DIR>)
                        .required(false)
                        .help("Root directory for screenshots and crawl data")
                        .value_parser(clap::value_parser!(PathBuf))
                        .default_value("screenshots"),
                ),
        )
        .subcommand(
            command!("diff")
                .about("Analyze two screenshot files directly")
                .arg(
                    arg!(<IMAGE_A>)
                        .help("First image")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(<IMAGE_B>)
                        .help("Second image")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--"out" <PATH>)
                        .required(false)
                        .help("Where to save the binarized difference mask")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-c --"config" <PATH>)
                        .required(false)
                        .help("JSON configuration file (only the analysis section is used)")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
}
