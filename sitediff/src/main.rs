use clap::ArgMatches;
use colored::Colorize;
use commands::command_argument_builder;
use sitediff::handlers::{handle_compare, handle_crawl, handle_diff, handle_list, print_banner};
use tracing::Level;

mod commands;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");
    let verbose = chosen_command.get_flag("verbose");

    init_tracing(verbose);

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    if chosen_command.subcommand().is_none() {
        // No subcommand provided, just show the banner
        return;
    }

    if let Err(e) = dispatch(&chosen_command, quiet).await {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}

async fn dispatch(matches: &ArgMatches, quiet: bool) -> anyhow::Result<()> {
    match matches.subcommand() {
        Some(("compare", primary_command)) => handle_compare(primary_command, quiet).await,
        Some(("crawl", primary_command)) => handle_crawl(primary_command, quiet).await,
        Some(("list", primary_command)) => handle_list(primary_command),
        Some(("diff", primary_command)) => handle_diff(primary_command),
        _ => unreachable!("clap should ensure we don't get here"),
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
