mod banner;
mod cli;
mod commands;
mod config;
mod error;
mod live;
mod logging;
mod parser;
mod render;
mod server;
mod theme;
mod tunnel;
mod watch;

use clap::Parser;

fn main() {
    let cli = cli::Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }
    logging::init(cli.verbose, cli.quiet);

    if let Err(e) = cli.run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
