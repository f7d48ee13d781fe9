//! # tessera
//!
//! Tessera - Live-binding HTML template compiler in Rust.
//!
//! ## Name Origin
//!
//! A **tessera** is one small tile of a mosaic. Templates are assembled from
//! many such pieces (static markup, values, branches, partials) and this
//! binary is where they are set and checked from the command line.

mod commands;
mod config;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tessera")]
#[command(about = "Live-binding HTML template compiler in Rust", long_about = None)]
#[command(version)]
struct Cli {
    /// Log compile and cache events
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a template with JSON data
    Render(commands::render::RenderArgs),

    /// Compile templates and report diagnostics
    Check(commands::check::CheckArgs),
}

fn main() {
    let cli = Cli::parse();
    let config = config::load_config(None);

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else if cli.quiet {
        tracing::Level::ERROR
    } else {
        config.log_level()
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Render(args) => commands::render::run(args, &config),
        Commands::Check(args) => commands::check::run(args, &config),
    }
}
