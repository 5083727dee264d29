//! # teinte
//!
//! Command line front end of Teinte: installs and restores substituted
//! preprocessors, and runs the theme engine over precompiled CSS.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use teinte::config::load_config;

#[derive(Parser)]
#[command(name = "teinte")]
#[command(about = "Theme-scope compilation for front-end bundlers", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file path (default: ./teinte.config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Substitute the configured preprocessors
    Install(commands::install::InstallArgs),

    /// Restore the pristine preprocessors
    Reset(commands::reset::ResetArgs),

    /// Derive the arbitrary-mode theme payload of CSS files
    Palette(commands::palette::PaletteArgs),

    /// Assemble per-scope theme files from per-scope compiled CSS
    Extract(commands::extract::ExtractArgs),
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_max_level(level)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Install(args) => commands::install::run(args, &config),
        Commands::Reset(args) => commands::reset::run(args, &config),
        Commands::Palette(args) => commands::palette::run(args, &config),
        Commands::Extract(args) => commands::extract::run(args, &config),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
