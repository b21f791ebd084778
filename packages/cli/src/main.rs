mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{compile, init, render, CompileArgs, InitArgs, RenderArgs};
use tracing_subscriber::EnvFilter;

/// Mortar CLI - HTML-like templates with components, layouts and slots
#[derive(Parser, Debug)]
#[command(name = "mortar")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level filter when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a new Mortar project
    Init(InitArgs),

    /// Render a view to HTML
    Render(RenderArgs),

    /// Compile views into their intermediate form
    Compile(CompileArgs),
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir.display().to_string(),
        Err(err) => {
            eprintln!("{} Cannot get current directory: {}", "Error:".red().bold(), err);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Init(args) => init(args, &cwd),
        Command::Render(args) => render(args, &cwd),
        Command::Compile(args) => compile(args, &cwd),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
