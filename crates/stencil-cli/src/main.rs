//! stencil CLI - scaffold projects from overlayed templates

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod prompts;

#[derive(Parser, Debug)]
#[command(name = "stencil")]
#[command(about = "Scaffold projects from overlayed templates")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new project from a template
    Create(CreateArgs),
}

#[derive(Parser, Debug)]
pub struct CreateArgs {
    /// Project name
    pub name: String,

    /// Template reference (origin:owner/repo[#ref]; origin defaults to github)
    pub template: String,

    /// Target directory (defaults to ./<name>)
    #[arg(short, long)]
    pub directory: Option<PathBuf>,

    /// Access token passed to the origin (e.g. gitlab private projects)
    #[arg(long)]
    pub token: Option<String>,

    /// Accept defaults for every prompt (non-interactive mode)
    #[arg(short, long)]
    pub yes: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Diagnostics are opt-in; user-facing progress goes through cliclack.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("STENCIL_LOG").unwrap_or_else(|_| EnvFilter::new("off")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Ensure terminal cursor is restored on panic
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = console::Term::stderr().show_cursor();
        default_panic(info);
    }));

    // Handle Ctrl+C gracefully
    ctrlc::set_handler(move || {
        let _ = console::Term::stderr().show_cursor();
        std::process::exit(130);
    })
    .ok();

    let args = Args::parse();
    let result = match args.command {
        Command::Create(create_args) => prompts::run_create(create_args).await,
    };

    let _ = console::Term::stderr().show_cursor();
    result
}
