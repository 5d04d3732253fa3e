// wright/src/main.rs

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG=debug wright generate ... to see generator details.
    // Logs go to stderr so `generate --stdout` stays pipeable.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            project_dir,
            select,
            summary,
            stdout,
        } => commands::generate::execute(project_dir, select, summary, stdout).await,

        Commands::Validate {
            project_dir,
            select,
            format,
        } => commands::validate::execute(project_dir, select, format),

        Commands::Diff {
            project_dir,
            select,
            baseline_dir,
            check,
            format,
        } => commands::diff::execute(project_dir, select, baseline_dir, check, format),

        Commands::List { project_dir } => commands::list::execute(project_dir),

        Commands::Discover {
            project_dir,
            select,
            db_path,
            timeout_secs,
            verify,
        } => commands::discover::execute(project_dir, select, db_path, timeout_secs, verify).await,

        Commands::Clean { project_dir } => commands::clean::execute(project_dir),
    }
}
