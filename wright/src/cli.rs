// wright/src/cli.rs
//
// Single source of truth for all CLI definitions (Clap structs).

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "wright")]
#[command(about = "Generates four-layer data mart pipelines from declarative mapping configs", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 🏗️  Generates the VW_1 -> DT_2 -> DT_3A -> DT_3 DDL bundle of every mart
    Generate {
        /// Project directory
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// Generate only one mart (ex: "gl_mart")
        #[arg(long, short)]
        select: Option<String>,

        /// Print object names and columns instead of writing DDL
        #[arg(long)]
        summary: bool,

        /// Print the DDL to stdout instead of writing files
        #[arg(long, conflicts_with = "summary")]
        stdout: bool,
    },

    /// 🔎 Runs static consistency checks on mart definitions
    Validate {
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        #[arg(long, short)]
        select: Option<String>,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// 🧮 Compares generated DDL against a baseline directory
    Diff {
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        #[arg(long, short)]
        select: Option<String>,

        /// Baseline directory (per-mart sub-directories are picked up when present)
        #[arg(long, default_value = "baselines")]
        baseline_dir: PathBuf,

        /// Exit with error if a change is breaking
        #[arg(long)]
        check: bool,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// 📋 Lists the marts of the project
    List {
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,
    },

    /// 🕵️‍♀️ Profiles mapping data in DuckDB and prints the `inputs:` block
    Discover {
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        #[arg(long, short)]
        select: Option<String>,

        /// Path to the DuckDB database file
        #[arg(long, env = "WRIGHT_DB_PATH", default_value = "wright.duckdb")]
        db_path: String,

        /// Per-query timeout in seconds
        #[arg(long, default_value = "30")]
        timeout_secs: u64,

        /// Also check that source tables expose the columns the DDL reads
        #[arg(long)]
        verify: bool,
    },

    /// 🧹 Cleans build artifacts (target/ folder)
    Clean {
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,
    },
}
