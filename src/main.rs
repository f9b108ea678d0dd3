//! Arbor CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "arbor")]
#[command(about = "Python import graph for editor navigation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Workspace directory; the project root defaults to its parent
    #[arg(short, long, global = true, default_value = ".arbor")]
    workspace: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty workspace directory
    Init {
        /// Directory to create (defaults to --workspace)
        dir: Option<PathBuf>,
    },
    /// List workspace files, optionally filtered by a substring
    Files {
        /// Substring to match; `*` matches everything
        query: Option<String>,
    },
    /// Build the import graph and report its size
    Index,
    /// Show the files a source file imports
    Deps {
        /// Source file, relative to the current directory
        file: PathBuf,
    },
    /// Show the files that import a source file
    Rdeps {
        /// Source file, relative to the current directory
        file: PathBuf,

        /// Follow imports transitively
        #[arg(short, long)]
        transitive: bool,
    },
    /// Keep the graph up to date as files change
    Watch,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("arbor={log_level}")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Workspace directory: {}", cli.workspace.display());

    match cli.command {
        Commands::Init { dir } => commands::init(dir.unwrap_or(cli.workspace)),
        Commands::Files { query } => commands::files(&cli.workspace, query.as_deref()),
        Commands::Index => commands::index(&cli.workspace),
        Commands::Deps { file } => commands::deps(&cli.workspace, &file),
        Commands::Rdeps { file, transitive } => commands::rdeps(&cli.workspace, &file, transitive),
        Commands::Watch => commands::watch(&cli.workspace).await,
        Commands::Version => {
            println!("Arbor v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
