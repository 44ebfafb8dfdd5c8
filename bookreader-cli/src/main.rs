//! Bookreader CLI - Command-line host for the book library engine

mod commands;

use anyhow::{Context, Result};
use bookreader_core::config::default_index_root;
use bookreader_core::{Config, ReaderApp, ScanMode};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Parse and validate jobs argument (must be at least 1)
fn parse_jobs(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|_| format!("'{}' is not a valid number", s))?;
    if n < 1 {
        Err("jobs must be at least 1".to_string())
    } else {
        Ok(n)
    }
}

#[derive(Parser)]
#[command(name = "bookreader")]
#[command(author, version, about = "Local PDF and EPUB library", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding the library database and preferences
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan for books and update the library
    Scan {
        /// Scan everything under a root instead of the saved folders
        #[arg(long)]
        index: bool,

        /// Root for --index (defaults to the documents folder)
        #[arg(long, requires = "index", value_name = "DIR")]
        root: Option<PathBuf>,

        /// Number of parallel extraction jobs (must be at least 1)
        #[arg(short, long, value_parser = parse_jobs)]
        jobs: Option<usize>,
    },

    /// List the books in the library
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Display the metadata extracted from a PDF or EPUB file
    Info {
        /// Input file path
        input: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Open a book, adding it to continue reading and history
    Open {
        /// Book identifier
        id: String,
    },

    /// Save the reading position of a book
    Progress {
        /// Book identifier
        id: String,

        /// Current position
        current: i64,

        /// Total extent, if known
        #[arg(long)]
        total: Option<i64>,
    },

    /// Show the continue-reading list
    Continue,

    /// Show reading history grouped by day
    History {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage the folders scanned for books
    Folders {
        #[command(subcommand)]
        action: FolderAction,
    },

    /// Show or set the reading goal
    Goal {
        /// New goal
        value: Option<u32>,
    },
}

#[derive(Subcommand)]
enum FolderAction {
    /// List saved folders
    List,
    /// Add a folder by path or URI
    Add { uri: String },
    /// Remove a saved folder
    Remove { uri: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        "bookreader_cli=debug,bookreader_core=debug"
    } else {
        "bookreader_cli=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Info reads a single file and never touches the library
    let command = match cli.command {
        Commands::Info { input, json } => return commands::info(&input, json),
        command => command,
    };

    let mut config = Config::resolve(cli.data_dir);
    if let Commands::Scan { index, root, jobs } = &command {
        if let Some(jobs) = jobs {
            config = config.with_jobs(*jobs);
        }
        if *index {
            let root = root
                .clone()
                .or_else(default_index_root)
                .context("Could not determine a root to index; pass --root")?;
            config = config.with_scan_mode(ScanMode::Index(root));
        }
    }

    let app = ReaderApp::open(config)
        .await
        .context("Failed to open the library")?;

    match command {
        Commands::Scan { .. } => commands::scan(&app).await,
        Commands::List { json } => commands::list(&app, json).await,
        Commands::Info { input, json } => commands::info(&input, json),
        Commands::Open { id } => commands::open(&app, &id).await,
        Commands::Progress { id, current, total } => {
            commands::progress(&app, &id, current, total).await
        }
        Commands::Continue => commands::continue_reading(&app).await,
        Commands::History { json } => commands::history(&app, json).await,
        Commands::Folders { action } => match action {
            FolderAction::List => commands::folders_list(&app).await,
            FolderAction::Add { uri } => commands::folders_add(&app, &uri).await,
            FolderAction::Remove { uri } => commands::folders_remove(&app, &uri).await,
        },
        Commands::Goal { value } => commands::goal(&app, value).await,
    }
}
