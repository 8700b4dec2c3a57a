//! # Digital Initiative Index CLI (`ide`)
//!
//! The `ide` binary is the primary interface for the index. It provides
//! commands for database initialization, a pre-flight check, the
//! extraction run, and read-only reporting over the stored initiatives.
//!
//! ## Usage
//!
//! ```bash
//! ide --config ./config/ide.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ide init` | Create the SQLite database and its schema |
//! | `ide check` | Validate configuration and list the reports that would be processed |
//! | `ide process` | Extract initiatives from every report in the data directory |
//! | `ide stats` | Print store statistics |
//! | `ide companies` | List companies with report and initiative counts |
//! | `ide query <kind> <value>` | Print initiatives for a company, category, or year |
//! | `ide export` | Dump initiatives and statistics as JSON |
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`
//! (default `info`).

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ide_index::config::{self, Config};
use ide_index::export;
use ide_index::ingest::{self, Pipeline, RunOptions, RunSummary};
use ide_index::initiatives::Extractor;
use ide_index::llm;
use ide_index::progress::ProgressMode;
use ide_index::query::{self, QueryKind};
use ide_index::scan;
use ide_index::stats;
use ide_index::store::Store;

/// Digital Initiative Index: extract digital transformation initiatives
/// from corporate reports and index them in SQLite.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/ide.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "ide",
    about = "Digital Initiative Index: LLM extraction of digital transformation initiatives from corporate reports",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ide.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the companies, reports, and
    /// digital_initiatives tables. Safe to run repeatedly.
    Init,

    /// Validate configuration before a run.
    ///
    /// Checks the API key variable, the data directory, and the chunking
    /// settings, then lists the report files that `process` would read.
    Check,

    /// Extract initiatives from every report in the data directory.
    Process {
        /// Maximum chunks sent to the engine per document (0 = config value).
        #[arg(long)]
        max_chunks: Option<usize>,

        /// Do not write per-document or consolidated JSON files.
        #[arg(long)]
        no_json: bool,

        /// Scan and chunk only: no engine calls and no database writes.
        #[arg(long)]
        dry_run: bool,

        /// Maximum number of documents to process.
        #[arg(long)]
        limit: Option<usize>,

        /// Progress output on stderr. Defaults to human when stderr is a TTY.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Print store statistics.
    Stats,

    /// List companies with report and initiative counts.
    Companies,

    /// Print stored initiatives for a company, category, or year.
    Query {
        #[command(subcommand)]
        by: QueryBy,
    },

    /// Export all initiatives and statistics as JSON.
    Export {
        /// Write to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum QueryBy {
    /// Initiatives of one company.
    Company { name: String },
    /// Initiatives in one category (free-form labels are normalized).
    Category { name: String },
    /// Initiatives mentioning one year.
    Year { year: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let store = Store::open(&cfg).await?;
            store.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Check => {
            run_check(&cfg)?;
        }
        Commands::Process {
            max_chunks,
            no_json,
            dry_run,
            limit,
            progress,
        } => {
            let mut options = RunOptions::from_config(&cfg);
            if let Some(n) = max_chunks.filter(|n| *n > 0) {
                options.max_chunks = Some(n);
            }
            options.write_json = options.write_json && !no_json;
            options.dry_run = dry_run;
            options.limit = limit;

            if options.dry_run {
                let summary = ingest::dry_run(&cfg, &options).await?;
                print_summary(&summary, true);
                return Ok(());
            }

            cfg.validate_for_run()?;
            let engine = llm::create_engine(&cfg.extraction)?;
            let extractor = Extractor::from_config(engine, &cfg.extraction);
            let store = Store::open(&cfg).await?;

            let reporter = progress.unwrap_or_else(ProgressMode::default_for_tty).reporter();
            let summary = Pipeline::new(&cfg, &store, &extractor)
                .with_progress(reporter)
                .run(&options)
                .await?;

            print_summary(&summary, false);
            print!("{}", stats::render_statistics(&store.get_statistics().await?));
            store.close().await;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Companies => {
            query::run_companies(&cfg).await?;
        }
        Commands::Query { by } => {
            let kind = match by {
                QueryBy::Company { name } => QueryKind::Company(name),
                QueryBy::Category { name } => QueryKind::Category(name),
                QueryBy::Year { year } => QueryKind::Year(year),
            };
            query::run_query(&cfg, &kind).await?;
        }
        Commands::Export { output } => {
            export::run_export(&cfg, output.as_deref()).await?;
        }
    }

    Ok(())
}

fn run_check(cfg: &Config) -> Result<()> {
    println!("check");
    println!("  database:    {}", cfg.db.path.display());
    println!("  data dir:    {}", cfg.input.data_dir.display());
    println!("  output dir:  {}", cfg.output.dir.display());
    println!("  model:       {}", cfg.extraction.model);
    println!(
        "  chunking:    {} bytes, {} overlap",
        cfg.chunking.chunk_size, cfg.chunking.overlap
    );

    cfg.validate_for_run()?;

    let files = scan::scan_reports(&cfg.input)?;
    println!("  reports:     {}", files.len());
    for file in &files {
        println!("    {}", file.relative_path);
    }
    println!("ok");
    Ok(())
}

fn print_summary(summary: &RunSummary, dry_run: bool) {
    if dry_run {
        println!("process (dry-run)");
    } else {
        println!("process");
    }
    println!("  documents found:       {}", summary.documents_found);
    println!("  documents processed:   {}", summary.documents_processed);
    println!("  documents skipped:     {}", summary.documents_skipped);
    println!("  chunks:                {}", summary.chunks_processed);
    if !dry_run {
        println!("  initiatives extracted: {}", summary.initiatives_extracted);
        println!("  initiatives inserted:  {}", summary.initiatives_inserted);
    }
    println!("ok");
}
