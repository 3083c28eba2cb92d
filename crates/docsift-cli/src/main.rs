//! CLI entry point for docsift: runs the HTTP server, plus offline chunking
//! and one-shot search for development.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use docsift_core::{
    chunk_pages, default_config_path, extract_pages, load_config, save_config, status, Config,
    SearchService,
};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "docsift")]
#[command(about = "docsift: semantic search over uploaded PDFs")]
struct Cli {
    /// Config file (default: config.toml in the app config directory).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Show backend status (for dev).
    Status,
    /// Show where docsift looks for its config file.
    ConfigPath,
    /// Write a config file with default settings.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Extract and chunk a PDF without embedding anything.
    Chunk {
        #[arg(value_name = "PDF")]
        path: PathBuf,
        /// Words per chunk (default: from config).
        #[arg(long)]
        chunk_size: Option<usize>,
    },
    /// Ingest PDFs (files or directories) and run one query against them.
    Search {
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,
        #[arg(short, long)]
        query: String,
        /// Number of results (default: from config).
        #[arg(short)]
        k: Option<usize>,
        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Run the HTTP server.
    Serve {
        /// Address to bind (default: from config).
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Status) {
        Commands::Status => {
            println!("docsift backend");
            println!("  core: {}", status());
        }
        Commands::ConfigPath => match cli.config.or_else(default_config_path) {
            Some(p) => println!("{}", p.display()),
            None => bail!("could not determine app config directory"),
        },
        Commands::InitConfig { force } => {
            let target = cli
                .config
                .or_else(default_config_path)
                .context("could not determine app config directory")?;
            if target.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", target.display());
            }
            let written = save_config(&Config::default(), Some(&target))?;
            println!("Wrote {}", written.display());
        }
        Commands::Chunk { path, chunk_size } => {
            let config = load_config(cli.config.as_deref())?;
            let chunk_size = chunk_size.unwrap_or(config.chunk_size);
            let bytes = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
            let pages = extract_pages(&bytes)?;
            let chunks = chunk_pages(&pages, chunk_size)?;
            println!(
                "{}: {} page(s), {} chunk(s) of up to {} words",
                path.display(),
                pages.len(),
                chunks.len(),
                chunk_size
            );
            for (i, chunk) in chunks.iter().enumerate() {
                println!("  [{i}] {} words  {}", chunk.split(' ').count(), preview(chunk, 60));
            }
        }
        Commands::Search {
            paths,
            query,
            k,
            json,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let service = SearchService::from_config(&config)?;
            let pdfs = collect_pdfs(&paths)?;
            if pdfs.is_empty() {
                bail!("no PDF files found");
            }
            for pdf in &pdfs {
                let id = document_id(pdf);
                let bytes = std::fs::read(pdf).with_context(|| format!("reading {}", pdf.display()))?;
                let report = service.ingest_pdf(&id, bytes).await?;
                eprintln!("ingested {} ({} chunks)", report.document_id, report.chunk_count);
            }
            let hits = service.query(&query, k).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else {
                for (rank, hit) in hits.iter().enumerate() {
                    println!("{}. {:.4}  {}  {}", rank + 1, hit.score, hit.document, preview(&hit.text, 80));
                }
            }
        }
        Commands::Serve { bind } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            let service = Arc::new(SearchService::from_config(&config)?);
            docsift_server::serve(service, &config.server, shutdown_signal()).await?;
        }
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,docsift_core=debug,docsift_server=debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

/// Expand directories into the `.pdf` files below them. Hidden entries are skipped.
fn collect_pdfs(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut pdfs = Vec::new();
    for path in paths {
        if path.is_file() {
            pdfs.push(path.clone());
            continue;
        }
        if !path.is_dir() {
            bail!("not a file or directory: {}", path.display());
        }
        for entry in WalkDir::new(path)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
        {
            let entry = entry.with_context(|| format!("walking {}", path.display()))?;
            if entry.file_type().is_file() && has_pdf_extension(entry.path()) {
                pdfs.push(entry.into_path());
            }
        }
    }
    Ok(pdfs)
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Documents are keyed by filename, as with HTTP uploads.
fn document_id(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}
