//! chunky CLI: paginate museum collection containers into chunk files.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, WrapErr};

use mpx_chunky::chunky::{ChunkStore, Chunky, Container, ContainerKind};
use mpx_chunky::config::ChunkyConfig;
use mpx_chunky::document::Document;
use mpx_chunky::paths::ChunkyPaths;
use mpx_chunky::query::{Query, QueryDescriptor};
use mpx_chunky::remote::{HttpSearchPort, MemorySearchPort, SearchPort};

#[derive(Parser)]
#[command(name = "chunky", version, about = "Chunked export of museum collection records")]
struct Cli {
    /// Config file (defaults to $XDG_CONFIG_HOME/mpx-chunky/chunky.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file.
    Init {
        /// Overwrite an existing config.
        #[arg(long)]
        force: bool,
    },

    /// Paginate a container into chunk files, resuming where the last run stopped.
    Run {
        /// Container kind: group, exhibit, loc, approval or query.
        kind: ContainerKind,

        /// Container id; for `query`, a JSON query descriptor file.
        id: String,

        /// Only resolve related records modified after this timestamp.
        #[arg(long)]
        since: Option<String>,

        /// Primary records per chunk (overrides the config).
        #[arg(long)]
        chunk_size: Option<u32>,

        /// Directory for chunk files.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Answer searches from this JSON document instead of the remote service.
        #[arg(long)]
        offline: Option<PathBuf>,

        /// Discard stored chunks and start at chunk 1.
        #[arg(long)]
        fresh: bool,

        /// Skip media a browser cannot display.
        #[arg(long)]
        only_published: bool,
    },

    /// Run a single query descriptor and print the result as JSON.
    Query {
        /// JSON query descriptor.
        #[arg(long)]
        file: PathBuf,

        /// Answer from this JSON document instead of the remote service.
        #[arg(long)]
        offline: Option<PathBuf>,

        /// Print the validated descriptor instead of running it.
        #[arg(long)]
        show: bool,
    },

    /// Merge documents, keeping the newest version of every record.
    Join {
        /// Documents to merge, in order.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output file.
        #[arg(long)]
        output: PathBuf,

        /// Drop records not modified after this timestamp.
        #[arg(long)]
        since: Option<String>,
    },

    /// Show per-type record counts of a document.
    Describe {
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let paths = ChunkyPaths::resolve();
    let config_path = match (&cli.config, &paths) {
        (Some(path), _) => path.clone(),
        (None, Ok(paths)) => paths.config_file(),
        (None, Err(_)) => PathBuf::from("chunky.toml"),
    };

    match cli.command {
        Commands::Init { force } => {
            if config_path.exists() && !force {
                miette::bail!(
                    "config already exists at {} (use --force to overwrite)",
                    config_path.display()
                );
            }
            if let Ok(paths) = &paths {
                paths.ensure_dirs()?;
            }
            ChunkyConfig::default().save(&config_path)?;
            println!("Wrote default config to {}", config_path.display());
        }

        Commands::Run {
            kind,
            id,
            since,
            chunk_size,
            out,
            offline,
            fresh,
            only_published,
        } => {
            let mut config = ChunkyConfig::load_or_default(&config_path)?;
            if let Some(size) = chunk_size {
                config.chunking.chunk_size = size;
            }
            config.chunking.only_published |= only_published;

            let container = match Container::new(kind, id.as_str()) {
                Some(container) => container,
                None => {
                    let path = Path::new(&id);
                    let name = path
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .unwrap_or("query")
                        .to_string();
                    Container::from_query(name, load_query(path)?)
                }
            };

            let out = match out {
                Some(dir) => dir,
                None => paths?.chunks_dir(),
            };
            let store = ChunkStore::new(out, &container);
            if fresh {
                let removed = store.clear()?;
                tracing::info!(removed, dir = %store.dir().display(), "cleared stored chunks");
            }

            let port = open_port(&config, offline.as_deref())?;
            let mut chunky = Chunky::from_config(port, container, &config.chunking)?;
            if let Some(since) = since {
                chunky = chunky.with_since(since);
            }

            let summary = chunky.run_into(&store, !fresh)?;
            match (summary.first_chunk, summary.last_chunk) {
                (Some(first), Some(last)) => println!(
                    "Wrote chunks {first}..={last} ({} primary records) to {}",
                    summary.primary_records,
                    store.dir().display()
                ),
                _ => println!("No records in {}", chunky.container()),
            }
        }

        Commands::Query { file, offline, show } => {
            let query = load_query(&file)?;
            if show {
                println!("{}", query.serialize().to_json_pretty().into_diagnostic()?);
                return Ok(());
            }
            let config = ChunkyConfig::load_or_default(&config_path)?;
            let port = open_port(&config, offline.as_deref())?;
            let doc = port.search(&query.serialize())?;
            println!("{}", doc.to_json_pretty()?);
        }

        Commands::Join {
            files,
            output,
            since,
        } => {
            let mut joined = Document::new();
            for file in &files {
                let doc = Document::from_file(file)?;
                joined.merge(&doc)?;
            }
            if let Some(since) = since {
                joined.retain_modified_since(&since)?;
            }
            joined.to_file(&output)?;
            println!("Joined {} documents into {}", files.len(), output.display());
            print_summary(&joined);
        }

        Commands::Describe { file } => {
            let doc = Document::from_file(&file)?;
            println!("{}", file.display());
            print_summary(&doc);
        }
    }

    Ok(())
}

/// Read and validate a JSON query descriptor.
fn load_query(path: &Path) -> Result<Query> {
    let content = std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read query {}", path.display()))?;
    let descriptor: QueryDescriptor = serde_json::from_str(&content)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to parse query {}", path.display()))?;
    Ok(Query::from_descriptor(&descriptor)?)
}

fn open_port(config: &ChunkyConfig, offline: Option<&Path>) -> Result<Box<dyn SearchPort>> {
    match offline {
        Some(path) => {
            tracing::info!(source = %path.display(), "offline mode");
            Ok(Box::new(MemorySearchPort::from_file(path)?))
        }
        None => {
            config.remote.validate()?;
            Ok(Box::new(HttpSearchPort::new(&config.remote)))
        }
    }
}

fn print_summary(doc: &Document) {
    if doc.is_empty() {
        println!("  (no records)");
    }
    for summary in doc.describe() {
        println!(
            "  {:<12} {:>8} records (reported total {})",
            summary.name, summary.records, summary.reported_total
        );
    }
}
