//! biokg CLI: build a knowledge graph from an adapters manifest.
//!
//! Usage:
//!   biokg build --schema schema.yaml --adapters adapters.yaml [--writer sqlite|neo4j|metta|memory]
//!   biokg stats [--db path] [--clear]
//!
//! Exit codes: 0 on success, 1 on a fatal error, 2 when some adapters failed.

use biokg::config::{default_output_dir, DEFAULT_LOOKUP_MAX_AGE_SECS};
use biokg::logging::{init_logging, LogFormat};
use biokg::writer::DEFAULT_BATCH_SIZE;
use biokg::{BuildConfig, SqliteSink, WriterKind};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "biokg",
    version,
    about = "Configuration-driven biological knowledge graph builder"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log output format (text or json)
    #[arg(long, global = true, default_value = "text", env = "BIOKG_LOG_FORMAT")]
    log_format: LogFormat,

    /// Default log level when BIOKG_LOG and RUST_LOG are unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every adapter of a manifest into a sink
    Build {
        /// Schema configuration (YAML)
        #[arg(long, env = "BIOKG_SCHEMA")]
        schema: PathBuf,
        /// Adapters manifest (YAML)
        #[arg(long, env = "BIOKG_ADAPTERS")]
        adapters: PathBuf,
        /// Output directory for the database or generated files
        #[arg(long, env = "BIOKG_OUTPUT_DIR")]
        output_dir: Option<PathBuf>,
        /// Sink to write to: sqlite, neo4j, metta or memory (dry run)
        #[arg(long, default_value = "sqlite")]
        writer: WriterKind,
        /// Records per collection per batch
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
        /// Write ids and labels only
        #[arg(long)]
        no_properties: bool,
        /// Skip source/version provenance properties
        #[arg(long)]
        no_provenance: bool,
        /// Gene id to alias table shared by generic adapters
        #[arg(long)]
        gene_alias_file: Option<PathBuf>,
        /// HGNC cross-reference table shared by the GENCODE adapter
        #[arg(long)]
        xref_alias_file: Option<PathBuf>,
        /// Reload shared lookup tables older than this many seconds
        #[arg(long, default_value_t = DEFAULT_LOOKUP_MAX_AGE_SECS)]
        lookup_max_age: i64,
    },
    /// Show document counts of a SQLite build
    Stats {
        /// Path to SQLite database file
        #[arg(long)]
        db: Option<PathBuf>,
        /// Drop every collection instead of listing them
        #[arg(long)]
        clear: bool,
    },
}

/// Get the default database path (~/.local/share/biokg/biokg.db)
fn default_db_path() -> PathBuf {
    default_output_dir().join("biokg.db")
}

fn cmd_build(config: BuildConfig) -> i32 {
    let report = match biokg::build::run_build(&config) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    println!("{:<32}  {:>10}  {:>10}  {:>8}", "ADAPTER", "NODES", "EDGES", "DROPPED");
    println!("{}", "-".repeat(66));
    for adapter in &report.adapters {
        println!(
            "{:<32}  {:>10}  {:>10}  {:>8}",
            adapter.name,
            adapter.nodes.total(),
            adapter.edges.total(),
            adapter.nodes.dropped + adapter.edges.dropped
        );
    }
    println!("Total: {} nodes, {} edges", report.total_nodes(), report.total_edges());

    let mut failed = 0;
    for adapter in report.failed() {
        failed += 1;
        eprintln!("Failed: {}: {}", adapter.name, adapter.error.as_deref().unwrap_or_default());
    }
    if failed > 0 {
        2
    } else {
        0
    }
}

fn cmd_stats(db: Option<PathBuf>, clear: bool) -> i32 {
    let db_path = db.unwrap_or_else(default_db_path);
    if !db_path.exists() {
        eprintln!("Error: database '{}' not found", db_path.display());
        return 1;
    }
    let mut sink = match SqliteSink::open(&db_path) {
        Ok(sink) => sink,
        Err(e) => {
            eprintln!("Error: Failed to open database: {}", e);
            return 1;
        }
    };

    if clear {
        return match sink.clear() {
            Ok(()) => {
                println!("Cleared '{}'", db_path.display());
                0
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        };
    }

    let counts = match sink.collection_counts() {
        Ok(counts) => counts,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if counts.is_empty() {
        println!("No collections.");
        return 0;
    }
    println!("{:<40}  {:>10}", "COLLECTION", "DOCUMENTS");
    println!("{}", "-".repeat(52));
    for (collection, count) in counts {
        println!("{:<40}  {:>10}", collection, count);
    }
    0
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = init_logging(cli.log_format, &cli.log_level) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    let code = match cli.command {
        Commands::Build {
            schema,
            adapters,
            output_dir,
            writer,
            batch_size,
            no_properties,
            no_provenance,
            gene_alias_file,
            xref_alias_file,
            lookup_max_age,
        } => {
            let mut config = BuildConfig::new(schema, adapters).with_writer(writer);
            if let Some(output_dir) = output_dir {
                config = config.with_output_dir(output_dir);
            }
            config.batch_size = batch_size;
            config.write_properties = !no_properties;
            config.add_provenance = !no_provenance;
            config.gene_alias_file = gene_alias_file;
            config.xref_alias_file = xref_alias_file;
            config.lookup_max_age_secs = lookup_max_age;
            cmd_build(config)
        }
        Commands::Stats { db, clear } => cmd_stats(db, clear),
    };
    std::process::exit(code);
}
