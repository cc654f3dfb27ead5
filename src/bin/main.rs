//! Metascan CLI - Scan data sources into normalized metadata
//!
//! Usage:
//!   metascan scan --source <name> [--artifacts users,orders] [--store]
//!   metascan test-connection --type <type> --url <connection-string>
//!   metascan types
//!   metascan list --source <name> --kind tables
//!   metascan jobs
//!   metascan export <job-id> [--out result.csv]
//!
//! Examples:
//!   metascan scan --source warehouse --store
//!   metascan scan --type sqlite --url ./app.db --pii
//!   metascan test-connection --type "Azure SQL" --url "Server=db;Database=crm;"
//!   metascan list --source events --kind collections

use clap::{Parser, Subcommand};
use metascan::artifacts::{list_artifacts, ArtifactKind};
use metascan::config::Settings;
use metascan::pii;
use metascan::scan::{ScanRequest, ScannerRegistry};
use metascan::source::{catalog, SourceDescriptor};
use metascan::store::ScanStore;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "metascan")]
#[command(about = "Metascan - Unified metadata scanning for heterogeneous data sources")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a source and print (or store) the normalized metadata
    Scan {
        /// Named source from the config file
        #[arg(short, long, conflicts_with_all = ["source_type", "url"])]
        source: Option<String>,

        /// Source type for an ad hoc scan (any spelling the normalizer accepts)
        #[arg(short = 't', long = "type", requires = "url")]
        source_type: Option<String>,

        /// Connection string for an ad hoc scan
        #[arg(short, long, requires = "source_type")]
        url: Option<String>,

        /// Databases/schemas to scan, comma separated
        #[arg(short, long, value_delimiter = ',')]
        db: Vec<String>,

        /// Artifact names to retain, comma separated (case-insensitive)
        #[arg(short, long, value_delimiter = ',')]
        artifacts: Vec<String>,

        /// File to scan (file sources)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Documents sampled per collection (document sources)
        #[arg(long)]
        sample_size: Option<usize>,

        /// Persist the result under a generated job id
        #[arg(long)]
        store: bool,

        /// Also report PII findings over the result
        #[arg(long)]
        pii: bool,
    },

    /// Probe a source's liveness
    TestConnection {
        /// Named source from the config file
        #[arg(short, long, conflicts_with_all = ["source_type", "url"])]
        source: Option<String>,

        /// Source type (any spelling the normalizer accepts)
        #[arg(short = 't', long = "type", requires = "url")]
        source_type: Option<String>,

        /// Connection string
        #[arg(short, long, requires = "source_type")]
        url: Option<String>,
    },

    /// List the supported source types
    Types,

    /// List one artifact kind for a source, without a full scan
    List {
        /// Named source from the config file
        #[arg(short, long, conflicts_with_all = ["source_type", "url"])]
        source: Option<String>,

        /// Source type (any spelling the normalizer accepts)
        #[arg(short = 't', long = "type", requires = "url")]
        source_type: Option<String>,

        /// Connection string
        #[arg(short, long, requires = "source_type")]
        url: Option<String>,

        /// Database/schema to list in
        #[arg(short, long)]
        db: Option<String>,

        /// Artifact kind: tables, views, procedures, collections, permissions
        #[arg(short, long, default_value = "tables")]
        kind: ArtifactKind,
    },

    /// List stored scan jobs
    Jobs,

    /// Export a stored scan as CSV
    Export {
        /// Job id of the stored scan
        job_id: String,

        /// Output file (stdout if not given)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error starting runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Scan {
            source,
            source_type,
            url,
            db,
            artifacts,
            file,
            sample_size,
            store,
            pii,
        } => runtime.block_on(cmd_scan(
            source,
            source_type,
            url,
            db,
            artifacts,
            file,
            sample_size,
            store,
            pii,
        )),
        Commands::TestConnection {
            source,
            source_type,
            url,
        } => runtime.block_on(cmd_test_connection(source, source_type, url)),
        Commands::Types => cmd_types(),
        Commands::List {
            source,
            source_type,
            url,
            db,
            kind,
        } => runtime.block_on(cmd_list(source, source_type, url, db, kind)),
        Commands::Jobs => cmd_jobs(),
        Commands::Export { job_id, out } => cmd_export(job_id, out),
    }
}

/// Resolve a source either from the config file by name or from an ad hoc
/// type + connection string pair.
fn resolve_source(
    settings: &Settings,
    source: Option<String>,
    source_type: Option<String>,
    url: Option<String>,
) -> Result<(SourceDescriptor, Option<Vec<String>>), String> {
    match (source, source_type, url) {
        (Some(name), _, _) => {
            let configured = settings.source(&name).map_err(|e| e.to_string())?;
            let descriptor = configured.descriptor().map_err(|e| e.to_string())?;
            Ok((descriptor, configured.db_names.clone()))
        }
        (None, Some(raw_type), Some(url)) => {
            let descriptor = SourceDescriptor::new(&raw_type, url).map_err(|e| e.to_string())?;
            Ok((descriptor, None))
        }
        _ => Err("either --source or --type with --url is required".to_string()),
    }
}

#[allow(clippy::too_many_arguments)]
async fn cmd_scan(
    source: Option<String>,
    source_type: Option<String>,
    url: Option<String>,
    db: Vec<String>,
    artifacts: Vec<String>,
    file: Option<PathBuf>,
    sample_size: Option<usize>,
    store: bool,
    report_pii: bool,
) -> ExitCode {
    let settings = match Settings::find() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let (descriptor, configured_dbs) = match resolve_source(&settings, source, source_type, url) {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut request = ScanRequest::new(descriptor)
        .with_sample_size(sample_size.unwrap_or(settings.scan.sample_size));
    if !db.is_empty() {
        request = request.with_db_names(db);
    } else if let Some(names) = configured_dbs {
        request = request.with_db_names(names);
    }
    if !artifacts.is_empty() {
        request = request.with_artifact_types(artifacts);
    }
    if let Some(path) = file {
        request = request.with_file_path(path);
    }

    let result = match ScannerRegistry::builtin().scan(&request).await {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Scan failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&result) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing result: {}", e);
            return ExitCode::FAILURE;
        }
    }

    if report_pii {
        let findings = pii::annotate(&result);
        if findings.is_empty() {
            eprintln!("No PII findings.");
        } else {
            for finding in &findings {
                eprintln!(
                    "PII: {}.{} [{}]",
                    finding.table,
                    finding.name,
                    finding.tags.join(", ")
                );
            }
        }
    }

    if store {
        let job_id = Uuid::new_v4().to_string();
        let stored = ScanStore::open_default().and_then(|s| {
            s.put(&job_id, &result)?;
            Ok(())
        });
        match stored {
            Ok(()) => eprintln!("Stored as job {}", job_id),
            Err(e) => {
                eprintln!("Error storing result: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}

async fn cmd_test_connection(
    source: Option<String>,
    source_type: Option<String>,
    url: Option<String>,
) -> ExitCode {
    let settings = match Settings::find() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let (descriptor, _) = match resolve_source(&settings, source, source_type, url) {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match ScannerRegistry::builtin().test_connection(&descriptor).await {
        Ok(()) => {
            println!("ok");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_types() -> ExitCode {
    for (label, tag) in catalog() {
        println!("{:<12} {}", tag, label);
    }
    ExitCode::SUCCESS
}

async fn cmd_list(
    source: Option<String>,
    source_type: Option<String>,
    url: Option<String>,
    db: Option<String>,
    kind: ArtifactKind,
) -> ExitCode {
    let settings = match Settings::find() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let (descriptor, configured_dbs) = match resolve_source(&settings, source, source_type, url) {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let db = db.or_else(|| configured_dbs.and_then(|names| names.into_iter().next()));
    match list_artifacts(&descriptor, db.as_deref(), kind).await {
        Ok(listing) => match serde_json::to_string_pretty(&listing) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error serializing listing: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            eprintln!("Listing failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_jobs() -> ExitCode {
    let store = match ScanStore::open_default() {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error opening store: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match store.list() {
        Ok(scans) => {
            if scans.is_empty() {
                println!("No stored scans.");
            } else {
                for scan in scans {
                    println!(
                        "{}  {:<5}  {:>6} objects  {}",
                        scan.job_id, scan.source_type, scan.object_count, scan.created_at
                    );
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error listing scans: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_export(job_id: String, out: Option<PathBuf>) -> ExitCode {
    let store = match ScanStore::open_default() {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error opening store: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let exported = match out {
        Some(path) => match File::create(&path) {
            Ok(file) => store.export_csv(&job_id, file),
            Err(e) => {
                eprintln!("Error creating '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => store.export_csv(&job_id, io::stdout().lock()),
    };

    match exported {
        Ok(rows) => {
            eprintln!("Exported {} objects.", rows);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Export failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
