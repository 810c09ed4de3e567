use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::error;

use trash_log::infra::logging::init_tracing;
use trash_log::{ContentCatalog, RoleAuthorizer, TrashLog, TrashLogConfig};

#[derive(Debug, Parser)]
#[command(name = "trash-log")]
#[command(about = "Inspect and export the content deletion log", long_about = None)]
struct Cli {
    /// Directory holding the WAL and snapshot (overrides TRASH_LOG_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Base upload directory for the CSV (overrides TRASH_LOG_UPLOAD_DIR)
    #[arg(long, global = true)]
    upload_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Entry count, stored size and CSV state
    Status,
    /// Print every entry, oldest first
    List,
    /// Write the CSV file
    Generate,
    /// Remove the CSV file
    DeleteCsv,
    /// Drop every stored entry
    Purge,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> trash_log::Result<()> {
    let mut config = TrashLogConfig::from_env();
    if let Some(dir) = cli.data_dir {
        config.store.dir_path = dir;
    }
    if let Some(dir) = cli.upload_dir {
        config.export.upload_dir = Some(dir);
    }

    let network = config.security.network;
    let app = TrashLog::open(
        config,
        Arc::new(ContentCatalog::new()),
        Arc::new(RoleAuthorizer::new(network)),
    )?;

    // Local operator access: the data directory itself is the credential.
    match cli.command {
        Commands::Status => {
            let stats = app.engine.stats()?;
            println!("Entries:      {}", app.store.count()?);
            println!("Stored size:  {}", app.store.estimate_size()?);
            match app.exporter.path() {
                Some(path) if app.exporter.exists() => {
                    println!("CSV:          {} ({})", path.display(), app.exporter.size())
                }
                Some(path) => println!("CSV:          not generated ({})", path.display()),
                None => println!("CSV:          upload directory unavailable"),
            }
            println!(
                "Engine:       {} keys, WAL {} KB, snapshot {} KB",
                stats.keys, stats.wal_kb, stats.snapshot_kb
            );
        }
        Commands::List => {
            let entries = app.store.get_all()?;
            if entries.is_empty() {
                println!("No log entries found.");
            }
            for entry in entries {
                println!("{}", entry.csv_row().join(" | "));
            }
        }
        Commands::Generate => {
            app.exporter.generate()?;
            println!("CSV file generated successfully. ({})", app.exporter.size());
        }
        Commands::DeleteCsv => {
            app.exporter.delete()?;
            println!("CSV file deleted successfully.");
        }
        Commands::Purge => {
            if !app.store.clear()? {
                return Err(trash_log::TrashLogError::PurgeFailed);
            }
            println!("All log entries have been purged from the database.");
        }
    }

    Ok(())
}
