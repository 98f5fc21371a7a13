// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod commands;
mod error;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode as ProcessExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use cmip_replica_core::{ExitCode, ReplicaConfig};
use cmip_replica_stats::{DEFAULT_REPORT_LOG, QUEUE_STATS_FILE_NAME};
use cmip_replica_store::DEFAULT_CREATED_AFTER;

use crate::error::CliError;

#[derive(Parser)]
#[command(name = "cmip-replica")]
#[command(about = "CMIP6 replication operations: retractions and download-queue statistics")]
struct Cli {
    /// Emit log records as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,
    /// Overrides CMIP_REPLICA_LOG_FILE.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct StoreArgs {
    /// Synda tracking database; overrides CMIP_REPLICA_DB.
    #[arg(long)]
    db: Option<PathBuf>,
    /// Status annotation written for retracted records.
    #[arg(long, default_value = cmip_replica_core::DEFAULT_SUFFIX)]
    suffix: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Chunking {
    /// data_node, frequency, realm, then activity_id, splitting only on overflow.
    Std3,
    DataNode,
    Frequency,
    /// Sequential pages from the saved cursor.
    Paginated,
}

#[derive(Subcommand)]
enum Commands {
    /// Query the index for retracted datasets and mark them in the store.
    Retracted {
        #[command(flatten)]
        store: StoreArgs,
        /// Cursor to start from; read from the offset file when omitted.
        #[arg(long)]
        starting_offset: Option<u64>,
        #[arg(long)]
        offset_file: Option<PathBuf>,
        /// Responses are saved as `<prefix><day of month>-<stem>.{json,txt}`.
        #[arg(long, default_value = "/home/syndausr/retracted/all-retracted-")]
        prefix: String,
        #[arg(long, default_value_t = false)]
        no_artifacts: bool,
        #[arg(long, default_value_t = 20)]
        npages: u32,
        /// Query and log only.
        #[arg(long, default_value_t = false)]
        test: bool,
        #[arg(long, value_enum, default_value_t = Chunking::Std3)]
        chunking: Chunking,
        /// Also query everything outside each facet's listed values.
        #[arg(long, default_value_t = false)]
        complement: bool,
        /// Data nodes to split on; defaults depend on the chunking.
        #[arg(long = "data-node")]
        data_nodes: Vec<String>,
        #[arg(long)]
        search_url: Option<String>,
        /// Request timeout; unlimited when omitted.
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Mark datasets listed one per line (raw ids or search response lines).
    StatusRetracted {
        input: PathBuf,
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Mark individual files listed one filename per line.
    FilesRetracted {
        input: PathBuf,
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Data nodes serving files in the store, least used first.
    ListDataNodes {
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Flip `empty` datasets whose files are all `done` to `complete`.
    MarkCompleted {
        #[arg(long)]
        db: Option<PathBuf>,
        #[arg(long, default_value = DEFAULT_CREATED_AFTER)]
        created_after: String,
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Per-status totals for every store backup in a `{timestamp: path}` listing.
    DbStatusHistory {
        #[arg(long, default_value = "db_backups_list.json")]
        list: PathBuf,
        #[arg(long, default_value = "db_status_files")]
        out_dir: PathBuf,
        #[arg(long, default_value_t = 4)]
        workers: usize,
    },
    /// Merge per-backup status files into one history with readable sizes.
    ProcessDbStatus {
        #[arg(long, short = 'd', default_value = "db_status_files")]
        db_status_dir: PathBuf,
        #[arg(long, short = 'o', default_value = "db_status_stats.json")]
        output: PathBuf,
        #[arg(long, short = 'r', default_value_t = false)]
        remap_statuses: bool,
    },
    /// Extract `synda queue` tables from the weekly reports log.
    ProcessReportLog {
        #[arg(long, default_value = DEFAULT_REPORT_LOG)]
        log: PathBuf,
        #[arg(long, default_value = QUEUE_STATS_FILE_NAME)]
        output: PathBuf,
    },
}

fn main() -> ProcessExitCode {
    match run() {
        Ok(()) => ProcessExitCode::from(ExitCode::Success as u8),
        Err(err) => {
            eprintln!("{err}");
            tracing::error!(exit = err.exit.as_str(), "{}", err.message);
            ProcessExitCode::from(err.exit as u8)
        }
    }
}

fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    let mut config = ReplicaConfig::from_env();
    if let Some(log_file) = cli.log_file {
        config.log_file = log_file;
    }
    logging::init_tracing(&config.log_file, &config.log_level, cli.log_json);

    match cli.command {
        Commands::Retracted {
            store,
            starting_offset,
            offset_file,
            prefix,
            no_artifacts,
            npages,
            test,
            chunking,
            complement,
            data_nodes,
            search_url,
            timeout_secs,
        } => {
            if let Some(path) = offset_file {
                config.offset_file = path;
            }
            if let Some(url) = search_url {
                config.search_url = url;
            }
            commands::retracted(
                &config,
                &store,
                commands::RetractedArgs {
                    starting_offset,
                    prefix: (!no_artifacts).then_some(prefix),
                    npages,
                    test,
                    chunking,
                    complement,
                    data_nodes,
                    timeout_secs,
                },
            )
        }
        Commands::StatusRetracted { input, store } => {
            commands::status_retracted(&config, &store, &input)
        }
        Commands::FilesRetracted { input, store } => {
            commands::files_retracted(&config, &store, &input)
        }
        Commands::ListDataNodes { db } => commands::list_data_nodes(&config, db),
        Commands::MarkCompleted {
            db,
            created_after,
            dry_run,
        } => commands::mark_completed(&config, db, &created_after, dry_run),
        Commands::DbStatusHistory {
            list,
            out_dir,
            workers,
        } => commands::db_status_history(&list, &out_dir, workers),
        Commands::ProcessDbStatus {
            db_status_dir,
            output,
            remap_statuses,
        } => commands::process_db_status(&db_status_dir, &output, remap_statuses),
        Commands::ProcessReportLog { log, output } => commands::process_report_log(&log, &output),
    }
}
