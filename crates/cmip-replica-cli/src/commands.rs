// SPDX-License-Identifier: Apache-2.0

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Datelike, Local};
use cmip_replica_core::{ReplicaConfig, SuffixToken};
use cmip_replica_search::facets::{
    data_node_dimension, frequency_dimension, std3_dimensions, DATA_NODES, PRIMARY_DATA_NODE,
};
use cmip_replica_search::{
    BatchReconciler, ConstraintSet, Discoverer, DiscoveryOptions, DiscoveryOutcome,
    HttpSearchClient, OffsetTracker, RetractionSink, RetryPolicy, DEFAULT_PAGE_LIMIT,
};
use cmip_replica_stats::{
    collect_status_history, load_snapshot_list, parse_report_log, process_db_status_files,
    write_pretty_json, DB_STATUS_STATS_FILE_NAME,
};
use cmip_replica_store::{
    list_data_nodes as store_data_nodes, mark_completed_datasets, open_snapshot,
    open_tracking_store, Reconciler, StoreResult,
};
use tracing::info;

use crate::error::CliError;
use crate::{Chunking, StoreArgs};

pub struct RetractedArgs {
    pub starting_offset: Option<u64>,
    pub prefix: Option<String>,
    pub npages: u32,
    pub test: bool,
    pub chunking: Chunking,
    pub complement: bool,
    pub data_nodes: Vec<String>,
    pub timeout_secs: Option<u64>,
}

/// Stands in for the store when nothing may be written.
struct DiscardSink;

impl RetractionSink for DiscardSink {
    fn reconcile(&mut self, _identifiers: &[String]) -> StoreResult<u64> {
        Ok(0)
    }
}

fn database(config: &ReplicaConfig, db: Option<PathBuf>) -> PathBuf {
    db.unwrap_or_else(|| config.database.clone())
}

fn reconciler(config: &ReplicaConfig, store: &StoreArgs) -> Result<Reconciler, CliError> {
    let suffix = SuffixToken::new(store.suffix.clone())?;
    Ok(Reconciler::open(&database(config, store.db.clone()), suffix)?)
}

pub fn retracted(
    config: &ReplicaConfig,
    store: &StoreArgs,
    args: RetractedArgs,
) -> Result<(), CliError> {
    let client = HttpSearchClient::new(
        config.search_url.clone(),
        args.timeout_secs.map(Duration::from_secs),
    )?;
    let options = DiscoveryOptions {
        page_limit: DEFAULT_PAGE_LIMIT,
        test: args.test,
        artifact_prefix: args
            .prefix
            .as_ref()
            .map(|p| format!("{p}{}-", Local::now().day())),
        retry: RetryPolicy::default().with_delay(config.retry_delay),
    };
    info!(
        chunking = ?args.chunking,
        test = args.test,
        search_url = %config.search_url,
        "retracted run started"
    );
    let outcome = if args.test {
        discover(Discoverer::new(client, DiscardSink, options), config, &args)?
    } else {
        let suffix = SuffixToken::new(store.suffix.clone())?;
        let sink = BatchReconciler::open(&database(config, store.db.clone()), suffix)?;
        discover(Discoverer::new(client, sink, options), config, &args)?
    };
    info!(
        num_found = outcome.num_found,
        changes = outcome.changes,
        "retracted run finished"
    );
    println!("numFound={} Nchanges={}", outcome.num_found, outcome.changes);
    Ok(())
}

fn discover<S: RetractionSink>(
    mut discoverer: Discoverer<HttpSearchClient, S>,
    config: &ReplicaConfig,
    args: &RetractedArgs,
) -> Result<DiscoveryOutcome, CliError> {
    let unconstrained = ConstraintSet::default();
    let outcome = match args.chunking {
        Chunking::Paginated => {
            let mut tracker = OffsetTracker::new(&config.offset_file);
            let start = args
                .starting_offset
                .unwrap_or_else(|| tracker.get_starting_offset());
            discoverer.get_retracted(&mut tracker, start, args.npages)?
        }
        Chunking::DataNode => {
            let nodes = if args.data_nodes.is_empty() {
                vec![PRIMARY_DATA_NODE.to_string()]
            } else {
                args.data_nodes.clone()
            };
            discoverer.get_retracted_facet(&data_node_dimension(nodes), &unconstrained)?
        }
        Chunking::Frequency => {
            discoverer.get_retracted_facet(&frequency_dimension(), &unconstrained)?
        }
        Chunking::Std3 => {
            let nodes: Vec<String> = if args.data_nodes.is_empty() {
                DATA_NODES.iter().map(|n| n.to_string()).collect()
            } else {
                args.data_nodes.clone()
            };
            discoverer.get_retracted_multi_facets(
                &std3_dimensions(&nodes),
                &unconstrained,
                args.complement,
            )?
        }
    };
    info!(queries = discoverer.queries_issued(), "search walk complete");
    Ok(outcome)
}

pub fn status_retracted(
    config: &ReplicaConfig,
    store: &StoreArgs,
    input: &Path,
) -> Result<(), CliError> {
    if !input.is_file() {
        return Err(CliError::missing_input("dataset list", input));
    }
    let mut rec = reconciler(config, store)?;
    rec.status_retracted_from_file(input)?;
    let changes = rec.finish()?;
    println!("{changes} datasets newly marked {}", store.suffix);
    Ok(())
}

pub fn files_retracted(
    config: &ReplicaConfig,
    store: &StoreArgs,
    input: &Path,
) -> Result<(), CliError> {
    if !input.is_file() {
        return Err(CliError::missing_input("file list", input));
    }
    let names = fs::read_to_string(input)?;
    let mut rec = reconciler(config, store)?;
    let rewritten = rec.files_retracted(names.lines())?;
    rec.finish()?;
    println!("{rewritten} files newly marked {}", store.suffix);
    Ok(())
}

pub fn list_data_nodes(config: &ReplicaConfig, db: Option<PathBuf>) -> Result<(), CliError> {
    let conn = open_snapshot(&database(config, db))?;
    for node in store_data_nodes(&conn)? {
        println!("{node}");
    }
    Ok(())
}

pub fn mark_completed(
    config: &ReplicaConfig,
    db: Option<PathBuf>,
    created_after: &str,
    dry_run: bool,
) -> Result<(), CliError> {
    let mut conn = open_tracking_store(&database(config, db))?;
    let report = mark_completed_datasets(
        &mut conn,
        created_after,
        dry_run,
        Local::now().naive_local(),
    )?;
    if report.dry_run {
        println!("{} datasets would be marked complete", report.eligible);
    } else {
        println!("{} datasets marked complete", report.updated);
    }
    Ok(())
}

pub fn db_status_history(list: &Path, out_dir: &Path, workers: usize) -> Result<(), CliError> {
    if !list.is_file() {
        return Err(CliError::missing_input("backup listing", list));
    }
    let snapshots = load_snapshot_list(list)?;
    let history = collect_status_history(&snapshots, out_dir, workers)?;
    println!(
        "{} of {} snapshots aggregated into {}",
        history.len(),
        snapshots.len(),
        out_dir.display()
    );
    Ok(())
}

pub fn process_db_status(dir: &Path, output: &Path, remap: bool) -> Result<(), CliError> {
    if !dir.is_dir() {
        return Err(CliError::missing_input("db status directory", dir));
    }
    let output = if output.is_dir() {
        output.join(DB_STATUS_STATS_FILE_NAME)
    } else {
        output.to_path_buf()
    };
    let history = process_db_status_files(dir, remap)?;
    write_pretty_json(&output, &history)?;
    println!("{} timestamps written to {}", history.len(), output.display());
    Ok(())
}

pub fn process_report_log(log: &Path, output: &Path) -> Result<(), CliError> {
    if !log.is_file() {
        return Err(CliError::missing_input("reports log", log));
    }
    let text = fs::read_to_string(log)?;
    let stats = parse_report_log(&text)?;
    write_pretty_json(output, &stats)?;
    println!(
        "{} queue snapshots written to {}",
        stats.synda_queue_stats.len(),
        output.display()
    );
    Ok(())
}
