#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the Boston 311 dashboard pipeline.
//!
//! Runs the two-stage load (CSV snapshot, datastore API fallback) and
//! prints the aggregate report the dashboard charts are built from.

use boston311_cli_utils::{IndicatifProgress, MultiProgress};
use boston311_dashboard::Dashboard;
use boston311_loader::{LoadState, Loader};
use boston311_request_models::RequestFilter;
use boston311_source::registry::{DatasetDefinition, boston_311};
use boston311_source::{FetchOptions, RequestSource as _, normalize};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "boston311", about = "Boston 311 dashboard data pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the two-stage load and print the aggregate report
    Load {
        /// Maximum number of records to load (for testing)
        #[arg(long)]
        limit: Option<u64>,
        /// Restrict the report to one neighborhood
        #[arg(long)]
        neighborhood: Option<String>,
        /// Restrict the report to one department
        #[arg(long)]
        department: Option<String>,
    },
    /// Fetch directly from the datastore API, skipping the snapshot
    Fetch {
        /// Maximum number of records to fetch
        #[arg(long)]
        limit: Option<u64>,
    },
    /// Print the embedded dataset definition
    Dataset,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = boston311_cli_utils::init_logger();
    let cli = Cli::parse();

    let dataset = boston_311();

    match cli.command.unwrap_or(Commands::Load {
        limit: None,
        neighborhood: None,
        department: None,
    }) {
        Commands::Load {
            limit,
            neighborhood,
            department,
        } => run_load(&multi, &dataset, limit, neighborhood, department).await,
        Commands::Fetch { limit } => run_fetch(&multi, &dataset, limit).await,
        Commands::Dataset => {
            print_dataset(&dataset);
            Ok(())
        }
    }
}

async fn run_load(
    multi: &MultiProgress,
    dataset: &DatasetDefinition,
    limit: Option<u64>,
    neighborhood: Option<String>,
    department: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let loader = Loader::new(dataset);
    let progress = IndicatifProgress::records_bar(multi, "Loading service requests");

    let (source, count, last_updated) =
        match loader.load(&FetchOptions { limit }, &progress).await {
            LoadState::Ready {
                source,
                count,
                last_updated,
            } => (source, count, last_updated),
            LoadState::Failed { message } => {
                progress.finish("load failed".to_string());
                return Err(message.into());
            }
            state => unreachable!("load() returned non-terminal state {state:?}"),
        };

    progress.finish(format!("loaded {count} records from {source}"));

    let mut dashboard = Dashboard::new(dataset.map.clone());
    dashboard.set_records(loader.records());
    dashboard.set_filter(RequestFilter {
        neighborhood,
        department,
    });

    print_report(&dashboard, last_updated.as_deref());
    Ok(())
}

async fn run_fetch(
    multi: &MultiProgress,
    dataset: &DatasetDefinition,
    limit: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = boston311_source::ckan::DatastoreSource::new(dataset.datastore.clone());
    let progress = IndicatifProgress::records_bar(multi, "Fetching from datastore API");

    let raw = source.fetch(&FetchOptions { limit }, &progress).await?;
    let records = normalize::normalize_all(&raw);
    progress.finish(format!("fetched {} records", records.len()));

    let located = records.iter().filter(|r| r.has_coordinates()).count();
    println!("Fetched {} records ({located} with coordinates)", records.len());
    Ok(())
}

fn print_dataset(dataset: &DatasetDefinition) {
    println!("{} ({})", dataset.name, dataset.id);
    println!("  snapshot:  {}", dataset.snapshot.csv_url);
    println!(
        "  datastore: {} (resource {})",
        dataset.datastore.api_url, dataset.datastore.resource_id
    );
    println!(
        "  paging:    {} per page, cap {}",
        dataset.datastore.page_size, dataset.datastore.max_records
    );
    let b = &dataset.map.bounds;
    println!(
        "  bounds:    lat {:.2}..{:.2}, lng {:.2}..{:.2}",
        b.min_lat, b.max_lat, b.min_lng, b.max_lng
    );
    println!("  map cap:   {} points", dataset.map.max_points);
}

fn print_report(dashboard: &Dashboard, last_updated: Option<&str>) {
    let views = dashboard.views();

    println!();
    println!("=== Boston 311 Service Requests ===");
    if let Some(updated) = last_updated {
        println!("Snapshot last updated: {updated}");
    }
    println!("Records (filtered): {}", views.total);
    println!(
        "Average resolution: {} days | On-time rate: {}",
        views.resolution, views.on_time_rate
    );
    println!(
        "On time: {} | Overdue: {}",
        views.on_time.on_time, views.on_time.overdue
    );

    println!();
    println!("Monthly volume:");
    for month in &views.monthly {
        println!(
            "  {:>3}  {:>7} requests  ({} closed, {} overdue)",
            month.month_name, month.requests, month.closed, month.overdue
        );
    }

    println!();
    println!("Top neighborhoods:");
    for entry in &views.by_neighborhood {
        println!("  {:>7}  {}", entry.count, entry.full_label);
    }

    println!();
    println!("Top topics:");
    for entry in &views.by_topic {
        println!("  {:>7}  {}", entry.count, entry.full_label);
    }

    println!();
    println!("Slowest topics (mean days to close):");
    for entry in &views.resolution_by_topic {
        println!(
            "  {:>7.1}  {} ({} samples)",
            entry.average_days, entry.topic, entry.samples
        );
    }

    println!();
    println!(
        "Map layer: {} plottable points within bounds",
        dashboard.points().len()
    );
}
