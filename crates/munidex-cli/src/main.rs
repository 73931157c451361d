// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use munidex_core::builder::write_index;
use munidex_core::client::{
    search, FileFetcher, FileStore, GeoIndexClient, HttpFetcher, IndexFetcher, IndexStore, NoStore,
    DEFAULT_SEARCH_LIMIT,
};
use munidex_core::config::BuildConfig;
use munidex_core::geometry::FeatureCollection;
use munidex_core::overrides::OverrideTable;
use munidex_core::registry::{AppwriteRegistry, EntityRegistry};
use munidex_core::{IndexBuilder, MunicipalityEntry};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the Geo-Index from the boundary feed and the entity registry
    Build(BuildArgs),
    /// Find the municipality containing a coordinate
    Locate {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        #[command(flatten)]
        source: IndexArgs,
    },
    /// Search municipalities by name
    Search {
        query: String,
        #[arg(short, long, default_value_t = DEFAULT_SEARCH_LIMIT)]
        limit: usize,
        #[command(flatten)]
        source: IndexArgs,
    },
}

#[derive(Args)]
struct BuildArgs {
    /// JSON config file; flags below override its values
    #[arg(short, long, env = "MUNIDEX_CONFIG")]
    config: Option<PathBuf>,
    #[arg(long, env = "MUNIDEX_ENDPOINT")]
    endpoint: Option<String>,
    #[arg(long, env = "MUNIDEX_PROJECT_ID")]
    project_id: Option<String>,
    #[arg(long, env = "MUNIDEX_DATABASE_ID")]
    database_id: Option<String>,
    /// URL or path of the boundary FeatureCollection
    #[arg(long, env = "MUNIDEX_GEOMETRY_URL")]
    geometry: Option<String>,
    /// Override table replacing the built-in corrections
    #[arg(long, env = "MUNIDEX_OVERRIDES")]
    overrides: Option<PathBuf>,
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Simplification tolerance in degrees
    #[arg(long)]
    tolerance: Option<f64>,
}

#[derive(Args)]
struct IndexArgs {
    /// Geo-Index file path or URL
    #[arg(
        long,
        env = "MUNIDEX_INDEX",
        default_value = "public/municipalities-index.json"
    )]
    index: String,
    /// Skip the persisted copy in the config directory
    #[arg(long)]
    no_cache: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => std::env::var("MUNIDEX_LOG")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(LevelFilter::Info),
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto)
        .context("Failed to initialize logger")?;

    match cli.command {
        Commands::Build(args) => run_build(args),
        Commands::Locate { lat, lon, source } => {
            let client = make_client(&source)?;
            let found = block_on(client.find_by_coordinates(lat, lon))?
                .context("municipality index unavailable")?;
            match found {
                Some(m) => print_entry(&m),
                None => println!("No municipality contains ({}, {})", lat, lon),
            }
            Ok(())
        }
        Commands::Search {
            query,
            limit,
            source,
        } => {
            let client = make_client(&source)?;
            let index = block_on(client.get_index())?.context("municipality index unavailable")?;
            let hits = search(&index, &query, limit);
            if hits.is_empty() {
                println!("No municipality matches '{}'", query);
            }
            for m in hits {
                print_entry(m);
            }
            Ok(())
        }
    }
}

fn run_build(args: BuildArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => BuildConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => BuildConfig::default(),
    };
    if let Some(v) = args.endpoint {
        config.endpoint = v;
    }
    if let Some(v) = args.project_id {
        config.project_id = v;
    }
    if let Some(v) = args.database_id {
        config.database_id = v;
    }
    if let Some(v) = args.geometry {
        config.geometry_url = v;
    }
    if let Some(v) = args.overrides {
        config.overrides = Some(v);
    }
    if let Some(v) = args.output {
        config.output = v;
    }
    if let Some(v) = args.tolerance {
        config.tolerance = v;
    }
    config.validate()?;

    let overrides = match &config.overrides {
        Some(path) => OverrideTable::load(path)
            .with_context(|| format!("Failed to load overrides {}", path.display()))?,
        None => OverrideTable::default(),
    };

    log::info!("Generating {}", config.output.display());
    let features =
        FeatureCollection::load(&config.geometry_url).context("Failed to load geometry feed")?;

    let source = AppwriteRegistry::new(
        &config.endpoint,
        &config.project_id,
        &config.database_id,
        &config.collection,
        &config.label_marker,
    )?;
    let registry = EntityRegistry::collect(&source, config.page_size, &config.label_marker)
        .context("Failed to fetch entity registry")?;

    let report = IndexBuilder::new(overrides)
        .with_tolerance(config.tolerance)
        .build(&features, &registry);
    report.log_summary();

    let bytes = write_index(&config.output, &report.entries)
        .with_context(|| format!("Failed to write {}", config.output.display()))?;
    println!(
        "Wrote {} municipalities ({} bytes) to {}",
        report.entries.len(),
        bytes,
        config.output.display()
    );
    Ok(())
}

fn make_client(args: &IndexArgs) -> Result<GeoIndexClient> {
    let store: Box<dyn IndexStore> = if args.no_cache {
        Box::new(NoStore)
    } else {
        Box::new(FileStore::in_config_root())
    };
    let fetcher: Box<dyn IndexFetcher> =
        if args.index.starts_with("http://") || args.index.starts_with("https://") {
            Box::new(HttpFetcher::new(&args.index)?)
        } else {
            Box::new(FileFetcher::new(&args.index))
        };
    Ok(GeoIndexClient::new(fetcher, store))
}

fn block_on<F: std::future::Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    Ok(runtime.block_on(future))
}

fn print_entry(m: &MunicipalityEntry) {
    println!("{} ({}) — {} [{}]", m.name, m.ine_code, m.department, m.id);
}
