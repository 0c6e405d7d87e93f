use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use delivery_planner::builder::MatrixBuilder;
use delivery_planner::cache::MatrixCache;
use delivery_planner::config::{DepotConfig, Objective, PlannerConfig, ServiceKind};
use delivery_planner::planner::Planner;
use delivery_planner::records::load_records;
use delivery_planner::stop::StopSet;

#[derive(Parser)]
#[command(author, version, about = "Order delivery stops into a short round trip", long_about = None)]
struct Cli {
    /// Delivery records (CSV with id, latitude, longitude columns)
    #[arg(short = 'i', long)]
    data: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// What to minimize: distance or duration
    #[arg(short, long)]
    objective: Option<Objective>,

    /// Routing service: osrm, ors or haversine
    #[arg(short, long)]
    service: Option<ServiceKind>,

    /// Routing service base URL
    #[arg(long)]
    base_url: Option<String>,

    #[arg(long, requires = "depot_lng")]
    depot_lat: Option<f64>,

    #[arg(long, requires = "depot_lat")]
    depot_lng: Option<f64>,

    /// Matrix cache file, read before and written after the run
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Also price input order and a straight-line tour on the same matrix
    #[arg(long)]
    compare: bool,

    /// Where to write the route JSON (stdout when omitted)
    #[arg(long)]
    output: Option<PathBuf>,

    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => PlannerConfig::from_file(path)?,
        None => PlannerConfig::default(),
    };
    apply_overrides(&mut config, &cli);
    config.validate()?;

    let records = load_records(&cli.data)
        .with_context(|| format!("loading {}", cli.data.display()))?;
    info!(records = records.len(), "loaded delivery data");
    let stops = StopSet::from_records(config.depot_stop()?, &records)?;

    let cache = match &cli.cache {
        Some(path) => MatrixCache::load(path)?,
        None => MatrixCache::new(),
    };

    let cache = Arc::new(cache);
    let builder = MatrixBuilder::new(config.connect()?, config.build_options())?
        .with_cache(Arc::clone(&cache));
    let planner = Planner::new(builder, config.solve_options()?, config.assemble_options());

    let outcome = if cli.compare {
        planner
            .plan_with_comparison(&stops)
            .map(|(planned, comparison)| (planned, Some(comparison)))
    } else {
        planner.plan(&stops).map(|planned| (planned, None))
    };

    // Pairs resolved before a failure are still worth keeping.
    if let Some(path) = &cli.cache {
        cache.save(path)?;
    }
    let (planned, comparison) = outcome?;
    if let Some(comparison) = &comparison {
        eprintln!("\n{comparison}");
    }

    let json = planned.to_json()?;
    match &cli.output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "route written");
        }
        None => println!("{json}"),
    }

    Ok(())
}

fn apply_overrides(config: &mut PlannerConfig, cli: &Cli) {
    if let Some(objective) = cli.objective {
        config.objective = Some(objective);
    }
    if let Some(kind) = cli.service {
        config.service.kind = kind;
    }
    if let Some(base_url) = &cli.base_url {
        config.service.base_url = Some(base_url.clone());
    }
    if let (Some(latitude), Some(longitude)) = (cli.depot_lat, cli.depot_lng) {
        let (id, label) = match config.depot.take() {
            Some(depot) => (depot.id, depot.label),
            None => ("depot".to_string(), None),
        };
        config.depot = Some(DepotConfig {
            id,
            latitude,
            longitude,
            label,
        });
    }
}
