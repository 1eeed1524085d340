use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use storemap::cluster_set::catalog_bounds;
use storemap::render::{InMemorySurface, RenderOutcome, Viewport, to_feature_collection};
use storemap::{BoundingBox, Config, ExplorerSession, StoreFilter, facet_counts, parse_stores_from_path};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON (or TOML) configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a catalog and print record and facet counts
    Inspect { catalog: PathBuf },

    /// Print the markers for one viewport as GeoJSON
    Render {
        catalog: PathBuf,

        /// Viewport as west,south,east,north
        #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
        bbox: BoundingBox,

        #[arg(long)]
        zoom: f64,

        /// JSON facet filter
        #[arg(long)]
        filter: Option<PathBuf>,
    },

    /// Print nearby place counts per store as CSV
    #[cfg(feature = "http")]
    Export {
        catalog: PathBuf,

        /// Base URL of the nearby-data API
        #[arg(long)]
        api: Option<String>,

        /// JSON facet filter
        #[arg(long)]
        filter: Option<PathBuf>,
    },
}

fn parse_bbox(value: &str) -> Result<BoundingBox, String> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|p| p.trim().parse::<f64>().map_err(|e| format!("{}: {}", p, e)))
        .collect::<Result<_, _>>()?;
    match parts.as_slice() {
        [west, south, east, north] => Ok(BoundingBox::new(*west, *south, *east, *north)),
        _ => Err(format!("expected west,south,east,north, got {}", value)),
    }
}

fn load_filter(path: Option<&Path>) -> anyhow::Result<Option<StoreFilter>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading filter {}", path.display()))?;
    Ok(Some(StoreFilter::from_json(&text)?))
}

fn load_session(
    config: Config,
    catalog: &Path,
    filter: Option<&Path>,
) -> anyhow::Result<ExplorerSession<InMemorySurface>> {
    let records = parse_stores_from_path(catalog)
        .with_context(|| format!("reading catalog {}", catalog.display()))?;
    let mut session = ExplorerSession::new(config, InMemorySurface::new())?;
    session.load_records(records)?;
    if let Some(filter) = load_filter(filter)? {
        session.set_filter(filter)?;
    }
    Ok(session)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("storemap=info"))
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Config::from_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };

    match args.command {
        Command::Inspect { catalog } => {
            let records = parse_stores_from_path(&catalog)?;
            let summary = serde_json::json!({
                "records": records.len(),
                "bounds": catalog_bounds(&records),
                "facets": facet_counts(&records),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Render {
            catalog,
            bbox,
            zoom,
            filter,
        } => {
            let mut session = load_session(config, &catalog, filter.as_deref())?;
            match session.viewport_changed(Viewport::new(bbox, zoom))? {
                RenderOutcome::NotReady => anyhow::bail!("viewport {:?} at zoom {} is not usable", bbox, zoom),
                outcome => log::debug!("Render outcome: {:?}", outcome),
            }
            let collection = to_feature_collection(session.renderer().markers());
            println!("{}", serde_json::to_string_pretty(&collection)?);
        }
        #[cfg(feature = "http")]
        Command::Export {
            catalog,
            api,
            filter,
        } => {
            let mut nearby = config.nearby.clone();
            if let Some(api) = api {
                nearby = nearby.with_base_url(api);
            }
            let session = load_session(config, &catalog, filter.as_deref())?;
            let records = session.clusters().active_records();
            let client = storemap::HttpNearbyClient::new(&nearby)?;

            let token = storemap::CancellationToken::new();
            let on_interrupt = token.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::info!("Interrupted, cancelling export");
                    on_interrupt.cancel();
                }
            });

            let rows = storemap::export_poi_counts(&records, &client, &nearby, &token).await?;
            storemap::write_export_csv(&rows, std::io::stdout().lock())?;
        }
    }

    Ok(())
}
