//! Farmdesk - field agent command line client
//!
//! Search farmers, inspect farms, walk farm boundaries with a GPS receiver,
//! and pull advisory reports from the Farmdesk API.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use shared::{AdvisoryParams, BoundaryRing, FarmDraft, NewFarmer, PressureLevel, TimingPreference};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use farmdesk::external::{ApiClient, FarmApi, NmeaLocationSource};
use farmdesk::services::capture::{trace_boundary, LocationSource, TraceProgress};
use farmdesk::services::directory::{FarmerDirectory, MapLayer, SearchController, SearchState};
use farmdesk::services::drafts::farm_draft_key;
use farmdesk::services::farmer::attach_photo;
use farmdesk::services::{
    AdvisoryPage, AdvisoryService, DraftStore, ExportFormat, FarmComposer, FarmerService,
    LocationService, ReportExporter, TtlCache,
};
use farmdesk::{Config, Session};

#[derive(Parser)]
#[command(name = "farmdesk")]
#[command(about = "Field agent client for the Farmdesk farm management API")]
struct Cli {
    /// Override the API base URL
    #[arg(long, env = "FARMDESK_API_URL")]
    api_url: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search farmers by name or phone number
    Search { query: String },

    /// Farmer records
    Farmer {
        #[command(subcommand)]
        command: FarmerCommand,
    },

    /// Fetch the four advisory reports of a farm
    Advisory {
        farm_id: Uuid,
        #[arg(long)]
        planting_date: Option<chrono::NaiveDate>,
        #[arg(long)]
        growth_stage: Option<String>,
        /// pre-emergence, post-emergence or any
        #[arg(long, value_parser = parse_timing)]
        timing_preference: Option<TimingPreference>,
        #[arg(long, value_parser = parse_pressure)]
        weed_pressure: Option<PressureLevel>,
        #[arg(long, value_parser = parse_pressure)]
        pest_pressure: Option<PressureLevel>,
        /// Write the report to a file (.csv for CSV, anything else for text)
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Area and overlap check of a GeoJSON boundary
    Assess {
        /// GeoJSON geometry file (Polygon or MultiPolygon)
        geometry: PathBuf,
        /// Farm being edited, excluded from the overlap check
        #[arg(long)]
        farm_id: Option<Uuid>,
    },

    /// Walk a farm boundary with a GPS receiver (NMEA), Ctrl-C to finish
    Trace {
        /// NMEA device or log file; reads stdin when omitted
        #[arg(long)]
        nmea: Option<PathBuf>,
        /// Minimum movement between recorded points, in meters
        #[arg(long)]
        min_distance: Option<f64>,
        /// Save the traced boundary into this farmer's farm draft
        #[arg(long)]
        farmer_id: Option<Uuid>,
    },

    /// Administrative location lookups
    Locations {
        #[command(subcommand)]
        command: LocationCommand,
    },

    /// Saved form drafts
    Drafts {
        #[command(subcommand)]
        command: DraftCommand,
    },
}

#[derive(Subcommand)]
enum FarmerCommand {
    /// Show a farmer with their farms
    Show {
        farmer_id: Uuid,
        /// Map zoom level used to lay out the farms
        #[arg(long, default_value_t = 16)]
        zoom: u8,
    },
    /// Register a farmer from a JSON form
    Register {
        form: PathBuf,
        /// KYC photos to attach
        #[arg(long = "photo")]
        photos: Vec<PathBuf>,
    },
    /// Update a farmer from a JSON form
    Update { farmer_id: Uuid, form: PathBuf },
}

#[derive(Subcommand)]
enum LocationCommand {
    States,
    Lgas { state_id: String },
    Wards { lga_id: String },
    Communities { ward_id: String },
    /// LGA outlines of a state as GeoJSON
    Boundaries { state_id: String },
}

#[derive(Subcommand)]
enum DraftCommand {
    List,
    Show { key: String },
    Discard { key: String },
    /// Submit a saved farm draft
    Submit { key: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "farmdesk=info".into()),
    );
    if cli.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    // Load configuration
    dotenvy::dotenv().ok();
    let mut config = Config::load()?;
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }

    tracing::debug!(environment = %config.environment, api = %config.api.base_url, "Configuration loaded");

    match cli.command {
        Command::Search { query } => search(&config, &query).await,
        Command::Farmer { command } => farmer(&config, command).await,
        Command::Advisory {
            farm_id,
            planting_date,
            growth_stage,
            timing_preference,
            weed_pressure,
            pest_pressure,
            export,
        } => {
            let params = AdvisoryParams {
                planting_date,
                growth_stage,
                timing_preference,
                weed_pressure,
                pest_pressure,
            };
            advisory(&config, farm_id, params, export.as_deref()).await
        }
        Command::Assess { geometry, farm_id } => assess(&config, &geometry, farm_id).await,
        Command::Trace {
            nmea,
            min_distance,
            farmer_id,
        } => {
            let min_distance = min_distance.unwrap_or(config.capture.min_distance_meters);
            trace(&config, nmea.as_deref(), min_distance, farmer_id).await
        }
        Command::Locations { command } => locations(&config, command).await,
        Command::Drafts { command } => drafts(&config, command).await,
    }
}

fn connect(config: &Config) -> anyhow::Result<Arc<dyn FarmApi>> {
    let session = Session::from_config(&config.api).context("No usable session")?;
    tracing::debug!(subject = ?session.subject(), "Session loaded");
    Ok(Arc::new(ApiClient::new(&config.api, session)?))
}

fn parse_pressure(value: &str) -> Result<PressureLevel, String> {
    match value.to_ascii_lowercase().as_str() {
        "low" => Ok(PressureLevel::Low),
        "medium" => Ok(PressureLevel::Medium),
        "high" => Ok(PressureLevel::High),
        other => Err(format!("expected low, medium or high, got {}", other)),
    }
}

fn parse_timing(value: &str) -> Result<TimingPreference, String> {
    match value.to_ascii_lowercase().replace('_', "-").as_str() {
        "pre-emergence" => Ok(TimingPreference::PreEmergence),
        "post-emergence" => Ok(TimingPreference::PostEmergence),
        "any" => Ok(TimingPreference::Any),
        other => Err(format!(
            "expected pre-emergence, post-emergence or any, got {}",
            other
        )),
    }
}

async fn search(config: &Config, query: &str) -> anyhow::Result<()> {
    let api = connect(config)?;
    let cache = Arc::new(TtlCache::new(config.search.cache_ttl()));
    let mut controller = SearchController::new(api, cache, &config.search);
    let mut results = controller.subscribe();

    controller.on_input(query);
    loop {
        match &*results.borrow_and_update() {
            SearchState::Idle => {
                println!(
                    "Type at least {} characters to search",
                    config.search.min_length
                );
                return Ok(());
            }
            SearchState::Pending { .. } => {}
            SearchState::Results { farmers, .. } if farmers.is_empty() => {
                println!("No farmers found");
                return Ok(());
            }
            SearchState::Results { farmers, .. } => {
                for farmer in farmers {
                    println!(
                        "{}  {} {}  {}  {}  farms: {}",
                        farmer.id,
                        farmer.first_name,
                        farmer.last_name,
                        farmer.phone_number,
                        farmer.lga.as_deref().unwrap_or("-"),
                        farmer.farm_count
                    );
                }
                return Ok(());
            }
            SearchState::Failed { message, .. } => anyhow::bail!("Search failed: {}", message),
        }
        results.changed().await?;
    }
}

async fn farmer(config: &Config, command: FarmerCommand) -> anyhow::Result<()> {
    let api = connect(config)?;

    match command {
        FarmerCommand::Show { farmer_id, zoom } => {
            let cache = Arc::new(TtlCache::new(config.cache.farmer_detail_ttl()));
            let directory = FarmerDirectory::new(api, cache);
            let detail = directory.detail(farmer_id).await?;

            let farmer = &detail.farmer;
            println!("{} ({})", farmer.full_name(), farmer.id);
            println!("Phone: {}", farmer.phone_number);
            println!("Location: {}, {}", farmer.address.lga, farmer.address.state);
            println!(
                "Photo: {}",
                shared::photo_url_or_placeholder(farmer.photo.as_ref())
            );
            if let Some(coop) = farmer.cooperative.as_ref().filter(|c| c.is_member) {
                println!(
                    "Cooperative: {} ({})",
                    coop.cooperative_name.as_deref().unwrap_or("unnamed"),
                    coop.activities.join(", ")
                );
            }

            println!("\nFarms ({}):", detail.farms.len());
            for farm in &detail.farms {
                println!(
                    "  {}  {}  {}  {} ha",
                    farm.id, farm.farm_type, farm.ownership_status, farm.calculated_area
                );
            }

            let layer = MapLayer::for_zoom(zoom, config.map.polygon_zoom_threshold, &detail.map_farms());
            match layer {
                MapLayer::Clusters(clusters) => println!("\nMap (zoom {}): {} clusters", zoom, clusters.len()),
                MapLayer::Polygons(polygons) => println!("\nMap (zoom {}): {} polygons", zoom, polygons.len()),
            }
        }
        FarmerCommand::Register { form, photos } => {
            let mut new_farmer: NewFarmer = read_json(&form).await?;
            for photo in &photos {
                attach_photo(&mut new_farmer, photo).await?;
            }
            let created = FarmerService::new(api).register(&new_farmer).await?;
            println!("Registered {} ({})", created.full_name(), created.id);
        }
        FarmerCommand::Update { farmer_id, form } => {
            let changes: NewFarmer = read_json(&form).await?;
            let updated = FarmerService::new(api).update(farmer_id, &changes).await?;
            println!("Updated {} ({})", updated.full_name(), updated.id);
        }
    }
    Ok(())
}

async fn advisory(
    config: &Config,
    farm_id: Uuid,
    params: AdvisoryParams,
    export: Option<&Path>,
) -> anyhow::Result<()> {
    let service = AdvisoryService::new(connect(config)?);
    let mut page = AdvisoryPage::new(farm_id, params);
    page.refresh(&service).await;

    let Some(report) = page.report() else {
        anyhow::bail!("Advisory report did not load");
    };

    match export {
        Some(path) => {
            ReportExporter::export(report, path, ExportFormat::from_path(path)).await?;
            println!("{}: report written to {}", page.header(), path.display());
        }
        None => print!("{}", ReportExporter::render(report, ExportFormat::Text)?),
    }
    Ok(())
}

async fn assess(config: &Config, geometry: &Path, farm_id: Option<Uuid>) -> anyhow::Result<()> {
    let geometry: geojson::Geometry = read_json(geometry).await?;
    let ring = BoundaryRing::from_geojson(&geometry)?;

    let composer = FarmComposer::new(
        connect(config)?,
        FarmDraft {
            farm_id,
            geometry: Some(ring),
            ..Default::default()
        },
    );

    if let Some(assessment) = composer.assess().await? {
        println!("Area: {} ha ({} acres)", assessment.area_hectares, assessment.area_acres);
        match assessment.conflicting_farm_id {
            Some(conflict) => println!("Warning: overlaps existing farm {}", conflict),
            None => println!("No overlap with existing farms"),
        }
    }
    Ok(())
}

async fn trace(
    config: &Config,
    nmea: Option<&Path>,
    min_distance: f64,
    farmer_id: Option<Uuid>,
) -> anyhow::Result<()> {
    let ring = match nmea {
        Some(path) => run_trace(&NmeaLocationSource::open(path).await?, min_distance).await?,
        None => run_trace(&NmeaLocationSource::new(tokio::io::stdin()), min_distance).await?,
    };

    let Some(ring) = ring else {
        println!("Fewer than 3 points recorded, nothing captured");
        return Ok(());
    };

    let assessment = shared::assess(&ring, &[]);
    eprintln!(
        "Captured {} vertices, {} ha ({} acres)",
        ring.vertex_count(),
        assessment.area_hectares,
        assessment.area_acres
    );

    match farmer_id {
        Some(farmer_id) => {
            let store = DraftStore::new(&config.drafts.directory);
            let key = farm_draft_key(None, Some(farmer_id));
            let mut draft = store
                .load::<FarmDraft>(&key)
                .await?
                .unwrap_or_else(|| FarmDraft::for_farmer(farmer_id));
            draft.geometry = Some(ring);
            store.save(&key, &draft).await?;
            println!("Boundary saved to draft {}", key);
        }
        None => println!("{}", serde_json::to_string_pretty(&ring.to_geojson())?),
    }
    Ok(())
}

async fn run_trace<S: LocationSource>(
    source: &S,
    min_distance: f64,
) -> anyhow::Result<Option<BoundaryRing>> {
    let stop = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    let report = |progress: &TraceProgress| eprintln!("{}", progress_line(progress));

    Ok(trace_boundary(source, min_distance, stop, report).await?)
}

/// Status line printed for every fix, kept or not
fn progress_line(progress: &TraceProgress) -> String {
    let accuracy = progress
        .accuracy_meters
        .map(|a| format!("{:.1} m", a))
        .unwrap_or_else(|| "unknown".to_string());
    let mut line = format!(
        "points: {}  accuracy: {}",
        progress.accepted_points, accuracy
    );
    if !progress.last_fix_accepted {
        line.push_str("  (holding position)");
    }
    line
}

async fn locations(config: &Config, command: LocationCommand) -> anyhow::Result<()> {
    let cache = Arc::new(TtlCache::new(config.cache.community_ttl()));
    let service = LocationService::new(connect(config)?, cache);

    let rows: Vec<(String, String)> = match command {
        LocationCommand::States => service
            .states()
            .await?
            .into_iter()
            .map(|s| (s.id, s.name))
            .collect(),
        LocationCommand::Lgas { state_id } => service
            .lgas(&state_id)
            .await?
            .into_iter()
            .map(|l| (l.id, l.name))
            .collect(),
        LocationCommand::Wards { lga_id } => service
            .wards(&lga_id)
            .await?
            .into_iter()
            .map(|w| (w.id, w.name))
            .collect(),
        LocationCommand::Communities { ward_id } => service
            .communities(&ward_id)
            .await?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect(),
        LocationCommand::Boundaries { state_id } => {
            let boundaries = service.lga_boundaries(&state_id).await?;
            println!("{}", serde_json::to_string_pretty(&boundaries)?);
            return Ok(());
        }
    };

    for (id, name) in rows {
        println!("{}\t{}", id, name);
    }
    Ok(())
}

async fn drafts(config: &Config, command: DraftCommand) -> anyhow::Result<()> {
    let store = DraftStore::new(&config.drafts.directory);

    match command {
        DraftCommand::List => {
            for key in store.list().await? {
                println!("{}", key);
            }
        }
        DraftCommand::Show { key } => match store.load::<serde_json::Value>(&key).await? {
            Some(draft) => println!("{}", serde_json::to_string_pretty(&draft)?),
            None => anyhow::bail!("No draft named {}", key),
        },
        DraftCommand::Discard { key } => {
            if !store.discard(&key).await? {
                anyhow::bail!("No draft named {}", key);
            }
        }
        DraftCommand::Submit { key } => {
            let Some(draft) = store.load::<FarmDraft>(&key).await? else {
                anyhow::bail!("No draft named {}", key);
            };
            let mut composer = FarmComposer::new(connect(config)?, draft).with_draft_store(store);
            if let Some(assessment) = composer.assess().await? {
                if let Some(conflict) = assessment.conflicting_farm_id {
                    eprintln!("Warning: boundary overlaps existing farm {}", conflict);
                }
            }
            match composer.submit().await {
                Ok(farm) => println!("Saved farm {} ({} ha)", farm.id, farm.calculated_area),
                Err(farmdesk::AppError::Validation(errors)) => {
                    for (field, message) in errors.iter() {
                        eprintln!("{}: {}", field, message);
                    }
                    anyhow::bail!("Draft {} is incomplete", key);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let body = tokio::fs::read(path)
        .await
        .with_context(|| format!("Cannot read {}", path.display()))?;
    serde_json::from_slice(&body).with_context(|| format!("Invalid JSON in {}", path.display()))
}
