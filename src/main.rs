use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use weatherlens::models::{MetricKind, ProbabilityKey, parse_datetime};
use weatherlens::{
    ContainerRect, CountryIndex, CountryResolver, CsvExporter, CsvSource, ForecastReport,
    ForecastService, InteractionController, InteractionEvent, Pin, PointerEvent, Scene,
    WeatherApiClient, WeatherBackend, WeatherLensConfig, export, logging,
};

#[derive(Parser, Debug)]
#[command(
    name = "weatherlens",
    version,
    about = "Pick a point on the world map and forecast its weather"
)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, env = "WEATHERLENS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Query the forecast API health endpoint
    Health,
    /// Forecast for a coordinate, falling back to a synthetic forecast offline
    Forecast {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// RFC 3339 or `YYYY-MM-DDTHH:MM` (UTC); defaults to now
        #[arg(long)]
        datetime: Option<String>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export CSV for a coordinate
    Export {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        #[arg(long)]
        datetime: Option<String>,
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Click the map at a client position and report the pinned coordinate
    Locate {
        #[arg(long)]
        x: f64,
        #[arg(long)]
        y: f64,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        rotation: f64,
        #[arg(long, default_value_t = 1.0)]
        zoom: f64,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        pan: f64,
        /// GeoJSON or TopoJSON country outlines, file or URL (overrides `map.countries_path`)
        #[arg(long)]
        countries: Option<String>,
        /// Print the laid-out scene as JSON
        #[arg(long)]
        scene: bool,
    },
    /// Ask the conversational endpoint a question
    Ask { question: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = WeatherLensConfig::load_from_path(cli.config.clone())?;
    logging::init(&config.logging);

    match cli.command {
        Command::Health => {
            let client = WeatherApiClient::new(&config.api)?;
            println!("{}", client.health().await?);
        }
        Command::Forecast {
            lat,
            lon,
            datetime,
            json,
        } => {
            let service = ForecastService::from_config(&config)?;
            let outcome = service
                .fetch(Some(&Pin::new(lat, lon)), resolve_datetime(datetime.as_deref())?)
                .await?;
            if let Some(advisory) = &outcome.advisory {
                eprintln!("{}: {}", advisory.user_message(), advisory);
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome.report)?);
            } else {
                print_report(&outcome.report);
            }
        }
        Command::Export {
            lat,
            lon,
            datetime,
            out,
        } => {
            let pin = Pin::new(lat, lon);
            let service = ForecastService::from_config(&config)?;
            let exporter = CsvExporter::new(service.backend());
            // The local fallback needs a report; only fetch one if the server CSV fails.
            let artifact = match exporter.export(Some(&pin), None).await? {
                artifact if artifact.source == CsvSource::Remote => artifact,
                _ => {
                    let outcome = service
                        .fetch(Some(&pin), resolve_datetime(datetime.as_deref())?)
                        .await?;
                    export::local_artifact(Some(&outcome.report))?
                }
            };
            let path = artifact.write_to(&out).await?;
            println!("{}", path.display());
        }
        Command::Locate {
            x,
            y,
            rotation,
            zoom,
            pan,
            countries,
            scene,
        } => {
            let mut controller = InteractionController::from_config(&config);
            if let Some(source) = countries.or_else(|| config.map.countries_path.clone()) {
                let client = WeatherApiClient::new(&config.api)?;
                // Lookups degrade to "no country" without a dataset.
                match CountryIndex::open(&client, &source).await {
                    Ok(index) => controller.set_countries(CountryResolver::with_index(index)),
                    Err(err) => warn!("Country outlines unavailable from {}: {}", source, err),
                }
            }
            let view_box = controller.view_box();
            controller.set_container(Some(ContainerRect::new(
                0.0,
                0.0,
                view_box.width,
                view_box.height,
            )));
            controller.restore_view(rotation, zoom, pan);

            controller.pointer_down(PointerEvent::now(x, y));
            match controller.pointer_up(PointerEvent::now(x, y)) {
                Some(InteractionEvent::PinPlaced { pin, country }) => {
                    println!("{}", pin.coordinate.format_readout());
                    println!("{}", country.as_deref().unwrap_or("(no country)"));
                }
                _ => println!("Nothing on the map at ({x}, {y})"),
            }
            if scene {
                println!("{}", serde_json::to_string_pretty(&Scene::build(&controller))?);
            }
        }
        Command::Ask { question } => {
            let client = WeatherApiClient::new(&config.api)?;
            println!("{}", client.ask(&question).await?);
        }
    }

    Ok(())
}

fn resolve_datetime(input: Option<&str>) -> Result<DateTime<Utc>> {
    match input {
        Some(s) => Ok(parse_datetime(s)?),
        None => Ok(Utc::now()),
    }
}

fn print_report(report: &ForecastReport) {
    info!("Report provenance: {:?}", report.provenance);
    println!(
        "{} at {}",
        report.coordinate.format_coordinates(),
        report.datetime.format("%Y-%m-%d %H:%M UTC")
    );
    println!("{}", report.forecast.summary);
    println!();
    for hour in &report.forecast.hours {
        println!("  {}  {:>5.1} mm", hour.timestamp.format("%H:%M"), hour.precipitation);
    }
    println!("  total  {:.1} mm", report.forecast.total);
    println!();
    for kind in MetricKind::ALL {
        println!("  {:<14} {}", kind.key(), report.model.metrics.format(kind));
    }
    for (kind, value) in report.model.extremes.iter() {
        println!("  {:<26} {:.0}%", kind.label(), value * 100.0);
    }
    for (kind, value) in report.model.comfort.iter() {
        println!("  {:<26} {:.0}%", kind.label(), value * 100.0);
    }
    println!();
    println!("{}", report.model.description);
}
