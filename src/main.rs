use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use waypoint::{
    Coordinate, DataService, EngineConfig, GuideEngine, HttpDataService, MockDataService,
    PositionHandle, SimulatedAudioBackend, SimulatedWalk,
};

/// Waypoint: location-driven audio tour engine
///
/// Walks a simulated user through a POI set and narrates every point of
/// interest they approach. Point it at a real backend with --server, or use
/// the bundled Gamla Stan data with --mock.
#[derive(Parser, Debug)]
#[command(name = "waypoint")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Backend base URL, e.g. http://localhost:8000
    #[arg(short, long, value_name = "URL")]
    server: Option<String>,

    /// Use the bundled mock POI data instead of a backend
    #[arg(long)]
    mock: bool,

    /// Start latitude (defaults to the mock data origin in Stockholm)
    #[arg(long)]
    lat: Option<f64>,

    /// Start longitude
    #[arg(long)]
    lon: Option<f64>,

    /// Seed for the simulated walk
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Walking speed in meters per step (one step per second)
    #[arg(long, default_value_t = 10.0)]
    step: f64,

    /// How long to walk, in seconds
    #[arg(long, default_value_t = 180)]
    duration: u64,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "waypoint=info".into()),
        )
        .init();

    let cli = Cli::parse();

    if !cli.mock && cli.server.is_none() {
        eprintln!("Error: Either --server or --mock must be specified");
        eprintln!();
        eprintln!("Usage:");
        eprintln!("  waypoint --server http://localhost:8000   Use a real backend");
        eprintln!("  waypoint --mock                           Use bundled mock data");
        eprintln!();
        eprintln!("Run 'waypoint --help' for more options");
        std::process::exit(1);
    }

    let mock = MockDataService::new();
    let start = match (cli.lat, cli.lon) {
        (Some(lat), Some(lon)) => Coordinate::new(lat, lon),
        _ => mock.start_location(),
    };

    let service: Arc<dyn DataService> = match cli.server {
        Some(url) => Arc::new(HttpDataService::new(url)),
        None => Arc::new(mock),
    };
    let audio = Arc::new(SimulatedAudioBackend::new(Duration::from_secs(30)));
    let position = PositionHandle::new();
    position.set(start);

    let (engine, mut notifications) =
        GuideEngine::new(EngineConfig::default(), service, audio, position.clone());

    let summary = match engine.load_pois(start).await {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("Error: failed to load POIs: {e}");
            std::process::exit(1);
        }
    };
    println!(
        "Loaded {} POIs ({} in the active bucket window)",
        summary.total, summary.nearby
    );

    engine.start();

    // Simulated stroll: one step per second
    let mut walk = SimulatedWalk::new(start, cli.step, cli.seed);
    let walk_position = position.clone();
    let walker = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        loop {
            interval.tick().await;
            walk_position.set(walk.advance());
        }
    });

    let mut progress = engine.progress();
    let mut wandering = false;
    let deadline = tokio::time::sleep(Duration::from_secs(cli.duration));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            Some(note) = notifications.recv() => {
                println!("[{}] {}", note.timestamp.format("%H:%M:%S"), note.text);
            }
            Ok(()) = progress.changed() => {
                let now = *progress.borrow();
                if now.wandering != wandering {
                    wandering = now.wandering;
                    if wandering {
                        println!(
                            "    (wandering detected at {:.0}% of narration)",
                            now.fraction * 100.0
                        );
                    }
                }
            }
        }
    }

    walker.abort();
    engine.stop().await;
    println!("Tour over.");
}
