//! AirLens command-line client.
//!
//! Loads the current measurements, optionally searches for a city, and prints
//! what the globe would show.
//!
//! ```text
//! airlens [--config PATH] [--fixture FILE] [--metric composite|CO|NO2|O3|SO2]
//!         [--search CITY] [--json] [--verify]
//! ```

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use airlens::app::{App, AppEvent, EventOutcome};
use airlens::config::{self, Config, DEFAULT_CONFIG_PATH};
use airlens::dev_mode::FixtureSource;
use airlens::highlight::{CameraControl, PointOfView};
use airlens::ingest::DataSource;
use airlens::ingest::airlens::HttpSource;
use airlens::logging::{self, Component};
use airlens::model::Metric;
use airlens::store::RefreshOutcome;
use airlens::verify;
use airlens::view::ViewSnapshot;

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    fixture: Option<PathBuf>,
    metric: Option<Metric>,
    search: Option<String>,
    json: bool,
    verify: bool,
}

fn usage() -> ! {
    eprintln!(
        "Usage: airlens [--config PATH] [--fixture FILE] [--metric composite|CO|NO2|O3|SO2] \
         [--search CITY] [--json] [--verify]"
    );
    process::exit(2);
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => args.config = iter.next().map(PathBuf::from),
            "--fixture" => args.fixture = iter.next().map(PathBuf::from),
            "--metric" => match iter.next().map(|m| m.parse::<Metric>()) {
                Some(Ok(metric)) => args.metric = Some(metric),
                Some(Err(e)) => {
                    eprintln!("{}", e);
                    usage();
                }
                None => usage(),
            },
            "--search" => args.search = iter.next(),
            "--json" => args.json = true,
            "--verify" => args.verify = true,
            "-h" | "--help" => usage(),
            other => {
                eprintln!("Unknown argument: {}", other);
                usage();
            }
        }
    }
    args
}

/// Stands in for the globe camera: reports each flight on the console.
struct ConsoleCamera;

impl CameraControl for ConsoleCamera {
    fn point_of_view(&mut self, target: PointOfView, duration_ms: u32) {
        logging::info(
            Component::View,
            None,
            &format!(
                "camera → ({:.2}, {:.2}) altitude {:.1} over {} ms",
                target.lat, target.lng, target.altitude, duration_ms
            ),
        );
    }
}

fn build_source(args: &Args, config: &Config) -> Result<Box<dyn DataSource>, String> {
    match &args.fixture {
        Some(path) => {
            let source = FixtureSource::load(path).map_err(|e| e.to_string())?;
            logging::info(
                Component::System,
                None,
                &format!("Using fixture data from {}", path.display()),
            );
            Ok(Box::new(source))
        }
        None => {
            let source = HttpSource::new(
                &config.api.base_url,
                Duration::from_secs(config.api.timeout_secs),
            )
            .map_err(|e| e.to_string())?;
            logging::info(
                Component::System,
                None,
                &format!("Using AirLens API at {}", source.base_url()),
            );
            Ok(Box::new(source))
        }
    }
}

fn print_snapshot(snapshot: &ViewSnapshot) {
    println!();
    match snapshot.metric {
        Some(metric) => println!("Metric: {}", metric),
        None => println!("Metric: (no data loaded)"),
    }
    println!("Points on globe: {}", snapshot.points.len());

    if snapshot.ranked_panel_open {
        println!();
        println!("Most polluted:");
        for row in &snapshot.ranked {
            println!("  {:>2}. {} [{}]", row.rank, row.text, row.color);
        }
    }

    if let Some(panel) = &snapshot.detail {
        println!();
        println!("{}", panel.title);
        println!("  Status:    {} [{}]", panel.status, panel.status_color);
        println!("  Composite: {}", panel.composite);
        for row in &panel.pollutants {
            println!("  {:<17} {}", format!("{}:", row.name), row.value);
        }
        println!("  Location:  {}, {}", panel.latitude, panel.longitude);
    }

    if let Some(notice) = &snapshot.notice {
        println!();
        println!("⚠ {}", notice);
    }
}

fn main() {
    let args = parse_args();

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let mut config = match config::load_from_env(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ {}", e);
            process::exit(1);
        }
    };
    if let Some(metric) = args.metric {
        config.api.default_metric = metric;
    }

    logging::init_logger(
        config.logging.level,
        config.logging.file.as_deref(),
        config.logging.timestamps,
    );

    if args.verify {
        match verify::run_verification(&config) {
            Ok(report) => {
                verify::print_summary(&report);
                if report.summary.failed > 0 {
                    process::exit(1);
                }
            }
            Err(e) => {
                logging::error(Component::System, None, &format!("Verification failed: {}", e));
                process::exit(1);
            }
        }
        return;
    }

    let source = match build_source(&args, &config) {
        Ok(source) => source,
        Err(e) => {
            logging::error(Component::System, None, &e);
            process::exit(1);
        }
    };

    let mut app = App::new(source, &config);
    app.mount_surface(Box::new(ConsoleCamera));

    if let EventOutcome::Refreshed(RefreshOutcome::Failed(e)) = app.start() {
        logging::warn(Component::System, None, &format!("Initial load failed: {}", e));
    }

    if let Some(city) = args.search.clone() {
        app.handle(AppEvent::SearchSubmitted(city));
    }

    let snapshot = app.snapshot();
    if args.json {
        match serde_json::to_string_pretty(&snapshot.points) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                logging::error(Component::System, None, &format!("Cannot encode points: {}", e));
                process::exit(1);
            }
        }
    } else {
        print_snapshot(&snapshot);
    }
}
