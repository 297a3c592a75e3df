//! idcard – command-line front end for the ID card pipeline.
//!
//! Usage:
//!   idcard render  <athlete.json> [--out DIR]
//!   idcard layout  <athlete.json>
//!   idcard deliver <athlete.json> [--out DIR]
//!   idcard sweep   [--dir DIR]
//!   idcard sample
//!
//! Settings come from the environment (and a `.env` file if present); see
//! `ServiceConfig::from_env`.

use std::{
    env, fs,
    path::{Path, PathBuf},
    process,
    sync::Arc,
};

use chrono::{Datelike, Utc};

use idcard_forge::config::ServiceConfig;
use idcard_forge::record::{AthleteRecord, DisplayId, NewAthlete};
use idcard_forge::retention::RetentionSweeper;
use idcard_forge::samples;
use idcard_forge::store::{InMemoryStore, RecordStore};
use idcard_forge::{CardRenderer, CardService, PdfCardRenderer};

#[tokio::main]
async fn main() {
    // A missing .env is normal.
    let _ = dotenvy::dotenv();
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    let mut command: Option<String> = None;
    let mut input_path: Option<PathBuf> = None;
    let mut dir: Option<PathBuf> = None;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--out" | "--dir" | "-o" => match iter.next() {
                Some(v) => dir = Some(PathBuf::from(v)),
                None => {
                    eprintln!("{arg} needs a directory");
                    process::exit(1);
                }
            },
            "--help" | "-h" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            other if other.starts_with('-') => {
                eprintln!("Unknown flag: {other}");
                print_usage(&args[0]);
                process::exit(1);
            }
            word => {
                if command.is_none() {
                    command = Some(word.to_string());
                } else if input_path.is_none() {
                    input_path = Some(PathBuf::from(word));
                } else {
                    eprintln!("Unexpected argument: {word}");
                    print_usage(&args[0]);
                    process::exit(1);
                }
            }
        }
    }

    let mut config = match ServiceConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            process::exit(1);
        }
    };
    if let Some(d) = dir {
        config.output_dir = d;
    }

    let result = match command.as_deref() {
        Some("render") => render(config, require_input(&input_path, &args[0])).await,
        Some("layout") => layout(config, require_input(&input_path, &args[0])).await,
        Some("deliver") => deliver(config, require_input(&input_path, &args[0])).await,
        Some("sweep") => sweep(config).await,
        Some("sample") => {
            println!("{}", samples::short_profile_json());
            Ok(())
        }
        Some(other) => Err(format!("unknown command {other:?}")),
        None => {
            print_usage(&args[0]);
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn require_input(input: &Option<PathBuf>, prog: &str) -> PathBuf {
    match input {
        Some(p) => p.clone(),
        None => {
            eprintln!("Error: no athlete file specified.");
            print_usage(prog);
            process::exit(1);
        }
    }
}

fn read_athlete(path: &Path) -> Result<NewAthlete, String> {
    let json = fs::read_to_string(path)
        .map_err(|e| format!("reading '{}': {e}", path.display()))?;
    let athlete: NewAthlete = serde_json::from_str(&json)
        .map_err(|e| format!("parsing '{}': {e}", path.display()))?;
    let athlete = athlete.normalized();
    athlete
        .validate_on(Utc::now().date_naive())
        .map_err(|e| format!("'{}': {e}", path.display()))?;
    Ok(athlete)
}

/// A record for one-off commands that do not go through a store.
fn standalone_record(athlete: NewAthlete) -> AthleteRecord {
    let now = Utc::now();
    AthleteRecord::new(athlete, DisplayId::generate(now.year()), now)
}

fn renderer(config: &ServiceConfig) -> Result<PdfCardRenderer, String> {
    let logo = idcard_forge::assets::LogoCache::new(&config.logo_path, config.logo_url.clone())
        .map_err(|e| e.to_string())?;
    Ok(PdfCardRenderer::new(
        idcard_forge::documents::DocumentDir::new(&config.output_dir),
        &config.uploads_dir,
        logo,
    ))
}

async fn render(config: ServiceConfig, input: PathBuf) -> Result<(), String> {
    let record = standalone_record(read_athlete(&input)?);
    let renderer = renderer(&config)?;
    let location = renderer.render(&record).await.map_err(|e| e.to_string())?;
    let path = renderer
        .documents()
        .resolve(&location)
        .unwrap_or_else(|| config.output_dir.clone());
    eprintln!(
        "Wrote ID card for {} ({}) to '{}'",
        record.full_name(),
        record.display_id,
        path.display()
    );
    println!("{location}");
    Ok(())
}

async fn layout(config: ServiceConfig, input: PathBuf) -> Result<(), String> {
    let record = standalone_record(read_athlete(&input)?);
    let card = renderer(&config)?.layout(&record).await;
    println!("{}", card.to_json());
    Ok(())
}

async fn deliver(config: ServiceConfig, input: PathBuf) -> Result<(), String> {
    let athlete = read_athlete(&input)?;
    let store = Arc::new(InMemoryStore::new());
    let (service, worker) =
        CardService::from_config(config, store.clone()).map_err(|e| e.to_string())?;

    let record = service.register(athlete).await.map_err(|e| e.to_string())?;
    service.shutdown();
    let summary = worker.join().await;
    eprintln!(
        "Delivery finished: {} delivered, {} render failed, {} notify failed",
        summary.delivered, summary.render_failed, summary.notify_failed
    );

    let stored = store
        .find_by_display_id(&record.display_id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("record {} vanished", record.display_id))?;
    let json = serde_json::to_string_pretty(&stored).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

async fn sweep(config: ServiceConfig) -> Result<(), String> {
    let sweeper = RetentionSweeper::new(
        idcard_forge::documents::DocumentDir::new(&config.output_dir),
        config.retention,
        config.sweep_interval,
    );
    let report = sweeper.sweep().await.map_err(|e| e.to_string())?;
    eprintln!(
        "Swept '{}': {} scanned, {} deleted, {} failed",
        config.output_dir.display(),
        report.scanned,
        report.deleted,
        report.failed
    );
    Ok(())
}

fn print_usage(prog: &str) {
    eprintln!("idcard – Para Sports ID card generator (idcard-forge)");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {prog} render  <athlete.json> [--out DIR]   Render a card and print its location");
    eprintln!("  {prog} layout  <athlete.json>               Print the card's draw list as JSON");
    eprintln!("  {prog} deliver <athlete.json> [--out DIR]   Register, render and email; print the record");
    eprintln!("  {prog} sweep   [--dir DIR]                  Delete cards past the retention window");
    eprintln!("  {prog} sample                               Print a sample athlete file");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  IDCARD_OUTPUT_DIR, IDCARD_UPLOADS_DIR, IDCARD_LOGO_PATH, IDCARD_LOGO_URL,");
    eprintln!("  IDCARD_RETENTION_DAYS, IDCARD_SWEEP_INTERVAL_HOURS,");
    eprintln!("  MAIL_API_URL, MAIL_API_KEY, SENDER_EMAIL, MAIL_TIMEOUT_SECS, RUST_LOG");
}
