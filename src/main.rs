//! Plantcore host simulator.
//!
//! Trains the classifiers and forecaster on synthetic data (or restores
//! them from a snapshot directory), then replays a simulated day of
//! readings through the service against an in-memory relay bank.
//!
//! ```text
//! plantcore [--config CONFIG.json] [--snapshot-dir DIR] [--seed N]
//! ```
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  Adapters (outer ring)                   │
//! │  RelayBank<SimPin>  LogEventSink  FileSnapshotStore      │
//! │  (ActuatorPort)     (EventSink)   (SnapshotStore)        │
//! │  ──────────────── Port Trait Boundary ─────────────────  │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │              AppService (pure logic)               │  │
//! │  │  Classifiers · Forecast · Anomaly · Safety · FSM   │  │
//! │  └────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::{info, warn};

use plantcore::adapters::log_sink::LogEventSink;
use plantcore::adapters::store::FileSnapshotStore;
use plantcore::adapters::time::ManualClock;
use plantcore::app::commands::{AppCommand, CommandRequest};
use plantcore::app::events::AppEvent;
use plantcore::app::ports::{Clock, EventSink};
use plantcore::app::service::AppService;
use plantcore::config::CoreConfig;
use plantcore::decision::ActuatorDecisionEngine;
use plantcore::drivers::sim_bank;
use plantcore::error::Error;
use plantcore::forecast::TrendForecastEngine;
use plantcore::reading::FeatureVector;
use plantcore::sim;

const DEFAULT_SNAPSHOT_DIR: &str = "plantcore-snapshots";
const TRAINING_ROWS: usize = 1000;
const HISTORY_MINUTES: usize = 2 * 24 * 60;
const REPLAY_MINUTES: usize = 24 * 60;
const TELEMETRY_EVERY: usize = 60;
const SIM_START_MS: u64 = 1_700_000_000_000;

#[derive(Parser)]
#[command(name = "plantcore")]
#[command(about = "Plantcore host simulator: train, replay a day, save snapshots", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON core configuration (defaults when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding model snapshots
    #[arg(short, long, default_value = DEFAULT_SNAPSHOT_DIR)]
    snapshot_dir: PathBuf,

    /// Seed for the synthetic training table
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn load_config(path: Option<&Path>) -> Result<CoreConfig> {
    let config = match path {
        Some(p) => {
            let text =
                std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))?;
            serde_json::from_str::<CoreConfig>(&text)
                .with_context(|| format!("parsing {}", p.display()))?
        }
        None => CoreConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── 1. Logging ────────────────────────────────────────────
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Plantcore v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Config + snapshot store ────────────────────────────
    let config = load_config(cli.config.as_deref())?;
    let mut store = FileSnapshotStore::open(cli.snapshot_dir.clone()).map_err(Error::from)?;

    // ── 3. Engines ────────────────────────────────────────────
    let decisions = Arc::new(ActuatorDecisionEngine::new(config.ensemble.clone()));
    let forecaster = Arc::new(TrendForecastEngine::new(config.forecast.clone()));
    let mut svc = AppService::with_engines(config, Arc::clone(&decisions), Arc::clone(&forecaster));

    match svc.load_models(&store) {
        Ok(loaded) if loaded.classifiers && loaded.forecaster => {}
        Ok(_) => info!("Training missing models on synthetic data"),
        Err(e) => warn!("Snapshot restore failed ({e}), retraining"),
    }

    // ── 4. Train in the background ────────────────────────────
    let trainer = {
        let decisions = Arc::clone(&decisions);
        let forecaster = Arc::clone(&forecaster);
        let seed = cli.seed;
        thread::spawn(move || -> Result<(), Error> {
            if !decisions.is_trained() {
                let table = sim::training_table(TRAINING_ROWS, seed);
                let report = decisions.train(&table)?;
                info!(
                    "Classifiers trained on {} rows (holdout {})",
                    report.train_rows, report.holdout_rows
                );
            }
            if !forecaster.is_trained() {
                let history = sim::day_cycle_history(
                    SIM_START_MS - HISTORY_MINUTES as u64 * 60_000,
                    HISTORY_MINUTES,
                    7,
                );
                let rows: Vec<FeatureVector> = history.iter().map(FeatureVector::from).collect();
                forecaster.train(&rows)?;
            }
            Ok(())
        })
    };
    trainer
        .join()
        .map_err(|_| anyhow!("training thread panicked"))??;

    let scenarios = decisions.evaluate_scenarios(&sim::reference_scenarios())?;
    info!(
        "Scenario accuracy {:.0}% ({} scenarios)",
        scenarios.accuracy * 100.0,
        scenarios.outcomes.len()
    );

    // ── 5. Replay ─────────────────────────────────────────────
    let mut hw = sim_bank();
    let mut sink = LogEventSink::new();
    let clock = ManualClock::new(SIM_START_MS);
    svc.start(&mut sink);

    for (i, reading) in sim::day_cycle_history(SIM_START_MS, REPLAY_MINUTES, 11)
        .into_iter()
        .enumerate()
    {
        clock.set(reading.timestamp_ms);
        let now = clock.now_ms();
        svc.tick(&mut hw, &mut sink, now);
        if let Err(e) = svc.handle_reading(reading, &mut hw, &mut sink, now) {
            warn!("Reading {i} dropped: {e}");
        }
        if i % TELEMETRY_EVERY == 0 {
            sink.emit(&AppEvent::Telemetry(svc.build_telemetry(now)));
        }
        if i > 0 && i % (6 * 60) == 0 {
            svc.handle_command(AppCommand::RetrainForecaster, &mut hw, &mut sink, now);
        }
    }

    // ── 6. Manual override + shutdown ─────────────────────────
    let now = clock.now_ms();
    svc.handle_command(
        AppCommand::Actuate(CommandRequest::new("fan", "ON", 600)),
        &mut hw,
        &mut sink,
        now,
    );
    svc.handle_command(AppCommand::EmergencyStop, &mut hw, &mut sink, now);
    sink.emit(&AppEvent::Telemetry(svc.build_telemetry(now)));

    svc.save_models(&mut store)?;
    info!("Snapshots saved to {}", store.dir().display());
    Ok(())
}
