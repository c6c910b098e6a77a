//! obs entry point.
//!
//! This file is intentionally thin: it parses the CLI, sets up tracing,
//! loads and validates configuration, wires the components, and handles
//! process-level concerns (signals, exit codes). All kernel behavior
//! lives in the library crates.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use obs_clock::{Clock, SystemClock};
use obs_config::{load_layered_yaml, FeedKind, LoadedConfig};
use obs_engine::{Engine, EngineConfig, EngineHandle};
use obs_feed::{FeedDriver, MockFeedConfig, MockL1Feed};
use obs_gates::GateConfig;
use obs_hub::DataHub;
use obs_queues::{CommandQueue, InboundQueue};
use obs_schemas::{Command, Instrument, Intent};
use obs_triggerlog::{TriggerLogConfig, TriggerLogger};

#[derive(Parser)]
#[command(name = "obs")]
#[command(about = "Silent-observer kernel for a single futures instrument", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the observer until interrupted (or for a bounded duration)
    Run {
        /// Layered config paths in merge order (base -> overrides)
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        /// Override max runtime in seconds
        #[arg(long)]
        duration_s: Option<u64>,

        /// Arm at startup (same path a UI command would take)
        #[arg(long, default_value_t = false)]
        arm: bool,

        /// Startup intent
        #[arg(long, value_enum)]
        intent: Option<IntentArg>,
    },

    /// Compute the layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum IntentArg {
    Long,
    Short,
    Both,
    Flat,
}

impl From<IntentArg> for Intent {
    fn from(arg: IntentArg) -> Self {
        match arg {
            IntentArg::Long => Intent::Long,
            IntentArg::Short => Intent::Short,
            IntentArg::Both => Intent::Both,
            IntentArg::Flat => Intent::Flat,
        }
    }
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.cmd {
        Commands::Run {
            config_paths,
            duration_s,
            arm,
            intent,
        } => {
            let paths: Vec<&str> = config_paths.iter().map(String::as_str).collect();
            let loaded = load_layered_yaml(&paths).context("configuration error")?;
            run_observer(loaded, duration_s, arm, intent.map(Into::into))
        }
        Commands::ConfigHash { paths } => {
            let paths: Vec<&str> = paths.iter().map(String::as_str).collect();
            let loaded = load_layered_yaml(&paths).context("configuration error")?;
            println!("config_hash: {}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
            Ok(())
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn run_observer(
    loaded: LoadedConfig,
    duration_s: Option<u64>,
    arm: bool,
    intent: Option<Intent>,
) -> Result<()> {
    let cfg = loaded.config;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let inbound = InboundQueue::new();
    let commands = CommandQueue::new();
    let hub = Arc::new(DataHub::new());

    let engine = Engine::new(
        EngineConfig {
            instrument: Instrument {
                symbol: cfg.instrument.symbol.clone(),
                contract_key: cfg.instrument.contract_key.clone(),
                con_id: cfg.instrument.con_id,
                tick_size: cfg.instrument.tick_size,
            },
            cycle_target_ms: cfg.engine.cycle_target_ms,
            cycle_overrun_threshold_ms: cfg.engine.cycle_overrun_threshold_ms,
            gates: GateConfig {
                stale_threshold_ms: cfg.gates.stale_threshold_ms,
                feed_heartbeat_timeout_ms: cfg.gates.feed_heartbeat_timeout_ms,
                max_spread_ticks: cfg.gates.max_spread_ticks,
            },
            schedule: cfg.session.schedule()?,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            config_hash: loaded.config_hash.clone(),
            max_runtime_s: duration_s.or(cfg.engine.max_runtime_s),
            trigger_logger_enabled: cfg.trigger_log.enabled,
        },
        Arc::clone(&clock),
        inbound.clone(),
        commands.clone(),
        Arc::clone(&hub),
    );
    let run_id = engine.run_id().to_string();
    info!(run_id = %run_id, contract = %cfg.instrument.contract_key, "observer starting");

    // Trigger logger (optional).
    let logger = if cfg.trigger_log.enabled {
        Some(
            TriggerLogger::spawn(
                TriggerLogConfig {
                    dir: cfg.trigger_log.dir.clone(),
                    cadence_hz: cfg.trigger_log.cadence_hz,
                    flush_every: cfg.trigger_log.flush_every,
                },
                &run_id,
                Arc::clone(&hub),
                Arc::clone(&clock),
            )
            .context("start trigger logger")?,
        )
    } else {
        None
    };

    // Feed adapter. Fatal classes (client-id collision, auth) abort here
    // with a non-zero exit.
    let feed_driver = match cfg.feed.kind {
        FeedKind::Mock => {
            let mock = MockL1Feed::new(
                MockFeedConfig {
                    base_price: cfg.feed.base_price,
                    tick_size: cfg.instrument.tick_size,
                    spread_ticks: cfg.feed.spread_ticks,
                    quote_rate_hz: cfg.feed.quote_rate_hz,
                    drift_amplitude: cfg.feed.drift_amplitude,
                    drift_period_s: cfg.feed.drift_period_s,
                    con_id: cfg.feed.con_id,
                },
                inbound.clone(),
                Arc::clone(&clock),
            );
            Some(
                FeedDriver::spawn(Box::new(mock), Duration::from_millis(10))
                    .context("start feed adapter")?,
            )
        }
        FeedKind::None => None,
    };

    // Scripted startup controls go through the same queue a UI would use.
    let now_ms = clock.now_unix_ms();
    let mut cmd_id = 0u64;
    if let Some(intent) = intent {
        cmd_id += 1;
        let _ = commands.push(Command::set_intent(cmd_id, now_ms, intent));
    }
    if arm {
        cmd_id += 1;
        let _ = commands.push(Command::set_arm(cmd_id, now_ms, true));
    }

    // Interrupt flips the same flag the engine polls each cycle.
    let shutdown = engine.shutdown_flag();
    ctrlc::set_handler(move || {
        shutdown.store(true, Ordering::Release);
    })
    .context("install signal handler")?;

    let handle = EngineHandle::spawn(engine)?;

    // Stand-in for the read-only UI: a periodic status line off the hub.
    while !handle.is_finished() {
        std::thread::sleep(Duration::from_millis(1_000));
        if let Some(snap) = hub.latest() {
            info!(
                snapshot_id = snap.snapshot_id,
                allowed = snap.gates.allowed,
                reasons = ?snap.gates.reason_codes,
                staleness_ms = ?snap.gates.gate_metrics.staleness_ms,
                "status"
            );
        }
    }
    let summary = handle.join()?;

    if let Some(driver) = feed_driver {
        driver.stop();
    }
    if let Some(logger) = logger {
        logger.stop();
    }

    println!("{summary}");
    Ok(())
}
