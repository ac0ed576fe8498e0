//! BreathGuard sensor node for hosts
//!
//! Runs the telemetry loop against an MQTT broker with simulated sensors.
//! Each line read from stdin (press Enter) is one inhaler-use trigger.
//!
//! ```text
//! RUST_LOG=info breathguard-node --config node.json --broker localhost:1883
//! ```

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use breathguard_connectors::{MqttChannel, NodeConfig, SimulatedSensors};
use breathguard_core::time::{MonotonicTime, StdDelay};
use breathguard_core::{
    CancelToken, ConnectivityManager, Delay, HealthCounter, SchedulerStats, TelemetryComposer,
    TelemetryError, TelemetryScheduler, TickOutcome, TimeSource,
};
use clap::Parser;
use log::{debug, error, info, warn};

/// Longest single sleep, so Ctrl-C is honoured promptly
const SLEEP_SLICE_MS: u64 = 100;

#[derive(Debug, Parser)]
#[command(name = "breathguard-node", version, about = "BreathGuard telemetry node")]
struct Args {
    /// Node configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Broker address, overrides the configuration (host[:port])
    #[arg(short, long)]
    broker: Option<String>,

    /// Publish a single record and exit
    #[arg(long)]
    once: bool,

    /// Seed for the simulated sensors
    #[arg(long, default_value_t = 0x1234_5678)]
    seed: u32,
}

/// `StdDelay` in short slices, returning early once cancelled
struct CancellableDelay<'a> {
    cancel: &'a CancelToken,
}

impl Delay for CancellableDelay<'_> {
    fn delay_ms(&mut self, ms: u64) {
        let mut remaining = ms;
        while remaining > 0 && !self.cancel.is_cancelled() {
            let slice = remaining.min(SLEEP_SLICE_MS);
            StdDelay.delay_ms(slice);
            remaining -= slice;
        }
    }
}

fn load_config(args: &Args) -> Result<NodeConfig> {
    let mut config = match &args.config {
        Some(path) => NodeConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => NodeConfig::default().with_env_keys(),
    };
    if let Some(broker) = &args.broker {
        config.set_broker(broker)?;
    }
    config.validate().context("invalid node configuration")?;
    Ok(config)
}

/// Stand-in for the button interrupt: one trigger per stdin line
fn spawn_trigger_reader(counter: Arc<HealthCounter>, clock: MonotonicTime) {
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            if line.is_err() {
                break;
            }
            match counter.record_event(clock.now()) {
                Ok(count) => info!("health event recorded ({} this window)", count),
                Err(TelemetryError::BounceRejected) => debug!("trigger ignored: bounce"),
                Err(e) => warn!("trigger ignored: {}", e),
            }
        }
    });
}

fn run_node(
    config: &NodeConfig,
    counter: &HealthCounter,
    clock: MonotonicTime,
    cancel: &CancelToken,
    once: bool,
    seed: u32,
) -> Result<SchedulerStats> {
    let identity = config.identity()?;
    let link = ConnectivityManager::new(MqttChannel::new(config.mqtt_config()), config.topic()?)
        .with_policy(config.retry_policy());

    info!(
        "node {} publishing to {} via {}:{}",
        identity.device_id(),
        link.topic(),
        config.mqtt.host,
        config.mqtt.port
    );

    let mut scheduler = TelemetryScheduler::new(
        counter,
        TelemetryComposer::new(&identity),
        SimulatedSensors::new(seed),
        link,
        config.encoder(),
        clock,
        CancellableDelay { cancel },
    )
    .with_config(config.scheduler_config());

    if once {
        match scheduler.run_once(cancel) {
            Ok(TickOutcome::Published { health_events, signature }) => {
                info!("published record ({} health events, signature {})", health_events, signature)
            }
            Ok(TickOutcome::Dropped(e)) => anyhow::bail!("record dropped: {}", e),
            Err(e) => info!("stopped before publishing: {}", e),
        }
        scheduler.link_mut().channel_mut().disconnect();
        return Ok(*scheduler.stats());
    }

    let stats = scheduler.run(cancel);
    scheduler.link_mut().channel_mut().disconnect();
    Ok(stats)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = load_config(&args)?;

    let clock = MonotonicTime::new();
    let counter = Arc::new(HealthCounter::new(config.health_config()));
    counter.begin_window(clock.now());
    let cancel = Arc::new(CancelToken::new());

    spawn_trigger_reader(Arc::clone(&counter), clock.clone());

    let worker = {
        let counter = Arc::clone(&counter);
        let cancel = Arc::clone(&cancel);
        let (once, seed) = (args.once, args.seed);
        tokio::task::spawn_blocking(move || run_node(&config, &counter, clock, &cancel, once, seed))
    };

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutting down");
            cancel.cancel();
        }
    });

    match worker.await.context("telemetry task panicked")? {
        Ok(stats) => {
            info!(
                "{} ticks: {} published, {} dropped, {} slots skipped",
                stats.ticks, stats.published, stats.dropped, stats.skipped
            );
            Ok(())
        }
        Err(e) => {
            error!("{:#}", e);
            Err(e)
        }
    }
}
