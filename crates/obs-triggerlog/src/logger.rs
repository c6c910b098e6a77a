use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use tracing::{info, warn};

use obs_clock::Clock;
use obs_hub::DataHub;

use crate::TriggerCardWriter;

/// Trigger logger tuning.
#[derive(Debug, Clone)]
pub struct TriggerLogConfig {
    pub dir: PathBuf,
    pub cadence_hz: f64,
    pub flush_every: u32,
}

impl Default for TriggerLogConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs/triggercards"),
            cadence_hz: 1.0,
            flush_every: 10,
        }
    }
}

/// Background emitter: wakes at the configured cadence, reads
/// `DataHub::latest`, appends one card. Skips ticks while the hub is
/// still empty. Write failures are logged and the thread keeps going;
/// the engine is never affected.
pub struct TriggerLogger {
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl TriggerLogger {
    pub fn spawn(
        cfg: TriggerLogConfig,
        run_id: &str,
        hub: Arc<DataHub>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        // Directory problems surface at startup, not on the first tick.
        let mut writer = TriggerCardWriter::new(&cfg.dir, run_id, cfg.flush_every)?;
        let interval = Duration::from_secs_f64(1.0 / cfg.cadence_hz);

        let shutdown = Arc::new(AtomicBool::new(false));
        let thread_shutdown = Arc::clone(&shutdown);

        let handle = thread::Builder::new()
            .name("triggerlog".to_string())
            .spawn(move || {
                let mut next_emit = Instant::now();
                let mut failures = 0u64;
                while !thread_shutdown.load(Ordering::Acquire) {
                    if Instant::now() >= next_emit {
                        next_emit += interval;
                        if let Some(snapshot) = hub.latest() {
                            if let Err(e) = writer.emit(&snapshot, clock.as_ref()) {
                                failures += 1;
                                warn!(error = %e, failures, "trigger card write failed");
                            }
                        }
                    }
                    thread::sleep(Duration::from_millis(10));
                }
                if let Err(e) = writer.flush() {
                    warn!(error = %e, "final trigger log flush failed");
                }
                info!(cards = writer.seq(), "trigger logger stopped");
            })
            .map_err(|e| anyhow!("spawn trigger logger thread: {e}"))?;

        Ok(Self {
            shutdown,
            handle: Some(handle),
        })
    }

    /// Stop the cadence thread, flushing everything buffered.
    pub fn stop(mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TriggerLogger {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
    }
}
