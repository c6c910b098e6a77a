use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::{FeedError, L1Feed};

/// How long `stop` waits for the feed thread before detaching it.
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Background runner for an [`L1Feed`].
///
/// Owns the adapter on a dedicated named thread: connect happens on the
/// caller's thread (fatal errors abort startup synchronously), polling on
/// the feed thread, disconnect on the way out.
pub struct FeedDriver {
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FeedDriver {
    /// Connect the adapter and start polling it every `poll_interval`.
    pub fn spawn(mut feed: Box<dyn L1Feed>, poll_interval: Duration) -> Result<Self, FeedError> {
        feed.connect()?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let thread_shutdown = Arc::clone(&shutdown);
        let name = feed.name();

        let handle = thread::Builder::new()
            .name(format!("feed-{name}"))
            .spawn(move || {
                while !thread_shutdown.load(Ordering::Acquire) {
                    feed.poll();
                    thread::sleep(poll_interval);
                }
                feed.disconnect();
            })
            .map_err(|e| FeedError::Transport(format!("spawn feed thread: {e}")))?;

        info!(feed = name, "feed driver started");
        Ok(Self {
            shutdown,
            handle: Some(handle),
        })
    }

    /// Request disconnect and wait up to the join timeout. A wedged
    /// adapter is detached rather than blocking process exit.
    pub fn stop(mut self) {
        self.shutdown.store(true, Ordering::Release);

        let Some(handle) = self.handle.take() else {
            return;
        };

        let deadline = Instant::now() + JOIN_TIMEOUT;
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }

        if handle.is_finished() {
            let _ = handle.join();
            info!("feed driver stopped");
        } else {
            warn!("feed thread did not stop within {JOIN_TIMEOUT:?}; detaching");
        }
    }
}

impl Drop for FeedDriver {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
    }
}
