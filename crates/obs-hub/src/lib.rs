//! obs-hub
//!
//! Single-slot atomic publisher of the latest snapshot. One writer (the
//! engine), any number of readers (UI, trigger logger, tests).
//!
//! The slot is an `ArcSwapOption<Snapshot>`: publication is a pointer
//! swap, so a reader either sees the previous snapshot or the new one in
//! its entirety, never a mix of fields from two publications. Reads take
//! no locks and allocate nothing beyond the refcount bump.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use obs_schemas::Snapshot;

/// Atomic holder of the most recent [`Snapshot`].
#[derive(Default)]
pub struct DataHub {
    slot: ArcSwapOption<Snapshot>,
}

impl DataHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the slot (engine only). Subsequent `latest()` calls return
    /// the new snapshot.
    pub fn publish(&self, snapshot: Snapshot) {
        self.slot.store(Some(Arc::new(snapshot)));
    }

    /// The most recent published snapshot, or `None` before the first
    /// publication. The returned value is immutable; readers may keep the
    /// `Arc` as long as they like.
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.slot.load_full()
    }
}
