//! Holds the current [`Snapshot`] and replaces it atomically.
//!
//! Readers call [`SnapshotCache::load`] and get an `Arc<Snapshot>` that stays
//! valid for as long as they hold it, even if a rebuild lands in the
//! meantime. A rebuild constructs a complete new snapshot before swapping it
//! in, so no reader ever sees posts from one build alongside indices from
//! another. If a rebuild fails, the previous snapshot stays current.
//!
//! ```text
//!   reader ──load()──┐
//!   reader ──load()──┼──▶ ArcSwap<Snapshot> ◀──store()── refresh()
//!   reader ──load()──┘      (lock-free)           (serialized by `rebuild`)
//! ```

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::build::{Error, Indexer, Snapshot};
use crate::config::Config;

pub struct SnapshotCache {
    indexer: Indexer,
    current: ArcSwap<Snapshot>,
    rebuild: Mutex<()>,
    refresh_interval: Option<Duration>,
}

impl SnapshotCache {
    /// Builds the initial snapshot. Fails if that first build fails, since
    /// there is nothing to fall back on.
    pub fn new(indexer: Indexer) -> Result<SnapshotCache, Error> {
        let snapshot = indexer.build()?;
        Ok(SnapshotCache {
            indexer,
            current: ArcSwap::from_pointee(snapshot),
            rebuild: Mutex::new(()),
            refresh_interval: None,
        })
    }

    /// Builds the initial snapshot for the project described by `config`,
    /// adopting its [`Config::refresh_interval`] for
    /// [`SnapshotCache::refresh_if_due`].
    pub fn from_config(config: &Config) -> Result<SnapshotCache, Error> {
        Ok(SnapshotCache::new(Indexer::from_config(config))?
            .with_refresh_interval(config.refresh_interval))
    }

    pub fn with_refresh_interval(mut self, interval: Option<Duration>) -> SnapshotCache {
        self.refresh_interval = interval;
        self
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        self.refresh_interval
    }

    /// Returns the current snapshot. Wait-free.
    #[inline]
    pub fn load(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Rebuilds from the content directory and swaps in the result. On error
    /// the previous snapshot remains current and the error is returned.
    pub fn refresh(&self) -> Result<Arc<Snapshot>, Error> {
        let _guard = self.rebuild.lock();
        self.rebuild_locked()
    }

    /// Rebuilds only if the current snapshot is older than `max_age`.
    /// Returns the snapshot that is current afterwards.
    ///
    /// If another thread is already rebuilding, waits for it and then
    /// re-checks, so a burst of callers triggers one rebuild, not many.
    pub fn refresh_if_stale(&self, max_age: Duration) -> Result<Arc<Snapshot>, Error> {
        let snapshot = self.load();
        if snapshot.age() < max_age {
            return Ok(snapshot);
        }
        let _guard = self.rebuild.lock();
        let snapshot = self.load();
        if snapshot.age() < max_age {
            return Ok(snapshot);
        }
        self.rebuild_locked()
    }

    /// Applies the configured refresh interval: rebuilds if the current
    /// snapshot is older than it. Without an interval, snapshots only change
    /// on an explicit [`SnapshotCache::refresh`].
    pub fn refresh_if_due(&self) -> Result<Arc<Snapshot>, Error> {
        match self.refresh_interval {
            Some(interval) => self.refresh_if_stale(interval),
            None => Ok(self.load()),
        }
    }

    fn rebuild_locked(&self) -> Result<Arc<Snapshot>, Error> {
        match self.indexer.build() {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.current.store(Arc::clone(&snapshot));
                info!(posts = snapshot.posts.len(), "swapped in new snapshot");
                Ok(snapshot)
            }
            Err(err) => {
                error!(error = %err, "rebuild failed; keeping previous snapshot");
                Err(err)
            }
        }
    }
}
