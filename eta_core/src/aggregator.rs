//! Bounded live view, fixation clusters and the save-mode log.
//!
//! The producer calls `on_sample` for every record; display code reads copies
//! through `snapshot`, `drain_live` and `clusters` at its own cadence. All
//! shared state sits behind one mutex held only for the few operations of a
//! single push or copy, so readers never stall the producer for long and never
//! see internal references.

use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::{AggregatorCfg, ScreenSize};
use crate::error::Result;
use crate::persist;
use crate::record::EnrichedGazeRecord;
use crate::stream::GazeFrame;
use crate::util::secs_to_micros;

/// Warn once per this many skipped samples.
const SKIP_WARN_EVERY: u64 = 1000;

/// One point of the live view, in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LivePoint {
    pub timestamp: f64,
    pub x: i32,
    pub y: i32,
}

/// Samples sharing one fixation onset, reduced to their mean pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixationCluster {
    pub onset: f64,
    pub x: f64,
    pub y: f64,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AggregatorStats {
    pub accepted: u64,
    pub skipped: u64,
    pub live: usize,
    pub clusters: usize,
    pub logged: usize,
}

#[derive(Debug)]
struct Cluster {
    onset: f64,
    sum_x: f64,
    sum_y: f64,
    count: u64,
}

#[derive(Debug, Default)]
struct Buffers {
    live: VecDeque<LivePoint>,
    // keyed by onset in microseconds; BTreeMap order is age order
    clusters: BTreeMap<i64, Cluster>,
    log: Vec<EnrichedGazeRecord>,
    since_cleanup: u64,
}

#[derive(Debug)]
struct Shared {
    cfg: AggregatorCfg,
    screen_nans: bool,
    buffers: Mutex<Buffers>,
    stopped: AtomicBool,
    accepted: AtomicU64,
    skipped: AtomicU64,
}

/// Cloneable handle; all clones share the same buffers.
#[derive(Debug, Clone)]
pub struct GazeSampleAggregator {
    shared: Arc<Shared>,
}

impl GazeSampleAggregator {
    pub fn new(cfg: AggregatorCfg, screen_nans: bool) -> Self {
        let cfg = AggregatorCfg {
            live_capacity: cfg.live_capacity.max(1),
            fixation_history: cfg.fixation_history.max(1),
            cleanup_every: cfg.cleanup_every.max(1),
            ..cfg
        };
        let buffers = Buffers {
            live: VecDeque::with_capacity(cfg.live_capacity),
            ..Buffers::default()
        };
        Self {
            shared: Arc::new(Shared {
                cfg,
                screen_nans,
                buffers: Mutex::new(buffers),
                stopped: AtomicBool::new(false),
                accepted: AtomicU64::new(0),
                skipped: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> AggregatorCfg {
        self.shared.cfg
    }

    fn lock(&self) -> MutexGuard<'_, Buffers> {
        // A panicking reader cannot leave the buffers half-updated.
        match self.shared.buffers.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn skip(&self, reason: &str) {
        let n = self.shared.skipped.fetch_add(1, Ordering::Relaxed) + 1;
        if n == 1 || n % SKIP_WARN_EVERY == 0 {
            tracing::warn!(skipped = n, reason, "skipping malformed sample");
        } else {
            tracing::debug!(reason, "skipping malformed sample");
        }
    }

    /// Ingest one record. Returns false if it was skipped or the aggregator is stopped.
    pub fn on_sample(&self, record: &EnrichedGazeRecord) -> bool {
        if self.is_stopped() {
            return false;
        }
        if !record.timestamp.is_finite() {
            self.skip("non-finite timestamp");
            return false;
        }

        let cfg = self.shared.cfg;
        let mut b = self.lock();
        if cfg.save_data {
            b.log.push(*record);
        }
        if let Some([x, y]) = record.display_pixel() {
            if b.live.len() == cfg.live_capacity {
                b.live.pop_front();
            }
            b.live.push_back(LivePoint {
                timestamp: record.timestamp,
                x,
                y,
            });
            if let Some(onset) = record.fixation_onset() {
                let c = b.clusters.entry(secs_to_micros(onset)).or_insert(Cluster {
                    onset,
                    sum_x: 0.0,
                    sum_y: 0.0,
                    count: 0,
                });
                c.sum_x += f64::from(x);
                c.sum_y += f64::from(y);
                c.count += 1;
            }
        }
        b.since_cleanup += 1;
        if b.since_cleanup >= cfg.cleanup_every {
            b.since_cleanup = 0;
            while b.clusters.len() > cfg.fixation_history {
                b.clusters.pop_first();
            }
        }
        drop(b);

        self.shared.accepted.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Ingest one raw stream frame; frames that fail to decode are skipped.
    pub fn on_frame(&self, frame: &[f64]) -> bool {
        if self.is_stopped() {
            return false;
        }
        match GazeFrame::decode(frame).and_then(|f| f.into_record(self.shared.screen_nans)) {
            Ok(record) => self.on_sample(&record),
            Err(e) => {
                self.skip(&e.to_string());
                false
            }
        }
    }

    /// Copy of the live buffer, oldest first.
    pub fn snapshot(&self) -> Vec<LivePoint> {
        self.lock().live.iter().copied().collect()
    }

    /// Take the live buffer, leaving it empty. Returns immediately, possibly with nothing.
    pub fn drain_live(&self) -> Vec<LivePoint> {
        let mut b = self.lock();
        let cap = self.shared.cfg.live_capacity;
        std::mem::replace(&mut b.live, VecDeque::with_capacity(cap)).into()
    }

    /// Copy of the fixation clusters, oldest onset first.
    #[allow(clippy::cast_precision_loss)]
    pub fn clusters(&self) -> Vec<FixationCluster> {
        self.lock()
            .clusters
            .values()
            .map(|c| FixationCluster {
                onset: c.onset,
                x: c.sum_x / c.count as f64,
                y: c.sum_y / c.count as f64,
                count: c.count,
            })
            .collect()
    }

    /// Number of records held for the persisted log.
    pub fn log_len(&self) -> usize {
        self.lock().log.len()
    }

    /// Hand the save-mode log over to the caller.
    pub fn take_log(&self) -> Vec<EnrichedGazeRecord> {
        std::mem::take(&mut self.lock().log)
    }

    /// Write the save-mode log to `path`. The in-memory log is kept so a failed
    /// write can be retried; capture is unaffected either way.
    pub fn flush_log(&self, path: &Path, screen: ScreenSize) -> Result<usize> {
        let records = self.lock().log.clone();
        persist::save_gaze_log(path, screen, &records)?;
        tracing::info!(path = %path.display(), records = records.len(), "gaze log written");
        Ok(records.len())
    }

    pub fn stats(&self) -> AggregatorStats {
        let b = self.lock();
        AggregatorStats {
            accepted: self.shared.accepted.load(Ordering::Relaxed),
            skipped: self.shared.skipped.load(Ordering::Relaxed),
            live: b.live.len(),
            clusters: b.clusters.len(),
            logged: b.log.len(),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.stopped.load(Ordering::Acquire)
    }

    /// Stop ingesting and release the live buffer and clusters. The save-mode
    /// log survives until `take_log`. Returns false if already stopped.
    pub fn stop(&self) -> bool {
        if self.shared.stopped.swap(true, Ordering::AcqRel) {
            return false;
        }
        let mut b = self.lock();
        b.live = VecDeque::new();
        b.clusters.clear();
        b.since_cleanup = 0;
        drop(b);
        tracing::debug!("aggregator stopped");
        true
    }
}
