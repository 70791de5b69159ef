//! Per-window summary cache with single-flight recomputation.
//!
//! A cached summary goes stale when a new event lands in the store
//! (generation mismatch) or when it outlives the TTL. At most one
//! recomputation runs per window key: the in-flight computation is part of
//! the slot state, so every caller — including ones that arrive after the
//! caller that started it has been abandoned — waits on the same result.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, warn};
use yatri_aggregator::SummarySource;
use yatri_core::config::CacheConfig;
use yatri_core::types::{Summary, Window};
use yatri_core::{YatriError, YatriResult};

/// Outcome published by a finished recompute. Errors cross task boundaries
/// as messages so every waiter can observe them.
type ComputeOutcome = Option<Result<Arc<Summary>, String>>;

struct SlotState {
    summary: Option<Arc<Summary>>,
    source_generation: u64,
    computed_at: Option<Instant>,
    /// Receiver for the recompute currently running for this window, if
    /// any. Set and cleared by the compute task itself, never by callers.
    in_flight: Option<watch::Receiver<ComputeOutcome>>,
}

struct Slot {
    state: Mutex<SlotState>,
}

impl Slot {
    fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                summary: None,
                source_generation: 0,
                computed_at: None,
                in_flight: None,
            }),
        }
    }
}

/// Concurrent cache of summary snapshots, keyed by window.
pub struct SummaryCache<S: SummarySource> {
    source: Arc<S>,
    slots: DashMap<Window, Arc<Slot>>,
    ttl: Duration,
    idle_evict: Duration,
}

impl<S: SummarySource> SummaryCache<S> {
    pub fn new(source: Arc<S>, config: &CacheConfig) -> Self {
        Self::with_ttl(
            source,
            Duration::from_secs(config.summary_ttl_secs),
            Duration::from_secs(config.idle_evict_secs),
        )
    }

    pub fn with_ttl(source: Arc<S>, ttl: Duration, idle_evict: Duration) -> Self {
        Self {
            source,
            slots: DashMap::new(),
            ttl,
            idle_evict,
        }
    }

    /// Get the summary for `window`, recomputing if the cached snapshot is
    /// missing or stale. Recomputation failures fall back to the last
    /// known-good snapshot when one exists.
    pub async fn get(&self, window: Window) -> YatriResult<Arc<Summary>> {
        let slot = self
            .slots
            .entry(window)
            .or_insert_with(|| Arc::new(Slot::new()))
            .clone();

        if let Some(summary) = self.fresh_snapshot(&slot) {
            metrics::counter!("cache.hit").increment(1);
            return Ok(summary);
        }
        metrics::counter!("cache.miss").increment(1);

        let rx = {
            let mut state = slot.state.lock();

            // Re-check under the lock: a recompute may have landed between
            // the fast path and here.
            if let Some(summary) = self.fresh_state(&state) {
                return Ok(summary);
            }

            match &state.in_flight {
                // Join the recompute already running for this window.
                Some(rx) => {
                    metrics::counter!("cache.coalesced").increment(1);
                    rx.clone()
                }
                None => {
                    let rx = self.spawn_recompute(&slot, window);
                    state.in_flight = Some(rx.clone());
                    rx
                }
            }
        };

        self.await_outcome(&slot, window, rx).await
    }

    /// Start the recompute on the blocking pool. The task owns the slot
    /// write and the in-flight marker, so the computation and its cache
    /// update complete even if every waiting caller is abandoned.
    fn spawn_recompute(&self, slot: &Arc<Slot>, window: Window) -> watch::Receiver<ComputeOutcome> {
        let (tx, rx) = watch::channel(None);
        let source = self.source.clone();
        let task_slot = slot.clone();

        tokio::task::spawn_blocking(move || {
            let generation = source.generation();
            let result = source.compute(&window).map(Arc::new);

            let outcome = match &result {
                Ok(summary) => Ok(summary.clone()),
                Err(e) => Err(e.to_string()),
            };

            {
                let mut state = task_slot.state.lock();
                if let Ok(summary) = &result {
                    state.summary = Some(summary.clone());
                    state.source_generation = generation;
                    state.computed_at = Some(Instant::now());
                    debug!(%window, version = summary.version, "Summary recomputed");
                }
                state.in_flight = None;
            }

            let _ = tx.send(Some(outcome));
        });

        rx
    }

    /// Wait for a recompute to publish and translate its outcome.
    async fn await_outcome(
        &self,
        slot: &Slot,
        window: Window,
        mut rx: watch::Receiver<ComputeOutcome>,
    ) -> YatriResult<Arc<Summary>> {
        while rx.borrow().is_none() {
            // Sender dropped without publishing means the task panicked.
            if rx.changed().await.is_err() {
                break;
            }
        }
        let outcome = rx.borrow().clone();

        match outcome {
            Some(Ok(summary)) => Ok(summary),
            Some(Err(message)) => {
                let stale = slot.state.lock().summary.clone();
                match stale {
                    Some(summary) => {
                        warn!(%window, error = %message, "Recompute failed, serving stale summary");
                        metrics::counter!("cache.stale_served").increment(1);
                        Ok(summary)
                    }
                    None => Err(YatriError::Aggregation(format!(
                        "summary recompute failed: {message}"
                    ))),
                }
            }
            None => Err(YatriError::Aggregation(
                "summary recompute task failed".to_string(),
            )),
        }
    }

    fn fresh_state(&self, state: &SlotState) -> Option<Arc<Summary>> {
        let summary = state.summary.clone()?;
        let computed_at = state.computed_at?;
        if state.source_generation != self.source.generation() {
            return None;
        }
        if computed_at.elapsed() > self.ttl {
            return None;
        }
        Some(summary)
    }

    fn fresh_snapshot(&self, slot: &Slot) -> Option<Arc<Summary>> {
        self.fresh_state(&slot.state.lock())
    }

    /// Drop slots that have not been recomputed for a while. Call this
    /// periodically from a background task.
    pub fn evict_expired(&self) -> usize {
        let before = self.slots.len();
        self.slots.retain(|_, slot| {
            let state = slot.state.lock();
            if state.in_flight.is_some() {
                return true;
            }
            match state.computed_at {
                Some(t) => t.elapsed() <= self.idle_evict,
                // Never computed yet; leave it for the first caller.
                None => true,
            }
        });
        before - self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
