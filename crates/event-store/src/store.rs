//! Append-only ride event store. Append is the only mutating operation and
//! is serialized by the write lock; queries read a point-in-time snapshot.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;
use yatri_core::types::{RideEvent, RideEventDraft, Window};
use yatri_core::{YatriError, YatriResult};

/// In-process append-only log of ride events.
pub struct EventStore {
    events: RwLock<Vec<RideEvent>>,
    next_id: AtomicU64,
    generation: AtomicU64,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            generation: AtomicU64::new(0),
        }
    }

    /// Validate a draft event at the store boundary. Invalid events are
    /// never stored.
    fn validate(draft: &RideEventDraft) -> YatriResult<()> {
        if draft.timestamp.is_none() {
            return Err(YatriError::Validation(
                "ride event 'timestamp' is required".to_string(),
            ));
        }
        if !draft.fare.is_finite() {
            return Err(YatriError::Validation(
                "ride event 'fare' must be a finite number".to_string(),
            ));
        }
        if draft.fare < 0.0 {
            return Err(YatriError::Validation(
                "ride event 'fare' must be non-negative".to_string(),
            ));
        }
        if draft.zone.trim().is_empty() {
            return Err(YatriError::Validation(
                "ride event 'zone' must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Append a validated event and return its assigned id.
    pub fn append(&self, draft: RideEventDraft) -> YatriResult<u64> {
        if let Err(e) = Self::validate(&draft) {
            metrics::counter!("store.validation_errors").increment(1);
            return Err(e);
        }

        // Checked by validate()
        let timestamp = draft
            .timestamp
            .ok_or_else(|| YatriError::Store("timestamp vanished after validation".to_string()))?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let event = RideEvent {
            id,
            timestamp,
            zone: draft.zone,
            fare: draft.fare,
            outcome: draft.outcome,
        };

        self.events.write().push(event);
        self.generation.fetch_add(1, Ordering::SeqCst);
        metrics::counter!("store.events_appended").increment(1);

        debug!(id, "Ride event appended");
        Ok(id)
    }

    /// Snapshot of all events whose timestamp falls in `[start, end)`.
    /// The returned buffer is finite and can be re-iterated freely.
    pub fn query(&self, window: &Window) -> YatriResult<Vec<RideEvent>> {
        let events = self.events.read();
        Ok(events
            .iter()
            .filter(|e| window.contains(e.timestamp))
            .cloned()
            .collect())
    }

    /// Number of successful appends so far. Consumers compare generations
    /// to detect that cached aggregates have gone stale.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new()
    }
}
