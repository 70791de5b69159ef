//! Windowed summary computation — folds ride events into hour and zone
//! buckets and produces an ordered, immutable summary snapshot.

use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;
use yatri_core::types::{
    HourBucket, HourlyCancellation, PeakHour, RideOutcome, Summary, Window, ZoneRevenue,
};
use yatri_core::YatriResult;
use yatri_store::EventStore;

/// Anything that can produce a summary for a window. The summary cache is
/// generic over this so failure modes can be injected in tests.
pub trait SummarySource: Send + Sync + 'static {
    /// Current generation of the underlying event set. A change means any
    /// previously computed summary is stale.
    fn generation(&self) -> u64;

    fn compute(&self, window: &Window) -> YatriResult<Summary>;
}

/// Pure read-and-fold aggregation over the event store.
pub struct Aggregator {
    store: Arc<EventStore>,
    version: AtomicU64,
}

impl Aggregator {
    pub fn new(store: Arc<EventStore>) -> Self {
        Self {
            store,
            version: AtomicU64::new(0),
        }
    }

    /// Compute the summary for `window`. An empty window yields the
    /// all-zero summary, never an error.
    pub fn compute_summary(&self, window: &Window) -> YatriResult<Summary> {
        let events = self.store.query(window)?;
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;

        if events.is_empty() {
            return Ok(Summary::empty(version));
        }

        let mut hours: HashMap<u8, HourBucket> = HashMap::new();
        let mut zones: HashMap<String, f64> = HashMap::new();
        let mut completed: u64 = 0;
        let mut total_revenue: f64 = 0.0;

        for event in &events {
            let bucket = hours.entry(event.hour_of_day()).or_insert(HourBucket {
                hour: event.hour_of_day(),
                rides: 0,
                cancellations: 0,
            });
            bucket.rides += 1;

            match event.outcome {
                RideOutcome::Completed => {
                    completed += 1;
                    total_revenue += event.fare;
                    *zones.entry(event.zone.clone()).or_insert(0.0) += event.fare;
                }
                RideOutcome::Cancelled => {
                    bucket.cancellations += 1;
                }
            }
        }

        let total_rides = events.len() as u64;
        let completion_rate = completed as f64 / total_rides as f64 * 100.0;

        // Peak hours: ride count descending, earlier hour wins ties.
        let mut peak_hours: Vec<PeakHour> = hours
            .values()
            .map(|b| PeakHour {
                hour: b.hour,
                rides: b.rides,
            })
            .collect();
        peak_hours.sort_by(|a, b| b.rides.cmp(&a.rides).then_with(|| a.hour.cmp(&b.hour)));

        // Zone revenue: descending, lexicographic zone name on ties.
        let mut zone_revenue: Vec<ZoneRevenue> = zones
            .into_iter()
            .map(|(zone, revenue)| ZoneRevenue { zone, revenue })
            .collect();
        zone_revenue.sort_by(|a, b| {
            b.revenue
                .partial_cmp(&a.revenue)
                .unwrap_or(CmpOrdering::Equal)
                .then_with(|| a.zone.cmp(&b.zone))
        });

        // Cancellation rates: every hour that saw a ride, hour ascending.
        let mut cancellation_by_hour: Vec<HourlyCancellation> = hours
            .values()
            .map(|b| HourlyCancellation {
                hour: b.hour,
                rate: b.cancellation_rate(),
            })
            .collect();
        cancellation_by_hour.sort_by_key(|c| c.hour);

        metrics::counter!("aggregator.summaries_computed").increment(1);
        debug!(%window, total_rides, version, "Summary computed");

        Ok(Summary {
            version,
            total_rides,
            completion_rate,
            total_revenue,
            peak_hours,
            zone_revenue,
            cancellation_by_hour,
            generated_at: chrono::Utc::now(),
        })
    }
}

impl SummarySource for Aggregator {
    fn generation(&self) -> u64 {
        self.store.generation()
    }

    fn compute(&self, window: &Window) -> YatriResult<Summary> {
        self.compute_summary(window)
    }
}
