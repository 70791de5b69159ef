//! Shared domain types: ride events, aggregation windows, and the summary
//! object consumed by the dashboard.

use crate::error::{YatriError, YatriResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Terminal outcome of a ride.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideOutcome {
    Completed,
    Cancelled,
}

/// A ride event as submitted for ingestion, before the store has validated
/// it and assigned an id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RideEventDraft {
    pub timestamp: Option<DateTime<Utc>>,
    pub zone: String,
    pub fare: f64,
    pub outcome: RideOutcome,
}

/// A stored ride event. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RideEvent {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub zone: String,
    pub fare: f64,
    pub outcome: RideOutcome,
}

impl RideEvent {
    pub fn is_completed(&self) -> bool {
        self.outcome == RideOutcome::Completed
    }

    /// Hour-of-day of the ride in UTC, in [0, 23].
    pub fn hour_of_day(&self) -> u8 {
        use chrono::Timelike;
        self.timestamp.hour() as u8
    }
}

/// A half-open aggregation interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    /// Construct a window, rejecting `end` before `start`. An empty window
    /// (`start == end`) is valid and aggregates to the zero summary.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> YatriResult<Self> {
        if end < start {
            return Err(YatriError::NotFound(format!(
                "window end {} is before start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// Per-hour fold accumulator used while building a summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HourBucket {
    pub hour: u8,
    pub rides: u64,
    pub cancellations: u64,
}

impl HourBucket {
    /// Cancellation rate for this hour as a percentage in [0, 100].
    pub fn cancellation_rate(&self) -> f64 {
        if self.rides == 0 {
            0.0
        } else {
            self.cancellations as f64 / self.rides as f64 * 100.0
        }
    }
}

/// One entry of the peak-hour ranking (ride count descending).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakHour {
    pub hour: u8,
    pub rides: u64,
}

/// One entry of the zone revenue ranking (revenue descending).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneRevenue {
    pub zone: String,
    pub revenue: f64,
}

/// Cancellation rate for one hour of the day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HourlyCancellation {
    pub hour: u8,
    pub rate: f64,
}

/// An immutable summary snapshot over one window. Field names on the wire
/// match what the dashboard consumes (`peakHours`, `zoneRevenue`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Monotonically increasing per recomputation.
    pub version: u64,
    pub total_rides: u64,
    /// Completed / total, as a percentage in [0, 100].
    pub completion_rate: f64,
    /// Sum of fares of completed rides only.
    pub total_revenue: f64,
    pub peak_hours: Vec<PeakHour>,
    pub zone_revenue: Vec<ZoneRevenue>,
    pub cancellation_by_hour: Vec<HourlyCancellation>,
    pub generated_at: DateTime<Utc>,
}

impl Summary {
    /// The all-zero summary for a window with no events.
    pub fn empty(version: u64) -> Self {
        Self {
            version,
            total_rides: 0,
            completion_rate: 0.0,
            total_revenue: 0.0,
            peak_hours: Vec::new(),
            zone_revenue: Vec::new(),
            cancellation_by_hour: Vec::new(),
            generated_at: Utc::now(),
        }
    }

    /// True when the metric values (everything except version and
    /// generation timestamp) are identical.
    pub fn same_metrics(&self, other: &Summary) -> bool {
        self.total_rides == other.total_rides
            && self.completion_rate == other.completion_rate
            && self.total_revenue == other.total_revenue
            && self.peak_hours == other.peak_hours
            && self.zone_revenue == other.zone_revenue
            && self.cancellation_by_hour == other.cancellation_by_hour
    }
}
