//! Shared value types used across festgrid crates.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when constructing interval values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    #[error("interval end {end} must be after start {start}")]
    Inverted {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// A fixed interval `[start, end)` on the UTC timeline.
///
/// Slots carry no identity: two slots with the same bounds are the same slot.
/// Ordering is by `start`, then `end`, which matches chronological search order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeSlot {
    /// Build a slot, rejecting empty or inverted intervals.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, SlotError> {
        if end <= start {
            return Err(SlotError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// Build a slot of `width` beginning at `start`.
    ///
    /// `width` must be positive; callers pass the configured slot width.
    pub fn starting_at(start: DateTime<Utc>, width: TimeDelta) -> Self {
        Self {
            start,
            end: start + width,
        }
    }

    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// Strict open-interval overlap. Slots that only touch do not overlap.
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn is_valid(&self) -> bool {
        self.end > self.start
    }
}

/// The half-open date range an event is conducted over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, SlotError> {
        if end <= start {
            return Err(SlotError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn is_valid(&self) -> bool {
        self.end > self.start
    }

    /// Number of calendar days spanned, rounded up, never less than one.
    pub fn span_days(&self) -> i64 {
        const DAY_SECS: i64 = 86_400;
        let secs = (self.end - self.start).num_seconds();
        ((secs + DAY_SECS - 1) / DAY_SECS).max(1)
    }

    /// The whole range as a single slot.
    pub fn as_slot(&self) -> TimeSlot {
        TimeSlot {
            start: self.start,
            end: self.end,
        }
    }
}
