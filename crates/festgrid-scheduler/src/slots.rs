//! Candidate slot generation.
//!
//! Each scheduling day opens at a fixed wall-clock time and offers
//! `daily_hours` of working time, cut into back-to-back slots of one fixed
//! width. A slot that would run past the day's cutoff is dropped and packing
//! resumes the next calendar day. Arithmetic is done in whole minutes so
//! fractional hour budgets never accumulate rounding drift.

use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use fest_core::{DateRange, SchedulerConfig, TimeSlot};
use tracing::debug;

use crate::error::{SchedulerError, SchedulerResult};

/// Hours in a day; a larger budget would let one day run into the next.
const MAX_DAILY_HOURS: f64 = 24.0;

/// Longest run of scheduling days one request may generate slots for.
pub const MAX_SCHEDULING_DAYS: i64 = 366;

/// Fixed parameters of slot generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotPolicy {
    pub day_start: NaiveTime,
    pub slot_width: TimeDelta,
}

impl Default for SlotPolicy {
    fn default() -> Self {
        Self::from(&SchedulerConfig::default())
    }
}

impl From<&SchedulerConfig> for SlotPolicy {
    fn from(config: &SchedulerConfig) -> Self {
        Self {
            day_start: config.day_start,
            slot_width: config.slot_width,
        }
    }
}

impl SlotPolicy {
    pub fn slot_hours(&self) -> f64 {
        self.slot_width.num_minutes() as f64 / 60.0
    }
}

/// Reject daily budgets that cannot produce a terminating, non-overlapping day.
pub fn validate_daily_hours(daily_hours: f64) -> SchedulerResult<()> {
    if !daily_hours.is_finite() || daily_hours <= 0.0 {
        return Err(SchedulerError::InvalidScheduleConfig(format!(
            "daily hours must be positive, got {daily_hours}"
        )));
    }
    if daily_hours > MAX_DAILY_HOURS {
        return Err(SchedulerError::InvalidScheduleConfig(format!(
            "daily hours must not exceed {MAX_DAILY_HOURS}, got {daily_hours}"
        )));
    }
    Ok(())
}

/// Total working hours available over an event's span.
pub fn total_hours(dates: &DateRange, daily_hours: f64) -> f64 {
    dates.span_days() as f64 * daily_hours
}

/// Produce the chronological candidate slots for `total_hours` of work.
///
/// Day one is the calendar day of `start_date`. Every day contributes
/// `floor(daily_hours / slot width)` slots (fewer on the last day if the total
/// runs out) starting at the policy's day start.
pub fn generate_time_slots(
    start_date: DateTime<Utc>,
    total_hours: f64,
    daily_hours: f64,
    policy: &SlotPolicy,
) -> SchedulerResult<Vec<TimeSlot>> {
    validate_daily_hours(daily_hours)?;
    if !total_hours.is_finite() || total_hours < 0.0 {
        return Err(SchedulerError::InvalidScheduleConfig(format!(
            "total hours must be non-negative, got {total_hours}"
        )));
    }
    let slot_minutes = policy.slot_width.num_minutes();
    if slot_minutes <= 0 {
        return Err(SchedulerError::InvalidScheduleConfig(
            "slot width must be positive".to_string(),
        ));
    }

    let daily_minutes = to_minutes(daily_hours);
    if daily_minutes < slot_minutes {
        debug!(daily_hours, slot_minutes, "daily hours shorter than one slot, no slots");
        return Ok(Vec::new());
    }
    let mut remaining = to_minutes(total_hours);
    let days_needed = remaining / daily_minutes + i64::from(remaining % daily_minutes != 0);
    if days_needed > MAX_SCHEDULING_DAYS {
        return Err(SchedulerError::InvalidScheduleConfig(format!(
            "{days_needed} scheduling days requested, at most {MAX_SCHEDULING_DAYS} allowed"
        )));
    }
    let first_open = start_date
        .date_naive()
        .and_time(policy.day_start)
        .and_utc();

    let mut slots = Vec::new();
    let mut day = 0;
    while remaining > 0 {
        let open = first_open + TimeDelta::days(day);
        let budget = remaining.min(daily_minutes);
        let fit = budget / slot_minutes;
        for k in 0..fit {
            slots.push(TimeSlot::starting_at(
                open + TimeDelta::minutes(k * slot_minutes),
                policy.slot_width,
            ));
        }
        remaining -= daily_minutes;
        day += 1;
    }

    debug!(
        %start_date,
        total_hours,
        daily_hours,
        days = day,
        slots = slots.len(),
        "time slots generated"
    );
    Ok(slots)
}

/// Slots for an event's whole span at the given daily budget.
pub fn slots_for_event(
    dates: &DateRange,
    daily_hours: f64,
    policy: &SlotPolicy,
) -> SchedulerResult<Vec<TimeSlot>> {
    validate_daily_hours(daily_hours)?;
    generate_time_slots(dates.start, total_hours(dates, daily_hours), daily_hours, policy)
}

fn to_minutes(hours: f64) -> i64 {
    (hours * 60.0).round() as i64
}
