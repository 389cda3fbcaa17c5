//! Event calendar listing.

use chrono::{DateTime, Utc};
use festgrid_state::{Event, EventStatus};
use serde::Deserialize;

/// Optional filters for the calendar listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CalendarFilter {
    /// Earliest start date (inclusive).
    pub from: Option<DateTime<Utc>>,
    /// Latest start date (inclusive).
    pub to: Option<DateTime<Utc>>,
    pub department: Option<String>,
    pub course: Option<String>,
}

impl CalendarFilter {
    pub fn matches(&self, event: &Event) -> bool {
        let start = event.conducted_dates.start;
        let audience = &event.targeted_audience;
        matches!(event.status, EventStatus::Upcoming | EventStatus::Ongoing)
            && self.from.is_none_or(|from| start >= from)
            && self.to.is_none_or(|to| start <= to)
            && self
                .department
                .as_ref()
                .is_none_or(|d| audience.departments.contains(d))
            && self
                .course
                .as_ref()
                .is_none_or(|c| audience.courses.contains(c))
    }
}

/// Upcoming and ongoing events matching `filter`, earliest first.
pub fn filter_calendar(events: Vec<Event>, filter: &CalendarFilter) -> Vec<Event> {
    let mut listed: Vec<Event> = events.into_iter().filter(|e| filter.matches(e)).collect();
    listed.sort_by(|a, b| {
        a.conducted_dates
            .start
            .cmp(&b.conducted_dates.start)
            .then_with(|| a.id.cmp(&b.id))
    });
    listed
}
