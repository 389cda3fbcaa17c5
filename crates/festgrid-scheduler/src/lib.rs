//! festgrid-scheduler — sub-event round scheduling and event placement.
//!
//! Assigns the rounds of an event's sub-events to time slots so that no
//! student has two rounds at once and no slot is used twice, and places
//! whole events onto a shared calendar. The pieces:
//!
//! - Generates candidate slots from an event's dates and daily hours
//! - Ranks sub-events by priority and rounds by their position
//! - Assigns rounds greedily, flagging rounds that only got a fallback slot
//! - Persists runs, edits and registrations through the state store
//!
//! # Architecture
//!
//! ```text
//! Scheduler (per-event mutex)
//!   ├── StateStore (events, registrations, schedules)
//!   ├── Roster (students per sub-event)
//!   ├── assign()
//!   │     ├── slots::generate_time_slots
//!   │     ├── ranker (sub-events, rounds)
//!   │     └── conflict (used slots, student clashes)
//!   └── optimize_event_scheduling (whole events)
//! ```

pub mod assigner;
pub mod auth;
pub mod calendar;
pub mod conflict;
pub mod error;
pub mod ranker;
pub mod report;
pub mod roster;
pub mod scheduler;
pub mod slots;
pub mod whole_event;

pub use assigner::{Assignment, DegradedRound, assign};
pub use auth::{AllowAll, Authorizer, OrganizerOnly};
pub use calendar::{CalendarFilter, filter_calendar};
pub use error::{SchedulerError, SchedulerResult};
pub use report::{
    EventScheduleView, EventUpdate, NamedSchedule, RegisteredEvent, ScheduleEdit, ScheduleReport,
    StudentRegistrations,
};
pub use roster::Roster;
pub use scheduler::Scheduler;
pub use slots::{SlotPolicy, generate_time_slots};
pub use whole_event::optimize_event_scheduling;
