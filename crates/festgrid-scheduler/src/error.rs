//! Scheduler error types.

use thiserror::Error;

/// Errors that can occur during scheduling operations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("event not found: {0}")]
    EventNotFound(String),

    #[error("sub-event not found: {0}")]
    SubEventNotFound(String),

    #[error("schedule not found: {0}")]
    ScheduleNotFound(String),

    #[error("registration not found: {0}")]
    RegistrationNotFound(String),

    #[error("event already exists: {0}")]
    EventExists(String),

    #[error("caller {caller} may not manage event {event_id}")]
    Unauthorized { caller: String, event_id: String },

    #[error("invalid schedule config: {0}")]
    InvalidScheduleConfig(String),

    #[error("{count} round(s) only received fallback slots")]
    SchedulingDegraded { count: usize },

    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("student {student_id} already registered for event {event_id}")]
    AlreadyRegistered { student_id: String, event_id: String },

    #[error("state store error: {0}")]
    State(#[from] festgrid_state::StateError),
}

impl SchedulerError {
    /// True for the not-found family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::EventNotFound(_)
                | Self::SubEventNotFound(_)
                | Self::ScheduleNotFound(_)
                | Self::RegistrationNotFound(_)
        )
    }
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
