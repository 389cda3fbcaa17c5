//! HTTP error mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use festgrid_scheduler::SchedulerError;
use tracing::error;

use crate::handlers::ApiResponse;

/// Error returned by every handler; renders as the standard envelope.
#[derive(Debug)]
pub enum ApiError {
    /// No `x-user-id` header on a request that needs a caller.
    MissingCaller,
    Scheduler(SchedulerError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingCaller => StatusCode::UNAUTHORIZED,
            Self::Scheduler(e) => match e {
                _ if e.is_not_found() => StatusCode::NOT_FOUND,
                SchedulerError::Unauthorized { .. } => StatusCode::FORBIDDEN,
                SchedulerError::InvalidScheduleConfig(_) => StatusCode::BAD_REQUEST,
                SchedulerError::SchedulingDegraded { .. }
                | SchedulerError::EventExists(_)
                | SchedulerError::CapacityExceeded(_)
                | SchedulerError::AlreadyRegistered { .. } => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn message(&self) -> String {
        match self {
            Self::MissingCaller => "missing x-user-id header".to_string(),
            Self::Scheduler(e) => e.to_string(),
        }
    }
}

impl From<SchedulerError> for ApiError {
    fn from(err: SchedulerError) -> Self {
        Self::Scheduler(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        if status.is_server_error() {
            error!(%message, "request failed");
        }
        (
            status,
            Json(ApiResponse::<()> {
                success: false,
                data: None,
                error: Some(message),
            }),
        )
            .into_response()
    }
}
