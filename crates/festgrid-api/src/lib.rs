//! festgrid-api — REST API for festgrid.
//!
//! Provides axum route handlers for events, registrations and sub-event
//! schedules. Every response uses the `{success, data, error}` envelope.
//! Requests that modify an event identify the caller with `x-user-id`.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/v1/events` | List all events |
//! | POST | `/api/v1/events` | Create an event |
//! | GET | `/api/v1/events/mine` | Events organized by the caller |
//! | GET | `/api/v1/events/{id}` | Get event details |
//! | PATCH | `/api/v1/events/{id}` | Update event details |
//! | DELETE | `/api/v1/events/{id}` | Delete an event with its schedules and registrations |
//! | POST | `/api/v1/events/{id}/sub-events/{sub_id}/rounds` | Add a round to a sub-event |
//! | POST | `/api/v1/events/{id}/registrations` | Register a student |
//! | DELETE | `/api/v1/events/{id}/registrations/{reg_id}` | Cancel a registration |
//! | GET | `/api/v1/registrations` | The caller's registrations, upcoming and past |
//! | POST | `/api/v1/events/{id}/schedule` | Schedule sub-event rounds (`?dailyHours=`, `?strict=true`) |
//! | GET | `/api/v1/events/{id}/schedule` | Get the event's schedules |
//! | PUT | `/api/v1/events/{id}/reschedule` | Move an event to new dates |
//! | POST | `/api/v1/events/optimize` | Place upcoming events on the calendar |
//! | PATCH | `/api/v1/schedules/{id}` | Edit one sub-event schedule |
//! | GET | `/api/v1/calendar` | Upcoming and ongoing events |

pub mod error;
pub mod handlers;

use axum::Router;
use axum::routing::{delete, get, patch, post, put};
use festgrid_scheduler::Scheduler;

pub use error::ApiError;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub scheduler: Scheduler,
}

/// Build the complete API router.
pub fn build_router(scheduler: Scheduler) -> Router {
    let api_state = ApiState { scheduler };

    let api_routes = Router::new()
        .route("/events", get(handlers::list_events).post(handlers::create_event))
        .route("/events/optimize", post(handlers::optimize_events))
        .route("/events/mine", get(handlers::my_events))
        .route(
            "/events/{id}",
            get(handlers::get_event)
                .patch(handlers::update_event)
                .delete(handlers::delete_event),
        )
        .route(
            "/events/{id}/sub-events/{sub_id}/rounds",
            post(handlers::create_round),
        )
        .route("/events/{id}/registrations", post(handlers::register_student))
        .route(
            "/events/{id}/registrations/{reg_id}",
            delete(handlers::cancel_registration),
        )
        .route("/registrations", get(handlers::my_registrations))
        .route(
            "/events/{id}/schedule",
            get(handlers::get_schedule).post(handlers::schedule_sub_events),
        )
        .route("/events/{id}/reschedule", put(handlers::reschedule_event))
        .route("/schedules/{id}", patch(handlers::edit_schedule))
        .route("/calendar", get(handlers::calendar))
        .with_state(api_state);

    Router::new().nest("/api/v1", api_routes)
}
