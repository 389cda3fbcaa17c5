//! Ownership checks for scheduling operations.
//!
//! Identity is established outside this crate. The scheduler only asks an
//! [`Authorizer`] whether an already-identified caller may manage an event.

use festgrid_state::Event;

pub trait Authorizer: Send + Sync {
    fn can_manage(&self, caller: &str, event: &Event) -> bool;
}

/// Only the event's organizer may manage it.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrganizerOnly;

impl Authorizer for OrganizerOnly {
    fn can_manage(&self, caller: &str, event: &Event) -> bool {
        !caller.is_empty() && caller == event.organizer
    }
}

/// Allows every caller. For trusted internal callers and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn can_manage(&self, _caller: &str, _event: &Event) -> bool {
        true
    }
}
