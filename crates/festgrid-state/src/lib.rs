//! festgrid-state — embedded state store for festgrid.
//!
//! Backed by [redb](https://docs.rs/redb), provides persistent and in-memory
//! storage for events, registrations, and sub-event schedules.
//!
//! # Architecture
//!
//! All domain types are JSON-serialized into redb's `&[u8]` value columns.
//! Child records use composite keys (`{event_id}:{sub_event_id}`,
//! `{event_id}:{registration_id}`) so everything belonging to one event can
//! be found with one key scan and removed together when the event goes.
//! Event and sub-event ids never contain the `:` separator.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::StateStore;
pub use types::*;
