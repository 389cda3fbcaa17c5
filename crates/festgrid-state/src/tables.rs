//! redb table definitions for the festgrid state store.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized domain types).

use redb::TableDefinition;

/// Shape shared by every table: string key, JSON bytes value.
pub type JsonTable = TableDefinition<'static, &'static str, &'static [u8]>;

/// Events keyed by `{event_id}`.
pub const EVENTS: JsonTable = TableDefinition::new("events");

/// Registrations keyed by `{event_id}:{registration_id}`.
pub const REGISTRATIONS: JsonTable = TableDefinition::new("registrations");

/// Sub-event schedules keyed by `{event_id}:{sub_event_id}`.
pub const SCHEDULES: JsonTable = TableDefinition::new("schedules");
