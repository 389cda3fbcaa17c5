//! Identifier generation for stored records.

/// Generate a fresh opaque record id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Return `id` unchanged, or a fresh id when it is blank.
pub fn or_new_id(id: &str) -> String {
    if id.trim().is_empty() {
        new_id()
    } else {
        id.to_string()
    }
}
