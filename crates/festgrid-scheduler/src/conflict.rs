//! Clash and reuse detection.
//!
//! The checks here are pure: they read the run's bookkeeping and answer yes
//! or no. Recording an accepted slot is the separate, explicit
//! [`update_student_schedules`] step.

use std::collections::{BTreeSet, HashMap};

use fest_core::TimeSlot;
use festgrid_state::StudentId;

/// Slots already committed to each student during one run.
pub type StudentSchedules = HashMap<StudentId, Vec<TimeSlot>>;

/// Would assigning `slot` double-book any of `students`?
///
/// Uses the strict overlap test, so a slot that begins exactly when a
/// committed one ends is not a clash.
pub fn causes_clash(
    slot: &TimeSlot,
    student_schedules: &StudentSchedules,
    students: &BTreeSet<StudentId>,
) -> bool {
    students.iter().any(|student| {
        student_schedules
            .get(student)
            .is_some_and(|committed| committed.iter().any(|s| slot.overlaps(s)))
    })
}

/// Has this exact slot already been handed to some round in this run?
pub fn is_slot_used(slot: &TimeSlot, used_slots: &BTreeSet<TimeSlot>) -> bool {
    used_slots.contains(slot)
}

/// Record `slot` against every student in `students`.
pub fn update_student_schedules(
    slot: TimeSlot,
    student_schedules: &mut StudentSchedules,
    students: &BTreeSet<StudentId>,
) {
    for student in students {
        student_schedules
            .entry(student.clone())
            .or_default()
            .push(slot);
    }
}
