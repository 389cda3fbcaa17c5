//! Per-sub-event participant sets.
//!
//! A snapshot taken at scheduling time from the event's registered students
//! and their registration records. It is only used for clash detection and
//! is never stored.

use std::collections::{BTreeSet, HashMap};

use festgrid_state::{Event, Registration, StudentId, SubEventId};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Roster {
    members: HashMap<SubEventId, BTreeSet<StudentId>>,
    empty: BTreeSet<StudentId>,
}

impl Roster {
    /// Build the roster of every sub-event of `event`.
    ///
    /// Students on the event's registered list take part in every sub-event
    /// unless a registration narrows them to specific sub-events. A cancelled
    /// registration removes the student entirely.
    pub fn build(event: &Event, registrations: &[Registration]) -> Self {
        let mut scoped: HashMap<&str, Option<&[SubEventId]>> = event
            .registered_students
            .iter()
            .map(|s| (s.as_str(), None))
            .collect();

        for reg in registrations.iter().filter(|r| r.event_id == event.id) {
            if !reg.is_active() {
                scoped.remove(reg.student_id.as_str());
                continue;
            }
            let only = (!reg.sub_event_ids.is_empty()).then_some(reg.sub_event_ids.as_slice());
            scoped.insert(reg.student_id.as_str(), only);
        }

        let mut members: HashMap<SubEventId, BTreeSet<StudentId>> = event
            .sub_events
            .iter()
            .map(|s| (s.id.clone(), BTreeSet::new()))
            .collect();
        for (student, only) in scoped {
            for (sub_event_id, set) in members.iter_mut() {
                let takes_part = only.is_none_or(|ids| ids.contains(sub_event_id));
                if takes_part {
                    set.insert(student.to_string());
                }
            }
        }

        Self {
            members,
            empty: BTreeSet::new(),
        }
    }

    /// Build a roster from explicit sets.
    pub fn from_members(members: HashMap<SubEventId, BTreeSet<StudentId>>) -> Self {
        Self {
            members,
            empty: BTreeSet::new(),
        }
    }

    /// Participants of one sub-event; empty for unknown ids.
    pub fn students_for(&self, sub_event_id: &str) -> &BTreeSet<StudentId> {
        self.members.get(sub_event_id).unwrap_or(&self.empty)
    }

    /// Number of distinct students across all sub-events.
    pub fn student_count(&self) -> usize {
        self.members
            .values()
            .flatten()
            .collect::<BTreeSet<_>>()
            .len()
    }
}
