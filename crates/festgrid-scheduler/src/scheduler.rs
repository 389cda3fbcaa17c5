//! Scheduler — the service over the state store.
//!
//! The `Scheduler` owns the read-compute-write cycle of every scheduling
//! operation:
//! - Loads an event, its registrations and prior schedules from the store
//! - Runs the greedy assigner and persists the whole run in one transaction
//! - Applies manual schedule edits and whole-event placement
//! - Accepts and cancels student registrations against the event's
//!   capacity limits
//!
//! Calls that touch the same event are serialized by a per-event mutex.
//! Lock entries nobody holds or waits on are pruned on the next acquire.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex as SyncMutex, PoisonError};

use chrono::{DateTime, Utc};
use fest_core::{DateRange, SchedulerConfig};
use festgrid_state::*;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::assigner::assign;
use crate::auth::{Authorizer, OrganizerOnly};
use crate::calendar::{CalendarFilter, filter_calendar};
use crate::error::{SchedulerError, SchedulerResult};
use crate::report::{
    EventScheduleView, EventUpdate, NamedSchedule, RegisteredEvent, ScheduleEdit, ScheduleReport,
    StudentRegistrations, UNKNOWN_SUB_EVENT,
};
use crate::roster::Roster;
use crate::slots::{SlotPolicy, validate_daily_hours};
use crate::whole_event::optimize_event_scheduling;

type LockMap = HashMap<EventId, Arc<Mutex<()>>>;

/// Event scheduling service.
#[derive(Clone)]
pub struct Scheduler {
    /// The state store holding events, registrations and schedules.
    state: StateStore,
    config: SchedulerConfig,
    policy: SlotPolicy,
    authorizer: Arc<dyn Authorizer>,
    /// event_id → lock serializing work on that event.
    locks: Arc<SyncMutex<LockMap>>,
}

impl Scheduler {
    /// Create a scheduler that lets only organizers manage their events.
    pub fn new(state: StateStore, config: SchedulerConfig) -> Self {
        Self {
            policy: SlotPolicy::from(&config),
            state,
            config,
            authorizer: Arc::new(OrganizerOnly),
            locks: Arc::new(SyncMutex::new(HashMap::new())),
        }
    }

    /// Replace the ownership check.
    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn store(&self) -> &StateStore {
        &self.state
    }

    // ── Events ─────────────────────────────────────────────────────

    /// Store a new event owned by `caller`. Blank ids are generated.
    ///
    /// Fails with `EventExists` if the id is already taken.
    pub async fn create_event(&self, caller: &str, mut event: Event) -> SchedulerResult<Event> {
        check_dates(&event.conducted_dates)?;
        if event.organizer.is_empty() {
            event.organizer = caller.to_string();
        }
        event.assign_missing_ids();
        event.validate_ids().map_err(SchedulerError::InvalidScheduleConfig)?;

        let _guard = self.lock_event(&event.id).await;
        if self.state.get_event(&event.id)?.is_some() {
            return Err(SchedulerError::EventExists(event.id));
        }
        self.state.put_event(&event)?;
        info!(event_id = %event.id, organizer = %event.organizer, "event created");
        Ok(event)
    }

    /// Apply `update` to an event the caller manages.
    pub async fn update_event(
        &self,
        caller: &str,
        event_id: &str,
        update: EventUpdate,
    ) -> SchedulerResult<Event> {
        let _guard = self.lock_event(event_id).await;
        let mut event = self.get_event(event_id)?;
        self.authorize(caller, &event)?;

        update.apply(&mut event);
        check_dates(&event.conducted_dates)?;
        event.assign_missing_ids();
        event.validate_ids().map_err(SchedulerError::InvalidScheduleConfig)?;
        self.state.put_event(&event)?;

        info!(event_id, "event updated");
        Ok(event)
    }

    /// Append a round to one of the event's sub-events.
    pub async fn create_round(
        &self,
        caller: &str,
        event_id: &str,
        sub_event_id: &str,
        mut round: Round,
    ) -> SchedulerResult<Round> {
        let _guard = self.lock_event(event_id).await;
        let mut event = self.get_event(event_id)?;
        self.authorize(caller, &event)?;

        round.id = fest_core::or_new_id(&round.id);
        let sub_event = event
            .sub_event_mut(sub_event_id)
            .ok_or_else(|| SchedulerError::SubEventNotFound(sub_event_id.to_string()))?;
        sub_event.rounds.push(round.clone());
        event.validate_ids().map_err(SchedulerError::InvalidScheduleConfig)?;
        self.state.put_event(&event)?;

        info!(event_id, sub_event_id, round_id = %round.id, "round created");
        Ok(round)
    }

    pub fn get_event(&self, event_id: &str) -> SchedulerResult<Event> {
        self.state
            .get_event(event_id)?
            .ok_or_else(|| SchedulerError::EventNotFound(event_id.to_string()))
    }

    pub fn list_events(&self) -> SchedulerResult<Vec<Event>> {
        Ok(self.state.list_events()?)
    }

    /// Events organized by `organizer`, earliest first.
    pub fn events_organized_by(&self, organizer: &str) -> SchedulerResult<Vec<Event>> {
        let mut events: Vec<Event> = self
            .state
            .list_events()?
            .into_iter()
            .filter(|e| e.organizer == organizer)
            .collect();
        events.sort_by(|a, b| {
            a.conducted_dates
                .start
                .cmp(&b.conducted_dates.start)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(events)
    }

    /// Upcoming and ongoing events matching `filter`, earliest first.
    pub fn calendar(&self, filter: &CalendarFilter) -> SchedulerResult<Vec<Event>> {
        Ok(filter_calendar(self.state.list_events()?, filter))
    }

    /// Delete an event together with its schedules and registrations.
    pub async fn delete_event(&self, caller: &str, event_id: &str) -> SchedulerResult<()> {
        let _guard = self.lock_event(event_id).await;
        let event = self.get_event(event_id)?;
        self.authorize(caller, &event)?;
        self.state.delete_event(event_id)?;
        info!(event_id, "event deleted");
        Ok(())
    }

    // ── Sub-event scheduling ───────────────────────────────────────

    /// Assign every round of the event's sub-events to a slot and persist
    /// the run.
    ///
    /// `daily_hours` falls back to the configured default. Rounds that only
    /// received a fallback slot are listed in the report's `degraded`.
    pub async fn schedule_sub_events(
        &self,
        caller: &str,
        event_id: &str,
        daily_hours: Option<f64>,
    ) -> SchedulerResult<ScheduleReport> {
        let daily_hours = daily_hours.unwrap_or(self.config.default_daily_hours);
        validate_daily_hours(daily_hours)?;

        let _guard = self.lock_event(event_id).await;
        let event = self.get_event(event_id)?;
        self.authorize(caller, &event)?;

        let registrations = self.state.list_registrations_for_event(event_id)?;
        let roster = Roster::build(&event, &registrations);
        let prior: HashMap<SubEventId, SubEventSchedule> = self
            .state
            .list_schedules_for_event(event_id)?
            .into_iter()
            .map(|s| (s.sub_event_id.clone(), s))
            .collect();

        let assignment = assign(&event, &roster, &prior, daily_hours, &self.policy)?;
        self.state.put_schedules(&assignment.schedules)?;

        info!(
            event_id,
            sub_events = assignment.schedules.len(),
            students = roster.student_count(),
            candidate_slots = assignment.candidate_slots,
            "sub-events scheduled"
        );
        if !assignment.degraded.is_empty() {
            warn!(
                event_id,
                degraded = assignment.degraded.len(),
                "some rounds need manual review"
            );
        }

        Ok(ScheduleReport {
            event_id: event_id.to_string(),
            requested_daily_hours: daily_hours,
            candidate_slots: assignment.candidate_slots,
            schedules: assignment.schedules,
            degraded: assignment.degraded,
        })
    }

    /// Every stored schedule of an event, highest priority first.
    pub fn get_schedule(&self, event_id: &str) -> SchedulerResult<EventScheduleView> {
        let event = self.get_event(event_id)?;
        let mut schedules: Vec<NamedSchedule> = self
            .state
            .list_schedules_for_event(event_id)?
            .into_iter()
            .map(|schedule| NamedSchedule {
                schedule_id: schedule.table_key(),
                sub_event_name: event
                    .sub_event(&schedule.sub_event_id)
                    .map(|s| s.name.clone())
                    .unwrap_or_else(|| UNKNOWN_SUB_EVENT.to_string()),
                schedule,
            })
            .collect();
        schedules.sort_by(|a, b| {
            b.schedule
                .priority
                .cmp(&a.schedule.priority)
                .then_with(|| a.sub_event_name.cmp(&b.sub_event_name))
        });

        Ok(EventScheduleView {
            event_id: event_id.to_string(),
            total_sub_events: schedules.len(),
            schedules,
        })
    }

    /// Apply a manual edit to one stored schedule.
    pub async fn edit_sub_event_schedule(
        &self,
        caller: &str,
        schedule_id: &str,
        edit: ScheduleEdit,
    ) -> SchedulerResult<SubEventSchedule> {
        let event_id = self.load_schedule(schedule_id)?.event_id;

        let _guard = self.lock_event(&event_id).await;
        // Re-read under the lock; a scheduling run may have replaced it.
        let mut schedule = self.load_schedule(schedule_id)?;
        let event = self.get_event(&event_id)?;
        self.authorize(caller, &event)?;

        if let Some(daily_hours) = edit.daily_hours {
            validate_daily_hours(daily_hours)?;
            schedule.daily_hours = daily_hours;
        }
        if let Some(rounds) = edit.rounds {
            if let Some(bad) = rounds.iter().find(|r| !r.time_slot.is_valid()) {
                return Err(SchedulerError::InvalidScheduleConfig(format!(
                    "round {} ends before it starts",
                    bad.round_id
                )));
            }
            schedule.rounds = rounds;
        }
        if let Some(priority) = edit.priority {
            schedule.priority = priority;
        }

        self.state.put_schedule(&schedule)?;
        info!(schedule_id, priority = schedule.priority, "schedule edited");
        Ok(schedule)
    }

    // ── Whole-event placement ──────────────────────────────────────

    /// Place every upcoming event starting at or after `now` on the shared
    /// calendar and persist the placed events' slots in one transaction.
    pub async fn optimize_upcoming(&self, now: DateTime<Utc>) -> SchedulerResult<Vec<Event>> {
        let upcoming: Vec<Event> = self
            .state
            .list_events()?
            .into_iter()
            .filter(|e| e.status == EventStatus::Upcoming && e.conducted_dates.start >= now)
            .collect();
        let considered = upcoming.len();
        let placed = optimize_event_scheduling(upcoming, &self.config.weights);

        // Lock in id order so concurrent optimizers cannot deadlock, then
        // write the slot onto the current copy of each event.
        let mut ids: Vec<&str> = placed.iter().map(|e| e.id.as_str()).collect();
        ids.sort_unstable();
        let mut guards = Vec::with_capacity(ids.len());
        for id in ids {
            guards.push(self.lock_event(id).await);
        }

        let mut updated = Vec::with_capacity(placed.len());
        for event in &placed {
            if let Some(mut current) = self.state.get_event(&event.id)? {
                current.scheduled_time_slot = event.scheduled_time_slot;
                updated.push(current);
            }
        }
        self.state.put_events(&updated)?;
        drop(guards);

        info!(considered, placed = updated.len(), "upcoming events optimized");
        Ok(updated)
    }

    /// Move an event to new conducted dates and place it again.
    pub async fn reschedule_event(
        &self,
        caller: &str,
        event_id: &str,
        dates: DateRange,
    ) -> SchedulerResult<Event> {
        check_dates(&dates)?;

        let _guard = self.lock_event(event_id).await;
        let mut event = self.get_event(event_id)?;
        self.authorize(caller, &event)?;

        event.conducted_dates = dates;
        let placed = optimize_event_scheduling(vec![event.clone()], &self.config.weights);
        event.scheduled_time_slot = placed.first().and_then(|e| e.scheduled_time_slot);
        self.state.put_event(&event)?;

        info!(event_id, start = %dates.start, end = %dates.end, "event rescheduled");
        Ok(event)
    }

    // ── Registrations ──────────────────────────────────────────────

    /// Register a student for an event, optionally for a subset of its
    /// sub-events.
    pub async fn register_student(
        &self,
        event_id: &str,
        student_id: &str,
        sub_event_ids: Vec<SubEventId>,
    ) -> SchedulerResult<Registration> {
        let _guard = self.lock_event(event_id).await;
        let mut event = self.get_event(event_id)?;
        if let Some(unknown) = sub_event_ids.iter().find(|id| event.sub_event(id).is_none()) {
            return Err(SchedulerError::SubEventNotFound(unknown.clone()));
        }

        let active: Vec<Registration> = self
            .state
            .list_registrations_for_event(event_id)?
            .into_iter()
            .filter(Registration::is_active)
            .collect();
        if event.registered_students.contains(student_id)
            || active.iter().any(|r| r.student_id == student_id)
        {
            return Err(SchedulerError::AlreadyRegistered {
                student_id: student_id.to_string(),
                event_id: event_id.to_string(),
            });
        }

        let enrolled: BTreeSet<&str> = event
            .registered_students
            .iter()
            .map(String::as_str)
            .chain(active.iter().map(|r| r.student_id.as_str()))
            .collect();
        if enrolled.len() >= event.maximum_students as usize {
            return Err(SchedulerError::CapacityExceeded(format!(
                "event {event_id} is full ({} students)",
                event.maximum_students
            )));
        }

        let upcoming = self.upcoming_registrations(student_id)?;
        if upcoming >= event.max_events_per_student as usize {
            return Err(SchedulerError::CapacityExceeded(format!(
                "student {student_id} is already registered for {upcoming} upcoming events"
            )));
        }

        let registration = Registration {
            id: fest_core::new_id(),
            student_id: student_id.to_string(),
            event_id: event_id.to_string(),
            sub_event_ids,
            status: RegistrationStatus::Pending,
            registered_at: Utc::now(),
        };
        event.registered_students.insert(student_id.to_string());
        self.state.record_registration(&event, &registration)?;

        info!(event_id, student_id, registration_id = %registration.id, "student registered");
        Ok(registration)
    }

    /// Cancel a registration. The registered student or anyone who manages
    /// the event may cancel it.
    ///
    /// The student leaves the event's enrolled set and stops counting
    /// against its limits. Cancelling twice returns the cancelled record.
    pub async fn cancel_registration(
        &self,
        caller: &str,
        event_id: &str,
        registration_id: &str,
    ) -> SchedulerResult<Registration> {
        let _guard = self.lock_event(event_id).await;
        let mut event = self.get_event(event_id)?;
        let mut registration = self
            .state
            .get_registration(event_id, registration_id)?
            .ok_or_else(|| SchedulerError::RegistrationNotFound(registration_id.to_string()))?;
        if registration.student_id != caller {
            self.authorize(caller, &event)?;
        }
        if !registration.is_active() {
            return Ok(registration);
        }

        registration.status = RegistrationStatus::Cancelled;
        event.registered_students.remove(&registration.student_id);
        self.state.record_registration(&event, &registration)?;

        info!(
            event_id,
            registration_id,
            student_id = %registration.student_id,
            "registration cancelled"
        );
        Ok(registration)
    }

    /// A student's active registrations, split into events starting after
    /// `now` and the rest.
    pub fn student_registrations(
        &self,
        student_id: &str,
        now: DateTime<Utc>,
    ) -> SchedulerResult<StudentRegistrations> {
        let mut entries = Vec::new();
        for registration in self.state.list_registrations_for_student(student_id)? {
            if !registration.is_active() {
                continue;
            }
            let Some(event) = self.state.get_event(&registration.event_id)? else {
                continue;
            };
            entries.push(RegisteredEvent {
                registration,
                event_name: event.name,
                conducted_dates: event.conducted_dates,
            });
        }
        entries.sort_by(|a, b| a.conducted_dates.start.cmp(&b.conducted_dates.start));

        let (upcoming_events, past_events): (Vec<_>, Vec<_>) = entries
            .into_iter()
            .partition(|e| e.conducted_dates.start > now);
        Ok(StudentRegistrations {
            upcoming_events,
            past_events,
        })
    }

    // ── Internals ──────────────────────────────────────────────────

    /// Active registrations of `student_id` on upcoming events.
    fn upcoming_registrations(&self, student_id: &str) -> SchedulerResult<usize> {
        let mut count = 0;
        for registration in self.state.list_registrations_for_student(student_id)? {
            if !registration.is_active() {
                continue;
            }
            let upcoming = self
                .state
                .get_event(&registration.event_id)?
                .is_some_and(|e| e.status == EventStatus::Upcoming);
            if upcoming {
                count += 1;
            }
        }
        Ok(count)
    }

    fn load_schedule(&self, schedule_id: &str) -> SchedulerResult<SubEventSchedule> {
        self.state
            .get_schedule(schedule_id)?
            .ok_or_else(|| SchedulerError::ScheduleNotFound(schedule_id.to_string()))
    }

    fn authorize(&self, caller: &str, event: &Event) -> SchedulerResult<()> {
        if self.authorizer.can_manage(caller, event) {
            return Ok(());
        }
        debug!(caller, event_id = %event.id, "caller may not manage event");
        Err(SchedulerError::Unauthorized {
            caller: caller.to_string(),
            event_id: event.id.clone(),
        })
    }

    /// Acquire the lock serializing work on `event_id`.
    async fn lock_event(&self, event_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Holders and waiters keep a clone; a lone map reference is idle.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(event_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

fn check_dates(dates: &DateRange) -> SchedulerResult<()> {
    if dates.is_valid() {
        return Ok(());
    }
    Err(SchedulerError::InvalidScheduleConfig(
        "conducted dates must start before they end".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fest_core::TimeSlot;
    use festgrid_state::Placement;

    use crate::auth::AllowAll;

    const ORGANIZER: &str = "organizer-1";

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, d, h, 0, 0).unwrap()
    }

    fn round(id: &str, name: &str) -> Round {
        Round {
            id: id.to_string(),
            name: name.to_string(),
            sequence: None,
            scoring_categories: vec![],
        }
    }

    fn sub_event(id: &str, name: &str, rounds: Vec<Round>) -> SubEvent {
        SubEvent {
            id: id.to_string(),
            name: name.to_string(),
            overview: None,
            venue: Some("Hall A".to_string()),
            targeted_departments: vec![],
            targeted_courses: vec![],
            rounds,
            priority: None,
        }
    }

    fn event(id: &str, from: DateTime<Utc>, to: DateTime<Utc>, sub_events: Vec<SubEvent>) -> Event {
        Event {
            id: id.to_string(),
            name: format!("Event {id}"),
            description: String::new(),
            organizer: ORGANIZER.to_string(),
            conducted_dates: DateRange::new(from, to).unwrap(),
            targeted_audience: TargetedAudience::default(),
            maximum_students: 100,
            max_events_per_student: 3,
            registered_students: BTreeSet::new(),
            sub_events,
            status: EventStatus::Upcoming,
            scheduled_time_slot: None,
        }
    }

    fn fest() -> Event {
        event(
            "fest",
            at(10, 0),
            at(10, 23),
            vec![
                sub_event("quiz", "Quiz", vec![round("q1", "Round 1"), round("q2", "Round 2")]),
                sub_event("code", "Hackathon", vec![round("c1", "Round 1")]),
            ],
        )
    }

    fn scheduler_with(events: &[Event]) -> Scheduler {
        let store = StateStore::open_in_memory().unwrap();
        store.put_events(events).unwrap();
        Scheduler::new(store, SchedulerConfig::default())
    }

    #[tokio::test]
    async fn schedules_and_persists_every_sub_event() {
        let scheduler = scheduler_with(&[fest()]);

        let report = scheduler.schedule_sub_events(ORGANIZER, "fest", None).await.unwrap();

        assert_eq!(report.schedules.len(), 2);
        assert!(!report.is_degraded());
        assert_eq!(report.requested_daily_hours, 8.0);
        let stored = scheduler.store().list_schedules_for_event("fest").unwrap();
        assert_eq!(stored.len(), 2);

        let mut slots: Vec<TimeSlot> = stored
            .iter()
            .flat_map(|s| s.rounds.iter().map(|r| r.time_slot))
            .collect();
        slots.sort();
        slots.dedup();
        assert_eq!(slots.len(), 3);
    }

    #[tokio::test]
    async fn rerun_is_idempotent() {
        let scheduler = scheduler_with(&[fest()]);
        let first = scheduler.schedule_sub_events(ORGANIZER, "fest", Some(6.0)).await.unwrap();
        let second = scheduler.schedule_sub_events(ORGANIZER, "fest", Some(6.0)).await.unwrap();
        assert_eq!(first.schedules, second.schedules);
    }

    #[tokio::test]
    async fn zero_daily_hours_is_rejected_before_lookup() {
        let scheduler = scheduler_with(&[]);
        let err = scheduler
            .schedule_sub_events(ORGANIZER, "missing", Some(0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidScheduleConfig(_)));
    }

    #[tokio::test]
    async fn unknown_event_is_not_found() {
        let scheduler = scheduler_with(&[]);
        let err = scheduler
            .schedule_sub_events(ORGANIZER, "missing", None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn non_organizer_is_unauthorized() {
        let scheduler = scheduler_with(&[fest()]);
        let err = scheduler
            .schedule_sub_events("someone-else", "fest", None)
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::Unauthorized { .. }));
        assert!(scheduler.store().list_schedules_for_event("fest").unwrap().is_empty());
    }

    #[tokio::test]
    async fn allow_all_authorizer_lets_anyone_schedule() {
        let scheduler = scheduler_with(&[fest()]).with_authorizer(Arc::new(AllowAll));
        assert!(scheduler.schedule_sub_events("anyone", "fest", None).await.is_ok());
    }

    #[tokio::test]
    async fn degraded_run_is_reported_and_strict_mode_fails() {
        let tight = event(
            "tight",
            at(10, 0),
            at(10, 23),
            vec![sub_event(
                "s",
                "Solo",
                vec![round("r1", "Round 1"), round("r2", "Round 2")],
            )],
        );
        let scheduler = scheduler_with(&[tight]);

        let report = scheduler.schedule_sub_events(ORGANIZER, "tight", Some(2.0)).await.unwrap();
        assert_eq!(report.degraded.len(), 1);
        assert_eq!(report.degraded[0].round_id, "r2");
        assert!(matches!(
            report.require_clean(),
            Err(SchedulerError::SchedulingDegraded { count: 1 })
        ));

        let stored = scheduler.store().get_schedule("tight:s").unwrap().unwrap();
        assert!(stored.has_fallback());
        assert_eq!(stored.rounds[1].placement, Placement::Fallback);
    }

    #[tokio::test]
    async fn get_schedule_names_sub_events_and_marks_unknown() {
        let scheduler = scheduler_with(&[fest()]);
        scheduler.schedule_sub_events(ORGANIZER, "fest", None).await.unwrap();

        // Drop the hackathon from the event; its schedule stays behind.
        let mut trimmed = scheduler.get_event("fest").unwrap();
        trimmed.sub_events.retain(|s| s.id != "code");
        scheduler.store().put_event(&trimmed).unwrap();

        let view = scheduler.get_schedule("fest").unwrap();
        assert_eq!(view.total_sub_events, 2);
        let names: Vec<&str> = view.schedules.iter().map(|s| s.sub_event_name.as_str()).collect();
        assert!(names.contains(&"Quiz"));
        assert!(names.contains(&UNKNOWN_SUB_EVENT));
    }

    #[tokio::test]
    async fn edit_changes_only_given_fields_and_priority_survives_rerun() {
        let scheduler = scheduler_with(&[fest()]);
        scheduler.schedule_sub_events(ORGANIZER, "fest", None).await.unwrap();
        let before = scheduler.store().get_schedule("fest:code").unwrap().unwrap();

        let edited = scheduler
            .edit_sub_event_schedule(
                ORGANIZER,
                "fest:code",
                ScheduleEdit {
                    priority: Some(50),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.priority, 50);
        assert_eq!(edited.rounds, before.rounds);
        assert_eq!(edited.daily_hours, before.daily_hours);

        // The hackathon now outranks the quiz and takes the first slot.
        let report = scheduler.schedule_sub_events(ORGANIZER, "fest", None).await.unwrap();
        assert_eq!(report.schedules[0].sub_event_id, "code");
        assert_eq!(report.schedules[0].rounds[0].time_slot.start, at(10, 9));
    }

    #[tokio::test]
    async fn edit_rejects_bad_values() {
        let scheduler = scheduler_with(&[fest()]);
        scheduler.schedule_sub_events(ORGANIZER, "fest", None).await.unwrap();

        let err = scheduler
            .edit_sub_event_schedule(
                ORGANIZER,
                "fest:quiz",
                ScheduleEdit {
                    daily_hours: Some(-1.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidScheduleConfig(_)));

        let err = scheduler
            .edit_sub_event_schedule(ORGANIZER, "fest:nope", ScheduleEdit::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::ScheduleNotFound(_)));
    }

    #[tokio::test]
    async fn registration_respects_limits() {
        let mut small = fest();
        small.maximum_students = 2;
        let scheduler = scheduler_with(&[small]);

        let reg = scheduler
            .register_student("fest", "s1", vec!["quiz".to_string()])
            .await
            .unwrap();
        assert_eq!(reg.status, RegistrationStatus::Pending);
        assert!(scheduler.get_event("fest").unwrap().registered_students.contains("s1"));

        let dup = scheduler.register_student("fest", "s1", vec![]).await.unwrap_err();
        assert!(matches!(dup, SchedulerError::AlreadyRegistered { .. }));

        let unknown = scheduler
            .register_student("fest", "s2", vec!["nope".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(unknown, SchedulerError::SubEventNotFound(_)));

        scheduler.register_student("fest", "s2", vec![]).await.unwrap();
        let full = scheduler.register_student("fest", "s3", vec![]).await.unwrap_err();
        assert!(matches!(full, SchedulerError::CapacityExceeded(_)));
    }

    #[tokio::test]
    async fn per_student_event_limit_counts_upcoming_events() {
        let events: Vec<Event> = (1..=3)
            .map(|i| {
                let mut e = event(&format!("e{i}"), at(10 + i, 9), at(10 + i, 17), vec![]);
                e.max_events_per_student = 2;
                e
            })
            .collect();
        let scheduler = scheduler_with(&events);

        scheduler.register_student("e1", "s", vec![]).await.unwrap();
        scheduler.register_student("e2", "s", vec![]).await.unwrap();
        let err = scheduler.register_student("e3", "s", vec![]).await.unwrap_err();
        assert!(matches!(err, SchedulerError::CapacityExceeded(_)));
    }

    #[tokio::test]
    async fn registered_students_are_kept_apart() {
        let scheduler = scheduler_with(&[fest()]);
        scheduler.register_student("fest", "alice", vec![]).await.unwrap();

        let report = scheduler.schedule_sub_events(ORGANIZER, "fest", None).await.unwrap();
        let mut slots: Vec<TimeSlot> = report
            .schedules
            .iter()
            .flat_map(|s| s.rounds.iter().map(|r| r.time_slot))
            .collect();
        slots.sort();
        for pair in slots.windows(2) {
            assert!(!pair[0].overlaps(&pair[1]));
        }
    }

    #[tokio::test]
    async fn optimize_upcoming_places_and_persists() {
        let mut past = event("past", at(1, 9), at(1, 17), vec![]);
        past.maximum_students = 1000;
        let a = event("a", at(12, 9), at(12, 17), vec![]);
        let mut b = event("b", at(12, 10), at(12, 12), vec![]);
        b.maximum_students = 10;
        let c = event("c", at(14, 9), at(14, 17), vec![]);
        let scheduler = scheduler_with(&[past, a, b, c]);

        let placed = scheduler.optimize_upcoming(at(5, 0)).await.unwrap();
        let mut ids: Vec<&str> = placed.iter().map(|e| e.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "c"]);

        let stored = scheduler.get_event("a").unwrap();
        assert_eq!(stored.scheduled_time_slot, Some(TimeSlot::new(at(12, 9), at(12, 17)).unwrap()));
        assert!(scheduler.get_event("b").unwrap().scheduled_time_slot.is_none());
        assert!(scheduler.get_event("past").unwrap().scheduled_time_slot.is_none());
    }

    #[tokio::test]
    async fn reschedule_moves_event_and_places_it() {
        let scheduler = scheduler_with(&[fest()]);
        let dates = DateRange::new(at(20, 9), at(21, 17)).unwrap();

        let moved = scheduler.reschedule_event(ORGANIZER, "fest", dates).await.unwrap();
        assert_eq!(moved.conducted_dates, dates);
        assert_eq!(moved.scheduled_time_slot, Some(dates.as_slot()));
        assert_eq!(scheduler.get_event("fest").unwrap(), moved);

        let inverted = DateRange {
            start: at(21, 9),
            end: at(20, 9),
        };
        let err = scheduler.reschedule_event(ORGANIZER, "fest", inverted).await.unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidScheduleConfig(_)));
    }

    #[tokio::test]
    async fn delete_cascades_and_requires_owner() {
        let scheduler = scheduler_with(&[fest()]);
        scheduler.register_student("fest", "s1", vec![]).await.unwrap();
        scheduler.schedule_sub_events(ORGANIZER, "fest", None).await.unwrap();

        let err = scheduler.delete_event("intruder", "fest").await.unwrap_err();
        assert!(matches!(err, SchedulerError::Unauthorized { .. }));

        scheduler.delete_event(ORGANIZER, "fest").await.unwrap();
        assert!(scheduler.get_event("fest").unwrap_err().is_not_found());
        assert!(scheduler.store().list_schedules_for_event("fest").unwrap().is_empty());
        assert!(scheduler.store().list_registrations_for_event("fest").unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_event_fills_ids_and_organizer() {
        let scheduler = scheduler_with(&[]);
        let mut draft = fest();
        draft.id.clear();
        draft.organizer.clear();
        draft.sub_events[0].id.clear();

        let created = scheduler.create_event("creator", draft).await.unwrap();
        assert_eq!(created.id.len(), 32);
        assert_eq!(created.organizer, "creator");
        assert!(!created.sub_events[0].id.is_empty());
        assert_eq!(scheduler.list_events().unwrap(), vec![created]);
    }

    #[tokio::test]
    async fn create_event_refuses_to_replace_an_existing_id() {
        let scheduler = scheduler_with(&[]);
        scheduler.create_event(ORGANIZER, fest()).await.unwrap();

        let mut hijack = fest();
        hijack.organizer.clear();
        hijack.name = "hijacked".to_string();
        let err = scheduler.create_event("mallory", hijack).await.unwrap_err();
        assert!(matches!(err, SchedulerError::EventExists(_)));

        let stored = scheduler.get_event("fest").unwrap();
        assert_eq!(stored.organizer, ORGANIZER);
        assert_eq!(stored.name, "Event fest");
        let err = scheduler.delete_event("mallory", "fest").await.unwrap_err();
        assert!(matches!(err, SchedulerError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn create_event_rejects_separator_and_duplicate_ids() {
        let scheduler = scheduler_with(&[]);

        let mut colon = fest();
        colon.id = "fest:2026".to_string();
        let err = scheduler.create_event(ORGANIZER, colon).await.unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidScheduleConfig(_)));

        let mut colon_sub = fest();
        colon_sub.sub_events[0].id = "quiz:final".to_string();
        let err = scheduler.create_event(ORGANIZER, colon_sub).await.unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidScheduleConfig(_)));

        let dup = event(
            "dup",
            at(10, 0),
            at(10, 23),
            vec![
                sub_event("s", "First", vec![round("r1", "Round 1"), round("r2", "Round 2")]),
                sub_event("s", "Second", vec![round("r3", "Round 1")]),
            ],
        );
        let err = scheduler.create_event(ORGANIZER, dup).await.unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidScheduleConfig(_)));
        assert!(scheduler.list_events().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_lookups_do_not_accumulate_locks() {
        let scheduler = scheduler_with(&[fest()]);
        for i in 0..50 {
            let err = scheduler
                .register_student(&format!("ghost-{i}"), "s1", vec![])
                .await
                .unwrap_err();
            assert!(err.is_not_found());
        }
        assert!(scheduler.tracked_locks() <= 1);

        scheduler.schedule_sub_events(ORGANIZER, "fest", None).await.unwrap();
        scheduler.delete_event(ORGANIZER, "fest").await.unwrap();
        assert!(scheduler.tracked_locks() <= 1);
    }

    #[tokio::test]
    async fn update_event_changes_details_for_the_organizer_only() {
        let scheduler = scheduler_with(&[fest()]);
        let update = || EventUpdate {
            name: Some("Renamed".to_string()),
            maximum_students: Some(10),
            ..Default::default()
        };

        let err = scheduler.update_event("intruder", "fest", update()).await.unwrap_err();
        assert!(matches!(err, SchedulerError::Unauthorized { .. }));

        let updated = scheduler.update_event(ORGANIZER, "fest", update()).await.unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.maximum_students, 10);
        assert_eq!(updated.organizer, ORGANIZER);
        assert_eq!(scheduler.get_event("fest").unwrap(), updated);

        let bad = EventUpdate {
            conducted_dates: Some(DateRange {
                start: at(12, 0),
                end: at(11, 0),
            }),
            ..Default::default()
        };
        let err = scheduler.update_event(ORGANIZER, "fest", bad).await.unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidScheduleConfig(_)));
    }

    #[tokio::test]
    async fn updated_sub_events_feed_the_next_run() {
        let scheduler = scheduler_with(&[fest()]);
        let mut subs = fest().sub_events;
        subs.push(sub_event("", "Debate", vec![round("", "Round 1")]));

        let updated = scheduler
            .update_event(
                ORGANIZER,
                "fest",
                EventUpdate {
                    sub_events: Some(subs),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.sub_events.len(), 3);
        assert!(updated.sub_events.iter().all(|s| !s.id.is_empty()));

        let report = scheduler.schedule_sub_events(ORGANIZER, "fest", None).await.unwrap();
        assert_eq!(report.schedules.len(), 3);
    }

    #[tokio::test]
    async fn create_round_appends_and_checks_ids() {
        let scheduler = scheduler_with(&[fest()]);

        let created = scheduler
            .create_round(ORGANIZER, "fest", "code", round("", "Round 2"))
            .await
            .unwrap();
        assert!(!created.id.is_empty());
        let stored = scheduler.get_event("fest").unwrap();
        assert_eq!(stored.sub_event("code").unwrap().rounds.len(), 2);

        let report = scheduler.schedule_sub_events(ORGANIZER, "fest", None).await.unwrap();
        let code = report.schedules.iter().find(|s| s.sub_event_id == "code").unwrap();
        assert_eq!(code.rounds.len(), 2);

        let err = scheduler
            .create_round(ORGANIZER, "fest", "code", round("c1", "Again"))
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidScheduleConfig(_)));

        let err = scheduler
            .create_round(ORGANIZER, "fest", "nope", round("", "Round 1"))
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::SubEventNotFound(_)));

        let err = scheduler
            .create_round("intruder", "fest", "code", round("", "Round 3"))
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn cancelled_registration_frees_the_seat() {
        let mut small = fest();
        small.maximum_students = 1;
        let scheduler = scheduler_with(&[small]);
        let reg = scheduler
            .register_student("fest", "alice", vec!["quiz".to_string()])
            .await
            .unwrap();

        let err = scheduler
            .cancel_registration("bob", "fest", &reg.id)
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::Unauthorized { .. }));

        let cancelled = scheduler.cancel_registration("alice", "fest", &reg.id).await.unwrap();
        assert_eq!(cancelled.status, RegistrationStatus::Cancelled);
        assert!(!scheduler.get_event("fest").unwrap().registered_students.contains("alice"));

        let again = scheduler.cancel_registration(ORGANIZER, "fest", &reg.id).await.unwrap();
        assert_eq!(again.status, RegistrationStatus::Cancelled);

        scheduler.register_student("fest", "bob", vec![]).await.unwrap();

        let err = scheduler
            .cancel_registration("alice", "fest", "missing")
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::RegistrationNotFound(_)));
    }

    #[tokio::test]
    async fn student_registrations_split_on_now() {
        let early = event("early", at(5, 9), at(5, 17), vec![]);
        let late = event("late", at(20, 9), at(20, 17), vec![]);
        let later = event("later", at(25, 9), at(25, 17), vec![]);
        let scheduler = scheduler_with(&[later, early, late]);
        for id in ["later", "early", "late"] {
            scheduler.register_student(id, "s", vec![]).await.unwrap();
        }
        let dropped = scheduler.register_student("late", "t", vec![]).await.unwrap();
        scheduler.cancel_registration("t", "late", &dropped.id).await.unwrap();

        let regs = scheduler.student_registrations("s", at(10, 0)).unwrap();
        let upcoming: Vec<&str> = regs
            .upcoming_events
            .iter()
            .map(|r| r.registration.event_id.as_str())
            .collect();
        assert_eq!(upcoming, vec!["late", "later"]);
        assert_eq!(regs.past_events.len(), 1);
        assert_eq!(regs.past_events[0].event_name, "Event early");

        let none = scheduler.student_registrations("t", at(10, 0)).unwrap();
        assert!(none.upcoming_events.is_empty() && none.past_events.is_empty());
    }

    #[tokio::test]
    async fn events_organized_by_filters_and_sorts() {
        let mut other = event("other", at(1, 9), at(1, 17), vec![]);
        other.organizer = "someone".to_string();
        let second = event("second", at(15, 9), at(15, 17), vec![]);
        let scheduler = scheduler_with(&[second, other, fest()]);

        let mine: Vec<String> = scheduler
            .events_organized_by(ORGANIZER)
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(mine, vec!["fest", "second"]);
    }

    #[tokio::test]
    async fn concurrent_runs_on_one_event_agree() {
        let scheduler = scheduler_with(&[fest()]);
        let (a, b) = tokio::join!(
            scheduler.schedule_sub_events(ORGANIZER, "fest", None),
            scheduler.schedule_sub_events(ORGANIZER, "fest", None),
        );
        assert_eq!(a.unwrap().schedules, b.unwrap().schedules);
    }
}
