/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The selection plan: an ordered list of wanted courses, validated against
//! the timetable.
//!
//! Insertion order is user priority.  [`SelectionPlan::add`] keeps the core
//! invariant: no two entries that occupy slots (Pending, InFlight, Enrolled)
//! overlap.  [`SelectionPlan::add_fallback`] deliberately relaxes it for
//! Pending siblings so the user can race two alternatives for the same time
//! block; [`SelectionPlan::on_enrolled`] then resolves the race by abandoning
//! every conflicting Pending entry (the cascade).
//!
//! Status changes made by the scheduler go through the `begin_attempt` /
//! `release_attempt` / `on_enrolled` / `reject` / `abandon` / `close_window`
//! methods, each of which returns the [`Transition`]s it applied so the caller
//! can publish them.  Illegal or late transitions (anything on a terminal
//! entry) are ignored and return nothing.

pub mod entry;
pub mod error;

pub use entry::{AbandonReason, EntryStatus, RejectReason, RetryCause, SelectionEntry};
pub use error::PlanError;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::course::{CourseId, CourseOffering};
use crate::timetable;

// ── Transition ────────────────────────────────────────────────────────────────

/// One applied status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub id: CourseId,
    pub old: EntryStatus,
    pub new: EntryStatus,
}

// ── SelectionPlan ─────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone)]
pub struct SelectionPlan {
    entries: Vec<SelectionEntry>,
}

impl SelectionPlan {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Editing ───────────────────────────────────────────────────────────────

    /// Append `offering` at the lowest priority.
    ///
    /// # Errors
    /// [`PlanError::Conflict`] if any slot-occupying entry overlaps it,
    /// [`PlanError::DuplicateCourse`] if it is already planned.
    pub fn add(&mut self, offering: Arc<CourseOffering>) -> Result<(), PlanError> {
        self.ensure_absent(&offering.id)?;
        let clashes = self.conflicts_with(&offering);
        if !clashes.is_empty() {
            return Err(PlanError::Conflict {
                candidate: offering.name.clone(),
                conflicts_with: clashes.iter().map(|e| e.name().to_string()).collect(),
            });
        }
        self.push(offering, false);
        Ok(())
    }

    /// Append `offering` as an alternative that may overlap Pending entries.
    ///
    /// It must still not overlap anything already InFlight or Enrolled.
    pub fn add_fallback(&mut self, offering: Arc<CourseOffering>) -> Result<(), PlanError> {
        self.ensure_absent(&offering.id)?;
        let clashes: Vec<String> = self
            .entries
            .iter()
            .filter(|e| matches!(e.status(), EntryStatus::InFlight | EntryStatus::Enrolled))
            .filter(|e| timetable::conflicts(e.slots(), &offering.slots))
            .map(|e| e.name().to_string())
            .collect();
        if !clashes.is_empty() {
            return Err(PlanError::Conflict {
                candidate: offering.name.clone(),
                conflicts_with: clashes,
            });
        }
        self.push(offering, true);
        Ok(())
    }

    /// Remove a Pending entry.
    pub fn remove(&mut self, id: &CourseId) -> Result<SelectionEntry, PlanError> {
        let idx = self.index_of(id)?;
        let status = self.entries[idx].status();
        if *status != EntryStatus::Pending {
            return Err(PlanError::NotRemovable {
                id: id.clone(),
                status: status.clone(),
            });
        }
        debug!(course = %id, "entry removed from plan");
        Ok(self.entries.remove(idx))
    }

    /// Discard every entry.  Refused while any attempt is in flight.
    pub fn clear(&mut self) -> Result<(), PlanError> {
        if let Some(busy) = self
            .entries
            .iter()
            .find(|e| *e.status() == EntryStatus::InFlight)
        {
            return Err(PlanError::NotRemovable {
                id: busy.id().clone(),
                status: EntryStatus::InFlight,
            });
        }
        self.entries.clear();
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    /// Entries in priority order.
    pub fn entries(&self) -> &[SelectionEntry] {
        &self.entries
    }

    pub fn get(&self, id: &CourseId) -> Option<&SelectionEntry> {
        self.entries.iter().find(|e| e.id() == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Slot-occupying entries whose slots overlap `candidate`'s.
    pub fn conflicts_with(&self, candidate: &CourseOffering) -> Vec<&SelectionEntry> {
        self.entries
            .iter()
            .filter(|e| e.id() != &candidate.id && e.status().occupies_slots())
            .filter(|e| timetable::conflicts(e.slots(), &candidate.slots))
            .collect()
    }

    /// Timetable check against the union of occupied slots.
    pub fn can_add(&self, candidate: &CourseOffering) -> bool {
        timetable::can_add(
            self.entries
                .iter()
                .filter(|e| e.status().occupies_slots())
                .map(|e| e.slots()),
            &candidate.slots,
        )
    }

    /// `true` once no entry can change any more.
    pub fn all_terminal(&self) -> bool {
        self.entries.iter().all(|e| e.status().is_terminal())
    }

    /// Ids of Pending entries, in priority order.
    pub fn pending_ids(&self) -> Vec<CourseId> {
        self.entries
            .iter()
            .filter(|e| *e.status() == EntryStatus::Pending)
            .map(|e| e.id().clone())
            .collect()
    }

    pub fn snapshot(&self) -> PlanSnapshot {
        PlanSnapshot {
            entries: self.entries.clone(),
        }
    }

    // ── Scheduler-driven transitions ──────────────────────────────────────────

    /// Pending → InFlight (counts an attempt).  `None` means the entry is no
    /// longer Pending and its task should stop.
    pub fn begin_attempt(&mut self, id: &CourseId) -> Option<Transition> {
        self.apply(id, EntryStatus::InFlight)
    }

    /// InFlight → Pending after a retryable failure.
    ///
    /// If a conflicting sibling enrolled while this attempt was in flight the
    /// entry goes straight to `Abandoned(SlotSuperseded)` instead: it missed
    /// the cascade and must not become Pending next to an Enrolled overlap.
    pub fn release_attempt(&mut self, id: &CourseId) -> Option<Transition> {
        match self.enrolled_rival(id) {
            Some(by) => {
                info!(course = %id, by = %by, "entry abandoned after attempt: slot superseded");
                self.apply(id, EntryStatus::Abandoned(AbandonReason::SlotSuperseded { by }))
            }
            None => self.apply(id, EntryStatus::Pending),
        }
    }

    /// Mark `id` Enrolled, then abandon every Pending entry whose slots
    /// overlap it.  Returns all applied transitions, the enrollment first.
    ///
    /// If an overlapping sibling is already Enrolled (two fallbacks in flight
    /// together, both accepted) the later one is abandoned instead; its seat
    /// has to be dropped on the service side by hand.
    pub fn on_enrolled(&mut self, id: &CourseId) -> Vec<Transition> {
        if let Some(by) = self.enrolled_rival(id) {
            warn!(course = %id, by = %by, "enrolled on the service but slot already taken; drop this seat");
            return self
                .apply(id, EntryStatus::Abandoned(AbandonReason::SlotSuperseded { by }))
                .into_iter()
                .collect();
        }
        let Some(enrolled) = self.apply(id, EntryStatus::Enrolled) else {
            return Vec::new();
        };
        let mut applied = vec![enrolled];

        let Some(winner) = self.get(id).map(|e| Arc::clone(e.offering())) else {
            return applied;
        };
        let losers: Vec<CourseId> = self
            .entries
            .iter()
            .filter(|e| e.id() != id && *e.status() == EntryStatus::Pending)
            .filter(|e| timetable::conflicts(e.slots(), &winner.slots))
            .map(|e| e.id().clone())
            .collect();

        for loser in losers {
            let reason = AbandonReason::SlotSuperseded {
                by: winner.name.clone(),
            };
            if let Some(t) = self.apply(&loser, EntryStatus::Abandoned(reason)) {
                info!(course = %loser, by = %winner.id, "entry abandoned: slot superseded");
                applied.push(t);
            }
        }
        applied
    }

    /// Release every InFlight entry whose attempt will never report back
    /// (the run driving it was cancelled).
    pub fn interrupt(&mut self) -> Vec<Transition> {
        let busy: Vec<CourseId> = self
            .entries
            .iter()
            .filter(|e| *e.status() == EntryStatus::InFlight)
            .map(|e| e.id().clone())
            .collect();
        busy.iter()
            .filter_map(|id| self.release_attempt(id))
            .collect()
    }

    pub fn reject(&mut self, id: &CourseId, reason: RejectReason) -> Option<Transition> {
        self.apply(id, EntryStatus::Rejected(reason))
    }

    pub fn abandon(&mut self, id: &CourseId, reason: AbandonReason) -> Option<Transition> {
        self.apply(id, EntryStatus::Abandoned(reason))
    }

    /// Force every non-terminal entry to `Abandoned(WindowClosed)`.
    pub fn close_window(&mut self) -> Vec<Transition> {
        let open: Vec<CourseId> = self
            .entries
            .iter()
            .filter(|e| !e.status().is_terminal())
            .map(|e| e.id().clone())
            .collect();
        open.iter()
            .filter_map(|id| self.apply(id, EntryStatus::Abandoned(AbandonReason::WindowClosed)))
            .collect()
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn apply(&mut self, id: &CourseId, next: EntryStatus) -> Option<Transition> {
        let entry = self.entries.iter_mut().find(|e| e.id() == id)?;
        let old = entry.advance(next.clone())?;
        debug!(course = %id, from = %old, to = %next, "status transition");
        Some(Transition {
            id: id.clone(),
            old,
            new: next,
        })
    }

    fn push(&mut self, offering: Arc<CourseOffering>, fallback: bool) {
        debug!(course = %offering.id, name = %offering.name, fallback, "entry added to plan");
        self.entries.push(SelectionEntry::new(offering, fallback));
    }

    fn ensure_absent(&self, id: &CourseId) -> Result<(), PlanError> {
        if self.get(id).is_some() {
            return Err(PlanError::DuplicateCourse(id.clone()));
        }
        Ok(())
    }

    /// Name of an Enrolled entry, other than `id`, overlapping `id`'s slots.
    fn enrolled_rival(&self, id: &CourseId) -> Option<String> {
        let entry = self.get(id)?;
        self.entries
            .iter()
            .filter(|e| e.id() != id && *e.status() == EntryStatus::Enrolled)
            .find(|e| timetable::conflicts(e.slots(), entry.slots()))
            .map(|e| e.name().to_string())
    }

    fn index_of(&self, id: &CourseId) -> Result<usize, PlanError> {
        self.entries
            .iter()
            .position(|e| e.id() == id)
            .ok_or_else(|| PlanError::UnknownEntry(id.clone()))
    }
}

// ── PlanSnapshot ──────────────────────────────────────────────────────────────

/// Point-in-time copy of the plan, returned by the coordinator.
#[derive(Debug, Clone)]
pub struct PlanSnapshot {
    pub entries: Vec<SelectionEntry>,
}

impl PlanSnapshot {
    pub fn status_of(&self, id: &CourseId) -> Option<&EntryStatus> {
        self.entries.iter().find(|e| e.id() == id).map(|e| e.status())
    }

    pub fn attempts_of(&self, id: &CourseId) -> Option<u32> {
        self.entries.iter().find(|e| e.id() == id).map(|e| e.attempts())
    }

    pub fn enrolled(&self) -> impl Iterator<Item = &SelectionEntry> {
        self.entries
            .iter()
            .filter(|e| *e.status() == EntryStatus::Enrolled)
    }

    /// `(enrolled, rejected, abandoned)` counts.
    pub fn tally(&self) -> (usize, usize, usize) {
        self.entries
            .iter()
            .fold((0, 0, 0), |(en, rj, ab), e| match e.status() {
                EntryStatus::Enrolled => (en + 1, rj, ab),
                EntryStatus::Rejected(_) => (en, rj + 1, ab),
                EntryStatus::Abandoned(_) => (en, rj, ab + 1),
                _ => (en, rj, ab),
            })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timetable::{TimeSlot, Weekday::*};

    fn offering(id: &str, slots: &[(crate::timetable::Weekday, u8, u8)]) -> Arc<CourseOffering> {
        Arc::new(CourseOffering::new(
            id,
            format!("Course {id}"),
            slots.iter().map(|&(d, s, e)| TimeSlot::new(d, s, e)).collect(),
        ))
    }

    fn status(plan: &SelectionPlan, id: &str) -> EntryStatus {
        plan.get(&id.into()).unwrap().status().clone()
    }

    /// No two slot-occupying entries overlap.
    fn assert_invariant(plan: &SelectionPlan) {
        let active: Vec<_> = plan
            .entries()
            .iter()
            .filter(|e| e.status().occupies_slots())
            .collect();
        for (i, a) in active.iter().enumerate() {
            for b in &active[i + 1..] {
                assert!(
                    !timetable::conflicts(a.slots(), b.slots()),
                    "{} and {} overlap while both active",
                    a.id(),
                    b.id()
                );
            }
        }
    }

    // ── add ───────────────────────────────────────────────────────────────────

    #[test]
    fn identical_slots_second_add_fails_with_conflict() {
        let mut plan = SelectionPlan::new();
        plan.add(offering("a", &[(Monday, 1, 3)])).unwrap();
        let err = plan.add(offering("b", &[(Monday, 1, 3)])).unwrap_err();
        match err {
            PlanError::Conflict {
                candidate,
                conflicts_with,
            } => {
                assert_eq!(candidate, "Course b");
                assert_eq!(conflicts_with, vec!["Course a".to_string()]);
            }
            other => panic!("expected Conflict, got {other:?}"),
        }
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn adjacent_courses_can_both_be_added() {
        let mut plan = SelectionPlan::new();
        plan.add(offering("a", &[(Monday, 1, 3)])).unwrap();
        plan.add(offering("b", &[(Monday, 3, 5)])).unwrap();
        assert_eq!(plan.len(), 2);
        assert_invariant(&plan);
    }

    #[test]
    fn duplicate_course_rejected() {
        let mut plan = SelectionPlan::new();
        plan.add(offering("a", &[(Monday, 1, 3)])).unwrap();
        assert_eq!(
            plan.add(offering("a", &[(Tuesday, 1, 3)])),
            Err(PlanError::DuplicateCourse("a".into()))
        );
    }

    #[test]
    fn terminal_non_enrolled_entries_free_their_slots() {
        let mut plan = SelectionPlan::new();
        plan.add(offering("a", &[(Monday, 1, 3)])).unwrap();
        plan.abandon(&"a".into(), AbandonReason::WindowClosed).unwrap();
        assert!(plan.can_add(&offering("b", &[(Monday, 1, 3)])));
        plan.add(offering("b", &[(Monday, 1, 3)])).unwrap();
        assert_invariant(&plan);
    }

    #[test]
    fn conflict_message_lists_every_clash() {
        let mut plan = SelectionPlan::new();
        plan.add(offering("a", &[(Monday, 1, 3)])).unwrap();
        plan.add(offering("b", &[(Tuesday, 1, 3)])).unwrap();
        let err = plan
            .add(offering("c", &[(Monday, 2, 3), (Tuesday, 2, 3)]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "'Course c' has a time conflict with Course a, Course b"
        );
    }

    // ── remove / clear ────────────────────────────────────────────────────────

    #[test]
    fn remove_only_while_pending() {
        let mut plan = SelectionPlan::new();
        plan.add(offering("a", &[(Monday, 1, 3)])).unwrap();
        plan.add(offering("b", &[(Tuesday, 1, 3)])).unwrap();
        plan.begin_attempt(&"a".into()).unwrap();

        assert!(matches!(
            plan.remove(&"a".into()),
            Err(PlanError::NotRemovable { .. })
        ));
        let removed = plan.remove(&"b".into()).unwrap();
        assert_eq!(removed.id(), &CourseId::from("b"));
        assert_eq!(
            plan.remove(&"zzz".into()).unwrap_err(),
            PlanError::UnknownEntry("zzz".into())
        );
    }

    #[test]
    fn clear_refused_while_in_flight() {
        let mut plan = SelectionPlan::new();
        plan.add(offering("a", &[(Monday, 1, 3)])).unwrap();
        plan.begin_attempt(&"a".into()).unwrap();
        assert!(plan.clear().is_err());
        plan.release_attempt(&"a".into()).unwrap();
        plan.clear().unwrap();
        assert!(plan.is_empty());
    }

    // ── cascade ───────────────────────────────────────────────────────────────

    #[test]
    fn enrolling_abandons_exactly_the_conflicting_pending_entries() {
        let mut plan = SelectionPlan::new();
        plan.add(offering("a", &[(Monday, 1, 3)])).unwrap();
        plan.add_fallback(offering("alt1", &[(Monday, 2, 4)])).unwrap();
        plan.add_fallback(offering("alt2", &[(Monday, 1, 2)])).unwrap();
        plan.add(offering("other", &[(Wednesday, 1, 3)])).unwrap();
        plan.add_fallback(offering("adjacent", &[(Monday, 3, 4)])).unwrap();

        let applied = plan.on_enrolled(&"a".into());

        assert_eq!(applied[0].new, EntryStatus::Enrolled);
        let abandoned: Vec<_> = applied[1..].iter().map(|t| t.id.as_str()).collect();
        assert_eq!(abandoned, ["alt1", "alt2"]);
        assert_eq!(
            status(&plan, "alt1"),
            EntryStatus::Abandoned(AbandonReason::SlotSuperseded {
                by: "Course a".into()
            })
        );
        assert_eq!(status(&plan, "other"), EntryStatus::Pending);
        assert_eq!(status(&plan, "adjacent"), EntryStatus::Pending);
        assert_invariant(&plan);
    }

    #[test]
    fn cascade_leaves_in_flight_siblings_alone() {
        let mut plan = SelectionPlan::new();
        plan.add(offering("a", &[(Monday, 1, 3)])).unwrap();
        plan.add_fallback(offering("b", &[(Monday, 1, 3)])).unwrap();
        plan.begin_attempt(&"b".into()).unwrap();

        let applied = plan.on_enrolled(&"a".into());
        assert_eq!(applied.len(), 1);
        assert_eq!(status(&plan, "b"), EntryStatus::InFlight);

        // a retryable failure on "b" now ends it instead of re-queueing it
        let t = plan.release_attempt(&"b".into()).unwrap();
        assert_eq!(t.old, EntryStatus::InFlight);
        assert_eq!(
            t.new,
            EntryStatus::Abandoned(AbandonReason::SlotSuperseded {
                by: "Course a".into()
            })
        );
    }

    #[test]
    fn second_overlapping_success_is_superseded_not_enrolled() {
        let mut plan = SelectionPlan::new();
        plan.add(offering("a", &[(Monday, 1, 3)])).unwrap();
        plan.add_fallback(offering("b", &[(Monday, 2, 4)])).unwrap();
        plan.begin_attempt(&"a".into()).unwrap();
        plan.begin_attempt(&"b".into()).unwrap();

        assert_eq!(plan.on_enrolled(&"a".into()).len(), 1);
        let applied = plan.on_enrolled(&"b".into());

        assert_eq!(applied.len(), 1);
        assert_eq!(
            applied[0].new,
            EntryStatus::Abandoned(AbandonReason::SlotSuperseded {
                by: "Course a".into()
            })
        );
        assert_eq!(status(&plan, "a"), EntryStatus::Enrolled);
        assert_invariant(&plan);
    }

    #[test]
    fn interrupt_releases_only_in_flight_entries() {
        let mut plan = SelectionPlan::new();
        plan.add(offering("a", &[(Monday, 1, 3)])).unwrap();
        plan.add(offering("b", &[(Tuesday, 1, 3)])).unwrap();
        plan.add(offering("c", &[(Friday, 1, 3)])).unwrap();
        plan.begin_attempt(&"a".into()).unwrap();
        plan.begin_attempt(&"c".into()).unwrap();
        plan.on_enrolled(&"c".into());

        let applied = plan.interrupt();

        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].id, CourseId::from("a"));
        assert_eq!(status(&plan, "a"), EntryStatus::Pending);
        assert_eq!(status(&plan, "b"), EntryStatus::Pending);
        assert_eq!(status(&plan, "c"), EntryStatus::Enrolled);
    }

    #[test]
    fn release_without_enrolled_overlap_returns_to_pending() {
        let mut plan = SelectionPlan::new();
        plan.add(offering("a", &[(Monday, 1, 3)])).unwrap();
        plan.add(offering("b", &[(Monday, 3, 5)])).unwrap();
        plan.on_enrolled(&"b".into());
        plan.begin_attempt(&"a".into()).unwrap();

        plan.release_attempt(&"a".into()).unwrap();
        assert_eq!(status(&plan, "a"), EntryStatus::Pending);
        assert_eq!(plan.get(&"a".into()).unwrap().attempts(), 1);
    }

    #[test]
    fn fallback_cannot_overlap_an_enrolled_entry() {
        let mut plan = SelectionPlan::new();
        plan.add(offering("a", &[(Monday, 1, 3)])).unwrap();
        plan.on_enrolled(&"a".into());
        assert!(matches!(
            plan.add_fallback(offering("b", &[(Monday, 2, 3)])),
            Err(PlanError::Conflict { .. })
        ));
    }

    #[test]
    fn invariant_holds_over_mixed_add_and_enroll_sequence() {
        let mut plan = SelectionPlan::new();
        let days = [Monday, Tuesday, Wednesday];
        for i in 0..12u8 {
            let day = days[usize::from(i % 3)];
            let start = (i * 2) % 10 + 1;
            let id = format!("c{i}");
            let _ = plan.add(offering(&id, &[(day, start, start + 3)]));
            if i % 4 == 3 {
                if let Some(first) = plan.pending_ids().first().cloned() {
                    plan.on_enrolled(&first);
                }
            }
            assert_invariant(&plan);
        }
    }

    // ── lifecycle ─────────────────────────────────────────────────────────────

    #[test]
    fn terminal_entries_ignore_further_transitions() {
        let mut plan = SelectionPlan::new();
        plan.add(offering("a", &[(Monday, 1, 3)])).unwrap();
        plan.reject(&"a".into(), RejectReason::Denied("nope".into()))
            .unwrap();

        assert!(plan.begin_attempt(&"a".into()).is_none());
        assert!(plan.on_enrolled(&"a".into()).is_empty());
        assert!(plan.close_window().is_empty());
        assert_eq!(plan.get(&"a".into()).unwrap().attempts(), 0);
    }

    #[test]
    fn close_window_abandons_pending_and_in_flight() {
        let mut plan = SelectionPlan::new();
        plan.add(offering("a", &[(Monday, 1, 3)])).unwrap();
        plan.add(offering("b", &[(Tuesday, 1, 3)])).unwrap();
        plan.add(offering("c", &[(Friday, 1, 3)])).unwrap();
        plan.begin_attempt(&"b".into()).unwrap();
        plan.on_enrolled(&"c".into());

        let applied = plan.close_window();
        assert_eq!(applied.len(), 2);
        assert!(plan.all_terminal());
        assert_eq!(
            status(&plan, "a"),
            EntryStatus::Abandoned(AbandonReason::WindowClosed)
        );
        assert_eq!(status(&plan, "c"), EntryStatus::Enrolled);
    }

    #[test]
    fn snapshot_tally_counts_terminal_states() {
        let mut plan = SelectionPlan::new();
        plan.add(offering("a", &[(Monday, 1, 3)])).unwrap();
        plan.add(offering("b", &[(Tuesday, 1, 3)])).unwrap();
        plan.add(offering("c", &[(Friday, 1, 3)])).unwrap();
        plan.on_enrolled(&"a".into());
        plan.reject(&"b".into(), RejectReason::Conflict("x".into()));
        plan.close_window();

        let snap = plan.snapshot();
        assert_eq!(snap.tally(), (1, 1, 1));
        assert_eq!(snap.enrolled().count(), 1);
        assert_eq!(snap.status_of(&"a".into()), Some(&EntryStatus::Enrolled));
    }
}
