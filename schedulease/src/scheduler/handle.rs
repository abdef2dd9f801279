/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The single update channel between scheduler tasks and the plan.
//!
//! [`SharedPlan`] owns the [`SelectionPlan`] behind one mutex.  Every status
//! change, including the enrollment cascade, happens inside that lock, so at
//! most one enrollment can cascade at a time.  Each applied [`Transition`] is
//! stamped and pushed into an unbounded channel while the lock is still
//! held: event order always matches state order, and a slow consumer never
//! blocks a submission task.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;

use super::clock::Clock;
use crate::course::CourseId;
use crate::plan::{
    AbandonReason, EntryStatus, PlanSnapshot, RejectReason, SelectionPlan, Transition,
};

// ── ProgressEvent ─────────────────────────────────────────────────────────────

/// One status change, as streamed to the progress sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub id: CourseId,
    pub old: EntryStatus,
    pub new: EntryStatus,
    pub at: Instant,
}

// ── SharedPlan ────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct SharedPlan {
    plan: Arc<Mutex<SelectionPlan>>,
    events: UnboundedSender<ProgressEvent>,
    clock: Arc<dyn Clock>,
}

impl SharedPlan {
    pub fn new(
        plan: SelectionPlan,
        clock: Arc<dyn Clock>,
        events: UnboundedSender<ProgressEvent>,
    ) -> Self {
        Self {
            plan: Arc::new(Mutex::new(plan)),
            events,
            clock,
        }
    }

    pub fn status(&self, id: &CourseId) -> Option<EntryStatus> {
        self.lock().get(id).map(|e| e.status().clone())
    }

    pub fn is_pending(&self, id: &CourseId) -> bool {
        self.status(id) == Some(EntryStatus::Pending)
    }

    pub fn pending_ids(&self) -> Vec<CourseId> {
        self.lock().pending_ids()
    }

    pub fn all_terminal(&self) -> bool {
        self.lock().all_terminal()
    }

    pub fn snapshot(&self) -> PlanSnapshot {
        self.lock().snapshot()
    }

    /// Pending → InFlight.  Returns the attempt number, or `None` if the
    /// entry is no longer Pending.
    pub fn begin_attempt(&self, id: &CourseId) -> Option<u32> {
        let mut plan = self.lock();
        let t = plan.begin_attempt(id)?;
        self.publish(t);
        plan.get(id).map(|e| e.attempts())
    }

    /// InFlight → Pending.  `false` if the entry was closed meanwhile or
    /// lost its slot to an enrolled sibling.
    pub fn release_attempt(&self, id: &CourseId) -> bool {
        let mut plan = self.lock();
        match plan.release_attempt(id) {
            Some(t) => {
                let back_to_pending = t.new == EntryStatus::Pending;
                self.publish(t);
                back_to_pending
            }
            None => false,
        }
    }

    /// Enroll and cascade.  `false` if the entry was already terminal or an
    /// overlapping sibling enrolled first.
    pub fn enrolled(&self, id: &CourseId) -> bool {
        let mut plan = self.lock();
        let applied = plan.on_enrolled(id);
        let won = applied
            .first()
            .is_some_and(|t| t.new == EntryStatus::Enrolled);
        applied.into_iter().for_each(|t| self.publish(t));
        won
    }

    pub fn reject(&self, id: &CourseId, reason: RejectReason) -> bool {
        let mut plan = self.lock();
        plan.reject(id, reason).map(|t| self.publish(t)).is_some()
    }

    pub fn abandon(&self, id: &CourseId, reason: AbandonReason) -> bool {
        let mut plan = self.lock();
        plan.abandon(id, reason).map(|t| self.publish(t)).is_some()
    }

    /// Abandon everything still open; returns how many entries were closed.
    pub fn close_window(&self) -> usize {
        let mut plan = self.lock();
        let applied = plan.close_window();
        let n = applied.len();
        applied.into_iter().for_each(|t| self.publish(t));
        n
    }

    /// Release in-flight attempts of a cancelled run; returns how many.
    pub fn interrupt(&self) -> usize {
        let mut plan = self.lock();
        let applied = plan.interrupt();
        let n = applied.len();
        applied.into_iter().for_each(|t| self.publish(t));
        n
    }

    /// Move the plan out, leaving an empty one behind.
    pub fn take_plan(&self) -> SelectionPlan {
        std::mem::take(&mut *self.lock())
    }

    fn publish(&self, t: Transition) {
        let event = ProgressEvent {
            id: t.id,
            old: t.old,
            new: t.new,
            at: self.clock.now(),
        };
        // Receiver gone means nobody is watching; state is already updated.
        let _ = self.events.send(event);
    }

    fn lock(&self) -> MutexGuard<'_, SelectionPlan> {
        self.plan.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
