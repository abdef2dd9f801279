/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Per-entry state: [`EntryStatus`], its terminal reasons, and
//! [`SelectionEntry`].
//!
//! ```text
//!            ┌──────── retryable failure ────────┐
//!            ▼                                   │
//!        Pending ──── begin attempt ────►  InFlight
//!            │                                   │
//!            └──────────────┬────────────────────┘
//!                           ▼
//!          Enrolled | Rejected(reason) | Abandoned(reason)     (terminal)
//! ```
//!
//! Status only ever moves forward, except the `InFlight → Pending` reset
//! after a retryable failure.  Once terminal, an entry never changes again.

use std::fmt;
use std::sync::Arc;

use crate::course::{CourseId, CourseOffering};
use crate::timetable::TimeSlot;

// ── Reasons ───────────────────────────────────────────────────────────────────

/// Why the service refused an entry outright.  Never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Server-side conflict: clashing timetable, already elected, etc.
    Conflict(String),
    /// Authentication or policy refusal.
    Denied(String),
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Conflict(msg) => write!(f, "conflict reported by service: {msg}"),
            RejectReason::Denied(msg) => write!(f, "denied by service: {msg}"),
        }
    }
}

/// The kind of retryable failure seen on the last attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryCause {
    Full,
    Transient(String),
}

/// Why the scheduler gave up on an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbandonReason {
    /// A sibling entry with overlapping slots enrolled first.
    SlotSuperseded { by: String },

    /// Attempt or retry-window ceiling reached after retryable failures.
    RetriesExhausted { attempts: u32, last: RetryCause },

    /// The enrollment window ended before the entry reached a terminal state.
    WindowClosed,
}

impl fmt::Display for AbandonReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbandonReason::SlotSuperseded { by } => write!(f, "slot superseded by {by}"),
            AbandonReason::RetriesExhausted {
                attempts,
                last: RetryCause::Full,
            } => write!(f, "retries exhausted: class full after {attempts} attempts"),
            AbandonReason::RetriesExhausted {
                attempts,
                last: RetryCause::Transient(detail),
            } => write!(
                f,
                "retries exhausted: transient error after {attempts} attempts ({detail})"
            ),
            AbandonReason::WindowClosed => f.write_str("window closed"),
        }
    }
}

// ── EntryStatus ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryStatus {
    Pending,
    InFlight,
    Enrolled,
    Rejected(RejectReason),
    Abandoned(AbandonReason),
}

impl EntryStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EntryStatus::Enrolled | EntryStatus::Rejected(_) | EntryStatus::Abandoned(_)
        )
    }

    /// Pending, InFlight and Enrolled entries hold (or are trying to hold)
    /// their slots.
    pub fn occupies_slots(&self) -> bool {
        matches!(
            self,
            EntryStatus::Pending | EntryStatus::InFlight | EntryStatus::Enrolled
        )
    }

    /// Whether moving from `self` to `next` is a legal lifecycle step.
    pub fn can_become(&self, next: &EntryStatus) -> bool {
        match (self, next) {
            (EntryStatus::Pending, EntryStatus::InFlight) => true,
            (EntryStatus::InFlight, EntryStatus::Pending) => true,
            (EntryStatus::Pending | EntryStatus::InFlight, n) => n.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryStatus::Pending => f.write_str("pending"),
            EntryStatus::InFlight => f.write_str("in-flight"),
            EntryStatus::Enrolled => f.write_str("enrolled"),
            EntryStatus::Rejected(r) => write!(f, "rejected ({r})"),
            EntryStatus::Abandoned(r) => write!(f, "abandoned ({r})"),
        }
    }
}

// ── SelectionEntry ────────────────────────────────────────────────────────────

/// A planned course plus its live enrollment state.
///
/// Only [`SelectionPlan`](super::SelectionPlan) mutates entries; everything
/// outside the plan sees them through `&SelectionEntry` or a cloned snapshot.
#[derive(Debug, Clone)]
pub struct SelectionEntry {
    offering: Arc<CourseOffering>,
    status: EntryStatus,
    attempts: u32,
    fallback: bool,
}

impl SelectionEntry {
    pub(super) fn new(offering: Arc<CourseOffering>, fallback: bool) -> Self {
        Self {
            offering,
            status: EntryStatus::Pending,
            attempts: 0,
            fallback,
        }
    }

    pub fn id(&self) -> &CourseId {
        &self.offering.id
    }

    pub fn name(&self) -> &str {
        &self.offering.name
    }

    pub fn slots(&self) -> &[TimeSlot] {
        &self.offering.slots
    }

    pub fn offering(&self) -> &Arc<CourseOffering> {
        &self.offering
    }

    pub fn status(&self) -> &EntryStatus {
        &self.status
    }

    /// Number of submissions started for this entry.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// `true` if the entry was added with
    /// [`add_fallback`](super::SelectionPlan::add_fallback).
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    /// Apply `next` if the lifecycle allows it; returns the previous status.
    pub(super) fn advance(&mut self, next: EntryStatus) -> Option<EntryStatus> {
        if !self.status.can_become(&next) {
            return None;
        }
        if next == EntryStatus::InFlight {
            self.attempts += 1;
        }
        Some(std::mem::replace(&mut self.status, next))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
