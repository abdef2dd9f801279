/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Errors raised synchronously by [`SelectionPlan`](super::SelectionPlan)
//! edits.  All of them are recoverable: the user picks differently and tries
//! again.

use thiserror::Error;

use super::entry::EntryStatus;
use crate::course::CourseId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// The candidate overlaps one or more entries that hold their slots.
    #[error("'{candidate}' has a time conflict with {}", .conflicts_with.join(", "))]
    Conflict {
        candidate: String,
        conflicts_with: Vec<String>,
    },

    #[error("course {0} is already in the plan")]
    DuplicateCourse(CourseId),

    #[error("course {0} is not in the plan")]
    UnknownEntry(CourseId),

    /// Only Pending entries may be removed; InFlight blocks `clear()`.
    #[error("course {id} cannot be removed while {status}")]
    NotRemovable { id: CourseId, status: EntryStatus },
}
