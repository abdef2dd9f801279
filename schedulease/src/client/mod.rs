/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Enrollment client boundary.
//!
//! The network implementation lives outside this crate.  Whatever it does
//! internally, it must hand the scheduler a closed [`AttemptOutcome`]: raw
//! replies are interpreted exactly once, here at the boundary (see
//! [`response::classify`]), and transport failures become
//! [`AttemptOutcome::TransientError`] instead of escaping as errors.

pub mod response;
pub mod scripted;

pub use scripted::ScriptedClient;

use std::fmt;

use async_trait::async_trait;

use crate::course::CourseId;

// ── AttemptOutcome ────────────────────────────────────────────────────────────

/// Result of one enrollment submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Seat secured.
    Success,
    /// Capacity exhausted right now.  Retryable: seats free up as other
    /// students drop.
    Full,
    /// Server-side conflict (timetable clash, already elected).  Final.
    Conflict(String),
    /// Network failure, 5xx, timeout, or "election not open yet".  Retryable.
    TransientError(String),
    /// Authentication or policy refusal.  Final.
    Denied(String),
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptOutcome::Success => f.write_str("success"),
            AttemptOutcome::Full => f.write_str("full"),
            AttemptOutcome::Conflict(m) => write!(f, "conflict: {m}"),
            AttemptOutcome::TransientError(m) => write!(f, "transient error: {m}"),
            AttemptOutcome::Denied(m) => write!(f, "denied: {m}"),
        }
    }
}

// ── EnrollmentClient ──────────────────────────────────────────────────────────

/// Submits one enrollment request.
///
/// Implementations should return promptly, but the scheduler does not rely on
/// it: every call is raced against the configured per-attempt timeout and
/// a timeout is recorded as `TransientError`.
#[async_trait]
pub trait EnrollmentClient: Send + Sync {
    async fn submit(&self, course: &CourseId) -> AttemptOutcome;
}

#[async_trait]
impl<T: EnrollmentClient + ?Sized> EnrollmentClient for std::sync::Arc<T> {
    async fn submit(&self, course: &CourseId) -> AttemptOutcome {
        (**self).submit(course).await
    }
}
