/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Submission scheduler: one timed attempt loop per plan entry.
//!
//! Each entry runs the state machine below as its own tokio task.  Tasks are
//! independent; they share only the [`SharedPlan`] (status updates and the
//! enrollment cascade) and a semaphore capping simultaneous submissions.
//!
//! ```text
//!  sleep_until(opens + spread)
//!          │
//!          ▼
//!  ┌─► still Pending? ── no ──► exit (cancelled)
//!  │       │ yes
//!  │   acquire permit, Pending → InFlight
//!  │       │
//!  │   submit ∥ attempt timeout
//!  │       │
//!  │       ├─ Success            → Enrolled (+ cascade), exit
//!  │       ├─ Conflict / Denied  → Rejected, exit
//!  │       └─ Full / Transient   → Pending
//!  │              │
//!  │      attempts left and retry window open?
//!  │              ├─ no  → Abandoned(retries exhausted), exit
//!  └── backoff ◄──┘ yes
//! ```
//!
//! Cancellation is cooperative: a task re-reads its entry's status before and
//! after every attempt and simply stops when the entry went terminal behind
//! its back (cascade or window close).  A stopped task reports nothing.
//!
//! # Example
//! ```rust,ignore
//! let scheduler = Arc::new(SubmissionScheduler::new(client, Arc::new(TokioClock), settings)?);
//! tokio::spawn(scheduler.clone().run_entry(id, shared, window, rng));
//! ```

pub mod clock;
pub mod error;
pub mod handle;
pub mod policy;

pub use clock::{Clock, TokioClock};
pub use error::ConfigurationError;
pub use handle::{ProgressEvent, SharedPlan};
pub use policy::{RetryPolicy, SchedulerSettings};

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::client::{AttemptOutcome, EnrollmentClient};
use crate::course::CourseId;
use crate::plan::{AbandonReason, RejectReason, RetryCause};

// ── Window ────────────────────────────────────────────────────────────────────

/// The enrollment window on the monotonic clock: attempts start at `opens`
/// and everything still open at `closes` is abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub opens: Instant,
    pub closes: Instant,
}

impl Window {
    /// # Errors
    /// [`ConfigurationError::InvalidWindow`] unless `closes > opens`.
    pub fn new(opens: Instant, closes: Instant) -> Result<Self, ConfigurationError> {
        if closes <= opens {
            return Err(ConfigurationError::InvalidWindow);
        }
        Ok(Self { opens, closes })
    }

    pub fn length(&self) -> Duration {
        self.closes - self.opens
    }
}

// ── SubmissionScheduler ───────────────────────────────────────────────────────

pub struct SubmissionScheduler {
    client: Arc<dyn EnrollmentClient>,
    clock: Arc<dyn Clock>,
    settings: SchedulerSettings,
    permits: Arc<Semaphore>,
}

impl SubmissionScheduler {
    /// # Errors
    /// Any [`ConfigurationError`] from [`SchedulerSettings::validate`].
    pub fn new(
        client: Arc<dyn EnrollmentClient>,
        clock: Arc<dyn Clock>,
        settings: SchedulerSettings,
    ) -> Result<Self, ConfigurationError> {
        settings.validate()?;
        let permits = Arc::new(Semaphore::new(settings.max_in_flight));
        Ok(Self {
            client,
            clock,
            settings,
            permits,
        })
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Drive one entry from its first attempt to a terminal state (or until
    /// it is cancelled).
    pub async fn run_entry(
        self: Arc<Self>,
        id: CourseId,
        plan: SharedPlan,
        window: Window,
        mut rng: StdRng,
    ) {
        let policy = &self.settings.retry;
        let retry_until = policy
            .retry_window
            .map_or(window.closes, |w| (window.opens + w).min(window.closes));

        let first = window.opens + self.settings.start_offset(&mut rng);
        self.clock.sleep_until(first).await;

        loop {
            if !plan.is_pending(&id) || self.clock.now() >= window.closes {
                debug!(course = %id, "task stopping: entry no longer pending or window over");
                return;
            }

            let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
                return;
            };
            let Some(attempt) = plan.begin_attempt(&id) else {
                debug!(course = %id, "entry closed while waiting for a submission slot");
                return;
            };

            debug!(course = %id, attempt, "submitting");
            let outcome = self.submit_with_timeout(&id).await;
            drop(permit);

            let cause = match outcome {
                AttemptOutcome::Success => {
                    if plan.enrolled(&id) {
                        info!(course = %id, attempt, "✓ enrolled");
                    } else {
                        warn!(course = %id, attempt, "enrollment succeeded after entry was closed or superseded");
                    }
                    return;
                }
                AttemptOutcome::Conflict(msg) => {
                    warn!(course = %id, attempt, reason = %msg, "✗ rejected: conflict");
                    plan.reject(&id, RejectReason::Conflict(msg));
                    return;
                }
                AttemptOutcome::Denied(msg) => {
                    warn!(course = %id, attempt, reason = %msg, "✗ rejected: denied");
                    plan.reject(&id, RejectReason::Denied(msg));
                    return;
                }
                AttemptOutcome::Full => RetryCause::Full,
                AttemptOutcome::TransientError(msg) => RetryCause::Transient(msg),
            };

            if !plan.release_attempt(&id) {
                return;
            }

            let now = self.clock.now();
            if now >= window.closes {
                return;
            }
            if attempt >= policy.max_attempts || now >= retry_until {
                info!(course = %id, attempts = attempt, last = ?cause, "retries exhausted");
                plan.abandon(
                    &id,
                    AbandonReason::RetriesExhausted {
                        attempts: attempt,
                        last: cause,
                    },
                );
                return;
            }

            let delay = policy.backoff_delay(attempt, &mut rng);
            info!(
                course   = %id,
                attempt,
                cause    = ?cause,
                delay_ms = policy::saturating_millis(delay),
                "retrying after backoff"
            );
            self.clock.sleep_until(now + delay).await;
        }
    }

    /// Race the client against the attempt timeout; expiry is a transient
    /// failure.
    async fn submit_with_timeout(&self, id: &CourseId) -> AttemptOutcome {
        let timeout = self.settings.retry.attempt_timeout;
        let expires = self.clock.now() + timeout;
        tokio::select! {
            outcome = self.client.submit(id) => outcome,
            () = self.clock.sleep_until(expires) => {
                AttemptOutcome::TransientError(format!("no reply within {}ms", timeout.as_millis()))
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
