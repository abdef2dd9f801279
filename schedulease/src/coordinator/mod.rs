/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Coordinator: the single `run` entry point used by the front end.
//!
//! `run` takes the caller's plan, spawns one [`SubmissionScheduler`] task per
//! Pending entry (in priority order), streams every status change to the
//! caller's progress callback, and returns once every entry is terminal or
//! the window has closed, whichever comes first.  At window close all still
//! open entries become `Abandoned(window closed)` and their tasks are
//! aborted.
//!
//! The callback runs on its own task fed by an unbounded channel, so a slow
//! renderer delays nothing but its own output.  All events are delivered
//! before `run` returns.
//!
//! Entries added to the plan after `run` starts are not picked up; call
//! `run` again.
//!
//! Dropping the `run` future cancels the run.  The caller's plan is handed
//! back in whatever state it reached; attempts that were in flight are
//! released to Pending, so a later `run` retries them.

use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::client::EnrollmentClient;
use crate::plan::{PlanSnapshot, SelectionPlan};
use crate::scheduler::{
    Clock, ConfigurationError, SchedulerSettings, SharedPlan, SubmissionScheduler,
};

pub use crate::scheduler::{ProgressEvent, Window};

/// Holds the caller's plan for the duration of a run and puts it back when
/// dropped, whether `run` finished or its future was dropped.
struct PlanLease<'a> {
    shared: SharedPlan,
    slot: &'a mut SelectionPlan,
}

impl Drop for PlanLease<'_> {
    fn drop(&mut self) {
        let released = self.shared.interrupt();
        if released > 0 {
            warn!(released, "run cancelled; in-flight attempts returned to pending");
        }
        *self.slot = self.shared.take_plan();
    }
}

pub struct Coordinator {
    scheduler: Arc<SubmissionScheduler>,
    rng: Mutex<StdRng>,
}

impl Coordinator {
    /// # Errors
    /// [`ConfigurationError`] if `settings` do not validate.
    pub fn new(
        client: Arc<dyn EnrollmentClient>,
        clock: Arc<dyn Clock>,
        settings: SchedulerSettings,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self {
            scheduler: Arc::new(SubmissionScheduler::new(client, clock, settings)?),
            rng: Mutex::new(StdRng::from_entropy()),
        })
    }

    /// Fix the random source (backoff jitter, start spread) for reproducible
    /// runs.
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    /// Run every Pending entry of `plan` through the window
    /// `[deadline, window_end)`.
    ///
    /// `plan` is updated in place with the final statuses; the returned
    /// snapshot is a copy of that final state.
    ///
    /// # Errors
    /// [`ConfigurationError::InvalidWindow`] if `window_end <= deadline`.
    /// Nothing is submitted in that case.
    pub async fn run<F>(
        &self,
        plan: &mut SelectionPlan,
        deadline: Instant,
        window_end: Instant,
        mut progress: F,
    ) -> Result<PlanSnapshot, ConfigurationError>
    where
        F: FnMut(ProgressEvent) + Send + 'static,
    {
        let window = Window::new(deadline, window_end)?;
        let clock = Arc::clone(self.scheduler.clock());

        let (tx, mut rx) = mpsc::unbounded_channel();
        let forwarder = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                progress(event);
            }
        });

        let lease = PlanLease {
            shared: SharedPlan::new(std::mem::take(plan), Arc::clone(&clock), tx),
            slot: &mut *plan,
        };
        let shared = &lease.shared;
        let ids = shared.pending_ids();
        info!(
            entries = ids.len(),
            window_secs = window.length().as_secs_f64(),
            "=== Coordinator::run() ==="
        );

        let mut tasks = JoinSet::new();
        for id in ids {
            let rng = StdRng::seed_from_u64(self.next_seed());
            let task = Arc::clone(&self.scheduler).run_entry(id, shared.clone(), window, rng);
            tasks.spawn(task);
        }

        let mut close = clock.sleep_until(window.closes);
        let mut window_closed = false;
        while !shared.all_terminal() {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    Some(Ok(())) => {}
                    Some(Err(e)) if e.is_panic() => error!("entry task panicked: {e}"),
                    Some(Err(_)) => {}
                    None => {
                        // Every task exited but something is still open.
                        (&mut close).await;
                        window_closed = true;
                        break;
                    }
                },
                () = &mut close => {
                    window_closed = true;
                    break;
                }
            }
        }

        if window_closed {
            let closed = shared.close_window();
            if closed > 0 {
                warn!(closed, "window closed with entries still open");
            }
        }
        tasks.shutdown().await;

        // Last sender goes with the lease, which lets the forwarder drain.
        drop(lease);
        if let Err(e) = forwarder.await {
            error!("progress forwarder failed: {e}");
        }

        let snapshot = plan.snapshot();
        let (enrolled, rejected, abandoned) = snapshot.tally();
        info!(enrolled, rejected, abandoned, "=== Run complete ===");
        Ok(snapshot)
    }

    fn next_seed(&self) -> u64 {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).gen()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
