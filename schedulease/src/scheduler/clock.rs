/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Monotonic time source for the scheduler.
//!
//! Deadlines are absolute [`Instant`]s on the monotonic clock, never wall
//! clock, so NTP steps or manual clock changes cannot shift the burst.
//! The clock is injected so tests can drive it; [`TokioClock`] delegates to
//! `tokio::time`, which honours `tokio::time::pause()` in tests.

use async_trait::async_trait;
use tokio::time::Instant;

#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    /// Resolve at `deadline`, or immediately if it has already passed.
    async fn sleep_until(&self, deadline: Instant);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&self, deadline: Instant) {
        tokio::time::sleep_until(deadline).await;
    }
}
