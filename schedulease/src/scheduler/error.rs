/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Configuration errors.  Raised before any task is spawned; fatal to the
//! call that hit them.
//!
//! Per-attempt failures are **not** errors: they are
//! [`AttemptOutcome`](crate::client::AttemptOutcome) values consumed by the
//! scheduler's state machine and surface only as terminal entry statuses.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    /// The window must close strictly after it opens.
    #[error("window end must be strictly after the start instant")]
    InvalidWindow,

    #[error("max_attempts must be at least 1")]
    ZeroAttempts,

    #[error("base delay {base:?} exceeds maximum delay {cap:?}")]
    BaseExceedsCap { base: Duration, cap: Duration },

    #[error("jitter {0} is outside [0, 1)")]
    JitterOutOfRange(f64),

    #[error("attempt timeout must be non-zero")]
    ZeroTimeout,

    #[error("max_in_flight must be at least 1")]
    ZeroInFlight,
}
