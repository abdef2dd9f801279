/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Retry / backoff policy and scheduler-wide settings.
//!
//! # Backoff
//! After the `n`-th failed attempt (1-based) the next attempt waits
//!
//! ```text
//! nominal(n) = min(base × 2^(n-1), cap)
//! delay(n)   = nominal(n) × U(1 − jitter, 1 + jitter)
//! ```
//!
//! With the defaults (200 ms base, 3 s cap, ±20 %) the nominal sequence is
//! 200, 400, 800, 1600, 3000, 3000 … ms.  Jitter spreads competing clients
//! that all fire at the same opening second.
//!
//! # Defaults
//! | Setting | Default |
//! |---|---|
//! | `max_attempts` | 6 |
//! | `base_delay` | 200 ms |
//! | `max_delay` | 3 s |
//! | `jitter` | 0.2 |
//! | `attempt_timeout` | 5 s |
//! | `retry_window` | until window end |
//! | `max_in_flight` | 4 |
//! | `start_spread` | 0 |

use std::time::Duration;

use rand::Rng;

use super::error::ConfigurationError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 6;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(200);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(3);
pub const DEFAULT_JITTER: f64 = 0.2;
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;

/// Exponent cap; `2^16 × base` is far past any sane cap already.
const MAX_EXPONENT: u32 = 16;

// ── RetryPolicy ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Hard ceiling on submissions per entry (first attempt included).
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Fractional jitter in `[0, 1)`; `0.0` disables it.
    pub jitter: f64,
    /// Per-attempt reply bound; expiry counts as a transient error.
    pub attempt_timeout: Duration,
    /// Retries stop once `window start + retry_window` has passed.  `None`
    /// retries until the window closes.
    pub retry_window: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            jitter: DEFAULT_JITTER,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            retry_window: None,
        }
    }
}

impl RetryPolicy {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_attempts == 0 {
            return Err(ConfigurationError::ZeroAttempts);
        }
        if self.base_delay > self.max_delay {
            return Err(ConfigurationError::BaseExceedsCap {
                base: self.base_delay,
                cap: self.max_delay,
            });
        }
        if !(0.0..1.0).contains(&self.jitter) {
            return Err(ConfigurationError::JitterOutOfRange(self.jitter));
        }
        if self.attempt_timeout.is_zero() {
            return Err(ConfigurationError::ZeroTimeout);
        }
        Ok(())
    }

    /// Un-jittered delay after `failures` failed attempts (`failures >= 1`).
    pub fn nominal_delay(&self, failures: u32) -> Duration {
        let exp = failures.saturating_sub(1).min(MAX_EXPONENT);
        self.base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay)
    }

    /// Jittered delay after `failures` failed attempts.
    pub fn backoff_delay<R: Rng + ?Sized>(&self, failures: u32, rng: &mut R) -> Duration {
        let nominal = self.nominal_delay(failures);
        if self.jitter == 0.0 {
            return nominal;
        }
        let factor = rng.gen_range((1.0 - self.jitter)..=(1.0 + self.jitter));
        nominal.mul_f64(factor)
    }
}

// ── SchedulerSettings ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerSettings {
    pub retry: RetryPolicy,
    /// Cap on simultaneous submissions across all entries.
    pub max_in_flight: usize,
    /// Each entry's first attempt is delayed by `U(0, start_spread)` after the
    /// window opens.
    pub start_spread: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            start_spread: Duration::ZERO,
        }
    }
}

impl SchedulerSettings {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.retry.validate()?;
        if self.max_in_flight == 0 {
            return Err(ConfigurationError::ZeroInFlight);
        }
        Ok(())
    }

    /// Random offset of an entry's first attempt.
    pub fn start_offset<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.start_spread.is_zero() {
            return Duration::ZERO;
        }
        let max_ms = saturating_millis(self.start_spread);
        Duration::from_millis(rng.gen_range(0..=max_ms))
    }
}

/// Whole milliseconds of `d`, clamped to `u64::MAX`.
pub fn saturating_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn defaults_match_documented_values() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_attempts, 6);
        assert_eq!(p.base_delay, ms(200));
        assert_eq!(p.max_delay, ms(3_000));
        assert_eq!(p.jitter, 0.2);
        assert_eq!(p.attempt_timeout, ms(5_000));
        assert_eq!(p.retry_window, None);
        let s = SchedulerSettings::default();
        assert_eq!(s.max_in_flight, 4);
        assert_eq!(s.start_spread, Duration::ZERO);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn nominal_delay_doubles_then_caps() {
        let p = RetryPolicy::default();
        let seq: Vec<_> = (1..=7).map(|n| p.nominal_delay(n)).collect();
        assert_eq!(
            seq,
            [ms(200), ms(400), ms(800), ms(1_600), ms(3_000), ms(3_000), ms(3_000)]
        );
        assert_eq!(p.nominal_delay(1_000), ms(3_000), "huge counts must not overflow");
    }

    #[test]
    fn jitter_stays_within_twenty_percent() {
        let p = RetryPolicy::default();
        let mut rng = StdRng::seed_from_u64(7);
        for n in 1..=6 {
            let nominal = p.nominal_delay(n).as_secs_f64();
            for _ in 0..200 {
                let d = p.backoff_delay(n, &mut rng).as_secs_f64();
                assert!(
                    d >= nominal * 0.8 - 1e-9 && d <= nominal * 1.2 + 1e-9,
                    "delay {d} outside ±20% of {nominal}"
                );
            }
        }
    }

    #[test]
    fn zero_jitter_is_exact() {
        let p = RetryPolicy {
            jitter: 0.0,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(p.backoff_delay(3, &mut rng), ms(800));
    }

    #[test]
    fn consecutive_jittered_delays_increase_below_cap() {
        let p = RetryPolicy::default();
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..100 {
            let d1 = p.backoff_delay(1, &mut rng);
            let d2 = p.backoff_delay(2, &mut rng);
            let d3 = p.backoff_delay(3, &mut rng);
            assert!(d1 < d2 && d2 < d3, "{d1:?} {d2:?} {d3:?}");
        }
    }

    #[test]
    fn validation_rejects_bad_values() {
        let bad = |f: fn(&mut SchedulerSettings)| {
            let mut s = SchedulerSettings::default();
            f(&mut s);
            s.validate().unwrap_err()
        };
        assert_eq!(bad(|s| s.retry.max_attempts = 0), ConfigurationError::ZeroAttempts);
        assert!(matches!(
            bad(|s| s.retry.base_delay = ms(5_000)),
            ConfigurationError::BaseExceedsCap { .. }
        ));
        assert_eq!(
            bad(|s| s.retry.jitter = 1.0),
            ConfigurationError::JitterOutOfRange(1.0)
        );
        assert_eq!(
            bad(|s| s.retry.jitter = -0.1),
            ConfigurationError::JitterOutOfRange(-0.1)
        );
        assert_eq!(
            bad(|s| s.retry.attempt_timeout = Duration::ZERO),
            ConfigurationError::ZeroTimeout
        );
        assert_eq!(bad(|s| s.max_in_flight = 0), ConfigurationError::ZeroInFlight);
    }

    #[test]
    fn millisecond_conversion_saturates() {
        assert_eq!(saturating_millis(ms(1_600)), 1_600);
        assert_eq!(saturating_millis(Duration::from_micros(2_999)), 2);
        assert_eq!(saturating_millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn start_offset_is_bounded() {
        let s = SchedulerSettings {
            start_spread: ms(250),
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            assert!(s.start_offset(&mut rng) <= ms(250));
        }
        let zero = SchedulerSettings::default();
        assert_eq!(zero.start_offset(&mut rng), Duration::ZERO);
    }
}
