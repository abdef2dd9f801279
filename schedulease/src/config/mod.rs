/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Loading of scheduler settings and the course catalog from YAML.
//!
//! Scheduler settings (every key optional):
//! ```yaml
//! max_attempts: 6
//! base_delay_ms: 200
//! max_delay_ms: 3000
//! jitter: 0.2
//! attempt_timeout_ms: 5000
//! max_in_flight: 4
//! retry_window_secs: 120   # omit to retry until the window closes
//! start_spread_ms: 0
//! ```
//!
//! Catalog:
//! ```yaml
//! - id: "30412"
//!   name: "Operating Systems"
//!   capacity: 120
//!   slots:
//!     - { day: 1, start: 3, end: 5 }        # Monday, periods 3-4
//!     - { day: Thursday, start: 1, end: 3 }
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::course::{Catalog, CourseOffering};
use crate::scheduler::policy::{
    saturating_millis, DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_BASE_DELAY, DEFAULT_JITTER,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY, DEFAULT_MAX_IN_FLIGHT,
};
use crate::scheduler::{RetryPolicy, SchedulerSettings};

// ── Private YAML deserialization types ────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SchedulerConfigFile {
    max_attempts: Option<u32>,
    base_delay_ms: Option<u64>,
    max_delay_ms: Option<u64>,
    jitter: Option<f64>,
    attempt_timeout_ms: Option<u64>,
    max_in_flight: Option<usize>,
    retry_window_secs: Option<u64>,
    start_spread_ms: Option<u64>,
}

impl SchedulerConfigFile {
    fn into_settings(self) -> SchedulerSettings {
        let ms = Duration::from_millis;
        SchedulerSettings {
            retry: RetryPolicy {
                max_attempts: self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
                base_delay: self.base_delay_ms.map_or(DEFAULT_BASE_DELAY, ms),
                max_delay: self.max_delay_ms.map_or(DEFAULT_MAX_DELAY, ms),
                jitter: self.jitter.unwrap_or(DEFAULT_JITTER),
                attempt_timeout: self.attempt_timeout_ms.map_or(DEFAULT_ATTEMPT_TIMEOUT, ms),
                retry_window: self.retry_window_secs.map(Duration::from_secs),
            },
            max_in_flight: self.max_in_flight.unwrap_or(DEFAULT_MAX_IN_FLIGHT),
            start_spread: self.start_spread_ms.map_or(Duration::ZERO, ms),
        }
    }
}

// ── ConfigManager ─────────────────────────────────────────────────────────────

/// Holds the scheduler settings in effect; defaults until a file is loaded.
#[derive(Debug, Default)]
pub struct ConfigManager {
    settings: SchedulerSettings,
    loaded: bool,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate `path`, replacing the current settings.
    ///
    /// # Errors
    /// IO or YAML errors, unknown keys, or a
    /// [`ConfigurationError`](crate::scheduler::ConfigurationError) from
    /// validation.  The previous settings are kept on failure.
    pub fn load_from_file(&mut self, path: &Path) -> Result<&SchedulerSettings> {
        info!("Loading scheduler configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;
        // An empty document deserializes as unit, not as an empty map.
        let file: SchedulerConfigFile = if content.trim().is_empty() {
            SchedulerConfigFile::default()
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?
        };

        let settings = file.into_settings();
        settings
            .validate()
            .with_context(|| format!("Invalid scheduler settings in {}", path.display()))?;

        info!(
            max_attempts  = settings.retry.max_attempts,
            base_delay_ms = saturating_millis(settings.retry.base_delay),
            max_delay_ms  = saturating_millis(settings.retry.max_delay),
            jitter        = settings.retry.jitter,
            max_in_flight = settings.max_in_flight,
            "✓ scheduler configuration loaded"
        );
        self.settings = settings;
        self.loaded = true;
        Ok(&self.settings)
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}

// ── Catalog loading ───────────────────────────────────────────────────────────

/// Parse a catalog file.
///
/// # Errors
/// IO or YAML errors, duplicate ids, and slots with `start >= end`.
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    info!("Loading course catalog from: {}", path.display());

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot open catalog file: {}", path.display()))?;
    let mut offerings: Vec<CourseOffering> = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?;

    check_offerings(&offerings).with_context(|| format!("Invalid catalog {}", path.display()))?;

    for o in &mut offerings {
        o.slots.sort_unstable();
    }
    let catalog = Catalog::new(offerings);
    for o in catalog.iter() {
        debug!(course = %o.id, name = %o.name, slots = o.slots.len(), "  offering");
    }
    info!("Successfully loaded {} course offering(s)", catalog.len());
    Ok(catalog)
}

fn check_offerings(offerings: &[CourseOffering]) -> Result<()> {
    let mut seen = HashSet::new();
    for o in offerings {
        if !seen.insert(&o.id) {
            bail!("duplicate course id '{}'", o.id);
        }
        if let Some(bad) = o.slots.iter().find(|s| !s.is_well_formed()) {
            bail!(
                "course '{}' has a malformed slot {bad} (start must be before end)",
                o.id
            );
        }
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
