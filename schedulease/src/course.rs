/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Course offerings and the immutable catalog they are loaded into.
//!
//! ```text
//! catalog.yaml ──(config::load_catalog)──► Catalog ──(lookup)──► Arc<CourseOffering>
//!                                                                  │
//!                                                    SelectionPlan::add / add_fallback
//! ```
//!
//! # Ownership model
//! Offerings are created once at catalog load and never mutated.  They are
//! handed out as `Arc<CourseOffering>` so a plan entry, a scheduler task and
//! the display layer can all hold the same offering without copying slot
//! lists around.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::timetable::TimeSlot;

// ── CourseId ──────────────────────────────────────────────────────────────────

/// Identifier the enrollment service uses for one offering (lesson id,
/// optionally suffixed with a lab group, e.g. `"30412:2"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(transparent)]
pub struct CourseId(String);

impl CourseId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CourseId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CourseId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ── CourseOffering ────────────────────────────────────────────────────────────

/// One schedulable course section.
///
/// `capacity` is only a hint for display; the remote service owns the
/// authoritative seat count and reports exhaustion as
/// [`AttemptOutcome::Full`](crate::client::AttemptOutcome::Full).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CourseOffering {
    pub id: CourseId,
    pub name: String,
    #[serde(default)]
    pub slots: Vec<TimeSlot>,
    #[serde(default)]
    pub capacity: Option<u32>,
}

impl CourseOffering {
    /// Build an offering; slots are sorted so display order is stable.
    pub fn new(id: impl Into<CourseId>, name: impl Into<String>, mut slots: Vec<TimeSlot>) -> Self {
        slots.sort_unstable();
        Self {
            id: id.into(),
            name: name.into(),
            slots,
            capacity: None,
        }
    }

    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = Some(capacity);
        self
    }
}

// ── Catalog ───────────────────────────────────────────────────────────────────

/// Read-only set of offerings, preserving load order.
///
/// Built by [`config::load_catalog`](crate::config::load_catalog), which has
/// already rejected duplicate ids and malformed slots.
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    offerings: Vec<Arc<CourseOffering>>,
    by_id: HashMap<CourseId, usize>,
}

impl Catalog {
    /// Build a catalog.  A later duplicate id replaces the earlier lookup
    /// entry; callers that care validate first.
    pub fn new(offerings: Vec<CourseOffering>) -> Self {
        let offerings: Vec<_> = offerings.into_iter().map(Arc::new).collect();
        let by_id = offerings
            .iter()
            .enumerate()
            .map(|(i, o)| (o.id.clone(), i))
            .collect();
        Self { offerings, by_id }
    }

    pub fn get(&self, id: &CourseId) -> Option<Arc<CourseOffering>> {
        self.by_id.get(id).map(|&i| Arc::clone(&self.offerings[i]))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<CourseOffering>> {
        self.offerings.iter()
    }

    pub fn len(&self) -> usize {
        self.offerings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offerings.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
