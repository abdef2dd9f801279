/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Timetable model: weekly time slots and the slot-conflict rule.
//!
//! A [`TimeSlot`] is a half-open interval `[start, end)` over the discrete
//! teaching-period grid of one [`Weekday`].  Two slots conflict iff they fall
//! on the same day and their intervals overlap:
//!
//! ```text
//! same_day && a.start < b.end && b.start < a.end
//! ```
//!
//! Adjacent periods (`a.end == b.start`) therefore do **not** conflict.
//!
//! All functions here are pure.  Slot counts per course are tiny (one to
//! four meetings a week), so the pairwise O(|a| × |b|) scan is used instead of
//! an interval tree.

use std::fmt;

use serde::Deserialize;

// ── Weekday ───────────────────────────────────────────────────────────────────

/// Day of the week a [`TimeSlot`] falls on.
///
/// The enrollment service numbers days `1..=7` starting on Monday; see
/// [`Weekday::from_index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "WeekdayRepr")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    /// All days in service order (Monday first).
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// Convert the service's `weekDay` index (`1` = Monday … `7` = Sunday).
    ///
    /// Returns `None` for anything outside `1..=7`.
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            1..=7 => Some(Self::ALL[usize::from(index - 1)]),
            _ => None,
        }
    }

    /// Parse an English day name, case-insensitive, full or three-letter.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|d| {
            let full = d.to_string().to_ascii_lowercase();
            lower == full || (lower.len() == 3 && full.starts_with(&lower))
        })
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        };
        f.write_str(name)
    }
}

/// YAML accepts either the numeric service index or a day name.
#[derive(Deserialize)]
#[serde(untagged)]
enum WeekdayRepr {
    Index(u8),
    Name(String),
}

impl TryFrom<WeekdayRepr> for Weekday {
    type Error = String;

    fn try_from(repr: WeekdayRepr) -> Result<Self, Self::Error> {
        match repr {
            WeekdayRepr::Index(i) => {
                Weekday::from_index(i).ok_or_else(|| format!("weekday index {i} not in 1..=7"))
            }
            WeekdayRepr::Name(n) => {
                Weekday::from_name(&n).ok_or_else(|| format!("unknown weekday '{n}'"))
            }
        }
    }
}

// ── TimeSlot ──────────────────────────────────────────────────────────────────

/// One weekly meeting: periods `[start, end)` on `day`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
pub struct TimeSlot {
    pub day: Weekday,
    pub start: u8,
    pub end: u8,
}

impl TimeSlot {
    pub fn new(day: Weekday, start: u8, end: u8) -> Self {
        Self { day, start, end }
    }

    /// `true` when the slot covers at least one period.
    pub fn is_well_formed(&self) -> bool {
        self.start < self.end
    }

    /// Half-open overlap test.
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.day == other.day && self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}-{}", self.day, self.start, self.end)
    }
}

// ── Conflict checks ───────────────────────────────────────────────────────────

/// `true` iff any slot in `a` overlaps any slot in `b`.
pub fn conflicts(a: &[TimeSlot], b: &[TimeSlot]) -> bool {
    a.iter().any(|x| b.iter().any(|y| x.overlaps(y)))
}

/// `true` iff `candidate` overlaps none of the `occupied` slot sets.
///
/// `occupied` is the slot sets of every entry that still holds (or is trying
/// to hold) its seat; the plan decides which entries qualify.
pub fn can_add<'a, I>(occupied: I, candidate: &[TimeSlot]) -> bool
where
    I: IntoIterator<Item = &'a [TimeSlot]>,
{
    occupied.into_iter().all(|slots| !conflicts(slots, candidate))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
