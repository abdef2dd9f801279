/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Schedulease – countdown-driven course enrollment assistant
//!
//! Module layout, leaf first:
//!
//! ```text
//! lib.rs
//! ├── timetable/    – weekdays, time slots, overlap rules
//! ├── course        – CourseId, CourseOffering, Catalog
//! ├── plan/         – SelectionPlan, entry statuses, enrollment cascade
//! ├── client/       – EnrollmentClient boundary, reply classification, scripted client
//! ├── scheduler/    – retry policy, clock, per-entry attempt loop
//! ├── coordinator/  – Coordinator::run over a whole plan
//! └── config/       – YAML settings and catalog loading
//! ```

pub mod client;
pub mod config;
pub mod coordinator;
pub mod course;
pub mod plan;
pub mod scheduler;
pub mod timetable;
