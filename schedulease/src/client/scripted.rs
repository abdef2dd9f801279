/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! In-process enrollment client that replays scripted outcomes.
//!
//! Used by the dry-run binary and by the scheduler tests.  Each course has a
//! queue of outcomes; once the queue is down to its last element that
//! outcome repeats forever.  Unknown courses are `Denied`.

use std::collections::{HashMap, VecDeque};
use std::str::FromStr;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{AttemptOutcome, EnrollmentClient};
use crate::course::CourseId;

#[derive(Debug, Default)]
struct Script {
    queue: VecDeque<AttemptOutcome>,
    calls: u32,
}

#[derive(Debug, Default)]
pub struct ScriptedClient {
    scripts: Mutex<HashMap<CourseId, Script>>,
    latency: Duration,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every reply by `latency` (tokio time, so paused tests see it).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Replace the script for `course`.
    pub fn script(
        self,
        course: impl Into<CourseId>,
        outcomes: impl IntoIterator<Item = AttemptOutcome>,
    ) -> Self {
        self.lock().insert(
            course.into(),
            Script {
                queue: outcomes.into_iter().collect(),
                calls: 0,
            },
        );
        self
    }

    /// Number of submissions received for `course`.
    pub fn calls(&self, course: &CourseId) -> u32 {
        self.lock().get(course).map_or(0, |s| s.calls)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CourseId, Script>> {
        self.scripts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn next_outcome(&self, course: &CourseId) -> AttemptOutcome {
        let mut scripts = self.lock();
        let Some(script) = scripts.get_mut(course) else {
            return AttemptOutcome::Denied(format!("course {course} is not offered"));
        };
        script.calls += 1;
        let outcome = if script.queue.len() > 1 {
            script.queue.pop_front()
        } else {
            script.queue.front().cloned()
        };
        outcome.unwrap_or_else(|| AttemptOutcome::TransientError("empty script".to_string()))
    }
}

#[async_trait]
impl EnrollmentClient for ScriptedClient {
    async fn submit(&self, course: &CourseId) -> AttemptOutcome {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let outcome = self.next_outcome(course);
        debug!(course = %course, outcome = %outcome, "scripted reply");
        outcome
    }
}

// ── Script parsing ────────────────────────────────────────────────────────────

/// Parses the CLI spelling of one outcome: `success`, `full`, `transient`,
/// `conflict` or `denied`.
impl FromStr for AttemptOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "success" | "ok" => Ok(AttemptOutcome::Success),
            "full" => Ok(AttemptOutcome::Full),
            "transient" | "error" => Ok(AttemptOutcome::TransientError("scripted".to_string())),
            "conflict" => Ok(AttemptOutcome::Conflict("scripted".to_string())),
            "denied" => Ok(AttemptOutcome::Denied("scripted".to_string())),
            other => Err(format!(
                "unknown outcome '{other}' (valid: success, full, transient, conflict, denied)"
            )),
        }
    }
}

/// Parse `ID=outcome,outcome,...` into a course id and its outcome queue.
pub fn parse_script(arg: &str) -> Result<(CourseId, Vec<AttemptOutcome>), String> {
    let (id, outcomes) = arg
        .split_once('=')
        .ok_or_else(|| format!("script '{arg}' must look like ID=outcome[,outcome...]"))?;
    let outcomes = outcomes
        .split(',')
        .map(str::parse)
        .collect::<Result<Vec<AttemptOutcome>, _>>()?;
    if id.trim().is_empty() || outcomes.is_empty() {
        return Err(format!("script '{arg}' has an empty id or outcome list"));
    }
    Ok((CourseId::new(id.trim()), outcomes))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_queue_then_repeats_last() {
        let client = ScriptedClient::new().script(
            "a",
            [AttemptOutcome::Full, AttemptOutcome::Success],
        );
        let a = CourseId::from("a");
        assert_eq!(client.submit(&a).await, AttemptOutcome::Full);
        assert_eq!(client.submit(&a).await, AttemptOutcome::Success);
        assert_eq!(client.submit(&a).await, AttemptOutcome::Success);
        assert_eq!(client.calls(&a), 3);
    }

    #[tokio::test]
    async fn unknown_course_is_denied() {
        let client = ScriptedClient::new();
        assert!(matches!(
            client.submit(&"nope".into()).await,
            AttemptOutcome::Denied(_)
        ));
        assert_eq!(client.calls(&"nope".into()), 0);
    }

    #[test]
    fn parse_script_accepts_cli_form() {
        let (id, outs) = parse_script("30412=full, full ,success").unwrap();
        assert_eq!(id.as_str(), "30412");
        assert_eq!(
            outs,
            vec![
                AttemptOutcome::Full,
                AttemptOutcome::Full,
                AttemptOutcome::Success
            ]
        );
    }

    #[test]
    fn parse_script_rejects_garbage() {
        assert!(parse_script("no-equals").is_err());
        assert!(parse_script("a=maybe").is_err());
        assert!(parse_script("=full").is_err());
    }
}
