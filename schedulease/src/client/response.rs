/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Classification of raw election replies into [`AttemptOutcome`].
//!
//! The registration portal answers a batch-election POST with a small HTML
//! fragment whose text carries the verdict.  Markers are checked in table
//! order; the first hit wins, so more specific phrases come first.
//!
//! | Marker | Meaning | Outcome |
//! |---|---|---|
//! | `选课成功` | elected | `Success` |
//! | `计划外名额已满`, `名额已满`, `人数已满` | quota exhausted | `Full` |
//! | `已经选过` | already elected | `Conflict` |
//! | `冲突` | timetable clash | `Conflict` |
//! | `当前选课不开放` | window not open yet | `TransientError` |
//! | `请登录`, `统一身份认证`, `无权` | session/permission | `Denied` |
//! | anything else | unknown page | `TransientError` |

use super::AttemptOutcome;

/// Longest slice of an unrecognised reply kept in the outcome message.
const DETAIL_LIMIT: usize = 120;

#[derive(Clone, Copy)]
enum Verdict {
    Success,
    Full,
    Conflict(&'static str),
    NotOpen,
    Denied(&'static str),
}

const MARKERS: &[(&str, Verdict)] = &[
    ("选课成功", Verdict::Success),
    ("计划外名额已满", Verdict::Full),
    ("名额已满", Verdict::Full),
    ("人数已满", Verdict::Full),
    ("已经选过", Verdict::Conflict("course already elected")),
    ("冲突", Verdict::Conflict("timetable conflict on server")),
    ("当前选课不开放", Verdict::NotOpen),
    ("请登录", Verdict::Denied("session expired")),
    ("统一身份认证", Verdict::Denied("redirected to login")),
    ("无权", Verdict::Denied("not permitted to elect this course")),
];

/// Map the visible text of an election reply onto an [`AttemptOutcome`].
pub fn classify(text: &str) -> AttemptOutcome {
    let text = text.trim();
    for (marker, verdict) in MARKERS {
        if text.contains(marker) {
            return match *verdict {
                Verdict::Success => AttemptOutcome::Success,
                Verdict::Full => AttemptOutcome::Full,
                Verdict::Conflict(msg) => AttemptOutcome::Conflict(msg.to_string()),
                Verdict::NotOpen => {
                    AttemptOutcome::TransientError("election not open yet".to_string())
                }
                Verdict::Denied(msg) => AttemptOutcome::Denied(msg.to_string()),
            };
        }
    }
    AttemptOutcome::TransientError(format!("unrecognised reply: {}", truncate(text)))
}

/// Map an HTTP status plus body onto an outcome.  Non-2xx statuses never
/// reach the text classifier.
pub fn classify_http(status: u16, body: &str) -> AttemptOutcome {
    match status {
        200..=299 => classify(body),
        401 | 403 => AttemptOutcome::Denied(format!("HTTP {status}")),
        429 => AttemptOutcome::TransientError("rate limited (HTTP 429)".to_string()),
        _ => AttemptOutcome::TransientError(format!("HTTP {status}")),
    }
}

fn truncate(text: &str) -> &str {
    match text.char_indices().nth(DETAIL_LIMIT) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
