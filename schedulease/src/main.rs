/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDateTime, NaiveTime};
use clap::Parser;
use tokio::time::Instant;
use tracing::{error, info, warn};

use schedulease::client::scripted::parse_script;
use schedulease::client::{AttemptOutcome, ScriptedClient};
use schedulease::config::{load_catalog, ConfigManager};
use schedulease::coordinator::{Coordinator, ProgressEvent};
use schedulease::course::{Catalog, CourseId};
use schedulease::plan::{PlanSnapshot, SelectionPlan};
use schedulease::scheduler::TokioClock;

// ── CLI argument definition ───────────────────────────────────────────────────

/// Schedulease course enrollment assistant (dry run).
///
/// Submissions go to an in-process scripted client; courses without a
/// `--script` succeed on their first attempt.
///
/// Example:
///   schedulease --catalog demos/catalog.yaml --config demos/schedulease.yaml \
///               --course 30412 --course 30520 --fallback 30521 \
///               --start-in 3 --script 30412=full,full,success
#[derive(Debug, Parser)]
#[command(
    name = "schedulease",
    about = "Countdown-driven course enrollment scheduler (dry run)",
    long_about = None,
)]
struct Cli {
    /// YAML course catalog.
    #[arg(long)]
    catalog: PathBuf,

    /// YAML scheduler settings; defaults apply when omitted.
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Course id to enroll in, highest priority first (repeatable).
    #[arg(long = "course", value_name = "ID")]
    courses: Vec<String>,

    /// Alternative course that may overlap planned ones (repeatable).
    #[arg(long = "fallback", value_name = "ID")]
    fallbacks: Vec<String>,

    /// Local wall-clock time the window opens; a past time means tomorrow.
    #[arg(long, value_name = "HH:MM", value_parser = parse_hhmm, conflicts_with = "start_in")]
    at: Option<NaiveTime>,

    /// Seconds from now until the window opens.
    #[arg(long, value_name = "SECS", default_value_t = 0)]
    start_in: u64,

    /// Window length in seconds.
    #[arg(short = 'w', long, value_name = "SECS", default_value_t = 600)]
    window: u64,

    /// Scripted replies for one course, e.g. `30412=full,full,success`
    /// (repeatable).
    #[arg(long = "script", value_name = "ID=OUTCOMES", value_parser = parse_script)]
    scripts: Vec<(CourseId, Vec<AttemptOutcome>)>,

    /// Seed for backoff jitter and start spread.
    #[arg(long)]
    seed: Option<u64>,
}

fn parse_hhmm(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|e| format!("'{s}' is not HH:MM: {e}"))
}

/// Time from `now` until the next occurrence of `at` (local, naive).
fn until_next(at: NaiveTime, now: NaiveDateTime) -> Duration {
    let mut target = now.date().and_time(at);
    if target <= now {
        target += chrono::Duration::days(1);
    }
    (target - now).to_std().unwrap_or(Duration::ZERO)
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Schedulease starting up...");
    let cli = Cli::parse();

    info!(
        catalog   = %cli.catalog.display(),
        config    = ?cli.config,
        courses   = ?cli.courses,
        fallbacks = ?cli.fallbacks,
        window    = cli.window,
        "Configuration"
    );

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // ── Load settings and catalog ─────────────────────────────────────────────
    let mut config = ConfigManager::new();
    match &cli.config {
        Some(path) => {
            config.load_from_file(path)?;
        }
        None => warn!("No configuration file provided, using default scheduler settings"),
    }
    let catalog = load_catalog(&cli.catalog)?;

    // ── Build the plan ────────────────────────────────────────────────────────
    let mut plan = build_plan(&catalog, &cli.courses, &cli.fallbacks)?;
    if plan.is_empty() {
        bail!("nothing to enroll in: pass at least one --course or --fallback");
    }

    let mut client = ScriptedClient::new();
    for entry in plan.entries() {
        client = client.script(entry.id().clone(), [AttemptOutcome::Success]);
    }
    for (id, outcomes) in cli.scripts {
        if plan.get(&id).is_none() {
            warn!(course = %id, "script given for a course that is not planned");
        }
        client = client.script(id, outcomes);
    }

    // ── Resolve the window ────────────────────────────────────────────────────
    let lead = match cli.at {
        Some(at) => until_next(at, Local::now().naive_local()),
        None => Duration::from_secs(cli.start_in),
    };
    let deadline = Instant::now() + lead;
    let window_end = deadline + Duration::from_secs(cli.window);
    info!(
        opens_in_secs = lead.as_secs(),
        window_secs = cli.window,
        "waiting for the enrollment window"
    );

    let coordinator = Coordinator::new(
        Arc::new(client),
        Arc::new(TokioClock),
        config.settings().clone(),
    )
    .context("invalid scheduler settings")?;
    let coordinator = match cli.seed {
        Some(seed) => coordinator.with_seed(seed),
        None => coordinator,
    };

    let snapshot = coordinator
        .run(&mut plan, deadline, window_end, move |e| {
            print_event(&e, deadline)
        })
        .await
        .context("enrollment run refused")?;

    print_summary(&snapshot);
    Ok(())
}

fn build_plan(catalog: &Catalog, courses: &[String], fallbacks: &[String]) -> Result<SelectionPlan> {
    let lookup = |id: &String| {
        catalog
            .get(&CourseId::new(id.as_str()))
            .with_context(|| format!("course '{id}' is not in the catalog"))
    };

    let mut plan = SelectionPlan::new();
    for id in courses {
        plan.add(lookup(id)?)
            .with_context(|| format!("cannot plan course '{id}'"))?;
    }
    for id in fallbacks {
        plan.add_fallback(lookup(id)?)
            .with_context(|| format!("cannot plan fallback '{id}'"))?;
    }
    for (rank, entry) in plan.entries().iter().enumerate() {
        info!(
            "  #{rank} [{id}] {name}{fallback}",
            rank = rank + 1,
            id = entry.id(),
            name = entry.name(),
            fallback = if entry.is_fallback() { " (fallback)" } else { "" },
        );
    }
    Ok(plan)
}

fn print_event(e: &ProgressEvent, opens: Instant) {
    let offset = e.at.saturating_duration_since(opens);
    println!(
        "[+{:>7.3}s] {:<12} {} → {}",
        offset.as_secs_f64(),
        e.id.as_str(),
        e.old,
        e.new
    );
}

fn print_summary(snapshot: &PlanSnapshot) {
    let (enrolled, rejected, abandoned) = snapshot.tally();
    println!();
    println!("── Result ──────────────────────────────────────────────");
    for entry in &snapshot.entries {
        println!(
            "  {:<12} {:<32} {} (attempts: {})",
            entry.id().as_str(),
            entry.name(),
            entry.status(),
            entry.attempts()
        );
    }
    println!("  enrolled: {enrolled}  rejected: {rejected}  abandoned: {abandoned}");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
