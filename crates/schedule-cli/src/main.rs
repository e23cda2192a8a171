//! `schedule`: query a coaching-center schedule snapshot from the command line.
//!
//! ## Usage
//!
//! ```sh
//! # Week calendar for the whole center, as an admin
//! schedule --data center.json calendar --start 2026-02-16 --end 2026-02-22
//!
//! # A teacher's free time on one day, as that teacher
//! schedule --data center.json --as teacher:7 availability --teacher 7 --date 2026-02-16
//!
//! # Where could batch 10 move to, seen from a fixed "now"
//! schedule --data center.json --now 2026-02-16T12:00:00Z \
//!     reschedule --teacher 7 --resource 10 --date 2026-02-16 --horizon 3
//!
//! # Check a proposed slot
//! schedule --data center.json validate --teacher 7 --date 2026-02-16 \
//!     --start 10:30 --duration 60 --room 100
//! ```
//!
//! Output is pretty-printed JSON on stdout; logs go to stderr (`RUST_LOG`).

mod settings;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::{Parser, Subcommand};
use schedule_engine::clock::FixedClock;
use schedule_engine::model::ViewKind;
use schedule_engine::roster::{StaticHolidays, StaticStats};
use schedule_engine::time::{parse_date, parse_hhmm};
use schedule_engine::{
    CalendarRequest, ConflictCheck, MemoryStore, RescheduleRequest, ScheduleEngine, Scope, Snapshot,
};
use serde::Serialize;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::settings::Settings;

#[derive(Parser)]
#[command(
    name = "schedule",
    version,
    about = "Coaching-center schedule and availability queries"
)]
struct Cli {
    /// JSON snapshot of the center (rooms, resources, teachers, rules, ...)
    #[arg(long)]
    data: PathBuf,

    /// Settings file (TOML or JSON); `SCHEDULE_*` variables override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Freeze "now" (RFC 3339, or YYYY-MM-DDTHH:MM[:SS] taken as UTC)
    #[arg(long, value_parser = parse_now)]
    now: Option<DateTime<Utc>>,

    /// Who is asking: `admin` or `teacher:<id>`
    #[arg(long = "as", default_value = "admin", value_parser = parse_actor)]
    actor: Actor,

    /// Tenant to act in
    #[arg(long, default_value_t = 1)]
    tenant: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Actor {
    Admin,
    Teacher(u64),
}

impl Actor {
    fn scope(self, tenant_id: u64) -> Scope {
        match self {
            Actor::Admin => Scope::Admin {
                tenant_id,
                actor_id: 0,
            },
            Actor::Teacher(teacher_id) => Scope::Teacher {
                tenant_id,
                teacher_id,
            },
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Calendar items for a date range
    Calendar {
        #[arg(long, value_parser = parse_day)]
        start: NaiveDate,
        #[arg(long, value_parser = parse_day)]
        end: NaiveDate,
        /// day, week, month or agenda
        #[arg(long, default_value = "week")]
        view: ViewKind,
        /// Only this teacher's batches
        #[arg(long)]
        teacher: Option<u64>,
    },
    /// A teacher's busy and free time on one date
    Availability {
        #[arg(long)]
        teacher: u64,
        #[arg(long, value_parser = parse_day)]
        date: NaiveDate,
    },
    /// Enrollment against seats for each batch
    Capacity {
        #[arg(long)]
        teacher: Option<u64>,
    },
    /// Ranked slots a class could move to
    Reschedule {
        #[arg(long)]
        teacher: u64,
        #[arg(long)]
        resource: u64,
        /// First day to search
        #[arg(long, value_parser = parse_day)]
        date: NaiveDate,
        /// Days to search (default from settings)
        #[arg(long)]
        horizon: Option<u32>,
    },
    /// Busy minutes and utilization over seven days
    WeeklyLoad {
        #[arg(long)]
        teacher: u64,
        #[arg(long, value_parser = parse_day)]
        week_start: NaiveDate,
    },
    /// Check a proposed class window for teacher and room conflicts
    Validate {
        #[arg(long)]
        teacher: u64,
        #[arg(long, value_parser = parse_day)]
        date: NaiveDate,
        /// Start time, HH:MM
        #[arg(long)]
        start: String,
        /// Length in minutes
        #[arg(long)]
        duration: u32,
        #[arg(long)]
        room: Option<u64>,
        /// Batch being moved; its own room bookings are ignored
        #[arg(long)]
        excluding: Option<u64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    init_tracing(&settings.logging.level);
    tracing::debug!(settings = ?settings, "settings loaded");

    let engine = build_engine(&cli.data, settings, cli.now)?;
    let scope = cli.actor.scope(cli.tenant);

    match cli.command {
        Commands::Calendar {
            start,
            end,
            view,
            teacher,
        } => print_json(&engine.calendar_view(
            &scope,
            &CalendarRequest {
                start_date: start,
                end_date: end,
                view,
                teacher_id: teacher,
            },
        )?),
        Commands::Availability { teacher, date } => {
            print_json(&engine.availability(&scope, teacher, date)?)
        }
        Commands::Capacity { teacher } => print_json(&engine.batch_capacity(&scope, teacher)?),
        Commands::Reschedule {
            teacher,
            resource,
            date,
            horizon,
        } => print_json(&engine.reschedule_options(
            &scope,
            &RescheduleRequest {
                teacher_id: teacher,
                resource_id: resource,
                anchor_date: date,
                horizon_days: horizon,
            },
        )?),
        Commands::WeeklyLoad {
            teacher,
            week_start,
        } => print_json(&engine.weekly_load(&scope, teacher, week_start)?),
        Commands::Validate {
            teacher,
            date,
            start,
            duration,
            room,
            excluding,
        } => print_json(&engine.validate_conflicts(
            &scope,
            &ConflictCheck {
                teacher_id: teacher,
                date,
                start_time: parse_hhmm(&start)?,
                duration_minutes: duration,
                room_id: room,
                excluding_resource_id: excluding,
            },
        )?),
    }
}

/// `RUST_LOG` wins; otherwise the configured level. Logs go to stderr so
/// stdout stays machine-readable.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true),
        )
        .init();
}

fn build_engine(data: &Path, settings: Settings, now: Option<DateTime<Utc>>) -> Result<ScheduleEngine> {
    let json = std::fs::read_to_string(data)
        .with_context(|| format!("Failed to read snapshot: {}", data.display()))?;
    let snapshot = Snapshot::from_json(&json)
        .with_context(|| format!("Failed to parse snapshot: {}", data.display()))?;
    tracing::info!(
        resources = snapshot.resources.len(),
        teachers = snapshot.teachers.len(),
        rules = snapshot.rules.len(),
        sessions = snapshot.sessions.len(),
        "snapshot loaded"
    );

    let roster = StaticStats::from_snapshot(&snapshot);
    let holidays = StaticHolidays::new(snapshot.holidays.clone());
    let store = MemoryStore::from_snapshot(snapshot);

    let mut engine = ScheduleEngine::new(settings.engine, Arc::new(store))
        .context("Invalid engine settings")?
        .with_roster(Arc::new(roster))
        .with_holidays(Arc::new(holidays));
    if let Some(now) = now {
        engine = engine.with_clock(Arc::new(FixedClock(now)));
    }
    Ok(engine)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let pretty = serde_json::to_string_pretty(value).context("Failed to serialize result")?;
    println!("{}", pretty);
    Ok(())
}

fn parse_day(s: &str) -> Result<NaiveDate, String> {
    parse_date(s).map_err(|e| e.to_string())
}

fn parse_now(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
        .map(|naive| naive.and_utc())
        .map_err(|_| format!("invalid time '{}', expected RFC 3339 or YYYY-MM-DDTHH:MM", s))
}

fn parse_actor(s: &str) -> Result<Actor, String> {
    match s.split_once(':') {
        None if s == "admin" => Ok(Actor::Admin),
        Some(("teacher", id)) => id
            .parse()
            .map(Actor::Teacher)
            .map_err(|_| format!("invalid teacher id '{}'", id)),
        _ => Err(format!("invalid actor '{}', expected admin or teacher:<id>", s)),
    }
}
