//! # schedule-engine
//!
//! Scheduling and availability for multi-tenant coaching centers.
//!
//! Classes are defined by weekly recurrence rules per batch, adjusted by
//! per-date overrides, and materialized as booked sessions. The engine
//! expands those into concrete occurrences and answers the questions a front
//! desk asks: what is on the calendar, when is a teacher free, does a
//! proposed slot collide with anything, where could a class move to, and how
//! loaded is a teacher's week.
//!
//! ## Modules
//!
//! - [`interval`]: half-open interval merge and subtraction
//! - [`expander`]: weekly rules → concrete occurrences (via `rrule`)
//! - [`overrides`]: per-date cancel / retime / extra-class overrides
//! - [`availability`]: per-teacher, per-day busy and free time
//! - [`conflict`]: teacher and room clash detection
//! - [`reschedule`]: ranked candidate slots for moving a class
//! - [`load`]: weekly busy minutes and utilization
//! - [`calendar`]: occurrences joined with sessions, rooms and counts
//! - [`capacity`]: enrollment against seats per batch
//! - [`engine`]: [`ScheduleEngine`], the scoped and cached entry point
//! - [`store`], [`cache`], [`clock`], [`roster`]: injected collaborators
//! - [`scope`]: who is asking
//! - [`config`]: [`EngineConfig`]
//! - [`error`]: Error types

pub mod availability;
pub mod cache;
pub mod calendar;
pub mod capacity;
pub mod clock;
pub mod config;
pub mod conflict;
pub mod context;
pub mod engine;
pub mod error;
pub mod expander;
pub mod interval;
pub mod load;
pub mod model;
pub mod overrides;
pub mod reschedule;
pub mod roster;
pub mod scope;
pub mod store;
pub mod time;

pub use availability::DayAvailability;
pub use calendar::{CalendarItem, CalendarRequest, CalendarView};
pub use capacity::CapacityRow;
pub use config::EngineConfig;
pub use conflict::{Conflict, ConflictKind, ConflictReport};
pub use engine::{ConflictCheck, ScheduleEngine};
pub use error::{Result, ScheduleError};
pub use interval::{BusySource, Interval};
pub use load::WeeklyLoad;
pub use reschedule::{RescheduleRequest, RescheduleSlot};
pub use scope::Scope;
pub use store::{MemoryStore, ScheduleStore, Snapshot};
