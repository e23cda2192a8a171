//! Weekly teaching load.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::availability::teacher_day;
use crate::context::ScheduleContext;
use crate::error::Result;
use crate::model::TeacherId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayLoad {
    pub date: NaiveDate,
    pub busy_minutes: i64,
    pub free_minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyLoad {
    pub teacher_id: TeacherId,
    pub week_start: NaiveDate,
    pub days: Vec<DayLoad>,
    pub total_busy_minutes: i64,
    pub total_free_minutes: i64,
    pub working_minutes_per_day: i64,
    pub utilization_percentage: f64,
}

/// Round half away from zero to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `busy / (working_minutes_per_day * days) * 100`, two decimals. Zero when
/// the working window is degenerate.
pub fn utilization(busy_minutes: i64, working_minutes_per_day: i64, days: i64) -> f64 {
    let capacity = working_minutes_per_day * days;
    if working_minutes_per_day <= 0 || capacity <= 0 {
        return 0.0;
    }
    round2(busy_minutes as f64 / capacity as f64 * 100.0)
}

/// Seven consecutive days of availability starting at `week_start`, summed.
pub fn weekly_load(
    ctx: &ScheduleContext<'_>,
    teacher_id: TeacherId,
    week_start: NaiveDate,
) -> Result<WeeklyLoad> {
    let teacher = ctx.teacher(teacher_id)?;
    let working_minutes_per_day = ctx.work_window(&teacher).minutes_per_day().max(0);

    let mut days = Vec::with_capacity(7);
    for offset in 0..7 {
        let date = week_start + Duration::days(offset);
        let day = teacher_day(ctx, teacher_id, date)?;
        days.push(DayLoad {
            date,
            busy_minutes: day.total_busy_minutes,
            free_minutes: day.total_free_minutes,
        });
    }

    let total_busy_minutes = days.iter().map(|d| d.busy_minutes).sum();
    let total_free_minutes = days.iter().map(|d| d.free_minutes).sum();

    Ok(WeeklyLoad {
        teacher_id,
        week_start,
        utilization_percentage: utilization(total_busy_minutes, working_minutes_per_day, 7),
        days,
        total_busy_minutes,
        total_free_minutes,
        working_minutes_per_day,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utilization_rounds_to_two_decimals() {
        // 100 / (780 * 7) = 1.8315..%
        assert_eq!(utilization(100, 780, 7), 1.83);
        assert_eq!(utilization(0, 780, 7), 0.0);
    }

    #[test]
    fn degenerate_window_yields_zero() {
        assert_eq!(utilization(120, 0, 7), 0.0);
        assert_eq!(utilization(120, -30, 7), 0.0);
    }
}
