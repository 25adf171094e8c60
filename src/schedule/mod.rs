//! NFL regular-season week calendar.
//!
//! A week runs Thursday through the following Tuesday. Each season is
//! anchored on the Thursday of week 1.

use chrono::{Duration, NaiveDate};

use crate::error::ScheduleError;

pub const REGULAR_SEASON_WEEKS: u32 = 18;

/// Week-1 Thursday per season as (season, month, day).
const WEEK1_THURSDAY: [(i32, u32, u32); 13] = [
    (2013, 9, 5),
    (2014, 9, 4),
    (2015, 9, 10),
    (2016, 9, 8),
    (2017, 9, 7),
    (2018, 9, 6),
    (2019, 9, 5),
    (2020, 9, 10),
    (2021, 9, 9),
    (2022, 9, 8),
    (2023, 9, 7),
    (2024, 9, 5),
    (2025, 9, 4),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WeekKey {
    pub season: i32,
    pub week: u32,
}

impl WeekKey {
    pub fn new(season: i32, week: u32) -> Self {
        Self { season, week }
    }
}

pub fn week1_thursday(season: i32) -> Option<NaiveDate> {
    WEEK1_THURSDAY
        .iter()
        .find(|(s, _, _)| *s == season)
        .and_then(|&(s, m, d)| NaiveDate::from_ymd_opt(s, m, d))
}

/// Seasons with a known week-1 anchor, ascending.
pub fn known_seasons() -> Vec<i32> {
    WEEK1_THURSDAY.iter().map(|(s, _, _)| *s).collect()
}

/// The most recent season with an anchor.
pub fn latest_season() -> i32 {
    WEEK1_THURSDAY[WEEK1_THURSDAY.len() - 1].0
}

/// Thursday..Tuesday window for a week, both ends inclusive.
pub fn week_range(season: i32, week: u32) -> Result<(NaiveDate, NaiveDate), ScheduleError> {
    if week < 1 {
        return Err(ScheduleError::InvalidWeek(week));
    }
    let anchor = week1_thursday(season).ok_or(ScheduleError::UnknownSeason(season))?;
    let start = Duration::try_days(7 * (i64::from(week) - 1))
        .and_then(|offset| anchor.checked_add_signed(offset))
        .ok_or(ScheduleError::InvalidWeek(week))?;
    let end = start
        .checked_add_signed(Duration::days(5))
        .ok_or(ScheduleError::InvalidWeek(week))?;
    Ok((start, end))
}

/// Every calendar day of the week window, in order.
pub fn week_days(season: i32, week: u32) -> Result<Vec<NaiveDate>, ScheduleError> {
    let (start, end) = week_range(season, week)?;
    Ok(start.iter_days().take_while(|d| *d <= end).collect())
}

/// The week after, rolling into the next season when it has an anchor.
pub fn next_week(season: i32, week: u32) -> WeekKey {
    if week < REGULAR_SEASON_WEEKS {
        WeekKey::new(season, week + 1)
    } else if week1_thursday(season + 1).is_some() {
        WeekKey::new(season + 1, 1)
    } else {
        WeekKey::new(season, REGULAR_SEASON_WEEKS)
    }
}

/// The week before, rolling back into the previous season when it has an anchor.
pub fn prev_week(season: i32, week: u32) -> WeekKey {
    if week > 1 {
        WeekKey::new(season, week - 1)
    } else if week1_thursday(season - 1).is_some() {
        WeekKey::new(season - 1, REGULAR_SEASON_WEEKS)
    } else {
        WeekKey::new(season, 1)
    }
}

/// Highest week whose whole window (through Tuesday) lies before `today`.
/// Zero for an unknown season or before week 1 is over.
pub fn last_completed_week(season: i32, today: NaiveDate) -> u32 {
    let Some(w1) = week1_thursday(season) else {
        return 0;
    };
    if today < w1 {
        return 0;
    }
    let elapsed = (today - w1).num_days();
    let mut current = ((elapsed / 7) as u32 + 1).min(REGULAR_SEASON_WEEKS);
    let end_tue = w1 + Duration::days(7 * (i64::from(current) - 1) + 5);
    if today <= end_tue {
        current -= 1;
    }
    current
}

/// The week whose window contains `date`, if any.
pub fn week_of(season: i32, date: NaiveDate) -> Option<u32> {
    let w1 = week1_thursday(season)?;
    if date < w1 {
        return None;
    }
    let week = (date - w1).num_days() / 7 + 1;
    let week = u32::try_from(week).ok()?;
    let (_, end) = week_range(season, week).ok()?;
    (week <= REGULAR_SEASON_WEEKS && date <= end).then_some(week)
}
