//! Team-perspective long table built from cached week files.
//!
//! Each game becomes two rows, one per team, so per-team aggregates are a
//! plain group-by downstream.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use super::parquet::{field_bool, field_i64, field_str, read_table, Table};
use super::{list_week_files, CACHE_SUBDIR};
use crate::error::CacheError;
use crate::schedule::REGULAR_SEASON_WEEKS;

/// Accepted spellings per canonical column, compared after [`squash`].
const SEASON: &[&str] = &["season"];
const WEEK: &[&str] = &["week"];
const HOME_TEAM: &[&str] = &["home_team", "homeTeam", "home team", "home"];
const AWAY_TEAM: &[&str] = &["away_team", "awayTeam", "away team", "away"];
const HOME_SCORE: &[&str] = &["home_score", "homeScore", "home score", "home_pts", "home_points"];
const AWAY_SCORE: &[&str] = &["away_score", "awayScore", "away score", "away_pts", "away_points"];
const NEUTRAL: &[&str] = &["neutral", "is_neutral", "neutral_site", "neutralSite"];

#[derive(Debug, Clone, Default)]
pub struct LongOptions {
    /// Only these seasons; every season on disk when `None`.
    pub seasons: Option<Vec<i32>>,
    /// Drop weeks after this one.
    pub through_week: Option<u32>,
    /// Keep weeks outside 1..=18.
    pub include_playoffs: bool,
    /// Require exact column names (after case folding); no `neutral` default.
    pub strict_columns: bool,
}

/// One team's view of one game.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamGameRow {
    pub season: i32,
    pub week: u32,
    pub game_id: String,
    pub team: String,
    pub opp: String,
    pub is_home: bool,
    pub is_neutral: bool,
    pub points_for: Option<i64>,
    pub points_against: Option<i64>,
}

struct ColumnMap {
    season: usize,
    week: usize,
    home: usize,
    away: usize,
    home_score: usize,
    away_score: usize,
    neutral: Option<usize>,
}

fn squash(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '/'))
        .collect()
}

fn find_column(columns: &[String], variants: &[&str], strict: bool) -> Option<usize> {
    let squashed: Vec<String> = columns.iter().map(|c| squash(c)).collect();
    let candidates = if strict { &variants[..1] } else { variants };
    candidates
        .iter()
        .find_map(|v| squashed.iter().position(|c| *c == squash(v)))
}

fn resolve_columns(path: &Path, columns: &[String], strict: bool) -> Result<ColumnMap, CacheError> {
    let require = |canonical: &'static str, variants: &[&str]| {
        find_column(columns, variants, strict).ok_or_else(|| CacheError::MissingColumn {
            path: path.to_path_buf(),
            column: canonical,
            tried: variants.iter().map(|v| v.to_string()).collect(),
        })
    };
    let neutral = if strict {
        Some(require("neutral", NEUTRAL)?)
    } else {
        find_column(columns, NEUTRAL, false)
    };
    Ok(ColumnMap {
        season: require("season", SEASON)?,
        week: require("week", WEEK)?,
        home: require("home_team", HOME_TEAM)?,
        away: require("away_team", AWAY_TEAM)?,
        home_score: require("home_score", HOME_SCORE)?,
        away_score: require("away_score", AWAY_SCORE)?,
        neutral,
    })
}

fn clean_id_part(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect::<String>()
        .to_uppercase()
}

/// `YYYY_WW_<HOME>_vs_<AWAY>` with the week zero-padded.
pub fn make_game_id(season: i32, week: u32, home: &str, away: &str) -> String {
    format!(
        "{}_{:02}_{}_vs_{}",
        season,
        week,
        clean_id_part(home),
        clean_id_part(away)
    )
}

fn keep_week(week: u32, opts: &LongOptions) -> bool {
    if opts.through_week.is_some_and(|t| week > t) {
        return false;
    }
    opts.include_playoffs || (1..=REGULAR_SEASON_WEEKS).contains(&week)
}

fn table_rows(path: &Path, table: &Table, opts: &LongOptions, out: &mut Vec<TeamGameRow>) -> Result<(), CacheError> {
    let cols = resolve_columns(path, &table.columns, opts.strict_columns)?;
    for row in &table.rows {
        let Some(season) = row.get(cols.season).and_then(field_i64).and_then(|v| i32::try_from(v).ok()) else {
            continue;
        };
        // Non-numeric week labels have no slot in the table.
        let Some(week) = row.get(cols.week).and_then(field_i64).and_then(|v| u32::try_from(v).ok()) else {
            continue;
        };
        if !keep_week(week, opts) {
            continue;
        }
        let (Some(home), Some(away)) = (
            row.get(cols.home).and_then(field_str),
            row.get(cols.away).and_then(field_str),
        ) else {
            debug!(path = %path.display(), season, week, "skipping game with no team names");
            continue;
        };
        let home_pts = row.get(cols.home_score).and_then(field_i64);
        let away_pts = row.get(cols.away_score).and_then(field_i64);
        let neutral = cols
            .neutral
            .and_then(|i| row.get(i))
            .and_then(field_bool)
            .unwrap_or(false);
        let game_id = make_game_id(season, week, &home, &away);

        out.push(TeamGameRow {
            season,
            week,
            game_id: game_id.clone(),
            team: home.clone(),
            opp: away.clone(),
            is_home: true,
            is_neutral: neutral,
            points_for: home_pts,
            points_against: away_pts,
        });
        out.push(TeamGameRow {
            season,
            week,
            game_id,
            team: away,
            opp: home,
            is_home: false,
            is_neutral: neutral,
            points_for: away_pts,
            points_against: home_pts,
        });
    }
    Ok(())
}

/// Build the long table from `cache_dir`, which may be the cache root or
/// its `api_sports_nfl` subdirectory.
pub fn build_team_long(cache_dir: &Path, opts: &LongOptions) -> Result<Vec<TeamGameRow>, CacheError> {
    let nested = cache_dir.join(CACHE_SUBDIR);
    let root: PathBuf = if nested.is_dir() {
        nested
    } else {
        cache_dir.to_path_buf()
    };

    let files = list_week_files(&root, opts.seasons.as_deref())?;
    if files.is_empty() {
        return Err(CacheError::NoFiles(root));
    }

    let mut rows = Vec::new();
    for (_, _, path) in &files {
        let table = read_table(path)?;
        table_rows(path, &table, opts, &mut rows)?;
    }
    rows.sort_by(|a, b| {
        (a.season, a.week, &a.game_id, &a.team).cmp(&(b.season, b.week, &b.game_id, &b.team))
    });
    debug!(files = files.len(), rows = rows.len(), "built long table");
    Ok(rows)
}
