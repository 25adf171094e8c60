//! Parquet cache of weekly game results.
//!
//! One file per (season, week) under `<root>/api_sports_nfl/`, named
//! `{season}_wk{week}.parquet`. Reads are cache-first; the API is only hit
//! for missing weeks or when a refresh is forced.

pub mod long;
pub mod parquet;

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use atomic_write_file::AtomicWriteFile;
use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::api::{normalize_game, sort_schedule, GameRecord, GameSource};
use crate::error::CacheError;
use crate::schedule::{last_completed_week, week1_thursday, week_days, REGULAR_SEASON_WEEKS};

pub use long::{build_team_long, LongOptions, TeamGameRow};
pub use parquet::{read_records, read_table};

/// Subdirectory of the cache root holding week files.
pub const CACHE_SUBDIR: &str = "api_sports_nfl";
const UPCOMING_FILE: &str = "_upcoming_schedule.parquet";

/// Default cache root (`<user cache dir>/nfl-lines`).
pub fn default_cache_root() -> Option<PathBuf> {
    dirs::cache_dir().map(|d| d.join("nfl-lines"))
}

/// Parse `2024_wk1.parquet` / `2021_wk01.parquet` into (season, week).
pub fn parse_week_file_name(name: &str) -> Option<(i32, u32)> {
    let lower = name.to_ascii_lowercase();
    let stem = lower.strip_suffix(".parquet")?;
    let (head, week) = stem.rsplit_once("_wk")?;
    if week.is_empty() || !week.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let season = head.get(head.len().checked_sub(4)?..)?;
    if !season.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((season.parse().ok()?, week.parse().ok()?))
}

/// Week files in `dir`, sorted by (season, week). `seasons` narrows the set.
pub fn list_week_files(dir: &Path, seasons: Option<&[i32]>) -> Result<Vec<(i32, u32, PathBuf)>, CacheError> {
    let pattern = format!("{}/*.parquet", glob::Pattern::escape(&dir.to_string_lossy()));
    let paths = glob::glob(&pattern).map_err(|e| CacheError::Io {
        path: dir.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
    })?;

    let mut files: Vec<(i32, u32, PathBuf)> = paths
        .filter_map(Result::ok)
        .filter_map(|path| {
            let name = path.file_name()?.to_str()?;
            let (season, week) = parse_week_file_name(name)?;
            Some((season, week, path))
        })
        .filter(|(season, _, _)| seasons.map_or(true, |s| s.contains(season)))
        .collect();
    files.sort();
    Ok(files)
}

/// Where a week's records came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeekSource {
    Cached,
    Fetched,
}

/// Result of ensuring one week is cached.
#[derive(Debug, Clone, PartialEq)]
pub struct WeekOutcome {
    pub season: i32,
    pub week: u32,
    pub source: WeekSource,
    pub rows: usize,
    pub path: PathBuf,
}

/// Seasons and the weeks present for each.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStatus {
    pub root: PathBuf,
    pub seasons: BTreeMap<i32, Vec<u32>>,
    pub rows: BTreeMap<i32, i64>,
}

#[derive(Debug, Clone)]
pub struct WeekCache {
    dir: PathBuf,
}

impl WeekCache {
    /// Cache rooted at `root`; week files live in `root/api_sports_nfl`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            dir: root.as_ref().join(CACHE_SUBDIR),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn week_path(&self, season: i32, week: u32) -> PathBuf {
        self.dir.join(format!("{}_wk{}.parquet", season, week))
    }

    pub fn upcoming_path(&self) -> PathBuf {
        self.dir.join(UPCOMING_FILE)
    }

    fn write_file(&self, path: &Path, records: &[GameRecord]) -> Result<(), CacheError> {
        let io_err = |source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        };
        std::fs::create_dir_all(&self.dir).map_err(|source| CacheError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let bytes = parquet::encode_records(records).map_err(|source| CacheError::Parquet {
            path: path.to_path_buf(),
            source,
        })?;
        let mut file = AtomicWriteFile::open(path).map_err(io_err)?;
        file.write_all(&bytes).map_err(io_err)?;
        file.commit().map_err(io_err)?;
        Ok(())
    }

    pub fn write_week(&self, season: i32, week: u32, records: &[GameRecord]) -> Result<PathBuf, CacheError> {
        let path = self.week_path(season, week);
        self.write_file(&path, records)?;
        debug!(path = %path.display(), rows = records.len(), "wrote week file");
        Ok(path)
    }

    /// Cached records for a week, or `None` when the file does not exist.
    pub fn read_week(&self, season: i32, week: u32) -> Result<Option<Vec<GameRecord>>, CacheError> {
        let path = self.week_path(season, week);
        if !path.exists() {
            return Ok(None);
        }
        read_records(&path).map(Some)
    }

    /// Fetch and normalize every game of a week window.
    async fn fetch_week<S: GameSource>(
        &self,
        source: &S,
        season: i32,
        week: u32,
    ) -> Result<Vec<GameRecord>, CacheError> {
        let days = week_days(season, week)?;
        let raw = source.fetch_days(&days, Some(season)).await?;
        Ok(raw.iter().map(|g| normalize_game(season, week, g)).collect())
    }

    /// Records for a week: from the cache when present, otherwise fetched
    /// and written. `force_refresh` always fetches.
    pub async fn get_week<S: GameSource>(
        &self,
        source: &S,
        season: i32,
        week: u32,
        force_refresh: bool,
    ) -> Result<(Vec<GameRecord>, WeekSource), CacheError> {
        if !force_refresh {
            if let Some(records) = self.read_week(season, week)? {
                debug!(season, week, rows = records.len(), "cache hit");
                return Ok((records, WeekSource::Cached));
            }
        }
        let records = self.fetch_week(source, season, week).await?;
        self.write_week(season, week, &records)?;
        info!(season, week, rows = records.len(), "cached week");
        Ok((records, WeekSource::Fetched))
    }

    async fn ensure_week<S: GameSource>(
        &self,
        source: &S,
        season: i32,
        week: u32,
        refresh: bool,
    ) -> Result<WeekOutcome, CacheError> {
        let path = self.week_path(season, week);
        if path.exists() && !refresh {
            let rows = parquet::count_rows(&path)?;
            return Ok(WeekOutcome {
                season,
                week,
                source: WeekSource::Cached,
                rows: usize::try_from(rows).unwrap_or_default(),
                path,
            });
        }
        let (records, source) = self.get_week(source, season, week, refresh).await?;
        Ok(WeekOutcome {
            season,
            week,
            source,
            rows: records.len(),
            path,
        })
    }

    /// Cache every completed week of `season` as of `today`.
    pub async fn update<S: GameSource>(
        &self,
        source: &S,
        season: i32,
        today: NaiveDate,
        refresh: bool,
    ) -> Result<Vec<WeekOutcome>, CacheError> {
        let last_done = last_completed_week(season, today);
        if last_done == 0 {
            info!(season, "no completed weeks yet");
            return Ok(Vec::new());
        }
        let mut outcomes = Vec::new();
        for week in 1..=last_done {
            outcomes.push(self.ensure_week(source, season, week, refresh).await?);
        }
        Ok(outcomes)
    }

    /// Cache all regular-season weeks of each season. Seasons without a
    /// week-1 anchor are skipped.
    pub async fn backfill<S: GameSource>(
        &self,
        source: &S,
        seasons: &[i32],
        refresh: bool,
    ) -> Result<Vec<WeekOutcome>, CacheError> {
        let mut outcomes = Vec::new();
        for &season in seasons {
            if week1_thursday(season).is_none() {
                warn!(season, "skipping season with no week-1 anchor");
                continue;
            }
            for week in 1..=REGULAR_SEASON_WEEKS {
                outcomes.push(self.ensure_week(source, season, week, refresh).await?);
            }
        }
        Ok(outcomes)
    }

    /// Re-fetch one week, replacing any cached file.
    pub async fn refresh<S: GameSource>(
        &self,
        source: &S,
        season: i32,
        week: u32,
    ) -> Result<WeekOutcome, CacheError> {
        self.ensure_week(source, season, week, true).await
    }

    /// Fetch an upcoming week's slate, sorted by kickoff, and keep a copy in
    /// the upcoming-schedule file. Never touches the week files.
    pub async fn fetch_upcoming<S: GameSource>(
        &self,
        source: &S,
        season: i32,
        week: u32,
    ) -> Result<Vec<GameRecord>, CacheError> {
        let mut records = self.fetch_week(source, season, week).await?;
        sort_schedule(&mut records);
        let path = self.upcoming_path();
        self.write_file(&path, &records)?;
        debug!(path = %path.display(), games = records.len(), "wrote upcoming schedule");
        Ok(records)
    }

    /// Weeks present per season, with row counts from file footers.
    pub fn status(&self) -> Result<CacheStatus, CacheError> {
        let mut status = CacheStatus {
            root: self.dir.clone(),
            seasons: BTreeMap::new(),
            rows: BTreeMap::new(),
        };
        if !self.dir.exists() {
            return Ok(status);
        }
        for (season, week, path) in list_week_files(&self.dir, None)? {
            let rows = match parquet::count_rows(&path) {
                Ok(rows) => rows,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "unreadable week file");
                    continue;
                }
            };
            status.seasons.entry(season).or_default().push(week);
            *status.rows.entry(season).or_default() += rows;
        }
        Ok(status)
    }

    fn load_files(&self, files: Vec<(i32, u32, PathBuf)>) -> Result<Vec<GameRecord>, CacheError> {
        if files.is_empty() {
            return Err(CacheError::NoFiles(self.dir.clone()));
        }
        let mut records = Vec::new();
        for (_, _, path) in files {
            records.extend(read_records(&path)?);
        }
        Ok(records)
    }

    /// Every cached record of one season, in week order.
    pub fn load_season(&self, season: i32) -> Result<Vec<GameRecord>, CacheError> {
        self.load_files(list_week_files(&self.dir, Some(std::slice::from_ref(&season)))?)
    }

    /// Every cached record, in (season, week) order.
    pub fn load_all(&self) -> Result<Vec<GameRecord>, CacheError> {
        self.load_files(list_week_files(&self.dir, None)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use serde_json::{json, Value};
    use std::future::Future;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeSource {
        per_day: Vec<Value>,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn new(per_day: Vec<Value>) -> Self {
            Self {
                per_day,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl GameSource for FakeSource {
        fn fetch_days(
            &self,
            days: &[NaiveDate],
            _season: Option<i32>,
        ) -> impl Future<Output = Result<Vec<Value>, ApiError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // One copy of the slate on the first day of the window.
            let games = if days.is_empty() {
                Vec::new()
            } else {
                self.per_day.clone()
            };
            async move { Ok(games) }
        }
    }

    fn game(home: &str, away: &str, hp: i64, ap: i64) -> Value {
        json!({
            "game": {"date": {"date": "2024-09-08", "timestamp": 1725814800}},
            "teams": {"home": {"name": home}, "away": {"name": away}},
            "scores": {"home": {"total": hp}, "away": {"total": ap}}
        })
    }

    fn temp_root(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("nfl-lines-cache-{}-{}", std::process::id(), name));
        let _ = std::fs::remove_dir_all(&root);
        root
    }

    #[test]
    fn test_parse_week_file_name() {
        assert_eq!(parse_week_file_name("2024_wk1.parquet"), Some((2024, 1)));
        assert_eq!(parse_week_file_name("2021_wk01.parquet"), Some((2021, 1)));
        assert_eq!(parse_week_file_name("nfl_2023_WK18.PARQUET"), Some((2023, 18)));
        assert_eq!(parse_week_file_name("_upcoming_schedule.parquet"), None);
        assert_eq!(parse_week_file_name("2024_wk.parquet"), None);
        assert_eq!(parse_week_file_name("2024_wk1.csv"), None);
    }

    #[test]
    fn test_week_path() {
        let cache = WeekCache::new("/tmp/nfl");
        assert_eq!(cache.week_path(2024, 3), PathBuf::from("/tmp/nfl/api_sports_nfl/2024_wk3.parquet"));
    }

    #[tokio::test]
    async fn test_get_week_cache_first() {
        let root = temp_root("cache-first");
        let cache = WeekCache::new(&root);
        let source = FakeSource::new(vec![game("Kansas City Chiefs", "Baltimore Ravens", 27, 20)]);

        let (records, from) = cache.get_week(&source, 2024, 1, false).await.unwrap();
        assert_eq!(from, WeekSource::Fetched);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].season, 2024);
        assert_eq!(records[0].week, 1);

        let (cached, from) = cache.get_week(&source, 2024, 1, false).await.unwrap();
        assert_eq!(from, WeekSource::Cached);
        assert_eq!(cached, records);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        let (_, from) = cache.get_week(&source, 2024, 1, true).await.unwrap();
        assert_eq!(from, WeekSource::Fetched);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);

        std::fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn test_update_stops_at_last_completed_week() {
        let root = temp_root("update");
        let cache = WeekCache::new(&root);
        let source = FakeSource::new(vec![game("A", "B", 1, 0)]);
        let today = NaiveDate::from_ymd_opt(2024, 9, 18).unwrap();

        let outcomes = cache.update(&source, 2024, today, false).await.unwrap();
        assert_eq!(outcomes.iter().map(|o| o.week).collect::<Vec<_>>(), vec![1, 2]);
        assert!(outcomes.iter().all(|o| o.source == WeekSource::Fetched));

        let again = cache.update(&source, 2024, today, false).await.unwrap();
        assert!(again.iter().all(|o| o.source == WeekSource::Cached && o.rows == 1));
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);

        let status = cache.status().unwrap();
        assert_eq!(status.seasons.get(&2024), Some(&vec![1, 2]));
        assert_eq!(status.rows.get(&2024), Some(&2));

        assert_eq!(cache.load_season(2024).unwrap().len(), 2);
        assert!(matches!(cache.load_season(2023), Err(CacheError::NoFiles(_))));
        std::fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn test_backfill_skips_unknown_season() {
        let root = temp_root("backfill");
        let cache = WeekCache::new(&root);
        let source = FakeSource::new(vec![]);
        let outcomes = cache.backfill(&source, &[2099], false).await.unwrap();
        assert!(outcomes.is_empty());
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        std::fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn test_fetch_upcoming_writes_side_file() {
        let root = temp_root("upcoming");
        let cache = WeekCache::new(&root);
        let source = FakeSource::new(vec![
            game("New York Jets", "Buffalo Bills", 0, 0),
            game("Atlanta Falcons", "Tampa Bay Buccaneers", 0, 0),
        ]);
        let records = cache.fetch_upcoming(&source, 2025, 1).await.unwrap();
        assert_eq!(records[0].home.as_deref(), Some("Atlanta Falcons"));
        assert!(cache.upcoming_path().exists());
        assert!(cache.read_week(2025, 1).unwrap().is_none());
        assert!(list_week_files(cache.dir(), None).unwrap().is_empty());
        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_status_of_missing_dir_is_empty() {
        let cache = WeekCache::new(temp_root("missing"));
        let status = cache.status().unwrap();
        assert!(status.seasons.is_empty());
    }
}
