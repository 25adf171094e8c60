//! Ratings and schedule CSV loaders.
//!
//! Header names are matched case-insensitively. Team names are kept as
//! written; the join key is derived with [`team_key`].

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use tracing::debug;

use crate::error::LoadError;
use crate::pricing::{team_key, Game, TeamRating};

const RATINGS: &str = "ratings";
const SCHEDULE: &str = "schedule";

const REQUIRED_RATINGS: [&str; 2] = ["team", "power"];
const REQUIRED_SCHEDULE: [&str; 4] = ["week", "date", "away", "home"];

/// Column positions by lowercased header name.
struct Columns {
    table: &'static str,
    index: HashMap<String, usize>,
}

impl Columns {
    fn from_headers(table: &'static str, headers: &StringRecord) -> Self {
        let index = headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().trim_start_matches('\u{feff}').to_lowercase(), i))
            .collect();
        Self { table, index }
    }

    fn require(&self, required: &[&str]) -> Result<(), LoadError> {
        let missing: Vec<String> = required
            .iter()
            .filter(|c| !self.index.contains_key(**c))
            .map(|c| c.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(LoadError::MissingColumns {
                table: self.table,
                missing,
            })
        }
    }

    /// First of `names` present in the header.
    fn find(&self, names: &[&str]) -> Option<usize> {
        names.iter().find_map(|n| self.index.get(*n).copied())
    }

    fn cell<'r>(&self, record: &'r StringRecord, name: &str) -> &'r str {
        self.index
            .get(name)
            .and_then(|&i| record.get(i))
            .unwrap_or("")
    }
}

fn reader_for<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })
}

fn invalid(table: &'static str, line: usize, column: &'static str, value: &str) -> LoadError {
    LoadError::InvalidValue {
        table,
        line,
        column,
        value: value.to_string(),
    }
}

/// Finite numbers only; `parse::<f64>` alone would also take `nan` and `inf`.
fn parse_f64(table: &'static str, line: usize, column: &'static str, raw: &str) -> Result<f64, LoadError> {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(invalid(table, line, column, raw)),
    }
}

/// Empty and NaN cells are missing values.
fn parse_optional_f64(
    table: &'static str,
    line: usize,
    column: &'static str,
    raw: &str,
) -> Result<Option<f64>, LoadError> {
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") || raw.eq_ignore_ascii_case("na") {
        return Ok(None);
    }
    parse_f64(table, line, column, raw).map(Some)
}

/// Week numbers may come through spreadsheets as `1.0`.
fn parse_week(line: usize, raw: &str) -> Result<u32, LoadError> {
    if let Ok(week) = raw.parse::<u32>() {
        return Ok(week);
    }
    match raw.parse::<f64>() {
        Ok(w) if w >= 0.0 && w.fract() == 0.0 && w <= u32::MAX as f64 => Ok(w as u32),
        _ => Err(invalid(SCHEDULE, line, "week", raw)),
    }
}

pub(crate) fn parse_neutral(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "" | "0" | "0.0" | "false" | "f" | "no" | "n" => Some(false),
        "1" | "1.0" | "true" | "t" | "yes" | "y" => Some(true),
        _ => None,
    }
}

/// Read ratings rows. Requires `team` and `power`; `off`, `def` (or
/// `def_`) and `qb_points` are optional.
pub fn read_ratings<R: Read>(reader: R) -> Result<Vec<TeamRating>, LoadError> {
    let mut rdr = reader_for(reader);
    let headers = rdr
        .headers()
        .map_err(|source| LoadError::Csv { table: RATINGS, source })?
        .clone();
    let cols = Columns::from_headers(RATINGS, &headers);
    cols.require(&REQUIRED_RATINGS)?;

    let off_col = cols.find(&["off"]);
    let def_col = cols.find(&["def"]);
    let def_alt_col = cols.find(&["def_"]);
    let qb_col = cols.find(&["qb_points"]);
    let optional = |record: &StringRecord, col: Option<usize>, line: usize, name: &'static str| {
        let raw = col.and_then(|i| record.get(i)).unwrap_or("");
        parse_optional_f64(RATINGS, line, name, raw)
    };

    let mut ratings = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let line = idx + 2;
        let record = result.map_err(|source| LoadError::Csv { table: RATINGS, source })?;
        if record.iter().all(|c| c.is_empty()) {
            continue;
        }

        let team = cols.cell(&record, "team");
        if team.is_empty() {
            return Err(invalid(RATINGS, line, "team", team));
        }
        let power = parse_f64(RATINGS, line, "power", cols.cell(&record, "power"))?;

        ratings.push(TeamRating {
            team: team.to_string(),
            team_key: team_key(team),
            power,
            off: optional(&record, off_col, line, "off")?,
            def: match optional(&record, def_col, line, "def")? {
                // A blank or zero `def` falls back to `def_` in the same row.
                Some(v) if v != 0.0 => Some(v),
                primary => optional(&record, def_alt_col, line, "def_")?.or(primary),
            },
            qb_points: optional(&record, qb_col, line, "qb_points")?,
        });
    }
    Ok(ratings)
}

/// Read schedule rows. Requires `week`, `date`, `away`, `home`; `neutral`
/// defaults to false.
pub fn read_schedule<R: Read>(reader: R) -> Result<Vec<Game>, LoadError> {
    let mut rdr = reader_for(reader);
    let headers = rdr
        .headers()
        .map_err(|source| LoadError::Csv { table: SCHEDULE, source })?
        .clone();
    let cols = Columns::from_headers(SCHEDULE, &headers);
    cols.require(&REQUIRED_SCHEDULE)?;

    let mut games = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let line = idx + 2;
        let record = result.map_err(|source| LoadError::Csv { table: SCHEDULE, source })?;
        if record.iter().all(|c| c.is_empty()) {
            continue;
        }

        let week = parse_week(line, cols.cell(&record, "week"))?;
        let home = cols.cell(&record, "home");
        let away = cols.cell(&record, "away");
        if home.is_empty() {
            return Err(invalid(SCHEDULE, line, "home", home));
        }
        if away.is_empty() {
            return Err(invalid(SCHEDULE, line, "away", away));
        }
        let raw_neutral = cols.cell(&record, "neutral");
        let neutral =
            parse_neutral(raw_neutral).ok_or_else(|| invalid(SCHEDULE, line, "neutral", raw_neutral))?;

        games.push(Game::new(week, cols.cell(&record, "date"), home, away).at_neutral_site(neutral));
    }
    Ok(games)
}

pub fn load_ratings(path: &Path) -> Result<Vec<TeamRating>, LoadError> {
    let ratings = read_ratings(open(path)?)?;
    debug!(path = %path.display(), teams = ratings.len(), "loaded ratings");
    Ok(ratings)
}

pub fn load_schedule(path: &Path) -> Result<Vec<Game>, LoadError> {
    let games = read_schedule(open(path)?)?;
    debug!(path = %path.display(), games = games.len(), "loaded schedule");
    Ok(games)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_ratings_case_insensitive_headers() {
        let csv = "Team,POWER,Off,Def,qb_points\n kc ,5.0,3.0,1.0,2.0\nBUF,3.0,,,\n";
        let ratings = read_ratings(csv.as_bytes()).unwrap();
        assert_eq!(ratings.len(), 2);
        assert_eq!(ratings[0].team_key, "KC");
        assert_eq!(ratings[0].off, Some(3.0));
        assert_eq!(ratings[0].def, Some(1.0));
        assert_eq!(ratings[0].qb_points, Some(2.0));
        assert_eq!(ratings[1].off, None);
        assert_eq!(ratings[1].qb(), 0.0);
    }

    #[test]
    fn test_read_ratings_rejects_non_finite_power() {
        for bad in ["nan", "NaN", "inf", "-infinity"] {
            let csv = format!("team,power\nKC,{}\nBUF,3.0\n", bad);
            match read_ratings(csv.as_bytes()) {
                Err(LoadError::InvalidValue { line, column, value, .. }) => {
                    assert_eq!(line, 2);
                    assert_eq!(column, "power");
                    assert_eq!(value, bad);
                }
                other => panic!("expected invalid power for {}, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn test_read_ratings_rejects_infinite_optional() {
        let csv = "team,power,off\nKC,5.0,inf\n";
        assert!(matches!(
            read_ratings(csv.as_bytes()),
            Err(LoadError::InvalidValue { column: "off", .. })
        ));
        let csv = "team,power,off\nKC,5.0,nan\n";
        assert_eq!(read_ratings(csv.as_bytes()).unwrap()[0].off, None);
    }

    #[test]
    fn test_read_ratings_def_falls_back_per_row() {
        let csv = "team,power,def,def_\nKC,5,,2.5\nBUF,3,0,1.5\nDAL,1,4.0,9.0\nNYG,0,0,\n";
        let ratings = read_ratings(csv.as_bytes()).unwrap();
        assert_eq!(ratings[0].def, Some(2.5));
        assert_eq!(ratings[1].def, Some(1.5));
        assert_eq!(ratings[2].def, Some(4.0));
        assert_eq!(ratings[3].def, Some(0.0));
    }

    #[test]
    fn test_read_ratings_def_underscore_alias() {
        let csv = "team,power,off,def_\nKC,5,24,20.5\n";
        let ratings = read_ratings(csv.as_bytes()).unwrap();
        assert_eq!(ratings[0].def, Some(20.5));
    }

    #[test]
    fn test_read_ratings_missing_columns() {
        let csv = "name,rating\nKC,5\n";
        match read_ratings(csv.as_bytes()) {
            Err(LoadError::MissingColumns { table, missing }) => {
                assert_eq!(table, "ratings");
                assert_eq!(missing, vec!["team", "power"]);
            }
            other => panic!("expected missing columns, got {:?}", other),
        }
    }

    #[test]
    fn test_read_ratings_bad_power() {
        let csv = "team,power\nKC,strong\n";
        match read_ratings(csv.as_bytes()) {
            Err(LoadError::InvalidValue { line, column, value, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(column, "power");
                assert_eq!(value, "strong");
            }
            other => panic!("expected invalid value, got {:?}", other),
        }
    }

    #[test]
    fn test_read_schedule_defaults_neutral() {
        let csv = "week,date,away,home\n1,2024-09-05,BUF,KC\n";
        let games = read_schedule(csv.as_bytes()).unwrap();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].week, 1);
        assert_eq!(games[0].home_key, "KC");
        assert_eq!(games[0].away_key, "BUF");
        assert!(!games[0].neutral);
    }

    #[test]
    fn test_read_schedule_neutral_and_float_week() {
        let csv = "Week,Date,Away,Home,Neutral\n1.0,2024-09-06,GB,PHI,1\n2,2024-09-15,kc,cin,false\n";
        let games = read_schedule(csv.as_bytes()).unwrap();
        assert_eq!(games[0].week, 1);
        assert!(games[0].neutral);
        assert_eq!(games[1].home, "cin");
        assert_eq!(games[1].home_key, "CIN");
        assert!(!games[1].neutral);
    }

    #[test]
    fn test_read_schedule_missing_columns() {
        let csv = "week,home\n1,KC\n";
        match read_schedule(csv.as_bytes()) {
            Err(LoadError::MissingColumns { missing, .. }) => {
                assert_eq!(missing, vec!["date", "away"]);
            }
            other => panic!("expected missing columns, got {:?}", other),
        }
    }

    #[test]
    fn test_read_schedule_bad_neutral() {
        let csv = "week,date,away,home,neutral\n1,2024-09-05,BUF,KC,maybe\n";
        assert!(matches!(
            read_schedule(csv.as_bytes()),
            Err(LoadError::InvalidValue { column: "neutral", .. })
        ));
    }

    #[test]
    fn test_parse_neutral() {
        assert_eq!(parse_neutral("Yes"), Some(true));
        assert_eq!(parse_neutral(""), Some(false));
        assert_eq!(parse_neutral("2"), None);
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join("nfl-lines-no-such-ratings.csv");
        assert!(matches!(load_ratings(&path), Err(LoadError::Open { .. })));
    }
}
