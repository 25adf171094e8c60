use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One game flattened out of an API-Sports payload.
///
/// The payload shape varies between endpoints and plan tiers, so every
/// field is looked up in a few places and left empty when nothing fits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    /// Game date (`YYYY-MM-DD`) in the timezone the API was asked for.
    pub date: Option<String>,
    pub season: i32,
    pub week: u32,
    pub home: Option<String>,
    pub away: Option<String>,
    pub home_points: Option<i64>,
    pub away_points: Option<i64>,
    pub neutral: bool,
    /// Kickoff as RFC 3339 UTC, when the payload carries a timestamp.
    pub kickoff_utc: Option<String>,
}

/// A row of the schedule CSV consumed by `price`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleRow {
    pub week: u32,
    pub date: String,
    pub away: String,
    pub home: String,
    pub neutral: u8,
}

impl GameRecord {
    /// Schedule row for this game; `None` when either team is unknown.
    pub fn to_schedule_row(&self) -> Option<ScheduleRow> {
        Some(ScheduleRow {
            week: self.week,
            date: self.date.clone().unwrap_or_default(),
            away: self.away.clone()?,
            home: self.home.clone()?,
            neutral: u8::from(self.neutral),
        })
    }

    /// Both scores are known.
    pub fn is_final(&self) -> bool {
        self.home_points.is_some() && self.away_points.is_some()
    }
}

fn non_empty_str(v: Option<&Value>) -> Option<String> {
    v.and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn as_int(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_bool(v: Option<&Value>) -> bool {
    match v {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        Some(Value::String(s)) => matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "t" | "yes" | "y"
        ),
        _ => false,
    }
}

/// Date part of an RFC 3339 timestamp or a bare `YYYY-MM-DD`.
fn date_part(raw: &str) -> Option<String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive().to_string());
    }
    let head = raw.get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d")
        .ok()
        .map(|d| d.to_string())
}

fn team_name(team: Option<&Value>) -> Option<String> {
    let team = team?;
    ["name", "nickname", "code"]
        .iter()
        .find_map(|k| non_empty_str(team.get(*k)))
}

/// A score given either as `{"total": n}` or as a bare number.
fn score(v: Option<&Value>) -> Option<i64> {
    match v? {
        Value::Object(map) => map.get("total").and_then(as_int),
        other => as_int(other),
    }
}

/// Flatten one raw game into a [`GameRecord`].
pub fn normalize_game(season: i32, week: u32, raw: &Value) -> GameRecord {
    let game_date = raw.get("game").and_then(|g| g.get("date"));

    let timestamp = game_date
        .and_then(|d| d.get("timestamp"))
        .and_then(as_int)
        .and_then(|ts| DateTime::from_timestamp(ts, 0));

    let date = game_date
        .and_then(|d| non_empty_str(d.get("date")))
        .and_then(|s| date_part(&s))
        .or_else(|| {
            non_empty_str(raw.get("date"))
                .or_else(|| non_empty_str(raw.get("datetime")))
                .and_then(|s| date_part(&s))
        })
        .or_else(|| timestamp.map(|t| t.date_naive().to_string()));

    let teams = raw.get("teams");
    let home = team_name(teams.and_then(|t| t.get("home"))).or_else(|| non_empty_str(raw.get("home")));
    let away = team_name(teams.and_then(|t| t.get("away"))).or_else(|| non_empty_str(raw.get("away")));

    let scores = raw.get("scores").or_else(|| raw.get("score"));
    let home_points = score(scores.and_then(|s| s.get("home")));
    let away_points = score(scores.and_then(|s| s.get("away")));

    let neutral = as_bool(raw.get("neutral"))
        || as_bool(raw.get("venue").and_then(|v| v.get("neutral")))
        || as_bool(raw.get("game").and_then(|g| g.get("venue")).and_then(|v| v.get("neutral")))
        || as_bool(raw.get("neutral_venue"));

    GameRecord {
        date,
        season,
        week,
        home,
        away,
        home_points,
        away_points,
        neutral,
        kickoff_utc: timestamp.map(|t| t.to_rfc3339()),
    }
}

/// Sort an upcoming slate by date, kickoff, home, away. Missing values sort last.
pub fn sort_schedule(games: &mut [GameRecord]) {
    fn last<T: Ord + Clone>(v: &Option<T>) -> (bool, Option<T>) {
        (v.is_none(), v.clone())
    }
    games.sort_by(|a, b| {
        (a.season, a.week, last(&a.date), last(&a.kickoff_utc), &a.home, &a.away).cmp(&(
            b.season,
            b.week,
            last(&b.date),
            last(&b.kickoff_utc),
            &b.home,
            &b.away,
        ))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_nested_game_payload() {
        let raw = json!({
            "game": {
                "id": 7532,
                "week": "Week 1",
                "date": {"timezone": "UTC", "date": "2024-09-06", "time": "00:20", "timestamp": 1725582000},
                "venue": {"name": "GEHA Field at Arrowhead Stadium", "city": "Kansas City"}
            },
            "teams": {
                "home": {"id": 17, "name": "Kansas City Chiefs"},
                "away": {"id": 15, "name": "Baltimore Ravens"}
            },
            "scores": {
                "home": {"quarter_1": 7, "total": 27},
                "away": {"quarter_1": 7, "total": 20}
            }
        });
        let rec = normalize_game(2024, 1, &raw);
        assert_eq!(rec.date.as_deref(), Some("2024-09-06"));
        assert_eq!(rec.home.as_deref(), Some("Kansas City Chiefs"));
        assert_eq!(rec.away.as_deref(), Some("Baltimore Ravens"));
        assert_eq!(rec.home_points, Some(27));
        assert_eq!(rec.away_points, Some(20));
        assert!(!rec.neutral);
        assert_eq!(rec.kickoff_utc.as_deref(), Some("2024-09-06T00:20:00+00:00"));
        assert!(rec.is_final());
    }

    #[test]
    fn test_normalize_flat_payload() {
        let raw = json!({
            "date": "2023-10-01T13:30:00+00:00",
            "teams": {"home": {"code": "JAX"}, "away": {"nickname": "Falcons"}},
            "score": {"home": "23", "away": 7},
            "venue": {"neutral": "yes"}
        });
        let rec = normalize_game(2023, 4, &raw);
        assert_eq!(rec.date.as_deref(), Some("2023-10-01"));
        assert_eq!(rec.home.as_deref(), Some("JAX"));
        assert_eq!(rec.away.as_deref(), Some("Falcons"));
        assert_eq!(rec.home_points, Some(23));
        assert_eq!(rec.away_points, Some(7));
        assert!(rec.neutral);
        assert_eq!(rec.kickoff_utc, None);
    }

    #[test]
    fn test_normalize_unplayed_game() {
        let raw = json!({
            "game": {"date": {"date": "2025-09-04", "timestamp": 1757032200}},
            "teams": {"home": {"name": "Philadelphia Eagles"}, "away": {"name": "Dallas Cowboys"}},
            "scores": {"home": {"total": null}, "away": {"total": null}}
        });
        let rec = normalize_game(2025, 1, &raw);
        assert_eq!(rec.home_points, None);
        assert!(!rec.is_final());
        let row = rec.to_schedule_row().unwrap();
        assert_eq!(row.home, "Philadelphia Eagles");
        assert_eq!(row.neutral, 0);
    }

    #[test]
    fn test_normalize_empty_payload() {
        let rec = normalize_game(2024, 2, &json!({}));
        assert_eq!(rec.date, None);
        assert_eq!(rec.home, None);
        assert!(rec.to_schedule_row().is_none());
    }

    #[test]
    fn test_sort_schedule_by_kickoff() {
        let mk = |date: &str, kick: Option<&str>, home: &str| GameRecord {
            date: Some(date.to_string()),
            season: 2025,
            week: 1,
            home: Some(home.to_string()),
            away: Some("X".to_string()),
            home_points: None,
            away_points: None,
            neutral: false,
            kickoff_utc: kick.map(String::from),
        };
        let mut games = vec![
            mk("2025-09-07", Some("2025-09-07T17:00:00+00:00"), "NYJ"),
            mk("2025-09-04", Some("2025-09-05T00:20:00+00:00"), "PHI"),
            mk("2025-09-07", None, "ATL"),
            mk("2025-09-07", Some("2025-09-07T17:00:00+00:00"), "CLE"),
        ];
        sort_schedule(&mut games);
        let homes: Vec<_> = games.iter().map(|g| g.home.as_deref().unwrap()).collect();
        assert_eq!(homes, vec!["PHI", "CLE", "NYJ", "ATL"]);
    }
}
