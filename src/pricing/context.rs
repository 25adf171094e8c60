use serde::{Deserialize, Serialize};

use super::params::Params;

/// Normalize a team identifier into the join key used between tables.
pub fn team_key(name: &str) -> String {
    name.trim().to_uppercase()
}

/// One team's rating snapshot.
///
/// Optional components that are absent read as `0.0` through the accessor
/// methods; factors must go through those rather than the raw fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRating {
    pub team: String,
    pub team_key: String,
    pub power: f64,
    pub off: Option<f64>,
    pub def: Option<f64>,
    pub qb_points: Option<f64>,
}

impl TeamRating {
    pub fn new(team: impl Into<String>, power: f64) -> Self {
        let team = team.into();
        Self {
            team_key: team_key(&team),
            team,
            power,
            off: None,
            def: None,
            qb_points: None,
        }
    }

    pub fn with_off_def(mut self, off: f64, def: f64) -> Self {
        self.off = Some(off);
        self.def = Some(def);
        self
    }

    pub fn with_qb_points(mut self, qb_points: f64) -> Self {
        self.qb_points = Some(qb_points);
        self
    }

    /// Offensive rating, `0.0` when missing.
    pub fn offense(&self) -> f64 {
        self.off.unwrap_or(0.0)
    }

    /// Defensive (prevention) rating, `0.0` when missing.
    pub fn defense(&self) -> f64 {
        self.def.unwrap_or(0.0)
    }

    /// Quarterback points, `0.0` when missing.
    pub fn qb(&self) -> f64 {
        self.qb_points.unwrap_or(0.0)
    }
}

/// One scheduled matchup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub week: u32,
    pub date: String,
    pub home: String,
    pub away: String,
    pub home_key: String,
    pub away_key: String,
    pub neutral: bool,
}

impl Game {
    pub fn new(week: u32, date: impl Into<String>, home: impl Into<String>, away: impl Into<String>) -> Self {
        let home = home.into();
        let away = away.into();
        Self {
            week,
            date: date.into(),
            home_key: team_key(&home),
            away_key: team_key(&away),
            home,
            away,
            neutral: false,
        }
    }

    pub fn at_neutral_site(mut self, neutral: bool) -> Self {
        self.neutral = neutral;
        self
    }
}

/// Everything a factor may look at for one game.
#[derive(Debug, Clone, Copy)]
pub struct FactorContext<'a> {
    pub params: &'a Params,
    pub home: &'a TeamRating,
    pub away: &'a TeamRating,
    pub game: &'a Game,
}
