use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Serialize, Serializer};
use tracing::{debug, info};

use crate::error::PricingError;

use super::context::{Game, TeamRating};
use super::models::{Composition, SpreadModel, TotalModel};
use super::odds::{american_odds_from_prob, win_prob_from_spread};
use super::params::{Params, PipelineConfig};
use super::registry::FactorRegistry;

/// A scheduled game with both sides' ratings attached.
#[derive(Debug, Clone, PartialEq)]
pub struct Matchup {
    pub game: Game,
    pub home: TeamRating,
    pub away: TeamRating,
}

/// One priced game. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineOutput {
    pub week: u32,
    pub date: String,
    pub away: String,
    pub home: String,
    #[serde(serialize_with = "bool_as_int")]
    pub neutral: bool,
    pub model_spread_home: f64,
    pub model_total: f64,
    pub home_team_total: f64,
    pub away_team_total: f64,
    pub home_win_prob: f64,
    pub away_win_prob: f64,
    pub ml_home: i32,
    pub ml_away: i32,
}

fn bool_as_int<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*value))
}

/// Factor-by-factor breakdown of one priced game.
#[derive(Debug, Clone)]
pub struct LineExplanation {
    pub line: LineOutput,
    pub spread: Composition,
    pub total: Composition,
}

/// Composition root: owns both models and the shared parameters.
pub struct Engine {
    params: Arc<Params>,
    spread: SpreadModel,
    total: TotalModel,
}

impl Engine {
    /// Builds both models. Fails on the first unknown factor name, spread
    /// pipeline first.
    pub fn new(
        params: Params,
        pipeline: &PipelineConfig,
        registry: &FactorRegistry,
    ) -> Result<Self, PricingError> {
        let params = Arc::new(params);
        let spread = SpreadModel::new(Arc::clone(&params), pipeline, registry)?;
        let total = TotalModel::new(Arc::clone(&params), pipeline, registry)?;
        debug!(
            spread_factors = ?spread.factor_names(),
            total_factors = ?total.factor_names(),
            "engine built"
        );
        Ok(Self {
            params,
            spread,
            total,
        })
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn spread_model(&self) -> &SpreadModel {
        &self.spread
    }

    pub fn total_model(&self) -> &TotalModel {
        &self.total
    }

    /// Attach ratings to every scheduled game.
    ///
    /// Any schedule team without a rating fails the whole merge, listing each
    /// missing key once in sorted order. When the ratings contain a team twice
    /// the later row wins.
    pub fn merge(schedule: &[Game], ratings: &[TeamRating]) -> Result<Vec<Matchup>, PricingError> {
        let by_key: HashMap<&str, &TeamRating> = ratings
            .iter()
            .map(|r| (r.team_key.as_str(), r))
            .collect();

        let missing: BTreeSet<&str> = schedule
            .iter()
            .flat_map(|g| [g.home_key.as_str(), g.away_key.as_str()])
            .filter(|key| !by_key.contains_key(key))
            .collect();
        if !missing.is_empty() {
            return Err(PricingError::DataIntegrity {
                missing: missing.into_iter().map(String::from).collect(),
            });
        }

        Ok(schedule
            .iter()
            .map(|game| Matchup {
                game: game.clone(),
                home: by_key[game.home_key.as_str()].clone(),
                away: by_key[game.away_key.as_str()].clone(),
            })
            .collect())
    }

    /// Price every matchup, preserving input order.
    pub fn price(&self, matchups: &[Matchup]) -> Vec<LineOutput> {
        let lines: Vec<LineOutput> = matchups.iter().map(|m| self.price_one(m)).collect();
        info!(games = lines.len(), "priced schedule");
        lines
    }

    /// Merge then price. Nothing is priced if the merge fails.
    pub fn price_schedule(
        &self,
        schedule: &[Game],
        ratings: &[TeamRating],
    ) -> Result<Vec<LineOutput>, PricingError> {
        let matchups = Self::merge(schedule, ratings)?;
        Ok(self.price(&matchups))
    }

    pub fn price_one(&self, m: &Matchup) -> LineOutput {
        let spread = self.spread.compute(&m.home, &m.away, &m.game);
        let total = self.total.compute(&m.home, &m.away, &m.game);
        self.line(m, spread, total)
    }

    pub fn explain(&self, m: &Matchup) -> LineExplanation {
        let spread = self.spread.explain(&m.home, &m.away, &m.game);
        let total = self.total.explain(&m.home, &m.away, &m.game);
        LineExplanation {
            line: self.line(m, spread.value, total.value),
            spread,
            total,
        }
    }

    fn line(&self, m: &Matchup, spread: f64, total: f64) -> LineOutput {
        let home_win_prob = win_prob_from_spread(spread, self.params.margin_sd);
        let away_win_prob = 1.0 - home_win_prob;
        let home_team_total = (total + spread) / 2.0;
        let away_team_total = total - home_team_total;

        LineOutput {
            week: m.game.week,
            date: m.game.date.clone(),
            away: m.game.away.clone(),
            home: m.game.home.clone(),
            neutral: m.game.neutral,
            model_spread_home: spread,
            model_total: total,
            home_team_total,
            away_team_total,
            home_win_prob,
            away_win_prob,
            ml_home: american_odds_from_prob(home_win_prob),
            ml_away: american_odds_from_prob(away_win_prob),
        }
    }
}
