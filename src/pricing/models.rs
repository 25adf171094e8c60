use std::sync::Arc;

use tracing::debug;

use crate::error::{FactorKind, PricingError};

use super::context::{FactorContext, Game, TeamRating};
use super::factors::Factor;
use super::params::{Params, PipelineConfig};
use super::registry::FactorRegistry;

/// What one factor did to the running value.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorContribution {
    pub name: String,
    pub delta: f64,
    pub before: f64,
    pub after: f64,
}

/// Step-by-step record of one model evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub base: f64,
    pub factors: Vec<FactorContribution>,
    /// Sum before clamping.
    pub raw: f64,
    /// Final value after clamping.
    pub value: f64,
}

fn build_factors(
    names: &[String],
    kind: FactorKind,
    registry: &FactorRegistry,
) -> Result<Vec<Box<dyn Factor>>, PricingError> {
    names
        .iter()
        .map(|name| {
            registry
                .resolve(name)
                .map_err(|source| PricingError::Configuration { kind, source })
        })
        .collect()
}

/// Runs `factors` in order over `base`, reading the delta for `kind`.
fn compose(
    base: f64,
    factors: &[Box<dyn Factor>],
    kind: FactorKind,
    ctx: &FactorContext<'_>,
) -> (f64, Vec<FactorContribution>) {
    let mut value = base;
    let mut contributions = Vec::with_capacity(factors.len());
    for factor in factors {
        let delta = factor.apply(ctx);
        let delta = match kind {
            FactorKind::Spread => delta.spread,
            FactorKind::Total => delta.total,
        };
        let before = value;
        value += delta;
        debug!(
            factor = factor.name(),
            %kind,
            home = %ctx.game.home_key,
            away = %ctx.game.away_key,
            delta,
            "factor applied"
        );
        contributions.push(FactorContribution {
            name: factor.name().to_string(),
            delta,
            before,
            after: value,
        });
    }
    (value, contributions)
}

/// Power differential plus spread factors, optionally capped.
pub struct SpreadModel {
    params: Arc<Params>,
    factors: Vec<Box<dyn Factor>>,
}

impl SpreadModel {
    /// Resolves every configured spread factor up front; an unknown name
    /// fails here rather than on first use.
    pub fn new(
        params: Arc<Params>,
        pipeline: &PipelineConfig,
        registry: &FactorRegistry,
    ) -> Result<Self, PricingError> {
        let factors = build_factors(&pipeline.spread_factors, FactorKind::Spread, registry)?;
        Ok(Self { params, factors })
    }

    pub fn factor_names(&self) -> Vec<&str> {
        self.factors.iter().map(|f| f.name()).collect()
    }

    pub fn compute(&self, home: &TeamRating, away: &TeamRating, game: &Game) -> f64 {
        self.explain(home, away, game).value
    }

    pub fn explain(&self, home: &TeamRating, away: &TeamRating, game: &Game) -> Composition {
        let ctx = FactorContext {
            params: &self.params,
            home,
            away,
            game,
        };
        let base = home.power - away.power;
        let (raw, factors) = compose(base, &self.factors, FactorKind::Spread, &ctx);
        let value = match self.params.spread_cap {
            Some(cap) => raw.clamp(-cap, cap),
            None => raw,
        };
        Composition {
            base,
            factors,
            raw,
            value,
        }
    }
}

/// League-average total plus pace and total factors, floored at zero.
pub struct TotalModel {
    params: Arc<Params>,
    factors: Vec<Box<dyn Factor>>,
}

impl TotalModel {
    pub fn new(
        params: Arc<Params>,
        pipeline: &PipelineConfig,
        registry: &FactorRegistry,
    ) -> Result<Self, PricingError> {
        let factors = build_factors(&pipeline.total_factors, FactorKind::Total, registry)?;
        Ok(Self { params, factors })
    }

    pub fn factor_names(&self) -> Vec<&str> {
        self.factors.iter().map(|f| f.name()).collect()
    }

    pub fn compute(&self, home: &TeamRating, away: &TeamRating, game: &Game) -> f64 {
        self.explain(home, away, game).value
    }

    pub fn explain(&self, home: &TeamRating, away: &TeamRating, game: &Game) -> Composition {
        let ctx = FactorContext {
            params: &self.params,
            home,
            away,
            game,
        };
        let base = self.params.league_total + 2.0 * self.params.pace_points;
        let (raw, factors) = compose(base, &self.factors, FactorKind::Total, &ctx);
        Composition {
            base,
            factors,
            raw,
            value: raw.max(0.0),
        }
    }
}
