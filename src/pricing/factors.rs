use super::context::FactorContext;

/// Partial adjustment produced by one factor.
///
/// Spread pipelines read `spread`, total pipelines read `total`; whichever
/// the factor does not set stays `0.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FactorDelta {
    pub spread: f64,
    pub total: f64,
}

impl FactorDelta {
    pub fn spread(delta: f64) -> Self {
        Self {
            spread: delta,
            ..Self::default()
        }
    }

    pub fn total(delta: f64) -> Self {
        Self {
            total: delta,
            ..Self::default()
        }
    }
}

/// A named adjustment applied to one game.
///
/// Implementations must be pure: read only from the context, keep no
/// mutable state, so one instance can price many games from many threads.
pub trait Factor: Send + Sync {
    fn name(&self) -> &str;
    fn apply(&self, ctx: &FactorContext<'_>) -> FactorDelta;
}

/// Home-field advantage, or the neutral-site value when the game is neutral.
#[derive(Debug, Default)]
pub struct HomeField;

impl Factor for HomeField {
    fn name(&self) -> &str {
        "home_field"
    }

    fn apply(&self, ctx: &FactorContext<'_>) -> FactorDelta {
        let hfa = if ctx.game.neutral {
            ctx.params.neutral_home_field_points
        } else {
            ctx.params.home_field_points
        };
        FactorDelta::spread(hfa)
    }
}

/// Weighted quarterback differential.
#[derive(Debug, Default)]
pub struct QbAdjust;

impl Factor for QbAdjust {
    fn name(&self) -> &str {
        "qb_adjust"
    }

    fn apply(&self, ctx: &FactorContext<'_>) -> FactorDelta {
        let w = ctx.params.qb_weight;
        FactorDelta::spread(w * (ctx.home.qb() - ctx.away.qb()))
    }
}

/// Offense minus defense of both sides added to the total.
///
/// Defense is prevention, so a better defense lowers the total.
#[derive(Debug, Default)]
pub struct OffDefTotal;

impl Factor for OffDefTotal {
    fn name(&self) -> &str {
        "off_def_total"
    }

    fn apply(&self, ctx: &FactorContext<'_>) -> FactorDelta {
        if !ctx.params.use_off_def_for_total {
            return FactorDelta::total(0.0);
        }
        let offense = ctx.home.offense() + ctx.away.offense();
        let defense = ctx.home.defense() + ctx.away.defense();
        FactorDelta::total(offense - defense)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::{Game, Params, TeamRating};

    fn ctx<'a>(
        params: &'a Params,
        home: &'a TeamRating,
        away: &'a TeamRating,
        game: &'a Game,
    ) -> FactorContext<'a> {
        FactorContext {
            params,
            home,
            away,
            game,
        }
    }

    #[test]
    fn test_home_field_regular_site() {
        let params = Params::default();
        let home = TeamRating::new("KC", 5.0);
        let away = TeamRating::new("BUF", 3.0);
        let game = Game::new(1, "2024-09-05", "KC", "BUF");
        let delta = HomeField.apply(&ctx(&params, &home, &away, &game));
        assert_eq!(delta.spread, 1.65);
        assert_eq!(delta.total, 0.0);
    }

    #[test]
    fn test_home_field_neutral_site() {
        let params = Params {
            neutral_home_field_points: 0.4,
            ..Params::default()
        };
        let home = TeamRating::new("KC", 5.0);
        let away = TeamRating::new("BUF", 3.0);
        let game = Game::new(1, "2024-09-05", "KC", "BUF").at_neutral_site(true);
        let delta = HomeField.apply(&ctx(&params, &home, &away, &game));
        assert_eq!(delta.spread, 0.4);
    }

    #[test]
    fn test_qb_adjust_weighted() {
        let params = Params {
            qb_weight: 0.5,
            ..Params::default()
        };
        let home = TeamRating::new("KC", 5.0).with_qb_points(4.0);
        let away = TeamRating::new("BUF", 3.0).with_qb_points(1.0);
        let game = Game::new(1, "2024-09-05", "KC", "BUF");
        let delta = QbAdjust.apply(&ctx(&params, &home, &away, &game));
        assert_eq!(delta.spread, 1.5);
    }

    #[test]
    fn test_qb_adjust_missing_reads_zero() {
        let params = Params::default();
        let home = TeamRating::new("KC", 5.0);
        let away = TeamRating::new("BUF", 3.0).with_qb_points(2.0);
        let game = Game::new(1, "2024-09-05", "KC", "BUF");
        let delta = QbAdjust.apply(&ctx(&params, &home, &away, &game));
        assert_eq!(delta.spread, -2.0);
    }

    #[test]
    fn test_off_def_total_subtracts_defense() {
        let params = Params::default();
        let home = TeamRating::new("KC", 5.0).with_off_def(3.0, 1.0);
        let away = TeamRating::new("BUF", 3.0).with_off_def(2.0, 2.5);
        let game = Game::new(1, "2024-09-05", "KC", "BUF");
        let delta = OffDefTotal.apply(&ctx(&params, &home, &away, &game));
        assert_eq!(delta.total, 1.5);
        assert_eq!(delta.spread, 0.0);
    }

    #[test]
    fn test_off_def_total_disabled() {
        let params = Params {
            use_off_def_for_total: false,
            ..Params::default()
        };
        let home = TeamRating::new("KC", 5.0).with_off_def(3.0, 1.0);
        let away = TeamRating::new("BUF", 3.0).with_off_def(2.0, 2.5);
        let game = Game::new(1, "2024-09-05", "KC", "BUF");
        let delta = OffDefTotal.apply(&ctx(&params, &home, &away, &game));
        assert_eq!(delta, FactorDelta::default());
    }
}
