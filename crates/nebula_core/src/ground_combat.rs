//! Ground combat model.
//!
//! One discrete day step shared by the forecaster and
//! [`Simulation::tick_ground_combat`](crate::simulation::Simulation::tick_ground_combat),
//! so a forecast and the live battle agree day for day.
//!
//! Per day, with `forts` the fortification points still standing:
//!
//! ```text
//! bonus         = 1 + forts * fortification_defense_scale
//! off           = 1 + forts * fortification_attack_scale
//! attacker_loss = loss * def * off + artillery * integrity * strength_per_weapon
//! defender_loss = loss * att / bonus
//! ```
//!
//! Losses are capped at the side's strength. Surviving attackers then knock
//! out fortification points. At day end a dead defender facing a living
//! attacker is a capture; otherwise a dead attacker means the defence holds.

use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::math::{non_neg, EPS, EPS_CHANGE};

/// Default cap on forecast length.
pub const DEFAULT_FORECAST_MAX_DAYS: u32 = 3650;

/// Strength at or below which a side is destroyed.
pub const KILL_EPS: f64 = EPS_CHANGE;

/// Attempts at raising the square-law estimate until the forecast wins.
pub const REQUIRED_STRENGTH_MAX_ITERATIONS: u32 = 12;

/// Growth applied per attempt.
pub const REQUIRED_STRENGTH_STEP: f64 = 1.15;

/// Which side won a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GroundBattleWinner {
    /// The invader captured the colony.
    Attacker,
    /// The defence held.
    #[default]
    Defender,
}

impl GroundBattleWinner {
    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Attacker => "Attacker",
            Self::Defender => "Defender",
        }
    }
}

/// Loss model coefficients, clamped non-negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundCombatModel {
    /// Fraction of opposing strength lost per day.
    pub loss_factor: f64,
    /// Defensive fortification scale.
    pub fort_defense_scale: f64,
    /// Offensive fortification scale.
    pub fort_attack_scale: f64,
    /// Attacker strength lost per point of artillery damage.
    pub artillery_strength_per_weapon: f64,
    /// Fortification points destroyed per attacker strength per day.
    pub fort_damage_rate: f64,
}

/// Mutable battle quantities advanced by [`GroundCombatModel::step_day`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BattleSides {
    /// Attacker strength.
    pub attacker: f64,
    /// Defender strength.
    pub defender: f64,
    /// Fortification points knocked out so far.
    pub fort_damage: f64,
}

impl GroundCombatModel {
    /// Coefficients from the config.
    #[must_use]
    pub fn from_config(cfg: &SimConfig) -> Self {
        Self {
            loss_factor: non_neg(cfg.ground_combat_loss_factor),
            fort_defense_scale: non_neg(cfg.fortification_defense_scale),
            fort_attack_scale: non_neg(cfg.fortification_attack_scale),
            artillery_strength_per_weapon: non_neg(
                cfg.ground_combat_defender_artillery_strength_per_weapon_damage,
            ),
            fort_damage_rate: non_neg(
                cfg.ground_combat_fortification_damage_per_attacker_strength_day,
            ),
        }
    }

    /// Defender loss divisor for the given standing fortifications.
    #[must_use]
    pub fn defense_bonus(&self, forts: f64) -> f64 {
        non_neg(1.0 + non_neg(forts) * self.fort_defense_scale)
    }

    /// Attacker loss multiplier for the given standing fortifications.
    #[must_use]
    pub fn offense_bonus(&self, forts: f64) -> f64 {
        non_neg(1.0 + non_neg(forts) * self.fort_attack_scale)
    }

    /// Advance one day.
    ///
    /// `forts_total` is the undamaged fortification total and
    /// `artillery_weapon_damage` the undamaged artillery; both are
    /// scaled by the fortification integrity remaining at the start of the day.
    pub fn step_day(
        &self,
        sides: &mut BattleSides,
        forts_total: f64,
        artillery_weapon_damage: f64,
    ) {
        let forts_total = non_neg(forts_total);
        let standing = non_neg(forts_total - sides.fort_damage);
        let bonus = self.defense_bonus(standing);
        let off = self.offense_bonus(standing);
        let integrity = if forts_total > EPS {
            (standing / forts_total).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let artillery_loss =
            non_neg(artillery_weapon_damage) * integrity * self.artillery_strength_per_weapon;

        let att = sides.attacker;
        let def = sides.defender;
        let attacker_loss = (self.loss_factor * def * off + artillery_loss).min(att);
        let defender_loss = if bonus > EPS {
            self.loss_factor * att / bonus
        } else {
            self.loss_factor * att
        }
        .min(def);

        sides.attacker = non_neg(att - attacker_loss);
        sides.defender = non_neg(def - defender_loss);

        if self.fort_damage_rate > EPS && forts_total > EPS && sides.attacker > EPS {
            sides.fort_damage =
                (sides.fort_damage + sides.attacker * self.fort_damage_rate).min(forts_total);
        }
    }
}

/// Outcome of a battle at the current strengths, if it is over.
#[must_use]
pub fn resolution(attacker: f64, defender: f64) -> Option<GroundBattleWinner> {
    let attacker_dead = attacker <= KILL_EPS;
    let defender_dead = defender <= KILL_EPS;
    if defender_dead && !attacker_dead {
        Some(GroundBattleWinner::Attacker)
    } else if attacker_dead {
        Some(GroundBattleWinner::Defender)
    } else {
        None
    }
}

/// Forecast options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundBattleForecastOptions {
    /// Days simulated before giving up.
    pub max_days: u32,
}

impl Default for GroundBattleForecastOptions {
    fn default() -> Self {
        Self {
            max_days: DEFAULT_FORECAST_MAX_DAYS,
        }
    }
}

/// Forecast result.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GroundBattleForecast {
    /// Inputs were usable.
    pub ok: bool,
    /// The battle did not resolve.
    pub truncated: bool,
    /// Why the forecast stopped early.
    pub truncated_reason: String,
    /// Attacker strength at day 0.
    pub attacker_start: f64,
    /// Defender strength at day 0.
    pub defender_start: f64,
    /// Fortification points at day 0.
    pub fort_points: f64,
    /// Defence bonus at day 0.
    pub defense_bonus: f64,
    /// Days until resolution.
    pub days_to_resolve: u32,
    /// Winner. Defender when truncated.
    pub winner: GroundBattleWinner,
    /// Attacker strength at the end.
    pub attacker_end: f64,
    /// Defender strength at the end.
    pub defender_end: f64,
}

/// Forecast a ground battle day by day.
///
/// Mirrors the live tick exactly. Non-finite inputs give `ok = false`.
#[must_use]
pub fn forecast_ground_battle(
    cfg: &SimConfig,
    attacker_strength: f64,
    defender_strength: f64,
    fort_points: f64,
    defender_artillery_weapon_damage_per_day: f64,
    options: GroundBattleForecastOptions,
) -> GroundBattleForecast {
    let mut out = GroundBattleForecast::default();
    if !attacker_strength.is_finite()
        || !defender_strength.is_finite()
        || !fort_points.is_finite()
    {
        out.truncated = true;
        out.truncated_reason = "Non-finite inputs".to_string();
        return out;
    }

    let model = GroundCombatModel::from_config(cfg);
    let forts = non_neg(fort_points);
    let artillery = if defender_artillery_weapon_damage_per_day.is_finite() {
        non_neg(defender_artillery_weapon_damage_per_day)
    } else {
        0.0
    };
    let mut sides = BattleSides {
        attacker: non_neg(attacker_strength),
        defender: non_neg(defender_strength),
        fort_damage: 0.0,
    };

    out.ok = true;
    out.attacker_start = sides.attacker;
    out.defender_start = sides.defender;
    out.fort_points = forts;
    out.defense_bonus = model.defense_bonus(forts);

    let finish = |out: &mut GroundBattleForecast,
                  sides: &mut BattleSides,
                  days: u32,
                  winner: GroundBattleWinner| {
        match winner {
            GroundBattleWinner::Attacker => sides.defender = 0.0,
            GroundBattleWinner::Defender => sides.attacker = 0.0,
        }
        out.days_to_resolve = days;
        out.winner = winner;
        out.attacker_end = sides.attacker;
        out.defender_end = sides.defender;
    };

    if let Some(winner) = resolution(sides.attacker, sides.defender) {
        finish(&mut out, &mut sides, 0, winner);
        return out;
    }

    for day in 0..options.max_days {
        model.step_day(&mut sides, forts, artillery);
        if let Some(winner) = resolution(sides.attacker, sides.defender) {
            finish(&mut out, &mut sides, day + 1, winner);
            return out;
        }
    }

    out.truncated = true;
    out.truncated_reason = if options.max_days == 0 {
        "max_days == 0".to_string()
    } else {
        "Exceeded max_days".to_string()
    };
    out.days_to_resolve = options.max_days;
    out.winner = GroundBattleWinner::Defender;
    out.attacker_end = sides.attacker;
    out.defender_end = sides.defender;
    out
}

/// Continuous square-law estimate of the attacker strength needed to win.
///
/// Artillery is folded in as an equivalent defender strength. The discrete
/// forecast favours the defender, so callers wanting a guaranteed win should
/// use [`required_attacker_strength`].
#[must_use]
pub fn square_law_required_attacker_strength(
    cfg: &SimConfig,
    defender_strength: f64,
    fort_points: f64,
    defender_artillery_weapon_damage_per_day: f64,
    margin_factor: f64,
) -> f64 {
    let model = GroundCombatModel::from_config(cfg);
    let forts = non_neg(fort_points);
    let artillery_equiv = if model.loss_factor > EPS {
        non_neg(defender_artillery_weapon_damage_per_day) * model.artillery_strength_per_weapon
            / model.loss_factor
    } else {
        0.0
    };
    let def_eff = non_neg(defender_strength) + artillery_equiv;
    let fort_factor = (model.defense_bonus(forts) * model.offense_bonus(forts)).sqrt();
    fort_factor * def_eff * non_neg(margin_factor)
}

/// Square-law estimate raised until the forecast predicts a capture.
///
/// Multiplies by [`REQUIRED_STRENGTH_STEP`] up to
/// [`REQUIRED_STRENGTH_MAX_ITERATIONS`] times. Returns the strength and the
/// forecast at that strength.
#[must_use]
pub fn required_attacker_strength(
    cfg: &SimConfig,
    defender_strength: f64,
    fort_points: f64,
    defender_artillery_weapon_damage_per_day: f64,
    margin_factor: f64,
) -> (f64, GroundBattleForecast) {
    let forecast_at = |strength: f64| {
        forecast_ground_battle(
            cfg,
            strength,
            defender_strength,
            fort_points,
            defender_artillery_weapon_damage_per_day,
            GroundBattleForecastOptions::default(),
        )
    };
    let mut required = non_neg(square_law_required_attacker_strength(
        cfg,
        defender_strength,
        fort_points,
        defender_artillery_weapon_damage_per_day,
        margin_factor,
    ));
    let mut forecast = forecast_at(required);
    for _ in 0..REQUIRED_STRENGTH_MAX_ITERATIONS {
        if forecast.winner == GroundBattleWinner::Attacker || defender_strength <= EPS {
            break;
        }
        required *= REQUIRED_STRENGTH_STEP;
        forecast = forecast_at(required);
    }
    tracing::trace!(
        defender_strength,
        fort_points,
        required,
        winner = forecast.winner.label(),
        "required attacker strength"
    );
    (required, forecast)
}
