//! Ground combat balance sweeps.
//!
//! Runs grids of battle forecasts to check that tunables produce sensible
//! outcomes, and finds the break-even attacker strength by bisection.

use nebula_core::config::SimConfig;
use nebula_core::ground_combat::{
    forecast_ground_battle, GroundBattleForecastOptions, GroundBattleWinner,
};

/// One forecast input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matchup {
    /// Attacker strength.
    pub attacker: f64,
    /// Defender strength.
    pub defender: f64,
    /// Fortification points.
    pub forts: f64,
    /// Defender artillery damage per day.
    pub artillery: f64,
}

impl Matchup {
    /// Open-field matchup with no fortifications.
    pub fn open(attacker: f64, defender: f64) -> Self {
        Self {
            attacker,
            defender,
            forts: 0.0,
            artillery: 0.0,
        }
    }
}

/// Statistics for a set of forecasts.
#[derive(Debug, Clone, Default)]
pub struct SweepStats {
    /// Forecasts run.
    pub total_battles: u32,
    /// Attacker wins.
    pub attacker_wins: u32,
    /// Defender wins, including truncated forecasts.
    pub defender_wins: u32,
    /// Forecasts that hit the day limit.
    pub truncated: u32,
    /// Average days to resolution over resolved forecasts.
    pub avg_days: f64,
}

impl SweepStats {
    /// Attacker win rate (0.5 for an empty sweep).
    pub fn attacker_win_rate(&self) -> f64 {
        if self.total_battles == 0 {
            return 0.5;
        }
        f64::from(self.attacker_wins) / f64::from(self.total_battles)
    }
}

/// Forecast every matchup and summarize.
pub fn run_forecast_sweep(cfg: &SimConfig, matchups: &[Matchup]) -> SweepStats {
    let mut stats = SweepStats::default();
    let mut resolved_days = 0u64;
    let mut resolved = 0u32;

    for m in matchups {
        let f = forecast_ground_battle(
            cfg,
            m.attacker,
            m.defender,
            m.forts,
            m.artillery,
            GroundBattleForecastOptions::default(),
        );
        stats.total_battles += 1;
        match f.winner {
            GroundBattleWinner::Attacker => stats.attacker_wins += 1,
            GroundBattleWinner::Defender => stats.defender_wins += 1,
        }
        if f.truncated {
            stats.truncated += 1;
        } else {
            resolved += 1;
            resolved_days += u64::from(f.days_to_resolve);
        }
    }
    if resolved > 0 {
        stats.avg_days = resolved_days as f64 / f64::from(resolved);
    }
    tracing::debug!(
        battles = stats.total_battles,
        attacker_wins = stats.attacker_wins,
        truncated = stats.truncated,
        "forecast sweep finished"
    );
    stats
}

/// Attacker/defender ratio grid against a fixed defence.
pub fn ratio_grid(defender: f64, forts: f64, artillery: f64, ratios: &[f64]) -> Vec<Matchup> {
    ratios
        .iter()
        .map(|r| Matchup {
            attacker: defender * r,
            defender,
            forts,
            artillery,
        })
        .collect()
}

/// Smallest attacker strength (within `tolerance`) the forecast says wins.
///
/// Returns `None` if even `upper` loses.
pub fn break_even_attacker_strength(
    cfg: &SimConfig,
    defender: f64,
    forts: f64,
    artillery: f64,
    upper: f64,
    tolerance: f64,
) -> Option<f64> {
    let wins = |att: f64| {
        forecast_ground_battle(
            cfg,
            att,
            defender,
            forts,
            artillery,
            GroundBattleForecastOptions::default(),
        )
        .winner
            == GroundBattleWinner::Attacker
    };
    if !wins(upper) {
        return None;
    }
    let (mut lo, mut hi) = (0.0_f64, upper);
    while hi - lo > tolerance {
        let mid = (lo + hi) / 2.0;
        if wins(mid) {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    Some(hi)
}
