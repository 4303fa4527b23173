//! Invasion target analysis.
//!
//! Estimates the strength needed to take a colony, with and without its
//! fortifications, and ranks the attacker's colonies that could stage the
//! assault.

use serde::{Deserialize, Serialize};

use crate::ground_combat::{
    forecast_ground_battle, required_attacker_strength, GroundBattleForecast,
    GroundBattleForecastOptions,
};
use crate::ids::{sorted_ids, Id, INVALID_ID};
use crate::math::{cmp_eps, non_neg, Vec2, EPS, EPS_CHANGE};
use crate::simulation::Simulation;

/// Invasion planner options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvasionPlannerOptions {
    /// Faction planning the assault. [`INVALID_ID`] considers every colony for staging.
    pub attacker_faction_id: Id,
    /// Route only through systems the attacker has discovered.
    pub restrict_to_discovered: bool,
    /// Where the assault force currently is, if anywhere.
    pub start_system_id: Option<Id>,
    /// Position in `start_system_id`.
    pub start_pos_mkm: Vec2,
    /// Speed used for staging ETAs. Zero or less ranks by troops alone.
    pub planning_speed_km_s: f64,
    /// Fraction of a staging colony's surplus that may leave. Negative uses
    /// `auto_troop_max_take_fraction_of_surplus`.
    pub max_take_fraction_of_surplus: f64,
    /// Staging options kept. Zero keeps all.
    pub max_staging_options: usize,
}

impl Default for InvasionPlannerOptions {
    fn default() -> Self {
        Self {
            attacker_faction_id: INVALID_ID,
            restrict_to_discovered: true,
            start_system_id: None,
            start_pos_mkm: Vec2::ZERO,
            planning_speed_km_s: 0.0,
            max_take_fraction_of_surplus: -1.0,
            max_staging_options: 0,
        }
    }
}

/// Defensive picture of the target colony.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InvasionTargetAnalysis {
    /// Target colony.
    pub colony_id: Id,
    /// System of the target body.
    pub system_id: Id,
    /// Current owner.
    pub defender_faction_id: Id,
    /// Defenders on the ground.
    pub defender_strength: f64,
    /// Undamaged fortification points.
    pub forts_total: f64,
    /// Fortification points still standing.
    pub forts_effective: f64,
    /// Damage already dealt in an ongoing battle.
    pub fort_damage_points: f64,
    /// Artillery scaled by fortification integrity.
    pub defender_artillery_weapon_damage_per_day: f64,
    /// Strength forecast to win against the standing defences.
    pub required_attacker_strength: f64,
    /// Forecast at `required_attacker_strength`.
    pub forecast_at_required: GroundBattleForecast,
    /// Strength forecast to win once fortifications and artillery are suppressed.
    pub required_attacker_strength_no_forts: f64,
    /// Forecast at `required_attacker_strength_no_forts`.
    pub forecast_at_required_no_forts: GroundBattleForecast,
    /// Forecast at a caller-supplied strength.
    pub attacker_strength_forecast: Option<(f64, GroundBattleForecast)>,
}

/// A colony that could contribute troops.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InvasionStagingOption {
    /// Staging colony.
    pub colony_id: Id,
    /// Strength above its garrison target.
    pub surplus_strength: f64,
    /// Share of the surplus that may leave.
    pub take_cap_strength: f64,
    /// Days from the start position to the colony.
    pub eta_start_to_stage_days: f64,
    /// Days from the colony to the target.
    pub eta_stage_to_target_days: f64,
    /// Sum of the legs.
    pub eta_total_days: f64,
    /// Higher is better.
    pub score: f64,
}

/// Invasion planner output.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InvasionPlannerResult {
    /// Target resolved and analysed.
    pub ok: bool,
    /// Rejection reason; empty on success.
    pub message: String,
    /// Target analysis.
    pub target: InvasionTargetAnalysis,
    /// Staging colonies, best first.
    pub staging_options: Vec<InvasionStagingOption>,
}

impl InvasionPlannerResult {
    fn rejected(message: &str) -> Self {
        Self {
            message: message.to_string(),
            ..Self::default()
        }
    }
}

/// Strength on the ground, from the battle record when the owner is defending one.
fn standing_strength(sim: &Simulation, colony_id: Id) -> Option<(f64, f64)> {
    let state = sim.state();
    let colony = state.colonies.get(&colony_id)?;
    let snapshot = match state.ground_battles.get(&colony_id) {
        Some(b) if b.defender_faction_id == colony.faction_id => {
            (non_neg(b.defender_strength), non_neg(b.fortification_damage_points))
        }
        _ => (non_neg(colony.ground_forces), 0.0),
    };
    Some(snapshot)
}

/// Analyse a colony as an invasion target.
///
/// `troop_margin_factor` is clamped to `[1, 10]`. A non-negative
/// `attacker_strength_for_forecast` adds a forecast at that strength.
#[must_use]
pub fn analyze_invasion_target(
    sim: &Simulation,
    target_colony_id: Id,
    opts: &InvasionPlannerOptions,
    troop_margin_factor: f64,
    attacker_strength_for_forecast: Option<f64>,
) -> InvasionPlannerResult {
    let state = sim.state();
    let cfg = sim.cfg();
    let attacker = opts.attacker_faction_id;

    let Some(target) = state.colonies.get(&target_colony_id) else {
        return InvasionPlannerResult::rejected("Target colony not found.");
    };
    let Some(target_body) = state
        .bodies
        .get(&target.body_id)
        .filter(|b| b.system_id != INVALID_ID)
    else {
        return InvasionPlannerResult::rejected("Target colony body/system not found.");
    };
    let target_system = target_body.system_id;
    if attacker != INVALID_ID
        && opts.restrict_to_discovered
        && !sim.is_system_discovered_by_faction(attacker, target_system)
    {
        return InvasionPlannerResult::rejected(
            "Target system is undiscovered for the attacker.",
        );
    }

    let (defender_strength, fort_damage_points) =
        standing_strength(sim, target.id).unwrap_or_default();
    let forts_total = non_neg(sim.fortification_points(target));
    let forts_effective = non_neg(forts_total - forts_total.min(fort_damage_points));
    let integrity = if forts_total > EPS {
        (forts_effective / forts_total).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let defender_arty = non_neg(sim.artillery_weapon_damage_per_day(target) * integrity);
    let margin = troop_margin_factor.clamp(1.0, 10.0);

    let (required, forecast_at_required) =
        required_attacker_strength(cfg, defender_strength, forts_effective, defender_arty, margin);
    let (required_nf, forecast_at_required_no_forts) =
        required_attacker_strength(cfg, defender_strength, 0.0, 0.0, margin);

    let attacker_strength_forecast = attacker_strength_for_forecast
        .filter(|s| *s >= 0.0)
        .map(|s| {
            let forecast = forecast_ground_battle(
                cfg,
                s,
                defender_strength,
                forts_effective,
                defender_arty,
                GroundBattleForecastOptions::default(),
            );
            (s, forecast)
        });

    let analysis = InvasionTargetAnalysis {
        colony_id: target.id,
        system_id: target_system,
        defender_faction_id: target.faction_id,
        defender_strength,
        forts_total,
        forts_effective,
        fort_damage_points,
        defender_artillery_weapon_damage_per_day: defender_arty,
        required_attacker_strength: required,
        forecast_at_required,
        required_attacker_strength_no_forts: required_nf,
        forecast_at_required_no_forts,
        attacker_strength_forecast,
    };

    let take_fraction = if opts.max_take_fraction_of_surplus >= 0.0 {
        opts.max_take_fraction_of_surplus
    } else {
        cfg.auto_troop_max_take_fraction_of_surplus
    }
    .clamp(0.0, 1.0);
    let speed = opts.planning_speed_km_s;
    let eta = |from_sys: Id, from_pos: Vec2, to_sys: Id, to_pos: Vec2| {
        sim.estimate_eta_days(
            from_sys,
            from_pos,
            attacker,
            speed,
            to_sys,
            to_pos,
            opts.restrict_to_discovered,
        )
    };

    let mut staging = Vec::new();
    for cid in sorted_ids(&state.colonies) {
        let Some(colony) = state.colonies.get(&cid) else { continue };
        if attacker != INVALID_ID && colony.faction_id != attacker {
            continue;
        }
        let Some((stage_sys, stage_pos)) = state.colony_location(cid) else { continue };
        if attacker != INVALID_ID
            && opts.restrict_to_discovered
            && !sim.is_system_discovered_by_faction(attacker, stage_sys)
        {
            continue;
        }

        let strength = standing_strength(sim, cid).map_or(0.0, |(s, _)| s);
        let surplus = non_neg(strength - non_neg(colony.garrison_target_strength));
        if surplus <= EPS_CHANGE {
            continue;
        }
        let take_cap = surplus * take_fraction;
        if take_cap <= EPS_CHANGE {
            continue;
        }

        let mut option = InvasionStagingOption {
            colony_id: cid,
            surplus_strength: surplus,
            take_cap_strength: take_cap,
            score: take_cap,
            ..InvasionStagingOption::default()
        };
        if speed > EPS {
            let to_target = eta(stage_sys, stage_pos, target_system, target_body.position_mkm);
            let from_start = opts
                .start_system_id
                .filter(|&s| s != INVALID_ID)
                .map_or(0.0, |s| eta(s, opts.start_pos_mkm, stage_sys, stage_pos));
            if !(to_target.is_finite() && from_start.is_finite()) {
                continue;
            }
            option.eta_stage_to_target_days = to_target;
            option.eta_start_to_stage_days = from_start;
            option.eta_total_days = from_start + to_target;
            option.score = take_cap * 1000.0 - option.eta_total_days * 10.0;
        }
        staging.push(option);
    }

    staging.sort_by(|a, b| cmp_eps(b.score, a.score).then(a.colony_id.cmp(&b.colony_id)));
    if opts.max_staging_options > 0 {
        staging.truncate(opts.max_staging_options);
    }

    tracing::debug!(
        target_colony_id,
        required = analysis.required_attacker_strength,
        staging = staging.len(),
        "invasion target analysed"
    );
    InvasionPlannerResult {
        ok: true,
        message: String::new(),
        target: analysis,
        staging_options: staging,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::content::{ContentDb, InstallationDef};
    use crate::ground_combat::GroundBattleWinner;
    use crate::state::{Body, Colony, Faction, GameState, GroundBattle, StarSystem};
    use std::collections::{BTreeMap, BTreeSet};

    fn scenario() -> Simulation {
        let mut content = ContentDb::default();
        content.add_installation(InstallationDef {
            id: "fort".into(),
            fortification_points: 10.0,
            ..InstallationDef::default()
        });
        content.add_installation(InstallationDef {
            id: "gun".into(),
            weapon_damage: 5.0,
            ..InstallationDef::default()
        });

        let mut st = GameState::default();
        st.systems.insert(
            10,
            StarSystem {
                id: 10,
                ..StarSystem::default()
            },
        );
        for id in [1, 2] {
            st.factions.insert(
                id,
                Faction {
                    id,
                    discovered_systems: BTreeSet::from([10]),
                    ..Faction::default()
                },
            );
        }
        for (id, x) in [(100, 10.0), (101, 0.0), (102, 1000.0)] {
            st.bodies.insert(
                id,
                Body {
                    id,
                    system_id: 10,
                    position_mkm: Vec2::new(x, 0.0),
                    ..Body::default()
                },
            );
        }
        for (cid, body_id) in [(201, 101), (202, 102)] {
            st.colonies.insert(
                cid,
                Colony {
                    id: cid,
                    faction_id: 1,
                    body_id,
                    ground_forces: 200.0,
                    garrison_target_strength: 100.0,
                    ..Colony::default()
                },
            );
        }
        st.colonies.insert(
            200,
            Colony {
                id: 200,
                faction_id: 2,
                body_id: 100,
                ground_forces: 100.0,
                installations: BTreeMap::from([
                    ("fort".to_string(), 5),
                    ("gun".to_string(), 3),
                ]),
                ..Colony::default()
            },
        );
        Simulation::new(st, SimConfig::default(), content)
    }

    fn opts() -> InvasionPlannerOptions {
        InvasionPlannerOptions {
            attacker_faction_id: 1,
            start_system_id: Some(10),
            planning_speed_km_s: 1000.0,
            max_staging_options: 8,
            ..InvasionPlannerOptions::default()
        }
    }

    #[test]
    fn test_target_analysis_and_staging_rank() {
        let sim = scenario();
        let res = analyze_invasion_target(&sim, 200, &opts(), 1.2, Some(10.0));
        assert!(res.ok, "{}", res.message);
        let t = &res.target;
        assert!((t.defender_strength - 100.0).abs() < 1e-9);
        assert!((t.forts_total - 50.0).abs() < 1e-9);
        assert!((t.defender_artillery_weapon_damage_per_day - 15.0).abs() < 1e-9);
        assert!(t.required_attacker_strength > 100.0);
        assert_eq!(t.forecast_at_required.winner, GroundBattleWinner::Attacker);
        assert_eq!(t.forecast_at_required_no_forts.winner, GroundBattleWinner::Attacker);
        assert!(t.required_attacker_strength_no_forts < t.required_attacker_strength);
        let (s, small) = t.attacker_strength_forecast.as_ref().unwrap();
        assert_eq!(*s, 10.0);
        assert_ne!(small.winner, GroundBattleWinner::Attacker);

        let ids: Vec<Id> = res.staging_options.iter().map(|o| o.colony_id).collect();
        assert_eq!(ids, vec![201, 202]);
        let near = &res.staging_options[0];
        assert!((near.take_cap_strength - 75.0).abs() < 1e-9);
        let legs = near.eta_start_to_stage_days + near.eta_stage_to_target_days;
        assert!((near.eta_total_days - legs).abs() < 1e-12);
    }

    #[test]
    fn test_battle_damage_weakens_defences() {
        let mut sim = scenario();
        sim.state_mut().ground_battles.insert(
            200,
            GroundBattle {
                colony_id: 200,
                system_id: 10,
                attacker_faction_id: 1,
                defender_faction_id: 2,
                defender_strength: 40.0,
                fortification_damage_points: 25.0,
                ..GroundBattle::default()
            },
        );
        let res = analyze_invasion_target(&sim, 200, &opts(), 1.2, None);
        let t = &res.target;
        assert!((t.defender_strength - 40.0).abs() < 1e-9);
        assert!((t.forts_effective - 25.0).abs() < 1e-9);
        // Half the forts stand, so half the guns still fire.
        assert!((t.defender_artillery_weapon_damage_per_day - 7.5).abs() < 1e-9);
        assert!(t.attacker_strength_forecast.is_none());
    }

    #[test]
    fn test_rejections_and_unlimited_options() {
        let mut sim = scenario();
        assert_eq!(
            analyze_invasion_target(&sim, 999, &opts(), 1.0, None).message,
            "Target colony not found."
        );
        sim.state_mut().factions.get_mut(&1).unwrap().discovered_systems.clear();
        let res = analyze_invasion_target(&sim, 200, &opts(), 1.0, None);
        assert!(!res.ok);
        assert_eq!(res.message, "Target system is undiscovered for the attacker.");

        // Without a planning speed, ranking is by take cap only.
        let sim = scenario();
        let plain = InvasionPlannerOptions {
            attacker_faction_id: 1,
            max_staging_options: 0,
            ..InvasionPlannerOptions::default()
        };
        let res = analyze_invasion_target(&sim, 200, &plain, 1.0, None);
        assert_eq!(res.staging_options.len(), 2);
        assert_eq!(res.staging_options[0].score, res.staging_options[0].take_cap_strength);
    }
}
