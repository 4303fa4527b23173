//! Property tests for planners, the advisor and the combat forecaster.

#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]

use std::collections::BTreeMap;

use nebula_core::prelude::*;
use nebula_test_utils::determinism::strategies::{
    arb_artillery, arb_colony_list, arb_combat_config, arb_defender_strength, arb_fort_points,
    arb_margin, ColonyParams,
};
use nebula_test_utils::determinism::{output_hash, verify_purity};
use nebula_test_utils::fixtures::ScenarioBuilder;
use nebula_test_utils::proptest::prelude::*;

const LINER_BERTHS: f64 = 80.0;
const TROOP_BAYS: f64 = 60.0;

/// One system of faction-1 colonies with two liners and two troopers.
///
/// `reverse` inserts everything in the opposite order.
fn colony_world(params: &[ColonyParams], reverse: bool) -> Simulation {
    let mut b = ScenarioBuilder::new()
        .faction(1, "Terrans")
        .system(1, "Home")
        .discover(1, &[1])
        .design(ShipDesign {
            id: "liner".into(),
            colony_capacity_millions: LINER_BERTHS,
            fuel_capacity_tons: 50.0,
            ..ShipDesign::default()
        })
        .design(ShipDesign {
            id: "trooper".into(),
            troop_capacity: TROOP_BAYS,
            fuel_capacity_tons: 50.0,
            ..ShipDesign::default()
        });

    let mut colonies: Vec<(u64, &ColonyParams)> = (1..).zip(params).collect();
    let mut ships: Vec<(u64, &str)> =
        vec![(901, "liner"), (902, "liner"), (903, "trooper"), (904, "trooper")];
    if reverse {
        colonies.reverse();
        ships.reverse();
    }
    for (i, p) in colonies {
        let x = 40.0 * i as f64;
        b = b
            .body(100 + i, 1, Vec2::new(x, 0.0))
            .colony(200 + i, 1, 100 + i, |c| {
                c.population_millions = p.population;
                c.population_target_millions = p.population_target;
                c.population_reserve_millions = p.population_reserve;
                c.ground_forces = p.ground_forces;
                c.garrison_target_strength = p.garrison_target;
            });
    }
    for (id, design) in ships {
        b = b.ship(id, 1, 1, Vec2::ZERO, design, |s| {
            s.fuel_tons = 5.0;
            s.auto_colonist_transport = design == "liner";
            s.auto_troop_transport = design == "trooper";
        });
    }
    b.build()
}

/// Colony 20 of faction 2 under attack with the given defences.
fn siege(cfg: &SimConfig, att: f64, def: f64, forts: f64, artillery: f64) -> Simulation {
    // Fort points come in multiples of 10 and artillery in whole points.
    let fort_count = (forts / 10.0).round() as u32;
    let gun_count = artillery.round() as u32;
    let cfg = cfg.clone();
    ScenarioBuilder::new()
        .config(move |c| *c = cfg)
        .faction(1, "Terrans")
        .faction(2, "Khanate")
        .system(1, "Front")
        .body(10, 1, Vec2::ZERO)
        .installation(InstallationDef {
            id: "fort".into(),
            fortification_points: 10.0,
            ..InstallationDef::default()
        })
        .installation(InstallationDef {
            id: "gun".into(),
            weapon_damage: 1.0,
            ..InstallationDef::default()
        })
        .colony(20, 2, 10, |c| {
            c.ground_forces = def;
            if fort_count > 0 {
                c.installations.insert("fort".into(), fort_count);
            }
            if gun_count > 0 {
                c.installations.insert("gun".into(), gun_count);
            }
        })
        .battle(GroundBattle {
            colony_id: 20,
            system_id: 1,
            attacker_faction_id: 1,
            defender_faction_id: 2,
            attacker_strength: att,
            defender_strength: def,
            ..GroundBattle::default()
        })
        .build()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_forecast_is_deterministic(
        cfg in arb_combat_config(),
        att in arb_defender_strength(),
        def in arb_defender_strength(),
        forts in arb_fort_points(),
        artillery in arb_artillery(),
    ) {
        let opts = GroundBattleForecastOptions::default();
        let a = forecast_ground_battle(&cfg, att, def, forts, artillery, opts);
        let b = forecast_ground_battle(&cfg, att, def, forts, artillery, opts);
        prop_assert_eq!(output_hash(&a), output_hash(&b));
    }

    #[test]
    fn test_forecast_agrees_with_daily_ticks(
        cfg in arb_combat_config(),
        att in arb_defender_strength(),
        def in arb_defender_strength(),
        forts in arb_fort_points(),
        artillery in arb_artillery(),
    ) {
        let f = forecast_ground_battle(
            &cfg, att, def, forts, artillery, GroundBattleForecastOptions::default(),
        );
        prop_assume!(f.ok && !f.truncated);

        let mut sim = siege(&cfg, att, def, forts, artillery);
        let mut resolution = None;
        for _ in 0..f.days_to_resolve {
            if let Some(r) = sim.tick_ground_combat().pop() {
                resolution = Some(r);
                break;
            }
        }
        let r = resolution.expect("battle resolves within the forecast horizon");
        prop_assert_eq!(r.winner, f.winner);
        prop_assert_eq!(r.days_fought, f.days_to_resolve);

        let garrison = sim.state().colonies[&20].ground_forces;
        let survivor = match f.winner {
            GroundBattleWinner::Attacker => f.attacker_end,
            GroundBattleWinner::Defender => f.defender_end,
        };
        prop_assert!((garrison - survivor).abs() < 1e-9);
    }

    #[test]
    fn test_required_strength_wins(
        cfg in arb_combat_config(),
        def in arb_defender_strength(),
        forts in arb_fort_points(),
        artillery in arb_artillery(),
        margin in arb_margin(),
    ) {
        let (required, forecast) = required_attacker_strength(&cfg, def, forts, artillery, margin);
        prop_assert!(required.is_finite());
        prop_assert_eq!(forecast.winner, GroundBattleWinner::Attacker);
    }

    #[test]
    fn test_advisor_ignores_insertion_order(params in arb_colony_list(8)) {
        let opts = AdvisorOptions::default();
        let forward = advise_faction(&colony_world(&params, false), 1, &opts);
        let backward = advise_faction(&colony_world(&params, true), 1, &opts);
        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn test_planners_are_pure_and_repeatable(params in arb_colony_list(8)) {
        let sim = colony_world(&params, false);
        let other = colony_world(&params, true);

        let troops = |s: &Simulation| compute_troop_plan(s, 1, &TroopPlannerOptions::default());
        let colonists =
            |s: &Simulation| compute_colonist_plan(s, 1, &ColonistPlannerOptions::default());
        let freight =
            |s: &Simulation| compute_freight_plan(s, 1, &FreightPlannerOptions::default());
        let advise = |s: &Simulation| advise_faction(s, 1, &AdvisorOptions::default());

        prop_assert!(verify_purity(&sim, troops));
        prop_assert!(verify_purity(&sim, colonists));
        prop_assert!(verify_purity(&sim, freight));
        prop_assert!(verify_purity(&sim, advise));

        prop_assert_eq!(output_hash(&troops(&sim)), output_hash(&troops(&other)));
        prop_assert_eq!(output_hash(&colonists(&sim)), output_hash(&colonists(&other)));
    }

    #[test]
    fn test_colonist_moves_respect_floors_and_caps(params in arb_colony_list(8)) {
        let sim = colony_world(&params, false);
        let min_transfer = sim.cfg().auto_colonist_min_transfer_millions;
        let plan = compute_colonist_plan(&sim, 1, &ColonistPlannerOptions::default());

        let mut taken: BTreeMap<Id, f64> = BTreeMap::new();
        for a in &plan.assignments {
            prop_assert!(a.millions <= LINER_BERTHS + 1e-9);
            prop_assert!(a.millions + 1e-9 >= min_transfer);
            prop_assert!(a.eta_total_days >= 0.0);
            let legs = a.eta_to_source_days + a.eta_to_dest_days;
            prop_assert!((a.eta_total_days - legs).abs() < 1e-9);
            if let Some(src) = a.source_colony_id {
                *taken.entry(src).or_default() += a.millions;
            }
        }
        for (src, millions) in taken {
            let c = &sim.state().colonies[&src];
            let floor = c.population_target_millions.max(c.population_reserve_millions);
            prop_assert!(floor > 0.0, "colony {} exported without a floor", src);
            prop_assert!(millions <= c.population_millions - floor + 1e-6);
        }
    }

    #[test]
    fn test_troop_moves_respect_caps(params in arb_colony_list(8)) {
        let sim = colony_world(&params, false);
        let min_transfer = sim.cfg().auto_troop_min_transfer_strength;
        let plan = compute_troop_plan(&sim, 1, &TroopPlannerOptions::default());
        for a in &plan.assignments {
            prop_assert!(a.strength <= TROOP_BAYS + 1e-9);
            prop_assert!(a.strength + 1e-9 >= min_transfer);
            prop_assert!(a.eta_total_days >= 0.0);
            let legs = a.eta_to_source_days + a.eta_to_dest_days;
            prop_assert!((a.eta_total_days - legs).abs() < 1e-9);
        }
    }
}
