//! End-to-end scenarios for the planning core.
//!
//! Each scenario builds a snapshot with the test-utils builder, runs a
//! planner or the advisor against it and checks the outcome.

use nebula_core::prelude::*;
use nebula_core::state::InstallationBuildOrder;
use nebula_test_utils::fixtures::{logistics_chain, ScenarioBuilder};

// =============================================================================
// Advisor
// =============================================================================

mod advisor {
    use super::*;

    fn outpost() -> Simulation {
        ScenarioBuilder::new()
            .config(|c| c.enable_ship_maintenance = true)
            .faction(1, "Terrans")
            .system(1, "Home")
            .system(2, "Beyond")
            .discover(1, &[1, 2])
            // Default bodies are airless and frozen, so habitability is zero.
            .body(10, 1, Vec2::new(100.0, 0.0))
            .installation(InstallationDef {
                id: "fort".into(),
                name: "Fort".into(),
                fortification_points: 10.0,
                build_costs: [("Duranium".to_string(), 100.0)].into(),
                ..InstallationDef::default()
            })
            .colony(20, 1, 10, |c| {
                c.name = "Outpost".into();
                c.population_millions = 50.0;
                c.garrison_target_strength = 10.0;
                c.construction_queue.push(InstallationBuildOrder {
                    installation_id: "fort".into(),
                    quantity_remaining: 1,
                    minerals_paid: false,
                });
            })
            .design(ShipDesign {
                id: "scout".into(),
                name: "Scout".into(),
                fuel_capacity_tons: 100.0,
                max_hp: 100.0,
                missile_ammo_capacity: 20.0,
                ..ShipDesign::default()
            })
            .ship(30, 1, 1, Vec2::new(-400.0, 0.0), "scout", |s| {
                s.name = "Scout".into();
                s.fuel_tons = 10.0;
                s.hp = 50.0;
                s.missile_ammo = 0.0;
                s.maintenance_condition = 0.30;
            })
            .build()
    }

    #[test]
    fn test_mixed_issues_in_priority_order() {
        let sim = outpost();
        let issues = advise_faction(&sim, 1, &AdvisorOptions::default());
        let kinds: Vec<(AdvisorIssueKind, AdvisorIssueLevel)> =
            issues.iter().map(|i| (i.kind, i.level)).collect();
        assert_eq!(
            kinds,
            vec![
                (AdvisorIssueKind::LogisticsNeed, AdvisorIssueLevel::Warn),
                (AdvisorIssueKind::ColonyHabitationShortfall, AdvisorIssueLevel::Warn),
                (AdvisorIssueKind::ColonyGarrisonProblem, AdvisorIssueLevel::Warn),
                (AdvisorIssueKind::ShipLowAmmo, AdvisorIssueLevel::Warn),
                (AdvisorIssueKind::ShipDamaged, AdvisorIssueLevel::Info),
                (AdvisorIssueKind::ShipLowFuel, AdvisorIssueLevel::Info),
                (AdvisorIssueKind::ShipLowMaintenance, AdvisorIssueLevel::Info),
            ]
        );

        let need = &issues[0];
        assert_eq!(need.resource, "Duranium");
        assert_eq!(need.logistics_kind, Some(LogisticsNeedKind::Construction));
        assert!(need.missing >= 99.9);
        assert!(issues[2].summary.starts_with("No troop training capacity"));
        assert_eq!(issues[5].summary, "Fuel 10.0/100.0t (10%)");
        assert!(issues[6].have < 0.70);
    }

    #[test]
    fn test_rerun_is_identical() {
        let sim = outpost();
        let opts = AdvisorOptions::default();
        assert_eq!(advise_faction(&sim, 1, &opts), advise_faction(&sim, 1, &opts));
    }

    #[test]
    fn test_maintenance_ignored_when_disabled() {
        let mut sim = outpost();
        let cfg = SimConfig {
            enable_ship_maintenance: false,
            ..sim.cfg().clone()
        };
        sim = Simulation::new(sim.state().clone(), cfg, sim.content().clone());
        let issues = advise_faction(&sim, 1, &AdvisorOptions::default());
        assert!(issues
            .iter()
            .all(|i| i.kind != AdvisorIssueKind::ShipLowMaintenance));
    }
}

// =============================================================================
// Ground combat
// =============================================================================

mod combat {
    use super::*;

    #[test]
    fn test_forecast_tie_goes_to_defender() {
        let cfg = SimConfig {
            ground_combat_loss_factor: 1.0,
            fortification_defense_scale: 0.0,
            ..SimConfig::default()
        };
        let f = forecast_ground_battle(
            &cfg,
            10.0,
            10.0,
            0.0,
            0.0,
            GroundBattleForecastOptions::default(),
        );
        assert!(f.ok);
        assert_eq!(f.days_to_resolve, 1);
        assert_eq!(f.winner, GroundBattleWinner::Defender);
    }

    fn besieged_colony() -> Simulation {
        ScenarioBuilder::new()
            .config(|c| {
                c.ground_combat_loss_factor = 0.05;
                c.fortification_defense_scale = 0.01;
            })
            .faction(1, "Terrans")
            .faction(2, "Khanate")
            .system(1, "Front")
            .body(10, 1, Vec2::ZERO)
            .installation(InstallationDef {
                id: "fort".into(),
                fortification_points: 10.0,
                ..InstallationDef::default()
            })
            .colony(20, 2, 10, |c| {
                c.ground_forces = 100.0;
                c.installations.insert("fort".into(), 10);
            })
            .battle(GroundBattle {
                colony_id: 20,
                system_id: 1,
                attacker_faction_id: 1,
                defender_faction_id: 2,
                attacker_strength: 200.0,
                defender_strength: 100.0,
                ..GroundBattle::default()
            })
            .build()
    }

    #[test]
    fn test_forecast_matches_daily_ticks() {
        let mut sim = besieged_colony();
        let forts = sim.fortification_points(&sim.state().colonies[&20]);
        assert!((forts - 100.0).abs() < 1e-9);

        let f = forecast_ground_battle(
            sim.cfg(),
            200.0,
            100.0,
            forts,
            0.0,
            GroundBattleForecastOptions::default(),
        );
        assert!(f.ok && !f.truncated);
        assert_eq!(f.winner, GroundBattleWinner::Attacker);
        assert!(f.days_to_resolve > 0);

        let mut resolution = None;
        for _ in 0..=f.days_to_resolve {
            if let Some(r) = sim.tick_ground_combat().pop() {
                resolution = Some(r);
                break;
            }
        }
        let r = resolution.expect("battle should resolve");
        assert_eq!(r.winner, f.winner);
        assert_eq!(r.days_fought, f.days_to_resolve);

        let colony = &sim.state().colonies[&20];
        assert_eq!(colony.faction_id, 1);
        assert!((colony.ground_forces - f.attacker_end).abs() < 1e-9);
        assert!(!sim.state().ground_battles.contains_key(&20));
    }
}

// =============================================================================
// Planners
// =============================================================================

mod planners {
    use super::*;

    #[test]
    fn test_invasion_ranks_near_staging_first() {
        let sim = ScenarioBuilder::new()
            .faction(1, "Terrans")
            .faction(2, "Khanate")
            .system(10, "Contested")
            .discover(1, &[10])
            .discover(2, &[10])
            .body(100, 10, Vec2::new(10.0, 0.0))
            .body(101, 10, Vec2::ZERO)
            .body(102, 10, Vec2::new(1000.0, 0.0))
            .installation(InstallationDef {
                id: "fort".into(),
                fortification_points: 10.0,
                ..InstallationDef::default()
            })
            .installation(InstallationDef {
                id: "gun".into(),
                weapon_damage: 5.0,
                ..InstallationDef::default()
            })
            .colony(200, 2, 100, |c| {
                c.ground_forces = 100.0;
                c.installations.insert("fort".into(), 5);
                c.installations.insert("gun".into(), 3);
            })
            .colony(201, 1, 101, |c| {
                c.ground_forces = 200.0;
                c.garrison_target_strength = 100.0;
            })
            .colony(202, 1, 102, |c| {
                c.ground_forces = 200.0;
                c.garrison_target_strength = 100.0;
            })
            .build();

        let opts = InvasionPlannerOptions {
            attacker_faction_id: 1,
            start_system_id: Some(10),
            planning_speed_km_s: 1000.0,
            ..InvasionPlannerOptions::default()
        };
        let res = analyze_invasion_target(&sim, 200, &opts, 1.2, None);
        assert!(res.ok, "{}", res.message);
        assert!((res.target.forts_total - 50.0).abs() < 1e-9);
        assert!((res.target.defender_artillery_weapon_damage_per_day - 15.0).abs() < 1e-9);
        assert!(res.target.required_attacker_strength > 100.0);
        assert_eq!(res.target.forecast_at_required.winner, GroundBattleWinner::Attacker);

        let order: Vec<Id> = res.staging_options.iter().map(|o| o.colony_id).collect();
        assert_eq!(order, vec![201, 202]);
        assert!(res.staging_options.iter().all(|o| (o.surplus_strength - 100.0).abs() < 1e-9));
    }

    #[test]
    fn test_colonist_plan_respects_reserve() {
        let sim = ScenarioBuilder::new()
            .config(|c| c.auto_colonist_max_take_fraction_of_surplus = 0.5)
            .faction(1, "Terrans")
            .system(1, "Home")
            .discover(1, &[1])
            .body(10, 1, Vec2::ZERO)
            .body(11, 1, Vec2::new(50.0, 0.0))
            .colony(1, 1, 10, |c| {
                c.population_millions = 200.0;
                c.population_target_millions = 100.0;
                c.population_reserve_millions = 150.0;
            })
            .colony(2, 1, 11, |c| {
                c.population_millions = 40.0;
                c.population_target_millions = 100.0;
            })
            .design(ShipDesign {
                id: "liner".into(),
                colony_capacity_millions: 80.0,
                ..ShipDesign::default()
            })
            .ship(5, 1, 1, Vec2::new(25.0, 0.0), "liner", |s| {
                s.auto_colonist_transport = true;
            })
            .build();

        let plan = compute_colonist_plan(&sim, 1, &ColonistPlannerOptions::default());
        assert!(plan.ok);
        assert_eq!(plan.assignments.len(), 1);
        let a = &plan.assignments[0];
        assert_eq!(a.kind, ColonistAssignmentKind::PickupAndDeliver);
        assert_eq!((a.source_colony_id, a.dest_colony_id), (Some(1), 2));
        assert!((a.millions - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_salvage_skips_reserved_wreck() {
        let sim = ScenarioBuilder::new()
            .faction(1, "Terrans")
            .system(1, "Field")
            .discover(1, &[1])
            .body(10, 1, Vec2::ZERO)
            .colony(1, 1, 10, |_| {})
            .design(ShipDesign {
                id: "salvager".into(),
                cargo_tons: 400.0,
                ..ShipDesign::default()
            })
            .wreck(1, 1, Vec2::new(10.0, 0.0), &[("Duranium", 500.0)])
            .wreck(2, 1, Vec2::new(20.0, 0.0), &[("Duranium", 300.0)])
            .ship(1, 1, 1, Vec2::ZERO, "salvager", |s| s.auto_salvage = true)
            .ship(2, 1, 1, Vec2::ZERO, "salvager", |s| s.auto_salvage = true)
            .orders(
                1,
                ShipOrders {
                    queue: vec![Order::SalvageWreck {
                        wreck_id: 1,
                        mineral: String::new(),
                        tons: 0.0,
                    }],
                    ..ShipOrders::default()
                },
            )
            .build();

        let plan = compute_salvage_plan(&sim, 1, &SalvagePlannerOptions::default());
        assert!(plan.ok);
        assert_eq!(plan.assignments.len(), 1);
        let a = &plan.assignments[0];
        assert_eq!((a.ship_id, a.wreck_id), (2, Some(2)));
        assert!((a.expected_salvage_tons - 300.0).abs() < 1e-9);
        assert!(plan.assignments.iter().all(|a| a.wreck_id != Some(1)));
    }
}

// =============================================================================
// Plan then apply
// =============================================================================

mod apply {
    use super::*;

    #[test]
    fn test_freight_plan_applies_and_busies_ships() {
        let mut sim = logistics_chain(4);
        let opts = FreightPlannerOptions::default();
        let plan = compute_freight_plan(&sim, 1, &opts);
        assert!(plan.ok, "{}", plan.message);
        assert!(!plan.assignments.is_empty());

        assert!(apply_freight_plan(&mut sim, &plan, true));
        for a in &plan.assignments {
            let queued = sim.state().ship_orders.get(&a.ship_id).map_or(0, |o| o.queue.len());
            assert!(queued > 0, "ship {} has no orders", a.ship_id);
        }

        // Ships now busy are not planned again.
        let again = compute_freight_plan(&sim, 1, &opts);
        for a in &again.assignments {
            assert!(plan.assignments.iter().all(|p| p.ship_id != a.ship_id));
        }
    }

    #[test]
    fn test_rejected_plan_issues_nothing() {
        let mut sim = logistics_chain(2);
        let plan = compute_freight_plan(&sim, 99, &FreightPlannerOptions::default());
        assert!(!plan.ok);
        assert!(!apply_freight_plan(&mut sim, &plan, true));
        assert!(sim.state().ship_orders.values().all(|o| o.queue.is_empty()));
    }
}
