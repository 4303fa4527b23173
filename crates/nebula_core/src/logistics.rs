//! Colony mineral needs.
//!
//! A need is a desired stockpile level at a colony. The advisor reports the
//! shortfalls and the freight planner imports toward them (and will not
//! export below them).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::content::{MineralMap, SHIPYARD_INSTALLATION_ID};
use crate::ids::{sorted_ids, Id, INVALID_ID};
use crate::math::{non_neg, EPS};
use crate::simulation::Simulation;
use crate::state::{Colony, Ship};

/// Mineral used for ship fuel.
pub const FUEL_RESOURCE_ID: &str = "Fuel";

/// Mineral consumed by troop training (per `troop_training_duranium_per_strength`).
pub const DURANIUM_RESOURCE_ID: &str = "Duranium";

/// Mineral consumed by troop training (per `troop_training_neutronium_per_strength`).
pub const NEUTRONIUM_RESOURCE_ID: &str = "Neutronium";

/// Why a colony wants a mineral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogisticsNeedKind {
    /// One day of shipyard throughput.
    Shipyard,
    /// Unpaid installation build costs.
    Construction,
    /// One day of troop training inputs.
    TroopTraining,
    /// Buffer for daily-running industry.
    IndustryInput,
    /// Player-set stockpile target.
    StockpileTarget,
    /// Fuel for docked ships.
    Fuel,
    /// Munitions for docked ships.
    Rearm,
    /// Maintenance supplies for docked ships.
    Maintenance,
}

impl LogisticsNeedKind {
    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Shipyard => "Shipyard",
            Self::Construction => "Construction",
            Self::TroopTraining => "Troop Training",
            Self::IndustryInput => "Industry Input",
            Self::StockpileTarget => "Stockpile Target",
            Self::Fuel => "Fuel",
            Self::Rearm => "Rearm",
            Self::Maintenance => "Maintenance",
        }
    }
}

/// A desired mineral level at a colony.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticsNeed {
    /// Colony with the need.
    pub colony_id: Id,
    /// Category.
    pub kind: LogisticsNeedKind,
    /// Mineral wanted.
    pub mineral: String,
    /// Level the colony wants on hand.
    pub desired_tons: f64,
    /// Level on hand.
    pub have_tons: f64,
    /// `max(0, desired - have)`.
    pub missing_tons: f64,
    /// Extra context, e.g. the installation being built.
    pub context_id: String,
}

fn stock(minerals: &MineralMap, mineral: &str) -> f64 {
    minerals.get(mineral).copied().unwrap_or(0.0)
}

struct NeedSink<'a> {
    colony: &'a Colony,
    out: Vec<LogisticsNeed>,
}

impl NeedSink<'_> {
    fn push(&mut self, kind: LogisticsNeedKind, mineral: &str, desired: f64, context_id: &str) {
        let have = stock(&self.colony.minerals, mineral);
        self.out.push(LogisticsNeed {
            colony_id: self.colony.id,
            kind,
            mineral: mineral.to_string(),
            desired_tons: desired,
            have_tons: have,
            missing_tons: non_neg(desired - have),
            context_id: context_id.to_string(),
        });
    }
}

impl Simulation {
    /// Mineral needs of every colony owned by a faction.
    ///
    /// Colonies are visited in ascending id order and needs within a colony
    /// come out in a fixed category order, so the list is reproducible.
    #[must_use]
    pub fn logistics_needs_for_faction(&self, faction_id: Id) -> Vec<LogisticsNeed> {
        if faction_id == INVALID_ID {
            return Vec::new();
        }
        let st = self.state();
        let ship_ids = sorted_ids(&st.ships);
        let faction_ships: Vec<&Ship> = ship_ids
            .iter()
            .filter_map(|id| st.ships.get(id))
            .filter(|sh| sh.faction_id == faction_id)
            .collect();

        let mut out = Vec::new();
        for cid in sorted_ids(&st.colonies) {
            let Some(colony) = st.colonies.get(&cid) else {
                continue;
            };
            if colony.faction_id != faction_id {
                continue;
            }
            let mut sink = NeedSink {
                colony,
                out: Vec::new(),
            };
            self.shipyard_needs(&mut sink);
            self.construction_needs(&mut sink);
            self.troop_training_needs(&mut sink);
            self.industry_input_needs(&mut sink);
            for (mineral, target) in &colony.mineral_targets {
                let desired = non_neg(*target);
                if desired > EPS {
                    sink.push(LogisticsNeedKind::StockpileTarget, mineral, desired, "");
                }
            }
            self.docked_ship_needs(&mut sink, &faction_ships);
            out.append(&mut sink.out);
        }
        out
    }

    fn shipyard_needs(&self, sink: &mut NeedSink<'_>) {
        let Some(def) = self.content().installation(SHIPYARD_INSTALLATION_ID) else {
            return;
        };
        let yards = sink.colony.installations.get(&def.id).copied().unwrap_or(0);
        if yards == 0
            || sink.colony.shipyard_queue.is_empty()
            || def.build_rate_tons_per_day <= 0.0
            || def.build_costs_per_ton.is_empty()
        {
            return;
        }
        let capacity_tons = def.build_rate_tons_per_day * f64::from(yards);
        for (mineral, per_ton) in &def.build_costs_per_ton {
            let desired = non_neg(*per_ton) * capacity_tons;
            if desired > EPS {
                sink.push(LogisticsNeedKind::Shipyard, mineral, desired, "");
            }
        }
    }

    fn construction_needs(&self, sink: &mut NeedSink<'_>) {
        for order in &sink.colony.construction_queue {
            if order.quantity_remaining == 0 || order.minerals_paid {
                continue;
            }
            let Some(def) = self.content().installation(&order.installation_id) else {
                continue;
            };
            for (mineral, cost) in &def.build_costs {
                let desired = non_neg(*cost);
                if desired <= EPS {
                    continue;
                }
                if non_neg(desired - stock(&sink.colony.minerals, mineral)) <= EPS {
                    continue;
                }
                sink.push(LogisticsNeedKind::Construction, mineral, desired, &def.id);
            }
        }
    }

    fn troop_training_needs(&self, sink: &mut NeedSink<'_>) {
        let cfg = self.cfg();
        let duranium = non_neg(cfg.troop_training_duranium_per_strength);
        let neutronium = non_neg(cfg.troop_training_neutronium_per_strength);
        if (duranium <= EPS && neutronium <= EPS) || cfg.troop_strength_per_training_point <= EPS {
            return;
        }
        let colony = sink.colony;
        let strength_per_day = self.troop_training_points_per_day(colony)
            * non_neg(cfg.troop_strength_per_training_point);
        if strength_per_day <= EPS {
            return;
        }
        let defenders = self.state().ground_battles.get(&colony.id).map_or_else(
            || non_neg(colony.ground_forces),
            |b| non_neg(b.defender_strength),
        );
        let target = non_neg(colony.garrison_target_strength);
        let required_queue = if target > EPS {
            non_neg(target - defenders)
        } else {
            0.0
        };
        let planned = non_neg(colony.troop_training_queue.max(required_queue));
        let buffer = planned.min(strength_per_day);
        if buffer <= EPS {
            return;
        }
        for (mineral, per_strength) in [
            (DURANIUM_RESOURCE_ID, duranium),
            (NEUTRONIUM_RESOURCE_ID, neutronium),
        ] {
            let desired = buffer * per_strength;
            if desired > EPS {
                sink.push(LogisticsNeedKind::TroopTraining, mineral, desired, "");
            }
        }
    }

    fn industry_input_needs(&self, sink: &mut NeedSink<'_>) {
        let buffer_days = non_neg(self.cfg().auto_freight_industry_input_buffer_days);
        if buffer_days <= EPS {
            return;
        }
        let mut per_day: BTreeMap<&str, f64> = BTreeMap::new();
        for (inst_id, count) in &sink.colony.installations {
            if *count == 0 {
                continue;
            }
            let Some(def) = self.content().installation(inst_id) else {
                continue;
            };
            if def.mining {
                continue;
            }
            for (mineral, rate) in &def.consumes_per_day {
                let rate = non_neg(*rate);
                if rate > 1e-12 {
                    *per_day.entry(mineral.as_str()).or_insert(0.0) += rate * f64::from(*count);
                }
            }
        }
        for (mineral, rate) in per_day {
            let desired = rate * buffer_days;
            if desired > EPS {
                sink.push(LogisticsNeedKind::IndustryInput, mineral, desired, "");
            }
        }
    }

    fn docked_ship_needs(&self, sink: &mut NeedSink<'_>, faction_ships: &[&Ship]) {
        let cfg = self.cfg();
        let Some(body) = self.state().bodies.get(&sink.colony.body_id) else {
            return;
        };
        let range = non_neg(cfg.docking_range_mkm);

        let mut fuel = 0.0;
        let mut munitions = 0.0;
        let mut maintenance = 0.0;
        for ship in faction_ships {
            if ship.system_id != body.system_id
                || ship.position_mkm.distance(body.position_mkm) > range + EPS
            {
                continue;
            }
            let Some(design) = self.find_design(&ship.design_id) else {
                continue;
            };

            let fuel_cap = non_neg(design.fuel_capacity_tons);
            let fuel_have = non_neg(ship.fuel_tons);
            if ship.fuel_tons >= 0.0 && fuel_cap > fuel_have + EPS {
                fuel += fuel_cap - fuel_have;
            }

            let ammo_cap = non_neg(design.missile_ammo_capacity);
            if ammo_cap > 0.0 && ship.missile_ammo >= 0.0 && ammo_cap > ship.missile_ammo + EPS {
                munitions +=
                    (ammo_cap - ship.missile_ammo) * non_neg(cfg.munitions_tons_per_missile);
            }

            if cfg.enable_ship_maintenance {
                maintenance += non_neg(design.mass_tons)
                    * non_neg(cfg.ship_maintenance_tons_per_day_per_mass_ton)
                    * non_neg(cfg.auto_freight_industry_input_buffer_days);
            }
        }

        if fuel > EPS {
            sink.push(LogisticsNeedKind::Fuel, FUEL_RESOURCE_ID, fuel, "");
        }
        if munitions > EPS {
            sink.push(LogisticsNeedKind::Rearm, &cfg.ship_munitions_resource_id, munitions, "");
        }
        if maintenance > EPS {
            sink.push(
                LogisticsNeedKind::Maintenance,
                &cfg.ship_maintenance_resource_id,
                maintenance,
                "",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::content::{ContentDb, InstallationDef, ShipDesign};
    use crate::math::Vec2;
    use crate::state::{Body, Faction, GameState, InstallationBuildOrder, StarSystem};

    fn sim_with_colony(colony: Colony, content: ContentDb, cfg: SimConfig) -> Simulation {
        let mut st = GameState::default();
        st.factions.insert(
            1,
            Faction {
                id: 1,
                ..Faction::default()
            },
        );
        st.systems.insert(
            1,
            StarSystem {
                id: 1,
                bodies: vec![1],
                ..StarSystem::default()
            },
        );
        st.bodies.insert(
            1,
            Body {
                id: 1,
                system_id: 1,
                position_mkm: Vec2::new(100.0, 0.0),
                ..Body::default()
            },
        );
        st.colonies.insert(colony.id, colony);
        Simulation::new(st, cfg, content)
    }

    fn colony() -> Colony {
        Colony {
            id: 10,
            faction_id: 1,
            body_id: 1,
            ..Colony::default()
        }
    }

    #[test]
    fn test_construction_need_only_when_missing() {
        let mut content = ContentDb::default();
        let mut def = InstallationDef {
            id: "mine".into(),
            ..InstallationDef::default()
        };
        def.build_costs.insert("Duranium".into(), 100.0);
        def.build_costs.insert("Boronide".into(), 20.0);
        content.add_installation(def);

        let mut c = colony();
        c.minerals.insert("Boronide".into(), 50.0);
        c.construction_queue.push(InstallationBuildOrder {
            installation_id: "mine".into(),
            quantity_remaining: 1,
            minerals_paid: false,
        });
        c.construction_queue.push(InstallationBuildOrder {
            installation_id: "mine".into(),
            quantity_remaining: 1,
            minerals_paid: true,
        });
        let sim = sim_with_colony(c, content, SimConfig::default());

        let needs = sim.logistics_needs_for_faction(1);
        assert_eq!(needs.len(), 1);
        assert_eq!(needs[0].kind, LogisticsNeedKind::Construction);
        assert_eq!(needs[0].mineral, "Duranium");
        assert_eq!(needs[0].missing_tons, 100.0);
        assert_eq!(needs[0].context_id, "mine");
        assert!(sim.logistics_needs_for_faction(2).is_empty());
    }

    #[test]
    fn test_industry_and_stockpile_needs() {
        let mut content = ContentDb::default();
        let mut smelter = InstallationDef {
            id: "smelter".into(),
            ..InstallationDef::default()
        };
        smelter.consumes_per_day.insert("Corundium".into(), 2.0);
        content.add_installation(smelter);
        let mut drill = InstallationDef {
            id: "drill".into(),
            mining: true,
            ..InstallationDef::default()
        };
        drill.consumes_per_day.insert("Corundium".into(), 50.0);
        content.add_installation(drill);

        let mut c = colony();
        c.installations.insert("smelter".into(), 3);
        c.installations.insert("drill".into(), 1);
        c.minerals.insert("Corundium".into(), 60.0);
        c.mineral_targets.insert("Fuel".into(), 500.0);
        let sim = sim_with_colony(c, content, SimConfig::default());

        let needs = sim.logistics_needs_for_faction(1);
        let kinds: Vec<_> = needs.iter().map(|n| n.kind).collect();
        assert_eq!(
            kinds,
            vec![LogisticsNeedKind::IndustryInput, LogisticsNeedKind::StockpileTarget]
        );
        // 3 smelters * 2/day * 30 days; the mining drill is excluded.
        assert_eq!(needs[0].desired_tons, 180.0);
        assert_eq!(needs[0].missing_tons, 120.0);
        assert_eq!(needs[1].missing_tons, 500.0);
    }

    #[test]
    fn test_docked_ship_fuel_rearm_and_maintenance() {
        let mut content = ContentDb::default();
        content.add_design(ShipDesign {
            id: "frigate".into(),
            mass_tons: 1000.0,
            fuel_capacity_tons: 100.0,
            missile_ammo_capacity: 20.0,
            ..ShipDesign::default()
        });
        let cfg = SimConfig {
            enable_ship_maintenance: true,
            ..SimConfig::default()
        };
        let mut sim = sim_with_colony(colony(), content, cfg);
        let docked = Ship {
            id: 5,
            faction_id: 1,
            system_id: 1,
            position_mkm: Vec2::new(101.0, 0.0),
            design_id: "frigate".into(),
            fuel_tons: 40.0,
            missile_ammo: 5.0,
            ..Ship::default()
        };
        let far = Ship {
            id: 6,
            position_mkm: Vec2::new(500.0, 0.0),
            ..docked.clone()
        };
        sim.state_mut().ships.insert(5, docked);
        sim.state_mut().ships.insert(6, far);

        let needs = sim.logistics_needs_for_faction(1);
        let by_kind =
            |k: LogisticsNeedKind| needs.iter().find(|n| n.kind == k).map(|n| n.desired_tons);
        assert_eq!(by_kind(LogisticsNeedKind::Fuel), Some(60.0));
        assert_eq!(by_kind(LogisticsNeedKind::Rearm), Some(15.0));
        let maint = by_kind(LogisticsNeedKind::Maintenance).unwrap();
        assert!((maint - 1000.0 * 0.00002 * 30.0).abs() < 1e-9);
    }
}
