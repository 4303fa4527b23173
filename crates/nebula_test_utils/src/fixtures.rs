//! Test fixtures and helpers.
//!
//! [`ScenarioBuilder`] assembles snapshots for tests and benchmarks without
//! spelling out every struct literal.

use nebula_core::config::SimConfig;
use nebula_core::content::{InstallationDef, MineralMap, ShipDesign};
use nebula_core::ids::Id;
use nebula_core::math::Vec2;
use nebula_core::orders::ShipOrders;
use nebula_core::scenario::ScenarioFile;
use nebula_core::simulation::Simulation;
use nebula_core::state::{
    Body, Colony, DiplomacyStatus, Faction, Fleet, GroundBattle, JumpPoint, Ship, StarSystem,
    Wreck,
};

/// Build a mineral map from pairs.
#[must_use]
pub fn minerals(pairs: &[(&str, f64)]) -> MineralMap {
    pairs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect()
}

/// Fluent snapshot builder.
///
/// # Example
///
/// ```ignore
/// let sim = ScenarioBuilder::new()
///     .faction(1, "Terrans")
///     .system(1, "Sol")
///     .discover(1, &[1])
///     .body(10, 1, Vec2::ZERO)
///     .colony(20, 1, 10, |c| c.ground_forces = 50.0)
///     .build();
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScenarioBuilder {
    file: ScenarioFile,
}

impl ScenarioBuilder {
    /// Empty scenario with default config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Edit the config.
    #[must_use]
    pub fn config(mut self, edit: impl FnOnce(&mut SimConfig)) -> Self {
        edit(&mut self.file.config);
        self
    }

    /// Add a faction that knows no systems.
    #[must_use]
    pub fn faction(mut self, id: Id, name: &str) -> Self {
        self.file.state.factions.insert(
            id,
            Faction {
                id,
                name: name.to_string(),
                ..Faction::default()
            },
        );
        self
    }

    /// Mark systems as discovered by a faction.
    #[must_use]
    pub fn discover(mut self, faction_id: Id, systems: &[Id]) -> Self {
        if let Some(f) = self.file.state.factions.get_mut(&faction_id) {
            f.discovered_systems.extend(systems.iter().copied());
        }
        self
    }

    /// Set the stance of `from` towards `to`.
    #[must_use]
    pub fn relation(mut self, from: Id, to: Id, status: DiplomacyStatus) -> Self {
        if let Some(f) = self.file.state.factions.get_mut(&from) {
            f.relations.insert(to, status);
        }
        self
    }

    /// Add a star system.
    #[must_use]
    pub fn system(mut self, id: Id, name: &str) -> Self {
        self.file.state.systems.insert(
            id,
            StarSystem {
                id,
                name: name.to_string(),
                ..StarSystem::default()
            },
        );
        self
    }

    /// Link two systems with a pair of jump points.
    ///
    /// Each end is `(jump_point_id, system_id, position_mkm)`.
    #[must_use]
    pub fn jump_link(mut self, a: (Id, Id, Vec2), b: (Id, Id, Vec2)) -> Self {
        for ((id, system_id, position_mkm), linked) in [(a, b.0), (b, a.0)] {
            self.file.state.jump_points.insert(
                id,
                JumpPoint {
                    id,
                    name: format!("JP-{id}"),
                    system_id,
                    position_mkm,
                    linked_jump_id: linked,
                },
            );
            if let Some(sys) = self.file.state.systems.get_mut(&system_id) {
                sys.jump_points.push(id);
            }
        }
        self
    }

    /// Add a body.
    #[must_use]
    pub fn body(mut self, id: Id, system_id: Id, position_mkm: Vec2) -> Self {
        self.file.state.bodies.insert(
            id,
            Body {
                id,
                name: format!("Body-{id}"),
                system_id,
                position_mkm,
                ..Body::default()
            },
        );
        if let Some(sys) = self.file.state.systems.get_mut(&system_id) {
            sys.bodies.push(id);
        }
        self
    }

    /// Add a colony and edit it.
    #[must_use]
    pub fn colony(
        mut self,
        id: Id,
        faction_id: Id,
        body_id: Id,
        edit: impl FnOnce(&mut Colony),
    ) -> Self {
        let mut colony = Colony {
            id,
            name: format!("Colony-{id}"),
            faction_id,
            body_id,
            ..Colony::default()
        };
        edit(&mut colony);
        self.file.state.colonies.insert(id, colony);
        self
    }

    /// Add a ship design.
    #[must_use]
    pub fn design(mut self, design: ShipDesign) -> Self {
        self.file.designs.push(design);
        self
    }

    /// Add an installation definition.
    #[must_use]
    pub fn installation(mut self, def: InstallationDef) -> Self {
        self.file.installations.push(def);
        self
    }

    /// Add a ship and edit it. Speed defaults to 1000 km/s.
    #[must_use]
    pub fn ship(
        mut self,
        id: Id,
        faction_id: Id,
        system_id: Id,
        position_mkm: Vec2,
        design_id: &str,
        edit: impl FnOnce(&mut Ship),
    ) -> Self {
        let mut ship = Ship {
            id,
            name: format!("Ship-{id}"),
            faction_id,
            system_id,
            position_mkm,
            design_id: design_id.to_string(),
            speed_km_s: 1000.0,
            ..Ship::default()
        };
        edit(&mut ship);
        self.file.state.ships.insert(id, ship);
        self
    }

    /// Give a ship an order queue.
    #[must_use]
    pub fn orders(mut self, ship_id: Id, orders: ShipOrders) -> Self {
        self.file.state.ship_orders.insert(ship_id, orders);
        self
    }

    /// Add a fleet.
    #[must_use]
    pub fn fleet(mut self, id: Id, faction_id: Id, ship_ids: &[Id]) -> Self {
        self.file.state.fleets.insert(
            id,
            Fleet {
                id,
                name: format!("Fleet-{id}"),
                faction_id,
                ship_ids: ship_ids.to_vec(),
            },
        );
        self
    }

    /// Add a wreck.
    #[must_use]
    pub fn wreck(
        mut self,
        id: Id,
        system_id: Id,
        position_mkm: Vec2,
        cargo: &[(&str, f64)],
    ) -> Self {
        self.file.state.wrecks.insert(
            id,
            Wreck {
                id,
                name: format!("Wreck-{id}"),
                system_id,
                position_mkm,
                minerals: minerals(cargo),
            },
        );
        self
    }

    /// Add an active ground battle.
    #[must_use]
    pub fn battle(mut self, battle: GroundBattle) -> Self {
        self.file.state.ground_battles.insert(battle.colony_id, battle);
        self
    }

    /// The scenario document.
    #[must_use]
    pub fn into_scenario(self) -> ScenarioFile {
        self.file
    }

    /// The scenario as RON text.
    #[must_use]
    pub fn to_ron(&self) -> String {
        ron::ser::to_string_pretty(&self.file, ron::ser::PrettyConfig::default())
            .unwrap_or_default()
    }

    /// Build the simulation.
    #[must_use]
    pub fn build(self) -> Simulation {
        self.file.into_simulation()
    }
}

/// Common freighter design: 1000 t of cargo.
#[must_use]
pub fn freighter_design() -> ShipDesign {
    ShipDesign {
        id: "freighter".into(),
        name: "Freighter".into(),
        mass_tons: 5000.0,
        speed_km_s: 1000.0,
        cargo_tons: 1000.0,
        fuel_capacity_tons: 100.0,
        max_hp: 100.0,
        ..ShipDesign::default()
    }
}

/// Chain of `systems` systems, linked in order, each with one colony of
/// faction 1 and one idle auto-freighter.
///
/// Even colonies hold 2000 t of Duranium; odd colonies want 500 t of it.
#[must_use]
pub fn logistics_chain(systems: u64) -> Simulation {
    let all: Vec<Id> = (1..=systems).collect();
    let mut b = ScenarioBuilder::new()
        .faction(1, "Terrans")
        .design(freighter_design());
    for sys in 1..=systems {
        b = b.system(sys, &format!("System-{sys}"));
    }
    b = b.discover(1, &all);
    for sys in 1..systems {
        b = b.jump_link(
            (sys * 10, sys, Vec2::new(100.0, 0.0)),
            (sys * 10 + 1, sys + 1, Vec2::new(-100.0, 0.0)),
        );
    }
    for sys in 1..=systems {
        let body = 1000 + sys;
        let colony = 2000 + sys;
        let rich = sys % 2 == 0;
        b = b
            .body(body, sys, Vec2::new(20.0, 0.0))
            .colony(colony, 1, body, |c| {
                if rich {
                    c.minerals = minerals(&[("Duranium", 2000.0)]);
                } else {
                    c.mineral_targets = minerals(&[("Duranium", 500.0)]);
                }
            })
            .ship(3000 + sys, 1, sys, Vec2::ZERO, "freighter", |s| {
                s.auto_freight = true;
            });
    }
    b.build()
}
