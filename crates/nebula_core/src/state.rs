//! Snapshot of the simulation state read by the planners.
//!
//! Entity tables are hashed maps keyed by [`Id`]. Iterating them directly is
//! insertion-order dependent; use [`sorted_ids`](crate::ids::sorted_ids)
//! before any ordered work.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::content::MineralMap;
use crate::ids::{Id, INVALID_ID};
use crate::math::Vec2;
use crate::orders::ShipOrders;

/// Who drives a faction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FactionControl {
    /// Human player.
    #[default]
    Player,
    /// Passive AI.
    AiPassive,
    /// Exploring AI.
    AiExplorer,
    /// Raiding AI.
    AiPirate,
}

/// Diplomatic stance of one faction toward another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DiplomacyStatus {
    /// At war. Default for factions with no recorded stance.
    #[default]
    Hostile,
    /// Neither at war nor trading.
    Neutral,
    /// Trade partners.
    Friendly,
}

/// A faction.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Faction {
    /// Identifier.
    pub id: Id,
    /// Display name.
    pub name: String,
    /// Controller.
    pub control: FactionControl,
    /// Systems this faction has discovered.
    pub discovered_systems: BTreeSet<Id>,
    /// Stance toward other factions.
    pub relations: BTreeMap<Id, DiplomacyStatus>,
}

/// A star system.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StarSystem {
    /// Identifier.
    pub id: Id,
    /// Display name.
    pub name: String,
    /// Position on the galaxy map.
    pub galaxy_pos: Vec2,
    /// Bodies in this system.
    pub bodies: Vec<Id>,
    /// Outgoing jump points.
    pub jump_points: Vec<Id>,
    /// Nebula density in `[0, 1]`.
    pub nebula_density: f64,
}

/// One end of a jump link.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JumpPoint {
    /// Identifier.
    pub id: Id,
    /// Display name.
    pub name: String,
    /// System containing this jump point.
    pub system_id: Id,
    /// Position in the system (mkm).
    pub position_mkm: Vec2,
    /// Jump point at the far end, or [`INVALID_ID`].
    pub linked_jump_id: Id,
}

/// Body classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BodyType {
    /// Star.
    Star,
    /// Rocky planet.
    #[default]
    Planet,
    /// Moon.
    Moon,
    /// Asteroid.
    Asteroid,
    /// Comet.
    Comet,
    /// Gas giant.
    GasGiant,
}

/// A body orbiting in a system.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Body {
    /// Identifier.
    pub id: Id,
    /// Display name.
    pub name: String,
    /// Containing system.
    pub system_id: Id,
    /// Parent body for moons.
    pub parent_body_id: Option<Id>,
    /// Classification.
    pub body_type: BodyType,
    /// Current position (mkm).
    pub position_mkm: Vec2,
    /// Orbit radius (mkm).
    pub orbit_radius_mkm: f64,
    /// Surface temperature (K).
    pub surface_temp_k: f64,
    /// Atmospheric pressure (atm).
    pub atmosphere_atm: f64,
    /// Mass (Earth masses).
    pub mass_earths: f64,
    /// Luminosity (stars only).
    pub luminosity: f64,
    /// Unmined deposits.
    pub mineral_deposits: MineralMap,
}

/// A queued installation build at a colony.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallationBuildOrder {
    /// Installation content id.
    pub installation_id: String,
    /// Units still to build.
    pub quantity_remaining: u32,
    /// Build costs for the current unit were already deducted.
    pub minerals_paid: bool,
}

/// A queued ship build at a colony shipyard.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipBuildOrder {
    /// Design content id.
    pub design_id: String,
    /// Hull tonnage still to build.
    pub tons_remaining: f64,
}

/// A colony.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Colony {
    /// Identifier.
    pub id: Id,
    /// Display name.
    pub name: String,
    /// Owning faction.
    pub faction_id: Id,
    /// Body the colony sits on.
    pub body_id: Id,
    /// Current population (millions).
    pub population_millions: f64,
    /// Desired population (millions).
    pub population_target_millions: f64,
    /// Population never exported below this (millions).
    pub population_reserve_millions: f64,
    /// Mineral stockpile.
    pub minerals: MineralMap,
    /// Minerals never exported below these amounts.
    pub mineral_reserves: MineralMap,
    /// Desired stockpile levels.
    pub mineral_targets: MineralMap,
    /// Installation counts by content id.
    pub installations: BTreeMap<String, u32>,
    /// Installation build queue.
    pub construction_queue: Vec<InstallationBuildOrder>,
    /// Ship build queue.
    pub shipyard_queue: Vec<ShipBuildOrder>,
    /// Garrison strength.
    pub ground_forces: f64,
    /// Desired garrison strength.
    pub garrison_target_strength: f64,
    /// Strength awaiting training.
    pub troop_training_queue: f64,
}

/// A ship.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Ship {
    /// Identifier.
    pub id: Id,
    /// Display name.
    pub name: String,
    /// Owning faction.
    pub faction_id: Id,
    /// Current system, or [`INVALID_ID`] in transit.
    pub system_id: Id,
    /// Position in the current system (mkm).
    pub position_mkm: Vec2,
    /// Design content id.
    pub design_id: String,
    /// Current speed.
    pub speed_km_s: f64,
    /// Fuel on board. Negative means the ship has never been fuelled and counts as full.
    pub fuel_tons: f64,
    /// Hit points.
    pub hp: f64,
    /// Missiles on board. Negative means an unlimited magazine.
    pub missile_ammo: f64,
    /// Maintenance condition in `[0, 1]`.
    pub maintenance_condition: f64,
    /// Mineral cargo.
    pub cargo: MineralMap,
    /// Embarked colonists (millions).
    pub colonists_millions: f64,
    /// Embarked troops.
    pub troops: f64,
    /// Automation: freight.
    pub auto_freight: bool,
    /// Automation: troop transport.
    pub auto_troop_transport: bool,
    /// Automation: colonist transport.
    pub auto_colonist_transport: bool,
    /// Automation: salvage.
    pub auto_salvage: bool,
    /// Automation: mining.
    pub auto_mine: bool,
    /// Automation: exploration.
    pub auto_explore: bool,
    /// Automation: colonization.
    pub auto_colonize: bool,
    /// Automation: refuelling tanker.
    pub auto_tanker: bool,
}

impl Ship {
    /// Total mineral cargo on board.
    #[must_use]
    pub fn cargo_used_tons(&self) -> f64 {
        self.cargo.values().map(|t| crate::math::non_neg(*t)).sum()
    }
}

/// A group of ships moving together.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Fleet {
    /// Identifier.
    pub id: Id,
    /// Display name.
    pub name: String,
    /// Owning faction.
    pub faction_id: Id,
    /// Member ships.
    pub ship_ids: Vec<Id>,
}

/// Salvageable debris.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Wreck {
    /// Identifier.
    pub id: Id,
    /// Display name.
    pub name: String,
    /// Containing system.
    pub system_id: Id,
    /// Position (mkm).
    pub position_mkm: Vec2,
    /// Recoverable minerals.
    pub minerals: MineralMap,
}

impl Wreck {
    /// Total recoverable tonnage.
    #[must_use]
    pub fn total_tons(&self) -> f64 {
        self.minerals.values().map(|t| crate::math::non_neg(*t)).sum()
    }
}

/// An active ground battle at a colony.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundBattle {
    /// Contested colony.
    pub colony_id: Id,
    /// System of the colony.
    pub system_id: Id,
    /// Invading faction.
    pub attacker_faction_id: Id,
    /// Defending faction.
    pub defender_faction_id: Id,
    /// Remaining attacker strength.
    pub attacker_strength: f64,
    /// Remaining defender strength.
    pub defender_strength: f64,
    /// Fortification points knocked out so far.
    pub fortification_damage_points: f64,
    /// Days fought so far.
    pub days_fought: u32,
}

/// Complete snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameState {
    /// Days since epoch.
    pub date_days: i64,
    /// Factions.
    pub factions: HashMap<Id, Faction>,
    /// Systems.
    pub systems: HashMap<Id, StarSystem>,
    /// Bodies.
    pub bodies: HashMap<Id, Body>,
    /// Jump points.
    pub jump_points: HashMap<Id, JumpPoint>,
    /// Colonies.
    pub colonies: HashMap<Id, Colony>,
    /// Ships.
    pub ships: HashMap<Id, Ship>,
    /// Fleets.
    pub fleets: HashMap<Id, Fleet>,
    /// Wrecks.
    pub wrecks: HashMap<Id, Wreck>,
    /// Active ground battles keyed by colony id.
    pub ground_battles: HashMap<Id, GroundBattle>,
    /// Order state keyed by ship id.
    pub ship_orders: HashMap<Id, ShipOrders>,
}

impl GameState {
    /// System and position of a colony via its body.
    ///
    /// `None` when the body is missing or not placed in a system.
    #[must_use]
    pub fn colony_location(&self, colony_id: Id) -> Option<(Id, Vec2)> {
        let colony = self.colonies.get(&colony_id)?;
        let body = self.bodies.get(&colony.body_id)?;
        if body.system_id == INVALID_ID {
            return None;
        }
        Some((body.system_id, body.position_mkm))
    }
}
