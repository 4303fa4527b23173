//! Static content: ship designs and installation definitions.
//!
//! Content is keyed by string ids (`"scout"`, `"fortress"`). Lookups go by
//! key; nothing iterates these tables into planner output.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Mineral name to tonnage.
pub type MineralMap = BTreeMap<String, f64>;

/// Ship design statistics used by the planners.
///
/// # Example RON
///
/// ```ron
/// ShipDesign(
///     id: "freighter",
///     cargo_tons: 500.0,
///     fuel_capacity_tons: 200.0,
///     max_hp: 80.0,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipDesign {
    /// Unique string identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Hull mass, used by maintenance supply estimates.
    pub mass_tons: f64,
    /// Nominal speed of the design.
    pub speed_km_s: f64,
    /// Mineral cargo capacity.
    pub cargo_tons: f64,
    /// Fuel tank capacity.
    pub fuel_capacity_tons: f64,
    /// Colonist berths (millions).
    pub colony_capacity_millions: f64,
    /// Troop bay capacity (strength).
    pub troop_capacity: f64,
    /// Maximum hit points.
    pub max_hp: f64,
    /// Missile magazine size. Zero or less means no magazine.
    pub missile_ammo_capacity: f64,
}

/// Installation definition.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallationDef {
    /// Unique string identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// One-off minerals paid when construction starts.
    pub build_costs: MineralMap,
    /// Fortification points contributed per installation.
    pub fortification_points: f64,
    /// Ground weapon damage per day contributed per installation.
    pub weapon_damage: f64,
    /// Habitation capacity per installation (millions).
    pub habitation_capacity_millions: f64,
    /// Troop training points per day per installation.
    pub troop_training_points_per_day: f64,
    /// Minerals consumed per day while running.
    pub consumes_per_day: MineralMap,
    /// Mining installations produce rather than consume.
    pub mining: bool,
    /// Shipyard throughput per installation.
    pub build_rate_tons_per_day: f64,
    /// Shipyard minerals per ton built.
    pub build_costs_per_ton: MineralMap,
}

/// Content id of the shipyard installation.
pub const SHIPYARD_INSTALLATION_ID: &str = "shipyard";

/// All static content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentDb {
    /// Ship designs by id.
    pub designs: HashMap<String, ShipDesign>,
    /// Installation definitions by id.
    pub installations: HashMap<String, InstallationDef>,
}

impl ContentDb {
    /// Register a design under its own id.
    pub fn add_design(&mut self, design: ShipDesign) {
        self.designs.insert(design.id.clone(), design);
    }

    /// Register an installation under its own id.
    pub fn add_installation(&mut self, def: InstallationDef) {
        self.installations.insert(def.id.clone(), def);
    }

    /// Look up an installation definition.
    #[must_use]
    pub fn installation(&self, id: &str) -> Option<&InstallationDef> {
        self.installations.get(id)
    }
}
