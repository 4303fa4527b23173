//! Scenario files.
//!
//! A scenario bundles config, content and a snapshot into one RON document.
//! This module only parses text; reading files is left to callers.
//!
//! # Example RON
//!
//! ```ron
//! ScenarioFile(
//!     config: (auto_freight_min_transfer_tons: 5.0),
//!     designs: [(id: "hauler", speed_km_s: 800.0, cargo_tons: 500.0)],
//!     installations: [(id: "fort", fortification_points: 10.0)],
//!     state: (
//!         factions: { 1: (id: 1, name: "Terrans") },
//!         systems: { 1: (id: 1, name: "Sol") },
//!     ),
//! )
//! ```

use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::content::{ContentDb, InstallationDef, ShipDesign};
use crate::error::{GameError, Result};
use crate::ids::{sorted_ids, INVALID_ID};
use crate::simulation::Simulation;
use crate::state::GameState;

/// Complete scenario definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioFile {
    /// Tunables; unset fields keep their defaults.
    pub config: SimConfig,
    /// Ship designs.
    pub designs: Vec<ShipDesign>,
    /// Installation definitions.
    pub installations: Vec<InstallationDef>,
    /// Snapshot.
    pub state: GameState,
}

impl ScenarioFile {
    /// Parse a scenario from RON text.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParseError`] if the text is not a valid scenario.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| GameError::DataParseError {
            path: "<scenario>".to_string(),
            message: e.to_string(),
        })
    }

    /// Content database built from the definitions.
    #[must_use]
    pub fn content(&self) -> ContentDb {
        let mut content = ContentDb::default();
        for design in &self.designs {
            content.add_design(design.clone());
        }
        for def in &self.installations {
            content.add_installation(def.clone());
        }
        content
    }

    /// Referential integrity problems, in a stable order. Empty when the
    /// scenario is consistent.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let st = &self.state;
        let content = self.content();
        let mut problems = Vec::new();

        for id in sorted_ids(&st.bodies) {
            let body = &st.bodies[&id];
            if !st.systems.contains_key(&body.system_id) {
                problems.push(format!("Body {id} is in unknown system {}", body.system_id));
            }
        }
        for id in sorted_ids(&st.jump_points) {
            let jp = &st.jump_points[&id];
            if !st.systems.contains_key(&jp.system_id) {
                problems.push(format!("Jump point {id} is in unknown system {}", jp.system_id));
            }
            if jp.linked_jump_id != INVALID_ID && !st.jump_points.contains_key(&jp.linked_jump_id)
            {
                problems.push(format!(
                    "Jump point {id} links to unknown jump point {}",
                    jp.linked_jump_id
                ));
            }
        }
        for id in sorted_ids(&st.colonies) {
            let colony = &st.colonies[&id];
            if !st.bodies.contains_key(&colony.body_id) {
                problems.push(format!("Colony {id} is on unknown body {}", colony.body_id));
            }
            if !st.factions.contains_key(&colony.faction_id) {
                problems.push(format!("Colony {id} has unknown faction {}", colony.faction_id));
            }
            for inst in colony.installations.keys() {
                if content.installation(inst).is_none() {
                    problems.push(format!("Colony {id} has unknown installation '{inst}'"));
                }
            }
        }
        for id in sorted_ids(&st.ships) {
            let ship = &st.ships[&id];
            if !st.systems.contains_key(&ship.system_id) {
                problems.push(format!("Ship {id} is in unknown system {}", ship.system_id));
            }
            if !content.designs.contains_key(&ship.design_id) {
                problems.push(format!("Ship {id} has unknown design '{}'", ship.design_id));
            }
        }
        for id in sorted_ids(&st.fleets) {
            for ship_id in &st.fleets[&id].ship_ids {
                if !st.ships.contains_key(ship_id) {
                    problems.push(format!("Fleet {id} lists unknown ship {ship_id}"));
                }
            }
        }
        for id in sorted_ids(&st.ground_battles) {
            if !st.colonies.contains_key(&id) {
                problems.push(format!("Ground battle at unknown colony {id}"));
            }
        }
        problems
    }

    /// Build a simulation from the scenario.
    #[must_use]
    pub fn into_simulation(self) -> Simulation {
        let content = self.content();
        Simulation::new(self.state, self.config, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"
ScenarioFile(
    config: (ground_combat_loss_factor: 0.1),
    designs: [(id: "hauler", cargo_tons: 500.0)],
    installations: [(id: "fort", fortification_points: 10.0)],
    state: (
        factions: { 1: (id: 1, name: "Terrans") },
        systems: { 1: (id: 1, name: "Sol") },
        bodies: { 10: (id: 10, system_id: 1) },
        colonies: { 20: (id: 20, faction_id: 1, body_id: 10, installations: { "fort": 2 }) },
        ships: { 30: (id: 30, faction_id: 1, system_id: 1, design_id: "hauler") },
    ),
)
"#;

    #[test]
    fn test_parse_and_build() {
        let scenario = ScenarioFile::from_ron_str(SCENARIO).unwrap();
        assert!(scenario.validate().is_empty(), "{:?}", scenario.validate());
        let sim = scenario.into_simulation();
        assert_eq!(sim.cfg().ground_combat_loss_factor, 0.1);
        assert!(sim.find_design("hauler").is_some());
        let colony = &sim.state().colonies[&20];
        assert!((sim.fortification_points(colony) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_validate_reports_dangling_references() {
        let mut scenario = ScenarioFile::from_ron_str(SCENARIO).unwrap();
        if let Some(ship) = scenario.state.ships.get_mut(&30) {
            ship.design_id = "gunboat".into();
        }
        scenario.state.bodies.clear();
        assert_eq!(
            scenario.validate(),
            vec![
                "Colony 20 is on unknown body 10".to_string(),
                "Ship 30 has unknown design 'gunboat'".to_string(),
            ]
        );
    }

    #[test]
    fn test_parse_error_is_labelled() {
        let err = ScenarioFile::from_ron_str("ScenarioFile(state: 3)").unwrap_err();
        match err {
            GameError::DataParseError { path, .. } => assert_eq!(path, "<scenario>"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
