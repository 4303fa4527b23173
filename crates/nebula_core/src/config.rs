//! Simulation tunables consumed by the planners.
//!
//! The planners only read these values. Every field has a default, so a RON
//! file can override any subset:
//!
//! ```ron
//! SimConfig(
//!     ground_combat_loss_factor: 0.1,
//!     auto_freight_min_transfer_tons: 5.0,
//! )
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// Enumerated simulation tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Length of a simulation day in seconds.
    pub seconds_per_day: f64,

    // --- Habitability ---
    /// When false every body counts as fully habitable.
    pub enable_habitability: bool,
    /// Surface temperature with a temperature factor of 1.
    pub habitability_ideal_temp_k: f64,
    /// Atmosphere pressure with an atmosphere factor of 1.
    pub habitability_ideal_atm: f64,
    /// Temperature delta at which the temperature factor reaches 0.
    pub habitability_temp_tolerance_k: f64,
    /// Atmosphere delta at which the atmosphere factor reaches 0.
    pub habitability_atm_tolerance: f64,

    // --- Docking / sustainment ---
    /// Ships within this distance of a colony body count as docked.
    pub docking_range_mkm: f64,
    /// Enables ship maintenance wear and the maintenance supply need.
    pub enable_ship_maintenance: bool,
    /// Mineral consumed by ship maintenance.
    pub ship_maintenance_resource_id: String,
    /// Maintenance supply per day per ton of hull mass.
    pub ship_maintenance_tons_per_day_per_mass_ton: f64,
    /// Mineral used to rearm missile magazines.
    pub ship_munitions_resource_id: String,
    /// Munitions tonnage per missile.
    pub munitions_tons_per_missile: f64,

    // --- Freight ---
    /// Smallest mineral transfer worth planning.
    pub auto_freight_min_transfer_tons: f64,
    /// Upper bound on the share of a source's exportable surplus one pickup may take.
    pub auto_freight_max_take_fraction_of_surplus: f64,
    /// Allow a single freight trip to carry several minerals.
    pub auto_freight_multi_mineral: bool,
    /// Days of industry inputs a colony keeps on hand.
    pub auto_freight_industry_input_buffer_days: f64,

    // --- Colonists ---
    /// Smallest population transfer worth planning (millions).
    pub auto_colonist_min_transfer_millions: f64,
    /// Upper bound on the share of a source's population surplus one pickup may take.
    pub auto_colonist_max_take_fraction_of_surplus: f64,
    /// Only colonies with an explicit floor (target or reserve) export colonists.
    pub auto_colonist_require_source_floor: bool,

    // --- Troops ---
    /// Smallest troop transfer worth planning.
    pub auto_troop_min_transfer_strength: f64,
    /// Upper bound on the share of a source's garrison surplus one pickup may take.
    pub auto_troop_max_take_fraction_of_surplus: f64,
    /// Raise the desired garrison of colonies defending an active battle.
    pub auto_troop_consider_active_battles: bool,
    /// Safety margin applied to the defensive requirement.
    pub auto_troop_defense_margin_factor: f64,

    // --- Ground combat ---
    /// Fraction of opposing strength each side loses per day.
    pub ground_combat_loss_factor: f64,
    /// Defender losses are divided by `1 + forts * scale`.
    pub fortification_defense_scale: f64,
    /// Attacker losses are multiplied by `1 + forts * scale`.
    pub fortification_attack_scale: f64,
    /// Attacker strength lost per point of defender weapon damage per day.
    pub ground_combat_defender_artillery_strength_per_weapon_damage: f64,
    /// Fortification points destroyed per point of attacker strength per day.
    pub ground_combat_fortification_damage_per_attacker_strength_day: f64,

    // --- Troop training ---
    /// Ground strength produced per training point.
    pub troop_strength_per_training_point: f64,
    /// Duranium consumed per point of trained strength.
    pub troop_training_duranium_per_strength: f64,
    /// Neutronium consumed per point of trained strength.
    pub troop_training_neutronium_per_strength: f64,

    // --- Salvage ---
    /// Salvage throughput per ton of cargo capacity per day.
    pub salvage_tons_per_day_per_cargo_ton: f64,
    /// Minimum salvage throughput per day.
    pub salvage_tons_per_day_min: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seconds_per_day: 86_400.0,
            enable_habitability: true,
            habitability_ideal_temp_k: 288.0,
            habitability_ideal_atm: 1.0,
            habitability_temp_tolerance_k: 50.0,
            habitability_atm_tolerance: 0.5,
            docking_range_mkm: 3.0,
            enable_ship_maintenance: false,
            ship_maintenance_resource_id: "Metals".to_string(),
            ship_maintenance_tons_per_day_per_mass_ton: 0.00002,
            ship_munitions_resource_id: "Munitions".to_string(),
            munitions_tons_per_missile: 1.0,
            auto_freight_min_transfer_tons: 1.0,
            auto_freight_max_take_fraction_of_surplus: 0.75,
            auto_freight_multi_mineral: true,
            auto_freight_industry_input_buffer_days: 30.0,
            auto_colonist_min_transfer_millions: 1.0,
            auto_colonist_max_take_fraction_of_surplus: 0.75,
            auto_colonist_require_source_floor: true,
            auto_troop_min_transfer_strength: 1.0,
            auto_troop_max_take_fraction_of_surplus: 0.75,
            auto_troop_consider_active_battles: true,
            auto_troop_defense_margin_factor: 1.10,
            ground_combat_loss_factor: 0.05,
            fortification_defense_scale: 0.01,
            fortification_attack_scale: 0.005,
            ground_combat_defender_artillery_strength_per_weapon_damage: 0.15,
            ground_combat_fortification_damage_per_attacker_strength_day: 0.005,
            troop_strength_per_training_point: 1.0,
            troop_training_duranium_per_strength: 0.0,
            troop_training_neutronium_per_strength: 0.0,
            salvage_tons_per_day_per_cargo_ton: 0.2,
            salvage_tons_per_day_min: 10.0,
        }
    }
}

impl SimConfig {
    /// Parse a config from RON text. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParseError`] if the text is not a valid config.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| GameError::DataParseError {
            path: "<config>".to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_ron_keeps_defaults() {
        let cfg = SimConfig::from_ron_str("(ground_combat_loss_factor: 1.0)").unwrap();
        assert_eq!(cfg.ground_combat_loss_factor, 1.0);
        assert_eq!(cfg.seconds_per_day, 86_400.0);
        assert!(cfg.auto_colonist_require_source_floor);
    }

    #[test]
    fn test_bad_ron_is_parse_error() {
        let err = SimConfig::from_ron_str("(ground_combat_loss_factor: \"lots\")").unwrap_err();
        assert!(matches!(err, GameError::DataParseError { .. }));
    }
}
