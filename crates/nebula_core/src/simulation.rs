//! The simulation facade read by the planners.
//!
//! [`Simulation`] owns the snapshot, config and content and answers the
//! derived questions the planners ask (discovery, hostility, habitation,
//! fortifications, routes). Only [`Simulation::tick_ground_combat`] and the
//! order-issuing operations in [`commands`](crate::commands) mutate it.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::content::{ContentDb, InstallationDef, ShipDesign};
use crate::error::{GameError, Result};
use crate::ground_combat::{resolution, BattleSides, GroundBattleWinner, GroundCombatModel};
use crate::ids::{sorted_ids, Id, INVALID_ID};
use crate::math::{non_neg, Vec2, EPS};
use crate::routing::{plan_jump_route, predicted_nav_state, JumpRoutePlan, RouteQuery};
use crate::state::{Colony, DiplomacyStatus, GameState};

/// A ground battle that ended during a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundBattleResolution {
    /// Contested colony.
    pub colony_id: Id,
    /// Winning side.
    pub winner: GroundBattleWinner,
    /// Days the battle lasted.
    pub days_fought: u32,
    /// Fortification installations destroyed by accumulated damage.
    pub fortifications_destroyed: u32,
}

/// Snapshot, config and content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Simulation {
    state: GameState,
    cfg: SimConfig,
    content: ContentDb,
}

impl Simulation {
    /// Wrap a snapshot.
    #[must_use]
    pub fn new(state: GameState, cfg: SimConfig, content: ContentDb) -> Self {
        Self {
            state,
            cfg,
            content,
        }
    }

    /// The snapshot.
    #[must_use]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Mutable snapshot access for scenario setup.
    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    /// The config.
    #[must_use]
    pub fn cfg(&self) -> &SimConfig {
        &self.cfg
    }

    /// The content database.
    #[must_use]
    pub fn content(&self) -> &ContentDb {
        &self.content
    }

    /// Look up a ship design.
    #[must_use]
    pub fn find_design(&self, design_id: &str) -> Option<&ShipDesign> {
        self.content.designs.get(design_id)
    }

    /// Fleet containing a ship. Fleets are scanned in ascending id order.
    #[must_use]
    pub fn fleet_for_ship(&self, ship_id: Id) -> Option<Id> {
        if ship_id == INVALID_ID {
            return None;
        }
        sorted_ids(&self.state.fleets).into_iter().find(|fid| {
            self.state
                .fleets
                .get(fid)
                .is_some_and(|f| f.ship_ids.contains(&ship_id))
        })
    }

    /// Whether a faction has discovered a system.
    ///
    /// Unknown factions see everything, so routing with
    /// `restrict_to_discovered` for a faction missing from the snapshot
    /// applies no restriction.
    #[must_use]
    pub fn is_system_discovered_by_faction(&self, faction_id: Id, system_id: Id) -> bool {
        self.state
            .factions
            .get(&faction_id)
            .map_or(true, |f| f.discovered_systems.contains(&system_id))
    }

    /// Stance of `from` toward `to`. Factions are friendly to themselves;
    /// unrecorded stances are hostile.
    #[must_use]
    pub fn diplomacy_status(&self, from: Id, to: Id) -> DiplomacyStatus {
        if from == to {
            return DiplomacyStatus::Friendly;
        }
        self.state
            .factions
            .get(&from)
            .and_then(|f| f.relations.get(&to).copied())
            .unwrap_or_default()
    }

    /// Whether `a` treats `b` as an enemy.
    #[must_use]
    pub fn are_factions_hostile(&self, a: Id, b: Id) -> bool {
        self.diplomacy_status(a, b) == DiplomacyStatus::Hostile
    }

    /// Same faction, or `a` is friendly toward `b`.
    #[must_use]
    pub fn are_factions_trade_partners(&self, a: Id, b: Id) -> bool {
        self.diplomacy_status(a, b) == DiplomacyStatus::Friendly
    }

    /// Hostile ships a faction can see in a system, ascending.
    ///
    /// A faction sees a system while it has a ship or colony there.
    #[must_use]
    pub fn detected_hostile_ships_in_system(
        &self,
        viewer_faction_id: Id,
        system_id: Id,
    ) -> Vec<Id> {
        if !self.state.systems.contains_key(&system_id) {
            return Vec::new();
        }
        let has_ship = self
            .state
            .ships
            .values()
            .any(|s| s.faction_id == viewer_faction_id && s.system_id == system_id);
        let has_colony = self.state.colonies.values().any(|c| {
            c.faction_id == viewer_faction_id
                && self.state.bodies.get(&c.body_id).is_some_and(|b| b.system_id == system_id)
        });
        if !has_ship && !has_colony {
            return Vec::new();
        }
        sorted_ids(&self.state.ships)
            .into_iter()
            .filter(|sid| {
                self.state.ships.get(sid).is_some_and(|s| {
                    s.system_id == system_id
                        && s.faction_id != viewer_faction_id
                        && self.are_factions_hostile(viewer_faction_id, s.faction_id)
                })
            })
            .collect()
    }

    fn installation_sum(&self, colony: &Colony, per_unit: impl Fn(&InstallationDef) -> f64) -> f64 {
        let total: f64 = colony
            .installations
            .iter()
            .filter(|(_, count)| **count > 0)
            .filter_map(|(id, count)| {
                let value = per_unit(self.content.installation(id)?);
                (value > 0.0).then(|| value * f64::from(*count))
            })
            .sum();
        non_neg(total)
    }

    /// Total fortification points of a colony.
    #[must_use]
    pub fn fortification_points(&self, colony: &Colony) -> f64 {
        self.installation_sum(colony, |d| d.fortification_points)
    }

    /// Ground weapon damage per day of a colony's installations.
    #[must_use]
    pub fn artillery_weapon_damage_per_day(&self, colony: &Colony) -> f64 {
        self.installation_sum(colony, |d| d.weapon_damage)
    }

    /// Habitation capacity provided by installations (millions).
    #[must_use]
    pub fn habitation_capacity_millions(&self, colony: &Colony) -> f64 {
        self.installation_sum(colony, |d| d.habitation_capacity_millions)
    }

    /// Troop training points per day.
    #[must_use]
    pub fn troop_training_points_per_day(&self, colony: &Colony) -> f64 {
        self.installation_sum(colony, |d| d.troop_training_points_per_day)
    }

    /// Habitability of a body in `[0, 1]`.
    ///
    /// Product of linear temperature and atmosphere factors. Missing bodies
    /// and disabled habitability give 1.
    #[must_use]
    pub fn body_habitability(&self, body_id: Id) -> f64 {
        if !self.cfg.enable_habitability {
            return 1.0;
        }
        let Some(body) = self.state.bodies.get(&body_id) else {
            return 1.0;
        };
        let factor = |delta: f64, tol: f64| (1.0 - delta / tol.max(EPS)).clamp(0.0, 1.0);
        let t = factor(
            (body.surface_temp_k - self.cfg.habitability_ideal_temp_k).abs(),
            self.cfg.habitability_temp_tolerance_k,
        );
        let a = factor(
            (body.atmosphere_atm - self.cfg.habitability_ideal_atm).abs(),
            self.cfg.habitability_atm_tolerance,
        );
        (t * a).clamp(0.0, 1.0)
    }

    /// Habitation capacity the colony's population needs (millions).
    #[must_use]
    pub fn required_habitation_capacity_millions(&self, colony: &Colony) -> f64 {
        if !self.cfg.enable_habitability {
            return 0.0;
        }
        let pop = non_neg(colony.population_millions);
        if pop <= 0.0 {
            return 0.0;
        }
        let hab = self.body_habitability(colony.body_id);
        if hab >= 0.999 {
            return 0.0;
        }
        pop * (1.0 - hab).clamp(0.0, 1.0)
    }

    /// Route from an arbitrary position. See [`plan_jump_route`].
    #[must_use]
    pub fn plan_jump_route_from_pos(
        &self,
        start_system_id: Id,
        start_pos_mkm: Vec2,
        faction_id: Id,
        speed_km_s: f64,
        goal_system_id: Id,
        restrict_to_discovered: bool,
        goal_pos_mkm: Option<Vec2>,
    ) -> Option<JumpRoutePlan> {
        plan_jump_route(
            &self.state,
            &self.cfg,
            &RouteQuery {
                start_system_id,
                start_pos_mkm,
                faction_id,
                speed_km_s,
                goal_system_id,
                restrict_to_discovered,
                goal_pos_mkm,
            },
        )
    }

    /// Route for a ship from where its queued jumps leave it.
    #[must_use]
    pub fn plan_jump_route_for_ship(
        &self,
        ship_id: Id,
        goal_system_id: Id,
        restrict_to_discovered: bool,
        goal_pos_mkm: Option<Vec2>,
    ) -> Option<JumpRoutePlan> {
        let ship = self.state.ships.get(&ship_id)?;
        let (system_id, pos) = predicted_nav_state(&self.state, ship_id)?;
        self.plan_jump_route_from_pos(
            system_id,
            pos,
            ship.faction_id,
            ship.speed_km_s,
            goal_system_id,
            restrict_to_discovered,
            goal_pos_mkm,
        )
    }

    /// Travel days between two positions, `+inf` when unreachable.
    #[must_use]
    pub fn estimate_eta_days(
        &self,
        start_system_id: Id,
        start_pos_mkm: Vec2,
        faction_id: Id,
        speed_km_s: f64,
        goal_system_id: Id,
        goal_pos_mkm: Vec2,
        restrict_to_discovered: bool,
    ) -> f64 {
        if start_system_id == INVALID_ID || goal_system_id == INVALID_ID {
            return f64::INFINITY;
        }
        self.plan_jump_route_from_pos(
            start_system_id,
            start_pos_mkm,
            faction_id,
            speed_km_s,
            goal_system_id,
            restrict_to_discovered,
            Some(goal_pos_mkm),
        )
        .map_or(f64::INFINITY, |p| non_neg(p.total_eta_days))
    }

    /// Advance every active ground battle by one day, in ascending colony order.
    ///
    /// A captured colony changes owner and keeps the surviving attackers as
    /// its garrison. Either way the fortification damage dealt is converted
    /// into destroyed fortification installations.
    pub fn tick_ground_combat(&mut self) -> Vec<GroundBattleResolution> {
        let model = GroundCombatModel::from_config(&self.cfg);
        let mut resolved = Vec::new();

        for cid in sorted_ids(&self.state.ground_battles) {
            let Some(colony) = self.state.colonies.get(&cid) else {
                self.state.ground_battles.remove(&cid);
                continue;
            };
            let forts_total = self.fortification_points(colony);
            let artillery = self.artillery_weapon_damage_per_day(colony);
            let Some(battle) = self.state.ground_battles.get_mut(&cid) else {
                continue;
            };

            let mut fort_damage = non_neg(battle.fortification_damage_points);
            if forts_total <= EPS {
                fort_damage = 0.0;
            }
            let mut sides = BattleSides {
                attacker: non_neg(battle.attacker_strength),
                defender: non_neg(battle.defender_strength),
                fort_damage: fort_damage.min(forts_total),
            };
            model.step_day(&mut sides, forts_total, artillery);
            battle.attacker_strength = sides.attacker;
            battle.defender_strength = sides.defender;
            battle.fortification_damage_points = sides.fort_damage;
            battle.days_fought += 1;

            let days_fought = battle.days_fought;
            let attacker_faction_id = battle.attacker_faction_id;
            let outcome = resolution(sides.attacker, sides.defender);

            let Some(winner) = outcome else {
                if let Some(colony) = self.state.colonies.get_mut(&cid) {
                    colony.ground_forces = sides.defender;
                }
                continue;
            };

            self.state.ground_battles.remove(&cid);
            let destroyed = self.destroy_fortifications(cid, sides.fort_damage);
            if let Some(colony) = self.state.colonies.get_mut(&cid) {
                match winner {
                    GroundBattleWinner::Attacker => {
                        colony.faction_id = attacker_faction_id;
                        colony.ground_forces = sides.attacker;
                        colony.troop_training_queue = 0.0;
                        colony.garrison_target_strength = 0.0;
                    }
                    GroundBattleWinner::Defender => {
                        colony.ground_forces = sides.defender;
                    }
                }
            }
            tracing::debug!(
                colony_id = cid,
                winner = winner.label(),
                days_fought,
                fortifications_destroyed = destroyed,
                "ground battle resolved"
            );
            resolved.push(GroundBattleResolution {
                colony_id: cid,
                winner,
                days_fought,
                fortifications_destroyed: destroyed,
            });
        }
        resolved
    }

    /// Remove fortification installations worth `damage_points`, cheapest id first.
    ///
    /// Half an installation's worth of leftover damage destroys one more.
    fn destroy_fortifications(&mut self, colony_id: Id, damage_points: f64) -> u32 {
        let mut damage = non_neg(damage_points);
        if damage <= EPS {
            return 0;
        }
        let Some(colony) = self.state.colonies.get_mut(&colony_id) else {
            return 0;
        };
        let forts: Vec<(String, f64)> = colony
            .installations
            .iter()
            .filter(|(_, count)| **count > 0)
            .filter_map(|(id, _)| {
                let per = self.content.installation(id)?.fortification_points;
                (per > EPS).then(|| (id.clone(), per))
            })
            .collect();

        let mut destroyed_total = 0;
        for (id, per) in forts {
            if damage <= EPS {
                break;
            }
            let Some(count) = colony.installations.get_mut(&id) else {
                continue;
            };
            let spend = damage.min(per * f64::from(*count));
            let whole = (spend / per + EPS).floor();
            let rem = spend - whole * per;
            // Bounded by `count`, so the cast cannot truncate.
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let mut destroy = whole as u32;
            if destroy < *count && rem >= per * 0.5 {
                destroy += 1;
            }
            let destroy = destroy.min(*count);
            if destroy == 0 {
                continue;
            }
            *count -= destroy;
            if *count == 0 {
                colony.installations.remove(&id);
            }
            destroyed_total += destroy;
            damage = non_neg(damage - per * f64::from(destroy));
        }
        destroyed_total
    }

    /// Hash of the snapshot and config in deterministic order.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        fn hash_table<V: Serialize>(hasher: &mut DefaultHasher, table: &HashMap<Id, V>) {
            let ids = sorted_ids(table);
            ids.len().hash(hasher);
            for id in ids {
                id.hash(hasher);
                if let Some(bytes) = table.get(&id).and_then(|v| bincode::serialize(v).ok()) {
                    bytes.hash(hasher);
                }
            }
        }

        let mut hasher = DefaultHasher::new();
        self.state.date_days.hash(&mut hasher);
        hash_table(&mut hasher, &self.state.factions);
        hash_table(&mut hasher, &self.state.systems);
        hash_table(&mut hasher, &self.state.bodies);
        hash_table(&mut hasher, &self.state.jump_points);
        hash_table(&mut hasher, &self.state.colonies);
        hash_table(&mut hasher, &self.state.ships);
        hash_table(&mut hasher, &self.state.fleets);
        hash_table(&mut hasher, &self.state.wrecks);
        hash_table(&mut hasher, &self.state.ground_battles);
        hash_table(&mut hasher, &self.state.ship_orders);
        if let Ok(bytes) = bincode::serialize(&self.cfg) {
            bytes.hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Serialize the whole simulation.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| GameError::Serialization(e.to_string()))
    }

    /// Deserialize a simulation.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a serialized simulation.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data).map_err(|e| GameError::Serialization(e.to_string()))
    }
}
