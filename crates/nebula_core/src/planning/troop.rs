//! Troop transport planner.
//!
//! Moves ground forces from colonies above their garrison target to colonies
//! below it. Colonies defending an active battle may have their target raised
//! to what the square law says is needed to hold.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ground_combat::GroundCombatModel;
use crate::ids::Id;
use crate::math::{finite_non_neg, non_neg, EPS};
use crate::simulation::Simulation;

use super::transfer::{
    run_transfer_plan, Balance, Carrier, Transfer, TransferParams, TransferWording,
};
use super::{collect_candidates, EtaOracle, OwnedColonies, PlannerResult, ShipGate};

/// Reason attached to ordinary garrison deficits.
pub const REASON_GARRISON_TARGET: &str = "Meet garrison target";
/// Reason attached to colonies reinforced against an active battle.
pub const REASON_DEFENSIVE_BATTLE: &str = "Reinforce defensive battle";

/// Assignment shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TroopAssignmentKind {
    /// Ship already carries troops; unload them.
    DeliverTroops,
    /// Load at a surplus colony, then unload.
    #[default]
    PickupAndDeliver,
}

/// One planned troop movement.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TroopAssignment {
    /// Shape of the order sequence.
    pub kind: TroopAssignmentKind,
    /// Transport.
    pub ship_id: Id,
    /// Pickup colony, for `PickupAndDeliver`.
    pub source_colony_id: Option<Id>,
    /// Drop-off colony.
    pub dest_colony_id: Id,
    /// Route only through discovered systems when the orders are issued.
    pub restrict_to_discovered: bool,
    /// Strength moved.
    pub strength: f64,
    /// Travel days to the pickup.
    pub eta_to_source_days: f64,
    /// Travel days from pickup (or current position) to the drop-off.
    pub eta_to_dest_days: f64,
    /// Sum of the legs.
    pub eta_total_days: f64,
    /// Why the destination wants troops.
    pub reason: String,
    /// What the ship does.
    pub note: String,
}

/// Troop planner options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TroopPlannerOptions {
    /// Only ships with `auto_troop_transport`.
    pub require_auto_troop_transport_flag: bool,
    /// Only ships with no pending work.
    pub require_idle: bool,
    /// Route only through discovered systems.
    pub restrict_to_discovered: bool,
    /// Skip fleet members.
    pub exclude_fleet_ships: bool,
    /// Cap on candidate ships.
    pub max_ships: usize,
}

impl Default for TroopPlannerOptions {
    fn default() -> Self {
        Self {
            require_auto_troop_transport_flag: true,
            require_idle: true,
            restrict_to_discovered: true,
            exclude_fleet_ships: true,
            max_ships: 256,
        }
    }
}

/// Troop planner output.
pub type TroopPlannerResult = PlannerResult<TroopAssignment>;

const WORDING: TransferWording = TransferWording {
    no_need: "No colonies need troops.",
    no_carriers: "No eligible troop transports.",
    no_feasible: "No feasible troop transfers.",
};

fn garrison_balances(
    sim: &Simulation,
    faction_id: Id,
    colonies: &OwnedColonies,
) -> BTreeMap<Id, Balance> {
    let state = sim.state();
    let cfg = sim.cfg();
    let model = GroundCombatModel::from_config(cfg);
    let mut out = BTreeMap::new();

    for &cid in &colonies.ids {
        let Some(colony) = state.colonies.get(&cid) else { continue };
        let battle = state.ground_battles.get(&cid);

        let mut desired = finite_non_neg(colony.garrison_target_strength);
        let current = battle.map_or(finite_non_neg(colony.ground_forces), |b| {
            finite_non_neg(b.defender_strength)
        });
        let mut reason = "";

        let defending = battle.filter(|b| {
            cfg.auto_troop_consider_active_battles && b.defender_faction_id == faction_id
        });
        if let Some(b) = defending {
            let factor = model.defense_bonus(sim.fortification_points(colony)).sqrt();
            let required = if factor > EPS {
                let margin = non_neg(cfg.auto_troop_defense_margin_factor);
                finite_non_neg(b.attacker_strength) * margin / factor
            } else {
                0.0
            };
            if required > desired + EPS {
                desired = required;
                reason = REASON_DEFENSIVE_BATTLE;
            }
        }
        if reason.is_empty() && desired > EPS {
            reason = REASON_GARRISON_TARGET;
        }

        out.insert(
            cid,
            Balance {
                deficit: non_neg(desired - current),
                surplus: non_neg(current - desired),
                reason,
            },
        );
    }
    out
}

/// Plan troop movements for a faction.
#[must_use]
pub fn compute_troop_plan(
    sim: &Simulation,
    faction_id: Id,
    opts: &TroopPlannerOptions,
) -> TroopPlannerResult {
    if !sim.state().factions.contains_key(&faction_id) {
        return PlannerResult::invalid("Invalid faction.");
    }
    let cfg = sim.cfg();
    let params = TransferParams {
        min_transfer: non_neg(cfg.auto_troop_min_transfer_strength),
        take_fraction: cfg.auto_troop_max_take_fraction_of_surplus.clamp(0.0, 1.0),
    };
    let colonies = OwnedColonies::collect(sim, faction_id);
    let balances = garrison_balances(sim, faction_id, &colonies);
    let eta = EtaOracle::new(sim, faction_id, opts.restrict_to_discovered);
    let gate = ShipGate {
        require_idle: opts.require_idle,
        exclude_fleet_ships: opts.exclude_fleet_ships,
    };

    let plan = run_transfer_plan(&eta, &colonies, &balances, &params, &WORDING, || {
        collect_candidates(sim, opts.max_ships, |ship| {
            if opts.require_auto_troop_transport_flag && !ship.auto_troop_transport {
                return None;
            }
            if !gate.admits(sim, ship, faction_id) {
                return None;
            }
            let capacity = non_neg(sim.find_design(&ship.design_id)?.troop_capacity);
            (capacity >= params.min_transfer + EPS).then(|| Carrier {
                ship_id: ship.id,
                system_id: ship.system_id,
                pos_mkm: ship.position_mkm,
                speed_km_s: ship.speed_km_s,
                capacity,
                embarked: finite_non_neg(ship.troops),
            })
        })
    });

    tracing::debug!(
        faction_id,
        assignments = plan.assignments.len(),
        truncated = plan.truncated,
        "troop plan computed"
    );
    let restrict = opts.restrict_to_discovered;
    PlannerResult {
        ok: plan.ok,
        truncated: plan.truncated,
        message: plan.message,
        assignments: plan
            .assignments
            .into_iter()
            .map(|t| to_assignment(t, restrict))
            .collect(),
    }
}

fn to_assignment(t: Transfer, restrict_to_discovered: bool) -> TroopAssignment {
    let (kind, note) = match t.source_colony_id {
        None => (TroopAssignmentKind::DeliverTroops, "Deliver embarked troops"),
        Some(_) => (TroopAssignmentKind::PickupAndDeliver, "Pickup + deliver"),
    };
    TroopAssignment {
        kind,
        ship_id: t.ship_id,
        source_colony_id: t.source_colony_id,
        dest_colony_id: t.dest_colony_id,
        restrict_to_discovered,
        strength: t.amount,
        eta_to_source_days: t.eta_to_source_days,
        eta_to_dest_days: t.eta_to_dest_days,
        eta_total_days: t.eta_total_days,
        reason: t.reason.to_string(),
        note: note.to_string(),
    }
}
