//! Colonist transport planner.
//!
//! A colony below its population target is a destination. A colony above its
//! floor, `max(target, reserve)`, may export the difference.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::Id;
use crate::math::{finite_non_neg, non_neg, EPS};
use crate::simulation::Simulation;

use super::transfer::{
    run_transfer_plan, Balance, Carrier, Transfer, TransferParams, TransferWording,
};
use super::{collect_candidates, EtaOracle, OwnedColonies, PlannerResult, ShipGate};

/// Reason attached to every colonist deficit.
pub const REASON_POPULATION_TARGET: &str = "Meet population target";

/// Assignment shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColonistAssignmentKind {
    /// Ship already carries colonists; unload them.
    DeliverColonists,
    /// Load at a surplus colony, then unload.
    #[default]
    PickupAndDeliver,
}

/// One planned colonist movement.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColonistAssignment {
    /// Shape of the order sequence.
    pub kind: ColonistAssignmentKind,
    /// Transport.
    pub ship_id: Id,
    /// Pickup colony, for `PickupAndDeliver`.
    pub source_colony_id: Option<Id>,
    /// Drop-off colony.
    pub dest_colony_id: Id,
    /// Route only through discovered systems when the orders are issued.
    pub restrict_to_discovered: bool,
    /// Population moved, in millions.
    pub millions: f64,
    /// Travel days to the pickup.
    pub eta_to_source_days: f64,
    /// Travel days from pickup (or current position) to the drop-off.
    pub eta_to_dest_days: f64,
    /// Sum of the legs.
    pub eta_total_days: f64,
    /// Why the destination wants colonists.
    pub reason: String,
    /// What the ship does.
    pub note: String,
}

/// Colonist planner options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColonistPlannerOptions {
    /// Only ships with `auto_colonist_transport`.
    pub require_auto_colonist_transport_flag: bool,
    /// Only ships with no pending work.
    pub require_idle: bool,
    /// Route only through discovered systems.
    pub restrict_to_discovered: bool,
    /// Skip fleet members.
    pub exclude_fleet_ships: bool,
    /// Cap on candidate ships.
    pub max_ships: usize,
}

impl Default for ColonistPlannerOptions {
    fn default() -> Self {
        Self {
            require_auto_colonist_transport_flag: true,
            require_idle: true,
            restrict_to_discovered: true,
            exclude_fleet_ships: true,
            max_ships: 256,
        }
    }
}

/// Colonist planner output.
pub type ColonistPlannerResult = PlannerResult<ColonistAssignment>;

const WORDING: TransferWording = TransferWording {
    no_need: "No colonies need population.",
    no_carriers: "No eligible colonist transports.",
    no_feasible: "No feasible colonist transfers.",
};

fn population_balances(sim: &Simulation, colonies: &OwnedColonies) -> BTreeMap<Id, Balance> {
    let require_floor = sim.cfg().auto_colonist_require_source_floor;
    colonies
        .ids
        .iter()
        .filter_map(|&cid| sim.state().colonies.get(&cid))
        .map(|colony| {
            let current = finite_non_neg(colony.population_millions);
            let target = finite_non_neg(colony.population_target_millions);
            let floor = target.max(finite_non_neg(colony.population_reserve_millions));
            let exports = floor > EPS || !require_floor;
            let balance = Balance {
                deficit: non_neg(target - current),
                surplus: if exports { non_neg(current - floor) } else { 0.0 },
                reason: REASON_POPULATION_TARGET,
            };
            (colony.id, balance)
        })
        .collect()
}

/// Plan colonist movements for a faction.
#[must_use]
pub fn compute_colonist_plan(
    sim: &Simulation,
    faction_id: Id,
    opts: &ColonistPlannerOptions,
) -> ColonistPlannerResult {
    if !sim.state().factions.contains_key(&faction_id) {
        return PlannerResult::invalid("Invalid faction.");
    }
    let cfg = sim.cfg();
    let params = TransferParams {
        min_transfer: non_neg(cfg.auto_colonist_min_transfer_millions),
        take_fraction: cfg.auto_colonist_max_take_fraction_of_surplus.clamp(0.0, 1.0),
    };
    let colonies = OwnedColonies::collect(sim, faction_id);
    let balances = population_balances(sim, &colonies);
    let eta = EtaOracle::new(sim, faction_id, opts.restrict_to_discovered);
    let gate = ShipGate {
        require_idle: opts.require_idle,
        exclude_fleet_ships: opts.exclude_fleet_ships,
    };

    let plan = run_transfer_plan(&eta, &colonies, &balances, &params, &WORDING, || {
        collect_candidates(sim, opts.max_ships, |ship| {
            if opts.require_auto_colonist_transport_flag && !ship.auto_colonist_transport {
                return None;
            }
            if !gate.admits(sim, ship, faction_id) {
                return None;
            }
            let capacity = non_neg(sim.find_design(&ship.design_id)?.colony_capacity_millions);
            (capacity >= params.min_transfer + EPS).then(|| Carrier {
                ship_id: ship.id,
                system_id: ship.system_id,
                pos_mkm: ship.position_mkm,
                speed_km_s: ship.speed_km_s,
                capacity,
                embarked: finite_non_neg(ship.colonists_millions),
            })
        })
    });

    tracing::debug!(
        faction_id,
        assignments = plan.assignments.len(),
        truncated = plan.truncated,
        "colonist plan computed"
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

fn to_assignment(t: Transfer, restrict_to_discovered: bool) -> ColonistAssignment {
    let (kind, note) = match t.source_colony_id {
        None => (ColonistAssignmentKind::DeliverColonists, "Deliver embarked colonists"),
        Some(_) => (ColonistAssignmentKind::PickupAndDeliver, "Pickup + deliver"),
    };
    ColonistAssignment {
        kind,
        ship_id: t.ship_id,
        source_colony_id: t.source_colony_id,
        dest_colony_id: t.dest_colony_id,
        restrict_to_discovered,
        millions: t.amount,
        eta_to_source_days: t.eta_to_source_days,
        eta_to_dest_days: t.eta_to_dest_days,
        eta_total_days: t.eta_total_days,
        reason: t.reason.to_string(),
        note: note.to_string(),
    }
}
