//! Assignment applier.
//!
//! Turns planner assignments into ship orders through an [`OrderIssuer`].
//! Each `apply_*_assignment` returns `true` when every order of the
//! sequence was accepted. Salvage and freight sequences are rolled back by
//! clearing the ship's orders when a step is rejected.
//!
//! `apply_*_plan` refuses a plan with `ok == false`, then applies every
//! assignment and returns whether all of them succeeded.

use crate::commands::OrderIssuer;
use crate::error::GameError;
use crate::ids::{Id, INVALID_ID};
use crate::planning::colonist::{ColonistAssignment, ColonistAssignmentKind};
use crate::planning::freight::{
    FreightAssignment, FreightAssignmentKind, FreightStopAction, FreightStopActionKind,
};
use crate::planning::salvage::{SalvageAssignment, SalvageAssignmentKind};
use crate::planning::troop::{TroopAssignment, TroopAssignmentKind};
use crate::planning::PlannerResult;

/// What to do with a ship's orders when a sequence fails part way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OnFailure {
    Keep,
    ClearOrders,
}

/// Why a sequence stopped.
#[derive(Debug)]
enum Halt {
    /// The assignment was unusable; nothing was issued.
    Malformed(&'static str),
    /// An order was refused after the sequence started.
    Refused(GameError),
}

impl From<GameError> for Halt {
    fn from(err: GameError) -> Self {
        Self::Refused(err)
    }
}

type Sequence = std::result::Result<(), Halt>;

fn require_ship(ship_id: Id) -> Sequence {
    if ship_id == INVALID_ID {
        return Err(Halt::Malformed("assignment has no ship"));
    }
    Ok(())
}

fn require_id(id: Option<Id>, what: &'static str) -> std::result::Result<Id, Halt> {
    id.filter(|&id| id != INVALID_ID).ok_or(Halt::Malformed(what))
}

/// Convert a sequence outcome into the applier's `bool`, rolling back if asked.
fn settle<O: OrderIssuer>(
    issuer: &mut O,
    ship_id: Id,
    kind: &'static str,
    on_failure: OnFailure,
    outcome: Sequence,
) -> bool {
    match outcome {
        Ok(()) => {
            tracing::trace!(ship_id, kind, "assignment applied");
            true
        }
        Err(Halt::Malformed(reason)) => {
            tracing::warn!(ship_id, kind, reason, "assignment skipped");
            false
        }
        Err(Halt::Refused(err)) => {
            tracing::warn!(ship_id, kind, error = %err, "assignment rejected");
            if on_failure == OnFailure::ClearOrders {
                if let Err(clear_err) = issuer.clear_orders(ship_id) {
                    tracing::warn!(ship_id, error = %clear_err, "rollback failed");
                }
            }
            false
        }
    }
}

fn apply_all<A, O: OrderIssuer>(
    issuer: &mut O,
    plan: &PlannerResult<A>,
    mut apply: impl FnMut(&mut O, &A) -> bool,
) -> bool {
    if !plan.ok {
        return false;
    }
    plan.assignments
        .iter()
        .fold(true, |all, asg| apply(issuer, asg) && all)
}

fn moves_cargo(act: &FreightStopAction) -> bool {
    act.tons > 0.0 && !act.mineral.is_empty()
}

fn troop_orders<O: OrderIssuer>(issuer: &mut O, asg: &TroopAssignment, clear: bool) -> Sequence {
    require_ship(asg.ship_id)?;
    if asg.dest_colony_id == INVALID_ID {
        return Err(Halt::Malformed("troop assignment has no destination"));
    }
    if asg.strength <= 0.0 {
        return Err(Halt::Malformed("troop assignment moves no troops"));
    }
    let source = match asg.kind {
        TroopAssignmentKind::DeliverTroops => None,
        TroopAssignmentKind::PickupAndDeliver => {
            Some(require_id(asg.source_colony_id, "troop pickup has no source")?)
        }
    };
    if clear {
        issuer.clear_orders(asg.ship_id)?;
    }
    let restrict = asg.restrict_to_discovered;
    if let Some(src) = source {
        issuer.issue_load_troops(asg.ship_id, src, asg.strength, restrict)?;
    }
    issuer.issue_unload_troops(asg.ship_id, asg.dest_colony_id, asg.strength, restrict)?;
    Ok(())
}

/// Queue the orders for one troop assignment.
pub fn apply_troop_assignment<O: OrderIssuer>(
    issuer: &mut O,
    asg: &TroopAssignment,
    clear_existing_orders: bool,
) -> bool {
    let outcome = troop_orders(issuer, asg, clear_existing_orders);
    settle(issuer, asg.ship_id, "troop", OnFailure::Keep, outcome)
}

/// Apply every assignment of a troop plan.
pub fn apply_troop_plan<O: OrderIssuer>(
    issuer: &mut O,
    plan: &PlannerResult<TroopAssignment>,
    clear_existing_orders: bool,
) -> bool {
    apply_all(issuer, plan, |o, asg| apply_troop_assignment(o, asg, clear_existing_orders))
}

fn colonist_orders<O: OrderIssuer>(
    issuer: &mut O,
    asg: &ColonistAssignment,
    clear: bool,
) -> Sequence {
    require_ship(asg.ship_id)?;
    if asg.dest_colony_id == INVALID_ID {
        return Err(Halt::Malformed("colonist assignment has no destination"));
    }
    if asg.millions <= 0.0 {
        return Err(Halt::Malformed("colonist assignment moves nobody"));
    }
    let source = match asg.kind {
        ColonistAssignmentKind::DeliverColonists => None,
        ColonistAssignmentKind::PickupAndDeliver => {
            Some(require_id(asg.source_colony_id, "colonist pickup has no source")?)
        }
    };
    if clear {
        issuer.clear_orders(asg.ship_id)?;
    }
    let restrict = asg.restrict_to_discovered;
    if let Some(src) = source {
        issuer.issue_load_colonists(asg.ship_id, src, asg.millions, restrict)?;
    }
    issuer.issue_unload_colonists(asg.ship_id, asg.dest_colony_id, asg.millions, restrict)?;
    Ok(())
}

/// Queue the orders for one colonist assignment.
pub fn apply_colonist_assignment<O: OrderIssuer>(
    issuer: &mut O,
    asg: &ColonistAssignment,
    clear_existing_orders: bool,
) -> bool {
    let outcome = colonist_orders(issuer, asg, clear_existing_orders);
    settle(issuer, asg.ship_id, "colonist", OnFailure::Keep, outcome)
}

/// Apply every assignment of a colonist plan.
pub fn apply_colonist_plan<O: OrderIssuer>(
    issuer: &mut O,
    plan: &PlannerResult<ColonistAssignment>,
    clear_existing_orders: bool,
) -> bool {
    apply_all(issuer, plan, |o, asg| apply_colonist_assignment(o, asg, clear_existing_orders))
}

fn salvage_orders<O: OrderIssuer>(
    issuer: &mut O,
    asg: &SalvageAssignment,
    clear: bool,
) -> Sequence {
    require_ship(asg.ship_id)?;
    let dest = asg.dest_colony_id.filter(|&d| d != INVALID_ID);
    let wreck = match asg.kind {
        SalvageAssignmentKind::DeliverCargo => {
            require_id(dest, "cargo delivery has no destination")?;
            None
        }
        SalvageAssignmentKind::SalvageAndDeliver => {
            Some(require_id(asg.wreck_id, "salvage run has no wreck")?)
        }
    };
    if clear {
        issuer.clear_orders(asg.ship_id)?;
    }
    let restrict = asg.restrict_to_discovered;
    if let Some(wreck) = wreck {
        issuer.issue_salvage_wreck(asg.ship_id, wreck, &asg.mineral, asg.tons, restrict)?;
    }
    if let Some(dest) = dest {
        issuer.issue_unload_mineral(asg.ship_id, dest, "", 0.0, restrict)?;
    }
    Ok(())
}

/// Queue the orders for one salvage assignment.
pub fn apply_salvage_assignment<O: OrderIssuer>(
    issuer: &mut O,
    asg: &SalvageAssignment,
    clear_existing_orders: bool,
) -> bool {
    let outcome = salvage_orders(issuer, asg, clear_existing_orders);
    settle(issuer, asg.ship_id, "salvage", OnFailure::ClearOrders, outcome)
}

/// Apply every assignment of a salvage plan.
pub fn apply_salvage_plan<O: OrderIssuer>(
    issuer: &mut O,
    plan: &PlannerResult<SalvageAssignment>,
    clear_existing_orders: bool,
) -> bool {
    apply_all(issuer, plan, |o, asg| apply_salvage_assignment(o, asg, clear_existing_orders))
}

fn freight_orders<O: OrderIssuer>(
    issuer: &mut O,
    asg: &FreightAssignment,
    clear: bool,
) -> Sequence {
    require_ship(asg.ship_id)?;
    let restrict = asg.restrict_to_discovered;
    let ship = asg.ship_id;

    if asg.stops.is_empty() {
        if asg.dest_colony_id == INVALID_ID {
            return Err(Halt::Malformed("freight assignment has no destination"));
        }
        if asg.items.is_empty() {
            return Err(Halt::Malformed("freight assignment carries nothing"));
        }
        if clear {
            issuer.clear_orders(ship)?;
        }
        let source = asg.source_colony_id.filter(|&s| s != INVALID_ID);
        if let (FreightAssignmentKind::PickupAndDeliver, Some(src)) = (asg.kind, source) {
            for it in &asg.items {
                issuer.issue_load_mineral(ship, src, &it.mineral, it.tons, restrict)?;
            }
        }
        for it in &asg.items {
            let dest = asg.dest_colony_id;
            issuer.issue_unload_mineral(ship, dest, &it.mineral, it.tons, restrict)?;
        }
        return Ok(());
    }

    if asg.stops.iter().any(|s| s.colony_id == INVALID_ID) {
        return Err(Halt::Malformed("freight stop has no colony"));
    }
    if !asg.stops.iter().any(|s| s.actions.iter().any(moves_cargo)) {
        return Err(Halt::Malformed("freight stops move nothing"));
    }
    if clear {
        issuer.clear_orders(ship)?;
    }
    for stop in &asg.stops {
        for act in stop.actions.iter().filter(|a| moves_cargo(a)) {
            let (colony, mineral, tons) = (stop.colony_id, act.mineral.as_str(), act.tons);
            match act.kind {
                FreightStopActionKind::Load => {
                    issuer.issue_load_mineral(ship, colony, mineral, tons, restrict)?;
                }
                FreightStopActionKind::Unload => {
                    issuer.issue_unload_mineral(ship, colony, mineral, tons, restrict)?;
                }
            }
        }
    }
    Ok(())
}

/// Queue the orders for one freight assignment.
///
/// Explicit stops are issued in order when present; otherwise the items are
/// loaded at the source (for pickups) and unloaded at the destination.
pub fn apply_freight_assignment<O: OrderIssuer>(
    issuer: &mut O,
    asg: &FreightAssignment,
    clear_existing_orders: bool,
) -> bool {
    let outcome = freight_orders(issuer, asg, clear_existing_orders);
    settle(issuer, asg.ship_id, "freight", OnFailure::ClearOrders, outcome)
}

/// Apply every assignment of a freight plan.
pub fn apply_freight_plan<O: OrderIssuer>(
    issuer: &mut O,
    plan: &PlannerResult<FreightAssignment>,
    clear_existing_orders: bool,
) -> bool {
    apply_all(issuer, plan, |o, asg| apply_freight_assignment(o, asg, clear_existing_orders))
}
