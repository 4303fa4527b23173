//! Greedy surplus-to-deficit matching shared by the troop and colonist planners.
//!
//! Both planners move a scalar quantity (strength, millions) between owned
//! colonies. They differ only in how a colony's balance is computed and in
//! their wording, so the matching itself lives here.

use std::collections::BTreeMap;

use crate::ids::Id;
use crate::math::{non_neg, Vec2, EPS};

use super::{EtaOracle, OwnedColonies, Site};

/// Desired versus current amount at a colony.
#[derive(Debug, Clone, Default)]
pub(crate) struct Balance {
    pub deficit: f64,
    pub surplus: f64,
    pub reason: &'static str,
}

/// A ship able to carry the quantity.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Carrier {
    pub ship_id: Id,
    pub system_id: Id,
    pub pos_mkm: Vec2,
    pub speed_km_s: f64,
    pub capacity: f64,
    pub embarked: f64,
}

impl Carrier {
    fn site(&self) -> Site {
        Site {
            system_id: self.system_id,
            pos_mkm: self.pos_mkm,
        }
    }
}

/// A planned move.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Transfer {
    pub ship_id: Id,
    /// `None` delivers what the ship already carries.
    pub source_colony_id: Option<Id>,
    pub dest_colony_id: Id,
    pub amount: f64,
    pub eta_to_source_days: f64,
    pub eta_to_dest_days: f64,
    pub eta_total_days: f64,
    pub reason: &'static str,
}

/// Matching parameters.
pub(crate) struct TransferParams {
    pub min_transfer: f64,
    pub take_fraction: f64,
}

impl TransferParams {
    fn passes(&self, amount: f64) -> bool {
        amount >= self.min_transfer + EPS
    }
}

/// Colonies with a deficit or surplus above the gate, ascending.
pub(crate) fn deficit_colonies(
    balances: &BTreeMap<Id, Balance>,
    params: &TransferParams,
) -> Vec<Id> {
    balances
        .iter()
        .filter(|(_, b)| params.passes(b.deficit))
        .map(|(&cid, _)| cid)
        .collect()
}

fn surplus_colonies(balances: &BTreeMap<Id, Balance>, params: &TransferParams) -> Vec<Id> {
    balances
        .iter()
        .filter(|(_, b)| params.passes(b.surplus))
        .map(|(&cid, _)| cid)
        .collect()
}

/// Match carriers, in order, against the remaining deficits.
///
/// A carrier already holding at least the gate delivers to the nearest
/// deficit colony. Otherwise it picks the `(source, dest)` pair with the
/// least total travel time and moves
/// `min(deficit, capacity, surplus * take_fraction)`.
pub(crate) fn plan_transfers(
    eta: &EtaOracle<'_>,
    colonies: &OwnedColonies,
    balances: &BTreeMap<Id, Balance>,
    carriers: &[Carrier],
    params: &TransferParams,
) -> Vec<Transfer> {
    let deficits = deficit_colonies(balances, params);
    let surpluses = surplus_colonies(balances, params);
    let mut deficit_rem: BTreeMap<Id, f64> =
        deficits.iter().map(|&c| (c, balances[&c].deficit)).collect();
    let mut surplus_rem: BTreeMap<Id, f64> =
        surpluses.iter().map(|&c| (c, balances[&c].surplus)).collect();

    let mut out = Vec::new();
    for carrier in carriers {
        let from = carrier.site();
        let speed = carrier.speed_km_s;

        if params.passes(carrier.embarked) {
            let mut best: Option<(Id, f64)> = None;
            for &dest in &deficits {
                if !params.passes(deficit_rem[&dest]) {
                    continue;
                }
                let Some(dest_site) = colonies.site(dest) else { continue };
                let t = eta.days(from, speed, dest_site);
                if t.is_finite() && best.map_or(true, |(_, b)| t + EPS < b) {
                    best = Some((dest, t));
                }
            }
            if let Some((dest, t)) = best {
                let amount = carrier.embarked.min(deficit_rem[&dest]);
                if params.passes(amount) {
                    tracing::trace!(ship_id = carrier.ship_id, dest, amount, "deliver embarked");
                    out.push(Transfer {
                        ship_id: carrier.ship_id,
                        source_colony_id: None,
                        dest_colony_id: dest,
                        amount,
                        eta_to_source_days: 0.0,
                        eta_to_dest_days: t,
                        eta_total_days: t,
                        reason: balances[&dest].reason,
                    });
                    deficit_rem.insert(dest, non_neg(deficit_rem[&dest] - amount));
                }
            }
            continue;
        }

        if !params.passes(carrier.capacity) || params.take_fraction <= EPS || surpluses.is_empty() {
            continue;
        }

        // (total, eta to source, eta to dest, dest, source)
        let mut best: Option<(f64, f64, f64, Id, Id)> = None;
        for &dest in &deficits {
            if !params.passes(deficit_rem[&dest]) {
                continue;
            }
            let Some(dest_site) = colonies.site(dest) else { continue };
            for &src in &surpluses {
                if src == dest || !params.passes(surplus_rem[&src]) {
                    continue;
                }
                let Some(src_site) = colonies.site(src) else { continue };
                let to_src = eta.days(from, speed, src_site);
                if !to_src.is_finite() {
                    continue;
                }
                let to_dest = eta.days(src_site, speed, dest_site);
                if !to_dest.is_finite() {
                    continue;
                }
                let total = to_src + to_dest;
                // Pairs arrive in (dest, src) ascending order, so ties keep the incumbent.
                if best.map_or(true, |(b, ..)| total + EPS < b) {
                    best = Some((total, to_src, to_dest, dest, src));
                }
            }
        }

        let Some((total, to_src, to_dest, dest, src)) = best else { continue };
        let available = non_neg(surplus_rem[&src] * params.take_fraction);
        let amount = deficit_rem[&dest].min(carrier.capacity).min(available);
        if !params.passes(amount) {
            continue;
        }
        tracing::trace!(ship_id = carrier.ship_id, src, dest, amount, "pickup and deliver");
        out.push(Transfer {
            ship_id: carrier.ship_id,
            source_colony_id: Some(src),
            dest_colony_id: dest,
            amount,
            eta_to_source_days: to_src,
            eta_to_dest_days: to_dest,
            eta_total_days: non_neg(total),
            reason: balances[&dest].reason,
        });
        deficit_rem.insert(dest, non_neg(deficit_rem[&dest] - amount));
        surplus_rem.insert(src, non_neg(surplus_rem[&src] - amount));
    }
    out
}

/// Planner-specific wording.
pub(crate) struct TransferWording {
    pub no_need: &'static str,
    pub no_carriers: &'static str,
    pub no_feasible: &'static str,
}

/// Message used when the carrier walk hit `max_ships`.
pub(crate) const TRUNCATED_MESSAGE: &str = "Candidate ships truncated by max_ships.";

/// Shared planner flow: deficits first, then carriers, then matching.
///
/// `carriers` is only consulted when some colony has a deficit.
pub(crate) fn run_transfer_plan(
    eta: &EtaOracle<'_>,
    colonies: &OwnedColonies,
    balances: &BTreeMap<Id, Balance>,
    params: &TransferParams,
    wording: &TransferWording,
    carriers: impl FnOnce() -> (Vec<Carrier>, bool),
) -> super::PlannerResult<Transfer> {
    if deficit_colonies(balances, params).is_empty() {
        return super::PlannerResult::empty(wording.no_need);
    }

    let (carriers, truncated) = carriers();
    let mut out = super::PlannerResult::empty(String::new());
    if truncated {
        out.truncated = true;
        out.message = TRUNCATED_MESSAGE.to_string();
    }
    if carriers.is_empty() {
        if out.message.is_empty() {
            out.message = wording.no_carriers.to_string();
        }
        return out;
    }

    out.assignments = plan_transfers(eta, colonies, balances, &carriers, params);
    if out.message.is_empty() {
        out.message = if out.assignments.is_empty() {
            wording.no_feasible.to_string()
        } else {
            "OK.".to_string()
        };
    }
    out
}
