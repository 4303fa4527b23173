//! Deterministic planners.
//!
//! Every planner is a pure function of a [`Simulation`] snapshot and its
//! options, producing a [`PlannerResult`] whose assignments come out in a
//! fixed order. Applying the assignments is the job of
//! [`applier`](crate::applier).
//!
//! ## Planners
//!
//! - [`freight`] - mineral logistics between colonies
//! - [`troop`] - garrison transport
//! - [`colonist`] - population transport
//! - [`salvage`] - wreck recovery runs
//! - [`invasion`] - target analysis and staging colonies

pub mod colonist;
pub mod freight;
pub mod invasion;
pub mod salvage;
pub mod troop;

mod transfer;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::{sorted_ids, Id, INVALID_ID};
use crate::math::{Vec2, EPS};
use crate::orders;
use crate::simulation::Simulation;
use crate::state::Ship;

/// Outcome of a planner run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerResult<A> {
    /// Inputs were valid. `false` means no assignments were attempted.
    pub ok: bool,
    /// A safety cap cut the candidate set short.
    pub truncated: bool,
    /// Human-readable outcome.
    pub message: String,
    /// Planned assignments, in planning order.
    pub assignments: Vec<A>,
}

impl<A> PlannerResult<A> {
    /// A rejected run.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            truncated: false,
            message: message.into(),
            assignments: Vec::new(),
        }
    }

    /// A successful run with nothing to do.
    #[must_use]
    pub fn empty(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            ..Self::invalid(message)
        }
    }
}

impl<A> Default for PlannerResult<A> {
    fn default() -> Self {
        Self::invalid(String::new())
    }
}

/// A place ships can travel to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Site {
    pub system_id: Id,
    pub pos_mkm: Vec2,
}

impl Site {
    pub fn of_ship(ship: &Ship) -> Self {
        Self {
            system_id: ship.system_id,
            pos_mkm: ship.position_mkm,
        }
    }
}

/// Colonies owned by a faction, ascending, with their locations.
///
/// Colonies whose body or system is missing are listed in `ids` but have no
/// entry in `sites`, so they can never be a travel endpoint.
pub(crate) struct OwnedColonies {
    pub ids: Vec<Id>,
    pub sites: BTreeMap<Id, Site>,
}

impl OwnedColonies {
    pub fn collect(sim: &Simulation, faction_id: Id) -> Self {
        let state = sim.state();
        let ids: Vec<Id> = sorted_ids(&state.colonies)
            .into_iter()
            .filter(|cid| state.colonies.get(cid).is_some_and(|c| c.faction_id == faction_id))
            .collect();
        let sites = ids
            .iter()
            .filter_map(|&cid| {
                let (system_id, pos_mkm) = state.colony_location(cid)?;
                Some((cid, Site { system_id, pos_mkm }))
            })
            .collect();
        Self { ids, sites }
    }

    pub fn site(&self, colony_id: Id) -> Option<Site> {
        self.sites.get(&colony_id).copied()
    }

    /// Nearest located colony by ETA; ties go to the lower id.
    pub fn nearest(&self, eta: &EtaOracle<'_>, from: Site, speed_km_s: f64) -> Option<(Id, f64)> {
        let mut best: Option<(Id, f64)> = None;
        for (&cid, &site) in &self.sites {
            let t = eta.days(from, speed_km_s, site);
            if !t.is_finite() {
                continue;
            }
            // Ascending iteration: only a strictly shorter ETA can displace the incumbent.
            if best.map_or(true, |(_, b)| t + EPS < b) {
                best = Some((cid, t));
            }
        }
        best
    }
}

/// Travel-time estimates for one faction and discovery setting.
pub(crate) struct EtaOracle<'a> {
    sim: &'a Simulation,
    faction_id: Id,
    restrict_to_discovered: bool,
}

impl<'a> EtaOracle<'a> {
    pub fn new(sim: &'a Simulation, faction_id: Id, restrict_to_discovered: bool) -> Self {
        Self {
            sim,
            faction_id,
            restrict_to_discovered,
        }
    }

    /// Travel-only days, `+inf` when unreachable.
    pub fn days(&self, from: Site, speed_km_s: f64, to: Site) -> f64 {
        self.sim.estimate_eta_days(
            from.system_id,
            from.pos_mkm,
            self.faction_id,
            speed_km_s,
            to.system_id,
            to.pos_mkm,
            self.restrict_to_discovered,
        )
    }
}

/// Ship filters shared by the transport planners.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ShipGate {
    pub require_idle: bool,
    pub exclude_fleet_ships: bool,
}

impl ShipGate {
    /// Faction, fleet, idleness, placement and speed checks.
    pub fn admits(self, sim: &Simulation, ship: &Ship, faction_id: Id) -> bool {
        if ship.faction_id != faction_id {
            return false;
        }
        if self.exclude_fleet_ships && sim.fleet_for_ship(ship.id).is_some() {
            return false;
        }
        if self.require_idle && !orders::is_idle(sim.state().ship_orders.get(&ship.id)) {
            return false;
        }
        ship.system_id != INVALID_ID && ship.speed_km_s > 0.0
    }
}

/// Walk ships in ascending id order, keeping those `select` accepts.
///
/// Stops once `max_ships` (at least 1) are kept. The flag is set when the
/// walk stopped before the last ship.
pub(crate) fn collect_candidates<T>(
    sim: &Simulation,
    max_ships: usize,
    mut select: impl FnMut(&Ship) -> Option<T>,
) -> (Vec<T>, bool) {
    let state = sim.state();
    let ids = sorted_ids(&state.ships);
    let cap = max_ships.max(1);
    let mut out = Vec::new();
    for (i, sid) in ids.iter().enumerate() {
        let Some(ship) = state.ships.get(sid) else { continue };
        if let Some(c) = select(ship) {
            out.push(c);
            if out.len() >= cap {
                return (out, i + 1 < ids.len());
            }
        }
    }
    (out, false)
}
