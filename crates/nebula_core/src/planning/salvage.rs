//! Wreck salvage planner.
//!
//! Ships holding cargo are first sent home to unload. The rest each claim
//! the unreserved wreck with the best expected tons per day of round trip.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ids::{sorted_ids, Id, INVALID_ID};
use crate::math::{cmp_eps, non_neg, EPS};
use crate::simulation::Simulation;

use super::{collect_candidates, EtaOracle, OwnedColonies, PlannerResult, ShipGate, Site};

/// Assignment shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SalvageAssignmentKind {
    /// Unload everything aboard at a colony.
    DeliverCargo,
    /// Salvage a wreck, then unload at a colony if one is reachable.
    #[default]
    SalvageAndDeliver,
}

/// One planned salvage run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SalvageAssignment {
    /// Shape of the order sequence.
    pub kind: SalvageAssignmentKind,
    /// Salvage ship.
    pub ship_id: Id,
    /// Target wreck, for `SalvageAndDeliver`.
    pub wreck_id: Option<Id>,
    /// Drop-off colony, if any.
    pub dest_colony_id: Option<Id>,
    /// Route only through discovered systems when the orders are issued.
    pub restrict_to_discovered: bool,
    /// Whether hostile systems were filtered out while planning.
    pub avoid_hostile_systems: bool,
    /// Mineral to salvage. Empty means every mineral.
    pub mineral: String,
    /// Tons to salvage. Zero means as much as fits.
    pub tons: f64,
    /// Travel days to the wreck.
    pub eta_to_wreck_days: f64,
    /// Travel days to the drop-off.
    pub eta_to_dest_days: f64,
    /// Travel plus salvage days.
    pub eta_total_days: f64,
    /// Days spent salvaging at the wreck.
    pub est_salvage_days: f64,
    /// Tons expected to come aboard.
    pub expected_salvage_tons: f64,
    /// Wreck contents when planned.
    pub wreck_total_tons: f64,
    /// What the ship does.
    pub note: String,
}

/// Salvage planner options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SalvagePlannerOptions {
    /// Wrecks the caller has already claimed.
    pub reserved_wreck_ids: Vec<Id>,
    /// Skip wrecks named by salvage orders already held by the faction's ships.
    pub reserve_wrecks_targeted_by_existing_orders: bool,
    /// Only ships with `auto_salvage`.
    pub require_auto_salvage_flag: bool,
    /// Skip ships running mining, freight, exploration, colonization or tanker automation.
    pub exclude_conflicting_automation_flags: bool,
    /// Skip fleet members.
    pub exclude_fleet_ships: bool,
    /// Only ships with no pending work.
    pub require_idle: bool,
    /// Route only through discovered systems.
    pub restrict_to_discovered: bool,
    /// Skip wrecks in systems with detected hostile ships.
    pub avoid_hostile_systems: bool,
    /// Smallest worthwhile load. Zero or less uses `auto_freight_min_transfer_tons`.
    pub min_tons: f64,
    /// Cap on candidate ships.
    pub max_ships: usize,
    /// Cap on candidate wrecks.
    pub max_wrecks: usize,
}

impl Default for SalvagePlannerOptions {
    fn default() -> Self {
        Self {
            reserved_wreck_ids: Vec::new(),
            reserve_wrecks_targeted_by_existing_orders: true,
            require_auto_salvage_flag: true,
            exclude_conflicting_automation_flags: true,
            exclude_fleet_ships: true,
            require_idle: true,
            restrict_to_discovered: true,
            avoid_hostile_systems: true,
            min_tons: 0.0,
            max_ships: 256,
            max_wrecks: 256,
        }
    }
}

/// Salvage planner output.
pub type SalvagePlannerResult = PlannerResult<SalvageAssignment>;

#[derive(Debug, Clone, Copy)]
struct WreckCandidate {
    id: Id,
    site: Site,
    total_tons: f64,
}

#[derive(Debug, Clone, Copy)]
struct SalvageShip {
    id: Id,
    site: Site,
    speed_km_s: f64,
    cargo_cap: f64,
    cargo_used: f64,
    cargo_free: f64,
}

#[derive(Debug, Clone, Copy)]
struct Pick {
    wreck: WreckCandidate,
    dest: Option<Id>,
    score: f64,
    eta_wreck: f64,
    eta_dest: f64,
    salvage_days: f64,
    expected: f64,
}

impl Pick {
    fn total(&self) -> f64 {
        self.eta_wreck + self.salvage_days + self.eta_dest
    }

    /// Higher score, then shorter round trip, then lower wreck id.
    fn beats(&self, other: &Self) -> bool {
        cmp_eps(other.score, self.score)
            .then_with(|| cmp_eps(self.total(), other.total()))
            .then_with(|| self.wreck.id.cmp(&other.wreck.id))
            == Ordering::Less
    }
}

fn reserved_wrecks(
    sim: &Simulation,
    faction_id: Id,
    opts: &SalvagePlannerOptions,
) -> BTreeSet<Id> {
    let state = sim.state();
    let mut reserved: BTreeSet<Id> = opts
        .reserved_wreck_ids
        .iter()
        .copied()
        .filter(|&w| w != INVALID_ID)
        .collect();
    if opts.reserve_wrecks_targeted_by_existing_orders {
        for sid in sorted_ids(&state.ship_orders) {
            if !state.ships.get(&sid).is_some_and(|s| s.faction_id == faction_id) {
                continue;
            }
            if let Some(so) = state.ship_orders.get(&sid) {
                reserved.extend(so.salvage_targets().filter(|&w| w != INVALID_ID));
            }
        }
    }
    reserved
}

/// Plan salvage runs for a faction.
#[must_use]
pub fn compute_salvage_plan(
    sim: &Simulation,
    faction_id: Id,
    opts: &SalvagePlannerOptions,
) -> SalvagePlannerResult {
    let state = sim.state();
    let cfg = sim.cfg();
    if faction_id == INVALID_ID || !state.factions.contains_key(&faction_id) {
        return PlannerResult::invalid("Invalid faction.");
    }

    let min_tons = if opts.min_tons > 0.0 {
        opts.min_tons.max(1e-6)
    } else {
        cfg.auto_freight_min_transfer_tons.max(1e-6)
    };

    // Reservations are fixed before wreck truncation, so claimed wrecks never
    // crowd out open ones.
    let mut reserved = reserved_wrecks(sim, faction_id, opts);
    let mut out = SalvagePlannerResult::empty(String::new());

    let mut wrecks: Vec<WreckCandidate> = sorted_ids(&state.wrecks)
        .into_iter()
        .filter_map(|wid| {
            let w = state.wrecks.get(&wid)?;
            let placed = w.system_id != INVALID_ID && state.systems.contains_key(&w.system_id);
            if wid == INVALID_ID || !placed || reserved.contains(&wid) {
                return None;
            }
            if opts.restrict_to_discovered
                && !sim.is_system_discovered_by_faction(faction_id, w.system_id)
            {
                return None;
            }
            if opts.avoid_hostile_systems
                && !sim.detected_hostile_ships_in_system(faction_id, w.system_id).is_empty()
            {
                return None;
            }
            let total_tons = w.total_tons();
            (total_tons >= min_tons).then_some(WreckCandidate {
                id: wid,
                site: Site {
                    system_id: w.system_id,
                    pos_mkm: w.position_mkm,
                },
                total_tons,
            })
        })
        .collect();
    wrecks.sort_by(|a, b| cmp_eps(b.total_tons, a.total_tons).then(a.id.cmp(&b.id)));
    let max_wrecks = opts.max_wrecks.max(1);
    if wrecks.len() > max_wrecks {
        wrecks.truncate(max_wrecks);
        out.truncated = true;
    }

    let gate = ShipGate {
        require_idle: opts.require_idle,
        exclude_fleet_ships: opts.exclude_fleet_ships,
    };
    let (mut ships, ships_truncated) = collect_candidates(sim, opts.max_ships, |ship| {
        if ship.faction_id != faction_id {
            return None;
        }
        if opts.require_auto_salvage_flag && !ship.auto_salvage {
            return None;
        }
        if opts.exclude_conflicting_automation_flags
            && (ship.auto_mine
                || ship.auto_freight
                || ship.auto_explore
                || ship.auto_colonize
                || ship.auto_tanker)
        {
            return None;
        }
        if !gate.admits(sim, ship, faction_id) {
            return None;
        }
        let cargo_cap = non_neg(sim.find_design(&ship.design_id)?.cargo_tons);
        if cargo_cap < min_tons {
            return None;
        }
        let cargo_used = ship.cargo_used_tons();
        Some(SalvageShip {
            id: ship.id,
            site: Site::of_ship(ship),
            speed_km_s: ship.speed_km_s,
            cargo_cap,
            cargo_used,
            cargo_free: non_neg(cargo_cap - cargo_used),
        })
    });
    out.truncated |= ships_truncated;
    ships.sort_by(|a, b| {
        cmp_eps(b.cargo_free, a.cargo_free)
            .then_with(|| cmp_eps(b.speed_km_s, a.speed_km_s))
            .then(a.id.cmp(&b.id))
    });

    if ships.is_empty() {
        out.message = "No eligible ships.".to_string();
        return out;
    }

    let colonies = OwnedColonies::collect(sim, faction_id);
    let eta = EtaOracle::new(sim, faction_id, opts.restrict_to_discovered);
    let new_assignment = |ship_id: Id| SalvageAssignment {
        ship_id,
        restrict_to_discovered: opts.restrict_to_discovered,
        avoid_hostile_systems: opts.avoid_hostile_systems,
        ..SalvageAssignment::default()
    };

    let mut salvagers = Vec::with_capacity(ships.len());
    for ship in ships {
        if ship.cargo_used >= min_tons {
            if let Some((dest, t)) = colonies.nearest(&eta, ship.site, ship.speed_km_s) {
                tracing::trace!(ship_id = ship.id, dest, "deliver salvage cargo");
                out.assignments.push(SalvageAssignment {
                    kind: SalvageAssignmentKind::DeliverCargo,
                    dest_colony_id: Some(dest),
                    eta_to_dest_days: t,
                    eta_total_days: t,
                    note: "Deliver existing cargo".to_string(),
                    ..new_assignment(ship.id)
                });
                continue;
            }
        }
        salvagers.push(ship);
    }

    if !wrecks.is_empty() {
        let per_ton = non_neg(cfg.salvage_tons_per_day_per_cargo_ton);
        let min_rate = non_neg(cfg.salvage_tons_per_day_min);

        for ship in salvagers.iter().filter(|s| s.cargo_free >= min_tons) {
            let rate = min_rate.max(ship.cargo_cap * per_ton);
            if rate <= EPS {
                continue;
            }
            let mut best: Option<Pick> = None;
            for wreck in wrecks.iter().filter(|w| !reserved.contains(&w.id)) {
                let eta_wreck = eta.days(ship.site, ship.speed_km_s, wreck.site);
                if !eta_wreck.is_finite() {
                    continue;
                }
                let expected = wreck.total_tons.min(ship.cargo_free);
                if expected < min_tons {
                    continue;
                }
                let drop_off = colonies.nearest(&eta, wreck.site, ship.speed_km_s);
                let eta_dest = drop_off.map_or(0.0, |(_, t)| t);
                let salvage_days = expected / rate;
                let total = eta_wreck + salvage_days + eta_dest;
                let pick = Pick {
                    wreck: *wreck,
                    dest: drop_off.map(|(cid, _)| cid),
                    score: expected / (1.0 + non_neg(total)),
                    eta_wreck,
                    eta_dest,
                    salvage_days,
                    expected,
                };
                if best.as_ref().map_or(true, |b| pick.beats(b)) {
                    best = Some(pick);
                }
            }

            let Some(pick) = best else { continue };
            reserved.insert(pick.wreck.id);
            tracing::trace!(
                ship_id = ship.id,
                wreck_id = pick.wreck.id,
                score = pick.score,
                "claim wreck"
            );
            let note = if pick.dest.is_some() {
                "Salvage + deliver"
            } else {
                "Salvage (no drop-off colony)"
            };
            out.assignments.push(SalvageAssignment {
                kind: SalvageAssignmentKind::SalvageAndDeliver,
                wreck_id: Some(pick.wreck.id),
                dest_colony_id: pick.dest,
                eta_to_wreck_days: pick.eta_wreck,
                eta_to_dest_days: pick.eta_dest,
                eta_total_days: pick.total(),
                est_salvage_days: pick.salvage_days,
                expected_salvage_tons: pick.expected,
                wreck_total_tons: pick.wreck.total_tons,
                note: note.to_string(),
                ..new_assignment(ship.id)
            });
        }
    }

    out.message = if !out.assignments.is_empty() {
        "OK".to_string()
    } else if wrecks.is_empty() {
        "No salvageable wrecks (or all wrecks filtered).".to_string()
    } else {
        "No viable assignments (ships may be busy/full or wrecks unreachable).".to_string()
    };
    tracing::debug!(
        faction_id,
        wrecks = wrecks.len(),
        reserved = reserved.len(),
        assignments = out.assignments.len(),
        truncated = out.truncated,
        "salvage plan computed"
    );
    out
}
