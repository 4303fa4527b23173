//! Mineral freight planner.
//!
//! Destinations are colonies with logistics shortfalls; sources are colonies
//! holding stock above their reserves. Reserves are the colony's own
//! `mineral_reserves` raised to whatever level its needs want on hand, so a
//! colony never exports what it is itself waiting for.
//!
//! Selection is globally greedy: every ship proposes its best candidate, the
//! best proposal across all ships is committed, and ships whose proposal went
//! stale are re-evaluated lazily through a per-ship stamp. On-board cargo is
//! placed first (phase 1), then pickups (phase 2).

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use serde::{Deserialize, Serialize};

use crate::content::MineralMap;
use crate::ids::{Id, INVALID_ID};
use crate::logistics::LogisticsNeedKind;
use crate::math::{cmp_eps, non_neg, EPS};
use crate::simulation::Simulation;

use super::transfer::TRUNCATED_MESSAGE;
use super::{collect_candidates, EtaOracle, OwnedColonies, PlannerResult, ShipGate, Site};

const DELIVERY_POP_LIMIT: usize = 500_000;
const PICKUP_POP_LIMIT: usize = 1_000_000;

/// Mineral moved to a destination.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FreightPlanItem {
    /// Mineral name.
    pub mineral: String,
    /// Tons unloaded.
    pub tons: f64,
    /// First need that asked for this mineral, e.g. `"Construction:mine"`.
    pub reason: String,
}

/// What happens at a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FreightStopActionKind {
    /// Take minerals from the colony.
    #[default]
    Load,
    /// Give minerals to the colony.
    Unload,
}

/// One load or unload at a stop.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FreightStopAction {
    /// Direction.
    pub kind: FreightStopActionKind,
    /// Mineral name.
    pub mineral: String,
    /// Tons moved.
    pub tons: f64,
    /// Destination-side reason; empty for loads.
    pub reason: String,
}

/// A colony visited by a freight run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FreightStop {
    /// Colony visited.
    pub colony_id: Id,
    /// Actions in execution order.
    pub actions: Vec<FreightStopAction>,
}

/// Assignment shape.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum FreightAssignmentKind {
    /// Unload cargo already aboard.
    DeliverCargo,
    /// Load at a source colony, then unload.
    #[default]
    PickupAndDeliver,
}

/// One planned freight run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FreightAssignment {
    /// Shape of the run.
    pub kind: FreightAssignmentKind,
    /// Freighter.
    pub ship_id: Id,
    /// Pickup colony, for `PickupAndDeliver`.
    pub source_colony_id: Option<Id>,
    /// Drop-off colony.
    pub dest_colony_id: Id,
    /// Route only through discovered systems when the orders are issued.
    pub restrict_to_discovered: bool,
    /// Minerals unloaded at the destination.
    pub items: Vec<FreightPlanItem>,
    /// Explicit stops, source first.
    pub stops: Vec<FreightStop>,
    /// Travel days to the pickup.
    pub eta_to_source_days: f64,
    /// Travel days from pickup (or current position) to the drop-off.
    pub eta_to_dest_days: f64,
    /// Sum of the legs.
    pub eta_total_days: f64,
    /// What the ship does.
    pub note: String,
}

/// Freight planner options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreightPlannerOptions {
    /// Only ships with `auto_freight`.
    pub require_auto_freight_flag: bool,
    /// Only ships with no pending work.
    pub require_idle: bool,
    /// Route only through discovered systems.
    pub restrict_to_discovered: bool,
    /// Carry several minerals per run. `None` uses `auto_freight_multi_mineral`.
    pub bundle_multi_mineral: Option<bool>,
    /// Cap on candidate ships.
    pub max_ships: usize,
}

impl Default for FreightPlannerOptions {
    fn default() -> Self {
        Self {
            require_auto_freight_flag: true,
            require_idle: true,
            restrict_to_discovered: true,
            bundle_multi_mineral: None,
            max_ships: 256,
        }
    }
}

/// Freight planner output.
pub type FreightPlannerResult = PlannerResult<FreightAssignment>;

fn need_reason(kind: LogisticsNeedKind, context_id: &str) -> String {
    let tag = match kind {
        LogisticsNeedKind::Shipyard => return "Shipyard".to_string(),
        LogisticsNeedKind::Fuel => return "Fuel".to_string(),
        LogisticsNeedKind::Rearm => return "Rearm".to_string(),
        LogisticsNeedKind::Maintenance => return "Maintenance".to_string(),
        LogisticsNeedKind::Construction => "Construction",
        LogisticsNeedKind::TroopTraining => "TroopTraining",
        LogisticsNeedKind::IndustryInput => "IndustryInput",
        LogisticsNeedKind::StockpileTarget => "StockpileTarget",
    };
    if context_id.is_empty() {
        tag.to_string()
    } else {
        format!("{tag}:{context_id}")
    }
}

fn item(mineral: &str, tons: f64, reason: String) -> FreightPlanItem {
    FreightPlanItem {
        mineral: mineral.to_string(),
        tons,
        reason,
    }
}

#[derive(Debug, Clone)]
struct Freighter {
    id: Id,
    site: Site,
    speed_km_s: f64,
    used: f64,
    free: f64,
    /// Positive holdings only.
    cargo: MineralMap,
    stamp: u64,
}

impl Freighter {
    fn holding(&self, mineral: &str) -> f64 {
        self.cargo.get(mineral).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    kind: FreightAssignmentKind,
    /// Index into the freighter list.
    ship: usize,
    ship_id: Id,
    source: Option<Id>,
    dest: Id,
    load_items: Vec<FreightPlanItem>,
    unload_items: Vec<FreightPlanItem>,
    deliver_from_cargo: f64,
    eta1: f64,
    eta2: f64,
    eta_total: f64,
    total_tons: f64,
    /// Days per ton delivered.
    eff: f64,
    stamp: u64,
}

/// `Less` means `a` is the better candidate.
fn rank(a: &Candidate, b: &Candidate) -> Ordering {
    cmp_eps(a.eff, b.eff)
        .then_with(|| cmp_eps(a.eta_total, b.eta_total))
        .then_with(|| cmp_eps(b.total_tons, a.total_tons))
        .then(a.ship_id.cmp(&b.ship_id))
        .then(a.dest.cmp(&b.dest))
        .then(a.source.cmp(&b.source))
        .then(a.kind.cmp(&b.kind))
        .then(a.stamp.cmp(&b.stamp))
}

fn keep_best(best: &mut Option<Candidate>, candidate: Candidate) {
    if best.as_ref().map_or(true, |b| rank(&candidate, b) == Ordering::Less) {
        *best = Some(candidate);
    }
}

/// Max-heap entry; the best candidate is the greatest.
struct Queued(Candidate);

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        rank(&other.0, &self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Delivery,
    Pickup,
}

/// Running shortfall and export bookkeeping for one planner call.
struct FreightBook<'a> {
    eta: EtaOracle<'a>,
    restrict_to_discovered: bool,
    colonies: OwnedColonies,
    min_tons: f64,
    take_fraction: f64,
    bundle: bool,
    missing: BTreeMap<Id, MineralMap>,
    reasons: BTreeMap<Id, BTreeMap<String, Vec<String>>>,
    /// Destinations and their minerals, largest shortfall first.
    need_minerals: BTreeMap<Id, Vec<String>>,
    exportable: BTreeMap<Id, MineralMap>,
}

impl<'a> FreightBook<'a> {
    fn build(
        sim: &'a Simulation,
        faction_id: Id,
        opts: &FreightPlannerOptions,
        min_tons: f64,
    ) -> Self {
        let state = sim.state();
        let cfg = sim.cfg();
        let colonies = OwnedColonies::collect(sim, faction_id);

        let mut reserves: BTreeMap<Id, MineralMap> = colonies
            .ids
            .iter()
            .filter_map(|cid| state.colonies.get(cid).map(|c| (*cid, c.mineral_reserves.clone())))
            .collect();
        let mut missing: BTreeMap<Id, MineralMap> = BTreeMap::new();
        let mut reasons: BTreeMap<Id, BTreeMap<String, Vec<String>>> = BTreeMap::new();

        for need in sim.logistics_needs_for_faction(faction_id) {
            if need.colony_id == INVALID_ID {
                continue;
            }
            let reserve = reserves
                .entry(need.colony_id)
                .or_default()
                .entry(need.mineral.clone())
                .or_insert(0.0);
            *reserve = reserve.max(non_neg(need.desired_tons));

            let miss = non_neg(need.missing_tons);
            if miss > EPS {
                let m = missing
                    .entry(need.colony_id)
                    .or_default()
                    .entry(need.mineral.clone())
                    .or_insert(0.0);
                *m = m.max(miss);

                let reason = need_reason(need.kind, &need.context_id);
                let list = reasons
                    .entry(need.colony_id)
                    .or_default()
                    .entry(need.mineral)
                    .or_default();
                if !list.contains(&reason) {
                    list.push(reason);
                }
            }
        }

        let mut need_minerals = BTreeMap::new();
        for (&cid, by_mineral) in &missing {
            let total: f64 = by_mineral.values().copied().map(non_neg).sum();
            if total < min_tons {
                continue;
            }
            let mut ranked: Vec<(&String, f64)> = by_mineral
                .iter()
                .filter(|(_, &m)| m >= min_tons)
                .map(|(k, &m)| (k, m))
                .collect();
            ranked.sort_by(|a, b| cmp_eps(b.1, a.1).then_with(|| a.0.cmp(b.0)));
            need_minerals.insert(cid, ranked.into_iter().map(|(k, _)| k.clone()).collect());
        }

        let mut exportable = BTreeMap::new();
        for &cid in &colonies.ids {
            let Some(colony) = state.colonies.get(&cid) else { continue };
            let reserve_of = |mineral: &str| {
                reserves
                    .get(&cid)
                    .and_then(|r| r.get(mineral))
                    .copied()
                    .map_or(0.0, non_neg)
            };
            let exports: MineralMap = colony
                .minerals
                .iter()
                .filter_map(|(mineral, &have)| {
                    let spare = non_neg(non_neg(have) - reserve_of(mineral));
                    (spare >= min_tons).then(|| (mineral.clone(), spare))
                })
                .collect();
            if !exports.is_empty() {
                exportable.insert(cid, exports);
            }
        }

        Self {
            eta: EtaOracle::new(sim, faction_id, opts.restrict_to_discovered),
            restrict_to_discovered: opts.restrict_to_discovered,
            colonies,
            min_tons,
            take_fraction: cfg.auto_freight_max_take_fraction_of_surplus.clamp(0.0, 1.0),
            bundle: opts.bundle_multi_mineral.unwrap_or(cfg.auto_freight_multi_mineral),
            missing,
            reasons,
            need_minerals,
            exportable,
        }
    }

    fn missing_for(&self, colony_id: Id, mineral: &str) -> f64 {
        self.missing
            .get(&colony_id)
            .and_then(|m| m.get(mineral))
            .copied()
            .map_or(0.0, non_neg)
    }

    fn first_reason(&self, colony_id: Id, mineral: &str) -> String {
        self.reasons
            .get(&colony_id)
            .and_then(|m| m.get(mineral))
            .and_then(|list| list.first())
            .cloned()
            .unwrap_or_default()
    }

    fn delivery_candidate(&self, ship: &Freighter, idx: usize, dest: Id) -> Option<Candidate> {
        let min = self.min_tons;
        if ship.used < min {
            return None;
        }
        let need = self.missing.get(&dest)?;
        let dest_site = self.colonies.site(dest)?;

        let mut unload_items = Vec::new();
        let mut total = 0.0;
        for (mineral, &have) in &ship.cargo {
            if have < min {
                continue;
            }
            let Some(&miss) = need.get(mineral) else { continue };
            let amount = have.min(non_neg(miss));
            if amount < min {
                continue;
            }
            unload_items.push(item(mineral, amount, self.first_reason(dest, mineral)));
            total += amount;
            if !self.bundle {
                break;
            }
        }
        if total < min {
            return None;
        }

        let eta = self.eta.days(ship.site, ship.speed_km_s, dest_site);
        if !eta.is_finite() {
            return None;
        }
        Some(Candidate {
            kind: FreightAssignmentKind::DeliverCargo,
            ship: idx,
            ship_id: ship.id,
            source: None,
            dest,
            load_items: Vec::new(),
            unload_items,
            deliver_from_cargo: total,
            eta1: 0.0,
            eta2: eta,
            eta_total: eta,
            total_tons: total,
            eff: eta / total.max(EPS),
            stamp: 0,
        })
    }

    fn pickup_candidate(
        &self,
        ship: &Freighter,
        idx: usize,
        src: Id,
        dest: Id,
    ) -> Option<Candidate> {
        let min = self.min_tons;
        if ship.free < min || src == dest {
            return None;
        }
        let need_list = self.need_minerals.get(&dest)?;
        let exports = self.exportable.get(&src)?;
        let src_site = self.colonies.site(src)?;
        let dest_site = self.colonies.site(dest)?;

        let picked: Vec<&String> = if self.bundle {
            need_list.iter().collect()
        } else {
            // Single-mineral runs prefer something already aboard, then
            // whatever the source can supply.
            let on_board = need_list
                .iter()
                .find(|m| ship.holding(m) >= min && self.missing_for(dest, m) >= min);
            let focus = on_board.or_else(|| {
                need_list.iter().find(|m| {
                    self.missing_for(dest, m) >= min
                        && exports.get(m.as_str()).is_some_and(|&e| non_neg(e) >= min)
                })
            })?;
            vec![focus]
        };

        let mut remaining = ship.free;
        let mut loaded = 0.0;
        let mut from_cargo_total = 0.0;
        let mut load_items = Vec::new();
        let mut unload_items = Vec::new();

        for mineral in picked {
            if remaining < min {
                break;
            }
            let miss = self.missing_for(dest, mineral);
            if miss < min {
                continue;
            }
            let have = ship.holding(mineral);
            let mut from_cargo = if have >= min { have.min(miss) } else { 0.0 };
            if from_cargo < min {
                from_cargo = 0.0;
            }
            let after_cargo = non_neg(miss - from_cargo);

            let mut load = 0.0;
            if after_cargo >= min {
                if let Some(&avail) = exports.get(mineral.as_str()) {
                    let avail = non_neg(avail);
                    if avail >= min {
                        load = remaining.min(after_cargo).min(avail * self.take_fraction);
                        if load < min {
                            load = 0.0;
                        }
                    }
                }
            }
            if from_cargo <= 0.0 && load <= 0.0 {
                continue;
            }

            if load > 0.0 {
                load_items.push(item(mineral, load, String::new()));
                loaded += load;
                remaining -= load;
            }
            let unload = from_cargo + load;
            if unload >= min {
                unload_items.push(item(mineral, unload, self.first_reason(dest, mineral)));
                from_cargo_total += from_cargo;
            }
        }

        // A pickup has to pick something up.
        if loaded < min {
            return None;
        }
        let total_unload: f64 = unload_items.iter().map(|i| non_neg(i.tons)).sum();
        if total_unload < min {
            return None;
        }

        let eta1 = self.eta.days(ship.site, ship.speed_km_s, src_site);
        if !eta1.is_finite() {
            return None;
        }
        let eta2 = self.eta.days(src_site, ship.speed_km_s, dest_site);
        if !eta2.is_finite() {
            return None;
        }
        let eta_total = eta1 + eta2;
        Some(Candidate {
            kind: FreightAssignmentKind::PickupAndDeliver,
            ship: idx,
            ship_id: ship.id,
            source: Some(src),
            dest,
            load_items,
            unload_items,
            deliver_from_cargo: from_cargo_total,
            eta1,
            eta2,
            eta_total,
            total_tons: total_unload,
            eff: eta_total / total_unload.max(EPS),
            stamp: 0,
        })
    }

    /// Best run that unloads on-board cargo, possibly topping up on the way.
    fn best_delivery(&self, ship: &Freighter, idx: usize) -> Option<Candidate> {
        if ship.used < self.min_tons {
            return None;
        }
        let mut best = None;
        for &dest in self.need_minerals.keys() {
            let Some(direct) = self.delivery_candidate(ship, idx, dest) else { continue };
            keep_best(&mut best, direct);
            for &src in &self.colonies.ids {
                if !self.exportable.contains_key(&src) {
                    continue;
                }
                let Some(top_up) = self.pickup_candidate(ship, idx, src, dest) else { continue };
                if top_up.deliver_from_cargo >= self.min_tons {
                    keep_best(&mut best, top_up);
                }
            }
        }
        best
    }

    fn best_pickup(&self, ship: &Freighter, idx: usize) -> Option<Candidate> {
        if ship.free < self.min_tons || self.exportable.is_empty() {
            return None;
        }
        let mut best = None;
        for &dest in self.need_minerals.keys() {
            for &src in &self.colonies.ids {
                if !self.exportable.contains_key(&src) {
                    continue;
                }
                if let Some(c) = self.pickup_candidate(ship, idx, src, dest) {
                    keep_best(&mut best, c);
                }
            }
        }
        best
    }

    fn best_for(&self, phase: Phase, ship: &Freighter, idx: usize) -> Option<Candidate> {
        match phase {
            Phase::Delivery => self.best_delivery(ship, idx),
            Phase::Pickup => self.best_pickup(ship, idx),
        }
    }

    fn consume_missing(&mut self, colony_id: Id, mineral: &str, tons: f64) {
        if let Some(m) = self.missing.get_mut(&colony_id).and_then(|m| m.get_mut(mineral)) {
            *m = non_neg(*m - non_neg(tons));
        }
    }

    fn consume_exportable(&mut self, colony_id: Id, mineral: &str, tons: f64) {
        let Some(exports) = self.exportable.get_mut(&colony_id) else { return };
        if let Some(e) = exports.get_mut(mineral) {
            *e = non_neg(*e - non_neg(tons));
            if *e < self.min_tons {
                exports.remove(mineral);
            }
        }
        if exports.is_empty() {
            self.exportable.remove(&colony_id);
        }
    }

    fn commit(&mut self, phase: Phase, cand: Candidate) -> FreightAssignment {
        let min = self.min_tons;
        let mut stops = Vec::new();
        if let Some(src) = cand.source {
            let actions: Vec<FreightStopAction> = cand
                .load_items
                .iter()
                .filter(|i| i.tons >= min)
                .map(|i| FreightStopAction {
                    kind: FreightStopActionKind::Load,
                    mineral: i.mineral.clone(),
                    tons: i.tons,
                    reason: String::new(),
                })
                .collect();
            if !actions.is_empty() {
                stops.push(FreightStop {
                    colony_id: src,
                    actions,
                });
            }
        }
        let actions: Vec<FreightStopAction> = cand
            .unload_items
            .iter()
            .filter(|i| i.tons >= min)
            .map(|i| FreightStopAction {
                kind: FreightStopActionKind::Unload,
                mineral: i.mineral.clone(),
                tons: i.tons,
                reason: i.reason.clone(),
            })
            .collect();
        if !actions.is_empty() {
            stops.push(FreightStop {
                colony_id: cand.dest,
                actions,
            });
        }

        let note = match (phase, cand.kind) {
            (Phase::Delivery, FreightAssignmentKind::DeliverCargo) => "Deliver existing cargo",
            (Phase::Delivery, FreightAssignmentKind::PickupAndDeliver) => "Top up + deliver",
            (Phase::Pickup, _) if cand.deliver_from_cargo >= min => {
                "Pickup + deliver (mixed cargo)"
            }
            (Phase::Pickup, _) => "Pickup + deliver",
        };

        for i in &cand.unload_items {
            self.consume_missing(cand.dest, &i.mineral, i.tons);
        }
        if let Some(src) = cand.source {
            for i in &cand.load_items {
                self.consume_exportable(src, &i.mineral, i.tons);
            }
        }
        tracing::trace!(
            ship_id = cand.ship_id,
            dest = cand.dest,
            source = ?cand.source,
            tons = cand.total_tons,
            "freight run committed"
        );

        FreightAssignment {
            kind: cand.kind,
            ship_id: cand.ship_id,
            source_colony_id: cand.source,
            dest_colony_id: cand.dest,
            restrict_to_discovered: self.restrict_to_discovered,
            items: cand.unload_items,
            stops,
            eta_to_source_days: cand.eta1,
            eta_to_dest_days: cand.eta2,
            eta_total_days: cand.eta_total,
            note: note.to_string(),
        }
    }

    /// Commit the best proposal across ships until none remain.
    fn run_phase(
        &mut self,
        phase: Phase,
        ships: &mut [Freighter],
        assigned: &mut BTreeSet<Id>,
        out: &mut Vec<FreightAssignment>,
    ) {
        let min = self.min_tons;
        let mut heap = BinaryHeap::new();
        for idx in 0..ships.len() {
            let ship = &ships[idx];
            let eligible = match phase {
                Phase::Delivery => ship.used >= min,
                Phase::Pickup => ship.free >= min,
            };
            if !eligible || assigned.contains(&ship.id) {
                continue;
            }
            if let Some(c) = self.best_for(phase, ship, idx) {
                enqueue(&mut ships[idx], c, &mut heap);
            }
        }

        let limit = match phase {
            Phase::Delivery => DELIVERY_POP_LIMIT,
            Phase::Pickup => PICKUP_POP_LIMIT,
        };
        let mut pops = 0;
        while pops < limit {
            let Some(Queued(cand)) = heap.pop() else { break };
            pops += 1;
            let idx = cand.ship;
            let ship = &ships[idx];
            if assigned.contains(&ship.id) || cand.stamp != ship.stamp {
                continue;
            }
            // Earlier commits may have eaten into this ship's proposal.
            let Some(fresh) = self.best_for(phase, ship, idx) else { continue };
            if heap.peek().is_some_and(|top| rank(&fresh, &top.0) == Ordering::Greater) {
                enqueue(&mut ships[idx], fresh, &mut heap);
                continue;
            }
            assigned.insert(fresh.ship_id);
            out.push(self.commit(phase, fresh));
        }
    }
}

fn enqueue(ship: &mut Freighter, mut cand: Candidate, heap: &mut BinaryHeap<Queued>) {
    ship.stamp += 1;
    cand.stamp = ship.stamp;
    heap.push(Queued(cand));
}

/// Plan mineral freight runs for a faction.
#[must_use]
pub fn compute_freight_plan(
    sim: &Simulation,
    faction_id: Id,
    opts: &FreightPlannerOptions,
) -> FreightPlannerResult {
    if faction_id == INVALID_ID || !sim.state().factions.contains_key(&faction_id) {
        return PlannerResult::invalid("Invalid faction.");
    }
    let min_tons = sim.cfg().auto_freight_min_transfer_tons.max(1e-6);

    // Fleet members always stay with their fleet.
    let gate = ShipGate {
        require_idle: opts.require_idle,
        exclude_fleet_ships: true,
    };
    let (mut ships, truncated) = collect_candidates(sim, opts.max_ships, |ship| {
        if opts.require_auto_freight_flag && !ship.auto_freight {
            return None;
        }
        if !gate.admits(sim, ship, faction_id) {
            return None;
        }
        let cap = non_neg(sim.find_design(&ship.design_id)?.cargo_tons);
        if cap < min_tons {
            return None;
        }
        let cargo: MineralMap = ship
            .cargo
            .iter()
            .filter(|(_, &t)| t > EPS)
            .map(|(m, &t)| (m.clone(), t))
            .collect();
        let used: f64 = cargo.values().sum();
        Some(Freighter {
            id: ship.id,
            site: Site::of_ship(ship),
            speed_km_s: ship.speed_km_s,
            used,
            free: non_neg(cap - used),
            cargo,
            stamp: 0,
        })
    });

    let mut out = FreightPlannerResult::empty(String::new());
    if truncated {
        out.truncated = true;
        out.message = TRUNCATED_MESSAGE.to_string();
    }
    if ships.is_empty() {
        if out.message.is_empty() {
            out.message = "No eligible ships.".to_string();
        }
        return out;
    }

    let mut book = FreightBook::build(sim, faction_id, opts, min_tons);
    let mut assigned = BTreeSet::new();
    book.run_phase(Phase::Delivery, &mut ships, &mut assigned, &mut out.assignments);
    book.run_phase(Phase::Pickup, &mut ships, &mut assigned, &mut out.assignments);

    let n = out.assignments.len();
    if out.message.is_empty() {
        out.message = if n == 0 { "No matching freight tasks." } else { "OK" }.to_string();
    } else {
        out.message = format!("{} ({n} assignments)", out.message);
    }

    tracing::debug!(
        faction_id,
        ships = ships.len(),
        destinations = book.need_minerals.len(),
        assignments = n,
        truncated = out.truncated,
        "freight plan computed"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::content::{ContentDb, ShipDesign};
    use crate::math::Vec2;
    use crate::state::{Body, Colony, Faction, GameState, Ship, StarSystem};

    const DURANIUM: &str = "Duranium";

    /// Colony 1 at x=0 and colony 2 at x=100, both in system 1.
    fn base() -> Simulation {
        let mut st = GameState::default();
        st.factions.insert(
            1,
            Faction {
                id: 1,
                discovered_systems: BTreeSet::from([1]),
                ..Faction::default()
            },
        );
        st.systems.insert(
            1,
            StarSystem {
                id: 1,
                ..StarSystem::default()
            },
        );
        for (cid, x) in [(1u64, 0.0), (2, 100.0)] {
            st.bodies.insert(
                cid,
                Body {
                    id: cid,
                    system_id: 1,
                    position_mkm: Vec2::new(x, 0.0),
                    ..Body::default()
                },
            );
            st.colonies.insert(
                cid,
                Colony {
                    id: cid,
                    faction_id: 1,
                    body_id: cid,
                    ..Colony::default()
                },
            );
        }
        let mut content = ContentDb::default();
        content.add_design(ShipDesign {
            id: "hauler".into(),
            cargo_tons: 100.0,
            ..ShipDesign::default()
        });
        Simulation::new(st, SimConfig::default(), content)
    }

    fn hauler(id: Id, x: f64) -> Ship {
        Ship {
            id,
            faction_id: 1,
            system_id: 1,
            position_mkm: Vec2::new(x, 0.0),
            speed_km_s: 1000.0,
            design_id: "hauler".into(),
            fuel_tons: -1.0,
            missile_ammo: -1.0,
            auto_freight: true,
            ..Ship::default()
        }
    }

    fn set_stock(sim: &mut Simulation, cid: Id, tons: f64) {
        let colony = sim.state_mut().colonies.get_mut(&cid).unwrap();
        colony.minerals.insert(DURANIUM.into(), tons);
    }

    fn set_target(sim: &mut Simulation, cid: Id, tons: f64) {
        let colony = sim.state_mut().colonies.get_mut(&cid).unwrap();
        colony.mineral_targets.insert(DURANIUM.into(), tons);
    }

    #[test]
    fn test_pickup_moves_surplus_to_target() {
        let mut sim = base();
        set_stock(&mut sim, 1, 500.0);
        set_target(&mut sim, 2, 200.0);
        sim.state_mut().ships.insert(5, hauler(5, 0.0));

        let plan = compute_freight_plan(&sim, 1, &FreightPlannerOptions::default());
        assert!(plan.ok);
        assert_eq!(plan.message, "OK");
        assert_eq!(plan.assignments.len(), 1);
        let a = &plan.assignments[0];
        assert_eq!(a.kind, FreightAssignmentKind::PickupAndDeliver);
        assert_eq!((a.source_colony_id, a.dest_colony_id), (Some(1), 2));
        assert_eq!(a.items, vec![item(DURANIUM, 100.0, "StockpileTarget".into())]);
        assert_eq!(a.note, "Pickup + deliver");
        let kinds: Vec<_> = a.stops.iter().map(|s| (s.colony_id, s.actions[0].kind)).collect();
        assert_eq!(
            kinds,
            vec![(1, FreightStopActionKind::Load), (2, FreightStopActionKind::Unload)]
        );
    }

    #[test]
    fn test_onboard_cargo_tops_up_when_source_is_on_the_way() {
        let mut sim = base();
        set_stock(&mut sim, 1, 500.0);
        set_target(&mut sim, 2, 200.0);
        let mut ship = hauler(5, 0.0);
        ship.cargo.insert(DURANIUM.into(), 50.0);
        sim.state_mut().ships.insert(5, ship);

        let plan = compute_freight_plan(&sim, 1, &FreightPlannerOptions::default());
        let a = &plan.assignments[0];
        assert_eq!(a.note, "Top up + deliver");
        assert_eq!(a.stops[0].actions[0].tons, 50.0);
        assert_eq!(a.stops[1].actions[0].tons, 100.0);
    }

    #[test]
    fn test_onboard_cargo_delivered_without_source() {
        let mut sim = base();
        set_target(&mut sim, 2, 200.0);
        let mut ship = hauler(5, 0.0);
        ship.cargo.insert(DURANIUM.into(), 50.0);
        sim.state_mut().ships.insert(5, ship);

        let plan = compute_freight_plan(&sim, 1, &FreightPlannerOptions::default());
        let a = &plan.assignments[0];
        assert_eq!(a.kind, FreightAssignmentKind::DeliverCargo);
        assert_eq!(a.source_colony_id, None);
        assert_eq!(a.note, "Deliver existing cargo");
        assert_eq!(a.stops.len(), 1);
        assert_eq!(a.eta_to_source_days, 0.0);
    }

    #[test]
    fn test_nearest_ship_wins_a_single_need() {
        let mut sim = base();
        set_stock(&mut sim, 1, 500.0);
        set_target(&mut sim, 2, 100.0);
        sim.state_mut().ships.insert(3, hauler(3, -400.0));
        sim.state_mut().ships.insert(9, hauler(9, 0.0));

        let plan = compute_freight_plan(&sim, 1, &FreightPlannerOptions::default());
        assert_eq!(plan.assignments.len(), 1);
        assert_eq!(plan.assignments[0].ship_id, 9);
    }

    #[test]
    fn test_reserves_are_not_exported() {
        let mut sim = base();
        set_stock(&mut sim, 1, 120.0);
        sim.state_mut()
            .colonies
            .get_mut(&1)
            .unwrap()
            .mineral_reserves
            .insert(DURANIUM.into(), 100.0);
        set_target(&mut sim, 2, 200.0);
        sim.state_mut().ships.insert(5, hauler(5, 0.0));

        let plan = compute_freight_plan(&sim, 1, &FreightPlannerOptions::default());
        // 20t spare, 75% of it may leave.
        assert!((plan.assignments[0].items[0].tons - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_truncation_and_messages() {
        let mut sim = base();
        assert_eq!(
            compute_freight_plan(&sim, 4, &FreightPlannerOptions::default()).message,
            "Invalid faction."
        );
        assert_eq!(
            compute_freight_plan(&sim, 1, &FreightPlannerOptions::default()).message,
            "No eligible ships."
        );
        sim.state_mut().ships.insert(5, hauler(5, 0.0));
        sim.state_mut().ships.insert(6, hauler(6, 0.0));
        assert_eq!(
            compute_freight_plan(&sim, 1, &FreightPlannerOptions::default()).message,
            "No matching freight tasks."
        );

        set_stock(&mut sim, 1, 500.0);
        set_target(&mut sim, 2, 100.0);
        let opts = FreightPlannerOptions {
            max_ships: 1,
            ..FreightPlannerOptions::default()
        };
        let plan = compute_freight_plan(&sim, 1, &opts);
        assert!(plan.truncated);
        assert_eq!(plan.message, "Candidate ships truncated by max_ships. (1 assignments)");
    }

    #[test]
    fn test_need_reason_labels() {
        assert_eq!(need_reason(LogisticsNeedKind::Construction, "mine"), "Construction:mine");
        assert_eq!(need_reason(LogisticsNeedKind::Fuel, "ignored"), "Fuel");
        assert_eq!(need_reason(LogisticsNeedKind::TroopTraining, ""), "TroopTraining");
    }
}
