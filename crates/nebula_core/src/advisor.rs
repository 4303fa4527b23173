//! Faction advisor.
//!
//! Scans a faction for actionable problems: logistics shortfalls, ship
//! readiness (fuel, hull, ammunition, maintenance) and colony health
//! (habitation, garrison training). The result is a totally ordered list, so
//! the same snapshot always yields the same issues in the same order.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::ids::{sorted_ids, Id};
use crate::logistics::{
    LogisticsNeed, LogisticsNeedKind, DURANIUM_RESOURCE_ID, FUEL_RESOURCE_ID,
    NEUTRONIUM_RESOURCE_ID,
};
use crate::math::{cmp_eps, non_neg, EPS, EPS_CHANGE};
use crate::simulation::Simulation;
use crate::state::{Colony, Ship};

/// Issue category, in sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum AdvisorIssueKind {
    /// A colony is short of a mineral it needs.
    #[default]
    LogisticsNeed,
    /// Fuel below threshold.
    ShipLowFuel,
    /// Hull points below threshold.
    ShipDamaged,
    /// Missile magazine below threshold.
    ShipLowAmmo,
    /// Maintenance condition below threshold.
    ShipLowMaintenance,
    /// Population exceeds habitation capacity.
    ColonyHabitationShortfall,
    /// Garrison target cannot be trained toward.
    ColonyGarrisonProblem,
}

impl AdvisorIssueKind {
    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::LogisticsNeed => "Logistics",
            Self::ShipLowFuel => "Low Fuel",
            Self::ShipDamaged => "Damaged",
            Self::ShipLowAmmo => "Low Ammo",
            Self::ShipLowMaintenance => "Low Maintenance",
            Self::ColonyHabitationShortfall => "Habitation",
            Self::ColonyGarrisonProblem => "Garrison",
        }
    }
}

/// Issue importance. Higher variants sort first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum AdvisorIssueLevel {
    /// Worth knowing.
    #[default]
    Info,
    /// Needs attention.
    Warn,
    /// Broken.
    Error,
}

/// Advisor filters, thresholds and caps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorOptions {
    /// Report logistics needs.
    pub include_logistics: bool,
    /// Report ship readiness.
    pub include_ships: bool,
    /// Report colony health.
    pub include_colonies: bool,
    /// Colony health: habitation shortfall.
    pub include_habitability: bool,
    /// Colony health: stalled garrison training.
    pub include_garrison: bool,
    /// Flag ships below this fuel fraction.
    pub low_fuel_fraction: f64,
    /// Flag ships below this hull fraction.
    pub low_hp_fraction: f64,
    /// Flag ships below this magazine fraction.
    pub low_ammo_fraction: f64,
    /// Flag ships below this maintenance condition.
    pub low_maintenance_fraction: f64,
    /// Cap on logistics issues.
    pub max_logistics_issues: usize,
    /// Cap on ship issues.
    pub max_ship_issues: usize,
    /// Cap on colony issues.
    pub max_colony_issues: usize,
    /// Cap on the whole list.
    pub max_total_issues: usize,
}

impl Default for AdvisorOptions {
    fn default() -> Self {
        Self {
            include_logistics: true,
            include_ships: true,
            include_colonies: true,
            include_habitability: true,
            include_garrison: true,
            low_fuel_fraction: 0.25,
            low_hp_fraction: 0.75,
            low_ammo_fraction: 0.25,
            low_maintenance_fraction: 0.70,
            max_logistics_issues: 250,
            max_ship_issues: 250,
            max_colony_issues: 250,
            max_total_issues: 1000,
        }
    }
}

/// One advisor finding.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AdvisorIssue {
    /// Category.
    pub kind: AdvisorIssueKind,
    /// Importance.
    pub level: AdvisorIssueLevel,
    /// Sort weight; its unit depends on `kind`.
    pub severity: f64,
    /// Faction advised.
    pub faction_id: Id,
    /// System involved, for ship issues.
    pub system_id: Option<Id>,
    /// Ship involved.
    pub ship_id: Option<Id>,
    /// Colony involved.
    pub colony_id: Option<Id>,
    /// Logistics need kind, for logistics issues.
    pub logistics_kind: Option<LogisticsNeedKind>,
    /// Resource name ("Duranium", "Fuel", "HP", ...).
    pub resource: String,
    /// Extra context, e.g. the installation being built.
    pub context_id: String,
    /// Desired amount.
    pub desired: f64,
    /// Current amount.
    pub have: f64,
    /// Shortfall.
    pub missing: f64,
    /// One-line description.
    pub summary: String,
}

/// Total issue order: level desc, severity desc, then kind and ids ascending.
fn cmp_issues(a: &AdvisorIssue, b: &AdvisorIssue) -> Ordering {
    b.level
        .cmp(&a.level)
        .then_with(|| cmp_eps(b.severity, a.severity))
        .then_with(|| a.kind.cmp(&b.kind))
        .then_with(|| a.colony_id.cmp(&b.colony_id))
        .then_with(|| a.ship_id.cmp(&b.ship_id))
        .then_with(|| a.system_id.cmp(&b.system_id))
        .then_with(|| a.resource.cmp(&b.resource))
        .then_with(|| a.context_id.cmp(&b.context_id))
        .then_with(|| a.summary.cmp(&b.summary))
}

fn cmp_needs(a: &LogisticsNeed, b: &LogisticsNeed) -> Ordering {
    cmp_eps(b.missing_tons, a.missing_tons)
        .then_with(|| a.kind.cmp(&b.kind))
        .then_with(|| a.colony_id.cmp(&b.colony_id))
        .then_with(|| a.mineral.cmp(&b.mineral))
        .then_with(|| a.context_id.cmp(&b.context_id))
}

/// A resource measured against a capacity.
struct Gauge {
    have: f64,
    cap: f64,
    threshold: f64,
}

impl Gauge {
    fn frac(&self) -> f64 {
        if self.cap > EPS {
            (self.have / self.cap).clamp(0.0, 1.0)
        } else {
            1.0
        }
    }

    fn is_low(&self) -> bool {
        self.cap > EPS && self.threshold > EPS && self.frac() + EPS < self.threshold
    }

    fn missing(&self) -> f64 {
        non_neg(self.threshold * self.cap - self.have)
    }
}

/// Compute advisor issues for a faction. An unknown faction yields no issues.
#[must_use]
pub fn advise_faction(
    sim: &Simulation,
    faction_id: Id,
    opts: &AdvisorOptions,
) -> Vec<AdvisorIssue> {
    let mut out = Vec::new();
    if !sim.state().factions.contains_key(&faction_id) {
        return out;
    }

    if opts.include_logistics {
        logistics_issues(sim, faction_id, opts, &mut out);
    }
    if opts.include_ships {
        ship_issues(sim, faction_id, opts, &mut out);
    }
    if opts.include_colonies {
        colony_issues(sim, faction_id, opts, &mut out);
    }

    out.sort_by(cmp_issues);
    out.truncate(opts.max_total_issues);
    tracing::debug!(faction_id, issues = out.len(), "advisor scan complete");
    out
}

fn push_capped(out: &mut Vec<AdvisorIssue>, opts: &AdvisorOptions, issue: AdvisorIssue) {
    if out.len() < opts.max_total_issues {
        out.push(issue);
    }
}

fn logistics_issues(
    sim: &Simulation,
    faction_id: Id,
    opts: &AdvisorOptions,
    out: &mut Vec<AdvisorIssue>,
) {
    let mut needs = sim.logistics_needs_for_faction(faction_id);
    needs.retain(|n| n.missing_tons > EPS);
    needs.sort_by(cmp_needs);
    needs.truncate(opts.max_logistics_issues);

    for n in needs {
        let mut summary =
            format!("{}: missing {:.2}t {}", n.kind.label(), n.missing_tons, n.mineral);
        if !n.context_id.is_empty() {
            summary.push_str(&format!(" ({})", n.context_id));
        }
        let issue = AdvisorIssue {
            kind: AdvisorIssueKind::LogisticsNeed,
            level: if n.missing_tons > 1e-3 {
                AdvisorIssueLevel::Warn
            } else {
                AdvisorIssueLevel::Info
            },
            severity: non_neg(n.missing_tons),
            faction_id,
            colony_id: Some(n.colony_id),
            logistics_kind: Some(n.kind),
            resource: n.mineral,
            context_id: n.context_id,
            desired: n.desired_tons,
            have: n.have_tons,
            missing: n.missing_tons,
            summary,
            ..AdvisorIssue::default()
        };
        push_capped(out, opts, issue);
    }
}

fn ship_issue(
    ship: &Ship,
    faction_id: Id,
    kind: AdvisorIssueKind,
    resource: &str,
    gauge: &Gauge,
) -> AdvisorIssue {
    AdvisorIssue {
        kind,
        severity: gauge.missing(),
        faction_id,
        system_id: Some(ship.system_id),
        ship_id: Some(ship.id),
        resource: resource.to_string(),
        desired: gauge.cap,
        have: gauge.have,
        missing: gauge.missing(),
        ..AdvisorIssue::default()
    }
}

fn ship_issues(
    sim: &Simulation,
    faction_id: Id,
    opts: &AdvisorOptions,
    out: &mut Vec<AdvisorIssue>,
) {
    let state = sim.state();
    let mut found: Vec<AdvisorIssue> = Vec::new();

    for sid in sorted_ids(&state.ships) {
        if found.len() >= opts.max_ship_issues {
            break;
        }
        let Some(ship) = state.ships.get(&sid) else { continue };
        if ship.faction_id != faction_id {
            continue;
        }
        let Some(design) = sim.find_design(&ship.design_id) else { continue };

        let mut per_ship = Vec::new();

        let fuel_cap = non_neg(design.fuel_capacity_tons);
        let fuel = Gauge {
            have: if ship.fuel_tons < 0.0 { fuel_cap } else { non_neg(ship.fuel_tons) },
            cap: fuel_cap,
            threshold: opts.low_fuel_fraction.clamp(0.0, 1.0),
        };
        if fuel.is_low() {
            let frac = fuel.frac();
            let kind = AdvisorIssueKind::ShipLowFuel;
            let mut issue = ship_issue(ship, faction_id, kind, FUEL_RESOURCE_ID, &fuel);
            issue.level = warn_if(frac <= 0.05 || fuel.have <= EPS_CHANGE);
            issue.summary =
                format!("Fuel {:.1}/{:.1}t ({:.0}%)", fuel.have, fuel.cap, frac * 100.0);
            per_ship.push(issue);
        }

        let hp = Gauge {
            have: non_neg(ship.hp),
            cap: non_neg(design.max_hp),
            threshold: opts.low_hp_fraction.clamp(0.0, 1.0),
        };
        if hp.is_low() {
            let frac = hp.frac();
            let mut issue = ship_issue(ship, faction_id, AdvisorIssueKind::ShipDamaged, "HP", &hp);
            issue.level = warn_if(frac <= 0.25);
            issue.summary = format!("HP {:.1}/{:.1} ({:.0}%)", hp.have, hp.cap, frac * 100.0);
            per_ship.push(issue);
        }

        // Negative ammo is an unlimited magazine.
        if ship.missile_ammo >= 0.0 {
            let ammo = Gauge {
                have: ship.missile_ammo,
                cap: non_neg(design.missile_ammo_capacity),
                threshold: opts.low_ammo_fraction.clamp(0.0, 1.0),
            };
            if ammo.is_low() {
                let frac = ammo.frac();
                let mut issue =
                    ship_issue(ship, faction_id, AdvisorIssueKind::ShipLowAmmo, "Ammo", &ammo);
                issue.level = warn_if(frac <= 0.05 || ammo.have <= EPS_CHANGE);
                issue.summary =
                    format!("Ammo {:.0}/{:.0} ({:.0}%)", ammo.have, ammo.cap, frac * 100.0);
                per_ship.push(issue);
            }
        }

        if sim.cfg().enable_ship_maintenance {
            let maint = Gauge {
                have: ship.maintenance_condition.clamp(0.0, 1.0),
                cap: 1.0,
                threshold: opts.low_maintenance_fraction.clamp(0.0, 1.0),
            };
            if maint.is_low() {
                let kind = AdvisorIssueKind::ShipLowMaintenance;
                let mut issue = ship_issue(ship, faction_id, kind, "Maintenance", &maint);
                issue.level = warn_if(maint.have <= 0.25);
                issue.summary = format!(
                    "Maintenance {:.0}% (threshold {:.0}%)",
                    maint.have * 100.0,
                    maint.threshold * 100.0
                );
                per_ship.push(issue);
            }
        }

        let room = opts.max_ship_issues - found.len();
        found.extend(per_ship.into_iter().take(room));
    }

    for issue in found {
        push_capped(out, opts, issue);
    }
}

fn warn_if(warn: bool) -> AdvisorIssueLevel {
    if warn {
        AdvisorIssueLevel::Warn
    } else {
        AdvisorIssueLevel::Info
    }
}

fn colony_issues(
    sim: &Simulation,
    faction_id: Id,
    opts: &AdvisorOptions,
    out: &mut Vec<AdvisorIssue>,
) {
    let state = sim.state();
    let mut found: Vec<AdvisorIssue> = Vec::new();

    for cid in sorted_ids(&state.colonies) {
        if found.len() >= opts.max_colony_issues {
            break;
        }
        let Some(colony) = state.colonies.get(&cid) else { continue };
        if colony.faction_id != faction_id {
            continue;
        }

        if opts.include_habitability {
            if let Some(issue) = habitation_issue(sim, colony) {
                found.push(issue);
            }
        }
        if opts.include_garrison && found.len() < opts.max_colony_issues {
            if let Some(issue) = garrison_issue(sim, colony) {
                found.push(issue);
            }
        }
    }
    found.truncate(opts.max_colony_issues);

    for issue in found {
        push_capped(out, opts, issue);
    }
}

fn habitation_issue(sim: &Simulation, colony: &Colony) -> Option<AdvisorIssue> {
    let req = sim.required_habitation_capacity_millions(colony);
    let have = sim.habitation_capacity_millions(colony);
    if req <= EPS_CHANGE || have + EPS_CHANGE >= req {
        return None;
    }
    let hab = sim.body_habitability(colony.body_id);
    Some(AdvisorIssue {
        kind: AdvisorIssueKind::ColonyHabitationShortfall,
        level: AdvisorIssueLevel::Warn,
        severity: non_neg(req - have),
        faction_id: colony.faction_id,
        colony_id: Some(colony.id),
        resource: "Habitation".to_string(),
        desired: req,
        have,
        missing: non_neg(req - have),
        summary: format!("Need {req:.1}M; have {have:.1}M (hab {:.0}%)", hab * 100.0),
        ..AdvisorIssue::default()
    })
}

fn garrison_issue(sim: &Simulation, colony: &Colony) -> Option<AdvisorIssue> {
    let cfg = sim.cfg();
    let target = non_neg(colony.garrison_target_strength);
    let defenders = non_neg(colony.ground_forces);
    if target <= defenders + EPS_CHANGE {
        return None;
    }

    let strength_per_day = non_neg(sim.troop_training_points_per_day(colony))
        * non_neg(cfg.troop_strength_per_training_point);

    let why = if strength_per_day <= EPS {
        "No troop training capacity"
    } else {
        let one_day = non_neg(colony.troop_training_queue).min(strength_per_day);
        if one_day <= EPS {
            return None;
        }
        let mut afford: f64 = 1.0;
        for (mineral, per_strength) in [
            (DURANIUM_RESOURCE_ID, cfg.troop_training_duranium_per_strength),
            (NEUTRONIUM_RESOURCE_ID, cfg.troop_training_neutronium_per_strength),
        ] {
            let need = one_day * per_strength;
            if per_strength > EPS && need > EPS {
                let have = colony.minerals.get(mineral).copied().unwrap_or(0.0);
                afford = afford.min(have / need);
            }
        }
        if afford.clamp(0.0, 1.0) > EPS_CHANGE {
            return None;
        }
        "Troop training stalled (missing minerals)"
    };

    Some(AdvisorIssue {
        kind: AdvisorIssueKind::ColonyGarrisonProblem,
        level: AdvisorIssueLevel::Warn,
        severity: target - defenders,
        faction_id: colony.faction_id,
        colony_id: Some(colony.id),
        resource: "Garrison".to_string(),
        desired: target,
        have: defenders,
        missing: target - defenders,
        summary: format!("{why}: {defenders:.1}/{target:.1}"),
        ..AdvisorIssue::default()
    })
}
