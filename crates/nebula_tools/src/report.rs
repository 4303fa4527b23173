//! Plain-text and JSON reports.

use std::fmt::Write as _;

use serde::Serialize;

use nebula_core::advisor::AdvisorIssue;
use nebula_core::ground_combat::GroundBattleForecast;
use nebula_core::planning::colonist::ColonistAssignment;
use nebula_core::planning::freight::{FreightAssignment, FreightStopActionKind};
use nebula_core::planning::invasion::InvasionPlannerResult;
use nebula_core::planning::salvage::SalvageAssignment;
use nebula_core::planning::troop::TroopAssignment;
use nebula_core::planning::PlannerResult;

use crate::error::Result;

/// One report line per assignment.
pub trait PlanLine {
    /// Describe the assignment.
    fn line(&self) -> String;
}

fn days(d: f64) -> String {
    if d.is_finite() {
        format!("{d:.1}d")
    } else {
        "unreachable".to_string()
    }
}

fn source(id: Option<u64>) -> String {
    id.map_or_else(|| "aboard".to_string(), |c| format!("colony {c}"))
}

impl PlanLine for TroopAssignment {
    fn line(&self) -> String {
        format!(
            "ship {}: {:.1} troops {} -> colony {} ({}) [{}; {}]",
            self.ship_id,
            self.strength,
            source(self.source_colony_id),
            self.dest_colony_id,
            days(self.eta_total_days),
            self.note,
            self.reason
        )
    }
}

impl PlanLine for ColonistAssignment {
    fn line(&self) -> String {
        format!(
            "ship {}: {:.1}M colonists {} -> colony {} ({}) [{}; {}]",
            self.ship_id,
            self.millions,
            source(self.source_colony_id),
            self.dest_colony_id,
            days(self.eta_total_days),
            self.note,
            self.reason
        )
    }
}

impl PlanLine for SalvageAssignment {
    fn line(&self) -> String {
        let wreck = self.wreck_id.map_or_else(String::new, |w| format!("wreck {w} "));
        let dest = self
            .dest_colony_id
            .map_or_else(|| "no drop-off".to_string(), |c| format!("colony {c}"));
        format!(
            "ship {}: {wreck}{:.1}t -> {dest} ({}) [{}]",
            self.ship_id,
            self.expected_salvage_tons,
            days(self.eta_total_days),
            self.note
        )
    }
}

impl PlanLine for FreightAssignment {
    fn line(&self) -> String {
        let mut out = format!(
            "ship {}: {} -> colony {} ({}) [{}]",
            self.ship_id,
            source(self.source_colony_id),
            self.dest_colony_id,
            days(self.eta_total_days),
            self.note
        );
        for stop in &self.stops {
            for act in &stop.actions {
                let verb = match act.kind {
                    FreightStopActionKind::Load => "load",
                    FreightStopActionKind::Unload => "unload",
                };
                let _ = write!(
                    out,
                    "\n    {verb} {:.1}t {} at colony {}",
                    act.tons, act.mineral, stop.colony_id
                );
            }
        }
        out
    }
}

/// Text report of a planner run.
pub fn format_plan<A: PlanLine>(title: &str, plan: &PlannerResult<A>) -> String {
    let mut out = format!("{title}: {}", plan.message);
    if plan.truncated {
        out.push_str(" (truncated)");
    }
    for asg in &plan.assignments {
        let _ = write!(out, "\n  {}", asg.line());
    }
    out
}

/// Text report of advisor issues.
pub fn format_issues(issues: &[AdvisorIssue]) -> String {
    if issues.is_empty() {
        return "No issues.".to_string();
    }
    issues
        .iter()
        .map(|i| format!("[{:?}] {}: {}", i.level, i.kind.label(), i.summary))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Text report of a forecast.
pub fn format_forecast(f: &GroundBattleForecast) -> String {
    if !f.ok {
        return format!("Forecast unavailable: {}", f.truncated_reason);
    }
    let mut out = format!(
        "{} wins after {} day(s): attacker {:.1} -> {:.1}, defender {:.1} -> {:.1}",
        f.winner.label(),
        f.days_to_resolve,
        f.attacker_start,
        f.attacker_end,
        f.defender_start,
        f.defender_end
    );
    if f.truncated {
        let _ = write!(out, " ({})", f.truncated_reason);
    }
    out
}

/// Text report of an invasion analysis.
pub fn format_invasion(res: &InvasionPlannerResult) -> String {
    if !res.ok {
        return res.message.clone();
    }
    let t = &res.target;
    let mut out = format!(
        "Colony {} (faction {}): defenders {:.1}, forts {:.1}/{:.1}, artillery {:.1}/day\n\
         Required strength {:.1} ({:.1} with defences breached)",
        t.colony_id,
        t.defender_faction_id,
        t.defender_strength,
        t.forts_effective,
        t.forts_total,
        t.defender_artillery_weapon_damage_per_day,
        t.required_attacker_strength,
        t.required_attacker_strength_no_forts
    );
    if let Some((strength, f)) = &t.attacker_strength_forecast {
        let _ = write!(out, "\nAt {strength:.1}: {}", format_forecast(f));
    }
    for opt in &res.staging_options {
        let _ = write!(
            out,
            "\n  stage at colony {}: take {:.1} of {:.1} ({})",
            opt.colony_id,
            opt.take_cap_strength,
            opt.surplus_strength,
            days(opt.eta_total_days)
        );
    }
    out
}

/// Pretty JSON.
///
/// # Errors
///
/// Returns an error if the value cannot be encoded.
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nebula_core::config::SimConfig;
    use nebula_core::ground_combat::{forecast_ground_battle, GroundBattleForecastOptions};
    use nebula_core::advisor::{advise_faction, AdvisorOptions};
    use nebula_core::math::Vec2;
    use nebula_core::planning::troop::TroopAssignmentKind;
    use nebula_test_utils::fixtures::ScenarioBuilder;

    #[test]
    fn test_plan_report_lists_assignments() {
        let plan = PlannerResult {
            ok: true,
            truncated: true,
            message: "OK.".to_string(),
            assignments: vec![TroopAssignment {
                kind: TroopAssignmentKind::DeliverTroops,
                ship_id: 4,
                dest_colony_id: 9,
                strength: 12.0,
                eta_total_days: f64::INFINITY,
                note: "Deliver embarked troops".into(),
                reason: "Meet garrison target".into(),
                ..TroopAssignment::default()
            }],
        };
        let text = format_plan("Troops", &plan);
        assert_eq!(
            text,
            "Troops: OK. (truncated)\n  ship 4: 12.0 troops aboard -> colony 9 (unreachable) \
             [Deliver embarked troops; Meet garrison target]"
        );
    }

    #[test]
    fn test_issue_report() {
        let sim = ScenarioBuilder::new()
            .faction(1, "Terrans")
            .system(1, "Home")
            .body(5, 1, Vec2::ZERO)
            .colony(10, 1, 5, |c| c.garrison_target_strength = 10.0)
            .build();
        let issues = advise_faction(&sim, 1, &AdvisorOptions::default());
        assert_eq!(
            format_issues(&issues),
            "[Warn] Garrison: No troop training capacity: 0.0/10.0"
        );
        assert_eq!(format_issues(&[]), "No issues.");
    }

    #[test]
    fn test_forecast_report() {
        let cfg = SimConfig {
            ground_combat_loss_factor: 1.0,
            fortification_defense_scale: 0.0,
            ..SimConfig::default()
        };
        let opts = GroundBattleForecastOptions::default();
        let f = forecast_ground_battle(&cfg, 10.0, 10.0, 0.0, 0.0, opts);
        assert!(format_forecast(&f).starts_with("Defender wins after 1 day(s)"));
    }

    #[test]
    fn test_json_is_pretty() {
        let json = to_json(&vec![1, 2]).unwrap();
        assert!(json.contains('\n'));
    }
}
