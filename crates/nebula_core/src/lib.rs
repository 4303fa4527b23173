//! # Nebula Core
//!
//! Deterministic planning and advisory core for a space strategy simulation.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No randomness
//! - No threads
//!
//! Planners and the advisor are pure functions of a [`Simulation`]
//! snapshot. Every table is walked in ascending id order, so the same
//! snapshot and options always give the same output. The
//! [`applier`] is the only code that turns planner output into ship orders.
//!
//! ## Crate Structure
//!
//! - [`state`] - Snapshot entities
//! - [`simulation`] - Snapshot owner, lookups, ground combat tick
//! - [`routing`] - Jump routes and ETAs
//! - [`ground_combat`] - Battle model and forecasts
//! - [`logistics`] - Per-colony mineral needs
//! - [`advisor`] - Faction problem report
//! - [`planning`] - Freight, troop, colonist, salvage and invasion planners
//! - [`applier`] - Assignment to order translation
//! - [`scenario`] - RON scenario documents
//!
//! [`Simulation`]: simulation::Simulation

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod advisor;
pub mod applier;
pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod ground_combat;
pub mod ids;
pub mod logistics;
pub mod math;
pub mod orders;
pub mod planning;
pub mod routing;
pub mod scenario;
pub mod simulation;
pub mod state;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::advisor::{
        advise_faction, AdvisorIssue, AdvisorIssueKind, AdvisorIssueLevel, AdvisorOptions,
    };
    pub use crate::applier::{
        apply_colonist_assignment, apply_colonist_plan, apply_freight_assignment,
        apply_freight_plan, apply_salvage_assignment, apply_salvage_plan,
        apply_troop_assignment, apply_troop_plan,
    };
    pub use crate::commands::OrderIssuer;
    pub use crate::config::SimConfig;
    pub use crate::content::{ContentDb, InstallationDef, ShipDesign};
    pub use crate::error::{GameError, Result};
    pub use crate::ground_combat::{
        forecast_ground_battle, required_attacker_strength, GroundBattleForecast,
        GroundBattleForecastOptions, GroundBattleWinner,
    };
    pub use crate::ids::{Id, INVALID_ID};
    pub use crate::logistics::{LogisticsNeed, LogisticsNeedKind};
    pub use crate::math::Vec2;
    pub use crate::orders::{Order, ShipOrders};
    pub use crate::planning::colonist::{
        compute_colonist_plan, ColonistAssignment, ColonistAssignmentKind,
        ColonistPlannerOptions,
    };
    pub use crate::planning::freight::{
        compute_freight_plan, FreightAssignment, FreightAssignmentKind, FreightPlannerOptions,
    };
    pub use crate::planning::invasion::{analyze_invasion_target, InvasionPlannerOptions};
    pub use crate::planning::salvage::{
        compute_salvage_plan, SalvageAssignment, SalvageAssignmentKind, SalvagePlannerOptions,
    };
    pub use crate::planning::troop::{
        compute_troop_plan, TroopAssignment, TroopAssignmentKind, TroopPlannerOptions,
    };
    pub use crate::planning::PlannerResult;
    pub use crate::scenario::ScenarioFile;
    pub use crate::simulation::Simulation;
    pub use crate::state::{
        Body, Colony, Faction, Fleet, GameState, GroundBattle, JumpPoint, Ship, StarSystem, Wreck,
    };
}
