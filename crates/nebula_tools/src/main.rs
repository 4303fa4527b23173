//! Nebula planning core - development tools

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nebula_core::advisor::{advise_faction, AdvisorOptions};
use nebula_core::config::SimConfig;
use nebula_core::ground_combat::{forecast_ground_battle, GroundBattleForecastOptions};
use nebula_core::ids::Id;
use nebula_core::math::Vec2;
use nebula_core::planning::colonist::{compute_colonist_plan, ColonistPlannerOptions};
use nebula_core::planning::freight::{compute_freight_plan, FreightPlannerOptions};
use nebula_core::planning::invasion::{analyze_invasion_target, InvasionPlannerOptions};
use nebula_core::planning::salvage::{compute_salvage_plan, SalvagePlannerOptions};
use nebula_core::planning::troop::{compute_troop_plan, TroopPlannerOptions};
use nebula_core::simulation::Simulation;
use nebula_tools::load::{load_simulation, validate_scenario};
use nebula_tools::report::{
    format_forecast, format_invasion, format_issues, format_plan, to_json,
};
use nebula_tools::{Result, ToolError};

#[derive(Parser)]
#[command(name = "nebula-tools")]
#[command(about = "Development tools for the Nebula planning core")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum PlanKind {
    Freight,
    Troops,
    Colonists,
    Salvage,
}

#[derive(Args)]
struct InvasionArgs {
    /// Scenario file
    path: PathBuf,
    /// Target colony
    #[arg(long)]
    target: Id,
    /// Attacking faction
    #[arg(long)]
    attacker: Id,
    /// Planning speed for staging ETAs (km/s)
    #[arg(long, default_value_t = 0.0)]
    speed: f64,
    /// Troop margin factor
    #[arg(long, default_value_t = 1.2)]
    margin: f64,
    /// System the assault force starts in
    #[arg(long)]
    start_system: Option<Id>,
    /// Start position in the start system (mkm)
    #[arg(long, num_args = 2, value_names = ["X", "Y"], allow_negative_numbers = true)]
    start_pos: Option<Vec<f64>>,
    /// Share of each staging colony's surplus that may leave; negative uses the config
    #[arg(long, default_value_t = -1.0, allow_negative_numbers = true)]
    take_fraction: f64,
    /// Staging options to keep, 0 for all
    #[arg(long, default_value_t = 0)]
    max_options: usize,
    /// Route through undiscovered systems too
    #[arg(long)]
    all_systems: bool,
    /// Also forecast an assault at this strength
    #[arg(long)]
    forecast_strength: Option<f64>,
    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

impl InvasionArgs {
    fn options(&self) -> InvasionPlannerOptions {
        let start_pos_mkm = match self.start_pos.as_deref() {
            Some([x, y]) => Vec2::new(*x, *y),
            _ => Vec2::ZERO,
        };
        InvasionPlannerOptions {
            attacker_faction_id: self.attacker,
            restrict_to_discovered: !self.all_systems,
            start_system_id: self.start_system,
            start_pos_mkm,
            planning_speed_km_s: self.speed,
            max_take_fraction_of_surplus: self.take_fraction,
            max_staging_options: self.max_options,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Check a scenario's references
    Validate {
        /// Scenario file
        path: PathBuf,
    },
    /// List advisor issues for a faction
    Advise {
        /// Scenario file
        path: PathBuf,
        /// Faction to advise
        #[arg(long)]
        faction: Id,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Run a transport planner
    Plan {
        /// Planner to run
        kind: PlanKind,
        /// Scenario file
        path: PathBuf,
        /// Planning faction
        #[arg(long)]
        faction: Id,
        /// Consider every ship, not only idle automated ones
        #[arg(long)]
        all_ships: bool,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Analyse a colony as an invasion target
    Invasion(InvasionArgs),
    /// Forecast a ground battle
    Forecast {
        /// Attacker strength
        #[arg(long)]
        attacker: f64,
        /// Defender strength
        #[arg(long)]
        defender: f64,
        /// Fortification points
        #[arg(long, default_value_t = 0.0)]
        forts: f64,
        /// Defender artillery weapon damage per day
        #[arg(long, default_value_t = 0.0)]
        artillery: f64,
        /// RON config overriding the default tunables
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn emit<T: serde::Serialize>(
    json: bool,
    value: &T,
    text: impl FnOnce(&T) -> String,
) -> Result<()> {
    if json {
        println!("{}", to_json(value)?);
    } else {
        println!("{}", text(value));
    }
    Ok(())
}

fn run_plan(
    sim: &Simulation,
    kind: PlanKind,
    faction: Id,
    all_ships: bool,
    json: bool,
) -> Result<()> {
    let automated = !all_ships;
    match kind {
        PlanKind::Freight => {
            let opts = FreightPlannerOptions {
                require_auto_freight_flag: automated,
                require_idle: automated,
                ..FreightPlannerOptions::default()
            };
            emit(json, &compute_freight_plan(sim, faction, &opts), |p| format_plan("Freight", p))
        }
        PlanKind::Troops => {
            let opts = TroopPlannerOptions {
                require_auto_troop_transport_flag: automated,
                require_idle: automated,
                ..TroopPlannerOptions::default()
            };
            emit(json, &compute_troop_plan(sim, faction, &opts), |p| format_plan("Troops", p))
        }
        PlanKind::Colonists => {
            let opts = ColonistPlannerOptions {
                require_auto_colonist_transport_flag: automated,
                require_idle: automated,
                ..ColonistPlannerOptions::default()
            };
            let plan = compute_colonist_plan(sim, faction, &opts);
            emit(json, &plan, |p| format_plan("Colonists", p))
        }
        PlanKind::Salvage => {
            let opts = SalvagePlannerOptions {
                require_auto_salvage_flag: automated,
                require_idle: automated,
                ..SalvagePlannerOptions::default()
            };
            emit(json, &compute_salvage_plan(sim, faction, &opts), |p| format_plan("Salvage", p))
        }
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Validate { path } => {
            tracing::info!("Validating scenario: {}", path.display());
            let problems = validate_scenario(&path)?;
            if !problems.is_empty() {
                return Err(ToolError::Invalid {
                    path: path.display().to_string(),
                    count: problems.len(),
                });
            }
            tracing::info!("Validation passed");
            Ok(())
        }
        Commands::Advise { path, faction, json } => {
            let sim = load_simulation(&path)?;
            if !sim.state().factions.contains_key(&faction) {
                return Err(ToolError::NotFound(format!("Faction not found: {faction}")));
            }
            let issues = advise_faction(&sim, faction, &AdvisorOptions::default());
            emit(json, &issues, |i| format_issues(i))
        }
        Commands::Plan {
            kind,
            path,
            faction,
            all_ships,
            json,
        } => {
            let sim = load_simulation(&path)?;
            run_plan(&sim, kind, faction, all_ships, json)
        }
        Commands::Invasion(args) => {
            let sim = load_simulation(&args.path)?;
            let opts = args.options();
            let res = analyze_invasion_target(
                &sim,
                args.target,
                &opts,
                args.margin,
                args.forecast_strength,
            );
            emit(args.json, &res, format_invasion)
        }
        Commands::Forecast {
            attacker,
            defender,
            forts,
            artillery,
            config,
        } => {
            let cfg = match config {
                Some(path) => {
                    let text = std::fs::read_to_string(&path).map_err(|source| ToolError::Io {
                        path: path.display().to_string(),
                        source,
                    })?;
                    SimConfig::from_ron_str(&text)?
                }
                None => SimConfig::default(),
            };
            let opts = GroundBattleForecastOptions::default();
            let f = forecast_ground_battle(&cfg, attacker, defender, forts, artillery, opts);
            println!("{}", format_forecast(&f));
            Ok(())
        }
    }
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli.command) {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
