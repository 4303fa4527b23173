//! Scenario loading and validation.

use std::path::Path;

use nebula_core::error::GameError;
use nebula_core::scenario::ScenarioFile;
use nebula_core::simulation::Simulation;

use crate::error::{Result, ToolError};

/// Read and parse a scenario file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid scenario.
pub fn read_scenario(path: &Path) -> Result<ScenarioFile> {
    let label = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|source| ToolError::Io {
        path: label.clone(),
        source,
    })?;
    ScenarioFile::from_ron_str(&text).map_err(|e| match e {
        GameError::DataParseError { message, .. } => {
            ToolError::Game(GameError::DataParseError { path: label, message })
        }
        other => ToolError::Game(other),
    })
}

/// Problems found in a scenario file, logged one per line.
///
/// # Errors
///
/// Returns an error if the file cannot be loaded.
pub fn validate_scenario(path: &Path) -> Result<Vec<String>> {
    let scenario = read_scenario(path)?;
    let problems = scenario.validate();
    for p in &problems {
        tracing::warn!(path = %path.display(), "{p}");
    }
    Ok(problems)
}

/// Load a scenario and build its simulation, refusing inconsistent data.
///
/// # Errors
///
/// Returns an error if the file cannot be loaded or fails validation.
pub fn load_simulation(path: &Path) -> Result<Simulation> {
    let scenario = read_scenario(path)?;
    let problems = scenario.validate();
    if !problems.is_empty() {
        for p in &problems {
            tracing::error!(path = %path.display(), "{p}");
        }
        return Err(ToolError::Invalid {
            path: path.display().to_string(),
            count: problems.len(),
        });
    }
    let sim = scenario.into_simulation();
    tracing::debug!(
        path = %path.display(),
        factions = sim.state().factions.len(),
        colonies = sim.state().colonies.len(),
        ships = sim.state().ships.len(),
        "scenario loaded"
    );
    Ok(sim)
}
