//! Loading and discovery of launch configuration files.

use std::path::{Path, PathBuf};

use crate::error::LaunchConfigError;
use crate::types::{CompoundConfig, DebugConfiguration, InputConfig, LaunchFile};

/// The conventional configuration directory.
pub const VSCODE_DIR: &str = ".vscode";
/// The conventional file name.
pub const LAUNCH_FILE_NAME: &str = "launch.json";

/// Load a launch file from an explicit path.
pub fn load_from_path(path: &Path) -> Result<LaunchFile, LaunchConfigError> {
    let data = std::fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(|e| LaunchConfigError::Parse(e.to_string()))
}

/// Find `.vscode/launch.json` walking upward from `start`.
///
/// If `start` is a file, discovery begins in its directory.
pub fn discover(start: &Path) -> Result<PathBuf, LaunchConfigError> {
    let mut current = if start.is_file() {
        start.parent().unwrap_or(Path::new(".")).to_path_buf()
    } else {
        start.to_path_buf()
    };

    loop {
        let candidate = current.join(VSCODE_DIR).join(LAUNCH_FILE_NAME);
        if candidate.exists() {
            return Ok(candidate);
        }
        if !current.pop() {
            return Err(LaunchConfigError::NotDiscovered(
                start.to_string_lossy().into_owned(),
            ));
        }
    }
}

/// Discover and load in one step. Returns the file and where it was found.
pub fn load_and_discover(start: &Path) -> Result<(LaunchFile, PathBuf), LaunchConfigError> {
    let path = discover(start)?;
    let file = load_from_path(&path)?;
    Ok((file, path))
}

/// Derive the workspace folder from a launch.json path (the parent of the
/// `.vscode` directory).
pub fn workspace_folder(launch_json_path: &Path) -> PathBuf {
    launch_json_path
        .parent()
        .and_then(Path::parent)
        .unwrap_or(Path::new("."))
        .to_path_buf()
}

/// Find a configuration by name.
pub fn find_configuration<'a>(
    file: &'a LaunchFile,
    name: &str,
) -> Result<&'a DebugConfiguration, LaunchConfigError> {
    file.configurations
        .iter()
        .find(|c| c.name == name)
        .ok_or_else(|| LaunchConfigError::ConfigurationNotFound(name.into()))
}

/// Find a compound by name.
pub fn find_compound<'a>(
    file: &'a LaunchFile,
    name: &str,
) -> Result<&'a CompoundConfig, LaunchConfigError> {
    file.compounds
        .iter()
        .find(|c| c.name == name)
        .ok_or_else(|| LaunchConfigError::CompoundNotFound(name.into()))
}

/// Find an input definition by id.
pub fn find_input<'a>(file: &'a LaunchFile, id: &str) -> Result<&'a InputConfig, LaunchConfigError> {
    file.inputs
        .iter()
        .find(|i| i.id == id)
        .ok_or_else(|| LaunchConfigError::InputNotFound(id.into()))
}

/// Summary of a configuration for listings.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ConfigurationInfo {
    /// Configuration name.
    pub name: String,
    /// Debug type.
    #[serde(rename = "type")]
    pub config_type: String,
    /// "launch" or "attach".
    pub request: String,
}

/// Summaries of all configurations.
pub fn list_configurations(file: &LaunchFile) -> Vec<ConfigurationInfo> {
    file.configurations
        .iter()
        .map(|c| ConfigurationInfo {
            name: c.name.clone(),
            config_type: c.config_type.clone(),
            request: c.request.clone(),
        })
        .collect()
}

/// Summary of a compound for listings.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompoundInfo {
    /// Compound name.
    pub name: String,
    /// Member configuration names.
    pub configurations: Vec<String>,
    /// Whether members stop as a unit.
    pub stop_all: bool,
}

/// Summaries of all compounds.
pub fn list_compounds(file: &LaunchFile) -> Vec<CompoundInfo> {
    file.compounds
        .iter()
        .map(|c| CompoundInfo {
            name: c.name.clone(),
            configurations: c.configurations.clone(),
            stop_all: c.stop_all,
        })
        .collect()
}

/// Validate a single configuration's required fields.
pub fn validate_configuration(cfg: &DebugConfiguration) -> Result<(), LaunchConfigError> {
    if cfg.name.is_empty() {
        return Err(LaunchConfigError::Validation(
            "configuration name is required".into(),
        ));
    }
    if cfg.config_type.is_empty() {
        return Err(LaunchConfigError::Validation(format!(
            "configuration {:?}: type is required",
            cfg.name
        )));
    }
    match cfg.request.as_str() {
        "launch" | "attach" => Ok(()),
        "" => Err(LaunchConfigError::Validation(format!(
            "configuration {:?}: request is required",
            cfg.name
        ))),
        other => Err(LaunchConfigError::Validation(format!(
            "configuration {:?}: request must be 'launch' or 'attach', got {other:?}",
            cfg.name
        ))),
    }
}

/// Validate the whole file. Returns warnings; none of them prevent loading.
/// Compound references to unknown configuration names are reported here.
pub fn validate_launch_file(file: &LaunchFile) -> Vec<String> {
    let mut warnings = Vec::new();

    for (i, cfg) in file.configurations.iter().enumerate() {
        if let Err(e) = validate_configuration(cfg) {
            warnings.push(format!("configuration[{i}]: {e}"));
        }
    }

    let known: std::collections::HashSet<&str> =
        file.configurations.iter().map(|c| c.name.as_str()).collect();
    for (i, compound) in file.compounds.iter().enumerate() {
        if compound.name.is_empty() {
            warnings.push(format!("compound[{i}]: name is required"));
        }
        for member in &compound.configurations {
            if !known.contains(member.as_str()) {
                warnings.push(format!(
                    "compound {:?} references unknown configuration {member:?}",
                    compound.name
                ));
            }
        }
    }

    warnings
}
