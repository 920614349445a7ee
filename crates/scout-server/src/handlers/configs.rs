//! Launch-configuration tools: config-based launch, listings, compounds.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use scout_dap::Language;
use scout_launch::{
    find_compound, find_configuration, list_compounds, list_configurations, load_and_discover,
    load_from_path, validate_launch_file, workspace_folder, LaunchFile, ResolutionContext,
    ResolvedConfiguration,
};

use crate::error::DebugError;
use crate::request::ToolRequest;
use crate::server::DebugServer;

/// Load the launch file named by `configPath`/`workspace` parameters.
fn load_launch_file(request: &ToolRequest) -> Result<(LaunchFile, PathBuf), DebugError> {
    if let Some(config_path) = request.opt_str("configPath") {
        let file = load_from_path(Path::new(config_path)).map_err(DebugError::from_launch_config)?;
        return Ok((file, PathBuf::from(config_path)));
    }
    if let Some(workspace) = request.opt_str("workspace") {
        return load_and_discover(Path::new(workspace)).map_err(DebugError::from_launch_config);
    }
    // Fall back to discovery from the server's working directory.
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    load_and_discover(&cwd).map_err(DebugError::from_launch_config)
}

fn parse_input_values(request: &ToolRequest) -> Result<HashMap<String, String>, DebugError> {
    Ok(request
        .json_str::<HashMap<String, String>>("inputValues", r#"{"port": "8080"}"#)?
        .unwrap_or_default())
}

impl DebugServer {
    /// Select the driver for a resolved configuration, honoring an explicit
    /// GDB preference; everything else goes through the language registry.
    fn adapter_for(
        &self,
        resolved: &ResolvedConfiguration,
    ) -> Result<std::sync::Arc<dyn scout_adapters::Adapter>, DebugError> {
        let language = Language::parse(&resolved.language)
            .ok_or_else(|| DebugError::adapter_not_supported(&resolved.language))?;
        if resolved.config.native_debugger() == "gdb" {
            return Ok(scout_adapters::Registry::gdb_adapter(self.config()));
        }
        self.registry()
            .get(language)
            .map_err(|_| DebugError::adapter_not_supported(&resolved.language))
    }

    /// Launch from a named launch.json configuration.
    pub(crate) async fn handle_config_launch(
        &self,
        request: &ToolRequest,
    ) -> Result<Value, DebugError> {
        let config_name = request.require_str("configName", "Provide the configuration name.")?;
        if request.opt_str("workspace").is_none() && request.opt_str("configPath").is_none() {
            return Err(DebugError::missing_parameter(
                "workspace",
                "Provide 'workspace' (directory to discover .vscode/launch.json from) or \
                 'configPath' (explicit path to the file) when using configName.",
            ));
        }

        let (file, config_path) = load_launch_file(request)?;
        let available: Vec<String> = file.configurations.iter().map(|c| c.name.clone()).collect();
        let cfg = find_configuration(&file, config_name)
            .map_err(|_| DebugError::config_not_found(config_name, &available))?;

        if !cfg.is_launch() {
            return Err(DebugError::config_invalid(format!(
                "configuration {config_name:?} is an attach configuration, use debug_attach instead"
            )));
        }

        let mut ctx = ResolutionContext {
            workspace_folder: request
                .opt_str("workspace")
                .map(Into::into)
                .unwrap_or_else(|| {
                    workspace_folder(&config_path).to_string_lossy().into_owned()
                }),
            input_values: parse_input_values(request)?,
            ..Default::default()
        };
        // A program override doubles as ${file} during resolution.
        if let Some(program) = request.opt_str("program") {
            ctx.current_file = program.into();
        }

        let resolved =
            scout_launch::resolve_configuration(cfg, &ctx).map_err(DebugError::from_launch_config)?;
        let adapter = self.adapter_for(&resolved)?;
        let language = Language::parse(&resolved.language)
            .ok_or_else(|| DebugError::adapter_not_supported(&resolved.language))?;

        let program = resolved.config.program.clone().unwrap_or_default();
        let mut args = resolved.to_launch_args();
        if !resolved.target.is_empty() {
            args["target"] = json!(resolved.target);
        }

        let (session_id, pid) = self
            .launch_session(language, adapter.as_ref(), &program, &args)
            .await?;

        let mut result = json!({
            "sessionId": session_id,
            "status": "launched",
            "language": language.as_str(),
            "program": program,
            "configName": config_name,
        });
        if let Some(pid) = pid {
            result["pid"] = json!(pid);
        }
        Ok(result)
    }

    /// List the configurations and compounds a launch.json offers.
    pub(crate) async fn handle_list_configs(
        &self,
        request: &ToolRequest,
    ) -> Result<Value, DebugError> {
        let (file, config_path) = load_launch_file(request)?;
        let warnings = validate_launch_file(&file);

        let mut result = json!({
            "configPath": config_path.to_string_lossy(),
            "configurations": list_configurations(&file),
        });
        if !file.compounds.is_empty() {
            result["compounds"] = json!(list_compounds(&file));
        }
        if !warnings.is_empty() {
            result["validationWarnings"] = json!(warnings);
        }
        Ok(result)
    }

    /// Launch every member of a compound configuration. Members launched
    /// before a failure are rolled back; stopAll compounds are tracked so
    /// terminating any member terminates the group.
    pub(crate) async fn handle_launch_compound(
        &self,
        request: &ToolRequest,
    ) -> Result<Value, DebugError> {
        let compound_name =
            request.require_str("compoundName", "Provide the compound configuration name.")?;
        let workspace = request.require_str(
            "workspace",
            "Provide the workspace directory; it is required for compound configurations.",
        )?;

        let (file, _config_path) = load_launch_file(request)?;
        let compound =
            find_compound(&file, compound_name).map_err(DebugError::from_launch_config)?;
        let input_values = parse_input_values(request)?;

        let mut session_ids: Vec<String> = Vec::new();
        let mut launch_results: Vec<Value> = Vec::new();

        for member_name in &compound.configurations {
            let member = match find_configuration(&file, member_name) {
                Ok(member) => member,
                Err(_) => {
                    self.rollback_sessions(&session_ids).await;
                    let available: Vec<String> =
                        file.configurations.iter().map(|c| c.name.clone()).collect();
                    return Err(DebugError::config_not_found(member_name, &available));
                }
            };

            let ctx = ResolutionContext {
                workspace_folder: workspace.into(),
                input_values: input_values.clone(),
                ..Default::default()
            };
            let resolved = match scout_launch::resolve_configuration(member, &ctx) {
                Ok(resolved) => resolved,
                Err(e) => {
                    self.rollback_sessions(&session_ids).await;
                    return Err(DebugError::from_launch_config(e));
                }
            };

            if !member.is_launch() {
                launch_results.push(json!({
                    "configName": member_name,
                    "status": "skipped",
                    "reason": "attach configurations are not supported in compounds",
                }));
                continue;
            }

            let Some(language) = Language::parse(&resolved.language) else {
                self.rollback_sessions(&session_ids).await;
                return Err(DebugError::adapter_not_supported(&resolved.language));
            };
            let adapter = match self.adapter_for(&resolved) {
                Ok(adapter) => adapter,
                Err(e) => {
                    self.rollback_sessions(&session_ids).await;
                    return Err(e);
                }
            };

            let program = resolved.config.program.clone().unwrap_or_default();
            let mut args = resolved.to_launch_args();
            if !resolved.target.is_empty() {
                args["target"] = json!(resolved.target);
            }

            match self
                .launch_session(language, adapter.as_ref(), &program, &args)
                .await
            {
                Ok((session_id, pid)) => {
                    session_ids.push(session_id.clone());
                    let mut entry = json!({
                        "configName": member_name,
                        "sessionId": session_id,
                        "status": "launched",
                    });
                    if let Some(pid) = pid {
                        entry["pid"] = json!(pid);
                    }
                    launch_results.push(entry);
                }
                Err(e) => {
                    self.rollback_sessions(&session_ids).await;
                    return Err(e
                        .with_detail("compoundName", json!(compound_name))
                        .with_detail("memberConfig", json!(member_name)));
                }
            }
        }

        if compound.stop_all && !session_ids.is_empty() {
            self.manager()
                .track_compound(compound_name, session_ids, compound.stop_all)
                .await;
        }

        Ok(json!({
            "compoundName": compound_name,
            "sessions": launch_results,
            "stopAll": compound.stop_all,
        }))
    }

    async fn rollback_sessions(&self, session_ids: &[String]) {
        for session_id in session_ids {
            if let Err(e) = self.manager().terminate(session_id, true).await {
                tracing::warn!(session = %session_id, "compound rollback: {e}");
            }
        }
    }
}
