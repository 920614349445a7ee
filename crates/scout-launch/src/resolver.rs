//! Configuration resolution: input validation, variable expansion, and
//! synthesis of adapter-ready launch/attach argument objects.

use serde_json::{json, Map, Value};

use crate::error::LaunchConfigError;
use crate::types::DebugConfiguration;
use crate::variables::{find_required_inputs, resolve_variables, ResolutionContext};

/// A fully resolved configuration ready for use.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfiguration {
    /// The configuration with every `${...}` expanded.
    pub config: DebugConfiguration,
    /// Derived debuggee language.
    pub language: String,
    /// Derived debug target for JS configurations (node, chrome, edge).
    pub target: String,
}

/// Collect the distinct `${input:}` ids referenced anywhere in the
/// configuration, including arrays, maps, and the extra bag.
pub fn find_all_required_inputs(cfg: &DebugConfiguration) -> Vec<String> {
    let value = serde_json::to_value(cfg).unwrap_or(Value::Null);
    let mut inputs = Vec::new();
    collect_inputs(&value, &mut inputs);
    inputs
}

fn collect_inputs(value: &Value, inputs: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            for id in find_required_inputs(s) {
                if !inputs.contains(&id) {
                    inputs.push(id);
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|v| collect_inputs(v, inputs)),
        Value::Object(map) => map.values().for_each(|v| collect_inputs(v, inputs)),
        _ => {}
    }
}

/// The `${input:}` ids the context does not supply.
pub fn missing_inputs(cfg: &DebugConfiguration, ctx: &ResolutionContext) -> Vec<String> {
    find_all_required_inputs(cfg)
        .into_iter()
        .filter(|id| !ctx.input_values.contains_key(id))
        .collect()
}

/// Resolve all variables in a configuration.
///
/// Inputs are validated up front so every missing `${input:}` id is
/// reported in one [`LaunchConfigError::MissingInputs`] rather than one at
/// a time. The original configuration is never mutated.
pub fn resolve_configuration(
    cfg: &DebugConfiguration,
    ctx: &ResolutionContext,
) -> Result<ResolvedConfiguration, LaunchConfigError> {
    let missing = missing_inputs(cfg, ctx);
    if !missing.is_empty() {
        return Err(LaunchConfigError::MissingInputs(missing));
    }

    let raw = serde_json::to_value(cfg)
        .map_err(|e| LaunchConfigError::Parse(format!("serialize configuration: {e}")))?;
    let resolved_value = resolve_value(raw, ctx)?;
    let config: DebugConfiguration = serde_json::from_value(resolved_value)
        .map_err(|e| LaunchConfigError::Parse(format!("reparse resolved configuration: {e}")))?;

    let language = config.language().to_string();
    let target = config.target().to_string();
    Ok(ResolvedConfiguration {
        config,
        language,
        target,
    })
}

/// Recursively expand variables in every string value (keys are left
/// untouched). Non-string scalars pass through unchanged.
fn resolve_value(value: Value, ctx: &ResolutionContext) -> Result<Value, LaunchConfigError> {
    match value {
        Value::String(s) => Ok(Value::String(resolve_variables(&s, ctx)?)),
        Value::Array(items) => items
            .into_iter()
            .map(|v| resolve_value(v, ctx))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k, resolve_value(v, ctx)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other),
    }
}

impl ResolvedConfiguration {
    /// Fold the configuration into a flat launch-argument object for the
    /// adapter. The interpreter is emitted under both `python` and
    /// `pythonPath` for debugpy compatibility.
    pub fn to_launch_args(&self) -> Value {
        let cfg = &self.config;
        let mut args = Map::new();

        if let Some(program) = &cfg.program {
            args.insert("program".into(), json!(program));
        }
        if let Some(cli_args) = &cfg.args {
            if !cli_args.is_empty() {
                args.insert("args".into(), json!(cli_args));
            }
        }
        if let Some(cwd) = &cfg.cwd {
            args.insert("cwd".into(), json!(cwd));
        }
        if let Some(env) = &cfg.env {
            args.insert("env".into(), json!(env));
        }
        args.insert("stopOnEntry".into(), json!(cfg.stop_on_entry.unwrap_or(false)));
        if let Some(console) = &cfg.console {
            args.insert("console".into(), json!(console));
        }

        // Browser fields.
        if let Some(url) = &cfg.url {
            args.insert("url".into(), json!(url));
        }
        if let Some(web_root) = &cfg.web_root {
            args.insert("webRoot".into(), json!(web_root));
        }

        // Node.js fields.
        if let Some(exe) = &cfg.runtime_executable {
            args.insert("runtimeExecutable".into(), json!(exe));
        }
        if let Some(runtime_args) = &cfg.runtime_args {
            if !runtime_args.is_empty() {
                args.insert("runtimeArgs".into(), json!(runtime_args));
            }
        }

        // Go / Delve fields.
        if let Some(mode) = &cfg.mode {
            args.insert("mode".into(), json!(mode));
        }
        if let Some(build_flags) = &cfg.build_flags {
            args.insert("buildFlags".into(), json!(build_flags));
        }

        // Python fields. `python` wins when both aliases are set.
        let interpreter = cfg.python.as_ref().or(cfg.python_path.as_ref());
        if let Some(interpreter) = interpreter {
            args.insert("python".into(), json!(interpreter));
            args.insert("pythonPath".into(), json!(interpreter));
        }
        if let Some(module) = &cfg.module {
            args.insert("module".into(), json!(module));
        }
        if let Some(just_my_code) = cfg.just_my_code {
            args.insert("justMyCode".into(), json!(just_my_code));
        }
        if cfg.django == Some(true) {
            args.insert("django".into(), json!(true));
        }
        if cfg.jinja == Some(true) {
            args.insert("jinja".into(), json!(true));
        }
        if cfg.redirect_output == Some(true) {
            args.insert("redirectOutput".into(), json!(true));
        }
        if let Some(path) = &cfg.debug_adapter_path {
            args.insert("debugAdapterPath".into(), json!(path));
        }

        // Native (LLDB/GDB) fields.
        if let Some(cmds) = &cfg.init_commands {
            args.insert("initCommands".into(), json!(cmds));
        }
        if let Some(cmds) = &cfg.pre_run_commands {
            args.insert("preRunCommands".into(), json!(cmds));
        }
        if let Some(cmds) = &cfg.stop_commands {
            args.insert("stopCommands".into(), json!(cmds));
        }
        if let Some(cmds) = &cfg.launch_commands {
            args.insert("launchCommands".into(), json!(cmds));
        }
        if let Some(source_map) = &cfg.source_map {
            args.insert("sourceMap".into(), json!(source_map));
        }
        if let Some(stop_at_main) = cfg.stop_at_beginning_of_main_subprogram {
            args.insert("stopAtBeginningOfMainSubprogram".into(), json!(stop_at_main));
        }

        // Source maps.
        if let Some(source_maps) = cfg.source_maps {
            args.insert("sourceMaps".into(), json!(source_maps));
        }
        if let Some(overrides) = &cfg.source_map_path_overrides {
            args.insert("sourceMapPathOverrides".into(), json!(overrides));
        }

        for (k, v) in &cfg.extra {
            args.insert(k.clone(), v.clone());
        }

        Value::Object(args)
    }

    /// Fold the configuration into a flat attach-argument object.
    pub fn to_attach_args(&self) -> Value {
        let cfg = &self.config;
        let mut args = Map::new();

        if let Some(host) = &cfg.host {
            args.insert("host".into(), json!(host));
        }
        if let Some(port) = cfg.port {
            args.insert("port".into(), json!(port));
        }
        if let Some(pid) = cfg.process_id {
            args.insert("pid".into(), json!(pid));
        }

        // Browser fields.
        if let Some(url) = &cfg.url {
            args.insert("url".into(), json!(url));
        }
        if let Some(web_root) = &cfg.web_root {
            args.insert("webRoot".into(), json!(web_root));
        }
        if !self.target.is_empty() {
            args.insert("target".into(), json!(self.target));
        } else if let Some(remote) = &cfg.target_remote {
            args.insert("target".into(), json!(remote));
        }

        // Native attach fields.
        if let Some(program) = &cfg.program {
            args.insert("program".into(), json!(program));
        }
        if let Some(wait_for) = cfg.wait_for {
            args.insert("waitFor".into(), json!(wait_for));
        }
        if let Some(core_file) = &cfg.core_file {
            args.insert("coreFile".into(), json!(core_file));
        }
        if let Some(cmds) = &cfg.attach_commands {
            args.insert("attachCommands".into(), json!(cmds));
        }

        if let Some(source_maps) = cfg.source_maps {
            args.insert("sourceMaps".into(), json!(source_maps));
        }
        if let Some(overrides) = &cfg.source_map_path_overrides {
            args.insert("sourceMapPathOverrides".into(), json!(overrides));
        }

        for (k, v) in &cfg.extra {
            args.insert(k.clone(), v.clone());
        }

        Value::Object(args)
    }
}

/// Apply ad-hoc overrides atop a configuration. Known keys replace the
/// typed fields; unknown keys are routed into the extra bag. The original
/// is deep-cloned, never mutated.
pub fn merge_overrides(
    cfg: &DebugConfiguration,
    overrides: &Map<String, Value>,
) -> DebugConfiguration {
    let mut result = cfg.clone();
    if overrides.is_empty() {
        return result;
    }

    for (key, value) in overrides {
        match key.as_str() {
            "program" => {
                if let Some(s) = value.as_str() {
                    result.program = Some(s.into());
                }
            }
            "args" => {
                if let Ok(args) = serde_json::from_value::<Vec<String>>(value.clone()) {
                    result.args = Some(args);
                }
            }
            "cwd" => {
                if let Some(s) = value.as_str() {
                    result.cwd = Some(s.into());
                }
            }
            "env" => {
                if let Ok(env) = serde_json::from_value(value.clone()) {
                    result.env = Some(env);
                }
            }
            "stopOnEntry" => {
                if let Some(b) = value.as_bool() {
                    result.stop_on_entry = Some(b);
                }
            }
            "webRoot" => {
                if let Some(s) = value.as_str() {
                    result.web_root = Some(s.into());
                }
            }
            "url" => {
                if let Some(s) = value.as_str() {
                    result.url = Some(s.into());
                }
            }
            _ => {
                result.extra.insert(key.clone(), value.clone());
            }
        }
    }

    result
}
