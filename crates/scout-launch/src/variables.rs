//! `${...}` variable expansion for launch configurations.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::LaunchConfigError;

/// Context values available to variable resolution.
#[derive(Debug, Clone, Default)]
pub struct ResolutionContext {
    /// Root folder of the workspace.
    pub workspace_folder: String,
    /// Currently active file (for `${file}` and friends).
    pub current_file: String,
    /// Current line number (for `${lineNumber}`).
    pub line_number: i64,
    /// Currently selected text (for `${selectedText}`).
    pub selected_text: String,
    /// Values for `${input:}` variables.
    pub input_values: HashMap<String, String>,
    /// Overrides consulted before the process env for `${env:}`.
    pub env_overrides: HashMap<String, String>,
}

fn variable_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").unwrap())
}

/// Replace every `${...}` occurrence in `text`.
///
/// Expansion is idempotent on strings containing no `${...}`.
pub fn resolve_variables(text: &str, ctx: &ResolutionContext) -> Result<String, LaunchConfigError> {
    let pattern = variable_pattern();
    let mut result = String::with_capacity(text.len());
    let mut last_end = 0;

    for caps in pattern.captures_iter(text) {
        let whole = caps.get(0).unwrap();
        let expr = caps.get(1).unwrap().as_str();
        result.push_str(&text[last_end..whole.start()]);
        result.push_str(&resolve_variable(expr, ctx)?);
        last_end = whole.end();
    }
    result.push_str(&text[last_end..]);
    Ok(result)
}

/// Resolve a single variable expression (the text between `${` and `}`).
fn resolve_variable(expr: &str, ctx: &ResolutionContext) -> Result<String, LaunchConfigError> {
    let current_file = Path::new(&ctx.current_file);

    match expr {
        "workspaceFolder" => Ok(ctx.workspace_folder.clone()),
        "workspaceFolderBasename" => Ok(basename(Path::new(&ctx.workspace_folder))),
        "file" => Ok(ctx.current_file.clone()),
        "fileBasename" => Ok(basename(current_file)),
        "fileDirname" => Ok(dirname(current_file)),
        "fileBasenameNoExtension" => Ok(current_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()),
        "fileExtname" => Ok(current_file
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default()),
        "relativeFile" => Ok(relative_to(&ctx.current_file, &ctx.workspace_folder)),
        "relativeFileDirname" => {
            let dir = dirname(current_file);
            Ok(relative_to(&dir, &ctx.workspace_folder))
        }
        "lineNumber" => Ok(ctx.line_number.to_string()),
        "selectedText" => Ok(ctx.selected_text.clone()),
        "userHome" => std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| LaunchConfigError::Variable("failed to get user home".into())),
        "cwd" => std::env::current_dir()
            .map(|p| p.to_string_lossy().into_owned())
            .map_err(|e| LaunchConfigError::Variable(format!("failed to get cwd: {e}"))),
        "pathSeparator" => Ok(std::path::MAIN_SEPARATOR.to_string()),
        "execPath" => std::env::current_exe()
            .map(|p| p.to_string_lossy().into_owned())
            .map_err(|e| LaunchConfigError::Variable(format!("failed to get executable path: {e}"))),
        _ => {
            if let Some(name) = expr.strip_prefix("env:") {
                if let Some(value) = ctx.env_overrides.get(name) {
                    return Ok(value.clone());
                }
                return Ok(std::env::var(name).unwrap_or_default());
            }
            if let Some(setting_id) = expr.strip_prefix("config:") {
                return resolve_config_variable(setting_id, &ctx.workspace_folder);
            }
            if let Some(command_id) = expr.strip_prefix("command:") {
                return resolve_command_variable(command_id, ctx);
            }
            if let Some(input_id) = expr.strip_prefix("input:") {
                if let Some(value) = ctx.input_values.get(input_id) {
                    return Ok(value.clone());
                }
                return Err(LaunchConfigError::MissingInputs(vec![input_id.into()]));
            }
            Err(LaunchConfigError::Variable(format!(
                "unknown variable: ${{{expr}}}"
            )))
        }
    }
}

fn basename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn dirname(path: &Path) -> String {
    path.parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn relative_to(path: &str, base: &str) -> String {
    if base.is_empty() || path.is_empty() {
        return path.into();
    }
    Path::new(path)
        .strip_prefix(base)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| path.into())
}

/// Resolve `${config:dotted.name}` from the workspace's editor settings
/// file. A missing file or setting yields an empty string, matching what an
/// editor would substitute for an unset value.
fn resolve_config_variable(
    setting_id: &str,
    workspace_folder: &str,
) -> Result<String, LaunchConfigError> {
    if workspace_folder.is_empty() {
        return Err(LaunchConfigError::Variable(
            "workspaceFolder required for ${config:} variables".into(),
        ));
    }

    let settings_path = Path::new(workspace_folder).join(".vscode").join("settings.json");
    let Ok(data) = std::fs::read_to_string(&settings_path) else {
        return Ok(String::new());
    };

    let settings: serde_json::Value = serde_json::from_str(&data)
        .map_err(|e| LaunchConfigError::Variable(format!("failed to parse settings.json: {e}")))?;

    let mut current = &settings;
    for part in setting_id.split('.') {
        match current.get(part) {
            Some(next) => current = next,
            None => return Ok(String::new()),
        }
    }

    Ok(match current {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    })
}

/// Resolve `${command:id}`: known built-ins first, otherwise the id is run
/// as a shell command and its stdout substituted.
fn resolve_command_variable(
    command_id: &str,
    ctx: &ResolutionContext,
) -> Result<String, LaunchConfigError> {
    if command_id == "python.interpreterPath" {
        return Ok(find_python_path(&ctx.workspace_folder));
    }

    let mut cmd = std::process::Command::new("sh");
    cmd.arg("-c").arg(command_id);
    if !ctx.workspace_folder.is_empty() {
        cmd.current_dir(&ctx.workspace_folder);
    }

    let output = cmd
        .output()
        .map_err(|e| LaunchConfigError::Variable(format!("command {command_id:?} failed: {e}")))?;
    if !output.status.success() {
        return Err(LaunchConfigError::Variable(format!(
            "command {command_id:?} failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Locate a Python interpreter: workspace venv first, then the system.
fn find_python_path(workspace_folder: &str) -> String {
    if !workspace_folder.is_empty() {
        let candidates = ["venv/bin/python", "venv/bin/python3", ".venv/bin/python", ".venv/bin/python3"];
        for candidate in candidates {
            let path = PathBuf::from(workspace_folder).join(candidate);
            if path.exists() {
                return path.to_string_lossy().into_owned();
            }
        }
    }
    for name in ["python3", "python"] {
        if let Some(found) = lookup_path(name) {
            return found;
        }
    }
    "python3".into()
}

fn lookup_path(name: &str) -> Option<String> {
    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate.to_string_lossy().into_owned());
        }
    }
    None
}

/// Collect the distinct `${input:...}` ids referenced in a string.
pub fn find_required_inputs(text: &str) -> Vec<String> {
    let mut inputs = Vec::new();
    for caps in variable_pattern().captures_iter(text) {
        let expr = caps.get(1).unwrap().as_str();
        if let Some(id) = expr.strip_prefix("input:") {
            if !inputs.iter().any(|existing| existing == id) {
                inputs.push(id.to_string());
            }
        }
    }
    inputs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ResolutionContext {
        ResolutionContext {
            workspace_folder: "/home/dev/proj".into(),
            current_file: "/home/dev/proj/src/main.py".into(),
            line_number: 42,
            selected_text: "total".into(),
            input_values: HashMap::from([("port".to_string(), "8080".to_string())]),
            env_overrides: HashMap::from([("API_KEY".to_string(), "override".to_string())]),
        }
    }

    #[test]
    fn resolve_workspace_variables() {
        let ctx = ctx();
        assert_eq!(
            resolve_variables("${workspaceFolder}/bin", &ctx).unwrap(),
            "/home/dev/proj/bin"
        );
        assert_eq!(
            resolve_variables("${workspaceFolderBasename}", &ctx).unwrap(),
            "proj"
        );
    }

    #[test]
    fn resolve_file_variables() {
        let ctx = ctx();
        assert_eq!(resolve_variables("${file}", &ctx).unwrap(), "/home/dev/proj/src/main.py");
        assert_eq!(resolve_variables("${fileBasename}", &ctx).unwrap(), "main.py");
        assert_eq!(
            resolve_variables("${fileBasenameNoExtension}", &ctx).unwrap(),
            "main"
        );
        assert_eq!(resolve_variables("${fileExtname}", &ctx).unwrap(), ".py");
        assert_eq!(
            resolve_variables("${fileDirname}", &ctx).unwrap(),
            "/home/dev/proj/src"
        );
        assert_eq!(
            resolve_variables("${relativeFile}", &ctx).unwrap(),
            "src/main.py"
        );
        assert_eq!(
            resolve_variables("${relativeFileDirname}", &ctx).unwrap(),
            "src"
        );
    }

    #[test]
    fn resolve_position_variables() {
        let ctx = ctx();
        assert_eq!(resolve_variables("${lineNumber}", &ctx).unwrap(), "42");
        assert_eq!(resolve_variables("${selectedText}", &ctx).unwrap(), "total");
    }

    #[test]
    fn resolve_env_prefers_overrides() {
        let ctx = ctx();
        assert_eq!(resolve_variables("${env:API_KEY}", &ctx).unwrap(), "override");
    }

    #[test]
    fn resolve_env_falls_back_to_process_then_empty() {
        let ctx = ctx();
        std::env::set_var("SCOUT_TEST_VAR_XYZ", "from-process");
        assert_eq!(
            resolve_variables("${env:SCOUT_TEST_VAR_XYZ}", &ctx).unwrap(),
            "from-process"
        );
        std::env::remove_var("SCOUT_TEST_VAR_XYZ");
        assert_eq!(
            resolve_variables("${env:SCOUT_DEFINITELY_UNSET}", &ctx).unwrap(),
            ""
        );
    }

    #[test]
    fn resolve_input_values() {
        let ctx = ctx();
        assert_eq!(
            resolve_variables("localhost:${input:port}", &ctx).unwrap(),
            "localhost:8080"
        );
    }

    #[test]
    fn resolve_missing_input_errors() {
        let ctx = ctx();
        let err = resolve_variables("${input:token}", &ctx).unwrap_err();
        assert_eq!(err.missing_inputs().unwrap(), &["token".to_string()]);
    }

    #[test]
    fn resolve_unknown_variable_errors() {
        let ctx = ctx();
        let err = resolve_variables("${mystery}", &ctx).unwrap_err();
        assert!(err.to_string().contains("unknown variable"));
    }

    #[test]
    fn resolve_is_idempotent_without_variables() {
        let ctx = ctx();
        let plain = "no variables here at all";
        assert_eq!(resolve_variables(plain, &ctx).unwrap(), plain);
        assert_eq!(
            resolve_variables(&resolve_variables(plain, &ctx).unwrap(), &ctx).unwrap(),
            plain
        );
    }

    #[test]
    fn resolve_multiple_in_one_string() {
        let ctx = ctx();
        assert_eq!(
            resolve_variables("${workspaceFolder}:${lineNumber}", &ctx).unwrap(),
            "/home/dev/proj:42"
        );
    }

    #[test]
    fn resolve_config_reads_settings_json() {
        let tmp = tempfile::TempDir::new().unwrap();
        let vscode = tmp.path().join(".vscode");
        std::fs::create_dir_all(&vscode).unwrap();
        std::fs::write(
            vscode.join("settings.json"),
            r#"{"python": {"defaultInterpreterPath": "/usr/bin/python3.12"}, "editor": {"tabSize": 2}}"#,
        )
        .unwrap();

        let ctx = ResolutionContext {
            workspace_folder: tmp.path().to_string_lossy().into_owned(),
            ..Default::default()
        };
        assert_eq!(
            resolve_variables("${config:python.defaultInterpreterPath}", &ctx).unwrap(),
            "/usr/bin/python3.12"
        );
        assert_eq!(resolve_variables("${config:editor.tabSize}", &ctx).unwrap(), "2");
        // Unset settings become empty.
        assert_eq!(resolve_variables("${config:not.there}", &ctx).unwrap(), "");
    }

    #[test]
    #[cfg(unix)]
    fn resolve_command_captures_stdout() {
        let ctx = ResolutionContext::default();
        assert_eq!(
            resolve_variables("${command:echo hello}", &ctx).unwrap(),
            "hello"
        );
    }

    #[test]
    #[cfg(unix)]
    fn resolve_command_failure_errors() {
        let ctx = ResolutionContext::default();
        let err = resolve_variables("${command:false}", &ctx).unwrap_err();
        assert!(matches!(err, LaunchConfigError::Variable(_)));
    }

    #[test]
    fn find_required_inputs_dedupes() {
        let inputs =
            find_required_inputs("${input:port} ${input:host} ${input:port} ${env:HOME}");
        assert_eq!(inputs, vec!["port".to_string(), "host".to_string()]);
    }

    #[test]
    fn find_required_inputs_empty_when_none() {
        assert!(find_required_inputs("${workspaceFolder}/x").is_empty());
    }
}
