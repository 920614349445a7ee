//! Launch configuration file structures.
//!
//! Mirrors the editor-conventional `launch.json` schema. Fields the server
//! understands are typed; everything else lands in the flattened `extra` map
//! so adapter-specific keys round-trip through a load/save cycle unchanged.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A `launch.json` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchFile {
    /// Schema version (e.g. "0.2.0").
    #[serde(default)]
    pub version: String,
    /// The debug configurations.
    #[serde(default)]
    pub configurations: Vec<DebugConfiguration>,
    /// Compound configurations launching several members together.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compounds: Vec<CompoundConfig>,
    /// User input variable definitions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<InputConfig>,
}

/// A single debug configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugConfiguration {
    /// Debugger identifier, e.g. "python", "go", "chrome", "lldb-dap".
    #[serde(rename = "type", default)]
    pub config_type: String,
    /// "launch" or "attach".
    #[serde(default)]
    pub request: String,
    /// Human-readable configuration name.
    #[serde(default)]
    pub name: String,

    // Common fields.
    /// The debuggee program.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    /// Command-line arguments for the debuggee.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    /// Working directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    /// Environment variables for the debuggee.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<HashMap<String, String>>,
    /// Stop at the entry point.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_on_entry: Option<bool>,
    /// Console kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub console: Option<String>,

    // Attach fields.
    /// Debug port for attach.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    /// Host for attach.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Process id for attach.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_id: Option<i64>,

    // Browser fields.
    /// URL for browser targets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Web root for source-map resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_root: Option<String>,

    // Node.js fields.
    /// Runtime executable (e.g. a package-manager shim).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_executable: Option<String>,
    /// Arguments for the runtime executable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_args: Option<Vec<String>>,

    // Go / Delve fields.
    /// Delve mode (default "debug").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Delve build flags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_flags: Option<String>,

    // LLDB / lldb-dap fields.
    /// Commands run before target creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init_commands: Option<Vec<String>>,
    /// Commands run before launch/attach.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_run_commands: Option<Vec<String>>,
    /// Commands run after each stop.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_commands: Option<Vec<String>>,
    /// Commands run when the program exits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_commands: Option<Vec<String>>,
    /// Custom attach commands.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attach_commands: Option<Vec<String>>,
    /// Custom launch commands.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_commands: Option<Vec<String>>,
    /// Core dump file for post-mortem debugging.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_file: Option<String>,
    /// Source path remapping pairs `[[from, to], ...]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_map: Option<Vec<Vec<String>>>,
    /// Wait for the process to launch before attaching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_for: Option<bool>,

    // GDB fields.
    /// Stop at the beginning of the main subprogram.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_at_beginning_of_main_subprogram: Option<bool>,
    /// MI mode for cppdbg ("gdb" or "lldb").
    #[serde(rename = "MIMode", default, skip_serializing_if = "Option::is_none")]
    pub mi_mode: Option<String>,
    /// Debugger path for cppdbg.
    #[serde(
        rename = "miDebuggerPath",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub mi_debugger_path: Option<String>,
    /// Remote target for gdbserver (e.g. "localhost:1234").
    #[serde(rename = "target", default, skip_serializing_if = "Option::is_none")]
    pub target_remote: Option<String>,

    // Python / debugpy fields.
    /// Python interpreter (editor style, preferred).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python: Option<String>,
    /// Python interpreter (debugpy legacy style).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python_path: Option<String>,
    /// Module to run instead of a program path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    /// Restrict stepping to user code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub just_my_code: Option<bool>,
    /// Enable Django template debugging.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub django: Option<bool>,
    /// Enable Jinja template debugging.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jinja: Option<bool>,
    /// Redirect debuggee output through the adapter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_output: Option<bool>,
    /// Explicit debug adapter path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_adapter_path: Option<String>,

    // Source maps.
    /// Enable source maps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_maps: Option<bool>,
    /// Source-map path overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_map_path_overrides: Option<HashMap<String, String>>,

    // Task integration.
    /// Task run before launch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_launch_task: Option<String>,
    /// Task run after the debug session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_debug_task: Option<String>,

    /// Presentation hints (opaque).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presentation: Option<serde_json::Value>,

    /// Every key the schema above does not name. Preserved across
    /// serialization so adapter-vendor extensions survive.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A compound configuration launching several members together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompoundConfig {
    /// The compound's name.
    #[serde(default)]
    pub name: String,
    /// Member configuration names.
    #[serde(default)]
    pub configurations: Vec<String>,
    /// Task run before launching the members.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_launch_task: Option<String>,
    /// Whether stopping any member stops all of them.
    #[serde(default)]
    pub stop_all: bool,
}

/// A user-input variable definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputConfig {
    /// Identifier referenced as `${input:id}`.
    pub id: String,
    /// Input kind: "promptString", "pickString", "command".
    #[serde(rename = "type", default)]
    pub input_type: String,
    /// Prompt shown to the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Choices for pickString inputs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// Command for command inputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

/// Map an editor debug `type` to a debuggee language identifier.
pub fn type_to_language(config_type: &str) -> &str {
    match config_type {
        "python" | "debugpy" => "python",
        "go" => "go",
        "node" | "pwa-node" => "javascript",
        "chrome" | "pwa-chrome" | "msedge" | "pwa-msedge" => "javascript",
        "lldb" | "lldb-dap" | "codelldb" => "c",
        "gdb" => "c",
        "cppdbg" => "cpp",
        other => other,
    }
}

impl DebugConfiguration {
    /// True when `request` is "launch".
    pub fn is_launch(&self) -> bool {
        self.request == "launch"
    }

    /// True when `request` is "attach".
    pub fn is_attach(&self) -> bool {
        self.request == "attach"
    }

    /// True when the type targets a browser (Chrome/Edge).
    pub fn is_browser_target(&self) -> bool {
        matches!(
            self.config_type.as_str(),
            "chrome" | "pwa-chrome" | "msedge" | "pwa-msedge"
        )
    }

    /// The debuggee language identifier for this configuration.
    pub fn language(&self) -> &str {
        type_to_language(&self.config_type)
    }

    /// The debug target kind (node, chrome, edge) for JS configurations.
    pub fn target(&self) -> &str {
        match self.config_type.as_str() {
            "chrome" | "pwa-chrome" => "chrome",
            "msedge" | "pwa-msedge" => "edge",
            "node" | "pwa-node" => "node",
            _ => "",
        }
    }

    /// True when the configuration targets a native language.
    pub fn is_native(&self) -> bool {
        matches!(
            self.config_type.as_str(),
            "lldb" | "lldb-dap" | "codelldb" | "gdb" | "cppdbg" | "c" | "cpp" | "rust"
        )
    }

    /// True when the configuration selects LLDB-based debugging.
    pub fn is_lldb_type(&self) -> bool {
        match self.config_type.as_str() {
            "lldb" | "lldb-dap" | "codelldb" => true,
            "cppdbg" => self.mi_mode.as_deref() == Some("lldb"),
            _ => false,
        }
    }

    /// True when the configuration selects GDB-based debugging.
    pub fn is_gdb_type(&self) -> bool {
        match self.config_type.as_str() {
            "gdb" => true,
            "cppdbg" => matches!(self.mi_mode.as_deref(), None | Some("") | Some("gdb")),
            _ => false,
        }
    }

    /// The preferred native debugger for this configuration: "lldb",
    /// "gdb", or "" for non-native types. Bare language types default
    /// to LLDB.
    pub fn native_debugger(&self) -> &'static str {
        if self.is_lldb_type() {
            return "lldb";
        }
        if self.is_gdb_type() {
            return "gdb";
        }
        match self.config_type.as_str() {
            "c" | "cpp" | "rust" => "lldb",
            _ => "",
        }
    }
}
