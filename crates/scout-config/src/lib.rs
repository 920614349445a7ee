//! scout-config — server configuration and capability gating.
//!
//! Configuration controls the capability mode (readonly vs full), the
//! orthogonal permission flags (spawn, attach, modify, execute), safety
//! limits (session count and lifetime), and per-adapter paths and knobs.
//! Loaded from a JSON file; unknown keys are ignored so configs survive
//! across versions.

pub mod error;

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use error::ConfigError;

/// The level of debugging capability exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityMode {
    /// Only inspection tools.
    Readonly,
    /// All tools enabled.
    #[default]
    Full,
}

impl CapabilityMode {
    /// Parse a mode name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "readonly" => Some(Self::Readonly),
            "full" => Some(Self::Full),
            _ => None,
        }
    }
}

/// Delve (Go) adapter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DelveConfig {
    /// Path to the `dlv` binary.
    pub path: String,
    /// Extra build flags passed to `dlv dap`.
    pub build_flags: String,
}

impl Default for DelveConfig {
    fn default() -> Self {
        Self {
            path: "dlv".into(),
            build_flags: String::new(),
        }
    }
}

/// debugpy (Python) adapter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DebugpyConfig {
    /// Default Python interpreter used to run `debugpy.adapter`.
    pub python_path: String,
}

impl Default for DebugpyConfig {
    fn default() -> Self {
        Self {
            python_path: "python3".into(),
        }
    }
}

/// vscode-js-debug (Node/browser) adapter settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeConfig {
    /// Path to the `node` binary (default "node").
    pub node_path: String,
    /// Path to vscode-js-debug's dapDebugServer.js. Required for JS/TS.
    pub js_debug_path: String,
    /// Whether launched Node processes break on entry.
    pub inspect_brk: bool,
    /// Custom source-map path overrides for bundlers.
    pub source_map_path_overrides: std::collections::HashMap<String, String>,
}

/// lldb-dap adapter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LldbConfig {
    /// Path to the lldb-dap binary.
    pub path: String,
}

impl Default for LldbConfig {
    fn default() -> Self {
        Self {
            path: find_lldb_dap(),
        }
    }
}

/// GDB adapter settings (requires GDB 14.1+ for DAP support).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GdbConfig {
    /// Path to the gdb binary.
    pub path: String,
}

impl Default for GdbConfig {
    fn default() -> Self {
        Self { path: "gdb".into() }
    }
}

/// Per-driver adapter settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdapterConfigs {
    /// Go / Delve.
    pub go: DelveConfig,
    /// Python / debugpy.
    pub python: DebugpyConfig,
    /// JavaScript, TypeScript / vscode-js-debug.
    pub node: NodeConfig,
    /// C, C++, Rust / lldb-dap.
    pub lldb: LldbConfig,
    /// C, C++, Rust alternative / gdb.
    pub gdb: GdbConfig,
}

/// The server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Capability mode.
    pub mode: CapabilityMode,
    /// Whether spawning debug adapters is allowed.
    pub allow_spawn: bool,
    /// Whether attaching to processes is allowed.
    pub allow_attach: bool,
    /// Whether variable modification is allowed (full mode only).
    pub allow_modify: bool,
    /// Whether expression evaluation is allowed.
    pub allow_execute: bool,
    /// Maximum number of concurrent sessions.
    pub max_sessions: usize,
    /// Session lifetime in seconds before the sweep reaps it.
    pub session_timeout_secs: u64,
    /// Log verbosity ("trace" | "debug" | "info" | "warn" | "error").
    pub log_level: String,
    /// Per-adapter settings.
    pub adapters: AdapterConfigs,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: CapabilityMode::Full,
            allow_spawn: true,
            allow_attach: true,
            allow_modify: true,
            allow_execute: true,
            max_sessions: 10,
            session_timeout_secs: 30 * 60,
            log_level: "info".into(),
            adapters: AdapterConfigs::default(),
        }
    }
}

impl Config {
    /// Load configuration from an optional JSON file, falling back to
    /// defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    /// Parse a JSON configuration string. Unknown keys are ignored; missing
    /// keys take their defaults.
    pub fn from_json(data: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(data).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// The session lifetime as a [`Duration`].
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    /// Control tools (breakpoints, stepping, continue, ...) require full mode.
    pub fn can_use_control_tools(&self) -> bool {
        self.mode == CapabilityMode::Full
    }

    /// Whether spawning debug adapters is allowed.
    pub fn can_spawn(&self) -> bool {
        self.allow_spawn
    }

    /// Whether attaching to running processes is allowed.
    pub fn can_attach(&self) -> bool {
        self.allow_attach
    }

    /// Variable modification requires full mode and the modify flag.
    pub fn can_modify_variables(&self) -> bool {
        self.mode == CapabilityMode::Full && self.allow_modify
    }

    /// Whether expression evaluation is allowed.
    pub fn can_evaluate(&self) -> bool {
        self.allow_execute
    }
}

/// Convert a log level name (case-insensitive) to a tracing filter string.
/// Unrecognised values fall back to "info".
pub fn log_level_to_filter(level: &str) -> &'static str {
    match level.to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    }
}

/// Search for lldb-dap across PATH and well-known install locations.
///
/// Falls back to the bare name so a missing binary produces a clear spawn
/// error rather than a silent misconfiguration.
fn find_lldb_dap() -> String {
    if let Some(path) = which("lldb-dap") {
        return path;
    }

    let locations = [
        // macOS: Xcode command line tools, Xcode.app, Homebrew.
        "/Library/Developer/CommandLineTools/usr/bin/lldb-dap",
        "/Applications/Xcode.app/Contents/Developer/usr/bin/lldb-dap",
        "/opt/homebrew/bin/lldb-dap",
        "/usr/local/bin/lldb-dap",
        // Linux: LLVM packages, including versioned binaries.
        "/usr/bin/lldb-dap",
        "/usr/bin/lldb-dap-18",
        "/usr/bin/lldb-dap-17",
        "/usr/bin/lldb-dap-16",
        "/usr/lib/llvm-18/bin/lldb-dap",
        "/usr/lib/llvm-17/bin/lldb-dap",
        "/usr/lib/llvm-16/bin/lldb-dap",
    ];
    for loc in locations {
        if Path::new(loc).exists() {
            return loc.into();
        }
    }

    // Older name, pre-LLVM 16.
    if let Some(path) = which("lldb-vscode") {
        return path;
    }

    "lldb-dap".into()
}

/// Minimal PATH lookup.
fn which(name: &str) -> Option<String> {
    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate.to_string_lossy().into_owned());
        }
    }
    None
}
