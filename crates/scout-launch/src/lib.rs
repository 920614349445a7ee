//! scout-launch — editor-style launch configuration support.
//!
//! Loads `launch.json` documents, expands `${...}` variable references, and
//! produces normalized launch/attach argument objects for the adapter
//! drivers. Unknown configuration keys round-trip through an extra bag so
//! adapter-vendor extensions are never lost.

pub mod error;
pub mod loader;
pub mod resolver;
pub mod types;
pub mod variables;

pub use error::LaunchConfigError;
pub use loader::{
    discover, find_compound, find_configuration, find_input, list_compounds,
    list_configurations, load_and_discover, load_from_path, validate_launch_file,
    workspace_folder, CompoundInfo, ConfigurationInfo,
};
pub use resolver::{merge_overrides, resolve_configuration, ResolvedConfiguration};
pub use types::{type_to_language, CompoundConfig, DebugConfiguration, InputConfig, LaunchFile};
pub use variables::{find_required_inputs, resolve_variables, ResolutionContext};
