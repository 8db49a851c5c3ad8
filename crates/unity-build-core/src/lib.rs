//! Core types for Unity build orchestration
//!
//! Presets, invocations and groups describe what to build; the resolver turns
//! them into the option bit set and backend settings the editor consumes.

pub mod error;
pub mod flags;
pub mod preset;
pub mod resolver;
pub mod types;

pub use error::*;
pub use flags::{AndroidArchitecture, BuildOptions, ExtraFlags};
pub use preset::{BuildGroup, BuildInvocation, BuildPreset, Selection};
pub use resolver::{
    player_location, resolve, resolve_backend, resolve_options, target_directory, BackendConfig, ResolvedBuild,
    BUILDS_DIR,
};
pub use types::{
    AppleMobileArchitecture, BuildBehavior, BuildTarget, CodeGeneration, ManagedStrippingLevel,
    NativeCompilationMode, NativeConfiguration, ScriptingBackend,
};
