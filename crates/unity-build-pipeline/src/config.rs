//! Persisted build settings
//!
//! The settings file holds the preset list, the build groups, the toolbar
//! selection and the editor host configuration. It is stored as TOML.

use serde::{Deserialize, Serialize};
use crate::host::TestMode;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use unity_build_core::{
    BuildGroup, BuildInvocation, BuildPreset, BuildTarget, BuildToolError, CodeGeneration, ManagedStrippingLevel,
    NativeCompilationMode, Selection,
};

/// Default settings file name, relative to the project root
pub const DEFAULT_SETTINGS_FILE: &str = "build-tooling.toml";

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

impl From<ConfigError> for BuildToolError {
    fn from(error: ConfigError) -> Self {
        match error {
            ConfigError::MissingField(field) => {
                BuildToolError::configuration_with_field(format!("Missing required field: {}", field), field)
            }
            other => BuildToolError::configuration(other.to_string()),
        }
    }
}

/// Build presets, groups and the current selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildSettings {
    /// Player file name; blank falls back to the editor's product name
    #[serde(default)]
    pub app_name: String,

    /// Run the play mode tests before building
    #[serde(default = "default_true")]
    pub run_tests: bool,

    /// Delete the target folder and build cache before building
    #[serde(default = "default_true")]
    pub clean: bool,

    /// Reveal the built player in the file browser
    #[serde(default = "default_true")]
    pub show_folder: bool,

    #[serde(default)]
    pub selection: Selection,

    #[serde(default)]
    pub presets: Vec<BuildPreset>,

    #[serde(default)]
    pub groups: Vec<BuildGroup>,

    #[serde(default)]
    pub editor: EditorConfig,
}

fn default_true() -> bool {
    true
}

/// How to reach the editor when running outside of it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Editor executable
    pub executable: PathBuf,

    /// Project root; build output goes below `<project>/Builds`
    pub project_path: PathBuf,

    /// Static method the editor executes with the build request
    pub build_method: String,

    pub product_name: String,

    /// Platform the editor currently has active
    pub active_target: BuildTarget,

    /// Project-level scripting defines per target, comma separated
    #[serde(default)]
    pub defines: BTreeMap<String, String>,

    /// Scenes to include; empty means every scene below `Assets/`
    #[serde(default)]
    pub scenes: Vec<String>,

    /// Platforms with an installed support module; empty means all
    #[serde(default)]
    pub supported_targets: Vec<BuildTarget>,

    /// Where pending-state files live; defaults to the system temp folder
    #[serde(default)]
    pub handoff_dir: Option<PathBuf>,

    /// Test platform run before building
    #[serde(default)]
    pub test_mode: TestMode,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("Unity"),
            project_path: PathBuf::from("."),
            build_method: "BuildTooling.Editor.CommandLineBuild.Build".to_string(),
            product_name: "Game".to_string(),
            active_target: host_default_target(),
            defines: BTreeMap::new(),
            scenes: Vec::new(),
            supported_targets: Vec::new(),
            handoff_dir: None,
            test_mode: TestMode::default(),
        }
    }
}

/// Desktop player matching the machine we run on
fn host_default_target() -> BuildTarget {
    if cfg!(target_os = "windows") {
        BuildTarget::StandaloneWindows64
    } else if cfg!(target_os = "macos") {
        BuildTarget::StandaloneOsx
    } else {
        BuildTarget::StandaloneLinux64
    }
}

impl BuildSettings {
    /// The canonical Debug / Debug Native / Release / Release Native presets
    /// with the Debug, Release, Mono and IL2CPP groups built from them.
    pub fn default_for(active_target: BuildTarget) -> Self {
        let mut debug = BuildPreset::new("Debug", "Debug");
        debug.development_build = true;
        debug.allow_debugging = true;
        debug.defines = vec!["DEBUG".to_string()];

        let mut debug_native = BuildPreset::new("Debug Native", "DebugNative");
        debug_native.development_build = true;
        debug_native.allow_debugging = true;
        debug_native.defines = vec!["DEBUG".to_string()];
        debug_native.native_compilation = NativeCompilationMode::Debug;
        debug_native.incremental_native_build = true;
        debug_native.code_generation = CodeGeneration::OptimizeSize;

        let mut release = BuildPreset::new("Release", "Release");
        release.compress = true;
        release.defines = vec!["RELEASE".to_string()];
        release.managed_stripping_level = ManagedStrippingLevel::Low;
        release.app_bundle = true;

        let mut release_native = BuildPreset::new("Release Native", "ReleaseNative");
        release_native.compress = true;
        release_native.defines = vec!["RELEASE".to_string()];
        release_native.native_compilation = NativeCompilationMode::Master;
        release_native.code_generation = CodeGeneration::OptimizeSpeed;
        release_native.managed_stripping_level = ManagedStrippingLevel::Low;
        release_native.app_bundle = true;

        let pair = |name: &str, first: usize, second: usize| {
            BuildGroup::new(
                name,
                vec![
                    BuildInvocation::new(active_target, first),
                    BuildInvocation::new(active_target, second),
                ],
            )
        };

        let editor = EditorConfig {
            active_target,
            ..EditorConfig::default()
        };

        Self {
            app_name: String::new(),
            run_tests: true,
            clean: true,
            show_folder: true,
            selection: Selection::default(),
            presets: vec![debug, debug_native, release, release_native],
            groups: vec![pair("Debug", 0, 1), pair("Release", 2, 3), pair("Mono", 0, 2), pair("IL2CPP", 1, 3)],
            editor,
        }
    }

    /// Load settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::IoError(format!("Failed to read settings file {:?}: {}", path.as_ref(), e)))?;

        Self::from_str(&content)
    }

    /// Parse settings from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(content)
            .map_err(|e| ConfigError::ParseError(format!("Failed to parse TOML: {}", e)))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Load the settings file, writing the default bootstrap if it is missing
    pub fn load_or_create_default<P: AsRef<Path>>(path: P, active_target: BuildTarget) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            return Self::from_file(path);
        }

        log::info!("Unable to find build settings at {:?}, create new", path);
        let settings = Self::default_for(active_target);
        settings.save(path)?;
        Ok(settings)
    }

    /// Write the settings as TOML
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        self.validate()?;

        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(format!("Failed to serialize settings: {}", e)))?;

        if let Some(parent) = path.as_ref().parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::IoError(format!("Failed to create {:?}: {}", parent, e)))?;
        }

        std::fs::write(&path, content)
            .map_err(|e| ConfigError::IoError(format!("Failed to write settings file {:?}: {}", path.as_ref(), e)))
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.presets.is_empty() {
            return Err(ConfigError::MissingField("presets".to_string()));
        }

        if let Some(index) = self.presets.iter().position(|p| p.name.trim().is_empty()) {
            return Err(ConfigError::InvalidValue(format!("preset #{} has an empty name", index)));
        }

        if self.selection.preset >= self.presets.len() {
            return Err(ConfigError::InvalidValue(format!(
                "selection.preset {} is out of range ({} presets defined)",
                self.selection.preset,
                self.presets.len()
            )));
        }

        for group in &self.groups {
            group
                .validate(self.presets.len())
                .map_err(|e| ConfigError::InvalidValue(format!("group '{}': {}", group.name, e)))?;
        }

        Ok(())
    }

    /// Player file name used for builds; blank falls back to the product name
    pub fn effective_app_name<'a>(&'a self, product_name: &'a str) -> &'a str {
        if self.app_name.trim().is_empty() {
            product_name
        } else {
            &self.app_name
        }
    }

    pub fn group(&self, name: &str) -> Option<&BuildGroup> {
        self.groups.iter().find(|group| group.name == name)
    }

    /// Find a preset by name (case-insensitive) or by index
    pub fn preset_index(&self, key: &str) -> Option<usize> {
        self.presets
            .iter()
            .position(|preset| preset.name.eq_ignore_ascii_case(key.trim()))
            .or_else(|| key.trim().parse::<usize>().ok().filter(|index| *index < self.presets.len()))
    }

    /// Directory holding the pending-state files
    pub fn handoff_dir(&self) -> PathBuf {
        self.editor
            .handoff_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(crate::handoff::HANDOFF_DIR_NAME))
    }
}
