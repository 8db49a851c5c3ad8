//! Build presets, invocations, groups and the current selection

use crate::error::{BuildToolError, BuildToolResult};
use crate::flags::{AndroidArchitecture, ExtraFlags};
use crate::types::{
    AppleMobileArchitecture, BuildTarget, CodeGeneration, ManagedStrippingLevel, NativeCompilationMode,
};
use serde::{Deserialize, Serialize};

/// A named bundle of build configuration toggles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPreset {
    pub name: String,

    /// Sub path below `Builds/<target>`
    #[serde(default)]
    pub target_path: String,

    #[serde(default)]
    pub development_build: bool,

    #[serde(default)]
    pub allow_debugging: bool,

    #[serde(default)]
    pub compress: bool,

    #[serde(default)]
    pub native_compilation: NativeCompilationMode,

    #[serde(default)]
    pub incremental_native_build: bool,

    #[serde(default)]
    pub code_generation: CodeGeneration,

    #[serde(default)]
    pub managed_stripping_level: ManagedStrippingLevel,

    #[serde(default)]
    pub android_architecture: AndroidArchitecture,

    /// Package Android players as an app bundle instead of an APK
    #[serde(default)]
    pub app_bundle: bool,

    #[serde(default)]
    pub apple_architecture: AppleMobileArchitecture,

    /// Extra preprocessor defines, appended after the project's own
    #[serde(default)]
    pub defines: Vec<String>,
}

impl BuildPreset {
    /// Create a managed, non-development preset writing to `target_path`
    pub fn new<N: Into<String>, P: Into<String>>(name: N, target_path: P) -> Self {
        Self {
            name: name.into(),
            target_path: target_path.into(),
            development_build: false,
            allow_debugging: false,
            compress: false,
            native_compilation: NativeCompilationMode::Off,
            incremental_native_build: false,
            code_generation: CodeGeneration::OptimizeSpeed,
            managed_stripping_level: ManagedStrippingLevel::Disabled,
            android_architecture: AndroidArchitecture::all(),
            app_bundle: false,
            apple_architecture: AppleMobileArchitecture::Universal,
            defines: Vec::new(),
        }
    }

    pub fn is_native(&self) -> bool {
        self.native_compilation != NativeCompilationMode::Off
    }
}

/// One concrete build: a platform, a preset and the extra flags to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildInvocation {
    pub target: BuildTarget,

    /// Index into the preset list
    pub preset: usize,

    #[serde(default)]
    pub extra_flags: ExtraFlags,
}

impl BuildInvocation {
    pub fn new(target: BuildTarget, preset: usize) -> Self {
        Self {
            target,
            preset,
            extra_flags: ExtraFlags::empty(),
        }
    }

    pub fn with_extra_flags(mut self, extra_flags: ExtraFlags) -> Self {
        self.extra_flags = extra_flags;
        self
    }

    /// Look up the referenced preset
    pub fn preset_in<'a>(&self, presets: &'a [BuildPreset]) -> BuildToolResult<&'a BuildPreset> {
        presets
            .get(self.preset)
            .ok_or_else(|| BuildToolError::preset_index(self.preset, presets.len()))
    }
}

/// An ordered list of build invocations executed back-to-back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildGroup {
    pub name: String,
    pub items: Vec<BuildInvocation>,
}

impl BuildGroup {
    pub fn new<N: Into<String>>(name: N, items: Vec<BuildInvocation>) -> Self {
        Self {
            name: name.into(),
            items,
        }
    }

    /// Check that the group has items and every item references a known preset
    pub fn validate(&self, preset_count: usize) -> BuildToolResult<()> {
        if self.items.is_empty() {
            return Err(BuildToolError::empty_group(&self.name));
        }
        if let Some(item) = self.items.iter().find(|item| item.preset >= preset_count) {
            return Err(BuildToolError::preset_index(item.preset, preset_count));
        }
        Ok(())
    }
}

/// The toolbar's current choice of platform, preset and extra flags
///
/// The stored target only applies once the user picked one explicitly;
/// until then the editor's active platform is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub target: BuildTarget,

    #[serde(default)]
    pub target_overridden: bool,

    #[serde(default)]
    pub preset: usize,

    #[serde(default)]
    pub extra_flags: ExtraFlags,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            target: BuildTarget::NoTarget,
            target_overridden: false,
            preset: 0,
            extra_flags: ExtraFlags::empty(),
        }
    }
}

impl Selection {
    /// The platform a build of this selection goes to
    pub fn effective_target(&self, active: BuildTarget) -> BuildTarget {
        if self.target_overridden {
            self.target
        } else {
            active
        }
    }

    /// Pick a platform; picking the stored one again changes nothing
    pub fn set_target(&mut self, target: BuildTarget) {
        if self.target == target {
            return;
        }
        self.target = target;
        self.target_overridden = true;
    }

    /// Follow the editor's active platform again
    pub fn reset_target(&mut self) {
        self.target_overridden = false;
    }

    /// Snapshot the selection as a concrete invocation
    pub fn invocation(&self, active: BuildTarget) -> BuildInvocation {
        BuildInvocation {
            target: self.effective_target(active),
            preset: self.preset,
            extra_flags: self.extra_flags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_follows_active_target_until_overridden() {
        let mut selection = Selection::default();
        assert_eq!(selection.effective_target(BuildTarget::Android), BuildTarget::Android);

        selection.set_target(BuildTarget::StandaloneLinux64);
        assert!(selection.target_overridden);
        assert_eq!(selection.effective_target(BuildTarget::Android), BuildTarget::StandaloneLinux64);

        selection.reset_target();
        assert_eq!(selection.effective_target(BuildTarget::Ios), BuildTarget::Ios);
    }

    #[test]
    fn test_setting_same_target_keeps_override_state() {
        let mut selection = Selection::default();
        selection.set_target(BuildTarget::NoTarget);
        assert!(!selection.target_overridden);
    }

    #[test]
    fn test_invocation_snapshot() {
        let mut selection = Selection::default();
        selection.preset = 2;
        selection.extra_flags = ExtraFlags::STRICT_MODE;

        let invocation = selection.invocation(BuildTarget::WebGl);
        assert_eq!(invocation.target, BuildTarget::WebGl);
        assert_eq!(invocation.preset, 2);
        assert_eq!(invocation.extra_flags, ExtraFlags::STRICT_MODE);
    }

    #[test]
    fn test_group_validation() {
        let empty = BuildGroup::new("Empty", Vec::new());
        assert!(matches!(empty.validate(4), Err(BuildToolError::EmptyGroup { .. })));

        let group = BuildGroup::new(
            "Mixed",
            vec![BuildInvocation::new(BuildTarget::Android, 0), BuildInvocation::new(BuildTarget::Android, 5)],
        );
        assert!(matches!(group.validate(4), Err(BuildToolError::PresetIndex { index: 5, count: 4 })));
        assert!(group.validate(6).is_ok());
    }

    #[test]
    fn test_preset_lookup() {
        let presets = vec![BuildPreset::new("Debug", "Debug")];
        let invocation = BuildInvocation::new(BuildTarget::Switch, 0);
        assert_eq!(invocation.preset_in(&presets).unwrap().name, "Debug");

        let invocation = BuildInvocation::new(BuildTarget::Switch, 1);
        assert!(invocation.preset_in(&presets).is_err());
    }

    #[test]
    fn test_preset_defaults_when_fields_missing() {
        let preset: BuildPreset = toml::from_str("name = \"Bare\"").unwrap();
        assert_eq!(preset.native_compilation, NativeCompilationMode::Off);
        assert_eq!(preset.android_architecture, AndroidArchitecture::all());
        assert!(preset.defines.is_empty());
        assert!(!preset.is_native());
    }
}
