//! Translation of a preset into player build options
//!
//! Resolution is a pure function of its inputs: each option bit is gated by
//! exactly one input condition and the bits are OR-ed together.

use crate::flags::{BuildOptions, ExtraFlags};
use crate::preset::BuildPreset;
use crate::types::{
    BuildBehavior, BuildTarget, CodeGeneration, NativeCompilationMode, NativeConfiguration, ScriptingBackend,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root folder all players are written to
pub const BUILDS_DIR: &str = "Builds";

/// Native backend settings applied before a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub configuration: NativeConfiguration,
    pub incremental: bool,
    pub code_generation: CodeGeneration,
}

/// Options and backend settings for one build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedBuild {
    pub options: BuildOptions,
    /// `None` keeps the managed backend
    pub backend: Option<BackendConfig>,
}

impl ResolvedBuild {
    pub fn scripting_backend(&self) -> ScriptingBackend {
        match self.backend {
            Some(_) => ScriptingBackend::Il2Cpp,
            None => ScriptingBackend::Mono,
        }
    }
}

/// Resolve build options and backend settings for a preset
pub fn resolve(
    preset: &BuildPreset,
    extra_flags: ExtraFlags,
    behavior: BuildBehavior,
    clean: bool,
    show_folder: bool,
) -> ResolvedBuild {
    let resolved = ResolvedBuild {
        options: resolve_options(preset, extra_flags, behavior, clean, show_folder),
        backend: resolve_backend(preset),
    };

    log::debug!(
        "Resolved preset '{}' ({}): options {:#x}, backend {:?}",
        preset.name,
        behavior,
        resolved.options.bits(),
        resolved.scripting_backend()
    );
    resolved
}

/// Compute the option bit set for a preset invocation
pub fn resolve_options(
    preset: &BuildPreset,
    extra_flags: ExtraFlags,
    behavior: BuildBehavior,
    clean: bool,
    show_folder: bool,
) -> BuildOptions {
    let mut options = BuildOptions::empty();

    options.set(BuildOptions::COMPRESS_WITH_LZ4_HC, preset.compress);
    options.set(BuildOptions::ALLOW_DEBUGGING, preset.allow_debugging);
    options.set(BuildOptions::DEVELOPMENT, preset.development_build);

    options |= extra_options(extra_flags);

    options.set(BuildOptions::SHOW_BUILT_PLAYER, show_folder);

    options |= match behavior {
        BuildBehavior::BuildOnly => BuildOptions::empty(),
        BuildBehavior::BuildAndRun => BuildOptions::AUTO_RUN_PLAYER,
        BuildBehavior::BuildScriptsOnly => BuildOptions::BUILD_SCRIPTS_ONLY,
    };

    options.set(BuildOptions::CLEAN_BUILD_CACHE, clean);

    options
}

/// Map extra flags onto build options
///
/// The profiler flag turns on both profiler connection and deep profiling.
pub fn extra_options(extra_flags: ExtraFlags) -> BuildOptions {
    const MAPPING: [(ExtraFlags, BuildOptions); 7] = [
        (ExtraFlags::CODE_COVERAGE, BuildOptions::ENABLE_CODE_COVERAGE),
        (
            ExtraFlags::USE_PROFILER,
            BuildOptions::CONNECT_WITH_PROFILER.union(BuildOptions::ENABLE_DEEP_PROFILING_SUPPORT),
        ),
        (ExtraFlags::STRICT_MODE, BuildOptions::STRICT_MODE),
        (ExtraFlags::WAIT_FOR_CONNECTION, BuildOptions::WAIT_FOR_PLAYER_CONNECTION),
        (ExtraFlags::CONNECT_TO_HOST, BuildOptions::CONNECT_TO_HOST),
        (ExtraFlags::DETAILED_REPORT, BuildOptions::DETAILED_BUILD_REPORT),
        (ExtraFlags::SYMLINK_SOURCES, BuildOptions::SYMLINK_SOURCES),
    ];

    let mut options = BuildOptions::empty();
    for (flag, mapped) in MAPPING {
        options.set(mapped, extra_flags.contains(flag));
    }
    options
}

/// Native backend settings, or `None` for managed builds
pub fn resolve_backend(preset: &BuildPreset) -> Option<BackendConfig> {
    let configuration = match preset.native_compilation {
        NativeCompilationMode::Off => return None,
        NativeCompilationMode::Debug => NativeConfiguration::Debug,
        NativeCompilationMode::Release => NativeConfiguration::Release,
        NativeCompilationMode::Master => NativeConfiguration::Master,
    };

    Some(BackendConfig {
        configuration,
        incremental: preset.incremental_native_build,
        code_generation: preset.code_generation,
    })
}

/// `<root>/Builds/<target>/<preset target path>`
pub fn target_directory(root: &Path, target: BuildTarget, preset: &BuildPreset) -> PathBuf {
    let mut dir = root.join(BUILDS_DIR).join(target.as_str());
    if !preset.target_path.trim().is_empty() {
        dir.push(preset.target_path.trim());
    }
    dir
}

/// Full path of the built player: target directory plus app name and extension
pub fn player_location(root: &Path, target: BuildTarget, preset: &BuildPreset, app_name: &str) -> PathBuf {
    let file_name = format!("{}{}", app_name, target.player_extension(preset.app_bundle));
    target_directory(root, target, preset).join(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preset() -> BuildPreset {
        BuildPreset::new("Plain", "Plain")
    }

    const ALL_BEHAVIORS: [BuildBehavior; 3] =
        [BuildBehavior::BuildOnly, BuildBehavior::BuildAndRun, BuildBehavior::BuildScriptsOnly];

    #[test]
    fn test_profiler_scenario() {
        let mut preset = preset();
        preset.compress = true;
        preset.allow_debugging = false;
        preset.development_build = true;

        let resolved = resolve(&preset, ExtraFlags::USE_PROFILER, BuildBehavior::BuildAndRun, true, false);

        assert_eq!(
            resolved.options,
            BuildOptions::COMPRESS_WITH_LZ4_HC
                | BuildOptions::DEVELOPMENT
                | BuildOptions::CONNECT_WITH_PROFILER
                | BuildOptions::ENABLE_DEEP_PROFILING_SUPPORT
                | BuildOptions::AUTO_RUN_PLAYER
                | BuildOptions::CLEAN_BUILD_CACHE
        );
        assert!(resolved.backend.is_none());
        assert_eq!(resolved.scripting_backend(), ScriptingBackend::Mono);
    }

    #[test]
    fn test_backend_follows_native_mode() {
        let mut preset = preset();
        assert_eq!(resolve_backend(&preset), None);

        for (mode, expected) in [
            (NativeCompilationMode::Debug, NativeConfiguration::Debug),
            (NativeCompilationMode::Release, NativeConfiguration::Release),
            (NativeCompilationMode::Master, NativeConfiguration::Master),
        ] {
            preset.native_compilation = mode;
            preset.incremental_native_build = true;
            preset.code_generation = CodeGeneration::OptimizeSize;

            let backend = resolve_backend(&preset).unwrap();
            assert_eq!(backend.configuration, expected);
            assert!(backend.incremental);
            assert_eq!(backend.code_generation, CodeGeneration::OptimizeSize);
        }
    }

    #[test]
    fn test_every_extra_flag_combination() {
        let preset = preset();

        for bits in 0..=ExtraFlags::all().bits() {
            let Some(flags) = ExtraFlags::from_bits(bits) else {
                continue;
            };
            let options = resolve_options(&preset, flags, BuildBehavior::BuildOnly, false, false);

            assert_eq!(options.contains(BuildOptions::ENABLE_CODE_COVERAGE), flags.contains(ExtraFlags::CODE_COVERAGE));
            assert_eq!(options.contains(BuildOptions::STRICT_MODE), flags.contains(ExtraFlags::STRICT_MODE));
            assert_eq!(
                options.contains(BuildOptions::WAIT_FOR_PLAYER_CONNECTION),
                flags.contains(ExtraFlags::WAIT_FOR_CONNECTION)
            );
            assert_eq!(options.contains(BuildOptions::CONNECT_TO_HOST), flags.contains(ExtraFlags::CONNECT_TO_HOST));
            assert_eq!(
                options.contains(BuildOptions::DETAILED_BUILD_REPORT),
                flags.contains(ExtraFlags::DETAILED_REPORT)
            );
            assert_eq!(options.contains(BuildOptions::SYMLINK_SOURCES), flags.contains(ExtraFlags::SYMLINK_SOURCES));

            let profiler = BuildOptions::CONNECT_WITH_PROFILER | BuildOptions::ENABLE_DEEP_PROFILING_SUPPORT;
            if flags.contains(ExtraFlags::USE_PROFILER) {
                assert!(options.contains(profiler));
            } else {
                assert!(!options.intersects(profiler));
            }

            let expected_bits = flags.iter().count() + usize::from(flags.contains(ExtraFlags::USE_PROFILER));
            assert_eq!(options.iter().count(), expected_bits);
        }
    }

    #[test]
    fn test_behavior_adds_at_most_one_option() {
        let preset = preset();
        let base = resolve_options(&preset, ExtraFlags::empty(), BuildBehavior::BuildOnly, false, false);
        assert!(base.is_empty());

        let run = resolve_options(&preset, ExtraFlags::empty(), BuildBehavior::BuildAndRun, false, false);
        assert_eq!(run, BuildOptions::AUTO_RUN_PLAYER);

        let scripts = resolve_options(&preset, ExtraFlags::empty(), BuildBehavior::BuildScriptsOnly, false, false);
        assert_eq!(scripts, BuildOptions::BUILD_SCRIPTS_ONLY);
    }

    #[test]
    fn test_toggles_map_to_single_options() {
        let mut preset = preset();
        preset.allow_debugging = true;

        for behavior in ALL_BEHAVIORS {
            let options = resolve_options(&preset, ExtraFlags::empty(), behavior, false, true);
            assert!(options.contains(BuildOptions::ALLOW_DEBUGGING | BuildOptions::SHOW_BUILT_PLAYER));
            assert!(!options.contains(BuildOptions::CLEAN_BUILD_CACHE));
            assert!(!options.contains(BuildOptions::COMPRESS_WITH_LZ4_HC));
        }
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let mut preset = preset();
        preset.native_compilation = NativeCompilationMode::Release;
        let flags = ExtraFlags::DETAILED_REPORT | ExtraFlags::CONNECT_TO_HOST;

        for behavior in ALL_BEHAVIORS {
            let first = resolve(&preset, flags, behavior, true, true);
            let second = resolve(&preset, flags, behavior, true, true);
            assert_eq!(first, second);
            assert_eq!(first.options.bits(), second.options.bits());
        }
    }

    #[test]
    fn test_output_paths() {
        let root = Path::new("/project");
        let mut preset = BuildPreset::new("Release", "Release");

        assert_eq!(
            target_directory(root, BuildTarget::StandaloneWindows64, &preset),
            PathBuf::from("/project/Builds/StandaloneWindows64/Release")
        );
        assert_eq!(
            player_location(root, BuildTarget::StandaloneWindows64, &preset, "Game"),
            PathBuf::from("/project/Builds/StandaloneWindows64/Release/Game.exe")
        );

        preset.app_bundle = true;
        assert_eq!(
            player_location(root, BuildTarget::Android, &preset, "Game"),
            PathBuf::from("/project/Builds/Android/Release/Game.aab")
        );

        preset.target_path.clear();
        assert_eq!(
            player_location(root, BuildTarget::Ios, &preset, "Game"),
            PathBuf::from("/project/Builds/iOS/Game")
        );
    }
}
