//! Platform and build configuration enums
//!
//! These mirror the editor's own enumerations closely enough that a build
//! request can be handed to the editor without further translation.

use crate::error::{BuildToolError, BuildToolResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target platforms a player can be built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildTarget {
    #[serde(rename = "StandaloneOSX")]
    StandaloneOsx,
    StandaloneWindows,
    StandaloneWindows64,
    StandaloneLinux64,
    #[serde(rename = "iOS")]
    Ios,
    Android,
    #[serde(rename = "WebGL")]
    WebGl,
    #[serde(rename = "WSAPlayer")]
    WsaPlayer,
    #[serde(rename = "PS4")]
    Ps4,
    #[serde(rename = "PS5")]
    Ps5,
    XboxOne,
    GameCoreXboxOne,
    #[serde(rename = "tvOS")]
    TvOs,
    Switch,
    Lumin,
    Stadia,
    CloudRendering,
    EmbeddedLinux,
    NoTarget,
}

impl BuildTarget {
    /// Every platform, in the order the editor lists them
    pub const ALL: [BuildTarget; 19] = [
        BuildTarget::StandaloneOsx,
        BuildTarget::StandaloneWindows,
        BuildTarget::StandaloneWindows64,
        BuildTarget::StandaloneLinux64,
        BuildTarget::Ios,
        BuildTarget::Android,
        BuildTarget::WebGl,
        BuildTarget::WsaPlayer,
        BuildTarget::Ps4,
        BuildTarget::Ps5,
        BuildTarget::XboxOne,
        BuildTarget::GameCoreXboxOne,
        BuildTarget::TvOs,
        BuildTarget::Switch,
        BuildTarget::Lumin,
        BuildTarget::Stadia,
        BuildTarget::CloudRendering,
        BuildTarget::EmbeddedLinux,
        BuildTarget::NoTarget,
    ];

    /// The editor's identifier for this platform
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildTarget::StandaloneOsx => "StandaloneOSX",
            BuildTarget::StandaloneWindows => "StandaloneWindows",
            BuildTarget::StandaloneWindows64 => "StandaloneWindows64",
            BuildTarget::StandaloneLinux64 => "StandaloneLinux64",
            BuildTarget::Ios => "iOS",
            BuildTarget::Android => "Android",
            BuildTarget::WebGl => "WebGL",
            BuildTarget::WsaPlayer => "WSAPlayer",
            BuildTarget::Ps4 => "PS4",
            BuildTarget::Ps5 => "PS5",
            BuildTarget::XboxOne => "XboxOne",
            BuildTarget::GameCoreXboxOne => "GameCoreXboxOne",
            BuildTarget::TvOs => "tvOS",
            BuildTarget::Switch => "Switch",
            BuildTarget::Lumin => "Lumin",
            BuildTarget::Stadia => "Stadia",
            BuildTarget::CloudRendering => "CloudRendering",
            BuildTarget::EmbeddedLinux => "EmbeddedLinux",
            BuildTarget::NoTarget => "NoTarget",
        }
    }

    /// File extension of the built player, including the leading dot
    ///
    /// Android produces an app bundle (`.aab`) or a plain package (`.apk`);
    /// the Windows desktop players are executables; every other platform
    /// builds into a folder and gets no extension.
    pub fn player_extension(&self, app_bundle: bool) -> &'static str {
        match self {
            BuildTarget::StandaloneWindows | BuildTarget::StandaloneWindows64 => ".exe",
            BuildTarget::Android => {
                if app_bundle {
                    ".aab"
                } else {
                    ".apk"
                }
            }
            BuildTarget::StandaloneOsx
            | BuildTarget::StandaloneLinux64
            | BuildTarget::Ios
            | BuildTarget::WebGl
            | BuildTarget::WsaPlayer
            | BuildTarget::Ps4
            | BuildTarget::Ps5
            | BuildTarget::XboxOne
            | BuildTarget::GameCoreXboxOne
            | BuildTarget::TvOs
            | BuildTarget::Switch
            | BuildTarget::Lumin
            | BuildTarget::Stadia
            | BuildTarget::CloudRendering
            | BuildTarget::EmbeddedLinux
            | BuildTarget::NoTarget => "",
        }
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildTarget {
    type Err = BuildToolError;

    fn from_str(s: &str) -> BuildToolResult<Self> {
        BuildTarget::ALL
            .iter()
            .copied()
            .find(|target| target.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| BuildToolError::invalid_argument_named(format!("unknown build target: {}", s), "target"))
    }
}

/// What to do once the player is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildBehavior {
    BuildOnly,
    BuildAndRun,
    BuildScriptsOnly,
}

impl BuildBehavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildBehavior::BuildOnly => "BuildOnly",
            BuildBehavior::BuildAndRun => "BuildAndRun",
            BuildBehavior::BuildScriptsOnly => "BuildScriptsOnly",
        }
    }
}

impl fmt::Display for BuildBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<u8> for BuildBehavior {
    type Error = BuildToolError;

    fn try_from(value: u8) -> BuildToolResult<Self> {
        match value {
            0 => Ok(BuildBehavior::BuildOnly),
            1 => Ok(BuildBehavior::BuildAndRun),
            2 => Ok(BuildBehavior::BuildScriptsOnly),
            other => Err(BuildToolError::invalid_argument_named(
                format!("unknown build behavior: {}", other),
                "behavior",
            )),
        }
    }
}

impl FromStr for BuildBehavior {
    type Err = BuildToolError;

    fn from_str(s: &str) -> BuildToolResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buildonly" | "build-only" | "build" => Ok(BuildBehavior::BuildOnly),
            "buildandrun" | "build-and-run" | "run" => Ok(BuildBehavior::BuildAndRun),
            "buildscriptsonly" | "build-scripts-only" | "scripts" => Ok(BuildBehavior::BuildScriptsOnly),
            other => match other.parse::<u8>() {
                Ok(value) => BuildBehavior::try_from(value),
                Err(_) => Err(BuildToolError::invalid_argument_named(
                    format!("unknown build behavior: {}", s),
                    "behavior",
                )),
            },
        }
    }
}

/// Native (IL2CPP) compilation mode of a preset; `Off` keeps the managed backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NativeCompilationMode {
    #[default]
    Off,
    Debug,
    Release,
    Master,
}

/// Compiler configuration handed to the native backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NativeConfiguration {
    Debug,
    Release,
    Master,
}

/// Scripting backend the editor is switched to before a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScriptingBackend {
    Mono,
    #[serde(rename = "IL2CPP")]
    Il2Cpp,
}

/// Code generation optimization hint for native builds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CodeGeneration {
    #[default]
    OptimizeSpeed,
    OptimizeSize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ManagedStrippingLevel {
    #[default]
    Disabled,
    Minimal,
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AppleMobileArchitecture {
    #[serde(rename = "ARMv7")]
    Armv7,
    #[serde(rename = "ARM64")]
    Arm64,
    #[default]
    Universal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_extensions() {
        assert_eq!(BuildTarget::StandaloneWindows.player_extension(false), ".exe");
        assert_eq!(BuildTarget::StandaloneWindows64.player_extension(true), ".exe");
        assert_eq!(BuildTarget::Android.player_extension(true), ".aab");
        assert_eq!(BuildTarget::Android.player_extension(false), ".apk");
        assert_eq!(BuildTarget::StandaloneOsx.player_extension(false), "");
        assert_eq!(BuildTarget::WebGl.player_extension(true), "");
    }

    #[test]
    fn test_target_names_round_trip_through_from_str() {
        for target in BuildTarget::ALL {
            assert_eq!(target.as_str().parse::<BuildTarget>().unwrap(), target);
        }
        assert_eq!("ios".parse::<BuildTarget>().unwrap(), BuildTarget::Ios);
        assert!("Dreamcast".parse::<BuildTarget>().is_err());
    }

    #[test]
    fn test_target_serializes_as_editor_identifier() {
        let json = serde_json::to_string(&BuildTarget::TvOs).unwrap();
        assert_eq!(json, "\"tvOS\"");
        let target: BuildTarget = serde_json::from_str("\"StandaloneOSX\"").unwrap();
        assert_eq!(target, BuildTarget::StandaloneOsx);
    }

    #[test]
    fn test_behavior_parsing() {
        assert_eq!("run".parse::<BuildBehavior>().unwrap(), BuildBehavior::BuildAndRun);
        assert_eq!("BuildScriptsOnly".parse::<BuildBehavior>().unwrap(), BuildBehavior::BuildScriptsOnly);
        assert_eq!("0".parse::<BuildBehavior>().unwrap(), BuildBehavior::BuildOnly);
        assert_eq!(BuildBehavior::try_from(2).unwrap(), BuildBehavior::BuildScriptsOnly);
    }

    #[test]
    fn test_unknown_behavior_is_invalid_argument() {
        let err = BuildBehavior::try_from(3).unwrap_err();
        assert!(matches!(err, BuildToolError::InvalidArgument { .. }));

        let err = "deploy".parse::<BuildBehavior>().unwrap_err();
        assert!(matches!(err, BuildToolError::InvalidArgument { .. }));
    }
}
