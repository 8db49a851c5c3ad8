//! Error handling for build orchestration
//!
//! This module provides the error type shared by preset resolution, the
//! pending-state hand-off and the run sequencer.

use thiserror::Error;
use std::path::PathBuf;

/// Main error type for build tooling operations
#[derive(Error, Debug)]
pub enum BuildToolError {
    /// A value outside the closed set an operation accepts
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        message: String,
        argument: Option<String>,
    },

    /// Settings could not be read, parsed or validated
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },

    /// An invocation references a preset that does not exist
    #[error("Preset index {index} is out of range ({count} presets defined)")]
    PresetIndex {
        index: usize,
        count: usize,
    },

    /// A group without any build invocations
    #[error("Build group '{name}' has no items")]
    EmptyGroup {
        name: String,
    },

    /// A group name that is not defined in the settings
    #[error("Unknown build group: {name}")]
    UnknownGroup {
        name: String,
    },

    /// Pending-state files could not be written or read
    #[error("Hand-off error: {message}")]
    Handoff {
        message: String,
        path: Option<PathBuf>,
    },

    /// Tests reported success but nothing was pending
    #[error("Unable to find base or group file for build execution in {directory:?}")]
    MissingHandoff {
        directory: PathBuf,
    },

    /// The editor could not carry out a build request
    #[error("Build error: {message}")]
    Build {
        message: String,
        target: Option<String>,
    },

    /// The test runner could not be started
    #[error("Test error: {message}")]
    Test {
        message: String,
    },

    /// Any other failure reported by the editor host
    #[error("Host error: {message}")]
    Host {
        message: String,
    },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors
    #[error("Error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl BuildToolError {
    /// Create a new invalid-argument error
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument {
            message: message.into(),
            argument: None,
        }
    }

    /// Create an invalid-argument error naming the offending argument
    pub fn invalid_argument_named<S: Into<String>, A: Into<String>>(message: S, argument: A) -> Self {
        Self::InvalidArgument {
            message: message.into(),
            argument: Some(argument.into()),
        }
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
            field: None,
        }
    }

    /// Create a configuration error with field information
    pub fn configuration_with_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Configuration {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn preset_index(index: usize, count: usize) -> Self {
        Self::PresetIndex { index, count }
    }

    pub fn empty_group<S: Into<String>>(name: S) -> Self {
        Self::EmptyGroup { name: name.into() }
    }

    pub fn unknown_group<S: Into<String>>(name: S) -> Self {
        Self::UnknownGroup { name: name.into() }
    }

    /// Create a hand-off error for a specific file
    pub fn handoff<S: Into<String>, P: Into<PathBuf>>(message: S, path: P) -> Self {
        Self::Handoff {
            message: message.into(),
            path: Some(path.into()),
        }
    }

    pub fn missing_handoff<P: Into<PathBuf>>(directory: P) -> Self {
        Self::MissingHandoff {
            directory: directory.into(),
        }
    }

    /// Create a new build error
    pub fn build<S: Into<String>>(message: S) -> Self {
        Self::Build {
            message: message.into(),
            target: None,
        }
    }

    /// Create a build error for a specific target platform
    pub fn build_for_target<S: Into<String>, T: Into<String>>(message: S, target: T) -> Self {
        Self::Build {
            message: message.into(),
            target: Some(target.into()),
        }
    }

    pub fn test<S: Into<String>>(message: S) -> Self {
        Self::Test {
            message: message.into(),
        }
    }

    pub fn host<S: Into<String>>(message: S) -> Self {
        Self::Host {
            message: message.into(),
        }
    }

    /// Whether this error means the settings themselves are broken
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. }
                | Self::PresetIndex { .. }
                | Self::EmptyGroup { .. }
                | Self::UnknownGroup { .. }
                | Self::MissingHandoff { .. }
        )
    }
}

/// Result type for build tooling operations
pub type BuildToolResult<T> = Result<T, BuildToolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = BuildToolError::preset_index(7, 4);
        assert_eq!(err.to_string(), "Preset index 7 is out of range (4 presets defined)");

        let err = BuildToolError::empty_group("Nightly");
        assert_eq!(err.to_string(), "Build group 'Nightly' has no items");

        let err = BuildToolError::invalid_argument_named("unknown build behavior: 9", "behavior");
        assert!(matches!(err, BuildToolError::InvalidArgument { argument: Some(ref a), .. } if a == "behavior"));
    }

    #[test]
    fn test_configuration_classification() {
        assert!(BuildToolError::missing_handoff("/tmp/x").is_configuration_error());
        assert!(BuildToolError::unknown_group("Mono").is_configuration_error());
        assert!(!BuildToolError::build("linker failed").is_configuration_error());
        assert!(!BuildToolError::test("runner unavailable").is_configuration_error());
    }
}
