//! Collaborators provided by the editor hosting the build
//!
//! The sequencer never compiles or packages anything itself. It prepares a
//! [`BuildRequest`] and hands it to an [`EditorHost`]; test runs are started
//! through a [`TestExecutor`] and user-facing feedback goes to a [`Notifier`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use unity_build_core::{
    AndroidArchitecture, AppleMobileArchitecture, BackendConfig, BuildOptions, BuildTarget, BuildToolResult,
    ManagedStrippingLevel, ScriptingBackend,
};

/// Everything the editor needs for one player build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRequest {
    pub scenes: Vec<String>,
    pub target: BuildTarget,
    /// Output path of the player, including file name
    pub location: PathBuf,
    pub options: BuildOptions,
    /// Project defines followed by the preset's defines
    pub defines: Vec<String>,
    pub scripting_backend: ScriptingBackend,
    pub backend: Option<BackendConfig>,
    pub stripping_level: ManagedStrippingLevel,
    pub android_architecture: AndroidArchitecture,
    pub apple_architecture: AppleMobileArchitecture,
    pub app_bundle: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildResult {
    Succeeded,
    Failed,
    Cancelled,
    Unknown,
}

/// Summary the editor returns after a build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildReport {
    pub result: BuildResult,
    pub duration: Duration,
}

impl BuildReport {
    pub fn succeeded(&self) -> bool {
        self.result == BuildResult::Succeeded
    }
}

/// Which tests to run before building
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TestMode {
    #[default]
    PlayMode,
    EditMode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestFilter {
    pub mode: TestMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestStatus {
    Passed,
    Failed,
    Skipped,
    Inconclusive,
}

/// Result of a whole test run as reported by the test runner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRunSummary {
    pub status: TestStatus,
    pub passed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl TestRunSummary {
    pub fn new(status: TestStatus) -> Self {
        Self {
            status,
            passed: 0,
            skipped: 0,
            failed: 0,
        }
    }

    pub fn with_counts(mut self, passed: usize, skipped: usize, failed: usize) -> Self {
        self.passed = passed;
        self.skipped = skipped;
        self.failed = failed;
        self
    }

    /// Only an overall failure blocks the build
    pub fn is_failure(&self) -> bool {
        self.status == TestStatus::Failed
    }
}

/// The editor performing builds
pub trait EditorHost {
    /// Product name used when settings leave the app name blank
    fn product_name(&self) -> String;

    fn active_build_target(&self) -> BuildTarget;

    fn switch_active_build_target(&mut self, target: BuildTarget) -> BuildToolResult<()>;

    /// Project-level scripting defines for a target, comma separated
    fn scripting_defines(&self, target: BuildTarget) -> String;

    /// Scenes included in player builds
    fn scenes(&self) -> BuildToolResult<Vec<String>>;

    /// Whether the platform's support module is installed
    fn is_build_target_supported(&self, target: BuildTarget) -> bool;

    fn build_player(&mut self, request: &BuildRequest) -> BuildToolResult<BuildReport>;
}

/// Starts test runs; completion is reported back separately
pub trait TestExecutor {
    fn execute(&mut self, filter: &TestFilter) -> BuildToolResult<()>;
}

/// User-facing feedback: progress and blocking acknowledgments
pub trait Notifier {
    fn progress(&mut self, title: &str, info: &str, fraction: f32);

    fn clear_progress(&mut self);

    /// Show a message and wait until the user acknowledged it
    fn acknowledge(&mut self, title: &str, message: &str);
}
