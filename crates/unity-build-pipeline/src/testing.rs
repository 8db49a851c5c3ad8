//! Testing utilities
//!
//! Mock editor, test runner and notifier that record every call, for
//! exercising the sequencer without an editor installation.

use crate::host::{BuildReport, BuildRequest, BuildResult, EditorHost, Notifier, TestExecutor, TestFilter};
use std::collections::HashMap;
use std::time::Duration;
use unity_build_core::{BuildTarget, BuildToolError, BuildToolResult};

/// Mock editor that records build requests
#[derive(Debug, Clone)]
pub struct MockEditorHost {
    pub product_name: String,
    pub active_target: BuildTarget,
    pub defines: HashMap<BuildTarget, String>,
    pub scenes: Vec<String>,
    pub unsupported: Vec<BuildTarget>,
    /// Result returned for every build
    pub result: BuildResult,
    /// Targets whose build returns an error instead of a report
    pub erroring_targets: Vec<BuildTarget>,
    pub requests: Vec<BuildRequest>,
    pub switches: Vec<BuildTarget>,
}

impl MockEditorHost {
    pub fn new(active_target: BuildTarget) -> Self {
        Self {
            product_name: "Game".to_string(),
            active_target,
            defines: HashMap::new(),
            scenes: vec!["Assets/Scenes/Main.unity".to_string()],
            unsupported: Vec::new(),
            result: BuildResult::Succeeded,
            erroring_targets: Vec::new(),
            requests: Vec::new(),
            switches: Vec::new(),
        }
    }

    pub fn with_result(mut self, result: BuildResult) -> Self {
        self.result = result;
        self
    }

    pub fn with_defines<S: Into<String>>(mut self, target: BuildTarget, defines: S) -> Self {
        self.defines.insert(target, defines.into());
        self
    }

    pub fn build_count(&self) -> usize {
        self.requests.len()
    }
}

impl EditorHost for MockEditorHost {
    fn product_name(&self) -> String {
        self.product_name.clone()
    }

    fn active_build_target(&self) -> BuildTarget {
        self.active_target
    }

    fn switch_active_build_target(&mut self, target: BuildTarget) -> BuildToolResult<()> {
        self.switches.push(target);
        self.active_target = target;
        Ok(())
    }

    fn scripting_defines(&self, target: BuildTarget) -> String {
        self.defines.get(&target).cloned().unwrap_or_default()
    }

    fn scenes(&self) -> BuildToolResult<Vec<String>> {
        Ok(self.scenes.clone())
    }

    fn is_build_target_supported(&self, target: BuildTarget) -> bool {
        !self.unsupported.contains(&target)
    }

    fn build_player(&mut self, request: &BuildRequest) -> BuildToolResult<BuildReport> {
        self.requests.push(request.clone());
        // a real build leaves the editor on the built platform
        self.active_target = request.target;

        if self.erroring_targets.contains(&request.target) {
            return Err(BuildToolError::build_for_target("editor crashed", request.target.as_str()));
        }

        Ok(BuildReport {
            result: self.result,
            duration: Duration::from_millis(10),
        })
    }
}

/// Mock test runner that counts started runs
#[derive(Debug, Clone, Default)]
pub struct MockTestExecutor {
    pub runs: Vec<TestFilter>,
    pub fail_to_start: bool,
}

impl MockTestExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            runs: Vec::new(),
            fail_to_start: true,
        }
    }
}

impl TestExecutor for MockTestExecutor {
    fn execute(&mut self, filter: &TestFilter) -> BuildToolResult<()> {
        if self.fail_to_start {
            return Err(BuildToolError::test("test runner unavailable"));
        }
        self.runs.push(filter.clone());
        Ok(())
    }
}

/// Mock notifier that records progress and acknowledgments
#[derive(Debug, Clone, Default)]
pub struct MockNotifier {
    pub progress: Vec<(String, String, f32)>,
    pub cleared: usize,
    pub acknowledgments: Vec<(String, String)>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Notifier for MockNotifier {
    fn progress(&mut self, title: &str, info: &str, fraction: f32) {
        self.progress.push((title.to_string(), info.to_string(), fraction));
    }

    fn clear_progress(&mut self) {
        self.cleared += 1;
    }

    fn acknowledge(&mut self, title: &str, message: &str) {
        self.acknowledgments.push((title.to_string(), message.to_string()));
    }
}
