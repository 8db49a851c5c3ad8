//! Editor host backed by the editor's batch mode
//!
//! Builds run the editor executable with `-executeMethod` and pass the
//! serialized [`BuildRequest`] by path. Test runs are spawned in the
//! background; their completion is picked up with [`ProcessTestExecutor::wait`].

use crate::config::EditorConfig;
use crate::host::{BuildReport, BuildRequest, BuildResult, EditorHost, TestExecutor, TestFilter, TestMode, TestRunSummary, TestStatus};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;
use unity_build_core::{BuildTarget, BuildToolError, BuildToolResult};
use walkdir::WalkDir;

const REQUEST_FILENAME: &str = "request.json";
const TEST_RESULTS_FILENAME: &str = "test-results.xml";

/// Talks to the editor through its command line
#[derive(Debug, Clone)]
pub struct ProcessEditorHost {
    config: EditorConfig,
    active_target: BuildTarget,
    work_dir: PathBuf,
}

impl ProcessEditorHost {
    /// `work_dir` receives the serialized build request
    pub fn new<P: Into<PathBuf>>(config: EditorConfig, work_dir: P) -> Self {
        Self {
            active_target: config.active_target,
            config,
            work_dir: work_dir.into(),
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    fn request_path(&self) -> PathBuf {
        self.work_dir.join(REQUEST_FILENAME)
    }

    /// Build the editor command line for a request file
    fn build_command(&self, request: &BuildRequest, request_path: &Path) -> Command {
        let mut cmd = Command::new(&self.config.executable);

        cmd.arg("-batchmode")
            .arg("-quit")
            .arg("-projectPath")
            .arg(&self.config.project_path)
            .arg("-buildTarget")
            .arg(request.target.as_str())
            .arg("-executeMethod")
            .arg(&self.config.build_method)
            .arg("-buildRequest")
            .arg(request_path)
            .arg("-logFile")
            .arg("-");

        cmd
    }
}

impl EditorHost for ProcessEditorHost {
    fn product_name(&self) -> String {
        self.config.product_name.clone()
    }

    fn active_build_target(&self) -> BuildTarget {
        self.active_target
    }

    fn switch_active_build_target(&mut self, target: BuildTarget) -> BuildToolResult<()> {
        self.active_target = target;
        Ok(())
    }

    fn scripting_defines(&self, target: BuildTarget) -> String {
        self.config.defines.get(target.as_str()).cloned().unwrap_or_default()
    }

    fn scenes(&self) -> BuildToolResult<Vec<String>> {
        if !self.config.scenes.is_empty() {
            return Ok(self.config.scenes.clone());
        }
        discover_scenes(&self.config.project_path)
    }

    fn is_build_target_supported(&self, target: BuildTarget) -> bool {
        self.config.supported_targets.is_empty() || self.config.supported_targets.contains(&target)
    }

    fn build_player(&mut self, request: &BuildRequest) -> BuildToolResult<BuildReport> {
        let start_time = Instant::now();

        fs::create_dir_all(&self.work_dir)?;
        let request_path = self.request_path();
        fs::write(&request_path, serde_json::to_string_pretty(request)?)?;

        let mut cmd = self.build_command(request, &request_path);
        cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());

        log::debug!("Executing editor command: {:?}", cmd);

        let status = cmd.status().map_err(|e| {
            BuildToolError::build_for_target(
                format!("Failed to execute {:?}: {}", self.config.executable, e),
                request.target.as_str(),
            )
        })?;

        self.active_target = request.target;

        let result = if status.success() {
            BuildResult::Succeeded
        } else {
            log::debug!("Editor exited with {}", status);
            BuildResult::Failed
        };

        Ok(BuildReport {
            result,
            duration: start_time.elapsed(),
        })
    }
}

/// Every `*.unity` scene below `Assets/`, as project-relative paths
pub fn discover_scenes(project_path: &Path) -> BuildToolResult<Vec<String>> {
    let assets = project_path.join("Assets");
    if !assets.exists() {
        return Ok(Vec::new());
    }

    let mut scenes = Vec::new();
    for entry in WalkDir::new(&assets).sort_by_file_name() {
        let entry = entry.map_err(|e| BuildToolError::host(format!("Failed to scan {:?}: {}", assets, e)))?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "unity") {
            let relative = path.strip_prefix(project_path).unwrap_or(path);
            let components: Vec<String> = relative
                .components()
                .map(|component| component.as_os_str().to_string_lossy().into_owned())
                .collect();
            scenes.push(components.join("/"));
        }
    }

    Ok(scenes)
}

/// Runs the editor's test runner in a background process
///
/// The process is spawned through `tokio::process`, so [`TestExecutor::execute`]
/// must be called from within a Tokio runtime.
#[derive(Debug)]
pub struct ProcessTestExecutor {
    executable: PathBuf,
    project_path: PathBuf,
    results_path: PathBuf,
    child: Option<tokio::process::Child>,
}

impl ProcessTestExecutor {
    pub fn new<P: Into<PathBuf>>(config: &EditorConfig, work_dir: P) -> Self {
        Self {
            executable: config.executable.clone(),
            project_path: config.project_path.clone(),
            results_path: work_dir.into().join(TEST_RESULTS_FILENAME),
            child: None,
        }
    }

    /// Wait for the spawned test run and summarize its result
    ///
    /// Exit code 0 means every test passed; anything else is a failure.
    pub async fn wait(&mut self) -> BuildToolResult<TestRunSummary> {
        let mut child = self
            .child
            .take()
            .ok_or_else(|| BuildToolError::test("No test run in progress"))?;

        let status = child
            .wait()
            .await
            .map_err(|e| BuildToolError::test(format!("Failed to wait for test run: {}", e)))?;

        let summary_status = if status.success() {
            TestStatus::Passed
        } else {
            TestStatus::Failed
        };

        let summary = match fs::read_to_string(&self.results_path) {
            Ok(xml) => parse_result_counts(&xml, summary_status)?,
            Err(_) => TestRunSummary::new(summary_status),
        };

        Ok(summary)
    }
}

impl TestExecutor for ProcessTestExecutor {
    fn execute(&mut self, filter: &TestFilter) -> BuildToolResult<()> {
        if self.child.is_some() {
            return Err(BuildToolError::test("A test run is already in progress"));
        }

        if let Some(parent) = self.results_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let platform = match filter.mode {
            TestMode::PlayMode => "PlayMode",
            TestMode::EditMode => "EditMode",
        };

        let mut cmd = tokio::process::Command::new(&self.executable);
        cmd.arg("-batchmode")
            .arg("-projectPath")
            .arg(&self.project_path)
            .arg("-runTests")
            .arg("-testPlatform")
            .arg(platform)
            .arg("-testResults")
            .arg(&self.results_path)
            .arg("-logFile")
            .arg("-");

        log::debug!("Executing test command: {:?}", cmd);

        let child = cmd
            .spawn()
            .map_err(|e| BuildToolError::test(format!("Failed to execute {:?}: {}", self.executable, e)))?;
        self.child = Some(child);

        Ok(())
    }
}

/// Read pass/skip/fail counts from the `<test-run>` element of a results file
pub fn parse_result_counts(xml: &str, status: TestStatus) -> BuildToolResult<TestRunSummary> {
    let summary = TestRunSummary::new(status);

    let element_pattern = Regex::new(r"<test-run\b[^>]*>")
        .map_err(|e| BuildToolError::test(format!("Invalid results pattern: {}", e)))?;
    let count_pattern = Regex::new(r#"\s(passed|skipped|failed)="(\d+)""#)
        .map_err(|e| BuildToolError::test(format!("Invalid results pattern: {}", e)))?;

    let Some(element) = element_pattern.find(xml) else {
        return Ok(summary);
    };

    let (mut passed, mut skipped, mut failed) = (0, 0, 0);
    for captures in count_pattern.captures_iter(element.as_str()) {
        let value = captures[2].parse().unwrap_or(0);
        match &captures[1] {
            "passed" => passed = value,
            "skipped" => skipped = value,
            _ => failed = value,
        }
    }

    Ok(summary.with_counts(passed, skipped, failed))
}
