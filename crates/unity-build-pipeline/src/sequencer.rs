//! Test-then-build sequencing
//!
//! A submission either builds right away or stores what to build in the
//! hand-off store and starts the test runner. When the runner reports back,
//! a successful run resumes the stored request; a failed run builds nothing.
//!
//! ```text
//! Idle ──submit(tests)──▶ TestsRunning ──finished(ok)──▶ Resuming ──▶ Building ──▶ Idle
//!  │                           └──finished(failed)──▶ Idle
//!  └──submit(no tests)──▶ Building ──▶ Idle
//! ```

use crate::config::BuildSettings;
use crate::handoff::{HandoffStore, PendingRunState};
use crate::host::{BuildRequest, BuildResult, EditorHost, Notifier, TestExecutor, TestFilter, TestRunSummary};
use crate::progress::{TestNode, TestProgress, PROGRESS_TITLE};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use unity_build_core::{
    player_location, resolve, target_directory, BuildBehavior, BuildGroup, BuildInvocation, BuildTarget,
    BuildToolError, BuildToolResult,
};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    TestsRunning,
    Resuming,
    Building,
}

/// What a submission asks for
#[derive(Debug, Clone, PartialEq)]
pub enum RunRequest {
    Single {
        behavior: BuildBehavior,
        invocation: BuildInvocation,
    },
    /// Every item is built build-only, in order
    Group(BuildGroup),
}

/// Result of one player build
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOutcome {
    pub invocation: BuildInvocation,
    pub behavior: BuildBehavior,
    pub preset: String,
    pub location: PathBuf,
    pub result: BuildResult,
    pub duration: Duration,
}

impl BuildOutcome {
    pub fn succeeded(&self) -> bool {
        self.result == BuildResult::Succeeded
    }
}

/// What happened right after a submission
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Tests are running; the build resumes once they report back
    TestsStarted { token: Uuid },
    Built(Vec<BuildOutcome>),
}

/// Drives test runs and builds against the editor host
pub struct RunSequencer<H, T, N> {
    settings: BuildSettings,
    handoff: HandoffStore,
    host: H,
    tests: T,
    notifier: N,
    state: RunState,
    progress: TestProgress,
    test_filter: TestFilter,
}

impl<H: EditorHost, T: TestExecutor, N: Notifier> RunSequencer<H, T, N> {
    pub fn new(settings: BuildSettings, handoff: HandoffStore, host: H, tests: T, notifier: N) -> Self {
        Self {
            settings,
            handoff,
            host,
            tests,
            notifier,
            state: RunState::Idle,
            progress: TestProgress::new(),
            test_filter: TestFilter::default(),
        }
    }

    pub fn with_test_filter(mut self, filter: TestFilter) -> Self {
        self.test_filter = filter;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn settings(&self) -> &BuildSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut BuildSettings {
        &mut self.settings
    }

    pub fn handoff(&self) -> &HandoffStore {
        &self.handoff
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn tests(&self) -> &T {
        &self.tests
    }

    pub fn tests_mut(&mut self) -> &mut T {
        &mut self.tests
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn into_settings(self) -> BuildSettings {
        self.settings
    }

    /// Build the toolbar selection with the given behavior
    pub fn build_selection(&mut self, behavior: BuildBehavior, run_tests_first: bool) -> BuildToolResult<SubmitOutcome> {
        let invocation = self.settings.selection.invocation(self.host.active_build_target());
        self.submit(RunRequest::Single { behavior, invocation }, run_tests_first)
    }

    /// Build a group from the settings by name
    pub fn build_group(&mut self, name: &str, run_tests_first: bool) -> BuildToolResult<SubmitOutcome> {
        let group = self
            .settings
            .group(name)
            .cloned()
            .ok_or_else(|| BuildToolError::unknown_group(name))?;
        self.submit(RunRequest::Group(group), run_tests_first)
    }

    /// Build now, or persist the request and start the tests first
    ///
    /// A later submission of the same kind replaces a request still waiting
    /// for its tests, but only once its own test run has started.
    pub fn submit(&mut self, request: RunRequest, run_tests_first: bool) -> BuildToolResult<SubmitOutcome> {
        self.validate(&request)?;

        if !run_tests_first {
            return self.run_now(request).map(SubmitOutcome::Built);
        }

        log::info!("Start tests");
        let (backup, token) = match &request {
            RunRequest::Group(group) => {
                let backup = self.handoff.backup_group()?;
                (backup, self.handoff.store_group(group)?.token)
            }
            RunRequest::Single { behavior, invocation } => {
                let backup = self.handoff.backup_single()?;
                (backup, self.handoff.store_single(*behavior, *invocation)?.token)
            }
        };

        // a submission whose tests never started must not replace an earlier one
        if let Err(e) = self.tests.execute(&self.test_filter) {
            log::error!("Unable to start test run: {}", e);
            if let Err(restore_error) = self.handoff.restore(backup) {
                log::warn!("Failed to restore pending state: {}", restore_error);
            }
            return Err(e);
        }

        self.state = RunState::TestsRunning;
        Ok(SubmitOutcome::TestsStarted { token })
    }

    /// The test runner announced the tree it is about to run
    pub fn on_run_started(&mut self, root: TestNode) {
        self.progress.run_started(root);
        log::debug!("Test run started with {} test cases", self.progress.max());
        self.notifier.progress(PROGRESS_TITLE, "Test is running now", 0.0);
    }

    pub fn on_test_started(&mut self, test: &TestNode) {
        let (index, message) = self.progress.test_started(test);
        let fraction = self.progress.fraction(index);
        self.notifier.progress(PROGRESS_TITLE, &message, fraction);
    }

    /// The test runner finished; resume the pending build on success
    ///
    /// Returns `Ok(None)` when the tests failed. The pending state is left in
    /// place in that case; only a successful run consumes it.
    pub fn on_tests_finished(&mut self, summary: &TestRunSummary) -> BuildToolResult<Option<Vec<BuildOutcome>>> {
        self.notifier.clear_progress();
        self.progress.reset();

        log::info!(
            "Finished test with success: {}, skipped: {}, failed: {}",
            summary.passed,
            summary.skipped,
            summary.failed
        );

        if summary.is_failure() {
            self.notifier
                .acknowledge("Test failures", &format!("There are test failures: {:?}", summary.status));
            self.state = RunState::Idle;
            return Ok(None);
        }

        self.state = RunState::Resuming;
        let pending = match self.handoff.take_pending() {
            Ok(Some(pending)) => pending,
            Ok(None) => {
                self.state = RunState::Idle;
                let error = BuildToolError::missing_handoff(self.handoff.base_path());
                log::error!("{}", error);
                return Err(error);
            }
            Err(e) => {
                self.state = RunState::Idle;
                log::error!("Unable to resume build: {}", e);
                return Err(e);
            }
        };

        log::info!("Resuming pending build {}", pending.token());
        let request = match pending {
            PendingRunState::Group(pending) => RunRequest::Group(pending.group),
            PendingRunState::Single(pending) => RunRequest::Single {
                behavior: pending.behavior,
                invocation: pending.invocation,
            },
        };

        if let Err(e) = self.validate(&request) {
            self.state = RunState::Idle;
            log::error!("Pending build no longer matches the settings: {}", e);
            return Err(e);
        }
        self.run_now(request).map(Some)
    }

    fn validate(&self, request: &RunRequest) -> BuildToolResult<()> {
        match request {
            RunRequest::Group(group) => group.validate(self.settings.presets.len()),
            RunRequest::Single { invocation, .. } => invocation.preset_in(&self.settings.presets).map(|_| ()),
        }
    }

    fn run_now(&mut self, request: RunRequest) -> BuildToolResult<Vec<BuildOutcome>> {
        self.state = RunState::Building;
        let result = self.run(request);
        self.state = RunState::Idle;
        result
    }

    fn run(&mut self, request: RunRequest) -> BuildToolResult<Vec<BuildOutcome>> {
        match request {
            RunRequest::Single { behavior, invocation } => Ok(vec![self.build_one(behavior, invocation)?]),
            RunRequest::Group(group) => {
                log::info!("Building group '{}' ({} items)", group.name, group.items.len());
                let mut outcomes = Vec::with_capacity(group.items.len());
                for invocation in group.items {
                    match self.build_one(BuildBehavior::BuildOnly, invocation) {
                        Ok(outcome) => outcomes.push(outcome),
                        Err(e) => {
                            log::error!("Build for {} in group '{}' failed: {}", invocation.target, group.name, e);
                            self.notifier.acknowledge("Build", &format!("Build has failed: {}", e));
                        }
                    }
                }
                Ok(outcomes)
            }
        }
    }

    /// Prepare the request for one invocation and hand it to the editor
    fn build_one(&mut self, behavior: BuildBehavior, invocation: BuildInvocation) -> BuildToolResult<BuildOutcome> {
        let preset = invocation.preset_in(&self.settings.presets)?.clone();
        let target = invocation.target;
        let resolved = resolve(
            &preset,
            invocation.extra_flags,
            behavior,
            self.settings.clean,
            self.settings.show_folder,
        );

        let product_name = self.host.product_name();
        let app_name = self.settings.effective_app_name(&product_name).to_string();
        let root = self.settings.editor.project_path.clone();
        let location = player_location(&root, target, &preset, &app_name);

        let request = BuildRequest {
            scenes: self.host.scenes()?,
            target,
            location: location.clone(),
            options: resolved.options,
            defines: merge_defines(&self.host.scripting_defines(target), &preset.defines),
            scripting_backend: resolved.scripting_backend(),
            backend: resolved.backend,
            stripping_level: preset.managed_stripping_level,
            android_architecture: preset.android_architecture,
            apple_architecture: preset.apple_architecture,
            app_bundle: preset.app_bundle,
        };

        if self.settings.clean {
            let directory = target_directory(&root, target, &preset);
            if directory.exists() {
                log::info!("Cleaning {:?}", directory);
                std::fs::remove_dir_all(&directory)?;
            }
        }

        log::info!("Building {} ({}, {}) to {:?}", target, preset.name, behavior, location);
        let (result, duration) = self.execute_build(target, &request);

        if result == BuildResult::Succeeded {
            log::info!("Build for {} finished in {}", target, humantime::format_duration(duration));
        } else {
            log::error!("Build for {} ended with {:?}", target, result);
            self.notifier.acknowledge("Build", "Build has failed");
        }

        Ok(BuildOutcome {
            invocation,
            behavior,
            preset: preset.name,
            location,
            result,
            duration,
        })
    }

    /// Run the build and switch the editor back to the platform it had before
    fn execute_build(&mut self, target: BuildTarget, request: &BuildRequest) -> (BuildResult, Duration) {
        let previous = self.host.active_build_target();
        let started = Instant::now();

        let report = self.host.build_player(request);

        if let Err(e) = self.host.switch_active_build_target(previous) {
            log::warn!("Failed to switch back to {}: {}", previous, e);
        }

        match report {
            Ok(report) => (report.result, report.duration),
            Err(e) => {
                log::error!("Build for {} could not run: {}", target, e);
                (BuildResult::Failed, started.elapsed())
            }
        }
    }
}

/// Project defines followed by preset defines, blank entries dropped
pub fn merge_defines(project_defines: &str, preset_defines: &[String]) -> Vec<String> {
    project_defines
        .split(',')
        .map(str::trim)
        .chain(preset_defines.iter().map(|define| define.trim()))
        .filter(|define| !define.is_empty())
        .map(str::to_string)
        .collect()
}
