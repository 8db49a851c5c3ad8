//! Integration tests for resuming builds across editor reloads

use std::path::Path;
use unity_build_core::*;
use unity_build_pipeline::testing::{MockEditorHost, MockNotifier, MockTestExecutor};
use unity_build_pipeline::*;

type Sequencer = RunSequencer<MockEditorHost, MockTestExecutor, MockNotifier>;

/// A sequencer as it exists after a fresh editor start: settings from disk,
/// nothing in memory.
fn fresh_sequencer(root: &Path, active: BuildTarget) -> Sequencer {
    let settings_path = root.join(DEFAULT_SETTINGS_FILE);
    let mut settings =
        BuildSettings::load_or_create_default(&settings_path, active).expect("Failed to load settings");
    settings.editor.project_path = root.join("project");

    RunSequencer::new(
        settings,
        HandoffStore::new(root.join("handoff")),
        MockEditorHost::new(active),
        MockTestExecutor::new(),
        MockNotifier::new(),
    )
}

#[test]
fn test_build_resumes_in_a_new_session() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    let mut before_reload = fresh_sequencer(dir.path(), BuildTarget::Android);
    let started = before_reload
        .build_selection(BuildBehavior::BuildScriptsOnly, true)
        .expect("Failed to submit build");
    let token = match started {
        SubmitOutcome::TestsStarted { token } => token,
        other => panic!("expected tests to start, got {:?}", other),
    };
    assert_eq!(before_reload.host().build_count(), 0);
    drop(before_reload);

    let mut after_reload = fresh_sequencer(dir.path(), BuildTarget::Android);
    let (_, pending) = after_reload.handoff().peek().expect("Failed to peek");
    assert_eq!(pending.expect("single build should be pending").token, token);

    let summary = TestRunSummary::new(TestStatus::Passed).with_counts(4, 0, 0);
    let outcomes = after_reload
        .on_tests_finished(&summary)
        .expect("Failed to resume")
        .expect("tests passed, so a build should run");

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].behavior, BuildBehavior::BuildScriptsOnly);
    assert_eq!(outcomes[0].invocation.target, BuildTarget::Android);

    let request = &after_reload.host().requests[0];
    assert!(request.options.contains(BuildOptions::BUILD_SCRIPTS_ONLY));
    assert!(request.options.contains(BuildOptions::DEVELOPMENT));
    assert_eq!(request.location, dir.path().join("project/Builds/Android/Debug/Game.apk"));
    assert!(!after_reload.handoff().has_pending());
}

#[test]
fn test_selection_snapshot_survives_settings_change() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let settings_path = dir.path().join(DEFAULT_SETTINGS_FILE);

    let mut before_reload = fresh_sequencer(dir.path(), BuildTarget::StandaloneLinux64);
    {
        let selection = &mut before_reload.settings_mut().selection;
        selection.set_target(BuildTarget::WebGl);
        selection.preset = 2;
        selection.extra_flags = ExtraFlags::USE_PROFILER | ExtraFlags::STRICT_MODE;
    }
    before_reload
        .build_selection(BuildBehavior::BuildOnly, true)
        .expect("Failed to submit build");

    // the user picks something else while the tests run
    let mut settings = before_reload.into_settings();
    settings.selection.preset = 0;
    settings.selection.reset_target();
    settings.save(&settings_path).expect("Failed to save settings");

    let mut after_reload = fresh_sequencer(dir.path(), BuildTarget::StandaloneLinux64);
    let outcomes = after_reload
        .on_tests_finished(&TestRunSummary::new(TestStatus::Passed))
        .expect("Failed to resume")
        .expect("a build should run");

    assert_eq!(outcomes[0].invocation.target, BuildTarget::WebGl);
    assert_eq!(outcomes[0].preset, "Release");

    let options = after_reload.host().requests[0].options;
    assert!(options.contains(
        BuildOptions::CONNECT_WITH_PROFILER
            | BuildOptions::ENABLE_DEEP_PROFILING_SUPPORT
            | BuildOptions::STRICT_MODE
            | BuildOptions::COMPRESS_WITH_LZ4_HC
    ));
}

#[test]
fn test_failed_tests_keep_group_for_later() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    let mut first = fresh_sequencer(dir.path(), BuildTarget::Ios);
    first.build_group("Release", true).expect("Failed to submit group");

    let failed = TestRunSummary::new(TestStatus::Failed).with_counts(3, 0, 1);
    assert!(first.on_tests_finished(&failed).expect("Failed to handle result").is_none());
    assert_eq!(first.host().build_count(), 0);
    assert!(first.handoff().group_path().exists());
    drop(first);

    // a later successful run picks the group up
    let mut second = fresh_sequencer(dir.path(), BuildTarget::Ios);
    let outcomes = second
        .on_tests_finished(&TestRunSummary::new(TestStatus::Passed))
        .expect("Failed to resume")
        .expect("the kept group should run");

    let presets: Vec<&str> = outcomes.iter().map(|o| o.preset.as_str()).collect();
    assert_eq!(presets, vec!["Release", "Release Native"]);
    assert!(!second.handoff().has_pending());
}

#[test]
fn test_success_without_pending_state_is_an_error() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut sequencer = fresh_sequencer(dir.path(), BuildTarget::Android);

    let err = sequencer
        .on_tests_finished(&TestRunSummary::new(TestStatus::Passed))
        .expect_err("nothing was pending");

    assert!(matches!(err, BuildToolError::MissingHandoff { .. }));
    assert!(err.to_string().starts_with("Unable to find base or group file for build execution"));
    assert_eq!(sequencer.host().build_count(), 0);
}

#[test]
fn test_pending_group_referencing_removed_preset_is_rejected() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let settings_path = dir.path().join(DEFAULT_SETTINGS_FILE);

    let mut first = fresh_sequencer(dir.path(), BuildTarget::Android);
    first.build_group("IL2CPP", true).expect("Failed to submit group");

    let mut settings = first.into_settings();
    settings.groups.clear();
    settings.presets.truncate(2);
    settings.save(&settings_path).expect("Failed to save settings");

    let mut second = fresh_sequencer(dir.path(), BuildTarget::Android);
    let err = second
        .on_tests_finished(&TestRunSummary::new(TestStatus::Passed))
        .expect_err("preset 3 no longer exists");

    assert!(matches!(err, BuildToolError::PresetIndex { index: 3, count: 2 }));
    assert_eq!(second.host().build_count(), 0);
    assert_eq!(second.state(), RunState::Idle);
}
