//! Command-line build toolbar for Unity projects

use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use log::{info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use unity_build_core::{BuildBehavior, BuildTarget, BuildToolError, BuildToolResult, ExtraFlags};
use unity_build_pipeline::{
    BuildOutcome, BuildSettings, EditorConfig, EditorHost, HandoffStore, Notifier, PendingBuild, PendingGroup,
    ProcessEditorHost, ProcessTestExecutor, RunSequencer, SubmitOutcome, TestFilter, TestRunSummary, TestStatus,
    DEFAULT_SETTINGS_FILE,
};

#[derive(Parser, Debug)]
#[command(name = "unity-build")]
#[command(about = "Build presets and test-then-build runs for Unity projects")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable quiet mode (suppress non-error output)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Set log level
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevel>,

    /// Build settings file
    #[arg(long, global = true, default_value = DEFAULT_SETTINGS_FILE)]
    settings: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Debug)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write the default settings file
    Init {
        /// Overwrite an existing settings file
        #[arg(long)]
        force: bool,
        /// Platform the editor has active (defaults to this machine's desktop player)
        #[arg(long)]
        target: Option<BuildTarget>,
    },
    /// Build the current selection
    Build {
        /// build, run or scripts
        #[arg(long, default_value = "build")]
        behavior: BuildBehavior,
        /// Build right away even if the settings ask for tests first
        #[arg(long)]
        skip_tests: bool,
        /// Wait for the test run and resume the build in this process
        #[arg(long)]
        wait: bool,
    },
    /// Build every item of a named group
    Group {
        /// Group name
        name: String,
        #[arg(long)]
        skip_tests: bool,
        #[arg(long)]
        wait: bool,
    },
    /// Report a finished test run and resume the pending build
    TestsFinished {
        #[arg(long, value_enum)]
        status: StatusArg,
        #[arg(long, default_value_t = 0)]
        passed: usize,
        #[arg(long, default_value_t = 0)]
        failed: usize,
        #[arg(long, default_value_t = 0)]
        skipped: usize,
    },
    /// Change the toolbar selection
    Select {
        #[arg(long)]
        target: Option<BuildTarget>,
        /// Preset name or index
        #[arg(long)]
        preset: Option<String>,
        /// Comma separated extra flags, or "none"
        #[arg(long)]
        flags: Option<String>,
        #[arg(long)]
        clean: Option<bool>,
        #[arg(long)]
        show_folder: Option<bool>,
    },
    /// Follow the editor's active platform again
    ResetTarget,
    /// Show presets, groups and the selection
    List {
        /// Print the settings as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or discard builds waiting for a test run
    Pending {
        #[arg(long)]
        clear: bool,
        #[arg(long)]
        json: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum StatusArg {
    Passed,
    Failed,
}

impl From<StatusArg> for TestStatus {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::Passed => TestStatus::Passed,
            StatusArg::Failed => TestStatus::Failed,
        }
    }
}

type CliSequencer = RunSequencer<ProcessEditorHost, ProcessTestExecutor, TerminalNotifier>;

/// Prints progress and acknowledgments to the terminal
#[derive(Debug, Default)]
struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn progress(&mut self, title: &str, info: &str, fraction: f32) {
        eprintln!("{} {} ({:.0}%)", style(title).cyan().bold(), info, fraction * 100.0);
    }

    fn clear_progress(&mut self) {}

    fn acknowledge(&mut self, title: &str, message: &str) {
        eprintln!("{} {}", style(format!("{}:", title)).red().bold(), message);
    }
}

#[derive(Serialize)]
struct PendingReport {
    group: Option<PendingGroup>,
    single: Option<PendingBuild>,
}

#[tokio::main]
async fn main() -> BuildToolResult<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    let settings_path = cli.settings.as_path();
    let result = run_command(settings_path, cli.command).await;

    if let Err(e) = &result {
        if e.is_configuration_error() {
            eprintln!(
                "{} check the build settings in {}",
                style("hint:").yellow().bold(),
                settings_path.display()
            );
        }
    }
    result
}

async fn run_command(settings_path: &Path, command: Commands) -> BuildToolResult<()> {
    match command {
        Commands::Init { force, target } => handle_init_command(settings_path, force, target),
        Commands::Build { behavior, skip_tests, wait } => {
            handle_build_command(settings_path, behavior, skip_tests, wait).await
        }
        Commands::Group { name, skip_tests, wait } => handle_group_command(settings_path, &name, skip_tests, wait).await,
        Commands::TestsFinished {
            status,
            passed,
            failed,
            skipped,
        } => {
            let summary = TestRunSummary::new(status.into()).with_counts(passed, skipped, failed);
            handle_tests_finished_command(settings_path, &summary)
        }
        Commands::Select {
            target,
            preset,
            flags,
            clean,
            show_folder,
        } => handle_select_command(settings_path, target, preset, flags, clean, show_folder),
        Commands::ResetTarget => handle_reset_target_command(settings_path),
        Commands::List { json } => handle_list_command(settings_path, json),
        Commands::Pending { clear, json } => handle_pending_command(settings_path, clear, json),
    }
}

fn init_logging(cli: &Cli) -> BuildToolResult<()> {
    let log_level = if cli.quiet {
        log::LevelFilter::Error
    } else if cli.verbose {
        log::LevelFilter::Debug
    } else {
        match &cli.log_level {
            Some(LogLevel::Error) => log::LevelFilter::Error,
            Some(LogLevel::Warn) => log::LevelFilter::Warn,
            Some(LogLevel::Info) => log::LevelFilter::Info,
            Some(LogLevel::Debug) => log::LevelFilter::Debug,
            Some(LogLevel::Trace) => log::LevelFilter::Trace,
            None => log::LevelFilter::Info,
        }
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp_secs()
        .init();

    Ok(())
}

fn load_settings(path: &Path) -> BuildToolResult<BuildSettings> {
    Ok(BuildSettings::load_or_create_default(path, EditorConfig::default().active_target)?)
}

fn create_sequencer(settings: BuildSettings) -> CliSequencer {
    // the request file and test results live next to the pending-state files
    let work_dir = settings.handoff_dir();
    let handoff = HandoffStore::new(work_dir.clone());
    let host = ProcessEditorHost::new(settings.editor.clone(), work_dir.clone());
    let tests = ProcessTestExecutor::new(&settings.editor, work_dir);
    let filter = TestFilter {
        mode: settings.editor.test_mode,
    };
    RunSequencer::new(settings, handoff, host, tests, TerminalNotifier).with_test_filter(filter)
}

fn handle_init_command(path: &Path, force: bool, target: Option<BuildTarget>) -> BuildToolResult<()> {
    if path.exists() && !force {
        return Err(BuildToolError::configuration(format!(
            "Settings file {:?} already exists (use --force to overwrite)",
            path
        )));
    }

    let target = target.unwrap_or_else(|| EditorConfig::default().active_target);
    BuildSettings::default_for(target).save(path)?;

    println!("{} Created {}", style("✓").green(), path.display());
    Ok(())
}

async fn handle_build_command(
    path: &Path,
    behavior: BuildBehavior,
    skip_tests: bool,
    wait: bool,
) -> BuildToolResult<()> {
    let settings = load_settings(path)?;
    let run_tests_first = settings.run_tests && !skip_tests;

    let mut sequencer = create_sequencer(settings);
    let outcome = sequencer.build_selection(behavior, run_tests_first)?;
    finish_submission(&mut sequencer, outcome, wait).await
}

async fn handle_group_command(path: &Path, name: &str, skip_tests: bool, wait: bool) -> BuildToolResult<()> {
    let settings = load_settings(path)?;
    let run_tests_first = settings.run_tests && !skip_tests;

    let mut sequencer = create_sequencer(settings);
    let outcome = sequencer.build_group(name, run_tests_first)?;
    finish_submission(&mut sequencer, outcome, wait).await
}

async fn finish_submission(sequencer: &mut CliSequencer, outcome: SubmitOutcome, wait: bool) -> BuildToolResult<()> {
    let token = match outcome {
        SubmitOutcome::Built(outcomes) => return report_outcomes(&outcomes),
        SubmitOutcome::TestsStarted { token } => token,
    };

    info!("Tests started, build {} waits for their result", token);
    if !wait {
        println!(
            "Tests are running. Report the result with `unity-build tests-finished --status passed|failed`."
        );
        return Ok(());
    }

    let summary = sequencer.tests_mut().wait().await?;
    match sequencer.on_tests_finished(&summary)? {
        Some(outcomes) => report_outcomes(&outcomes),
        None => Err(BuildToolError::test(format!(
            "{} test(s) failed, build skipped",
            summary.failed
        ))),
    }
}

fn handle_tests_finished_command(path: &Path, summary: &TestRunSummary) -> BuildToolResult<()> {
    let mut sequencer = create_sequencer(load_settings(path)?);

    match sequencer.on_tests_finished(summary)? {
        Some(outcomes) => report_outcomes(&outcomes),
        None => {
            println!("{} Tests failed, pending build kept", style("✗").red());
            Ok(())
        }
    }
}

fn report_outcomes(outcomes: &[BuildOutcome]) -> BuildToolResult<()> {
    for outcome in outcomes {
        let marker = if outcome.succeeded() {
            style("✓").green()
        } else {
            style("✗").red()
        };
        println!(
            "{} {} {} -> {} ({:?})",
            marker,
            outcome.invocation.target,
            outcome.preset,
            outcome.location.display(),
            outcome.result
        );
    }

    let failed = outcomes.iter().filter(|outcome| !outcome.succeeded()).count();
    if failed > 0 {
        return Err(BuildToolError::build(format!("{} of {} builds failed", failed, outcomes.len())));
    }
    Ok(())
}

fn handle_select_command(
    path: &Path,
    target: Option<BuildTarget>,
    preset: Option<String>,
    flags: Option<String>,
    clean: Option<bool>,
    show_folder: Option<bool>,
) -> BuildToolResult<()> {
    let mut settings = load_settings(path)?;

    if let Some(target) = target {
        let host = ProcessEditorHost::new(settings.editor.clone(), settings.handoff_dir());
        if !host.is_build_target_supported(target) {
            return Err(BuildToolError::invalid_argument_named(
                format!("{} support is not installed", target),
                "target",
            ));
        }
        settings.selection.set_target(target);
    }
    if let Some(key) = preset {
        settings.selection.preset = settings
            .preset_index(&key)
            .ok_or_else(|| BuildToolError::invalid_argument_named(format!("Unknown preset '{}'", key), "preset"))?;
    }
    if let Some(flags) = flags {
        settings.selection.extra_flags = ExtraFlags::parse_list(&flags)?;
    }
    if let Some(clean) = clean {
        settings.clean = clean;
    }
    if let Some(show_folder) = show_folder {
        settings.show_folder = show_folder;
    }

    settings.save(path)?;
    print_selection(&settings);
    Ok(())
}

fn handle_reset_target_command(path: &Path) -> BuildToolResult<()> {
    let mut settings = load_settings(path)?;
    settings.selection.reset_target();
    settings.save(path)?;
    print_selection(&settings);
    Ok(())
}

fn print_selection(settings: &BuildSettings) {
    let selection = &settings.selection;
    let target = selection.effective_target(settings.editor.active_target);
    let preset = settings
        .presets
        .get(selection.preset)
        .map(|preset| preset.name.as_str())
        .unwrap_or("?");
    let flags = selection.extra_flags.names();

    println!(
        "Selection: {} {}{}",
        style(target).bold(),
        style(preset).bold(),
        if selection.target_overridden { "" } else { " (active target)" }
    );
    if !flags.is_empty() {
        println!("  flags: {}", flags.join(", "));
    }
    println!("  clean: {}, show folder: {}, run tests: {}", settings.clean, settings.show_folder, settings.run_tests);
}

fn handle_list_command(path: &Path, json: bool) -> BuildToolResult<()> {
    let settings = load_settings(path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }

    println!("{}", style("Presets").underlined());
    for (index, preset) in settings.presets.iter().enumerate() {
        let marker = if index == settings.selection.preset { "*" } else { " " };
        let backend = if preset.is_native() { "IL2CPP" } else { "Mono" };
        println!("{} {:>2}  {:<16} {:<7} {}", marker, index, preset.name, backend, preset.target_path);
    }

    println!("{}", style("Groups").underlined());
    for group in &settings.groups {
        let items: Vec<String> = group
            .items
            .iter()
            .map(|item| {
                let preset = settings
                    .presets
                    .get(item.preset)
                    .map(|preset| preset.name.as_str())
                    .unwrap_or("?");
                format!("{}/{}", item.target, preset)
            })
            .collect();
        println!("  {:<10} {}", group.name, items.join(", "));
    }

    print_selection(&settings);
    Ok(())
}

fn handle_pending_command(path: &Path, clear: bool, json: bool) -> BuildToolResult<()> {
    let settings = load_settings(path)?;
    let handoff = HandoffStore::new(settings.handoff_dir());

    if clear {
        let removed = handoff.discard()?;
        if removed > 0 {
            warn!("Discarded {} pending build(s)", removed);
        }
        println!("Removed {} pending file(s) from {}", removed, handoff.base_path().display());
        return Ok(());
    }

    let (group, single) = handoff.peek()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&PendingReport { group, single })?);
        return Ok(());
    }

    if group.is_none() && single.is_none() {
        println!("Nothing pending in {}", handoff.base_path().display());
    }
    if let Some(pending) = group {
        println!(
            "Group '{}' ({} items), submitted {} [{}]",
            pending.group.name,
            pending.group.items.len(),
            pending.submitted_at.format("%Y-%m-%d %H:%M:%S"),
            pending.token
        );
    }
    if let Some(pending) = single {
        println!(
            "{} build for {} with preset #{}, submitted {} [{}]",
            pending.behavior,
            pending.invocation.target,
            pending.invocation.preset,
            pending.submitted_at.format("%Y-%m-%d %H:%M:%S"),
            pending.token
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_build_command() {
        let cli = Cli::try_parse_from(["unity-build", "build", "--behavior", "run", "--skip-tests"]).unwrap();
        match cli.command {
            Commands::Build { behavior, skip_tests, wait } => {
                assert_eq!(behavior, BuildBehavior::BuildAndRun);
                assert!(skip_tests);
                assert!(!wait);
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(cli.settings, PathBuf::from(DEFAULT_SETTINGS_FILE));
    }

    #[test]
    fn test_unknown_behavior_is_rejected() {
        assert!(Cli::try_parse_from(["unity-build", "build", "--behavior", "deploy"]).is_err());
    }

    #[test]
    fn test_parse_tests_finished() {
        let cli = Cli::try_parse_from([
            "unity-build",
            "--settings",
            "custom.toml",
            "tests-finished",
            "--status",
            "failed",
            "--failed",
            "2",
        ])
        .unwrap();

        assert_eq!(cli.settings, PathBuf::from("custom.toml"));
        match cli.command {
            Commands::TestsFinished { status, passed, failed, .. } => {
                assert_eq!(status, StatusArg::Failed);
                assert_eq!(passed, 0);
                assert_eq!(failed, 2);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_select() {
        let cli = Cli::try_parse_from([
            "unity-build",
            "select",
            "--target",
            "android",
            "--preset",
            "Release",
            "--clean",
            "false",
        ])
        .unwrap();

        match cli.command {
            Commands::Select {
                target, preset, clean, ..
            } => {
                assert_eq!(target, Some(BuildTarget::Android));
                assert_eq!(preset.as_deref(), Some("Release"));
                assert_eq!(clean, Some(false));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_select_updates_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_SETTINGS_FILE);
        handle_init_command(&path, false, Some(BuildTarget::StandaloneLinux64)).unwrap();
        assert!(handle_init_command(&path, false, None).is_err());

        handle_select_command(
            &path,
            Some(BuildTarget::WebGl),
            Some("release native".to_string()),
            Some("strict-mode,detailed-report".to_string()),
            None,
            Some(false),
        )
        .unwrap();

        let settings = BuildSettings::from_file(&path).unwrap();
        assert_eq!(settings.selection.effective_target(BuildTarget::StandaloneLinux64), BuildTarget::WebGl);
        assert_eq!(settings.selection.preset, 3);
        assert_eq!(settings.selection.extra_flags, ExtraFlags::STRICT_MODE | ExtraFlags::DETAILED_REPORT);
        assert!(!settings.show_folder);
        assert!(settings.clean);

        assert!(handle_select_command(&path, None, Some("Nightly".to_string()), None, None, None).is_err());

        let mut settings = BuildSettings::from_file(&path).unwrap();
        settings.editor.supported_targets = vec![BuildTarget::StandaloneLinux64, BuildTarget::WebGl];
        settings.save(&path).unwrap();
        assert!(handle_select_command(&path, Some(BuildTarget::Ps5), None, None, None, None).is_err());

        handle_reset_target_command(&path).unwrap();
        let settings = BuildSettings::from_file(&path).unwrap();
        assert_eq!(
            settings.selection.effective_target(BuildTarget::StandaloneLinux64),
            BuildTarget::StandaloneLinux64
        );
    }
}
