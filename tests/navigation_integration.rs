//! Integration tests for blocker clearing, case execution and run orchestration

mod common;

use std::time::Duration;

use pretty_assertions::assert_eq;

use common::{GarbageProvider, ScriptedProvider, blocked_by, glitch, screen, tap_on};
use droid_vision::brain::{READY_SCREEN, UNKNOWN_SCREEN};
use droid_vision::executor::{AFTER_ACTION_LABEL, BEFORE_ACTION_LABEL, VERIFICATION_LABEL};
use droid_vision::navigator::{DEFAULT_CLOSE_GUESSES, SCAN_LABEL};
use droid_vision::{
    ClearReport, ExecutionSettings, Executor, FailurePolicy, MockDevice, Navigator,
    NavigatorSettings, RecordingPacer, Runner, ScreenClassifier, TestCase, TestGroup, TestSuite,
    cases, report,
};

fn quick_settings(max_attempts: u32) -> ExecutionSettings {
    let mut settings = ExecutionSettings::default();
    settings.navigator = settings.navigator.max_attempts(max_attempts);
    settings
}

#[test]
fn test_fallback_run_never_taps_for_the_action() {
    let dir = tempfile::tempdir().unwrap();
    let device = MockDevice::new(dir.path());
    let mut runner = Runner::with_pacer(device, ScreenClassifier::fallback(), RecordingPacer::new());

    let outcomes = runner
        .run_cases(&[TestCase::new("Tap spin", "tap", "reels spin")])
        .to_vec();

    assert_eq!(outcomes.len(), 1);
    let outcome = &outcomes[0];
    assert!(outcome.success);
    assert!(!outcome.bug_found);
    assert_eq!(outcome.bug_details, None);
    assert!(!outcome.reached_ready);
    assert_eq!(outcome.screen_type, UNKNOWN_SCREEN);

    // 10 budgeted scans plus before-action, verification and after-action
    assert_eq!(runner.device().capture_count(), 13);

    // Only close-button guesses, never an action tap
    let guesses: Vec<(i32, i32)> = DEFAULT_CLOSE_GUESSES.iter().map(|p| (p.x, p.y)).collect();
    assert_eq!(runner.device().taps().len(), 30);
    assert!(runner.device().taps().chunks(3).all(|chunk| chunk == guesses.as_slice()));
}

#[test]
fn test_constant_blocker_spends_whole_budget() {
    let dir = tempfile::tempdir().unwrap();
    let mut device = MockDevice::new(dir.path());
    let classifier =
        ScreenClassifier::with_provider(ScriptedProvider::new(blocked_by("sale_popup", 100, 200)));
    let mut pacer = RecordingPacer::new();
    let settings = NavigatorSettings::default();

    let report = Navigator::new(&mut device, &classifier, &mut pacer, &settings)
        .clear_blockers_report()
        .unwrap();

    assert_eq!(
        report,
        ClearReport {
            ready: false,
            scans: 10,
            taps: 10
        }
    );
    assert_eq!(device.taps(), vec![(100, 200); 10].as_slice());
    assert_eq!(pacer.total(), Duration::from_secs(20));
}

#[test]
fn test_ready_screen_stops_clearing_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let mut device = MockDevice::new(dir.path());
    let classifier = ScreenClassifier::with_provider(ScriptedProvider::new(screen(READY_SCREEN)));
    let mut pacer = RecordingPacer::new();
    let settings = NavigatorSettings::default();

    let ready = Navigator::new(&mut device, &classifier, &mut pacer, &settings)
        .clear_blockers()
        .unwrap();

    assert!(ready);
    assert_eq!(device.capture_count(), 1);
    assert!(device.taps().is_empty());
    assert!(pacer.pauses.is_empty());
}

#[test]
fn test_action_tap_uses_brain_coordinates() {
    let dir = tempfile::tempdir().unwrap();
    let mut device = MockDevice::new(dir.path());
    let classifier = ScreenClassifier::with_provider(
        ScriptedProvider::new(screen("game_loaded"))
            .on(SCAN_LABEL, screen(READY_SCREEN))
            .on(BEFORE_ACTION_LABEL, tap_on("game_loaded", 720, 2800)),
    );
    let mut pacer = RecordingPacer::new();
    let settings = ExecutionSettings::default();

    let outcome = Executor::new(&mut device, &classifier, &mut pacer, &settings)
        .run(&TestCase::new("Spin once", "Tap", "reels spin"))
        .unwrap();

    assert!(outcome.success);
    assert!(outcome.reached_ready);
    assert_eq!(outcome.screen_type, "game_loaded");
    assert_eq!(device.taps(), &[(720, 2800)]);
    assert_eq!(pacer.pauses, vec![Duration::from_secs(3)]);

    let shot = outcome.screenshot.unwrap();
    let name = shot.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("0003_verification_"), "unexpected capture name {}", name);
}

#[test]
fn test_non_tap_action_skips_before_action_capture() {
    let dir = tempfile::tempdir().unwrap();
    let mut device = MockDevice::new(dir.path());
    let classifier = ScreenClassifier::with_provider(
        ScriptedProvider::new(tap_on("game_loaded", 10, 10)).on(SCAN_LABEL, screen(READY_SCREEN)),
    );
    let mut pacer = RecordingPacer::new();
    let settings = ExecutionSettings::default();

    Executor::new(&mut device, &classifier, &mut pacer, &settings)
        .run(&TestCase::new("Wait for bonus", "wait", "bonus appears"))
        .unwrap();

    // scan, verification, after-action
    assert_eq!(device.capture_count(), 3);
    assert!(device.taps().is_empty());
}

#[test]
fn test_crash_screen_fails_case() {
    let dir = tempfile::tempdir().unwrap();
    let mut device = MockDevice::new(dir.path());
    let classifier = ScreenClassifier::with_provider(
        ScriptedProvider::new(screen(READY_SCREEN)).on(VERIFICATION_LABEL, screen("crash")),
    );
    let mut pacer = RecordingPacer::new();
    let settings = ExecutionSettings::default();

    let outcome = Executor::new(&mut device, &classifier, &mut pacer, &settings)
        .run(&TestCase::new("Open shop", "tap", "shop opens"))
        .unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.screen_type, "crash");
}

#[test]
fn test_bug_report_flows_into_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let device = MockDevice::new(dir.path());
    let classifier = ScreenClassifier::with_provider(
        ScriptedProvider::new(screen(READY_SCREEN))
            .on(AFTER_ACTION_LABEL, screen("game_loaded"))
            .bug(glitch()),
    );
    let mut runner = Runner::with_pacer(device, classifier, RecordingPacer::new());

    runner.run_cases(&[TestCase::new("Spin", "tap", "reels spin")]);

    let outcome = &runner.outcomes()[0];
    assert!(outcome.success);
    assert!(outcome.bug_found);
    assert_eq!(outcome.bug_details, Some(glitch()));
    assert_eq!(runner.summary().bugs_found, 1);
}

#[test]
fn test_malformed_reply_degrades_to_safe_default() {
    let dir = tempfile::tempdir().unwrap();
    let mut device = MockDevice::new(dir.path());
    let classifier = ScreenClassifier::with_provider(GarbageProvider);
    let mut pacer = RecordingPacer::new();
    let settings = quick_settings(1);

    let outcome = Executor::new(&mut device, &classifier, &mut pacer, &settings)
        .run(&TestCase::new("Spin", "tap", "reels spin"))
        .unwrap();

    assert!(outcome.success);
    assert!(!outcome.bug_found);
    assert_eq!(outcome.screen_type, UNKNOWN_SCREEN);
    // Only the three close guesses of the single clearing attempt
    assert_eq!(device.taps().len(), DEFAULT_CLOSE_GUESSES.len());
}

#[test]
fn test_capture_failure_continues_with_next_case() {
    let dir = tempfile::tempdir().unwrap();
    // First case: scan(1) before(2) -> fails on capture #2
    let device = MockDevice::new(dir.path()).fail_capture_at(2);
    let mut runner = Runner::with_pacer(device, ScreenClassifier::fallback(), RecordingPacer::new())
        .settings(quick_settings(1));

    runner.run_cases(&[
        TestCase::new("First", "tap", "a"),
        TestCase::new("Second", "tap", "b"),
    ]);

    assert!(!runner.aborted());
    assert_eq!(runner.outcomes().len(), 1);
    assert_eq!(runner.outcomes()[0].test_case, "Second");
    assert_eq!(runner.failures().len(), 1);
    assert_eq!(runner.failures()[0].test_case, "First");
    assert!(runner.failures()[0].error.contains("disconnected"));

    let summary = runner.summary();
    assert_eq!((summary.total, summary.errored), (1, 1));
}

#[test]
fn test_capture_failure_aborts_run_under_abort_policy() {
    let dir = tempfile::tempdir().unwrap();
    let device = MockDevice::new(dir.path()).fail_capture_at(2);
    let mut runner = Runner::with_pacer(device, ScreenClassifier::fallback(), RecordingPacer::new())
        .settings(quick_settings(1))
        .policy(FailurePolicy::Abort);

    runner.run_cases(&[
        TestCase::new("First", "tap", "a"),
        TestCase::new("Second", "tap", "b"),
    ]);

    assert!(runner.aborted());
    assert!(runner.outcomes().is_empty());
    assert_eq!(runner.failures().len(), 1);
    assert_eq!(runner.device().capture_count(), 2);
    assert!(runner.report().aborted);
}

#[test]
fn test_tap_failure_is_a_device_error() {
    let dir = tempfile::tempdir().unwrap();
    let device = MockDevice::new(dir.path()).fail_tap_at(1);
    let mut runner = Runner::with_pacer(device, ScreenClassifier::fallback(), RecordingPacer::new())
        .settings(quick_settings(1));

    runner.run_cases(&[TestCase::new("Only", "tap", "a")]);

    assert!(runner.outcomes().is_empty());
    assert_eq!(runner.failures().len(), 1);
}

#[test]
fn test_grouped_suite_keeps_source_order() {
    let dir = tempfile::tempdir().unwrap();
    let device = MockDevice::new(dir.path());
    let classifier = ScreenClassifier::with_provider(ScriptedProvider::new(screen(READY_SCREEN)));
    let mut runner = Runner::with_pacer(device, classifier, RecordingPacer::new());

    let suite = TestSuite::grouped(vec![
        TestGroup::named(
            "Lobby",
            vec![
                TestCase::new("Open lobby", "tap", "lobby"),
                TestCase::new("Claim bonus", "tap", "coins added"),
            ],
        ),
        TestGroup::named("Slots", vec![TestCase::new("Spin", "tap", "reels spin")]),
    ]);
    let outcomes = runner.run_all(&suite).to_vec();

    let seen: Vec<(Option<&str>, &str)> = outcomes
        .iter()
        .map(|o| (o.group.as_deref(), o.test_case.as_str()))
        .collect();
    assert_eq!(
        seen,
        vec![
            (Some("Lobby"), "Open lobby"),
            (Some("Lobby"), "Claim bonus"),
            (Some("Slots"), "Spin"),
        ]
    );

    // A second run replaces the log instead of appending
    runner.run_cases(&[TestCase::new("Again", "wait", "idle")]);
    assert_eq!(runner.outcomes().len(), 1);
    assert_eq!(runner.outcomes()[0].group, None);
}

#[test]
fn test_csv_source_to_html_report() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("cases.csv");
    std::fs::write(
        &csv_path,
        "Step,Description,Expected Result\n\
         tap,Spin once,Reels spin\n\
         ,,\n\
         wait,Idle,Nothing happens\n",
    )
    .unwrap();

    let suite = cases::load(&csv_path).unwrap();
    assert_eq!(suite.len(), 2);

    let device = MockDevice::new(dir.path().join("captures"));
    let mut runner = Runner::with_pacer(device, ScreenClassifier::fallback(), RecordingPacer::new())
        .settings(quick_settings(1));
    runner.run_all(&suite);

    let run_report = runner.report();
    assert_eq!(run_report.device, "mock");
    assert!(!run_report.ai_enabled);
    assert_eq!(run_report.summary.total, 2);
    assert_eq!(run_report.summary.passed, 2);

    let html_path = report::write_html(&run_report, &dir.path().join("report.html")).unwrap();
    let html = std::fs::read_to_string(html_path).unwrap();
    assert!(html.contains("Spin once"));
    assert!(html.contains("Nothing happens"));
    assert!(html.contains("fallback (no AI configured)"));
}
