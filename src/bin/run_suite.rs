use droid_vision::config::{self, NavigatorDefaults};
use droid_vision::logging::init_logging;
use droid_vision::{
    ExecutionSettings, MockDevice, RecordingPacer, Runner, ScreenClassifier, Session, TestCase,
    TestSuite, cases, report,
};
use std::path::PathBuf;

/// Dry run of a test suite against the mock device.
///
/// Usage: run_suite [CASES_FILE]
/// Without a file a small built-in suite is used.
fn main() {
    init_logging(false);
    let config = config::get();

    let suite = match std::env::args().nth(1) {
        Some(path) => match cases::load(&PathBuf::from(path)) {
            Ok(suite) => suite,
            Err(e) => {
                eprintln!("Cannot load test cases: {}", e);
                std::process::exit(1);
            }
        },
        None => TestSuite::flat(vec![
            TestCase::new("Open lobby", "tap", "lobby is shown"),
            TestCase::new("Spin once", "tap", "reels spin and stop"),
            TestCase::new("Idle on lobby", "wait", "nothing changes"),
        ]),
    };

    let session = Session::with_name_in(&config.session.base_dir, "dry_run");
    let device = MockDevice::new(&session.dir).with_screens(["MOCK LOBBY", "MOCK SLOTS"]);
    let classifier = ScreenClassifier::from_settings(&config.vlm);

    if let Err(e) = session.init("mock", classifier.ai_enabled()) {
        eprintln!("Cannot create session directory: {}", e);
        std::process::exit(1);
    }

    let settings = ExecutionSettings::from_defaults(&NavigatorDefaults {
        max_attempts: config.navigator.max_attempts,
        ..NavigatorDefaults::defaults()
    });
    let mut runner =
        Runner::with_pacer(device, classifier, RecordingPacer::new()).settings(settings);
    runner.run_all(&suite);

    let run_report = runner.report();
    println!(
        "Dry run completed: {} tests, {} passed, {} failed, {} bugs found",
        run_report.summary.total,
        run_report.summary.passed,
        run_report.summary.failed,
        run_report.summary.bugs_found
    );
    println!(
        "Captures: {}, taps: {}, settle time skipped: {:?}",
        runner.device().capture_count(),
        runner.device().taps().len(),
        runner.pacer().total()
    );

    let (html_path, _) = session.report_paths();
    match report::write_html(&run_report, &html_path) {
        Ok(path) => println!("Report: {}", path.display()),
        Err(e) => {
            eprintln!("Cannot write report: {}", e);
            std::process::exit(1);
        }
    }
}
