use clap::{Args as ClapArgs, Parser, Subcommand};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{error, info, warn};

use droid_vision::brain::check_health;
use droid_vision::config::{self, ENV_API_KEY, ENV_SERIAL, ENV_VLM_ENDPOINT, ENV_VLM_MODEL};
use droid_vision::logging::init_logging;
use droid_vision::session::{cleanup_old_sessions, list_sessions};
use droid_vision::{
    AdbBridge, AdbConfig, DeviceBridge, ExecutionSettings, FailurePolicy, MockDevice, Runner,
    ScreenClassifier, ScreenshotRef, Session, cases, report,
};

/// droid-vision - Android game UI testing with vision model decisions
#[derive(Parser, Debug)]
#[command(
    name = "droid-vision",
    about = "Android game UI testing with screenshot capture and vision model decisions",
    after_help = "ENVIRONMENT VARIABLES:\n\
        DROID_VISION_API_KEY        Vision model credential (enables AI mode)\n\
        DROID_VISION_VLM_ENDPOINT   VLM API endpoint URL\n\
        DROID_VISION_VLM_MODEL      VLM model name\n\
        DROID_VISION_ADB            Path to adb\n\
        DROID_VISION_SERIAL         Device serial\n\
        DROID_VISION_PACKAGE        Package under test\n\
        DROID_VISION_SESSION_DIR    Base directory for sessions\n\
        DROID_VISION_MAX_ATTEMPTS   Blocker-clearing attempt budget\n\
        RUST_LOG                    Log filter (overrides --verbose)"
)]
struct Args {
    /// Debug-level logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Vision backend overrides
#[derive(ClapArgs, Debug)]
struct VlmArgs {
    /// Vision model credential; without one the fallback brain is used
    #[arg(long, env = ENV_API_KEY, hide_env_values = true)]
    api_key: Option<String>,

    /// VLM endpoint URL
    #[arg(long, env = ENV_VLM_ENDPOINT)]
    vlm_endpoint: Option<String>,

    /// VLM model name
    #[arg(long, env = ENV_VLM_MODEL)]
    vlm_model: Option<String>,
}

impl VlmArgs {
    fn apply(self, config: &mut config::Config) {
        if let Some(key) = self.api_key.filter(|k| !k.trim().is_empty()) {
            config.vlm.api_key = Some(key);
        }
        if let Some(endpoint) = self.vlm_endpoint {
            config.vlm.endpoint = endpoint;
        }
        if let Some(model) = self.vlm_model {
            config.vlm.model = model;
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run test cases from a workbook, a CSV/JSON file or a directory of CSV files
    Run {
        /// Test-case source
        cases: PathBuf,

        /// Path to adb
        #[arg(long)]
        adb: Option<String>,

        /// Device serial (adb -s)
        #[arg(long, short = 's', env = ENV_SERIAL)]
        serial: Option<String>,

        /// Package name of the game under test
        #[arg(long, short = 'p')]
        package: Option<String>,

        /// Launch the package before the first test case
        #[arg(long)]
        launch: bool,

        /// Blocker-clearing attempt budget
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Stop the run at the first device error
        #[arg(long)]
        fail_fast: bool,

        /// Use the in-memory mock device instead of adb (dry run)
        #[arg(long)]
        mock_device: bool,

        /// Output directory for screenshots and report (default: new session dir)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        vlm: VlmArgs,
    },

    /// Classify a single screenshot and print the result as JSON
    Classify {
        /// PNG screenshot
        screenshot: PathBuf,

        /// Also run the bug check against this expected outcome
        #[arg(long)]
        expected: Option<String>,

        #[command(flatten)]
        vlm: VlmArgs,
    },

    /// Print the normalized test cases of a source
    Cases {
        /// Test-case source
        cases: PathBuf,
    },

    /// List session directories, optionally pruning old ones
    Sessions {
        /// Remove sessions older than this many hours
        #[arg(long)]
        prune_older_than: Option<u64>,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = config::get().clone();

    match args.command {
        Some(Commands::Run {
            cases: source,
            adb,
            serial,
            package,
            launch,
            max_attempts,
            fail_fast,
            mock_device,
            output,
            json,
            vlm,
        }) => {
            vlm.apply(&mut config);
            if let Some(adb) = adb {
                config.device.adb_path = adb;
            }
            if serial.is_some() {
                config.device.serial = serial;
            }
            if let Some(package) = package {
                config.device.package = package;
            }
            if let Some(attempts) = max_attempts {
                config.navigator.max_attempts = attempts;
            }

            // Ingestion failures abort before anything touches the device
            let suite = cases::load(&source).inspect_err(|e| {
                error!(%e, "cannot load test cases");
            })?;

            let session = match &output {
                Some(dir) => Session::in_dir(dir),
                None => Session::with_name_in(&config.session.base_dir, "run"),
            };

            let classifier = ScreenClassifier::from_settings(&config.vlm);
            if classifier.ai_enabled() {
                match check_health(&config.vlm.endpoint, 5) {
                    Ok(true) => info!(endpoint = %config.vlm.endpoint, "VLM endpoint responding"),
                    Ok(false) | Err(_) => warn!(
                        endpoint = %config.vlm.endpoint,
                        "VLM endpoint not responding, classifications will fall back"
                    ),
                }
            } else {
                warn!("{} not set, using fallback brain (no taps will be suggested)", ENV_API_KEY);
            }

            let device: Box<dyn DeviceBridge> = if mock_device {
                // Nothing on a mock device needs time to settle
                config.navigator.clear_settle_ms = 0;
                config.navigator.guess_settle_ms = 0;
                config.navigator.action_settle_ms = 0;
                Box::new(MockDevice::new(&session.dir))
            } else {
                let mut bridge = AdbBridge::new(AdbConfig::new(&config.device, &session.dir));
                if launch {
                    info!(package = %config.device.package, "launching app");
                    bridge.launch_app()?;
                }
                Box::new(bridge)
            };
            session.init(&device.describe(), classifier.ai_enabled())?;

            let policy = if fail_fast { FailurePolicy::Abort } else { FailurePolicy::Continue };
            let mut runner = Runner::new(device, classifier)
                .settings(ExecutionSettings::from_defaults(&config.navigator))
                .policy(policy);
            runner.run_all(&suite);

            let run_report = runner.report();
            let (html_path, json_path) = session.report_paths();
            let html_path = report::write_html(&run_report, &html_path)?;
            report::write_json(&run_report, &json_path)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&run_report)?);
            } else {
                let summary = run_report.summary;
                println!(
                    "Run completed: {} tests, {} passed, {} failed, {} bugs found",
                    summary.total, summary.passed, summary.failed, summary.bugs_found
                );
                if summary.errored > 0 {
                    println!("  {} test case(s) hit device errors", summary.errored);
                }
                println!("Report: {}", html_path.display());
                println!(
                    "\nSession: {} ({} screenshots)",
                    session.dir.display(),
                    session.list_captures()?.len()
                );
            }

            if run_report.aborted {
                return Err("run aborted after a device error".into());
            }
        }

        Some(Commands::Classify {
            screenshot,
            expected,
            vlm,
        }) => {
            vlm.apply(&mut config);
            if !screenshot.is_file() {
                return Err(format!("screenshot not found: {}", screenshot.display()).into());
            }

            let classifier = ScreenClassifier::from_settings(&config.vlm);
            let shot = ScreenshotRef::from_file(&screenshot);
            let classification = classifier.classify(&shot);

            let mut result = serde_json::json!({
                "screenshot": screenshot,
                "ai_enabled": classifier.ai_enabled(),
                "classification": classification,
            });
            if let Some(expected) = expected {
                result["bug_check"] = serde_json::to_value(classifier.detect_bug(&shot, &expected))?;
            }
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Some(Commands::Cases { cases: source }) => {
            let suite = cases::load(&source)?;
            println!("{}", serde_json::to_string_pretty(&suite)?);
        }

        Some(Commands::Sessions { prune_older_than }) => {
            let base = PathBuf::from(&config.session.base_dir);
            if let Some(hours) = prune_older_than {
                let removed = cleanup_old_sessions(&base, Duration::from_secs(hours * 3600))?;
                println!("Removed {} session(s) older than {}h", removed, hours);
            }
            print_sessions(&base)?;
        }

        None => {
            println!("droid-vision - Android game UI testing with vision model decisions");
            println!();
            println!("Usage: droid-vision <COMMAND>");
            println!();
            println!("Commands:");
            println!("  run       Run test cases against a device and write a report");
            println!("  classify  Classify one screenshot");
            println!("  cases     Show the normalized test cases of a source");
            println!("  sessions  List or prune session directories");
            println!();
            println!("Run with --help for more information.");
        }
    }

    Ok(())
}

fn print_sessions(base: &Path) -> std::io::Result<()> {
    let sessions = list_sessions(base)?;
    if sessions.is_empty() {
        println!("No sessions under {}", base.display());
    }
    for dir in sessions {
        println!("{}", dir.display());
    }
    Ok(())
}
