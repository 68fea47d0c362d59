//! Pane harness - runs webview lifecycle tests in isolated processes
//!
//! Without arguments every test runs in a freshly spawned child of this
//! executable. With a test name, that test runs here under the watchdog.

use std::process::{Command, ExitCode};

use pane_config::BackendKind;
use tracing_subscriber::EnvFilter;

mod fixtures;
mod registry;
mod scenarios;
mod watchdog;

use registry::TESTS;

fn main() -> ExitCode {
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("pane-harness");

    match args.len() {
        1 => run_all(),
        2 => match registry::find(&args[1]) {
            Some(test) => run_one(test),
            None => usage(program),
        },
        _ => usage(program),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_all() -> ExitCode {
    let exe = match std::env::current_exe() {
        Ok(exe) => exe,
        Err(err) => {
            eprintln!("Cannot locate harness executable: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut failed = false;
    for test in TESTS {
        println!("TEST: {}", test.name);
        match Command::new(&exe).arg(test.name).status() {
            Ok(status) if status.success() => println!("  PASS "),
            Ok(status) => {
                println!("  FAIL: {status}");
                failed = true;
            }
            Err(err) => {
                println!("  FAIL: {err}");
                failed = true;
            }
        }
    }

    if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

fn run_one(test: &registry::TestCase) -> ExitCode {
    let backend = BackendKind::from_env();
    let timeout = pane_config::timeout_from_env();
    tracing::debug!(test = test.name, ?backend, ?timeout, "running test");

    match watchdog::run_with_timeout(|| (test.run)(backend), timeout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}: {err:#}", test.name);
            ExitCode::from(watchdog::FAILURE_STATUS as u8)
        }
    }
}

fn usage(program: &str) -> ExitCode {
    println!("USAGE: {program} [test name]");
    println!("Tests: ");
    for test in TESTS {
        println!("  {}", test.name);
    }
    ExitCode::FAILURE
}
