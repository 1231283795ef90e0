//! Runs the solver binary on the instances of the integration tests.
#![allow(
    dead_code,
    reason = "is used in integration tests but unable to find a way to silence these warnings"
)]

use std::fs::File;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::ExitStatus;
use std::process::Stdio;
use std::time::Duration;

use regex::Regex;
use wait_timeout::ChildExt;

#[derive(Debug)]
pub(crate) struct SolverOutput {
    pub(crate) status: ExitStatus,
    pub(crate) stdout: String,
}

impl SolverOutput {
    /// The lines following every `Answer:` line, sorted.
    pub(crate) fn answer_sets(&self) -> Vec<String> {
        let answer = Regex::new(r"(?m)^Answer: \d+\n(.*)$").expect("valid regex");
        let mut answer_sets = answer
            .captures_iter(&self.stdout)
            .map(|captures| captures[1].to_owned())
            .collect::<Vec<_>>();
        answer_sets.sort();
        answer_sets
    }

    /// The `v` lines of the DIMACS output, sorted.
    pub(crate) fn value_lines(&self) -> Vec<String> {
        let mut lines = self
            .stdout
            .lines()
            .filter(|line| line.starts_with("v "))
            .map(str::to_owned)
            .collect::<Vec<_>>();
        lines.sort();
        lines
    }

    pub(crate) fn contains_line(&self, expected: &str) -> bool {
        self.stdout.lines().any(|line| line == expected)
    }
}

pub(crate) fn instance(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("instances")
        .join(name)
}

pub(crate) fn run_solver(instance_name: &str) -> SolverOutput {
    run_solver_with_options(instance_name, [], "default")
}

pub(crate) fn run_solver_with_options<'a>(
    instance_name: &str,
    args: impl IntoIterator<Item = &'a str>,
    prefix: &str,
) -> SolverOutput {
    const TEST_TIMEOUT: Duration = Duration::from_secs(60);

    let solver = PathBuf::from(env!("CARGO_BIN_EXE_aspen-solver"));
    let log_file_path =
        Path::new(env!("CARGO_TARGET_TMPDIR")).join(format!("{instance_name}.{prefix}.log"));

    let mut command = Command::new(solver);
    for arg in args {
        let _ = command.arg(arg);
    }

    let mut child = command
        .arg(instance(instance_name))
        .stdout(File::create(&log_file_path).expect("Failed to create log file."))
        .stderr(Stdio::null())
        .stdin(Stdio::null())
        .spawn()
        .expect("Failed to run solver.");

    let status = match child.wait_timeout(TEST_TIMEOUT) {
        Ok(None) => panic!("solver took more than {} seconds", TEST_TIMEOUT.as_secs()),
        Ok(Some(status)) => status,
        Err(e) => panic!("error starting solver: {e}"),
    };

    let stdout = std::fs::read_to_string(&log_file_path).expect("Failed to read log file.");
    std::fs::remove_file(&log_file_path).expect("Failed to remove log file.");

    SolverOutput { status, stdout }
}
