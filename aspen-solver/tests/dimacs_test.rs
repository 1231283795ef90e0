#![cfg(test)] // workaround for https://github.com/rust-lang/rust-clippy/issues/11024

mod helpers;

use helpers::run_solver;
use helpers::run_solver_with_options;

#[test]
fn satisfiable_formula_prints_a_model() {
    let output = run_solver("sat.cnf");

    assert!(output.status.success());
    assert_eq!(output.value_lines().len(), 1);
    assert!(output.contains_line("c Models: 1"));
    assert!(output.contains_line("s SATISFIABLE"));
}

#[test]
fn all_models_are_enumerated() {
    let output = run_solver_with_options("sat.cnf", ["-n", "0"], "all");

    assert!(output.status.success());
    assert_eq!(
        output.value_lines(),
        vec!["v -1 2 -3 0", "v -1 2 3 0", "v 1 -2 3 0", "v 1 2 3 0"]
    );
    assert!(output.contains_line("c Models: 4"));
}

#[test]
fn recording_models_finds_the_same_models() {
    let output = run_solver_with_options(
        "sat.cnf",
        ["-n", "0", "--enumerate", "record", "--heuristic", "vsids"],
        "record",
    );

    assert!(output.status.success());
    assert_eq!(output.value_lines().len(), 4);
    assert!(output.contains_line("s SATISFIABLE"));
}

#[test]
fn unsatisfiable_formula() {
    let output = run_solver("unsat.cnf");

    assert!(output.status.success());
    assert!(output.value_lines().is_empty());
    assert!(output.contains_line("s UNSATISFIABLE"));
}

#[test]
fn contradicting_units_are_unsatisfiable() {
    let output = run_solver("contradiction.cnf");

    assert!(output.status.success());
    assert!(output.value_lines().is_empty());
    assert!(output.contains_line("s UNSATISFIABLE"));
    assert!(output.contains_line("c Models: 0"));
}

#[test]
fn statistics_are_logged_as_comments() {
    let output = run_solver_with_options("unsat.cnf", ["-s"], "statistics");

    assert!(output.status.success());
    assert!(output
        .stdout
        .lines()
        .any(|line| line.starts_with("c more") && line.ends_with(": false")));
}

#[test]
fn unknown_file_extension_fails() {
    let output = run_solver("sat.txt");

    assert!(!output.status.success());
    assert!(output.stdout.contains("Execution failed"));
}
