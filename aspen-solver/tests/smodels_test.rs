#![cfg(test)] // workaround for https://github.com/rust-lang/rust-clippy/issues/11024

mod helpers;

use helpers::run_solver;
use helpers::run_solver_with_options;

#[test]
fn even_loop_has_two_answer_sets() {
    let output = run_solver_with_options("even_loop.sm", ["-n", "0"], "all");

    assert!(output.status.success());
    assert_eq!(output.answer_sets(), vec!["a", "b"]);
    assert!(output.contains_line("SATISFIABLE"));
    assert!(output.contains_line("Models: 2"));
}

#[test]
fn number_of_models_is_read_from_the_program() {
    let output = run_solver("even_loop.sm");

    assert!(output.status.success());
    assert_eq!(output.answer_sets().len(), 1);
    assert!(output.contains_line("Models: 1"));
}

#[test]
fn positive_loop_is_unfounded() {
    let output = run_solver("positive_loop.sm");

    assert!(output.status.success());
    assert_eq!(output.answer_sets(), vec![""]);
}

#[test]
fn odd_loop_has_no_answer_set() {
    let output = run_solver("odd_loop.sm");

    assert!(output.status.success());
    assert!(output.answer_sets().is_empty());
    assert!(output.contains_line("UNSATISFIABLE"));
    assert!(output.contains_line("Models: 0"));
}

#[test]
fn choice_rules_with_an_integrity_constraint() {
    let output = run_solver("choice.sm");

    assert!(output.status.success());
    assert_eq!(output.answer_sets(), vec!["a b c", "a c", "b c"]);
}

#[test]
fn brave_consequences() {
    let output = run_solver_with_options("choice.sm", ["--enumerate", "brave"], "brave");

    assert!(output.status.success());
    assert!(output.stdout.contains("Brave consequences:\na b c\n"));
}

#[test]
fn cautious_consequences() {
    let output = run_solver_with_options("choice.sm", ["--enumerate", "cautious"], "cautious");

    assert!(output.status.success());
    assert!(output.stdout.contains("Cautious consequences:\nc\n"));
}

#[test]
fn minimize_statement_finds_the_optimum() {
    let output = run_solver("minimize.sm");

    assert!(output.status.success());
    assert!(output.contains_line("OPTIMUM FOUND"));
    assert!(output.stdout.ends_with("Optimization: 1\n"));
}

#[test]
fn lookahead_does_not_change_the_answer_sets() {
    let output = run_solver_with_options(
        "choice.sm",
        ["--lookahead", "hybrid", "--initial-lookahead", "--heuristic", "vmtf"],
        "lookahead",
    );

    assert!(output.status.success());
    assert_eq!(output.answer_sets(), vec!["a b c", "a c", "b c"]);
}
