mod file_format;
mod os_signal_termination;
mod output;
mod parsers;
mod result;

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use aspen_solver::constraints::MinimizeMode;
use aspen_solver::convert_case::Case;
use aspen_solver::engine::AntecedentFilter;
use aspen_solver::engine::MinimizationStrategy;
use aspen_solver::enumerators::EnumerationMode;
use aspen_solver::enumerators::Enumerator;
use aspen_solver::solve::solve;
use aspen_solver::solve::RandomisationParams;
use aspen_solver::solve::ReduceParams;
use aspen_solver::solve::RestartParams;
use aspen_solver::solve::SolveParams;
use aspen_solver::solve::SolveResult;
use aspen_solver::statistics::configure_statistic_logging;
use aspen_solver::statistics::log_statistic_postfix;
use aspen_solver::statistics::should_log_statistics;
use aspen_solver::termination::Combinator;
use aspen_solver::termination::TerminationCondition;
use aspen_solver::termination::TimeBudget;
use aspen_solver::HeuristicKind;
use aspen_solver::HeuristicOptions;
use aspen_solver::LookaheadKind;
use aspen_solver::Solver;
use aspen_solver::SolverOptions;
use clap::Parser;
use file_format::FileFormat;
use log::error;
use log::info;
use log::Level;
use log::LevelFilter;
use os_signal_termination::OsSignal;
use output::AspPrinter;
use output::DimacsPrinter;
use parsers::dimacs::parse_cnf;
use parsers::dimacs::DimacsInstance;
use parsers::dimacs::SolverDimacsSink;
use parsers::smodels::parse_smodels;
use parsers::smodels::SmodelsInstance;
use result::AspenError;
use result::AspenResult;

#[derive(Debug, Parser)]
#[command(
    help_template = "\
{before-help}{name} {version}
Authors: {author}
About: {about}

{usage-heading}\n{tab}{usage}

{all-args}{after-help}
",
    author,
    version,
    about,
    arg_required_else_help = true
)]
struct Args {
    /// The instance to solve. The file should have one of the following extensions:
    ///  - '*.cnf' or '*.dimacs' for SAT instances, given in the DIMACS format,
    ///  - '*.sm', '*.smodels' or '*.lparse' for ground logic programs, given in the smodels
    ///    format produced by lparse and gringo.
    #[clap(verbatim_doc_comment)]
    instance_path: PathBuf,

    /// The number of models to compute; 0 computes all of them.
    ///
    /// Defaults to 1 for SAT instances and to the number given in the file for logic programs.
    ///
    /// Possible values: u64 (Optional)
    #[arg(short = 'n', long = "models", verbatim_doc_comment)]
    num_models: Option<u64>,

    /// How the search continues after a model was found.
    ///
    /// - "backtrack" flips the last decision and never jumps back over it
    /// - "record" adds a nogood which excludes the model
    /// - "brave" computes the atoms which are true in some model
    /// - "cautious" computes the atoms which are true in every model
    #[arg(long = "enumerate", value_enum, default_value_t, verbatim_doc_comment)]
    enumeration: EnumerationMode,

    /// Models are only distinguished by their visible (named) atoms.
    ///
    /// Possible values: bool
    #[arg(long = "project", verbatim_doc_comment)]
    project: bool,

    /// Whether models have to be strictly better than the best one found so far ("less") or may
    /// be as good as it ("less-equal").
    #[arg(long = "opt-mode", value_enum, default_value_t, verbatim_doc_comment)]
    minimize: MinimizeMode,

    /// Computes all optimal models instead of a single one.
    ///
    /// Possible values: bool
    #[arg(long = "opt-all", verbatim_doc_comment)]
    optimize_all: bool,

    /// The number of conflicts before the first restart; 0 disables restarts.
    ///
    /// Possible values: u64
    #[arg(long = "restart-base", default_value_t = 100, verbatim_doc_comment)]
    restart_base: u64,

    /// The factor by which the restart limit grows. If 0, the limits follow the Luby sequence
    /// scaled by "--restart-base".
    ///
    /// Possible values: f64
    #[arg(long = "restart-inc", default_value_t = 1.5, verbatim_doc_comment)]
    restart_inc: f64,

    /// The limit at which the geometric restart sequence starts over; 0 never starts over.
    ///
    /// Possible values: u64
    #[arg(long = "restart-outer", default_value_t = 0, verbatim_doc_comment)]
    restart_outer: u64,

    /// Counts the conflicts per subtree of the search instead of globally.
    ///
    /// Possible values: bool
    #[arg(long = "local-restarts", verbatim_doc_comment)]
    local_restarts: bool,

    /// Keeps restarting after a model was found with a backtrack level above the root.
    ///
    /// Possible values: bool
    #[arg(long = "bounded-restarts", verbatim_doc_comment)]
    bounded_restarts: bool,

    /// Starts the restart sequence over after each model.
    ///
    /// Possible values: bool
    #[arg(long = "reset-restarts", verbatim_doc_comment)]
    reset_restarts: bool,

    /// Restarts the search from the root after each recorded model.
    ///
    /// Possible values: bool
    #[arg(long = "restart-on-model", verbatim_doc_comment)]
    restart_on_model: bool,

    /// Shuffles the constraint databases every n restarts; 0 never shuffles.
    ///
    /// Possible values: u64
    #[arg(long = "shuffle", default_value_t = 0, verbatim_doc_comment)]
    shuffle: u64,

    /// The initial limit of learnt clauses is the number of problem constraints divided by this
    /// value; 0 never limits the learnt clauses.
    ///
    /// Possible values: f64
    #[arg(long = "deletion-base", default_value_t = 3.0, verbatim_doc_comment)]
    deletion_base: f64,

    /// The factor by which the limit of learnt clauses grows on every restart.
    ///
    /// Possible values: f64
    #[arg(long = "deletion-inc", default_value_t = 1.1, verbatim_doc_comment)]
    deletion_inc: f64,

    /// The limit of learnt clauses never exceeds this multiple of the number of problem
    /// constraints.
    ///
    /// Possible values: f64
    #[arg(long = "deletion-max", default_value_t = 3.0, verbatim_doc_comment)]
    deletion_max: f64,

    /// Removes a third of the learnt clauses on every restart.
    ///
    /// Possible values: bool
    #[arg(long = "reduce-on-restart", verbatim_doc_comment)]
    reduce_on_restart: bool,

    /// The number of randomised runs before the main search, in which every decision is random.
    ///
    /// Possible values: u32
    #[arg(long = "rand-runs", default_value_t = 0, verbatim_doc_comment)]
    rand_runs: u32,

    /// The number of conflicts after which a randomised run ends.
    ///
    /// Possible values: u64
    #[arg(long = "rand-conflicts", default_value_t = 20, verbatim_doc_comment)]
    rand_conflicts: u64,

    /// The probability of a random decision during the main search.
    ///
    /// Possible values: f64
    #[arg(long = "rand-prob", default_value_t = 0.0, verbatim_doc_comment)]
    rand_prob: f64,

    /// The decision heuristic.
    #[arg(long = "heuristic", value_enum, default_value_t, verbatim_doc_comment)]
    heuristic: HeuristicKind,

    /// Runs failed-literal detection on the given variables before every decision.
    #[arg(long = "lookahead", value_enum, verbatim_doc_comment)]
    lookahead: Option<LookaheadKind>,

    /// The number of decisions after which failed-literal detection is switched off.
    ///
    /// Possible values: u64 (Optional)
    #[arg(long = "lookahead-budget", verbatim_doc_comment)]
    lookahead_budget: Option<u64>,

    /// Runs failed-literal detection once before the search starts.
    ///
    /// Possible values: bool
    #[arg(long = "initial-lookahead", verbatim_doc_comment)]
    initial_lookahead: bool,

    /// Loop nogoods do not influence the decision heuristic.
    ///
    /// Possible values: bool
    #[arg(long = "no-loops", verbatim_doc_comment)]
    no_loops: bool,

    /// The maximum number of learnt clauses BerkMin inspects per decision; 0 is unlimited.
    ///
    /// Possible values: u32
    #[arg(long = "berkmin-max", default_value_t = 0, verbatim_doc_comment)]
    max_berkmin: u32,

    /// Resolves every conflict by flipping the most recent decision instead of learning a clause.
    ///
    /// Possible values: bool
    #[arg(long = "no-learning", verbatim_doc_comment)]
    no_learning: bool,

    /// How learnt clauses are minimised.
    #[arg(long = "minimization", value_enum, default_value_t, verbatim_doc_comment)]
    minimization: MinimizationStrategy,

    /// Which reasons may be used when minimising a learnt clause.
    #[arg(long = "antecedents", value_enum, default_value_t, verbatim_doc_comment)]
    antecedents: AntecedentFilter,

    /// Unassigned variables remember their last value, which is reused on the next decision.
    ///
    /// Possible values: bool
    #[arg(long = "save-progress", verbatim_doc_comment)]
    save_progress: bool,

    /// Shuffles the constraints before the search starts.
    ///
    /// Possible values: bool
    #[arg(long = "rand-watches", verbatim_doc_comment)]
    random_watches: bool,

    /// Learnt clauses longer than this are the first ones removed; 0 disables the limit.
    ///
    /// Possible values: u32
    #[arg(long = "compression", default_value_t = 0, verbatim_doc_comment)]
    compression: u32,

    /// The time budget for the solver, given in milliseconds.
    ///
    /// Possible values: u64 (Optional)
    #[arg(short = 't', long = "time-limit", verbatim_doc_comment)]
    time_limit: Option<u64>,

    /// The random seed to use for the Pseudo Random Number Generator.
    ///
    /// Possible values: u64
    #[arg(
        short = 'r',
        long = "random-seed",
        default_value_t = 42,
        verbatim_doc_comment
    )]
    random_seed: u64,

    /// Enables log message output from the solver.
    ///
    /// Possible values: bool
    #[arg(short = 'v', long = "verbose", verbatim_doc_comment)]
    verbose: bool,

    /// Enables logging of statistics from the solver.
    ///
    /// Possible values: bool
    #[arg(short = 's', long = "log-statistics", verbatim_doc_comment)]
    log_statistics: bool,

    /// If `--verbose` is enabled then this option removes the timestamp information from the log
    /// messages.
    ///
    /// Possible values: bool
    #[arg(long = "omit-timestamp", verbatim_doc_comment)]
    omit_timestamp: bool,

    /// If `--verbose` is enabled then this option removes the call site information from the log
    /// messages. The call site is the file and line from which the message originated.
    ///
    /// Possible values: bool
    #[arg(long = "omit-call-site", default_value_t = false, verbatim_doc_comment)]
    omit_call_site: bool,
}

impl Args {
    fn solver_options(&self) -> SolverOptions {
        SolverOptions {
            learning: !self.no_learning,
            minimization: self.minimization,
            antecedents: self.antecedents,
            save_progress: self.save_progress,
            random_watches: self.random_watches,
            compression: self.compression,
            heuristic: HeuristicOptions {
                kind: self.heuristic,
                lookahead: self.lookahead,
                lookahead_budget: self.lookahead_budget,
                loops: !self.no_loops,
                max_berkmin: self.max_berkmin,
                seed: self.random_seed,
            },
            ..SolverOptions::with_seed(self.random_seed)
        }
    }

    fn solve_params(&self, default_num_models: u64) -> SolveParams {
        SolveParams {
            restart: RestartParams {
                base: self.restart_base,
                inc: self.restart_inc,
                outer: self.restart_outer,
                local: self.local_restarts,
                bounded: self.bounded_restarts,
                reset_on_model: self.reset_restarts,
                restart_on_model: self.restart_on_model,
                shuffle: self.shuffle,
            },
            reduce: ReduceParams {
                base: self.deletion_base,
                inc: self.deletion_inc,
                max: self.deletion_max,
                reduce_on_restart: self.reduce_on_restart,
            },
            randomisation: RandomisationParams {
                runs: self.rand_runs,
                conflicts: self.rand_conflicts,
                probability: self.rand_prob,
            },
            enumeration: self.enumeration,
            num_models: self.num_models.unwrap_or(default_num_models),
            project: self.project,
            minimize: self.minimize,
            optimize_all: self.optimize_all,
        }
    }
}

fn configure_logging(
    verbose: bool,
    log_statistics: bool,
    omit_timestamp: bool,
    omit_call_site: bool,
) -> std::io::Result<()> {
    if log_statistics {
        configure_statistic_logging("c", None, Some(Case::Camel), None);
    }
    let level_filter = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    env_logger::Builder::new()
        .format(move |buf, record| {
            write!(buf, "c ")?;
            if record.level() != Level::Info && !omit_timestamp {
                write!(buf, "{} ", buf.timestamp())?;
            }
            write!(buf, "{} ", record.level())?;
            if record.level() != Level::Info && !omit_call_site {
                write!(
                    buf,
                    "[{}:{}] ",
                    record.file().unwrap_or("unknown"),
                    record.line().unwrap_or(0)
                )?;
            }
            writeln!(buf, "{}", record.args())
        })
        .filter_level(level_filter)
        .target(env_logger::Target::Stdout)
        .init();
    info!("Logging successfully configured");
    Ok(())
}

fn configure_logging_unknown() -> std::io::Result<()> {
    env_logger::Builder::new()
        .format(move |buf, record| writeln!(buf, "c {}", record.args()))
        .filter_level(LevelFilter::Trace)
        .target(env_logger::Target::Stdout)
        .init();
    Ok(())
}

fn main() {
    match run() {
        Ok(()) => {}
        Err(e) => {
            error!("Execution failed, error: {e}");
            std::process::exit(1);
        }
    }
}

fn run() -> AspenResult<()> {
    let args = Args::parse();

    let Some(file_format) = FileFormat::from_path(&args.instance_path) else {
        configure_logging_unknown()?;
        return Err(AspenError::invalid_instance(args.instance_path.display()));
    };

    configure_logging(
        args.verbose,
        args.log_statistics,
        args.omit_timestamp,
        args.omit_call_site,
    )?;
    aspen_solver::print_aspen_assert_warning_message!();

    let time_limit = args.time_limit.map(Duration::from_millis);
    let mut termination = Combinator::new(
        OsSignal::install(),
        time_limit.map(TimeBudget::starting_now),
    );

    match file_format {
        FileFormat::CnfDimacsPLine => cnf_problem(&args, &args.instance_path, &mut termination),
        FileFormat::Smodels => smodels_problem(&args, &args.instance_path, &mut termination),
    }
}

fn cnf_problem(
    args: &Args,
    instance_path: impl AsRef<Path>,
    termination: &mut impl TerminationCondition,
) -> AspenResult<()> {
    let instance_file = File::open(instance_path)?;
    let DimacsInstance {
        mut solver,
        variables,
    } = parse_cnf::<SolverDimacsSink>(instance_file, args.solver_options())?;
    let _ = solver.end_add_constraints(args.initial_lookahead);

    let params = args.solve_params(1);
    let mut enumerator = Enumerator::new(params.enumerator_options());
    let mut printer = DimacsPrinter::new(std::io::stdout(), variables);
    let result = solve(
        &mut solver,
        &params,
        &mut enumerator,
        &mut printer,
        termination,
    );

    log_statistics(&solver, &result, args.verbose);
    Ok(())
}

fn smodels_problem(
    args: &Args,
    instance_path: impl AsRef<Path>,
    termination: &mut impl TerminationCondition,
) -> AspenResult<()> {
    let instance_file = File::open(instance_path)?;
    let SmodelsInstance {
        mut program,
        num_models,
    } = parse_smodels(instance_file)?;

    let mut solver = Solver::new(args.solver_options());
    if program.end_program(&mut solver)? {
        let _ = solver.end_add_constraints(args.initial_lookahead);
    }

    let params = args.solve_params(num_models);
    let visible = program.visible_atoms();
    let mut enumerator = Enumerator::new(params.enumerator_options());
    enumerator.set_visible(visible.iter().map(|&(var, _)| var));
    let mut printer = AspPrinter::new(std::io::stdout(), visible);
    let result = solve(
        &mut solver,
        &params,
        &mut enumerator,
        &mut printer,
        termination,
    );

    log_statistics(&solver, &result, args.verbose);
    Ok(())
}

fn log_statistics(solver: &Solver, result: &SolveResult, verbose: bool) {
    if should_log_statistics() {
        solver.log_statistics(verbose);
        aspen_solver::statistics::log_statistic("more", result.more);
        log_statistic_postfix();
    }
}
