//! Writes statistics as aligned `name : value` lines behind a comment prefix, which keeps them
//! separate from the answer lines printed by the front-end.

use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::io::stdout;
use std::io::Write;
use std::sync::OnceLock;
use std::sync::RwLock;

use convert_case::Case;
use convert_case::Casing;

/// Column width used to align the statistic names.
const NAME_WIDTH: usize = 24;

/// Where and how statistics are written.
pub struct StatisticOptions<'a> {
    /// Printed in front of every statistic line (e.g. `c`).
    statistic_prefix: &'a str,
    /// Optional line printed once all statistics have been logged.
    after_statistics: Option<&'a str>,
    /// Optional casing applied to statistic names.
    statistics_casing: Option<Case>,
    statistics_writer: Box<dyn Write + Send + Sync>,
}

impl Debug for StatisticOptions<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatisticOptions")
            .field("statistic_prefix", &self.statistic_prefix)
            .field("after_statistics", &self.after_statistics)
            .field("statistics_casing", &self.statistics_casing)
            .field("statistics_writer", &"<Writer>")
            .finish()
    }
}

static STATISTIC_OPTIONS: OnceLock<RwLock<StatisticOptions<'static>>> = OnceLock::new();

/// Enables statistic logging.
///
/// Only the first call has an effect. Without a writer, statistics go to stdout.
pub fn configure_statistic_logging(
    prefix: &'static str,
    after: Option<&'static str>,
    casing: Option<Case>,
    writer: Option<Box<dyn Write + Send + Sync>>,
) {
    let _ = STATISTIC_OPTIONS.get_or_init(|| {
        RwLock::new(StatisticOptions {
            statistic_prefix: prefix,
            after_statistics: after,
            statistics_casing: casing,
            statistics_writer: writer.unwrap_or_else(|| Box::new(stdout())),
        })
    });
}

/// Logs a single statistic as `PREFIX name : value`; does nothing when logging was never
/// configured.
pub fn log_statistic(name: impl Display, value: impl Display) {
    let Some(lock) = STATISTIC_OPTIONS.get() else {
        return;
    };
    let Ok(mut options) = lock.write() else {
        return;
    };

    let name = match &options.statistics_casing {
        Some(casing) => name.to_string().to_case(*casing),
        None => name.to_string(),
    };
    let prefix = options.statistic_prefix;
    let _ = writeln!(
        options.statistics_writer,
        "{prefix} {name:<NAME_WIDTH$}: {value}"
    );
}

/// Logs the closing line, if one was configured.
pub fn log_statistic_postfix() {
    let Some(lock) = STATISTIC_OPTIONS.get() else {
        return;
    };
    if let Ok(mut options) = lock.write() {
        if let Some(postfix) = options.after_statistics {
            let _ = writeln!(options.statistics_writer, "{postfix}");
        }
        let _ = options.statistics_writer.flush();
    }
}

/// Whether [`configure_statistic_logging`] has been called.
pub fn should_log_statistics() -> bool {
    STATISTIC_OPTIONS.get().is_some()
}
