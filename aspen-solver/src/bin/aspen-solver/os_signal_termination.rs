use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use aspen_solver::termination::TerminationCondition;
use log::warn;

/// The signals which interrupt the search.
const TERMINATION_SIGNALS: &[std::ffi::c_int] =
    &[signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM];

/// A [`TerminationCondition`] which triggers on SIGINT or SIGTERM. The search then stops and the
/// best result found so far is printed.
#[derive(Clone, Debug)]
pub(crate) struct OsSignal {
    signal_received: Arc<AtomicBool>,
}

impl OsSignal {
    /// Creates the condition and registers the signal handlers.
    pub(crate) fn install() -> OsSignal {
        let signal_termination = OsSignal {
            signal_received: Arc::new(AtomicBool::new(false)),
        };

        for &signal in TERMINATION_SIGNALS {
            if let Err(error) =
                signal_hook::flag::register(signal, Arc::clone(&signal_termination.signal_received))
            {
                warn!("Failed to register a handler for signal {signal}: {error}");
            }
        }

        signal_termination
    }
}

impl TerminationCondition for OsSignal {
    fn should_stop(&mut self) -> bool {
        self.signal_received.load(Ordering::Relaxed)
    }
}
