use super::RestartParams;
use crate::basic_types::sequence_generators::ConstantSequence;
use crate::basic_types::sequence_generators::GeometricSequence;
use crate::basic_types::sequence_generators::InnerOuterSequence;
use crate::basic_types::sequence_generators::LubySequence;
use crate::basic_types::sequence_generators::SequenceGenerator;

/// The conflict limits of successive search calls.
#[derive(Debug)]
pub(crate) struct RestartSchedule {
    params: RestartParams,
    sequence: Box<dyn SequenceGenerator>,
}

impl RestartSchedule {
    pub(crate) fn new(params: RestartParams) -> RestartSchedule {
        RestartSchedule {
            params,
            sequence: sequence(&params),
        }
    }

    pub(crate) fn next_limit(&mut self) -> u64 {
        self.sequence.next()
    }

    /// Starts the sequence over.
    pub(crate) fn reset(&mut self) {
        self.sequence = sequence(&self.params);
    }
}

fn sequence(params: &RestartParams) -> Box<dyn SequenceGenerator> {
    if params.base == 0 {
        Box::new(ConstantSequence::new(u64::MAX))
    } else if params.inc == 0.0 {
        Box::new(LubySequence::new(params.base))
    } else if params.outer == 0 {
        Box::new(GeometricSequence::new(params.base, params.inc))
    } else {
        Box::new(InnerOuterSequence::new(
            params.base,
            params.inc,
            params.outer,
        ))
    }
}
