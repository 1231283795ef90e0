//! Integer sequences used to schedule restarts.
mod constant;
mod geometric;
mod inner_outer;
mod luby;
mod sequence_generator;

pub use constant::ConstantSequence;
pub use geometric::GeometricSequence;
pub use inner_outer::InnerOuterSequence;
pub use luby::LubySequence;
pub use sequence_generator::SequenceGenerator;
