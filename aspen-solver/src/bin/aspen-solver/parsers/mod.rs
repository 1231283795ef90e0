pub(crate) mod dimacs;
pub(crate) mod smodels;
