pub(crate) mod effects;
pub(crate) mod process;
