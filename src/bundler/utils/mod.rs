//! Filesystem and subprocess helpers shared by the pipeline stages.

pub mod fs;
pub mod process;
