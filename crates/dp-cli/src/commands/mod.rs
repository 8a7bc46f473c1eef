//! CLI command implementations

pub(crate) mod common;
pub(crate) mod intersections;
pub(crate) mod maintenance;
pub(crate) mod status;
