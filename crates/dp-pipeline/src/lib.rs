//! dp-pipeline - Intersection orchestrator for deter-publish
//!
//! Runs the DETER Cerrado publish pipeline entirely inside the database:
//! stage new alerts in a scratch table, intersect them with county
//! boundaries, enrich the result with conservation units, and append it to
//! the table the map server publishes. All geometry work is delegated to
//! PostGIS; this crate decides what runs, in which order, and inside which
//! transaction.
//!
//! Split into submodules:
//! - `statements`: SQL text built from validated configuration names
//! - `session`: a connected database handle that tags errors with context
//! - `jobber`: scratch tables and the run-scoped identifier sequence
//! - `tracker`: last processed date and identifier of the output table
//! - `intersect`: staging, county join and conservation-unit join
//! - `orchestrator`: public operations and the transaction envelope

pub mod error;
pub mod intersect;
pub mod jobber;
pub mod orchestrator;
pub mod session;
pub mod statements;
pub mod tracker;

pub use error::{PublishError, PublishResult};
pub use intersect::{IntersectionPipeline, JoinOutcome};
pub use jobber::IntermediaryTables;
pub use orchestrator::{IntersectionOrchestrator, OutputStatus};
pub use session::Session;
pub use statements::Statements;
pub use tracker::{Lookup, StateTracker};

#[cfg(test)]
pub(crate) mod test_utils;
