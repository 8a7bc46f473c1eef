//! dp-core - Core library for deter-publish
//!
//! This crate provides the immutable publish configuration, the validated
//! identifier types every generated statement is built from, and the
//! calendar helpers shared by the pipeline and the CLI.

pub mod config;
pub mod error;
pub mod ident;
pub mod month;

pub use config::{Config, DatabaseConfig, DbType, PublishConfig};
pub use error::{CoreError, CoreResult};
pub use ident::{Ident, QualifiedName};
pub use month::publish_month;
