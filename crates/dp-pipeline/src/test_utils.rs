//! Shared test utilities for dp-pipeline

use dp_core::{Config, PublishConfig};
use dp_db::testing::ScriptedDatabase;
use dp_db::{Rows, ScalarValue};
use std::sync::Arc;

/// Publish layout used across unit tests
pub(crate) const TEST_CONFIG: &str = r#"
publish:
  input_schema: public
  input_table: deter_cerrado
  output_schema: public
  output_table: deter_publish
  jobber_schema: jobber
  jobber_tables:
    tb1: deter_tmp
    tb2: deter_aux
  sequence: deter_gid_seq
  uc_table: ucs
  county_table: municipios
"#;

/// Parsed publish configuration for [`TEST_CONFIG`]
pub(crate) fn publish_config() -> PublishConfig {
    Config::parse(TEST_CONFIG).unwrap().publish
}

/// One-row, one-column result
pub(crate) fn single(value: ScalarValue) -> Rows {
    vec![vec![value]]
}

/// Needle matching the output-table existence query
pub(crate) const EXISTS: &str = "information_schema.tables";

/// Needle matching the last-date query
pub(crate) const MAX_DATE: &str = "MAX(CAST(created_date AS DATE))";

/// Needle matching the last-identifier query
pub(crate) const MAX_GID: &str = "MAX(gid)";

/// Scripted database answering the existence query with `answers` in order
pub(crate) fn scripted_with_exists(answers: &[bool]) -> Arc<ScriptedDatabase> {
    let db = Arc::new(ScriptedDatabase::new());
    for answer in answers {
        db.respond(EXISTS, single(ScalarValue::Bool(*answer)));
    }
    db
}
