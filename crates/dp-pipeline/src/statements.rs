//! SQL statement builders.
//!
//! Every relation, sequence and index name comes from the validated
//! [`PublishConfig`]; the only dynamic values are typed (`NaiveDate`, `i64`).
//! Column names are fixed by the alert, boundary and publish layouts below.

use chrono::NaiveDate;
use dp_core::ident::escape_sql_string;
use dp_core::{CoreResult, Ident, PublishConfig, QualifiedName};

/// Geometry column of the staged alerts
pub const WORK_GEOMETRY_COLUMN: &str = "geometries";

/// Geometry column of the output table
pub const OUTPUT_GEOMETRY_COLUMN: &str = "geom";

/// Index the output table is clustered on
pub const PUBLISH_MONTH_INDEX: &str = "publish_month_idx";

/// Savepoint fencing off the baseline reads
pub const BASELINE_SAVEPOINT: &str = "dp_baseline";

/// Output columns written by the county join, in insert order.
///
/// Together with `publish_month` these are the columns the map server binds
/// to; names and types must not change between runs.
pub const OUTPUT_COLUMNS: &[&str] = &[
    "origin_gid",
    "classname",
    "quadrant",
    "path_row",
    "view_date",
    "created_date",
    "sensor",
    "satellite",
    "areatotalkm",
    "areauckm",
    "uc",
    "areamunkm",
    "county",
    "uf",
    "geocod",
    "geom",
    "gid",
];

/// Statement builder over one publish configuration
#[derive(Clone, Copy)]
pub struct Statements<'a> {
    cfg: &'a PublishConfig,
}

impl<'a> Statements<'a> {
    /// Build statements for `cfg`
    pub fn new(cfg: &'a PublishConfig) -> Self {
        Self { cfg }
    }

    /// The configuration names are drawn from
    pub fn config(&self) -> &'a PublishConfig {
        self.cfg
    }

    // ===== Scratch tables and sequence =====

    /// `DROP TABLE IF EXISTS` for one relation
    pub fn drop_table_if_exists(&self, table: &QualifiedName) -> String {
        format!("DROP TABLE IF EXISTS {table}")
    }

    /// One drop statement per configured jobber table, ordered by key
    pub fn drop_jobber_tables(&self) -> Vec<String> {
        self.cfg
            .jobber_tables()
            .map(|t| self.drop_table_if_exists(t))
            .collect()
    }

    /// Create the run-scoped identifier sequence
    pub fn create_sequence(&self) -> String {
        format!(
            "CREATE SEQUENCE {} INCREMENT 1 MINVALUE 1 MAXVALUE 9223372036854775807 START 1 CACHE 1",
            self.cfg.sequence()
        )
    }

    /// Restart the sequence so the next `nextval` returns `start`
    pub fn reset_sequence(&self, start: i64) -> String {
        format!("ALTER SEQUENCE {} RESTART WITH {start}", self.cfg.sequence())
    }

    /// Drop the run-scoped identifier sequence
    pub fn drop_sequence(&self) -> String {
        format!("DROP SEQUENCE {}", self.cfg.sequence())
    }

    fn next_gid(&self) -> String {
        format!("nextval({})", self.cfg.sequence().literal())
    }

    // ===== Output table state =====

    /// Open a savepoint
    pub fn savepoint(&self, name: &str) -> String {
        format!("SAVEPOINT {name}")
    }

    /// Keep the work done since the savepoint
    pub fn release_savepoint(&self, name: &str) -> String {
        format!("RELEASE SAVEPOINT {name}")
    }

    /// Undo the work done since the savepoint, clearing a failed statement
    pub fn rollback_to_savepoint(&self, name: &str) -> String {
        format!("ROLLBACK TO SAVEPOINT {name}")
    }

    /// Whether the output table exists, as a single boolean
    pub fn output_table_exists(&self) -> String {
        let output = self.cfg.output_table();
        format!(
            "SELECT EXISTS(SELECT 1 FROM information_schema.tables WHERE table_schema = '{}' AND table_name = '{}')",
            escape_sql_string(output.schema().as_str()),
            escape_sql_string(output.name().as_str())
        )
    }

    /// Most recent creation date in the output table, as `YYYY-MM-DD` text
    pub fn max_created_date(&self) -> String {
        format!(
            "SELECT CAST(MAX(CAST(created_date AS DATE)) AS VARCHAR) FROM {}",
            self.cfg.output_table()
        )
    }

    /// Highest identifier in the output table
    pub fn max_gid(&self) -> String {
        format!("SELECT MAX(gid) FROM {}", self.cfg.output_table())
    }

    /// Empty the output table, keeping it (and the map server's binding) alive
    pub fn truncate_output(&self) -> String {
        format!("TRUNCATE {} RESTART IDENTITY", self.cfg.output_table())
    }

    /// Drop the output table
    pub fn drop_output(&self) -> String {
        self.drop_table_if_exists(self.cfg.output_table())
    }

    // ===== Staging =====

    /// Stage alerts with a view date, optionally only those created after
    /// `since`, numbering them from the sequence
    pub fn create_work_table(&self, since: Option<NaiveDate>) -> String {
        let mut sql = format!(
            "CREATE TABLE {work} AS \
             SELECT {gid} AS gid, \
             alerts.object_id AS origin_gid, \
             alerts.cell_oid, \
             alerts.class_name, \
             alerts.quadrant, \
             alerts.path_row, \
             alerts.view_date, \
             CAST(alerts.created_date AS DATE) AS created_date, \
             alerts.sensor, \
             alerts.satellite, \
             alerts.spatial_data AS {geometry} \
             FROM {input} AS alerts \
             WHERE alerts.view_date IS NOT NULL",
            work = self.cfg.work_table(),
            gid = self.next_gid(),
            geometry = WORK_GEOMETRY_COLUMN,
            input = self.cfg.input_table(),
        );
        if let Some(date) = since {
            sql.push_str(&format!(
                " AND CAST(alerts.created_date AS DATE) > DATE '{}'",
                date.format("%Y-%m-%d")
            ));
        }
        sql
    }

    /// Add the per-alert total area column to the staged alerts
    pub fn add_total_area_column(&self) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN area_total_km double precision",
            self.cfg.work_table()
        )
    }

    /// Fill the total area column with the geodesic area in km²
    pub fn compute_total_area(&self) -> String {
        format!(
            "UPDATE {} SET area_total_km = ST_Area(({WORK_GEOMETRY_COLUMN})::geography) / 1000000",
            self.cfg.work_table()
        )
    }

    /// GiST index `sidx_<schema>_<table>_<column>` on a geometry column
    pub fn create_spatial_index(&self, table: &QualifiedName, column: &str) -> CoreResult<String> {
        let index = Ident::derived(&[
            "sidx",
            table.schema().as_str(),
            table.name().as_str(),
            column,
        ])?;
        Ok(format!(
            "CREATE INDEX {} ON {table} USING gist ({column})",
            index.quoted()
        ))
    }

    // ===== County join =====

    /// Staged alerts left-joined with the counties they intersect.
    ///
    /// Each pair yields the intersected geometry (multi-polygon, or the alert
    /// geometry when the intersection has no polygonal part) and its area.
    /// Alerts outside every county come out with null county columns.
    pub fn county_join(&self) -> String {
        format!(
            "SELECT alerts.origin_gid, \
             alerts.class_name AS classname, \
             alerts.quadrant, \
             alerts.path_row, \
             alerts.view_date, \
             alerts.created_date, \
             alerts.sensor, \
             alerts.satellite, \
             alerts.area_total_km AS areatotalkm, \
             NULL::double precision AS areauckm, \
             NULL::character varying(255) AS uc, \
             ST_Area(ST_Intersection(alerts.{g}, mun.geom)::geography) / 1000000 AS areamunkm, \
             mun.nm_municip AS county, \
             mun.nm_sigla AS uf, \
             mun.cd_geocmu AS geocod, \
             COALESCE(ST_Multi(ST_CollectionExtract(ST_Intersection(alerts.{g}, mun.geom), 3)), alerts.{g}) AS geom, \
             {gid} AS gid \
             FROM {work} AS alerts \
             LEFT JOIN {county} AS mun \
             ON ((alerts.{g} && mun.geom) AND ST_Intersects(alerts.{g}, mun.geom))",
            g = WORK_GEOMETRY_COLUMN,
            gid = self.next_gid(),
            work = self.cfg.work_table(),
            county = self.cfg.county_table(),
        )
    }

    /// First build: materialize the output table from the county join
    pub fn create_output_from_join(&self) -> String {
        format!(
            "CREATE TABLE {} AS {}",
            self.cfg.output_table(),
            self.county_join()
        )
    }

    /// Incremental build: append the county join to the output table
    pub fn insert_output_from_join(&self) -> String {
        let columns = OUTPUT_COLUMNS.join(", ");
        let selected = OUTPUT_COLUMNS
            .iter()
            .map(|c| format!("joined.{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO {} ({columns}) SELECT {selected} FROM ({}) AS joined",
            self.cfg.output_table(),
            self.county_join()
        )
    }

    /// Remove alerts that fell outside every county
    pub fn delete_unmatched(&self) -> String {
        format!(
            "DELETE FROM {} WHERE areamunkm IS NULL",
            self.cfg.output_table()
        )
    }

    // ===== Output schema =====

    /// Add the monthly publish column
    pub fn add_publish_month_column(&self) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN publish_month date",
            self.cfg.output_table()
        )
    }

    /// Set `publish_month` to the first day of each row's view month
    pub fn backfill_publish_month(&self) -> String {
        format!(
            "UPDATE {} SET publish_month = CAST(date_trunc('month', view_date) AS DATE)",
            self.cfg.output_table()
        )
    }

    /// B-tree index on `publish_month`
    pub fn create_publish_month_index(&self) -> String {
        format!(
            "CREATE INDEX {PUBLISH_MONTH_INDEX} ON {} USING btree (publish_month ASC NULLS LAST)",
            self.cfg.output_table()
        )
    }

    /// Cluster the output table on the `publish_month` index
    pub fn cluster_on_publish_month(&self) -> String {
        format!(
            "ALTER TABLE {} CLUSTER ON {PUBLISH_MONTH_INDEX}",
            self.cfg.output_table()
        )
    }

    /// Forbid null identifiers
    pub fn set_gid_not_null(&self) -> String {
        format!(
            "ALTER TABLE {} ALTER COLUMN gid SET NOT NULL",
            self.cfg.output_table()
        )
    }

    /// Promote `gid` to primary key
    pub fn add_gid_primary_key(&self) -> String {
        format!("ALTER TABLE {} ADD PRIMARY KEY (gid)", self.cfg.output_table())
    }

    /// GiST index `<output_table>_geom_index` on the output geometry
    pub fn create_output_geometry_index(&self) -> CoreResult<String> {
        let output = self.cfg.output_table();
        let index = Ident::derived(&[output.name().as_str(), "geom_index"])?;
        Ok(format!(
            "CREATE INDEX {} ON {output} USING gist ({OUTPUT_GEOMETRY_COLUMN})",
            index.quoted()
        ))
    }

    // ===== Conservation units =====

    /// Enrich output rows in place with the conservation unit they overlap.
    ///
    /// When several units overlap one row, the first after ordering by
    /// `esfera_pri` descending wins. Rows without a match keep null
    /// `areauckm` and `uc`.
    pub fn update_conservation_units(&self) -> String {
        let output = self.cfg.output_table();
        format!(
            "WITH alerts_ucs AS (\
             SELECT DISTINCT ON (alerts.gid) \
             alerts.gid, \
             ST_Area(ST_Intersection(alerts.geom, uc.geom)::geography) / 1000000 AS area, \
             uc.nome_uc1 AS nome \
             FROM {output} AS alerts \
             INNER JOIN {ucs} AS uc \
             ON ((alerts.geom && uc.geom) AND ST_Intersects(alerts.geom, uc.geom)) \
             ORDER BY alerts.gid, uc.esfera_pri DESC\
             ) \
             UPDATE {output} AS target \
             SET areauckm = alerts_ucs.area, uc = alerts_ucs.nome \
             FROM alerts_ucs \
             WHERE target.gid = alerts_ucs.gid",
            ucs = self.cfg.uc_table(),
        )
    }
}

#[cfg(test)]
#[path = "statements_test.rs"]
mod tests;
