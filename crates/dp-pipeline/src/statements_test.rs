use super::*;
use crate::test_utils::publish_config;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_drop_jobber_tables_one_per_table() {
    let cfg = publish_config();
    let stmts = Statements::new(&cfg);
    assert_eq!(
        stmts.drop_jobber_tables(),
        vec![
            r#"DROP TABLE IF EXISTS "jobber"."deter_tmp""#.to_string(),
            r#"DROP TABLE IF EXISTS "jobber"."deter_aux""#.to_string(),
        ]
    );
}

#[test]
fn test_sequence_lifecycle() {
    let cfg = publish_config();
    let stmts = Statements::new(&cfg);
    assert_eq!(
        stmts.create_sequence(),
        r#"CREATE SEQUENCE "jobber"."deter_gid_seq" INCREMENT 1 MINVALUE 1 MAXVALUE 9223372036854775807 START 1 CACHE 1"#
    );
    assert_eq!(
        stmts.reset_sequence(101),
        r#"ALTER SEQUENCE "jobber"."deter_gid_seq" RESTART WITH 101"#
    );
    assert_eq!(
        stmts.drop_sequence(),
        r#"DROP SEQUENCE "jobber"."deter_gid_seq""#
    );
}

#[test]
fn test_output_table_exists_filters_schema_and_name() {
    let cfg = publish_config();
    let sql = Statements::new(&cfg).output_table_exists();
    assert!(sql.starts_with("SELECT EXISTS("));
    assert!(sql.contains("table_schema = 'public'"));
    assert!(sql.contains("table_name = 'deter_publish'"));
}

#[test]
fn test_state_queries_target_output_table() {
    let cfg = publish_config();
    let stmts = Statements::new(&cfg);
    assert_eq!(
        stmts.max_created_date(),
        r#"SELECT CAST(MAX(CAST(created_date AS DATE)) AS VARCHAR) FROM "public"."deter_publish""#
    );
    assert_eq!(
        stmts.max_gid(),
        r#"SELECT MAX(gid) FROM "public"."deter_publish""#
    );
}

#[test]
fn test_truncate_keeps_table_and_restarts_identity() {
    let cfg = publish_config();
    let stmts = Statements::new(&cfg);
    assert_eq!(
        stmts.truncate_output(),
        r#"TRUNCATE "public"."deter_publish" RESTART IDENTITY"#
    );
    assert_eq!(
        stmts.drop_output(),
        r#"DROP TABLE IF EXISTS "public"."deter_publish""#
    );
}

#[test]
fn test_create_work_table_without_baseline_takes_all_alerts() {
    let cfg = publish_config();
    let sql = Statements::new(&cfg).create_work_table(None);
    assert!(sql.starts_with(r#"CREATE TABLE "jobber"."deter_tmp" AS SELECT nextval('"jobber"."deter_gid_seq"') AS gid, "#));
    assert!(sql.contains(r#"FROM "public"."deter_cerrado" AS alerts"#));
    assert!(sql.ends_with("WHERE alerts.view_date IS NOT NULL"));
    assert!(sql.contains("alerts.spatial_data AS geometries"));
}

#[test]
fn test_create_work_table_with_baseline_filters_by_creation_date() {
    let cfg = publish_config();
    let sql = Statements::new(&cfg).create_work_table(Some(date(2023, 1, 15)));
    assert!(sql.ends_with(
        "WHERE alerts.view_date IS NOT NULL AND CAST(alerts.created_date AS DATE) > DATE '2023-01-15'"
    ));
}

#[test]
fn test_total_area_is_geodesic_km2() {
    let cfg = publish_config();
    let stmts = Statements::new(&cfg);
    assert_eq!(
        stmts.add_total_area_column(),
        r#"ALTER TABLE "jobber"."deter_tmp" ADD COLUMN area_total_km double precision"#
    );
    assert_eq!(
        stmts.compute_total_area(),
        r#"UPDATE "jobber"."deter_tmp" SET area_total_km = ST_Area((geometries)::geography) / 1000000"#
    );
}

#[test]
fn test_spatial_index_name_derived_from_table() {
    let cfg = publish_config();
    let stmts = Statements::new(&cfg);
    let sql = stmts
        .create_spatial_index(cfg.work_table(), WORK_GEOMETRY_COLUMN)
        .unwrap();
    assert_eq!(
        sql,
        r#"CREATE INDEX "sidx_jobber_deter_tmp_geometries" ON "jobber"."deter_tmp" USING gist (geometries)"#
    );
}

#[test]
fn test_county_join_uses_bbox_and_exact_predicate() {
    let cfg = publish_config();
    let sql = Statements::new(&cfg).county_join();
    assert!(sql.contains(r#"FROM "jobber"."deter_tmp" AS alerts LEFT JOIN "jobber"."municipios" AS mun"#));
    assert!(sql.contains(
        "ON ((alerts.geometries && mun.geom) AND ST_Intersects(alerts.geometries, mun.geom))"
    ));
    assert!(sql.contains(
        "COALESCE(ST_Multi(ST_CollectionExtract(ST_Intersection(alerts.geometries, mun.geom), 3)), alerts.geometries) AS geom"
    ));
    assert!(sql.contains(r#"nextval('"jobber"."deter_gid_seq"') AS gid"#));
}

#[test]
fn test_create_output_from_join_is_full_build() {
    let cfg = publish_config();
    let stmts = Statements::new(&cfg);
    let sql = stmts.create_output_from_join();
    assert!(sql.starts_with(r#"CREATE TABLE "public"."deter_publish" AS SELECT alerts.origin_gid"#));
    assert!(sql.ends_with(&stmts.county_join()));
}

#[test]
fn test_insert_output_lists_every_published_column() {
    let cfg = publish_config();
    let sql = Statements::new(&cfg).insert_output_from_join();
    assert!(sql.starts_with(
        r#"INSERT INTO "public"."deter_publish" (origin_gid, classname, quadrant, path_row, view_date, created_date, sensor, satellite, areatotalkm, areauckm, uc, areamunkm, county, uf, geocod, geom, gid) SELECT joined.origin_gid, "#
    ));
    assert!(sql.ends_with(") AS joined"));
    assert!(!sql.contains("publish_month"));
}

#[test]
fn test_delete_unmatched_targets_null_county_area() {
    let cfg = publish_config();
    assert_eq!(
        Statements::new(&cfg).delete_unmatched(),
        r#"DELETE FROM "public"."deter_publish" WHERE areamunkm IS NULL"#
    );
}

#[test]
fn test_publish_month_statements() {
    let cfg = publish_config();
    let stmts = Statements::new(&cfg);
    assert_eq!(
        stmts.backfill_publish_month(),
        r#"UPDATE "public"."deter_publish" SET publish_month = CAST(date_trunc('month', view_date) AS DATE)"#
    );
    assert_eq!(
        stmts.create_publish_month_index(),
        r#"CREATE INDEX publish_month_idx ON "public"."deter_publish" USING btree (publish_month ASC NULLS LAST)"#
    );
    assert_eq!(
        stmts.cluster_on_publish_month(),
        r#"ALTER TABLE "public"."deter_publish" CLUSTER ON publish_month_idx"#
    );
}

#[test]
fn test_primary_key_and_geometry_index() {
    let cfg = publish_config();
    let stmts = Statements::new(&cfg);
    assert_eq!(
        stmts.set_gid_not_null(),
        r#"ALTER TABLE "public"."deter_publish" ALTER COLUMN gid SET NOT NULL"#
    );
    assert_eq!(
        stmts.add_gid_primary_key(),
        r#"ALTER TABLE "public"."deter_publish" ADD PRIMARY KEY (gid)"#
    );
    assert_eq!(
        stmts.create_output_geometry_index().unwrap(),
        r#"CREATE INDEX "deter_publish_geom_index" ON "public"."deter_publish" USING gist (geom)"#
    );
}

#[test]
fn test_conservation_unit_update_prefers_highest_sphere() {
    let cfg = publish_config();
    let sql = Statements::new(&cfg).update_conservation_units();
    assert!(sql.starts_with("WITH alerts_ucs AS (SELECT DISTINCT ON (alerts.gid) alerts.gid, "));
    assert!(sql.contains(r#"INNER JOIN "jobber"."ucs" AS uc"#));
    assert!(sql.contains("ORDER BY alerts.gid, uc.esfera_pri DESC) "));
    assert!(sql.contains(r#"UPDATE "public"."deter_publish" AS target SET areauckm = alerts_ucs.area, uc = alerts_ucs.nome"#));
    assert!(sql.ends_with("WHERE target.gid = alerts_ucs.gid"));
}

#[test]
fn test_savepoint_statements() {
    let cfg = publish_config();
    let stmts = Statements::new(&cfg);
    assert_eq!(stmts.savepoint(BASELINE_SAVEPOINT), "SAVEPOINT dp_baseline");
    assert_eq!(
        stmts.release_savepoint(BASELINE_SAVEPOINT),
        "RELEASE SAVEPOINT dp_baseline"
    );
    assert_eq!(
        stmts.rollback_to_savepoint(BASELINE_SAVEPOINT),
        "ROLLBACK TO SAVEPOINT dp_baseline"
    );
}
