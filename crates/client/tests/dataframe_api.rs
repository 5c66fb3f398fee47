use quarry_client::expr::{alias, col, gt, lit_i64, max, sum};
use quarry_client::ExecutionContext;
use quarry_common::{EngineConfig, QuarryError};

mod support;

#[test]
fn dataframe_builders_compose_into_a_runnable_plan() {
    let path = support::write_fixture_csv();
    let ctx = ExecutionContext::new();

    let frame = ctx
        .csv(&path)
        .expect("open csv")
        .filter(gt(col("age"), lit_i64(10)))
        .project(vec![col("id"), col("age")]);

    let schema = frame.schema().expect("schema");
    assert_eq!(schema.field(0).name(), "id");
    assert_eq!(schema.field(1).name(), "age");

    let batches = ctx.collect(&frame).expect("collect");
    assert_eq!(support::int64_column(&batches, "id"), vec![4, 5, 6, 7]);

    let _ = std::fs::remove_file(path);
}

#[test]
fn dataframe_aggregate_mirrors_sql_group_by() {
    let path = support::write_fixture_csv();
    let ctx = ExecutionContext::new();

    let frame = ctx
        .csv(&path)
        .expect("open csv")
        .aggregate(vec![col("name")], vec![max(col("age"))]);

    let batches = ctx.collect(&frame).expect("collect");
    assert_eq!(support::total_rows(&batches), 7);
    assert_eq!(support::column_names(&batches), vec!["name", "MAX(age)"]);

    let _ = std::fs::remove_file(path);
}

#[test]
fn aliased_aggregates_name_their_output_columns() {
    let path = support::write_fixture_csv();
    let ctx = ExecutionContext::new();

    let frame = ctx
        .csv(&path)
        .expect("open csv")
        .aggregate(vec![], vec![alias(sum(col("age")), "total")]);

    let batches = ctx.collect(&frame).expect("collect");
    assert_eq!(support::column_names(&batches), vec!["total"]);
    assert_eq!(support::int64_column(&batches, "total"), vec![248]);

    let _ = std::fs::remove_file(path);
}

#[test]
fn small_batch_sizes_preserve_boundaries_and_row_order() {
    let path = support::write_fixture_csv();
    let ctx = ExecutionContext::with_config(EngineConfig { batch_size_rows: 2 });

    let frame = ctx
        .csv(&path)
        .expect("open csv")
        .filter(gt(col("age"), lit_i64(0)))
        .project(vec![col("id")]);

    let batches = ctx.collect(&frame).expect("collect");
    // 7 rows at 2 rows per scan batch: operators keep the child's batching.
    assert_eq!(batches.len(), 4);
    assert_eq!(
        batches.iter().map(|b| b.num_rows()).collect::<Vec<_>>(),
        vec![2, 2, 2, 1]
    );
    assert_eq!(
        support::int64_column(&batches, "id"),
        vec![1, 2, 3, 4, 5, 6, 7]
    );

    let _ = std::fs::remove_file(path);
}

#[test]
fn explain_renders_the_plan_tree() {
    let path = support::write_fixture_csv();
    let ctx = ExecutionContext::new();

    let frame = ctx.csv(&path).expect("open csv").project(vec![col("id")]);
    let rendered = frame.explain();
    assert!(rendered.starts_with("Projection: id\n"), "{rendered}");
    assert!(rendered.contains("Scan"), "{rendered}");

    let _ = std::fs::remove_file(path);
}

#[test]
fn catalog_file_registers_tables() {
    let csv_path = support::write_fixture_csv();
    let catalog_path = support::unique_path("quarry_catalog", "json");
    let payload = format!(
        r#"[{{"name":"people","uri":"{}","format":"csv"}}]"#,
        csv_path.display()
    );
    std::fs::write(&catalog_path, payload).expect("write catalog");

    let mut ctx = ExecutionContext::new();
    ctx.register_catalog_file(catalog_path.to_str().expect("utf8 path"))
        .expect("register catalog");
    assert_eq!(ctx.table_names(), vec!["people".to_string()]);

    let batches = ctx
        .collect(&ctx.sql("SELECT id FROM people").expect("plan"))
        .expect("collect");
    assert_eq!(support::total_rows(&batches), 7);

    let _ = std::fs::remove_file(csv_path);
    let _ = std::fs::remove_file(catalog_path);
}

#[test]
fn parquet_registration_is_unimplemented() {
    let ctx = ExecutionContext::new();
    let err = ctx.parquet("data.parquet").expect_err("should fail");
    assert!(matches!(err, QuarryError::Unimplemented(_)), "{err}");
}
