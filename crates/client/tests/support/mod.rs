use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use arrow::array::{Array, Float64Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;

/// Unique temp path so parallel tests never collide.
pub fn unique_path(stem: &str, ext: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("{stem}_{nanos}.{ext}"))
}

/// The seven-row fixture table used across the scenario suites.
pub fn write_fixture_csv() -> PathBuf {
    let path = unique_path("quarry_fixture", "csv");
    let contents = "\
id,name,age,frequency\n\
1,r1,1,1.1\n\
2,r2,2,2.2\n\
3,r3,3,3.3\n\
4,r4,44,4.4\n\
5,r5,55,5.5\n\
6,r6,66,6.6\n\
7,r7,77,7.7\n";
    std::fs::write(&path, contents).expect("write fixture csv");
    path
}

pub fn total_rows(batches: &[RecordBatch]) -> usize {
    batches.iter().map(RecordBatch::num_rows).sum()
}

/// All int64 values of the named column, in emission order.
pub fn int64_column(batches: &[RecordBatch], name: &str) -> Vec<i64> {
    let mut values = Vec::new();
    for batch in batches {
        let index = batch.schema().index_of(name).expect("column exists");
        let array = batch
            .column(index)
            .as_any()
            .downcast_ref::<Int64Array>()
            .expect("int64 column");
        values.extend(array.iter().map(|v| v.expect("non-null value")));
    }
    values
}

/// All float64 values of the named column, in emission order.
pub fn float64_column(batches: &[RecordBatch], name: &str) -> Vec<f64> {
    let mut values = Vec::new();
    for batch in batches {
        let index = batch.schema().index_of(name).expect("column exists");
        let array = batch
            .column(index)
            .as_any()
            .downcast_ref::<Float64Array>()
            .expect("float64 column");
        values.extend(array.iter().map(|v| v.expect("non-null value")));
    }
    values
}

/// All utf8 values of the named column, in emission order.
pub fn string_column(batches: &[RecordBatch], name: &str) -> Vec<String> {
    let mut values = Vec::new();
    for batch in batches {
        let index = batch.schema().index_of(name).expect("column exists");
        let array = batch
            .column(index)
            .as_any()
            .downcast_ref::<StringArray>()
            .expect("utf8 column");
        values.extend(array.iter().map(|v| v.expect("non-null value").to_string()));
    }
    values
}

/// Column names of the result schema.
pub fn column_names(batches: &[RecordBatch]) -> Vec<String> {
    batches
        .first()
        .map(|b| {
            b.schema()
                .fields()
                .iter()
                .map(|f| f.name().clone())
                .collect()
        })
        .unwrap_or_default()
}
