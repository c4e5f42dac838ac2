// tests/files_format.rs

use tempfile::TempDir;

use dafdb::{
    evaluate, ArrayData, DafReader, DafWriter, DenseMatrix, FilesDaf, FormatReader, IndexData,
    MajorAxis, MatrixData, QueryValue, ScalarValue, SparseMatrix, VectorData,
};

fn populate(daf: &FilesDaf) {
    daf.set_scalar("version", ScalarValue::Str("v1".to_string()), false)
        .unwrap();
    daf.add_axis(
        "cell",
        vec!["c0".to_string(), "c1".to_string(), "c2".to_string()],
    )
    .unwrap();
    daf.add_axis("gene", vec!["g0".to_string(), "g1".to_string()])
        .unwrap();
    daf.set_vector(
        "cell",
        "age",
        VectorData::Dense(ArrayData::I64(vec![1, 2, 3])),
        false,
    )
    .unwrap();
    let matrix = SparseMatrix::new(
        3,
        2,
        MajorAxis::Column,
        IndexData::U32(vec![0, 1, 3]),
        IndexData::U32(vec![1, 0, 2]),
        ArrayData::F64(vec![5.0, 7.0, 9.0]),
    )
    .unwrap();
    daf.set_matrix("cell", "gene", "umis", MatrixData::Sparse(matrix), false)
        .unwrap();
}

#[test]
fn test_artifacts_survive_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let daf = FilesDaf::create(dir.path(), "disk").unwrap();
        populate(&daf);
    }

    let daf = FilesDaf::open(dir.path()).unwrap();
    assert_eq!(daf.name(), "disk");
    assert_eq!(
        daf.get_scalar("version").unwrap(),
        ScalarValue::Str("v1".to_string())
    );
    assert_eq!(daf.axis_length("cell").unwrap(), 3);
    assert_eq!(
        *daf.get_vector("cell", "age").unwrap(),
        VectorData::Dense(ArrayData::I64(vec![1, 2, 3]))
    );
    let matrix = daf.get_matrix("cell", "gene", "umis").unwrap();
    assert!(matrix.is_sparse());
    assert_eq!(matrix.get(2, 1), ScalarValue::F64(9.0));
}

#[test]
fn test_overwrite_and_delete_on_disk() {
    let dir = TempDir::new().unwrap();
    let daf = FilesDaf::create(dir.path(), "disk").unwrap();
    populate(&daf);

    daf.set_scalar("version", ScalarValue::Str("v2".to_string()), true)
        .unwrap();
    daf.delete_vector("cell", "age", true).unwrap();

    let reopened = FilesDaf::open(dir.path()).unwrap();
    assert_eq!(
        reopened.get_scalar("version").unwrap(),
        ScalarValue::Str("v2".to_string())
    );
    assert!(!reopened.has_vector("cell", "age").unwrap());
}

#[test]
fn test_repeated_reads_are_cached() {
    let dir = TempDir::new().unwrap();
    let daf = FilesDaf::create(dir.path(), "disk").unwrap();
    populate(&daf);

    let first = daf.get_vector("cell", "age").unwrap();
    let second = daf.get_vector("cell", "age").unwrap();
    // the cache hands back the same allocation until a write moves the counter
    assert!(std::sync::Arc::ptr_eq(&first, &second));

    daf.set_vector(
        "cell",
        "age",
        VectorData::Dense(ArrayData::I64(vec![7, 8, 9])),
        true,
    )
    .unwrap();
    let third = daf.get_vector("cell", "age").unwrap();
    assert!(!std::sync::Arc::ptr_eq(&first, &third));
    assert_eq!(
        *third,
        VectorData::Dense(ArrayData::I64(vec![7, 8, 9]))
    );
}

#[test]
fn test_queries_run_against_files() {
    let dir = TempDir::new().unwrap();
    let daf = FilesDaf::create(dir.path(), "disk").unwrap();
    populate(&daf);

    match evaluate(&daf, "mat(cell, gene, umis) | Sum").unwrap() {
        QueryValue::Vector { axis, values, .. } => {
            assert_eq!(axis, "gene");
            assert_eq!(values, ArrayData::F64(vec![5.0, 16.0]));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_relayout_on_disk() {
    let dir = TempDir::new().unwrap();
    let daf = FilesDaf::create(dir.path(), "disk").unwrap();
    daf.add_axis("cell", vec!["c0".to_string(), "c1".to_string()])
        .unwrap();
    daf.add_axis("gene", vec!["g0".to_string()]).unwrap();
    let matrix =
        DenseMatrix::new(2, 1, MajorAxis::Column, ArrayData::F32(vec![1.5, 2.5])).unwrap();
    daf.set_matrix("cell", "gene", "umis", MatrixData::Dense(matrix), false)
        .unwrap();

    daf.relayout_matrix("gene", "cell", "umis", false).unwrap();

    let reopened = FilesDaf::open(dir.path()).unwrap();
    let relayout = reopened.get_matrix("gene", "cell", "umis").unwrap();
    assert_eq!(relayout.rows(), 1);
    assert_eq!(relayout.cols(), 2);
    assert_eq!(relayout.get(0, 1), ScalarValue::F32(2.5));
}

#[test]
fn test_open_missing_directory_fails() {
    let dir = TempDir::new().unwrap();
    assert!(FilesDaf::open(dir.path().join("nothing_here")).is_err());
}
