// tests/copy_concat.rs

use tempfile::TempDir;

use dafdb::{
    concatenate, copy_all, copy_matrix, copy_scalar, copy_vector, ArrayData, DafReader, DafWriter,
    DenseMatrix, FilesDaf, MajorAxis, MatrixData, MemoryDaf, ScalarValue, VectorData,
};

fn populated_memory(name: &str) -> MemoryDaf {
    let daf = MemoryDaf::new(name);
    daf.set_scalar("version", ScalarValue::I64(1), false).unwrap();
    daf.add_axis("cell", vec!["c0".to_string(), "c1".to_string()])
        .unwrap();
    daf.add_axis("gene", vec!["g0".to_string()]).unwrap();
    daf.set_vector(
        "cell",
        "age",
        VectorData::Dense(ArrayData::I64(vec![5, 6])),
        false,
    )
    .unwrap();
    let matrix =
        DenseMatrix::new(2, 1, MajorAxis::Column, ArrayData::F64(vec![0.5, 0.25])).unwrap();
    daf.set_matrix("cell", "gene", "umis", MatrixData::Dense(matrix), false)
        .unwrap();
    daf
}

#[test]
fn test_copy_all_between_backends() {
    let dir = TempDir::new().unwrap();
    let source = populated_memory("memory");
    let target = FilesDaf::create(dir.path(), "disk").unwrap();

    copy_all(&source, &target, false).unwrap();

    let reopened = FilesDaf::open(dir.path()).unwrap();
    assert_eq!(reopened.get_scalar("version").unwrap(), ScalarValue::I64(1));
    assert_eq!(
        *reopened.get_vector("cell", "age").unwrap(),
        VectorData::Dense(ArrayData::I64(vec![5, 6]))
    );
    let matrix = reopened.get_matrix("cell", "gene", "umis").unwrap();
    assert_eq!(matrix.get(1, 0), ScalarValue::F64(0.25));
}

#[test]
fn test_copy_with_rename() {
    let source = populated_memory("source");
    let target = MemoryDaf::new("target");
    target
        .add_axis("cell", vec!["c0".to_string(), "c1".to_string()])
        .unwrap();
    target.add_axis("gene", vec!["g0".to_string()]).unwrap();

    copy_scalar(&source, &target, "version", Some("release"), false).unwrap();
    copy_vector(&source, &target, "cell", "age", Some("days"), false).unwrap();
    copy_matrix(&source, &target, "cell", "gene", "umis", Some("counts"), false).unwrap();

    assert!(target.has_scalar("release"));
    assert!(target.has_vector("cell", "days").unwrap());
    assert!(target.has_matrix("cell", "gene", "counts").unwrap());
}

#[test]
fn test_copy_respects_overwrite() {
    let source = populated_memory("source");
    let target = MemoryDaf::new("target");
    target.set_scalar("version", ScalarValue::I64(9), false).unwrap();

    assert!(copy_scalar(&source, &target, "version", None, false).is_err());
    copy_scalar(&source, &target, "version", None, true).unwrap();
    assert_eq!(target.get_scalar("version").unwrap(), ScalarValue::I64(1));
}

#[test]
fn test_concatenate_two_sources() {
    let first = MemoryDaf::new("first");
    first
        .add_axis("cell", vec!["c0".to_string(), "c1".to_string()])
        .unwrap();
    first
        .set_vector(
            "cell",
            "age",
            VectorData::Dense(ArrayData::I64(vec![1, 2])),
            false,
        )
        .unwrap();
    first.set_scalar("origin", ScalarValue::Str("first".to_string()), false)
        .unwrap();

    let second = MemoryDaf::new("second");
    second
        .add_axis("cell", vec!["c2".to_string()])
        .unwrap();
    second
        .set_vector(
            "cell",
            "age",
            VectorData::Dense(ArrayData::I64(vec![3])),
            false,
        )
        .unwrap();

    let target = MemoryDaf::new("target");
    concatenate(&target, "cell", &[&first, &second]).unwrap();

    assert_eq!(
        *target.axis_entries("cell").unwrap(),
        vec!["c0".to_string(), "c1".to_string(), "c2".to_string()]
    );
    assert_eq!(
        *target.get_vector("cell", "age").unwrap(),
        VectorData::Dense(ArrayData::I64(vec![1, 2, 3]))
    );
    assert_eq!(
        target.get_scalar("origin").unwrap(),
        ScalarValue::Str("first".to_string())
    );
}

#[test]
fn test_concatenate_duplicate_entries_fail() {
    let first = MemoryDaf::new("first");
    first.add_axis("cell", vec!["c0".to_string()]).unwrap();
    let second = MemoryDaf::new("second");
    second.add_axis("cell", vec!["c0".to_string()]).unwrap();

    let target = MemoryDaf::new("target");
    assert!(concatenate(&target, "cell", &[&first, &second]).is_err());
}
