// tests/views_test.rs

use std::sync::Arc;

use dafdb::{
    evaluate, ArrayData, DafReader, DafView, DafWriter, FormatReader, MemoryDaf, QueryValue,
    ReadOnlyDaf, ScalarValue, VectorData,
};

fn source() -> Arc<MemoryDaf> {
    let daf = Arc::new(MemoryDaf::new("memory"));
    daf.set_scalar("version", ScalarValue::I64(7), false).unwrap();
    daf.add_axis(
        "cell",
        vec!["c0".to_string(), "c1".to_string(), "c2".to_string()],
    )
    .unwrap();
    daf.set_vector(
        "cell",
        "age",
        VectorData::Dense(ArrayData::I64(vec![10, 20, 30])),
        false,
    )
    .unwrap();
    daf
}

#[test]
fn test_view_renames_axes_and_artifacts() {
    let view = DafView::new("view", source())
        .expose_axis("obs", "cell")
        .expose_scalar("release", "version")
        .expose_vector("obs", "days", "age");

    assert_eq!(view.get_scalar("release").unwrap(), ScalarValue::I64(7));
    assert_eq!(view.axis_length("obs").unwrap(), 3);
    assert_eq!(
        *view.get_vector("obs", "days").unwrap(),
        VectorData::Dense(ArrayData::I64(vec![10, 20, 30]))
    );
}

#[test]
fn test_unknown_alias_is_missing_under_the_view_name() {
    let view = DafView::new("view", source()).expose_axis("obs", "cell");

    let error = view.get_scalar("version").unwrap_err();
    assert_eq!(
        error.to_string(),
        "missing scalar: version\nin the daf data: view"
    );

    let error = view.axis_entries("cell").unwrap_err();
    assert_eq!(
        error.to_string(),
        "missing axis: cell\nin the daf data: view"
    );
}

#[test]
fn test_queries_evaluate_against_views() {
    let view = DafView::new("view", source())
        .expose_axis("obs", "cell")
        .expose_vector("obs", "days", "age");

    match evaluate(&view, "vec(obs, days) | Sum").unwrap() {
        QueryValue::Scalar(value) => assert_eq!(value, ScalarValue::I64(60)),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_view_sees_source_mutations() {
    let daf = source();
    let view = DafView::new("view", daf.clone())
        .expose_axis("obs", "cell")
        .expose_vector("obs", "days", "age");

    daf.set_vector(
        "cell",
        "age",
        VectorData::Dense(ArrayData::I64(vec![1, 2, 3])),
        true,
    )
    .unwrap();
    assert_eq!(
        *view.get_vector("obs", "days").unwrap(),
        VectorData::Dense(ArrayData::I64(vec![1, 2, 3]))
    );
}

#[test]
fn test_read_only_wrapper_delegates_and_renames() {
    let daf = source();
    let frozen = ReadOnlyDaf::renamed(daf.clone(), "frozen");

    assert_eq!(frozen.name(), "frozen");
    assert_eq!(frozen.get_scalar("version").unwrap(), ScalarValue::I64(7));
    assert_eq!(
        *frozen.axis_entries("cell").unwrap(),
        vec!["c0".to_string(), "c1".to_string(), "c2".to_string()]
    );
    assert_eq!(*frozen.scalar_names(), vec!["version".to_string()]);
}

#[test]
fn test_view_of_read_only_composes() {
    let frozen = Arc::new(ReadOnlyDaf::new(source()));
    let view = DafView::new("view", frozen)
        .expose_axis("obs", "cell")
        .expose_vector("obs", "days", "age");

    assert_eq!(view.axis_length("obs").unwrap(), 3);
    assert_eq!(view.get_vector("obs", "days").unwrap().len(), 3);
}
