// tests/chain_test.rs

use std::sync::Arc;

use dafdb::{
    ArrayData, ChainReader, ChainWriter, DafReader, DafWriter, DataKey, FormatReader, MemoryDaf,
    ScalarValue, VectorData,
};

fn member(name: &str) -> Arc<MemoryDaf> {
    Arc::new(MemoryDaf::new(name))
}

#[test]
fn test_chain_resolution_and_shadowing() {
    let a = member("A");
    let b = member("B");
    a.set_scalar("s", ScalarValue::I64(1), false).unwrap();
    b.set_scalar("s", ScalarValue::I64(2), false).unwrap();

    let chain = ChainWriter::new("chain", vec![a.clone()], b.clone()).unwrap();
    assert_eq!(chain.get_scalar("s").unwrap(), ScalarValue::I64(2));

    let error = chain.delete_scalar("s", true).unwrap_err();
    assert!(error
        .to_string()
        .contains("because it exists in the earlier: A"));

    chain.set_scalar("s", ScalarValue::I64(3), true).unwrap();
    assert_eq!(chain.get_scalar("s").unwrap(), ScalarValue::I64(3));
    assert_eq!(a.get_scalar("s").unwrap(), ScalarValue::I64(1));
    assert_eq!(b.get_scalar("s").unwrap(), ScalarValue::I64(3));
}

#[test]
fn test_artifact_present_only_in_one_member() {
    let a = member("A");
    let b = member("B");
    a.set_scalar("only_a", ScalarValue::Str("here".to_string()), false)
        .unwrap();

    let chain = ChainReader::new("chain", vec![a, b]).unwrap();
    assert_eq!(
        chain.get_scalar("only_a").unwrap(),
        ScalarValue::Str("here".to_string())
    );
}

#[test]
fn test_inconsistent_axis_fails_construction() {
    let a = member("A");
    let b = member("B");
    a.add_axis("cell", vec!["c0".to_string(), "c1".to_string()])
        .unwrap();
    b.add_axis("cell", vec!["c0".to_string(), "c2".to_string()])
        .unwrap();

    let error = ChainReader::new("chain", vec![a, b]).unwrap_err();
    assert!(error
        .to_string()
        .contains("different entries for the axis: cell"));
}

#[test]
fn test_matching_axes_are_accepted() {
    let a = member("A");
    let b = member("B");
    let entries = vec!["c0".to_string(), "c1".to_string()];
    a.add_axis("cell", entries.clone()).unwrap();
    b.add_axis("cell", entries.clone()).unwrap();
    a.set_vector(
        "cell",
        "age",
        VectorData::Dense(ArrayData::I64(vec![1, 2])),
        false,
    )
    .unwrap();

    let chain = ChainReader::new("chain", vec![a, b]).unwrap();
    assert_eq!(*chain.axis_entries("cell").unwrap(), entries);
    assert_eq!(
        *chain.get_vector("cell", "age").unwrap(),
        VectorData::Dense(ArrayData::I64(vec![1, 2]))
    );
}

#[test]
fn test_vector_write_adopts_axis_into_writer() {
    let a = member("A");
    let b = member("B");
    a.add_axis("cell", vec!["c0".to_string(), "c1".to_string()])
        .unwrap();

    let chain = ChainWriter::new("chain", vec![a], b.clone()).unwrap();
    chain
        .set_vector(
            "cell",
            "age",
            VectorData::Dense(ArrayData::I64(vec![3, 4])),
            false,
        )
        .unwrap();

    assert!(b.has_axis("cell"));
    assert_eq!(
        *b.get_vector("cell", "age").unwrap(),
        VectorData::Dense(ArrayData::I64(vec![3, 4]))
    );
}

#[test]
fn test_names_union_across_members() {
    let a = member("A");
    let b = member("B");
    a.add_axis("cell", vec!["c0".to_string()]).unwrap();
    b.add_axis("cell", vec!["c0".to_string()]).unwrap();
    a.set_vector("cell", "from_a", VectorData::Dense(ArrayData::I64(vec![1])), false)
        .unwrap();
    b.set_vector("cell", "from_b", VectorData::Dense(ArrayData::I64(vec![2])), false)
        .unwrap();

    let chain = ChainReader::new("chain", vec![a, b]).unwrap();
    assert_eq!(
        *chain.vector_names("cell").unwrap(),
        vec!["from_a".to_string(), "from_b".to_string()]
    );
}

#[test]
fn test_chain_version_counter_is_member_sum() {
    let a = member("A");
    let b = member("B");
    let chain = ChainWriter::new("chain", vec![a.clone()], b.clone()).unwrap();

    let key = DataKey::ScalarNames;
    let before = chain.format_version_counter(&key);
    a.set_scalar("x", ScalarValue::I64(1), false).unwrap();
    let after_a = chain.format_version_counter(&key);
    assert_ne!(before, after_a);

    chain.set_scalar("y", ScalarValue::I64(2), false).unwrap();
    assert_ne!(after_a, chain.format_version_counter(&key));
}

#[test]
fn test_stale_chain_names_are_refreshed() {
    let a = member("A");
    let b = member("B");
    let chain = ChainReader::new("chain", vec![a.clone(), b]).unwrap();
    assert!(chain.scalar_names().is_empty());

    // a direct mutation of a member invalidates the chain's cached names
    a.set_scalar("late", ScalarValue::I64(1), false).unwrap();
    assert_eq!(*chain.scalar_names(), vec!["late".to_string()]);
}

#[test]
fn test_delete_owned_by_writer_is_allowed() {
    let a = member("A");
    let b = member("B");
    b.set_scalar("only_b", ScalarValue::I64(2), false).unwrap();

    let chain = ChainWriter::new("chain", vec![a], b.clone()).unwrap();
    chain.delete_scalar("only_b", true).unwrap();
    assert!(!b.has_scalar("only_b"));
    assert!(!chain.has_scalar("only_b"));
}

#[test]
fn test_chain_wide_write_lock_locks_members() {
    let a = member("A");
    let b = member("B");
    let chain = ChainWriter::new("chain", vec![a.clone()], b.clone()).unwrap();

    chain
        .with_chain_write_lock(|| {
            assert!(a.lock().has_write_lock());
            assert!(b.lock().has_write_lock());
            Ok(())
        })
        .unwrap();
    assert!(!a.lock().has_write_lock());
    assert!(!b.lock().has_write_lock());
}
