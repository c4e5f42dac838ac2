// src/copy.rs

use std::collections::BTreeSet;

use crate::access::readers::DafReader;
use crate::access::writers::DafWriter;
use crate::core::value::ArrayData;
use crate::core::vector::VectorData;
use crate::error::{ArtifactKind, DafError};
use crate::format::{FormatReader, FormatWriter};

/// Copies one scalar, optionally renaming it in the destination.
pub fn copy_scalar(
    source: &dyn FormatReader,
    destination: &dyn FormatWriter,
    name: &str,
    rename: Option<&str>,
    overwrite: bool,
) -> Result<(), DafError> {
    let value = source.get_scalar(name)?;
    destination.set_scalar(rename.unwrap_or(name), value, overwrite)
}

/// Copies an axis and its entries, optionally renaming it.
pub fn copy_axis(
    source: &dyn FormatReader,
    destination: &dyn FormatWriter,
    axis: &str,
    rename: Option<&str>,
) -> Result<(), DafError> {
    let entries = source.axis_entries(axis)?;
    destination.add_axis(rename.unwrap_or(axis), entries.as_ref().clone())
}

/// Copies a vector; the destination axis must exist with the same length.
pub fn copy_vector(
    source: &dyn FormatReader,
    destination: &dyn FormatWriter,
    axis: &str,
    name: &str,
    rename: Option<&str>,
    overwrite: bool,
) -> Result<(), DafError> {
    let vector = source.get_vector(axis, name)?;
    destination.set_vector(axis, rename.unwrap_or(name), vector.as_ref().clone(), overwrite)
}

/// Copies a matrix in its stored representation and layout.
pub fn copy_matrix(
    source: &dyn FormatReader,
    destination: &dyn FormatWriter,
    rows: &str,
    cols: &str,
    name: &str,
    rename: Option<&str>,
    overwrite: bool,
) -> Result<(), DafError> {
    let matrix = source.get_matrix(rows, cols, name)?;
    destination.set_matrix(
        rows,
        cols,
        rename.unwrap_or(name),
        matrix.as_ref().clone(),
        overwrite,
    )
}

/// Copies every artifact of `source` into `destination`: axes first, then
/// scalars, vectors and matrices.
pub fn copy_all(
    source: &dyn FormatReader,
    destination: &dyn FormatWriter,
    overwrite: bool,
) -> Result<(), DafError> {
    for axis in source.axis_names().iter() {
        if !destination.has_axis(axis) {
            copy_axis(source, destination, axis, None)?;
        }
    }
    for name in source.scalar_names().iter() {
        copy_scalar(source, destination, name, None, overwrite)?;
    }
    for axis in source.axis_names().iter() {
        for name in source.vector_names(axis)?.iter() {
            copy_vector(source, destination, axis, name, None, overwrite)?;
        }
    }
    let axes = source.axis_names();
    for rows in axes.iter() {
        for cols in axes.iter() {
            for name in source.matrix_names(rows, cols)?.iter() {
                copy_matrix(source, destination, rows, cols, name, None, overwrite)?;
            }
        }
    }
    Ok(())
}

/// Concatenates `sources` along `axis` into `destination`: the axis entries
/// are stacked (and must stay unique), vectors on the axis are stacked with
/// zero filling for sources that lack them, and scalars copy from the first
/// source. Artifacts on other axes are left to `copy_all`.
pub fn concatenate(
    destination: &dyn FormatWriter,
    axis: &str,
    sources: &[&dyn FormatReader],
) -> Result<(), DafError> {
    if sources.is_empty() {
        return Err(DafError::InvalidData {
            what: "concatenation".to_string(),
            reason: "there are no sources".to_string(),
        });
    }

    let mut entries: Vec<String> = Vec::new();
    let mut seen: BTreeSet<String> = BTreeSet::new();
    for source in sources {
        for entry in source.axis_entries(axis)?.iter() {
            if !seen.insert(entry.clone()) {
                return Err(DafError::AlreadyExists {
                    kind: ArtifactKind::Entry,
                    name: entry.clone(),
                    context: format!("\nfor the axis: {}", axis),
                    dataset: destination.name().to_string(),
                });
            }
            entries.push(entry.clone());
        }
    }
    destination.add_axis(axis, entries)?;

    let mut vector_names: BTreeSet<String> = BTreeSet::new();
    for source in sources {
        vector_names.extend(source.vector_names(axis)?.iter().cloned());
    }
    for name in &vector_names {
        let mut kind = None;
        for source in sources {
            if source.has_vector(axis, name)? {
                kind = Some(source.get_vector(axis, name)?.element_kind());
                break;
            }
        }
        let kind = kind.ok_or_else(|| DafError::missing_vector(axis, name, destination.name()))?;
        let mut stacked = ArrayData::zeros(kind, 0);
        for source in sources {
            if source.has_vector(axis, name)? {
                stacked.extend_from(&source.get_vector(axis, name)?.to_dense())?;
            } else {
                stacked.extend_from(&ArrayData::zeros(kind, source.axis_length(axis)?))?;
            }
        }
        destination.set_vector(axis, name, VectorData::Dense(stacked), false)?;
    }

    for name in sources[0].scalar_names().iter() {
        if !destination.has_scalar(name) {
            copy_scalar(sources[0], destination, name, None, false)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::ScalarValue;
    use crate::format::MemoryDaf;

    fn source() -> MemoryDaf {
        let daf = MemoryDaf::new("source");
        daf.set_scalar("version", ScalarValue::I64(3), false).unwrap();
        daf.add_axis("cell", vec!["c0".to_string(), "c1".to_string()])
            .unwrap();
        daf.set_vector(
            "cell",
            "age",
            VectorData::Dense(ArrayData::I64(vec![5, 6])),
            false,
        )
        .unwrap();
        daf
    }

    #[test]
    fn test_copy_all_round_trips() {
        let from = source();
        let to = MemoryDaf::new("target");
        copy_all(&from, &to, false).unwrap();

        assert_eq!(to.get_scalar("version").unwrap(), ScalarValue::I64(3));
        assert_eq!(
            *to.axis_entries("cell").unwrap(),
            vec!["c0".to_string(), "c1".to_string()]
        );
        assert_eq!(
            *to.get_vector("cell", "age").unwrap(),
            VectorData::Dense(ArrayData::I64(vec![5, 6]))
        );
    }

    #[test]
    fn test_copy_scalar_rename() {
        let from = source();
        let to = MemoryDaf::new("target");
        copy_scalar(&from, &to, "version", Some("release"), false).unwrap();
        assert!(to.has_scalar("release"));
        assert!(!to.has_scalar("version"));
    }

    #[test]
    fn test_concatenate_stacks_entries_and_vectors() {
        let first = source();
        let second = MemoryDaf::new("second");
        second
            .add_axis("cell", vec!["c2".to_string(), "c3".to_string(), "c4".to_string()])
            .unwrap();
        second
            .set_vector(
                "cell",
                "age",
                VectorData::Dense(ArrayData::I64(vec![7, 8, 9])),
                false,
            )
            .unwrap();

        let target = MemoryDaf::new("target");
        concatenate(&target, "cell", &[&first, &second]).unwrap();

        assert_eq!(target.axis_length("cell").unwrap(), 5);
        assert_eq!(
            *target.get_vector("cell", "age").unwrap(),
            VectorData::Dense(ArrayData::I64(vec![5, 6, 7, 8, 9]))
        );
        assert_eq!(target.get_scalar("version").unwrap(), ScalarValue::I64(3));
    }

    #[test]
    fn test_concatenate_rejects_duplicate_entries() {
        let first = source();
        let second = MemoryDaf::new("second");
        second
            .add_axis("cell", vec!["c1".to_string(), "c2".to_string()])
            .unwrap();

        let target = MemoryDaf::new("target");
        let error = concatenate(&target, "cell", &[&first, &second]).unwrap_err();
        assert!(error.to_string().contains("existing entry: c1"));
    }

    #[test]
    fn test_concatenate_zero_fills_missing_vectors() {
        let first = source();
        let second = MemoryDaf::new("second");
        second
            .add_axis("cell", vec!["c2".to_string()])
            .unwrap();

        let target = MemoryDaf::new("target");
        concatenate(&target, "cell", &[&first, &second]).unwrap();
        assert_eq!(
            *target.get_vector("cell", "age").unwrap(),
            VectorData::Dense(ArrayData::I64(vec![5, 6, 0]))
        );
    }
}
