// src/query/eval.rs

use std::collections::HashMap;
use std::fmt;

use crate::access::readers::DafReader;
use crate::core::matrix::{matrix_major_line, DenseMatrix, MajorAxis, MatrixData};
use crate::core::value::{ArrayData, ScalarValue};
use crate::error::DafError;
use crate::query::ops::register_builtin_ops;
use crate::query::parse::{parse_query, Query, Selection, Stage};
use crate::query::registry::{new_eltwise, new_reduction, ParamMap};

/// The result of evaluating a query. Vectors and matrices carry the entry
/// names of their (possibly sliced) axes.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Scalar(ScalarValue),
    Vector {
        axis: String,
        entries: Vec<String>,
        values: ArrayData,
    },
    Matrix {
        rows_axis: String,
        cols_axis: String,
        row_entries: Vec<String>,
        col_entries: Vec<String>,
        matrix: MatrixData,
    },
    Entries {
        axis: String,
        entries: Vec<String>,
    },
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryValue::Scalar(value) => write!(f, "{}", value),
            QueryValue::Vector {
                axis,
                entries,
                values,
            } => {
                writeln!(f, "vector of the axis: {}", axis)?;
                for (at, entry) in entries.iter().enumerate() {
                    writeln!(f, "  {}: {}", entry, values.get(at))?;
                }
                Ok(())
            }
            QueryValue::Matrix {
                rows_axis,
                cols_axis,
                row_entries,
                col_entries,
                matrix,
            } => {
                writeln!(f, "matrix of the axes: {} x {}", rows_axis, cols_axis)?;
                for (row, row_entry) in row_entries.iter().enumerate() {
                    write!(f, "  {}:", row_entry)?;
                    for col in 0..col_entries.len() {
                        write!(f, " {}", matrix.get(row, col))?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            }
            QueryValue::Entries { axis, entries } => {
                writeln!(f, "entries of the axis: {}", axis)?;
                for entry in entries {
                    writeln!(f, "  {}", entry)?;
                }
                Ok(())
            }
        }
    }
}

fn stage_error(what: &str, reason: impl Into<String>) -> DafError {
    DafError::InvalidData {
        what: what.to_string(),
        reason: reason.into(),
    }
}

fn entry_index(
    entries: &[String],
    axis: &str,
    entry: &str,
    dataset: &str,
) -> Result<usize, DafError> {
    entries
        .iter()
        .position(|e| e == entry)
        .ok_or_else(|| DafError::missing_entry(axis, entry, dataset))
}

fn matrix_row(matrix: &MatrixData, row: usize) -> Result<ArrayData, DafError> {
    let mut values = ArrayData::zeros(matrix.element_kind(), matrix.cols());
    for col in 0..matrix.cols() {
        values.set(col, &matrix.get(row, col))?;
    }
    Ok(values)
}

fn matrix_column(matrix: &MatrixData, col: usize) -> Result<ArrayData, DafError> {
    let mut values = ArrayData::zeros(matrix.element_kind(), matrix.rows());
    for row in 0..matrix.rows() {
        values.set(row, &matrix.get(row, col))?;
    }
    Ok(values)
}

fn gather_matrix(
    matrix: &MatrixData,
    row_indices: &[usize],
    col_indices: &[usize],
) -> Result<DenseMatrix, DafError> {
    let mut gathered = DenseMatrix::zeros(
        matrix.element_kind(),
        row_indices.len(),
        col_indices.len(),
        matrix.major(),
    )?;
    for (row, &source_row) in row_indices.iter().enumerate() {
        for (col, &source_col) in col_indices.iter().enumerate() {
            gathered.set(row, col, &matrix.get(source_row, source_col))?;
        }
    }
    Ok(gathered)
}

/// Evaluates a query text against any reader.
pub fn evaluate<D: DafReader + ?Sized>(daf: &D, text: &str) -> Result<QueryValue, DafError> {
    let query = parse_query(text)?;
    evaluate_parsed(daf, &query)
}

/// Evaluates an already parsed query against any reader.
pub fn evaluate_parsed<D: DafReader + ?Sized>(
    daf: &D,
    query: &Query,
) -> Result<QueryValue, DafError> {
    register_builtin_ops()?;
    let mut value = evaluate_selection(daf, &query.selection)?;
    for stage in &query.stages {
        value = evaluate_stage(daf, value, stage)?;
    }
    Ok(value)
}

fn evaluate_selection<D: DafReader + ?Sized>(
    daf: &D,
    selection: &Selection,
) -> Result<QueryValue, DafError> {
    match selection {
        Selection::Scalar(name) => Ok(QueryValue::Scalar(daf.get_scalar(name)?)),
        Selection::Vector { axis, name } => {
            let entries = daf.axis_entries(axis)?;
            let vector = daf.get_vector(axis, name)?;
            Ok(QueryValue::Vector {
                axis: axis.clone(),
                entries: entries.as_ref().clone(),
                values: vector.to_dense(),
            })
        }
        Selection::Matrix { rows, cols, name } => {
            let row_entries = daf.axis_entries(rows)?;
            let col_entries = daf.axis_entries(cols)?;
            let matrix = daf.get_matrix(rows, cols, name)?;
            Ok(QueryValue::Matrix {
                rows_axis: rows.clone(),
                cols_axis: cols.clone(),
                row_entries: row_entries.as_ref().clone(),
                col_entries: col_entries.as_ref().clone(),
                matrix: matrix.as_ref().clone(),
            })
        }
        Selection::Axis(name) => Ok(QueryValue::Entries {
            axis: name.clone(),
            entries: daf.axis_entries(name)?.as_ref().clone(),
        }),
    }
}

/// Splits optional-axis stage arguments: `[entry...]` or `[axis, entry...]`
/// when the leading argument names the value's axis.
fn split_axis_args<'a>(args: &'a [String], axis: &str) -> &'a [String] {
    if args.len() >= 2 && args[0] == axis {
        &args[1..]
    } else {
        args
    }
}

fn evaluate_stage<D: DafReader + ?Sized>(
    daf: &D,
    value: QueryValue,
    stage: &Stage,
) -> Result<QueryValue, DafError> {
    match stage {
        Stage::At { args } => evaluate_at(daf, value, args),
        Stage::Slice { args } => evaluate_slice(daf, value, args),
        Stage::Mask { args } => evaluate_mask(daf, value, args),
        Stage::Op { name, params } => evaluate_op(value, name, params),
    }
}

fn evaluate_at<D: DafReader + ?Sized>(
    daf: &D,
    value: QueryValue,
    args: &[String],
) -> Result<QueryValue, DafError> {
    match value {
        QueryValue::Vector {
            axis,
            entries,
            values,
        } => {
            let args = split_axis_args(args, &axis);
            let [entry] = args else {
                return Err(stage_error("at(...) of a vector", "expected one entry"));
            };
            let at = entry_index(&entries, &axis, entry, daf.name())?;
            Ok(QueryValue::Scalar(values.get(at)))
        }
        QueryValue::Matrix {
            rows_axis,
            cols_axis,
            row_entries,
            col_entries,
            matrix,
        } => {
            let [axis, entry] = args else {
                return Err(stage_error(
                    "at(...) of a matrix",
                    "expected an axis and an entry",
                ));
            };
            if *axis == rows_axis {
                let at = entry_index(&row_entries, &rows_axis, entry, daf.name())?;
                Ok(QueryValue::Vector {
                    values: matrix_row(&matrix, at)?,
                    axis: cols_axis,
                    entries: col_entries,
                })
            } else if *axis == cols_axis {
                let at = entry_index(&col_entries, &cols_axis, entry, daf.name())?;
                Ok(QueryValue::Vector {
                    values: matrix_column(&matrix, at)?,
                    axis: rows_axis,
                    entries: row_entries,
                })
            } else {
                Err(stage_error(
                    "at(...) of a matrix",
                    format!("the axis: {} is not of the matrix", axis),
                ))
            }
        }
        _ => Err(stage_error("at(...)", "the value has no axis to project")),
    }
}

fn evaluate_slice<D: DafReader + ?Sized>(
    daf: &D,
    value: QueryValue,
    args: &[String],
) -> Result<QueryValue, DafError> {
    match value {
        QueryValue::Vector {
            axis,
            entries,
            values,
        } => {
            let wanted = split_axis_args(args, &axis);
            let mut indices = Vec::with_capacity(wanted.len());
            for entry in wanted {
                indices.push(entry_index(&entries, &axis, entry, daf.name())?);
            }
            Ok(QueryValue::Vector {
                values: values.take_indices(&indices),
                entries: wanted.to_vec(),
                axis,
            })
        }
        QueryValue::Matrix {
            rows_axis,
            cols_axis,
            row_entries,
            col_entries,
            matrix,
        } => {
            let (axis, wanted) = match args.split_first() {
                Some((axis, rest)) if !rest.is_empty() => (axis, rest),
                _ => {
                    return Err(stage_error(
                        "slice(...) of a matrix",
                        "expected an axis and entries",
                    ))
                }
            };
            if *axis == rows_axis {
                let mut indices = Vec::with_capacity(wanted.len());
                for entry in wanted {
                    indices.push(entry_index(&row_entries, &rows_axis, entry, daf.name())?);
                }
                let all_cols: Vec<usize> = (0..col_entries.len()).collect();
                Ok(QueryValue::Matrix {
                    matrix: MatrixData::Dense(gather_matrix(&matrix, &indices, &all_cols)?),
                    rows_axis,
                    cols_axis,
                    row_entries: wanted.to_vec(),
                    col_entries,
                })
            } else if *axis == cols_axis {
                let mut indices = Vec::with_capacity(wanted.len());
                for entry in wanted {
                    indices.push(entry_index(&col_entries, &cols_axis, entry, daf.name())?);
                }
                let all_rows: Vec<usize> = (0..row_entries.len()).collect();
                Ok(QueryValue::Matrix {
                    matrix: MatrixData::Dense(gather_matrix(&matrix, &all_rows, &indices)?),
                    rows_axis,
                    cols_axis,
                    row_entries,
                    col_entries: wanted.to_vec(),
                })
            } else {
                Err(stage_error(
                    "slice(...) of a matrix",
                    format!("the axis: {} is not of the matrix", axis),
                ))
            }
        }
        QueryValue::Entries { axis, entries } => {
            let wanted = split_axis_args(args, &axis);
            for entry in wanted {
                entry_index(&entries, &axis, entry, daf.name())?;
            }
            Ok(QueryValue::Entries {
                axis,
                entries: wanted.to_vec(),
            })
        }
        QueryValue::Scalar(_) => Err(stage_error("slice(...)", "a scalar has no axis to slice")),
    }
}

/// Filters an entry list by a boolean vector stored on the axis in the
/// dataset; entries of the current value map back to positions of the full
/// axis first, so masks compose with earlier slices.
fn masked_entries<D: DafReader + ?Sized>(
    daf: &D,
    axis: &str,
    current: &[String],
    mask_name: &str,
) -> Result<Vec<String>, DafError> {
    let mask_vector = daf.get_vector(axis, mask_name)?;
    let dense = mask_vector.to_dense();
    let mask = dense.as_bools().ok_or_else(|| DafError::TypeMismatch {
        what: format!("mask vector: {}", mask_name),
        expected: "bool".to_string(),
        actual: dense.kind().to_string(),
    })?;
    let full = daf.axis_entries(axis)?;
    let positions: HashMap<&str, usize> = full
        .iter()
        .enumerate()
        .map(|(at, entry)| (entry.as_str(), at))
        .collect();
    let mut kept = Vec::new();
    for entry in current {
        let at = positions
            .get(entry.as_str())
            .ok_or_else(|| DafError::missing_entry(axis, entry, daf.name()))?;
        if mask[*at] {
            kept.push(entry.clone());
        }
    }
    Ok(kept)
}

fn evaluate_mask<D: DafReader + ?Sized>(
    daf: &D,
    value: QueryValue,
    args: &[String],
) -> Result<QueryValue, DafError> {
    match value {
        QueryValue::Vector {
            axis,
            entries,
            values,
        } => {
            let args = split_axis_args(args, &axis);
            let [mask_name] = args else {
                return Err(stage_error(
                    "mask(...) of a vector",
                    "expected one vector name",
                ));
            };
            let kept = masked_entries(daf, &axis, &entries, mask_name)?;
            let mut indices = Vec::with_capacity(kept.len());
            for entry in &kept {
                indices.push(entry_index(&entries, &axis, entry, daf.name())?);
            }
            Ok(QueryValue::Vector {
                values: values.take_indices(&indices),
                entries: kept,
                axis,
            })
        }
        QueryValue::Matrix {
            rows_axis,
            cols_axis,
            row_entries,
            col_entries,
            matrix,
        } => {
            let [axis, mask_name] = args else {
                return Err(stage_error(
                    "mask(...) of a matrix",
                    "expected an axis and a vector name",
                ));
            };
            if *axis == rows_axis {
                let kept = masked_entries(daf, &rows_axis, &row_entries, mask_name)?;
                let mut indices = Vec::with_capacity(kept.len());
                for entry in &kept {
                    indices.push(entry_index(&row_entries, &rows_axis, entry, daf.name())?);
                }
                let all_cols: Vec<usize> = (0..col_entries.len()).collect();
                Ok(QueryValue::Matrix {
                    matrix: MatrixData::Dense(gather_matrix(&matrix, &indices, &all_cols)?),
                    rows_axis,
                    cols_axis,
                    row_entries: kept,
                    col_entries,
                })
            } else if *axis == cols_axis {
                let kept = masked_entries(daf, &cols_axis, &col_entries, mask_name)?;
                let mut indices = Vec::with_capacity(kept.len());
                for entry in &kept {
                    indices.push(entry_index(&col_entries, &cols_axis, entry, daf.name())?);
                }
                let all_rows: Vec<usize> = (0..row_entries.len()).collect();
                Ok(QueryValue::Matrix {
                    matrix: MatrixData::Dense(gather_matrix(&matrix, &all_rows, &indices)?),
                    rows_axis,
                    cols_axis,
                    row_entries,
                    col_entries: kept,
                })
            } else {
                Err(stage_error(
                    "mask(...) of a matrix",
                    format!("the axis: {} is not of the matrix", axis),
                ))
            }
        }
        _ => Err(stage_error("mask(...)", "the value has no axis to mask")),
    }
}

fn evaluate_op(value: QueryValue, name: &str, params: &ParamMap) -> Result<QueryValue, DafError> {
    if let Some(op) = new_eltwise(name, params)? {
        return match value {
            QueryValue::Scalar(scalar) => Ok(QueryValue::Scalar(op.apply_scalar(&scalar)?)),
            QueryValue::Vector {
                axis,
                entries,
                values,
            } => Ok(QueryValue::Vector {
                values: op.apply_array(&values)?,
                axis,
                entries,
            }),
            QueryValue::Matrix {
                rows_axis,
                cols_axis,
                row_entries,
                col_entries,
                matrix,
            } => {
                let dense = matrix.to_dense();
                let transformed = crate::core::matrix::map_dense_data(&dense, |data| {
                    op.apply_array(data)
                })?;
                Ok(QueryValue::Matrix {
                    matrix: MatrixData::Dense(transformed),
                    rows_axis,
                    cols_axis,
                    row_entries,
                    col_entries,
                })
            }
            QueryValue::Entries { .. } => Err(stage_error(
                "element-wise operation",
                "axis entries are not numeric",
            )),
        };
    }

    if let Some(op) = new_reduction(name, params)? {
        return match value {
            QueryValue::Vector { values, .. } => {
                Ok(QueryValue::Scalar(op.reduce_array(&values)?))
            }
            QueryValue::Matrix {
                rows_axis,
                cols_axis,
                row_entries,
                col_entries,
                matrix,
            } => {
                // one value per major line: per-column for column-major
                let (axis, entries) = match matrix.major() {
                    MajorAxis::Row => (rows_axis, row_entries),
                    MajorAxis::Column => (cols_axis, col_entries),
                };
                let count = entries.len();
                let mut reduced: Option<ArrayData> = None;
                for line in 0..count {
                    let line_values = matrix_major_line(&matrix, line);
                    let value = op.reduce_array(&line_values)?;
                    let buffer = reduced
                        .get_or_insert_with(|| ArrayData::zeros(value.kind(), count));
                    buffer.set(line, &value)?;
                }
                let values = reduced.unwrap_or(ArrayData::F64(Vec::new()));
                Ok(QueryValue::Vector {
                    axis,
                    entries,
                    values,
                })
            }
            QueryValue::Scalar(_) => Err(stage_error(
                "reduction operation",
                "a scalar has no dimension to reduce",
            )),
            QueryValue::Entries { .. } => Err(stage_error(
                "reduction operation",
                "axis entries are not numeric",
            )),
        };
    }

    Err(DafError::UnknownOperation {
        name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::writers::DafWriter;
    use crate::core::matrix::{DenseMatrix, MajorAxis};
    use crate::core::vector::VectorData;
    use crate::format::MemoryDaf;

    fn sample() -> MemoryDaf {
        let daf = MemoryDaf::new("memory");
        daf.set_scalar("version", ScalarValue::I64(1), false).unwrap();
        daf.add_axis(
            "cell",
            vec!["c0".to_string(), "c1".to_string(), "c2".to_string()],
        )
        .unwrap();
        daf.add_axis("gene", vec!["g0".to_string(), "g1".to_string()])
            .unwrap();
        daf.set_vector(
            "cell",
            "signed",
            VectorData::Dense(ArrayData::I64(vec![-1, 2, -3])),
            false,
        )
        .unwrap();
        daf.set_vector(
            "cell",
            "marker",
            VectorData::Dense(ArrayData::Bool(vec![true, false, true])),
            false,
        )
        .unwrap();
        let matrix = DenseMatrix::new(
            3,
            2,
            MajorAxis::Column,
            ArrayData::F64(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
        )
        .unwrap();
        daf.set_matrix("cell", "gene", "umis", MatrixData::Dense(matrix), false)
            .unwrap();
        daf
    }

    #[test]
    fn test_scalar_selection() {
        let daf = sample();
        assert_eq!(
            evaluate(&daf, "scalar(version)").unwrap(),
            QueryValue::Scalar(ScalarValue::I64(1))
        );
    }

    #[test]
    fn test_eltwise_pipeline() {
        let daf = sample();
        let result = evaluate(&daf, "vec(cell, signed) | Abs").unwrap();
        match result {
            QueryValue::Vector { values, .. } => {
                assert_eq!(values, ArrayData::I64(vec![1, 2, 3]));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_projection_and_slice() {
        let daf = sample();
        assert_eq!(
            evaluate(&daf, "vec(cell, signed) | at(c1)").unwrap(),
            QueryValue::Scalar(ScalarValue::I64(2))
        );

        let result = evaluate(&daf, "vec(cell, signed) | slice(c2, c0)").unwrap();
        match result {
            QueryValue::Vector {
                entries, values, ..
            } => {
                assert_eq!(entries, vec!["c2".to_string(), "c0".to_string()]);
                assert_eq!(values, ArrayData::I64(vec![-3, -1]));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_mask_filters_by_bool_vector() {
        let daf = sample();
        let result = evaluate(&daf, "vec(cell, signed) | mask(marker)").unwrap();
        match result {
            QueryValue::Vector {
                entries, values, ..
            } => {
                assert_eq!(entries, vec!["c0".to_string(), "c2".to_string()]);
                assert_eq!(values, ArrayData::I64(vec![-1, -3]));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_matrix_projection() {
        let daf = sample();
        let result = evaluate(&daf, "mat(cell, gene, umis) | at(cell, c1)").unwrap();
        match result {
            QueryValue::Vector {
                axis,
                entries,
                values,
            } => {
                assert_eq!(axis, "gene");
                assert_eq!(entries, vec!["g0".to_string(), "g1".to_string()]);
                assert_eq!(values, ArrayData::F64(vec![2.0, 5.0]));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_matrix_reduction_is_per_column_for_column_major() {
        let daf = sample();
        let result = evaluate(&daf, "mat(cell, gene, umis) | Sum").unwrap();
        match result {
            QueryValue::Vector {
                axis,
                entries,
                values,
            } => {
                assert_eq!(axis, "gene");
                assert_eq!(entries, vec!["g0".to_string(), "g1".to_string()]);
                assert_eq!(values, ArrayData::F64(vec![6.0, 15.0]));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_vector_reduction() {
        let daf = sample();
        assert_eq!(
            evaluate(&daf, "vec(cell, signed) | Abs | Sum").unwrap(),
            QueryValue::Scalar(ScalarValue::I64(6))
        );
    }

    #[test]
    fn test_unknown_operation() {
        let daf = sample();
        let error = evaluate(&daf, "vec(cell, signed) | NoSuchOp").unwrap_err();
        assert_eq!(error.to_string(), "unknown operation: NoSuchOp");
    }

    #[test]
    fn test_missing_entry() {
        let daf = sample();
        let error = evaluate(&daf, "vec(cell, signed) | at(c9)").unwrap_err();
        assert!(error.to_string().contains("missing entry: c9"));
    }
}
