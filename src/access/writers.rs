// src/access/writers.rs

use std::collections::HashSet;

use crate::core::matrix::{MajorAxis, MatrixData};
use crate::core::value::{ArrayData, ElementKind, ScalarValue};
use crate::core::vector::{IndexKind, VectorData};
use crate::error::{ArtifactKind, DafError};
use crate::format::{FormatWriter, SparseMatrixFill, SparseVectorFill};

fn require_name(name: &str, what: &str) -> Result<(), DafError> {
    if name.is_empty() {
        return Err(DafError::InvalidData {
            what: format!("{} name", what),
            reason: "the name is empty".to_string(),
        });
    }
    Ok(())
}

/// The validated write API, layered over any writable backend. Every
/// operation takes the dataset's write lock; overwriting goes through a
/// `for_set` delete so chains can shadow instead of remove.
pub trait DafWriter: FormatWriter {
    fn set_scalar(
        &self,
        name: &str,
        value: ScalarValue,
        overwrite: bool,
    ) -> Result<(), DafError> {
        require_name(name, "scalar")?;
        self.lock().with_write_lock(|| {
            if self.format_has_scalar(name) {
                if !overwrite {
                    return Err(DafError::existing_scalar(name, self.name()));
                }
                self.format_delete_scalar(name, true)?;
            }
            self.format_set_scalar(name, value)
        })
    }

    fn delete_scalar(&self, name: &str, must_exist: bool) -> Result<(), DafError> {
        self.lock().with_write_lock(|| {
            if !self.format_has_scalar(name) {
                if must_exist {
                    return Err(DafError::missing_scalar(name, self.name()));
                }
                return Ok(());
            }
            self.format_delete_scalar(name, false)
        })
    }

    fn add_axis(&self, axis: &str, entries: Vec<String>) -> Result<(), DafError> {
        require_name(axis, "axis")?;
        let mut seen = HashSet::new();
        for entry in &entries {
            if entry.is_empty() {
                return Err(DafError::InvalidData {
                    what: format!("entry of the axis: {}", axis),
                    reason: "the entry is empty".to_string(),
                });
            }
            if !seen.insert(entry.as_str()) {
                return Err(DafError::AlreadyExists {
                    kind: ArtifactKind::Entry,
                    name: entry.clone(),
                    context: format!("\nfor the axis: {}", axis),
                    dataset: self.name().to_string(),
                });
            }
        }
        self.lock().with_write_lock(|| {
            if self.format_has_axis(axis, false) {
                return Err(DafError::existing_axis(axis, self.name()));
            }
            self.format_add_axis(axis, entries)
        })
    }

    /// Deleting an axis drops every vector stored on it and every matrix
    /// having it as rows or columns.
    fn delete_axis(&self, axis: &str, must_exist: bool) -> Result<(), DafError> {
        self.lock().with_write_lock(|| {
            if !self.format_has_axis(axis, true) {
                if must_exist {
                    return Err(DafError::missing_axis(axis, self.name()));
                }
                return Ok(());
            }
            self.format_delete_axis(axis)
        })
    }

    fn set_vector(
        &self,
        axis: &str,
        name: &str,
        vector: VectorData,
        overwrite: bool,
    ) -> Result<(), DafError> {
        require_name(name, "vector")?;
        self.lock().with_write_lock(|| {
            if !self.format_has_axis(axis, false) {
                return Err(DafError::missing_axis(axis, self.name()));
            }
            let axis_length = self.format_axis_length(axis)?;
            if vector.len() != axis_length {
                return Err(DafError::VectorLengthMismatch {
                    value_length: vector.len(),
                    axis: axis.to_string(),
                    axis_length,
                    dataset: self.name().to_string(),
                });
            }
            if self.format_has_vector(axis, name) {
                if !overwrite {
                    return Err(DafError::existing_vector(axis, name, self.name()));
                }
                self.format_delete_vector(axis, name, true)?;
            }
            self.format_set_vector(axis, name, vector)
        })
    }

    /// Broadcast form of `set_vector`: every entry gets `value`.
    fn fill_vector(
        &self,
        axis: &str,
        name: &str,
        value: &ScalarValue,
        overwrite: bool,
    ) -> Result<(), DafError> {
        let length = self.lock().with_write_lock(|| {
            if !self.format_has_axis(axis, false) {
                return Err(DafError::missing_axis(axis, self.name()));
            }
            self.format_axis_length(axis)
        })?;
        let vector = VectorData::Dense(ArrayData::broadcast(value, length));
        self.set_vector(axis, name, vector, overwrite)
    }

    fn delete_vector(&self, axis: &str, name: &str, must_exist: bool) -> Result<(), DafError> {
        self.lock().with_write_lock(|| {
            if !self.format_has_axis(axis, false) {
                return Err(DafError::missing_axis(axis, self.name()));
            }
            if !self.format_has_vector(axis, name) {
                if must_exist {
                    return Err(DafError::missing_vector(axis, name, self.name()));
                }
                return Ok(());
            }
            self.format_delete_vector(axis, name, false)
        })
    }

    /// Allocates a zeroed dense vector in storage and fills it in place,
    /// holding the write lock for the whole fill. The backend seals the
    /// buffer when the closure returns.
    fn with_empty_dense_vector(
        &self,
        axis: &str,
        name: &str,
        kind: ElementKind,
        overwrite: bool,
        mut fill: impl FnMut(&mut ArrayData) -> Result<(), DafError>,
    ) -> Result<(), DafError> {
        require_name(name, "vector")?;
        self.lock().with_write_lock(|| {
            if !self.format_has_axis(axis, false) {
                return Err(DafError::missing_axis(axis, self.name()));
            }
            if self.format_has_vector(axis, name) {
                if !overwrite {
                    return Err(DafError::existing_vector(axis, name, self.name()));
                }
                self.format_delete_vector(axis, name, true)?;
            }
            self.format_fill_dense_vector(axis, name, kind, &mut fill)
        })
    }

    /// Sparse counterpart of `with_empty_dense_vector`: the closure fills
    /// the index and value arrays, the seal validates them against `nnz`.
    fn with_empty_sparse_vector(
        &self,
        axis: &str,
        name: &str,
        kind: ElementKind,
        index: IndexKind,
        nnz: usize,
        overwrite: bool,
        mut fill: impl FnMut(&mut SparseVectorFill) -> Result<(), DafError>,
    ) -> Result<(), DafError> {
        require_name(name, "vector")?;
        self.lock().with_write_lock(|| {
            if !self.format_has_axis(axis, false) {
                return Err(DafError::missing_axis(axis, self.name()));
            }
            if self.format_has_vector(axis, name) {
                if !overwrite {
                    return Err(DafError::existing_vector(axis, name, self.name()));
                }
                self.format_delete_vector(axis, name, true)?;
            }
            self.format_fill_sparse_vector(axis, name, kind, index, nnz, &mut fill)
        })
    }

    /// The stored representation (dense or sparse) and layout are taken from
    /// the caller's value.
    fn set_matrix(
        &self,
        rows: &str,
        cols: &str,
        name: &str,
        matrix: MatrixData,
        overwrite: bool,
    ) -> Result<(), DafError> {
        require_name(name, "matrix")?;
        self.lock().with_write_lock(|| {
            for axis in [rows, cols] {
                if !self.format_has_axis(axis, false) {
                    return Err(DafError::missing_axis(axis, self.name()));
                }
            }
            let rows_length = self.format_axis_length(rows)?;
            let cols_length = self.format_axis_length(cols)?;
            if matrix.rows() != rows_length || matrix.cols() != cols_length {
                return Err(DafError::MatrixSizeMismatch {
                    value_rows: matrix.rows(),
                    value_cols: matrix.cols(),
                    rows_axis: rows.to_string(),
                    cols_axis: cols.to_string(),
                    rows_length,
                    cols_length,
                    dataset: self.name().to_string(),
                });
            }
            if self.format_has_matrix(rows, cols, name, false) {
                if !overwrite {
                    return Err(DafError::existing_matrix(rows, cols, name, self.name()));
                }
                self.format_delete_matrix(rows, cols, name, true)?;
            }
            self.format_set_matrix(rows, cols, name, matrix)
        })
    }

    fn delete_matrix(
        &self,
        rows: &str,
        cols: &str,
        name: &str,
        must_exist: bool,
    ) -> Result<(), DafError> {
        self.lock().with_write_lock(|| {
            for axis in [rows, cols] {
                if !self.format_has_axis(axis, false) {
                    return Err(DafError::missing_axis(axis, self.name()));
                }
            }
            if !self.format_has_matrix(rows, cols, name, false) {
                if must_exist {
                    return Err(DafError::missing_matrix(rows, cols, name, self.name()));
                }
                return Ok(());
            }
            self.format_delete_matrix(rows, cols, name, false)
        })
    }

    fn with_empty_dense_matrix(
        &self,
        rows: &str,
        cols: &str,
        name: &str,
        kind: ElementKind,
        major: MajorAxis,
        overwrite: bool,
        mut fill: impl FnMut(&mut ArrayData) -> Result<(), DafError>,
    ) -> Result<(), DafError> {
        require_name(name, "matrix")?;
        self.lock().with_write_lock(|| {
            for axis in [rows, cols] {
                if !self.format_has_axis(axis, false) {
                    return Err(DafError::missing_axis(axis, self.name()));
                }
            }
            if self.format_has_matrix(rows, cols, name, false) {
                if !overwrite {
                    return Err(DafError::existing_matrix(rows, cols, name, self.name()));
                }
                self.format_delete_matrix(rows, cols, name, true)?;
            }
            self.format_fill_dense_matrix(rows, cols, name, kind, major, &mut fill)
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn with_empty_sparse_matrix(
        &self,
        rows: &str,
        cols: &str,
        name: &str,
        kind: ElementKind,
        major: MajorAxis,
        index: IndexKind,
        nnz: usize,
        overwrite: bool,
        mut fill: impl FnMut(&mut SparseMatrixFill) -> Result<(), DafError>,
    ) -> Result<(), DafError> {
        require_name(name, "matrix")?;
        self.lock().with_write_lock(|| {
            for axis in [rows, cols] {
                if !self.format_has_axis(axis, false) {
                    return Err(DafError::missing_axis(axis, self.name()));
                }
            }
            if self.format_has_matrix(rows, cols, name, false) {
                if !overwrite {
                    return Err(DafError::existing_matrix(rows, cols, name, self.name()));
                }
                self.format_delete_matrix(rows, cols, name, true)?;
            }
            self.format_fill_sparse_matrix(rows, cols, name, kind, major, index, nnz, &mut fill)
        })
    }

    /// Materializes the matrix stored under (cols, rows) as a stored copy
    /// under (rows, cols).
    fn relayout_matrix(
        &self,
        rows: &str,
        cols: &str,
        name: &str,
        overwrite: bool,
    ) -> Result<(), DafError> {
        self.lock().with_write_lock(|| {
            for axis in [rows, cols] {
                if !self.format_has_axis(axis, false) {
                    return Err(DafError::missing_axis(axis, self.name()));
                }
            }
            if !self.format_has_matrix(cols, rows, name, false) {
                return Err(DafError::missing_matrix(cols, rows, name, self.name()));
            }
            if self.format_has_matrix(rows, cols, name, false) {
                if !overwrite {
                    return Err(DafError::existing_matrix(rows, cols, name, self.name()));
                }
                self.format_delete_matrix(rows, cols, name, true)?;
            }
            self.format_relayout_matrix(rows, cols, name)
        })
    }
}

impl<T: FormatWriter + ?Sized> DafWriter for T {}
