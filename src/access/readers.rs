// src/access/readers.rs

use std::sync::Arc;

use crate::core::cache::DataKey;
use crate::core::matrix::MatrixData;
use crate::core::value::ScalarValue;
use crate::core::vector::VectorData;
use crate::error::DafError;
use crate::format::FormatReader;

/// The validated read API, layered over any backend. Every operation takes
/// the dataset's read lock, checks preconditions, formats errors with the
/// dataset name, and consults the name-set cache before touching storage.
pub trait DafReader: FormatReader {
    fn has_scalar(&self, name: &str) -> bool {
        let _guard = self.lock().read();
        self.format_has_scalar(name)
    }

    fn get_scalar(&self, name: &str) -> Result<ScalarValue, DafError> {
        self.lock().with_read_lock(|| {
            if !self.format_has_scalar(name) {
                return Err(DafError::missing_scalar(name, self.name()));
            }
            self.format_get_scalar(name)
        })
    }

    fn scalar_names(&self) -> Arc<Vec<String>> {
        let _guard = self.lock().read();
        let key = DataKey::ScalarNames;
        self.cache()
            .get_or_insert_with(&key, self.format_version_counter(&key), || {
                Arc::new(self.format_scalar_names())
            })
    }

    fn has_axis(&self, axis: &str) -> bool {
        let _guard = self.lock().read();
        self.format_has_axis(axis, false)
    }

    fn axis_names(&self) -> Arc<Vec<String>> {
        let _guard = self.lock().read();
        let key = DataKey::AxisNames;
        self.cache()
            .get_or_insert_with(&key, self.format_version_counter(&key), || {
                Arc::new(self.format_axis_names())
            })
    }

    fn axis_length(&self, axis: &str) -> Result<usize, DafError> {
        self.lock().with_read_lock(|| {
            if !self.format_has_axis(axis, false) {
                return Err(DafError::missing_axis(axis, self.name()));
            }
            self.format_axis_length(axis)
        })
    }

    fn axis_entries(&self, axis: &str) -> Result<Arc<Vec<String>>, DafError> {
        self.lock().with_read_lock(|| {
            if !self.format_has_axis(axis, false) {
                return Err(DafError::missing_axis(axis, self.name()));
            }
            let key = DataKey::AxisEntries(axis.to_string());
            self.cache()
                .get_or_compute(&key, self.format_version_counter(&key), || {
                    self.format_axis_entries(axis)
                })
        })
    }

    fn has_vector(&self, axis: &str, name: &str) -> Result<bool, DafError> {
        self.lock().with_read_lock(|| {
            if !self.format_has_axis(axis, false) {
                return Err(DafError::missing_axis(axis, self.name()));
            }
            Ok(self.format_has_vector(axis, name))
        })
    }

    fn vector_names(&self, axis: &str) -> Result<Arc<Vec<String>>, DafError> {
        self.lock().with_read_lock(|| {
            if !self.format_has_axis(axis, false) {
                return Err(DafError::missing_axis(axis, self.name()));
            }
            let key = DataKey::VectorNames(axis.to_string());
            Ok(self
                .cache()
                .get_or_insert_with(&key, self.format_version_counter(&key), || {
                    Arc::new(self.format_vector_names(axis))
                }))
        })
    }

    fn get_vector(&self, axis: &str, name: &str) -> Result<Arc<VectorData>, DafError> {
        self.lock().with_read_lock(|| {
            if !self.format_has_axis(axis, false) {
                return Err(DafError::missing_axis(axis, self.name()));
            }
            if !self.format_has_vector(axis, name) {
                return Err(DafError::missing_vector(axis, name, self.name()));
            }
            let vector = self.format_get_vector(axis, name)?;
            let axis_length = self.format_axis_length(axis)?;
            if vector.len() != axis_length {
                return Err(DafError::VectorLengthMismatch {
                    value_length: vector.len(),
                    axis: axis.to_string(),
                    axis_length,
                    dataset: self.name().to_string(),
                });
            }
            Ok(vector)
        })
    }

    fn has_matrix(&self, rows: &str, cols: &str, name: &str) -> Result<bool, DafError> {
        self.lock().with_read_lock(|| {
            for axis in [rows, cols] {
                if !self.format_has_axis(axis, false) {
                    return Err(DafError::missing_axis(axis, self.name()));
                }
            }
            Ok(self.format_has_matrix(rows, cols, name, false))
        })
    }

    fn matrix_names(&self, rows: &str, cols: &str) -> Result<Arc<Vec<String>>, DafError> {
        self.lock().with_read_lock(|| {
            for axis in [rows, cols] {
                if !self.format_has_axis(axis, false) {
                    return Err(DafError::missing_axis(axis, self.name()));
                }
            }
            let key = DataKey::MatrixNames {
                rows: rows.to_string(),
                cols: cols.to_string(),
            };
            Ok(self
                .cache()
                .get_or_insert_with(&key, self.format_version_counter(&key), || {
                    Arc::new(self.format_matrix_names(rows, cols))
                }))
        })
    }

    fn get_matrix(&self, rows: &str, cols: &str, name: &str) -> Result<Arc<MatrixData>, DafError> {
        self.lock().with_read_lock(|| {
            for axis in [rows, cols] {
                if !self.format_has_axis(axis, false) {
                    return Err(DafError::missing_axis(axis, self.name()));
                }
            }
            if !self.format_has_matrix(rows, cols, name, false) {
                return Err(DafError::missing_matrix(rows, cols, name, self.name()));
            }
            let matrix = self.format_get_matrix(rows, cols, name)?;
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
            Ok(matrix)
        })
    }

    /// Human-readable summary of the dataset contents.
    fn description(&self) -> String {
        let _guard = self.lock().read();
        let mut text = self.format_description_header();
        let scalars = self.format_scalar_names();
        if !scalars.is_empty() {
            text.push_str("\nscalars:");
            for name in &scalars {
                text.push_str(&format!("\n  {}", name));
            }
        }
        let axes = self.format_axis_names();
        if !axes.is_empty() {
            text.push_str("\naxes:");
            for axis in &axes {
                let length = self.format_axis_length(axis).unwrap_or(0);
                text.push_str(&format!("\n  {}: {} entries", axis, length));
                for name in self.format_vector_names(axis) {
                    text.push_str(&format!("\n    {}", name));
                }
            }
            for rows in &axes {
                for cols in &axes {
                    let names = self.format_matrix_names(rows, cols);
                    if !names.is_empty() {
                        text.push_str(&format!("\n{} x {}:", rows, cols));
                        for name in names {
                            text.push_str(&format!("\n  {}", name));
                        }
                    }
                }
            }
        }
        let footer = self.format_description_footer();
        if !footer.is_empty() {
            text.push('\n');
            text.push_str(&footer);
        }
        text
    }
}

impl<T: FormatReader + ?Sized> DafReader for T {}
