// src/format/memory.rs

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::cache::{DataCache, DataKey, VersionCounters};
use crate::core::lock::DafLock;
use crate::core::matrix::{DenseMatrix, MajorAxis, MatrixData, SparseMatrix};
use crate::core::value::{ArrayData, ElementKind, ScalarValue};
use crate::core::vector::{IndexData, IndexKind, SparseVector, VectorData};
use crate::error::DafError;
use crate::format::{FormatReader, FormatWriter, SparseMatrixFill, SparseVectorFill};

#[derive(Default)]
struct MemoryState {
    scalars: HashMap<String, ScalarValue>,
    axes: HashMap<String, Arc<Vec<String>>>,
    vectors: HashMap<(String, String), Arc<VectorData>>,
    matrices: HashMap<(String, String, String), Arc<MatrixData>>,
}

/// In-memory backend: everything lives in hash maps, artifacts are shared
/// out as immutable `Arc`s once written.
pub struct MemoryDaf {
    name: String,
    lock: DafLock,
    cache: DataCache,
    counters: VersionCounters,
    state: Mutex<MemoryState>,
}

impl MemoryDaf {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            lock: DafLock::new(&name),
            name,
            cache: DataCache::new(),
            counters: VersionCounters::new(),
            state: Mutex::new(MemoryState::default()),
        }
    }

    fn axis_length_locked(&self, state: &MemoryState, axis: &str) -> Result<usize, DafError> {
        state
            .axes
            .get(axis)
            .map(|entries| entries.len())
            .ok_or_else(|| DafError::missing_axis(axis, &self.name))
    }

    fn bump_vector(&self, axis: &str, name: &str) {
        self.counters.bump(&DataKey::VectorNames(axis.to_string()));
        self.counters.bump(&DataKey::Vector {
            axis: axis.to_string(),
            name: name.to_string(),
        });
    }

    fn bump_matrix(&self, rows: &str, cols: &str, name: &str, major: MajorAxis) {
        self.counters.bump(&DataKey::MatrixNames {
            rows: rows.to_string(),
            cols: cols.to_string(),
        });
        self.counters.bump(&DataKey::Matrix {
            rows: rows.to_string(),
            cols: cols.to_string(),
            name: name.to_string(),
            major,
        });
    }
}

fn sorted(mut names: Vec<String>) -> Vec<String> {
    names.sort();
    names
}

impl FormatReader for MemoryDaf {
    fn name(&self) -> &str {
        &self.name
    }

    fn lock(&self) -> &DafLock {
        &self.lock
    }

    fn cache(&self) -> &DataCache {
        &self.cache
    }

    fn format_has_scalar(&self, name: &str) -> bool {
        self.state.lock().scalars.contains_key(name)
    }

    fn format_get_scalar(&self, name: &str) -> Result<ScalarValue, DafError> {
        self.state
            .lock()
            .scalars
            .get(name)
            .cloned()
            .ok_or_else(|| DafError::missing_scalar(name, &self.name))
    }

    fn format_scalar_names(&self) -> Vec<String> {
        sorted(self.state.lock().scalars.keys().cloned().collect())
    }

    fn format_has_axis(&self, axis: &str, _for_change: bool) -> bool {
        self.state.lock().axes.contains_key(axis)
    }

    fn format_axis_length(&self, axis: &str) -> Result<usize, DafError> {
        let state = self.state.lock();
        self.axis_length_locked(&state, axis)
    }

    fn format_axis_entries(&self, axis: &str) -> Result<Arc<Vec<String>>, DafError> {
        self.state
            .lock()
            .axes
            .get(axis)
            .cloned()
            .ok_or_else(|| DafError::missing_axis(axis, &self.name))
    }

    fn format_axis_names(&self) -> Vec<String> {
        sorted(self.state.lock().axes.keys().cloned().collect())
    }

    fn format_has_vector(&self, axis: &str, name: &str) -> bool {
        self.state
            .lock()
            .vectors
            .contains_key(&(axis.to_string(), name.to_string()))
    }

    fn format_get_vector(&self, axis: &str, name: &str) -> Result<Arc<VectorData>, DafError> {
        self.state
            .lock()
            .vectors
            .get(&(axis.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| DafError::missing_vector(axis, name, &self.name))
    }

    fn format_vector_names(&self, axis: &str) -> Vec<String> {
        sorted(
            self.state
                .lock()
                .vectors
                .keys()
                .filter(|(vector_axis, _)| vector_axis == axis)
                .map(|(_, name)| name.clone())
                .collect(),
        )
    }

    fn format_has_matrix(&self, rows: &str, cols: &str, name: &str, for_relayout: bool) -> bool {
        let state = self.state.lock();
        let exact = state
            .matrices
            .contains_key(&(rows.to_string(), cols.to_string(), name.to_string()));
        if exact || !for_relayout {
            return exact;
        }
        state
            .matrices
            .contains_key(&(cols.to_string(), rows.to_string(), name.to_string()))
    }

    fn format_get_matrix(
        &self,
        rows: &str,
        cols: &str,
        name: &str,
    ) -> Result<Arc<MatrixData>, DafError> {
        self.state
            .lock()
            .matrices
            .get(&(rows.to_string(), cols.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| DafError::missing_matrix(rows, cols, name, &self.name))
    }

    fn format_matrix_names(&self, rows: &str, cols: &str) -> Vec<String> {
        sorted(
            self.state
                .lock()
                .matrices
                .keys()
                .filter(|(matrix_rows, matrix_cols, _)| matrix_rows == rows && matrix_cols == cols)
                .map(|(_, _, name)| name.clone())
                .collect(),
        )
    }

    fn format_description_header(&self) -> String {
        format!("name: {}\ntype: MemoryDaf", self.name)
    }

    fn format_version_counter(&self, key: &DataKey) -> u32 {
        self.counters.get(key)
    }
}

impl FormatWriter for MemoryDaf {
    fn format_set_scalar(&self, name: &str, value: ScalarValue) -> Result<(), DafError> {
        self.state.lock().scalars.insert(name.to_string(), value);
        self.counters.bump(&DataKey::ScalarNames);
        Ok(())
    }

    fn format_delete_scalar(&self, name: &str, _for_set: bool) -> Result<(), DafError> {
        let removed = self.state.lock().scalars.remove(name);
        if removed.is_none() {
            return Err(DafError::missing_scalar(name, &self.name));
        }
        self.counters.bump(&DataKey::ScalarNames);
        Ok(())
    }

    fn format_add_axis(&self, axis: &str, entries: Vec<String>) -> Result<(), DafError> {
        let mut state = self.state.lock();
        if state.axes.contains_key(axis) {
            return Err(DafError::existing_axis(axis, &self.name));
        }
        state.axes.insert(axis.to_string(), Arc::new(entries));
        self.counters.bump(&DataKey::AxisNames);
        self.counters.bump(&DataKey::AxisEntries(axis.to_string()));
        Ok(())
    }

    fn format_delete_axis(&self, axis: &str) -> Result<(), DafError> {
        let mut state = self.state.lock();
        if state.axes.remove(axis).is_none() {
            return Err(DafError::missing_axis(axis, &self.name));
        }
        let vector_keys: Vec<(String, String)> = state
            .vectors
            .keys()
            .filter(|(vector_axis, _)| vector_axis == axis)
            .cloned()
            .collect();
        for key in vector_keys {
            state.vectors.remove(&key);
            self.bump_vector(&key.0, &key.1);
        }
        let matrix_keys: Vec<(String, String, String)> = state
            .matrices
            .keys()
            .filter(|(rows, cols, _)| rows == axis || cols == axis)
            .cloned()
            .collect();
        for key in matrix_keys {
            let major = state.matrices.remove(&key).map(|m| m.major());
            if let Some(major) = major {
                self.bump_matrix(&key.0, &key.1, &key.2, major);
            }
        }
        self.counters.bump(&DataKey::AxisNames);
        self.counters.bump(&DataKey::AxisEntries(axis.to_string()));
        Ok(())
    }

    fn format_set_vector(
        &self,
        axis: &str,
        name: &str,
        vector: VectorData,
    ) -> Result<(), DafError> {
        let mut state = self.state.lock();
        self.axis_length_locked(&state, axis)?;
        state
            .vectors
            .insert((axis.to_string(), name.to_string()), Arc::new(vector));
        drop(state);
        self.bump_vector(axis, name);
        Ok(())
    }

    fn format_delete_vector(&self, axis: &str, name: &str, _for_set: bool) -> Result<(), DafError> {
        let removed = self
            .state
            .lock()
            .vectors
            .remove(&(axis.to_string(), name.to_string()));
        if removed.is_none() {
            return Err(DafError::missing_vector(axis, name, &self.name));
        }
        self.bump_vector(axis, name);
        Ok(())
    }

    fn format_fill_dense_vector(
        &self,
        axis: &str,
        name: &str,
        kind: ElementKind,
        fill: &mut dyn FnMut(&mut ArrayData) -> Result<(), DafError>,
    ) -> Result<(), DafError> {
        let length = self.format_axis_length(axis)?;
        let mut data = ArrayData::zeros(kind, length);
        fill(&mut data)?;
        if data.len() != length || data.kind() != kind {
            return Err(DafError::InvalidData {
                what: "filled dense vector".to_string(),
                reason: format!(
                    "the fill replaced the {} x {} buffer with {} x {}",
                    kind,
                    length,
                    data.kind(),
                    data.len()
                ),
            });
        }
        self.format_set_vector(axis, name, VectorData::Dense(data))
    }

    fn format_fill_sparse_vector(
        &self,
        axis: &str,
        name: &str,
        kind: ElementKind,
        index: IndexKind,
        nnz: usize,
        fill: &mut dyn FnMut(&mut SparseVectorFill) -> Result<(), DafError>,
    ) -> Result<(), DafError> {
        let length = self.format_axis_length(axis)?;
        let mut buffers = SparseVectorFill {
            indices: IndexData::zeros(index, nnz),
            values: ArrayData::zeros(kind, nnz),
        };
        fill(&mut buffers)?;
        let sealed = SparseVector::new(length, buffers.indices, buffers.values)?;
        self.format_set_vector(axis, name, VectorData::Sparse(sealed))
    }

    fn format_set_matrix(
        &self,
        rows: &str,
        cols: &str,
        name: &str,
        matrix: MatrixData,
    ) -> Result<(), DafError> {
        let major = matrix.major();
        let mut state = self.state.lock();
        self.axis_length_locked(&state, rows)?;
        self.axis_length_locked(&state, cols)?;
        state.matrices.insert(
            (rows.to_string(), cols.to_string(), name.to_string()),
            Arc::new(matrix),
        );
        drop(state);
        self.bump_matrix(rows, cols, name, major);
        Ok(())
    }

    fn format_delete_matrix(
        &self,
        rows: &str,
        cols: &str,
        name: &str,
        _for_set: bool,
    ) -> Result<(), DafError> {
        let removed = self
            .state
            .lock()
            .matrices
            .remove(&(rows.to_string(), cols.to_string(), name.to_string()));
        match removed {
            Some(matrix) => {
                self.bump_matrix(rows, cols, name, matrix.major());
                Ok(())
            }
            None => Err(DafError::missing_matrix(rows, cols, name, &self.name)),
        }
    }

    fn format_fill_dense_matrix(
        &self,
        rows: &str,
        cols: &str,
        name: &str,
        kind: ElementKind,
        major: MajorAxis,
        fill: &mut dyn FnMut(&mut ArrayData) -> Result<(), DafError>,
    ) -> Result<(), DafError> {
        let rows_length = self.format_axis_length(rows)?;
        let cols_length = self.format_axis_length(cols)?;
        let mut data = ArrayData::zeros(kind, rows_length * cols_length);
        fill(&mut data)?;
        let sealed = DenseMatrix::new(rows_length, cols_length, major, data)?;
        self.format_set_matrix(rows, cols, name, MatrixData::Dense(sealed))
    }

    fn format_fill_sparse_matrix(
        &self,
        rows: &str,
        cols: &str,
        name: &str,
        kind: ElementKind,
        major: MajorAxis,
        index: IndexKind,
        nnz: usize,
        fill: &mut dyn FnMut(&mut SparseMatrixFill) -> Result<(), DafError>,
    ) -> Result<(), DafError> {
        let rows_length = self.format_axis_length(rows)?;
        let cols_length = self.format_axis_length(cols)?;
        let major_count = match major {
            MajorAxis::Row => rows_length,
            MajorAxis::Column => cols_length,
        };
        let mut buffers = SparseMatrixFill {
            offsets: IndexData::zeros(index, major_count + 1),
            indices: IndexData::zeros(index, nnz),
            values: ArrayData::zeros(kind, nnz),
        };
        fill(&mut buffers)?;
        let sealed = SparseMatrix::new(
            rows_length,
            cols_length,
            major,
            buffers.offsets,
            buffers.indices,
            buffers.values,
        )?;
        self.format_set_matrix(rows, cols, name, MatrixData::Sparse(sealed))
    }

    fn format_relayout_matrix(&self, rows: &str, cols: &str, name: &str) -> Result<(), DafError> {
        let source = self.format_get_matrix(cols, rows, name)?;
        let relayout = source.relayout()?;
        self.format_set_matrix(rows, cols, name, relayout)
    }

    fn format_increment_version_counter(&self, key: &DataKey) {
        self.counters.bump(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_round_trip() {
        let daf = MemoryDaf::new("memory");
        daf.format_set_scalar("version", ScalarValue::I64(1)).unwrap();
        assert!(daf.format_has_scalar("version"));
        assert_eq!(
            daf.format_get_scalar("version").unwrap(),
            ScalarValue::I64(1)
        );
        daf.format_delete_scalar("version", false).unwrap();
        assert!(!daf.format_has_scalar("version"));
    }

    #[test]
    fn test_delete_axis_cascades() {
        let daf = MemoryDaf::new("memory");
        daf.format_add_axis("cell", vec!["c0".to_string(), "c1".to_string()])
            .unwrap();
        daf.format_add_axis("gene", vec!["g0".to_string()]).unwrap();
        daf.format_set_vector(
            "cell",
            "age",
            VectorData::Dense(ArrayData::I64(vec![1, 2])),
        )
        .unwrap();
        let matrix = DenseMatrix::new(2, 1, MajorAxis::Column, ArrayData::F64(vec![0.5, 0.25]))
            .unwrap();
        daf.format_set_matrix("cell", "gene", "umis", MatrixData::Dense(matrix))
            .unwrap();

        daf.format_delete_axis("cell").unwrap();
        assert!(!daf.format_has_axis("cell", false));
        assert!(!daf.format_has_vector("cell", "age"));
        assert!(!daf.format_has_matrix("cell", "gene", "umis", true));
        assert!(daf.format_has_axis("gene", false));
    }

    #[test]
    fn test_has_matrix_for_relayout_checks_both_orientations() {
        let daf = MemoryDaf::new("memory");
        daf.format_add_axis("cell", vec!["c0".to_string()]).unwrap();
        daf.format_add_axis("gene", vec!["g0".to_string(), "g1".to_string()])
            .unwrap();
        let matrix =
            DenseMatrix::new(1, 2, MajorAxis::Column, ArrayData::F32(vec![1.0, 2.0])).unwrap();
        daf.format_set_matrix("cell", "gene", "umis", MatrixData::Dense(matrix))
            .unwrap();

        assert!(daf.format_has_matrix("cell", "gene", "umis", false));
        assert!(!daf.format_has_matrix("gene", "cell", "umis", false));
        assert!(daf.format_has_matrix("gene", "cell", "umis", true));
    }

    #[test]
    fn test_relayout_materializes_transposed_copy() {
        let daf = MemoryDaf::new("memory");
        daf.format_add_axis("cell", vec!["c0".to_string()]).unwrap();
        daf.format_add_axis("gene", vec!["g0".to_string(), "g1".to_string()])
            .unwrap();
        let matrix =
            DenseMatrix::new(1, 2, MajorAxis::Column, ArrayData::F32(vec![1.0, 2.0])).unwrap();
        daf.format_set_matrix("cell", "gene", "umis", MatrixData::Dense(matrix))
            .unwrap();

        daf.format_relayout_matrix("gene", "cell", "umis").unwrap();
        let relayout = daf.format_get_matrix("gene", "cell", "umis").unwrap();
        assert_eq!(relayout.rows(), 2);
        assert_eq!(relayout.cols(), 1);
        assert_eq!(relayout.get(1, 0), ScalarValue::F32(2.0));
        // the original stored orientation is untouched
        let original = daf.format_get_matrix("cell", "gene", "umis").unwrap();
        assert_eq!(original.get(0, 1), ScalarValue::F32(2.0));
    }

    #[test]
    fn test_fill_sparse_vector_seals() {
        let daf = MemoryDaf::new("memory");
        daf.format_add_axis(
            "cell",
            vec!["c0".to_string(), "c1".to_string(), "c2".to_string()],
        )
        .unwrap();
        daf.format_fill_sparse_vector(
            "cell",
            "marker",
            ElementKind::F64,
            IndexKind::U32,
            2,
            &mut |buffers| {
                buffers.indices.set(0, 0)?;
                buffers.indices.set(1, 2)?;
                buffers.values.set(0, &ScalarValue::F64(0.5))?;
                buffers.values.set(1, &ScalarValue::F64(1.5))?;
                Ok(())
            },
        )
        .unwrap();
        let vector = daf.format_get_vector("cell", "marker").unwrap();
        assert!(vector.is_sparse());
        assert_eq!(
            vector.to_dense(),
            ArrayData::F64(vec![0.5, 0.0, 1.5])
        );
    }

    #[test]
    fn test_version_counters_move_on_mutation() {
        let daf = MemoryDaf::new("memory");
        let key = DataKey::ScalarNames;
        let before = daf.format_version_counter(&key);
        daf.format_set_scalar("version", ScalarValue::I64(1)).unwrap();
        assert!(daf.format_version_counter(&key) > before);
    }
}
