// src/format/mod.rs

mod files;
mod memory;

pub use files::FilesDaf;
pub use memory::MemoryDaf;

use std::sync::Arc;

use crate::core::cache::{DataCache, DataKey};
use crate::core::lock::DafLock;
use crate::core::matrix::{MajorAxis, MatrixData};
use crate::core::value::{ArrayData, ElementKind, ScalarValue};
use crate::core::vector::{IndexData, IndexKind, VectorData};
use crate::error::DafError;

/// Mutable arrays handed out while filling a sparse vector in place. The
/// backend seals them when the fill closure returns, validating lengths and
/// index order.
#[derive(Debug)]
pub struct SparseVectorFill {
    pub indices: IndexData,
    pub values: ArrayData,
}

/// Mutable arrays handed out while filling a sparse matrix in place.
#[derive(Debug)]
pub struct SparseMatrixFill {
    pub offsets: IndexData,
    pub indices: IndexData,
    pub values: ArrayData,
}

/// The read half of the storage contract. Every backend implements it; the
/// user-facing API, chains, views and queries depend only on this trait and
/// its write counterpart.
///
/// The `format_*` operations assume the caller holds the dataset lock and
/// has validated names; validation and locking live in
/// [`DafReader`](crate::access::DafReader).
pub trait FormatReader: Send + Sync {
    fn name(&self) -> &str;
    fn lock(&self) -> &DafLock;
    fn cache(&self) -> &DataCache;

    fn format_has_scalar(&self, name: &str) -> bool;
    fn format_get_scalar(&self, name: &str) -> Result<ScalarValue, DafError>;
    fn format_scalar_names(&self) -> Vec<String>;

    /// `for_change` signals the caller intends to mutate the axis; backends
    /// that cannot mutate it (read-only wrappers, non-tail chain members)
    /// answer false.
    fn format_has_axis(&self, axis: &str, for_change: bool) -> bool;
    fn format_axis_length(&self, axis: &str) -> Result<usize, DafError>;
    fn format_axis_entries(&self, axis: &str) -> Result<Arc<Vec<String>>, DafError>;
    fn format_axis_names(&self) -> Vec<String>;

    fn format_has_vector(&self, axis: &str, name: &str) -> bool;
    fn format_get_vector(&self, axis: &str, name: &str) -> Result<Arc<VectorData>, DafError>;
    fn format_vector_names(&self, axis: &str) -> Vec<String>;

    /// `for_relayout` asks whether the matrix exists in some orientation
    /// convertible to the requested one, not just under the exact
    /// (rows, cols) pair.
    fn format_has_matrix(&self, rows: &str, cols: &str, name: &str, for_relayout: bool) -> bool;
    fn format_get_matrix(
        &self,
        rows: &str,
        cols: &str,
        name: &str,
    ) -> Result<Arc<MatrixData>, DafError>;
    fn format_matrix_names(&self, rows: &str, cols: &str) -> Vec<String>;

    fn format_description_header(&self) -> String {
        format!("name: {}", self.name())
    }

    fn format_description_footer(&self) -> String {
        String::new()
    }

    fn format_version_counter(&self, key: &DataKey) -> u32;
}

/// The write half of the storage contract. All operations are atomic under
/// the dataset's write lock, which the façade holds for the duration of the
/// call - including the whole lifetime of a fill closure.
pub trait FormatWriter: FormatReader {
    fn format_set_scalar(&self, name: &str, value: ScalarValue) -> Result<(), DafError>;

    /// `for_set` marks a delete that is the first half of an overwrite;
    /// chains use it to skip the inherited-existence check.
    fn format_delete_scalar(&self, name: &str, for_set: bool) -> Result<(), DafError>;

    fn format_add_axis(&self, axis: &str, entries: Vec<String>) -> Result<(), DafError>;

    /// Cascades: drops every vector on the axis and every matrix having it
    /// as rows or columns.
    fn format_delete_axis(&self, axis: &str) -> Result<(), DafError>;

    fn format_set_vector(&self, axis: &str, name: &str, vector: VectorData)
        -> Result<(), DafError>;
    fn format_delete_vector(&self, axis: &str, name: &str, for_set: bool) -> Result<(), DafError>;

    /// Allocates a zeroed dense vector in storage and hands it to `fill` to
    /// populate in place, avoiding a copy for large artifacts.
    fn format_fill_dense_vector(
        &self,
        axis: &str,
        name: &str,
        kind: ElementKind,
        fill: &mut dyn FnMut(&mut ArrayData) -> Result<(), DafError>,
    ) -> Result<(), DafError>;

    /// Allocates the index/value arrays of a sparse vector, hands them to
    /// `fill`, then seals them (validating lengths and index order).
    fn format_fill_sparse_vector(
        &self,
        axis: &str,
        name: &str,
        kind: ElementKind,
        index: IndexKind,
        nnz: usize,
        fill: &mut dyn FnMut(&mut SparseVectorFill) -> Result<(), DafError>,
    ) -> Result<(), DafError>;

    fn format_set_matrix(
        &self,
        rows: &str,
        cols: &str,
        name: &str,
        matrix: MatrixData,
    ) -> Result<(), DafError>;
    fn format_delete_matrix(
        &self,
        rows: &str,
        cols: &str,
        name: &str,
        for_set: bool,
    ) -> Result<(), DafError>;

    fn format_fill_dense_matrix(
        &self,
        rows: &str,
        cols: &str,
        name: &str,
        kind: ElementKind,
        major: MajorAxis,
        fill: &mut dyn FnMut(&mut ArrayData) -> Result<(), DafError>,
    ) -> Result<(), DafError>;

    #[allow(clippy::too_many_arguments)]
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
    ) -> Result<(), DafError>;

    /// Materializes the matrix stored under (cols, rows) as a new stored
    /// artifact under (rows, cols).
    fn format_relayout_matrix(&self, rows: &str, cols: &str, name: &str) -> Result<(), DafError>;

    fn format_increment_version_counter(&self, key: &DataKey);
}
