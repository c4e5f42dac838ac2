// src/core/matrix.rs

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::value::{ArrayData, ElementKind, ScalarValue};
use crate::core::vector::{set_dense_element, IndexData, IndexKind};
use crate::error::DafError;

/// The axis a matrix is contiguous along. Row-major matrices store whole
/// rows consecutively, column-major matrices whole columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MajorAxis {
    Row,
    Column,
}

impl MajorAxis {
    pub fn flipped(self) -> MajorAxis {
        match self {
            MajorAxis::Row => MajorAxis::Column,
            MajorAxis::Column => MajorAxis::Row,
        }
    }
}

impl fmt::Display for MajorAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MajorAxis::Row => write!(f, "row_major"),
            MajorAxis::Column => write!(f, "column_major"),
        }
    }
}

/// Dense or sparse storage, with the sparse parameters that complete the
/// layout description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatrixStorage {
    Dense,
    Sparse { index: IndexKind, nnz: usize },
}

/// Complete description of how a matrix is laid out. This descriptor is the
/// sole source of truth for layout; element positions are always computed
/// from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixLayout {
    pub element: ElementKind,
    pub rows: usize,
    pub cols: usize,
    pub major: MajorAxis,
    pub storage: MatrixStorage,
}

impl MatrixLayout {
    /// The layout of the transposed view: shape swapped, major axis flipped.
    pub fn transposed(self) -> MatrixLayout {
        MatrixLayout {
            element: self.element,
            rows: self.cols,
            cols: self.rows,
            major: self.major.flipped(),
            storage: self.storage,
        }
    }
}

fn dense_offset(rows: usize, cols: usize, major: MajorAxis, row: usize, col: usize) -> usize {
    match major {
        MajorAxis::Row => row * cols + col,
        MajorAxis::Column => col * rows + row,
    }
}

/// A dense matrix: flat element array in the declared major order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenseMatrix {
    rows: usize,
    cols: usize,
    major: MajorAxis,
    data: ArrayData,
}

impl DenseMatrix {
    pub fn new(
        rows: usize,
        cols: usize,
        major: MajorAxis,
        data: ArrayData,
    ) -> Result<Self, DafError> {
        if !data.kind().is_matrix_element() {
            return Err(DafError::TypeMismatch {
                what: "matrix element".to_string(),
                expected: "a numeric or bool kind".to_string(),
                actual: data.kind().to_string(),
            });
        }
        if data.len() != rows * cols {
            return Err(DafError::InvalidData {
                what: "dense matrix".to_string(),
                reason: format!(
                    "data length: {} is different from size: {} x {}",
                    data.len(),
                    rows,
                    cols
                ),
            });
        }
        Ok(Self {
            rows,
            cols,
            major,
            data,
        })
    }

    pub fn zeros(
        kind: ElementKind,
        rows: usize,
        cols: usize,
        major: MajorAxis,
    ) -> Result<Self, DafError> {
        Self::new(rows, cols, major, ArrayData::zeros(kind, rows * cols))
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn major(&self) -> MajorAxis {
        self.major
    }

    pub fn element_kind(&self) -> ElementKind {
        self.data.kind()
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut ArrayData {
        &mut self.data
    }

    pub fn layout(&self) -> MatrixLayout {
        MatrixLayout {
            element: self.data.kind(),
            rows: self.rows,
            cols: self.cols,
            major: self.major,
            storage: MatrixStorage::Dense,
        }
    }

    pub fn get(&self, row: usize, col: usize) -> ScalarValue {
        self.data
            .get(dense_offset(self.rows, self.cols, self.major, row, col))
    }

    pub fn set(&mut self, row: usize, col: usize, value: &ScalarValue) -> Result<(), DafError> {
        let offset = dense_offset(self.rows, self.cols, self.major, row, col);
        self.data.set(offset, value)
    }

    /// The flat slice of one major line (a row for row-major, a column for
    /// column-major).
    pub fn major_line(&self, line: usize) -> ArrayData {
        let minor = self.minor_count();
        let start = line * minor;
        let indices: Vec<usize> = (start..start + minor).collect();
        self.data.take_indices(&indices)
    }

    pub fn major_count(&self) -> usize {
        match self.major {
            MajorAxis::Row => self.rows,
            MajorAxis::Column => self.cols,
        }
    }

    pub fn minor_count(&self) -> usize {
        match self.major {
            MajorAxis::Row => self.cols,
            MajorAxis::Column => self.rows,
        }
    }

    /// Materializes the stored copy with transposed shape and the same major
    /// axis, physically reordering the elements so that
    /// `relayout(m).get(j, i) == m.get(i, j)`.
    pub fn relayout(&self) -> DenseMatrix {
        let (new_rows, new_cols) = (self.cols, self.rows);
        let mut permutation = vec![0usize; self.data.len()];
        for row in 0..self.rows {
            for col in 0..self.cols {
                let source = dense_offset(self.rows, self.cols, self.major, row, col);
                let target = dense_offset(new_rows, new_cols, self.major, col, row);
                permutation[target] = source;
            }
        }
        let data = self.data.take_indices(&permutation);
        DenseMatrix {
            rows: new_rows,
            cols: new_cols,
            major: self.major,
            data,
        }
    }
}

/// A sparse matrix compressed along its major axis: `offsets` bounds each
/// major line, `indices` holds minor positions (strictly increasing within a
/// line), `values` the explicit elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparseMatrix {
    rows: usize,
    cols: usize,
    major: MajorAxis,
    offsets: IndexData,
    indices: IndexData,
    values: ArrayData,
}

impl SparseMatrix {
    pub fn new(
        rows: usize,
        cols: usize,
        major: MajorAxis,
        offsets: IndexData,
        indices: IndexData,
        values: ArrayData,
    ) -> Result<Self, DafError> {
        if !values.kind().is_matrix_element() {
            return Err(DafError::TypeMismatch {
                what: "matrix element".to_string(),
                expected: "a numeric or bool kind".to_string(),
                actual: values.kind().to_string(),
            });
        }
        if offsets.kind() != indices.kind() {
            return Err(DafError::TypeMismatch {
                what: "sparse offsets".to_string(),
                expected: indices.kind().to_string(),
                actual: offsets.kind().to_string(),
            });
        }
        let major_count = match major {
            MajorAxis::Row => rows,
            MajorAxis::Column => cols,
        };
        let minor_count = match major {
            MajorAxis::Row => cols,
            MajorAxis::Column => rows,
        };
        let nnz = values.len();
        if indices.len() != nnz {
            return Err(DafError::InvalidData {
                what: "sparse matrix".to_string(),
                reason: format!(
                    "indices length: {} is different from values length: {}",
                    indices.len(),
                    nnz
                ),
            });
        }
        if offsets.len() != major_count + 1 {
            return Err(DafError::InvalidData {
                what: "sparse matrix".to_string(),
                reason: format!(
                    "offsets length: {} is different from major count: {} plus one",
                    offsets.len(),
                    major_count
                ),
            });
        }
        if offsets.get(0) != 0 || offsets.get(major_count) != nnz {
            return Err(DafError::InvalidData {
                what: "sparse matrix".to_string(),
                reason: format!("offsets do not span the {} stored elements", nnz),
            });
        }
        for line in 0..major_count {
            let start = offsets.get(line);
            let end = offsets.get(line + 1);
            if end < start {
                return Err(DafError::InvalidData {
                    what: "sparse matrix".to_string(),
                    reason: "offsets are not monotonic".to_string(),
                });
            }
            let mut previous: Option<usize> = None;
            for at in start..end {
                let minor = indices.get(at);
                if minor >= minor_count {
                    return Err(DafError::InvalidData {
                        what: "sparse matrix".to_string(),
                        reason: format!(
                            "index: {} is out of the minor count: {}",
                            minor, minor_count
                        ),
                    });
                }
                if let Some(previous) = previous {
                    if minor <= previous {
                        return Err(DafError::InvalidData {
                            what: "sparse matrix".to_string(),
                            reason: "indices are not strictly increasing within a line".to_string(),
                        });
                    }
                }
                previous = Some(minor);
            }
        }
        Ok(Self {
            rows,
            cols,
            major,
            offsets,
            indices,
            values,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn major(&self) -> MajorAxis {
        self.major
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn element_kind(&self) -> ElementKind {
        self.values.kind()
    }

    pub fn index_kind(&self) -> IndexKind {
        self.indices.kind()
    }

    pub fn offsets(&self) -> &IndexData {
        &self.offsets
    }

    pub fn indices(&self) -> &IndexData {
        &self.indices
    }

    pub fn values(&self) -> &ArrayData {
        &self.values
    }

    pub fn major_count(&self) -> usize {
        match self.major {
            MajorAxis::Row => self.rows,
            MajorAxis::Column => self.cols,
        }
    }

    pub fn minor_count(&self) -> usize {
        match self.major {
            MajorAxis::Row => self.cols,
            MajorAxis::Column => self.rows,
        }
    }

    pub fn layout(&self) -> MatrixLayout {
        MatrixLayout {
            element: self.values.kind(),
            rows: self.rows,
            cols: self.cols,
            major: self.major,
            storage: MatrixStorage::Sparse {
                index: self.indices.kind(),
                nnz: self.values.len(),
            },
        }
    }

    pub fn get(&self, row: usize, col: usize) -> ScalarValue {
        let (line, minor) = match self.major {
            MajorAxis::Row => (row, col),
            MajorAxis::Column => (col, row),
        };
        let start = self.offsets.get(line);
        let end = self.offsets.get(line + 1);
        for at in start..end {
            match self.indices.get(at) {
                stored if stored == minor => return self.values.get(at),
                stored if stored > minor => break,
                _ => {}
            }
        }
        ScalarValue::zero_of(self.values.kind())
    }

    /// Materializes the stored copy with transposed shape and the same major
    /// axis. The compressed lines of the result are the minor positions of
    /// the source, so this is the classic compressed-axis conversion: count
    /// per target line, prefix-sum into offsets, then scatter.
    pub fn relayout(&self) -> Result<SparseMatrix, DafError> {
        let source_major = self.major_count();
        let target_major = self.minor_count();
        let nnz = self.nnz();

        let mut counts = vec![0usize; target_major];
        for at in 0..nnz {
            counts[self.indices.get(at)] += 1;
        }
        let mut target_offsets = vec![0usize; target_major + 1];
        for line in 0..target_major {
            target_offsets[line + 1] = target_offsets[line] + counts[line];
        }

        let mut next = target_offsets.clone();
        let mut target_indices = vec![0usize; nnz];
        let mut source_of = vec![0usize; nnz];
        for line in 0..source_major {
            for at in self.offsets.get(line)..self.offsets.get(line + 1) {
                let target_line = self.indices.get(at);
                let position = next[target_line];
                next[target_line] += 1;
                target_indices[position] = line;
                source_of[position] = at;
            }
        }

        let kind = self.indices.kind();
        SparseMatrix::new(
            self.cols,
            self.rows,
            self.major,
            IndexData::from_usizes(kind, &target_offsets)?,
            IndexData::from_usizes(kind, &target_indices)?,
            self.values.take_indices(&source_of),
        )
    }

    pub fn to_dense(&self) -> DenseMatrix {
        let mut dense = ArrayData::zeros(self.values.kind(), self.rows * self.cols);
        for line in 0..self.major_count() {
            for at in self.offsets.get(line)..self.offsets.get(line + 1) {
                let minor = self.indices.get(at);
                let (row, col) = match self.major {
                    MajorAxis::Row => (line, minor),
                    MajorAxis::Column => (minor, line),
                };
                let offset = dense_offset(self.rows, self.cols, self.major, row, col);
                set_dense_element(&mut dense, offset, &self.values, at);
            }
        }
        DenseMatrix {
            rows: self.rows,
            cols: self.cols,
            major: self.major,
            data: dense,
        }
    }
}

/// A stored matrix value, dense or sparse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatrixData {
    Dense(DenseMatrix),
    Sparse(SparseMatrix),
}

impl MatrixData {
    pub fn rows(&self) -> usize {
        match self {
            MatrixData::Dense(m) => m.rows(),
            MatrixData::Sparse(m) => m.rows(),
        }
    }

    pub fn cols(&self) -> usize {
        match self {
            MatrixData::Dense(m) => m.cols(),
            MatrixData::Sparse(m) => m.cols(),
        }
    }

    pub fn major(&self) -> MajorAxis {
        match self {
            MatrixData::Dense(m) => m.major(),
            MatrixData::Sparse(m) => m.major(),
        }
    }

    pub fn element_kind(&self) -> ElementKind {
        match self {
            MatrixData::Dense(m) => m.element_kind(),
            MatrixData::Sparse(m) => m.element_kind(),
        }
    }

    pub fn layout(&self) -> MatrixLayout {
        match self {
            MatrixData::Dense(m) => m.layout(),
            MatrixData::Sparse(m) => m.layout(),
        }
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, MatrixData::Sparse(_))
    }

    pub fn get(&self, row: usize, col: usize) -> ScalarValue {
        match self {
            MatrixData::Dense(m) => m.get(row, col),
            MatrixData::Sparse(m) => m.get(row, col),
        }
    }

    pub fn relayout(&self) -> Result<MatrixData, DafError> {
        Ok(match self {
            MatrixData::Dense(m) => MatrixData::Dense(m.relayout()),
            MatrixData::Sparse(m) => MatrixData::Sparse(m.relayout()?),
        })
    }

    pub fn to_dense(&self) -> DenseMatrix {
        match self {
            MatrixData::Dense(m) => m.clone(),
            MatrixData::Sparse(m) => m.to_dense(),
        }
    }

    /// The zero-copy transposed read view.
    pub fn transposed(&self) -> TransposedMatrix<'_> {
        TransposedMatrix { source: self }
    }
}

/// Read-only transposed view of a matrix: the descriptor swaps shape and
/// flips the major axis; no element moves.
#[derive(Debug, Clone, Copy)]
pub struct TransposedMatrix<'a> {
    source: &'a MatrixData,
}

impl TransposedMatrix<'_> {
    pub fn rows(&self) -> usize {
        self.source.cols()
    }

    pub fn cols(&self) -> usize {
        self.source.rows()
    }

    pub fn layout(&self) -> MatrixLayout {
        self.source.layout().transposed()
    }

    pub fn get(&self, row: usize, col: usize) -> ScalarValue {
        self.source.get(col, row)
    }
}

/// Extracts one major line of a matrix as a dense array, materializing
/// implicit sparse zeros.
pub fn matrix_major_line(matrix: &MatrixData, line: usize) -> ArrayData {
    match matrix {
        MatrixData::Dense(m) => m.major_line(line),
        MatrixData::Sparse(m) => {
            let mut dense = ArrayData::zeros(m.element_kind(), m.minor_count());
            for at in m.offsets().get(line)..m.offsets().get(line + 1) {
                set_dense_element(&mut dense, m.indices().get(at), m.values(), at);
            }
            dense
        }
    }
}

/// Applies a transform to the flat element array of a dense matrix,
/// preserving shape and layout. The transform may change the element kind.
pub fn map_dense_data(
    matrix: &DenseMatrix,
    f: impl FnOnce(&ArrayData) -> Result<ArrayData, DafError>,
) -> Result<DenseMatrix, DafError> {
    let data = f(&matrix.data)?;
    DenseMatrix::new(matrix.rows, matrix.cols, matrix.major, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dense_2x3() -> DenseMatrix {
        // [[1, 2, 3], [4, 5, 6]] stored row-major
        DenseMatrix::new(
            2,
            3,
            MajorAxis::Row,
            ArrayData::I64(vec![1, 2, 3, 4, 5, 6]),
        )
        .unwrap()
    }

    #[test]
    fn test_dense_offsets_follow_major() {
        let row_major = dense_2x3();
        assert_eq!(row_major.get(0, 2), ScalarValue::I64(3));
        assert_eq!(row_major.get(1, 0), ScalarValue::I64(4));

        let column_major = DenseMatrix::new(
            2,
            3,
            MajorAxis::Column,
            ArrayData::I64(vec![1, 4, 2, 5, 3, 6]),
        )
        .unwrap();
        assert_eq!(column_major.get(0, 2), ScalarValue::I64(3));
        assert_eq!(column_major.get(1, 0), ScalarValue::I64(4));
    }

    #[test]
    fn test_dense_relayout_laws() {
        let m = dense_2x3();
        let t = m.relayout();
        assert_eq!(t.rows(), m.cols());
        assert_eq!(t.cols(), m.rows());
        assert_eq!(t.major(), m.major());
        for i in 0..m.rows() {
            for j in 0..m.cols() {
                assert_eq!(t.get(j, i), m.get(i, j));
            }
        }
    }

    #[test]
    fn test_transposed_view_is_descriptor_only() {
        let m = MatrixData::Dense(dense_2x3());
        let t = m.transposed();
        assert_eq!(t.rows(), 3);
        assert_eq!(t.cols(), 2);
        assert_eq!(t.layout().major, MajorAxis::Column);
        assert_eq!(t.get(2, 1), ScalarValue::I64(6));
    }

    fn sparse_3x2_column_major() -> SparseMatrix {
        // [[0, 7], [5, 0], [0, 9]] compressed per column
        SparseMatrix::new(
            3,
            2,
            MajorAxis::Column,
            IndexData::U32(vec![0, 1, 3]),
            IndexData::U32(vec![1, 0, 2]),
            ArrayData::F64(vec![5.0, 7.0, 9.0]),
        )
        .unwrap()
    }

    #[test]
    fn test_sparse_get_and_dense_round_trip() {
        let m = sparse_3x2_column_major();
        assert_eq!(m.nnz(), 3);
        assert_eq!(m.get(1, 0), ScalarValue::F64(5.0));
        assert_eq!(m.get(0, 0), ScalarValue::F64(0.0));
        assert_eq!(m.get(2, 1), ScalarValue::F64(9.0));

        let dense = m.to_dense();
        for i in 0..3 {
            for j in 0..2 {
                assert_eq!(dense.get(i, j), m.get(i, j));
            }
        }
    }

    #[test]
    fn test_sparse_relayout_laws() {
        let m = sparse_3x2_column_major();
        let t = m.relayout().unwrap();
        assert_eq!(t.rows(), 2);
        assert_eq!(t.cols(), 3);
        assert_eq!(t.major(), MajorAxis::Column);
        assert_eq!(t.nnz(), m.nnz());
        for i in 0..3 {
            for j in 0..2 {
                assert_eq!(t.get(j, i), m.get(i, j));
            }
        }
    }

    #[test]
    fn test_sparse_validation() {
        // offsets not spanning nnz
        assert!(SparseMatrix::new(
            3,
            2,
            MajorAxis::Column,
            IndexData::U32(vec![0, 1, 2]),
            IndexData::U32(vec![1, 0, 2]),
            ArrayData::F64(vec![5.0, 7.0, 9.0]),
        )
        .is_err());
        // minor index out of range
        assert!(SparseMatrix::new(
            3,
            2,
            MajorAxis::Column,
            IndexData::U32(vec![0, 1, 3]),
            IndexData::U32(vec![3, 0, 2]),
            ArrayData::F64(vec![5.0, 7.0, 9.0]),
        )
        .is_err());
        // strings are not matrix elements
        assert!(DenseMatrix::new(
            1,
            1,
            MajorAxis::Row,
            ArrayData::Str(vec!["x".to_string()]),
        )
        .is_err());
    }

    #[test]
    fn test_major_line_extraction() {
        let m = MatrixData::Sparse(sparse_3x2_column_major());
        assert_eq!(
            matrix_major_line(&m, 0),
            ArrayData::F64(vec![0.0, 5.0, 0.0])
        );
        assert_eq!(
            matrix_major_line(&m, 1),
            ArrayData::F64(vec![7.0, 0.0, 9.0])
        );
    }
}
