// src/core/vector.rs

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::value::{ArrayData, ElementKind, ScalarValue};
use crate::error::DafError;

/// Integer kinds usable for sparse indices and offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexKind {
    I32,
    I64,
    U32,
    U64,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            IndexKind::I32 => "i32",
            IndexKind::I64 => "i64",
            IndexKind::U32 => "u32",
            IndexKind::U64 => "u64",
        };
        write!(f, "{}", text)
    }
}

/// A typed index array; the kind is declared per sparse artifact and shared
/// by its indices and offsets arrays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexData {
    I32(Vec<i32>),
    I64(Vec<i64>),
    U32(Vec<u32>),
    U64(Vec<u64>),
}

impl IndexData {
    pub fn kind(&self) -> IndexKind {
        match self {
            IndexData::I32(_) => IndexKind::I32,
            IndexData::I64(_) => IndexKind::I64,
            IndexData::U32(_) => IndexKind::U32,
            IndexData::U64(_) => IndexKind::U64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            IndexData::I32(v) => v.len(),
            IndexData::I64(v) => v.len(),
            IndexData::U32(v) => v.len(),
            IndexData::U64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> usize {
        match self {
            IndexData::I32(v) => v[index] as usize,
            IndexData::I64(v) => v[index] as usize,
            IndexData::U32(v) => v[index] as usize,
            IndexData::U64(v) => v[index] as usize,
        }
    }

    pub fn zeros(kind: IndexKind, len: usize) -> IndexData {
        match kind {
            IndexKind::I32 => IndexData::I32(vec![0; len]),
            IndexKind::I64 => IndexData::I64(vec![0; len]),
            IndexKind::U32 => IndexData::U32(vec![0; len]),
            IndexKind::U64 => IndexData::U64(vec![0; len]),
        }
    }

    /// Builds a typed index array from plain positions, checking the kind's
    /// range.
    pub fn from_usizes(kind: IndexKind, values: &[usize]) -> Result<IndexData, DafError> {
        fn convert<T: TryFrom<usize>>(kind: IndexKind, values: &[usize]) -> Result<Vec<T>, DafError> {
            values
                .iter()
                .map(|&v| {
                    T::try_from(v).map_err(|_| DafError::InvalidData {
                        what: "sparse index".to_string(),
                        reason: format!("position {} does not fit in {}", v, kind),
                    })
                })
                .collect()
        }
        Ok(match kind {
            IndexKind::I32 => IndexData::I32(convert(kind, values)?),
            IndexKind::I64 => IndexData::I64(convert(kind, values)?),
            IndexKind::U32 => IndexData::U32(convert(kind, values)?),
            IndexKind::U64 => IndexData::U64(convert(kind, values)?),
        })
    }

    pub fn set(&mut self, index: usize, value: usize) -> Result<(), DafError> {
        let kind = self.kind();
        let overflow = || DafError::InvalidData {
            what: "sparse index".to_string(),
            reason: format!("position {} does not fit in {}", value, kind),
        };
        match self {
            IndexData::I32(v) => v[index] = i32::try_from(value).map_err(|_| overflow())?,
            IndexData::I64(v) => v[index] = i64::try_from(value).map_err(|_| overflow())?,
            IndexData::U32(v) => v[index] = u32::try_from(value).map_err(|_| overflow())?,
            IndexData::U64(v) => v[index] = u64::try_from(value).map_err(|_| overflow())?,
        }
        Ok(())
    }
}

/// A sparse vector: explicit entries at sorted positions, implicit zeros
/// elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparseVector {
    length: usize,
    indices: IndexData,
    values: ArrayData,
}

impl SparseVector {
    pub fn new(length: usize, indices: IndexData, values: ArrayData) -> Result<Self, DafError> {
        if indices.len() != values.len() {
            return Err(DafError::InvalidData {
                what: "sparse vector".to_string(),
                reason: format!(
                    "indices length: {} is different from values length: {}",
                    indices.len(),
                    values.len()
                ),
            });
        }
        if values.kind() == ElementKind::Str {
            return Err(DafError::TypeMismatch {
                what: "sparse vector element".to_string(),
                expected: "a numeric or bool kind".to_string(),
                actual: ElementKind::Str.to_string(),
            });
        }
        let mut previous: Option<usize> = None;
        for at in 0..indices.len() {
            let index = indices.get(at);
            if index >= length {
                return Err(DafError::InvalidData {
                    what: "sparse vector".to_string(),
                    reason: format!("index: {} is out of the length: {}", index, length),
                });
            }
            if let Some(previous) = previous {
                if index <= previous {
                    return Err(DafError::InvalidData {
                        what: "sparse vector".to_string(),
                        reason: "indices are not strictly increasing".to_string(),
                    });
                }
            }
            previous = Some(index);
        }
        Ok(Self {
            length,
            indices,
            values,
        })
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
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

    pub fn indices(&self) -> &IndexData {
        &self.indices
    }

    pub fn values(&self) -> &ArrayData {
        &self.values
    }

    pub fn get(&self, index: usize) -> ScalarValue {
        for at in 0..self.indices.len() {
            match self.indices.get(at) {
                stored if stored == index => return self.values.get(at),
                stored if stored > index => break,
                _ => {}
            }
        }
        ScalarValue::zero_of(self.values.kind())
    }

    pub fn to_dense(&self) -> ArrayData {
        let mut dense = ArrayData::zeros(self.values.kind(), self.length);
        for at in 0..self.indices.len() {
            let index = self.indices.get(at);
            set_dense_element(&mut dense, index, &self.values, at);
        }
        dense
    }
}

/// Copies `source[from]` into `target[at]`; both arrays must share a kind.
pub(crate) fn set_dense_element(dense: &mut ArrayData, at: usize, source: &ArrayData, from: usize) {
    match (dense, source) {
        (ArrayData::I8(d), ArrayData::I8(s)) => d[at] = s[from],
        (ArrayData::I16(d), ArrayData::I16(s)) => d[at] = s[from],
        (ArrayData::I32(d), ArrayData::I32(s)) => d[at] = s[from],
        (ArrayData::I64(d), ArrayData::I64(s)) => d[at] = s[from],
        (ArrayData::U8(d), ArrayData::U8(s)) => d[at] = s[from],
        (ArrayData::U16(d), ArrayData::U16(s)) => d[at] = s[from],
        (ArrayData::U32(d), ArrayData::U32(s)) => d[at] = s[from],
        (ArrayData::U64(d), ArrayData::U64(s)) => d[at] = s[from],
        (ArrayData::F32(d), ArrayData::F32(s)) => d[at] = s[from],
        (ArrayData::F64(d), ArrayData::F64(s)) => d[at] = s[from],
        (ArrayData::Bool(d), ArrayData::Bool(s)) => d[at] = s[from],
        (ArrayData::Str(d), ArrayData::Str(s)) => d[at] = s[from].clone(),
        _ => unreachable!("dense buffer allocated with the source kind"),
    }
}

/// A stored vector value: either a plain dense array or an explicit sparse
/// representation. The representation is chosen by the caller at set time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VectorData {
    Dense(ArrayData),
    Sparse(SparseVector),
}

impl VectorData {
    pub fn len(&self) -> usize {
        match self {
            VectorData::Dense(data) => data.len(),
            VectorData::Sparse(sparse) => sparse.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn element_kind(&self) -> ElementKind {
        match self {
            VectorData::Dense(data) => data.kind(),
            VectorData::Sparse(sparse) => sparse.element_kind(),
        }
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, VectorData::Sparse(_))
    }

    pub fn get(&self, index: usize) -> ScalarValue {
        match self {
            VectorData::Dense(data) => data.get(index),
            VectorData::Sparse(sparse) => sparse.get(index),
        }
    }

    /// Materializes a dense array; a no-copy borrow is impossible for the
    /// sparse arm, so dense values clone.
    pub fn to_dense(&self) -> ArrayData {
        match self {
            VectorData::Dense(data) => data.clone(),
            VectorData::Sparse(sparse) => sparse.to_dense(),
        }
    }
}

impl From<ArrayData> for VectorData {
    fn from(data: ArrayData) -> Self {
        VectorData::Dense(data)
    }
}

impl From<SparseVector> for VectorData {
    fn from(sparse: SparseVector) -> Self {
        VectorData::Sparse(sparse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_vector_round_trip() {
        let sparse = SparseVector::new(
            5,
            IndexData::U32(vec![1, 3]),
            ArrayData::F64(vec![2.5, -1.0]),
        )
        .unwrap();
        assert_eq!(sparse.nnz(), 2);
        assert_eq!(sparse.get(1), ScalarValue::F64(2.5));
        assert_eq!(sparse.get(2), ScalarValue::F64(0.0));
        assert_eq!(
            sparse.to_dense(),
            ArrayData::F64(vec![0.0, 2.5, 0.0, -1.0, 0.0])
        );
    }

    #[test]
    fn test_sparse_vector_rejects_bad_indices() {
        assert!(SparseVector::new(
            3,
            IndexData::U32(vec![2, 1]),
            ArrayData::I64(vec![1, 2])
        )
        .is_err());
        assert!(SparseVector::new(
            3,
            IndexData::U32(vec![1, 3]),
            ArrayData::I64(vec![1, 2])
        )
        .is_err());
        assert!(SparseVector::new(3, IndexData::U32(vec![1]), ArrayData::I64(vec![1, 2])).is_err());
    }

    #[test]
    fn test_index_data_range_check() {
        let too_big = usize::try_from(u64::from(u32::MAX) + 1);
        if let Ok(too_big) = too_big {
            assert!(IndexData::from_usizes(IndexKind::U32, &[too_big]).is_err());
            assert!(IndexData::from_usizes(IndexKind::U64, &[too_big]).is_ok());
        }
    }
}
