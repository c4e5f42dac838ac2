// src/lib.rs

pub mod core;

pub mod access;
pub mod chain;
pub mod copy;
pub mod error;
pub mod format;
pub mod query;
pub mod view;

// Re-exports para tener una API limpia desde fuera del crate
pub use access::{DafReader, DafWriter, ReadOnlyDaf};
pub use chain::{ChainReader, ChainWriter};
pub use copy::{concatenate, copy_all, copy_axis, copy_matrix, copy_scalar, copy_vector};
pub use crate::core::cache::{DataCache, DataKey, VersionCounters};
pub use crate::core::lock::DafLock;
pub use crate::core::matrix::{
    DenseMatrix, MajorAxis, MatrixData, MatrixLayout, MatrixStorage, SparseMatrix,
    TransposedMatrix,
};
pub use crate::core::value::{ArrayData, ElementKind, ScalarValue};
pub use crate::core::vector::{IndexData, IndexKind, SparseVector, VectorData};
pub use error::{ArtifactKind, DafError, OpKind};
pub use format::{FilesDaf, FormatReader, FormatWriter, MemoryDaf};
pub use query::{
    evaluate, parse_query, register_builtin_ops, register_eltwise, register_reduction, EltwiseOp,
    ParamMap, ParamValue, Query, QueryValue, ReductionOp,
};
pub use view::DafView;
