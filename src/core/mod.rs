pub mod cache;
pub mod lock;
pub mod matrix;
pub mod value;
pub mod vector;

// Re-export commonly used types
pub use cache::{DataCache, DataKey, VersionCounters};
pub use lock::DafLock;
pub use matrix::{
    DenseMatrix, MajorAxis, MatrixData, MatrixLayout, MatrixStorage, SparseMatrix,
    TransposedMatrix,
};
pub use value::{ArrayData, ElementKind, ScalarValue};
pub use vector::{IndexData, IndexKind, SparseVector, VectorData};
