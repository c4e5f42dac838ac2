// src/error.rs

use thiserror::Error;

/// The namespace an artifact (or query token) lives in. Used to render
/// error messages with a uniform shape across all backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Scalar,
    Axis,
    Vector,
    Matrix,
    Entry,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::Scalar => write!(f, "scalar"),
            ArtifactKind::Axis => write!(f, "axis"),
            ArtifactKind::Vector => write!(f, "vector"),
            ArtifactKind::Matrix => write!(f, "matrix"),
            ArtifactKind::Entry => write!(f, "entry"),
        }
    }
}

/// Which operation registry a name belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Eltwise,
    Reduction,
}

impl std::fmt::Display for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpKind::Eltwise => write!(f, "eltwise"),
            OpKind::Reduction => write!(f, "reduction"),
        }
    }
}

#[derive(Error, Debug)]
pub enum DafError {
    #[error("missing {kind}: {name}{context}\nin the daf data: {dataset}")]
    NotFound {
        kind: ArtifactKind,
        name: String,
        context: String,
        dataset: String,
    },

    #[error("existing {kind}: {name}{context}\nin the daf data: {dataset}")]
    AlreadyExists {
        kind: ArtifactKind,
        name: String,
        context: String,
        dataset: String,
    },

    #[error(
        "value length: {value_length} is different from axis: {axis} length: {axis_length}\nin the daf data: {dataset}"
    )]
    VectorLengthMismatch {
        value_length: usize,
        axis: String,
        axis_length: usize,
        dataset: String,
    },

    #[error(
        "matrix size: {value_rows} x {value_cols} is different from axes: {rows_axis} x {cols_axis} size: {rows_length} x {cols_length}\nin the daf data: {dataset}"
    )]
    MatrixSizeMismatch {
        value_rows: usize,
        value_cols: usize,
        rows_axis: String,
        cols_axis: String,
        rows_length: usize,
        cols_length: usize,
        dataset: String,
    },

    #[error("different entries for the axis: {axis}\nin the daf data: {first}\nand the daf data: {second}")]
    InconsistentAxis {
        axis: String,
        first: String,
        second: String,
    },

    #[error("invalid chain: {chain}\nbecause: {reason}")]
    InvalidChain { chain: String, reason: String },

    #[error(
        "failed to delete the {kind}: {name}\nfrom the daf data: {dataset}\nbecause it exists in the earlier: {member}"
    )]
    ForbiddenDelete {
        kind: ArtifactKind,
        name: String,
        dataset: String,
        member: String,
    },

    #[error("{message}")]
    LockMisuse { message: String },

    #[error("type mismatch for the {what}: expected {expected}, got {actual}")]
    TypeMismatch {
        what: String,
        expected: String,
        actual: String,
    },

    #[error("invalid {what}: {reason}")]
    InvalidData { what: String, reason: String },

    #[error("query parse error: {message}\nin the query: {query}")]
    QueryParse { message: String, query: String },

    #[error("unknown operation: {name}")]
    UnknownOperation { name: String },

    #[error("conflicting registrations for the {kind} operation: {name}")]
    ConflictingRegistration { kind: OpKind, name: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DafError {
    pub fn missing_scalar(name: &str, dataset: &str) -> Self {
        DafError::NotFound {
            kind: ArtifactKind::Scalar,
            name: name.to_string(),
            context: String::new(),
            dataset: dataset.to_string(),
        }
    }

    pub fn missing_axis(axis: &str, dataset: &str) -> Self {
        DafError::NotFound {
            kind: ArtifactKind::Axis,
            name: axis.to_string(),
            context: String::new(),
            dataset: dataset.to_string(),
        }
    }

    pub fn missing_vector(axis: &str, name: &str, dataset: &str) -> Self {
        DafError::NotFound {
            kind: ArtifactKind::Vector,
            name: name.to_string(),
            context: format!("\nfor the axis: {}", axis),
            dataset: dataset.to_string(),
        }
    }

    pub fn missing_matrix(rows: &str, cols: &str, name: &str, dataset: &str) -> Self {
        DafError::NotFound {
            kind: ArtifactKind::Matrix,
            name: name.to_string(),
            context: format!("\nfor the axes: {} and {}", rows, cols),
            dataset: dataset.to_string(),
        }
    }

    pub fn missing_entry(axis: &str, entry: &str, dataset: &str) -> Self {
        DafError::NotFound {
            kind: ArtifactKind::Entry,
            name: entry.to_string(),
            context: format!("\nfor the axis: {}", axis),
            dataset: dataset.to_string(),
        }
    }

    pub fn existing_scalar(name: &str, dataset: &str) -> Self {
        DafError::AlreadyExists {
            kind: ArtifactKind::Scalar,
            name: name.to_string(),
            context: String::new(),
            dataset: dataset.to_string(),
        }
    }

    pub fn existing_axis(axis: &str, dataset: &str) -> Self {
        DafError::AlreadyExists {
            kind: ArtifactKind::Axis,
            name: axis.to_string(),
            context: String::new(),
            dataset: dataset.to_string(),
        }
    }

    pub fn existing_vector(axis: &str, name: &str, dataset: &str) -> Self {
        DafError::AlreadyExists {
            kind: ArtifactKind::Vector,
            name: name.to_string(),
            context: format!("\nfor the axis: {}", axis),
            dataset: dataset.to_string(),
        }
    }

    pub fn existing_matrix(rows: &str, cols: &str, name: &str, dataset: &str) -> Self {
        DafError::AlreadyExists {
            kind: ArtifactKind::Matrix,
            name: name.to_string(),
            context: format!("\nfor the axes: {} and {}", rows, cols),
            dataset: dataset.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_scalar_template() {
        let err = DafError::missing_scalar("version", "memory");
        assert_eq!(
            err.to_string(),
            "missing scalar: version\nin the daf data: memory"
        );
    }

    #[test]
    fn test_missing_vector_mentions_axis() {
        let err = DafError::missing_vector("cell", "age", "memory");
        assert_eq!(
            err.to_string(),
            "missing vector: age\nfor the axis: cell\nin the daf data: memory"
        );
    }

    #[test]
    fn test_length_mismatch_template() {
        let err = DafError::VectorLengthMismatch {
            value_length: 2,
            axis: "cell".to_string(),
            axis_length: 3,
            dataset: "memory".to_string(),
        };
        assert!(err
            .to_string()
            .contains("value length: 2 is different from axis: cell length: 3"));
    }

    #[test]
    fn test_conflicting_registration_template() {
        let err = DafError::ConflictingRegistration {
            kind: OpKind::Eltwise,
            name: "Abs".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "conflicting registrations for the eltwise operation: Abs"
        );
    }
}
