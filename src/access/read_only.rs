// src/access/read_only.rs

use std::sync::Arc;

use crate::core::cache::{DataCache, DataKey};
use crate::core::lock::DafLock;
use crate::core::matrix::MatrixData;
use crate::core::value::ScalarValue;
use crate::core::vector::VectorData;
use crate::error::DafError;
use crate::format::FormatReader;

/// Read-only wrapper around any backend. It implements only the reader half
/// of the storage contract, so mutation is impossible by construction; the
/// wrapped dataset's lock and cache are shared.
pub struct ReadOnlyDaf {
    name: Option<String>,
    inner: Arc<dyn FormatReader>,
}

impl ReadOnlyDaf {
    pub fn new(inner: Arc<dyn FormatReader>) -> Self {
        Self { name: None, inner }
    }

    /// Wraps and renames; reads delegate unchanged, only `name()` differs.
    pub fn renamed(inner: Arc<dyn FormatReader>, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            inner,
        }
    }
}

impl FormatReader for ReadOnlyDaf {
    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.inner.name())
    }

    fn lock(&self) -> &DafLock {
        self.inner.lock()
    }

    fn cache(&self) -> &DataCache {
        self.inner.cache()
    }

    fn format_has_scalar(&self, name: &str) -> bool {
        self.inner.format_has_scalar(name)
    }

    fn format_get_scalar(&self, name: &str) -> Result<ScalarValue, DafError> {
        self.inner.format_get_scalar(name)
    }

    fn format_scalar_names(&self) -> Vec<String> {
        self.inner.format_scalar_names()
    }

    fn format_has_axis(&self, axis: &str, for_change: bool) -> bool {
        // axes reachable through this wrapper can never be mutated
        !for_change && self.inner.format_has_axis(axis, false)
    }

    fn format_axis_length(&self, axis: &str) -> Result<usize, DafError> {
        self.inner.format_axis_length(axis)
    }

    fn format_axis_entries(&self, axis: &str) -> Result<Arc<Vec<String>>, DafError> {
        self.inner.format_axis_entries(axis)
    }

    fn format_axis_names(&self) -> Vec<String> {
        self.inner.format_axis_names()
    }

    fn format_has_vector(&self, axis: &str, name: &str) -> bool {
        self.inner.format_has_vector(axis, name)
    }

    fn format_get_vector(&self, axis: &str, name: &str) -> Result<Arc<VectorData>, DafError> {
        self.inner.format_get_vector(axis, name)
    }

    fn format_vector_names(&self, axis: &str) -> Vec<String> {
        self.inner.format_vector_names(axis)
    }

    fn format_has_matrix(&self, rows: &str, cols: &str, name: &str, for_relayout: bool) -> bool {
        self.inner.format_has_matrix(rows, cols, name, for_relayout)
    }

    fn format_get_matrix(
        &self,
        rows: &str,
        cols: &str,
        name: &str,
    ) -> Result<Arc<MatrixData>, DafError> {
        self.inner.format_get_matrix(rows, cols, name)
    }

    fn format_matrix_names(&self, rows: &str, cols: &str) -> Vec<String> {
        self.inner.format_matrix_names(rows, cols)
    }

    fn format_description_header(&self) -> String {
        format!("name: {}\ntype: ReadOnly", self.name())
    }

    fn format_description_footer(&self) -> String {
        self.inner.format_description_footer()
    }

    fn format_version_counter(&self, key: &DataKey) -> u32 {
        self.inner.format_version_counter(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::readers::DafReader;
    use crate::access::writers::DafWriter;
    use crate::format::MemoryDaf;

    #[test]
    fn test_read_only_delegates_reads() {
        let memory = Arc::new(MemoryDaf::new("memory"));
        memory
            .set_scalar("version", ScalarValue::I64(1), false)
            .unwrap();

        let read_only = ReadOnlyDaf::new(memory.clone());
        assert_eq!(read_only.name(), "memory");
        assert_eq!(
            read_only.get_scalar("version").unwrap(),
            ScalarValue::I64(1)
        );
    }

    #[test]
    fn test_renamed_wrapper() {
        let memory = Arc::new(MemoryDaf::new("memory"));
        let read_only = ReadOnlyDaf::renamed(memory, "frozen");
        assert_eq!(read_only.name(), "frozen");
    }

    #[test]
    fn test_axes_are_not_changeable_through_the_wrapper() {
        let memory = Arc::new(MemoryDaf::new("memory"));
        memory.add_axis("cell", vec!["c0".to_string()]).unwrap();
        let read_only = ReadOnlyDaf::new(memory);
        assert!(read_only.format_has_axis("cell", false));
        assert!(!read_only.format_has_axis("cell", true));
    }
}
