// src/view/mod.rs

use std::collections::HashMap;
use std::sync::Arc;

use crate::access::readers::DafReader;
use crate::core::cache::{DataCache, DataKey};
use crate::core::lock::DafLock;
use crate::core::matrix::MatrixData;
use crate::core::value::ScalarValue;
use crate::core::vector::VectorData;
use crate::error::DafError;
use crate::format::FormatReader;

/// Read-only projection of a dataset under alternative names. Axes and
/// artifacts are exposed only through their declared aliases; everything
/// else of the source stays hidden. Reads delegate to the source under the
/// source's own read lock.
pub struct DafView {
    name: String,
    lock: DafLock,
    cache: DataCache,
    source: Arc<dyn FormatReader>,
    axes: HashMap<String, String>,
    scalars: HashMap<String, String>,
    vectors: HashMap<(String, String), String>,
    matrices: HashMap<(String, String, String), String>,
}

impl DafView {
    pub fn new(name: impl Into<String>, source: Arc<dyn FormatReader>) -> Self {
        let name = name.into();
        Self {
            lock: DafLock::new(&name),
            cache: DataCache::new(),
            name,
            source,
            axes: HashMap::new(),
            scalars: HashMap::new(),
            vectors: HashMap::new(),
            matrices: HashMap::new(),
        }
    }

    /// Exposes a source axis under `alias`.
    pub fn expose_axis(mut self, alias: impl Into<String>, source_axis: impl Into<String>) -> Self {
        self.axes.insert(alias.into(), source_axis.into());
        self
    }

    pub fn expose_scalar(
        mut self,
        alias: impl Into<String>,
        source_name: impl Into<String>,
    ) -> Self {
        self.scalars.insert(alias.into(), source_name.into());
        self
    }

    /// Exposes a source vector under `(axis_alias, alias)`; the axis alias
    /// must itself be exposed.
    pub fn expose_vector(
        mut self,
        axis_alias: impl Into<String>,
        alias: impl Into<String>,
        source_name: impl Into<String>,
    ) -> Self {
        self.vectors
            .insert((axis_alias.into(), alias.into()), source_name.into());
        self
    }

    pub fn expose_matrix(
        mut self,
        rows_alias: impl Into<String>,
        cols_alias: impl Into<String>,
        alias: impl Into<String>,
        source_name: impl Into<String>,
    ) -> Self {
        self.matrices.insert(
            (rows_alias.into(), cols_alias.into(), alias.into()),
            source_name.into(),
        );
        self
    }

    fn source_axis(&self, alias: &str) -> Result<&str, DafError> {
        self.axes
            .get(alias)
            .map(|axis| axis.as_str())
            .ok_or_else(|| DafError::missing_axis(alias, &self.name))
    }

}

/// Maps a view-level cache key to the source-level key it derives from, so
/// the source's version counters drive the view's cache.
fn translate_key(view: &DafView, key: &DataKey) -> Option<DataKey> {
    match key {
        DataKey::ScalarNames => Some(DataKey::ScalarNames),
        DataKey::AxisNames => Some(DataKey::AxisNames),
        DataKey::AxisEntries(alias) => view
            .axes
            .get(alias)
            .map(|axis| DataKey::AxisEntries(axis.clone())),
        DataKey::VectorNames(alias) => view
            .axes
            .get(alias)
            .map(|axis| DataKey::VectorNames(axis.clone())),
        DataKey::Vector { axis, name } => {
            let source_axis = view.axes.get(axis)?;
            let source_name = view.vectors.get(&(axis.clone(), name.clone()))?;
            Some(DataKey::Vector {
                axis: source_axis.clone(),
                name: source_name.clone(),
            })
        }
        DataKey::MatrixNames { rows, cols } => {
            let source_rows = view.axes.get(rows)?;
            let source_cols = view.axes.get(cols)?;
            Some(DataKey::MatrixNames {
                rows: source_rows.clone(),
                cols: source_cols.clone(),
            })
        }
        DataKey::Matrix {
            rows,
            cols,
            name,
            major,
        } => {
            let source_rows = view.axes.get(rows)?;
            let source_cols = view.axes.get(cols)?;
            let source_name = view
                .matrices
                .get(&(rows.clone(), cols.clone(), name.clone()))?;
            Some(DataKey::Matrix {
                rows: source_rows.clone(),
                cols: source_cols.clone(),
                name: source_name.clone(),
                major: *major,
            })
        }
    }
}

impl FormatReader for DafView {
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
        self.scalars
            .get(name)
            .map(|source_name| self.source.has_scalar(source_name))
            .unwrap_or(false)
    }

    fn format_get_scalar(&self, name: &str) -> Result<ScalarValue, DafError> {
        let source_name = self
            .scalars
            .get(name)
            .ok_or_else(|| DafError::missing_scalar(name, &self.name))?;
        self.source.get_scalar(source_name)
    }

    fn format_scalar_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.scalars.keys().cloned().collect();
        names.sort();
        names
    }

    fn format_has_axis(&self, alias: &str, for_change: bool) -> bool {
        !for_change
            && self
                .axes
                .get(alias)
                .map(|axis| self.source.has_axis(axis))
                .unwrap_or(false)
    }

    fn format_axis_length(&self, alias: &str) -> Result<usize, DafError> {
        let axis = self.source_axis(alias)?;
        self.source.axis_length(axis)
    }

    fn format_axis_entries(&self, alias: &str) -> Result<Arc<Vec<String>>, DafError> {
        let axis = self.source_axis(alias)?;
        self.source.axis_entries(axis)
    }

    fn format_axis_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.axes.keys().cloned().collect();
        names.sort();
        names
    }

    fn format_has_vector(&self, alias: &str, name: &str) -> bool {
        let Some(axis) = self.axes.get(alias) else {
            return false;
        };
        self.vectors
            .get(&(alias.to_string(), name.to_string()))
            .map(|source_name| {
                self.source
                    .has_vector(axis, source_name)
                    .unwrap_or(false)
            })
            .unwrap_or(false)
    }

    fn format_get_vector(&self, alias: &str, name: &str) -> Result<Arc<VectorData>, DafError> {
        let axis = self.source_axis(alias)?;
        let source_name = self
            .vectors
            .get(&(alias.to_string(), name.to_string()))
            .ok_or_else(|| DafError::missing_vector(alias, name, &self.name))?;
        self.source.get_vector(axis, source_name)
    }

    fn format_vector_names(&self, alias: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .vectors
            .keys()
            .filter(|(axis_alias, _)| axis_alias == alias)
            .map(|(_, name)| name.clone())
            .collect();
        names.sort();
        names
    }

    fn format_has_matrix(&self, rows: &str, cols: &str, name: &str, for_relayout: bool) -> bool {
        let (Some(source_rows), Some(source_cols)) = (self.axes.get(rows), self.axes.get(cols))
        else {
            return false;
        };
        let Some(source_name) =
            self.matrices
                .get(&(rows.to_string(), cols.to_string(), name.to_string()))
        else {
            return false;
        };
        let _guard = self.source.lock().read();
        self.source
            .format_has_matrix(source_rows, source_cols, source_name, for_relayout)
    }

    fn format_get_matrix(
        &self,
        rows: &str,
        cols: &str,
        name: &str,
    ) -> Result<Arc<MatrixData>, DafError> {
        let source_rows = self.source_axis(rows)?;
        let source_cols = self.source_axis(cols)?;
        let source_name = self
            .matrices
            .get(&(rows.to_string(), cols.to_string(), name.to_string()))
            .ok_or_else(|| DafError::missing_matrix(rows, cols, name, &self.name))?;
        self.source.get_matrix(source_rows, source_cols, source_name)
    }

    fn format_matrix_names(&self, rows: &str, cols: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .matrices
            .keys()
            .filter(|(matrix_rows, matrix_cols, _)| matrix_rows == rows && matrix_cols == cols)
            .map(|(_, _, name)| name.clone())
            .collect();
        names.sort();
        names
    }

    fn format_description_header(&self) -> String {
        format!(
            "name: {}\ntype: View\nof the daf data: {}",
            self.name,
            self.source.name()
        )
    }

    fn format_version_counter(&self, key: &DataKey) -> u32 {
        match translate_key(self, key) {
            Some(source_key) => self.source.format_version_counter(&source_key),
            None => 1,
        }
    }
}
