// src/format/files.rs

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::cache::{DataCache, DataKey, VersionCounters};
use crate::core::lock::DafLock;
use crate::core::matrix::{DenseMatrix, MajorAxis, MatrixData, SparseMatrix};
use crate::core::value::{ArrayData, ElementKind, ScalarValue};
use crate::core::vector::{IndexData, IndexKind, SparseVector, VectorData};
use crate::error::DafError;
use crate::format::{FormatReader, FormatWriter, SparseMatrixFill, SparseVectorFill};

const MANIFEST_FILE: &str = "daf.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SparseMeta {
    index: IndexKind,
    nnz: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScalarMeta {
    file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AxisMeta {
    file: String,
    length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct VectorMeta {
    file: String,
    kind: ElementKind,
    sparse: Option<SparseMeta>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MatrixMeta {
    file: String,
    kind: ElementKind,
    layout: MajorAxis,
    sparse: Option<SparseMeta>,
}

/// The manifest maps artifact names to their files and records the
/// layout/sparsity metadata needed to describe artifacts without reading
/// them.
#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    name: String,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
    next_file_id: u64,
    scalars: BTreeMap<String, ScalarMeta>,
    axes: BTreeMap<String, AxisMeta>,
    vectors: BTreeMap<String, BTreeMap<String, VectorMeta>>,
    matrices: BTreeMap<String, BTreeMap<String, BTreeMap<String, MatrixMeta>>>,
}

impl Manifest {
    fn new(name: String) -> Self {
        let now = Utc::now();
        Self {
            name,
            created_at: now,
            modified_at: now,
            next_file_id: 0,
            scalars: BTreeMap::new(),
            axes: BTreeMap::new(),
            vectors: BTreeMap::new(),
            matrices: BTreeMap::new(),
        }
    }

    fn allocate_file(&mut self, directory: &str) -> String {
        let id = self.next_file_id;
        self.next_file_id += 1;
        format!("{}/{}.json", directory, id)
    }

    fn matrix_meta(&self, rows: &str, cols: &str, name: &str) -> Option<&MatrixMeta> {
        self.matrices.get(rows)?.get(cols)?.get(name)
    }
}

/// Directory-of-files backend: one JSON file per artifact under the root,
/// plus a `daf.json` manifest. Version counters are not persisted; they
/// restart at 1 on open with a cold cache.
pub struct FilesDaf {
    name: String,
    root: PathBuf,
    lock: DafLock,
    cache: DataCache,
    counters: VersionCounters,
    state: Mutex<Manifest>,
}

impl FilesDaf {
    /// Creates an empty dataset in `root`, which must not already hold one.
    pub fn create(root: impl Into<PathBuf>, name: impl Into<String>) -> Result<Self, DafError> {
        let root = root.into();
        let name = name.into();
        if root.join(MANIFEST_FILE).exists() {
            return Err(DafError::InvalidData {
                what: "files daf root".to_string(),
                reason: format!("{} already holds a dataset", root.display()),
            });
        }
        for directory in ["scalars", "axes", "vectors", "matrices"] {
            fs::create_dir_all(root.join(directory))?;
        }
        let daf = Self {
            lock: DafLock::new(&name),
            cache: DataCache::new(),
            counters: VersionCounters::new(),
            state: Mutex::new(Manifest::new(name.clone())),
            name,
            root,
        };
        daf.save_manifest(&mut daf.state.lock())?;
        Ok(daf)
    }

    /// Opens an existing dataset from its root directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, DafError> {
        let root = root.into();
        let text = fs::read_to_string(root.join(MANIFEST_FILE))?;
        let manifest: Manifest = serde_json::from_str(&text)?;
        let name = manifest.name.clone();
        Ok(Self {
            lock: DafLock::new(&name),
            cache: DataCache::new(),
            counters: VersionCounters::new(),
            state: Mutex::new(manifest),
            name,
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn save_manifest(&self, manifest: &mut Manifest) -> Result<(), DafError> {
        manifest.modified_at = Utc::now();
        let text = serde_json::to_string_pretty(&*manifest)?;
        fs::write(self.root.join(MANIFEST_FILE), text)?;
        Ok(())
    }

    fn write_artifact<T: Serialize>(&self, file: &str, value: &T) -> Result<(), DafError> {
        let text = serde_json::to_string(value)?;
        fs::write(self.root.join(file), text)?;
        Ok(())
    }

    fn read_artifact<T: for<'de> Deserialize<'de>>(&self, file: &str) -> Result<T, DafError> {
        let text = fs::read_to_string(self.root.join(file))?;
        Ok(serde_json::from_str(&text)?)
    }

    fn remove_artifact(&self, file: &str) -> Result<(), DafError> {
        let path = self.root.join(file);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
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

    fn manifest_axis_length(&self, manifest: &Manifest, axis: &str) -> Result<usize, DafError> {
        manifest
            .axes
            .get(axis)
            .map(|meta| meta.length)
            .ok_or_else(|| DafError::missing_axis(axis, &self.name))
    }
}

impl FormatReader for FilesDaf {
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
        let file = {
            let manifest = self.state.lock();
            manifest
                .scalars
                .get(name)
                .map(|meta| meta.file.clone())
                .ok_or_else(|| DafError::missing_scalar(name, &self.name))?
        };
        self.read_artifact(&file)
    }

    fn format_scalar_names(&self) -> Vec<String> {
        self.state.lock().scalars.keys().cloned().collect()
    }

    fn format_has_axis(&self, axis: &str, _for_change: bool) -> bool {
        self.state.lock().axes.contains_key(axis)
    }

    fn format_axis_length(&self, axis: &str) -> Result<usize, DafError> {
        let manifest = self.state.lock();
        self.manifest_axis_length(&manifest, axis)
    }

    fn format_axis_entries(&self, axis: &str) -> Result<Arc<Vec<String>>, DafError> {
        let file = {
            let manifest = self.state.lock();
            manifest
                .axes
                .get(axis)
                .map(|meta| meta.file.clone())
                .ok_or_else(|| DafError::missing_axis(axis, &self.name))?
        };
        let entries: Vec<String> = self.read_artifact(&file)?;
        Ok(Arc::new(entries))
    }

    fn format_axis_names(&self) -> Vec<String> {
        self.state.lock().axes.keys().cloned().collect()
    }

    fn format_has_vector(&self, axis: &str, name: &str) -> bool {
        self.state
            .lock()
            .vectors
            .get(axis)
            .map(|vectors| vectors.contains_key(name))
            .unwrap_or(false)
    }

    fn format_get_vector(&self, axis: &str, name: &str) -> Result<Arc<VectorData>, DafError> {
        let file = {
            let manifest = self.state.lock();
            manifest
                .vectors
                .get(axis)
                .and_then(|vectors| vectors.get(name))
                .map(|meta| meta.file.clone())
                .ok_or_else(|| DafError::missing_vector(axis, name, &self.name))?
        };
        let key = DataKey::Vector {
            axis: axis.to_string(),
            name: name.to_string(),
        };
        self.cache
            .get_or_compute(&key, self.counters.get(&key), || {
                Ok(Arc::new(self.read_artifact::<VectorData>(&file)?))
            })
    }

    fn format_vector_names(&self, axis: &str) -> Vec<String> {
        self.state
            .lock()
            .vectors
            .get(axis)
            .map(|vectors| vectors.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn format_has_matrix(&self, rows: &str, cols: &str, name: &str, for_relayout: bool) -> bool {
        let manifest = self.state.lock();
        if manifest.matrix_meta(rows, cols, name).is_some() {
            return true;
        }
        for_relayout && manifest.matrix_meta(cols, rows, name).is_some()
    }

    fn format_get_matrix(
        &self,
        rows: &str,
        cols: &str,
        name: &str,
    ) -> Result<Arc<MatrixData>, DafError> {
        let (file, layout) = {
            let manifest = self.state.lock();
            let meta = manifest
                .matrix_meta(rows, cols, name)
                .ok_or_else(|| DafError::missing_matrix(rows, cols, name, &self.name))?;
            (meta.file.clone(), meta.layout)
        };
        let key = DataKey::Matrix {
            rows: rows.to_string(),
            cols: cols.to_string(),
            name: name.to_string(),
            major: layout,
        };
        self.cache
            .get_or_compute(&key, self.counters.get(&key), || {
                Ok(Arc::new(self.read_artifact::<MatrixData>(&file)?))
            })
    }

    fn format_matrix_names(&self, rows: &str, cols: &str) -> Vec<String> {
        self.state
            .lock()
            .matrices
            .get(rows)
            .and_then(|columns| columns.get(cols))
            .map(|matrices| matrices.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn format_description_header(&self) -> String {
        format!(
            "name: {}\ntype: FilesDaf\nroot: {}",
            self.name,
            self.root.display()
        )
    }

    fn format_version_counter(&self, key: &DataKey) -> u32 {
        self.counters.get(key)
    }
}

impl FormatWriter for FilesDaf {
    fn format_set_scalar(&self, name: &str, value: ScalarValue) -> Result<(), DafError> {
        let mut manifest = self.state.lock();
        let file = match manifest.scalars.get(name) {
            Some(meta) => meta.file.clone(),
            None => {
                let file = manifest.allocate_file("scalars");
                manifest
                    .scalars
                    .insert(name.to_string(), ScalarMeta { file: file.clone() });
                file
            }
        };
        self.write_artifact(&file, &value)?;
        self.save_manifest(&mut manifest)?;
        self.counters.bump(&DataKey::ScalarNames);
        Ok(())
    }

    fn format_delete_scalar(&self, name: &str, _for_set: bool) -> Result<(), DafError> {
        let mut manifest = self.state.lock();
        let meta = manifest
            .scalars
            .remove(name)
            .ok_or_else(|| DafError::missing_scalar(name, &self.name))?;
        self.remove_artifact(&meta.file)?;
        self.save_manifest(&mut manifest)?;
        self.counters.bump(&DataKey::ScalarNames);
        Ok(())
    }

    fn format_add_axis(&self, axis: &str, entries: Vec<String>) -> Result<(), DafError> {
        let mut manifest = self.state.lock();
        if manifest.axes.contains_key(axis) {
            return Err(DafError::existing_axis(axis, &self.name));
        }
        let file = manifest.allocate_file("axes");
        self.write_artifact(&file, &entries)?;
        manifest.axes.insert(
            axis.to_string(),
            AxisMeta {
                file,
                length: entries.len(),
            },
        );
        self.save_manifest(&mut manifest)?;
        self.counters.bump(&DataKey::AxisNames);
        self.counters.bump(&DataKey::AxisEntries(axis.to_string()));
        Ok(())
    }

    fn format_delete_axis(&self, axis: &str) -> Result<(), DafError> {
        let mut manifest = self.state.lock();
        let meta = manifest
            .axes
            .remove(axis)
            .ok_or_else(|| DafError::missing_axis(axis, &self.name))?;
        self.remove_artifact(&meta.file)?;

        if let Some(vectors) = manifest.vectors.remove(axis) {
            for (name, meta) in vectors {
                self.remove_artifact(&meta.file)?;
                self.bump_vector(axis, &name);
            }
        }

        let mut dropped: Vec<(String, String, String, MatrixMeta)> = Vec::new();
        for (rows, columns) in &manifest.matrices {
            for (cols, matrices) in columns {
                if rows != axis && cols != axis {
                    continue;
                }
                for (name, meta) in matrices {
                    dropped.push((rows.clone(), cols.clone(), name.clone(), meta.clone()));
                }
            }
        }
        for (rows, cols, name, meta) in dropped {
            self.remove_artifact(&meta.file)?;
            if let Some(columns) = manifest.matrices.get_mut(&rows) {
                if let Some(matrices) = columns.get_mut(&cols) {
                    matrices.remove(&name);
                }
            }
            self.bump_matrix(&rows, &cols, &name, meta.layout);
        }

        self.save_manifest(&mut manifest)?;
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
        let mut manifest = self.state.lock();
        self.manifest_axis_length(&manifest, axis)?;
        let sparse = match &vector {
            VectorData::Dense(_) => None,
            VectorData::Sparse(sparse) => Some(SparseMeta {
                index: sparse.index_kind(),
                nnz: sparse.nnz(),
            }),
        };
        let file = match manifest.vectors.get(axis).and_then(|v| v.get(name)) {
            Some(meta) => meta.file.clone(),
            None => manifest.allocate_file("vectors"),
        };
        self.write_artifact(&file, &vector)?;
        manifest.vectors.entry(axis.to_string()).or_default().insert(
            name.to_string(),
            VectorMeta {
                file,
                kind: vector.element_kind(),
                sparse,
            },
        );
        self.save_manifest(&mut manifest)?;
        drop(manifest);
        self.bump_vector(axis, name);
        Ok(())
    }

    fn format_delete_vector(&self, axis: &str, name: &str, _for_set: bool) -> Result<(), DafError> {
        let mut manifest = self.state.lock();
        let meta = manifest
            .vectors
            .get_mut(axis)
            .and_then(|vectors| vectors.remove(name))
            .ok_or_else(|| DafError::missing_vector(axis, name, &self.name))?;
        self.remove_artifact(&meta.file)?;
        self.save_manifest(&mut manifest)?;
        drop(manifest);
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
        let mut manifest = self.state.lock();
        self.manifest_axis_length(&manifest, rows)?;
        self.manifest_axis_length(&manifest, cols)?;
        let layout = matrix.major();
        let sparse = match &matrix {
            MatrixData::Dense(_) => None,
            MatrixData::Sparse(sparse) => Some(SparseMeta {
                index: sparse.index_kind(),
                nnz: sparse.nnz(),
            }),
        };
        let file = match manifest.matrix_meta(rows, cols, name) {
            Some(meta) => meta.file.clone(),
            None => manifest.allocate_file("matrices"),
        };
        self.write_artifact(&file, &matrix)?;
        manifest
            .matrices
            .entry(rows.to_string())
            .or_default()
            .entry(cols.to_string())
            .or_default()
            .insert(
                name.to_string(),
                MatrixMeta {
                    file,
                    kind: matrix.element_kind(),
                    layout,
                    sparse,
                },
            );
        self.save_manifest(&mut manifest)?;
        drop(manifest);
        self.bump_matrix(rows, cols, name, layout);
        Ok(())
    }

    fn format_delete_matrix(
        &self,
        rows: &str,
        cols: &str,
        name: &str,
        _for_set: bool,
    ) -> Result<(), DafError> {
        let mut manifest = self.state.lock();
        let meta = manifest
            .matrices
            .get_mut(rows)
            .and_then(|columns| columns.get_mut(cols))
            .and_then(|matrices| matrices.remove(name))
            .ok_or_else(|| DafError::missing_matrix(rows, cols, name, &self.name))?;
        self.remove_artifact(&meta.file)?;
        self.save_manifest(&mut manifest)?;
        drop(manifest);
        self.bump_matrix(rows, cols, name, meta.layout);
        Ok(())
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
    use tempfile::TempDir;

    #[test]
    fn test_create_open_round_trip() {
        let dir = TempDir::new().unwrap();
        {
            let daf = FilesDaf::create(dir.path(), "disk").unwrap();
            daf.format_set_scalar("version", ScalarValue::Str("v1".to_string()))
                .unwrap();
            daf.format_add_axis("cell", vec!["c0".to_string(), "c1".to_string()])
                .unwrap();
            daf.format_set_vector(
                "cell",
                "age",
                VectorData::Dense(ArrayData::I64(vec![3, 5])),
            )
            .unwrap();
        }

        let daf = FilesDaf::open(dir.path()).unwrap();
        assert_eq!(daf.name(), "disk");
        assert_eq!(
            daf.format_get_scalar("version").unwrap(),
            ScalarValue::Str("v1".to_string())
        );
        assert_eq!(
            *daf.format_axis_entries("cell").unwrap(),
            vec!["c0".to_string(), "c1".to_string()]
        );
        assert_eq!(
            *daf.format_get_vector("cell", "age").unwrap(),
            VectorData::Dense(ArrayData::I64(vec![3, 5]))
        );
    }

    #[test]
    fn test_counters_restart_on_open() {
        let dir = TempDir::new().unwrap();
        {
            let daf = FilesDaf::create(dir.path(), "disk").unwrap();
            daf.format_set_scalar("version", ScalarValue::I64(1)).unwrap();
            assert!(daf.format_version_counter(&DataKey::ScalarNames) > 1);
        }
        let daf = FilesDaf::open(dir.path()).unwrap();
        assert_eq!(daf.format_version_counter(&DataKey::ScalarNames), 1);
    }

    #[test]
    fn test_create_refuses_occupied_root() {
        let dir = TempDir::new().unwrap();
        let _first = FilesDaf::create(dir.path(), "disk").unwrap();
        assert!(FilesDaf::create(dir.path(), "again").is_err());
    }

    #[test]
    fn test_delete_axis_cascades_files() {
        let dir = TempDir::new().unwrap();
        let daf = FilesDaf::create(dir.path(), "disk").unwrap();
        daf.format_add_axis("cell", vec!["c0".to_string()]).unwrap();
        daf.format_add_axis("gene", vec!["g0".to_string(), "g1".to_string()])
            .unwrap();
        daf.format_set_vector("cell", "age", VectorData::Dense(ArrayData::I64(vec![7])))
            .unwrap();
        let matrix =
            DenseMatrix::new(1, 2, MajorAxis::Column, ArrayData::F32(vec![1.0, 2.0])).unwrap();
        daf.format_set_matrix("cell", "gene", "umis", MatrixData::Dense(matrix))
            .unwrap();

        daf.format_delete_axis("cell").unwrap();
        assert!(!daf.format_has_vector("cell", "age"));
        assert!(!daf.format_has_matrix("cell", "gene", "umis", true));

        let reopened = FilesDaf::open(dir.path()).unwrap();
        assert!(!reopened.format_has_axis("cell", false));
        assert!(reopened.format_has_axis("gene", false));
    }

    #[test]
    fn test_sparse_matrix_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let daf = FilesDaf::create(dir.path(), "disk").unwrap();
            daf.format_add_axis("cell", vec!["c0".to_string(), "c1".to_string(), "c2".to_string()])
                .unwrap();
            daf.format_add_axis("gene", vec!["g0".to_string(), "g1".to_string()])
                .unwrap();
            let sparse = SparseMatrix::new(
                3,
                2,
                MajorAxis::Column,
                IndexData::U32(vec![0, 1, 3]),
                IndexData::U32(vec![1, 0, 2]),
                ArrayData::F64(vec![5.0, 7.0, 9.0]),
            )
            .unwrap();
            daf.format_set_matrix("cell", "gene", "umis", MatrixData::Sparse(sparse))
                .unwrap();
        }

        let daf = FilesDaf::open(dir.path()).unwrap();
        let matrix = daf.format_get_matrix("cell", "gene", "umis").unwrap();
        assert!(matrix.is_sparse());
        assert_eq!(matrix.get(1, 0), ScalarValue::F64(5.0));
        assert_eq!(matrix.get(0, 1), ScalarValue::F64(7.0));
    }
}
