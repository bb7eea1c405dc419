use crate::compute::covering::{CellKey, CellScope};
use crate::compute::rtree::RangeIndex;
use crate::error::{GeocellError, Result};
use crate::index::bounds::BoundsStore;
use crate::index::cells::InvertedCellIndex;
use crate::index::snapshot::IndexSnapshot;
use geocell_types::bbox::BoundingBox;
use geocell_types::config::StrategyKind;
use geocell_types::feature::FeatureId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const SNAPSHOT_MAGIC: &[u8] = b"GEOCELL_SNAPSHOT";
pub const SNAPSHOT_VERSION: u8 = 1;

/// On-disk body of a snapshot, bincode-encoded after the magic and version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub kind: StrategyKind,
    pub resolution: u8,
    pub cells: BTreeMap<CellKey, Vec<FeatureId>>,
    pub bounds: BTreeMap<FeatureId, BoundingBox>,
    pub tree_entries: Option<Vec<(FeatureId, BoundingBox)>>,
    pub built_at: u64,
    pub feature_count: usize,
    pub skipped: usize,
}

impl From<&IndexSnapshot> for SnapshotRecord {
    fn from(snapshot: &IndexSnapshot) -> Self {
        Self {
            kind: snapshot.kind(),
            resolution: snapshot.resolution(),
            cells: snapshot.cells.as_map().clone(),
            bounds: snapshot.bounds.as_map().clone(),
            tree_entries: snapshot.tree.as_ref().map(|tree| tree.entries().collect()),
            built_at: snapshot.built_at,
            feature_count: snapshot.feature_count,
            skipped: snapshot.skipped,
        }
    }
}

impl TryFrom<SnapshotRecord> for IndexSnapshot {
    type Error = GeocellError;

    fn try_from(record: SnapshotRecord) -> Result<Self> {
        let scope = CellScope::new(record.kind, record.resolution);
        let snapshot = IndexSnapshot {
            cells: InvertedCellIndex::from_map(scope, record.cells),
            bounds: BoundsStore::from_map(record.bounds),
            tree: record.tree_entries.map(RangeIndex::from_entries),
            built_at: record.built_at,
            feature_count: record.feature_count,
            skipped: record.skipped,
        };
        snapshot.validate()?;
        Ok(snapshot)
    }
}

/// A snapshot file at a caller-supplied path.
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read and validate the whole snapshot.
    ///
    /// A missing file is an I/O error. Any content that is not a valid
    /// snapshot, including an empty file, is a format error.
    pub fn load(&self) -> Result<IndexSnapshot> {
        let bytes = fs::read(&self.path)?;
        if bytes.is_empty() {
            return Err(GeocellError::Format(format!(
                "{} is empty",
                self.path.display()
            )));
        }

        let Some(rest) = bytes.strip_prefix(SNAPSHOT_MAGIC) else {
            return Err(GeocellError::Format(format!(
                "{} is not a snapshot file",
                self.path.display()
            )));
        };
        let Some((&version, body)) = rest.split_first() else {
            return Err(GeocellError::Format("missing snapshot version".to_string()));
        };
        if version != SNAPSHOT_VERSION {
            return Err(GeocellError::Format(format!(
                "unsupported snapshot version {version}, expected {SNAPSHOT_VERSION}"
            )));
        }

        let record: SnapshotRecord = bincode::deserialize(body)
            .map_err(|e| GeocellError::Format(format!("cannot decode snapshot body: {e}")))?;
        let snapshot = IndexSnapshot::try_from(record)?;

        log::info!(
            "loaded {} snapshot from {}: {} features, {} cells",
            snapshot.scope(),
            self.path.display(),
            snapshot.bounds().len(),
            snapshot.cells().len()
        );
        Ok(snapshot)
    }

    pub fn save(&self, snapshot: &IndexSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.temp_path();
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;

        let mut writer = BufWriter::new(file);
        writer.write_all(SNAPSHOT_MAGIC)?;
        writer.write_all(&[SNAPSHOT_VERSION])?;
        bincode::serialize_into(&mut writer, &SnapshotRecord::from(snapshot))?;

        writer.flush()?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &self.path)?;
        self.sync_parent_dir()?;

        log::info!(
            "saved {} snapshot to {}",
            snapshot.scope(),
            self.path.display()
        );
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        if let Some(name) = temp.file_name() {
            let mut new_name = name.to_string_lossy().into_owned();
            new_name.push_str(".tmp");
            temp.set_file_name(new_name);
        }
        temp
    }

    fn sync_parent_dir(&self) -> Result<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        File::open(parent)?.sync_all()?;
        Ok(())
    }
}

pub fn save_snapshot<P: AsRef<Path>>(snapshot: &IndexSnapshot, path: P) -> Result<()> {
    SnapshotFile::new(path).save(snapshot)
}

pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<IndexSnapshot> {
    SnapshotFile::new(path).load()
}
