//! Active plan persistence with file locking.
//!
//! Only one week plan is active at a time. Replacing it is a single
//! read-modify-write under an exclusive lock, finished by an atomic rename,
//! so readers never see a half-written plan or two active plans.

use crate::orchestrator::GeneratedWeek;
use crate::{Error, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Replaced plan ids kept in the store; older ids are dropped
pub const MAX_REPLACED_IDS: usize = 20;

/// Storage for the user's active week plan
pub trait PlanStore {
    /// Deactivate the current plan and activate `plan` in one step.
    ///
    /// Returns the id of the plan that was replaced, if any.
    fn replace_active(&mut self, plan: &GeneratedWeek) -> Result<Option<Uuid>>;

    fn load_active(&self) -> Result<Option<GeneratedWeek>>;
}

/// On-disk layout of the plan file
#[derive(Debug, Default, Serialize, Deserialize)]
struct PlanFile {
    active: Option<GeneratedWeek>,
    /// Previously active plan ids, oldest first
    #[serde(default)]
    replaced: Vec<Uuid>,
}

/// JSON file store guarded by a sidecar lock file
pub struct JsonPlanStore {
    path: PathBuf,
}

impl JsonPlanStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<data_dir>/plans.json`
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join("plans.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ids of plans that were active before the current one, oldest first
    pub fn replaced_ids(&self) -> Result<Vec<Uuid>> {
        let lock = self.open_lock()?;
        lock.lock_shared()?;
        let file = self.read_file();
        lock.unlock()?;
        Ok(file.replaced)
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        self.path.with_file_name(name)
    }

    fn open_lock(&self) -> Result<File> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())?;
        Ok(file)
    }

    /// Read the plan file; a missing or corrupt file reads as empty
    fn read_file(&self) -> PlanFile {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No plan file at {:?}", self.path);
                return PlanFile::default();
            }
            Err(e) => {
                tracing::warn!("Unable to read plan file {:?}: {}. Starting empty.", self.path, e);
                return PlanFile::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!("Failed to parse plan file {:?}: {}. Starting empty.", self.path, e);
                PlanFile::default()
            }
        }
    }

    fn write_file(&self, file: &PlanFile) -> Result<()> {
        let parent = self.path.parent().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "plan path missing parent")
        })?;
        let temp = NamedTempFile::new_in(parent)?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            serde_json::to_writer_pretty(&mut writer, file)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;

        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

impl PlanStore for JsonPlanStore {
    fn replace_active(&mut self, plan: &GeneratedWeek) -> Result<Option<Uuid>> {
        let lock = self.open_lock()?;
        lock.lock_exclusive()?;

        let mut file = self.read_file();
        let previous = file.active.take().map(|p| p.plan_id);
        if let Some(id) = previous {
            file.replaced.push(id);
            let excess = file.replaced.len().saturating_sub(MAX_REPLACED_IDS);
            file.replaced.drain(..excess);
        }
        file.active = Some(plan.clone());

        let result = self.write_file(&file);
        lock.unlock()?;
        result?;

        match previous {
            Some(id) => tracing::info!("Activated plan {} (replaced {})", plan.plan_id, id),
            None => tracing::info!("Activated plan {}", plan.plan_id),
        }
        Ok(previous)
    }

    fn load_active(&self) -> Result<Option<GeneratedWeek>> {
        let lock = self.open_lock()?;
        lock.lock_shared()?;
        let file = self.read_file();
        lock.unlock()?;
        Ok(file.active)
    }
}
