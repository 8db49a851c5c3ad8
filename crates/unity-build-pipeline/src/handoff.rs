//! Pending-state hand-off between a test run and the build it guards
//!
//! Control returns to the editor while tests run, so the build that should
//! follow is written to disk and picked up again once the test runner reports
//! back. There is one file per kind of request:
//!
//! ```text
//! {temp_dir}/unity-build-tooling/
//! ├── group.json   # PendingGroup: a whole build group
//! └── base.json    # PendingBuild: behavior + single invocation
//! ```
//!
//! A new submission overwrites the file of its kind; if its test run cannot
//! be started the previous file is put back. Taking a file deletes it, so
//! each pending request resumes at most once.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use unity_build_core::{BuildBehavior, BuildGroup, BuildInvocation, BuildToolError, BuildToolResult};
use uuid::Uuid;

/// Directory name below the system temp folder
pub const HANDOFF_DIR_NAME: &str = "unity-build-tooling";

const GROUP_FILENAME: &str = "group.json";
const BASE_FILENAME: &str = "base.json";

/// A build group waiting for its test run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingGroup {
    pub token: Uuid,
    pub submitted_at: DateTime<Utc>,
    pub group: BuildGroup,
}

/// A single build waiting for its test run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingBuild {
    pub token: Uuid,
    pub submitted_at: DateTime<Utc>,
    pub behavior: BuildBehavior,
    pub invocation: BuildInvocation,
}

/// Whatever was pending when the test run finished
#[derive(Debug, Clone, PartialEq)]
pub enum PendingRunState {
    Group(PendingGroup),
    Single(PendingBuild),
}

impl PendingRunState {
    pub fn token(&self) -> Uuid {
        match self {
            PendingRunState::Group(pending) => pending.token,
            PendingRunState::Single(pending) => pending.token,
        }
    }
}

/// Raw content of one pending file, taken before it is replaced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingBackup {
    path: PathBuf,
    /// `None` when the file did not exist
    content: Option<Vec<u8>>,
}

/// Reads and writes the pending-state files
#[derive(Debug, Clone)]
pub struct HandoffStore {
    base_path: PathBuf,
}

impl HandoffStore {
    pub fn new<P: Into<PathBuf>>(base_path: P) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn group_path(&self) -> PathBuf {
        self.base_path.join(GROUP_FILENAME)
    }

    pub fn base_file_path(&self) -> PathBuf {
        self.base_path.join(BASE_FILENAME)
    }

    /// Persist a group, replacing any group already pending
    pub fn store_group(&self, group: &BuildGroup) -> BuildToolResult<PendingGroup> {
        let pending = PendingGroup {
            token: Uuid::new_v4(),
            submitted_at: Utc::now(),
            group: group.clone(),
        };
        self.write_atomic(&self.group_path(), &pending)?;
        log::debug!("Stored pending group '{}' ({})", group.name, pending.token);
        Ok(pending)
    }

    /// Persist a single build, replacing any single build already pending
    pub fn store_single(&self, behavior: BuildBehavior, invocation: BuildInvocation) -> BuildToolResult<PendingBuild> {
        let pending = PendingBuild {
            token: Uuid::new_v4(),
            submitted_at: Utc::now(),
            behavior,
            invocation,
        };
        self.write_atomic(&self.base_file_path(), &pending)?;
        log::debug!("Stored pending {} build for {} ({})", behavior, invocation.target, pending.token);
        Ok(pending)
    }

    /// Read and delete the pending group, if any
    pub fn take_group(&self) -> BuildToolResult<Option<PendingGroup>> {
        self.take(&self.group_path())
    }

    /// Read and delete the pending single build, if any
    pub fn take_single(&self) -> BuildToolResult<Option<PendingBuild>> {
        self.take(&self.base_file_path())
    }

    /// Take whatever is pending; a group wins over a single build
    ///
    /// Only the file that is consumed gets deleted.
    pub fn take_pending(&self) -> BuildToolResult<Option<PendingRunState>> {
        if let Some(group) = self.take_group()? {
            return Ok(Some(PendingRunState::Group(group)));
        }
        Ok(self.take_single()?.map(PendingRunState::Single))
    }

    /// Read pending state without consuming it
    pub fn peek(&self) -> BuildToolResult<(Option<PendingGroup>, Option<PendingBuild>)> {
        Ok((self.read(&self.group_path())?, self.read(&self.base_file_path())?))
    }

    /// Keep the current group file so a replacement can be undone
    pub fn backup_group(&self) -> BuildToolResult<PendingBackup> {
        Self::backup(self.group_path())
    }

    /// Keep the current single-build file so a replacement can be undone
    pub fn backup_single(&self) -> BuildToolResult<PendingBackup> {
        Self::backup(self.base_file_path())
    }

    /// Put a pending file back the way it was when the backup was taken
    pub fn restore(&self, backup: PendingBackup) -> BuildToolResult<()> {
        match backup.content {
            Some(content) => self.write_bytes_atomic(&backup.path, &content),
            None => match fs::remove_file(&backup.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(BuildToolError::handoff(format!("Failed to remove: {}", e), backup.path)),
            },
        }
    }

    pub fn has_pending(&self) -> bool {
        self.group_path().exists() || self.base_file_path().exists()
    }

    /// Remove both pending files; returns how many were removed
    pub fn discard(&self) -> BuildToolResult<usize> {
        let mut removed = 0;
        for path in [self.group_path(), self.base_file_path()] {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(BuildToolError::handoff(format!("Failed to remove: {}", e), path)),
            }
        }
        Ok(removed)
    }

    fn ensure_dir(&self) -> BuildToolResult<()> {
        fs::create_dir_all(&self.base_path)
            .map_err(|e| BuildToolError::handoff(format!("Failed to create directory: {}", e), &self.base_path))
    }

    fn backup(path: PathBuf) -> BuildToolResult<PendingBackup> {
        let content = match fs::read(&path) {
            Ok(content) => Some(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(BuildToolError::handoff(format!("Failed to read: {}", e), path)),
        };
        Ok(PendingBackup { path, content })
    }

    fn write_atomic<T: Serialize>(&self, path: &Path, value: &T) -> BuildToolResult<()> {
        let content = serde_json::to_string_pretty(value)?;
        self.write_bytes_atomic(path, content.as_bytes())
    }

    /// Write to a temp file, then rename over the target
    fn write_bytes_atomic(&self, path: &Path, content: &[u8]) -> BuildToolResult<()> {
        self.ensure_dir()?;

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, content)
            .map_err(|e| BuildToolError::handoff(format!("Failed to write: {}", e), &temp_path))?;
        fs::rename(&temp_path, path).map_err(|e| BuildToolError::handoff(format!("Failed to replace: {}", e), path))?;

        Ok(())
    }

    fn read<T: DeserializeOwned>(&self, path: &Path) -> BuildToolResult<Option<T>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(BuildToolError::handoff(format!("Failed to read: {}", e), path)),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| BuildToolError::handoff(format!("Corrupt pending state: {}", e), path))
    }

    /// Read a file and delete it, even when its content is unusable
    fn take<T: DeserializeOwned>(&self, path: &Path) -> BuildToolResult<Option<T>> {
        let result = self.read(path);

        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to delete pending state {:?}: {}", path, e),
        }

        result
    }
}
