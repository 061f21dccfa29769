//! Component descriptor lookup.

use std::io::ErrorKind;
use std::path::PathBuf;

use crate::core::{AppWorkspace, EntryRef, Origin, UsageDescriptor};
use crate::resolver::errors::DescriptorError;

/// Source of per-entry `usingComponents` declarations.
///
/// Implementations are called from the rayon pool, so they must be `Sync`.
pub trait UsageReader: Sync {
    /// Read the descriptor of `entry`. A missing descriptor is `Ok(None)`.
    fn read_usages(&self, entry: &EntryRef) -> Result<Option<UsageDescriptor>, DescriptorError>;
}

/// Reads `<entry>.json` next to each entry's script.
#[derive(Debug, Clone)]
pub struct FsUsageReader {
    app_root: PathBuf,
    project_root: PathBuf,
}

impl FsUsageReader {
    pub fn new(workspace: &AppWorkspace) -> Self {
        FsUsageReader {
            app_root: workspace.app_root().to_path_buf(),
            project_root: workspace.project_root().to_path_buf(),
        }
    }

    /// Path of an entry's descriptor. The root app's descriptor is app.json.
    pub fn descriptor_path(&self, entry: &EntryRef) -> PathBuf {
        let base = match entry.origin {
            Origin::App => &self.app_root,
            Origin::Package => &self.project_root,
        };
        base.join(format!("{}.json", entry.id))
    }
}

impl UsageReader for FsUsageReader {
    fn read_usages(&self, entry: &EntryRef) -> Result<Option<UsageDescriptor>, DescriptorError> {
        let path = self.descriptor_path(entry);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(DescriptorError::Io { path, source }),
        };

        UsageDescriptor::parse(&contents)
            .map(Some)
            .map_err(|e| DescriptorError::Malformed {
                path,
                message: e.to_string(),
            })
    }
}
