use std::collections::HashSet;
use std::fs;
use std::io;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use codepad_core::write_atomic;
use thiserror::Error;

use crate::tree::ProjectTree;

/// Directory (inside the project) holding metadata files.
pub const METADATA_DIR: &str = ".codepad";
const MANIFEST_FILE: &str = "tree.json";

/// Persists `ProjectTree` metadata (ids, order, selection) using JSON + atomic writes.
/// 以 JSON 搭配原子寫入方式儲存專案樹的中繼資料（識別碼、順序、選取）。
#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: PathBuf,
}

impl ManifestStore {
    /// Constructs a store bound to the provided path.
    /// 建立綁定至指定路徑的儲存器。
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The conventional manifest location for a project directory.
    /// 專案資料夾中的預設清單位置。
    pub fn for_project(root: impl AsRef<Path>) -> Self {
        Self::new(root.as_ref().join(METADATA_DIR).join(MANIFEST_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the manifest, returning `Ok(None)` when the file is absent.
    /// 載入清單；若檔案不存在則回傳 `Ok(None)`。
    pub fn load(&self) -> Result<Option<ProjectTree>, ManifestError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let mut tree: ProjectTree = serde_json::from_str(&contents)
                    .map_err(|err| ManifestError::Invalid(err.to_string()))?;
                check_unique(&tree)?;
                tree.ensure_next_id_above_entries();
                Ok(Some(tree))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(ManifestError::Io(err)),
        }
    }

    /// Saves the tree metadata atomically.
    /// 將專案樹中繼資料以原子方式寫入磁碟。
    pub fn save(&self, tree: &ProjectTree) -> Result<(), ManifestError> {
        let payload = serde_json::to_vec_pretty(tree)
            .map_err(|err| ManifestError::Invalid(err.to_string()))?;
        write_atomic(&self.path, &payload).map_err(ManifestError::Io)
    }
}

fn check_unique(tree: &ProjectTree) -> Result<(), ManifestError> {
    let mut names = HashSet::new();
    let mut ids = HashSet::new();
    for entry in tree.entries() {
        if !names.insert(entry.name.as_str()) {
            return Err(ManifestError::Invalid(format!(
                "duplicate file name `{}`",
                entry.name
            )));
        }
        if !ids.insert(entry.id) {
            return Err(ManifestError::Invalid(format!("duplicate file id {}", entry.id)));
        }
    }
    Ok(())
}

/// Errors emitted by [`ManifestStore`].
/// [`ManifestStore`] 可能拋出的錯誤。
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("project manifest IO error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid project manifest: {0}")]
    Invalid(String),
}
