use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a project file; survives renames and is never reused.
/// 專案檔案的識別碼；重新命名後保持不變，且永不重複使用。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(u64);

impl FileId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Metadata for one file of the project; content lives on disk.
/// 專案中單一檔案的中繼資料；內容存放於磁碟。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileEntry {
    pub id: FileId,
    pub name: String,
}

/// Read-only row handed to the UI.
/// 提供給 UI 的唯讀列資料。
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EntryView {
    pub name: String,
    pub id: FileId,
    pub is_selected: bool,
}

/// Insertion-ordered set of project files with at most one selection.
///
/// Mutations never modify `self`; they return the next tree so callers can
/// stage a change and only commit it once storage agrees.
/// 依插入順序排列的專案檔案集合；變更會回傳新樹，以便確認儲存成功後再提交。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectTree {
    pub revision: u64,
    next_id: u64,
    #[serde(default)]
    selected: Option<FileId>,
    #[serde(default)]
    entries: Vec<FileEntry>,
}

impl Default for ProjectTree {
    fn default() -> Self {
        Self::empty()
    }
}

impl ProjectTree {
    pub fn empty() -> Self {
        Self {
            revision: 0,
            next_id: 1,
            selected: None,
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    pub fn get(&self, id: FileId) -> Option<&FileEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&FileEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    pub fn position(&self, id: FileId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == id)
    }

    pub fn selected(&self) -> Option<&FileEntry> {
        self.selected.and_then(|id| self.get(id))
    }

    pub fn is_selected(&self, id: FileId) -> bool {
        self.selected == Some(id)
    }

    pub fn views(&self) -> Vec<EntryView> {
        self.entries
            .iter()
            .map(|entry| EntryView {
                name: entry.name.clone(),
                id: entry.id,
                is_selected: self.is_selected(entry.id),
            })
            .collect()
    }

    /// Appends a new entry with a fresh identifier.
    /// 以新的識別碼附加檔案。
    pub fn insert(
        &self,
        name: impl Into<String>,
    ) -> Result<Self, ProjectTreeError> {
        let name = name.into();
        if self.find_by_name(&name).is_some() {
            return Err(ProjectTreeError::DuplicateName(name));
        }
        let id = FileId(self.next_id);
        let mut next = self.clone();
        next.next_id += 1;
        next.entries.push(FileEntry { id, name });
        Ok(next.bump())
    }

    /// Renames in place; identity and position are kept.
    /// 原地重新命名；識別碼與位置不變。
    pub fn rename(
        &self,
        id: FileId,
        name: impl Into<String>,
    ) -> Result<Self, ProjectTreeError> {
        let name = name.into();
        let index = self.position(id).ok_or(ProjectTreeError::UnknownId(id))?;
        if let Some(other) = self.find_by_name(&name) {
            if other.id != id {
                return Err(ProjectTreeError::DuplicateName(name));
            }
        }
        let mut next = self.clone();
        next.entries[index].name = name;
        Ok(next.bump())
    }

    /// Removes an entry, clearing the selection when it pointed at it.
    /// 移除檔案；若其為選取項目則一併清除選取。
    pub fn remove(&self, id: FileId) -> Result<Self, ProjectTreeError> {
        let index = self.position(id).ok_or(ProjectTreeError::UnknownId(id))?;
        let mut next = self.clone();
        next.entries.remove(index);
        if next.selected == Some(id) {
            next.selected = None;
        }
        Ok(next.bump())
    }

    /// Selects `id`, deselecting whatever was selected before.
    /// 選取指定檔案並取消先前的選取。
    pub fn select(&self, id: FileId) -> Result<Self, ProjectTreeError> {
        if self.get(id).is_none() {
            return Err(ProjectTreeError::UnknownId(id));
        }
        let mut next = self.clone();
        next.selected = Some(id);
        Ok(next.bump())
    }

    /// Entry that should take over the selection after `index` was removed.
    /// 移除指定位置後應接手選取的檔案。
    pub fn neighbour_of(&self, index: usize) -> Option<&FileEntry> {
        self.entries
            .get(index)
            .or_else(|| self.entries.last())
    }

    pub(crate) fn ensure_next_id_above_entries(&mut self) {
        let max = self.entries.iter().map(|entry| entry.id.0).max().unwrap_or(0);
        if self.next_id <= max {
            self.next_id = max + 1;
        }
    }

    pub(crate) fn retain(&mut self, mut keep: impl FnMut(&FileEntry) -> bool) {
        self.entries.retain(|entry| keep(entry));
        if let Some(id) = self.selected {
            if self.get(id).is_none() {
                self.selected = None;
            }
        }
    }

    fn bump(mut self) -> Self {
        self.revision = self.revision.wrapping_add(1);
        self
    }
}

/// Tree-manipulation errors.
/// 專案樹操作錯誤類型。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProjectTreeError {
    #[error("file {0} not found")]
    UnknownId(FileId),
    #[error("a file named `{0}` already exists")]
    DuplicateName(String),
}
