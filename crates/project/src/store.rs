use std::collections::HashSet;
use std::fmt;

use codepad_core::{DiskIo, StorageError, StorageErrorKind};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::guard;
use crate::manifest::ManifestStore;
use crate::naming::{self, NameError, NamePolicy};
use crate::tree::{EntryView, FileEntry, ProjectTree, ProjectTreeError};

/// One instruction for the editor buffer after a committed mutation.
/// 變更提交後給編輯緩衝區的單一指令。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// Keep the content, retarget future saves.
    Rebind { name: String },
    /// Show `content` and bind to `name`.
    Replace { name: String, content: Vec<u8> },
}

/// Reconciliation instructions produced by a store operation.
/// 由儲存操作產生的同步指令集合。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    actions: Vec<SyncAction>,
}

impl SyncPlan {
    pub fn rebind(name: impl Into<String>) -> Self {
        Self {
            actions: vec![SyncAction::Rebind { name: name.into() }],
        }
    }

    pub fn replace(name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            actions: vec![SyncAction::Replace {
                name: name.into(),
                content,
            }],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn actions(&self) -> &[SyncAction] {
        &self.actions
    }
}

impl IntoIterator for SyncPlan {
    type Item = SyncAction;
    type IntoIter = std::vec::IntoIter<SyncAction>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.into_iter()
    }
}

/// Value returned by a store operation together with its reconciliation plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied<T> {
    pub value: T,
    pub plan: SyncPlan,
}

impl<T> Applied<T> {
    fn new(value: T, plan: SyncPlan) -> Self {
        Self { value, plan }
    }

    fn unchanged(value: T) -> Self {
        Self::new(value, SyncPlan::default())
    }
}

/// Outcome of a delete: the removed entry and, if the project became empty, the
/// default entry synthesised in its place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub removed: FileEntry,
    pub healed: Option<FileEntry>,
}

/// 檔案樹操作錯誤。 / Errors reported by [`FileTreeStore`]; the tree is unchanged after any of them.
#[derive(Debug, Error)]
pub enum FileTreeError {
    #[error("file `{0}` not found")]
    NotFound(String),
    #[error("a file named `{0}` already exists")]
    NameCollision(String),
    #[error("invalid file name: {0}")]
    InvalidName(#[from] NameError),
    #[error("storage failure: {0}")]
    StorageFailure(#[from] StorageError),
}

/// Flat classification of [`FileTreeError`] for the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileTreeErrorKind {
    NotFound,
    NameCollision,
    InvalidName,
    StorageFailure,
}

impl fmt::Display for FileTreeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FileTreeErrorKind::NotFound => "not_found",
            FileTreeErrorKind::NameCollision => "name_collision",
            FileTreeErrorKind::InvalidName => "invalid_name",
            FileTreeErrorKind::StorageFailure => "storage_failure",
        };
        f.write_str(label)
    }
}

impl FileTreeError {
    pub fn kind(&self) -> FileTreeErrorKind {
        match self {
            FileTreeError::NotFound(_) => FileTreeErrorKind::NotFound,
            FileTreeError::NameCollision(_) => FileTreeErrorKind::NameCollision,
            FileTreeError::InvalidName(_) => FileTreeErrorKind::InvalidName,
            FileTreeError::StorageFailure(_) => FileTreeErrorKind::StorageFailure,
        }
    }

    pub fn storage_kind(&self) -> Option<StorageErrorKind> {
        match self {
            FileTreeError::StorageFailure(err) => Some(err.kind),
            _ => None,
        }
    }
}

impl From<ProjectTreeError> for FileTreeError {
    fn from(err: ProjectTreeError) -> Self {
        match err {
            ProjectTreeError::UnknownId(id) => FileTreeError::NotFound(id.to_string()),
            ProjectTreeError::DuplicateName(name) => FileTreeError::NameCollision(name),
        }
    }
}

fn storage_failed(event: &'static str, err: StorageError) -> FileTreeError {
    warn!(
        event = event,
        op = %err.op,
        name = %err.name,
        kind = %err.kind,
        error = %err.source,
    );
    FileTreeError::StorageFailure(err)
}

/// Authoritative model of the files of one project.
///
/// Every operation stages its change on a copy of the tree, runs the disk I/O, and
/// commits the copy only when storage succeeded, so a failed operation leaves both
/// the tree and the disk as they were.
/// 專案檔案的權威模型；所有操作先在副本上暫存，磁碟成功後才提交。
#[derive(Debug)]
pub struct FileTreeStore<D> {
    disk: D,
    policy: NamePolicy,
    manifest: Option<ManifestStore>,
    tree: ProjectTree,
}

impl<D: DiskIo> FileTreeStore<D> {
    /// Creates a store with an empty tree; call [`FileTreeStore::load`] to read the disk.
    pub fn new(disk: D, policy: NamePolicy, manifest: Option<ManifestStore>) -> Self {
        Self {
            disk,
            policy,
            manifest,
            tree: ProjectTree::empty(),
        }
    }

    pub fn tree(&self) -> &ProjectTree {
        &self.tree
    }

    pub fn policy(&self) -> &NamePolicy {
        &self.policy
    }

    pub fn entries(&self) -> Vec<EntryView> {
        self.tree.views()
    }

    pub fn selected(&self) -> Option<&FileEntry> {
        self.tree.selected()
    }

    /// Looks an entry up by its (trimmed) name.
    pub fn find(&self, name: &str) -> Option<&FileEntry> {
        self.tree.find_by_name(naming::normalize(name))
    }

    pub fn disk(&self) -> &D {
        &self.disk
    }

    pub fn disk_mut(&mut self) -> &mut D {
        &mut self.disk
    }

    pub fn into_disk(self) -> D {
        self.disk
    }

    /// Rebuilds the tree from storage.
    ///
    /// Entries recorded in the manifest (or, without one, in the current tree) keep
    /// their ids and order; files found only on disk are appended by name. Files whose
    /// names the policy would not accept as-is are left out. An empty project gets its
    /// default file, and a selection is always established.
    /// 從磁碟重建專案樹，保留既有識別碼與順序並確保有選取項目。
    pub fn load(&mut self) -> Result<Applied<()>, FileTreeError> {
        let listed = self
            .disk
            .list_files()
            .map_err(|err| storage_failed("project.load.failed", err))?;
        let names: Vec<String> = listed
            .into_iter()
            .filter(|name| match self.policy.validate(name) {
                Ok(valid) if valid == *name => true,
                _ => {
                    warn!(
                        event = "project.load.skipped",
                        name = %name,
                        reason = "not a usable project file name",
                    );
                    false
                }
            })
            .collect();
        let recorded = match &self.manifest {
            Some(manifest) => match manifest.load() {
                Ok(tree) => tree,
                Err(err) => {
                    warn!(
                        event = "project.manifest.load_failed",
                        path = %manifest.path().display(),
                        error = %err,
                    );
                    None
                }
            },
            None => None,
        };
        let mut staged = recorded.unwrap_or_else(|| self.tree.clone());

        let on_disk: HashSet<&str> = names.iter().map(String::as_str).collect();
        staged.retain(|entry| on_disk.contains(entry.name.as_str()));
        for name in &names {
            if staged.find_by_name(name).is_none() {
                staged = staged.insert(name.clone())?;
            }
        }

        if let Some(healed) = guard::heal(&staged, &self.policy)? {
            self.disk
                .create_empty_file(&healed.entry.name)
                .map_err(|err| storage_failed("project.load.failed", err))?;
            info!(
                event = "project.guard.healed",
                name = %healed.entry.name,
                id = %healed.entry.id,
            );
            staged = healed.tree;
        }

        let selected = match staged.selected() {
            Some(entry) => entry.clone(),
            None => {
                // Non-empty after healing.
                let Some(first) = staged.entries().first().cloned() else {
                    return Err(FileTreeError::NotFound(self.policy.default_name()));
                };
                staged = staged.select(first.id)?;
                first
            }
        };
        let content = self
            .disk
            .read_file(&selected.name)
            .map_err(|err| storage_failed("project.load.failed", err))?;

        self.commit(staged);
        info!(
            event = "project.loaded",
            files = self.tree.len(),
            selected = %selected.name,
        );
        Ok(Applied::new((), SyncPlan::replace(selected.name, content)))
    }

    /// Creates an empty file. A blank or absent name gets the next untitled name.
    /// The selection is left alone.
    /// 建立空白檔案；未提供名稱時使用下一個未命名檔名，不改變選取。
    pub fn create_file(&mut self, proposed: Option<&str>) -> Result<FileEntry, FileTreeError> {
        let name = match proposed.map(naming::normalize).filter(|name| !name.is_empty()) {
            Some(name) => self.policy.validate(name)?,
            None => self.policy.next_untitled_name(self.tree.names()),
        };
        if self.policy.is_collision(&name, self.tree.names()) {
            warn!(event = "project.create.cancelled", name = %name, reason = "name collision");
            return Err(FileTreeError::NameCollision(name));
        }

        let staged = self.tree.insert(name.clone())?;
        let entry = staged
            .find_by_name(&name)
            .cloned()
            .ok_or_else(|| FileTreeError::NotFound(name.clone()))?;
        self.disk
            .create_empty_file(&name)
            .map_err(|err| storage_failed("project.create.failed", err))?;

        self.commit(staged);
        info!(event = "project.file.created", name = %entry.name, id = %entry.id);
        Ok(entry)
    }

    /// Renames `from` to `to`, keeping the entry's id and position.
    ///
    /// A `to` already used by a different entry cancels the operation: neither
    /// entry changes and [`FileTreeError::NameCollision`] is returned.
    /// 重新命名檔案；若目標名稱已被其他檔案使用則取消操作。
    pub fn rename_file(&mut self, from: &str, to: &str) -> Result<Applied<FileEntry>, FileTreeError> {
        let entry = self.lookup(from)?.clone();
        let to = self.policy.validate(to)?;
        if to == entry.name {
            return Ok(Applied::unchanged(entry));
        }
        if self.policy.is_collision(&to, self.tree.names()) {
            warn!(
                event = "project.rename.cancelled",
                from = %entry.name,
                to = %to,
                reason = "name collision",
            );
            return Err(FileTreeError::NameCollision(to));
        }

        let staged = self.tree.rename(entry.id, to.clone())?;
        self.disk
            .move_file(&entry.name, &to)
            .map_err(|err| storage_failed("project.rename.failed", err))?;

        let plan = if staged.is_selected(entry.id) {
            SyncPlan::rebind(to.clone())
        } else {
            SyncPlan::default()
        };
        self.commit(staged);
        info!(event = "project.file.renamed", from = %entry.name, to = %to, id = %entry.id);
        Ok(Applied::new(FileEntry { id: entry.id, name: to }, plan))
    }

    /// Deletes a file. Deleting the selected file selects its neighbour; deleting
    /// the last file replaces it with an empty default file.
    /// 刪除檔案；刪除選取檔案時改選相鄰檔案，刪除最後一個檔案時以空白預設檔取代。
    pub fn delete_file(&mut self, name: &str) -> Result<Applied<DeleteOutcome>, FileTreeError> {
        let entry = self.lookup(name)?.clone();
        let index = self
            .tree
            .position(entry.id)
            .ok_or_else(|| FileTreeError::NotFound(entry.name.clone()))?;
        let was_selected = self.tree.is_selected(entry.id);
        let staged = self.tree.remove(entry.id)?;

        if let Some(healed) = guard::heal(&staged, &self.policy)? {
            self.replace_last_file(&entry.name, &healed.entry.name)?;
            let plan = SyncPlan::replace(healed.entry.name.clone(), Vec::new());
            self.commit(healed.tree);
            info!(event = "project.file.deleted", name = %entry.name, id = %entry.id);
            info!(
                event = "project.guard.healed",
                name = %healed.entry.name,
                id = %healed.entry.id,
            );
            return Ok(Applied::new(
                DeleteOutcome {
                    removed: entry,
                    healed: Some(healed.entry),
                },
                plan,
            ));
        }

        let neighbour = staged
            .neighbour_of(index)
            .cloned()
            .filter(|_| was_selected);
        let (staged, plan) = match neighbour {
            Some(neighbour) => {
                let content = self
                    .disk
                    .read_file(&neighbour.name)
                    .map_err(|err| storage_failed("project.delete.failed", err))?;
                let staged = staged.select(neighbour.id)?;
                (staged, SyncPlan::replace(neighbour.name, content))
            }
            None => (staged, SyncPlan::default()),
        };
        self.disk
            .delete_file(&entry.name)
            .map_err(|err| storage_failed("project.delete.failed", err))?;

        self.commit(staged);
        info!(event = "project.file.deleted", name = %entry.name, id = %entry.id);
        Ok(Applied::new(
            DeleteOutcome {
                removed: entry,
                healed: None,
            },
            plan,
        ))
    }

    /// Selects a file and returns its persisted content for the editor.
    /// 選取檔案並回傳其已保存的內容供編輯器顯示。
    pub fn select_file(&mut self, name: &str) -> Result<Applied<FileEntry>, FileTreeError> {
        let entry = self.lookup(name)?.clone();
        if self.tree.is_selected(entry.id) {
            return Ok(Applied::unchanged(entry));
        }
        let content = self
            .disk
            .read_file(&entry.name)
            .map_err(|err| storage_failed("project.select.failed", err))?;
        let staged = self.tree.select(entry.id)?;

        self.commit(staged);
        info!(event = "project.file.selected", name = %entry.name, id = %entry.id);
        let plan = SyncPlan::replace(entry.name.clone(), content);
        Ok(Applied::new(entry, plan))
    }

    pub fn read_file(&self, name: &str) -> Result<Vec<u8>, FileTreeError> {
        let entry = self.lookup(name)?;
        self.disk
            .read_file(&entry.name)
            .map_err(|err| storage_failed("project.read.failed", err))
    }

    pub fn write_file(&mut self, name: &str, bytes: &[u8]) -> Result<(), FileTreeError> {
        let name = self.lookup(name)?.name.clone();
        self.disk
            .write_file(&name, bytes)
            .map_err(|err| storage_failed("project.write.failed", err))?;
        info!(event = "project.file.saved", name = %name, bytes = bytes.len());
        Ok(())
    }

    fn lookup(&self, name: &str) -> Result<&FileEntry, FileTreeError> {
        let normalized = naming::normalize(name);
        self.tree
            .find_by_name(normalized)
            .ok_or_else(|| FileTreeError::NotFound(normalized.to_string()))
    }

    /// Swaps the last remaining file for the empty default file on disk.
    fn replace_last_file(&mut self, deleted: &str, default: &str) -> Result<(), FileTreeError> {
        if deleted == default {
            return self
                .disk
                .write_file(default, &[])
                .map_err(|err| storage_failed("project.delete.failed", err));
        }
        self.disk
            .create_empty_file(default)
            .map_err(|err| storage_failed("project.delete.failed", err))?;
        if let Err(err) = self.disk.delete_file(deleted) {
            if let Err(undo) = self.disk.delete_file(default) {
                error!(
                    event = "project.guard.compensation_failed",
                    name = %default,
                    error = %undo,
                );
            }
            return Err(storage_failed("project.delete.failed", err));
        }
        Ok(())
    }

    fn commit(&mut self, tree: ProjectTree) {
        self.tree = tree;
        if let Some(manifest) = &self.manifest {
            if let Err(err) = manifest.save(&self.tree) {
                warn!(
                    event = "project.manifest.save_failed",
                    path = %manifest.path().display(),
                    error = %err,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codepad_core::{MemoryDisk, StorageOp};

    fn store_with(files: &[(&str, &str)]) -> FileTreeStore<MemoryDisk> {
        let disk = MemoryDisk::with_files(files.iter().copied());
        let mut store = FileTreeStore::new(disk, NamePolicy::default(), None);
        store.load().unwrap();
        store
    }

    fn names(store: &FileTreeStore<MemoryDisk>) -> Vec<String> {
        store.tree().names().map(str::to_string).collect()
    }

    #[test]
    fn load_heals_empty_disk() {
        let mut store = FileTreeStore::new(MemoryDisk::new(), NamePolicy::default(), None);
        let applied = store.load().unwrap();
        assert_eq!(names(&store), vec!["main.kcl"]);
        assert_eq!(store.selected().unwrap().name, "main.kcl");
        assert_eq!(applied.plan, SyncPlan::replace("main.kcl", Vec::new()));
        assert!(store.disk().contains("main.kcl"));
    }

    #[test]
    fn load_selects_first_file_and_returns_content() {
        let store_files = [("b.kcl", "b"), ("a.kcl", "a")];
        let mut store = FileTreeStore::new(
            MemoryDisk::with_files(store_files),
            NamePolicy::default(),
            None,
        );
        let applied = store.load().unwrap();
        assert_eq!(names(&store), vec!["a.kcl", "b.kcl"]);
        assert_eq!(applied.plan, SyncPlan::replace("a.kcl", b"a".to_vec()));
    }

    #[test]
    fn load_skips_names_the_policy_rejects() {
        let files = [(" a.kcl", "x"), ("b.kcl", "y"), ("bad\\name.kcl", "z")];
        let mut store =
            FileTreeStore::new(MemoryDisk::with_files(files), NamePolicy::default(), None);
        let applied = store.load().unwrap();
        assert_eq!(names(&store), vec!["b.kcl"]);
        assert_eq!(applied.plan, SyncPlan::replace("b.kcl", b"y".to_vec()));

        let created = store.create_file(Some("a.kcl")).unwrap();
        assert_eq!(created.name, "a.kcl");
        store.rename_file("b.kcl", "c.kcl").unwrap();
        store.write_file("c.kcl", b"saved").unwrap();
        assert_eq!(store.read_file("c.kcl").unwrap(), b"saved");
        // the skipped file is left untouched on disk
        assert_eq!(store.disk().read_file(" a.kcl").unwrap(), b"x");
    }

    #[test]
    fn reload_keeps_ids_and_selection() {
        let mut store = store_with(&[("main.kcl", "cube")]);
        let created = store.create_file(Some("gear.kcl")).unwrap();
        store.select_file("gear.kcl").unwrap();
        store.load().unwrap();
        assert_eq!(store.tree().find_by_name("gear.kcl").unwrap().id, created.id);
        assert_eq!(store.selected().unwrap().name, "gear.kcl");
    }

    #[test]
    fn create_untitled_files_get_distinct_names() {
        let mut store = store_with(&[("main.kcl", "")]);
        for _ in 0..5 {
            store.create_file(None).unwrap();
        }
        let untitled: Vec<_> = names(&store)
            .into_iter()
            .filter(|name| name.starts_with("Untitled"))
            .collect();
        assert_eq!(untitled.len(), 5);
        let unique: HashSet<_> = untitled.iter().collect();
        assert_eq!(unique.len(), 5);
        assert_eq!(store.disk().len(), 6);
        assert_eq!(store.selected().unwrap().name, "main.kcl");
    }

    #[test]
    fn create_with_taken_name_is_rejected() {
        let mut store = store_with(&[("main.kcl", "cube")]);
        let err = store.create_file(Some(" main.kcl")).unwrap_err();
        assert_eq!(err.kind(), FileTreeErrorKind::NameCollision);
        assert_eq!(store.tree().len(), 1);
        assert_eq!(store.disk().read_file("main.kcl").unwrap(), b"cube");
    }

    #[test]
    fn create_with_invalid_name_is_rejected() {
        let mut store = store_with(&[("main.kcl", "")]);
        let err = store.create_file(Some("../escape.kcl")).unwrap_err();
        assert_eq!(err.kind(), FileTreeErrorKind::InvalidName);
    }

    #[test]
    fn create_storage_failure_leaves_tree_unchanged() {
        let mut store = store_with(&[("main.kcl", "")]);
        let before = store.tree().clone();
        store.disk_mut().fail_on(StorageOp::CreateEmpty);
        let err = store.create_file(None).unwrap_err();
        assert_eq!(err.storage_kind(), Some(StorageErrorKind::PermissionDenied));
        assert_eq!(store.tree(), &before);
    }

    #[test]
    fn rename_onto_existing_name_is_cancelled() {
        let mut store = store_with(&[("main.kcl", "cube"), ("2.kcl", "cylinder")]);
        let before = store.tree().clone();
        let err = store.rename_file("2.kcl", "main.kcl").unwrap_err();
        assert!(matches!(err, FileTreeError::NameCollision(ref name) if name == "main.kcl"));
        assert_eq!(store.tree(), &before);
        assert_eq!(store.read_file("main.kcl").unwrap(), b"cube");
        assert_eq!(store.read_file("2.kcl").unwrap(), b"cylinder");
    }

    #[test]
    fn rename_selected_file_rebinds() {
        let mut store = store_with(&[("main.kcl", "cube")]);
        let id = store.selected().unwrap().id;
        let applied = store.rename_file("main.kcl", "hello.kcl").unwrap();
        assert_eq!(applied.value.id, id);
        assert_eq!(applied.plan, SyncPlan::rebind("hello.kcl"));
        assert_eq!(store.read_file("hello.kcl").unwrap(), b"cube");
        assert!(!store.disk().contains("main.kcl"));
        assert_eq!(store.selected().unwrap().name, "hello.kcl");
    }

    #[test]
    fn rename_unselected_file_has_no_plan() {
        let mut store = store_with(&[("a.kcl", "a"), ("b.kcl", "b")]);
        let applied = store.rename_file("b.kcl", "c.kcl").unwrap();
        assert!(applied.plan.is_empty());
        assert_eq!(names(&store), vec!["a.kcl", "c.kcl"]);
    }

    #[test]
    fn rename_to_same_name_is_a_no_op() {
        let mut store = store_with(&[("main.kcl", "cube")]);
        let revision = store.tree().revision;
        let applied = store.rename_file("main.kcl", "main.kcl ").unwrap();
        assert!(applied.plan.is_empty());
        assert_eq!(store.tree().revision, revision);
    }

    #[test]
    fn rename_missing_file_is_not_found() {
        let mut store = store_with(&[("main.kcl", "")]);
        let err = store.rename_file("ghost.kcl", "x.kcl").unwrap_err();
        assert_eq!(err.kind(), FileTreeErrorKind::NotFound);
    }

    #[test]
    fn rename_storage_failure_leaves_tree_unchanged() {
        let mut store = store_with(&[("main.kcl", "cube")]);
        let before = store.tree().clone();
        store.disk_mut().fail_on(StorageOp::Move);
        let err = store.rename_file("main.kcl", "hello.kcl").unwrap_err();
        assert_eq!(err.kind(), FileTreeErrorKind::StorageFailure);
        assert_eq!(store.tree(), &before);
        assert!(store.disk().contains("main.kcl"));
    }

    #[test]
    fn deleting_last_file_recreates_empty_default() {
        let mut store = store_with(&[("gear.kcl", "gear")]);
        let applied = store.delete_file("gear.kcl").unwrap();
        let healed = applied.value.healed.expect("default file");
        assert_eq!(healed.name, "main.kcl");
        assert_eq!(applied.plan, SyncPlan::replace("main.kcl", Vec::new()));
        assert_eq!(names(&store), vec!["main.kcl"]);
        assert_eq!(store.selected().unwrap().id, healed.id);
        assert_eq!(store.disk().len(), 1);
        assert!(store.read_file("main.kcl").unwrap().is_empty());
    }

    #[test]
    fn deleting_only_default_file_truncates_it_with_new_identity() {
        let mut store = store_with(&[("main.kcl", "cube")]);
        let old = store.selected().unwrap().id;
        let applied = store.delete_file("main.kcl").unwrap();
        let healed = applied.value.healed.unwrap();
        assert_ne!(healed.id, old);
        assert!(store.read_file("main.kcl").unwrap().is_empty());
    }

    #[test]
    fn failed_last_delete_is_compensated() {
        let mut store = store_with(&[("gear.kcl", "gear")]);
        let before = store.tree().clone();
        store.disk_mut().fail_on(StorageOp::Delete);
        let err = store.delete_file("gear.kcl").unwrap_err();
        assert_eq!(err.kind(), FileTreeErrorKind::StorageFailure);
        assert_eq!(store.tree(), &before);
        assert!(store.disk().contains("gear.kcl"));
        // the compensating delete was refused as well
        assert!(store.disk().contains("main.kcl"));
    }

    #[test]
    fn deleting_selected_file_selects_neighbour() {
        let mut store = store_with(&[("a.kcl", "a"), ("b.kcl", "b"), ("c.kcl", "c")]);
        store.select_file("b.kcl").unwrap();
        let applied = store.delete_file("b.kcl").unwrap();
        assert_eq!(applied.plan, SyncPlan::replace("c.kcl", b"c".to_vec()));
        assert_eq!(store.selected().unwrap().name, "c.kcl");
        assert!(applied.value.healed.is_none());
    }

    #[test]
    fn deleting_unselected_file_keeps_selection() {
        let mut store = store_with(&[("a.kcl", "a"), ("b.kcl", "b")]);
        let applied = store.delete_file("b.kcl").unwrap();
        assert!(applied.plan.is_empty());
        assert_eq!(store.selected().unwrap().name, "a.kcl");
        assert!(!store.disk().contains("b.kcl"));
    }

    #[test]
    fn delete_missing_file_is_not_found() {
        let mut store = store_with(&[("main.kcl", "")]);
        assert_eq!(
            store.delete_file("ghost.kcl").unwrap_err().kind(),
            FileTreeErrorKind::NotFound
        );
    }

    #[test]
    fn select_returns_persisted_content() {
        let mut store = store_with(&[("a.kcl", "a"), ("b.kcl", "b")]);
        let applied = store.select_file("b.kcl").unwrap();
        assert_eq!(applied.plan, SyncPlan::replace("b.kcl", b"b".to_vec()));
        let again = store.select_file("b.kcl").unwrap();
        assert!(again.plan.is_empty());
    }

    #[test]
    fn select_read_failure_keeps_previous_selection() {
        let mut store = store_with(&[("a.kcl", "a"), ("b.kcl", "b")]);
        store.disk_mut().fail_on(StorageOp::Read);
        let err = store.select_file("b.kcl").unwrap_err();
        assert_eq!(err.kind(), FileTreeErrorKind::StorageFailure);
        assert_eq!(store.selected().unwrap().name, "a.kcl");
    }
}
