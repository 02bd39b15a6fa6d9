//! Keeps the editor buffer, the project tree and the disk in agreement.
//! 讓編輯緩衝區、專案樹與磁碟內容保持一致。

use std::mem;

use codepad_core::{DiskIo, EditorBuffer};
use codepad_settings::EditorPreferences;
use thiserror::Error;
use tracing::debug;

use crate::manifest::ManifestStore;
use crate::naming::{self, NamePolicy};
use crate::store::{DeleteOutcome, FileTreeError, FileTreeStore, SyncAction, SyncPlan};
use crate::tree::{EntryView, FileEntry};

/// Behaviour switches for a [`ProjectSession`].
/// 工作階段的行為設定。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Write unsaved edits to the bound file before another file is selected.
    pub save_before_switch: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&EditorPreferences::default())
    }
}

impl From<&EditorPreferences> for SessionOptions {
    fn from(prefs: &EditorPreferences) -> Self {
        Self {
            save_before_switch: prefs.save_before_switch,
        }
    }
}

/// Whether a project is currently open in the session.
#[derive(Debug)]
pub enum SessionState<D> {
    Closed,
    Open(FileTreeStore<D>),
}

/// Errors surfaced by [`ProjectSession`].
/// 工作階段操作錯誤。
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("no project is open")]
    NotOpen,
    #[error(transparent)]
    Tree(#[from] FileTreeError),
}

/// Drives a [`FileTreeStore`] on behalf of the UI and applies each resulting
/// [`SyncPlan`] to the editor buffer, so the editor always shows the persisted
/// bytes of the selected file after a mutation.
/// 代表 UI 操作檔案樹，並將同步計畫套用到編輯緩衝區。
#[derive(Debug)]
pub struct ProjectSession<D, E> {
    state: SessionState<D>,
    editor: E,
    options: SessionOptions,
}

impl<D: DiskIo, E: EditorBuffer> ProjectSession<D, E> {
    /// Creates a closed session around `editor`.
    pub fn new(editor: E, options: SessionOptions) -> Self {
        Self {
            state: SessionState::Closed,
            editor,
            options,
        }
    }

    pub fn state(&self) -> &SessionState<D> {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, SessionState::Open(_))
    }

    pub fn options(&self) -> SessionOptions {
        self.options
    }

    pub fn editor(&self) -> &E {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut E {
        &mut self.editor
    }

    pub fn store(&self) -> Result<&FileTreeStore<D>, SyncError> {
        match &self.state {
            SessionState::Open(store) => Ok(store),
            SessionState::Closed => Err(SyncError::NotOpen),
        }
    }

    pub fn store_mut(&mut self) -> Result<&mut FileTreeStore<D>, SyncError> {
        match &mut self.state {
            SessionState::Open(store) => Ok(store),
            SessionState::Closed => Err(SyncError::NotOpen),
        }
    }

    pub fn entries(&self) -> Result<Vec<EntryView>, SyncError> {
        Ok(self.store()?.entries())
    }

    pub fn selected(&self) -> Result<Option<&FileEntry>, SyncError> {
        Ok(self.store()?.selected())
    }

    /// Opens a project and loads its selected file into the editor.
    ///
    /// Any project that was open before is replaced without flushing; on failure
    /// the previous state is kept.
    /// 開啟專案並將選取檔案載入編輯器；失敗時保留原狀態。
    pub fn open(
        &mut self,
        disk: D,
        policy: NamePolicy,
        manifest: Option<ManifestStore>,
    ) -> Result<(), SyncError> {
        let mut store = FileTreeStore::new(disk, policy, manifest);
        let applied = store.load()?;
        apply_plan(&mut self.editor, applied.plan);
        self.state = SessionState::Open(store);
        Ok(())
    }

    /// Closes the project and hands back its store. The editor keeps its last content.
    pub fn close(&mut self) -> Option<FileTreeStore<D>> {
        match mem::replace(&mut self.state, SessionState::Closed) {
            SessionState::Open(store) => Some(store),
            SessionState::Closed => None,
        }
    }

    /// Rebuilds the tree from disk and reloads the selected file, discarding
    /// unsaved edits.
    /// 從磁碟重新載入；未儲存的編輯會被捨棄。
    pub fn reload(&mut self) -> Result<(), SyncError> {
        let store = open_store(&mut self.state)?;
        let applied = store.load()?;
        apply_plan(&mut self.editor, applied.plan);
        Ok(())
    }

    /// Creates a file without changing the selection.
    pub fn create_file(&mut self, proposed: Option<&str>) -> Result<FileEntry, SyncError> {
        Ok(open_store(&mut self.state)?.create_file(proposed)?)
    }

    /// Creates a file and switches the editor to it.
    pub fn create_and_select(&mut self, proposed: Option<&str>) -> Result<FileEntry, SyncError> {
        let entry = self.create_file(proposed)?;
        self.select_file(&entry.name)
    }

    /// Renames a file. Unsaved edits to it are written to the old name first, so
    /// the moved file carries them.
    /// 重新命名檔案；若有未儲存的編輯會先寫入舊檔名。
    pub fn rename_file(&mut self, from: &str, to: &str) -> Result<FileEntry, SyncError> {
        let store = open_store(&mut self.state)?;
        if self.editor.bound_file() == Some(naming::normalize(from)) {
            flush_editor(store, &mut self.editor)?;
        }
        let applied = store.rename_file(from, to)?;
        apply_plan(&mut self.editor, applied.plan);
        Ok(applied.value)
    }

    pub fn delete_file(&mut self, name: &str) -> Result<DeleteOutcome, SyncError> {
        let store = open_store(&mut self.state)?;
        let applied = store.delete_file(name)?;
        apply_plan(&mut self.editor, applied.plan);
        Ok(applied.value)
    }

    /// Switches the editor to `name`, flushing unsaved edits first when
    /// [`SessionOptions::save_before_switch`] is set.
    /// 切換編輯器至指定檔案；視設定先儲存未儲存的編輯。
    pub fn select_file(&mut self, name: &str) -> Result<FileEntry, SyncError> {
        let store = open_store(&mut self.state)?;
        if store.find(name).is_none() {
            return Err(FileTreeError::NotFound(naming::normalize(name).to_string()).into());
        }
        if self.options.save_before_switch && !store_is_selected(store, name) {
            flush_editor(store, &mut self.editor)?;
        }
        let applied = store.select_file(name)?;
        apply_plan(&mut self.editor, applied.plan);
        Ok(applied.value)
    }

    /// Writes the buffer to its bound file and marks it saved.
    pub fn save(&mut self) -> Result<(), SyncError> {
        let store = open_store(&mut self.state)?;
        let Some(name) = self.editor.bound_file().map(str::to_string) else {
            return Ok(());
        };
        store.write_file(&name, self.editor.content())?;
        self.editor.mark_saved();
        Ok(())
    }
}

fn open_store<D>(state: &mut SessionState<D>) -> Result<&mut FileTreeStore<D>, SyncError> {
    match state {
        SessionState::Open(store) => Ok(store),
        SessionState::Closed => Err(SyncError::NotOpen),
    }
}

fn store_is_selected<D: DiskIo>(store: &FileTreeStore<D>, name: &str) -> bool {
    store
        .selected()
        .is_some_and(|entry| entry.name == naming::normalize(name))
}

/// Persists unsaved edits to the bound file. Returns whether anything was written.
fn flush_editor<D: DiskIo, E: EditorBuffer>(
    store: &mut FileTreeStore<D>,
    editor: &mut E,
) -> Result<bool, FileTreeError> {
    if !editor.is_modified() {
        return Ok(false);
    }
    let Some(name) = editor.bound_file().map(str::to_string) else {
        return Ok(false);
    };
    store.write_file(&name, editor.content())?;
    editor.mark_saved();
    debug!(event = "project.sync.flushed", name = %name);
    Ok(true)
}

/// Applies a plan to the editor. Infallible: every action is an in-memory update.
pub fn apply_plan<E: EditorBuffer>(editor: &mut E, plan: SyncPlan) {
    for action in plan {
        match action {
            SyncAction::Rebind { name } => {
                debug!(event = "project.sync.rebind", name = %name);
                editor.bind_to_file(&name);
            }
            SyncAction::Replace { name, content } => {
                debug!(event = "project.sync.replace", name = %name, bytes = content.len());
                editor.set_content(content);
                editor.bind_to_file(&name);
            }
        }
    }
}
