//! Project file-tree management for codepad: naming rules, the file tree store,
//! the empty-project guard, the tree manifest and the editor sync coordinator.
//! codepad 專案檔案樹管理：命名規則、檔案樹儲存、空專案防護、清單與編輯器同步。

pub mod guard;
pub mod manifest;
pub mod naming;
pub mod store;
pub mod sync;
pub mod tree;

pub use guard::{heal, Healed};
pub use manifest::{ManifestError, ManifestStore, METADATA_DIR};
pub use naming::{NameError, NamePolicy};
pub use store::{
    Applied, DeleteOutcome, FileTreeError, FileTreeErrorKind, FileTreeStore, SyncAction, SyncPlan,
};
pub use sync::{apply_plan, ProjectSession, SessionOptions, SessionState, SyncError};
pub use tree::{EntryView, FileEntry, FileId, ProjectTree, ProjectTreeError};
