//! Keeps a project from ever ending up with zero files.
//! 確保專案永遠不會沒有任何檔案。

use crate::naming::NamePolicy;
use crate::tree::{FileEntry, ProjectTree, ProjectTreeError};

/// Result of healing an empty tree: the tree holding only the default entry, selected.
#[derive(Debug, Clone)]
pub struct Healed {
    pub tree: ProjectTree,
    pub entry: FileEntry,
}

/// Returns `None` when `tree` is non-empty; otherwise synthesises the default file
/// and selects it. Materialising the file on disk is up to the caller.
/// 若專案樹為空則建立並選取預設檔案；磁碟上的建立由呼叫端負責。
pub fn heal(tree: &ProjectTree, policy: &NamePolicy) -> Result<Option<Healed>, ProjectTreeError> {
    if !tree.is_empty() {
        return Ok(None);
    }
    let inserted = tree.insert(policy.default_name())?;
    let entry = inserted.entries()[0].clone();
    let selected = inserted.select(entry.id)?;
    Ok(Some(Healed {
        tree: selected,
        entry,
    }))
}
