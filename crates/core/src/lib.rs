//! Collaborator capabilities consumed by the project layer: byte storage and the editor buffer.
//! 專案層使用的協作介面：位元組儲存與編輯緩衝區。

pub mod buffer;
pub mod disk;
mod util;

pub use buffer::{EditorBuffer, TextBuffer};
pub use disk::{DiskIo, FsDisk, MemoryDisk, StorageError, StorageErrorKind, StorageOp};
pub use util::write_atomic;
