use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::util::write_atomic;

#[cfg(target_os = "linux")]
const ENAMETOOLONG: i32 = 36;
#[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
const ENAMETOOLONG: i32 = 63;
#[cfg(windows)]
const ENAMETOOLONG: i32 = 206;
#[cfg(not(any(
    target_os = "linux",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    windows
)))]
const ENAMETOOLONG: i32 = -1;

/// 磁碟操作的種類。 / The storage primitive that was being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageOp {
    List,
    CreateEmpty,
    Move,
    Delete,
    Read,
    Write,
}

impl fmt::Display for StorageOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StorageOp::List => "list",
            StorageOp::CreateEmpty => "create",
            StorageOp::Move => "move",
            StorageOp::Delete => "delete",
            StorageOp::Read => "read",
            StorageOp::Write => "write",
        };
        f.write_str(label)
    }
}

/// 儲存失敗的分類，供 UI 顯示。 / Classification of a storage failure for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    PermissionDenied,
    PathTooLong,
    NotFound,
    AlreadyExists,
    Io,
}

impl StorageErrorKind {
    /// Maps an `io::Error` onto the coarse kinds surfaced to callers.
    /// 將 `io::Error` 對應到呈現給呼叫端的分類。
    pub fn classify(err: &io::Error) -> Self {
        if err.raw_os_error() == Some(ENAMETOOLONG) {
            return StorageErrorKind::PathTooLong;
        }
        match err.kind() {
            ErrorKind::PermissionDenied => StorageErrorKind::PermissionDenied,
            ErrorKind::NotFound => StorageErrorKind::NotFound,
            ErrorKind::AlreadyExists => StorageErrorKind::AlreadyExists,
            _ => StorageErrorKind::Io,
        }
    }
}

impl fmt::Display for StorageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StorageErrorKind::PermissionDenied => "permission denied",
            StorageErrorKind::PathTooLong => "path too long",
            StorageErrorKind::NotFound => "not found",
            StorageErrorKind::AlreadyExists => "already exists",
            StorageErrorKind::Io => "I/O error",
        };
        f.write_str(label)
    }
}

/// 磁碟操作失敗。 / A failed call into the disk capability.
#[derive(Debug, Error)]
#[error("{op} `{name}` failed ({kind}): {source}")]
pub struct StorageError {
    pub op: StorageOp,
    pub name: String,
    pub kind: StorageErrorKind,
    #[source]
    pub source: io::Error,
}

impl StorageError {
    pub fn new(op: StorageOp, name: impl Into<String>, source: io::Error) -> Self {
        Self {
            op,
            name: name.into(),
            kind: StorageErrorKind::classify(&source),
            source,
        }
    }
}

/// Byte-level storage for the files of a single project, one object per entry name.
/// Each call is atomic: it either fully succeeds or leaves storage untouched.
/// 單一專案的檔案儲存能力；每次呼叫皆為原子操作。
pub trait DiskIo {
    /// Lists the names of all stored entries.
    fn list_files(&self) -> Result<Vec<String>, StorageError>;
    /// Creates an empty object; fails if `name` already exists.
    fn create_empty_file(&mut self, name: &str) -> Result<(), StorageError>;
    /// Moves `from` to `to`; fails if `to` already exists.
    fn move_file(&mut self, from: &str, to: &str) -> Result<(), StorageError>;
    fn delete_file(&mut self, name: &str) -> Result<(), StorageError>;
    fn read_file(&self, name: &str) -> Result<Vec<u8>, StorageError>;
    /// Replaces (or creates) the object's contents.
    fn write_file(&mut self, name: &str, bytes: &[u8]) -> Result<(), StorageError>;
}

/// 以資料夾作為後端的儲存實作。 / Directory-backed storage: one regular file per entry.
///
/// Dot-files and sub-directories are never listed; they hold project metadata and
/// in-flight temporary files.
#[derive(Debug, Clone)]
pub struct FsDisk {
    root: PathBuf,
}

impl FsDisk {
    /// Binds to `root`, creating the directory when it does not exist yet.
    /// 綁定至指定資料夾；若不存在則建立。
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .map_err(|err| StorageError::new(StorageOp::List, root.display().to_string(), err))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl DiskIo for FsDisk {
    fn list_files(&self) -> Result<Vec<String>, StorageError> {
        let list_err = |err| StorageError::new(StorageOp::List, self.root.display().to_string(), err);
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(list_err)? {
            let entry = entry.map_err(list_err)?;
            let file_type = entry.file_type().map_err(list_err)?;
            if !file_type.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                tracing::warn!(
                    event = "disk.list.skipped",
                    path = %entry.path().display(),
                    reason = "non UTF-8 file name"
                );
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    fn create_empty_file(&mut self, name: &str) -> Result<(), StorageError> {
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.path_of(name))
            .map(|_| ())
            .map_err(|err| StorageError::new(StorageOp::CreateEmpty, name, err))
    }

    fn move_file(&mut self, from: &str, to: &str) -> Result<(), StorageError> {
        let target = self.path_of(to);
        // `fs::rename` silently replaces an existing target on unix.
        if target.exists() {
            return Err(StorageError::new(
                StorageOp::Move,
                to,
                io::Error::new(ErrorKind::AlreadyExists, "target already exists"),
            ));
        }
        fs::rename(self.path_of(from), target)
            .map_err(|err| StorageError::new(StorageOp::Move, from, err))
    }

    fn delete_file(&mut self, name: &str) -> Result<(), StorageError> {
        fs::remove_file(self.path_of(name))
            .map_err(|err| StorageError::new(StorageOp::Delete, name, err))
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        fs::read(self.path_of(name)).map_err(|err| StorageError::new(StorageOp::Read, name, err))
    }

    fn write_file(&mut self, name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        write_atomic(&self.path_of(name), bytes)
            .map_err(|err| StorageError::new(StorageOp::Write, name, err))
    }
}

/// 記憶體內的儲存實作，可注入失敗。 / In-memory storage with per-operation failure injection.
#[derive(Debug, Clone, Default)]
pub struct MemoryDisk {
    files: BTreeMap<String, Vec<u8>>,
    failing: HashSet<StorageOp>,
}

impl MemoryDisk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the disk with existing files.
    pub fn with_files<I, N, B>(files: I) -> Self
    where
        I: IntoIterator<Item = (N, B)>,
        N: Into<String>,
        B: Into<Vec<u8>>,
    {
        Self {
            files: files
                .into_iter()
                .map(|(name, bytes)| (name.into(), bytes.into()))
                .collect(),
            failing: HashSet::new(),
        }
    }

    /// Makes every subsequent call of `op` fail with `PermissionDenied`.
    pub fn fail_on(&mut self, op: StorageOp) {
        self.failing.insert(op);
    }

    pub fn clear_failures(&mut self) {
        self.failing.clear();
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn check(&self, op: StorageOp, name: &str) -> Result<(), StorageError> {
        if self.failing.contains(&op) {
            return Err(StorageError::new(
                op,
                name,
                io::Error::new(ErrorKind::PermissionDenied, "injected failure"),
            ));
        }
        Ok(())
    }
}

fn missing(op: StorageOp, name: &str) -> StorageError {
    StorageError::new(op, name, io::Error::new(ErrorKind::NotFound, "no such file"))
}

fn occupied(op: StorageOp, name: &str) -> StorageError {
    StorageError::new(
        op,
        name,
        io::Error::new(ErrorKind::AlreadyExists, "file already exists"),
    )
}

impl DiskIo for MemoryDisk {
    fn list_files(&self) -> Result<Vec<String>, StorageError> {
        self.check(StorageOp::List, "")?;
        Ok(self.files.keys().cloned().collect())
    }

    fn create_empty_file(&mut self, name: &str) -> Result<(), StorageError> {
        self.check(StorageOp::CreateEmpty, name)?;
        if self.files.contains_key(name) {
            return Err(occupied(StorageOp::CreateEmpty, name));
        }
        self.files.insert(name.to_string(), Vec::new());
        Ok(())
    }

    fn move_file(&mut self, from: &str, to: &str) -> Result<(), StorageError> {
        self.check(StorageOp::Move, from)?;
        if self.files.contains_key(to) {
            return Err(occupied(StorageOp::Move, to));
        }
        let bytes = self
            .files
            .remove(from)
            .ok_or_else(|| missing(StorageOp::Move, from))?;
        self.files.insert(to.to_string(), bytes);
        Ok(())
    }

    fn delete_file(&mut self, name: &str) -> Result<(), StorageError> {
        self.check(StorageOp::Delete, name)?;
        self.files
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| missing(StorageOp::Delete, name))
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        self.check(StorageOp::Read, name)?;
        self.files
            .get(name)
            .cloned()
            .ok_or_else(|| missing(StorageOp::Read, name))
    }

    fn write_file(&mut self, name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.check(StorageOp::Write, name)?;
        self.files.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn fs_disk_lists_only_visible_regular_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.kcl"), b"b").unwrap();
        fs::write(dir.path().join("a.kcl"), b"a").unwrap();
        fs::write(dir.path().join(".hidden"), b"x").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        let disk = FsDisk::open(dir.path()).unwrap();
        assert_eq!(disk.list_files().unwrap(), vec!["a.kcl", "b.kcl"]);
    }

    #[test]
    fn fs_disk_move_refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        let mut disk = FsDisk::open(dir.path()).unwrap();
        disk.write_file("main.kcl", b"cube").unwrap();
        disk.write_file("2.kcl", b"cylinder").unwrap();

        let err = disk.move_file("2.kcl", "main.kcl").unwrap_err();
        assert_eq!(err.kind, StorageErrorKind::AlreadyExists);
        assert_eq!(disk.read_file("main.kcl").unwrap(), b"cube");
        assert_eq!(disk.read_file("2.kcl").unwrap(), b"cylinder");
    }

    #[test]
    fn fs_disk_create_empty_refuses_existing() {
        let dir = tempdir().unwrap();
        let mut disk = FsDisk::open(dir.path()).unwrap();
        disk.create_empty_file("main.kcl").unwrap();
        assert!(disk.read_file("main.kcl").unwrap().is_empty());
        let err = disk.create_empty_file("main.kcl").unwrap_err();
        assert_eq!(err.op, StorageOp::CreateEmpty);
        assert_eq!(err.kind, StorageErrorKind::AlreadyExists);
    }

    #[test]
    fn fs_disk_write_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let mut disk = FsDisk::open(dir.path()).unwrap();
        disk.write_file("main.kcl", b"one").unwrap();
        disk.write_file("main.kcl", b"two").unwrap();
        assert_eq!(disk.read_file("main.kcl").unwrap(), b"two");
        let count = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(count, 1);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn overlong_names_are_classified() {
        let dir = tempdir().unwrap();
        let mut disk = FsDisk::open(dir.path()).unwrap();
        let name = format!("{}.kcl", "x".repeat(300));
        let err = disk.create_empty_file(&name).unwrap_err();
        assert_eq!(err.kind, StorageErrorKind::PathTooLong);
    }

    #[test]
    fn memory_disk_failure_injection() {
        let mut disk = MemoryDisk::with_files([("main.kcl", "cube")]);
        disk.fail_on(StorageOp::Move);
        let err = disk.move_file("main.kcl", "hello.kcl").unwrap_err();
        assert_eq!(err.kind, StorageErrorKind::PermissionDenied);
        assert!(disk.contains("main.kcl"));

        disk.clear_failures();
        disk.move_file("main.kcl", "hello.kcl").unwrap();
        assert_eq!(disk.read_file("hello.kcl").unwrap(), b"cube");
        assert!(!disk.contains("main.kcl"));
    }
}
