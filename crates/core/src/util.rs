use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TEMP: AtomicU64 = AtomicU64::new(0);

/// Writes data atomically by using a hidden temporary sibling followed by rename.
/// The temporary name has a bounded length, so any name that can be created can be written.
/// 以隱藏的臨時檔案搭配 rename 實現原子寫入；臨時檔名長度固定。
pub fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = temp_sibling(path);
    let result = write_then_rename(&tmp_path, path, data);
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

fn write_then_rename(tmp_path: &Path, path: &Path, data: &[u8]) -> io::Result<()> {
    {
        let mut tmp_file = File::create(tmp_path)?;
        tmp_file.write_all(data)?;
        tmp_file.sync_all()?;
    }
    fs::rename(tmp_path, path)
}

fn temp_sibling(path: &Path) -> PathBuf {
    let seq = NEXT_TEMP.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(".codepad-{:x}-{seq:x}.tmp", process::id()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn leftovers(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect()
    }

    #[test]
    fn temp_file_is_hidden_and_short() {
        let long = format!("/project/{}.kcl", "x".repeat(248));
        let tmp = temp_sibling(Path::new(&long));
        let name = tmp.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(".codepad-"));
        assert!(name.len() < 48);
        assert_eq!(tmp.parent(), Some(Path::new("/project")));
    }

    #[test]
    fn write_atomic_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".codepad").join("tree.json");
        write_atomic(&path, b"{}").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"{}");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn names_at_the_length_limit_can_be_written() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(format!("{}.kcl", "x".repeat(248)));
        File::create(&path).unwrap();
        write_atomic(&path, b"cube(10)").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"cube(10)");
        assert!(leftovers(dir.path()).is_empty());
    }

    #[test]
    fn failed_rename_removes_temp_file() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("occupied");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("child"), b"x").unwrap();

        assert!(write_atomic(&target, b"data").is_err());
        assert!(leftovers(dir.path()).is_empty());
    }
}
