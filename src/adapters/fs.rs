use crate::domain::model::FileKind;
use crate::utils::error::{Result, TourError};
use filetime::FileTime;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::{Builder, NamedTempFile, TempDir};

/// 檔案不存在就建立，存在就接在尾端寫入
pub fn append(path: impl AsRef<Path>, data: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(data)?;
    file.flush()?;
    Ok(())
}

#[cfg(unix)]
pub fn set_mode(path: impl AsRef<Path>, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    Ok(())
}

pub fn set_times(path: impl AsRef<Path>, atime: SystemTime, mtime: SystemTime) -> Result<()> {
    filetime::set_file_times(
        path,
        FileTime::from_system_time(atime),
        FileTime::from_system_time(mtime),
    )?;
    Ok(())
}

/// 以 lstat 判斷檔案種類，符號連結不會被追蹤
pub fn file_kind(path: impl AsRef<Path>) -> Result<FileKind> {
    let file_type = fs::symlink_metadata(path)?.file_type();

    if file_type.is_symlink() {
        return Ok(FileKind::Symlink);
    }
    if file_type.is_dir() {
        return Ok(FileKind::Directory);
    }
    if file_type.is_file() {
        return Ok(FileKind::Regular);
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::FileTypeExt;
        if file_type.is_fifo() {
            return Ok(FileKind::NamedPipe);
        }
    }
    Ok(FileKind::Other)
}

/// Permission bits (`0o777` mask) of the path itself, without following links.
#[cfg(unix)]
pub fn permissions(path: impl AsRef<Path>) -> Result<u32> {
    use std::os::unix::fs::PermissionsExt;
    Ok(fs::symlink_metadata(path)?.permissions().mode() & 0o777)
}

pub fn is_not_exist(err: &TourError) -> bool {
    match err {
        TourError::IoError(e) => e.kind() == io::ErrorKind::NotFound,
        _ => false,
    }
}

/// 把 pattern 最後一個 `*` 拆成前綴與後綴，沒有 `*` 時整段當前綴
fn split_pattern(pattern: &str) -> (&str, &str) {
    match pattern.rfind('*') {
        Some(at) => (&pattern[..at], &pattern[at + 1..]),
        None => (pattern, ""),
    }
}

/// 在系統暫存目錄下建立目錄，`*` 的位置換成隨機字串。drop 時自動刪除
pub fn temp_dir(pattern: &str) -> Result<TempDir> {
    temp_dir_in(std::env::temp_dir(), pattern)
}

pub fn temp_dir_in(parent: impl AsRef<Path>, pattern: &str) -> Result<TempDir> {
    let (prefix, suffix) = split_pattern(pattern);
    let dir = Builder::new().prefix(prefix).suffix(suffix).tempdir_in(parent)?;
    tracing::debug!("Created temp dir {}", dir.path().display());
    Ok(dir)
}

pub fn temp_file_in(parent: impl AsRef<Path>, pattern: &str) -> Result<NamedTempFile> {
    let (prefix, suffix) = split_pattern(pattern);
    Ok(Builder::new().prefix(prefix).suffix(suffix).tempfile_in(parent)?)
}

/// 刪除所有符合 glob 的路徑（目錄會整個刪掉），回傳成功刪除的清單。
/// 個別刪除失敗只記 warning，不中斷其他項目。
pub fn remove_matching(pattern: &str) -> Result<Vec<PathBuf>> {
    let entries = glob::glob(pattern).map_err(|e| TourError::InvalidConfigValueError {
        field: "pattern".to_string(),
        value: pattern.to_string(),
        reason: e.to_string(),
    })?;

    let mut removed = Vec::new();
    for entry in entries {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!("⚠️ Failed to read {}: {}", e.path().display(), e);
                continue;
            }
        };

        let outcome = if fs::symlink_metadata(&path).map(|m| m.is_dir()).unwrap_or(false) {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        match outcome {
            Ok(()) => removed.push(path),
            Err(e) => tracing::warn!("⚠️ Failed to remove {}: {}", path.display(), e),
        }
    }

    tracing::info!("🧹 Removed {} path(s) matching {}", removed.len(), pattern);
    Ok(removed)
}

pub fn read_dir_names(dir: impl AsRef<Path>) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        names.push(entry?.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}
