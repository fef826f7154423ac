// src/fetch/zips.rs

use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::{Error, Result};

/// Write `bytes` verbatim to `dest`, creating parent directories, and apply
/// the unix permission bits in `mode` where supported.
pub fn save_bytes(dest: impl AsRef<Path>, bytes: &[u8], mode: u32) -> Result<()> {
    let dest = dest.as_ref();
    let io = |source| Error::Io {
        path: dest.to_path_buf(),
        source,
    };

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io)?;
    }
    fs::write(dest, bytes).map_err(io)?;
    set_mode(dest, mode).map_err(io)?;

    info!(path = %dest.display(), size = bytes.len(), "saved");
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_bytes_creates_dirs() {
        let tmp = tempdir().unwrap();
        let dest = tmp.path().join("nested").join("PIndx.zip");
        save_bytes(&dest, b"zip bytes", 0o644).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"zip bytes");
    }

    #[cfg(unix)]
    #[test]
    fn test_save_bytes_applies_mode() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempdir().unwrap();
        let dest = tmp.path().join("PIndx.dbf");
        save_bytes(&dest, b"dbf", 0o600).unwrap();
        let mode = fs::metadata(&dest).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
