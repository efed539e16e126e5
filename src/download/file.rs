use std::path::{Path, PathBuf};

use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::error::WriteError;

/// Hidden sibling used while `dest` is being written, e.g. `.a.pdf.part`.
pub fn part_path(dest: &Path) -> Result<PathBuf, WriteError> {
    let name = dest
        .file_name()
        .ok_or_else(|| WriteError::NoFileName(dest.to_path_buf()))?;
    let mut part = std::ffi::OsString::from(".");
    part.push(name);
    part.push(".part");
    Ok(dest.with_file_name(part))
}

/// Write `bytes` to `dest` so that readers only ever see the old content or
/// the complete new content.
///
/// The data goes to a `.part` sibling first, is flushed and synced, then
/// renamed over `dest`. A leftover `.part` from an interrupted earlier
/// attempt is simply truncated. On failure the `.part` file is removed and
/// `dest` is untouched.
pub async fn write_atomic(dest: &Path, bytes: &[u8]) -> Result<(), WriteError> {
    let part = part_path(dest)?;

    let result = write_part(&part, bytes).await;
    if let Err(e) = result {
        let _ = fs::remove_file(&part).await;
        return Err(e);
    }

    if let Err(source) = fs::rename(&part, dest).await {
        let _ = fs::remove_file(&part).await;
        return Err(WriteError::Rename {
            from: part,
            to: dest.to_path_buf(),
            source,
        });
    }
    Ok(())
}

async fn write_part(part: &Path, bytes: &[u8]) -> Result<(), WriteError> {
    let to_err = |source| WriteError::Write {
        path: part.to_path_buf(),
        source,
    };
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(part)
        .await
        .map_err(to_err)?;
    file.write_all(bytes).await.map_err(to_err)?;
    file.flush().await.map_err(to_err)?;
    file.sync_all().await.map_err(to_err)?;
    Ok(())
}

/// `create_dir_all` with the path attached to the error.
pub async fn ensure_dir(dir: &Path) -> Result<(), WriteError> {
    fs::create_dir_all(dir)
        .await
        .map_err(|source| WriteError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_path_is_hidden_sibling() {
        let part = part_path(Path::new("/data/MATH101/a.pdf")).unwrap();
        assert_eq!(part, PathBuf::from("/data/MATH101/.a.pdf.part"));
    }

    #[test]
    fn part_path_requires_file_name() {
        assert!(matches!(
            part_path(Path::new("/")),
            Err(WriteError::NoFileName(_))
        ));
    }

    #[tokio::test]
    async fn write_atomic_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.pdf");
        write_atomic(&dest, b"hello").await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello");
        assert!(!dir.path().join(".a.pdf.part").exists());
    }

    #[tokio::test]
    async fn write_atomic_replaces_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.pdf");
        std::fs::write(&dest, b"old content that is longer").unwrap();
        write_atomic(&dest, b"new").await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"new");
    }

    #[tokio::test]
    async fn write_atomic_overwrites_stale_part_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.pdf");
        std::fs::write(dir.path().join(".a.pdf.part"), b"stale partial bytes").unwrap();
        write_atomic(&dest, b"fresh").await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"fresh");
    }

    #[tokio::test]
    async fn write_atomic_fails_when_parent_missing() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("missing").join("a.pdf");
        assert!(matches!(
            write_atomic(&dest, b"x").await,
            Err(WriteError::Write { .. })
        ));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn ensure_dir_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_dir(&nested).await.unwrap();
        ensure_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
    }
}
