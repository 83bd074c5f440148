//! Report artifact files

use crate::StorageError;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Writes rendered artifacts into one output directory
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write `contents` to `<dir>/<file_name>`, replacing any previous file.
    /// The directory is created on first use.
    pub async fn write(&self, file_name: &str, contents: &[u8]) -> Result<PathBuf, StorageError> {
        let dir = self.dir.clone();
        let path = self.dir.join(file_name);
        let target = path.clone();
        let contents = contents.to_vec();
        let len = contents.len();

        tokio::task::spawn_blocking(move || write_atomic(&dir, &target, &contents))
            .await
            .map_err(|e| StorageError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            })??;

        debug!("Wrote {} bytes to {}", len, path.display());
        info!("Artifact written: {}", path.display());
        Ok(path)
    }
}

/// Each write goes through its own temp file in `dir`, renamed over `path`.
/// Readers never observe a partially written report. On failure the temp
/// file is removed when it drops.
fn write_atomic(dir: &Path, path: &Path, contents: &[u8]) -> Result<(), StorageError> {
    std::fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| io_error(dir, e))?;
    let tmp_path = tmp.path().to_path_buf();
    tmp.write_all(contents)
        .map_err(|e| io_error(&tmp_path, e))?;
    tmp.persist(path).map_err(|e| io_error(path, e.error))?;
    Ok(())
}

fn io_error(path: &Path, err: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

/// File-name-safe stem: ASCII alphanumerics, '-' and '_' are kept, everything
/// else becomes '_'. Empty input becomes "participant".
pub fn sanitize_file_stem(name: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if stem.is_empty() {
        "participant".to_string()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_file_stem("Alice"), "Alice");
        assert_eq!(sanitize_file_stem("  Bob Smith "), "Bob_Smith");
        assert_eq!(sanitize_file_stem("../../etc/passwd"), "______etc_passwd");
        assert_eq!(sanitize_file_stem("Zoë"), "Zo_");
        assert_eq!(sanitize_file_stem("   "), "participant");
    }

    #[tokio::test]
    async fn test_write_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(tmp.path().join("reports"));

        let path = writer.write("alice.txt", b"hello").await.unwrap();
        assert_eq!(path, tmp.path().join("reports").join("alice.txt"));
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");

        // Overwrites in place
        writer.write("alice.txt", b"again").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"again");
    }

    #[tokio::test]
    async fn test_write_into_file_path_fails() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let writer = ArtifactWriter::new(tmp.path());
        assert!(matches!(
            writer.write("x.txt", b"data").await,
            Err(StorageError::Io { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writes_same_name() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::new(tmp.path());

        let mut handles = Vec::new();
        for i in 0..16u8 {
            let writer = writer.clone();
            handles.push(tokio::spawn(async move {
                writer.write("alice.txt", &vec![i; 64 * 1024]).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // One complete write wins
        let contents = std::fs::read(tmp.path().join("alice.txt")).unwrap();
        assert_eq!(contents.len(), 64 * 1024);
        assert!(contents.iter().all(|b| *b == contents[0]));

        let entries: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_rename_leaves_no_temp_file() {
        let tmp = tempfile::tempdir().unwrap();
        // A directory where the artifact should go makes the rename fail
        std::fs::create_dir(tmp.path().join("alice.txt")).unwrap();
        std::fs::write(tmp.path().join("alice.txt").join("keep"), b"x").unwrap();
        let writer = ArtifactWriter::new(tmp.path());

        assert!(matches!(
            writer.write("alice.txt", b"data").await,
            Err(StorageError::Io { .. })
        ));

        let names: Vec<String> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["alice.txt".to_string()]);
    }
}
