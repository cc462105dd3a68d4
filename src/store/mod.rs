//! Durable state: the per-service status store and the alert log
//!
//! Both are JSON documents rewritten in full. Every write goes to its own
//! temp file in the target directory and is renamed into place, so a failed
//! write never leaves a half-written document behind and two writers never
//! share a scratch file.

pub mod alerts;
pub mod status;
mod timestamp;

pub use alerts::{AlertLog, AlertRecord, AlertStatus};
pub use status::{ServiceStatus, StatusSnapshot, StatusStore};

use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Replace `path` with `contents` atomically
pub(crate) async fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            tokio::fs::create_dir_all(parent).await?;
            parent.to_path_buf()
        }
        None => PathBuf::from("."),
    };

    let prefix = match path.file_name() {
        Some(name) => format!(".{}.", name.to_string_lossy()),
        None => ".vigil.".to_string(),
    };
    let path = path.to_path_buf();
    let contents = contents.to_vec();

    tokio::task::spawn_blocking(move || -> io::Result<()> {
        let mut tmp = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".tmp")
            .tempfile_in(&dir)?;
        tmp.write_all(&contents)?;
        tmp.as_file().sync_all()?;
        // On failure the temp file is removed when the error drops it
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(io::Error::other)?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn write_atomic_replaces_content_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("doc.json");

        write_atomic(&path, b"[1]").await.unwrap();
        write_atomic(&path, b"[1,2]").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[1,2]");
        assert_eq!(entries(&dir.path().join("nested")), vec!["doc.json"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writes_never_share_a_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");

        let mut handles = Vec::new();
        for i in 0..32 {
            let path = path.clone();
            handles.push(tokio::spawn(async move {
                let body = serde_json::to_vec(&vec![i; 64]).unwrap();
                write_atomic(&path, &body).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // Whichever writer landed last, the document is whole
        let doc: Vec<u32> = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(doc.len(), 64);
        assert!(doc.iter().all(|v| *v == doc[0]));
        assert_eq!(entries(dir.path()), vec!["doc.json"]);
    }

    #[tokio::test]
    async fn write_into_a_file_parent_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "keep").unwrap();

        let result = write_atomic(&blocker.join("doc.json"), b"[]").await;
        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&blocker).unwrap(), "keep");
    }
}
