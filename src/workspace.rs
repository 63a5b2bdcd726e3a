//! Snapshot materialization into scoped temporary directories
//!
//! A [`SourceTree`] owns its directory. Dropping it removes the directory, so
//! every exit path of an assessment (success, error, cancellation, panic)
//! leaves the work directory as it found it.

use flate2::read::GzDecoder;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tar::{Archive, EntryType};
use tempfile::TempDir;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const TEMP_PREFIX: &str = "repograde-";

#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error("Failed to create working directory under {path}: {source}")]
    WorkDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to unpack snapshot archive: {0}")]
    Unpack(#[source] io::Error),

    #[error("Snapshot archive contained no files")]
    Empty,

    #[error("Extraction was cancelled")]
    Cancelled,
}

/// An extracted snapshot
#[derive(Debug)]
pub struct SourceTree {
    dir: TempDir,
    root: PathBuf,
}

impl SourceTree {
    /// Directory analyzers run against
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Temporary directory holding the extraction
    pub fn location(&self) -> &Path {
        self.dir.path()
    }

    /// Removes the directory now, reporting failures instead of ignoring them
    pub fn close(self) -> io::Result<()> {
        self.dir.close()
    }
}

/// Hex encoded SHA-256 digest of snapshot bytes
pub fn snapshot_digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

pub struct Materializer {
    work_dir: PathBuf,
}

impl Materializer {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    /// Unpacks a gzipped tarball into a fresh directory under the work dir.
    ///
    /// Entries escaping the extraction directory, links and device nodes are
    /// skipped. If the archive holds a single top-level directory (as forge
    /// tarballs do) that directory becomes the root.
    ///
    /// `cancel` is checked between entries; a cancelled extraction removes
    /// its partial directory before returning.
    pub fn extract_tarball(
        &self,
        bytes: &[u8],
        cancel: &CancellationToken,
    ) -> Result<SourceTree, MaterializeError> {
        fs::create_dir_all(&self.work_dir).map_err(|e| MaterializeError::WorkDir {
            path: self.work_dir.clone(),
            source: e,
        })?;
        let dir = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempdir_in(&self.work_dir)
            .map_err(|e| MaterializeError::WorkDir {
                path: self.work_dir.clone(),
                source: e,
            })?;

        let mut archive = Archive::new(GzDecoder::new(bytes));
        archive.set_preserve_permissions(false);
        archive.set_preserve_mtime(false);

        let mut unpacked = 0usize;
        for entry in archive.entries().map_err(MaterializeError::Unpack)? {
            if cancel.is_cancelled() {
                return Err(MaterializeError::Cancelled);
            }
            let mut entry = entry.map_err(MaterializeError::Unpack)?;
            match entry.header().entry_type() {
                EntryType::Regular | EntryType::Directory | EntryType::Continuous => {}
                other => {
                    debug!(kind = ?other, "Skipping archive entry");
                    continue;
                }
            }

            if entry.unpack_in(dir.path()).map_err(MaterializeError::Unpack)? {
                unpacked += 1;
            } else {
                let path = entry.path().map(|p| p.display().to_string()).unwrap_or_default();
                warn!(path = %path, "Skipping archive entry outside extraction directory");
            }
        }

        if unpacked == 0 {
            return Err(MaterializeError::Empty);
        }

        let root = single_top_level_dir(dir.path())
            .map_err(MaterializeError::Unpack)?
            .unwrap_or_else(|| dir.path().to_path_buf());
        debug!(root = %root.display(), entries = unpacked, "Materialized snapshot");

        Ok(SourceTree { dir, root })
    }
}

fn single_top_level_dir(path: &Path) -> io::Result<Option<PathBuf>> {
    let mut entries = fs::read_dir(path)?.collect::<Result<Vec<_>, _>>()?;
    if entries.len() != 1 {
        return Ok(None);
    }
    let entry = entries.remove(0);
    if entry.file_type()?.is_dir() {
        Ok(Some(entry.path()))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn tarball(files: &[(&str, &str)]) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (path, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, path, content.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn entry_count(dir: &Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_single_top_level_dir_becomes_root() {
        let work = TempDir::new().unwrap();
        let bytes = tarball(&[
            ("acme-demo-abc123/index.html", "<html></html>"),
            ("acme-demo-abc123/src/app.js", "let a = 1;"),
        ]);

        let tree = Materializer::new(work.path())
            .extract_tarball(&bytes, &CancellationToken::new())
            .unwrap();
        assert!(tree.root().ends_with("acme-demo-abc123"));
        assert!(tree.root().join("src/app.js").is_file());
    }

    #[test]
    fn test_multiple_top_level_entries_keep_extraction_root() {
        let work = TempDir::new().unwrap();
        let bytes = tarball(&[("index.html", "<html></html>"), ("app.js", "1;")]);

        let tree = Materializer::new(work.path())
            .extract_tarball(&bytes, &CancellationToken::new())
            .unwrap();
        assert_eq!(tree.root(), tree.location());
    }

    #[test]
    fn test_drop_removes_directory() {
        let work = TempDir::new().unwrap();
        let bytes = tarball(&[("repo/app.js", "1;")]);

        let tree = Materializer::new(work.path())
            .extract_tarball(&bytes, &CancellationToken::new())
            .unwrap();
        let location = tree.location().to_path_buf();
        assert!(location.exists());
        assert_eq!(entry_count(work.path()), 1);

        drop(tree);
        assert!(!location.exists());
        assert_eq!(entry_count(work.path()), 0);
    }

    #[test]
    fn test_close_removes_directory() {
        let work = TempDir::new().unwrap();
        let bytes = tarball(&[("repo/app.js", "1;")]);

        let tree = Materializer::new(work.path())
            .extract_tarball(&bytes, &CancellationToken::new())
            .unwrap();
        tree.close().unwrap();
        assert_eq!(entry_count(work.path()), 0);
    }

    #[test]
    fn test_garbage_input_fails_and_cleans_up() {
        let work = TempDir::new().unwrap();
        let result = Materializer::new(work.path())
            .extract_tarball(b"definitely not gzip", &CancellationToken::new());

        assert!(matches!(result, Err(MaterializeError::Unpack(_))));
        assert_eq!(entry_count(work.path()), 0);
    }

    #[test]
    fn test_empty_archive_is_rejected() {
        let work = TempDir::new().unwrap();
        let result = Materializer::new(work.path())
            .extract_tarball(&tarball(&[]), &CancellationToken::new());

        assert!(matches!(result, Err(MaterializeError::Empty)));
        assert_eq!(entry_count(work.path()), 0);
    }

    #[test]
    fn test_cancelled_extraction_removes_partial_directory() {
        let work = TempDir::new().unwrap();
        let files: Vec<(String, String)> = (0..50)
            .map(|i| (format!("repo/f{}.js", i), "1;".to_string()))
            .collect();
        let refs: Vec<(&str, &str)> = files
            .iter()
            .map(|(p, c)| (p.as_str(), c.as_str()))
            .collect();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = Materializer::new(work.path()).extract_tarball(&tarball(&refs), &cancel);

        assert!(matches!(result, Err(MaterializeError::Cancelled)));
        assert_eq!(entry_count(work.path()), 0);
    }

    #[test]
    fn test_snapshot_digest() {
        assert_eq!(
            snapshot_digest(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
