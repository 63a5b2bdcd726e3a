use super::{AssessmentRecord, AssessmentStore, RecordUpdate, StoreError};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// One pretty-printed JSON file per submission
///
/// Writes go to a sibling temp file that is renamed over the record, so a
/// concurrent reader sees either the old or the new record, never a torn one.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Maps a submission id onto a file name
    ///
    /// `[A-Za-z0-9.-]` is kept as is; every other byte, `_` included, is
    /// written as `_` plus two hex digits, so distinct ids never share a file.
    pub fn record_path(&self, submission_id: &str) -> Result<PathBuf, StoreError> {
        if submission_id.trim().is_empty() || submission_id.chars().all(|c| c == '.') {
            return Err(StoreError::InvalidSubmissionId(submission_id.to_string()));
        }

        let mut name = String::with_capacity(submission_id.len() + 5);
        for byte in submission_id.bytes() {
            if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'-') {
                name.push(char::from(byte));
            } else {
                name.push('_');
                name.push_str(&hex::encode([byte]));
            }
        }
        name.push_str(".json");
        Ok(self.dir.join(name))
    }

    async fn read(&self, path: &Path) -> Result<Option<AssessmentRecord>, StoreError> {
        match fs::read(path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StoreError::Serialization(format!("{}: {}", path.display(), e))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    async fn write(&self, path: &Path, record: &AssessmentRecord) -> Result<(), StoreError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |e| StoreError::Io { path, source: e }
        };

        fs::create_dir_all(&self.dir)
            .await
            .map_err(io_err(&self.dir))?;

        let bytes = serde_json::to_vec_pretty(record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let tmp = path.with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4().simple()));

        fs::write(&tmp, &bytes).await.map_err(io_err(&tmp))?;
        if let Err(e) = fs::rename(&tmp, path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source: e,
            });
        }

        debug!(path = %path.display(), status = %record.status, "Wrote assessment record");
        Ok(())
    }
}

#[async_trait]
impl AssessmentStore for JsonFileStore {
    async fn apply(
        &self,
        submission_id: &str,
        update: RecordUpdate,
    ) -> Result<AssessmentRecord, StoreError> {
        let path = self.record_path(submission_id)?;
        let previous = self.read(&path).await?;
        let record = AssessmentRecord::apply(previous.as_ref(), &update)?;
        self.write(&path, &record).await?;
        Ok(record)
    }

    async fn get(&self, submission_id: &str) -> Result<Option<AssessmentRecord>, StoreError> {
        let path = self.record_path(submission_id)?;
        self.read(&path).await
    }
}
