#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;
use repograde::analyzers::config::{Baseline, ESLINT_BASELINE, HTMLHINT_BASELINE, STYLELINT_BASELINE};
use repograde::analyzers::{Analyzer, AnalyzerError, AnalyzerRegistry, AnalyzerRequest, ConfigResolution};
use repograde::classify::LanguageBucket;
use repograde::findings::AnalysisArtifact;
use repograde::forge::{ForgeClient, ForgeError, LocatedArtifact, RepositoryReference, Visibility};
use serde_json::{json, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Gzipped tarball wrapped in a single commit-named folder, as GitHub serves them
pub fn tarball(files: &[(&str, &str)]) -> Bytes {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(
                &mut header,
                format!("acme-demo-9f8e7d6/{}", path),
                content.as_bytes(),
            )
            .expect("append tar entry");
    }
    let encoder = builder.into_inner().expect("finish tar");
    Bytes::from(encoder.finish().expect("finish gzip"))
}

/// Zip bundle in the shape of a GitHub Actions artifact download
pub fn artifact_bundle(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .expect("start zip entry");
        writer.write_all(content.as_bytes()).expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

pub fn work_dir_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

/// Scripted forge. Unset responses mean "public, no artifact, no snapshot".
pub struct FakeForge {
    pub visibility: Result<Visibility, ForgeError>,
    pub artifact: Result<Option<LocatedArtifact>, ForgeError>,
    pub snapshot: Result<Bytes, ForgeError>,
    pub snapshot_downloads: AtomicUsize,
}

impl FakeForge {
    pub fn public_snapshot(snapshot: Bytes) -> Self {
        Self {
            visibility: Ok(Visibility::Public),
            artifact: Ok(None),
            snapshot: Ok(snapshot),
            snapshot_downloads: AtomicUsize::new(0),
        }
    }

    pub fn with_visibility(mut self, visibility: Result<Visibility, ForgeError>) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_artifact(mut self, artifact: Result<Option<LocatedArtifact>, ForgeError>) -> Self {
        self.artifact = artifact;
        self
    }

    pub fn downloads(&self) -> usize {
        self.snapshot_downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ForgeClient for FakeForge {
    async fn check_visibility(&self, _repo: &RepositoryReference) -> Result<Visibility, ForgeError> {
        self.visibility.clone()
    }

    async fn find_artifact(
        &self,
        _repo: &RepositoryReference,
    ) -> Result<Option<LocatedArtifact>, ForgeError> {
        self.artifact.clone()
    }

    async fn download_snapshot(&self, _repo: &RepositoryReference) -> Result<Bytes, ForgeError> {
        self.snapshot_downloads.fetch_add(1, Ordering::SeqCst);
        self.snapshot.clone()
    }
}

/// Deterministic stand-in for a linter: every line containing `ERROR` is an
/// error, every line containing `WARN` a warning. Emits an ESLint-style
/// per-file report.
pub struct MarkerAnalyzer {
    bucket: LanguageBucket,
    pub seen_roots: Mutex<Vec<PathBuf>>,
}

impl MarkerAnalyzer {
    pub fn new(bucket: LanguageBucket) -> Self {
        Self {
            bucket,
            seen_roots: Mutex::new(Vec::new()),
        }
    }
}

fn baseline_for(bucket: LanguageBucket) -> &'static Baseline {
    match bucket {
        LanguageBucket::Script => &ESLINT_BASELINE,
        LanguageBucket::Markup => &HTMLHINT_BASELINE,
        LanguageBucket::Stylesheet => &STYLELINT_BASELINE,
    }
}

#[async_trait]
impl Analyzer for MarkerAnalyzer {
    fn name(&self) -> &str {
        "marker"
    }

    fn bucket(&self) -> LanguageBucket {
        self.bucket
    }

    fn resolve_config(&self, _root: &Path) -> ConfigResolution {
        ConfigResolution::Baseline(baseline_for(self.bucket))
    }

    async fn run(&self, request: AnalyzerRequest<'_>) -> Result<AnalysisArtifact, AnalyzerError> {
        self.seen_roots
            .lock()
            .expect("lock")
            .push(request.root.to_path_buf());

        let mut records: Vec<Value> = Vec::new();
        for file in request.files {
            let content = std::fs::read_to_string(request.root.join(file)).map_err(|e| {
                AnalyzerError::Io {
                    tool: "marker".to_string(),
                    source: e,
                }
            })?;
            let errors = content.lines().filter(|l| l.contains("ERROR")).count();
            let warnings = content.lines().filter(|l| l.contains("WARN")).count();
            records.push(json!({
                "filePath": file.display().to_string(),
                "errorCount": errors,
                "warningCount": warnings,
            }));
        }
        Ok(AnalysisArtifact::new(Value::Array(records)))
    }
}

/// Always fails the way a crashing tool would
pub struct BrokenAnalyzer(pub LanguageBucket);

#[async_trait]
impl Analyzer for BrokenAnalyzer {
    fn name(&self) -> &str {
        "broken"
    }

    fn bucket(&self) -> LanguageBucket {
        self.0
    }

    fn resolve_config(&self, _root: &Path) -> ConfigResolution {
        ConfigResolution::Baseline(baseline_for(self.0))
    }

    async fn run(&self, _request: AnalyzerRequest<'_>) -> Result<AnalysisArtifact, AnalyzerError> {
        Err(AnalyzerError::UnreadableOutput {
            tool: "broken".to_string(),
            status: Some(2),
            stderr: "Oops! Something went wrong!".to_string(),
        })
    }
}

/// Panics mid-run
pub struct PanickingAnalyzer(pub LanguageBucket);

#[async_trait]
impl Analyzer for PanickingAnalyzer {
    fn name(&self) -> &str {
        "panicking"
    }

    fn bucket(&self) -> LanguageBucket {
        self.0
    }

    fn resolve_config(&self, _root: &Path) -> ConfigResolution {
        ConfigResolution::Baseline(baseline_for(self.0))
    }

    async fn run(&self, _request: AnalyzerRequest<'_>) -> Result<AnalysisArtifact, AnalyzerError> {
        panic!("injected analyzer panic");
    }
}

pub fn marker_registry() -> AnalyzerRegistry {
    let mut registry = AnalyzerRegistry::new();
    for bucket in LanguageBucket::ALL {
        registry.register(Arc::new(MarkerAnalyzer::new(bucket)));
    }
    registry
}
