//! Project configuration detection and versioned baseline rule sets

use serde_json::Value;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Bumped whenever any baseline rule set changes, so stored reports record
/// which rules produced them
pub const BASELINE_VERSION: &str = "1";

/// A built-in rule set used when a project ships no configuration
#[derive(Debug, PartialEq, Eq)]
pub struct Baseline {
    pub tool: &'static str,
    pub version: &'static str,
    pub contents: &'static str,
    /// Suffix of the temporary file the rules are written to
    pub file_suffix: &'static str,
}

impl Baseline {
    /// Writes the rules to a temporary file removed when the handle drops
    pub fn write_temp(&self) -> io::Result<NamedTempFile> {
        let mut file = tempfile::Builder::new()
            .prefix(&format!("repograde-{}-", self.tool))
            .suffix(self.file_suffix)
            .tempfile()?;
        file.write_all(self.contents.as_bytes())?;
        file.flush()?;
        Ok(file)
    }
}

pub static ESLINT_BASELINE: Baseline = Baseline {
    tool: "eslint",
    version: BASELINE_VERSION,
    contents: r#"{
  "root": true,
  "env": { "browser": true, "node": true, "es2021": true },
  "extends": ["eslint:recommended"],
  "parserOptions": { "ecmaVersion": 12, "sourceType": "module" },
  "rules": {
    "no-unused-vars": "error",
    "no-console": "warn",
    "semi": ["error", "always"],
    "quotes": ["warn", "single"]
  }
}
"#,
    file_suffix: ".json",
};

pub static HTMLHINT_BASELINE: Baseline = Baseline {
    tool: "htmlhint",
    version: BASELINE_VERSION,
    contents: r#"{
  "tagname-lowercase": true,
  "attr-lowercase": true,
  "attr-value-double-quotes": true,
  "attr-no-duplication": true,
  "doctype-first": true,
  "tag-pair": true,
  "spec-char-escape": true,
  "id-unique": true,
  "src-not-empty": true,
  "title-require": true,
  "alt-require": true
}
"#,
    file_suffix: ".json",
};

pub static STYLELINT_BASELINE: Baseline = Baseline {
    tool: "stylelint",
    version: BASELINE_VERSION,
    contents: r#"{
  "defaultSeverity": "warning",
  "rules": {
    "color-no-invalid-hex": [true, { "severity": "error" }],
    "property-no-unknown": [true, { "severity": "error" }],
    "unit-no-unknown": [true, { "severity": "error" }],
    "block-no-empty": true,
    "comment-no-empty": true,
    "declaration-block-no-duplicate-properties": true,
    "font-family-no-missing-generic-family-keyword": true,
    "no-duplicate-selectors": true,
    "selector-pseudo-class-no-unknown": true
  }
}
"#,
    file_suffix: ".json",
};

/// Where a project keeps its own configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectConfig {
    File(PathBuf),
    /// A key inside `package.json`
    ManifestKey(&'static str),
}

/// Which rules an analyzer run uses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigResolution {
    Project(ProjectConfig),
    Baseline(&'static Baseline),
}

impl ConfigResolution {
    pub fn is_baseline(&self) -> bool {
        matches!(self, ConfigResolution::Baseline(_))
    }
}

impl fmt::Display for ConfigResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigResolution::Project(ProjectConfig::File(path)) => {
                write!(f, "project:{}", path.display())
            }
            ConfigResolution::Project(ProjectConfig::ManifestKey(key)) => {
                write!(f, "project:package.json#{}", key)
            }
            ConfigResolution::Baseline(baseline) => write!(f, "baseline@{}", baseline.version),
        }
    }
}

/// Config file names and manifest key an analyzer recognises
#[derive(Debug, Clone, Copy)]
pub struct ConfigProbe {
    pub file_names: &'static [&'static str],
    pub manifest_key: Option<&'static str>,
}

impl ConfigProbe {
    /// Looks for project configuration at the tree root, falling back to the
    /// baseline. A malformed `package.json` counts as absent.
    pub fn resolve(&self, root: &Path, baseline: &'static Baseline) -> ConfigResolution {
        if let Some(name) = self
            .file_names
            .iter()
            .find(|name| root.join(name).is_file())
        {
            debug!(config = %name, "Using project configuration");
            return ConfigResolution::Project(ProjectConfig::File(PathBuf::from(name)));
        }

        if let Some(key) = self.manifest_key {
            if manifest_has_key(&root.join("package.json"), key) {
                debug!(key, "Using project configuration from package.json");
                return ConfigResolution::Project(ProjectConfig::ManifestKey(key));
            }
        }

        ConfigResolution::Baseline(baseline)
    }
}

fn manifest_has_key(path: &Path, key: &str) -> bool {
    let Ok(content) = fs::read_to_string(path) else {
        return false;
    };
    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(map)) => map.get(key).is_some_and(|v| !v.is_null()),
        _ => false,
    }
}
