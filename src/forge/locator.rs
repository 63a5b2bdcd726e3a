//! Repository reference parsing
//!
//! Turns a submitted forge URL such as `https://github.com/acme/demo` into a
//! structured [`RepositoryReference`]. No network access happens here.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use url::Url;

/// Errors produced while parsing a repository reference
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocatorError {
    /// Input could not be parsed as an absolute URL
    #[error("Not a repository URL: {input}")]
    Unparsable { input: String },

    /// URL path does not contain both an owner and a repository name
    #[error("Repository URL must contain an owner and a name: {input}")]
    MissingSegments { input: String },
}

/// Owner/name identity of a repository on the forge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryReference {
    owner: String,
    name: String,
}

impl RepositoryReference {
    /// Parses a forge URL, consuming only the first two path segments.
    ///
    /// Query strings, fragments and any further path segments (`/tree/main`,
    /// `/issues`, ...) are ignored. A trailing `.git` on the name is dropped so
    /// clone URLs resolve to the same repository as browser URLs.
    ///
    /// ```
    /// use repograde::forge::RepositoryReference;
    ///
    /// let repo = RepositoryReference::parse("https://github.com/acme/demo/tree/main").unwrap();
    /// assert_eq!(repo.owner(), "acme");
    /// assert_eq!(repo.name(), "demo");
    /// ```
    pub fn parse(input: &str) -> Result<Self, LocatorError> {
        let trimmed = input.trim();
        let url = Url::parse(trimmed).map_err(|_| LocatorError::Unparsable {
            input: trimmed.to_string(),
        })?;

        let mut segments = url.path().trim_start_matches('/').split('/');
        let owner = segments.next().unwrap_or_default();
        let name = segments.next().unwrap_or_default();
        let name = name.strip_suffix(".git").unwrap_or(name);

        if owner.is_empty() || name.is_empty() {
            return Err(LocatorError::MissingSegments {
                input: trimmed.to_string(),
            });
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `owner/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepositoryReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}
