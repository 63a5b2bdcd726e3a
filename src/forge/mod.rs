//! Forge access: repository references, visibility checks, CI artifact
//! discovery and source snapshot downloads

pub mod artifact;
pub mod client;
pub mod error;
pub mod github;
pub mod locator;

pub use client::{ForgeClient, LocatedArtifact, Visibility};
pub use error::ForgeError;
pub use github::{GitHubClient, GitHubSettings};
pub use locator::{LocatorError, RepositoryReference};

#[cfg(test)]
pub use client::MockForgeClient;
