//! Mock attribute source implementation for testing and development.
//!
//! Attribute walks and directory listings are registered up front; every
//! query is recorded so tests can assert which nodes were looked at.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::{
    error::{HardwareError, Result},
    traits::AttributeSource,
};

/// Mock attribute source for testing and development.
///
/// Nodes without a registered walk answer with an empty walk; nodes
/// registered with [`with_failure`](Self::with_failure) answer with an error.
/// Directories without registered entries cannot be listed.
///
/// # Examples
///
/// ```
/// use periphery_hardware::mock::MockAttributes;
/// use periphery_hardware::traits::AttributeSource;
///
/// #[tokio::main]
/// async fn main() -> periphery_hardware::Result<()> {
///     let source = MockAttributes::new()
///         .with_walk("/dev/video0", "ATTRS{serial}==\"ABC\"")
///         .with_dir("/dev", ["video0"]);
///
///     assert!(source.query_attributes("/dev/video0").await?.contains("ABC"));
///     assert_eq!(source.list_dir("/dev".as_ref()).await?, vec!["video0"]);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockAttributes {
    walks: HashMap<String, String>,
    failures: HashSet<String>,
    dirs: HashMap<PathBuf, Vec<String>>,
    queried: Arc<Mutex<Vec<String>>>,
}

impl MockAttributes {
    /// Create a source with no registered nodes or directories.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the attribute walk returned for `node`.
    pub fn with_walk(mut self, node: impl Into<String>, walk: impl Into<String>) -> Self {
        self.walks.insert(node.into(), walk.into());
        self
    }

    /// Make attribute queries for `node` fail.
    pub fn with_failure(mut self, node: impl Into<String>) -> Self {
        self.failures.insert(node.into());
        self
    }

    /// Register the entries listed for `dir`.
    pub fn with_dir<I, S>(mut self, dir: impl Into<PathBuf>, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dirs
            .insert(dir.into(), entries.into_iter().map(Into::into).collect());
        self
    }

    /// Nodes queried so far, in query order.
    pub fn queried(&self) -> Vec<String> {
        self.queried
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AttributeSource for MockAttributes {
    async fn query_attributes(&self, node: &str) -> Result<String> {
        self.queried
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(node.to_string());

        if self.failures.contains(node) {
            return Err(HardwareError::attribute_query(node, "mock failure"));
        }

        Ok(self.walks.get(node).cloned().unwrap_or_default())
    }

    async fn list_dir(&self, dir: &Path) -> Result<Vec<String>> {
        self.dirs.get(dir).cloned().ok_or_else(|| {
            HardwareError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found", dir.display()),
            ))
        })
    }
}
