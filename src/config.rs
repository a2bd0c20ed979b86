use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::manifest::{Asset, VersionComparator};

pub const DEFAULT_MAX_CONCURRENT_TASKS: usize = 32;
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(45);

/// Post-download check of a fetched file against its manifest entry.
pub type AssetVerifier = Arc<dyn Fn(&Path, &Asset) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct UpdaterConfig {
    /// Bundled manifest shipped with the application.
    pub manifest_path: PathBuf,
    /// Canonical storage root; the working tree lives next to it.
    pub storage_root: PathBuf,
    pub max_concurrent_tasks: usize,
    pub connection_timeout: Duration,
    /// Whole-transfer limit applied to every task; `None` means unbounded.
    pub transfer_timeout: Option<Duration>,
    pub version_compare: Option<VersionComparator>,
    pub verifier: Option<AssetVerifier>,
}

impl UpdaterConfig {
    pub fn new(manifest_path: impl Into<PathBuf>, storage_root: impl Into<PathBuf>) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            storage_root: storage_root.into(),
            max_concurrent_tasks: DEFAULT_MAX_CONCURRENT_TASKS,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            transfer_timeout: None,
            version_compare: None,
            verifier: None,
        }
    }

    pub fn with_max_concurrent_tasks(mut self, max: usize) -> Self {
        self.max_concurrent_tasks = max.max(1);
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    pub fn with_transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout = Some(timeout);
        self
    }

    pub fn with_version_compare<F>(mut self, compare: F) -> Self
    where
        F: Fn(&str, &str) -> Ordering + Send + Sync + 'static,
    {
        self.version_compare = Some(Arc::new(compare));
        self
    }

    pub fn with_verifier<F>(mut self, verify: F) -> Self
    where
        F: Fn(&Path, &Asset) -> bool + Send + Sync + 'static,
    {
        self.verifier = Some(Arc::new(verify));
        self
    }
}

impl std::fmt::Debug for UpdaterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdaterConfig")
            .field("manifest_path", &self.manifest_path)
            .field("storage_root", &self.storage_root)
            .field("max_concurrent_tasks", &self.max_concurrent_tasks)
            .field("connection_timeout", &self.connection_timeout)
            .field("transfer_timeout", &self.transfer_timeout)
            .field("version_compare", &self.version_compare.is_some())
            .field("verifier", &self.verifier.is_some())
            .finish()
    }
}
