//! Versioned description of an asset set and the remote locations it is
//! fetched from.
//!
//! The on-disk format is the JSON `project.manifest` document. The reduced
//! `version.manifest` form carries only the version and the two remote URLs
//! and is parsed with [`Manifest::parse_version_only`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Result, UpdateError};
use crate::util::is_contained;

pub mod diff;
pub mod version;

pub use diff::{AssetDiff, DiffKind, diff};
pub use version::{VersionComparator, compare_versions, version_greater_or_equal};

/// Per-asset download progress recorded in the working manifest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DownloadState {
    Unstarted,
    Downloading,
    Succeeded,
    /// Never recorded: the asset did not take part in an update session.
    #[default]
    Unmarked,
}

impl DownloadState {
    fn is_unmarked(&self) -> bool {
        *self == DownloadState::Unmarked
    }

    /// Whether a resumed session still has to fetch an asset in this state.
    pub fn is_pending(self) -> bool {
        matches!(self, DownloadState::Unstarted | DownloadState::Downloading)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, alias = "md5", skip_serializing_if = "String::is_empty")]
    pub checksum: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub compressed: bool,
    #[serde(
        default,
        rename = "downloadState",
        skip_serializing_if = "DownloadState::is_unmarked"
    )]
    pub download_state: DownloadState,
}

impl Asset {
    pub fn new(path: impl Into<String>, size: u64, checksum: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            size,
            checksum: checksum.into(),
            compressed: false,
            download_state: DownloadState::Unmarked,
        }
    }

    /// Whether two descriptions of the same key refer to different content.
    ///
    /// Checksums decide when both sides carry one; otherwise size and path do.
    pub fn content_differs(&self, other: &Asset) -> bool {
        if !self.checksum.is_empty() && !other.checksum.is_empty() {
            return !self.checksum.eq_ignore_ascii_case(&other.checksum);
        }
        self.size != other.size || self.path != other.path
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestDocument {
    #[serde(default)]
    version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    engine_version: Option<String>,
    #[serde(default)]
    package_url: String,
    #[serde(default)]
    remote_version_url: String,
    #[serde(default)]
    remote_manifest_url: String,
    #[serde(default)]
    assets: BTreeMap<String, Asset>,
    #[serde(default)]
    search_paths: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct Manifest {
    pub version: String,
    pub engine_version: Option<String>,
    pub package_url: String,
    pub remote_version_url: String,
    pub remote_manifest_url: String,
    pub search_paths: Vec<String>,
    assets: BTreeMap<String, Asset>,
    root: PathBuf,
    loaded: bool,
    version_loaded: bool,
}

impl Manifest {
    /// An empty placeholder that reports `is_loaded() == false`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a full manifest document. The manifest root defaults to the
    /// directory holding the document.
    pub fn parse(path: &Path) -> Result<Self> {
        let doc = read_document(path)?;
        let mut manifest = Self::from_document(doc)?;
        manifest.root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        manifest.loaded = true;
        manifest.version_loaded = true;
        debug!(
            "manifest: parsed {} (version {}, {} assets)",
            path.display(),
            manifest.version,
            manifest.assets.len()
        );
        Ok(manifest)
    }

    /// Parse only the version id and remote URLs of a version document.
    pub fn parse_version_only(path: &Path) -> Result<Self> {
        let doc = read_document(path)?;
        Ok(Self {
            version: doc.version,
            engine_version: doc.engine_version,
            package_url: doc.package_url,
            remote_version_url: doc.remote_version_url,
            remote_manifest_url: doc.remote_manifest_url,
            version_loaded: true,
            ..Self::default()
        })
    }

    /// Build a loaded manifest from an in-memory JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let doc: ManifestDocument =
            serde_json::from_str(json).map_err(|source| UpdateError::Parse {
                path: PathBuf::from("<memory>"),
                source,
            })?;
        let mut manifest = Self::from_document(doc)?;
        manifest.loaded = true;
        manifest.version_loaded = true;
        Ok(manifest)
    }

    fn from_document(doc: ManifestDocument) -> Result<Self> {
        let mut assets = BTreeMap::new();
        for (key, mut asset) in doc.assets {
            if asset.path.is_empty() {
                asset.path = key.clone();
            }
            if !is_contained(&asset.path) {
                return Err(UpdateError::UnsafeAssetPath {
                    key,
                    path: asset.path,
                });
            }
            assets.insert(key, asset);
        }
        Ok(Self {
            version: doc.version,
            engine_version: doc.engine_version,
            package_url: doc.package_url,
            remote_version_url: doc.remote_version_url,
            remote_manifest_url: doc.remote_manifest_url,
            search_paths: doc.search_paths,
            assets,
            root: PathBuf::new(),
            loaded: false,
            version_loaded: false,
        })
    }

    /// Write the manifest, including recorded download states, to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let doc = ManifestDocument {
            version: self.version.clone(),
            engine_version: self.engine_version.clone(),
            package_url: self.package_url.clone(),
            remote_version_url: self.remote_version_url.clone(),
            remote_manifest_url: self.remote_manifest_url.clone(),
            assets: self.assets.clone(),
            search_paths: self.search_paths.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&doc).map_err(UpdateError::Serialize)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| UpdateError::io(parent, e))?;
        }
        fs::write(path, bytes).map_err(|e| UpdateError::io(path, e))
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_version_loaded(&self) -> bool {
        self.version_loaded
    }

    pub fn assets(&self) -> &BTreeMap<String, Asset> {
        &self.assets
    }

    pub fn asset(&self, key: &str) -> Option<&Asset> {
        self.assets.get(key)
    }

    pub fn insert_asset(&mut self, key: impl Into<String>, asset: Asset) {
        self.assets.insert(key.into(), asset);
    }

    pub fn asset_state(&self, key: &str) -> Option<DownloadState> {
        self.assets.get(key).map(|asset| asset.download_state)
    }

    /// Record the download state of `key`. Unknown keys are ignored.
    pub fn set_asset_state(&mut self, key: &str, state: DownloadState) {
        match self.assets.get_mut(key) {
            Some(asset) => asset.download_state = state,
            None => warn!("manifest: ignoring state {state:?} for unknown asset {key}"),
        }
    }

    /// Keys still incomplete in an interrupted session, in key order.
    pub fn pending_keys(&self) -> Vec<String> {
        self.assets
            .iter()
            .filter(|(_, asset)| asset.download_state.is_pending())
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn set_root(&mut self, root: impl Into<PathBuf>) {
        self.root = root.into();
    }

    /// Search path prefixes resolved under the manifest root.
    pub fn search_paths(&self) -> Vec<PathBuf> {
        self.search_paths
            .iter()
            .map(|prefix| self.root.join(prefix))
            .collect()
    }

    pub fn version_equals(&self, other: &Manifest) -> bool {
        self.version == other.version
    }
}

fn read_document(path: &Path) -> Result<ManifestDocument> {
    let bytes = fs::read(path).map_err(|e| UpdateError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|source| UpdateError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
