use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("no local manifest could be loaded")]
    NoLocalManifest,

    #[error("i/o error on '{path}': {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("failed to parse manifest '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("asset '{key}' has a path outside the storage root: '{path}'")]
    UnsafeAssetPath { key: String, path: String },

    #[error("failed to serialize manifest: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("unable to decompress '{path}': {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("transfer failed: {message}")]
    Transport {
        message: String,
        status: Option<u16>,
    },
}

impl UpdateError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, UpdateError>;
