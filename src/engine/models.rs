use std::path::PathBuf;

use crate::manifest::Manifest;

/// One schedulable fetch derived from a diff entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadUnit {
    pub custom_id: String,
    pub source_url: String,
    pub destination: PathBuf,
    /// 0 when unknown until the transport reports it.
    pub expected_size: u64,
}

/// Owner of the manifest that records per-asset download state.
#[derive(Debug, Default)]
pub(crate) enum TempSlot {
    /// No working manifest.
    #[default]
    Empty,
    /// Found on disk at startup; not yet matched against a remote version.
    Interrupted(Manifest),
    /// An interrupted session adopted for the current remote version.
    Resumed(Manifest),
    /// A fresh session: the remote manifest is the working copy.
    Fresh,
}

impl TempSlot {
    /// Whether this slot may continue a session for `remote`.
    pub(crate) fn resumes(&self, remote: &Manifest) -> bool {
        match self {
            TempSlot::Interrupted(temp) | TempSlot::Resumed(temp) => {
                temp.is_loaded() && temp.version_equals(remote)
            }
            TempSlot::Fresh => remote.is_loaded(),
            TempSlot::Empty => false,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        matches!(self, TempSlot::Empty)
    }
}
