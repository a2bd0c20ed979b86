use std::fmt;

/// Asset id carried by progress events for the version probe download.
pub const VERSION_ID: &str = "@version";
/// Asset id carried by progress events for the manifest download.
pub const MANIFEST_ID: &str = "@manifest";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventCode {
    ErrorNoLocalManifest,
    ErrorDownloadManifest,
    ErrorParseManifest,
    NewVersionFound,
    AlreadyUpToDate,
    UpdateProgression,
    AssetUpdated,
    ErrorUpdating,
    UpdateFinished,
    UpdateFailed,
    ErrorDecompress,
}

impl EventCode {
    /// Codes that end the current check/update entry.
    pub fn ends_session(self) -> bool {
        matches!(
            self,
            EventCode::ErrorUpdating
                | EventCode::ErrorParseManifest
                | EventCode::ErrorNoLocalManifest
                | EventCode::ErrorDecompress
                | EventCode::ErrorDownloadManifest
                | EventCode::UpdateFailed
                | EventCode::UpdateFinished
                | EventCode::AlreadyUpToDate
        )
    }

    pub fn is_error(self) -> bool {
        matches!(
            self,
            EventCode::ErrorNoLocalManifest
                | EventCode::ErrorDownloadManifest
                | EventCode::ErrorParseManifest
                | EventCode::ErrorUpdating
                | EventCode::ErrorDecompress
                | EventCode::UpdateFailed
        )
    }
}

impl fmt::Display for EventCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EventCode::ErrorNoLocalManifest => "no local manifest",
            EventCode::ErrorDownloadManifest => "manifest download failed",
            EventCode::ErrorParseManifest => "manifest parse failed",
            EventCode::NewVersionFound => "new version found",
            EventCode::AlreadyUpToDate => "already up to date",
            EventCode::UpdateProgression => "progress",
            EventCode::AssetUpdated => "asset updated",
            EventCode::ErrorUpdating => "asset update failed",
            EventCode::UpdateFinished => "update finished",
            EventCode::UpdateFailed => "update failed",
            EventCode::ErrorDecompress => "decompress failed",
        };
        f.write_str(label)
    }
}

/// One entry of the ordered notification stream.
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateEvent {
    pub code: EventCode,
    /// Byte-weighted completion, 0..=100.
    pub percent: f32,
    /// File-count completion, 0..=100.
    pub percent_by_file: f32,
    pub asset_id: String,
    pub message: String,
    /// Transport-level error code, e.g. an HTTP status.
    pub error_code: Option<i32>,
    pub internal_error_code: Option<i32>,
}
