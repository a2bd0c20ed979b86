//! Incremental asset updater.
//!
//! A local manifest describes the installed asset set; a remote manifest
//! describes the newest one. [`AssetsManager`] fetches the remote version,
//! downloads only the assets that changed into a working tree next to the
//! storage root, and promotes that tree once every asset has arrived. An
//! interrupted batch resumes from the per-asset states recorded in the
//! working manifest.

pub mod config;
pub mod decode;
pub mod engine;
pub mod env;
pub mod error;
pub mod events;
pub mod manifest;
pub mod networking;
pub mod storage;
pub mod util;
pub mod verify;

pub use config::UpdaterConfig;
pub use engine::{AssetsManager, DownloadUnit, UpdateState};
pub use error::{Result, UpdateError};
pub use events::{EventCode, UpdateEvent};
pub use manifest::{Asset, DownloadState, Manifest};
pub use networking::{DownloadTask, HttpTransport, TaskEvent, TaskSink, Transport};
