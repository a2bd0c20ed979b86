//! The update orchestrator.
//!
//! [`AssetsManager`] owns every manifest slot, the scheduler and the progress
//! counters. It is driven from a single logical owner: the caller invokes
//! [`AssetsManager::check_update`] / [`AssetsManager::update`], and transport
//! and decode completions come back through the manager's inbox and are
//! applied one at a time by [`AssetsManager::handle_task_event`] (usually via
//! [`AssetsManager::run_until_settled`]). Nothing here takes a lock.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::mpsc;

use crate::config::UpdaterConfig;
use crate::decode::{ArchiveDecoder, Decoder};
use crate::error::{Result, UpdateError};
use crate::events::{EventCode, MANIFEST_ID, UpdateEvent, VERSION_ID};
use crate::manifest::{DiffKind, DownloadState, Manifest, diff, version_greater_or_equal};
use crate::networking::{DownloadTask, TaskEvent, TaskSink, Transport};
use crate::storage::StorageManager;
use crate::util::asset_url;

use models::TempSlot;
use progress::Progress;
use scheduler::Scheduler;
use state::{Step, UpdateEntry, check_step, update_step};

pub mod models;
pub(crate) mod progress;
pub(crate) mod scheduler;
pub mod state;

pub use models::DownloadUnit;
pub use state::UpdateState;

pub struct AssetsManager {
    config: UpdaterConfig,
    storage: StorageManager,
    transport: Arc<dyn Transport>,
    decoder: Arc<dyn Decoder>,
    updates: mpsc::UnboundedSender<UpdateEvent>,
    inbox_tx: mpsc::UnboundedSender<TaskEvent>,
    inbox: mpsc::UnboundedReceiver<TaskEvent>,
    state: UpdateState,
    entry: UpdateEntry,
    local: Manifest,
    remote: Manifest,
    temp: TempSlot,
    scheduler: Scheduler,
    progress: Progress,
    pending_decodes: usize,
}

impl AssetsManager {
    /// Load the local and interrupted manifests and prepare storage.
    ///
    /// Emits `ErrorNoLocalManifest` on `updates` when neither the bundled nor
    /// a cached manifest can be used.
    pub fn new(
        config: UpdaterConfig,
        transport: Arc<dyn Transport>,
        updates: mpsc::UnboundedSender<UpdateEvent>,
    ) -> Self {
        let storage = StorageManager::new(&config.storage_root);
        if let Err(err) = storage.ensure_dirs() {
            warn!("init: {err}");
        }
        let (inbox_tx, inbox) = mpsc::unbounded_channel();
        let scheduler = Scheduler::new(config.max_concurrent_tasks);

        let mut manager = Self {
            config,
            storage,
            transport,
            decoder: Arc::new(ArchiveDecoder),
            updates,
            inbox_tx,
            inbox,
            state: UpdateState::Unchecked,
            entry: UpdateEntry::None,
            local: Manifest::empty(),
            remote: Manifest::empty(),
            temp: TempSlot::Empty,
            scheduler,
            progress: Progress::default(),
            pending_decodes: 0,
        };
        manager.local = manager.load_local_manifest();
        manager.temp = manager.load_interrupted_manifest();
        if !manager.local.is_loaded() {
            error!("init: no local manifest file found");
            manager.report_no_local_manifest();
        }
        manager
    }

    /// Replace the archive decoder used for compressed assets.
    pub fn with_decoder(mut self, decoder: Arc<dyn Decoder>) -> Self {
        self.decoder = decoder;
        self
    }

    fn load_local_manifest(&self) -> Manifest {
        let cached_path = self.storage.cached_manifest_path();
        let cached = if cached_path.exists() {
            match Manifest::parse(&cached_path) {
                Ok(cached) => Some(cached),
                Err(err) => {
                    warn!("init: discarding unreadable cached manifest: {err}");
                    self.storage.remove_cached_manifest();
                    None
                }
            }
        } else {
            None
        };

        let bundled = match Manifest::parse(&self.config.manifest_path) {
            Ok(bundled) => bundled,
            Err(err) => {
                error!("init: unable to load bundled manifest: {err}");
                return Manifest::empty();
            }
        };

        match cached {
            Some(cached)
                if !version_greater_or_equal(
                    &bundled,
                    &cached,
                    self.config.version_compare.as_ref(),
                ) =>
            {
                info!("init: using cached manifest version {}", cached.version);
                cached
            }
            Some(cached) => {
                info!(
                    "init: bundled version {} supersedes cached {}; clearing storage",
                    bundled.version, cached.version
                );
                if let Err(err) = self.storage.reset_root() {
                    warn!("init: {err}");
                }
                bundled
            }
            None => bundled,
        }
    }

    fn load_interrupted_manifest(&self) -> TempSlot {
        let path = self.storage.temp_manifest_path();
        if !path.exists() {
            return TempSlot::Empty;
        }
        match Manifest::parse(&path) {
            Ok(temp) => {
                info!("init: found interrupted update for version {}", temp.version);
                TempSlot::Interrupted(temp)
            }
            Err(err) => {
                warn!("init: removing unreadable temporary manifest: {err}");
                if let Err(err) = self.storage.purge_temp() {
                    warn!("init: {err}");
                }
                TempSlot::Empty
            }
        }
    }

    pub fn state(&self) -> UpdateState {
        self.state
    }

    pub fn local_manifest(&self) -> &Manifest {
        &self.local
    }

    pub fn remote_manifest(&self) -> &Manifest {
        &self.remote
    }

    pub fn storage_root(&self) -> &Path {
        self.storage.root()
    }

    /// Assets of the last batch that failed and have not succeeded since.
    pub fn failed_assets(&self) -> &BTreeMap<String, DownloadUnit> {
        self.scheduler.failed()
    }

    /// Transfers currently submitted and not yet completed.
    pub fn in_flight(&self) -> usize {
        self.scheduler.in_flight()
    }

    /// Search path prefixes of the effective manifest, for the host to
    /// prepend to its own lookup order.
    pub fn search_paths(&self) -> Vec<PathBuf> {
        self.local.search_paths()
    }

    /// Where the promoted copy of `key` lives, if the local manifest lists it.
    pub fn resolve_local_path(&self, key: &str) -> Option<PathBuf> {
        self.local
            .asset(key)
            .map(|asset| self.storage.asset_path(&asset.path))
    }

    /// Remove both the canonical and the working storage trees.
    pub fn discard_local_state(&self) -> Result<()> {
        info!("discard: removing {}", self.storage.root().display());
        self.storage.discard_all()
    }

    /// Whether completions are still expected.
    pub fn is_busy(&self) -> bool {
        self.state.awaits_transport() || self.pending_decodes > 0
    }

    /// Apply completions until nothing is outstanding.
    pub async fn run_until_settled(&mut self) {
        while self.is_busy() {
            match self.inbox.recv().await {
                Some(event) => self.handle_task_event(event),
                None => break,
            }
        }
    }

    /// Apply every completion already queued without waiting; returns how
    /// many were handled.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.inbox.try_recv() {
            self.handle_task_event(event);
            handled += 1;
        }
        handled
    }

    /// Check for a new version without downloading assets.
    pub fn check_update(&mut self) {
        if !self.begin_entry("check_update", UpdateEntry::CheckUpdate) {
            return;
        }
        self.apply(check_step(self.state));
    }

    /// Check for a new version and download it.
    pub fn update(&mut self) {
        if !self.begin_entry("update", UpdateEntry::DoUpdate) {
            return;
        }
        let step = update_step(self.state, self.remote.is_loaded());
        self.apply(step);
    }

    /// Download again the assets that failed in the previous batch.
    pub fn retry_failed(&mut self) {
        if !self.local.is_loaded() {
            error!("retry_failed: no local manifest file found");
            self.report_no_local_manifest();
            return;
        }
        if self.state != UpdateState::FailToUpdate || self.working().is_none() {
            warn!(
                "retry_failed: no failed batch to retry in state {:?}",
                self.state
            );
            return;
        }

        let units: Vec<DownloadUnit> = self.scheduler.failed().values().cloned().collect();
        info!("retry_failed: start update of {} failed assets", units.len());
        self.state = UpdateState::Updating;
        self.progress.reset(units.len());
        let empty = units.is_empty();
        self.scheduler.load(units);
        if empty {
            self.on_units_finished();
        } else {
            self.batch_download();
        }
    }

    fn begin_entry(&mut self, caller: &str, entry: UpdateEntry) -> bool {
        if self.entry != UpdateEntry::None {
            warn!("{caller}: ignored, {:?} is already active", self.entry);
            return false;
        }
        if !self.local.is_loaded() {
            error!("{caller}: no local manifest file found");
            self.report_no_local_manifest();
            return false;
        }
        self.entry = entry;
        true
    }

    fn apply(&mut self, step: Step) {
        debug!("apply: {:?} from {:?}", step, self.state);
        match step {
            Step::ProbeVersion => {
                self.state = UpdateState::PredownloadVersion;
                self.download_version();
            }
            Step::ParseVersion => self.parse_version(),
            Step::FetchManifest => {
                self.state = UpdateState::PredownloadManifest;
                self.download_manifest();
            }
            Step::ParseManifest => self.parse_manifest(),
            Step::StartUpdate => self.start_update(),
            Step::Notify(code) => self.notify(code),
            Step::Settle => self.entry = UpdateEntry::None,
            Step::Wait => debug!("apply: waiting on transfer in {:?}", self.state),
        }
    }

    fn local_is_current(&self) -> bool {
        version_greater_or_equal(&self.local, &self.remote, self.config.version_compare.as_ref())
    }

    fn download_version(&mut self) {
        if self.state > UpdateState::PredownloadVersion {
            return;
        }
        let url = self.local.remote_version_url.clone();
        if url.is_empty() {
            info!("download_version: no version file found, step skipped");
            self.state = UpdateState::PredownloadManifest;
            self.download_manifest();
            return;
        }
        self.state = UpdateState::DownloadingVersion;
        let dest = self.storage.version_path();
        self.submit(VERSION_ID, url, dest);
    }

    fn parse_version(&mut self) {
        if self.state != UpdateState::VersionLoaded {
            return;
        }
        match Manifest::parse_version_only(&self.storage.version_path()) {
            Err(err) => {
                info!("parse_version: {err}; step skipped");
                self.state = UpdateState::PredownloadManifest;
                self.download_manifest();
            }
            Ok(remote) => {
                self.replace_remote(remote);
                if self.local_is_current() {
                    self.mark_up_to_date();
                    return;
                }
                self.state = UpdateState::NeedUpdate;
                let continue_update = self.entry == UpdateEntry::DoUpdate;
                self.notify(EventCode::NewVersionFound);
                if continue_update {
                    self.state = UpdateState::PredownloadManifest;
                    self.download_manifest();
                }
            }
        }
    }

    fn download_manifest(&mut self) {
        if self.state != UpdateState::PredownloadManifest {
            return;
        }
        let url = Some(&self.remote)
            .filter(|remote| remote.is_version_loaded())
            .map(|remote| remote.remote_manifest_url.clone())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| self.local.remote_manifest_url.clone());
        if url.is_empty() {
            error!("download_manifest: no manifest file found, check update failed");
            self.notify(EventCode::ErrorDownloadManifest);
            self.state = UpdateState::Unchecked;
            return;
        }
        self.state = UpdateState::DownloadingManifest;
        let dest = self.storage.temp_manifest_path();
        self.submit(MANIFEST_ID, url, dest);
    }

    fn parse_manifest(&mut self) {
        if self.state != UpdateState::ManifestLoaded {
            return;
        }
        match Manifest::parse(&self.storage.temp_manifest_path()) {
            Err(err) => {
                error!("parse_manifest: {err}");
                self.emit(EventCode::ErrorParseManifest, "", err.to_string(), None, None);
                self.state = UpdateState::Unchecked;
            }
            Ok(remote) => {
                self.replace_remote(remote);
                if self.local_is_current() {
                    self.mark_up_to_date();
                    return;
                }
                self.state = UpdateState::NeedUpdate;
                self.notify(EventCode::NewVersionFound);
                if self.entry == UpdateEntry::DoUpdate {
                    self.start_update();
                }
            }
        }
    }

    /// A fresh session keeps its download states in the remote slot; moving
    /// it aside lets `start_update` resume or discard it by version.
    fn replace_remote(&mut self, remote: Manifest) {
        let previous = std::mem::replace(&mut self.remote, remote);
        if matches!(self.temp, TempSlot::Fresh) {
            self.temp = TempSlot::Interrupted(previous);
        }
    }

    fn mark_up_to_date(&mut self) {
        info!(
            "check: local version {} is current (remote {})",
            self.local.version, self.remote.version
        );
        self.state = UpdateState::UpToDate;
        if let Err(err) = self.storage.purge_temp() {
            warn!("check: {err}");
        }
        self.temp = TempSlot::Empty;
        self.notify(EventCode::AlreadyUpToDate);
    }

    fn start_update(&mut self) {
        if !matches!(
            self.state,
            UpdateState::NeedUpdate | UpdateState::FailToUpdate
        ) {
            return;
        }
        self.state = UpdateState::Updating;
        self.scheduler.clear_batch();
        self.scheduler.clear_failed();
        self.progress.reset(0);

        let temp = std::mem::take(&mut self.temp);
        if temp.resumes(&self.remote) {
            self.temp = match temp {
                TempSlot::Interrupted(manifest) | TempSlot::Resumed(manifest) => {
                    TempSlot::Resumed(manifest)
                }
                other => other,
            };
            // The manifest download overwrote the persisted states on disk.
            self.save_working();
            let units = self.resume_units();
            let message = format!(
                "Resuming from previous unfinished update, {} files remains to be finished.",
                units.len()
            );
            info!("start_update: {message}");
            self.begin_batch(units, message);
            return;
        }

        if !temp.is_empty() {
            info!("start_update: discarding outdated temporary files");
            if let Err(err) = self.storage.reset_temp() {
                warn!("start_update: {err}");
            }
            if let Err(err) = self.remote.save(&self.storage.temp_manifest_path()) {
                warn!("start_update: {err}");
            }
        }
        self.temp = TempSlot::Fresh;

        let changes = diff(&self.local, &self.remote);
        if changes.is_empty() {
            info!("start_update: no asset changes");
            self.update_succeed();
            return;
        }

        let mut units = Vec::new();
        for (key, change) in &changes {
            if change.kind == DiffKind::Deleted {
                debug!("start_update: {key} removed in remote version");
                continue;
            }
            units.push(DownloadUnit {
                custom_id: key.clone(),
                source_url: asset_url(&self.remote.package_url, &change.asset.path),
                destination: self.storage.temp_asset_path(&change.asset.path),
                expected_size: change.asset.size,
            });
        }
        for unit in &units {
            self.remote
                .set_asset_state(&unit.custom_id, DownloadState::Unstarted);
        }
        self.save_working();

        let message = format!(
            "Start to update {} files from remote package.",
            units.len()
        );
        info!("start_update: {message}");
        self.begin_batch(units, message);
    }

    fn resume_units(&self) -> Vec<DownloadUnit> {
        let Some(working) = self.working() else {
            return Vec::new();
        };
        working
            .pending_keys()
            .into_iter()
            .filter_map(|key| {
                let asset = working.asset(&key)?;
                Some(DownloadUnit {
                    source_url: asset_url(&working.package_url, &asset.path),
                    destination: self.storage.temp_asset_path(&asset.path),
                    expected_size: asset.size,
                    custom_id: key,
                })
            })
            .collect()
    }

    fn begin_batch(&mut self, units: Vec<DownloadUnit>, message: String) {
        self.progress.reset(units.len());
        self.scheduler.load(units);
        self.emit(EventCode::UpdateProgression, "", message, None, None);
        self.batch_download();
    }

    fn batch_download(&mut self) {
        let (bytes, sized) = self.scheduler.seed_queue();
        self.progress.seed_known_sizes(bytes, sized);
        self.admit_next();
    }

    fn admit_next(&mut self) {
        if self.progress.is_drained() {
            self.on_units_finished();
            return;
        }

        while let Some(unit) = self.scheduler.admit() {
            if let Some(parent) = unit.destination.parent()
                && let Err(err) = fs::create_dir_all(parent)
            {
                warn!("admit: unable to create {}: {}", parent.display(), err);
            }
            self.set_working_state(&unit.custom_id, DownloadState::Downloading);
            self.submit(&unit.custom_id, unit.source_url, unit.destination);
        }
        debug!(
            "admit: {} in flight, {} queued, {} of {} waiting",
            self.scheduler.in_flight(),
            self.scheduler.queued(),
            self.progress.waiting(),
            self.progress.total_to_download()
        );

        if self.progress.checkpoint_due() {
            debug!(
                "admit: checkpoint at {:.1}% of files",
                self.progress.percent_by_file()
            );
            self.save_working();
        }
    }

    fn on_units_finished(&mut self) {
        let failed = self.scheduler.failed().len();
        if failed > 0 {
            self.save_working();
            self.state = UpdateState::FailToUpdate;
            warn!("update: {failed} assets failed to update");
            self.emit(
                EventCode::UpdateFailed,
                "",
                format!("{failed} assets failed to update"),
                None,
                None,
            );
        } else if self.state == UpdateState::Updating {
            self.update_succeed();
        }
    }

    fn update_succeed(&mut self) {
        self.save_working();
        if let Err(err) = self.storage.promote() {
            error!("update_succeed: {err}");
            self.state = UpdateState::FailToUpdate;
            self.emit(EventCode::UpdateFailed, "", err.to_string(), None, None);
            return;
        }

        let mut promoted = std::mem::take(&mut self.remote);
        promoted.set_root(self.storage.root());
        info!("update_succeed: now at version {}", promoted.version);
        self.local = promoted;
        self.temp = TempSlot::Empty;
        self.scheduler.clear_batch();
        self.state = UpdateState::UpToDate;
        self.notify(EventCode::UpdateFinished);
    }

    /// Apply one completion delivered to the inbox.
    pub fn handle_task_event(&mut self, event: TaskEvent) {
        match event {
            TaskEvent::Progress {
                id,
                received,
                expected,
            } => self.on_progress(&id, received, expected),
            TaskEvent::Succeeded { id, url, dest } => {
                debug!("complete: {id} <- {url}");
                self.on_success(id, dest)
            }
            TaskEvent::Failed {
                id,
                message,
                error_code,
                internal_error_code,
            } => self.on_error(&id, message, error_code, internal_error_code),
            TaskEvent::Decoded {
                id,
                archive,
                result,
            } => self.on_decoded(id, &archive, result),
        }
    }

    fn on_progress(&mut self, id: &str, received: u64, expected: Option<u64>) {
        if id == VERSION_ID || id == MANIFEST_ID {
            self.progress.record_document(received, expected);
            self.notify_asset(EventCode::UpdateProgression, id);
            return;
        }
        let Some(unit_size) = self.scheduler.unit(id).map(|unit| unit.expected_size) else {
            debug!("progress: ignoring unknown task {id}");
            return;
        };
        let (changed, first_report) =
            self.progress
                .record_bytes(id, received, expected, unit_size);
        if first_report {
            self.set_working_state(id, DownloadState::Downloading);
        }
        if changed.is_some() && self.state == UpdateState::Updating {
            self.notify_asset(EventCode::UpdateProgression, id);
        }
    }

    fn on_success(&mut self, id: String, dest: PathBuf) {
        if id == VERSION_ID {
            self.state = UpdateState::VersionLoaded;
            self.parse_version();
            return;
        }
        if id == MANIFEST_ID {
            self.state = UpdateState::ManifestLoaded;
            self.parse_manifest();
            return;
        }

        let asset = self.remote.asset(&id).cloned();
        let verified = match (&self.config.verifier, &asset) {
            (Some(verify), Some(asset)) => verify(dest.as_path(), asset),
            _ => true,
        };
        if !verified {
            self.file_error(
                &id,
                "Asset file verification failed after downloaded".into(),
                None,
                None,
            );
            return;
        }

        if asset.is_some_and(|asset| asset.compressed) {
            self.decompress(id, dest);
        } else {
            self.file_success(&id);
        }
    }

    fn on_error(
        &mut self,
        id: &str,
        message: String,
        error_code: Option<i32>,
        internal_error_code: Option<i32>,
    ) {
        if id == VERSION_ID {
            info!("download_version: failed ({message}), step skipped");
            self.state = UpdateState::PredownloadManifest;
            self.download_manifest();
        } else if id == MANIFEST_ID {
            error!("download_manifest: {message}");
            self.emit(
                EventCode::ErrorDownloadManifest,
                id,
                message,
                error_code,
                internal_error_code,
            );
            self.state = UpdateState::FailToUpdate;
        } else {
            self.file_error(id, message, error_code, internal_error_code);
        }
    }

    /// Unpack on a blocking worker; the result comes back through the inbox.
    fn decompress(&mut self, id: String, archive: PathBuf) {
        self.pending_decodes += 1;
        let decoder = Arc::clone(&self.decoder);
        let sink = TaskSink::new(self.inbox_tx.clone());
        let job = move || {
            let result = decoder.decode(&archive).map_err(|err| err.to_string());
            let _ = fs::remove_file(&archive);
            sink.send(TaskEvent::Decoded {
                id,
                archive,
                result,
            });
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(job);
            }
            Err(_) => job(),
        }
    }

    fn on_decoded(&mut self, id: String, archive: &Path, result: std::result::Result<(), String>) {
        self.pending_decodes = self.pending_decodes.saturating_sub(1);
        match result {
            Ok(()) => self.file_success(&id),
            Err(reason) => {
                let _ = fs::remove_file(archive);
                let message = format!("Unable to decompress file {}: {reason}", archive.display());
                warn!("decompress: {message}");
                self.emit(EventCode::ErrorDecompress, "", message.clone(), None, None);
                self.file_error(&id, message, None, None);
            }
        }
    }

    fn file_success(&mut self, id: &str) {
        self.set_working_state(id, DownloadState::Succeeded);
        self.scheduler.clear_failure(id);

        if self.scheduler.unit(id).is_some() {
            self.progress.complete_one();
            self.notify(EventCode::UpdateProgression);
        }
        self.notify_asset(EventCode::AssetUpdated, id);

        self.scheduler.release();
        self.admit_next();
    }

    fn file_error(
        &mut self,
        id: &str,
        message: String,
        error_code: Option<i32>,
        internal_error_code: Option<i32>,
    ) {
        if let Some(unit) = self.scheduler.unit(id).cloned() {
            self.progress.fail_one();
            self.scheduler.record_failure(unit);
        }
        warn!("update: asset {id} failed: {message}");
        self.emit(
            EventCode::ErrorUpdating,
            id,
            message,
            error_code,
            internal_error_code,
        );
        self.set_working_state(id, DownloadState::Unstarted);

        self.scheduler.release();
        self.admit_next();
    }

    fn submit(&self, id: &str, url: String, dest: PathBuf) {
        debug!("submit: {id} <- {url}");
        let task = DownloadTask {
            id: id.to_owned(),
            url,
            dest,
            timeout: self.config.transfer_timeout,
        };
        self.transport
            .submit(task, TaskSink::new(self.inbox_tx.clone()));
    }

    fn working(&self) -> Option<&Manifest> {
        match &self.temp {
            TempSlot::Resumed(manifest) => Some(manifest),
            TempSlot::Fresh => Some(&self.remote),
            TempSlot::Interrupted(_) | TempSlot::Empty => None,
        }
    }

    fn set_working_state(&mut self, id: &str, state: DownloadState) {
        let working = match &mut self.temp {
            TempSlot::Resumed(manifest) => manifest,
            TempSlot::Fresh => &mut self.remote,
            TempSlot::Interrupted(_) | TempSlot::Empty => return,
        };
        working.set_asset_state(id, state);
    }

    /// Persist the working manifest so an interrupted batch can resume.
    fn save_working(&self) {
        let Some(working) = self.working() else {
            return;
        };
        if let Err(err) = working.save(&self.storage.temp_manifest_path()) {
            warn!("checkpoint: {err}");
        }
    }

    fn report_no_local_manifest(&mut self) {
        let message = UpdateError::NoLocalManifest.to_string();
        self.emit(EventCode::ErrorNoLocalManifest, "", message, None, None);
    }

    fn notify(&mut self, code: EventCode) {
        self.emit(code, "", String::new(), None, None);
    }

    fn notify_asset(&mut self, code: EventCode, asset_id: &str) {
        self.emit(code, asset_id, String::new(), None, None);
    }

    fn emit(
        &mut self,
        code: EventCode,
        asset_id: &str,
        message: String,
        error_code: Option<i32>,
        internal_error_code: Option<i32>,
    ) {
        if code.ends_session()
            || (code == EventCode::NewVersionFound && self.entry == UpdateEntry::CheckUpdate)
        {
            self.entry = UpdateEntry::None;
        }
        let event = UpdateEvent {
            code,
            percent: self.progress.percent(),
            percent_by_file: self.progress.percent_by_file(),
            asset_id: asset_id.to_owned(),
            message,
            error_code,
            internal_error_code,
        };
        if self.updates.send(event).is_err() {
            debug!("emit: no listener for {code}");
        }
    }
}
