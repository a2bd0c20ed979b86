use crate::events::EventCode;

// Ordered: the version probe may only start from a state before it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UpdateState {
    Unchecked,
    PredownloadVersion,
    DownloadingVersion,
    VersionLoaded,
    PredownloadManifest,
    DownloadingManifest,
    ManifestLoaded,
    NeedUpdate,
    Updating,
    FailToUpdate,
    UpToDate,
}

impl UpdateState {
    /// Whether completions are still expected from the transport.
    pub fn awaits_transport(self) -> bool {
        matches!(
            self,
            UpdateState::DownloadingVersion
                | UpdateState::DownloadingManifest
                | UpdateState::Updating
        )
    }
}

/// The caller-facing mode of the session in progress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UpdateEntry {
    #[default]
    None,
    CheckUpdate,
    DoUpdate,
}

/// What an entry point does from a given state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    ProbeVersion,
    ParseVersion,
    FetchManifest,
    ParseManifest,
    StartUpdate,
    /// Report a verdict that is already known.
    Notify(EventCode),
    /// Nothing to do; the entry mode is cleared.
    Settle,
    /// A transfer is in flight; its completion continues the session.
    Wait,
}

/// Transition table for `check_update`.
pub fn check_step(state: UpdateState) -> Step {
    match state {
        UpdateState::Unchecked | UpdateState::PredownloadVersion => Step::ProbeVersion,
        UpdateState::UpToDate => Step::Notify(EventCode::AlreadyUpToDate),
        UpdateState::FailToUpdate | UpdateState::NeedUpdate => {
            Step::Notify(EventCode::NewVersionFound)
        }
        UpdateState::DownloadingVersion
        | UpdateState::VersionLoaded
        | UpdateState::PredownloadManifest
        | UpdateState::DownloadingManifest
        | UpdateState::ManifestLoaded
        | UpdateState::Updating => Step::Wait,
    }
}

/// Transition table for `update`.
pub fn update_step(state: UpdateState, remote_loaded: bool) -> Step {
    match state {
        UpdateState::Unchecked | UpdateState::PredownloadVersion => Step::ProbeVersion,
        UpdateState::VersionLoaded => Step::ParseVersion,
        UpdateState::PredownloadManifest => Step::FetchManifest,
        UpdateState::ManifestLoaded => Step::ParseManifest,
        UpdateState::FailToUpdate | UpdateState::NeedUpdate if !remote_loaded => {
            Step::FetchManifest
        }
        UpdateState::FailToUpdate | UpdateState::NeedUpdate => Step::StartUpdate,
        UpdateState::UpToDate | UpdateState::Updating => Step::Settle,
        UpdateState::DownloadingVersion | UpdateState::DownloadingManifest => Step::Wait,
    }
}
