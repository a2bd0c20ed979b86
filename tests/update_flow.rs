use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use assets_updater::{
    AssetsManager, DownloadTask, EventCode, TaskSink, Transport, UpdateError, UpdateEvent,
    UpdateState, UpdaterConfig,
};
use tokio::sync::mpsc;

/// Serves every request from memory as soon as it is submitted.
#[derive(Default)]
struct MemoryTransport {
    files: Mutex<HashMap<String, Vec<u8>>>,
    requests: Mutex<Vec<String>>,
}

impl MemoryTransport {
    fn publish(&self, url: &str, body: impl Into<Vec<u8>>) {
        self.files.lock().unwrap().insert(url.to_string(), body.into());
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for MemoryTransport {
    fn submit(&self, task: DownloadTask, sink: TaskSink) {
        self.requests.lock().unwrap().push(task.url.clone());
        let body = self.files.lock().unwrap().get(&task.url).cloned();
        match body {
            Some(body) => {
                fs::create_dir_all(task.dest.parent().unwrap()).unwrap();
                fs::write(&task.dest, &body).unwrap();
                sink.progress(&task.id, body.len() as u64, Some(body.len() as u64));
                sink.succeeded(&task);
            }
            None => sink.failed(
                &task.id,
                &UpdateError::Transport {
                    message: "not found".into(),
                    status: Some(404),
                },
            ),
        }
    }
}

const LOCAL: &str = r#"{
    "version": "1.0.0",
    "packageUrl": "http://cdn.example/pkg/",
    "remoteVersionUrl": "http://cdn.example/version.manifest",
    "remoteManifestUrl": "http://cdn.example/project.manifest",
    "searchPaths": ["res"],
    "assets": {
        "res/keep.txt": {"size": 4, "md5": "k1"},
        "res/change.txt": {"size": 3, "md5": "c1"},
        "res/gone.txt": {"size": 4, "md5": "g1"}
    }
}"#;

const REMOTE: &str = r#"{
    "version": "1.1.0",
    "packageUrl": "http://cdn.example/pkg/",
    "remoteVersionUrl": "http://cdn.example/version.manifest",
    "remoteManifestUrl": "http://cdn.example/project.manifest",
    "searchPaths": ["res"],
    "assets": {
        "res/keep.txt": {"size": 4, "md5": "k1"},
        "res/change.txt": {"size": 3, "md5": "c2"},
        "res/new.txt": {"size": 3, "md5": "n1"}
    }
}"#;

fn setup(root: &Path) -> (UpdaterConfig, Arc<MemoryTransport>) {
    let bundle = root.join("bundle").join("project.manifest");
    fs::create_dir_all(bundle.parent().unwrap()).unwrap();
    fs::write(&bundle, LOCAL).unwrap();

    let transport = Arc::new(MemoryTransport::default());
    transport.publish(
        "http://cdn.example/version.manifest",
        r#"{"version":"1.1.0","remoteManifestUrl":"http://cdn.example/project.manifest"}"#,
    );
    transport.publish("http://cdn.example/project.manifest", REMOTE);
    transport.publish("http://cdn.example/pkg/res/change.txt", "new");
    transport.publish("http://cdn.example/pkg/res/new.txt", "add");

    let config = UpdaterConfig::new(bundle, root.join("storage")).with_max_concurrent_tasks(2);
    (config, transport)
}

fn drain(events: &mut mpsc::UnboundedReceiver<UpdateEvent>) -> Vec<UpdateEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

#[tokio::test]
async fn update_downloads_only_changed_assets_and_promotes() {
    let dir = tempfile::tempdir().unwrap();
    let (config, transport) = setup(dir.path());
    let (tx, mut events) = mpsc::unbounded_channel();
    let mut manager = AssetsManager::new(config, transport.clone(), tx);

    manager.update();
    manager.run_until_settled().await;

    let events = drain(&mut events);
    let codes: Vec<EventCode> = events.iter().map(|event| event.code).collect();
    assert_eq!(codes.last(), Some(&EventCode::UpdateFinished));
    assert!(!codes.iter().any(|code| code.is_error()));

    let mut asset_requests: Vec<String> = transport
        .requests()
        .into_iter()
        .filter(|url| url.contains("/pkg/"))
        .collect();
    asset_requests.sort();
    assert_eq!(
        asset_requests,
        vec![
            "http://cdn.example/pkg/res/change.txt",
            "http://cdn.example/pkg/res/new.txt"
        ]
    );

    let updated: Vec<&str> = events
        .iter()
        .filter(|event| event.code == EventCode::AssetUpdated)
        .map(|event| event.asset_id.as_str())
        .collect();
    assert_eq!(updated.len(), 2);
    assert!(events
        .iter()
        .filter(|event| event.code == EventCode::UpdateProgression)
        .all(|event| (0.0..=100.0).contains(&event.percent_by_file)));

    let storage = dir.path().join("storage");
    assert_eq!(fs::read_to_string(storage.join("res/change.txt")).unwrap(), "new");
    assert_eq!(fs::read_to_string(storage.join("res/new.txt")).unwrap(), "add");
    assert!(storage.join("project.manifest").is_file());
    assert!(!dir.path().join("storage_temp").exists());

    assert_eq!(manager.state(), UpdateState::UpToDate);
    assert_eq!(manager.local_manifest().version, "1.1.0");
    assert_eq!(manager.search_paths(), vec![storage.join("res")]);
    assert_eq!(
        manager.resolve_local_path("res/new.txt"),
        Some(storage.join("res/new.txt"))
    );
    assert_eq!(manager.resolve_local_path("res/gone.txt"), None);
}

#[tokio::test]
async fn restarted_manager_uses_promoted_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let (config, transport) = setup(dir.path());

    let (tx, _events) = mpsc::unbounded_channel();
    let mut first = AssetsManager::new(config.clone(), transport.clone(), tx);
    first.update();
    first.run_until_settled().await;
    assert_eq!(first.state(), UpdateState::UpToDate);
    drop(first);

    let (tx, mut events) = mpsc::unbounded_channel();
    let mut second = AssetsManager::new(config, transport.clone(), tx);
    assert_eq!(second.local_manifest().version, "1.1.0");

    second.check_update();
    second.run_until_settled().await;

    let codes: Vec<EventCode> = drain(&mut events)
        .into_iter()
        .map(|event| event.code)
        .filter(|code| *code != EventCode::UpdateProgression)
        .collect();
    assert_eq!(codes, vec![EventCode::AlreadyUpToDate]);
}

#[tokio::test]
async fn missing_asset_fails_then_retry_completes() {
    let dir = tempfile::tempdir().unwrap();
    let (config, transport) = setup(dir.path());
    transport
        .files
        .lock()
        .unwrap()
        .remove("http://cdn.example/pkg/res/new.txt");

    let (tx, mut events) = mpsc::unbounded_channel();
    let mut manager = AssetsManager::new(config, transport.clone(), tx);
    manager.update();
    manager.run_until_settled().await;

    let first = drain(&mut events);
    assert_eq!(first.last().map(|event| event.code), Some(EventCode::UpdateFailed));
    assert_eq!(manager.state(), UpdateState::FailToUpdate);
    assert!(manager.failed_assets().contains_key("res/new.txt"));
    // Nothing promoted yet.
    assert_eq!(manager.local_manifest().version, "1.0.0");
    assert!(dir.path().join("storage_temp/project.manifest.temp").is_file());

    transport.publish("http://cdn.example/pkg/res/new.txt", "add");
    manager.retry_failed();
    manager.run_until_settled().await;

    let second = drain(&mut events);
    assert_eq!(second.last().map(|event| event.code), Some(EventCode::UpdateFinished));
    assert_eq!(manager.local_manifest().version, "1.1.0");
    assert_eq!(
        fs::read_to_string(dir.path().join("storage/res/new.txt")).unwrap(),
        "add"
    );
}
