//! Task-based file transfer.
//!
//! The engine only sees [`Transport::submit`] and the [`TaskEvent`]s posted
//! back through a [`TaskSink`]. Completions of every kind, decode results
//! included, travel through the same channel so the owner applies them in
//! arrival order.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use log::{debug, warn};
use reqwest::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use crate::config::DEFAULT_CONNECTION_TIMEOUT;
use crate::error::UpdateError;

const PARTIAL_SUFFIX: &str = ".tmp";

/// One fetch request: `url` is streamed into `dest` and reported under `id`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadTask {
    pub id: String,
    pub url: String,
    pub dest: PathBuf,
    pub timeout: Option<Duration>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TaskEvent {
    Progress {
        id: String,
        received: u64,
        expected: Option<u64>,
    },
    Succeeded {
        id: String,
        url: String,
        dest: PathBuf,
    },
    Failed {
        id: String,
        message: String,
        error_code: Option<i32>,
        internal_error_code: Option<i32>,
    },
    /// Result of decompressing a downloaded archive.
    Decoded {
        id: String,
        archive: PathBuf,
        result: Result<(), String>,
    },
}

/// Sending half of the owner's inbox.
#[derive(Clone, Debug)]
pub struct TaskSink {
    tx: mpsc::UnboundedSender<TaskEvent>,
}

impl TaskSink {
    pub fn new(tx: mpsc::UnboundedSender<TaskEvent>) -> Self {
        Self { tx }
    }

    pub fn send(&self, event: TaskEvent) {
        if self.tx.send(event).is_err() {
            debug!("task sink: owner dropped, event discarded");
        }
    }

    pub fn progress(&self, id: &str, received: u64, expected: Option<u64>) {
        self.send(TaskEvent::Progress {
            id: id.to_owned(),
            received,
            expected,
        });
    }

    pub fn succeeded(&self, task: &DownloadTask) {
        self.send(TaskEvent::Succeeded {
            id: task.id.clone(),
            url: task.url.clone(),
            dest: task.dest.clone(),
        });
    }

    pub fn failed(&self, id: &str, err: &UpdateError) {
        let error_code = match err {
            UpdateError::Transport {
                status: Some(status),
                ..
            } => Some(i32::from(*status)),
            _ => None,
        };
        self.send(TaskEvent::Failed {
            id: id.to_owned(),
            message: err.to_string(),
            error_code,
            internal_error_code: None,
        });
    }
}

/// Asynchronous downloader driven by the engine.
///
/// Implementations must never call back synchronously into the engine; every
/// outcome goes through `sink`.
pub trait Transport: Send + Sync {
    fn submit(&self, task: DownloadTask, sink: TaskSink);
}

/// reqwest-backed transport. Each task runs on the ambient tokio runtime and
/// streams into `<dest>.tmp`, renamed into place once complete.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(connect_timeout: Duration) -> Self {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .unwrap_or_else(|err| {
                warn!("network client: falling back to default HTTP client configuration ({err})");
                Client::new()
            });
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECTION_TIMEOUT)
    }
}

impl Transport for HttpTransport {
    fn submit(&self, task: DownloadTask, sink: TaskSink) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(err) => {
                sink.failed(
                    &task.id,
                    &UpdateError::Transport {
                        message: format!("no async runtime available: {err}"),
                        status: None,
                    },
                );
                return;
            }
        };
        let client = self.client.clone();
        handle.spawn(async move {
            match download_to_path(&client, &task, &sink).await {
                Ok(()) => sink.succeeded(&task),
                Err(err) => {
                    warn!("download {} failed: {}", task.id, err);
                    sink.failed(&task.id, &err);
                }
            }
        });
    }
}

/// Stream `task.url` to disk, reporting progress at most every 200ms.
async fn download_to_path(
    client: &Client,
    task: &DownloadTask,
    sink: &TaskSink,
) -> Result<(), UpdateError> {
    let mut request = client.get(&task.url);
    if let Some(timeout) = task.timeout {
        request = request.timeout(timeout);
    }
    let response = request
        .send()
        .await
        .map_err(|e| transport_error("download request failed", &e))?
        .error_for_status()
        .map_err(|e| transport_error("download status error", &e))?;

    if let Some(parent) = task.dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| UpdateError::io(parent, e))?;
    }
    let partial = partial_path(&task.dest);
    let mut file = File::create(&partial)
        .await
        .map_err(|e| UpdateError::io(&partial, e))?;

    let total = response.content_length();
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;
    let mut last_tick = Instant::now();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| transport_error("stream error", &e))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| UpdateError::io(&partial, e))?;
        downloaded += chunk.len() as u64;

        if last_tick.elapsed().as_secs_f32() > 0.2 {
            sink.progress(&task.id, downloaded, total);
            last_tick = Instant::now();
        }
    }

    // Final callback.
    sink.progress(&task.id, downloaded, total.or(Some(downloaded)));

    file.flush()
        .await
        .map_err(|e| UpdateError::io(&partial, e))?;
    drop(file);

    if let Some(total) = total
        && downloaded < total
    {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(UpdateError::Transport {
            message: format!("download incomplete: received {downloaded} of {total} bytes"),
            status: None,
        });
    }

    tokio::fs::rename(&partial, &task.dest)
        .await
        .map_err(|e| UpdateError::io(&task.dest, e))?;
    debug!("download {} stored at {}", task.id, task.dest.display());
    Ok(())
}

fn transport_error(context: &str, err: &reqwest::Error) -> UpdateError {
    UpdateError::Transport {
        message: format!("{context}: {err}"),
        status: err.status().map(|status| status.as_u16()),
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}
