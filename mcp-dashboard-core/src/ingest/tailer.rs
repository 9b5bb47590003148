//! Per-file tailing loop
//!
//! A [`FileTailer`] follows one log file from the moment it is opened:
//!
//! 1. open the file (a missing file ends only this tailer)
//! 2. seek to the end, so nothing written before startup is replayed
//! 3. register the path with the platform file watcher
//! 4. on every write notification, read the complete lines appended since the
//!    last read and dispatch the parsed events, one at a time, in file order
//!
//! A trailing fragment without a newline is held back until the rest of the
//! line arrives. Files that are rotated or deleted are not reopened; the
//! tailer simply stops seeing new data.
//!
//! A tailer ends when its shutdown signal fires, returning [`TailStats`].

use crate::error::Result;
use crate::ingest::parser::parse_for_path;
use crate::ingest::Pipeline;
use crate::types::LogSource;
use notify::event::{MetadataKind, ModifyKind};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::future::Future;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Counters reported when a tailer finishes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TailStats {
    /// Complete lines read, blank ones included
    pub lines_read: u64,
    /// Events ingested and published
    pub events_dispatched: u64,
    /// Notification or read errors that were logged and skipped
    pub errors: u64,
}

/// Follows one file and feeds its new lines into a [`Pipeline`].
pub struct FileTailer {
    path: PathBuf,
    source: Option<LogSource>,
    pipeline: Pipeline,
    reader: BufReader<File>,
    /// Bytes of a line whose newline has not been written yet
    pending: Vec<u8>,
    notifications: mpsc::UnboundedReceiver<notify::Result<notify::Event>>,
    // Dropping the watcher closes `notifications`
    _watcher: RecommendedWatcher,
    stats: TailStats,
}

impl FileTailer {
    /// Open `path`, seek to its end and start watching it.
    ///
    /// Fails if the file cannot be opened or watched.
    pub async fn open(path: impl Into<PathBuf>, pipeline: Pipeline) -> Result<Self> {
        let path = path.into();
        let source = LogSource::from_path(&path);
        if source.is_none() {
            tracing::warn!(
                path = %path.display(),
                "Not a known MCP log file, lines will be read but produce no events"
            );
        }

        let mut file = File::open(&path).await?;
        let offset = file.seek(SeekFrom::End(0)).await?;

        let (tx, notifications) = mpsc::unbounded_channel::<notify::Result<notify::Event>>();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let _ = tx.send(res);
        })?;
        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %path.display(), offset, "Watching file");

        Ok(Self {
            path,
            source,
            pipeline,
            reader: BufReader::new(file),
            pending: Vec::new(),
            notifications,
            _watcher: watcher,
            stats: TailStats::default(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> Option<LogSource> {
        self.source
    }

    /// Process notifications until the watcher's channel closes.
    pub async fn run(self) -> TailStats {
        self.run_until(std::future::pending()).await
    }

    /// Process notifications until `shutdown` resolves or the watcher's
    /// channel closes, then report what was done.
    pub async fn run_until(mut self, shutdown: impl Future<Output = ()>) -> TailStats {
        tokio::pin!(shutdown);

        loop {
            let notification = tokio::select! {
                biased;
                _ = &mut shutdown => break,
                notification = self.notifications.recv() => match notification {
                    Some(notification) => notification,
                    None => break,
                },
            };

            match notification {
                Ok(event) if is_write(&event.kind) => {
                    if let Err(e) = self.read_appended().await {
                        self.stats.errors += 1;
                        tracing::warn!(path = %self.path.display(), error = %e, "Failed to read appended lines");
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    self.stats.errors += 1;
                    tracing::warn!(path = %self.path.display(), error = %e, "Watcher error");
                }
            }
        }

        tracing::info!(
            path = %self.path.display(),
            lines_read = self.stats.lines_read,
            events = self.stats.events_dispatched,
            errors = self.stats.errors,
            "Stopped watching file"
        );
        self.stats
    }

    /// Read every complete line between the current offset and end of file.
    async fn read_appended(&mut self) -> Result<()> {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let n = self.reader.read_until(b'\n', &mut buf).await?;
            if n == 0 {
                return Ok(());
            }
            if buf.last() != Some(&b'\n') {
                self.pending.extend_from_slice(&buf);
                return Ok(());
            }

            let mut bytes = std::mem::take(&mut self.pending);
            bytes.extend_from_slice(&buf);
            let line = String::from_utf8_lossy(&bytes);
            let line = line.trim_end_matches(['\n', '\r']);

            self.stats.lines_read += 1;
            if !line.trim().is_empty() {
                self.handle_line(line);
            }
        }
    }

    fn handle_line(&mut self, line: &str) {
        let Some(event) = parse_for_path(line, &self.path) else {
            tracing::debug!(path = %self.path.display(), "Line produced no event");
            return;
        };

        match self.pipeline.dispatch(&event) {
            Ok(viewers) => {
                self.stats.events_dispatched += 1;
                tracing::trace!(
                    kind = %event.kind,
                    tool = %event.tool,
                    viewers,
                    "Dispatched event"
                );
            }
            Err(e) => {
                self.stats.errors += 1;
                tracing::warn!(error = %e, "Failed to dispatch event");
            }
        }
    }
}

/// Whether a notification may mean new bytes were appended.
fn is_write(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Modify(
            ModifyKind::Any
                | ModifyKind::Data(_)
                | ModifyKind::Other
                | ModifyKind::Metadata(MetadataKind::WriteTime)
        )
    )
}

/// Start a tailer for `path` on the runtime.
///
/// The tailer stops once `shutdown` holds `true` (or its sender is dropped)
/// and the task resolves to its [`TailStats`]. It resolves to `None` if the
/// file could not be opened or watched; the failure is logged and no other
/// tailer is affected.
pub fn spawn_tailer(
    path: PathBuf,
    pipeline: Pipeline,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<Option<TailStats>> {
    tokio::spawn(async move {
        match FileTailer::open(path.clone(), pipeline).await {
            Ok(tailer) => {
                let stop = async move {
                    let _ = shutdown.wait_for(|stop| *stop).await;
                };
                Some(tailer.run_until(stop).await)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not start tailer");
                None
            }
        }
    })
}

/// Start one independent tailer per path, all stopped by the same signal.
pub fn spawn_tailers(
    paths: impl IntoIterator<Item = PathBuf>,
    pipeline: &Pipeline,
    shutdown: &watch::Receiver<bool>,
) -> Vec<JoinHandle<Option<TailStats>>> {
    paths
        .into_iter()
        .map(|path| spawn_tailer(path, pipeline.clone(), shutdown.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, RenameMode};

    #[test]
    fn test_is_write() {
        assert!(is_write(&EventKind::Modify(ModifyKind::Data(DataChange::Content))));
        assert!(is_write(&EventKind::Modify(ModifyKind::Any)));
        assert!(!is_write(&EventKind::Modify(ModifyKind::Name(RenameMode::Any))));
        assert!(!is_write(&EventKind::Create(CreateKind::File)));
        assert!(!is_write(&EventKind::Access(AccessKind::Any)));
    }

    #[tokio::test]
    async fn test_open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mcp-tool-calls.log");

        let result = FileTailer::open(path, Pipeline::default()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_spawn_missing_file_resolves_none() {
        let dir = tempfile::tempdir().unwrap();
        let (_stop, shutdown) = watch::channel(false);
        let handle = spawn_tailer(
            dir.path().join("mcp-errors.log"),
            Pipeline::default(),
            shutdown,
        );

        assert_eq!(handle.await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_shutdown_ends_idle_tailer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mcp-tool-calls.log");
        std::fs::write(&path, "2024-01-01 10:00:00: [github] TOOL_CALL: old | STATUS: SUCCESS\n")
            .unwrap();
        let (stop, shutdown) = watch::channel(false);

        let handle = spawn_tailer(path, Pipeline::default(), shutdown);
        stop.send(true).unwrap();

        let stats = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stats, Some(TailStats::default()));
    }
}
