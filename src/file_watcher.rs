// This file was adapted from src/utils/watcher.rs in niri
// (https://github.com/YaLTeR/niri/blob/271534e115e5915231c99df287bbfe396185924d/src/utils/watcher.rs)
//
// niri is licensed under the GNU General Public License v3.0 (GPL-3.0).

use std::{
    io,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use async_channel::Receiver;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::constants::CONFIG_POLL_INTERVAL;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileWatcherEvent {
    Changed,
    Missing,
}

#[derive(Debug, PartialEq, Eq)]
pub enum CheckResult {
    Missing,
    Unchanged,
    Changed,
}

pub struct FileWatcherInner {
    path: PathBuf,

    last_props: Option<(SystemTime, PathBuf)>,
}

fn see_path(path: &Path) -> io::Result<(SystemTime, PathBuf)> {
    let canon = path.canonicalize()?;
    let mtime = canon.metadata()?.modified()?;
    Ok((mtime, canon))
}

#[profiling::all_functions]
impl FileWatcherInner {
    pub fn new(path: PathBuf) -> Self {
        let last_props = see_path(&path).ok();
        Self { path, last_props }
    }

    pub fn check(&mut self) -> CheckResult {
        if let Ok(new_props) = see_path(&self.path) {
            if self.last_props.as_ref() == Some(&new_props) {
                CheckResult::Unchanged
            } else {
                self.last_props = Some(new_props);
                CheckResult::Changed
            }
        } else {
            self.last_props = None;
            CheckResult::Missing
        }
    }
}

/// Polls `path` until `shutdown` fires. A missing file is reported once per
/// disappearance.
pub fn watch_file(path: PathBuf, shutdown: CancellationToken) -> Receiver<FileWatcherEvent> {
    watch_file_every(path, CONFIG_POLL_INTERVAL, shutdown)
}

fn watch_file_every(
    path: PathBuf,
    interval: Duration,
    shutdown: CancellationToken,
) -> Receiver<FileWatcherEvent> {
    let (tx, rx) = async_channel::unbounded();
    let mut watcher = FileWatcherInner::new(path);

    tokio::spawn(async move {
        let mut missing = false;
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                () = tokio::time::sleep(interval) => {}
            }

            let event = match watcher.check() {
                CheckResult::Changed => {
                    missing = false;
                    Some(FileWatcherEvent::Changed)
                }
                CheckResult::Missing if !missing => {
                    missing = true;
                    Some(FileWatcherEvent::Missing)
                }
                CheckResult::Missing | CheckResult::Unchanged => None,
            };

            if let Some(event) = event
                && tx.send(event).await.is_err()
            {
                break;
            }
        }
        debug!("file watcher stopped");
    });

    rx
}

#[cfg(test)]
mod tests {
    use std::fs::{self, File};

    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("capdeck-watch-{}-{name}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir.join("config.kdl")
    }

    fn touch(path: &Path, secs: u64) {
        let file = File::options()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap();
    }

    #[test]
    fn check_reports_transitions() {
        let path = scratch("check");
        touch(&path, 1_000);
        let mut watcher = FileWatcherInner::new(path.clone());

        assert_eq!(watcher.check(), CheckResult::Unchanged);

        touch(&path, 2_000);
        assert_eq!(watcher.check(), CheckResult::Changed);
        assert_eq!(watcher.check(), CheckResult::Unchanged);

        fs::remove_file(&path).unwrap();
        assert_eq!(watcher.check(), CheckResult::Missing);

        touch(&path, 2_000);
        assert_eq!(watcher.check(), CheckResult::Changed);
    }

    #[tokio::test]
    async fn watcher_sends_change_then_stops() {
        let path = scratch("stream");
        touch(&path, 1_000);
        let shutdown = CancellationToken::new();
        let events =
            watch_file_every(path.clone(), Duration::from_millis(10), shutdown.clone());

        touch(&path, 5_000);
        assert_eq!(events.recv().await.unwrap(), FileWatcherEvent::Changed);

        fs::remove_file(&path).unwrap();
        assert_eq!(events.recv().await.unwrap(), FileWatcherEvent::Missing);

        shutdown.cancel();
        assert!(events.recv().await.is_err());
    }
}
