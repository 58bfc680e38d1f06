use drivebak::Config;
use tokio::sync::watch;
use tokio::time;

use crate::storage::{FileId, Remote};
use crate::sync;

/// Runs sync passes over the configured directories, forever.
///
/// Owns its configuration; nothing can change the target list or the
/// interval once the loop is running.
pub struct Scheduler<R> {
    remote: R,
    config: Config,
}

impl<R> Scheduler<R>
where
    R: Remote,
{
    pub fn new(remote: R, config: Config) -> Self {
        Self { remote, config }
    }

    /// One sync pass: every configured directory is attempted, in order.
    /// An error in one directory never aborts the others.
    pub async fn run_once(&self) {
        let parent = FileId::from(self.config.folder_id.as_str());
        for dir in &self.config.directories {
            match sync::backup_path(&self.remote, dir, Some(&parent)).await {
                Ok(()) => log::info!("backed up {dir} to Drive folder {parent}"),
                Err(err) => log::error!("error backing up {dir}: {err}"),
            }
        }
    }

    /// Runs passes until `stop` is signalled. The signal is checked at the
    /// sleep boundary between two cycles; a pass in flight completes first.
    pub async fn run(self, mut stop: watch::Receiver<bool>) {
        let interval = self.config.interval();
        loop {
            self.run_once().await;
            tokio::select! {
                _ = time::sleep(interval) => (),
                _ = stop.changed() => {
                    log::info!("backup loop stopped");
                    break;
                }
            }
        }
    }
}
