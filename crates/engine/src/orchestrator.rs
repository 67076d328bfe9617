use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use triage_triggers::TriggerSet;

use crate::dialog::ProblematicDialog;
use crate::error::{Result, TriageError};
use crate::limits::{clamp_queue_capacity, clamp_workers, worker_count_from_env};
use crate::scanner::{DialogScanner, ScanOptions};

pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Parallelism knobs for a classification run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Maximum number of folders scanned at once, clamped to `1..=MAX_WORKERS`
    pub workers: usize,
    /// Capacity of the result channel, clamped to `1..=MAX_QUEUE_CAPACITY`
    pub queue_capacity: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            workers: worker_count_from_env(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// What the dispatcher did once every scan task has been joined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub folders: usize,
    pub failed_tasks: usize,
}

/// Completion-ordered stream of classified dialogs.
///
/// The stream ends once every scan task has finished; call [`DialogStream::finish`]
/// afterwards to collect the dispatch report.
pub struct DialogStream {
    rx: mpsc::Receiver<ProblematicDialog>,
    dispatcher: JoinHandle<DispatchReport>,
    folders: usize,
}

impl DialogStream {
    /// Number of dialog folders dispatched
    pub fn folders(&self) -> usize {
        self.folders
    }

    pub async fn recv(&mut self) -> Option<ProblematicDialog> {
        self.rx.recv().await
    }

    /// Join the dispatcher. Results still queued are dropped.
    pub async fn finish(self) -> Result<DispatchReport> {
        drop(self.rx);
        self.dispatcher
            .await
            .map_err(|err| TriageError::Dispatch(err.to_string()))
    }
}

/// Fans dialog folders out to scan tasks and funnels results into one channel
pub struct ClassificationOrchestrator {
    scanner: Arc<DialogScanner>,
    options: RunOptions,
}

impl ClassificationOrchestrator {
    pub fn new(triggers: Arc<TriggerSet>, scan: ScanOptions, options: RunOptions) -> Self {
        Self {
            scanner: Arc::new(DialogScanner::new(triggers, scan)),
            options,
        }
    }

    pub fn options(&self) -> RunOptions {
        self.options
    }

    /// Start classifying every dialog folder under `input_root`.
    ///
    /// Listing the root is the only fatal step. Dispatch continues in the
    /// background while the caller drains the returned stream.
    pub async fn run(&self, input_root: &Path) -> Result<DialogStream> {
        let folders = discover_folders(input_root).await?;
        let total = folders.len();
        let workers = clamp_workers(self.options.workers);
        log::info!(
            "Classifying {total} dialog folders in {} with {workers} workers",
            input_root.display()
        );

        let (tx, rx) = mpsc::channel(clamp_queue_capacity(self.options.queue_capacity));
        let semaphore = Arc::new(Semaphore::new(workers));
        let scanner = Arc::clone(&self.scanner);
        let root = input_root.to_path_buf();

        let dispatcher = tokio::spawn(async move {
            let mut tasks = JoinSet::new();
            for folder_name in folders {
                let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                    break;
                };
                let scanner = Arc::clone(&scanner);
                let tx = tx.clone();
                let folder_path = root.join(&folder_name);
                tasks.spawn(async move {
                    let _permit = permit;
                    if let Some(dialog) = scanner.scan(&folder_path, &folder_name).await {
                        if tx.send(dialog).await.is_err() {
                            log::debug!("Result receiver closed; dropping {folder_name}");
                        }
                    }
                });
            }
            drop(tx);

            let mut report = DispatchReport {
                folders: total,
                failed_tasks: 0,
            };
            while let Some(joined) = tasks.join_next().await {
                if let Err(err) = joined {
                    log::error!("Scan task failed: {err}");
                    report.failed_tasks += 1;
                }
            }
            report
        });

        Ok(DialogStream {
            rx,
            dispatcher,
            folders: total,
        })
    }
}

/// Immediate subdirectory names of `root`, sorted
pub async fn discover_folders(root: &Path) -> Result<Vec<String>> {
    let list_err = |source: std::io::Error| TriageError::ListRoot {
        path: root.to_path_buf(),
        source,
    };

    let metadata = tokio::fs::metadata(root).await.map_err(list_err)?;
    if !metadata.is_dir() {
        return Err(TriageError::InvalidPath(format!(
            "Not a directory: {}",
            root.display()
        )));
    }

    let mut entries = tokio::fs::read_dir(root).await.map_err(list_err)?;
    let mut folders = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(list_err)? {
        let file_type = entry.file_type().await.map_err(list_err)?;
        if !file_type.is_dir() {
            log::debug!("Skipping non-directory {}", entry.path().display());
            continue;
        }
        folders.push(entry.file_name().to_string_lossy().into_owned());
    }
    folders.sort();
    Ok(folders)
}
