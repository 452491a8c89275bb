//! Persistence pipeline: a bounded record queue drained by one writer
//!
//! Workers submit [`PageRecord`]s through a [`RecordSender`]. A single
//! blocking writer owns the storage handle and inserts records in dequeue
//! order, one transaction each. When the queue is full, `submit` waits.
//!
//! # Shutdown
//!
//! The writer stops once every sender is gone and the queue is empty.
//! [`Pipeline::shutdown`] drops the pipeline's own sender and waits for the
//! writer to confirm: it returns only after the last queued record has been
//! written and the storage handle has been released.

use crate::storage::{InsertOutcome, PageRecord, Storage, StorageError};
use crate::CrawlError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Handle used by workers to hand records to the writer
#[derive(Debug, Clone)]
pub struct RecordSender {
    tx: mpsc::Sender<PageRecord>,
}

impl RecordSender {
    /// Queues a record, waiting while the queue is full
    ///
    /// Fails only if the writer has stopped, which means storage is gone.
    pub async fn submit(&self, record: PageRecord) -> Result<(), CrawlError> {
        self.tx
            .send(record)
            .await
            .map_err(|_| CrawlError::PipelineClosed)
    }
}

/// Counts reported by the writer when it stops cleanly
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterReport {
    /// Rows inserted
    pub written: u64,
    /// Records skipped because their URL was already stored
    pub duplicates: u64,
}

/// Running pipeline: the writer task plus the originating sender
pub struct Pipeline {
    sender: Option<RecordSender>,
    writer: JoinHandle<Result<WriterReport, StorageError>>,
}

impl Pipeline {
    /// Starts the writer, moving `storage` into it
    pub fn spawn<S>(storage: S, capacity: usize) -> Self
    where
        S: Storage + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let span = tracing::info_span!("writer");

        let writer = tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            run_writer(storage, rx)
        });

        Self {
            sender: Some(RecordSender { tx }),
            writer,
        }
    }

    /// A new sender for a producer
    ///
    /// Returns `None` after shutdown has begun.
    pub fn sender(&self) -> Option<RecordSender> {
        self.sender.clone()
    }

    /// Signals end of input and waits for the writer to drain and stop
    ///
    /// Every other [`RecordSender`] must be dropped for this to return.
    pub async fn shutdown(mut self) -> Result<WriterReport, CrawlError> {
        drop(self.sender.take());

        match self.writer.await {
            Ok(result) => result.map_err(CrawlError::from),
            Err(e) => Err(CrawlError::WorkerPanicked(format!("writer: {}", e))),
        }
    }
}

fn run_writer<S: Storage>(
    mut storage: S,
    mut rx: mpsc::Receiver<PageRecord>,
) -> Result<WriterReport, StorageError> {
    let mut report = WriterReport::default();
    tracing::debug!("Writer started");

    while let Some(record) = rx.blocking_recv() {
        match storage.insert_page(&record) {
            Ok(InsertOutcome::Inserted) => {
                report.written += 1;
                tracing::trace!(url = %record.url, depth = record.depth, "Stored page");
            }
            Ok(InsertOutcome::Duplicate) => {
                report.duplicates += 1;
                tracing::debug!(url = %record.url, "Page already stored, skipping");
            }
            Err(e) => {
                tracing::error!(url = %record.url, error = %e, "Storage write failed, stopping writer");
                // Reject further submissions right away
                rx.close();
                return Err(e);
            }
        }
    }

    drop(storage);
    tracing::debug!(
        written = report.written,
        duplicates = report.duplicates,
        "Writer drained and stopped"
    );
    Ok(report)
}
