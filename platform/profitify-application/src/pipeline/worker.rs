use crate::pipeline::writer::{BatchOutcome, BatchWriter};
use async_channel::Receiver;
use profitify_domain::repositories::item_store::StoreRecord;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    pub worker_id: usize,
    pub items_received: u64,
    /// Size of every flushed batch, in flush order.
    pub batch_sizes: Vec<usize>,
    pub batches_written: u64,
    pub batches_dropped: u64,
    pub batches_skipped: u64,
}

impl WorkerSummary {
    fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            ..Self::default()
        }
    }

    pub fn batches_flushed(&self) -> usize {
        self.batch_sizes.len()
    }

    fn record(&mut self, size: usize, outcome: &BatchOutcome) {
        self.batch_sizes.push(size);
        match outcome {
            BatchOutcome::Written { .. } => self.batches_written += 1,
            BatchOutcome::Dropped { .. } => self.batches_dropped += 1,
            BatchOutcome::Skipped { .. } => self.batches_skipped += 1,
        }
    }
}

/// Drains the shared channel into a private batch, flushing whenever it
/// fills and once more for the residual after the channel closes.
pub(crate) async fn run_worker<T: StoreRecord>(
    worker_id: usize,
    rx: Receiver<T>,
    writer: Arc<BatchWriter>,
    batch_size: usize,
) -> WorkerSummary {
    let batch_size = batch_size.max(1);
    let mut summary = WorkerSummary::new(worker_id);
    let mut batch: Vec<T> = Vec::with_capacity(batch_size);
    let mut batch_index = 0u64;

    // recv() only errors once the channel is closed and drained.
    while let Ok(item) = rx.recv().await {
        summary.items_received += 1;
        batch.push(item);
        if batch.len() >= batch_size {
            let full = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
            let size = full.len();
            let outcome = writer.write(worker_id, batch_index, full).await;
            summary.record(size, &outcome);
            batch_index += 1;
        }
    }

    if !batch.is_empty() {
        let size = batch.len();
        let outcome = writer.write(worker_id, batch_index, batch).await;
        summary.record(size, &outcome);
    }

    tracing::debug!(
        worker_id,
        items = summary.items_received,
        batches = summary.batches_flushed(),
        dropped = summary.batches_dropped,
        "worker finished"
    );
    summary
}
