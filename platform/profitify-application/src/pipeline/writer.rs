use crate::pipeline::progress::ProgressTracker;
use crate::pipeline::retry::RetryPolicy;
use profitify_domain::repositories::item_store::{
    marshal_item, Item, ItemStore, StoreError, StoreRecord, TableSpec,
};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    Written { items: usize, attempts: u32 },
    Dropped {
        items: usize,
        attempts: u32,
        error: StoreError,
    },
    /// Every item failed to marshal; nothing was sent to the store.
    Skipped { marshal_errors: usize },
}

/// Writes one batch through the store with bounded retries.
///
/// Exhausted retries drop the batch: the failure is logged and counted in
/// the progress tracker but never returned as an error.
pub struct BatchWriter {
    store: Arc<dyn ItemStore>,
    table: TableSpec,
    retry: RetryPolicy,
    progress: ProgressTracker,
}

impl BatchWriter {
    pub fn new(
        store: Arc<dyn ItemStore>,
        table: TableSpec,
        retry: RetryPolicy,
        progress: ProgressTracker,
    ) -> Self {
        Self {
            store,
            table,
            retry,
            progress,
        }
    }

    pub async fn write<T: StoreRecord>(
        &self,
        worker_id: usize,
        batch_index: u64,
        batch: Vec<T>,
    ) -> BatchOutcome {
        let (items, marshal_errors) = self.marshal_batch(worker_id, batch_index, &batch);
        if items.is_empty() {
            metrics::counter!(
                "profitify.seed.batches_total",
                "table" => self.table.name.clone(),
                "result" => "skipped"
            )
            .increment(1);
            return BatchOutcome::Skipped { marshal_errors };
        }

        let max_attempts = self.retry.attempts();
        let mut attempt = 0u32;
        loop {
            let attempt_start = Instant::now();
            let result = self.store.bulk_write(&self.table, &items).await;
            metrics::histogram!("profitify.seed.bulk_write_ms", "table" => self.table.name.clone())
                .record(attempt_start.elapsed().as_secs_f64() * 1000.0);

            match result {
                Ok(()) => {
                    self.progress.record_written(items.len());
                    metrics::counter!(
                        "profitify.seed.batches_total",
                        "table" => self.table.name.clone(),
                        "result" => "ok"
                    )
                    .increment(1);
                    metrics::counter!("profitify.seed.items_written_total", "table" => self.table.name.clone())
                        .increment(items.len() as u64);
                    tracing::debug!(
                        worker_id,
                        batch_index,
                        items = items.len(),
                        attempts = attempt + 1,
                        "batch written"
                    );
                    return BatchOutcome::Written {
                        items: items.len(),
                        attempts: attempt + 1,
                    };
                }
                Err(err) if attempt + 1 >= max_attempts => {
                    self.progress.record_dropped(items.len());
                    metrics::counter!(
                        "profitify.seed.batches_total",
                        "table" => self.table.name.clone(),
                        "result" => "dropped"
                    )
                    .increment(1);
                    metrics::counter!("profitify.seed.items_dropped_total", "table" => self.table.name.clone())
                        .increment(items.len() as u64);
                    tracing::error!(
                        worker_id,
                        batch_index,
                        items = items.len(),
                        attempts = max_attempts,
                        error = %err,
                        "batch dropped after exhausting retries"
                    );
                    return BatchOutcome::Dropped {
                        items: items.len(),
                        attempts: max_attempts,
                        error: err,
                    };
                }
                Err(err) => {
                    let wait = self.retry.delay_for(attempt);
                    self.progress.record_retry();
                    metrics::counter!("profitify.seed.retries_total", "table" => self.table.name.clone())
                        .increment(1);
                    tracing::warn!(
                        worker_id,
                        batch_index,
                        attempt = attempt + 1,
                        max_attempts,
                        wait_ms = wait.as_millis() as u64,
                        error = %err,
                        "batch write failed, retrying"
                    );
                    if !wait.is_zero() {
                        tokio::time::sleep(wait).await;
                    }
                    attempt += 1;
                }
            }
        }
    }

    fn marshal_batch<T: StoreRecord>(
        &self,
        worker_id: usize,
        batch_index: u64,
        batch: &[T],
    ) -> (Vec<Item>, usize) {
        let mut items = Vec::with_capacity(batch.len());
        let mut errors = 0usize;
        for record in batch {
            match marshal_item(record, &self.table) {
                Ok(item) => items.push(item),
                Err(err) => {
                    errors += 1;
                    tracing::warn!(
                        worker_id,
                        batch_index,
                        record = record.label(),
                        error = %err,
                        "skipping item that failed to marshal"
                    );
                }
            }
        }
        if errors > 0 {
            self.progress.record_marshal_errors(errors);
            metrics::counter!("profitify.seed.marshal_errors_total", "table" => self.table.name.clone())
                .increment(errors as u64);
        }
        (items, errors)
    }
}
