//! Bounded producer/consumer bulk loader.
//!
//! The calling task produces records into a bounded channel; `workers`
//! spawned tasks drain it, each batching privately and flushing through a
//! shared [`BatchWriter`]. The channel capacity bounds how far generation can
//! run ahead of the writes.

pub mod progress;
pub mod retry;
pub mod worker;
pub mod writer;

use crate::pipeline::progress::{ProgressReport, ProgressTracker};
use crate::pipeline::retry::RetryPolicy;
use crate::pipeline::worker::{run_worker, WorkerSummary};
use crate::pipeline::writer::BatchWriter;
use profitify_domain::repositories::item_store::{
    ItemStore, StoreRecord, TableSpec, MAX_BULK_WRITE_ITEMS,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{Instrument, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Streaming,
    Draining,
    Completed,
}

impl PipelineState {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Streaming => "streaming",
            PipelineState::Draining => "draining",
            PipelineState::Completed => "completed",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    #[error("invalid pipeline config: {0}")]
    InvalidConfig(String),
    #[error("worker task failed: {0}")]
    WorkerFailed(String),
    #[error("all workers exited before the producer finished ({sent} items sent)")]
    ConsumersGone { sent: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub workers: usize,
    pub batch_size: usize,
    /// Defaults to `batch_size * workers`.
    pub channel_capacity: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            batch_size: MAX_BULK_WRITE_ITEMS,
            channel_capacity: None,
        }
    }
}

impl PipelineConfig {
    pub fn capacity(&self) -> usize {
        self.channel_capacity
            .unwrap_or_else(|| self.batch_size.saturating_mul(self.workers))
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.workers == 0 {
            return Err(PipelineError::InvalidConfig(
                "workers must be >= 1".to_string(),
            ));
        }
        if self.batch_size == 0 || self.batch_size > MAX_BULK_WRITE_ITEMS {
            return Err(PipelineError::InvalidConfig(format!(
                "batch_size must be within 1..={MAX_BULK_WRITE_ITEMS} (got {})",
                self.batch_size
            )));
        }
        if self.capacity() == 0 {
            return Err(PipelineError::InvalidConfig(
                "channel_capacity must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub table: String,
    pub state: PipelineState,
    pub items_produced: u64,
    pub workers: Vec<WorkerSummary>,
    pub progress: ProgressReport,
}

impl PipelineReport {
    pub fn batches_flushed(&self) -> usize {
        self.workers.iter().map(|w| w.batches_flushed()).sum()
    }
}

pub struct Pipeline {
    store: Arc<dyn ItemStore>,
    config: PipelineConfig,
    retry: RetryPolicy,
    span: Span,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn ItemStore>,
        config: PipelineConfig,
        retry: RetryPolicy,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            retry,
            span: Span::none(),
        })
    }

    /// Parent span for every worker and writer event of this pipeline.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Streams `records` into `table` and returns once every worker has
    /// flushed its residual batch. Write failures are reported in the
    /// progress counters, never as an `Err`.
    pub async fn run<T, I>(
        &self,
        table: &TableSpec,
        records: I,
    ) -> Result<PipelineReport, PipelineError>
    where
        T: StoreRecord,
        I: IntoIterator<Item = T>,
    {
        let span = tracing::info_span!(
            parent: &self.span,
            "seed.pipeline",
            table = %table.name,
            workers = self.config.workers,
            batch_size = self.config.batch_size,
            capacity = self.config.capacity()
        );
        self.run_inner(table, records).instrument(span).await
    }

    async fn run_inner<T, I>(
        &self,
        table: &TableSpec,
        records: I,
    ) -> Result<PipelineReport, PipelineError>
    where
        T: StoreRecord,
        I: IntoIterator<Item = T>,
    {
        let mut state = PipelineState::Idle;
        let progress = ProgressTracker::start();
        let writer = Arc::new(BatchWriter::new(
            Arc::clone(&self.store),
            table.clone(),
            self.retry.clone(),
            progress.clone(),
        ));

        let (tx, rx) = async_channel::bounded::<T>(self.config.capacity());
        let mut handles = Vec::with_capacity(self.config.workers);
        for worker_id in 0..self.config.workers {
            let worker_span = tracing::debug_span!("seed.worker", worker_id);
            handles.push(tokio::spawn(
                run_worker(
                    worker_id,
                    rx.clone(),
                    Arc::clone(&writer),
                    self.config.batch_size,
                )
                .instrument(worker_span),
            ));
        }
        drop(rx);

        transition(&mut state, PipelineState::Streaming);
        let mut sent = 0u64;
        let mut consumers_gone = false;
        for record in records {
            if tx.send(record).await.is_err() {
                consumers_gone = true;
                break;
            }
            sent += 1;
        }
        drop(tx);

        transition(&mut state, PipelineState::Draining);
        let mut workers = Vec::with_capacity(handles.len());
        let mut failure: Option<PipelineError> = None;
        for handle in handles {
            match handle.await {
                Ok(summary) => workers.push(summary),
                Err(err) => {
                    tracing::error!(error = %err, "worker task failed");
                    if failure.is_none() {
                        failure = Some(PipelineError::WorkerFailed(err.to_string()));
                    }
                }
            }
        }
        if let Some(err) = failure {
            return Err(err);
        }
        if consumers_gone {
            return Err(PipelineError::ConsumersGone { sent });
        }

        transition(&mut state, PipelineState::Completed);
        let report = progress.report();
        tracing::info!(
            items_produced = sent,
            items_written = report.counters.items_written,
            items_dropped = report.counters.items_dropped,
            batches_dropped = report.counters.batches_dropped,
            elapsed_ms = report.elapsed.as_millis() as u64,
            items_per_second = report.items_per_second,
            "pipeline completed"
        );

        Ok(PipelineReport {
            table: table.name.clone(),
            state,
            items_produced: sent,
            workers,
            progress: report,
        })
    }
}

fn transition(state: &mut PipelineState, next: PipelineState) {
    tracing::debug!(from = state.as_str(), to = next.as_str(), "pipeline state");
    *state = next;
}

#[cfg(test)]
mod tests {
    use super::{PipelineConfig, PipelineError};

    #[test]
    fn capacity_defaults_to_batch_times_workers() {
        let config = PipelineConfig {
            workers: 4,
            batch_size: 25,
            channel_capacity: None,
        };
        assert_eq!(config.capacity(), 100);

        let config = PipelineConfig {
            channel_capacity: Some(3),
            ..config
        };
        assert_eq!(config.capacity(), 3);
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let bad_batch = PipelineConfig {
            workers: 1,
            batch_size: 26,
            channel_capacity: None,
        };
        assert!(matches!(
            bad_batch.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));

        let no_workers = PipelineConfig {
            workers: 0,
            ..PipelineConfig::default()
        };
        assert!(no_workers.validate().is_err());

        let zero_capacity = PipelineConfig {
            channel_capacity: Some(0),
            ..PipelineConfig::default()
        };
        assert!(zero_capacity.validate().is_err());
        assert!(PipelineConfig::default().validate().is_ok());
    }
}
