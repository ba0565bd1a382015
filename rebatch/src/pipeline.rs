use std::sync::Arc;

use snafu::{IntoError, ensure};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    deliver::DeliveryStage,
    error::{InvalidOptionsSnafu, Result, StagePanickedSnafu},
    fetch::FetchStage,
    monitor::FailureMonitor,
    sink::RecordSink,
    source::RecordSource,
};

const DEFAULT_QUEUE_CAPACITY: usize = 2;

/// Tuning knobs for one pipeline session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// The largest number of records a sealed batch, and therefore one
    /// sink call, may carry. Also bounds a single fetch, by source
    /// contract.
    pub max_items: usize,
    /// How many sealed batches may sit between the stages before the
    /// fetch side blocks. Together with `max_items` this caps the amount
    /// of fetched-but-undelivered data.
    pub queue_capacity: usize,
}

impl PipelineOptions {
    pub fn new(max_items: usize) -> Self {
        Self {
            max_items,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.max_items > 0,
            InvalidOptionsSnafu {
                message: "max_items must be positive",
            }
        );
        ensure!(
            self.queue_capacity > 0,
            InvalidOptionsSnafu {
                message: "queue_capacity must be at least 1",
            }
        );
        Ok(())
    }
}

/// One pipeline session connecting a source to a sink.
///
/// The fetch and delivery stages run as independent tasks connected by a
/// single bounded queue; the session ends when the source signals end of
/// stream, either collaborator fails, or the caller cancels.
pub struct Pipeline<S, K> {
    source: Arc<S>,
    sink: Arc<K>,
    options: PipelineOptions,
}

impl<S, K> Pipeline<S, K>
where
    S: RecordSource + 'static,
    K: RecordSink<Record = S::Record> + 'static,
{
    pub fn new(source: Arc<S>, sink: Arc<K>, options: PipelineOptions) -> Self {
        Self {
            source,
            sink,
            options,
        }
    }

    /// Runs the session to completion.
    ///
    /// Returns the first failure observed by either stage, or `Ok(())` on
    /// clean termination. Cancelling `ct` stops the run cleanly: in-flight
    /// collaborator calls complete on their own terms, no new calls start,
    /// and no error is recorded.
    pub async fn run(self, ct: CancellationToken) -> Result<()> {
        self.options.validate()?;

        let monitor = Arc::new(FailureMonitor::new(&ct));
        let (tx, rx) = mpsc::channel(self.options.queue_capacity);

        let fetch = FetchStage::new(
            self.source.clone(),
            tx,
            monitor.clone(),
            self.options.max_items,
        );
        let delivery = DeliveryStage::new(self.source, self.sink, rx, monitor.clone());

        let fetch_task = tokio::spawn(fetch.run());
        let delivery_task = tokio::spawn(delivery.run());

        // A panicked stage cannot report its own failure; feeding the join
        // error through the monitor also cancels the surviving stage.
        if let Err(join_error) = delivery_task.await {
            monitor.report(StagePanickedSnafu { stage: "delivery" }.into_error(join_error));
        }
        if let Err(join_error) = fetch_task.await {
            monitor.report(StagePanickedSnafu { stage: "fetch" }.into_error(join_error));
        }

        match monitor.first_error() {
            Some(error) => Err(error),
            None => {
                debug!("pipeline terminated cleanly");
                Ok(())
            }
        }
    }
}

/// Runs one pipeline session with a cancellation token private to the run.
///
/// Convenience for callers without an enclosing cancellation scope.
pub async fn run<S, K>(source: Arc<S>, sink: Arc<K>, options: PipelineOptions) -> Result<()>
where
    S: RecordSource + 'static,
    K: RecordSink<Record = S::Record> + 'static,
{
    Pipeline::new(source, sink, options)
        .run(CancellationToken::new())
        .await
}
