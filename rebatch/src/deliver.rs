use std::sync::Arc;

use snafu::ResultExt;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::{
    accumulator::SealedBatch,
    error::{CommitSnafu, ProcessSnafu, Result},
    monitor::FailureMonitor,
    sink::RecordSink,
    source::RecordSource,
};

/// Drains the batch queue into the sink and acknowledges progress.
pub struct DeliveryStage<S: RecordSource, K> {
    source: Arc<S>,
    sink: Arc<K>,
    rx: mpsc::Receiver<SealedBatch<S::Record, S::Cookie>>,
    monitor: Arc<FailureMonitor>,
}

impl<S, K> DeliveryStage<S, K>
where
    S: RecordSource,
    K: RecordSink<Record = S::Record>,
{
    pub fn new(
        source: Arc<S>,
        sink: Arc<K>,
        rx: mpsc::Receiver<SealedBatch<S::Record, S::Cookie>>,
        monitor: Arc<FailureMonitor>,
    ) -> Self {
        Self {
            source,
            sink,
            rx,
            monitor,
        }
    }

    /// Runs the delivery loop until the queue closes, a failure is
    /// reported, or cancellation is signaled.
    pub async fn run(mut self) {
        if let Err(error) = self.run_loop().await {
            self.monitor.report(error);
        }
    }

    async fn run_loop(&mut self) -> Result<()> {
        loop {
            if self.monitor.is_cancelled() {
                debug!("delivery stage stopping on cancellation");
                return Ok(());
            }

            let batch = tokio::select! {
                _ = self.monitor.cancelled() => return Ok(()),
                received = self.rx.recv() => match received {
                    Some(batch) => batch,
                    // Queue closed and drained: the fetch stage is done.
                    None => return Ok(()),
                },
            };

            // A batch in flight is handled to completion; cancellation is
            // observed again only on the next iteration.
            self.deliver(batch).await?;
        }
    }

    async fn deliver(&mut self, batch: SealedBatch<S::Record, S::Cookie>) -> Result<()> {
        let num_records = batch.records.len();
        self.sink.process(batch.records).await.context(ProcessSnafu)?;

        // One at a time: the acknowledgment order must match the fetch
        // order exactly, within the batch and across batches.
        for cookie in batch.cookies {
            self.source.commit(cookie).await.context(CommitSnafu)?;
        }

        trace!(records = num_records, "delivered batch");
        Ok(())
    }
}
