use std::sync::Arc;

use snafu::{ResultExt, ensure};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::{
    accumulator::{BatchAccumulator, SealedBatch},
    error::{FetchSnafu, OversizedFetchSnafu, Result},
    monitor::FailureMonitor,
    source::{FetchResponse, RecordSource},
};

/// Polls the source and turns small fetches into sealed batches.
pub struct FetchStage<S: RecordSource> {
    source: Arc<S>,
    accumulator: BatchAccumulator<S::Record, S::Cookie>,
    tx: mpsc::Sender<SealedBatch<S::Record, S::Cookie>>,
    monitor: Arc<FailureMonitor>,
}

impl<S: RecordSource> FetchStage<S> {
    pub fn new(
        source: Arc<S>,
        tx: mpsc::Sender<SealedBatch<S::Record, S::Cookie>>,
        monitor: Arc<FailureMonitor>,
        max_items: usize,
    ) -> Self {
        Self {
            source,
            accumulator: BatchAccumulator::new(max_items),
            tx,
            monitor,
        }
    }

    /// Runs the fetch loop until the source ends, a failure is reported,
    /// or cancellation is signaled.
    ///
    /// Returning drops the queue sender, closing the queue so the
    /// delivery stage can drain whatever is already queued and terminate.
    pub async fn run(mut self) {
        if let Err(error) = self.run_loop().await {
            self.monitor.report(error);
        }
    }

    async fn run_loop(&mut self) -> Result<()> {
        loop {
            // Records buffered but not yet sealed are dropped here: after
            // a failure elsewhere their cookies can never be committed.
            if self.monitor.is_cancelled() {
                debug!("fetch stage stopping on cancellation");
                return Ok(());
            }

            match self.source.fetch_next().await.context(FetchSnafu)? {
                FetchResponse::Records { records, cookie } => {
                    ensure!(
                        records.len() <= self.accumulator.max_items(),
                        OversizedFetchSnafu {
                            returned: records.len(),
                            max_items: self.accumulator.max_items(),
                        }
                    );

                    if self.accumulator.would_overflow(records.len()) && !self.send_sealed().await {
                        return Ok(());
                    }

                    self.accumulator.append(records, cookie);

                    // An append that lands exactly on the limit is sealed
                    // right away, not held for a future overflow.
                    if self.accumulator.is_full() && !self.send_sealed().await {
                        return Ok(());
                    }
                }
                FetchResponse::Idle => continue,
                FetchResponse::EndOfStream => {
                    // Clean shutdown: the remainder is still committable.
                    if !self.accumulator.is_empty() {
                        self.send_sealed().await;
                    }
                    debug!("source signaled end of stream");
                    return Ok(());
                }
            }
        }
    }

    /// Seals the buffer and sends it downstream, waiting for queue space.
    ///
    /// Returns false if the send was abandoned because cancellation fired
    /// while blocked or the delivery stage went away.
    async fn send_sealed(&mut self) -> bool {
        let batch = self.accumulator.seal();
        trace!(
            records = batch.records.len(),
            cookies = batch.cookies.len(),
            "sealed batch"
        );

        tokio::select! {
            _ = self.monitor.cancelled() => false,
            sent = self.tx.send(batch) => sent.is_ok(),
        }
    }
}
