//! Synthetic collaborators for stress runs.

use std::{
    ops::RangeInclusive,
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use rand::Rng;
use rebatch::{BoxedError, FetchResponse, RecordSink, RecordSource};
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(display("cookie {cookie} committed out of order, expected {expected}"))]
pub struct OutOfOrderCommit {
    cookie: u64,
    expected: u64,
}

/// Produces sequentially numbered records in randomly sized chunks, then
/// signals end of stream after the configured number of chunks.
///
/// Commits are checked against the issue order, so a run doubles as an
/// ordering check under real scheduling.
pub struct SyntheticSource {
    chunk_size: RangeInclusive<usize>,
    chunks: u64,
    state: Mutex<SyntheticState>,
}

struct SyntheticState {
    produced_chunks: u64,
    next_record: u64,
    committed: u64,
}

impl SyntheticSource {
    pub fn new(chunk_size: RangeInclusive<usize>, chunks: u64) -> Self {
        Self {
            chunk_size,
            chunks,
            state: Mutex::new(SyntheticState {
                produced_chunks: 0,
                next_record: 0,
                committed: 0,
            }),
        }
    }

    pub fn records_produced(&self) -> u64 {
        self.lock_state().next_record
    }

    pub fn cookies_committed(&self) -> u64 {
        self.lock_state().committed
    }

    fn lock_state(&self) -> MutexGuard<'_, SyntheticState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RecordSource for SyntheticSource {
    type Record = u64;
    type Cookie = u64;

    async fn fetch_next(&self) -> Result<FetchResponse<u64, u64>, BoxedError> {
        let size = rand::rng().random_range(self.chunk_size.clone());

        let mut state = self.lock_state();
        if state.produced_chunks == self.chunks {
            return Ok(FetchResponse::EndOfStream);
        }

        let records = (state.next_record..state.next_record + size as u64).collect();
        let cookie = state.produced_chunks;
        state.next_record += size as u64;
        state.produced_chunks += 1;

        Ok(FetchResponse::Records { records, cookie })
    }

    async fn commit(&self, cookie: u64) -> Result<(), BoxedError> {
        let mut state = self.lock_state();
        if cookie != state.committed {
            return Err(Box::new(OutOfOrderCommit {
                cookie,
                expected: state.committed,
            }));
        }

        state.committed += 1;
        Ok(())
    }
}

/// A sink that simulates a slow bulk writer.
pub struct DelaySink {
    delay: Duration,
    batches: AtomicU64,
    records: AtomicU64,
}

impl DelaySink {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            batches: AtomicU64::new(0),
            records: AtomicU64::new(0),
        }
    }

    pub fn batches_processed(&self) -> u64 {
        self.batches.load(Ordering::Relaxed)
    }

    pub fn records_processed(&self) -> u64 {
        self.records.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RecordSink for DelaySink {
    type Record = u64;

    async fn process(&self, records: Vec<u64>) -> Result<(), BoxedError> {
        tokio::time::sleep(self.delay).await;

        self.batches.fetch_add(1, Ordering::Relaxed);
        self.records.fetch_add(records.len() as u64, Ordering::Relaxed);

        Ok(())
    }
}
