//! In-memory source and sink implementations.
//!
//! These store everything in memory and are suitable for testing and
//! development. The source replays a fixed script of fetch responses and
//! records every commit; the sink collects every processed batch. Both
//! support failure injection so error paths can be exercised end to end.

use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use snafu::Snafu;
use tokio::sync::Notify;

use crate::{
    error::BoxedError,
    sink::RecordSink,
    source::{FetchResponse, RecordSource},
};

/// Failure injected by a scripted collaborator.
#[derive(Debug, Snafu)]
#[snafu(display("injected failure: {message}"))]
pub struct InjectedFailure {
    message: String,
}

/// One scripted response from [`InMemorySource`].
#[derive(Debug, Clone)]
pub enum ScriptedFetch<R> {
    /// Return these records with the next cookie in sequence.
    Records(Vec<R>),
    /// Report that nothing is available right now.
    Idle,
    /// Signal the end of the stream.
    EndOfStream,
    /// Fail the fetch with this message.
    Error(String),
}

/// A scripted source that replays a fixed sequence of fetch responses.
///
/// Cookies are issued as a dense sequence starting at zero, one per
/// `Records` entry. Once the script is exhausted every further fetch
/// reports [`FetchResponse::Idle`], keeping the unbounded-source shape;
/// scripts that should terminate end with [`ScriptedFetch::EndOfStream`].
pub struct InMemorySource<R> {
    state: Mutex<SourceState<R>>,
    on_fetch: Notify,
    on_commit: Notify,
}

struct SourceState<R> {
    script: VecDeque<ScriptedFetch<R>>,
    next_cookie: u64,
    committed: Vec<u64>,
    fail_commit_of: Option<u64>,
    fetches: usize,
}

impl<R> InMemorySource<R> {
    pub fn new(script: Vec<ScriptedFetch<R>>) -> Self {
        Self {
            state: Mutex::new(SourceState {
                script: script.into(),
                next_cookie: 0,
                committed: Vec::new(),
                fail_commit_of: None,
                fetches: 0,
            }),
            on_fetch: Notify::new(),
            on_commit: Notify::new(),
        }
    }

    /// Makes the commit of the given cookie fail.
    pub fn with_commit_failure(self, cookie: u64) -> Self {
        self.lock_state().fail_commit_of = Some(cookie);
        self
    }

    /// The cookies committed so far, in commit order.
    pub fn committed(&self) -> Vec<u64> {
        self.lock_state().committed.clone()
    }

    /// Waits until at least `count` fetches have been answered.
    pub async fn wait_for_fetches(&self, count: usize) {
        loop {
            let notified = self.on_fetch.notified();
            if self.lock_state().fetches >= count {
                return;
            }
            notified.await;
        }
    }

    /// Waits until at least `count` cookies have been committed.
    pub async fn wait_for_commits(&self, count: usize) {
        loop {
            let notified = self.on_commit.notified();
            if self.lock_state().committed.len() >= count {
                return;
            }
            notified.await;
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SourceState<R>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl<R: Send + 'static> RecordSource for InMemorySource<R> {
    type Record = R;
    type Cookie = u64;

    async fn fetch_next(&self) -> Result<FetchResponse<R, u64>, BoxedError> {
        let response = {
            let mut state = self.lock_state();
            state.fetches += 1;

            match state.script.pop_front() {
                Some(ScriptedFetch::Records(records)) => {
                    let cookie = state.next_cookie;
                    state.next_cookie += 1;
                    Ok(FetchResponse::Records { records, cookie })
                }
                Some(ScriptedFetch::Idle) | None => Ok(FetchResponse::Idle),
                Some(ScriptedFetch::EndOfStream) => Ok(FetchResponse::EndOfStream),
                Some(ScriptedFetch::Error(message)) => {
                    Err(Box::new(InjectedFailure { message }) as BoxedError)
                }
            }
        };

        self.on_fetch.notify_waiters();

        // The pipeline polls again immediately on an idle response; yield
        // so the other tasks keep making progress in the meantime.
        if matches!(response, Ok(FetchResponse::Idle)) {
            tokio::task::yield_now().await;
        }

        response
    }

    async fn commit(&self, cookie: u64) -> Result<(), BoxedError> {
        let result = {
            let mut state = self.lock_state();
            if state.fail_commit_of == Some(cookie) {
                Err(Box::new(InjectedFailure {
                    message: format!("commit of cookie {cookie} failed"),
                }) as BoxedError)
            } else {
                state.committed.push(cookie);
                Ok(())
            }
        };

        self.on_commit.notify_waiters();
        result
    }
}

/// A sink that collects every processed batch.
pub struct InMemorySink<R> {
    state: Mutex<SinkState<R>>,
    on_process: Notify,
}

struct SinkState<R> {
    batches: Vec<Vec<R>>,
    fail_on_call: Option<usize>,
    calls: usize,
}

impl<R> InMemorySink<R> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SinkState {
                batches: Vec::new(),
                fail_on_call: None,
                calls: 0,
            }),
            on_process: Notify::new(),
        }
    }

    /// Makes the nth `process` call fail (zero-based).
    pub fn with_process_failure(self, call: usize) -> Self {
        self.lock_state().fail_on_call = Some(call);
        self
    }

    /// The batches stored so far, in delivery order.
    pub fn batches(&self) -> Vec<Vec<R>>
    where
        R: Clone,
    {
        self.lock_state().batches.clone()
    }

    /// Every stored record, flattened across batches.
    pub fn records(&self) -> Vec<R>
    where
        R: Clone,
    {
        self.lock_state()
            .batches
            .iter()
            .flatten()
            .cloned()
            .collect()
    }

    /// Waits until at least `count` batches have been stored.
    pub async fn wait_for_batches(&self, count: usize) {
        loop {
            let notified = self.on_process.notified();
            if self.lock_state().batches.len() >= count {
                return;
            }
            notified.await;
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SinkState<R>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<R> Default for InMemorySink<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: Send + 'static> RecordSink for InMemorySink<R> {
    type Record = R;

    async fn process(&self, records: Vec<R>) -> Result<(), BoxedError> {
        let result = {
            let mut state = self.lock_state();
            let call = state.calls;
            state.calls += 1;

            if state.fail_on_call == Some(call) {
                Err(Box::new(InjectedFailure {
                    message: format!("process call {call} failed"),
                }) as BoxedError)
            } else {
                state.batches.push(records);
                Ok(())
            }
        };

        self.on_process.notify_waiters();
        result
    }
}
