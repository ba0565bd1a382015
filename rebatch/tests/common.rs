use std::{ops::Range, sync::Arc};

use rebatch::{
    Pipeline, PipelineOptions, Result,
    memory::{InMemorySink, InMemorySource, ScriptedFetch},
};
use tokio_util::sync::CancellationToken;

pub type TestSource = Arc<InMemorySource<u64>>;
pub type TestSink = Arc<InMemorySink<u64>>;

pub fn records(range: Range<u64>) -> ScriptedFetch<u64> {
    ScriptedFetch::Records(range.collect())
}

pub fn source(script: Vec<ScriptedFetch<u64>>) -> TestSource {
    Arc::new(InMemorySource::new(script))
}

pub fn sink() -> TestSink {
    Arc::new(InMemorySink::new())
}

/// Runs one session to completion with a token private to the run.
pub async fn run_session(
    source: &TestSource,
    sink: &TestSink,
    options: PipelineOptions,
) -> Result<()> {
    Pipeline::new(source.clone(), sink.clone(), options)
        .run(CancellationToken::new())
        .await
}
