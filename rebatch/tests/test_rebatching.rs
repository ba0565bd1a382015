use common::{TestSink, records, run_session, sink, source};
use rebatch::{Pipeline, PipelineOptions, memory::ScriptedFetch};
use tokio_util::sync::CancellationToken;

mod common;

fn batch_sizes(sink: &TestSink) -> Vec<usize> {
    sink.batches().iter().map(|batch| batch.len()).collect()
}

#[tokio::test]
async fn test_order_preservation() {
    let source = source(vec![
        records(0..7),
        records(7..10),
        records(10..17),
        records(17..20),
        ScriptedFetch::EndOfStream,
    ]);
    let sink = sink();

    let result = run_session(&source, &sink, PipelineOptions::new(10)).await;

    assert!(result.is_ok());
    assert_eq!(sink.records(), (0..20).collect::<Vec<_>>());
    assert_eq!(batch_sizes(&sink), vec![10, 10]);
    assert_eq!(source.committed(), vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn test_exact_fit_is_sealed_immediately() {
    // No end-of-stream entry: the batch can only arrive at the sink if the
    // exact fit seals it the moment the buffer fills.
    let source = source(vec![records(0..7), records(7..10)]);
    let sink = sink();

    let ct = CancellationToken::new();
    let run = tokio::spawn(
        Pipeline::new(source.clone(), sink.clone(), PipelineOptions::new(10)).run(ct.clone()),
    );

    sink.wait_for_batches(1).await;
    source.wait_for_commits(2).await;

    assert_eq!(sink.batches(), vec![(0..10).collect::<Vec<_>>()]);
    assert_eq!(source.committed(), vec![0, 1]);

    ct.cancel();
    let result = run.await.expect("pipeline task");
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_overflow_seals_before_the_oversized_append() {
    // 3000 + 3000 + 3000 fit together; the fourth chunk does not, so the
    // 9000-record batch ships first and the fourth chunk starts a new
    // buffer. The prior batch is never topped up to exactly 10000.
    let source = source(vec![
        records(0..3000),
        records(3000..6000),
        records(6000..9000),
        records(9000..12000),
        ScriptedFetch::EndOfStream,
    ]);
    let sink = sink();

    let options = PipelineOptions::new(10_000).with_queue_capacity(1);
    let result = run_session(&source, &sink, options).await;

    assert!(result.is_ok());
    assert_eq!(batch_sizes(&sink), vec![9000, 3000]);
    assert_eq!(sink.records(), (0..12_000).collect::<Vec<_>>());
    assert_eq!(source.committed(), vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn test_end_of_stream_flushes_the_remainder() {
    let source = source(vec![records(0..7), ScriptedFetch::EndOfStream]);
    let sink = sink();

    let result = run_session(&source, &sink, PipelineOptions::new(10)).await;

    assert!(result.is_ok());
    assert_eq!(sink.batches(), vec![(0..7).collect::<Vec<_>>()]);
    assert_eq!(source.committed(), vec![0]);
}

#[tokio::test]
async fn test_idle_responses_are_polled_through() {
    let source = source(vec![
        ScriptedFetch::Idle,
        records(0..5),
        ScriptedFetch::Idle,
        records(5..10),
        ScriptedFetch::EndOfStream,
    ]);
    let sink = sink();

    let result = run_session(&source, &sink, PipelineOptions::new(10)).await;

    assert!(result.is_ok());
    assert_eq!(sink.records(), (0..10).collect::<Vec<_>>());
    assert_eq!(source.committed(), vec![0, 1]);
}

#[tokio::test]
async fn test_empty_chunk_cookie_rides_with_the_next_batch() {
    let source = source(vec![
        records(0..0),
        records(0..10),
        ScriptedFetch::EndOfStream,
    ]);
    let sink = sink();

    let result = run_session(&source, &sink, PipelineOptions::new(10)).await;

    assert!(result.is_ok());
    assert_eq!(sink.batches(), vec![(0..10).collect::<Vec<_>>()]);
    assert_eq!(source.committed(), vec![0, 1]);
}
