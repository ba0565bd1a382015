use std::{sync::Arc, time::Duration};

use clap::Parser;
use rebatch::{Pipeline, PipelineOptions};
use snafu::ResultExt;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::{
    error::{InvalidChunkSizeSnafu, PipelineSnafu, Result},
    generators::{DelaySink, SyntheticSource},
    helpers::parse_range,
};

mod error;
mod generators;
mod helpers;

#[derive(Parser)]
#[command(name = "rebatch-stress")]
#[command(about = "Rebatch pipeline stress CLI")]
#[command(version)]
struct Cli {
    /// Largest batch the sink accepts in one call.
    #[arg(long, default_value = "10000")]
    max_items: usize,
    /// Bounded queue capacity between the fetch and delivery stages.
    #[arg(long, default_value = "2")]
    queue_capacity: usize,
    /// Records per fetch.
    ///
    /// Either provide a number (e.g. 500) or a range (e.g. 500-1500).
    #[arg(long, default_value = "500-1500")]
    chunk_size: String,
    /// How many chunks to produce before ending the stream.
    #[arg(long, default_value = "200")]
    chunks: u64,
    /// Sink latency per batch, in milliseconds.
    #[arg(long, default_value = "5")]
    sink_delay_ms: u64,
}

#[tokio::main]
#[snafu::report]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    let ct = CancellationToken::new();
    tokio::spawn({
        let ct = ct.clone();
        async move {
            let _ = tokio::signal::ctrl_c().await;
            ct.cancel();
        }
    });

    let chunk_size = parse_range(&cli.chunk_size).context(InvalidChunkSizeSnafu {})?;

    println!("Running stress test");
    println!("  Max items: {}", cli.max_items);
    println!("  Queue capacity: {}", cli.queue_capacity);
    println!("  Chunk size: {:?}", chunk_size);
    println!("  Chunks: {}", cli.chunks);
    println!("  Sink delay: {}ms", cli.sink_delay_ms);

    let source = Arc::new(SyntheticSource::new(chunk_size, cli.chunks));
    let sink = Arc::new(DelaySink::new(Duration::from_millis(cli.sink_delay_ms)));
    let options = PipelineOptions::new(cli.max_items).with_queue_capacity(cli.queue_capacity);

    let started = std::time::Instant::now();
    Pipeline::new(source.clone(), sink.clone(), options)
        .run(ct)
        .await
        .context(PipelineSnafu {})?;
    let elapsed = started.elapsed();

    println!("Done in {:.2}s", elapsed.as_secs_f64());
    println!("  Records produced: {}", source.records_produced());
    println!("  Batches delivered: {}", sink.batches_processed());
    println!("  Records delivered: {}", sink.records_processed());
    println!("  Cookies committed: {}", source.cookies_committed());

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
