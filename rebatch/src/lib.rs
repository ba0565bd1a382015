pub mod accumulator;
pub mod deliver;
pub mod error;
pub mod fetch;
pub mod memory;
pub mod monitor;
pub mod pipeline;
pub mod sink;
pub mod source;

pub use accumulator::SealedBatch;
pub use error::{BoxedError, PipelineError, Result};
pub use pipeline::{Pipeline, PipelineOptions, run};
pub use sink::RecordSink;
pub use source::{FetchResponse, RecordSource};
