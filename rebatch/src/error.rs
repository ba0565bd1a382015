use std::sync::Arc;

use snafu::Snafu;
use tokio::task::JoinError;

/// A failure produced by a source or sink implementation.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Pipeline error types.
///
/// The error returned by a run is the first failure observed by either
/// stage. Collaborator failures are wrapped in `Arc` so the recorded error
/// can be cloned out of the shared slot.
#[derive(Debug, Clone, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PipelineError {
    /// The source failed to produce the next chunk of records.
    #[snafu(display("source fetch failed"))]
    Fetch {
        #[snafu(source(from(BoxedError, Arc::from)))]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },
    /// The sink could not store a batch.
    #[snafu(display("sink process failed"))]
    Process {
        #[snafu(source(from(BoxedError, Arc::from)))]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },
    /// The source could not durably acknowledge a cookie.
    #[snafu(display("source commit failed"))]
    Commit {
        #[snafu(source(from(BoxedError, Arc::from)))]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },
    /// A single fetch carried more records than a batch may hold.
    #[snafu(display("source returned {returned} records in one fetch, limit is {max_items}"))]
    OversizedFetch { returned: usize, max_items: usize },
    /// The pipeline options are invalid.
    #[snafu(display("invalid pipeline options: {message}"))]
    InvalidOptions { message: String },
    /// A stage task stopped without reporting a failure.
    #[snafu(display("{stage} stage panicked"))]
    StagePanicked {
        stage: &'static str,
        #[snafu(source(from(JoinError, Arc::new)))]
        source: Arc<JoinError>,
    },
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
