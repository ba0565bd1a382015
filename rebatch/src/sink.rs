use async_trait::async_trait;

use crate::error::BoxedError;

/// The downstream collaborator that accepts bulk writes.
#[async_trait]
pub trait RecordSink: Send + Sync {
    type Record: Send + 'static;

    /// Stores one batch of at most the configured number of records.
    ///
    /// An error means the batch could not be delivered and ends the run.
    async fn process(&self, records: Vec<Self::Record>) -> Result<(), BoxedError>;
}
