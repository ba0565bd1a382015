use async_trait::async_trait;

use crate::error::BoxedError;

/// A single response from polling the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResponse<R, C> {
    /// Records are available, together with the cookie marking the
    /// position after them.
    Records { records: Vec<R>, cookie: C },
    /// Nothing is available right now; the pipeline polls again.
    Idle,
    /// The source will produce no more data for this session.
    EndOfStream,
}

/// The upstream collaborator the pipeline drains.
///
/// A fetch returns at most as many records as a batch may hold, and every
/// cookie it issues must later be committed in exactly the order it was
/// issued. Pacing belongs to the implementation: the pipeline polls again
/// immediately after [`FetchResponse::Idle`], so a source with nothing to
/// return should wait (or at least yield) before answering. Prefer `Idle`
/// over a `Records` response with an empty record set; an empty set is
/// tolerated and its cookie is committed with the batch it joined.
#[async_trait]
pub trait RecordSource: Send + Sync {
    type Record: Send + 'static;
    type Cookie: Send + 'static;

    /// Returns the next chunk of records and the cookie covering it.
    ///
    /// An error means the stream is unrecoverable for this run.
    async fn fetch_next(&self) -> Result<FetchResponse<Self::Record, Self::Cookie>, BoxedError>;

    /// Durably records that everything up to and including this cookie's
    /// position has been processed.
    ///
    /// An error means the commit is unrecoverable for this run.
    async fn commit(&self, cookie: Self::Cookie) -> Result<(), BoxedError>;
}
