use std::sync::OnceLock;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::PipelineError;

/// Shared cancellation signal plus the first-error slot.
///
/// This is the only mutable state the stages share besides the batch
/// queue. The slot is written at most once: whichever stage fails first
/// records its error and raises the signal, and every later report is
/// discarded. Cancellation is level-triggered; stages check it between
/// iterations and while blocked on the queue.
#[derive(Debug)]
pub struct FailureMonitor {
    token: CancellationToken,
    first_error: OnceLock<PipelineError>,
}

impl FailureMonitor {
    /// Creates a monitor chained to `parent` so an enclosing scope can
    /// stop the run without recording an error.
    pub fn new(parent: &CancellationToken) -> Self {
        Self {
            token: parent.child_token(),
            first_error: OnceLock::new(),
        }
    }

    /// Records a failure and raises the cancellation signal.
    pub fn report(&self, error: PipelineError) {
        match self.first_error.set(error) {
            Ok(()) => self.token.cancel(),
            Err(error) => {
                debug!(error = %error, "discarding failure reported after cancellation");
            }
        }
    }

    /// Cheap non-blocking check used between loop iterations.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes once cancellation is signaled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// The recorded failure, if any stage reported one.
    pub fn first_error(&self) -> Option<PipelineError> {
        self.first_error.get().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oversized(returned: usize) -> PipelineError {
        PipelineError::OversizedFetch {
            returned,
            max_items: 10,
        }
    }

    #[test]
    fn test_first_report_wins() {
        let monitor = FailureMonitor::new(&CancellationToken::new());

        monitor.report(oversized(11));
        monitor.report(oversized(99));

        assert!(monitor.is_cancelled());
        match monitor.first_error() {
            Some(PipelineError::OversizedFetch { returned, .. }) => assert_eq!(returned, 11),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_no_error_until_reported() {
        let monitor = FailureMonitor::new(&CancellationToken::new());

        assert!(!monitor.is_cancelled());
        assert!(monitor.first_error().is_none());
    }

    #[test]
    fn test_parent_cancellation_records_no_error() {
        let parent = CancellationToken::new();
        let monitor = FailureMonitor::new(&parent);

        parent.cancel();

        assert!(monitor.is_cancelled());
        assert!(monitor.first_error().is_none());
    }
}
