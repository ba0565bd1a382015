use rebatch::PipelineError;
use snafu::Snafu;

use crate::helpers::RangeParserError;

/// CLI error types.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CliError {
    #[snafu(display("Invalid chunk size range"))]
    InvalidChunkSize { source: RangeParserError },
    #[snafu(display("Pipeline run failed"))]
    Pipeline { source: PipelineError },
}

pub type Result<T, E = CliError> = std::result::Result<T, E>;
