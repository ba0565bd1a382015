use std::ops::RangeInclusive;

use snafu::{ResultExt, Snafu};

#[derive(Debug, Clone, Snafu)]
pub enum RangeParserError {
    #[snafu(display("Invalid range"))]
    Invalid,
    #[snafu(display("Failed to parse range bound"))]
    Parse { source: std::num::ParseIntError },
}

/// Parses either a single value ("500") or an inclusive range ("500-1500").
pub fn parse_range(range_str: &str) -> Result<RangeInclusive<usize>, RangeParserError> {
    let range_str = range_str.trim();

    let (start, end) = match range_str.split_once('-') {
        None => {
            let value = range_str.parse::<usize>().context(ParseSnafu {})?;
            (value, value)
        }
        Some((start, end)) => {
            let start = start.trim().parse::<usize>().context(ParseSnafu {})?;
            let end = end.trim().parse::<usize>().context(ParseSnafu {})?;
            (start, end)
        }
    };

    if start > end {
        return Err(RangeParserError::Invalid);
    }

    Ok(start..=end)
}
