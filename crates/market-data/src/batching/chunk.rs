//! Splitting of instrument lists and date ranges into provider-sized batches.

use chrono::{Duration, NaiveDate};

use crate::errors::GatewayError;

/// Splits `keys` into consecutive batches of at most `bound` items.
///
/// Yields `ceil(N / bound)` batches whose concatenation is the input in its original
/// order. A `bound` of zero is treated as one.
pub fn chunk_keys<T>(keys: &[T], bound: usize) -> Vec<&[T]> {
    keys.chunks(bound.max(1)).collect()
}

/// An inclusive range of calendar dates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// Number of calendar days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }
}

/// Splits `[from, to]` into contiguous, non-overlapping inclusive sub-ranges of at most
/// `max_days` days each, in ascending order.
pub fn chunk_date_range(
    from: NaiveDate,
    to: NaiveDate,
    max_days: u32,
) -> Result<Vec<DateRange>, GatewayError> {
    if from > to {
        return Err(GatewayError::InvalidRequest(format!(
            "from_date {} is after to_date {}",
            from, to
        )));
    }
    if max_days == 0 {
        return Err(GatewayError::InvalidRequest(
            "Day span per request must be positive".to_string(),
        ));
    }

    let span = Duration::days(i64::from(max_days) - 1);
    let mut ranges = Vec::new();
    let mut start = from;

    while start <= to {
        let end = start
            .checked_add_signed(span)
            .map_or(to, |end| end.min(to));
        ranges.push(DateRange { from: start, to: end });

        match end.succ_opt() {
            Some(next) => start = next,
            None => break,
        }
    }

    Ok(ranges)
}
