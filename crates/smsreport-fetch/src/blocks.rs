//! Date-range splitting.

use chrono::{Days, FixedOffset, NaiveDate};
use smsreport_core::{Error, Result};

use crate::types::DateBlock;

/// Fixed UTC offset from whole hours (negative is west of UTC).
pub fn fixed_offset(hours: i32) -> Result<FixedOffset> {
    FixedOffset::east_opt(hours * 3600)
        .ok_or_else(|| Error::Config(format!("invalid UTC offset: {} hours", hours)))
}

/// Split `[start, end]` into at most `max_blocks` contiguous inclusive
/// blocks of equal length (the last one may be shorter).
pub fn split_range(start: NaiveDate, end: NaiveDate, max_blocks: usize) -> Result<Vec<DateBlock>> {
    if start > end {
        return Err(Error::Config(format!(
            "start date {} is after end date {}",
            start, end
        )));
    }
    if max_blocks < 1 {
        return Err(Error::Config("workers must be at least 1".into()));
    }

    let days = (end - start).num_days() as u64 + 1;
    let blocks = (max_blocks as u64).clamp(1, days);
    let block_len = days.div_ceil(blocks);

    let mut out = Vec::new();
    let mut cursor = start;
    while cursor <= end {
        let block_end = cursor
            .checked_add_days(Days::new(block_len - 1))
            .map_or(end, |d| d.min(end));
        out.push(DateBlock {
            index: out.len() + 1,
            start: cursor,
            end: block_end,
        });
        match block_end.checked_add_days(Days::new(1)) {
            Some(next) => cursor = next,
            None => break,
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, day).unwrap()
    }

    #[test]
    fn test_even_split() {
        let blocks = split_range(d(1), d(10), 5).unwrap();
        assert_eq!(blocks.len(), 5);
        assert_eq!((blocks[0].start, blocks[0].end), (d(1), d(2)));
        assert_eq!((blocks[4].start, blocks[4].end), (d(9), d(10)));
        assert_eq!(blocks[4].index, 5);
    }

    #[test]
    fn test_uneven_split_covers_range() {
        let blocks = split_range(d(1), d(10), 4).unwrap();
        // ceil(10 / 4) = 3 days per block
        let spans: Vec<_> = blocks.iter().map(|b| (b.start, b.end)).collect();
        assert_eq!(
            spans,
            vec![(d(1), d(3)), (d(4), d(6)), (d(7), d(9)), (d(10), d(10))]
        );
    }

    #[test]
    fn test_more_workers_than_days() {
        let blocks = split_range(d(7), d(8), 12).unwrap();
        assert_eq!(blocks.len(), 2);
        let single = split_range(d(7), d(7), 3).unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!((single[0].start, single[0].end), (d(7), d(7)));
    }

    #[test]
    fn test_fixed_offset() {
        assert_eq!(fixed_offset(-3).unwrap().local_minus_utc(), -3 * 3600);
        assert!(fixed_offset(30).is_err());
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(split_range(d(8), d(7), 2), Err(Error::Config(_))));
        assert!(matches!(split_range(d(7), d(8), 0), Err(Error::Config(_))));
    }
}
