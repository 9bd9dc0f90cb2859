use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use thiserror::Error;

/// Rental timetables are written against the campus wall clock (UTC+7).
pub const RENTAL_UTC_OFFSET_SECS: i32 = 7 * 3600;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("invalid time range: end must be after start")]
pub struct InvalidRangeError;

/// Half-open interval `[start, end)` on a single absolute timeline.
///
/// A multi-day booking is one continuous interval from (start date, start
/// time) to (end date, end time); a same-day booking only spans the
/// time-of-day window within that date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    /// Combines dates and times-of-day at the fixed rental offset and
    /// normalizes to UTC. Degenerate ranges (`end <= start`) are refused.
    pub fn new(
        start_date: NaiveDate,
        start_time: NaiveTime,
        end_date: NaiveDate,
        end_time: NaiveTime,
    ) -> Result<Self, InvalidRangeError> {
        let offset =
            FixedOffset::east_opt(RENTAL_UTC_OFFSET_SECS).expect("rental offset is in range");

        let start = start_date
            .and_time(start_time)
            .and_local_timezone(offset)
            .single()
            .ok_or(InvalidRangeError)?
            .with_timezone(&Utc);
        let end = end_date
            .and_time(end_time)
            .and_local_timezone(offset)
            .single()
            .ok_or(InvalidRangeError)?
            .with_timezone(&Utc);

        Self::from_instants(start, end)
    }

    /// Builds a range from already-normalized instants, e.g. rows loaded
    /// from storage.
    pub fn from_instants(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self, InvalidRangeError> {
        if end <= start {
            return Err(InvalidRangeError);
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// True iff the half-open intervals intersect. Back-to-back ranges
    /// (`self.end == other.start`) do not conflict.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, min: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, min, 0).unwrap()
    }

    fn range(d1: NaiveDate, t1: NaiveTime, d2: NaiveDate, t2: NaiveTime) -> TimeRange {
        TimeRange::new(d1, t1, d2, t2).unwrap()
    }

    #[test]
    fn rejects_degenerate_ranges() {
        let day = date(2024, 1, 10);
        assert_eq!(
            TimeRange::new(day, time(10, 0), day, time(10, 0)),
            Err(InvalidRangeError)
        );
        assert_eq!(
            TimeRange::new(day, time(11, 0), day, time(9, 0)),
            Err(InvalidRangeError)
        );
    }

    #[test]
    fn normalizes_wall_clock_to_utc() {
        let day = date(2024, 1, 10);
        let r = range(day, time(9, 0), day, time(11, 0));
        // 09:00 UTC+7 is 02:00 UTC.
        assert_eq!(r.start(), "2024-01-10T02:00:00Z".parse::<DateTime<Utc>>().unwrap());
        assert_eq!(r.end(), "2024-01-10T04:00:00Z".parse::<DateTime<Utc>>().unwrap());
    }

    #[test]
    fn overlap_is_symmetric() {
        let day = date(2024, 1, 10);
        let a = range(day, time(9, 0), day, time(11, 0));
        let b = range(day, time(10, 0), day, time(12, 0));
        let c = range(day, time(13, 0), day, time(14, 0));

        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
        assert!(!c.overlaps(&a));
    }

    #[test]
    fn adjacent_ranges_do_not_conflict() {
        let day = date(2024, 1, 10);
        let morning = range(day, time(9, 0), day, time(10, 0));
        let next = range(day, time(10, 0), day, time(11, 0));

        assert!(!morning.overlaps(&next));
        assert!(!next.overlaps(&morning));
    }

    #[test]
    fn containment_counts_as_overlap() {
        let day = date(2024, 1, 10);
        let outer = range(day, time(8, 0), day, time(18, 0));
        let inner = range(day, time(12, 0), day, time(13, 0));

        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
    }

    #[test]
    fn multi_day_booking_is_one_continuous_interval() {
        let event = range(date(2024, 1, 10), time(8, 0), date(2024, 1, 12), time(17, 0));
        // Overnight inside the event window, far from either day's hours.
        let overnight = range(date(2024, 1, 11), time(1, 0), date(2024, 1, 11), time(2, 0));
        assert!(event.overlaps(&overnight));

        let after = range(date(2024, 1, 12), time(17, 0), date(2024, 1, 12), time(19, 0));
        assert!(!event.overlaps(&after));
    }

    #[test]
    fn same_times_on_different_days_do_not_conflict() {
        let monday = range(date(2024, 1, 8), time(9, 0), date(2024, 1, 8), time(11, 0));
        let tuesday = range(date(2024, 1, 9), time(9, 0), date(2024, 1, 9), time(11, 0));
        assert!(!monday.overlaps(&tuesday));
    }
}
