//! Reference civil timezone used to anchor date-relative language.
//!
//! Phrases like "tomorrow" or "next Monday" only have a deterministic meaning
//! relative to a wall clock. The reference zone is a fixed UTC offset taken
//! from configuration (default +05:30) and threaded explicitly into the
//! extraction pipeline rather than read from ambient process state.

use chrono::{DateTime, FixedOffset, Offset, TimeZone, Utc};

pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 330;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReferenceZone {
    offset: FixedOffset,
}

impl Default for ReferenceZone {
    fn default() -> Self {
        let offset =
            FixedOffset::east_opt(DEFAULT_UTC_OFFSET_MINUTES * 60).unwrap_or_else(|| Utc.fix());
        Self { offset }
    }
}

impl ReferenceZone {
    /// Offsets beyond the civil range (UTC-12:00 to UTC+14:00) are rejected.
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        if !(-720..=840).contains(&minutes) {
            return None;
        }
        FixedOffset::east_opt(minutes * 60).map(|offset| Self { offset })
    }

    pub fn offset_minutes(&self) -> i32 {
        self.offset.local_minus_utc() / 60
    }

    /// End of the civil day containing `now`, as an absolute UTC instant.
    ///
    /// This is the substitute due date for candidates whose source text
    /// carried no usable date: 23:59:59.999 local, converted to UTC.
    pub fn end_of_day(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local_date = now.with_timezone(&self.offset).date_naive();
        let Some(end) = local_date.and_hms_milli_opt(23, 59, 59, 999) else {
            return now;
        };
        match self.offset.from_local_datetime(&end) {
            chrono::LocalResult::Single(instant) | chrono::LocalResult::Ambiguous(instant, _) => {
                instant.with_timezone(&Utc)
            }
            // Fixed offsets have no gaps, but keep a total function anyway.
            chrono::LocalResult::None => now,
        }
    }

    /// Interpret a naive wall-clock datetime in this zone.
    pub fn resolve_local(&self, local: chrono::NaiveDateTime) -> Option<DateTime<Utc>> {
        self.offset.from_local_datetime(&local).single().map(|instant| instant.with_timezone(&Utc))
    }

    /// Render `now` for prompt embedding, e.g. `2025-03-10 18:30:00 UTC+05:30`.
    pub fn describe_instant(&self, now: DateTime<Utc>) -> String {
        let local = now.with_timezone(&self.offset);
        format!("{} UTC{}", local.format("%Y-%m-%d %H:%M:%S"), local.format("%:z"))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::ReferenceZone;

    #[test]
    fn default_zone_is_utc_plus_five_thirty() {
        assert_eq!(ReferenceZone::default().offset_minutes(), 330);
    }

    #[test]
    fn rejects_offsets_outside_civil_range() {
        assert!(ReferenceZone::from_offset_minutes(-721).is_none());
        assert!(ReferenceZone::from_offset_minutes(841).is_none());
        assert!(ReferenceZone::from_offset_minutes(840).is_some());
    }

    #[test]
    fn end_of_day_converts_back_to_utc() {
        let zone = ReferenceZone::from_offset_minutes(330).expect("valid offset");
        // 2025-03-10 01:00 IST is 2025-03-09 19:30 UTC; local day is the 10th.
        let now = Utc.with_ymd_and_hms(2025, 3, 9, 19, 30, 0).single().expect("valid instant");

        let end = zone.end_of_day(now);

        // 2025-03-10 23:59:59.999 IST == 2025-03-10 18:29:59.999 UTC.
        assert_eq!(end.to_rfc3339(), "2025-03-10T18:29:59.999+00:00");
    }

    #[test]
    fn end_of_day_in_utc_zone_stays_on_same_date() {
        let zone = ReferenceZone::from_offset_minutes(0).expect("valid offset");
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).single().expect("valid instant");

        assert_eq!(zone.end_of_day(now).to_rfc3339(), "2025-06-01T23:59:59.999+00:00");
    }

    #[test]
    fn describes_instant_in_local_wall_time() {
        let zone = ReferenceZone::from_offset_minutes(330).expect("valid offset");
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 13, 0, 0).single().expect("valid instant");

        assert_eq!(zone.describe_instant(now), "2025-03-10 18:30:00 UTC+05:30");
    }
}
