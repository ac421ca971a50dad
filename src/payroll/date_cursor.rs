use std::cmp::Ordering;
use std::fmt;

use chrono::{Datelike, Days, NaiveDate, TimeZone};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// Milliseconds in a nominal 24h day.
pub const DAY_MS: i64 = 86_400_000;

/// A calendar date with no time component, always rendered as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IsoDate(NaiveDate);

impl IsoDate {
    /// Strict `YYYY-MM-DD` parse. Anything else (time suffix, missing
    /// padding, whitespace, impossible day) is rejected.
    pub fn parse(s: &str) -> Option<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
            return None;
        }
        let all_digits = bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
        if !all_digits {
            return None;
        }

        let year: i32 = s[0..4].parse().ok()?;
        let month: u32 = s[5..7].parse().ok()?;
        let day: u32 = s[8..10].parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day).map(IsoDate)
    }

    pub fn from_naive(date: NaiveDate) -> Self {
        IsoDate(date)
    }

    pub fn naive(&self) -> NaiveDate {
        self.0
    }

    /// Epoch milliseconds of local midnight on this date in `tz`.
    ///
    /// Ambiguous midnights resolve to the earliest instant; a midnight that
    /// does not exist in `tz` (DST gap) yields `None`.
    pub fn local_midnight_ms<Tz: TimeZone>(&self, tz: &Tz) -> Option<i64> {
        let midnight = self.0.and_hms_opt(0, 0, 0)?;
        tz.from_local_datetime(&midnight)
            .earliest()
            .map(|dt| dt.timestamp_millis())
    }
}

impl fmt::Display for IsoDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}",
            self.0.year(),
            self.0.month(),
            self.0.day()
        )
    }
}

impl Serialize for IsoDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for IsoDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        IsoDate::parse(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid date `{raw}`, expected YYYY-MM-DD")))
    }
}

pub fn iso_to_local_midnight_ms<Tz: TimeZone>(iso: &str, tz: &Tz) -> Option<i64> {
    IsoDate::parse(iso)?.local_midnight_ms(tz)
}

pub fn ms_to_iso<Tz: TimeZone>(ms: i64, tz: &Tz) -> Option<IsoDate> {
    let local = tz.timestamp_millis_opt(ms).single()?;
    Some(IsoDate(local.date_naive()))
}

/// Adds `n` nominal days of elapsed time to local midnight and reads the
/// local date back. Across a DST transition this can land one calendar day
/// off; callers that iterate must not assume the result always moves.
pub fn add_days<Tz: TimeZone>(date: IsoDate, n: i64, tz: &Tz) -> Option<IsoDate> {
    let start = date.local_midnight_ms(tz)?;
    let shifted = start.checked_add(n.checked_mul(DAY_MS)?)?;
    ms_to_iso(shifted, tz)
}

pub fn add_weeks<Tz: TimeZone>(date: IsoDate, n: i64, tz: &Tz) -> Option<IsoDate> {
    add_days(date, n.checked_mul(7)?, tz)
}

/// Calendar month arithmetic. The day-of-month is kept and overflow rolls
/// into the following month: `2024-01-31 + 1` is `2024-03-02`.
pub fn add_months(date: IsoDate, n: i32) -> Option<IsoDate> {
    let d = date.0;
    let total = i64::from(d.year()) * 12 + i64::from(d.month0()) + i64::from(n);
    let year = i32::try_from(total.div_euclid(12)).ok()?;
    let month = u32::try_from(total.rem_euclid(12)).ok()? + 1;

    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    first
        .checked_add_days(Days::new(u64::from(d.day0())))
        .map(IsoDate)
}

/// Plain string ordering; valid because dates are zero padded. The empty
/// string sorts before every date.
pub fn compare_iso(a: &str, b: &str) -> Ordering {
    a.cmp(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn d(s: &str) -> IsoDate {
        IsoDate::parse(s).unwrap()
    }

    #[test]
    fn parse_is_strict() {
        assert!(IsoDate::parse("2024-01-05").is_some());
        assert!(IsoDate::parse("").is_none());
        assert!(IsoDate::parse("2024-1-05").is_none());
        assert!(IsoDate::parse("2024-01-05T00:00:00").is_none());
        assert!(IsoDate::parse(" 2024-01-05").is_none());
        assert!(IsoDate::parse("2024/01/05").is_none());
        assert!(IsoDate::parse("2024-02-30").is_none());
        assert!(IsoDate::parse("+202-01-05").is_none());
    }

    #[test]
    fn display_is_zero_padded() {
        assert_eq!(d("0999-03-07").to_string(), "0999-03-07");
        assert_eq!(d("2024-12-31").to_string(), "2024-12-31");
    }

    #[test]
    fn midnight_ms_follows_timezone() {
        assert_eq!(iso_to_local_midnight_ms("2024-01-01", &Utc), Some(1_704_067_200_000));

        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(
            iso_to_local_midnight_ms("2024-01-01", &plus_two),
            Some(1_704_067_200_000 - 2 * 3_600_000)
        );
        assert_eq!(iso_to_local_midnight_ms("01/01/2024", &Utc), None);
    }

    #[test]
    fn ms_to_iso_uses_local_components() {
        let minus_five = FixedOffset::west_opt(5 * 3600).unwrap();
        // 2024-01-01T03:00Z is still Dec 31 five hours west
        let ms = 1_704_067_200_000 + 3 * 3_600_000;
        assert_eq!(ms_to_iso(ms, &Utc), Some(d("2024-01-01")));
        assert_eq!(ms_to_iso(ms, &minus_five), Some(d("2023-12-31")));
    }

    #[test]
    fn add_days_crosses_month_and_year() {
        assert_eq!(add_days(d("2024-01-31"), 1, &Utc), Some(d("2024-02-01")));
        assert_eq!(add_days(d("2024-02-28"), 1, &Utc), Some(d("2024-02-29")));
        assert_eq!(add_days(d("2023-12-31"), 1, &Utc), Some(d("2024-01-01")));
        assert_eq!(add_days(d("2024-01-10"), -10, &Utc), Some(d("2023-12-31")));
    }

    #[test]
    fn add_weeks_is_seven_days() {
        let tz = FixedOffset::east_opt(6 * 3600).unwrap();
        assert_eq!(add_weeks(d("2024-01-29"), 1, &tz), Some(d("2024-02-05")));
        assert_eq!(add_weeks(d("2024-01-01"), 2, &tz), add_days(d("2024-01-01"), 14, &tz));
    }

    #[test]
    fn add_days_across_fall_back_in_new_york() {
        use chrono_tz::America::New_York;

        // 2024-11-03 is 25 hours long; 24h after its midnight is still Nov 3
        assert_eq!(add_days(d("2024-11-02"), 1, &New_York), Some(d("2024-11-03")));
        assert_eq!(add_days(d("2024-11-03"), 1, &New_York), Some(d("2024-11-03")));
        assert_eq!(add_days(d("2024-11-04"), 1, &New_York), Some(d("2024-11-05")));

        // a week spanning the transition lands one day early
        assert_eq!(add_weeks(d("2024-10-30"), 1, &New_York), Some(d("2024-11-05")));
        // spring forward loses an hour but not a day
        assert_eq!(add_days(d("2024-03-10"), 1, &New_York), Some(d("2024-03-11")));
    }

    #[test]
    fn add_months_normalises_overflow() {
        assert_eq!(add_months(d("2024-01-15"), 1), Some(d("2024-02-15")));
        assert_eq!(add_months(d("2024-01-31"), 1), Some(d("2024-03-02")));
        assert_eq!(add_months(d("2023-01-31"), 1), Some(d("2023-03-03")));
        assert_eq!(add_months(d("2024-11-30"), 3), Some(d("2025-03-02")));
        assert_eq!(add_months(d("2024-03-15"), -3), Some(d("2023-12-15")));
    }

    #[test]
    fn compare_iso_orders_empty_first() {
        assert_eq!(compare_iso("", "2024-01-01"), Ordering::Less);
        assert_eq!(compare_iso("2024-01-02", "2024-01-01"), Ordering::Greater);
        assert_eq!(compare_iso("2024-01-01", "2024-01-01"), Ordering::Equal);
    }

    #[test]
    fn serde_rejects_loose_formats() {
        let ok: IsoDate = serde_json::from_str("\"2024-03-01\"").unwrap();
        assert_eq!(ok, d("2024-03-01"));
        assert_eq!(serde_json::to_string(&ok).unwrap(), "\"2024-03-01\"");
        assert!(serde_json::from_str::<IsoDate>("\"2024-3-1\"").is_err());
    }
}
