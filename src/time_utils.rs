use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Timelike, Utc};

/// Unix epoch in the proleptic Gregorian calendar
pub fn unix_epoch() -> NaiveDateTime {
    DateTime::<Utc>::UNIX_EPOCH.naive_utc()
}

/// Counting unit of a CF-style time encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Seconds represented by one count of this unit
    pub fn seconds(&self) -> f64 {
        match self {
            TimeUnit::Nanoseconds => 1e-9,
            TimeUnit::Microseconds => 1e-6,
            TimeUnit::Milliseconds => 1e-3,
            TimeUnit::Seconds => 1.0,
            TimeUnit::Minutes => 60.0,
            TimeUnit::Hours => 3600.0,
            TimeUnit::Days => 86400.0,
        }
    }

    fn from_word(word: &str) -> Option<Self> {
        match word {
            "nanoseconds" | "nanosecond" | "ns" => Some(TimeUnit::Nanoseconds),
            "microseconds" | "microsecond" | "us" => Some(TimeUnit::Microseconds),
            "milliseconds" | "millisecond" | "ms" => Some(TimeUnit::Milliseconds),
            "seconds" | "second" | "sec" | "s" => Some(TimeUnit::Seconds),
            "minutes" | "minute" | "min" => Some(TimeUnit::Minutes),
            "hours" | "hour" | "hr" | "h" => Some(TimeUnit::Hours),
            "days" | "day" | "d" => Some(TimeUnit::Days),
            _ => None,
        }
    }
}

/// Parsed CF time encoding, e.g. "hours since 1970-01-01 00:00:00"
#[derive(Debug, Clone, PartialEq)]
pub struct CfTimeUnits {
    pub unit: TimeUnit,
    pub reference: NaiveDateTime,
}

impl CfTimeUnits {
    /// Parse a "unit since reference" encoding string
    pub fn parse(units: &str) -> Result<Self, String> {
        let lower = units.trim().to_lowercase();
        let (unit_word, reference_str) = lower
            .split_once(" since ")
            .ok_or_else(|| format!("Time units not in 'unit since reference' form: {}", units))?;

        let unit = TimeUnit::from_word(unit_word.trim())
            .ok_or_else(|| format!("Unrecognized time unit: {}", unit_word))?;
        let reference = parse_time_string(reference_str.trim())?;

        Ok(Self { unit, reference })
    }

    /// Conventional encoding of the given counting unit against the Unix epoch
    pub fn since_unix_epoch(unit: TimeUnit) -> Self {
        Self {
            unit,
            reference: unix_epoch(),
        }
    }

    /// Decode a numeric offset into a calendar timestamp. Sub-second
    /// precision is discarded.
    pub fn decode(&self, value: f64) -> NaiveDateTime {
        let seconds = (value * self.unit.seconds()).trunc() as i64;
        self.reference + Duration::seconds(seconds)
    }

    /// Encode a calendar timestamp as a numeric offset in this unit
    pub fn encode(&self, timestamp: NaiveDateTime) -> f64 {
        (timestamp - self.reference).num_seconds() as f64 / self.unit.seconds()
    }
}

/// Parse a datetime literal as used in CF reference strings and on the
/// command line. Accepts `YYYY-MM-DD[ HH:MM[:SS[.frac]]]` with either a
/// space or `T` separator; fractional seconds are truncated.
pub fn parse_time_string(text: &str) -> Result<NaiveDateTime, String> {
    let formats = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    for format in formats {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(parsed.with_nanosecond(0).unwrap_or(parsed));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(datetime) = date.and_hms_opt(0, 0, 0) {
            return Ok(datetime);
        }
    }
    Err(format!("Unparseable datetime: {}", text))
}

/// Reconstructed calendar time axis: a fixed-step sequence of timestamps
/// starting at the run's initialization time
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastTimeAxis {
    pub start: NaiveDateTime,
    pub step: Duration,
    pub len: usize,
}

impl ForecastTimeAxis {
    pub fn new(start: NaiveDateTime, step_hours: i64, len: usize) -> Self {
        Self {
            start,
            step: Duration::hours(step_hours),
            len,
        }
    }

    /// All timestamps of the axis, strictly increasing by construction
    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        let mut times = Vec::with_capacity(self.len);
        let mut current = self.start;
        for _ in 0..self.len {
            times.push(current);
            current += self.step;
        }
        times
    }

    /// Axis values expressed in the given encoding
    pub fn values_in(&self, units: &CfTimeUnits) -> Vec<f64> {
        self.timestamps()
            .iter()
            .map(|t| units.encode(*t))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datetime(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_parse_hours_since_epoch() {
        let units = CfTimeUnits::parse("hours since 1970-01-01 00:00:00").unwrap();
        assert_eq!(units.unit, TimeUnit::Hours);
        assert_eq!(units.reference, unix_epoch());
    }

    #[test]
    fn test_parse_nanoseconds_units() {
        let units = CfTimeUnits::parse("nanoseconds since 2013-01-01").unwrap();
        assert_eq!(units.unit, TimeUnit::Nanoseconds);
        assert_eq!(units.reference, datetime(2013, 1, 1, 0, 0, 0));
    }

    #[test]
    fn test_parse_rejects_malformed_units() {
        assert!(CfTimeUnits::parse("hours").is_err());
        assert!(CfTimeUnits::parse("fortnights since 1970-01-01").is_err());
        assert!(CfTimeUnits::parse("hours since someday").is_err());
    }

    #[test]
    fn test_decode_hours_offset() {
        let units = CfTimeUnits::parse("hours since 1970-01-01 00:00:00").unwrap();
        let offset = (datetime(2013, 1, 1, 0, 0, 0) - unix_epoch()).num_hours() as f64;
        assert_eq!(units.decode(offset), datetime(2013, 1, 1, 0, 0, 0));
    }

    #[test]
    fn test_decode_truncates_subseconds() {
        let units = CfTimeUnits::since_unix_epoch(TimeUnit::Seconds);
        assert_eq!(units.decode(90.7), datetime(1970, 1, 1, 0, 1, 30));

        let nanos = CfTimeUnits::since_unix_epoch(TimeUnit::Nanoseconds);
        assert_eq!(nanos.decode(1.5e9), datetime(1970, 1, 1, 0, 0, 1));
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let units = CfTimeUnits::parse("hours since 1970-01-01 00:00:00").unwrap();
        let t = datetime(2020, 6, 15, 18, 0, 0);
        assert_eq!(units.decode(units.encode(t)), t);
        assert_eq!(units.encode(unix_epoch()), 0.0);
    }

    #[test]
    fn test_parse_time_string_variants() {
        assert_eq!(
            parse_time_string("2013-01-01 06:00:00").unwrap(),
            datetime(2013, 1, 1, 6, 0, 0)
        );
        assert_eq!(
            parse_time_string("2013-01-01T06:00:00").unwrap(),
            datetime(2013, 1, 1, 6, 0, 0)
        );
        assert_eq!(
            parse_time_string("2013-01-01 06:00:00.123456").unwrap(),
            datetime(2013, 1, 1, 6, 0, 0)
        );
        assert_eq!(
            parse_time_string("2013-01-01").unwrap(),
            datetime(2013, 1, 1, 0, 0, 0)
        );
        assert!(parse_time_string("January 1st").is_err());
    }

    #[test]
    fn test_axis_four_steps_from_new_year() {
        let axis = ForecastTimeAxis::new(datetime(2013, 1, 1, 0, 0, 0), 6, 4);
        assert_eq!(
            axis.timestamps(),
            vec![
                datetime(2013, 1, 1, 0, 0, 0),
                datetime(2013, 1, 1, 6, 0, 0),
                datetime(2013, 1, 1, 12, 0, 0),
                datetime(2013, 1, 1, 18, 0, 0),
            ]
        );
    }

    #[test]
    fn test_axis_spacing_over_leap_year() {
        // 1460 steps of 6 hours spans a full year, crossing 2012-02-29
        let axis = ForecastTimeAxis::new(datetime(2012, 1, 1, 0, 0, 0), 6, 1460);
        let times = axis.timestamps();
        assert_eq!(times.len(), 1460);
        for pair in times.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::hours(6));
        }
        assert_eq!(times[1460 - 1], datetime(2012, 12, 30, 18, 0, 0));
    }

    #[test]
    fn test_axis_values_in_epoch_hours() {
        let axis = ForecastTimeAxis::new(datetime(2013, 1, 1, 0, 0, 0), 6, 3);
        let units = CfTimeUnits::parse("hours since 1970-01-01 00:00:00").unwrap();
        let base = (datetime(2013, 1, 1, 0, 0, 0) - unix_epoch()).num_hours() as f64;
        assert_eq!(
            axis.values_in(&units),
            vec![base, base + 6.0, base + 12.0]
        );
    }
}
