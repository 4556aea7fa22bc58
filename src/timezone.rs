//! Market timezone handling
//!
//! MISO publishes every timestamp in Eastern Standard Time and never shifts for
//! daylight saving. All records produced by this crate carry instants in that
//! fixed offset, so every naive wall-clock value read from a payload goes
//! through [`MarketTimezone::localize`] and every offset-carrying value goes
//! through [`MarketTimezone::convert`].

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// Timezone errors
#[derive(Debug, thiserror::Error)]
pub enum TimezoneError {
    /// Identifier is not in the tz database
    #[error("unknown timezone identifier: {0}")]
    UnknownIdentifier(String),

    /// Wall-clock time is skipped or repeated in the zone
    #[error("local time {time} does not map to a single instant in {zone}")]
    AmbiguousLocalTime {
        /// Offending wall-clock time
        time: NaiveDateTime,
        /// Zone name
        zone: String,
    },
}

/// A timestamp as it arrives from a payload: with or without an offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    /// Wall-clock time assumed to already be in the market zone
    Naive(NaiveDateTime),
    /// Instant with an explicit offset
    Aware(DateTime<FixedOffset>),
}

impl From<NaiveDateTime> for Timestamp {
    fn from(value: NaiveDateTime) -> Self {
        Timestamp::Naive(value)
    }
}

impl From<DateTime<FixedOffset>> for Timestamp {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Timestamp::Aware(value)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Timestamp::Aware(value.fixed_offset())
    }
}

/// The grid operator's local zone, validated at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketTimezone {
    tz: Tz,
}

impl MarketTimezone {
    /// Parse a tz database identifier such as `"EST"`.
    pub fn parse(identifier: &str) -> Result<Self, TimezoneError> {
        identifier
            .parse::<Tz>()
            .map(|tz| Self { tz })
            .map_err(|_| TimezoneError::UnknownIdentifier(identifier.to_string()))
    }

    /// Underlying zone
    pub fn tz(&self) -> Tz {
        self.tz
    }

    /// Zone name
    pub fn name(&self) -> &'static str {
        self.tz.name()
    }

    /// Normalize a timestamp: convert when it carries an offset, attach the
    /// market zone when it is naive.
    pub fn normalize(&self, timestamp: impl Into<Timestamp>) -> Result<DateTime<Tz>, TimezoneError> {
        match timestamp.into() {
            Timestamp::Naive(naive) => self.localize(naive),
            Timestamp::Aware(aware) => Ok(self.convert(&aware)),
        }
    }

    /// Attach the market zone to a naive wall-clock time.
    pub fn localize(&self, naive: NaiveDateTime) -> Result<DateTime<Tz>, TimezoneError> {
        self.tz
            .from_local_datetime(&naive)
            .single()
            .ok_or_else(|| TimezoneError::AmbiguousLocalTime {
                time: naive,
                zone: self.tz.name().to_string(),
            })
    }

    /// Convert an instant from any zone into the market zone.
    pub fn convert<Z: TimeZone>(&self, instant: &DateTime<Z>) -> DateTime<Tz> {
        instant.with_timezone(&self.tz)
    }

    /// Midnight at the start of a market day.
    pub fn start_of_day(&self, date: NaiveDate) -> Result<DateTime<Tz>, TimezoneError> {
        self.localize(date.and_time(chrono::NaiveTime::MIN))
    }

    /// Current instant in the market zone
    pub fn now(&self) -> DateTime<Tz> {
        self.convert(&Utc::now())
    }

    /// Current market day
    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// Current hour truncated to zero minutes and seconds.
    pub fn current_hour(&self) -> DateTime<Tz> {
        truncate_to_hour(&self.now())
    }
}

/// Drop minutes, seconds and sub-seconds from an instant.
pub fn truncate_to_hour(instant: &DateTime<Tz>) -> DateTime<Tz> {
    instant
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(*instant)
}
