//! Date/time conversion and register utilities for the SD3078 RTC.
//!
//! This module provides the host facing [`Timestamp`] and [`EventTime`]
//! values together with the internal register images they are converted
//! to and from.
//!
//! # Register Model
//!
//! The SD3078 stores date and time in 7 consecutive registers:
//! - Seconds, Minutes, Hours, Weekday, Day, Month, Year
//!
//! The two temperature event blocks hold the same layout minus seconds.
//!
//! # Conventions
//!
//! - The year is stored as an offset from 2000 in one register, so only
//!   2000-2098 can be written.
//! - The host weekday is 0-based starting on Monday; the chip counts from
//!   Sunday. Every transfer shifts by one, modulo 7.
//! - Hours are always written in 24-hour mode (bit 7 of the hours register).

use core::ops::RangeInclusive;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::bcd::{bcd_to_dec, CodecError, CodecPolicy};
use crate::registers::{Day, Hours, Minutes, Month, Seconds, Weekday, Year};

/// Year represented by a zero year register.
pub const BASE_YEAR: u16 = 2000;

/// Number of fields in the host timestamp tuple.
pub const TIMESTAMP_FIELDS: usize = 8;

/// Date and time exchanged with callers and the host clock.
///
/// Field order in the tuple form (see [`Timestamp::fields`]) is
/// `(year, month, day, hour, minute, second, weekday, yearday)`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timestamp {
    /// Full year, 2000-2098
    pub year: u16,
    /// Month, 1-12
    pub month: u8,
    /// Day of month, 1-31
    pub day: u8,
    /// Hour, 0-23
    pub hour: u8,
    /// Minute, 0-59
    pub minute: u8,
    /// Second, 0-59
    pub second: u8,
    /// Day of week, 0-6 with 0 = Monday
    pub weekday: u8,
    /// Day of year, 1-366; the chip does not store it and reads return 0
    pub yearday: u16,
}

/// The host tuple did not have exactly [`TIMESTAMP_FIELDS`] fields.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FieldCountError(pub usize);

impl Timestamp {
    /// Returns the timestamp in tuple order.
    pub fn fields(&self) -> [u16; TIMESTAMP_FIELDS] {
        [
            self.year,
            u16::from(self.month),
            u16::from(self.day),
            u16::from(self.hour),
            u16::from(self.minute),
            u16::from(self.second),
            u16::from(self.weekday),
            self.yearday,
        ]
    }

    /// Converts to a chrono `NaiveDateTime`, `None` if the fields do not
    /// form a valid calendar date and time.
    pub fn to_naive_datetime(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(
            i32::from(self.year),
            u32::from(self.month),
            u32::from(self.day),
        )?
        .and_hms_opt(
            u32::from(self.hour),
            u32::from(self.minute),
            u32::from(self.second),
        )
    }
}

impl TryFrom<&[u16]> for Timestamp {
    type Error = FieldCountError;

    /// Builds a timestamp from the 8-field host tuple.
    ///
    /// Fields that do not fit in a byte saturate to 255, which the codec
    /// then treats as out of range.
    fn try_from(fields: &[u16]) -> Result<Self, Self::Error> {
        let [year, month, day, hour, minute, second, weekday, yearday] =
            <[u16; TIMESTAMP_FIELDS]>::try_from(fields)
                .map_err(|_| FieldCountError(fields.len()))?;
        Ok(Timestamp {
            year,
            month: saturate(u32::from(month)),
            day: saturate(u32::from(day)),
            hour: saturate(u32::from(hour)),
            minute: saturate(u32::from(minute)),
            second: saturate(u32::from(second)),
            weekday: saturate(u32::from(weekday)),
            yearday,
        })
    }
}

impl From<&NaiveDateTime> for Timestamp {
    fn from(datetime: &NaiveDateTime) -> Self {
        Timestamp {
            year: u16::try_from(datetime.year()).unwrap_or(0),
            month: saturate(datetime.month()),
            day: saturate(datetime.day()),
            hour: saturate(datetime.hour()),
            minute: saturate(datetime.minute()),
            second: saturate(datetime.second()),
            weekday: saturate(datetime.weekday().num_days_from_monday()),
            yearday: u16::try_from(datetime.ordinal()).unwrap_or(0),
        }
    }
}

/// Receiver for the timestamp read back from the chip.
///
/// [`crate::SD3078::time`] hands every successful read to the installed
/// clock before returning it, which is how the system clock is seeded from
/// the RTC at boot.
pub trait HostClock {
    /// Sets the host clock to `timestamp`.
    fn set_time(&mut self, timestamp: &Timestamp);
}

/// No host clock; reads are only returned to the caller.
impl HostClock for () {
    fn set_time(&mut self, _timestamp: &Timestamp) {}
}

impl<T: HostClock + ?Sized> HostClock for &mut T {
    fn set_time(&mut self, timestamp: &Timestamp) {
        (**self).set_time(timestamp);
    }
}

/// Time of a recorded temperature extreme. The chip stores no seconds.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EventTime {
    /// Full year
    pub year: u16,
    /// Month, 1-12
    pub month: u8,
    /// Day of month, 1-31
    pub day: u8,
    /// Day of week, 0-6 with 0 = Monday
    pub weekday: u8,
    /// Hour, 0-23
    pub hour: u8,
    /// Minute, 0-59
    pub minute: u8,
}

impl EventTime {
    /// Converts to a chrono `NaiveDateTime` with zero seconds.
    pub fn to_naive_datetime(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(
            i32::from(self.year),
            u32::from(self.month),
            u32::from(self.day),
        )?
        .and_hms_opt(u32::from(self.hour), u32::from(self.minute), 0)
    }
}

fn saturate(value: u32) -> u8 {
    u8::try_from(value).unwrap_or(u8::MAX)
}

/// Host weekday (0 = Monday) to chip weekday (0 = Sunday).
pub(crate) fn weekday_to_chip(weekday: u8) -> u8 {
    (weekday % 7 + 1) % 7
}

/// Chip weekday (0 = Sunday) to host weekday (0 = Monday).
pub(crate) fn weekday_from_chip(weekday: u8) -> u8 {
    (weekday % 7 + 6) % 7
}

/// Encodes one field, range checking it first when the policy is strict.
fn encode_field(
    policy: CodecPolicy,
    value: u8,
    range: RangeInclusive<u8>,
) -> Result<u8, CodecError> {
    if policy.is_strict() && !range.contains(&value) {
        return Err(CodecError::OutOfRange);
    }
    policy.encode(value)
}

/// Decodes one register field, range checking the result when the policy
/// is strict.
fn decode_field(
    policy: CodecPolicy,
    raw: u8,
    range: RangeInclusive<u8>,
) -> Result<u8, CodecError> {
    let value = policy.decode(raw)?;
    if policy.is_strict() && !range.contains(&value) {
        return Err(CodecError::OutOfRange);
    }
    Ok(value)
}

/// Internal representation of the SD3078 date and time registers.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct SD3078DateTime {
    seconds: Seconds,
    minutes: Minutes,
    hours: Hours,
    weekday: Weekday,
    day: Day,
    month: Month,
    year: Year,
}

impl SD3078DateTime {
    pub(crate) fn from_timestamp(
        timestamp: &Timestamp,
        policy: CodecPolicy,
    ) -> Result<Self, CodecError> {
        let year_offset = timestamp
            .year
            .checked_sub(BASE_YEAR)
            .map_or(u8::MAX, |offset| saturate(u32::from(offset)));
        if policy.is_strict() && timestamp.weekday > 6 {
            return Err(CodecError::OutOfRange);
        }
        let weekday = weekday_to_chip(timestamp.weekday);

        let mut hours = Hours::from(encode_field(policy, timestamp.hour, 0..=23)?);
        hours.set_twenty_four_hour(true);

        Ok(SD3078DateTime {
            seconds: Seconds::from(encode_field(policy, timestamp.second, 0..=59)?),
            minutes: Minutes::from(encode_field(policy, timestamp.minute, 0..=59)?),
            hours,
            weekday: Weekday::from(policy.encode(weekday)?),
            day: Day::from(encode_field(policy, timestamp.day, 1..=31)?),
            month: Month::from(encode_field(policy, timestamp.month, 1..=12)?),
            year: Year::from(encode_field(policy, year_offset, 0..=98)?),
        })
    }

    pub(crate) fn into_timestamp(self, policy: CodecPolicy) -> Result<Timestamp, CodecError> {
        Ok(Timestamp {
            year: BASE_YEAR + u16::from(decode_field(policy, self.year.bcd(), 0..=98)?),
            month: decode_field(policy, self.month.bcd(), 1..=12)?,
            day: decode_field(policy, self.day.bcd(), 1..=31)?,
            hour: decode_field(policy, self.hours.bcd(), 0..=23)?,
            minute: decode_field(policy, self.minutes.bcd(), 0..=59)?,
            second: decode_field(policy, self.seconds.bcd(), 0..=59)?,
            weekday: weekday_from_chip(decode_field(policy, self.weekday.bcd(), 0..=6)?),
            yearday: 0,
        })
    }
}

impl From<[u8; 7]> for SD3078DateTime {
    fn from(data: [u8; 7]) -> Self {
        SD3078DateTime {
            seconds: Seconds::from(data[0]),
            minutes: Minutes::from(data[1]),
            hours: Hours::from(data[2]),
            weekday: Weekday::from(data[3]),
            day: Day::from(data[4]),
            month: Month::from(data[5]),
            year: Year::from(data[6]),
        }
    }
}

impl From<&SD3078DateTime> for [u8; 7] {
    fn from(dt: &SD3078DateTime) -> [u8; 7] {
        [
            dt.seconds.into(),
            dt.minutes.into(),
            dt.hours.into(),
            dt.weekday.into(),
            dt.day.into(),
            dt.month.into(),
            dt.year.into(),
        ]
    }
}

/// Internal representation of a temperature event block
/// (minute, hour, weekday, day, month, year).
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct SD3078EventTime {
    minutes: Minutes,
    hours: Hours,
    weekday: Weekday,
    day: Day,
    month: Month,
    year: Year,
}

impl SD3078EventTime {
    /// Event blocks hold garbage until the first extreme is recorded, so
    /// they always decode leniently.
    pub(crate) fn into_event_time(self) -> EventTime {
        EventTime {
            year: BASE_YEAR + u16::from(bcd_to_dec(self.year.bcd())),
            month: bcd_to_dec(self.month.bcd()),
            day: bcd_to_dec(self.day.bcd()),
            weekday: weekday_from_chip(bcd_to_dec(self.weekday.bcd())),
            hour: bcd_to_dec(self.hours.bcd()),
            minute: bcd_to_dec(self.minutes.bcd()),
        }
    }
}

impl From<[u8; 6]> for SD3078EventTime {
    fn from(data: [u8; 6]) -> Self {
        SD3078EventTime {
            minutes: Minutes::from(data[0]),
            hours: Hours::from(data[1]),
            weekday: Weekday::from(data[2]),
            day: Day::from(data[3]),
            month: Month::from(data[4]),
            year: Year::from(data[5]),
        }
    }
}
