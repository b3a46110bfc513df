//! Typed requests and results for Tile operations.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

/// Which queued incoming message `$MM R=` should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadOrder {
    #[default]
    Oldest,
    Newest,
}

impl ReadOrder {
    pub(crate) fn command(self) -> &'static str {
        match self {
            ReadOrder::Oldest => "$MM R=O",
            ReadOrder::Newest => "$MM R=N",
        }
    }
}

impl FromStr for ReadOrder {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "oldest" | "o" => Ok(ReadOrder::Oldest),
            "newest" | "n" => Ok(ReadOrder::Newest),
            other => Err(format!("unknown read order '{other}', expected oldest or newest")),
        }
    }
}

/// Firmware build date and version, e.g. `2021-03-23-18:25:40` / `v1.0.0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub date: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Application id, always 0 on firmware v1.1.0 and later.
    pub app_id: u32,
    pub device_id: u32,
    pub device_type: String,
}

/// Calendar date and time in UTC.
///
/// `valid` is false when the device reported a time it does not trust yet. Requests
/// built with [`DateTime::new`] or parsed from a string are valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub valid: bool,
}

impl DateTime {
    pub fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            valid: true,
        }
    }

    /// Seconds since the Unix epoch, or `None` if the fields are not a real date.
    pub fn to_epoch(&self) -> Option<i64> {
        let date = NaiveDate::from_ymd_opt(self.year.into(), self.month.into(), self.day.into())?;
        let time = date.and_hms_opt(self.hour.into(), self.minute.into(), self.second.into())?;
        Some(time.and_utc().timestamp())
    }

    pub fn from_epoch(epoch: i64) -> Option<Self> {
        let t = chrono::DateTime::from_timestamp(epoch, 0)?;
        Some(Self::new(
            u16::try_from(t.year()).ok()?,
            t.month() as u8,
            t.day() as u8,
            t.hour() as u8,
            t.minute() as u8,
            t.second() as u8,
        ))
    }

    /// Parse the device's 14 digit `YYYYMMDDHHMMSS` form. The result is marked valid.
    pub fn parse_compact(s: &str) -> Option<Self> {
        if s.len() != 14 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let num = |range: std::ops::Range<usize>| s[range].parse::<u16>().ok();
        Some(Self::new(
            num(0..4)?,
            num(4..6)? as u8,
            num(6..8)? as u8,
            num(8..10)? as u8,
            num(10..12)? as u8,
            num(12..14)? as u8,
        ))
    }
}

/// Wire form for absolute times: `YYYY-MM-DD HH:MM:SS`.
impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

impl FromStr for DateTime {
    type Err = chrono::ParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%d %H:%M:%S")?;
        Ok(Self::new(
            t.year() as u16,
            t.month() as u8,
            t.day() as u8,
            t.hour() as u8,
            t.minute() as u8,
            t.second() as u8,
        ))
    }
}

/// Position report from `$GN`, plus fix quality from `$GS`.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoData {
    /// Degrees.
    pub latitude: f32,
    pub longitude: f32,
    /// Meters.
    pub altitude: f32,
    /// Degrees.
    pub course: f32,
    /// km/h.
    pub speed: f32,
    pub hdop: u16,
    pub vdop: u16,
    pub satellites: u16,
    /// Fix type token, e.g. `G3` or `D2`.
    pub fix_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SleepRequest {
    /// Seconds to sleep; 0 means unused. Takes priority over `wakeup`.
    pub seconds: u16,
    /// Wake-up time, ignored unless `valid`.
    pub wakeup: Option<DateTime>,
}

impl SleepRequest {
    pub fn for_seconds(seconds: u16) -> Self {
        Self {
            seconds,
            wakeup: None,
        }
    }

    pub fn until(wakeup: DateTime) -> Self {
        Self {
            seconds: 0,
            wakeup: Some(wakeup),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SendRequest<'a> {
    pub message: &'a [u8],
    /// Seconds an unsent message is held before being discarded; 0 means unused.
    /// Takes priority over `expiration`.
    pub hold_time: u32,
    /// UTC time after which an unsent message is discarded, ignored unless `valid`.
    pub expiration: Option<DateTime>,
}

impl<'a> SendRequest<'a> {
    pub fn new(message: &'a [u8]) -> Self {
        Self {
            message,
            ..Self::default()
        }
    }

    pub fn hold_for(mut self, seconds: u32) -> Self {
        self.hold_time = seconds;
        self
    }

    pub fn expire_at(mut self, expiration: DateTime) -> Self {
        self.expiration = Some(expiration);
        self
    }
}

/// Metadata of a message read with `$MM R=`; the payload itself lands in the caller's
/// buffer, truncated to its length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadMessage {
    /// Always 0 before firmware v1.1.0.
    pub app_id: u32,
    pub msg_id: u64,
    /// Bytes written to the caller's buffer.
    pub len: usize,
    /// When the Tile received the message.
    pub timestamp: DateTime,
}

/// Owned copy of a raw response sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub command: String,
    pub fields: Vec<String>,
}
