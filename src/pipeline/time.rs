//! Calendar fields derived from epoch-millisecond event times.
//!
//! Each play event carries `ts`, milliseconds since the Unix epoch. From it we
//! derive a whole-second `timestamp` string, a civil `start_time` string and
//! its calendar parts. The civil time is read in the configured
//! [`TimeBasis`]: the host's local zone or UTC.
//!
//! `start_time` renders as `YYYY-MM-DD HH:MM:SS`, followed by `.ffffff` only
//! when the instant has a non-zero sub-second part. Weeks are ISO-8601 week
//! numbers and weekdays count 1 = Sunday through 7 = Saturday.

use crate::config::TimeBasis;
use crate::error::Result;
use crate::pipeline::tables::columns;
use crate::records::activity_columns;
use chrono::{Datelike as _, Local, NaiveDateTime, TimeZone, Timelike as _, Utc};
use polars::prelude::*;

/// Whole seconds since the epoch, as written to the `timestamp` column.
pub const TIMESTAMP: &str = "timestamp";

/// Whole seconds since the epoch, truncated toward zero.
pub fn epoch_seconds(ts_millis: i64) -> i64 {
    ts_millis / 1000
}

/// Civil date-time of an epoch-millisecond instant.
///
/// `None` when the instant is outside the representable range.
pub fn civil_datetime(ts_millis: i64, basis: TimeBasis) -> Option<NaiveDateTime> {
    match basis {
        TimeBasis::Utc => civil_datetime_in(ts_millis, &Utc),
        TimeBasis::Local => civil_datetime_in(ts_millis, &Local),
    }
}

/// Civil date-time of an epoch-millisecond instant as read in `zone`.
pub fn civil_datetime_in<Tz: TimeZone>(ts_millis: i64, zone: &Tz) -> Option<NaiveDateTime> {
    zone.timestamp_millis_opt(ts_millis)
        .single()
        .map(|dt| dt.naive_local())
}

/// Render a civil date-time the way `start_time` stores it.
pub fn format_start_time(dt: &NaiveDateTime) -> String {
    let seconds = dt.format("%Y-%m-%d %H:%M:%S");
    let micros = dt.nanosecond() / 1_000;
    if micros == 0 {
        seconds.to_string()
    } else {
        format!("{seconds}.{micros:06}")
    }
}

/// Calendar breakdown of one event time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTime {
    pub start_time: String,
    pub hour: i32,
    pub day: i32,
    pub week: i32,
    pub month: i32,
    pub year: i32,
    pub weekday: i32,
}

impl EventTime {
    pub fn from_epoch_millis(ts_millis: i64, basis: TimeBasis) -> Option<Self> {
        civil_datetime(ts_millis, basis).map(|dt| Self::from_civil(&dt))
    }

    pub fn from_civil(dt: &NaiveDateTime) -> Self {
        Self {
            start_time: format_start_time(dt),
            hour: dt.hour() as i32,
            day: dt.day() as i32,
            week: dt.iso_week().week() as i32,
            month: dt.month() as i32,
            year: dt.year(),
            weekday: dt.weekday().number_from_sunday() as i32,
        }
    }
}

/// Append `timestamp`, `start_time` and the calendar columns derived from
/// `ts`. Rows with a null `ts` get nulls in every derived column.
pub fn with_event_time(mut df: DataFrame, basis: TimeBasis) -> Result<DataFrame> {
    let ts = df
        .column(activity_columns::TS)?
        .as_materialized_series()
        .i64()?
        .clone();

    let n = ts.len();
    let mut timestamp: Vec<Option<String>> = Vec::with_capacity(n);
    let mut start_time: Vec<Option<String>> = Vec::with_capacity(n);
    let mut hour = Vec::with_capacity(n);
    let mut day = Vec::with_capacity(n);
    let mut week = Vec::with_capacity(n);
    let mut month = Vec::with_capacity(n);
    let mut year = Vec::with_capacity(n);
    let mut weekday = Vec::with_capacity(n);

    for value in &ts {
        let event = value.and_then(|ms| EventTime::from_epoch_millis(ms, basis));
        timestamp.push(value.map(|ms| epoch_seconds(ms).to_string()));
        hour.push(event.as_ref().map(|e| e.hour));
        day.push(event.as_ref().map(|e| e.day));
        week.push(event.as_ref().map(|e| e.week));
        month.push(event.as_ref().map(|e| e.month));
        year.push(event.as_ref().map(|e| e.year));
        weekday.push(event.as_ref().map(|e| e.weekday));
        start_time.push(event.map(|e| e.start_time));
    }

    df.with_column(Series::new(TIMESTAMP.into(), timestamp))?;
    df.with_column(Series::new(columns::START_TIME.into(), start_time))?;
    df.with_column(Series::new(columns::HOUR.into(), hour))?;
    df.with_column(Series::new(columns::DAY.into(), day))?;
    df.with_column(Series::new(columns::WEEK.into(), week))?;
    df.with_column(Series::new(columns::MONTH.into(), month))?;
    df.with_column(Series::new(columns::YEAR.into(), year))?;
    df.with_column(Series::new(columns::WEEKDAY.into(), weekday))?;
    Ok(df)
}
