//! Typed source records.
//!
//! Both source datasets are newline-delimited JSON. Parsing is permissive:
//! a field that is absent, `null` or of an unexpected JSON type becomes
//! `None`, a line that is not valid JSON becomes a record with every field
//! `None`, and blank lines are skipped. No record is ever rejected.
//!
//! Records are then laid out column-wise into polars frames with a fixed
//! schema, so an empty input still produces correctly typed (empty) tables.

use crate::error::Result;
use polars::prelude::*;
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Column names of the song catalog frame.
pub mod song_columns {
    pub const SONG_ID: &str = "song_id";
    pub const TITLE: &str = "title";
    pub const YEAR: &str = "year";
    pub const DURATION: &str = "duration";
    pub const ARTIST_ID: &str = "artist_id";
    pub const ARTIST_NAME: &str = "artist_name";
    pub const ARTIST_LOCATION: &str = "artist_location";
    pub const ARTIST_LATITUDE: &str = "artist_latitude";
    pub const ARTIST_LONGITUDE: &str = "artist_longitude";
}

/// Column names of the activity log frame, as they appear in the logs.
pub mod activity_columns {
    pub const ARTIST: &str = "artist";
    pub const AUTH: &str = "auth";
    pub const FIRST_NAME: &str = "firstName";
    pub const GENDER: &str = "gender";
    pub const ITEM_IN_SESSION: &str = "itemInSession";
    pub const LAST_NAME: &str = "lastName";
    pub const LENGTH: &str = "length";
    pub const LEVEL: &str = "level";
    pub const LOCATION: &str = "location";
    pub const METHOD: &str = "method";
    pub const PAGE: &str = "page";
    pub const REGISTRATION: &str = "registration";
    pub const SESSION_ID: &str = "sessionId";
    pub const SONG: &str = "song";
    pub const STATUS: &str = "status";
    pub const TS: &str = "ts";
    pub const USER_AGENT: &str = "userAgent";
    pub const USER_ID: &str = "userId";
}

/// One entry of the song catalog.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SongRecord {
    #[serde(deserialize_with = "lenient::string")]
    pub song_id: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub year: Option<String>,
    #[serde(deserialize_with = "lenient::float")]
    pub duration: Option<f64>,
    #[serde(deserialize_with = "lenient::string")]
    pub artist_id: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub artist_name: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub artist_location: Option<String>,
    #[serde(deserialize_with = "lenient::float")]
    pub artist_latitude: Option<f64>,
    #[serde(deserialize_with = "lenient::float")]
    pub artist_longitude: Option<f64>,
}

/// One line of the user activity log.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActivityRecord {
    #[serde(deserialize_with = "lenient::string")]
    pub artist: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub auth: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub first_name: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub gender: Option<String>,
    #[serde(deserialize_with = "lenient::integer")]
    pub item_in_session: Option<i64>,
    #[serde(deserialize_with = "lenient::string")]
    pub last_name: Option<String>,
    #[serde(deserialize_with = "lenient::float")]
    pub length: Option<f64>,
    #[serde(deserialize_with = "lenient::string")]
    pub level: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub location: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub method: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub page: Option<String>,
    #[serde(deserialize_with = "lenient::float")]
    pub registration: Option<f64>,
    #[serde(deserialize_with = "lenient::integer")]
    pub session_id: Option<i64>,
    #[serde(deserialize_with = "lenient::string")]
    pub song: Option<String>,
    #[serde(deserialize_with = "lenient::integer")]
    pub status: Option<i64>,
    #[serde(deserialize_with = "lenient::integer")]
    pub ts: Option<i64>,
    #[serde(deserialize_with = "lenient::string")]
    pub user_agent: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub user_id: Option<String>,
}

/// Outcome of parsing one source object.
#[derive(Debug, Clone)]
pub struct ParsedLines<T> {
    pub records: Vec<T>,
    /// 1-based line numbers that were not valid JSON objects
    pub malformed_lines: Vec<usize>,
}

/// Parse newline-delimited JSON into records, permissively.
pub fn parse_lines<T>(bytes: &[u8]) -> ParsedLines<T>
where
    T: DeserializeOwned + Default,
{
    let text = String::from_utf8_lossy(bytes);
    let mut records = Vec::new();
    let mut malformed_lines = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(line) {
            Ok(record) => records.push(record),
            Err(_) => {
                malformed_lines.push(idx + 1);
                records.push(T::default());
            }
        }
    }

    ParsedLines {
        records,
        malformed_lines,
    }
}

/// Empty song catalog frame with the declared schema.
pub fn empty_song_frame() -> Result<DataFrame> {
    song_frame(&[])
}

/// Lay song records out column-wise.
pub fn song_frame(records: &[SongRecord]) -> Result<DataFrame> {
    use song_columns as c;

    let df = df!(
        c::SONG_ID => strings(records, |r| &r.song_id),
        c::TITLE => strings(records, |r| &r.title),
        c::YEAR => strings(records, |r| &r.year),
        c::DURATION => records.iter().map(|r| r.duration).collect::<Vec<_>>(),
        c::ARTIST_ID => strings(records, |r| &r.artist_id),
        c::ARTIST_NAME => strings(records, |r| &r.artist_name),
        c::ARTIST_LOCATION => strings(records, |r| &r.artist_location),
        c::ARTIST_LATITUDE => records.iter().map(|r| r.artist_latitude).collect::<Vec<_>>(),
        c::ARTIST_LONGITUDE => records.iter().map(|r| r.artist_longitude).collect::<Vec<_>>()
    )?;
    Ok(df)
}

/// Lay activity records out column-wise.
pub fn activity_frame(records: &[ActivityRecord]) -> Result<DataFrame> {
    use activity_columns as c;

    let df = df!(
        c::ARTIST => strings(records, |r| &r.artist),
        c::AUTH => strings(records, |r| &r.auth),
        c::FIRST_NAME => strings(records, |r| &r.first_name),
        c::GENDER => strings(records, |r| &r.gender),
        c::ITEM_IN_SESSION => records.iter().map(|r| r.item_in_session).collect::<Vec<_>>(),
        c::LAST_NAME => strings(records, |r| &r.last_name),
        c::LENGTH => records.iter().map(|r| r.length).collect::<Vec<_>>(),
        c::LEVEL => strings(records, |r| &r.level),
        c::LOCATION => strings(records, |r| &r.location),
        c::METHOD => strings(records, |r| &r.method),
        c::PAGE => strings(records, |r| &r.page),
        c::REGISTRATION => records.iter().map(|r| r.registration).collect::<Vec<_>>(),
        c::SESSION_ID => records.iter().map(|r| r.session_id).collect::<Vec<_>>(),
        c::SONG => strings(records, |r| &r.song),
        c::STATUS => records.iter().map(|r| r.status).collect::<Vec<_>>(),
        c::TS => records.iter().map(|r| r.ts).collect::<Vec<_>>(),
        c::USER_AGENT => strings(records, |r| &r.user_agent),
        c::USER_ID => strings(records, |r| &r.user_id)
    )?;
    Ok(df)
}

fn strings<'a, R, F>(records: &'a [R], field: F) -> Vec<Option<&'a str>>
where
    F: Fn(&'a R) -> &'a Option<String>,
{
    records.iter().map(|r| field(r).as_deref()).collect()
}

/// Field deserializers that never fail on a type mismatch.
mod lenient {
    use serde::{Deserialize as _, Deserializer};
    use serde_json::Value;

    pub fn string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        })
    }

    pub fn float<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                    .map(|f| f as i64)
            }),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }
}
