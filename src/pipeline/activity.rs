//! Tables built from the activity log: `users`, `time` and the `songplays`
//! fact table.
//!
//! Only `NextSong` events are plays. `users` is the exception: it is taken
//! from every log event, so users who never played a song still appear.

use crate::config::TimeBasis;
use crate::error::Result;
use crate::pipeline::tables::{Table, columns as out};
use crate::pipeline::time::with_event_time;
use crate::records::{activity_columns as log, song_columns as song};
use polars::prelude::*;

/// Page value marking a song play.
pub const NEXT_SONG: &str = "NextSong";

/// Row position of each play event, used to keep `songplays` in event order.
const EVENT_INDEX: &str = "event_index";

/// Play events projected to the columns the fact table needs.
pub fn play_events(activity: &DataFrame) -> LazyFrame {
    activity
        .clone()
        .lazy()
        .filter(col(log::PAGE).eq(lit(NEXT_SONG)))
        .select([
            col(log::TS),
            col(log::USER_ID),
            col(log::LEVEL),
            col(log::SONG),
            col(log::ARTIST),
            col(log::SESSION_ID),
            col(log::LOCATION),
            col(log::USER_AGENT),
        ])
}

/// Play events with their derived time columns.
pub fn timed_play_events(activity: &DataFrame, basis: TimeBasis) -> Result<DataFrame> {
    let plays = play_events(activity).collect()?;
    with_event_time(plays, basis)
}

/// `users`: distinct user attribute rows across all events.
pub fn users_table(activity: &DataFrame) -> LazyFrame {
    activity
        .clone()
        .lazy()
        .select([
            col(log::USER_ID).alias(out::USER_ID),
            col(log::FIRST_NAME).alias(out::FIRST_NAME),
            col(log::LAST_NAME).alias(out::LAST_NAME),
            col(log::GENDER).alias(out::GENDER),
            col(log::LEVEL).alias(out::LEVEL),
        ])
        .unique_stable(None, UniqueKeepStrategy::First)
}

/// `time`: calendar breakdown of every distinct play time.
///
/// Expects the output of [`timed_play_events`]. Events without `ts` are left
/// out.
pub fn time_table(plays: &DataFrame) -> LazyFrame {
    plays
        .clone()
        .lazy()
        .filter(col(log::TS).is_not_null())
        .select(
            Table::Time
                .columns()
                .iter()
                .map(|name| col(*name))
                .collect::<Vec<_>>(),
        )
        .unique_stable(None, UniqueKeepStrategy::First)
}

/// `songplays`: play events joined to the catalog on artist name.
///
/// Expects the output of [`timed_play_events`]. A play whose artist matches
/// no catalog entry is dropped; one matching several entries yields one row
/// per entry. Rows stay in event order and `songplay_id` numbers them from 0.
pub fn songplays_table(plays: &DataFrame, catalog: &DataFrame) -> LazyFrame {
    let catalog = catalog.clone().lazy().select([
        col(song::ARTIST_NAME),
        col(song::SONG_ID),
        col(song::ARTIST_ID),
    ]);

    plays
        .clone()
        .lazy()
        .with_row_index(EVENT_INDEX, None)
        .join(
            catalog,
            [col(log::ARTIST)],
            [col(song::ARTIST_NAME)],
            JoinArgs::new(JoinType::Inner),
        )
        .sort([EVENT_INDEX, song::SONG_ID], SortMultipleOptions::default())
        .with_row_index(out::SONGPLAY_ID, None)
        .select([
            col(out::SONGPLAY_ID).cast(DataType::Int64),
            col(out::START_TIME),
            col(log::USER_ID).alias(out::USER_ID),
            col(log::LEVEL).alias(out::LEVEL),
            col(song::SONG_ID).alias(out::SONG_ID),
            col(song::ARTIST_ID).alias(out::ARTIST_ID),
            col(log::SESSION_ID).alias(out::SESSION_ID),
            col(log::LOCATION).alias(out::LOCATION),
            col(log::USER_AGENT).alias(out::USER_AGENT),
            col(out::YEAR),
            col(out::MONTH),
        ])
}
