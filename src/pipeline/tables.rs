//! Output tables of the star schema.

use std::fmt;

/// Column names shared by the output tables.
pub mod columns {
    pub const SONG_ID: &str = "song_id";
    pub const TITLE: &str = "title";
    pub const ARTIST_ID: &str = "artist_id";
    pub const YEAR: &str = "year";
    pub const DURATION: &str = "duration";
    pub const NAME: &str = "name";
    pub const LOCATION: &str = "location";
    pub const LATITUDE: &str = "latitude";
    pub const LONGITUDE: &str = "longitude";
    pub const USER_ID: &str = "user_id";
    pub const FIRST_NAME: &str = "first_name";
    pub const LAST_NAME: &str = "last_name";
    pub const GENDER: &str = "gender";
    pub const LEVEL: &str = "level";
    pub const START_TIME: &str = "start_time";
    pub const HOUR: &str = "hour";
    pub const DAY: &str = "day";
    pub const WEEK: &str = "week";
    pub const MONTH: &str = "month";
    pub const WEEKDAY: &str = "weekday";
    pub const SONGPLAY_ID: &str = "songplay_id";
    pub const SESSION_ID: &str = "session_id";
    pub const USER_AGENT: &str = "user_agent";
}

/// One output table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Songs,
    Artists,
    Users,
    Time,
    Songplays,
}

impl Table {
    /// Every table, in the order a run writes them.
    pub const ALL: [Self; 5] = [
        Self::Songs,
        Self::Artists,
        Self::Users,
        Self::Time,
        Self::Songplays,
    ];

    /// Directory name under the output root.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Songs => "songs",
            Self::Artists => "artists",
            Self::Users => "users",
            Self::Time => "time",
            Self::Songplays => "songplays",
        }
    }

    /// Columns in output order, partition columns included.
    pub fn columns(&self) -> &'static [&'static str] {
        use columns as c;
        match self {
            Self::Songs => &[c::SONG_ID, c::TITLE, c::ARTIST_ID, c::YEAR, c::DURATION],
            Self::Artists => &[c::ARTIST_ID, c::NAME, c::LOCATION, c::LATITUDE, c::LONGITUDE],
            Self::Users => &[c::USER_ID, c::FIRST_NAME, c::LAST_NAME, c::GENDER, c::LEVEL],
            Self::Time => &[
                c::START_TIME,
                c::HOUR,
                c::DAY,
                c::WEEK,
                c::MONTH,
                c::YEAR,
                c::WEEKDAY,
            ],
            Self::Songplays => &[
                c::SONGPLAY_ID,
                c::START_TIME,
                c::USER_ID,
                c::LEVEL,
                c::SONG_ID,
                c::ARTIST_ID,
                c::SESSION_ID,
                c::LOCATION,
                c::USER_AGENT,
                c::YEAR,
                c::MONTH,
            ],
        }
    }

    /// Hive partition columns, outermost first.
    pub fn partition_columns(&self) -> &'static [&'static str] {
        use columns as c;
        match self {
            Self::Songs => &[c::YEAR, c::ARTIST_ID],
            Self::Time | Self::Songplays => &[c::YEAR, c::MONTH],
            Self::Artists | Self::Users => &[],
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
