//! Dimension tables built from the song catalog.

use crate::pipeline::tables::columns as out;
use crate::records::song_columns as src;
use polars::prelude::*;

/// `songs`: one row per distinct catalog entry.
pub fn songs_table(catalog: &DataFrame) -> LazyFrame {
    catalog
        .clone()
        .lazy()
        .select([
            col(src::SONG_ID),
            col(src::TITLE),
            col(src::ARTIST_ID),
            col(src::YEAR),
            col(src::DURATION),
        ])
        .unique_stable(None, UniqueKeepStrategy::First)
}

/// `artists`: artist columns renamed to their table names, then deduplicated.
pub fn artists_table(catalog: &DataFrame) -> LazyFrame {
    catalog
        .clone()
        .lazy()
        .select([
            col(src::ARTIST_ID).alias(out::ARTIST_ID),
            col(src::ARTIST_NAME).alias(out::NAME),
            col(src::ARTIST_LOCATION).alias(out::LOCATION),
            col(src::ARTIST_LATITUDE).alias(out::LATITUDE),
            col(src::ARTIST_LONGITUDE).alias(out::LONGITUDE),
        ])
        .unique_stable(None, UniqueKeepStrategy::First)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::pipeline::tables::Table;
    use crate::records::{SongRecord, song_frame};

    fn song(song_id: &str, artist_id: &str, artist_name: &str) -> SongRecord {
        SongRecord {
            song_id: Some(song_id.to_owned()),
            title: Some(format!("Title of {song_id}")),
            year: Some("0".to_owned()),
            duration: Some(200.0),
            artist_id: Some(artist_id.to_owned()),
            artist_name: Some(artist_name.to_owned()),
            artist_location: Some(String::new()),
            artist_latitude: None,
            artist_longitude: None,
        }
    }

    #[test]
    fn test_songs_table_dedups_exact_duplicates() -> Result<()> {
        let catalog = song_frame(&[
            song("S1", "A1", "Elena"),
            song("S1", "A1", "Elena"),
            song("S2", "A1", "Elena"),
        ])?;

        let songs = songs_table(&catalog).collect()?;
        assert_eq!(songs.height(), 2);
        let names: Vec<&str> = songs.get_column_names_str();
        assert_eq!(names, Table::Songs.columns());
        Ok(())
    }

    #[test]
    fn test_artists_table_renames_and_collapses() -> Result<()> {
        let catalog = song_frame(&[
            song("S1", "A1", "Elena"),
            song("S2", "A1", "Elena"),
            song("S3", "A2", "Casual"),
        ])?;

        let artists = artists_table(&catalog).collect()?;
        assert_eq!(artists.height(), 2);
        let names: Vec<&str> = artists.get_column_names_str();
        assert_eq!(names, Table::Artists.columns());

        let ids = artists.column(out::ARTIST_ID)?.str()?;
        assert_eq!(ids.get(0), Some("A1"), "first occurrence order is kept");
        assert_eq!(ids.get(1), Some("A2"));
        Ok(())
    }

    #[test]
    fn test_artist_variants_keep_a_row_each() -> Result<()> {
        let catalog = song_frame(&[
            song("S1", "A1", "Elena"),
            SongRecord {
                artist_location: Some("Hamburg, Germany".to_owned()),
                ..song("S2", "A1", "Elena")
            },
        ])?;

        let artists = artists_table(&catalog).collect()?;
        assert_eq!(artists.height(), 2, "dedup is on the whole row, not artist_id");
        assert_eq!(artists.column(out::ARTIST_ID)?.n_unique()?, 1);
        Ok(())
    }

    #[test]
    fn test_empty_catalog_gives_empty_tables() -> Result<()> {
        let catalog = song_frame(&[])?;
        assert_eq!(songs_table(&catalog).collect()?.height(), 0);
        assert_eq!(artists_table(&catalog).collect()?.height(), 0);
        Ok(())
    }
}
