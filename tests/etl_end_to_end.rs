//! End-to-end runs over the fixtures in `testdata/`.
//!
//! Fixture contents:
//! - 4 catalog files, 3 distinct songs by 3 artists. The Elena file appears
//!   twice (`A/A/B` and `A/B/A`), so its play joins two catalog rows
//! - 3 log files: 5 `NextSong` events, 2 `Home` events and 1 malformed line
//!   (a blank line is ignored). User 15 appears as both `paid` and `free`
//!
//! All runs use UTC so derived times do not depend on the host zone.

#![expect(clippy::indexing_slicing)]

use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use playlake::config::{EtlConfig, TimeBasis};
use playlake::error::{EtlError, Result};
use playlake::pipeline::{Etl, RunReport, Table, run_etl};
use playlake::storage::{Location, Storage};
use polars::prelude::*;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

fn testdata_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn local_config(output: &std::path::Path) -> EtlConfig {
    EtlConfig {
        input: testdata_dir().display().to_string(),
        output: output.display().to_string(),
        time_basis: TimeBasis::Utc,
        ..Default::default()
    }
}

fn open_output(output: &std::path::Path) -> Result<Storage> {
    Storage::open_sink(
        &Location::Local(output.to_path_buf()),
        &Default::default(),
    )
}

/// Every data file of a table, with its path relative to the table directory.
async fn read_table(storage: &Storage, table: Table) -> Result<Vec<(String, DataFrame)>> {
    let table_dir = storage.path(table.name());
    let mut out = Vec::new();
    for meta in storage.list(&table_dir).await? {
        if meta.location.extension() != Some("parquet") {
            continue;
        }
        let relative = meta
            .location
            .prefix_match(&table_dir)
            .map(|parts| parts.map(|p| p.as_ref().to_owned()).collect::<Vec<_>>().join("/"))
            .unwrap_or_default();
        let bytes = storage.read(&meta.location).await?;
        let frame = ParquetReader::new(Cursor::new(bytes)).finish()?;
        out.push((relative, frame));
    }
    Ok(out)
}

fn total_rows(files: &[(String, DataFrame)]) -> usize {
    files.iter().map(|(_, df)| df.height()).sum()
}

fn rows(report: &RunReport, table: Table) -> usize {
    report.table(table).map(|t| t.rows).unwrap_or_default()
}

#[tokio::test]
async fn test_full_run_row_counts() -> Result<()> {
    let output = tempfile::tempdir()?;
    let report = run_etl(&local_config(output.path())).await?;

    assert_eq!(report.catalog_rows, 4);
    assert_eq!(report.activity_rows, 8, "blank line skipped, malformed line kept");
    assert_eq!(rows(&report, Table::Songs), 3, "duplicate catalog entry collapses");
    assert_eq!(rows(&report, Table::Artists), 3);
    assert_eq!(
        rows(&report, Table::Users),
        5,
        "3 users, a second level for user 15, the all-null row"
    );
    assert_eq!(rows(&report, Table::Time), 4, "null ts excluded");
    assert_eq!(
        rows(&report, Table::Songplays),
        4,
        "unmatched artists dropped, duplicate catalog entry fans out"
    );
    Ok(())
}

#[tokio::test]
async fn test_partition_layout_on_disk() -> Result<()> {
    let output = tempfile::tempdir()?;
    run_etl(&local_config(output.path())).await?;
    let storage = open_output(output.path())?;

    let songs = read_table(&storage, Table::Songs).await?;
    let song_paths: Vec<&str> = songs.iter().map(|(p, _)| p.as_str()).collect();
    assert_eq!(
        song_paths,
        vec![
            "year=0/artist_id=AR7G5I41187FB4CE6C/part-00000.parquet",
            "year=0/artist_id=ARD7TVE1187B99BFB1/part-00000.parquet",
            "year=1997/artist_id=ARXR32B1187FB57099/part-00000.parquet",
        ]
    );
    assert_eq!(
        songs[0].1.get_column_names_str(),
        vec!["song_id", "title", "duration"],
        "partition columns live in the path only"
    );

    let time = read_table(&storage, Table::Time).await?;
    let time_paths: Vec<&str> = time.iter().map(|(p, _)| p.as_str()).collect();
    assert_eq!(
        time_paths,
        vec![
            "year=2018/month=11/part-00000.parquet",
            "year=2018/month=12/part-00000.parquet",
        ]
    );
    assert_eq!(time[0].1.height(), 3);
    assert_eq!(time[1].1.height(), 1);

    let users = read_table(&storage, Table::Users).await?;
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].0, "part-00000.parquet");
    assert_eq!(users[0].1.get_column_names_str(), Table::Users.columns());

    for table in Table::ALL {
        let marker = storage.path(&format!("{}/_SUCCESS", table.name()));
        assert!(
            storage.read(&marker).await?.is_empty(),
            "{table} has an empty _SUCCESS marker"
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_songplay_row_for_known_artist() -> Result<()> {
    let output = tempfile::tempdir()?;
    run_etl(&local_config(output.path())).await?;
    let storage = open_output(output.path())?;

    let songplays = read_table(&storage, Table::Songplays).await?;
    assert_eq!(total_rows(&songplays), 4);

    let (path, november) = &songplays[0];
    assert_eq!(path, "year=2018/month=11/part-00000.parquet");
    assert_eq!(
        november.get_column_names_str(),
        vec![
            "songplay_id",
            "start_time",
            "user_id",
            "level",
            "song_id",
            "artist_id",
            "session_id",
            "location",
            "user_agent",
        ]
    );

    assert_eq!(november.height(), 3);

    let user_ids = november.column("user_id")?.str()?;
    let elena: Vec<usize> = (0..november.height())
        .filter(|&i| user_ids.get(i) == Some("15"))
        .collect();
    assert_eq!(elena.len(), 2, "one play, two identical catalog rows");
    let row = *elena
        .first()
        .ok_or_else(|| EtlError::Other("no songplay for user 15".to_owned()))?;
    for &i in &elena {
        assert_eq!(november.column("song_id")?.str()?.get(i), Some("SOEKAZG12AB018837E"));
        assert_eq!(
            november.column("start_time")?.str()?.get(i),
            Some("2018-11-15 00:36:44.796000")
        );
    }

    assert_eq!(november.column("song_id")?.str()?.get(row), Some("SOEKAZG12AB018837E"));
    assert_eq!(november.column("artist_id")?.str()?.get(row), Some("AR7G5I41187FB4CE6C"));
    assert_eq!(november.column("session_id")?.i64()?.get(row), Some(818));
    assert_eq!(november.column("level")?.str()?.get(row), Some("paid"));
    assert_eq!(
        november.column("start_time")?.str()?.get(row),
        Some("2018-11-15 00:36:44.796000")
    );

    let mut ids: Vec<i64> = songplays
        .iter()
        .flat_map(|(_, df)| {
            df.column("songplay_id")
                .and_then(|c| c.i64().map(|ids| ids.into_no_null_iter().collect::<Vec<_>>()))
                .unwrap_or_default()
        })
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![0, 1, 2, 3], "songplay_id is unique");
    Ok(())
}

#[tokio::test]
async fn test_time_rows_are_calendar_consistent() -> Result<()> {
    let output = tempfile::tempdir()?;
    run_etl(&local_config(output.path())).await?;
    let storage = open_output(output.path())?;

    let time = read_table(&storage, Table::Time).await?;
    let (_, december) = &time[1];
    assert_eq!(december.column("start_time")?.str()?.get(0), Some("2018-12-01 00:00:00"));
    assert_eq!(december.column("day")?.i32()?.get(0), Some(1));
    assert_eq!(december.column("week")?.i32()?.get(0), Some(48));
    assert_eq!(december.column("weekday")?.i32()?.get(0), Some(7));

    let (_, november) = &time[0];
    for i in 0..november.height() {
        let start_time = november.column("start_time")?.str()?.get(i).unwrap_or_default();
        let hour = november.column("hour")?.i32()?.get(i).unwrap_or(-1);
        let day = november.column("day")?.i32()?.get(i).unwrap_or(-1);
        assert!(start_time.starts_with("2018-11-"), "{start_time}");
        assert_eq!(start_time[8..10].parse::<i32>().ok(), Some(day), "{start_time}");
        assert_eq!(start_time[11..13].parse::<i32>().ok(), Some(hour), "{start_time}");
    }
    Ok(())
}

/// Table contents in a comparable form: `songplay_id` dropped, rows sorted.
async fn table_contents(storage: &Storage, table: Table) -> Result<Vec<(String, DataFrame)>> {
    let mut files = read_table(storage, table).await?;
    for (_, df) in &mut files {
        if table == Table::Songplays {
            *df = df.drop("songplay_id")?;
        }
        *df = df.sort(df.get_column_names_owned(), SortMultipleOptions::default())?;
    }
    Ok(files)
}

#[tokio::test]
async fn test_rerun_overwrites() -> Result<()> {
    let output = tempfile::tempdir()?;
    let config = local_config(output.path());
    let storage = open_output(output.path())?;

    run_etl(&config).await?;
    let mut before = Vec::new();
    for table in Table::ALL {
        before.push(table_contents(&storage, table).await?);
    }
    let stale = storage.path("songplays/year=1999/month=1/part-00000.parquet");
    storage.put(&stale, vec![0]).await?;

    run_etl(&config).await?;
    assert!(
        storage.list(&storage.path("songplays/year=1999")).await?.is_empty(),
        "stale partition removed"
    );
    for (table, first) in Table::ALL.into_iter().zip(before) {
        let second = table_contents(&storage, table).await?;
        let first_paths: Vec<&str> = first.iter().map(|(p, _)| p.as_str()).collect();
        let second_paths: Vec<&str> = second.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(first_paths, second_paths, "{table} partitions");
        for ((path, a), (_, b)) in first.iter().zip(&second) {
            assert!(a.equals_missing(b), "{table}/{path} differs between runs");
        }
    }
    assert_eq!(total_rows(&read_table(&storage, Table::Songplays).await?), 4);
    Ok(())
}

#[tokio::test]
async fn test_missing_input_directory_fails() -> Result<()> {
    let output = tempfile::tempdir()?;
    let config = EtlConfig {
        input: output.path().join("nope").display().to_string(),
        ..local_config(output.path())
    };
    let result = run_etl(&config).await;
    assert!(matches!(result, Err(EtlError::MissingSource(_))), "got {result:?}");
    Ok(())
}

#[tokio::test]
async fn test_in_memory_run_with_rooted_prefixes() -> Result<()> {
    let source = Storage::new(
        Arc::new(InMemory::new()),
        ObjectPath::from("udacity-dend"),
        "memory://udacity-dend",
    );
    let sink = Storage::new(Arc::new(InMemory::new()), ObjectPath::from("lake"), "memory://lake");

    source
        .put(
            &source.path("song_data/A/A/B/TRAABJL12903CDCF1A.json"),
            br#"{"artist_id": "AR7G5I41187FB4CE6C", "artist_name": "Elena", "song_id": "SOEKAZG12AB018837E", "year": 0, "duration": 213.9}"#.to_vec(),
        )
        .await?;
    source
        .put(
            &source.path("log-data/2018-11-15-events.json"),
            br#"{"page":"NextSong","ts":1542242204796,"artist":"Elena","userId":"15","sessionId":818,"level":"paid"}"#.to_vec(),
        )
        .await?;

    let config = EtlConfig {
        time_basis: TimeBasis::Utc,
        ..Default::default()
    };
    let report = Etl::new(source, sink.clone(), &config).run().await?;
    assert_eq!(rows(&report, Table::Songplays), 1);

    let files: Vec<String> = report
        .table(Table::Songplays)
        .map(|t| t.files.iter().map(ToString::to_string).collect())
        .unwrap_or_default();
    assert_eq!(files, vec!["lake/songplays/year=2018/month=11/part-00000.parquet"]);

    let songplays = read_table(&sink, Table::Songplays).await?;
    let (_, df) = &songplays[0];
    assert_eq!(df.column("user_id")?.str()?.get(0), Some("15"));
    assert_eq!(df.column("songplay_id")?.i64()?.get(0), Some(0));
    Ok(())
}
