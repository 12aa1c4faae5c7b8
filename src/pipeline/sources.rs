//! Loading the two source datasets into frames.

use crate::config::SourceLayout;
use crate::error::Result;
use crate::records::{
    ActivityRecord, ParsedLines, SongRecord, activity_frame, parse_lines, song_frame,
};
use crate::storage::Storage;
use polars::prelude::DataFrame;
use serde::de::DeserializeOwned;

/// Read the song catalog under `layout.song_data_prefix`.
pub async fn load_catalog(
    storage: &Storage,
    layout: &SourceLayout,
    concurrency: usize,
) -> Result<DataFrame> {
    let records: Vec<SongRecord> = load_records(
        storage,
        &layout.song_data_prefix,
        layout.song_data_depth,
        &layout.extension,
        concurrency,
    )
    .await?;
    tracing::info!("Loaded {} song catalog records", records.len());
    song_frame(&records)
}

/// Read the activity logs under `layout.log_data_prefix`.
pub async fn load_activity(
    storage: &Storage,
    layout: &SourceLayout,
    concurrency: usize,
) -> Result<DataFrame> {
    let records: Vec<ActivityRecord> = load_records(
        storage,
        &layout.log_data_prefix,
        layout.log_data_depth,
        &layout.extension,
        concurrency,
    )
    .await?;
    tracing::info!("Loaded {} activity log events", records.len());
    activity_frame(&records)
}

async fn load_records<T>(
    storage: &Storage,
    prefix: &str,
    depth: usize,
    extension: &str,
    concurrency: usize,
) -> Result<Vec<T>>
where
    T: DeserializeOwned + Default,
{
    let objects = storage.list_dataset(prefix, depth, extension).await?;
    tracing::info!(
        "Reading {} objects from {}/{}",
        objects.len(),
        storage,
        prefix
    );

    let batches = storage
        .fetch_each(&objects, concurrency, |path, bytes| {
            let ParsedLines {
                records,
                malformed_lines,
            } = parse_lines::<T>(bytes);
            if !malformed_lines.is_empty() {
                tracing::warn!(
                    "{path}: {} malformed lines kept as empty records (lines {:?})",
                    malformed_lines.len(),
                    malformed_lines
                );
            }
            records
        })
        .await?;

    Ok(batches.into_iter().flatten().collect())
}
