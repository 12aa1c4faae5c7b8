//! Partitioned parquet output.
//!
//! Each table is written to `<output>/<table>/`. Partitioned tables use the
//! Hive layout, one directory level per partition column:
//!
//! ```text
//! songs/year=2008/artist_id=ARJIE2Y1187B994AB7/part-00000.parquet
//! time/year=2018/month=11/part-00000.parquet
//! users/part-00000.parquet
//! ```
//!
//! Partition values appear only in the path, not in the files. A null or
//! empty value is written as [`HIVE_DEFAULT_PARTITION`]. Writes overwrite:
//! everything previously under the table directory is removed first, then an
//! empty `_SUCCESS` marker is written once all data files are in place.
//!
//! The table is fully materialized and encoded before the destination is
//! touched, so a query or encoding failure leaves earlier output intact.

use crate::config::{Compression, ParquetSettings};
use crate::error::Result;
use crate::pipeline::tables::Table;
use crate::storage::Storage;
use object_store::path::Path as ObjectPath;
use polars::prelude::*;
use std::time::{Duration, Instant};

/// Directory name used for a null or empty partition value.
pub const HIVE_DEFAULT_PARTITION: &str = "__HIVE_DEFAULT_PARTITION__";

/// Marker object written after a table completes.
pub const SUCCESS_MARKER: &str = "_SUCCESS";

/// Outcome of writing one table.
#[derive(Debug, Clone)]
pub struct TableReport {
    pub table: Table,
    pub rows: usize,
    pub files: Vec<ObjectPath>,
    /// Objects removed from a previous run
    pub replaced: usize,
    pub duration: Duration,
}

impl TableReport {
    pub fn summary(&self) -> String {
        format!(
            "{}: {} rows in {} files ({} replaced), {:.2}s",
            self.table,
            self.rows,
            self.files.len(),
            self.replaced,
            self.duration.as_secs_f64()
        )
    }
}

/// Writes tables under one output root.
#[derive(Debug, Clone, Copy)]
pub struct TableWriter<'a> {
    storage: &'a Storage,
    settings: &'a ParquetSettings,
}

impl<'a> TableWriter<'a> {
    pub fn new(storage: &'a Storage, settings: &'a ParquetSettings) -> Self {
        Self { storage, settings }
    }

    /// Materialize `lf` and replace `table` with it.
    pub async fn write(&self, table: Table, lf: LazyFrame) -> Result<TableReport> {
        let start = Instant::now();
        let df = lf.collect()?;
        let rows = df.height();

        let table_dir = self.storage.path(table.name());
        let mut encoded = Vec::new();
        for Partition { segments, mut frame } in split_partitions(&df, table.partition_columns())? {
            let path = segments
                .into_iter()
                .fold(table_dir.clone(), |dir, segment| dir.child(segment))
                .child(part_file_name(0));
            let bytes = encode_parquet(&mut frame, self.settings)?;
            encoded.push((path, bytes));
        }

        let replaced = self.storage.clear(&table_dir).await?;
        if replaced > 0 {
            tracing::debug!("Removed {replaced} objects from previous {table} output");
        }

        let mut files = Vec::with_capacity(encoded.len());
        for (path, bytes) in encoded {
            self.storage.put(&path, bytes).await?;
            files.push(path);
        }
        self.storage
            .put(&table_dir.child(SUCCESS_MARKER), Vec::new())
            .await?;

        let report = TableReport {
            table,
            rows,
            files,
            replaced,
            duration: start.elapsed(),
        };
        tracing::info!("Wrote {}", report.summary());
        Ok(report)
    }
}

/// Rows of one partition, with the partition columns removed.
#[derive(Debug)]
struct Partition {
    /// `key=value` directory names, outermost first
    segments: Vec<String>,
    frame: DataFrame,
}

fn split_partitions(df: &DataFrame, keys: &[&str]) -> Result<Vec<Partition>> {
    if keys.is_empty() {
        return Ok(vec![Partition {
            segments: Vec::new(),
            frame: df.clone(),
        }]);
    }

    let value_columns: Vec<PlSmallStr> = df
        .get_column_names()
        .into_iter()
        .filter(|name| !keys.contains(&name.as_str()))
        .cloned()
        .collect();

    df.partition_by_stable(keys.iter().copied(), true)?
        .into_iter()
        .map(|group| {
            let segments = keys
                .iter()
                .map(|key| Ok(format!("{key}={}", partition_value(&group, key)?)))
                .collect::<Result<Vec<_>>>()?;
            let frame = group.select(value_columns.iter().cloned())?;
            Ok(Partition { segments, frame })
        })
        .collect()
}

fn partition_value(group: &DataFrame, key: &str) -> Result<String> {
    let values = group
        .column(key)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let value = values.str()?.get(0).filter(|v| !v.is_empty());
    Ok(value.unwrap_or(HIVE_DEFAULT_PARTITION).to_owned())
}

fn part_file_name(index: usize) -> String {
    format!("part-{index:05}.parquet")
}

/// Row group size: the configured value, otherwise smaller groups for wide
/// tables.
fn row_group_size(column_count: usize, settings: &ParquetSettings) -> usize {
    settings
        .row_group_size
        .unwrap_or(if column_count >= 100 { 16_384 } else { 32_768 })
}

fn parquet_compression(compression: Compression) -> ParquetCompression {
    match compression {
        Compression::Snappy => ParquetCompression::Snappy,
        Compression::Zstd => ParquetCompression::Zstd(None),
        Compression::Uncompressed => ParquetCompression::Uncompressed,
    }
}

fn encode_parquet(frame: &mut DataFrame, settings: &ParquetSettings) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    ParquetWriter::new(&mut buffer)
        .with_compression(parquet_compression(settings.compression))
        .with_row_group_size(Some(row_group_size(frame.width(), settings)))
        .finish(frame)?;
    Ok(buffer)
}
