//! ETL execution engine.
//!
//! A run has two stages that share one read of the song catalog:
//!
//! 1. song stage: `songs` and `artists` from the catalog
//! 2. log stage: `users`, `time` and `songplays` from the activity log, with
//!    the catalog as the lookup side of the `songplays` join
//!
//! Stages and tables run sequentially; the first failure aborts the run.
//! Tables already written by then stay in place.

use super::activity::{songplays_table, time_table, timed_play_events, users_table};
use super::catalog::{artists_table, songs_table};
use super::sources::{load_activity, load_catalog};
use super::tables::Table;
use super::writer::{TableReport, TableWriter};
use crate::config::{EtlConfig, ParquetSettings, SourceLayout, TimeBasis};
use crate::error::{Result, ResultExt as _};
use crate::storage::{Location, Storage};
use polars::prelude::DataFrame;
use std::time::{Duration, Instant};

/// Report generated after a completed run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Tables written, in write order
    pub tables: Vec<TableReport>,

    /// Catalog records read
    pub catalog_rows: usize,

    /// Activity log events read
    pub activity_rows: usize,

    /// Time taken for the whole run
    pub duration: Duration,
}

impl RunReport {
    /// Create a summary message
    pub fn summary(&self) -> String {
        format!(
            "ETL completed: {} catalog records, {} log events, {} tables ({} rows, {} files), {:.2}s",
            self.catalog_rows,
            self.activity_rows,
            self.tables.len(),
            self.tables.iter().map(|t| t.rows).sum::<usize>(),
            self.tables.iter().map(|t| t.files.len()).sum::<usize>(),
            self.duration.as_secs_f64()
        )
    }

    /// Report for one table, if it was written.
    pub fn table(&self, table: Table) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.table == table)
    }
}

/// One configured run: where to read, where to write, and how.
#[derive(Debug, Clone)]
pub struct Etl {
    source: Storage,
    sink: Storage,
    layout: SourceLayout,
    time_basis: TimeBasis,
    parquet: ParquetSettings,
    fetch_concurrency: usize,
}

impl Etl {
    /// Build a run from already opened storage; other settings come from
    /// `config`.
    pub fn new(source: Storage, sink: Storage, config: &EtlConfig) -> Self {
        Self {
            source,
            sink,
            layout: config.sources.clone(),
            time_basis: config.time_basis,
            parquet: config.parquet.clone(),
            fetch_concurrency: config.fetch_concurrency,
        }
    }

    /// Open the input and output locations named in `config`.
    pub fn from_config(config: &EtlConfig) -> Result<Self> {
        config.validate()?;
        let input = Location::parse(&config.input)?;
        let output = Location::parse(&config.output)?;

        let source = Storage::open_source(&input, &config.aws)?;
        let sink = Storage::open_sink(&output, &config.aws)
            .with_context(|| format!("Failed to open output {output}"))?;
        Ok(Self::new(source, sink, config))
    }

    /// Run both stages.
    pub async fn run(&self) -> Result<RunReport> {
        let start = Instant::now();
        tracing::info!(
            "Starting ETL from {} to {} (time basis: {})",
            self.source,
            self.sink,
            self.time_basis.as_str()
        );

        let catalog = load_catalog(&self.source, &self.layout, self.fetch_concurrency).await?;
        let mut tables = self.process_song_data(&catalog).await?;

        let activity = load_activity(&self.source, &self.layout, self.fetch_concurrency).await?;
        tables.extend(self.process_log_data(&activity, &catalog).await?);

        let report = RunReport {
            tables,
            catalog_rows: catalog.height(),
            activity_rows: activity.height(),
            duration: start.elapsed(),
        };
        tracing::info!("{}", report.summary());
        Ok(report)
    }

    /// Write `songs` and `artists`.
    pub async fn process_song_data(&self, catalog: &DataFrame) -> Result<Vec<TableReport>> {
        let writer = TableWriter::new(&self.sink, &self.parquet);
        Ok(vec![
            writer.write(Table::Songs, songs_table(catalog)).await?,
            writer.write(Table::Artists, artists_table(catalog)).await?,
        ])
    }

    /// Write `users`, `time` and `songplays`.
    pub async fn process_log_data(
        &self,
        activity: &DataFrame,
        catalog: &DataFrame,
    ) -> Result<Vec<TableReport>> {
        let writer = TableWriter::new(&self.sink, &self.parquet);
        let plays = timed_play_events(activity, self.time_basis)?;
        tracing::info!("{} play events in activity log", plays.height());

        Ok(vec![
            writer.write(Table::Users, users_table(activity)).await?,
            writer.write(Table::Time, time_table(&plays)).await?,
            writer
                .write(Table::Songplays, songplays_table(&plays, catalog))
                .await?,
        ])
    }
}

/// Open the locations in `config` and run the whole job.
pub async fn run_etl(config: &EtlConfig) -> Result<RunReport> {
    Etl::from_config(config)?.run().await
}
