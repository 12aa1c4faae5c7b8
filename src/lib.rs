//! # Playlake - song catalog and listening-log ETL
//!
//! Playlake is a batch job for a music streaming service. It reads a song
//! catalog and user activity logs, both newline-delimited JSON in a local
//! directory or an S3 bucket, and writes five analytical tables as
//! Hive-partitioned parquet: `songs`, `artists`, `users`, `time` and the
//! `songplays` fact table.
//!
//! ## Quick Start
//!
//! ```no_run
//! use playlake::config::EtlConfig;
//!
//! # async fn example() -> playlake::error::Result<()> {
//! let config = EtlConfig::load("dl.json")?;
//! let report = playlake::pipeline::run_etl(&config).await?;
//!
//! for table in &report.tables {
//!     println!("{}", table.summary());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Modules
//!
//! - [`config`]: JSON configuration, S3 credentials and run settings
//! - [`storage`]: Local and S3 object access through one client
//! - [`records`]: Permissive JSON-lines parsing into typed records and frames
//! - [`pipeline`]: Table derivations, partitioned writes and the run itself
//! - [`error`]: Error types and handling utilities
//! - [`logging`]: Console and rolling file logs
//!
//! ## Lazy Evaluation
//!
//! Every output table is a polars `LazyFrame` over the loaded source frames.
//! Nothing is computed until the writer collects it, just before encoding:
//!
//! ```no_run
//! use playlake::pipeline::catalog::songs_table;
//! use playlake::records::{SongRecord, song_frame};
//!
//! let catalog = song_frame(&[SongRecord::default()])?;
//! let songs = songs_table(&catalog); // query plan only
//! let df = songs.collect()?;         // executed here
//! # Ok::<(), playlake::error::EtlError>(())
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod records;
pub mod storage;
