//! Song catalog and activity log ETL.
//!
//! Reads two newline-delimited JSON datasets and writes a star schema of five
//! parquet tables:
//!
//! | Table       | Source                        | Partitioned by        |
//! |-------------|-------------------------------|-----------------------|
//! | `songs`     | song catalog                  | `year`, `artist_id`   |
//! | `artists`   | song catalog                  |                       |
//! | `users`     | activity log, all events      |                       |
//! | `time`      | activity log, `NextSong` only | `year`, `month`       |
//! | `songplays` | plays joined to the catalog   | `year`, `month`       |
//!
//! # Example
//!
//! ```no_run
//! use playlake::config::{EtlConfig, TimeBasis};
//! use playlake::pipeline::run_etl;
//!
//! # async fn example() -> playlake::error::Result<()> {
//! let config = EtlConfig {
//!     input: "testdata".to_owned(),
//!     output: "/tmp/lake".to_owned(),
//!     time_basis: TimeBasis::Utc,
//!     ..Default::default()
//! };
//!
//! let report = run_etl(&config).await?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```
//!
//! Every table is a lazy query over in-memory frames; [`writer::TableWriter`]
//! materializes it, splits it into Hive partitions and replaces the previous
//! output.

pub mod activity;
pub mod catalog;
pub mod executor;
pub mod sources;
pub mod tables;
pub mod time;
pub mod writer;

pub use executor::{Etl, RunReport, run_etl};
pub use tables::Table;
pub use writer::{TableReport, TableWriter};
