//! Run configuration.
//!
//! Settings live in a JSON file (`dl.json` by default) next to the binary's
//! working directory. Every field has a default, so a partial file, or no file
//! at all, still yields a runnable configuration:
//!
//! ```json
//! {
//!   "input": "s3a://udacity-dend/",
//!   "output": "data/",
//!   "aws": { "access_key_id": "AKIA...", "secret_access_key": "...", "region": "us-west-2" },
//!   "time_basis": "local"
//! }
//! ```
//!
//! Credentials are held as [`SecretString`] and handed straight to the S3
//! client builder; they are never exported into the process environment.
//!
//! INI-style `dl.cfg` files with an `[AWS]` section are not read. Move
//! `AWS_ACCESS_KEY_ID` and `AWS_SECRET_ACCESS_KEY` into the `aws` object of
//! `dl.json`. A `dl.cfg` found beside a missing `dl.json` is reported with a
//! warning before defaults are used.

use crate::error::{EtlError, Result, ResultExt as _};
use secrecy::{ExposeSecret as _, SecretString};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Written in place of a secret whenever the configuration is serialized.
pub const REDACTED_PLACEHOLDER: &str = "__REDACTED__";

/// Default configuration file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "dl.json";

/// INI credentials file name that is recognized but never parsed.
pub const LEGACY_CONFIG_FILE: &str = "dl.cfg";

/// Top-level configuration for one ETL run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
    /// Source location: local directory, `file://` URL or `s3://` / `s3a://` prefix
    pub input: String,

    /// Output location, same forms as `input`
    pub output: String,

    /// S3 credentials and region
    pub aws: AwsConfig,

    /// Time zone used to turn epoch milliseconds into calendar fields
    pub time_basis: TimeBasis,

    /// Where the two source datasets live under `input`
    pub sources: SourceLayout,

    /// Parquet encoding settings
    pub parquet: ParquetSettings,

    /// Maximum number of source objects fetched at once
    pub fetch_concurrency: usize,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            input: "s3a://udacity-dend/".to_owned(),
            output: "data/".to_owned(),
            aws: AwsConfig::default(),
            time_basis: TimeBasis::default(),
            sources: SourceLayout::default(),
            parquet: ParquetSettings::default(),
            fetch_concurrency: 16,
        }
    }
}

impl EtlConfig {
    /// Load configuration from a JSON file.
    ///
    /// A missing file is not an error: defaults are returned and a warning is
    /// logged, so a run against local data needs no configuration at all.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!(
                "Config file {} not found, using defaults",
                path.display()
            );
            if let Some(legacy) = legacy_config_beside(path) {
                tracing::warn!(
                    "Ignoring {}: INI credentials are not read, move them into the aws section of {}",
                    legacy.display(),
                    DEFAULT_CONFIG_FILE
                );
            }
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_json(&content)?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from a JSON string and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to JSON; secrets are replaced by a placeholder.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject settings that cannot produce a run.
    pub fn validate(&self) -> Result<()> {
        if self.input.trim().is_empty() {
            return Err(EtlError::Config("input location is empty".to_owned()));
        }
        if self.output.trim().is_empty() {
            return Err(EtlError::Config("output location is empty".to_owned()));
        }
        if self.fetch_concurrency == 0 {
            return Err(EtlError::Config(
                "fetch_concurrency must be at least 1".to_owned(),
            ));
        }
        if self.parquet.row_group_size == Some(0) {
            return Err(EtlError::Config(
                "parquet.row_group_size must be at least 1".to_owned(),
            ));
        }
        if self.aws.access_key_id.is_some() != self.aws.secret_access_key.is_some() {
            return Err(EtlError::Config(
                "aws.access_key_id and aws.secret_access_key must be set together".to_owned(),
            ));
        }
        Ok(())
    }
}

/// S3 connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    #[serde(
        serialize_with = "serialize_secret",
        deserialize_with = "deserialize_secret"
    )]
    pub access_key_id: Option<SecretString>,

    #[serde(
        serialize_with = "serialize_secret",
        deserialize_with = "deserialize_secret"
    )]
    pub secret_access_key: Option<SecretString>,

    pub region: String,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            access_key_id: None,
            secret_access_key: None,
            region: "us-west-2".to_owned(),
        }
    }
}

impl AwsConfig {
    /// Both halves of a static credential pair, if configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(key), Some(secret)) => Some((key.expose_secret(), secret.expose_secret())),
            _ => None,
        }
    }
}

fn serialize_secret<S>(
    secret: &Option<SecretString>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match secret {
        Some(s) if !s.expose_secret().is_empty() => serializer.serialize_str(REDACTED_PLACEHOLDER),
        _ => serializer.serialize_none(),
    }
}

fn deserialize_secret<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<SecretString>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .filter(|s| !s.is_empty())
        .map(|s| SecretString::new(s.into())))
}

/// Time zone used to derive calendar fields from epoch milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TimeBasis {
    /// The execution environment's local time zone
    #[default]
    Local,

    /// Coordinated Universal Time, independent of the host
    Utc,
}

impl TimeBasis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Utc => "utc",
        }
    }
}

/// Relative layout of the two source datasets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SourceLayout {
    /// Prefix of the song catalog tree
    pub song_data_prefix: String,

    /// Directory levels between the catalog prefix and its files
    pub song_data_depth: usize,

    /// Prefix of the activity logs
    pub log_data_prefix: String,

    /// Directory levels between the log prefix and its files
    pub log_data_depth: usize,

    /// File extension of source objects, without the dot
    pub extension: String,
}

impl Default for SourceLayout {
    fn default() -> Self {
        Self {
            song_data_prefix: "song_data".to_owned(),
            song_data_depth: 3,
            log_data_prefix: "log-data".to_owned(),
            log_data_depth: 0,
            extension: "json".to_owned(),
        }
    }
}

/// Parquet encoding settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ParquetSettings {
    /// Fixed row group size; adaptive when unset
    pub row_group_size: Option<usize>,

    pub compression: Compression,
}

/// Parquet page compression.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    Snappy,
    Zstd,
    Uncompressed,
}

/// Resolve the configuration file path from an optional CLI override.
pub fn config_path(cli_override: Option<PathBuf>) -> PathBuf {
    cli_override.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// A `dl.cfg` in the same directory as `config_file`, if there is one.
pub fn legacy_config_beside(config_file: &Path) -> Option<PathBuf> {
    let dir = config_file.parent().unwrap_or_else(|| Path::new(""));
    let legacy = dir.join(LEGACY_CONFIG_FILE);
    legacy.is_file().then_some(legacy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_bucket_layout() {
        let config = EtlConfig::default();
        assert_eq!(config.input, "s3a://udacity-dend/");
        assert_eq!(config.sources.song_data_prefix, "song_data");
        assert_eq!(config.sources.song_data_depth, 3);
        assert_eq!(config.sources.log_data_prefix, "log-data");
        assert_eq!(config.time_basis, TimeBasis::Local);
        assert!(config.aws.credentials().is_none(), "no credentials by default");
    }

    #[test]
    fn test_partial_json_fills_defaults() -> Result<()> {
        let config = EtlConfig::from_json(
            r#"{
                "output": "/tmp/lake",
                "aws": { "access_key_id": "AKIAEXAMPLE", "secret_access_key": "s3cr3t" },
                "time_basis": "utc"
            }"#,
        )?;

        assert_eq!(config.output, "/tmp/lake");
        assert_eq!(config.input, "s3a://udacity-dend/");
        assert_eq!(config.aws.region, "us-west-2");
        assert_eq!(config.time_basis, TimeBasis::Utc);
        assert_eq!(config.aws.credentials(), Some(("AKIAEXAMPLE", "s3cr3t")));
        Ok(())
    }

    #[test]
    fn test_secrets_are_not_serialized() -> Result<()> {
        let config = EtlConfig::from_json(
            r#"{ "aws": { "access_key_id": "AKIAEXAMPLE", "secret_access_key": "s3cr3t" } }"#,
        )?;

        let json = config.to_json()?;
        assert!(!json.contains("s3cr3t"), "secret leaked: {json}");
        assert!(!json.contains("AKIAEXAMPLE"), "key id leaked: {json}");
        assert!(json.contains(REDACTED_PLACEHOLDER));

        let debug = format!("{config:?}");
        assert!(!debug.contains("s3cr3t"), "secret leaked in Debug: {debug}");
        Ok(())
    }

    #[test]
    fn test_half_credentials_rejected() {
        let result = EtlConfig::from_json(r#"{ "aws": { "access_key_id": "AKIAEXAMPLE" } }"#);
        assert!(matches!(result, Err(EtlError::Config(_))));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let result = EtlConfig::from_json(r#"{ "fetch_concurrency": 0 }"#);
        assert!(matches!(result, Err(EtlError::Config(_))));
    }

    #[test]
    fn test_missing_file_yields_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = EtlConfig::load(dir.path().join("absent.json"))?;
        assert_eq!(config.output, "data/");
        Ok(())
    }

    #[test]
    fn test_legacy_ini_file_is_detected_not_read() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config_file = dir.path().join(DEFAULT_CONFIG_FILE);
        assert_eq!(legacy_config_beside(&config_file), None);

        let legacy = dir.path().join(LEGACY_CONFIG_FILE);
        std::fs::write(
            &legacy,
            "[AWS]\nAWS_ACCESS_KEY_ID=AKIAEXAMPLE\nAWS_SECRET_ACCESS_KEY=secret\n",
        )?;
        assert_eq!(legacy_config_beside(&config_file), Some(legacy));

        let config = EtlConfig::load(&config_file)?;
        assert!(config.aws.access_key_id.is_none(), "dl.cfg values are not picked up");
        assert_eq!(config.input, "s3a://udacity-dend/");
        Ok(())
    }

    #[test]
    fn test_unknown_time_basis_rejected() {
        let result = EtlConfig::from_json(r#"{ "time_basis": "pst" }"#);
        assert!(matches!(result, Err(EtlError::Config(_))));
    }
}
