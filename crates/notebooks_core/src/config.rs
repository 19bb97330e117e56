//! Store configuration.
//!
//! # Invariants
//! - `schema_name` is never empty; it names the store file when no explicit
//!   `store_name` is given.
//! - Store names are plain file stems (no path separators).

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

const STORE_FILE_EXTENSION: &str = "sqlite";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Where a store lives and how its connections are configured.
///
/// Deserializable from TOML:
///
/// ```toml
/// schema_name = "Notebooks"
/// store_dir = "/var/lib/notebooks"
/// store_name = "scratch"     # optional
/// busy_timeout_ms = 2500     # optional
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    schema_name: String,
    #[serde(default)]
    store_name: Option<String>,
    store_dir: PathBuf,
    #[serde(default = "default_busy_timeout_ms")]
    busy_timeout_ms: u64,
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

impl StoreConfig {
    pub fn new(
        schema_name: impl Into<String>,
        store_dir: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            schema_name: schema_name.into(),
            store_name: None,
            store_dir: store_dir.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        };
        config.validate()?;
        Ok(config)
    }

    /// Uses `store_name` instead of the schema name for the store file.
    pub fn with_store_name(mut self, store_name: impl Into<String>) -> Result<Self, ConfigError> {
        self.store_name = Some(store_name.into());
        self.validate()?;
        Ok(self)
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    pub fn store_name(&self) -> Option<&str> {
        self.store_name.as_deref()
    }

    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// `<store_name or schema_name>.sqlite`
    pub fn store_file_name(&self) -> String {
        let stem = self.store_name.as_deref().unwrap_or(&self.schema_name);
        format!("{stem}.{STORE_FILE_EXTENSION}")
    }

    pub fn store_path(&self) -> PathBuf {
        self.store_dir.join(self.store_file_name())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.schema_name.trim().is_empty() {
            return Err(ConfigError::EmptySchemaName);
        }
        for name in std::iter::once(self.schema_name.as_str()).chain(self.store_name.as_deref()) {
            if !is_valid_file_stem(name) {
                return Err(ConfigError::InvalidStoreName(name.to_string()));
            }
        }
        Ok(())
    }
}

fn is_valid_file_stem(name: &str) -> bool {
    !name.trim().is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(toml::de::Error),
    EmptySchemaName,
    InvalidStoreName(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid store config: {err}"),
            Self::EmptySchemaName => write!(f, "schema name must not be empty"),
            Self::InvalidStoreName(name) => write!(f, "invalid store name `{name}`"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::EmptySchemaName | Self::InvalidStoreName(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, StoreConfig};
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn store_file_defaults_to_schema_name() {
        let config = StoreConfig::new("Notebooks", "/tmp/stores").unwrap();
        assert_eq!(config.store_file_name(), "Notebooks.sqlite");
        assert_eq!(
            config.store_path(),
            PathBuf::from("/tmp/stores/Notebooks.sqlite")
        );
        assert_eq!(config.busy_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn explicit_store_name_wins() {
        let config = StoreConfig::new("Notebooks", "/tmp/stores")
            .unwrap()
            .with_store_name("preview")
            .unwrap();
        assert_eq!(config.store_file_name(), "preview.sqlite");
    }

    #[test]
    fn blank_schema_name_is_rejected() {
        assert!(matches!(
            StoreConfig::new("  ", "/tmp"),
            Err(ConfigError::EmptySchemaName)
        ));
    }

    #[test]
    fn store_name_with_separator_is_rejected() {
        let result = StoreConfig::new("Notebooks", "/tmp")
            .unwrap()
            .with_store_name("../escape");
        assert!(matches!(result, Err(ConfigError::InvalidStoreName(_))));
    }

    #[test]
    fn parses_toml_with_defaults() {
        let config = StoreConfig::from_toml_str(
            r#"
            schema_name = "Notebooks"
            store_dir = "/data"
            "#,
        )
        .unwrap();
        assert_eq!(config.store_name(), None);
        assert_eq!(config.busy_timeout(), Duration::from_millis(5_000));

        let err = StoreConfig::from_toml_str("schema_name = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        match StoreConfig::load(&path) {
            Err(ConfigError::Read { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
