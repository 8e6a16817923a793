//! Application configuration loaded from TOML.
//!
//! # Invariants
//! - Every field has a default; an empty document is a valid config.
//! - `${VAR}` references are substituted from the environment before parsing.
//!   Unknown variables are left verbatim.
//! - `RECEIVABLES_DB_PATH` replaces `database.path` when set and non-blank.

use crate::logging::{default_log_level, normalize_level};
use crate::report::summary::{
    DashboardOptions, DEFAULT_RECENT_LIMIT, DEFAULT_UPCOMING_LIMIT, DEFAULT_UPCOMING_WINDOW_DAYS,
};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DB_PATH_ENV: &str = "RECEIVABLES_DB_PATH";
pub const DEFAULT_DB_PATH: &str = "receivables.sqlite3";
pub const MAX_UPCOMING_WINDOW_DAYS: u32 = 365;

static ENV_VAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern must compile"));

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_DB_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// File logging is disabled when absent.
    pub dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub upcoming_window_days: u32,
    pub upcoming_limit: usize,
    pub recent_limit: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            upcoming_window_days: DEFAULT_UPCOMING_WINDOW_DAYS,
            upcoming_limit: DEFAULT_UPCOMING_LIMIT,
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(toml::de::Error),
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config syntax: {err}"),
            Self::Invalid { field, message } => write!(f, "invalid config `{field}`: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid { .. } => None,
        }
    }
}

impl AppConfig {
    /// Loads `path` when given, otherwise starts from defaults. The database
    /// path environment override is applied and the result validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_db_path_override(std::env::var(DB_PATH_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let processed = substitute_env_vars(content);
        toml::from_str(&processed).map_err(ConfigError::Parse)
    }

    /// Replaces the database path with `value` unless it is blank.
    pub fn apply_db_path_override(&mut self, value: Option<String>) {
        if let Some(path) = value.filter(|path| !path.trim().is_empty()) {
            self.database.path = path;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.path.trim().is_empty() {
            return Err(invalid("database.path", "cannot be empty"));
        }
        normalize_level(&self.logging.level)
            .map_err(|message| invalid("logging.level", message))?;
        if let Some(dir) = &self.logging.dir {
            if !Path::new(dir.trim()).is_absolute() {
                return Err(invalid(
                    "logging.dir",
                    format!("must be an absolute path, got `{dir}`"),
                ));
            }
        }
        if self.dashboard.upcoming_window_days > MAX_UPCOMING_WINDOW_DAYS {
            return Err(invalid(
                "dashboard.upcoming_window_days",
                format!("must be at most {MAX_UPCOMING_WINDOW_DAYS}"),
            ));
        }
        if self.dashboard.upcoming_limit == 0 {
            return Err(invalid("dashboard.upcoming_limit", "must be positive"));
        }
        if self.dashboard.recent_limit == 0 {
            return Err(invalid("dashboard.recent_limit", "must be positive"));
        }
        Ok(())
    }

    pub fn dashboard_options(&self) -> DashboardOptions {
        DashboardOptions {
            upcoming_window_days: self.dashboard.upcoming_window_days,
            upcoming_limit: self.dashboard.upcoming_limit,
            recent_limit: self.dashboard.recent_limit,
        }
    }
}

fn invalid(field: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: message.into(),
    }
}

fn substitute_env_vars(content: &str) -> String {
    ENV_VAR_RE
        .replace_all(content, |caps: &Captures| {
            let name = &caps[1];
            std::env::var(name).unwrap_or_else(|_| format!("${{{name}}}"))
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError, DEFAULT_DB_PATH};
    use crate::logging::default_log_level;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn empty_document_yields_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.database.path, DEFAULT_DB_PATH);
        assert_eq!(config.dashboard_options().upcoming_window_days, 7);
        assert_eq!(config.dashboard_options().upcoming_limit, 10);
        assert_eq!(config.dashboard_options().recent_limit, 5);
        assert_eq!(config.logging.level, default_log_level());
        config.validate().unwrap();
    }

    #[test]
    fn parses_all_sections() {
        let config = AppConfig::from_toml_str(
            r#"
[database]
path = "/var/lib/receivables/data.sqlite3"

[logging]
level = "debug"
dir = "/var/log/receivables"

[dashboard]
upcoming_window_days = 14
upcoming_limit = 3
"#,
        )
        .unwrap();
        assert_eq!(config.database.path, "/var/lib/receivables/data.sqlite3");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.dir.as_deref(), Some("/var/log/receivables"));
        assert_eq!(config.dashboard.upcoming_window_days, 14);
        assert_eq!(config.dashboard.upcoming_limit, 3);
        config.validate().unwrap();
    }

    #[test]
    fn substitutes_known_env_vars_and_keeps_unknown() {
        std::env::set_var("RECEIVABLES_CONFIG_TEST_DIR", "/srv/ar");
        let config = AppConfig::from_toml_str(
            r#"
[database]
path = "${RECEIVABLES_CONFIG_TEST_DIR}/ar.sqlite3"

[logging]
dir = "${RECEIVABLES_CONFIG_TEST_UNSET_VAR}"
"#,
        )
        .unwrap();
        assert_eq!(config.database.path, "/srv/ar/ar.sqlite3");
        assert_eq!(
            config.logging.dir.as_deref(),
            Some("${RECEIVABLES_CONFIG_TEST_UNSET_VAR}")
        );
    }

    #[test]
    fn db_path_override_ignores_blank_values() {
        let mut config = AppConfig::default();
        config.apply_db_path_override(Some("   ".to_string()));
        assert_eq!(config.database.path, DEFAULT_DB_PATH);
        config.apply_db_path_override(Some("/tmp/other.sqlite3".to_string()));
        assert_eq!(config.database.path, "/tmp/other.sqlite3");
    }

    #[test]
    fn validation_names_the_offending_field() {
        let cases = [
            ("[database]\npath = \"  \"", "database.path"),
            ("[logging]\nlevel = \"loud\"", "logging.level"),
            ("[logging]\ndir = \"logs\"", "logging.dir"),
            (
                "[dashboard]\nupcoming_window_days = 366",
                "dashboard.upcoming_window_days",
            ),
            ("[dashboard]\nupcoming_limit = 0", "dashboard.upcoming_limit"),
            ("[dashboard]\nrecent_limit = 0", "dashboard.recent_limit"),
        ];
        for (content, expected_field) in cases {
            let config = AppConfig::from_toml_str(content).unwrap();
            match config.validate() {
                Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, expected_field),
                other => panic!("expected invalid `{expected_field}`, got {other:?}"),
            }
        }
    }

    #[test]
    fn syntax_errors_are_parse_errors() {
        let err = AppConfig::from_toml_str("[database\npath = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn from_file_reads_document() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[dashboard]\nupcoming_limit = 5").unwrap();
        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.dashboard.upcoming_limit, 5);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = AppConfig::from_file("/nonexistent/receivables.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
