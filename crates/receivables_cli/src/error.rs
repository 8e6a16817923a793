use receivables_core::{ConfigError, DbError, ErrorKind, RepoError, ServiceError};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Any failure that ends a command.
#[derive(Debug)]
pub enum CliError {
    Config(ConfigError),
    Logging(String),
    Db(DbError),
    Service(ServiceError),
    Io(std::io::Error),
}

impl CliError {
    /// Process exit code: validation 2, not found 3, conflict 4, anything else 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Service(err) => match err.kind() {
                ErrorKind::Validation => 2,
                ErrorKind::NotFound => 3,
                ErrorKind::Conflict => 4,
                ErrorKind::Internal => 1,
            },
            Self::Logging(_) | Self::Db(_) | Self::Io(_) => 1,
        }
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Logging(message) => write!(f, "logging setup failed: {message}"),
            Self::Db(err) => write!(f, "cannot open database: {err}"),
            Self::Service(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Service(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Logging(_) => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<DbError> for CliError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<ServiceError> for CliError {
    fn from(value: ServiceError) -> Self {
        Self::Service(value)
    }
}

impl From<RepoError> for CliError {
    fn from(value: RepoError) -> Self {
        Self::Service(value.into())
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
