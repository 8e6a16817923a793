//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Translate repository failures into caller-facing error kinds.
//! - Keep CLI layers decoupled from storage details.

pub mod customer_service;
pub mod report_service;
pub mod title_service;

use crate::model::title::TitleValidationError;
use crate::model::ValidationError;
use crate::repo::{ConflictError, EntityRef, RepoError};
use crate::report::export::ExportError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Coarse error category used at the request boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Internal,
}

/// Error returned by every service operation.
#[derive(Debug)]
pub enum ServiceError {
    /// Write rejected before reaching storage.
    Validation(ValidationError),
    /// Referenced customer or title does not exist.
    NotFound(EntityRef),
    /// Write refused because of related state.
    Conflict(ConflictError),
    /// Export sink failure.
    Export(ExportError),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Export(_) | Self::Repo(_) | Self::InconsistentState(_) => ErrorKind::Internal,
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "validation failed: {err}"),
            Self::NotFound(entity) => write!(f, "{entity} not found"),
            Self::Conflict(err) => write!(f, "{err}"),
            Self::Export(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent state: {details}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Conflict(err) => Some(err),
            Self::Export(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::NotFound(_) | Self::InconsistentState(_) => None,
        }
    }
}

/// Stable, data-free code for log lines.
pub(crate) fn error_code(err: &RepoError) -> &'static str {
    match err {
        RepoError::Validation(_) => "validation_failed",
        RepoError::NotFound(_) => "not_found",
        RepoError::Conflict(_) => "conflict",
        RepoError::Db(_) => "db_error",
        RepoError::InvalidData(_) => "invalid_data",
        RepoError::UninitializedConnection { .. }
        | RepoError::MissingRequiredTable(_)
        | RepoError::MissingRequiredColumn { .. } => "schema_mismatch",
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound(entity) => Self::NotFound(entity),
            RepoError::Conflict(err) => Self::Conflict(err),
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<TitleValidationError> for ServiceError {
    fn from(value: TitleValidationError) -> Self {
        Self::Validation(value.into())
    }
}

impl From<ExportError> for ServiceError {
    fn from(value: ExportError) -> Self {
        Self::Export(value)
    }
}
