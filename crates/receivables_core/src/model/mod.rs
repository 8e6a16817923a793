//! Receivables domain model.
//!
//! # Responsibility
//! - Define typed records for customers and the titles they owe.
//! - Keep write-time invariants next to the data they guard.
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - Title status is never stored; see `report::status`.

pub mod amount;
pub mod customer;
pub mod title;

use std::error::Error;
use std::fmt::{Display, Formatter};

use customer::CustomerValidationError;
use title::TitleValidationError;

/// Validation failure from either entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Customer(CustomerValidationError),
    Title(TitleValidationError),
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Customer(err) => err.field(),
            Self::Title(err) => err.field(),
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer(err) => write!(f, "{err}"),
            Self::Title(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ValidationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Customer(err) => Some(err),
            Self::Title(err) => Some(err),
        }
    }
}

impl From<CustomerValidationError> for ValidationError {
    fn from(value: CustomerValidationError) -> Self {
        Self::Customer(value)
    }
}

impl From<TitleValidationError> for ValidationError {
    fn from(value: TitleValidationError) -> Self {
        Self::Title(value)
    }
}
