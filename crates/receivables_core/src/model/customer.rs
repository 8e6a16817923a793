//! Customer domain model.
//!
//! # Responsibility
//! - Define the registry record that receivable titles point at.
//! - Validate name and contact fields before persistence.
//!
//! # Invariants
//! - `id` is stable and never reused for another customer.
//! - `name` is non-empty after trimming.
//! - Blank optional contact fields are stored as `None`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type CustomerId = Uuid;

pub const NAME_MAX_CHARS: usize = 200;
pub const DOCUMENT_MAX_CHARS: usize = 18;
pub const PHONE_MAX_CHARS: usize = 20;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex")
});

/// Optional ways of reaching a customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    /// Tax document (CPF/CNPJ or equivalent), free format.
    pub document: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

impl ContactInfo {
    /// Trims every field and turns blank values into `None`.
    pub fn normalized(self) -> Self {
        Self {
            document: non_blank(self.document),
            phone: non_blank(self.phone),
            email: non_blank(self.email),
            address: non_blank(self.address),
        }
    }
}

/// Registered customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub contact: ContactInfo,
    pub notes: Option<String>,
    /// Epoch milliseconds, set by storage.
    pub created_at: i64,
    /// Epoch milliseconds, refreshed by storage on every update.
    pub updated_at: i64,
}

/// Field-level validation failure for customer writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomerValidationError {
    EmptyName,
    NameTooLong { max: usize },
    DocumentTooLong { max: usize },
    PhoneTooLong { max: usize },
    InvalidEmail(String),
}

impl CustomerValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            Self::EmptyName | Self::NameTooLong { .. } => "name",
            Self::DocumentTooLong { .. } => "document",
            Self::PhoneTooLong { .. } => "phone",
            Self::InvalidEmail(_) => "email",
        }
    }
}

impl Display for CustomerValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "name: must not be empty"),
            Self::NameTooLong { max } => write!(f, "name: must be at most {max} characters"),
            Self::DocumentTooLong { max } => {
                write!(f, "document: must be at most {max} characters")
            }
            Self::PhoneTooLong { max } => write!(f, "phone: must be at most {max} characters"),
            Self::InvalidEmail(value) => write!(f, "email: `{value}` is not a valid address"),
        }
    }
}

impl Error for CustomerValidationError {}

impl Customer {
    /// Creates a customer with a generated id and normalized fields.
    ///
    /// Timestamps are zero until the row is read back from storage.
    pub fn new(name: impl Into<String>, contact: ContactInfo) -> Self {
        Self::with_id(Uuid::new_v4(), name, contact)
    }

    /// Creates a customer with a caller-provided id.
    pub fn with_id(id: CustomerId, name: impl Into<String>, contact: ContactInfo) -> Self {
        Self {
            id,
            name: name.into().trim().to_string(),
            contact: contact.normalized(),
            notes: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    /// Checks every write-time invariant.
    pub fn validate(&self) -> Result<(), CustomerValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(CustomerValidationError::EmptyName);
        }
        if name.chars().count() > NAME_MAX_CHARS {
            return Err(CustomerValidationError::NameTooLong {
                max: NAME_MAX_CHARS,
            });
        }
        if exceeds(self.contact.document.as_deref(), DOCUMENT_MAX_CHARS) {
            return Err(CustomerValidationError::DocumentTooLong {
                max: DOCUMENT_MAX_CHARS,
            });
        }
        if exceeds(self.contact.phone.as_deref(), PHONE_MAX_CHARS) {
            return Err(CustomerValidationError::PhoneTooLong {
                max: PHONE_MAX_CHARS,
            });
        }
        if let Some(email) = self.contact.email.as_deref() {
            if !EMAIL_RE.is_match(email) {
                return Err(CustomerValidationError::InvalidEmail(email.to_string()));
            }
        }
        Ok(())
    }
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn exceeds(value: Option<&str>, max: usize) -> bool {
    value.is_some_and(|text| text.chars().count() > max)
}
