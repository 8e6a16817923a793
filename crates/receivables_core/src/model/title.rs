//! Receivable title domain model.
//!
//! # Responsibility
//! - Define the amount-owed record and its payment state.
//! - Own the unpaid -> paid transition.
//!
//! # Invariants
//! - `amount` is strictly positive.
//! - Every date falls in years `0..=9999` so its ISO text sorts correctly.
//! - `due_date` never precedes `issue_date`.
//! - `paid_date` is set iff `paid` is true, and is never before `issue_date`.
//! - There is no paid -> unpaid transition.

use crate::model::amount::Amount;
use crate::model::customer::{non_blank, CustomerId};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type TitleId = Uuid;

pub const DESCRIPTION_MAX_CHARS: usize = 200;
pub const MAX_INSTALLMENTS: u32 = 360;
const STORABLE_YEARS: std::ops::RangeInclusive<i32> = 0..=9999;

/// One receivable (invoice) owed by a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivableTitle {
    pub id: TitleId,
    pub customer_id: CustomerId,
    pub description: String,
    pub amount: Amount,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub paid: bool,
    pub paid_date: Option<NaiveDate>,
    pub notes: Option<String>,
    /// Epoch milliseconds, set by storage.
    pub created_at: i64,
    /// Epoch milliseconds, refreshed by storage on every update.
    pub updated_at: i64,
}

/// Field-level validation failure for title writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleValidationError {
    NonPositiveAmount(Amount),
    DateOutOfRange {
        field: &'static str,
        date: NaiveDate,
    },
    DueBeforeIssue {
        issue_date: NaiveDate,
        due_date: NaiveDate,
    },
    PaidBeforeIssue {
        issue_date: NaiveDate,
        paid_date: NaiveDate,
    },
    /// `paid` and `paid_date` disagree.
    PaymentStateMismatch,
    DescriptionTooLong { max: usize },
    UnknownCustomer(CustomerId),
    InstallmentCountOutOfRange { count: u32, max: u32 },
}

impl TitleValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            Self::NonPositiveAmount(_) => "amount",
            Self::DateOutOfRange { field, .. } => *field,
            Self::DueBeforeIssue { .. } => "due_date",
            Self::PaidBeforeIssue { .. } | Self::PaymentStateMismatch => "paid_date",
            Self::DescriptionTooLong { .. } => "description",
            Self::UnknownCustomer(_) => "customer_id",
            Self::InstallmentCountOutOfRange { .. } => "installments",
        }
    }
}

impl Display for TitleValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositiveAmount(amount) => {
                write!(f, "amount: must be greater than zero, got {amount}")
            }
            Self::DateOutOfRange { field, date } => {
                write!(f, "{field}: {date} is outside years 0000-9999")
            }
            Self::DueBeforeIssue {
                issue_date,
                due_date,
            } => write!(
                f,
                "due_date: {due_date} is earlier than issue_date {issue_date}"
            ),
            Self::PaidBeforeIssue {
                issue_date,
                paid_date,
            } => write!(
                f,
                "paid_date: {paid_date} is earlier than issue_date {issue_date}"
            ),
            Self::PaymentStateMismatch => {
                write!(f, "paid_date: must be set exactly when the title is paid")
            }
            Self::DescriptionTooLong { max } => {
                write!(f, "description: must be at most {max} characters")
            }
            Self::UnknownCustomer(id) => write!(f, "customer_id: customer {id} does not exist"),
            Self::InstallmentCountOutOfRange { count, max } => {
                write!(f, "installments: must be between 1 and {max}, got {count}")
            }
        }
    }
}

impl Error for TitleValidationError {}

/// Rejects dates whose ISO text would not be four-digit `YYYY-MM-DD`.
pub fn check_storable_date(
    field: &'static str,
    date: NaiveDate,
) -> Result<(), TitleValidationError> {
    if STORABLE_YEARS.contains(&date.year()) {
        Ok(())
    } else {
        Err(TitleValidationError::DateOutOfRange { field, date })
    }
}

impl ReceivableTitle {
    /// Creates an unpaid title with a generated id.
    pub fn new(
        customer_id: CustomerId,
        description: impl Into<String>,
        amount: Amount,
        issue_date: NaiveDate,
        due_date: NaiveDate,
    ) -> Self {
        Self::with_id(
            Uuid::new_v4(),
            customer_id,
            description,
            amount,
            issue_date,
            due_date,
        )
    }

    /// Creates an unpaid title with a caller-provided id.
    pub fn with_id(
        id: TitleId,
        customer_id: CustomerId,
        description: impl Into<String>,
        amount: Amount,
        issue_date: NaiveDate,
        due_date: NaiveDate,
    ) -> Self {
        Self {
            id,
            customer_id,
            description: description.into().trim().to_string(),
            amount,
            issue_date,
            due_date,
            paid: false,
            paid_date: None,
            notes: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = non_blank(notes);
        self
    }

    /// Checks every write-time invariant.
    pub fn validate(&self) -> Result<(), TitleValidationError> {
        if !self.amount.is_positive() {
            return Err(TitleValidationError::NonPositiveAmount(self.amount));
        }
        check_storable_date("issue_date", self.issue_date)?;
        check_storable_date("due_date", self.due_date)?;
        if let Some(paid_date) = self.paid_date {
            check_storable_date("paid_date", paid_date)?;
        }
        if self.due_date < self.issue_date {
            return Err(TitleValidationError::DueBeforeIssue {
                issue_date: self.issue_date,
                due_date: self.due_date,
            });
        }
        match (self.paid, self.paid_date) {
            (true, Some(paid_date)) if paid_date < self.issue_date => {
                return Err(TitleValidationError::PaidBeforeIssue {
                    issue_date: self.issue_date,
                    paid_date,
                });
            }
            (true, Some(_)) | (false, None) => {}
            _ => return Err(TitleValidationError::PaymentStateMismatch),
        }
        if self.description.chars().count() > DESCRIPTION_MAX_CHARS {
            return Err(TitleValidationError::DescriptionTooLong {
                max: DESCRIPTION_MAX_CHARS,
            });
        }
        Ok(())
    }

    /// Records payment on `paid_on`.
    ///
    /// Returns `Ok(false)` without changes when the title is already paid.
    /// Leaves `self` untouched on error.
    pub fn mark_paid(&mut self, paid_on: NaiveDate) -> Result<bool, TitleValidationError> {
        if self.paid {
            return Ok(false);
        }
        check_storable_date("paid_date", paid_on)?;
        if paid_on < self.issue_date {
            return Err(TitleValidationError::PaidBeforeIssue {
                issue_date: self.issue_date,
                paid_date: paid_on,
            });
        }
        self.paid = true;
        self.paid_date = Some(paid_on);
        Ok(true)
    }
}
