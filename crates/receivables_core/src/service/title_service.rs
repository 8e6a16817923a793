//! Receivable title use-case service.
//!
//! # Invariants
//! - New titles always start unpaid.
//! - Paid titles are read-only; there is no way back to unpaid.
//! - The payment date defaults to the caller's evaluation date.
//! - An installment plan is stored whole or not at all.

use crate::model::amount::Amount;
use crate::model::customer::{non_blank, CustomerId};
use crate::model::title::{ReceivableTitle, TitleId, TitleValidationError, MAX_INSTALLMENTS};
use crate::repo::title_repo::{TitleListQuery, TitleRepository, TitleWithCustomer};
use crate::repo::{ConflictError, EntityRef};
use crate::service::{error_code, ServiceError, ServiceResult};
use chrono::{Months, NaiveDate};
use log::{info, warn};

/// Registration form for a new title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleDraft {
    pub customer_id: CustomerId,
    pub description: String,
    pub amount: Amount,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
}

/// Editable fields of an unpaid title. The owning customer is fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleChanges {
    pub description: String,
    pub amount: Amount,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
}

impl TitleChanges {
    /// Copies the editable fields of an existing record.
    pub fn from_title(title: &ReceivableTitle) -> Self {
        Self {
            description: title.description.clone(),
            amount: title.amount,
            issue_date: title.issue_date,
            due_date: title.due_date,
            notes: title.notes.clone(),
        }
    }
}

/// Title service facade over repository implementations.
pub struct TitleService<R: TitleRepository> {
    repo: R,
}

impl<R: TitleRepository> TitleService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers an unpaid title for an existing customer.
    pub fn register_title(&self, draft: TitleDraft) -> ServiceResult<ReceivableTitle> {
        let title = ReceivableTitle::new(
            draft.customer_id,
            draft.description,
            draft.amount,
            draft.issue_date,
            draft.due_date,
        )
        .with_notes(draft.notes);

        let id = self.repo.create_title(&title).inspect_err(|err| {
            warn!(
                "event=title_create module=service status=error error_code={}",
                error_code(err)
            );
        })?;
        info!(
            "event=title_create module=service status=ok title_id={id} customer_id={}",
            title.customer_id
        );
        self.read_back(id, "created title not found in read-back")
    }

    /// Splits `draft.amount` into `count` monthly titles.
    ///
    /// Installment `i` (zero-based) is due `i` months after `draft.due_date`,
    /// clamped to the end of shorter months. Descriptions get an `(i/count)`
    /// suffix when `count > 1`. Returns the stored titles in due order.
    pub fn register_installments(
        &self,
        draft: TitleDraft,
        count: u32,
    ) -> ServiceResult<Vec<ReceivableTitle>> {
        if count == 0 || count > MAX_INSTALLMENTS {
            return Err(TitleValidationError::InstallmentCountOutOfRange {
                count,
                max: MAX_INSTALLMENTS,
            }
            .into());
        }

        let description = draft.description.trim();
        let mut titles = Vec::with_capacity(count as usize);
        for (index, amount) in (0..count).zip(draft.amount.split(count)) {
            let due_date = draft
                .due_date
                .checked_add_months(Months::new(index))
                .ok_or(TitleValidationError::DateOutOfRange {
                    field: "due_date",
                    date: draft.due_date,
                })?;
            let label = if count == 1 {
                description.to_string()
            } else {
                format!("{description} ({}/{count})", index + 1)
                    .trim_start()
                    .to_string()
            };
            titles.push(
                ReceivableTitle::new(draft.customer_id, label, amount, draft.issue_date, due_date)
                    .with_notes(draft.notes.clone()),
            );
        }

        let ids = self.repo.create_titles(&titles).inspect_err(|err| {
            warn!(
                "event=title_installments module=service status=error count={count} error_code={}",
                error_code(err)
            );
        })?;
        info!(
            "event=title_installments module=service status=ok count={count} customer_id={}",
            draft.customer_id
        );
        ids.into_iter()
            .map(|id| self.read_back(id, "installment not found in read-back"))
            .collect()
    }

    pub fn get_title(&self, id: TitleId) -> ServiceResult<ReceivableTitle> {
        self.repo
            .get_title(id)?
            .ok_or(ServiceError::NotFound(EntityRef::Title(id)))
    }

    /// Lists titles by due date, optionally for one customer only.
    pub fn list_titles(
        &self,
        customer_id: Option<CustomerId>,
    ) -> ServiceResult<Vec<TitleWithCustomer>> {
        Ok(self.repo.list_titles(&TitleListQuery { customer_id })?)
    }

    /// Replaces the editable fields of an unpaid title.
    pub fn update_title(
        &self,
        id: TitleId,
        changes: TitleChanges,
    ) -> ServiceResult<ReceivableTitle> {
        let mut title = self.get_title(id)?;
        if title.paid {
            return Err(ServiceError::Conflict(ConflictError::TitleAlreadyPaid(id)));
        }

        title.description = changes.description.trim().to_string();
        title.amount = changes.amount;
        title.issue_date = changes.issue_date;
        title.due_date = changes.due_date;
        title.notes = non_blank(changes.notes);

        self.repo.update_title(&title).inspect_err(|err| {
            warn!(
                "event=title_update module=service status=error title_id={id} error_code={}",
                error_code(err)
            );
        })?;
        info!("event=title_update module=service status=ok title_id={id}");
        self.read_back(id, "updated title not found in read-back")
    }

    /// Records payment on `paid_on`, or on `today` when no date is given.
    pub fn mark_paid(
        &self,
        id: TitleId,
        paid_on: Option<NaiveDate>,
        today: NaiveDate,
    ) -> ServiceResult<ReceivableTitle> {
        let paid_on = paid_on.unwrap_or(today);
        self.repo.mark_paid(id, paid_on).inspect_err(|err| {
            warn!(
                "event=title_mark_paid module=service status=error title_id={id} error_code={}",
                error_code(err)
            );
        })?;
        info!("event=title_mark_paid module=service status=ok title_id={id} paid_on={paid_on}");
        self.read_back(id, "paid title not found in read-back")
    }

    pub fn delete_title(&self, id: TitleId) -> ServiceResult<()> {
        self.repo.delete_title(id).inspect_err(|err| {
            warn!(
                "event=title_delete module=service status=error title_id={id} error_code={}",
                error_code(err)
            );
        })?;
        info!("event=title_delete module=service status=ok title_id={id}");
        Ok(())
    }

    fn read_back(&self, id: TitleId, details: &'static str) -> ServiceResult<ReceivableTitle> {
        self.repo
            .get_title(id)?
            .ok_or(ServiceError::InconsistentState(details))
    }
}
