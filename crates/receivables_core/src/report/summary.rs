//! Aggregations over a set of titles.
//!
//! # Invariants
//! - Every title lands in exactly one bucket of a [`StatusBreakdown`].
//! - Aggregates are recomputed from titles on every call; nothing is cached.

use super::status::{days_until_due, title_status, TitleStatus};
use crate::model::amount::Amount;
use crate::model::customer::CustomerId;
use crate::model::title::{ReceivableTitle, TitleId};
use crate::repo::title_repo::TitleWithCustomer;
use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

pub const DEFAULT_UPCOMING_WINDOW_DAYS: u32 = 7;
pub const DEFAULT_UPCOMING_LIMIT: usize = 10;
pub const DEFAULT_RECENT_LIMIT: usize = 5;

/// Count and amount for one status bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusTotals {
    pub count: u64,
    pub amount: Amount,
}

impl StatusTotals {
    fn add(&mut self, amount: Amount) {
        self.count += 1;
        self.amount = self.amount + amount;
    }
}

/// Titles folded into their derived status buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusBreakdown {
    pub pending: StatusTotals,
    pub overdue: StatusTotals,
    pub paid: StatusTotals,
}

impl StatusBreakdown {
    pub fn from_titles<'a>(
        titles: impl IntoIterator<Item = &'a ReceivableTitle>,
        today: NaiveDate,
    ) -> Self {
        let mut breakdown = Self::default();
        for title in titles {
            breakdown.add(title_status(title, today), title.amount);
        }
        breakdown
    }

    pub fn add(&mut self, status: TitleStatus, amount: Amount) {
        match status {
            TitleStatus::Pending => self.pending.add(amount),
            TitleStatus::Overdue => self.overdue.add(amount),
            TitleStatus::Paid => self.paid.add(amount),
        }
    }

    pub fn bucket(&self, status: TitleStatus) -> StatusTotals {
        match status {
            TitleStatus::Pending => self.pending,
            TitleStatus::Overdue => self.overdue,
            TitleStatus::Paid => self.paid,
        }
    }

    /// Amount still to be received (pending + overdue).
    pub fn receivable(&self) -> Amount {
        self.pending.amount + self.overdue.amount
    }
}

/// Dashboard tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardOptions {
    /// Unpaid titles due within `[today, today + window_days]` are "upcoming".
    pub upcoming_window_days: u32,
    pub upcoming_limit: usize,
    /// Length of the most-recently-created list.
    pub recent_limit: usize,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            upcoming_window_days: DEFAULT_UPCOMING_WINDOW_DAYS,
            upcoming_limit: DEFAULT_UPCOMING_LIMIT,
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }
}

/// One line of the upcoming-due list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpcomingTitle {
    pub title_id: TitleId,
    pub customer_name: String,
    pub description: String,
    pub amount: Amount,
    pub due_date: NaiveDate,
    pub days_until_due: i64,
}

/// One line of the recently-created list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecentTitle {
    pub title_id: TitleId,
    pub customer_name: String,
    pub description: String,
    pub amount: Amount,
    pub due_date: NaiveDate,
    pub status: TitleStatus,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub today: NaiveDate,
    pub breakdown: StatusBreakdown,
    pub total_receivable: Amount,
    /// Sum of titles whose paid date falls in the calendar month of `today`.
    pub received_this_month: Amount,
    pub customer_count: u64,
    pub upcoming: Vec<UpcomingTitle>,
    /// Newest titles first, ties broken by id.
    pub recent: Vec<RecentTitle>,
}

/// Builds the dashboard read model from the full title set.
pub fn build_dashboard(
    titles: &[TitleWithCustomer],
    customer_count: u64,
    today: NaiveDate,
    options: &DashboardOptions,
) -> Dashboard {
    let breakdown = StatusBreakdown::from_titles(titles.iter().map(|row| &row.title), today);

    let received_this_month: Amount = titles
        .iter()
        .filter_map(|row| row.title.paid_date.map(|paid_on| (paid_on, row.title.amount)))
        .filter(|(paid_on, _)| paid_on.year() == today.year() && paid_on.month() == today.month())
        .map(|(_, amount)| amount)
        .sum();

    let window_end = today
        .checked_add_signed(Duration::days(i64::from(options.upcoming_window_days)))
        .unwrap_or(NaiveDate::MAX);
    let mut upcoming: Vec<UpcomingTitle> = titles
        .iter()
        .filter(|row| {
            title_status(&row.title, today) == TitleStatus::Pending
                && row.title.due_date <= window_end
        })
        .map(|row| UpcomingTitle {
            title_id: row.title.id,
            customer_name: row.customer_name.clone(),
            description: row.title.description.clone(),
            amount: row.title.amount,
            due_date: row.title.due_date,
            days_until_due: days_until_due(&row.title, today).unwrap_or_default(),
        })
        .collect();
    upcoming.sort_by(|a, b| {
        a.due_date
            .cmp(&b.due_date)
            .then_with(|| a.title_id.cmp(&b.title_id))
    });
    upcoming.truncate(options.upcoming_limit);

    let mut recent: Vec<&TitleWithCustomer> = titles.iter().collect();
    recent.sort_by(|a, b| {
        b.title
            .created_at
            .cmp(&a.title.created_at)
            .then_with(|| a.title.id.cmp(&b.title.id))
    });
    let recent = recent
        .into_iter()
        .take(options.recent_limit)
        .map(|row| RecentTitle {
            title_id: row.title.id,
            customer_name: row.customer_name.clone(),
            description: row.title.description.clone(),
            amount: row.title.amount,
            due_date: row.title.due_date,
            status: title_status(&row.title, today),
            created_at: row.title.created_at,
        })
        .collect();

    Dashboard {
        today,
        breakdown,
        total_receivable: breakdown.receivable(),
        received_this_month,
        customer_count,
        upcoming,
        recent,
    }
}

/// Receivable vs. received totals for a single customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CustomerBalance {
    pub customer_id: CustomerId,
    pub breakdown: StatusBreakdown,
    pub receivable: Amount,
    pub received: Amount,
}

impl CustomerBalance {
    pub fn from_titles<'a>(
        customer_id: CustomerId,
        titles: impl IntoIterator<Item = &'a ReceivableTitle>,
        today: NaiveDate,
    ) -> Self {
        let breakdown = StatusBreakdown::from_titles(
            titles
                .into_iter()
                .filter(|title| title.customer_id == customer_id),
            today,
        );
        Self {
            customer_id,
            breakdown,
            receivable: breakdown.receivable(),
            received: breakdown.paid.amount,
        }
    }
}
