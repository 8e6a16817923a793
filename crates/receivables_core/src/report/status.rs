//! Derived title status.
//!
//! # Invariants
//! - Status is a pure function of `(paid, due_date, today)`.
//! - A paid title is `Paid` regardless of its due date.
//! - A title due today is `Pending`, not `Overdue`.

use crate::model::title::ReceivableTitle;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleStatus {
    /// Unpaid and not yet due.
    Pending,
    /// Unpaid and due before the evaluation date.
    Overdue,
    /// Payment recorded.
    Paid,
}

impl TitleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Overdue => "overdue",
            Self::Paid => "paid",
        }
    }
}

impl Display for TitleStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn derive_status(paid: bool, due_date: NaiveDate, today: NaiveDate) -> TitleStatus {
    if paid {
        TitleStatus::Paid
    } else if due_date < today {
        TitleStatus::Overdue
    } else {
        TitleStatus::Pending
    }
}

/// Status of `title` as seen on `today`.
pub fn title_status(title: &ReceivableTitle, today: NaiveDate) -> TitleStatus {
    derive_status(title.paid, title.due_date, today)
}

/// Days from `today` until the due date; negative once overdue, `None` when paid.
pub fn days_until_due(title: &ReceivableTitle, today: NaiveDate) -> Option<i64> {
    if title.paid {
        return None;
    }
    Some((title.due_date - today).num_days())
}

#[cfg(test)]
mod tests {
    use super::{days_until_due, derive_status, title_status, TitleStatus};
    use crate::model::amount::Amount;
    use crate::model::title::ReceivableTitle;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn unpaid_past_due_is_overdue() {
        assert_eq!(
            derive_status(false, date(2024, 1, 31), date(2024, 2, 15)),
            TitleStatus::Overdue
        );
    }

    #[test]
    fn unpaid_due_today_or_later_is_pending() {
        let today = date(2024, 2, 15);
        assert_eq!(derive_status(false, today, today), TitleStatus::Pending);
        assert_eq!(
            derive_status(false, date(2024, 3, 1), today),
            TitleStatus::Pending
        );
    }

    #[test]
    fn paid_wins_over_any_due_date() {
        let today = date(2024, 2, 15);
        for due in [date(2020, 1, 1), today, date(2030, 1, 1)] {
            assert_eq!(derive_status(true, due, today), TitleStatus::Paid);
        }
    }

    #[test]
    fn acme_title_is_overdue_then_paid() {
        let mut title = ReceivableTitle::new(
            Uuid::new_v4(),
            "",
            Amount::from_cents(10_000),
            date(2024, 1, 1),
            date(2024, 1, 31),
        );
        let today = date(2024, 2, 15);
        assert_eq!(title_status(&title, today), TitleStatus::Overdue);
        assert_eq!(days_until_due(&title, today), Some(-15));

        title.mark_paid(date(2024, 2, 10)).unwrap();
        assert_eq!(title_status(&title, today), TitleStatus::Paid);
        assert_eq!(days_until_due(&title, today), None);
    }

    #[test]
    fn status_labels_are_snake_case() {
        assert_eq!(TitleStatus::Overdue.to_string(), "overdue");
        assert_eq!(
            serde_json::to_string(&TitleStatus::Pending).unwrap(),
            "\"pending\""
        );
    }
}
