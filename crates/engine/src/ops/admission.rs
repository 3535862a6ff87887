//! Transaction admission control.
//!
//! Decides the initial status of a new or regenerated transaction. The rules
//! are applied in order:
//!
//! 1. an expense larger than the available balance starts `pending`;
//! 2. anything else starts `completed`;
//! 3. a recurring transaction whose start date is strictly in the future is
//!    forced to `pending` and inactive regardless of 1-2; it must never be
//!    admitted as completed before its start date.
//!
//! Currency normalisation happens before these rules run (see
//! `ops::transactions::create_transaction`), so the amount and the balance
//! are always in the user's default currency.

use chrono::{DateTime, Utc};

use crate::{MoneyCents, TransactionKind, TransactionStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Admission {
    pub status: TransactionStatus,
    pub is_active: bool,
}

#[must_use]
pub fn admit(
    kind: TransactionKind,
    amount: MoneyCents,
    balance: MoneyCents,
    recurring_start: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Admission {
    if let Some(start) = recurring_start
        && start > now
    {
        return Admission {
            status: TransactionStatus::Pending,
            is_active: false,
        };
    }

    let status = if kind == TransactionKind::Expense && amount > balance {
        TransactionStatus::Pending
    } else {
        TransactionStatus::Completed
    };

    Admission {
        status,
        is_active: true,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Days;

    use super::*;

    fn cents(v: i64) -> MoneyCents {
        MoneyCents::new(v)
    }

    #[test]
    fn expense_over_balance_is_pending() {
        let a = admit(
            TransactionKind::Expense,
            cents(150_00),
            cents(100_00),
            None,
            Utc::now(),
        );
        assert_eq!(a.status, TransactionStatus::Pending);
        assert!(a.is_active);
    }

    #[test]
    fn expense_within_balance_is_completed() {
        let a = admit(
            TransactionKind::Expense,
            cents(80_00),
            cents(100_00),
            None,
            Utc::now(),
        );
        assert_eq!(a.status, TransactionStatus::Completed);
    }

    #[test]
    fn income_is_always_completed() {
        let a = admit(
            TransactionKind::Income,
            cents(500_00),
            MoneyCents::ZERO,
            None,
            Utc::now(),
        );
        assert_eq!(a.status, TransactionStatus::Completed);
    }

    #[test]
    fn future_recurring_start_forces_pending_inactive() {
        let now = Utc::now();
        let start = now.checked_add_days(Days::new(3)).unwrap();
        // Income within balance would otherwise be completed.
        let a = admit(TransactionKind::Income, cents(10_00), cents(100_00), Some(start), now);
        assert_eq!(a.status, TransactionStatus::Pending);
        assert!(!a.is_active);
    }

    #[test]
    fn past_recurring_start_does_not_override() {
        let now = Utc::now();
        let start = now.checked_sub_days(Days::new(1)).unwrap();
        let a = admit(TransactionKind::Expense, cents(10_00), cents(100_00), Some(start), now);
        assert_eq!(a.status, TransactionStatus::Completed);
        assert!(a.is_active);
    }
}
