//! Balance calculator.
//!
//! A user's balance is derived exclusively from `completed` transactions;
//! pending and failed ones never contribute. Read-only and safe to call
//! concurrently: the aggregate runs as a single query, so it reflects a
//! consistent snapshot at call time.

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QuerySelect};
use serde::Serialize;

use crate::{MoneyCents, ResultEngine, TransactionKind, TransactionStatus, transactions};

use super::Engine;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BalanceSummary {
    pub balance: MoneyCents,
    pub income: MoneyCents,
    pub expense: MoneyCents,
}

impl Engine {
    /// Net balance plus income/expense totals for a user, in minor units of
    /// the user's default currency.
    pub async fn balance(&self, user_id: &str) -> ResultEngine<BalanceSummary> {
        self.require_user(&self.database, user_id).await?;

        let rows: Vec<(String, Option<i64>)> = transactions::Entity::find()
            .select_only()
            .column(transactions::Column::Kind)
            .column_as(transactions::Column::AmountMinor.sum(), "total")
            .filter(transactions::Column::UserId.eq(user_id))
            .filter(transactions::Column::Status.eq(TransactionStatus::Completed.as_str()))
            .group_by(transactions::Column::Kind)
            .into_tuple()
            .all(&self.database)
            .await?;

        let mut income = MoneyCents::ZERO;
        let mut expense = MoneyCents::ZERO;
        for (kind, total) in rows {
            let total = MoneyCents::new(total.unwrap_or(0));
            match TransactionKind::try_from(kind.as_str())? {
                TransactionKind::Income => income = total,
                TransactionKind::Expense => expense = total,
            }
        }

        Ok(BalanceSummary {
            balance: income - expense,
            income,
            expense,
        })
    }
}
