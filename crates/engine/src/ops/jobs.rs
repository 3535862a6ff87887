//! Periodic batch operations driven by the scheduler.
//!
//! Every job takes `today` explicitly so tests can drive it without timers,
//! and every job is idempotent per day: due-date checks are exact-day
//! equality, so a second run on the same day is a no-op. A failure on one
//! record is logged and never aborts the batch.

use chrono::{DateTime, Days, Months, NaiveDate, NaiveTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, EntityTrait, QueryFilter, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    Budget, BudgetPeriod, EngineError, Goal, RecurringFrequency, ResultEngine, Transaction,
    TransactionKind, TransactionStatus, budgets, goals, transactions,
};

use super::{Engine, admission::admit, with_tx};

fn midnight(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

/// Next due date of a recurring transaction, normalized to whole days.
fn next_occurrence(last: NaiveDate, frequency: RecurringFrequency) -> Option<NaiveDate> {
    match frequency {
        RecurringFrequency::Daily => last.checked_add_days(Days::new(1)),
        RecurringFrequency::Weekly => last.checked_add_days(Days::new(7)),
        RecurringFrequency::Monthly => last.checked_add_months(Months::new(1)),
        RecurringFrequency::Yearly => last.checked_add_months(Months::new(12)),
    }
}

/// Next rollover boundary of a budget period.
fn next_period_boundary(start: NaiveDate, period: BudgetPeriod) -> Option<NaiveDate> {
    match period {
        BudgetPeriod::Weekly => start.checked_add_days(Days::new(7)),
        BudgetPeriod::Monthly => start.checked_add_months(Months::new(1)),
    }
}

impl Engine {
    /// Regenerate due recurring transactions (daily job).
    ///
    /// For every active recurring transaction whose next occurrence falls on
    /// `today`, clone it with a fresh id and `date = today`, re-running
    /// admission against the owner's current balance. A pending clone mails
    /// the owner; a completed income clone with a goal link is applied to
    /// the goal. Returns the number of transactions created.
    pub async fn regenerate_recurring(&self, today: NaiveDate) -> ResultEngine<u32> {
        let templates = transactions::Entity::find()
            .filter(transactions::Column::IsRecurring.eq(true))
            .filter(transactions::Column::IsActive.eq(true))
            .all(&self.database)
            .await?;

        let mut created = 0;
        for model in templates {
            let id = model.id.clone();
            match self.regenerate_one(model, today).await {
                Ok(true) => created += 1,
                Ok(false) => {}
                Err(err) => {
                    tracing::error!("failed to regenerate recurring transaction {id}: {err}");
                }
            }
        }
        Ok(created)
    }

    async fn regenerate_one(
        &self,
        model: transactions::Model,
        today: NaiveDate,
    ) -> ResultEngine<bool> {
        let template = Transaction::try_from(model)?;
        let Some(frequency) = template.recurring_frequency else {
            return Ok(false);
        };
        if next_occurrence(template.date.date_naive(), frequency) != Some(today) {
            return Ok(false);
        }

        let owner = self.require_user(&self.database, &template.user_id).await?;
        let balance = self.balance(&template.user_id).await?;
        let admission = admit(
            template.kind,
            template.amount,
            balance.balance,
            None,
            Utc::now(),
        );

        // The generated occurrence is a plain one-off; the template itself
        // advances its date so the same day is never generated twice.
        let clone = Transaction {
            id: Uuid::new_v4(),
            status: admission.status,
            is_active: admission.is_active,
            date: midnight(today),
            is_recurring: false,
            recurring_frequency: None,
            start_date: None,
            ..template.clone()
        };

        with_tx!(self, |db_tx| {
            let model: transactions::ActiveModel = (&clone).into();
            model.insert(&db_tx).await?;

            let advance = transactions::ActiveModel {
                id: ActiveValue::Set(template.id.to_string()),
                date: ActiveValue::Set(midnight(today)),
                ..Default::default()
            };
            advance.update(&db_tx).await?;

            if clone.status == TransactionStatus::Completed
                && clone.kind == TransactionKind::Income
                && clone.goal_id.is_some()
            {
                self.apply_income(&db_tx, &clone).await?;
            }
            Ok::<_, EngineError>(())
        })?;

        if clone.status == TransactionStatus::Pending
            && let Some(email) = owner.email
        {
            let body = format!(
                "Dear {username},\n\n\
                 Your recurring payment of {amount} is pending. Please ensure \
                 you have sufficient funds in your account.",
                username = owner.username,
                amount = clone.amount,
            );
            self.notify(&email, "Payment Pending", &body).await;
        }

        Ok(true)
    }

    /// Retry transactions stuck in `pending` (hourly job).
    ///
    /// Every pending, active expense gets exactly one attempt per
    /// invocation: with enough balance it completes and accrues in matching
    /// budgets, otherwise it fails and the owner is mailed. Returns the
    /// number of transactions transitioned.
    pub async fn retry_pending(&self) -> ResultEngine<u32> {
        let pending = transactions::Entity::find()
            .filter(transactions::Column::Status.eq(TransactionStatus::Pending.as_str()))
            .filter(transactions::Column::Kind.eq(TransactionKind::Expense.as_str()))
            .filter(transactions::Column::IsActive.eq(true))
            .all(&self.database)
            .await?;

        let mut transitioned = 0;
        for model in pending {
            let id = model.id.clone();
            match self.retry_one(model).await {
                Ok(true) => transitioned += 1,
                Ok(false) => {}
                Err(err) => {
                    tracing::error!("failed to retry pending transaction {id}: {err}");
                }
            }
        }
        Ok(transitioned)
    }

    async fn retry_one(&self, model: transactions::Model) -> ResultEngine<bool> {
        let tx = Transaction::try_from(model)?;
        let owner = self.require_user(&self.database, &tx.user_id).await?;
        let balance = self.balance(&tx.user_id).await?;

        let new_status = if tx.amount <= balance.balance {
            TransactionStatus::Completed
        } else {
            TransactionStatus::Failed
        };

        let alerts: Vec<_> = with_tx!(self, |db_tx| {
            // Guarded transition keeps the status machine forward-only even
            // if another invocation raced on the same record.
            let updated = transactions::Entity::update_many()
                .col_expr(
                    transactions::Column::Status,
                    Expr::value(new_status.as_str()),
                )
                .filter(transactions::Column::Id.eq(tx.id.to_string()))
                .filter(
                    transactions::Column::Status.eq(TransactionStatus::Pending.as_str()),
                )
                .exec(&db_tx)
                .await?;
            if updated.rows_affected == 0 {
                return Ok(false);
            }

            let mut alerts = Vec::new();
            if new_status == TransactionStatus::Completed {
                alerts = self.apply_expense(&db_tx, &tx).await?;
            }
            Ok::<_, EngineError>(alerts)
        })?;

        self.notify_overspend(alerts).await;

        if new_status == TransactionStatus::Failed
            && let Some(email) = owner.email
        {
            let body = format!(
                "Dear {username},\n\n\
                 Unfortunately, your transaction of {amount} has failed due to \
                 insufficient balance.\n\n\
                 Please ensure sufficient funds and try again.",
                username = owner.username,
                amount = tx.amount,
            );
            self.notify(&email, "Transaction Failed", &body).await;
        }

        Ok(true)
    }

    /// Activate future-dated transactions whose start date has arrived
    /// (daily job). Returns the number of transactions activated.
    pub async fn activate_scheduled(&self, today: NaiveDate) -> ResultEngine<u32> {
        let inactive = transactions::Entity::find()
            .filter(transactions::Column::IsActive.eq(false))
            .filter(transactions::Column::StartDate.is_not_null())
            .all(&self.database)
            .await?;

        let mut activated = 0;
        for model in inactive {
            let due = model
                .start_date
                .map(|start| start.date_naive() <= today)
                .unwrap_or(false);
            if !due {
                continue;
            }

            let update = transactions::ActiveModel {
                id: ActiveValue::Set(model.id.clone()),
                is_active: ActiveValue::Set(true),
                date: ActiveValue::Set(midnight(today)),
                ..Default::default()
            };
            match update.update(&self.database).await {
                Ok(_) => activated += 1,
                Err(err) => {
                    tracing::error!("failed to activate transaction {}: {err}", model.id);
                }
            }
        }
        Ok(activated)
    }

    /// Roll budgets over at their period boundary (daily job).
    ///
    /// Resets the accrued amount and advances the period start when the
    /// boundary falls exactly on `today`; the equality check is what makes a
    /// same-day re-run a no-op. Returns the number of budgets rolled.
    pub async fn rollover_budgets(&self, today: NaiveDate) -> ResultEngine<u32> {
        let candidates = budgets::Entity::find()
            .filter(
                budgets::Column::EndDate
                    .is_null()
                    .or(budgets::Column::EndDate.gt(midnight(today))),
            )
            .all(&self.database)
            .await?;

        let mut rolled = 0;
        for model in candidates {
            let id = model.id.clone();
            match self.rollover_one(model, today).await {
                Ok(true) => rolled += 1,
                Ok(false) => {}
                Err(err) => {
                    tracing::error!("failed to roll over budget {id}: {err}");
                }
            }
        }
        Ok(rolled)
    }

    async fn rollover_one(&self, model: budgets::Model, today: NaiveDate) -> ResultEngine<bool> {
        let budget = Budget::try_from(model)?;
        if next_period_boundary(budget.start_date.date_naive(), budget.period) != Some(today) {
            return Ok(false);
        }

        let update = budgets::ActiveModel {
            id: ActiveValue::Set(budget.id.to_string()),
            current_amount_minor: ActiveValue::Set(0),
            start_date: ActiveValue::Set(midnight(today)),
            ..Default::default()
        };
        update.update(&self.database).await?;
        tracing::info!("budget {} for user {} rolled over", budget.id, budget.user_id);
        Ok(true)
    }

    /// Mail users whose goals are two days from their deadline and still
    /// under target (daily job). Returns the number of reminders sent.
    pub async fn remind_goal_deadlines(&self, today: NaiveDate) -> ResultEngine<u32> {
        let Some(deadline) = today.checked_add_days(Days::new(2)) else {
            return Ok(0);
        };
        let Some(day_after) = deadline.checked_add_days(Days::new(1)) else {
            return Ok(0);
        };

        let due = goals::Entity::find()
            .filter(goals::Column::TargetDate.gte(midnight(deadline)))
            .filter(goals::Column::TargetDate.lt(midnight(day_after)))
            .all(&self.database)
            .await?;

        let mut reminded = 0;
        for model in due {
            let id = model.id.clone();
            match self.remind_one(model).await {
                Ok(true) => reminded += 1,
                Ok(false) => {}
                Err(err) => {
                    tracing::error!("failed to send reminder for goal {id}: {err}");
                }
            }
        }
        Ok(reminded)
    }

    async fn remind_one(&self, model: goals::Model) -> ResultEngine<bool> {
        let goal = Goal::try_from(model)?;
        if goal.current_amount >= goal.target_amount {
            return Ok(false);
        }
        let owner = self.require_user(&self.database, &goal.user_id).await?;
        let Some(email) = owner.email else {
            return Ok(false);
        };

        let body = format!(
            "Dear {username},\n\n\
             This is a reminder that your goal \"{name}\" is due in 2 days.\n\
             Your target amount is {target}, but you have only reached \
             {current} so far.\n\n\
             Please take the necessary steps to reach your goal.",
            username = owner.username,
            name = goal.name,
            target = goal.target_amount,
            current = goal.current_amount,
        );
        self.notify(&email, "Goal Status Reminder", &body).await;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn next_occurrence_per_frequency() {
        let last = day(2026, 1, 31);
        assert_eq!(
            next_occurrence(last, RecurringFrequency::Daily),
            Some(day(2026, 2, 1))
        );
        assert_eq!(
            next_occurrence(last, RecurringFrequency::Weekly),
            Some(day(2026, 2, 7))
        );
        // Month arithmetic clamps to the end of February.
        assert_eq!(
            next_occurrence(last, RecurringFrequency::Monthly),
            Some(day(2026, 2, 28))
        );
        assert_eq!(
            next_occurrence(last, RecurringFrequency::Yearly),
            Some(day(2027, 1, 31))
        );
    }

    #[test]
    fn period_boundary_per_period() {
        let start = day(2026, 3, 10);
        assert_eq!(
            next_period_boundary(start, BudgetPeriod::Weekly),
            Some(day(2026, 3, 17))
        );
        assert_eq!(
            next_period_boundary(start, BudgetPeriod::Monthly),
            Some(day(2026, 4, 10))
        );
    }

    #[test]
    fn midnight_is_start_of_day_utc() {
        let ts = midnight(day(2026, 5, 1));
        assert_eq!(ts.to_rfc3339(), "2026-05-01T00:00:00+00:00");
    }
}
