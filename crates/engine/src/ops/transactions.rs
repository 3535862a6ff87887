//! Transaction operations: create, read, list, update, delete.
//!
//! Creation runs the full reconciliation pipeline: currency normalisation,
//! admission against the current balance, persistence, and propagation of a
//! completed expense into budgets or a completed income into its goal.
//! Deletion runs the symmetric inverse. Propagation steps are sequential
//! with no rollback across them: a crash in between leaves an accrual
//! under-counted until the transaction is reconciled again, which is the
//! documented at-least-once contract.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
};
use uuid::Uuid;

use crate::{
    Currency, EngineError, MoneyCents, RecurringFrequency, ResultEngine, Transaction,
    TransactionKind, TransactionStatus, UserRole, transactions,
};

use super::{Engine, admission::admit, normalize_optional_text, normalize_tags, with_tx};

pub struct RecurringCmd {
    pub frequency: RecurringFrequency,
    pub start_date: DateTime<Utc>,
}

pub struct NewTransactionCmd {
    pub user_id: String,
    pub kind: TransactionKind,
    pub amount: MoneyCents,
    /// Currency the amount is expressed in. `None` means the user's default;
    /// anything else is converted before admission.
    pub currency: Option<Currency>,
    pub category: Option<String>,
    pub goal_id: Option<Uuid>,
    pub tags: Vec<String>,
    pub note: Option<String>,
    pub recurring: Option<RecurringCmd>,
    pub date: Option<DateTime<Utc>>,
}

/// Partial update. `Some(None)` clears an optional field.
#[derive(Default)]
pub struct TransactionPatch {
    pub amount: Option<MoneyCents>,
    pub category: Option<Option<String>>,
    pub note: Option<Option<String>>,
    /// Union-merged into the existing tag set.
    pub tags: Option<Vec<String>>,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default)]
pub struct TransactionListFilter {
    pub kind: Option<TransactionKind>,
    pub category: Option<String>,
    /// All listed tags must be present on the transaction.
    pub tags: Vec<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl Engine {
    /// Create a transaction for `user_id` and propagate it.
    pub async fn create_transaction(&self, cmd: NewTransactionCmd) -> ResultEngine<Transaction> {
        let user = self.require_user(&self.database, &cmd.user_id).await?;

        if !cmd.amount.is_positive() {
            return Err(EngineError::Validation(
                "amount must be positive".to_string(),
            ));
        }
        let category = normalize_optional_text(cmd.category.as_deref());
        if let Some(name) = &category
            && !self.category_exists(name).await?
        {
            return Err(EngineError::Validation(format!("unknown category: {name}")));
        }

        // Normalise to the user's default currency before any balance
        // comparison; a failed rate lookup aborts only this creation.
        let default_currency = Currency::try_from(user.default_currency.as_str())?;
        let amount = match cmd.currency {
            Some(currency) if currency != default_currency => {
                let rate = self
                    .rates
                    .rate(currency, default_currency)
                    .await
                    .map_err(|err| EngineError::ConversionUnavailable(err.to_string()))?;
                cmd.amount.convert(rate).ok_or_else(|| {
                    EngineError::ConversionUnavailable(format!(
                        "unusable rate {rate} for {currency}->{default_currency}"
                    ))
                })?
            }
            _ => cmd.amount,
        };

        if let Some(goal_id) = cmd.goal_id {
            // Ownership check doubles as existence check.
            self.goal(goal_id, &cmd.user_id).await?;
        }

        let now = Utc::now();
        let balance = self.balance(&cmd.user_id).await?;
        let admission = admit(
            cmd.kind,
            amount,
            balance.balance,
            cmd.recurring.as_ref().map(|r| r.start_date),
            now,
        );

        let tx = Transaction {
            id: Uuid::new_v4(),
            user_id: cmd.user_id,
            kind: cmd.kind,
            status: admission.status,
            amount,
            currency: default_currency,
            category,
            goal_id: cmd.goal_id,
            tags: normalize_tags(&cmd.tags),
            note: normalize_optional_text(cmd.note.as_deref()),
            is_recurring: cmd.recurring.is_some(),
            recurring_frequency: cmd.recurring.as_ref().map(|r| r.frequency),
            is_active: admission.is_active,
            date: cmd.date.unwrap_or(now),
            start_date: cmd.recurring.as_ref().map(|r| r.start_date),
        };
        tx.validate()?;

        let alerts = with_tx!(self, |db_tx| {
            let model: transactions::ActiveModel = (&tx).into();
            model.insert(&db_tx).await?;

            let mut alerts = Vec::new();
            if tx.status == TransactionStatus::Completed {
                match tx.kind {
                    TransactionKind::Expense => {
                        alerts = self.apply_expense(&db_tx, &tx).await?;
                    }
                    TransactionKind::Income => {
                        self.apply_income(&db_tx, &tx).await?;
                    }
                }
            }
            Ok::<_, EngineError>(alerts)
        })?;

        self.notify_overspend(alerts).await;
        Ok(tx)
    }

    /// Return a transaction owned by `user_id`.
    pub async fn transaction(&self, id: Uuid, user_id: &str) -> ResultEngine<Transaction> {
        let model = transactions::Entity::find_by_id(id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::NotFound("transaction".to_string()))?;
        let tx = Transaction::try_from(model)?;
        if tx.user_id != user_id {
            return Err(EngineError::Forbidden(
                "transaction belongs to another user".to_string(),
            ));
        }
        Ok(tx)
    }

    /// Active transactions of a user, newest first, filtered.
    pub async fn transactions(
        &self,
        user_id: &str,
        filter: &TransactionListFilter,
    ) -> ResultEngine<Vec<Transaction>> {
        self.require_user(&self.database, user_id).await?;

        let mut query = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .filter(transactions::Column::IsActive.eq(true));
        if let Some(kind) = filter.kind {
            query = query.filter(transactions::Column::Kind.eq(kind.as_str()));
        }
        if let Some(category) = &filter.category {
            query = query.filter(transactions::Column::Category.eq(category.as_str()));
        }
        if let Some(from) = filter.from {
            query = query.filter(transactions::Column::Date.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(transactions::Column::Date.lte(to));
        }

        let models = query
            .order_by_desc(transactions::Column::Date)
            .all(&self.database)
            .await?;

        // Tags live in a JSON column; the contains-all filter is applied here.
        let mut txs = Vec::with_capacity(models.len());
        for model in models {
            let tx = Transaction::try_from(model)?;
            if filter.tags.iter().all(|tag| tx.tags.contains(tag)) {
                txs.push(tx);
            }
        }
        Ok(txs)
    }

    /// Distinct tag vocabulary used by a user's transactions, sorted.
    pub async fn unique_tags(&self, user_id: &str) -> ResultEngine<Vec<String>> {
        self.require_user(&self.database, user_id).await?;
        let models = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .all(&self.database)
            .await?;

        let mut tags = std::collections::BTreeSet::new();
        for model in models {
            tags.extend(Transaction::try_from(model)?.tags);
        }
        Ok(tags.into_iter().collect())
    }

    /// Every transaction across users, optionally narrowed to one user and a
    /// date range. Admin only.
    pub async fn transactions_all_users(
        &self,
        actor: &str,
        user_filter: Option<&str>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> ResultEngine<Vec<Transaction>> {
        let actor = self.require_user(&self.database, actor).await?;
        if UserRole::try_from(actor.role.as_str())? != UserRole::Admin {
            return Err(EngineError::Forbidden(
                "admin role required".to_string(),
            ));
        }

        let mut query = transactions::Entity::find();
        if let Some(user_id) = user_filter {
            query = query.filter(transactions::Column::UserId.eq(user_id));
        }
        if let Some(from) = from {
            query = query.filter(transactions::Column::Date.gte(from));
        }
        if let Some(to) = to {
            query = query.filter(transactions::Column::Date.lte(to));
        }

        let models = query
            .order_by_desc(transactions::Column::Date)
            .all(&self.database)
            .await?;
        models.into_iter().map(Transaction::try_from).collect()
    }

    /// Patch a transaction. Tags are union-merged; amount is immutable once
    /// the transaction is `completed` (it has been folded into accruals).
    pub async fn update_transaction(
        &self,
        id: Uuid,
        user_id: &str,
        patch: TransactionPatch,
    ) -> ResultEngine<Transaction> {
        let tx = self.transaction(id, user_id).await?;

        let mut model = transactions::ActiveModel {
            id: ActiveValue::Set(tx.id.to_string()),
            ..Default::default()
        };
        if let Some(amount) = patch.amount {
            if tx.status == TransactionStatus::Completed {
                return Err(EngineError::Validation(
                    "amount of a completed transaction is immutable".to_string(),
                ));
            }
            if !amount.is_positive() {
                return Err(EngineError::Validation(
                    "amount must be positive".to_string(),
                ));
            }
            model.amount_minor = ActiveValue::Set(amount.cents());
        }
        if let Some(category) = patch.category {
            let category = normalize_optional_text(category.as_deref());
            if let Some(name) = &category
                && !self.category_exists(name).await?
            {
                return Err(EngineError::Validation(format!("unknown category: {name}")));
            }
            model.category = ActiveValue::Set(category);
        }
        if let Some(note) = patch.note {
            model.note = ActiveValue::Set(normalize_optional_text(note.as_deref()));
        }
        if let Some(new_tags) = patch.tags {
            let mut merged = tx.tags.clone();
            merged.extend(new_tags);
            let merged = normalize_tags(&merged);
            model.tags = ActiveValue::Set(
                serde_json::to_string(&merged).unwrap_or_else(|_| "[]".to_string()),
            );
        }
        if let Some(date) = patch.date {
            model.date = ActiveValue::Set(date);
        }

        let updated = model.update(&self.database).await?;
        Transaction::try_from(updated)
    }

    /// Delete a transaction and unwind its propagation: a completed expense
    /// is subtracted from every matching budget, a completed income is
    /// unlinked from its goal.
    pub async fn delete_transaction(&self, id: Uuid, user_id: &str) -> ResultEngine<Transaction> {
        let tx = self.transaction(id, user_id).await?;

        with_tx!(self, |db_tx| {
            transactions::Entity::delete_by_id(tx.id.to_string())
                .exec(&db_tx)
                .await?;

            if tx.status == TransactionStatus::Completed {
                match tx.kind {
                    TransactionKind::Expense => {
                        self.revert_expense(&db_tx, &tx).await?;
                    }
                    TransactionKind::Income => {
                        self.revert_income(&db_tx, &tx).await?;
                    }
                }
            }
            Ok::<_, EngineError>(())
        })?;

        Ok(tx)
    }
}
