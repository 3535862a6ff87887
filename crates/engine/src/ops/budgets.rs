//! Budget matcher & updater plus budget CRUD.
//!
//! Accruals are single `UPDATE budgets SET current_amount = current_amount
//! ± ?` statements so that two transactions racing on the same budget
//! cannot lose an update.

use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    Budget, BudgetPeriod, EngineError, MoneyCents, ResultEngine, Transaction, budgets,
};

use super::{Engine, normalize_optional_text, normalize_tags};

/// Whether a budget's filter overlaps a transaction.
///
/// Any of the following matches:
/// - equal categories,
/// - a non-empty tag intersection,
/// - both uncategorized,
/// - both untagged.
///
/// The wildcard branches mean a bare transaction accrues in full against
/// every bare budget; that is the observed contract, surprising as it is
/// from a double-counting perspective.
#[must_use]
pub fn budget_matches(budget: &Budget, tx: &Transaction) -> bool {
    let category_match = match (&budget.category, &tx.category) {
        (Some(b), Some(t)) => b == t,
        _ => false,
    };
    let tag_match = budget.tags.iter().any(|tag| tx.tags.contains(tag));
    let uncategorized = budget.category.is_none() && tx.category.is_none();
    let untagged = budget.tags.is_empty() && tx.tags.is_empty();

    category_match || tag_match || uncategorized || untagged
}

/// Overspend notification payload collected during an accrual pass and
/// delivered after the surrounding DB transaction commits.
#[derive(Clone, Debug)]
pub(crate) struct OverspendAlert {
    pub username: String,
    pub email: String,
    pub current_amount: MoneyCents,
    pub target_amount: MoneyCents,
    pub percentage: f64,
}

pub struct NewBudgetCmd {
    pub user_id: String,
    pub amount: MoneyCents,
    pub period: BudgetPeriod,
    pub category: Option<String>,
    pub tags: Vec<String>,
}

pub struct UpdateBudgetCmd {
    pub amount: Option<MoneyCents>,
    pub category: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
}

impl Engine {
    /// Create a budget. The period end is fixed at creation: one week out
    /// for weekly budgets, thirty days for monthly ones.
    pub async fn new_budget(&self, cmd: NewBudgetCmd) -> ResultEngine<Budget> {
        self.require_user(&self.database, &cmd.user_id).await?;
        if !cmd.amount.is_positive() {
            return Err(EngineError::Validation(
                "budget amount must be positive".to_string(),
            ));
        }

        let start_date = Utc::now();
        let end_date = match cmd.period {
            BudgetPeriod::Weekly => start_date + Duration::days(7),
            BudgetPeriod::Monthly => start_date + Duration::days(30),
        };

        let budget = Budget {
            id: Uuid::new_v4(),
            user_id: cmd.user_id,
            amount: cmd.amount,
            current_amount: MoneyCents::ZERO,
            period: cmd.period,
            category: normalize_optional_text(cmd.category.as_deref()),
            tags: normalize_tags(&cmd.tags),
            start_date,
            end_date: Some(end_date),
        };

        let model: budgets::ActiveModel = (&budget).into();
        model.insert(&self.database).await?;
        Ok(budget)
    }

    /// Return a budget owned by `user_id`.
    pub async fn budget(&self, budget_id: Uuid, user_id: &str) -> ResultEngine<Budget> {
        let model = budgets::Entity::find_by_id(budget_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::NotFound("budget".to_string()))?;
        let budget = Budget::try_from(model)?;
        if budget.user_id != user_id {
            return Err(EngineError::Forbidden("budget belongs to another user".to_string()));
        }
        Ok(budget)
    }

    /// All budgets owned by a user.
    pub async fn budgets(&self, user_id: &str) -> ResultEngine<Vec<Budget>> {
        self.require_user(&self.database, user_id).await?;
        let models = budgets::Entity::find()
            .filter(budgets::Column::UserId.eq(user_id))
            .all(&self.database)
            .await?;
        models.into_iter().map(Budget::try_from).collect()
    }

    /// Update a budget's target, category filter, or tag filter. The accrued
    /// amount is engine-managed and cannot be set from outside.
    pub async fn update_budget(
        &self,
        budget_id: Uuid,
        user_id: &str,
        cmd: UpdateBudgetCmd,
    ) -> ResultEngine<Budget> {
        let budget = self.budget(budget_id, user_id).await?;

        let mut model = budgets::ActiveModel {
            id: ActiveValue::Set(budget.id.to_string()),
            ..Default::default()
        };
        if let Some(amount) = cmd.amount {
            if !amount.is_positive() {
                return Err(EngineError::Validation(
                    "budget amount must be positive".to_string(),
                ));
            }
            model.amount_minor = ActiveValue::Set(amount.cents());
        }
        if let Some(category) = cmd.category {
            model.category = ActiveValue::Set(normalize_optional_text(category.as_deref()));
        }
        if let Some(tags) = cmd.tags {
            let tags = normalize_tags(&tags);
            model.tags = ActiveValue::Set(
                serde_json::to_string(&tags).unwrap_or_else(|_| "[]".to_string()),
            );
        }
        let updated = model.update(&self.database).await?;
        Budget::try_from(updated)
    }

    /// Delete a budget owned by `user_id`.
    pub async fn delete_budget(&self, budget_id: Uuid, user_id: &str) -> ResultEngine<()> {
        let budget = self.budget(budget_id, user_id).await?;
        budgets::Entity::delete_by_id(budget.id.to_string())
            .exec(&self.database)
            .await?;
        Ok(())
    }

    /// Fold a completed expense transaction into every matching budget.
    ///
    /// Returns the overspend alerts to deliver once the caller's DB
    /// transaction has committed. Each matching budget receives the full
    /// amount independently.
    pub(crate) async fn apply_expense<C: ConnectionTrait>(
        &self,
        db: &C,
        tx: &Transaction,
    ) -> ResultEngine<Vec<OverspendAlert>> {
        self.accrue_expense(db, tx, tx.amount).await
    }

    /// Inverse of [`Engine::apply_expense`], used when a completed expense
    /// transaction is deleted. Same matching predicate, negated amount.
    pub(crate) async fn revert_expense<C: ConnectionTrait>(
        &self,
        db: &C,
        tx: &Transaction,
    ) -> ResultEngine<()> {
        self.accrue_expense(db, tx, -tx.amount).await?;
        Ok(())
    }

    async fn accrue_expense<C: ConnectionTrait>(
        &self,
        db: &C,
        tx: &Transaction,
        delta: MoneyCents,
    ) -> ResultEngine<Vec<OverspendAlert>> {
        let owner = self.require_user(db, &tx.user_id).await?;

        let models = budgets::Entity::find()
            .filter(budgets::Column::UserId.eq(tx.user_id.as_str()))
            .all(db)
            .await?;

        let mut alerts = Vec::new();
        for model in models {
            let budget = Budget::try_from(model)?;
            if !budget_matches(&budget, tx) {
                continue;
            }

            // Atomic in-database increment; read-modify-write would lose
            // updates under concurrent matching transactions.
            budgets::Entity::update_many()
                .col_expr(
                    budgets::Column::CurrentAmountMinor,
                    Expr::col(budgets::Column::CurrentAmountMinor).add(delta.cents()),
                )
                .filter(budgets::Column::Id.eq(budget.id.to_string()))
                .exec(db)
                .await?;

            let new_amount = budget.current_amount + delta;
            if delta.is_positive()
                && budget.amount.is_positive()
                && new_amount.cents() as f64 / budget.amount.cents() as f64 > 0.8
            {
                if let Some(email) = owner.email.clone() {
                    alerts.push(OverspendAlert {
                        username: owner.username.clone(),
                        email,
                        current_amount: new_amount,
                        target_amount: budget.amount,
                        percentage: new_amount.cents() as f64 / budget.amount.cents() as f64
                            * 100.0,
                    });
                }
            }
        }

        Ok(alerts)
    }

    /// Deliver overspend alerts collected by [`Engine::apply_expense`].
    pub(crate) async fn notify_overspend(&self, alerts: Vec<OverspendAlert>) {
        for alert in alerts {
            let body = format!(
                "Dear {username},\n\n\
                 Your budget has exceeded 80% of the target amount.\n\
                 Your current amount is {current}, which is {percentage:.2}% of your \
                 target amount of {target}.\n\n\
                 Please take the necessary steps to manage your budget.",
                username = alert.username,
                current = alert.current_amount,
                percentage = alert.percentage,
                target = alert.target_amount,
            );
            self.notify(&alert.email, "Budget Exceeded 80%", &body).await;
        }
    }
}
