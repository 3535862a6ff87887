//! Goal progress tracker plus goal CRUD.
//!
//! Applying a completed income transaction to its linked goal is idempotent
//! per transaction id: the contribution row is keyed on (goal, transaction)
//! and a re-apply (e.g. a retried record) is a no-op.

use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, sea_query::Expr,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    EngineError, Goal, MoneyCents, ResultEngine, Transaction, goal_contributions, goals,
};

use super::{Engine, normalize_optional_text, normalize_required_name};

pub struct NewGoalCmd {
    pub user_id: String,
    pub name: String,
    pub target_amount: MoneyCents,
    pub target_date: DateTime<Utc>,
    pub category: Option<String>,
}

pub struct UpdateGoalCmd {
    pub name: Option<String>,
    pub target_amount: Option<MoneyCents>,
    pub target_date: Option<DateTime<Utc>>,
    pub category: Option<Option<String>>,
}

impl Engine {
    /// Create a savings goal with an empty contribution list.
    pub async fn new_goal(&self, cmd: NewGoalCmd) -> ResultEngine<Goal> {
        self.require_user(&self.database, &cmd.user_id).await?;
        if !cmd.target_amount.is_positive() {
            return Err(EngineError::Validation(
                "goal target amount must be positive".to_string(),
            ));
        }
        let name = normalize_required_name(&cmd.name, "goal")?;

        let goal = Goal {
            id: Uuid::new_v4(),
            user_id: cmd.user_id,
            name,
            target_amount: cmd.target_amount,
            current_amount: MoneyCents::ZERO,
            target_date: cmd.target_date,
            category: normalize_optional_text(cmd.category.as_deref()),
        };

        let model: goals::ActiveModel = (&goal).into();
        model.insert(&self.database).await?;
        Ok(goal)
    }

    /// Return a goal owned by `user_id`.
    pub async fn goal(&self, goal_id: Uuid, user_id: &str) -> ResultEngine<Goal> {
        let model = goals::Entity::find_by_id(goal_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::NotFound("goal".to_string()))?;
        let goal = Goal::try_from(model)?;
        if goal.user_id != user_id {
            return Err(EngineError::Forbidden("goal belongs to another user".to_string()));
        }
        Ok(goal)
    }

    /// All goals owned by a user.
    pub async fn goals(&self, user_id: &str) -> ResultEngine<Vec<Goal>> {
        self.require_user(&self.database, user_id).await?;
        let models = goals::Entity::find()
            .filter(goals::Column::UserId.eq(user_id))
            .all(&self.database)
            .await?;
        models.into_iter().map(Goal::try_from).collect()
    }

    /// Contributing transaction ids in contribution order.
    pub async fn goal_contributions(&self, goal_id: Uuid, user_id: &str) -> ResultEngine<Vec<Uuid>> {
        let goal = self.goal(goal_id, user_id).await?;
        let rows = goal_contributions::Entity::find()
            .filter(goal_contributions::Column::GoalId.eq(goal.id.to_string()))
            .order_by_asc(goal_contributions::Column::Position)
            .all(&self.database)
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| Uuid::parse_str(&row.transaction_id).ok())
            .collect())
    }

    /// Update a goal's name, target, deadline, or category. The accrued
    /// amount is engine-managed.
    pub async fn update_goal(
        &self,
        goal_id: Uuid,
        user_id: &str,
        cmd: UpdateGoalCmd,
    ) -> ResultEngine<Goal> {
        let goal = self.goal(goal_id, user_id).await?;

        let mut model = goals::ActiveModel {
            id: ActiveValue::Set(goal.id.to_string()),
            ..Default::default()
        };
        if let Some(name) = cmd.name {
            model.name = ActiveValue::Set(normalize_required_name(&name, "goal")?);
        }
        if let Some(target) = cmd.target_amount {
            if !target.is_positive() {
                return Err(EngineError::Validation(
                    "goal target amount must be positive".to_string(),
                ));
            }
            model.target_amount_minor = ActiveValue::Set(target.cents());
        }
        if let Some(date) = cmd.target_date {
            model.target_date = ActiveValue::Set(date);
        }
        if let Some(category) = cmd.category {
            model.category = ActiveValue::Set(normalize_optional_text(category.as_deref()));
        }
        let updated = model.update(&self.database).await?;
        Goal::try_from(updated)
    }

    /// Delete a goal owned by `user_id`; contribution rows cascade.
    pub async fn delete_goal(&self, goal_id: Uuid, user_id: &str) -> ResultEngine<()> {
        let goal = self.goal(goal_id, user_id).await?;
        goals::Entity::delete_by_id(goal.id.to_string())
            .exec(&self.database)
            .await?;
        Ok(())
    }

    /// Fold a completed income transaction into its linked goal.
    ///
    /// No-op if the transaction has already contributed (idempotent per
    /// transaction id). Fails with `NotFound` when the linked goal is gone.
    pub(crate) async fn apply_income<C: ConnectionTrait>(
        &self,
        db: &C,
        tx: &Transaction,
    ) -> ResultEngine<()> {
        let Some(goal_id) = tx.goal_id else {
            return Ok(());
        };

        let goal_model = goals::Entity::find_by_id(goal_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::NotFound("goal".to_string()))?;

        let already_applied = goal_contributions::Entity::find()
            .filter(goal_contributions::Column::GoalId.eq(goal_model.id.as_str()))
            .filter(goal_contributions::Column::TransactionId.eq(tx.id.to_string()))
            .count(db)
            .await?
            > 0;
        if already_applied {
            return Ok(());
        }

        let position = goal_contributions::Entity::find()
            .filter(goal_contributions::Column::GoalId.eq(goal_model.id.as_str()))
            .count(db)
            .await? as i32;

        let contribution = goal_contributions::ActiveModel {
            goal_id: ActiveValue::Set(goal_model.id.clone()),
            transaction_id: ActiveValue::Set(tx.id.to_string()),
            position: ActiveValue::Set(position),
            ..Default::default()
        };
        contribution.insert(db).await?;

        goals::Entity::update_many()
            .col_expr(
                goals::Column::CurrentAmountMinor,
                Expr::col(goals::Column::CurrentAmountMinor).add(tx.amount.cents()),
            )
            .filter(goals::Column::Id.eq(goal_model.id))
            .exec(db)
            .await?;

        Ok(())
    }

    /// Inverse of [`Engine::apply_income`], used when a contributing
    /// transaction is deleted. Removes the contribution row and subtracts
    /// the amount; a transaction that never contributed is a no-op.
    pub(crate) async fn revert_income<C: ConnectionTrait>(
        &self,
        db: &C,
        tx: &Transaction,
    ) -> ResultEngine<()> {
        let Some(goal_id) = tx.goal_id else {
            return Ok(());
        };

        let deleted = goal_contributions::Entity::delete_many()
            .filter(goal_contributions::Column::GoalId.eq(goal_id.to_string()))
            .filter(goal_contributions::Column::TransactionId.eq(tx.id.to_string()))
            .exec(db)
            .await?;
        if deleted.rows_affected == 0 {
            return Ok(());
        }

        goals::Entity::update_many()
            .col_expr(
                goals::Column::CurrentAmountMinor,
                Expr::col(goals::Column::CurrentAmountMinor).sub(tx.amount.cents()),
            )
            .filter(goals::Column::Id.eq(goal_id.to_string()))
            .exec(db)
            .await?;

        Ok(())
    }
}
