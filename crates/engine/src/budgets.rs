//! Budget primitives.
//!
//! A budget tracks accrued spend (`current_amount`) against a target
//! (`amount`) over a weekly or monthly period. The accrued amount is the sum
//! of every completed, active expense transaction matching the budget's
//! category/tag filter since the last rollover.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetPeriod {
    Weekly,
    Monthly,
}

impl BudgetPeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl TryFrom<&str> for BudgetPeriod {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(EngineError::Validation(format!(
                "invalid budget period: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub id: Uuid,
    pub user_id: String,
    pub amount: MoneyCents,
    pub current_amount: MoneyCents,
    pub period: BudgetPeriod,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
}

impl Budget {
    /// Accrued spend as a fraction of the target, as a percentage.
    ///
    /// A zero target reads as fully utilised rather than dividing by zero.
    #[must_use]
    pub fn utilization(&self) -> f64 {
        if self.amount.cents() == 0 {
            return 100.0;
        }
        (self.current_amount.cents() as f64) / (self.amount.cents() as f64) * 100.0
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub amount_minor: i64,
    pub current_amount_minor: i64,
    pub period: String,
    pub category: Option<String>,
    pub tags: String,
    pub start_date: DateTimeUtc,
    pub end_date: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Username",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Budget> for ActiveModel {
    fn from(budget: &Budget) -> Self {
        Self {
            id: ActiveValue::Set(budget.id.to_string()),
            user_id: ActiveValue::Set(budget.user_id.clone()),
            amount_minor: ActiveValue::Set(budget.amount.cents()),
            current_amount_minor: ActiveValue::Set(budget.current_amount.cents()),
            period: ActiveValue::Set(budget.period.as_str().to_string()),
            category: ActiveValue::Set(budget.category.clone()),
            tags: ActiveValue::Set(
                serde_json::to_string(&budget.tags).unwrap_or_else(|_| "[]".to_string()),
            ),
            start_date: ActiveValue::Set(budget.start_date),
            end_date: ActiveValue::Set(budget.end_date),
        }
    }
}

impl TryFrom<Model> for Budget {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::NotFound("budget".to_string()))?,
            user_id: model.user_id,
            amount: MoneyCents::new(model.amount_minor),
            current_amount: MoneyCents::new(model.current_amount_minor),
            period: BudgetPeriod::try_from(model.period.as_str())?,
            category: model.category,
            tags: serde_json::from_str(&model.tags).unwrap_or_default(),
            start_date: model.start_date,
            end_date: model.end_date,
        })
    }
}
