//! Savings-goal primitives.
//!
//! A goal accrues completed income transactions linked to it. The ordered
//! contribution list lives in its own table (`goal_contributions`, see
//! [`super::goal_contributions`]) so that applying the same transaction
//! twice is a no-op and deletion can unlink precisely.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub target_amount: MoneyCents,
    pub current_amount: MoneyCents,
    pub target_date: DateTime<Utc>,
    pub category: Option<String>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "goals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub target_amount_minor: i64,
    pub current_amount_minor: i64,
    pub target_date: DateTimeUtc,
    pub category: Option<String>,
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
    #[sea_orm(has_many = "super::goal_contributions::Entity")]
    Contributions,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::goal_contributions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contributions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Goal> for ActiveModel {
    fn from(goal: &Goal) -> Self {
        Self {
            id: ActiveValue::Set(goal.id.to_string()),
            user_id: ActiveValue::Set(goal.user_id.clone()),
            name: ActiveValue::Set(goal.name.clone()),
            target_amount_minor: ActiveValue::Set(goal.target_amount.cents()),
            current_amount_minor: ActiveValue::Set(goal.current_amount.cents()),
            target_date: ActiveValue::Set(goal.target_date),
            category: ActiveValue::Set(goal.category.clone()),
        }
    }
}

impl TryFrom<Model> for Goal {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id).map_err(|_| EngineError::NotFound("goal".to_string()))?,
            user_id: model.user_id,
            name: model.name,
            target_amount: MoneyCents::new(model.target_amount_minor),
            current_amount: MoneyCents::new(model.current_amount_minor),
            target_date: model.target_date,
            category: model.category,
        })
    }
}
