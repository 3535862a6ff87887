//! Transaction primitives.
//!
//! A `Transaction` is a single income or expense event. Its lifecycle moves
//! only forward: `pending → completed` or `pending → failed`. Once a
//! transaction is `completed` it has been folded into budget/goal accruals,
//! so its amount and kind become immutable.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, MoneyCents, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(EngineError::Validation(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl TryFrom<&str> for TransactionStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(EngineError::Validation(format!(
                "invalid transaction status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurringFrequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RecurringFrequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl TryFrom<&str> for RecurringFrequency {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(EngineError::Validation(format!(
                "invalid recurring frequency: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: String,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub amount: MoneyCents,
    pub currency: Currency,
    pub category: Option<String>,
    pub goal_id: Option<Uuid>,
    pub tags: Vec<String>,
    pub note: Option<String>,
    pub is_recurring: bool,
    pub recurring_frequency: Option<RecurringFrequency>,
    pub is_active: bool,
    pub date: DateTime<Utc>,
    pub start_date: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Invariant: amount positive, `recurring_frequency` and `start_date`
    /// present iff `is_recurring`.
    pub fn validate(&self) -> ResultEngine<()> {
        if !self.amount.is_positive() {
            return Err(EngineError::Validation(
                "amount must be positive".to_string(),
            ));
        }
        if self.is_recurring {
            if self.recurring_frequency.is_none() {
                return Err(EngineError::Validation(
                    "recurring transaction requires a frequency".to_string(),
                ));
            }
            if self.start_date.is_none() {
                return Err(EngineError::Validation(
                    "recurring transaction requires a start date".to_string(),
                ));
            }
        } else if self.recurring_frequency.is_some() || self.start_date.is_some() {
            return Err(EngineError::Validation(
                "frequency and start date are only valid on recurring transactions".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub status: String,
    pub amount_minor: i64,
    pub currency: String,
    pub category: Option<String>,
    pub goal_id: Option<String>,
    pub tags: String,
    pub note: Option<String>,
    pub is_recurring: bool,
    pub recurring_frequency: Option<String>,
    pub is_active: bool,
    pub date: DateTimeUtc,
    pub start_date: Option<DateTimeUtc>,
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

fn encode_tags(tags: &[String]) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}

fn decode_tags(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            user_id: ActiveValue::Set(tx.user_id.clone()),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            status: ActiveValue::Set(tx.status.as_str().to_string()),
            amount_minor: ActiveValue::Set(tx.amount.cents()),
            currency: ActiveValue::Set(tx.currency.code().to_string()),
            category: ActiveValue::Set(tx.category.clone()),
            goal_id: ActiveValue::Set(tx.goal_id.map(|id| id.to_string())),
            tags: ActiveValue::Set(encode_tags(&tx.tags)),
            note: ActiveValue::Set(tx.note.clone()),
            is_recurring: ActiveValue::Set(tx.is_recurring),
            recurring_frequency: ActiveValue::Set(
                tx.recurring_frequency.map(|f| f.as_str().to_string()),
            ),
            is_active: ActiveValue::Set(tx.is_active),
            date: ActiveValue::Set(tx.date),
            start_date: ActiveValue::Set(tx.start_date),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::NotFound("transaction".to_string()))?,
            user_id: model.user_id,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            status: TransactionStatus::try_from(model.status.as_str())?,
            amount: MoneyCents::new(model.amount_minor),
            currency: Currency::try_from(model.currency.as_str()).unwrap_or_default(),
            category: model.category,
            goal_id: model.goal_id.and_then(|s| Uuid::parse_str(&s).ok()),
            tags: decode_tags(&model.tags),
            note: model.note,
            is_recurring: model.is_recurring,
            recurring_frequency: model
                .recurring_frequency
                .as_deref()
                .map(RecurringFrequency::try_from)
                .transpose()?,
            is_active: model.is_active,
            date: model.date,
            start_date: model.start_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_transaction() -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            user_id: "alice".to_string(),
            kind: TransactionKind::Expense,
            status: TransactionStatus::Completed,
            amount: MoneyCents::new(1000),
            currency: Currency::Eur,
            category: Some("groceries".to_string()),
            goal_id: None,
            tags: vec!["food".to_string()],
            note: None,
            is_recurring: false,
            recurring_frequency: None,
            is_active: true,
            date: Utc::now(),
            start_date: None,
        }
    }

    #[test]
    fn validate_rejects_non_positive_amount() {
        let mut tx = base_transaction();
        tx.amount = MoneyCents::ZERO;
        assert!(tx.validate().is_err());
    }

    #[test]
    fn validate_requires_frequency_and_start_when_recurring() {
        let mut tx = base_transaction();
        tx.is_recurring = true;
        assert!(tx.validate().is_err());
        tx.recurring_frequency = Some(RecurringFrequency::Monthly);
        assert!(tx.validate().is_err());
        tx.start_date = Some(Utc::now());
        assert!(tx.validate().is_ok());
    }

    #[test]
    fn validate_rejects_frequency_without_recurring_flag() {
        let mut tx = base_transaction();
        tx.recurring_frequency = Some(RecurringFrequency::Daily);
        assert!(tx.validate().is_err());
    }

    #[test]
    fn model_round_trip_preserves_tags() {
        let tx = base_transaction();
        let model = Model {
            id: tx.id.to_string(),
            user_id: tx.user_id.clone(),
            kind: tx.kind.as_str().to_string(),
            status: tx.status.as_str().to_string(),
            amount_minor: tx.amount.cents(),
            currency: tx.currency.code().to_string(),
            category: tx.category.clone(),
            goal_id: None,
            tags: encode_tags(&tx.tags),
            note: None,
            is_recurring: false,
            recurring_frequency: None,
            is_active: true,
            date: tx.date,
            start_date: None,
        };
        let back = Transaction::try_from(model).unwrap();
        assert_eq!(back, tx);
    }
}
