use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Eur,
    Usd,
    Gbp,
    Chf,
    Inr,
}

pub mod transaction {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionKind {
        Income,
        Expense,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionStatus {
        Pending,
        Completed,
        Failed,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum RecurringFrequency {
        Daily,
        Weekly,
        Monthly,
        Yearly,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionNew {
        pub kind: TransactionKind,
        /// Minor units (cents) of `currency`, must be > 0.
        pub amount_minor: i64,
        /// Defaults to the user's currency; other currencies are converted
        /// at the current rate before the transaction is admitted.
        pub currency: Option<Currency>,
        pub category: Option<String>,
        pub goal_id: Option<Uuid>,
        #[serde(default)]
        pub tags: Vec<String>,
        pub note: Option<String>,
        pub recurring_frequency: Option<RecurringFrequency>,
        pub start_date: Option<DateTime<Utc>>,
        /// RFC3339 timestamp; defaults to now.
        pub date: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionUpdate {
        pub amount_minor: Option<i64>,
        pub category: Option<String>,
        pub note: Option<String>,
        pub tags: Option<Vec<String>>,
        pub date: Option<DateTime<Utc>>,
    }

    /// Query string for listing transactions. `tags` is comma-separated;
    /// a listed transaction must carry every tag named.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionList {
        pub kind: Option<TransactionKind>,
        pub category: Option<String>,
        pub tags: Option<String>,
        pub from: Option<DateTime<Utc>>,
        pub to: Option<DateTime<Utc>>,
    }

    /// Query string for the admin-only all-users listing.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionListAll {
        pub user: Option<String>,
        pub from: Option<DateTime<Utc>>,
        pub to: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub user: String,
        pub kind: TransactionKind,
        pub status: TransactionStatus,
        pub amount_minor: i64,
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

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TagsResponse {
        pub tags: Vec<String>,
    }
}

pub mod budget {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum BudgetPeriod {
        Weekly,
        Monthly,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetNew {
        /// Target amount in minor units, must be > 0.
        pub amount_minor: i64,
        pub period: BudgetPeriod,
        pub category: Option<String>,
        #[serde(default)]
        pub tags: Vec<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct BudgetUpdate {
        pub amount_minor: Option<i64>,
        pub category: Option<String>,
        pub tags: Option<Vec<String>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetView {
        pub id: Uuid,
        pub amount_minor: i64,
        pub current_amount_minor: i64,
        /// Accrued spend as a percentage of the target.
        pub utilization: f64,
        pub period: BudgetPeriod,
        pub category: Option<String>,
        pub tags: Vec<String>,
        pub start_date: DateTime<Utc>,
        pub end_date: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetListResponse {
        pub budgets: Vec<BudgetView>,
    }
}

pub mod goal {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GoalNew {
        pub name: String,
        /// Target amount in minor units, must be > 0.
        pub target_amount_minor: i64,
        pub target_date: DateTime<Utc>,
        pub category: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct GoalUpdate {
        pub name: Option<String>,
        pub target_amount_minor: Option<i64>,
        pub target_date: Option<DateTime<Utc>>,
        pub category: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GoalView {
        pub id: Uuid,
        pub name: String,
        pub target_amount_minor: i64,
        pub current_amount_minor: i64,
        pub target_date: DateTime<Utc>,
        pub category: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GoalListResponse {
        pub goals: Vec<GoalView>,
    }

    /// Income transactions applied to a goal, in application order.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct GoalContributionsResponse {
        pub transaction_ids: Vec<Uuid>,
    }
}

pub mod category {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryNew {
        pub name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryView {
        pub id: Uuid,
        pub name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryListResponse {
        pub categories: Vec<CategoryView>,
    }
}

pub mod balance {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceResponse {
        pub balance_minor: i64,
        pub total_income_minor: i64,
        pub total_expenses_minor: i64,
    }
}
