use std::sync::Arc;

use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait};

use crate::{
    EngineError, Notifier, RateSource, ResultEngine,
    outbound::{LogNotifier, NoRates},
    users,
};

pub mod admission;
pub mod balances;
pub mod budgets;
pub mod categories;
pub mod goals;
pub mod jobs;
pub mod transactions;

pub use balances::BalanceSummary;
pub use budgets::{NewBudgetCmd, UpdateBudgetCmd};
pub use goals::{NewGoalCmd, UpdateGoalCmd};
pub use transactions::{
    NewTransactionCmd, RecurringCmd, TransactionListFilter, TransactionPatch,
};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        use sea_orm::TransactionTrait;
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// The reconciliation engine.
///
/// One instance per process; cheap to share behind an `Arc`. All operations
/// take the acting user explicitly so ownership checks happen in one place.
pub struct Engine {
    database: DatabaseConnection,
    rates: Arc<dyn RateSource>,
    notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").finish_non_exhaustive()
    }
}

impl Engine {
    /// Return a builder for `Engine`.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Load a user or fail with `NotFound`.
    pub(crate) async fn require_user<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
    ) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::NotFound("user".to_string()))
    }

    /// Best-effort notification: delivery failures are logged, never raised.
    pub(crate) async fn notify(&self, to: &str, subject: &str, body: &str) {
        if let Err(err) = self.notifier.send(to, subject, body).await {
            tracing::warn!("failed to deliver \"{subject}\" to {to}: {err}");
        }
    }
}

pub(crate) fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Dedups tags preserving first-seen order; tags are a set, order-irrelevant
/// for matching but stable for display.
pub(crate) fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// The builder for `Engine`.
pub struct EngineBuilder {
    database: DatabaseConnection,
    rates: Arc<dyn RateSource>,
    notifier: Arc<dyn Notifier>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            rates: Arc::new(NoRates),
            notifier: Arc::new(LogNotifier),
        }
    }
}

impl EngineBuilder {
    /// Pass the required database.
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Currency-rate provider used to normalise foreign-currency amounts.
    pub fn rates(mut self, rates: Arc<dyn RateSource>) -> EngineBuilder {
        self.rates = rates;
        self
    }

    /// Notification sender for overspend/pending/failed/reminder messages.
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> EngineBuilder {
        self.notifier = notifier;
        self
    }

    /// Construct `Engine`.
    pub fn build(self) -> Engine {
        Engine {
            database: self.database,
            rates: self.rates,
            notifier: self.notifier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_tags_dedups_and_trims() {
        let tags = vec![
            " food ".to_string(),
            "food".to_string(),
            String::new(),
            "travel".to_string(),
        ];
        assert_eq!(normalize_tags(&tags), vec!["food", "travel"]);
    }

    #[test]
    fn normalize_required_name_rejects_blank() {
        assert!(normalize_required_name("  ", "category").is_err());
        assert_eq!(normalize_required_name(" rent ", "budget").unwrap(), "rent");
    }
}
