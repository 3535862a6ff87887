//! Category registry operations.
//!
//! Category names are shared across users and unique after normalisation
//! (NFC + casefold + whitespace trim), so "Groceries" and "groceries"
//! collide.

use sea_orm::{ActiveModelTrait, ActiveValue, ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::{EngineError, ResultEngine, categories};

use super::{Engine, normalize_required_name};

pub(crate) fn normalize_category_name(name: &str) -> String {
    name.trim().nfc().collect::<String>().to_lowercase()
}

impl Engine {
    /// Register a category. Fails with `Conflict` when the normalised name
    /// is already taken.
    pub async fn new_category(&self, name: &str) -> ResultEngine<categories::Model> {
        let name = normalize_required_name(name, "category")?;
        let name_norm = normalize_category_name(&name);

        let exists = categories::Entity::find()
            .filter(categories::Column::NameNorm.eq(name_norm.as_str()))
            .one(&self.database)
            .await?
            .is_some();
        if exists {
            return Err(EngineError::Conflict(name));
        }

        let model = categories::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4().to_string()),
            name: ActiveValue::Set(name),
            name_norm: ActiveValue::Set(name_norm),
        };
        Ok(model.insert(&self.database).await?)
    }

    /// All registered categories, sorted by name.
    pub async fn categories(&self) -> ResultEngine<Vec<categories::Model>> {
        Ok(categories::Entity::find()
            .order_by_asc(categories::Column::Name)
            .all(&self.database)
            .await?)
    }

    /// Remove a category from the registry. References from existing
    /// transactions/budgets/goals keep their name string; categories are
    /// referenced, never owned.
    pub async fn delete_category(&self, category_id: Uuid) -> ResultEngine<()> {
        let result = categories::Entity::delete_by_id(category_id.to_string())
            .exec(&self.database)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::NotFound("category".to_string()));
        }
        Ok(())
    }

    /// Whether a category with this display name exists.
    pub(crate) async fn category_exists(&self, name: &str) -> ResultEngine<bool> {
        let name_norm = normalize_category_name(name);
        Ok(categories::Entity::find()
            .filter(categories::Column::NameNorm.eq(name_norm))
            .one(&self.database)
            .await?
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalisation_is_case_insensitive() {
        assert_eq!(
            normalize_category_name(" Groceries "),
            normalize_category_name("groceries")
        );
    }

    #[test]
    fn normalisation_applies_nfc() {
        // "é" composed vs decomposed
        assert_eq!(
            normalize_category_name("caf\u{e9}"),
            normalize_category_name("cafe\u{301}")
        );
    }
}
