//! Transactions API endpoints.

use api_types::transaction::{
    RecurringFrequency as ApiFrequency, TagsResponse, TransactionKind as ApiKind,
    TransactionList, TransactionListAll, TransactionListResponse, TransactionNew,
    TransactionStatus as ApiStatus, TransactionUpdate, TransactionView,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState};
use engine::{users, MoneyCents, NewTransactionCmd, RecurringCmd, TransactionListFilter, TransactionPatch};

pub(crate) fn map_currency(currency: engine::Currency) -> api_types::Currency {
    match currency {
        engine::Currency::Eur => api_types::Currency::Eur,
        engine::Currency::Usd => api_types::Currency::Usd,
        engine::Currency::Gbp => api_types::Currency::Gbp,
        engine::Currency::Chf => api_types::Currency::Chf,
        engine::Currency::Inr => api_types::Currency::Inr,
    }
}

pub(crate) fn map_currency_in(currency: api_types::Currency) -> engine::Currency {
    match currency {
        api_types::Currency::Eur => engine::Currency::Eur,
        api_types::Currency::Usd => engine::Currency::Usd,
        api_types::Currency::Gbp => engine::Currency::Gbp,
        api_types::Currency::Chf => engine::Currency::Chf,
        api_types::Currency::Inr => engine::Currency::Inr,
    }
}

fn map_kind(kind: engine::TransactionKind) -> ApiKind {
    match kind {
        engine::TransactionKind::Income => ApiKind::Income,
        engine::TransactionKind::Expense => ApiKind::Expense,
    }
}

fn map_kind_in(kind: ApiKind) -> engine::TransactionKind {
    match kind {
        ApiKind::Income => engine::TransactionKind::Income,
        ApiKind::Expense => engine::TransactionKind::Expense,
    }
}

fn map_status(status: engine::TransactionStatus) -> ApiStatus {
    match status {
        engine::TransactionStatus::Pending => ApiStatus::Pending,
        engine::TransactionStatus::Completed => ApiStatus::Completed,
        engine::TransactionStatus::Failed => ApiStatus::Failed,
    }
}

fn map_frequency(frequency: engine::RecurringFrequency) -> ApiFrequency {
    match frequency {
        engine::RecurringFrequency::Daily => ApiFrequency::Daily,
        engine::RecurringFrequency::Weekly => ApiFrequency::Weekly,
        engine::RecurringFrequency::Monthly => ApiFrequency::Monthly,
        engine::RecurringFrequency::Yearly => ApiFrequency::Yearly,
    }
}

fn map_frequency_in(frequency: ApiFrequency) -> engine::RecurringFrequency {
    match frequency {
        ApiFrequency::Daily => engine::RecurringFrequency::Daily,
        ApiFrequency::Weekly => engine::RecurringFrequency::Weekly,
        ApiFrequency::Monthly => engine::RecurringFrequency::Monthly,
        ApiFrequency::Yearly => engine::RecurringFrequency::Yearly,
    }
}

fn map_transaction(tx: engine::Transaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        user: tx.user_id,
        kind: map_kind(tx.kind),
        status: map_status(tx.status),
        amount_minor: tx.amount.cents(),
        currency: map_currency(tx.currency),
        category: tx.category,
        goal_id: tx.goal_id,
        tags: tx.tags,
        note: tx.note,
        is_recurring: tx.is_recurring,
        recurring_frequency: tx.recurring_frequency.map(map_frequency),
        is_active: tx.is_active,
        date: tx.date,
        start_date: tx.start_date,
    }
}

/// Empty string in a patchable text field clears it.
fn clearable(value: Option<String>) -> Option<Option<String>> {
    value.map(|v| if v.is_empty() { None } else { Some(v) })
}

pub async fn create(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<TransactionNew>,
) -> Result<(StatusCode, Json<TransactionView>), ServerError> {
    let recurring = match (payload.recurring_frequency, payload.start_date) {
        (Some(frequency), Some(start_date)) => Some(RecurringCmd {
            frequency: map_frequency_in(frequency),
            start_date,
        }),
        (None, None) => None,
        _ => {
            return Err(ServerError::Generic(
                "recurring_frequency and start_date must be provided together".to_string(),
            ));
        }
    };

    let tx = state
        .engine
        .create_transaction(NewTransactionCmd {
            user_id: user.username,
            kind: map_kind_in(payload.kind),
            amount: MoneyCents::new(payload.amount_minor),
            currency: payload.currency.map(map_currency_in),
            category: payload.category,
            goal_id: payload.goal_id,
            tags: payload.tags,
            note: payload.note,
            recurring,
            date: payload.date,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(map_transaction(tx))))
}

pub async fn list(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Query(payload): Query<TransactionList>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    let tags = payload
        .tags
        .map(|tags| {
            tags.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default();

    let filter = TransactionListFilter {
        kind: payload.kind.map(map_kind_in),
        category: payload.category,
        tags,
        from: payload.from,
        to: payload.to,
    };

    let transactions = state
        .engine
        .transactions(&user.username, &filter)
        .await?
        .into_iter()
        .map(map_transaction)
        .collect();

    Ok(Json(TransactionListResponse { transactions }))
}

pub async fn list_all(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Query(payload): Query<TransactionListAll>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    let transactions = state
        .engine
        .transactions_all_users(
            &user.username,
            payload.user.as_deref(),
            payload.from,
            payload.to,
        )
        .await?
        .into_iter()
        .map(map_transaction)
        .collect();

    Ok(Json(TransactionListResponse { transactions }))
}

pub async fn tags(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
) -> Result<Json<TagsResponse>, ServerError> {
    let tags = state.engine.unique_tags(&user.username).await?;
    Ok(Json(TagsResponse { tags }))
}

pub async fn get(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransactionView>, ServerError> {
    let tx = state.engine.transaction(id, &user.username).await?;
    Ok(Json(map_transaction(tx)))
}

pub async fn update(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransactionUpdate>,
) -> Result<Json<TransactionView>, ServerError> {
    let patch = TransactionPatch {
        amount: payload.amount_minor.map(MoneyCents::new),
        category: clearable(payload.category),
        note: clearable(payload.note),
        tags: payload.tags,
        date: payload.date,
    };

    let tx = state.engine.update_transaction(id, &user.username, patch).await?;
    Ok(Json(map_transaction(tx)))
}

pub async fn remove(
    Extension(user): Extension<users::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_transaction(id, &user.username).await?;
    Ok(StatusCode::NO_CONTENT)
}
