use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{CreateTransactionRequest, Pagination, UpdateTransactionRequest},
    repo::{self, Transaction},
};
use crate::{auth::extractor::AuthUser, error::ApiError, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/transactions", post(create_transaction))
        .route("/transactions/my", get(list_my_transactions))
        .route(
            "/transactions/:id",
            get(get_transaction)
                .put(update_transaction)
                .delete(delete_transaction),
        )
}

#[instrument(skip(state, payload))]
pub async fn create_transaction(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<Transaction>), ApiError> {
    if payload.amount <= Decimal::ZERO {
        warn!(user_id = %user_id, "non-positive amount");
        return Err(ApiError::validation("amount must be positive"));
    }

    let tx = repo::create(&state.db, user_id, &payload).await?;
    info!(user_id = %user_id, transaction_id = %tx.id, "transaction created");
    Ok((StatusCode::CREATED, Json(tx)))
}

#[instrument(skip(state))]
pub async fn list_my_transactions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    let rows = repo::list_for_owner(&state.db, user_id, p.limit, p.offset).await?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
pub async fn get_transaction(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Transaction>, ApiError> {
    let tx = repo::find_for_owner(&state.db, user_id, id)
        .await?
        .ok_or_else(|| ApiError::not_found("transaction not found"))?;
    Ok(Json(tx))
}

#[instrument(skip(state, payload))]
pub async fn update_transaction(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTransactionRequest>,
) -> Result<Json<Transaction>, ApiError> {
    if let Some(amount) = payload.amount {
        if amount <= Decimal::ZERO {
            warn!(user_id = %user_id, transaction_id = %id, "non-positive amount");
            return Err(ApiError::validation("amount must be positive"));
        }
    }

    let tx = repo::update_for_owner(&state.db, user_id, id, &payload)
        .await?
        .ok_or_else(|| ApiError::not_found("transaction not found"))?;
    info!(user_id = %user_id, transaction_id = %id, "transaction updated");
    Ok(Json(tx))
}

#[instrument(skip(state))]
pub async fn delete_transaction(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let deleted = repo::delete_for_owner(&state.db, user_id, id).await?;
    if !deleted {
        return Err(ApiError::not_found("transaction not found"));
    }
    info!(user_id = %user_id, transaction_id = %id, "transaction deleted");
    Ok(Json(json!({ "message": "transaction deleted" })))
}
