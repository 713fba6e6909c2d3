use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::dto::{CreateTransactionRequest, TxKind, UpdateTransactionRequest};
use crate::error::ApiError;

/// One income or expense event, owned by exactly one user. Serialized field
/// names follow the original wire format (`type`, `transactionType`).
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: TxKind,
    pub amount: Decimal,
    pub category: Option<String>,
    pub note: Option<String>,
    #[serde(rename = "transactionType")]
    pub payment_method: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

const TX_COLUMNS: &str = "id, user_id, kind, amount, category, note, payment_method, date, created_at";

/// Insert a transaction for `user_id`. The owner comes from the resolved
/// caller, never from the request body.
pub async fn create(
    db: &PgPool,
    user_id: Uuid,
    req: &CreateTransactionRequest,
) -> Result<Transaction, ApiError> {
    let query = format!(
        r#"
        INSERT INTO transactions (user_id, kind, amount, category, note, payment_method, date)
        VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, now()))
        RETURNING {TX_COLUMNS}
        "#
    );
    let tx = sqlx::query_as::<_, Transaction>(&query)
        .bind(user_id)
        .bind(req.kind)
        .bind(req.amount)
        .bind(&req.category)
        .bind(&req.note)
        .bind(&req.payment_method)
        .bind(req.date)
        .fetch_one(db)
        .await?;
    Ok(tx)
}

/// Newest-first listing, scoped to the owner by the query itself.
pub async fn list_for_owner(
    db: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<Transaction>, ApiError> {
    let query = format!(
        r#"
        SELECT {TX_COLUMNS}
        FROM transactions
        WHERE user_id = $1
        ORDER BY date DESC
        LIMIT $2 OFFSET $3
        "#
    );
    let rows = sqlx::query_as::<_, Transaction>(&query)
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
    Ok(rows)
}

/// `(id, owner)` lookup. Another owner's transaction is indistinguishable
/// from a missing one.
pub async fn find_for_owner(
    db: &PgPool,
    user_id: Uuid,
    id: Uuid,
) -> Result<Option<Transaction>, ApiError> {
    let query = format!(
        r#"
        SELECT {TX_COLUMNS}
        FROM transactions
        WHERE id = $1 AND user_id = $2
        "#
    );
    let tx = sqlx::query_as::<_, Transaction>(&query)
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
    Ok(tx)
}

/// Apply provided mutable fields; absent fields keep their stored value.
/// Returns None when the id does not exist under this owner.
pub async fn update_for_owner(
    db: &PgPool,
    user_id: Uuid,
    id: Uuid,
    req: &UpdateTransactionRequest,
) -> Result<Option<Transaction>, ApiError> {
    let query = format!(
        r#"
        UPDATE transactions
        SET kind = COALESCE($3, kind),
            amount = COALESCE($4, amount),
            category = COALESCE($5, category),
            note = COALESCE($6, note),
            payment_method = COALESCE($7, payment_method),
            date = COALESCE($8, date)
        WHERE id = $1 AND user_id = $2
        RETURNING {TX_COLUMNS}
        "#
    );
    let tx = sqlx::query_as::<_, Transaction>(&query)
        .bind(id)
        .bind(user_id)
        .bind(req.kind)
        .bind(req.amount)
        .bind(&req.category)
        .bind(&req.note)
        .bind(&req.payment_method)
        .bind(req.date)
        .fetch_optional(db)
        .await?;
    Ok(tx)
}

/// Returns false when nothing matched, so repeated deletes map to 404.
pub async fn delete_for_owner(db: &PgPool, user_id: Uuid, id: Uuid) -> Result<bool, ApiError> {
    let result = sqlx::query("DELETE FROM transactions WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}
