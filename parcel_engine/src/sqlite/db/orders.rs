use chrono::Utc;
use log::*;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order, OrderId},
    traits::{OrderUpdate, StoreError},
};

/// Inserts the order, or overwrites the writable fields of the existing order with the same `order_id`.
/// `created_at` is only ever set on insert.
pub async fn upsert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    let now = Utc::now();
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_id,
                client_name,
                phone,
                origin,
                status,
                note,
                country,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT(order_id) DO UPDATE SET
                client_name = excluded.client_name,
                phone = excluded.phone,
                origin = excluded.origin,
                status = excluded.status,
                note = excluded.note,
                country = excluded.country,
                updated_at = excluded.updated_at
            RETURNING *;
        "#,
    )
    .bind(order.order_id)
    .bind(order.client_name)
    .bind(order.phone)
    .bind(order.origin)
    .bind(order.status)
    .bind(order.note)
    .bind(order.country)
    .bind(now)
    .bind(now)
    .fetch_all(conn)
    .await?
    .pop()
    .ok_or(sqlx::Error::RowNotFound)?;
    debug!("📝️ Order [{}] upserted with id {}", order.order_id, order.id);
    Ok(order)
}

pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn update_order_status(
    order_id: &OrderId,
    status: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("UPDATE orders SET status = $1, updated_at = $2 WHERE order_id = $3 RETURNING *")
        .bind(status)
        .bind(Utc::now())
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?
        .pop();
    trace!("📝️ Status of [{order_id}] set to '{status}'");
    Ok(order)
}

/// Applies the non-empty fields of `update`. An empty update is refused with [`StoreError::OrderModificationNoOp`].
pub async fn update_order_fields(
    order_id: &OrderId,
    update: OrderUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, StoreError> {
    if update.is_empty() {
        return Err(StoreError::OrderModificationNoOp);
    }
    let mut builder = QueryBuilder::new("UPDATE orders SET ");
    let mut set_clause = builder.separated(", ");
    if let Some(client_name) = update.client_name {
        set_clause.push("client_name = ");
        set_clause.push_bind_unseparated(client_name);
    }
    if let Some(country) = update.country {
        set_clause.push("country = ");
        set_clause.push_bind_unseparated(country);
    }
    if let Some(note) = update.note {
        set_clause.push("note = ");
        set_clause.push_bind_unseparated(note);
    }
    if let Some(status) = update.status {
        set_clause.push("status = ");
        set_clause.push_bind_unseparated(status);
    }
    set_clause.push("updated_at = ");
    set_clause.push_bind_unseparated(Utc::now());
    builder.push(" WHERE order_id = ");
    builder.push_bind(order_id.as_str().to_string());
    builder.push(" RETURNING *");
    trace!("📝️ Executing query: {}", builder.sql());
    let order = builder.build_query_as::<Order>().fetch_all(conn).await?.pop();
    Ok(order)
}

pub async fn delete_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM orders WHERE order_id = $1").bind(order_id.as_str()).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}

pub async fn fetch_recent_orders(limit: u32, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders ORDER BY updated_at DESC, id DESC LIMIT $1")
        .bind(limit as i64)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

pub async fn fetch_orders_by_status(
    statuses: &[String],
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    if statuses.is_empty() {
        return Ok(vec![]);
    }
    let mut builder = QueryBuilder::new("SELECT * FROM orders WHERE status IN (");
    let mut in_clause = builder.separated(", ");
    for status in statuses {
        in_clause.push_bind(status.clone());
    }
    builder.push(") ORDER BY order_id");
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    Ok(orders)
}

/// SQLite's `LIKE` only folds ASCII, and notes are often in Cyrillic, so the case-insensitive match happens here.
pub async fn search_orders_by_note(fragment: &str, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let needle = fragment.trim().to_lowercase();
    let orders: Vec<Order> =
        sqlx::query_as("SELECT * FROM orders WHERE note IS NOT NULL AND note != '' ORDER BY updated_at DESC, id DESC")
            .fetch_all(conn)
            .await?;
    let result = orders
        .into_iter()
        .filter(|o| o.note.as_deref().map(|n| n.to_lowercase().contains(&needle)).unwrap_or(false))
        .collect();
    Ok(result)
}

pub async fn bulk_update_status(
    order_ids: &[OrderId],
    status: &str,
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    if order_ids.is_empty() {
        return Ok(0);
    }
    let mut builder = QueryBuilder::new("UPDATE orders SET status = ");
    builder.push_bind(status.to_string());
    builder.push(", updated_at = ");
    builder.push_bind(Utc::now());
    builder.push(" WHERE order_id IN (");
    let mut in_clause = builder.separated(", ");
    for order_id in order_ids {
        in_clause.push_bind(order_id.as_str().to_string());
    }
    builder.push(")");
    let result = builder.build().execute(conn).await?;
    debug!("📝️ Bulk status update touched {} of {} orders", result.rows_affected(), order_ids.len());
    Ok(result.rows_affected())
}

pub async fn fetch_orders_for_participant(
    username: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as(
        r#"
        SELECT orders.* FROM orders
        INNER JOIN participants ON participants.order_id = orders.order_id
        WHERE participants.username = $1
        ORDER BY orders.updated_at DESC, orders.id DESC
        "#,
    )
    .bind(username)
    .fetch_all(conn)
    .await?;
    Ok(orders)
}
