use chrono::Utc;
use sqlx::SqliteConnection;

use crate::db_types::{OrderId, Subscription};

/// Returns `false` if the subscription already existed.
pub async fn subscribe(user_id: i64, order_id: &OrderId, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO subscriptions (user_id, order_id, last_sent_status, created_at, updated_at)
        VALUES ($1, $2, NULL, $3, $4)
        ON CONFLICT(user_id, order_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(order_id.as_str())
    .bind(now)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn unsubscribe(user_id: i64, order_id: &OrderId, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = $1 AND order_id = $2")
        .bind(user_id)
        .bind(order_id.as_str())
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn is_subscribed(user_id: i64, order_id: &OrderId, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions WHERE user_id = $1 AND order_id = $2")
        .bind(user_id)
        .bind(order_id.as_str())
        .fetch_one(conn)
        .await?;
    Ok(count > 0)
}

pub async fn fetch_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Subscription>, sqlx::Error> {
    let subscriptions = sqlx::query_as("SELECT * FROM subscriptions WHERE user_id = $1 ORDER BY order_id")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(subscriptions)
}

pub async fn fetch_for_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<Subscription>, sqlx::Error> {
    let subscriptions = sqlx::query_as("SELECT * FROM subscriptions WHERE order_id = $1 ORDER BY user_id")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(subscriptions)
}

/// Sets (or, with `None`, clears) the watermark of one subscription.
pub async fn set_last_sent(
    user_id: i64,
    order_id: &OrderId,
    status: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE subscriptions SET last_sent_status = $1, updated_at = $2 WHERE user_id = $3 AND order_id = $4",
    )
    .bind(status)
    .bind(Utc::now())
    .bind(user_id)
    .bind(order_id.as_str())
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn reset_for_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("UPDATE subscriptions SET last_sent_status = NULL, updated_at = $1 WHERE order_id = $2")
            .bind(Utc::now())
            .bind(order_id.as_str())
            .execute(conn)
            .await?;
    Ok(result.rows_affected())
}

pub async fn delete_for_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM subscriptions WHERE order_id = $1").bind(order_id.as_str()).execute(conn).await?;
    Ok(result.rows_affected())
}
