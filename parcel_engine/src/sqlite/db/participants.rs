use chrono::Utc;
use log::*;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{OrderId, Participant},
    traits::{ParticipantPage, ParticipantQuery},
};

/// Adds the participant unless the pair already exists. Returns `true` if a row was inserted.
pub async fn insert_if_absent(
    order_id: &OrderId,
    username: &str,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO participants (order_id, username, paid, created_at, updated_at)
        VALUES ($1, $2, 0, $3, $4)
        ON CONFLICT(order_id, username) DO NOTHING
        "#,
    )
    .bind(order_id.as_str())
    .bind(username)
    .bind(now)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn fetch_for_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<Participant>, sqlx::Error> {
    let participants = sqlx::query_as("SELECT * FROM participants WHERE order_id = $1 ORDER BY username")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(participants)
}

pub async fn toggle_paid(
    order_id: &OrderId,
    username: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Participant>, sqlx::Error> {
    let participant = sqlx::query_as(
        r#"
        UPDATE participants SET paid = NOT paid, updated_at = $1
        WHERE order_id = $2 AND username = $3
        RETURNING *
        "#,
    )
    .bind(Utc::now())
    .bind(order_id.as_str())
    .bind(username)
    .fetch_all(conn)
    .await?
    .pop();
    Ok(participant)
}

pub async fn fetch_unpaid_usernames(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<String>, sqlx::Error> {
    let usernames =
        sqlx::query_scalar("SELECT username FROM participants WHERE order_id = $1 AND paid = 0 ORDER BY username")
            .bind(order_id.as_str())
            .fetch_all(conn)
            .await?;
    Ok(usernames)
}

pub async fn fetch_all_unpaid(conn: &mut SqliteConnection) -> Result<Vec<(OrderId, String)>, sqlx::Error> {
    let rows = sqlx::query_as("SELECT order_id, username FROM participants WHERE paid = 0 ORDER BY order_id, username")
        .fetch_all(conn)
        .await?;
    Ok(rows)
}

pub async fn delete_for_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM participants WHERE order_id = $1").bind(order_id.as_str()).execute(conn).await?;
    Ok(result.rows_affected())
}

/// Counts the matching participants, then reads one page of them.
pub async fn search(query: ParticipantQuery, conn: &mut SqliteConnection) -> Result<ParticipantPage, sqlx::Error> {
    let mut count_builder = QueryBuilder::new("SELECT COUNT(*) FROM participants ");
    push_filters(&mut count_builder, &query);
    let total: i64 = count_builder.build_query_scalar().fetch_one(&mut *conn).await?;

    let mut builder = QueryBuilder::new("SELECT * FROM participants ");
    push_filters(&mut builder, &query);
    builder.push(" ORDER BY order_id, username LIMIT ");
    builder.push_bind(query.page_size() as i64);
    builder.push(" OFFSET ");
    builder.push_bind(query.offset as i64);
    trace!("📝️ Executing query: {}", builder.sql());
    let items = builder.build_query_as::<Participant>().fetch_all(conn).await?;
    Ok(ParticipantPage::new(items, total.max(0) as u64, query.offset))
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, query: &ParticipantQuery) {
    if query.is_unfiltered() {
        return;
    }
    builder.push("WHERE ");
    let mut where_clause = builder.separated(" AND ");
    if let Some(order_id) = &query.order_id {
        where_clause.push("order_id = ");
        where_clause.push_bind_unseparated(order_id.as_str().to_string());
    }
    if let Some(paid) = query.paid {
        where_clause.push("paid = ");
        where_clause.push_bind_unseparated(paid);
    }
    if let Some(fragment) = query.search_fragment() {
        // instr rather than LIKE: underscores are common in usernames
        where_clause.push("instr(username, ");
        where_clause.push_bind_unseparated(fragment);
        where_clause.push_unseparated(") > 0");
    }
}
