use chrono::Utc;
use log::*;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{Address, NewAddress},
    traits::ResolvedRecipient,
};

pub async fn upsert_address(address: NewAddress, conn: &mut SqliteConnection) -> Result<Address, sqlx::Error> {
    let now = Utc::now();
    let address: Address = sqlx::query_as(
        r#"
        INSERT INTO addresses (user_id, username, full_name, phone, city, address, postcode, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT(user_id) DO UPDATE SET
            username = excluded.username,
            full_name = excluded.full_name,
            phone = excluded.phone,
            city = excluded.city,
            address = excluded.address,
            postcode = excluded.postcode,
            updated_at = excluded.updated_at
        RETURNING *
        "#,
    )
    .bind(address.user_id)
    .bind(address.username)
    .bind(address.full_name)
    .bind(address.phone)
    .bind(address.city)
    .bind(address.address)
    .bind(address.postcode)
    .bind(now)
    .bind(now)
    .fetch_all(conn)
    .await?
    .pop()
    .ok_or(sqlx::Error::RowNotFound)?;
    debug!("📝️ Address for user {} saved", address.user_id);
    Ok(address)
}

pub async fn fetch_address(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<Address>, sqlx::Error> {
    let address =
        sqlx::query_as("SELECT * FROM addresses WHERE user_id = $1").bind(user_id).fetch_optional(conn).await?;
    Ok(address)
}

pub async fn delete_address(user_id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM addresses WHERE user_id = $1").bind(user_id).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}

/// Looks up recipient ids for already-normalised usernames. If two addresses claim the same username, the most
/// recently updated one wins.
pub async fn resolve_usernames(
    usernames: &[String],
    conn: &mut SqliteConnection,
) -> Result<Vec<ResolvedRecipient>, sqlx::Error> {
    if usernames.is_empty() {
        return Ok(vec![]);
    }
    let mut builder = QueryBuilder::new("SELECT username, user_id FROM addresses WHERE username IN (");
    let mut in_clause = builder.separated(", ");
    for username in usernames {
        in_clause.push_bind(username.clone());
    }
    builder.push(") ORDER BY updated_at DESC");
    let rows: Vec<(String, i64)> = builder.build_query_as().fetch_all(conn).await?;
    let mut result: Vec<ResolvedRecipient> = Vec::with_capacity(rows.len());
    for (username, user_id) in rows {
        if !result.iter().any(|r| r.username == username) {
            result.push(ResolvedRecipient { username, user_id });
        }
    }
    Ok(result)
}
