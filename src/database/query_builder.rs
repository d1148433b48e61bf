//! Execution helpers for statements assembled as [`SqlResult`].

use serde_json::Value;
use sqlx::{
    postgres::{PgArguments, PgRow},
    Arguments, FromRow, PgPool, Row,
};

use crate::database::manager::DatabaseError;
use crate::filter::SqlResult;

/// Encode the JSON parameters positionally. Integers bind as INT8, so
/// writes into INTEGER columns carry an explicit `::integer` cast.
fn arguments(params: &[Value]) -> PgArguments {
    let mut args = PgArguments::default();
    for value in params {
        match value {
            Value::Null => args.add(None::<String>),
            Value::Bool(b) => args.add(*b),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => args.add(i),
                (None, Some(f)) => args.add(f),
                (None, None) => args.add(n.to_string()),
            },
            Value::String(s) => args.add(s.clone()),
            Value::Array(_) | Value::Object(_) => args.add(value.clone()),
        }
    }
    args
}

/// Run a statement whose single column `row` is `row_to_json(..)`, returning
/// each row as a JSON object. An empty result is an empty vector.
pub async fn fetch_json_rows(pool: &PgPool, sql: &SqlResult) -> Result<Vec<Value>, DatabaseError> {
    let rows = sqlx::query_with(&sql.query, arguments(&sql.params))
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|row| row.try_get::<Value, _>("row").map_err(DatabaseError::from))
        .collect()
}

/// Single-row variant of [`fetch_json_rows`]
pub async fn fetch_json_row(pool: &PgPool, sql: &SqlResult) -> Result<Option<Value>, DatabaseError> {
    let row = sqlx::query_with(&sql.query, arguments(&sql.params))
        .fetch_optional(pool)
        .await?;

    row.map(|row| row.try_get::<Value, _>("row"))
        .transpose()
        .map_err(DatabaseError::from)
}

pub async fn fetch_all_as<T>(pool: &PgPool, sql: &SqlResult) -> Result<Vec<T>, DatabaseError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    Ok(sqlx::query_as_with::<_, T, _>(&sql.query, arguments(&sql.params))
        .fetch_all(pool)
        .await?)
}

pub async fn fetch_optional_as<T>(pool: &PgPool, sql: &SqlResult) -> Result<Option<T>, DatabaseError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    Ok(sqlx::query_as_with::<_, T, _>(&sql.query, arguments(&sql.params))
        .fetch_optional(pool)
        .await?)
}

/// `SELECT COUNT(*) AS count ...`
pub async fn fetch_count(pool: &PgPool, sql: &SqlResult) -> Result<i64, DatabaseError> {
    let row = sqlx::query_with(&sql.query, arguments(&sql.params))
        .fetch_one(pool)
        .await?;
    Ok(row.try_get("count")?)
}

/// Rows affected
pub async fn execute(pool: &PgPool, sql: &SqlResult) -> Result<u64, DatabaseError> {
    let result = sqlx::query_with(&sql.query, arguments(&sql.params))
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// First column of a `... RETURNING <id>` statement
pub async fn fetch_returning_id(pool: &PgPool, sql: &SqlResult) -> Result<i32, DatabaseError> {
    let row = sqlx::query_with(&sql.query, arguments(&sql.params))
        .fetch_one(pool)
        .await?;
    Ok(row.try_get::<i32, _>(0)?)
}

