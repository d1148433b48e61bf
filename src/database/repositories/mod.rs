use serde_json::Value;
use sqlx::{postgres::PgRow, FromRow, PgPool};

use crate::database::manager::DatabaseError;
use crate::database::query_builder::{fetch_all_as, fetch_count};
use crate::filter::{FilterWhere, SqlResult};
use crate::types::{Page, PageRequest};

pub mod passwords;
pub mod persons;
pub mod users;

pub use passwords::PasswordRepository;
pub use persons::PersonRepository;
pub use users::UserRepository;

/// Count every row matching `filter`, then fetch the requested window.
///
/// The two statements run independently, so the total is unaffected by
/// `limit`/`offset` and an offset past the end gives an empty page.
pub(crate) async fn paginate<T>(
    pool: &PgPool,
    columns: &str,
    table: &str,
    filter: FilterWhere,
    order_by: &str,
    page: PageRequest,
) -> Result<Page<T>, DatabaseError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let where_clause = filter.where_clause();

    let count_sql = SqlResult::new(
        format!("SELECT COUNT(*) AS count FROM {}{}", table, where_clause),
        filter.params().to_vec(),
    );
    let total = fetch_count(pool, &count_sql).await?;

    let mut params: Vec<Value> = filter.into_params();
    params.push(Value::from(page.limit));
    params.push(Value::from(page.offset));
    let page_sql = SqlResult::new(
        format!(
            "SELECT {} FROM {}{} ORDER BY {} LIMIT ${} OFFSET ${}",
            columns,
            table,
            where_clause,
            order_by,
            params.len() - 1,
            params.len()
        ),
        params,
    );
    let items = fetch_all_as::<T>(pool, &page_sql).await?;

    Ok(Page::new(items, total, page))
}
