//! Registry-driven list/get/create/update/delete for the generic table routes.
//!
//! SQL is assembled by the pure `build_*` functions below so the shape of
//! every statement can be checked without a database; `TableDispatcher`
//! only resolves the descriptor, enforces tenancy and runs the result.

use std::collections::HashMap;

use serde_json::{Map, Value};
use sqlx::PgPool;
use thiserror::Error;

use crate::database::manager::DatabaseError;
use crate::database::query_builder::{execute, fetch_json_row, fetch_json_rows, fetch_returning_id};
use crate::database::tables::{
    self, ColumnKind, QueryFilter, TableConfig, Tenancy, WritableColumn, OWNER_COLUMN, PERSON_COLUMN,
};
use crate::filter::{FilterWhere, SqlResult};
use crate::middleware::AuthUser;
use crate::types::PageRequest;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Table '{table}' does not support {operation}")]
    Unsupported {
        table: &'static str,
        operation: &'static str,
    },

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed")]
    Validation(HashMap<String, String>),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl DispatchError {
    fn field(field: &str, problem: impl Into<String>) -> Self {
        let mut errors = HashMap::new();
        errors.insert(field.to_string(), problem.into());
        DispatchError::Validation(errors)
    }
}

/// A child collection embedded by [`TableDispatcher::person_full`]
struct PersonChild {
    key: &'static str,
    order_by: &'static str,
    /// Same joins as the table's read view, without the active filters
    all_rows_view: &'static str,
}

const PERSON_CHILDREN: &[PersonChild] = &[
    PersonChild { key: "emails", order_by: "email_addr", all_rows_view: "v_person_emails_all" },
    PersonChild { key: "phones", order_by: "phone_num", all_rows_view: "v_person_phones_all" },
    PersonChild { key: "addresses", order_by: "addr1", all_rows_view: "v_person_addresses_all" },
    PersonChild { key: "links", order_by: "link_text", all_rows_view: "v_person_links_all" },
    PersonChild { key: "notes", order_by: "create_date DESC", all_rows_view: "v_person_notes_all" },
];

#[derive(Clone)]
pub struct TableDispatcher {
    pool: PgPool,
    default_limit: i64,
    max_limit: i64,
}

impl TableDispatcher {
    pub fn new(pool: PgPool, default_limit: i64, max_limit: i64) -> Self {
        Self { pool, default_limit, max_limit }
    }

    pub async fn list(
        &self,
        key: &str,
        user: Option<&AuthUser>,
        params: &HashMap<String, String>,
    ) -> Result<Vec<Value>, DispatchError> {
        let config = resolve(key)?;
        let owner = owner_scope(config, user)?;
        let page = self.page_from(params)?;
        let sql = build_list(config, owner, params, page)?;

        tracing::debug!("Listing {} with {} parameter(s)", config.key, sql.params.len());
        Ok(fetch_json_rows(&self.pool, &sql).await?)
    }

    /// A foreign-owned row is reported exactly like a missing one
    pub async fn get(&self, key: &str, user: Option<&AuthUser>, id: i32) -> Result<Value, DispatchError> {
        let config = resolve(key)?;
        let owner = owner_scope(config, user)?;
        let sql = build_get(config, owner, id);

        fetch_json_row(&self.pool, &sql)
            .await?
            .ok_or_else(|| DispatchError::NotFound(format!("{} record {} not found", config.key, id)))
    }

    /// Missing rows are 404, foreign rows 403
    pub async fn delete(&self, key: &str, user: Option<&AuthUser>, id: i32) -> Result<(), DispatchError> {
        let config = resolve(key)?;
        if !config.deletable {
            return Err(DispatchError::Unsupported { table: config.key, operation: "delete" });
        }
        let owner = owner_scope(config, user)?;
        if let Some(owner) = owner {
            self.check_owner(config, id, owner).await?;
        }
        let sql = build_delete(config, owner, id);

        let affected = execute(&self.pool, &sql).await?;
        if affected == 0 {
            return Err(DispatchError::NotFound(format!("{} record {} not found", config.key, id)));
        }
        tracing::info!("Deleted {} record {}", config.key, id);
        Ok(())
    }

    /// Insert a row from the whitelisted keys of `body`, returning its id
    pub async fn create(&self, key: &str, user: Option<&AuthUser>, body: &Value) -> Result<i32, DispatchError> {
        let config = resolve(key)?;
        if !config.supports_writes() {
            return Err(DispatchError::Unsupported { table: config.key, operation: "create" });
        }
        let user = user.ok_or(DispatchError::Unauthenticated)?;
        let values = extract_writable(config, body)?;

        match parent_person(&values) {
            Some(person_id) => self.check_parent(person_id, user.user_id).await?,
            None if config.tenancy == Tenancy::ViaPerson => {
                return Err(DispatchError::field(PERSON_COLUMN, "is required"));
            }
            None => {}
        }

        let sql = build_insert(config, user, &values);
        let id = fetch_returning_id(&self.pool, &sql).await?;
        tracing::info!("Created {} record {} for user {}", config.key, id, user.user_id);
        Ok(id)
    }

    /// Overwrite only the whitelisted keys present in `body`
    pub async fn update(
        &self,
        key: &str,
        user: Option<&AuthUser>,
        id: i32,
        body: &Value,
    ) -> Result<(), DispatchError> {
        let config = resolve(key)?;
        if !config.supports_writes() {
            return Err(DispatchError::Unsupported { table: config.key, operation: "update" });
        }
        let user = user.ok_or(DispatchError::Unauthenticated)?;
        let values = extract_writable(config, body)?;
        if values.is_empty() {
            return Err(DispatchError::field("body", "no writable fields provided"));
        }

        self.check_owner(config, id, user.user_id).await?;
        if let Some(person_id) = parent_person(&values) {
            self.check_parent(person_id, user.user_id).await?;
        }

        let sql = build_update(config, user, id, &values);
        let affected = execute(&self.pool, &sql).await?;
        if affected == 0 {
            return Err(DispatchError::NotFound(format!("{} record {} not found", config.key, id)));
        }
        tracing::info!("Updated {} record {}", config.key, id);
        Ok(())
    }

    /// A person with every email, phone, address, link and note attached
    pub async fn person_full(
        &self,
        user: Option<&AuthUser>,
        id: i32,
        include_inactive: bool,
    ) -> Result<Value, DispatchError> {
        let user = user.ok_or(DispatchError::Unauthenticated)?;
        let sql = build_person(id, user.user_id, include_inactive);
        let mut person = fetch_json_row(&self.pool, &sql)
            .await?
            .ok_or_else(|| DispatchError::NotFound(format!("Person {} not found", id)))?;

        for child in PERSON_CHILDREN {
            let config = resolve(child.key)?;
            let sql = build_children(config, child, id, include_inactive);
            let rows = fetch_json_rows(&self.pool, &sql).await?;
            person[child.key] = Value::Array(rows);
        }

        Ok(person)
    }

    fn page_from(&self, params: &HashMap<String, String>) -> Result<Option<PageRequest>, DispatchError> {
        let limit = parse_i64(params, "limit")?;
        let offset = parse_i64(params, "offset")?;
        if limit.is_none() && offset.is_none() {
            return Ok(None);
        }
        PageRequest::resolve(limit, offset, self.default_limit, self.max_limit)
            .map(Some)
            .map_err(|_| {
                let field = if limit.is_some_and(|l| l < 0) { "limit" } else { "offset" };
                DispatchError::field(field, "must not be negative")
            })
    }

    async fn check_parent(&self, person_id: i32, user_id: i32) -> Result<(), DispatchError> {
        let owner: Option<i32> =
            sqlx::query_scalar("SELECT sec_users_id FROM pdat_person WHERE pdat_person_id = $1")
                .bind(person_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(DatabaseError::from)?;

        match owner {
            None => Err(DispatchError::NotFound(format!("Person {} not found", person_id))),
            Some(owner) if owner != user_id => {
                Err(DispatchError::Forbidden(format!("Person {} belongs to another user", person_id)))
            }
            Some(_) => Ok(()),
        }
    }

    async fn check_owner(&self, config: &TableConfig, id: i32, user_id: i32) -> Result<(), DispatchError> {
        let Some(sql) = build_owner_lookup(config) else {
            return Ok(());
        };
        let owner: Option<i32> = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from)?;

        match owner {
            None => Err(DispatchError::NotFound(format!("{} record {} not found", config.key, id))),
            Some(owner) if owner != user_id => Err(DispatchError::Forbidden(format!(
                "{} record {} belongs to another user",
                config.key, id
            ))),
            Some(_) => Ok(()),
        }
    }
}

fn resolve(key: &str) -> Result<&'static TableConfig, DispatchError> {
    tables::lookup(key).ok_or_else(|| DispatchError::UnknownTable(key.to_string()))
}

/// The owner id reads and deletes are constrained by, if any
fn owner_scope(config: &TableConfig, user: Option<&AuthUser>) -> Result<Option<i32>, DispatchError> {
    if !config.is_multi_tenant() {
        return Ok(None);
    }
    user.map(|u| Some(u.user_id)).ok_or(DispatchError::Unauthenticated)
}

fn parse_i64(params: &HashMap<String, String>, name: &str) -> Result<Option<i64>, DispatchError> {
    match params.get(name).map(|s| s.trim()).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<i64>()
            .map(Some)
            .map_err(|_| DispatchError::field(name, "must be an integer")),
    }
}

fn parse_flag(raw: &str) -> Option<&'static str> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "y" | "1" => Some("Y"),
        "false" | "n" | "0" => Some("N"),
        _ => None,
    }
}

fn parse_show_inactive(params: &HashMap<String, String>) -> Result<bool, DispatchError> {
    match params.get("show_inactive").map(|s| s.trim()).filter(|s| !s.is_empty()) {
        None => Ok(false),
        Some(raw) => parse_flag(raw)
            .map(|flag| flag == "Y")
            .ok_or_else(|| DispatchError::field("show_inactive", "must be true or false")),
    }
}

fn order_clause(order_by: &str) -> String {
    format!(" ORDER BY {}", order_by)
}

pub(crate) fn build_list(
    config: &TableConfig,
    owner: Option<i32>,
    params: &HashMap<String, String>,
    page: Option<PageRequest>,
) -> Result<SqlResult, DispatchError> {
    let mut filter = FilterWhere::new();
    if let Some(owner) = owner {
        filter.eq(OWNER_COLUMN, owner);
    }

    let mut errors = HashMap::new();
    for query_filter in config.filters {
        let Some(raw) = params.get(query_filter.param()).map(|s| s.trim()).filter(|s| !s.is_empty()) else {
            continue;
        };
        match *query_filter {
            QueryFilter::Contains { columns, .. } => {
                filter.ilike_any(columns, raw);
            }
            QueryFilter::Flag { param, column } => match parse_flag(raw) {
                Some(flag) => {
                    filter.eq(column, flag);
                }
                None => {
                    errors.insert(param.to_string(), "must be true or false".to_string());
                }
            },
            QueryFilter::Exact { param, column } => match raw.parse::<i32>() {
                Ok(value) => {
                    filter.eq(column, value);
                }
                Err(_) => {
                    errors.insert(param.to_string(), "must be an integer".to_string());
                }
            },
        }
    }
    if !errors.is_empty() {
        return Err(DispatchError::Validation(errors));
    }

    let source = match config.inactive_source {
        Some(inactive) if parse_show_inactive(params)? => inactive,
        _ => config.read_source,
    };

    let mut query = format!(
        "SELECT row_to_json(t) AS row FROM (SELECT {} FROM {}{}) t{}",
        config.columns.join(", "),
        source,
        filter.where_clause(),
        order_clause(config.order_by)
    );
    if let Some(page) = page {
        let limit = filter.placeholder(page.limit);
        let offset = filter.placeholder(page.offset);
        query.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset));
    }

    Ok(SqlResult::new(query, filter.into_params()))
}

pub(crate) fn build_get(config: &TableConfig, owner: Option<i32>, id: i32) -> SqlResult {
    let mut filter = FilterWhere::new();
    filter.eq(config.id_column, id);
    if let Some(owner) = owner {
        filter.eq(OWNER_COLUMN, owner);
    }

    SqlResult::new(
        format!(
            "SELECT row_to_json(t) AS row FROM (SELECT {} FROM {}{}) t",
            config.columns.join(", "),
            config.read_source,
            filter.where_clause()
        ),
        filter.into_params(),
    )
}

/// Hard delete against the base table, scoped to the owner when there is one
pub(crate) fn build_delete(config: &TableConfig, owner: Option<i32>, id: i32) -> SqlResult {
    let mut filter = FilterWhere::new();
    filter.eq(config.id_column, id);

    if let Some(owner) = owner {
        match config.tenancy {
            Tenancy::OwnerColumn => {
                filter.eq(OWNER_COLUMN, owner);
            }
            Tenancy::ViaPerson => {
                let p = filter.placeholder(owner);
                filter.push_condition(format!(
                    "{} IN (SELECT pdat_person_id FROM pdat_person WHERE sec_users_id = {})",
                    PERSON_COLUMN, p
                ));
            }
            Tenancy::Global => {}
        }
    }

    SqlResult::new(
        format!("DELETE FROM {}{}", config.base_table, filter.where_clause()),
        filter.into_params(),
    )
}

/// `SELECT <owner id>` for one row, or `None` for shared tables
pub(crate) fn build_owner_lookup(config: &TableConfig) -> Option<String> {
    match config.tenancy {
        Tenancy::Global => None,
        Tenancy::OwnerColumn => Some(format!(
            "SELECT {} FROM {} WHERE {} = $1",
            OWNER_COLUMN, config.base_table, config.id_column
        )),
        Tenancy::ViaPerson => Some(format!(
            "SELECT p.sec_users_id FROM {} c JOIN pdat_person p ON p.pdat_person_id = c.pdat_person_id \
             WHERE c.{} = $1",
            config.base_table, config.id_column
        )),
    }
}

pub(crate) fn build_insert(
    config: &TableConfig,
    user: &AuthUser,
    values: &[(&'static WritableColumn, Value)],
) -> SqlResult {
    let mut params = Vec::with_capacity(values.len() + 2);
    let mut columns = Vec::with_capacity(values.len() + 6);
    let mut placeholders = Vec::with_capacity(values.len() + 6);

    for (column, value) in values {
        params.push(value.clone());
        columns.push(column.name.to_string());
        placeholders.push(format!("${}::{}", params.len(), column.kind.cast()));
    }

    if config.tenancy == Tenancy::OwnerColumn {
        params.push(Value::from(user.user_id));
        columns.push(OWNER_COLUMN.to_string());
        placeholders.push(format!("${}::integer", params.len()));
    }

    params.push(Value::from(user.username.clone()));
    let audit_user = format!("${}", params.len());
    for (column, value) in [
        ("create_date", "now()".to_string()),
        ("create_user", audit_user.clone()),
        ("modify_date", "now()".to_string()),
        ("modify_user", audit_user),
        ("active_flag", "'Y'".to_string()),
    ] {
        columns.push(column.to_string());
        placeholders.push(value);
    }

    SqlResult::new(
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            config.base_table,
            columns.join(", "),
            placeholders.join(", "),
            config.id_column
        ),
        params,
    )
}

pub(crate) fn build_update(
    config: &TableConfig,
    user: &AuthUser,
    id: i32,
    values: &[(&'static WritableColumn, Value)],
) -> SqlResult {
    let mut params = Vec::with_capacity(values.len() + 2);
    let mut assignments = Vec::with_capacity(values.len() + 2);

    for (column, value) in values {
        params.push(value.clone());
        assignments.push(format!("{} = ${}::{}", column.name, params.len(), column.kind.cast()));
    }

    params.push(Value::from(user.username.clone()));
    assignments.push("modify_date = now()".to_string());
    assignments.push(format!("modify_user = ${}", params.len()));
    params.push(Value::from(id));

    SqlResult::new(
        format!(
            "UPDATE {} SET {} WHERE {} = ${}",
            config.base_table,
            assignments.join(", "),
            config.id_column,
            params.len()
        ),
        params,
    )
}

fn build_person(id: i32, user_id: i32, include_inactive: bool) -> SqlResult {
    let mut filter = FilterWhere::new();
    filter.eq("pdat_person_id", id).eq(OWNER_COLUMN, user_id);
    if !include_inactive {
        filter.raw("active_flag = 'Y'");
    }

    SqlResult::new(
        format!(
            "SELECT row_to_json(t) AS row FROM (SELECT p.*, \
             TRIM(COALESCE(p.fname, '') || ' ' || COALESCE(p.lname, '')) AS full_name \
             FROM pdat_person p) t{}",
            filter.where_clause()
        ),
        filter.into_params(),
    )
}

/// The read views hide soft-deleted rows and the children of inactive
/// people, so `include_inactive` switches to the unfiltered views.
fn build_children(config: &TableConfig, child: &PersonChild, person_id: i32, include_inactive: bool) -> SqlResult {
    let source = if include_inactive { child.all_rows_view } else { config.read_source };
    let mut filter = FilterWhere::new();
    filter.eq(PERSON_COLUMN, person_id);

    SqlResult::new(
        format!(
            "SELECT row_to_json(t) AS row FROM (SELECT * FROM {}{}) t{}",
            source,
            filter.where_clause(),
            order_clause(child.order_by)
        ),
        filter.into_params(),
    )
}

/// Whitelisted, type-checked values from a request body, in whitelist
/// order. Unknown keys are dropped; a body that is not an object is a
/// validation error. A row owned through its person cannot be detached
/// from it, so `pdat_person_id: null` is rejected there.
pub(crate) fn extract_writable(
    config: &TableConfig,
    body: &Value,
) -> Result<Vec<(&'static WritableColumn, Value)>, DispatchError> {
    let object: &Map<String, Value> = body
        .as_object()
        .ok_or_else(|| DispatchError::field("body", "must be a JSON object"))?;

    let mut values = Vec::new();
    let mut errors = HashMap::new();
    for column in config.writable {
        let Some(value) = object.get(column.name) else {
            continue;
        };
        if value.is_null() && column.name == PERSON_COLUMN && config.tenancy == Tenancy::ViaPerson {
            errors.insert(column.name.to_string(), "must not be null".to_string());
            continue;
        }
        match coerce(column.kind, value) {
            Ok(coerced) => values.push((column, coerced)),
            Err(problem) => {
                errors.insert(column.name.to_string(), problem.to_string());
            }
        }
    }

    if errors.is_empty() {
        Ok(values)
    } else {
        Err(DispatchError::Validation(errors))
    }
}

fn coerce(kind: ColumnKind, value: &Value) -> Result<Value, &'static str> {
    match (kind, value) {
        (_, Value::Null) => Ok(Value::Null),
        (ColumnKind::Text, Value::String(_)) => Ok(value.clone()),
        (ColumnKind::Text, _) => Err("must be a string"),
        (ColumnKind::Integer, Value::Number(n)) => n
            .as_i64()
            .filter(|v| i32::try_from(*v).is_ok())
            .map(Value::from)
            .ok_or("must be a 32-bit integer"),
        (ColumnKind::Integer, Value::String(s)) => s
            .trim()
            .parse::<i32>()
            .map(Value::from)
            .map_err(|_| "must be an integer"),
        (ColumnKind::Integer, _) => Err("must be an integer"),
    }
}

fn parent_person(values: &[(&'static WritableColumn, Value)]) -> Option<i32> {
    values
        .iter()
        .find(|(column, _)| column.name == PERSON_COLUMN)
        .and_then(|(_, value)| value.as_i64())
        .and_then(|v| i32::try_from(v).ok())
}
