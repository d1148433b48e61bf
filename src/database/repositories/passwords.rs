use sqlx::PgPool;

use crate::database::manager::DatabaseError;
use crate::database::models::{NewPasswordEntry, PasswordEntry};
use crate::database::query_builder::fetch_optional_as;
use crate::filter::{FilterWhere, SqlResult};
use crate::types::{Page, PageRequest};

use super::paginate;

const PASSWORD_COLUMNS: &str = "pdat_passwd_id, descr, name, passwd, opt_link_id, link_url, sec_users_id, \
     create_date, create_user, modify_date, modify_user, active_flag";

/// Vault storage. Never inspects or transforms `passwd`.
#[derive(Clone)]
pub struct PasswordRepository {
    pool: PgPool,
}

impl PasswordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i32, include_inactive: bool) -> Result<Option<PasswordEntry>, DatabaseError> {
        let mut filter = FilterWhere::new();
        filter.eq("pdat_passwd_id", id);
        if !include_inactive {
            filter.raw("active_flag = 'Y'");
        }

        let sql = SqlResult::new(
            format!("SELECT {} FROM pdat_passwd{}", PASSWORD_COLUMNS, filter.where_clause()),
            filter.into_params(),
        );
        fetch_optional_as::<PasswordEntry>(&self.pool, &sql).await
    }

    pub async fn list(
        &self,
        owner_id: i32,
        include_inactive: bool,
        page: PageRequest,
    ) -> Result<Page<PasswordEntry>, DatabaseError> {
        let mut filter = FilterWhere::new();
        filter.eq("sec_users_id", owner_id);
        if !include_inactive {
            filter.raw("active_flag = 'Y'");
        }

        paginate(&self.pool, PASSWORD_COLUMNS, "pdat_passwd", filter, "descr, name", page).await
    }

    /// Case-insensitive substring match on description or name
    pub async fn search(&self, owner_id: i32, term: &str, page: PageRequest) -> Result<Page<PasswordEntry>, DatabaseError> {
        let mut filter = FilterWhere::new();
        filter
            .eq("sec_users_id", owner_id)
            .raw("active_flag = 'Y'")
            .ilike_any(&["descr", "name"], term);

        paginate(&self.pool, PASSWORD_COLUMNS, "pdat_passwd", filter, "descr, name", page).await
    }

    pub async fn create(&self, entry: &NewPasswordEntry) -> Result<PasswordEntry, DatabaseError> {
        let sql = format!(
            "INSERT INTO pdat_passwd \
             (descr, name, passwd, opt_link_id, link_url, sec_users_id, create_date, create_user, modify_date, modify_user, active_flag) \
             VALUES ($1, $2, $3, $4, $5, $6, now(), $7, now(), $7, 'Y') \
             RETURNING {}",
            PASSWORD_COLUMNS
        );

        let created = sqlx::query_as::<_, PasswordEntry>(&sql)
            .bind(&entry.descr)
            .bind(&entry.name)
            .bind(&entry.passwd)
            .bind(entry.opt_link_id)
            .bind(&entry.link_url)
            .bind(entry.user_id)
            .bind(&entry.created_by)
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }

    pub async fn update(&self, entry: &PasswordEntry, modified_by: &str) -> Result<PasswordEntry, DatabaseError> {
        let sql = format!(
            "UPDATE pdat_passwd \
             SET descr = $1, name = $2, passwd = $3, opt_link_id = $4, link_url = $5, \
                 modify_date = now(), modify_user = $6 \
             WHERE pdat_passwd_id = $7 AND active_flag = 'Y' \
             RETURNING {}",
            PASSWORD_COLUMNS
        );

        sqlx::query_as::<_, PasswordEntry>(&sql)
            .bind(&entry.descr)
            .bind(&entry.name)
            .bind(&entry.passwd)
            .bind(entry.opt_link_id)
            .bind(&entry.link_url)
            .bind(modified_by)
            .bind(entry.id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Password entry {} not found", entry.id)))
    }

    /// Soft delete; `false` when there was no active row to deactivate
    pub async fn delete(&self, id: i32, modified_by: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "UPDATE pdat_passwd SET active_flag = 'N', modify_date = now(), modify_user = $1 \
             WHERE pdat_passwd_id = $2 AND active_flag = 'Y'",
        )
        .bind(modified_by)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
