use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::database::manager::DatabaseError;
use crate::database::models::{Account, NewAccount, NewUser, RefreshToken, User};
use crate::filter::FilterWhere;
use crate::types::{Page, PageRequest};

use super::paginate;

const USER_COLUMNS: &str = "sec_users_id, fname, lname, create_date, create_user, modify_date, modify_user";
const ACCOUNT_COLUMNS: &str =
    "sec_accounts_id, name, password, sec_users_id, create_date, create_user, modify_date, modify_user";
const REFRESH_TOKEN_COLUMNS: &str = "id, user_id, token, expires_at, revoked, created_at";

/// Users, their login accounts and refresh tokens
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {} FROM sec_users WHERE sec_users_id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn list(&self, page: PageRequest) -> Result<Page<User>, DatabaseError> {
        paginate(&self.pool, USER_COLUMNS, "sec_users", FilterWhere::new(), "lname, fname", page).await
    }

    pub async fn search(&self, term: &str, page: PageRequest) -> Result<Page<User>, DatabaseError> {
        let mut filter = FilterWhere::new();
        filter.ilike_any(&["fname", "lname"], term);
        paginate(&self.pool, USER_COLUMNS, "sec_users", filter, "lname, fname", page).await
    }

    /// Insert the user and its first account in one transaction; a failure
    /// in either insert leaves neither row behind.
    pub async fn create(
        &self,
        user: &NewUser,
        account: &NewAccount,
        created_by: &str,
    ) -> Result<(User, Account), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let user_sql = format!(
            "INSERT INTO sec_users (fname, lname, create_date, create_user, modify_date, modify_user) \
             VALUES ($1, $2, now(), $3, now(), $3) RETURNING {}",
            USER_COLUMNS
        );
        let created_user = sqlx::query_as::<_, User>(&user_sql)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(created_by)
            .fetch_one(&mut *tx)
            .await?;

        let account_sql = format!(
            "INSERT INTO sec_accounts (name, password, sec_users_id, create_date, create_user, modify_date, modify_user) \
             VALUES ($1, $2, $3, now(), $4, now(), $4) RETURNING {}",
            ACCOUNT_COLUMNS
        );
        let created_account = sqlx::query_as::<_, Account>(&account_sql)
            .bind(&account.name)
            .bind(&account.password_hash)
            .bind(created_user.id)
            .bind(created_by)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!("Created user {} with account {}", created_user.id, created_account.name);
        Ok((created_user, created_account))
    }

    pub async fn update(
        &self,
        id: i32,
        first_name: &str,
        last_name: &str,
        modified_by: &str,
    ) -> Result<Option<User>, DatabaseError> {
        let sql = format!(
            "UPDATE sec_users SET fname = $1, lname = $2, modify_date = now(), modify_user = $3 \
             WHERE sec_users_id = $4 RETURNING {}",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(first_name)
            .bind(last_name)
            .bind(modified_by)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Hard delete; owned rows go with it through `ON DELETE CASCADE`
    pub async fn delete(&self, id: i32) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM sec_users WHERE sec_users_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn find_account_by_name(&self, name: &str) -> Result<Option<Account>, DatabaseError> {
        let sql = format!("SELECT {} FROM sec_accounts WHERE name = $1", ACCOUNT_COLUMNS);
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    /// The user's oldest account
    pub async fn find_account_by_user_id(&self, user_id: i32) -> Result<Option<Account>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM sec_accounts WHERE sec_users_id = $1 ORDER BY sec_accounts_id LIMIT 1",
            ACCOUNT_COLUMNS
        );
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    pub async fn account_has_role(&self, account_name: &str, role: &str) -> Result<bool, DatabaseError> {
        let has_role: bool = sqlx::query_scalar(
            "SELECT EXISTS ( \
                 SELECT 1 FROM sec_account_roles ar \
                 JOIN sec_accounts a ON a.sec_accounts_id = ar.sec_accounts_id \
                 JOIN sec_roles r ON r.sec_roles_id = ar.sec_roles_id \
                 WHERE a.name = $1 AND r.name = $2)",
        )
        .bind(account_name)
        .bind(role)
        .fetch_one(&self.pool)
        .await?;
        Ok(has_role)
    }

    pub async fn grant_role(&self, account_id: i32, role: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "INSERT INTO sec_account_roles (sec_accounts_id, sec_roles_id) \
             SELECT $1, sec_roles_id FROM sec_roles WHERE name = $2 \
             ON CONFLICT DO NOTHING",
        )
        .bind(account_id)
        .bind(role)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn save_refresh_token(
        &self,
        user_id: i32,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken, DatabaseError> {
        let sql = format!(
            "INSERT INTO refresh_tokens (user_id, token, expires_at, revoked, created_at) \
             VALUES ($1, $2, $3, FALSE, now()) RETURNING {}",
            REFRESH_TOKEN_COLUMNS
        );
        let saved = sqlx::query_as::<_, RefreshToken>(&sql)
            .bind(user_id)
            .bind(token)
            .bind(expires_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(saved)
    }

    pub async fn find_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>, DatabaseError> {
        let sql = format!("SELECT {} FROM refresh_tokens WHERE token = $1", REFRESH_TOKEN_COLUMNS);
        let found = sqlx::query_as::<_, RefreshToken>(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found)
    }

    /// `false` when the token is unknown or already revoked
    pub async fn revoke_refresh_token(&self, token: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE token = $1 AND revoked = FALSE")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
