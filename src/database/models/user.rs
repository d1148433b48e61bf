use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::Audit;

/// A tenant: owns accounts, persons and vault entries
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[sqlx(rename = "sec_users_id")]
    pub id: i32,
    #[sqlx(rename = "fname")]
    pub first_name: String,
    #[sqlx(rename = "lname")]
    pub last_name: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

/// Login credentials belonging to a user
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[sqlx(rename = "sec_accounts_id")]
    pub id: i32,
    pub name: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[sqlx(rename = "sec_users_id")]
    pub user_id: i32,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    /// Already-hashed password
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RefreshToken {
    pub id: i32,
    pub user_id: i32,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && self.expires_at > now
    }
}
