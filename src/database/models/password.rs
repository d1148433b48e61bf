use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::Audit;

/// A vault entry. `passwd` is ciphertext produced by the client and is
/// stored and returned verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PasswordEntry {
    #[sqlx(rename = "pdat_passwd_id")]
    pub id: i32,
    pub descr: Option<String>,
    pub name: Option<String>,
    pub passwd: Option<String>,
    pub opt_link_id: Option<i32>,
    pub link_url: Option<String>,
    #[sqlx(rename = "sec_users_id")]
    pub user_id: i32,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
    pub active_flag: String,
}

#[derive(Debug, Clone)]
pub struct NewPasswordEntry {
    pub descr: Option<String>,
    pub name: Option<String>,
    pub passwd: Option<String>,
    pub opt_link_id: Option<i32>,
    pub link_url: Option<String>,
    pub user_id: i32,
    pub created_by: String,
}
