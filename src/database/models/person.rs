use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::Audit;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    #[sqlx(rename = "pdat_person_id")]
    pub id: i32,
    #[sqlx(rename = "fname")]
    pub first_name: Option<String>,
    #[sqlx(rename = "lname")]
    pub last_name: Option<String>,
    pub birthday: Option<NaiveDate>,
    /// `Y` for a business contact, `N` for an individual
    pub business_flag: String,
    #[sqlx(rename = "sec_users_id")]
    pub user_id: i32,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
    pub active_flag: String,
}

#[derive(Debug, Clone)]
pub struct NewPerson {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub business_flag: String,
    pub user_id: i32,
    pub created_by: String,
}

/// Optional list filters; all present ones AND together
#[derive(Debug, Clone, Default)]
pub struct PersonFilter {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub business: Option<bool>,
    pub include_inactive: bool,
}
