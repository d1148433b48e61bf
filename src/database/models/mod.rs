use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub mod password;
pub mod person;
pub mod user;

pub use password::{NewPasswordEntry, PasswordEntry};
pub use person::{NewPerson, Person, PersonFilter};
pub use user::{Account, NewAccount, NewUser, RefreshToken, User};

/// Create/modify stamps carried by every CRM row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
    pub create_date: DateTime<Utc>,
    pub create_user: String,
    pub modify_date: DateTime<Utc>,
    pub modify_user: String,
}

