// handlers/public/auth/register.rs - POST /api/v1/auth/register

use std::collections::HashMap;

use axum::extract::{rejection::JsonRejection, Json, State};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::auth::hash_password_blocking;
use crate::database::models::{NewAccount, NewUser};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 6;
const SYSTEM_USER: &str = "system";
const DEFAULT_ROLE: &str = "user";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
    pub password: String,
}

impl RegisterRequest {
    fn validate(&self) -> Result<(), ApiError> {
        let mut errors = HashMap::new();

        for (field, value) in [
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
            ("email", &self.email),
        ] {
            if value.trim().is_empty() {
                errors.insert(field.to_string(), "is required".to_string());
            }
        }
        if !self.email.trim().is_empty() && !self.email.contains('@') {
            errors.insert("email".to_string(), "must be an email address".to_string());
        }
        if self.username.trim().chars().count() < MIN_USERNAME_LEN {
            errors.insert(
                "username".to_string(),
                format!("must be at least {} characters", MIN_USERNAME_LEN),
            );
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.insert(
                "password".to_string(),
                format!("must be at least {} characters", MIN_PASSWORD_LEN),
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation_error("Registration data is invalid", Some(errors)))
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub id: i32,
    pub account_name: String,
    pub first_name: String,
    pub last_name: String,
    pub message: String,
}

/// Create a user and its login account in one transaction, then send the
/// welcome email. Email trouble is logged and never fails the request.
pub async fn post(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<RegisterResponse> {
    let Json(request) = payload?;
    request.validate()?;

    let username = request.username.trim().to_string();
    if state.users.find_account_by_name(&username).await?.is_some() {
        return Err(ApiError::conflict(format!("Account '{}' already exists", username)));
    }

    let password_hash = hash_password_blocking(request.password).await?;
    let (user, account) = state
        .users
        .create(
            &NewUser {
                first_name: request.first_name.trim().to_string(),
                last_name: request.last_name.trim().to_string(),
            },
            &NewAccount {
                name: username,
                password_hash,
            },
            SYSTEM_USER,
        )
        .await?;

    if !state.users.grant_role(account.id, DEFAULT_ROLE).await? {
        tracing::warn!("Role '{}' missing; account {} has no roles", DEFAULT_ROLE, account.name);
    }

    let display_name = format!("{} {}", user.first_name, user.last_name);
    if let Err(e) = state.email.send_welcome_email(request.email.trim(), &display_name).await {
        tracing::warn!("Welcome email to {} failed: {}", request.email, e);
    }

    tracing::info!("Registered account {} for user {}", account.name, user.id);
    Ok(ApiResponse::created(RegisterResponse {
        id: user.id,
        account_name: account.name,
        first_name: user.first_name,
        last_name: user.last_name,
        message: "User registered successfully".to_string(),
    }))
}
