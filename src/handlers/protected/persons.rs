// handlers/protected/persons.rs - /api/v1/persons

use axum::extract::{
    rejection::{JsonRejection, PathRejection, QueryRejection},
    Extension, Json, Path, Query, State,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use crate::app::AppState;
use crate::database::models::{NewPerson, Person, PersonFilter};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::types::{ListQuery, Page, ShowInactive};

const DEFAULT_PAGE_SIZE: i64 = 20;

/// `businessFlag` arrives either as a boolean or as the stored `Y`/`N`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FlagInput {
    Bool(bool),
    Text(String),
}

impl FlagInput {
    fn to_flag(&self) -> Result<&'static str, ApiError> {
        match self {
            FlagInput::Bool(true) => Ok("Y"),
            FlagInput::Bool(false) => Ok("N"),
            FlagInput::Text(s) => match s.trim().to_ascii_uppercase().as_str() {
                "Y" | "TRUE" => Ok("Y"),
                "N" | "FALSE" => Ok("N"),
                _ => Err(ApiError::field_error("businessFlag", "must be Y, N, true or false")),
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub business_flag: Option<FlagInput>,
}

impl PersonRequest {
    /// Overlay the provided fields onto `person`
    fn apply(self, person: &mut Person) -> Result<(), ApiError> {
        if let Some(flag) = &self.business_flag {
            person.business_flag = flag.to_flag()?.to_string();
        }
        if let Some(first_name) = self.first_name {
            person.first_name = Some(first_name);
        }
        if let Some(last_name) = self.last_name {
            person.last_name = Some(last_name);
        }
        if let Some(birthday) = self.birthday {
            person.birthday = Some(birthday);
        }
        Ok(())
    }
}

/// Load a person the caller may mutate: missing is 404, foreign is 403
async fn owned_person(state: &AppState, user: &AuthUser, id: i32) -> Result<Person, ApiError> {
    let person = state
        .persons
        .find_by_id(id, false)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Person {} not found", id)))?;

    if person.user_id != user.user_id {
        tracing::warn!("User {} attempted to modify person {} owned by {}", user.user_id, id, person.user_id);
        return Err(ApiError::forbidden("Person belongs to another user"));
    }
    Ok(person)
}

/// GET /api/v1/persons
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Page<Person>> {
    let Query(query) = query?;
    let page = query.page(DEFAULT_PAGE_SIZE, state.config.api.max_page_size)?;
    let filter = PersonFilter {
        first_name: query.fname.clone(),
        last_name: query.lname.clone(),
        business: query.business_flag,
        include_inactive: query.include_inactive(),
    };

    Ok(ApiResponse::success(state.persons.list(user.user_id, &filter, page).await?))
}

/// GET /api/v1/persons/search?q=
pub async fn search(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Page<Person>> {
    let Query(query) = query?;
    let term = query.search_term()?;
    let page = query.page(DEFAULT_PAGE_SIZE, state.config.api.max_page_size)?;

    Ok(ApiResponse::success(state.persons.search(user.user_id, term, page).await?))
}

/// GET /api/v1/persons/:id - another user's person reads as missing
pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<i32>, PathRejection>,
    query: Result<Query<ShowInactive>, QueryRejection>,
) -> ApiResult<Person> {
    let Path(id) = id?;
    let Query(query) = query?;

    let person = state
        .persons
        .find_by_id(id, query.include_inactive())
        .await?
        .filter(|p| p.user_id == user.user_id)
        .ok_or_else(|| ApiError::not_found(format!("Person {} not found", id)))?;
    Ok(ApiResponse::success(person))
}

/// POST /api/v1/persons
pub async fn post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<PersonRequest>, JsonRejection>,
) -> ApiResult<Person> {
    let Json(request) = payload?;
    let business_flag = match &request.business_flag {
        Some(flag) => flag.to_flag()?,
        None => "N",
    };

    let person = state
        .persons
        .create(&NewPerson {
            first_name: request.first_name,
            last_name: request.last_name,
            birthday: request.birthday,
            business_flag: business_flag.to_string(),
            user_id: user.user_id,
            created_by: user.username.clone(),
        })
        .await?;

    tracing::info!("User {} created person {}", user.user_id, person.id);
    Ok(ApiResponse::created(person))
}

/// PUT /api/v1/persons/:id - partial update
pub async fn put(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<i32>, PathRejection>,
    payload: Result<Json<PersonRequest>, JsonRejection>,
) -> ApiResult<Person> {
    let Path(id) = id?;
    let Json(request) = payload?;

    let mut person = owned_person(&state, &user, id).await?;
    request.apply(&mut person)?;

    Ok(ApiResponse::success(state.persons.update(&person, &user.username).await?))
}

/// DELETE /api/v1/persons/:id - soft delete
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<i32>, PathRejection>,
) -> ApiResult<Value> {
    let Path(id) = id?;
    owned_person(&state, &user, id).await?;

    if !state.persons.delete(id, &user.username).await? {
        return Err(ApiError::not_found(format!("Person {} not found", id)));
    }
    Ok(ApiResponse::message("Person deleted successfully"))
}
