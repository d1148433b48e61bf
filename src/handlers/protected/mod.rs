// handlers/protected/mod.rs - bearer token required
//
// Every handler here receives `Extension<AuthUser>` from `jwt_auth_middleware`.
pub mod auth;
pub mod data;
pub mod passwords;
pub mod persons;
pub mod users;
