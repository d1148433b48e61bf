pub mod dynamic;
pub mod manager;
pub mod models;
pub mod query_builder;
pub mod repositories;
pub mod tables;

pub use dynamic::{DispatchError, TableDispatcher};
pub use manager::{DatabaseError, DatabaseManager};
pub use repositories::{PasswordRepository, PersonRepository, UserRepository};
