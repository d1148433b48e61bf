// Generic table routes, one pair per registry key
mod person;
mod record;
mod schema;

pub use person::get as person_full_get;
pub use record::{delete as record_delete, get as record_get, put as record_put};
pub use schema::{get as schema_get, post as schema_post};
