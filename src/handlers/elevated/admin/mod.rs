mod backup;
mod restore;

pub use backup::get as backup_get;
pub use restore::post as restore_post;
