pub mod backup_service;
pub mod email_service;

pub use backup_service::{BackupError, BackupService};
pub use email_service::{EmailError, EmailService};
