//! Outbound mail.
//!
//! Handlers depend on the [`Mailer`] trait. The bundled [`LoggingMailer`]
//! renders the message and writes it to the log instead of delivering it.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

/// Template used for the activation mail sent on registration.
pub const USER_WELCOME_TEMPLATE: &str = "user_invitation.tmpl";

/// Display name on every outgoing message.
pub const FROM_NAME: &str = "GopherSocial";

/// Attempts made by [`send_with_retry`].
pub const MAX_SEND_ATTEMPTS: u32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("unknown mail template: {0}")]
    UnknownTemplate(String),

    #[error("mail delivery failed: {0}")]
    Delivery(String),
}

/// A rendered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMail {
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends `template` rendered with `vars` to `email`.
    ///
    /// With `sandbox` set the provider validates the message but does not
    /// deliver it. Returns the provider's status code.
    async fn send(
        &self,
        template: &str,
        username: &str,
        email: &str,
        vars: &Value,
        sandbox: bool,
    ) -> Result<u16, MailError>;
}

/// Renders one of the built-in templates.
///
/// # Errors
///
/// `UnknownTemplate` for any name other than [`USER_WELCOME_TEMPLATE`].
pub fn render(template: &str, vars: &Value) -> Result<RenderedMail, MailError> {
    if template != USER_WELCOME_TEMPLATE {
        return Err(MailError::UnknownTemplate(template.to_string()));
    }

    let username = vars["username"].as_str().unwrap_or_default();
    let activation_url = vars["activation_url"].as_str().unwrap_or_default();

    Ok(RenderedMail {
        subject: "Finish Registration with GopherSocial".to_string(),
        body: format!(
            "Hi {username},\n\n\
             Thanks for signing up for GopherSocial. We're excited to have you on board!\n\n\
             Before you can start using GopherSocial, you need to confirm your email address. \
             Click the link below to confirm your email address:\n\n\
             {activation_url}\n\n\
             If you want to activate your account manually copy and paste the link above \
             into your browser.\n\n\
             If you didn't sign up for GopherSocial, you can safely ignore this email.\n\n\
             Thanks,\nThe GopherSocial Team"
        ),
    })
}

/// Mailer that renders messages and logs them.
#[derive(Debug, Clone)]
pub struct LoggingMailer {
    from_email: String,
}

impl LoggingMailer {
    #[must_use]
    pub fn new(from_email: impl Into<String>) -> Self {
        Self {
            from_email: from_email.into(),
        }
    }
}

#[async_trait]
impl Mailer for LoggingMailer {
    async fn send(
        &self,
        template: &str,
        username: &str,
        email: &str,
        vars: &Value,
        sandbox: bool,
    ) -> Result<u16, MailError> {
        let mail = render(template, vars)?;
        tracing::info!(
            from = %format!("{FROM_NAME} <{}>", self.from_email),
            to = %format!("{username} <{email}>"),
            subject = %mail.subject,
            sandbox,
            "mail sent"
        );
        tracing::debug!(body = %mail.body, "mail body");
        Ok(202)
    }
}

/// Sends through `mailer`, retrying up to [`MAX_SEND_ATTEMPTS`] times.
///
/// The pause before retry `n` is `n * backoff`. Unknown templates fail
/// immediately.
pub async fn send_with_retry(
    mailer: &dyn Mailer,
    template: &str,
    username: &str,
    email: &str,
    vars: &Value,
    sandbox: bool,
    backoff: Duration,
) -> Result<u16, MailError> {
    let mut last_error = None;

    for attempt in 1..=MAX_SEND_ATTEMPTS {
        match mailer.send(template, username, email, vars, sandbox).await {
            Ok(status) => return Ok(status),
            Err(e @ MailError::UnknownTemplate(_)) => return Err(e),
            Err(e) => {
                tracing::warn!(
                    email = %email,
                    attempt,
                    max_attempts = MAX_SEND_ATTEMPTS,
                    error = %e,
                    "failed to send mail"
                );
                last_error = Some(e);
                if attempt < MAX_SEND_ATTEMPTS {
                    tokio::time::sleep(backoff * attempt).await;
                }
            }
        }
    }

    Err(MailError::Delivery(format!(
        "failed to send mail after {MAX_SEND_ATTEMPTS} attempts: {}",
        last_error.map(|e| e.to_string()).unwrap_or_default()
    )))
}
