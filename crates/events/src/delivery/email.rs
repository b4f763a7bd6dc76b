//! Email notification delivery via SMTP.
//!
//! [`EmailDelivery`] wraps the `lettre` async SMTP transport to send the
//! plain-text notices produced by rollout mutations. Configuration is loaded
//! from environment variables; if `SMTP_HOST` is not set,
//! [`EmailConfig::from_env`] returns `None` and [`DisabledMailer`] should be
//! used instead.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use rollout_core::outbox::{Notice, Notification};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

impl EmailError {
    /// Whether retrying the same message can never succeed.
    pub fn is_permanent(&self) -> bool {
        match self {
            EmailError::Transport(e) => e.is_permanent(),
            EmailError::Address(_) | EmailError::Build(_) => true,
        }
    }
}

// ---------------------------------------------------------------------------
// NotificationSender
// ---------------------------------------------------------------------------

/// Sends one rendered notice to one recipient.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), EmailError>;
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Subject and plain-text body of a notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub body: String,
}

/// Render a notice template into an email.
pub fn render_notice(notice: &Notice) -> RenderedEmail {
    match notice {
        Notice::ClassDeleted {
            class_date,
            subject,
            location,
            reason,
            permanently,
            cancelled_count,
            changed_by,
        } => {
            let scope = if *permanently {
                format!("This class and all following classes in the series were cancelled ({cancelled_count} in total).")
            } else {
                "Only this class was cancelled.".to_string()
            };
            RenderedEmail {
                subject: format!("[Class Rollouts] {subject} on {class_date} cancelled"),
                body: format!(
                    "Date: {class_date}\nSubject: {subject}\nLocation: {location}\nReason: {}\n\n{scope}\n\nChanged by: {changed_by}",
                    reason.as_deref().unwrap_or("not given"),
                ),
            }
        }
        Notice::ClassChanged {
            class_date,
            subject,
            location,
            affected_count,
            changed_by,
        } => RenderedEmail {
            subject: format!("[Class Rollouts] {subject} on {class_date} changed"),
            body: format!(
                "Date: {class_date}\nSubject: {subject}\nLocation: {location}\nClasses affected: {affected_count}\n\nChanged by: {changed_by}"
            ),
        },
        Notice::CapacityExceeded {
            classes,
            changed_by,
        } => {
            let mut body = String::from("The following classes are over capacity:\n");
            for class in classes {
                body.push_str(&format!(
                    "\nDate: {}\nLocation: {}\nDuration: {}\nSubject: {}\nTeacher: {}\nEnrolled: {} of {}\n",
                    class.class_date,
                    class.location,
                    class.duration,
                    class.subject,
                    class.teacher,
                    class.enrolled,
                    class.capacity,
                ));
            }
            body.push_str(&format!("\nChanged by: {changed_by}"));
            RenderedEmail {
                subject: "[Class Rollouts] Class capacity exceeded".to_string(),
                body,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "noreply@rollouts.local";

/// Configuration for the SMTP email delivery service.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port (defaults to 587).
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMTP_HOST` is not set, signalling that email
    /// delivery is not configured and should be skipped.
    ///
    /// | Variable        | Required | Default                  |
    /// |-----------------|----------|--------------------------|
    /// | `SMTP_HOST`     | yes      | -                        |
    /// | `SMTP_PORT`     | no       | `587`                    |
    /// | `SMTP_FROM`     | no       | `noreply@rollouts.local` |
    /// | `SMTP_USER`     | no       | -                        |
    /// | `SMTP_PASSWORD` | no       | -                        |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// EmailDelivery
// ---------------------------------------------------------------------------

/// Sends notices via SMTP.
///
/// The transport pools its connections, so one instance is shared by every
/// dispatcher task.
pub struct EmailDelivery {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailDelivery {
    /// Build the STARTTLS transport. Fails on an unusable host or sender.
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port);
        if let (Some(user), Some(pass)) = (config.smtp_user, config.smtp_password) {
            builder = builder.credentials(Credentials::new(user, pass));
        }

        Ok(Self {
            transport: builder.build(),
            from: config.from_address.parse()?,
        })
    }
}

#[async_trait]
impl NotificationSender for EmailDelivery {
    async fn send(&self, notification: &Notification) -> Result<(), EmailError> {
        let rendered = render_notice(&notification.notice);
        let email = Message::builder()
            .from(self.from.clone())
            .to(notification.recipient.parse()?)
            .subject(rendered.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(rendered.body)
            .map_err(|e| EmailError::Build(e.to_string()))?;

        self.transport.send(email).await?;

        tracing::info!(
            to = %notification.recipient,
            template = notification.notice.template(),
            "Notification email sent"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DisabledMailer
// ---------------------------------------------------------------------------

/// Stand-in used when SMTP is not configured. Every send succeeds.
pub struct DisabledMailer;

#[async_trait]
impl NotificationSender for DisabledMailer {
    async fn send(&self, notification: &Notification) -> Result<(), EmailError> {
        tracing::debug!(
            to = %notification.recipient,
            template = notification.notice.template(),
            "Email disabled, skipping notification"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rollout_core::outbox::CapacityInfo;

    #[test]
    fn from_env_returns_none_without_smtp_host() {
        std::env::remove_var("SMTP_HOST");
        assert!(EmailConfig::from_env().is_none());
    }

    #[test]
    fn email_error_display_build() {
        let err = EmailError::Build("missing body".to_string());
        assert_eq!(err.to_string(), "Email build error: missing body");
        assert!(err.is_permanent());
    }

    #[test]
    fn email_error_display_address() {
        let addr_err: Result<lettre::Address, _> = "not-an-email".parse();
        let err = EmailError::Address(addr_err.unwrap_err());
        assert!(err.to_string().contains("Email address parse error"));
    }

    #[test]
    fn permanent_delete_notice_mentions_series() {
        let rendered = render_notice(&Notice::ClassDeleted {
            class_date: "01/10/2024".into(),
            subject: "Piano".into(),
            location: "Downtown".into(),
            reason: Some("Holiday".into()),
            permanently: true,
            cancelled_count: 4,
            changed_by: "Grace Hopper".into(),
        });
        assert_eq!(rendered.subject, "[Class Rollouts] Piano on 01/10/2024 cancelled");
        assert!(rendered.body.contains("Reason: Holiday"));
        assert!(rendered.body.contains("4 in total"));
        assert!(rendered.body.ends_with("Changed by: Grace Hopper"));
    }

    #[test]
    fn single_delete_notice_without_reason() {
        let rendered = render_notice(&Notice::ClassDeleted {
            class_date: "01/10/2024".into(),
            subject: "Piano".into(),
            location: "Downtown".into(),
            reason: None,
            permanently: false,
            cancelled_count: 1,
            changed_by: "Grace Hopper".into(),
        });
        assert!(rendered.body.contains("Reason: not given"));
        assert!(rendered.body.contains("Only this class was cancelled."));
    }

    #[test]
    fn capacity_notice_lists_every_class() {
        let info = |date: &str| CapacityInfo {
            class_date: date.into(),
            location: "Downtown".into(),
            duration: "60m".into(),
            subject: "Piano".into(),
            teacher: "Ada Lovelace".into(),
            enrolled: 5,
            capacity: 4,
        };
        let rendered = render_notice(&Notice::CapacityExceeded {
            classes: vec![info("01/10/2024"), info("01/17/2024")],
            changed_by: "Grace Hopper".into(),
        });
        assert!(rendered.body.contains("Date: 01/10/2024"));
        assert!(rendered.body.contains("Date: 01/17/2024"));
        assert!(rendered.body.contains("Enrolled: 5 of 4"));
        assert!(rendered.body.contains("Teacher: Ada Lovelace"));
    }
}
