//! The confirmation email sent for every created submission.
//!
//! Delivery piggybacks on the store write: the handler spawns one send
//! per successful insert. The platform guarantee is at-least-once, so a
//! duplicate email on retry is possible and accepted; there is no dedupe
//! ledger. A failed send is logged and swallowed, never undoing the
//! write that already succeeded.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use log::{debug, error, info, Logger};

use crate::config::get_optional_variable;
use crate::errors::BackendError;

const SUBJECT: &str = "Your Hope for the Future Has Been Safely Stored!";

const BODY: &str = "Hello,

Thank you for contributing to 🌌 Siaga Capsule — Digital Reflections for HBK20! Your hopes and dreams have been safely stored and will be delivered back to you on January 1, 2035, along with a personalized digital certificate of participation.

Once again, thank you for sharing your story. We look forward to rediscovering these reflections together in 2035.

Warm regards,
The Siaga Capsule Team
siagacapsule@gmail.com
https://siaga-capsule.netlify.app";

pub trait Mailer {
    fn send_confirmation(&self, to: String) -> BoxFuture<Result<(), BackendError>>;
}

/// A mailer that delivers over an authenticated SMTP relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(transport: AsyncSmtpTransport<Tokio1Executor>, from: Mailbox) -> Self {
        SmtpMailer { transport, from }
    }

    /// Builds a mailer from the environment, or None when any part of
    /// the SMTP configuration is absent (the caller logs the diagnostic).
    pub fn from_env() -> Option<Self> {
        let host = get_optional_variable("BACKEND_SMTP_HOST")?;
        let user = get_optional_variable("BACKEND_SMTP_USER")?;
        let password = get_optional_variable("BACKEND_SMTP_PASSWORD")?;
        let from = get_optional_variable("BACKEND_EMAIL_FROM")?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
            .expect("connect to BACKEND_SMTP_HOST")
            .credentials(Credentials::new(user, password))
            .build();

        let from = from.parse().expect("parse BACKEND_EMAIL_FROM as a mailbox");

        Some(SmtpMailer::new(transport, from))
    }
}

impl Mailer for SmtpMailer {
    fn send_confirmation(&self, to: String) -> BoxFuture<Result<(), BackendError>> {
        async move {
            let to: Mailbox = to.parse().map_err(|_| BackendError::InvalidEmailAddress)?;

            let message = Message::builder()
                .from(self.from.clone())
                .to(to)
                .subject(SUBJECT)
                .body(BODY.to_owned())
                .map_err(|source| BackendError::EmailBuild { source })?;

            self.transport
                .send(message)
                .await
                .map(|_| ())
                .map_err(|source| BackendError::EmailSend { source })
        }
        .boxed()
    }
}

/// Fires one confirmation send for a freshly created submission.
///
/// A missing address short-circuits silently; missing credentials
/// short-circuit with a diagnostic; a transport failure is logged and
/// swallowed. No internal retries.
pub fn spawn_confirmation(
    logger: Arc<Logger>,
    mailer: Option<Arc<dyn Mailer + Send + Sync>>,
    email: Option<String>,
) {
    let email = match email.filter(|e| !e.trim().is_empty()) {
        Some(email) => email,
        None => {
            debug!(logger, "No email address provided for this submission");
            return;
        }
    };

    let mailer = match mailer {
        Some(mailer) => mailer,
        None => {
            error!(
                logger,
                "Email credentials are not configured; skipping confirmation email"
            );
            return;
        }
    };

    tokio::spawn(async move {
        match mailer.send_confirmation(email.clone()).await {
            Ok(()) => info!(logger, "Confirmation email sent"; "to" => email),
            Err(e) => error!(logger, "Error sending confirmation email: {}", e; "to" => email),
        }
    });
}
