//! SMTP email for order confirmations and admin notifications.
//!
//! Uses lettre with Askama HTML and plain-text templates.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::instrument;

use crate::config::SmtpConfig;

/// Port that speaks TLS from the first byte instead of upgrading with STARTTLS.
const IMPLICIT_TLS_PORT: u16 = 465;

#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    name: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    name: &'a str,
}

#[derive(Template)]
#[template(path = "email/admin_new_order.html")]
struct AdminNewOrderHtml<'a> {
    name: &'a str,
    email: &'a str,
}

#[derive(Template)]
#[template(path = "email/admin_new_order.txt")]
struct AdminNewOrderText<'a> {
    name: &'a str,
    email: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// SMTP mailer for transactional order emails.
#[derive(Clone)]
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    admin_email: Option<String>,
}

impl Mailer {
    /// Create a mailer from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &SmtpConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );

        let builder = if config.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
        };

        let transport = builder
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            from_address: config.username.clone(),
            admin_email: config.admin_email.clone(),
        })
    }

    /// Tell the customer their order was received.
    ///
    /// # Errors
    ///
    /// Returns error if the email fails to render or send.
    pub async fn send_order_confirmation(&self, to: &str, name: &str) -> Result<(), EmailError> {
        let html = OrderConfirmationHtml { name }.render()?;
        let text = OrderConfirmationText { name }.render()?;
        self.send_order_email(to, "Order Confirmation", &text, &html)
            .await
    }

    /// Notify the shop admin of a new order. A no-op without `ADMIN_EMAIL`.
    ///
    /// # Errors
    ///
    /// Returns error if the email fails to render or send.
    pub async fn send_admin_notification(&self, name: &str, email: &str) -> Result<(), EmailError> {
        let Some(admin) = self.admin_email.as_deref() else {
            tracing::debug!("ADMIN_EMAIL not set, skipping admin notification");
            return Ok(());
        };

        let html = AdminNewOrderHtml { name, email }.render()?;
        let text = AdminNewOrderText { name, email }.render()?;
        self.send_order_email(admin, "New Order Received", &text, &html)
            .await
    }

    /// Send a multipart email with both plain text and HTML versions.
    ///
    /// # Errors
    ///
    /// Returns error if an address is invalid or the SMTP exchange fails.
    #[instrument(skip(self, text_body, html_body), fields(to = %to))]
    pub async fn send_order_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.transport.send(email).await?;

        tracing::info!(subject = %subject, "Email sent successfully");
        Ok(())
    }
}
