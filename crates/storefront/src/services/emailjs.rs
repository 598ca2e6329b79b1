//! EmailJS REST client for templated customer emails.
//!
//! The templates live in the EmailJS dashboard and receive `to_email` and
//! `to_name` as parameters.

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::config::EmailJsConfig;

/// Errors that can occur when interacting with EmailJS.
#[derive(Debug, Error)]
pub enum EmailJsError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The requested template id is not configured.
    #[error("template not configured: {0}")]
    TemplateNotConfigured(&'static str),
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    #[serde(rename = "accessToken", skip_serializing_if = "Option::is_none")]
    access_token: Option<&'a str>,
    template_params: TemplateParams<'a>,
}

#[derive(Debug, Serialize)]
struct TemplateParams<'a> {
    to_email: &'a str,
    to_name: &'a str,
}

/// EmailJS API client.
#[derive(Clone)]
pub struct EmailJsClient {
    inner: Arc<EmailJsClientInner>,
}

struct EmailJsClientInner {
    client: reqwest::Client,
    endpoint: String,
    service_id: String,
    public_key: String,
    private_key: Option<SecretString>,
    auto_reply_template: Option<String>,
    welcome_template: Option<String>,
}

impl EmailJsClient {
    /// Create a new EmailJS client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &EmailJsConfig) -> Result<Self, EmailJsError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            inner: Arc::new(EmailJsClientInner {
                client,
                endpoint: format!(
                    "{}/api/v1.0/email/send",
                    config.api_base.trim_end_matches('/')
                ),
                service_id: config.service_id.clone(),
                public_key: config.public_key.clone(),
                private_key: config.private_key.clone(),
                auto_reply_template: config.auto_reply_template.clone(),
                welcome_template: config.welcome_template.clone(),
            }),
        })
    }

    /// Send the auto-reply template.
    ///
    /// # Errors
    ///
    /// Returns error if the template is not configured or the API call fails.
    pub async fn send_auto_reply(&self, to: &str, name: &str) -> Result<(), EmailJsError> {
        let template = self
            .inner
            .auto_reply_template
            .as_deref()
            .ok_or(EmailJsError::TemplateNotConfigured("EMAILJS_TEMPLATE_AUTO_REPLY"))?;
        self.send(template, to, name).await
    }

    /// Send the welcome template.
    ///
    /// # Errors
    ///
    /// Returns error if the template is not configured or the API call fails.
    pub async fn send_welcome(&self, to: &str, name: &str) -> Result<(), EmailJsError> {
        let template = self
            .inner
            .welcome_template
            .as_deref()
            .ok_or(EmailJsError::TemplateNotConfigured("EMAILJS_TEMPLATE_WELCOME"))?;
        self.send(template, to, name).await
    }

    #[instrument(skip(self, name), fields(template_id = %template_id, to = %to))]
    async fn send(&self, template_id: &str, to: &str, name: &str) -> Result<(), EmailJsError> {
        let body = build_request(&self.inner, template_id, to, name);
        debug!(service_id = %self.inner.service_id, "Sending EmailJS template");

        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EmailJsError::Api {
                status: status.as_u16(),
                message,
            });
        }

        info!("EmailJS template sent");
        Ok(())
    }
}

fn build_request<'a>(
    inner: &'a EmailJsClientInner,
    template_id: &'a str,
    to: &'a str,
    name: &'a str,
) -> SendRequest<'a> {
    SendRequest {
        service_id: &inner.service_id,
        template_id,
        user_id: &inner.public_key,
        access_token: inner.private_key.as_ref().map(|k| k.expose_secret()),
        template_params: TemplateParams {
            to_email: to,
            to_name: name,
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(private_key: Option<&str>) -> EmailJsConfig {
        EmailJsConfig {
            service_id: "service_4omzenc".to_string(),
            public_key: "pk_public".to_string(),
            private_key: private_key.map(SecretString::from),
            auto_reply_template: Some("template_reply".to_string()),
            welcome_template: None,
            api_base: "http://127.0.0.1:9".to_string(),
        }
    }

    #[test]
    fn test_request_shape() {
        let client = EmailJsClient::new(&config(Some("pk_private"))).unwrap();
        let body = build_request(&client.inner, "template_reply", "ada@qui.test", "Ada");
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["service_id"], "service_4omzenc");
        assert_eq!(json["user_id"], "pk_public");
        assert_eq!(json["accessToken"], "pk_private");
        assert_eq!(json["template_params"]["to_email"], "ada@qui.test");
        assert_eq!(json["template_params"]["to_name"], "Ada");
    }

    #[test]
    fn test_access_token_omitted_without_private_key() {
        let client = EmailJsClient::new(&config(None)).unwrap();
        let body = build_request(&client.inner, "t", "a@b.co", "A");
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("accessToken").is_none());
    }

    #[tokio::test]
    async fn test_unconfigured_template_is_an_error() {
        let client = EmailJsClient::new(&config(None)).unwrap();
        let err = client.send_welcome("a@b.co", "A").await.unwrap_err();
        assert!(matches!(err, EmailJsError::TemplateNotConfigured(_)));
    }
}
