//! Templated email endpoints backed by EmailJS.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use qui_core::Email;

use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::services::emailjs::EmailJsClient;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EmailRequest {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct EmailSent {
    pub success: bool,
    pub message: &'static str,
}

fn emailjs(state: &AppState) -> Result<&EmailJsClient> {
    state
        .emailjs()
        .ok_or_else(|| AppError::ServiceUnavailable("Email service is not configured".to_string()))
}

fn recipient(raw: &str) -> Result<Email> {
    Email::parse(raw).map_err(|_| AppError::BadRequest("A valid email is required".to_string()))
}

/// Send the welcome email to a newly signed-up user.
///
/// The address defaults to the one on the caller's token.
#[instrument(skip_all, fields(user = %user.uid))]
pub async fn send_welcome(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    payload: std::result::Result<Json<EmailRequest>, JsonRejection>,
) -> Result<Json<EmailSent>> {
    let Json(request) = payload?;
    let client = emailjs(&state)?;

    let email = if request.email.trim().is_empty() {
        user.email.clone().unwrap_or_default()
    } else {
        request.email
    };
    let to = recipient(&email)?;
    let name = if request.name.trim().is_empty() {
        user.name.clone().unwrap_or_default()
    } else {
        request.name.trim().to_string()
    };

    client.send_welcome(to.as_str(), &name).await?;
    info!("Welcome email sent");

    Ok(Json(EmailSent {
        success: true,
        message: "Welcome email sent",
    }))
}

/// Acknowledge a contact form submission.
#[instrument(skip_all)]
pub async fn send_auto_reply(
    State(state): State<AppState>,
    payload: std::result::Result<Json<EmailRequest>, JsonRejection>,
) -> Result<Json<EmailSent>> {
    let Json(request) = payload?;
    let client = emailjs(&state)?;
    let to = recipient(&request.email)?;

    client.send_auto_reply(to.as_str(), request.name.trim()).await?;

    Ok(Json(EmailSent {
        success: true,
        message: "Auto-reply sent",
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode, header::CONTENT_TYPE},
        routing::post,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::config::tests::test_config;
    use crate::state::tests::test_state;

    #[tokio::test]
    async fn test_auto_reply_unconfigured() {
        let app = Router::new()
            .route("/api/contact/auto-reply", post(send_auto_reply))
            .with_state(test_state(test_config()));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/contact/auto-reply")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"email":"a@qui.test","name":"A"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Email service is not configured");
    }

    #[test]
    fn test_recipient_validation() {
        assert!(recipient("ada@qui.test").is_ok());
        assert!(matches!(recipient("nope"), Err(AppError::BadRequest(_))));
    }
}
