//! Search by photo: Gemini names the product, the client searches for it.

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
};
use serde::Serialize;
use tracing::{info, instrument};

use crate::error::{AppError, Result};
use crate::services::gemini::DEFAULT_MIME_TYPE;
use crate::state::AppState;

/// Largest accepted upload.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

const IMAGE_FIELD: &str = "image";

#[derive(Debug, Serialize)]
pub struct KeywordResponse {
    pub keyword: String,
}

fn no_image() -> AppError {
    AppError::BadRequest("No image uploaded".to_string())
}

/// Extract a product keyword from the multipart field `image`.
#[instrument(skip_all)]
pub async fn search_by_image(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<KeywordResponse>> {
    let gemini = state
        .gemini()
        .ok_or_else(|| AppError::ServiceUnavailable("Gemini is not configured".to_string()))?;
    let mut multipart = multipart.map_err(|_| no_image())?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(|_| no_image())? {
        if field.name() == Some(IMAGE_FIELD) {
            let mime_type = field
                .content_type()
                .filter(|m| m.starts_with("image/"))
                .unwrap_or(DEFAULT_MIME_TYPE)
                .to_string();
            let bytes = field.bytes().await.map_err(|_| no_image())?;
            upload = Some((bytes, mime_type));
            break;
        }
    }

    let (bytes, mime_type) = upload.filter(|(b, _)| !b.is_empty()).ok_or_else(no_image)?;
    let keyword = gemini.extract_keyword(&bytes, &mime_type).await?;
    info!(keyword = %keyword, "Image keyword extracted");

    Ok(Json(KeywordResponse { keyword }))
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
    use secrecy::SecretString;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::config::{GeminiConfig, tests::test_config};
    use crate::state::tests::test_state;

    async fn post_multipart(configured: bool, body: &'static str) -> (StatusCode, Value) {
        let mut config = test_config();
        if configured {
            config.gemini = Some(GeminiConfig {
                api_key: SecretString::from("test-gemini-key"),
                model: "gemini-2.0-flash".to_string(),
                api_base: "http://127.0.0.1:9".to_string(),
            });
        }
        let app = Router::new()
            .route("/api/search-by-image", post(search_by_image))
            .with_state(test_state(config));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/search-by-image")
                    .header(CONTENT_TYPE, "multipart/form-data; boundary=XBOUNDARY")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    const OTHER_FIELD: &str = "--XBOUNDARY\r\n\
        Content-Disposition: form-data; name=\"note\"\r\n\r\n\
        hello\r\n\
        --XBOUNDARY--\r\n";

    #[tokio::test]
    async fn test_unconfigured_returns_503() {
        let (status, body) = post_multipart(false, OTHER_FIELD).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "Gemini is not configured");
    }

    #[tokio::test]
    async fn test_missing_image_field() {
        let (status, body) = post_multipart(true, OTHER_FIELD).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No image uploaded");
    }
}
