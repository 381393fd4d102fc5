use axum::{
    async_trait,
    body::Bytes,
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::header,
    Json,
};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ApiError;

/// Raw JSON request body. Malformed or non-JSON bodies become an
/// `INVALID_JSON` envelope instead of axum's plain-text rejection.
#[derive(Debug, Clone)]
pub struct Payload(pub Value);

#[async_trait]
impl<S> FromRequest<S> for Payload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<Value>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Payload(value)),
            Err(JsonRejection::MissingJsonContentType(_)) => {
                Err(ApiError::invalid_json("Expected Content-Type: application/json"))
            }
            Err(rejection) => {
                tracing::debug!("Rejected request body: {}", rejection.body_text());
                Err(ApiError::invalid_json("Request body is not valid JSON"))
            }
        }
    }
}

/// JSON body that may be left out. Only an empty body reads as `None`;
/// anything else must be `application/json` and parse, like [`Payload`].
#[derive(Debug, Clone)]
pub struct OptionalPayload(pub Option<Value>);

fn is_json(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    essence == "application/json" || (essence.starts_with("application/") && essence.ends_with("+json"))
}

#[async_trait]
impl<S> FromRequest<S> for OptionalPayload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
            tracing::debug!("Unreadable request body: {}", rejection.body_text());
            ApiError::invalid_json("Request body could not be read")
        })?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(OptionalPayload(None));
        }
        if !content_type.as_deref().is_some_and(is_json) {
            return Err(ApiError::invalid_json("Expected Content-Type: application/json"));
        }
        let value = serde_json::from_slice(&bytes).map_err(|e| {
            tracing::debug!("Rejected request body: {}", e);
            ApiError::invalid_json("Request body is not valid JSON")
        })?;
        Ok(OptionalPayload(Some(value)))
    }
}

/// Path ids that are not UUIDs cannot name any row
pub fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found("Record not found"))
}
