use std::fmt;

use anyhow::{anyhow, Result};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

/// Non-success response from the booking API.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: Option<String>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "API error ({}): {}", self.status, message),
            None => write!(f, "API error ({})", self.status),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// Pulls the human-readable message out of an error response body.
    pub fn from_body(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|json| {
                json.get("message")
                    .and_then(Value::as_str)
                    .or_else(|| json.pointer("/error/message").and_then(Value::as_str))
                    .or_else(|| json.get("error").and_then(Value::as_str))
                    .map(str::to_string)
            })
            .or_else(|| {
                let trimmed = body.trim();
                (!trimmed.is_empty() && !trimmed.starts_with('{')).then(|| trimmed.to_string())
            });

        Self { status, message }
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self.status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
    }
}

/// Backend message carried by an error returned from [`ApiClient::request`], if any.
pub fn api_error_message(err: &anyhow::Error) -> Option<String> {
    err.downcast_ref::<ApiError>().and_then(|e| e.message.clone())
}

pub struct ApiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ApiClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        if !self.api_key.is_empty() {
            headers.insert("apikey", HeaderValue::from_str(&self.api_key)?);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }

        Ok(headers)
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        if self.base_url.is_empty() {
            return Err(anyhow!("Booking API URL is not configured"));
        }

        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let headers = self.get_headers(auth_token)?;

        let mut req = self.client.request(method, &url).headers(headers);

        if !query.is_empty() {
            req = req.query(query);
        }

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("API error ({}): {}", status, error_text);
            return Err(ApiError::from_body(status, &error_text).into());
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_field_is_extracted() {
        let err = ApiError::from_body(
            StatusCode::CONFLICT,
            r#"{"message":"Time slot is no longer available"}"#,
        );
        assert_eq!(err.message.as_deref(), Some("Time slot is no longer available"));
    }

    #[test]
    fn nested_error_message_is_extracted() {
        let err = ApiError::from_body(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"message":"Invalid doctor","code":"bad_doctor"}}"#,
        );
        assert_eq!(err.message.as_deref(), Some("Invalid doctor"));
    }

    #[test]
    fn empty_body_has_no_message() {
        let err = ApiError::from_body(StatusCode::INTERNAL_SERVER_ERROR, "");
        assert!(err.message.is_none());
        assert_eq!(err.to_string(), "API error (500 Internal Server Error)");
    }

    #[test]
    fn message_survives_anyhow_wrapping() {
        let err: anyhow::Error = ApiError::from_body(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"message":"Doctor unavailable"}"#,
        )
        .into();
        assert_eq!(api_error_message(&err).as_deref(), Some("Doctor unavailable"));
    }
}
