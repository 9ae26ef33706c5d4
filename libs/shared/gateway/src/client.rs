use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;
use shared_models::error::GatewayError;

/// JSON REST client for the clinic backend.
///
/// Every call carries the bearer credential handed in by the caller; the client
/// holds no identity of its own.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_base_url(&config.api_url)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap, GatewayError> {
        let mut headers = HeaderMap::new();

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token.filter(|t| !t.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| GatewayError::Http("Bearer token contains invalid header characters".to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str,
                            auth_token: Option<&str>, body: Option<Value>)
                            -> Result<T, GatewayError>
    where T: DeserializeOwned {
        self.request_with_query(method, path, &[], auth_token, body).await
    }

    pub async fn request_with_query<T>(&self, method: Method, path: &str,
                                       query: &[(&str, String)],
                                       auth_token: Option<&str>, body: Option<Value>)
                                       -> Result<T, GatewayError>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let headers = self.get_headers(auth_token)?;

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if !query.is_empty() {
            req = req.query(query);
        }

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await
            .map_err(|e| GatewayError::Http(e.to_string()))?;

        let status = response.status();
        let text = response.text().await
            .map_err(|e| GatewayError::Http(e.to_string()))?;

        if !status.is_success() {
            error!("API error ({}): {}", status, text);
            let message = extract_server_message(&text);

            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Unauthorized {
                    status: status.as_u16(),
                    message,
                },
                _ => GatewayError::Status {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        // DELETE and some PATCH endpoints answer with an empty body.
        let value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str::<Value>(&text)
                .map_err(|e| GatewayError::Decode(e.to_string()))?
        };

        serde_json::from_value(value).map_err(|e| GatewayError::Decode(e.to_string()))
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}

/// Pull a human-readable message out of an error body.
///
/// Understands `{"message": ..}`, `{"error": ".."}` and `{"error": {"message": ..}}`;
/// a non-JSON body is returned as-is.
pub fn extract_server_message(body: &str) -> String {
    let trimmed = body.trim();
    let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
        return trimmed.to_string();
    };

    let candidates = [
        value.get("message"),
        value.get("error"),
        value.get("error").and_then(|e| e.get("message")),
        value.get("msg"),
    ];

    let message = candidates
        .into_iter()
        .flatten()
        .find_map(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_server_message_shapes() {
        assert_eq!(extract_server_message(r#"{"message":"Cita no encontrada"}"#), "Cita no encontrada");
        assert_eq!(extract_server_message(r#"{"error":"Token inválido"}"#), "Token inválido");
        assert_eq!(extract_server_message(r#"{"error":{"message":"Sin permisos","code":"403"}}"#), "Sin permisos");
        assert_eq!(extract_server_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(extract_server_message(r#"{"success":false}"#), "");
        assert_eq!(extract_server_message(""), "");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = GatewayClient::with_base_url("http://localhost:3000/api/");
        assert_eq!(client.get_base_url(), "http://localhost:3000/api");
    }
}
