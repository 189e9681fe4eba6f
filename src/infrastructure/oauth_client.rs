use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::Client;

#[derive(Debug, Clone)]
pub struct OAuthCodeExchangeRequest {
    pub token_endpoint: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub authorization_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthTokenResponse {
    pub access_token: String,
    pub expires_in: Option<i64>,
    pub scope: Option<String>,
}

#[async_trait]
pub trait OAuthHttpClient: Send + Sync {
    async fn exchange_authorization_code(
        &self,
        request: OAuthCodeExchangeRequest,
    ) -> Result<OAuthTokenResponse, InfraError>;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestOAuthClient {
    client: Client,
}

#[derive(Debug, serde::Deserialize)]
struct GoogleTokenResponsePayload {
    access_token: Option<String>,
    expires_in: Option<i64>,
    scope: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl ReqwestOAuthClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

#[async_trait]
impl OAuthHttpClient for ReqwestOAuthClient {
    async fn exchange_authorization_code(
        &self,
        request: OAuthCodeExchangeRequest,
    ) -> Result<OAuthTokenResponse, InfraError> {
        let params = [
            ("grant_type", "authorization_code".to_string()),
            ("client_id", request.client_id),
            ("client_secret", request.client_secret),
            ("redirect_uri", request.redirect_uri),
            ("code", request.authorization_code),
        ];
        let response = self
            .client
            .post(&request.token_endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|error| InfraError::OAuth(format!("request failed: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::OAuth(format!("failed reading token response: {error}")))?;

        let parsed = serde_json::from_str::<GoogleTokenResponsePayload>(&body).map_err(|error| {
            InfraError::OAuth(format!("invalid token response payload: {error}; body={body}"))
        })?;

        if !status.is_success() || parsed.error.is_some() {
            let code = parsed.error.unwrap_or_else(|| format!("http_{}", status.as_u16()));
            let detail = parsed.error_description.unwrap_or(body);
            return Err(InfraError::OAuth(format!("token endpoint error: {code}; {detail}")));
        }

        let access_token = parsed
            .access_token
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| InfraError::OAuth("token response did not include access_token".to_string()))?;

        Ok(OAuthTokenResponse {
            access_token,
            expires_in: parsed.expires_in.map(|seconds| seconds.max(0)),
            scope: parsed.scope,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request_for(server: &MockServer) -> OAuthCodeExchangeRequest {
        OAuthCodeExchangeRequest {
            token_endpoint: format!("{}/token", server.uri()),
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            redirect_uri: "http://127.0.0.1:8080/oauth2/callback".to_string(),
            authorization_code: "auth-code".to_string(),
        }
    }

    #[tokio::test]
    async fn exchange_returns_access_token_and_scope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=auth-code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.token",
                "expires_in": 3599,
                "scope": "https://www.googleapis.com/auth/calendar.events",
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = ReqwestOAuthClient::new()
            .exchange_authorization_code(request_for(&server))
            .await
            .expect("exchange");
        assert_eq!(response.access_token, "ya29.token");
        assert_eq!(response.expires_in, Some(3599));
        assert_eq!(
            response.scope.as_deref(),
            Some("https://www.googleapis.com/auth/calendar.events")
        );
    }

    #[tokio::test]
    async fn exchange_surfaces_token_endpoint_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Bad Request"
            })))
            .mount(&server)
            .await;

        let error = ReqwestOAuthClient::new()
            .exchange_authorization_code(request_for(&server))
            .await
            .expect_err("invalid grant");
        assert!(error.to_string().contains("invalid_grant"));
    }
}
