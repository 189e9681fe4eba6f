use crate::domain::models::CalendarCredential;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::oauth_client::{OAuthCodeExchangeRequest, OAuthHttpClient};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use url::Url;

const DEFAULT_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const CALENDAR_EVENTS_SCOPE: &str = "https://www.googleapis.com/auth/calendar.events";
const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub token_endpoint: String,
    pub authorization_endpoint: String,
}

impl OAuthConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            token_endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
            authorization_endpoint: DEFAULT_AUTHORIZATION_ENDPOINT.to_string(),
        }
    }
}

type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct CalendarAuthorizer<C>
where
    C: OAuthHttpClient,
{
    config: OAuthConfig,
    oauth_client: Arc<C>,
    now_provider: NowProvider,
}

impl<C> CalendarAuthorizer<C>
where
    C: OAuthHttpClient,
{
    pub fn new(config: OAuthConfig, oauth_client: Arc<C>) -> Self {
        Self {
            config,
            oauth_client,
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn build_consent_url(&self, state: &str) -> Result<String, InfraError> {
        if state.trim().is_empty() {
            return Err(InfraError::OAuth("state must not be empty".to_string()));
        }

        let mut url = Url::parse(&self.config.authorization_endpoint)
            .map_err(|error| InfraError::OAuth(format!("invalid authorization endpoint: {error}")))?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("scope", CALENDAR_EVENTS_SCOPE)
            .append_pair("prompt", "consent")
            .append_pair("state", state);

        Ok(url.to_string())
    }

    pub async fn exchange_code(&self, authorization_code: &str) -> Result<CalendarCredential, InfraError> {
        if authorization_code.trim().is_empty() {
            return Err(InfraError::OAuth("authorization code must not be empty".to_string()));
        }

        let response = self
            .oauth_client
            .exchange_authorization_code(OAuthCodeExchangeRequest {
                token_endpoint: self.config.token_endpoint.clone(),
                client_id: self.config.client_id.clone(),
                client_secret: self.config.client_secret.clone(),
                redirect_uri: self.config.redirect_uri.clone(),
                authorization_code: authorization_code.trim().to_string(),
            })
            .await?;

        let credential = CalendarCredential {
            access_token: response.access_token,
            scope: response.scope.or_else(|| Some(CALENDAR_EVENTS_SCOPE.to_string())),
            expires_at: response
                .expires_in
                .map(|seconds| (self.now_provider)() + Duration::seconds(seconds)),
        };
        if !credential.has_scope(CALENDAR_EVENTS_SCOPE) && !credential.has_scope(CALENDAR_SCOPE) {
            return Err(InfraError::OAuth(format!(
                "calendar access was not granted (scope: {})",
                credential.scope.as_deref().unwrap_or_default()
            )));
        }
        Ok(credential)
    }
}
