use crate::infrastructure::config::DEFAULT_CALENDAR_API_BASE;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::event_mapper::GoogleCalendarEvent;
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

const UNKNOWN_API_ERROR: &str = "Unknown error";

#[async_trait]
pub trait GoogleCalendarClient: Send + Sync {
    async fn create_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &GoogleCalendarEvent,
    ) -> Result<String, InfraError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestGoogleCalendarClient {
    client: Client,
    api_base: String,
}

impl ReqwestGoogleCalendarClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            api_base: DEFAULT_CALENDAR_API_BASE.to_string(),
        }
    }

    pub fn with_api_base(api_base: &str) -> Result<Self, InfraError> {
        let client = Self {
            client: Client::new(),
            api_base: api_base.trim().to_string(),
        };
        client.parsed_api_base()?;
        Ok(client)
    }

    fn parsed_api_base(&self) -> Result<Url, InfraError> {
        let url = Url::parse(&self.api_base).map_err(|error| {
            InfraError::InvalidConfig(format!("invalid calendar api base url '{}': {error}", self.api_base))
        })?;
        if url.cannot_be_a_base() {
            return Err(InfraError::InvalidConfig(format!(
                "calendar api base url '{}' cannot be a base",
                self.api_base
            )));
        }
        Ok(url)
    }

    fn ensure_non_empty(value: &str, field: &str) -> Result<(), InfraError> {
        if value.trim().is_empty() {
            return Err(InfraError::InvalidConfig(format!("{field} must not be empty")));
        }
        Ok(())
    }

    fn events_endpoint(&self, calendar_id: &str) -> Result<Url, InfraError> {
        let mut url = self.parsed_api_base()?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                InfraError::InvalidConfig("calendar api base URL cannot be a base".to_string())
            })?;
            segments.pop_if_empty();
            segments.push("calendars");
            segments.push(calendar_id);
            segments.push("events");
        }
        Ok(url)
    }
}

impl Default for ReqwestGoogleCalendarClient {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, serde::Deserialize)]
struct ApiErrorEnvelope {
    error: Option<ApiErrorBody>,
}

#[derive(Debug, serde::Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct CreatedEventResponse {
    id: Option<String>,
}

pub fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error)
        .and_then(|error| error.message)
        .map(|message| message.trim().to_string())
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| UNKNOWN_API_ERROR.to_string())
}

#[async_trait]
impl GoogleCalendarClient for ReqwestGoogleCalendarClient {
    async fn create_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &GoogleCalendarEvent,
    ) -> Result<String, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(calendar_id, "calendar id")?;

        let endpoint = self.events_endpoint(calendar_id)?;
        let response = self
            .client
            .post(endpoint)
            .bearer_auth(access_token)
            .json(event)
            .send()
            .await
            .map_err(|error| InfraError::Network(format!("network error while creating event: {error}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Network(format!("failed reading event create response: {error}")))?;

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), body = %body, "calendar api rejected event");
            return Err(InfraError::CalendarHttp {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        let parsed: CreatedEventResponse = serde_json::from_str(&body).map_err(|error| {
            InfraError::CalendarHttp {
                status: status.as_u16(),
                message: format!("invalid event create payload: {error}"),
            }
        })?;
        parsed
            .id
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                tracing::warn!(status = status.as_u16(), "calendar api created an event without an id");
                InfraError::CalendarHttp {
                    status: status.as_u16(),
                    message: "event create response did not include an id".to_string(),
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::event_mapper::{CalendarEventDateTime, EventReminders};
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_event() -> GoogleCalendarEvent {
        GoogleCalendarEvent {
            id: None,
            summary: "Study".to_string(),
            start: CalendarEventDateTime {
                date_time: "2026-02-28T09:00:00+02:00".to_string(),
                time_zone: "Asia/Jerusalem".to_string(),
            },
            end: CalendarEventDateTime {
                date_time: "2026-02-28T09:45:00+02:00".to_string(),
                time_zone: "Asia/Jerusalem".to_string(),
            },
            reminders: EventReminders::popup(5),
        }
    }

    fn client_for(server: &MockServer) -> ReqwestGoogleCalendarClient {
        ReqwestGoogleCalendarClient::with_api_base(&format!("{}/calendar/v3/", server.uri()))
            .expect("valid base")
    }

    #[test]
    fn events_endpoint_appends_calendar_segments() {
        let client = ReqwestGoogleCalendarClient::new();
        let url = client.events_endpoint("primary").expect("endpoint");
        assert_eq!(
            url.as_str(),
            "https://www.googleapis.com/calendar/v3/calendars/primary/events"
        );

        let encoded = client.events_endpoint("team@group.calendar").expect("endpoint");
        assert!(encoded.as_str().ends_with("/calendars/team@group.calendar/events"));
    }

    #[test]
    fn api_error_message_falls_back_when_body_is_not_json() {
        assert_eq!(
            api_error_message(r#"{"error":{"code":400,"message":"Bad Request"}}"#),
            "Bad Request"
        );
        assert_eq!(api_error_message("<html>oops</html>"), UNKNOWN_API_ERROR);
        assert_eq!(api_error_message(r#"{"error":{}}"#), UNKNOWN_API_ERROR);
    }

    #[tokio::test]
    async fn create_event_posts_bearer_authenticated_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendar/v3/calendars/primary/events"))
            .and(header("authorization", "Bearer token-123"))
            .and(body_partial_json(serde_json::json!({
                "summary": "Study",
                "reminders": { "useDefault": false }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "evt-1"})))
            .expect(1)
            .mount(&server)
            .await;

        let id = client_for(&server)
            .create_event("token-123", "primary", &sample_event())
            .await
            .expect("create event");
        assert_eq!(id, "evt-1");
    }

    #[tokio::test]
    async fn create_event_reports_status_and_upstream_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": { "code": 403, "message": "Insufficient Permission" }
            })))
            .mount(&server)
            .await;

        let error = client_for(&server)
            .create_event("token-123", "primary", &sample_event())
            .await
            .expect_err("forbidden");
        match error {
            InfraError::CalendarHttp { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "Insufficient Permission");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn create_event_rejects_blank_token_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let result = client_for(&server)
            .create_event("  ", "primary", &sample_event())
            .await;
        assert!(matches!(result, Err(InfraError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn create_event_without_id_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "confirmed"})))
            .mount(&server)
            .await;

        let error = client_for(&server)
            .create_event("token-123", "primary", &sample_event())
            .await
            .expect_err("missing id");
        match error {
            InfraError::CalendarHttp { status, message } => {
                assert_eq!(status, 200);
                assert!(message.contains("did not include an id"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
