use crate::domain::models::{CalendarCredential, Schedule};
use crate::infrastructure::config::CalendarSettings;
use crate::infrastructure::error::{InfraError, PushError};
use crate::infrastructure::event_mapper::encode_task_event;
use crate::infrastructure::google_calendar_client::GoogleCalendarClient;
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushReport {
    pub calendar_id: String,
    pub date: NaiveDate,
    pub event_ids: Vec<String>,
}

type CreateResult = (usize, Result<String, InfraError>);

pub struct CalendarPushService<C>
where
    C: GoogleCalendarClient + 'static,
{
    client: Arc<C>,
    calendar_id: String,
    time_zone: Tz,
    reminder_minutes: u32,
}

impl<C> CalendarPushService<C>
where
    C: GoogleCalendarClient + 'static,
{
    pub fn new(client: Arc<C>, settings: &CalendarSettings) -> Self {
        Self {
            client,
            calendar_id: settings.calendar_id.clone(),
            time_zone: settings.time_zone,
            reminder_minutes: settings.reminder_minutes,
        }
    }

    pub async fn push_with_credential(
        &self,
        schedule: &Schedule,
        credential: Option<&CalendarCredential>,
        date: NaiveDate,
    ) -> Result<PushReport, PushError> {
        let credential = credential
            .filter(|credential| credential.is_usable())
            .ok_or(PushError::NoToken)?;

        let events: Vec<_> = schedule
            .blocks()
            .iter()
            .filter_map(|block| {
                encode_task_event(block, date, self.time_zone, self.reminder_minutes)
            })
            .collect();
        if events.is_empty() {
            return Err(PushError::NoTasks);
        }

        let mut create_tasks: JoinSet<CreateResult> = JoinSet::new();
        for (index, event) in events.into_iter().enumerate() {
            let client = Arc::clone(&self.client);
            let access_token = credential.access_token.clone();
            let calendar_id = self.calendar_id.clone();
            create_tasks.spawn(async move {
                let created = client.create_event(&access_token, &calendar_id, &event).await;
                (index, created)
            });
        }

        let mut outcomes: Vec<Option<Result<String, PushError>>> = vec![None; create_tasks.len()];
        while let Some(joined) = create_tasks.join_next().await {
            match joined {
                Ok((index, created)) => {
                    if let Some(slot) = outcomes.get_mut(index) {
                        *slot = Some(created.map_err(PushError::from));
                    }
                }
                Err(error) => {
                    tracing::error!(error = %error, "calendar event creation task failed to join");
                }
            }
        }

        let report = collect_outcomes(outcomes);
        match report {
            Ok(event_ids) => {
                tracing::info!(
                    calendar_id = %self.calendar_id,
                    date = %date,
                    created = event_ids.len(),
                    "pushed schedule to calendar"
                );
                Ok(PushReport {
                    calendar_id: self.calendar_id.clone(),
                    date,
                    event_ids,
                })
            }
            Err((error, created)) => {
                tracing::warn!(
                    calendar_id = %self.calendar_id,
                    date = %date,
                    code = error.code(),
                    created_event_ids = ?created,
                    "calendar push failed; created events were kept"
                );
                Err(error)
            }
        }
    }
}

/// Folds per-request outcomes into the created ids, or the most severe
/// failure plus whatever was created anyway. Ties keep the earliest block.
fn collect_outcomes(
    outcomes: Vec<Option<Result<String, PushError>>>,
) -> Result<Vec<String>, (PushError, Vec<String>)> {
    let mut created = Vec::with_capacity(outcomes.len());
    let mut worst: Option<PushError> = None;
    for outcome in outcomes {
        let outcome = outcome.unwrap_or_else(|| {
            Err(PushError::ApiError("event creation did not complete".to_string()))
        });
        match outcome {
            Ok(event_id) => created.push(event_id),
            Err(error) => {
                let replace = worst
                    .as_ref()
                    .is_none_or(|current| error.severity() > current.severity());
                if replace {
                    worst = Some(error);
                }
            }
        }
    }
    match worst {
        Some(error) => Err((error, created)),
        None => Ok(created),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ScheduleBlock;
    use crate::infrastructure::event_mapper::GoogleCalendarEvent;
    use crate::infrastructure::google_calendar_client::ReqwestGoogleCalendarClient;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Barrier;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct FakeCalendarClient {
        failures: HashMap<String, InfraError>,
        created: Mutex<Vec<GoogleCalendarEvent>>,
    }

    impl FakeCalendarClient {
        fn failing(summary: &str, status: u16, message: &str) -> Self {
            let mut client = Self::default();
            client.fail_with(summary, status, message);
            client
        }

        fn fail_with(&mut self, summary: &str, status: u16, message: &str) {
            self.failures.insert(
                summary.to_string(),
                InfraError::CalendarHttp {
                    status,
                    message: message.to_string(),
                },
            );
        }

        fn created_summaries(&self) -> Vec<String> {
            let mut summaries: Vec<String> = self
                .created
                .lock()
                .expect("created mutex poisoned")
                .iter()
                .map(|event| event.summary.clone())
                .collect();
            summaries.sort();
            summaries
        }
    }

    #[async_trait]
    impl GoogleCalendarClient for FakeCalendarClient {
        async fn create_event(
            &self,
            _access_token: &str,
            _calendar_id: &str,
            event: &GoogleCalendarEvent,
        ) -> Result<String, InfraError> {
            if let Some(InfraError::CalendarHttp { status, message }) = self.failures.get(&event.summary) {
                return Err(InfraError::CalendarHttp {
                    status: *status,
                    message: message.clone(),
                });
            }
            self.created
                .lock()
                .expect("created mutex poisoned")
                .push(event.clone());
            Ok(format!("evt-{}", event.summary.to_lowercase()))
        }
    }

    fn settings() -> CalendarSettings {
        CalendarSettings {
            calendar_id: "primary".to_string(),
            time_zone: chrono_tz::Asia::Jerusalem,
            reminder_minutes: 5,
            api_base: "https://www.googleapis.com/calendar/v3/".to_string(),
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 28).expect("valid date")
    }

    fn three_task_schedule() -> Schedule {
        Schedule::from_blocks(vec![
            ScheduleBlock::task("Email", 540, 10),
            ScheduleBlock::rest("Break ☕", 550, 5),
            ScheduleBlock::task("Study", 555, 45),
            ScheduleBlock::rest("Break ☕", 600, 10),
            ScheduleBlock::task("Gym", 610, 60),
        ])
    }

    fn credential() -> CalendarCredential {
        CalendarCredential::new("token-123", None)
    }

    #[tokio::test]
    async fn missing_credential_fails_before_any_request() {
        let client = Arc::new(FakeCalendarClient::default());
        let service = CalendarPushService::new(Arc::clone(&client), &settings());

        let error = service
            .push_with_credential(&three_task_schedule(), None, date())
            .await
            .expect_err("no token");
        assert_eq!(error, PushError::NoToken);

        let blank = CalendarCredential::new("  ", None);
        let error = service
            .push_with_credential(&three_task_schedule(), Some(&blank), date())
            .await
            .expect_err("blank token");
        assert_eq!(error, PushError::NoToken);
        assert!(client.created_summaries().is_empty());
    }

    #[tokio::test]
    async fn schedule_without_tasks_is_rejected() {
        let client = Arc::new(FakeCalendarClient::default());
        let service = CalendarPushService::new(Arc::clone(&client), &settings());
        let only_breaks = Schedule::from_blocks(vec![ScheduleBlock::rest("Break ☕", 540, 5)]);

        for schedule in [Schedule::new(), only_breaks] {
            let error = service
                .push_with_credential(&schedule, Some(&credential()), date())
                .await
                .expect_err("no tasks");
            assert_eq!(error, PushError::NoTasks);
        }
        assert!(client.created_summaries().is_empty());
    }

    #[tokio::test]
    async fn pushes_only_task_blocks_in_schedule_order() {
        let client = Arc::new(FakeCalendarClient::default());
        let service = CalendarPushService::new(Arc::clone(&client), &settings());

        let report = service
            .push_with_credential(&three_task_schedule(), Some(&credential()), date())
            .await
            .expect("push");
        assert_eq!(report.event_ids, vec!["evt-email", "evt-study", "evt-gym"]);
        assert_eq!(report.calendar_id, "primary");
        assert_eq!(client.created_summaries(), vec!["Email", "Gym", "Study"]);
    }

    #[tokio::test]
    async fn single_unauthorized_request_fails_the_push_and_keeps_others() {
        let client = Arc::new(FakeCalendarClient::failing("Study", 401, "Invalid Credentials"));
        let service = CalendarPushService::new(Arc::clone(&client), &settings());

        let error = service
            .push_with_credential(&three_task_schedule(), Some(&credential()), date())
            .await
            .expect_err("unauthorized");
        assert_eq!(error, PushError::TokenExpired);
        assert_eq!(client.created_summaries(), vec!["Email", "Gym"]);
    }

    #[tokio::test]
    async fn expired_token_outranks_other_failures() {
        let mut fake = FakeCalendarClient::failing("Email", 400, "Bad Request");
        fake.fail_with("Study", 403, "Insufficient Permission");
        fake.fail_with("Gym", 401, "Invalid Credentials");
        let service = CalendarPushService::new(Arc::new(fake), &settings());

        let error = service
            .push_with_credential(&three_task_schedule(), Some(&credential()), date())
            .await
            .expect_err("failures");
        assert_eq!(error, PushError::TokenExpired);
    }

    #[tokio::test]
    async fn first_api_error_in_block_order_wins() {
        let mut fake = FakeCalendarClient::failing("Study", 400, "Bad Request");
        fake.fail_with("Gym", 500, "Backend Error");
        let service = CalendarPushService::new(Arc::new(fake), &settings());

        let error = service
            .push_with_credential(&three_task_schedule(), Some(&credential()), date())
            .await
            .expect_err("failures");
        assert_eq!(error, PushError::ApiError("Bad Request".to_string()));
        assert_eq!(error.to_string(), "API_ERROR: Bad Request");
    }

    struct RendezvousCalendarClient {
        barrier: Barrier,
    }

    #[async_trait]
    impl GoogleCalendarClient for RendezvousCalendarClient {
        async fn create_event(
            &self,
            _access_token: &str,
            _calendar_id: &str,
            event: &GoogleCalendarEvent,
        ) -> Result<String, InfraError> {
            self.barrier.wait().await;
            Ok(format!("evt-{}", event.summary.to_lowercase()))
        }
    }

    #[tokio::test]
    async fn create_requests_are_in_flight_together() {
        let client = Arc::new(RendezvousCalendarClient {
            barrier: Barrier::new(3),
        });
        let service = CalendarPushService::new(client, &settings());

        let report = tokio::time::timeout(
            Duration::from_secs(5),
            service.push_with_credential(&three_task_schedule(), Some(&credential()), date()),
        )
        .await
        .expect("all three creates must be pending at once")
        .expect("push");
        assert_eq!(report.event_ids, vec!["evt-email", "evt-study", "evt-gym"]);
    }

    #[tokio::test]
    async fn posts_events_with_zone_offset_and_popup_reminder() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendar/v3/calendars/primary/events"))
            .and(body_partial_json(serde_json::json!({
                "summary": "Study",
                "start": { "dateTime": "2026-02-28T09:00:00+02:00", "timeZone": "Asia/Jerusalem" },
                "end": { "dateTime": "2026-02-28T09:45:00+02:00", "timeZone": "Asia/Jerusalem" },
                "reminders": {
                    "useDefault": false,
                    "overrides": [{ "method": "popup", "minutes": 5 }]
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "evt-1"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = ReqwestGoogleCalendarClient::with_api_base(&format!("{}/calendar/v3/", server.uri()))
            .expect("valid base");
        let service = CalendarPushService::new(Arc::new(client), &settings());
        let schedule = Schedule::from_blocks(vec![
            ScheduleBlock::task("Study", 540, 45),
            ScheduleBlock::rest("Break ☕", 585, 10),
        ]);

        let report = service
            .push_with_credential(&schedule, Some(&credential()), date())
            .await
            .expect("push");
        assert_eq!(report.event_ids, vec!["evt-1"]);
    }
}
