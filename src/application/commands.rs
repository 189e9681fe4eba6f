use crate::application::bootstrap::bootstrap_workspace;
use crate::application::calendar_push::{CalendarPushService, PushReport};
use crate::application::calendar_session::CalendarSession;
use crate::application::editor::ScheduleEditor;
use crate::application::oauth::{CalendarAuthorizer, OAuthConfig};
use crate::domain::clock::format_minutes;
use crate::domain::models::{PresetTask, SavedSchedule, Schedule, ScheduleBlock, Task};
use crate::infrastructure::config::{
    read_break_title, read_calendar_settings, read_default_start_time, read_preset_tasks,
    read_time_zone,
};
use crate::infrastructure::error::{InfraError, PushError};
use crate::infrastructure::google_calendar_client::ReqwestGoogleCalendarClient;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::oauth_client::{OAuthHttpClient, ReqwestOAuthClient};
use crate::infrastructure::schedule_repository::{
    SavedScheduleRepository, SqliteSavedScheduleRepository,
};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing_appender::non_blocking::WorkerGuard;

const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8080/oauth2/callback";

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id(prefix: &str) -> String {
    let sequence = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{}-{sequence}", Utc::now().timestamp_micros())
}

pub struct AppState {
    config_dir: PathBuf,
    database_path: PathBuf,
    current_user: String,
    editor: Mutex<ScheduleEditor>,
    calendar: Mutex<CalendarSession>,
    schedules: Arc<dyn SavedScheduleRepository>,
    push_in_flight: AtomicBool,
    _log_guard: WorkerGuard,
}

impl AppState {
    pub fn new(workspace_root: PathBuf, current_user: impl Into<String>) -> Result<Self, InfraError> {
        let current_user = current_user.into().trim().to_string();
        if current_user.is_empty() {
            return Err(InfraError::InvalidConfig("current_user must not be empty".to_string()));
        }

        let paths = bootstrap_workspace(&workspace_root)?;
        let log_guard = init_logging(&paths.logs_dir)?;
        let editor = ScheduleEditor::new(
            &read_default_start_time(&paths.config_dir)?,
            read_break_title(&paths.config_dir)?,
        )
        .map_err(InfraError::InvalidConfig)?;

        Ok(Self {
            schedules: Arc::new(SqliteSavedScheduleRepository::new(&paths.database_path)),
            config_dir: paths.config_dir,
            database_path: paths.database_path,
            current_user,
            editor: Mutex::new(editor),
            calendar: Mutex::new(CalendarSession::new()),
            push_in_flight: AtomicBool::new(false),
            _log_guard: log_guard,
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn current_user(&self) -> &str {
        &self.current_user
    }

    pub fn command_error(&self, command: &str, error: InfraError) -> InfraError {
        match &error {
            InfraError::Push(push) => tracing::warn!(
                command,
                user = %self.current_user,
                code = push.code(),
                error = %push,
                "command failed"
            ),
            other => tracing::error!(command, user = %self.current_user, error = %other, "command failed"),
        }
        error
    }

    pub fn log_info(&self, command: &str, message: &str) {
        tracing::info!(command, user = %self.current_user, "{message}");
    }

    fn rejected<'a>(&'a self, command: &'a str) -> impl Fn(String) -> InfraError + 'a {
        move |message| self.command_error(command, InfraError::InvalidConfig(message))
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BlockView {
    #[serde(flatten)]
    pub block: ScheduleBlock,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleView {
    pub tasks: Vec<Task>,
    pub start_time: String,
    pub day_name: String,
    pub editing_id: Option<String>,
    pub blocks: Vec<BlockView>,
    pub total_task_minutes: u32,
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectCalendarResponse {
    pub connected: bool,
    pub consent_url: Option<String>,
}

fn schedule_view(editor: &ScheduleEditor) -> ScheduleView {
    ScheduleView {
        tasks: editor.tasks().to_vec(),
        start_time: editor.start_time().to_string(),
        day_name: editor.day_name().to_string(),
        editing_id: editor.editing_id().map(ToOwned::to_owned),
        blocks: editor
            .schedule()
            .blocks()
            .iter()
            .map(|block| BlockView {
                block: block.clone(),
                start_time: format_minutes(block.start),
                end_time: format_minutes(block.end),
            })
            .collect(),
        total_task_minutes: editor.total_task_minutes(),
        end_time: editor.end_minute().map(format_minutes),
    }
}

fn lock_editor(state: &AppState) -> Result<MutexGuard<'_, ScheduleEditor>, InfraError> {
    state
        .editor
        .lock()
        .map_err(|error| InfraError::InvalidConfig(format!("editor lock poisoned: {error}")))
}

fn lock_calendar(state: &AppState) -> Result<MutexGuard<'_, CalendarSession>, InfraError> {
    state
        .calendar
        .lock()
        .map_err(|error| InfraError::InvalidConfig(format!("calendar session lock poisoned: {error}")))
}

fn parse_date_input(value: &str, field_name: &str) -> Result<NaiveDate, InfraError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|error| InfraError::InvalidConfig(format!("{field_name} must be YYYY-MM-DD: {error}")))
}

fn today_in_configured_zone(config_dir: &Path) -> Result<NaiveDate, InfraError> {
    let time_zone = read_time_zone(config_dir)?;
    Ok(Utc::now().with_timezone(&time_zone).date_naive())
}

fn normalized_id<'a>(value: &'a str, field_name: &str) -> Result<&'a str, InfraError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(InfraError::InvalidConfig(format!("{field_name} must not be empty")));
    }
    Ok(value)
}

pub fn add_task_impl(state: &AppState, name: String, duration: u32) -> Result<ScheduleView, InfraError> {
    let mut editor = lock_editor(state)?;
    let task = editor
        .add_task(&name, duration)
        .map_err(state.rejected("add_task"))?
        .clone();
    state.log_info("add_task", &format!("added '{}' ({} min)", task.name, task.duration));
    Ok(schedule_view(&editor))
}

pub fn list_preset_tasks_impl(state: &AppState) -> Result<Vec<PresetTask>, InfraError> {
    read_preset_tasks(state.config_dir()).map_err(|error| state.command_error("list_preset_tasks", error))
}

pub fn add_preset_task_impl(state: &AppState, preset_name: String) -> Result<ScheduleView, InfraError> {
    let presets = list_preset_tasks_impl(state)?;
    let wanted = preset_name.trim();
    let preset = presets
        .iter()
        .find(|preset| preset.name == wanted)
        .ok_or_else(|| {
            state.command_error(
                "add_preset_task",
                InfraError::NotFound(format!("preset '{wanted}'")),
            )
        })?;

    let mut editor = lock_editor(state)?;
    editor.add_preset(preset).map_err(state.rejected("add_preset_task"))?;
    state.log_info("add_preset_task", &format!("added preset '{}'", preset.name));
    Ok(schedule_view(&editor))
}

pub fn remove_task_impl(state: &AppState, index: usize) -> Result<ScheduleView, InfraError> {
    let mut editor = lock_editor(state)?;
    let removed = editor.remove_task(index).map_err(state.rejected("remove_task"))?;
    state.log_info("remove_task", &format!("removed '{}'", removed.name));
    Ok(schedule_view(&editor))
}

pub fn update_task_impl(
    state: &AppState,
    index: usize,
    name: Option<String>,
    duration: Option<u32>,
) -> Result<ScheduleView, InfraError> {
    let mut editor = lock_editor(state)?;
    let updated = editor
        .update_task(index, name.as_deref(), duration)
        .map_err(state.rejected("update_task"))?;
    if !updated {
        state.log_info("update_task", &format!("edit of task {index} cancelled"));
    }
    Ok(schedule_view(&editor))
}

pub fn set_start_time_impl(state: &AppState, start_time: String) -> Result<ScheduleView, InfraError> {
    let mut editor = lock_editor(state)?;
    editor
        .set_start_time(&start_time)
        .map_err(state.rejected("set_start_time"))?;
    Ok(schedule_view(&editor))
}

pub fn set_day_name_impl(state: &AppState, day_name: String) -> Result<ScheduleView, InfraError> {
    let mut editor = lock_editor(state)?;
    editor.set_day_name(&day_name);
    Ok(schedule_view(&editor))
}

pub fn randomize_impl(state: &AppState) -> Result<ScheduleView, InfraError> {
    let mut editor = lock_editor(state)?;
    let blocks = editor.randomize().len();
    state.log_info("randomize", &format!("generated {blocks} blocks"));
    Ok(schedule_view(&editor))
}

pub fn reorder_schedule_impl(
    state: &AppState,
    from_block: usize,
    to_block: usize,
) -> Result<ScheduleView, InfraError> {
    let mut editor = lock_editor(state)?;
    editor.reorder_blocks(from_block, to_block);
    Ok(schedule_view(&editor))
}

pub fn edit_break_impl(
    state: &AppState,
    block_index: usize,
    duration: Option<u32>,
) -> Result<ScheduleView, InfraError> {
    let mut editor = lock_editor(state)?;
    editor.edit_break(block_index, duration);
    Ok(schedule_view(&editor))
}

pub fn current_schedule_impl(state: &AppState) -> Result<ScheduleView, InfraError> {
    let editor = lock_editor(state)?;
    Ok(schedule_view(&editor))
}

pub fn save_schedule_impl(state: &AppState) -> Result<SavedSchedule, InfraError> {
    let date = today_in_configured_zone(state.config_dir())
        .map_err(|error| state.command_error("save_schedule", error))?;
    let mut editor = lock_editor(state)?;
    let record = editor.snapshot(date, Utc::now());
    record.validate().map_err(state.rejected("save_schedule"))?;

    let id = match editor.editing_id() {
        Some(id) => {
            state
                .schedules
                .update(state.current_user(), id, &record)
                .map_err(|error| state.command_error("save_schedule", error))?;
            id.to_string()
        }
        None => state
            .schedules
            .create(state.current_user(), &record)
            .map_err(|error| state.command_error("save_schedule", error))?,
    };

    editor.reset();
    state.log_info("save_schedule", &format!("saved schedule {id} for {}", record.date));
    Ok(SavedSchedule { id, record })
}

pub fn list_saved_schedules_impl(state: &AppState) -> Result<Vec<SavedSchedule>, InfraError> {
    state
        .schedules
        .list(state.current_user())
        .map_err(|error| state.command_error("list_saved_schedules", error))
}

pub fn load_saved_schedule_impl(state: &AppState, id: String) -> Result<ScheduleView, InfraError> {
    let saved = find_saved_schedule(state, &id)
        .map_err(|error| state.command_error("load_saved_schedule", error))?;

    let mut editor = lock_editor(state)?;
    editor.load(&saved);
    state.log_info("load_saved_schedule", &format!("editing saved schedule {}", saved.id));
    Ok(schedule_view(&editor))
}

pub fn delete_saved_schedule_impl(state: &AppState, id: String) -> Result<bool, InfraError> {
    let id = normalized_id(&id, "id").map_err(|error| state.command_error("delete_saved_schedule", error))?;
    let deleted = state
        .schedules
        .delete(state.current_user(), id)
        .map_err(|error| state.command_error("delete_saved_schedule", error))?;
    if deleted {
        state.log_info("delete_saved_schedule", &format!("deleted saved schedule {id}"));
    }
    Ok(deleted)
}

pub fn cancel_edit_impl(state: &AppState) -> Result<ScheduleView, InfraError> {
    let mut editor = lock_editor(state)?;
    editor.reset();
    Ok(schedule_view(&editor))
}

pub async fn connect_calendar_impl(
    state: &AppState,
    oauth_state: Option<String>,
    authorization_code: Option<String>,
) -> Result<ConnectCalendarResponse, InfraError> {
    let config = load_oauth_config_from_env().map_err(|error| state.command_error("connect_calendar", error))?;
    let authorizer = CalendarAuthorizer::new(config, Arc::new(ReqwestOAuthClient::new()));
    connect_calendar_with(state, &authorizer, oauth_state, authorization_code).await
}

async fn connect_calendar_with<C>(
    state: &AppState,
    authorizer: &CalendarAuthorizer<C>,
    oauth_state: Option<String>,
    authorization_code: Option<String>,
) -> Result<ConnectCalendarResponse, InfraError>
where
    C: OAuthHttpClient,
{
    let code = authorization_code
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());

    let Some(code) = code else {
        lock_calendar(state)?.invalidate();
        let oauth_state = oauth_state
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| next_id("consent"));
        let consent_url = authorizer
            .build_consent_url(&oauth_state)
            .map_err(|error| state.command_error("connect_calendar", error))?;
        state.log_info("connect_calendar", "calendar consent required");
        return Ok(ConnectCalendarResponse {
            connected: false,
            consent_url: Some(consent_url),
        });
    };

    let credential = authorizer
        .exchange_code(code)
        .await
        .map_err(|error| state.command_error("connect_calendar", error))?;
    lock_calendar(state)?.connect(credential);
    state.log_info("connect_calendar", "calendar connected");
    Ok(ConnectCalendarResponse {
        connected: true,
        consent_url: None,
    })
}

struct PushInFlight<'a>(&'a AtomicBool);

impl<'a> PushInFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for PushInFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub async fn push_schedule_impl(state: &AppState, date: Option<String>) -> Result<PushReport, InfraError> {
    let Some(_in_flight) = PushInFlight::acquire(&state.push_in_flight) else {
        return Err(state.command_error("push_schedule", PushError::InProgress.into()));
    };

    let (service, date) = prepare_push(state.config_dir(), date.as_deref())
        .map_err(|error| state.command_error("push_schedule", error))?;
    let schedule = lock_editor(state)?.schedule().clone();
    push_with_session(state, "push_schedule", &service, &schedule, date).await
}

pub async fn push_saved_schedule_impl(state: &AppState, id: String) -> Result<PushReport, InfraError> {
    let Some(_in_flight) = PushInFlight::acquire(&state.push_in_flight) else {
        return Err(state.command_error("push_saved_schedule", PushError::InProgress.into()));
    };

    let saved = find_saved_schedule(state, &id)
        .map_err(|error| state.command_error("push_saved_schedule", error))?;
    let (service, date) = prepare_push(state.config_dir(), Some(&saved.record.date))
        .map_err(|error| state.command_error("push_saved_schedule", error))?;
    push_with_session(state, "push_saved_schedule", &service, &saved.record.schedule, date).await
}

fn find_saved_schedule(state: &AppState, id: &str) -> Result<SavedSchedule, InfraError> {
    let id = normalized_id(id, "id")?;
    state
        .schedules
        .get(state.current_user(), id)?
        .ok_or_else(|| InfraError::NotFound(format!("saved schedule {id}")))
}

async fn push_with_session(
    state: &AppState,
    command: &str,
    service: &CalendarPushService<ReqwestGoogleCalendarClient>,
    schedule: &Schedule,
    date: NaiveDate,
) -> Result<PushReport, InfraError> {
    let credential = lock_calendar(state)?.credential().cloned();

    match service.push_with_credential(schedule, credential.as_ref(), date).await {
        Ok(report) => {
            state.log_info(
                command,
                &format!("pushed {} events for {}", report.event_ids.len(), report.date),
            );
            Ok(report)
        }
        Err(error) => {
            if let Some(credential) = &credential {
                lock_calendar(state)?.apply_push_failure(&error, &credential.access_token);
            }
            Err(state.command_error(command, error.into()))
        }
    }
}

fn prepare_push(
    config_dir: &Path,
    date: Option<&str>,
) -> Result<(CalendarPushService<ReqwestGoogleCalendarClient>, NaiveDate), InfraError> {
    let settings = read_calendar_settings(config_dir)?;
    let date = match date.map(str::trim).filter(|value| !value.is_empty()) {
        Some(raw) => parse_date_input(raw, "date")?,
        None => Utc::now().with_timezone(&settings.time_zone).date_naive(),
    };
    let client = ReqwestGoogleCalendarClient::with_api_base(&settings.api_base)?;
    Ok((CalendarPushService::new(Arc::new(client), &settings), date))
}

fn load_oauth_config_from_env() -> Result<OAuthConfig, InfraError> {
    load_oauth_config_from_lookup(|key| std::env::var(key).ok())
}

fn load_oauth_config_from_lookup<F>(lookup: F) -> Result<OAuthConfig, InfraError>
where
    F: Fn(&str) -> Option<String>,
{
    let client_id = required_lookup_value(
        &lookup,
        &["SCHEDULER_GOOGLE_CLIENT_ID", "GOOGLE_CLIENT_ID"],
        "google client id",
    )?;
    let client_secret = required_lookup_value(
        &lookup,
        &["SCHEDULER_GOOGLE_CLIENT_SECRET", "GOOGLE_CLIENT_SECRET"],
        "google client secret",
    )?;
    let redirect_uri = optional_lookup_value(
        &lookup,
        &["SCHEDULER_GOOGLE_REDIRECT_URI", "GOOGLE_REDIRECT_URI"],
    )
    .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string());

    Ok(OAuthConfig::new(client_id, client_secret, redirect_uri))
}

fn required_lookup_value<F>(lookup: &F, keys: &[&str], field_name: &str) -> Result<String, InfraError>
where
    F: Fn(&str) -> Option<String>,
{
    optional_lookup_value(lookup, keys).ok_or_else(|| {
        InfraError::InvalidConfig(format!(
            "missing {} (set one of: {})",
            field_name,
            keys.join(", ")
        ))
    })
}

fn optional_lookup_value<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter()
        .filter_map(|key| lookup(key))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}
