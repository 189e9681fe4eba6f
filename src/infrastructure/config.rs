use crate::domain::clock::parse_time;
use crate::domain::models::PresetTask;
use crate::domain::schedule::DEFAULT_BREAK_TITLE;
use crate::infrastructure::error::InfraError;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";
const PRESETS_JSON: &str = "presets.json";

pub const DEFAULT_TIMEZONE: &str = "Asia/Jerusalem";
pub const DEFAULT_CALENDAR_ID: &str = "primary";
pub const DEFAULT_START_TIME: &str = "09:00";
pub const DEFAULT_REMINDER_MINUTES: u32 = 5;
pub const DEFAULT_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3/";

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigBundle {
    pub app: serde_json::Value,
    pub presets: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalendarSettings {
    pub calendar_id: String,
    pub time_zone: Tz,
    pub reminder_minutes: u32,
    pub api_base: String,
}

fn default_files() -> [(&'static str, serde_json::Value); 2] {
    [
        (
            APP_JSON,
            serde_json::json!({
                "schema": 1,
                "appName": "DayBlocks",
                "timezone": DEFAULT_TIMEZONE,
                "calendarId": DEFAULT_CALENDAR_ID,
                "defaultStartTime": DEFAULT_START_TIME,
                "breakTitle": DEFAULT_BREAK_TITLE,
                "reminderMinutes": DEFAULT_REMINDER_MINUTES,
                "calendarApiBase": DEFAULT_CALENDAR_API_BASE
            }),
        ),
        (
            PRESETS_JSON,
            serde_json::json!({
                "schema": 1,
                "presets": [
                    { "name": "📚 Study", "duration": 45 },
                    { "name": "🍽️ Meal", "duration": 20 },
                    { "name": "🧺 Laundry", "duration": 30 },
                    { "name": "🚿 Shower", "duration": 15 },
                    { "name": "🏃 Exercise", "duration": 30 },
                    { "name": "💊 Medication", "duration": 5 },
                    { "name": "📱 Rest", "duration": 15 },
                    { "name": "🛒 Shopping", "duration": 45 },
                    { "name": "🧹 Cleaning", "duration": 30 },
                    { "name": "💤 Nap", "duration": 20 }
                ]
            }),
        ),
    ]
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    for (name, value) in default_files() {
        let path = config_dir.join(name);
        if !path.exists() {
            let formatted = serde_json::to_string_pretty(&value)?;
            fs::write(path, format!("{formatted}\n"))?;
        }
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_configs(config_dir: &Path) -> Result<ConfigBundle, InfraError> {
    Ok(ConfigBundle {
        app: read_config(&config_dir.join(APP_JSON))?,
        presets: read_config(&config_dir.join(PRESETS_JSON))?,
    })
}

fn app_string(config_dir: &Path, key: &str) -> Result<Option<String>, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    Ok(app
        .get(key)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned))
}

pub fn read_time_zone(config_dir: &Path) -> Result<Tz, InfraError> {
    let name = app_string(config_dir, "timezone")?.unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
    name.parse::<Tz>()
        .map_err(|error| InfraError::InvalidConfig(format!("invalid timezone '{name}': {error}")))
}

pub fn read_default_start_time(config_dir: &Path) -> Result<String, InfraError> {
    let value =
        app_string(config_dir, "defaultStartTime")?.unwrap_or_else(|| DEFAULT_START_TIME.to_string());
    if parse_time(&value).is_none() {
        return Err(InfraError::InvalidConfig(format!(
            "defaultStartTime must be HH:MM, got '{value}'"
        )));
    }
    Ok(value)
}

pub fn read_break_title(config_dir: &Path) -> Result<String, InfraError> {
    Ok(app_string(config_dir, "breakTitle")?.unwrap_or_else(|| DEFAULT_BREAK_TITLE.to_string()))
}

pub fn read_calendar_settings(config_dir: &Path) -> Result<CalendarSettings, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    let reminder_minutes = match app.get("reminderMinutes") {
        None | Some(serde_json::Value::Null) => DEFAULT_REMINDER_MINUTES,
        Some(value) => value
            .as_u64()
            .and_then(|minutes| u32::try_from(minutes).ok())
            .ok_or_else(|| {
                InfraError::InvalidConfig(format!("reminderMinutes must be a whole number, got {value}"))
            })?,
    };

    Ok(CalendarSettings {
        calendar_id: app_string(config_dir, "calendarId")?
            .unwrap_or_else(|| DEFAULT_CALENDAR_ID.to_string()),
        time_zone: read_time_zone(config_dir)?,
        reminder_minutes,
        api_base: app_string(config_dir, "calendarApiBase")?
            .unwrap_or_else(|| DEFAULT_CALENDAR_API_BASE.to_string()),
    })
}

pub fn read_preset_tasks(config_dir: &Path) -> Result<Vec<PresetTask>, InfraError> {
    let presets = read_config(&config_dir.join(PRESETS_JSON))?;
    let Some(entries) = presets.get("presets") else {
        return Ok(Vec::new());
    };
    let parsed: Vec<PresetTask> = serde_json::from_value(entries.clone())?;
    for preset in &parsed {
        if preset.name.trim().is_empty() || preset.duration == 0 {
            return Err(InfraError::InvalidConfig(format!(
                "invalid preset '{}' ({} min) in {}",
                preset.name, preset.duration, PRESETS_JSON
            )));
        }
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("temp dir");
        ensure_default_configs(dir.path()).expect("write defaults");
        dir
    }

    #[test]
    fn defaults_are_written_and_loadable() {
        let dir = config_dir();
        let bundle = load_configs(dir.path()).expect("load");
        assert_eq!(bundle.app["calendarId"], DEFAULT_CALENDAR_ID);

        let settings = read_calendar_settings(dir.path()).expect("settings");
        assert_eq!(settings.time_zone, chrono_tz::Asia::Jerusalem);
        assert_eq!(settings.reminder_minutes, 5);
        assert_eq!(settings.api_base, DEFAULT_CALENDAR_API_BASE);
        assert_eq!(read_default_start_time(dir.path()).expect("start"), "09:00");
        assert_eq!(read_break_title(dir.path()).expect("title"), DEFAULT_BREAK_TITLE);

        let presets = read_preset_tasks(dir.path()).expect("presets");
        assert_eq!(presets.len(), 10);
        assert_eq!(presets[0].duration, 45);
    }

    #[test]
    fn existing_files_are_not_overwritten() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::write(
            dir.path().join(APP_JSON),
            r#"{"schema":1,"timezone":"Europe/Berlin","calendarId":"work"}"#,
        )
        .expect("write app.json");
        ensure_default_configs(dir.path()).expect("write defaults");

        let settings = read_calendar_settings(dir.path()).expect("settings");
        assert_eq!(settings.time_zone, chrono_tz::Europe::Berlin);
        assert_eq!(settings.calendar_id, "work");
        assert_eq!(read_default_start_time(dir.path()).expect("start"), DEFAULT_START_TIME);
    }

    #[test]
    fn unsupported_schema_is_rejected() {
        let dir = config_dir();
        fs::write(dir.path().join(APP_JSON), r#"{"schema":2}"#).expect("write");
        assert!(matches!(
            load_configs(dir.path()),
            Err(InfraError::InvalidConfig(_))
        ));
    }

    #[test]
    fn invalid_timezone_and_start_time_are_reported() {
        let dir = config_dir();
        fs::write(
            dir.path().join(APP_JSON),
            r#"{"schema":1,"timezone":"Mars/Olympus","defaultStartTime":"25:00"}"#,
        )
        .expect("write");
        assert!(read_time_zone(dir.path()).is_err());
        assert!(read_default_start_time(dir.path()).is_err());
    }
}
