use crate::domain::clock::split_day_offset;
use crate::domain::models::ScheduleBlock;
use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;

const REMINDER_METHOD_POPUP: &str = "popup";

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CalendarEventDateTime {
    #[serde(rename = "dateTime")]
    pub date_time: String,
    #[serde(rename = "timeZone")]
    pub time_zone: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct ReminderOverride {
    pub method: String,
    pub minutes: u32,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EventReminders {
    #[serde(rename = "useDefault")]
    pub use_default: bool,
    pub overrides: Vec<ReminderOverride>,
}

impl EventReminders {
    pub fn popup(minutes: u32) -> Self {
        Self {
            use_default: false,
            overrides: vec![ReminderOverride {
                method: REMINDER_METHOD_POPUP.to_string(),
                minutes,
            }],
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct GoogleCalendarEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub summary: String,
    pub start: CalendarEventDateTime,
    pub end: CalendarEventDateTime,
    pub reminders: EventReminders,
}

pub fn encode_task_event(
    block: &ScheduleBlock,
    date: NaiveDate,
    time_zone: Tz,
    reminder_minutes: u32,
) -> Option<GoogleCalendarEvent> {
    if !block.is_task() {
        return None;
    }
    Some(GoogleCalendarEvent {
        id: None,
        summary: block.title.clone(),
        start: event_date_time(date, block.start, time_zone),
        end: event_date_time(date, block.end, time_zone),
        reminders: EventReminders::popup(reminder_minutes),
    })
}

fn event_date_time(date: NaiveDate, minutes: u32, time_zone: Tz) -> CalendarEventDateTime {
    CalendarEventDateTime {
        date_time: format_event_date_time(&wall_clock(date, minutes, time_zone)),
        time_zone: time_zone.name().to_string(),
    }
}

pub fn wall_clock(date: NaiveDate, minutes: u32, time_zone: Tz) -> DateTime<Tz> {
    let (days, minute_of_day) = split_day_offset(minutes);
    let time = NaiveTime::MIN + Duration::minutes(i64::from(minute_of_day));
    let local = (date + Duration::days(i64::from(days))).and_time(time);
    resolve_local(local, time_zone)
}

fn resolve_local(local: NaiveDateTime, time_zone: Tz) -> DateTime<Tz> {
    match time_zone.from_local_datetime(&local) {
        LocalResult::Single(value) => value,
        LocalResult::Ambiguous(earliest, _) => earliest,
        // Skipped by a forward DST jump: keep the pre-transition offset so the
        // instant lands just after the gap.
        LocalResult::None => {
            let before = time_zone.offset_from_utc_datetime(&(local - Duration::days(1)));
            let offset = chrono::Offset::fix(&before);
            time_zone.from_utc_datetime(&(local - offset))
        }
    }
}

pub fn format_event_date_time(value: &DateTime<Tz>) -> String {
    value.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}
