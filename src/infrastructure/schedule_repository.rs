use crate::domain::models::{SavedSchedule, ScheduleRecord};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::open_database;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

static NEXT_SCHEDULE_ID: AtomicU64 = AtomicU64::new(1);

fn next_schedule_id() -> String {
    let sequence = NEXT_SCHEDULE_ID.fetch_add(1, Ordering::Relaxed);
    format!("sched-{}-{sequence}", Utc::now().timestamp_micros())
}

pub trait SavedScheduleRepository: Send + Sync {
    fn create(&self, user_id: &str, record: &ScheduleRecord) -> Result<String, InfraError>;
    fn update(&self, user_id: &str, id: &str, record: &ScheduleRecord) -> Result<(), InfraError>;
    fn list(&self, user_id: &str) -> Result<Vec<SavedSchedule>, InfraError>;
    fn get(&self, user_id: &str, id: &str) -> Result<Option<SavedSchedule>, InfraError>;
    fn delete(&self, user_id: &str, id: &str) -> Result<bool, InfraError>;
}

#[derive(Debug, Clone)]
pub struct SqliteSavedScheduleRepository {
    db_path: PathBuf,
}

impl SqliteSavedScheduleRepository {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        open_database(&self.db_path)
    }

    fn upsert(
        connection: &Connection,
        user_id: &str,
        id: &str,
        record: &ScheduleRecord,
    ) -> Result<(), InfraError> {
        let tasks_json = serde_json::to_string(&record.tasks)?;
        let schedule_json = serde_json::to_string(&record.schedule)?;
        connection.execute(
            "INSERT INTO saved_schedules
               (id, user_id, date, day_name, start_time, tasks_json, schedule_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
               date = excluded.date,
               day_name = excluded.day_name,
               start_time = excluded.start_time,
               tasks_json = excluded.tasks_json,
               schedule_json = excluded.schedule_json,
               created_at = excluded.created_at
             WHERE saved_schedules.user_id = excluded.user_id",
            params![
                id,
                user_id,
                record.date,
                record.day_name,
                record.start_time,
                tasks_json,
                schedule_json,
                record.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )?;
        Ok(())
    }
}

type RawRow = (String, String, String, String, String, String, String);

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn decode_row(raw: RawRow) -> Result<SavedSchedule, InfraError> {
    let (id, date, day_name, start_time, tasks_json, schedule_json, created_at_raw) = raw;
    let created_at = DateTime::parse_from_rfc3339(&created_at_raw)
        .map_err(|error| {
            InfraError::InvalidConfig(format!(
                "invalid saved_schedules.created_at '{created_at_raw}': {error}"
            ))
        })?
        .with_timezone(&Utc);

    Ok(SavedSchedule {
        id,
        record: ScheduleRecord {
            date,
            day_name,
            start_time,
            tasks: serde_json::from_str(&tasks_json)?,
            schedule: serde_json::from_str(&schedule_json)?,
            created_at,
        },
    })
}

const SELECT_COLUMNS: &str =
    "SELECT id, date, day_name, start_time, tasks_json, schedule_json, created_at FROM saved_schedules";

impl SavedScheduleRepository for SqliteSavedScheduleRepository {
    fn create(&self, user_id: &str, record: &ScheduleRecord) -> Result<String, InfraError> {
        let id = next_schedule_id();
        Self::upsert(&self.connect()?, user_id, &id, record)?;
        Ok(id)
    }

    fn update(&self, user_id: &str, id: &str, record: &ScheduleRecord) -> Result<(), InfraError> {
        Self::upsert(&self.connect()?, user_id, id, record)
    }

    fn list(&self, user_id: &str) -> Result<Vec<SavedSchedule>, InfraError> {
        let connection = self.connect()?;
        let mut statement = connection.prepare(&format!(
            "{SELECT_COLUMNS} WHERE user_id = ?1 ORDER BY created_at DESC, id DESC"
        ))?;
        let rows = statement
            .query_map(params![user_id], read_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(decode_row).collect()
    }

    fn get(&self, user_id: &str, id: &str) -> Result<Option<SavedSchedule>, InfraError> {
        let connection = self.connect()?;
        let row = connection
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE user_id = ?1 AND id = ?2"),
                params![user_id, id],
                read_row,
            )
            .optional()?;
        row.map(decode_row).transpose()
    }

    fn delete(&self, user_id: &str, id: &str) -> Result<bool, InfraError> {
        let affected = self.connect()?.execute(
            "DELETE FROM saved_schedules WHERE user_id = ?1 AND id = ?2",
            params![user_id, id],
        )?;
        Ok(affected > 0)
    }
}

#[derive(Debug, Default)]
pub struct InMemorySavedScheduleRepository {
    records: Mutex<HashMap<String, HashMap<String, ScheduleRecord>>>,
}

impl InMemorySavedScheduleRepository {
    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, HashMap<String, ScheduleRecord>>>, InfraError>
    {
        self.records
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("schedule store lock poisoned: {error}")))
    }
}

impl SavedScheduleRepository for InMemorySavedScheduleRepository {
    fn create(&self, user_id: &str, record: &ScheduleRecord) -> Result<String, InfraError> {
        let id = next_schedule_id();
        self.update(user_id, &id, record)?;
        Ok(id)
    }

    fn update(&self, user_id: &str, id: &str, record: &ScheduleRecord) -> Result<(), InfraError> {
        let mut records = self.lock()?;
        records
            .entry(user_id.to_string())
            .or_default()
            .insert(id.to_string(), record.clone());
        Ok(())
    }

    fn list(&self, user_id: &str) -> Result<Vec<SavedSchedule>, InfraError> {
        let records = self.lock()?;
        let mut saved: Vec<SavedSchedule> = records
            .get(user_id)
            .map(|by_id| {
                by_id
                    .iter()
                    .map(|(id, record)| SavedSchedule {
                        id: id.clone(),
                        record: record.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        saved.sort_by(|a, b| {
            b.record
                .created_at
                .cmp(&a.record.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(saved)
    }

    fn get(&self, user_id: &str, id: &str) -> Result<Option<SavedSchedule>, InfraError> {
        let records = self.lock()?;
        Ok(records
            .get(user_id)
            .and_then(|by_id| by_id.get(id))
            .map(|record| SavedSchedule {
                id: id.to_string(),
                record: record.clone(),
            }))
    }

    fn delete(&self, user_id: &str, id: &str) -> Result<bool, InfraError> {
        let mut records = self.lock()?;
        Ok(records
            .get_mut(user_id)
            .map(|by_id| by_id.remove(id).is_some())
            .unwrap_or(false))
    }
}
