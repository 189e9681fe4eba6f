use crate::domain::clock::{validate_hhmm, MINUTES_PER_DAY};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_BLOCK_MINUTES: u32 = MINUTES_PER_DAY;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub name: String,
    pub duration: u32,
}

impl Task {
    pub fn new(name: impl Into<String>, duration: u32) -> Self {
        Self {
            name: name.into(),
            duration,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.name, "task.name")?;
        validate_block_minutes(self.duration, "task.duration")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresetTask {
    pub name: String,
    pub duration: u32,
}

impl From<&PresetTask> for Task {
    fn from(preset: &PresetTask) -> Self {
        Task::new(preset.name.clone(), preset.duration)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Task,
    Break,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleBlock {
    #[serde(rename = "type")]
    pub kind: BlockKind,
    pub title: String,
    pub start: u32,
    pub end: u32,
    pub duration: u32,
}

impl ScheduleBlock {
    pub fn task(title: impl Into<String>, start: u32, duration: u32) -> Self {
        Self::spanning(BlockKind::Task, title.into(), start, duration)
    }

    pub fn rest(title: impl Into<String>, start: u32, duration: u32) -> Self {
        Self::spanning(BlockKind::Break, title.into(), start, duration)
    }

    fn spanning(kind: BlockKind, title: String, start: u32, duration: u32) -> Self {
        Self {
            kind,
            title,
            start,
            end: start.saturating_add(duration),
            duration,
        }
    }

    pub fn is_task(&self) -> bool {
        self.kind == BlockKind::Task
    }

    pub fn is_break(&self) -> bool {
        self.kind == BlockKind::Break
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_block_minutes(self.duration, "block.duration")?;
        if self.start.checked_add(self.duration) != Some(self.end) {
            return Err(format!(
                "block '{}' end {} must equal start {} + duration {}",
                self.title, self.end, self.start, self.duration
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct Schedule {
    blocks: Vec<ScheduleBlock>,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_blocks(blocks: Vec<ScheduleBlock>) -> Self {
        Self { blocks }
    }

    pub fn blocks(&self) -> &[ScheduleBlock] {
        &self.blocks
    }

    pub fn get(&self, index: usize) -> Option<&ScheduleBlock> {
        self.blocks.get(index)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn task_blocks(&self) -> impl Iterator<Item = &ScheduleBlock> {
        self.blocks.iter().filter(|block| block.is_task())
    }

    pub fn task_positions(&self) -> Vec<usize> {
        self.blocks
            .iter()
            .enumerate()
            .filter(|(_, block)| block.is_task())
            .map(|(index, _)| index)
            .collect()
    }

    pub fn task_count(&self) -> usize {
        self.task_blocks().count()
    }

    pub fn total_task_minutes(&self) -> u32 {
        self.task_blocks()
            .fold(0, |total: u32, block| total.saturating_add(block.duration))
    }

    pub fn start_minute(&self) -> Option<u32> {
        self.blocks.first().map(|block| block.start)
    }

    pub fn end_minute(&self) -> Option<u32> {
        self.blocks.last().map(|block| block.end)
    }

    pub(crate) fn blocks_mut(&mut self) -> &mut Vec<ScheduleBlock> {
        &mut self.blocks
    }

    pub fn validate(&self) -> Result<(), String> {
        for block in &self.blocks {
            block.validate()?;
        }
        for (index, pair) in self.blocks.windows(2).enumerate() {
            if pair[1].start != pair[0].end {
                return Err(format!(
                    "block {} starts at {} but block {} ends at {}",
                    index + 1,
                    pair[1].start,
                    index,
                    pair[0].end
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleRecord {
    pub date: String,
    pub day_name: String,
    pub start_time: String,
    pub tasks: Vec<Task>,
    pub schedule: Schedule,
    pub created_at: DateTime<Utc>,
}

impl ScheduleRecord {
    pub fn validate(&self) -> Result<(), String> {
        validate_date(&self.date, "record.date")?;
        validate_hhmm(&self.start_time, "record.start_time")?;
        for task in &self.tasks {
            task.validate()?;
        }
        self.schedule.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SavedSchedule {
    pub id: String,
    #[serde(flatten)]
    pub record: ScheduleRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarCredential {
    pub access_token: String,
    pub scope: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CalendarCredential {
    pub fn new(access_token: impl Into<String>, scope: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            scope,
            expires_at: None,
        }
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scope
            .as_deref()
            .map(|granted| granted.split_whitespace().any(|value| value == scope))
            .unwrap_or(false)
    }

    pub fn is_usable(&self) -> bool {
        !self.access_token.trim().is_empty()
    }
}

pub(crate) fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

pub(crate) fn validate_block_minutes(minutes: u32, field_name: &str) -> Result<(), String> {
    if minutes == 0 || minutes > MAX_BLOCK_MINUTES {
        return Err(format!("{field_name} must be between 1 and {MAX_BLOCK_MINUTES} minutes"));
    }
    Ok(())
}

pub(crate) fn validate_date(value: &str, field_name: &str) -> Result<(), String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("{field_name} must be YYYY-MM-DD"))?;
    Ok(())
}
