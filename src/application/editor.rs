use crate::domain::clock::{parse_time, validate_hhmm};
use crate::domain::models::{PresetTask, SavedSchedule, Schedule, ScheduleRecord, Task};
use crate::domain::schedule::generate;
use crate::domain::schedule_edit::{edit_break_duration, reorder, reorder_by_block_index};
use chrono::{DateTime, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Clone)]
pub struct ScheduleEditor {
    tasks: Vec<Task>,
    start_time: String,
    default_start_time: String,
    day_name: String,
    schedule: Schedule,
    editing_id: Option<String>,
    break_title: String,
    rng: StdRng,
}

impl ScheduleEditor {
    pub fn new(default_start_time: &str, break_title: impl Into<String>) -> Result<Self, String> {
        validate_hhmm(default_start_time, "default_start_time")?;
        Ok(Self {
            tasks: Vec::new(),
            start_time: default_start_time.to_string(),
            default_start_time: default_start_time.to_string(),
            day_name: String::new(),
            schedule: Schedule::new(),
            editing_id: None,
            break_title: break_title.into(),
            rng: StdRng::from_entropy(),
        })
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn start_time(&self) -> &str {
        &self.start_time
    }

    pub fn day_name(&self) -> &str {
        &self.day_name
    }

    pub fn editing_id(&self) -> Option<&str> {
        self.editing_id.as_deref()
    }

    pub fn add_task(&mut self, name: &str, duration: u32) -> Result<&Task, String> {
        let task = Task::new(name.trim(), duration);
        task.validate()?;
        self.tasks.push(task);
        Ok(&self.tasks[self.tasks.len() - 1])
    }

    pub fn add_preset(&mut self, preset: &PresetTask) -> Result<&Task, String> {
        self.add_task(&preset.name, preset.duration)
    }

    pub fn remove_task(&mut self, index: usize) -> Result<Task, String> {
        if index >= self.tasks.len() {
            return Err(format!("task index {index} out of range"));
        }
        Ok(self.tasks.remove(index))
    }

    /// Replaces name and duration of the task at `index`. A blank name or a
    /// missing/zero duration cancels the edit and returns `Ok(false)`.
    pub fn update_task(
        &mut self,
        index: usize,
        name: Option<&str>,
        duration: Option<u32>,
    ) -> Result<bool, String> {
        let Some(task) = self.tasks.get_mut(index) else {
            return Err(format!("task index {index} out of range"));
        };
        let name = name.map(str::trim).filter(|value| !value.is_empty());
        let duration = duration.filter(|value| *value > 0);
        let (Some(name), Some(duration)) = (name, duration) else {
            return Ok(false);
        };
        let updated = Task::new(name, duration);
        updated.validate()?;
        *task = updated;
        Ok(true)
    }

    pub fn set_start_time(&mut self, start_time: &str) -> Result<(), String> {
        let start_time = start_time.trim();
        validate_hhmm(start_time, "start_time")?;
        self.start_time = start_time.to_string();
        Ok(())
    }

    pub fn set_day_name(&mut self, day_name: &str) {
        self.day_name = day_name.trim().to_string();
    }

    pub fn randomize(&mut self) -> &Schedule {
        self.schedule = generate(&self.tasks, self.start_minute(), &self.break_title, &mut self.rng);
        &self.schedule
    }

    pub fn reorder_tasks(&mut self, from: usize, to: usize) -> &Schedule {
        let start_minute = self.start_minute();
        self.schedule = reorder(
            &self.schedule,
            from,
            to,
            start_minute,
            &self.break_title,
            &mut self.rng,
        );
        &self.schedule
    }

    pub fn reorder_blocks(&mut self, from_block: usize, to_block: usize) -> &Schedule {
        let start_minute = self.start_minute();
        self.schedule = reorder_by_block_index(
            &self.schedule,
            from_block,
            to_block,
            start_minute,
            &self.break_title,
            &mut self.rng,
        );
        &self.schedule
    }

    pub fn edit_break(&mut self, block_index: usize, duration: Option<u32>) -> &Schedule {
        self.schedule = edit_break_duration(&self.schedule, block_index, duration, self.start_minute());
        &self.schedule
    }

    pub fn total_task_minutes(&self) -> u32 {
        self.tasks
            .iter()
            .fold(0, |total: u32, task| total.saturating_add(task.duration))
    }

    pub fn end_minute(&self) -> Option<u32> {
        self.schedule.end_minute()
    }

    pub fn snapshot(&self, date: NaiveDate, now: DateTime<Utc>) -> ScheduleRecord {
        ScheduleRecord {
            date: date.format("%Y-%m-%d").to_string(),
            day_name: self.day_name.clone(),
            start_time: self.start_time.clone(),
            tasks: self.tasks.clone(),
            schedule: self.schedule.clone(),
            created_at: now,
        }
    }

    pub fn load(&mut self, saved: &SavedSchedule) {
        self.tasks = saved.record.tasks.clone();
        self.start_time = saved.record.start_time.clone();
        self.day_name = saved.record.day_name.clone();
        self.schedule = saved.record.schedule.clone();
        self.editing_id = Some(saved.id.clone());
    }

    pub fn reset(&mut self) {
        self.tasks.clear();
        self.schedule = Schedule::new();
        self.day_name.clear();
        self.editing_id = None;
        self.start_time = self.default_start_time.clone();
    }

    fn start_minute(&self) -> u32 {
        parse_time(&self.start_time).unwrap_or_default()
    }
}
