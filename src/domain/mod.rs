pub mod break_policy;
pub mod clock;
pub mod models;
pub mod schedule;
pub mod schedule_edit;
