pub mod config;
pub mod error;
pub mod event_mapper;
pub mod google_calendar_client;
pub mod logging;
pub mod oauth_client;
pub mod schedule_repository;
pub mod storage;
