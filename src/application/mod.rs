pub mod bootstrap;
pub mod calendar_push;
pub mod calendar_session;
pub mod commands;
pub mod editor;
pub mod oauth;
