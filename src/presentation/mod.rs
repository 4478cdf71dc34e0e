// Presentation layer - HTTP routes over the live session
pub mod app_state;
pub mod handlers;
