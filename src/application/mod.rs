// Application layer - Aggregator state, session orchestration, provider traits
pub mod alert_log;
pub mod fleet_store;
pub mod history;
pub mod live_session;
pub mod selection;
pub mod session;
pub mod weather_provider;
pub mod weather_service;
