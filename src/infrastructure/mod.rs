// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod event_source;
pub mod http_response;
pub mod open_meteo;
pub mod update_stream;
pub mod wire;
