// Domain layer - Data types and pure derived metrics
pub mod alert;
pub mod analysis;
pub mod fleet;
pub mod telemetry;
pub mod weather;
