pub mod context;
pub mod telemetry;
