pub mod reactive;
pub mod telemetry;
pub mod time;
