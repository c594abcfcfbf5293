pub mod db;
pub mod primary;
pub mod snapshot;
pub mod telemetry;
