pub mod manager;
pub mod types;

pub use manager::TelemetryManager;
pub use types::{ErrorQuery, ErrorRecord, ErrorType, TrafficQuery, TrafficSample};
