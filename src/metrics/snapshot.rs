use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub probes_queued: u64,
    pub probes_completed: u64,
    pub probes_healthy: u64,
    pub probes_broken: u64,
    pub probes_redirected: u64,
    pub probes_in_flight: u64,
    pub peak_in_flight: u64,
    pub cycles_completed: u64,
    pub completion_rate: f64,
    pub avg_response_time_ms: u64,
    pub probes_per_second: f64,
    pub elapsed_seconds: f64,
}
