/// Entry point for the resource sensor.
///
/// Logs the cgroup's CPU and memory entitlement, utilization and TCP connection counts
/// once per sampling interval. Log output is controlled through `RUST_LOG`.
///
/// # Errors
///
/// Returns an error if initialization fails (e.g., invalid interval variables, a missing
/// root mount, or unreadable cgroup files).
///
/// # Examples
///
/// ```bash
/// RUST_LOG=info SENSOR_SAMPLING_INTERVAL_MS=2000 cargo run
/// ```
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    resource_sensor::run().await
}
