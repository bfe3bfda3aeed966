use std::sync::Arc;

use clock::MonotonicClock;
use config::SensorOptions;
use error::ResultOkLogExt;
use fsutil::FsReader;
use sensor::ResourceSensor;

/// Resource Sensor: reads the CPU and memory entitlement and usage of the enclosing
/// cgroup v1 hierarchy, together with host CPU time and TCP connection counts, from
/// Linux pseudo-files.
///
/// The library exposes the parsers under [`stats`], the caching and availability layer
/// for TCP tables under [`network`], and the [`sensor::ResourceSensor`] accessor surface
/// a metrics layer polls.
pub mod buffer;
pub mod clock;
pub mod config;
pub mod environment;
pub mod error;
pub mod fsutil;
pub mod network;
pub mod sensor;
pub mod stats;

#[cfg(test)]
mod testutil;

/// Runs the sensor loop.
///
/// Resolves the options from the environment, probes the platform, and then logs one
/// JSON-encoded set of readings per sampling interval. Failed collections are logged and
/// the loop continues.
///
/// # Errors
///
/// Possible errors include:
/// - Invalid interval variables (e.g., `SENSOR_SAMPLING_INTERVAL_MS=abc`).
/// - A missing root directory at `ROOTFS_MOUNT_PATH`.
/// - A non-Linux host, or USER_HZ not being available.
/// - Malformed or unreadable cgroup files during the initial reads.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let options = SensorOptions::from_env()?;
    if !options.root.exists() {
        return Err(format!("missing root mount at `{}`!", options.root.display()).into());
    }

    let env = environment::detect(&options.root)?;
    log::info!(
        "Starting resource sensor on {} ({:?}), USER_HZ={}",
        env.os,
        env.runtime,
        env.user_hz
    );
    log::debug!("Options: {:?}", options);

    let sensor = Arc::new(ResourceSensor::new(
        &options,
        &env,
        Arc::new(FsReader),
        Arc::new(MonotonicClock::default()),
    )?);

    let mut interval = tokio::time::interval(options.sampling_interval);
    loop {
        interval.tick().await;
        let sensor = Arc::clone(&sensor);

        let readings = tokio::task::spawn_blocking(move || {
            let before = std::time::Instant::now();
            let readings = sensor.collect();
            log::trace!("collect() took {} nanoseconds", before.elapsed().as_nanos());
            readings
        })
        .await?;

        let json = readings
            .ok_log()
            .and_then(|readings| serde_json::to_string(&readings).ok_log());
        if let Some(json) = json {
            log::info!("{json}");
        }
    }
}
