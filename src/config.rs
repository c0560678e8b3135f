use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::device::RetryPolicy;

/// The configuration used for running the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The serial device to read telemetry from.
    /// Likely "/dev/ttyUSBx" or "/dev/tty.ESP32-SPP" on unix, "COMx" on Windows.
    pub device: String,

    /// The baud rate to open the device at.
    pub baud: u32,

    /// The IP address the relay listens on.
    /// Use "0.0.0.0" to accept subscribers from other machines.
    pub host: String,

    /// The port the relay listens on.
    pub port: u16,

    /// Seconds to wait before retrying a failed device connection.
    pub reconnect_backoff_seconds: u64,

    /// Upper bound on a single device read, in milliseconds.
    pub read_timeout_ms: u64,

    /// Upper bound on a single subscriber send, in milliseconds.
    /// A subscriber which does not accept a record within this bound is
    /// dropped.
    pub send_timeout_ms: u64,

    /// The flat file holding the most recent key/value telemetry.
    pub data_file: PathBuf,

    /// The static landing page served at `/`.
    pub landing_page: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: "/dev/ttyUSB0".into(),
            baud: 115_200,
            host: "127.0.0.1".into(),
            port: crate::server::DEFAULT_PORT,
            reconnect_backoff_seconds: 5,
            read_timeout_ms: 1_000,
            send_timeout_ms: 3_000,
            data_file: "sensor_data.txt".into(),
            landing_page: "index.html".into(),
        }
    }
}

impl Config {
    fn ron() -> ron::Options {
        ron::Options::default()
            .with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME)
            .with_default_extension(ron::extensions::Extensions::UNWRAP_NEWTYPES)
    }

    /// Deserialize a .ron file's contents.
    /// Panics if the input is not valid .ron.
    pub fn deserialize(input: &str) -> Self {
        Self::ron()
            .from_str::<Config>(input)
            .expect("Configuration should be valid .ron")
    }

    /// Read configuration from the file at the given path.
    /// Panics if the file cannot be read or is not valid.
    pub fn new_from_path<P: AsRef<Path>>(path: P) -> Self {
        let contents =
            std::fs::read_to_string(path).expect("Configuration file should be readable");

        Self::deserialize(&contents)
    }

    /// Serialize in a user friendly format.
    pub fn serialize_pretty(&self) -> String {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .expect("Config serialization should work")
    }

    /// An example configuration with some fields filled in.
    pub fn example() -> Self {
        Self {
            device: "/dev/tty.ESP32_Car-SPP".into(),
            host: "0.0.0.0".into(),
            data_file: "/var/lib/telemetry-relay/sensor_data.txt".into(),
            landing_page: "/var/lib/telemetry-relay/index.html".into(),
            ..Default::default()
        }
    }

    /// The device reader's retry policy, as configured.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            backoff: Duration::from_secs(self.reconnect_backoff_seconds),
            read_timeout: Duration::from_millis(self.read_timeout_ms),
        }
    }

    /// The broadcaster's per-subscriber send timeout, as configured.
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}
