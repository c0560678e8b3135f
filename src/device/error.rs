use std::io;

use thiserror::Error;

/// Any error the device side might encounter.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// IO related errors.
    #[error("Underlying IO problem")]
    Io(#[from] io::Error),

    /// Problems opening or configuring the serial port.
    #[error("Serial port problem")]
    Serial(#[from] tokio_serial::Error),

    /// The device stream ended.
    #[error("Device disconnected")]
    Disconnected,
}
