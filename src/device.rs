/// Device related errors.
pub mod error;

/// The device reader state machine.
pub mod reader;

/// Codec for framing the raw byte stream into lines.
pub(crate) mod codec;

pub use error::DeviceError;
pub use reader::{DeviceReader, RetryPolicy};
