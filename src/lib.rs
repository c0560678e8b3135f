#![deny(missing_docs)]

//! This crate relays telemetry from a serial-attached device to websocket
//! subscribers.
//!
//! The device emits line-delimited JSON records.
//! Each line is framed, validated and then broadcast as-is to every
//! connected subscriber.
//!
//! Delivery is best effort: a subscriber which has disconnected or
//! stopped draining its connection is removed, and the remaining
//! subscribers are unaffected.
//!
//! If the device goes away, the reader keeps retrying with a fixed
//! backoff until it reappears. No process restart is needed to recover
//! from a device reattachment.
//!
//! The same listener also serves the most recent key/value telemetry
//! snapshot from a flat file, plus a static landing page.

/// Code relating to setting up the server which accepts subscribers and
/// runs the relay.
pub mod server;

/// The command line interface.
pub mod cli;

/// Relates to config files.
pub mod config;

/// Serial device driver: connect, read lines, retry on fault.
pub mod device;

/// Validated telemetry records.
pub mod record;

/// The set of currently connected subscribers.
pub mod registry;

/// Fan-out of records to subscribers.
pub mod broadcast;

/// The flat-file snapshot endpoint.
pub mod snapshot;

/// Handles incoming websockets.
pub(crate) mod websocket;

/// Possible errors in this library.
pub mod error;

/// Logging/tracing setup.
pub mod logging;
