use std::time::Duration;

use futures::StreamExt;
use tokio::{
    io::AsyncRead,
    sync::mpsc,
    time::{sleep, timeout},
};
use tokio_serial::SerialPortBuilderExt;
use tokio_util::codec::FramedRead;
use tracing::{debug, info, trace, warn};

use crate::{
    device::{codec::LinesCodec, error::DeviceError},
    record::TelemetryRecord,
};

/// How the reader retries and reads.
///
/// The retry itself is unbounded: the reader never gives up on the
/// device, so reattaching it recovers the stream without a process
/// restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Fixed delay before retrying a failed device connection.
    pub backoff: Duration,

    /// Upper bound on a single read.
    /// Elapsing means "no line yet", not a fault.
    pub read_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff: Duration::from_secs(5),
            read_timeout: Duration::from_secs(1),
        }
    }
}

/// An opener for the serial device at the given path.
///
/// Each call attempts a fresh open, so the reader can call it again
/// after every fault.
pub fn serial_opener(
    path: String,
    baud: u32,
) -> impl FnMut() -> Result<tokio_serial::SerialStream, DeviceError> {
    move || {
        debug!(%path, "Opening device");

        tokio_serial::new(&path, baud)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(Into::into)
    }
}

enum State<S> {
    /// Not connected; waits out the backoff before connecting again.
    Disconnected,

    /// Attempting to open the device.
    Connecting,

    /// Connected and reading lines.
    Streaming(FramedRead<S, LinesCodec>),
}

enum StreamEnd {
    /// Device-level fault (IO error, stream ended).
    Fault,

    /// Whoever received our records is gone.
    ReceiverDropped,
}

/// Owns the connection to the device.
///
/// Exactly one reader runs for the process lifetime. It cycles
/// `Disconnected → Connecting → Streaming` and back on faults,
/// forwarding each validated [`TelemetryRecord`] in production order.
///
/// Generic over how the device is opened so tests can substitute an
/// in-memory stream for the serial port.
pub struct DeviceReader<F> {
    open: F,
    policy: RetryPolicy,
}

impl<F, S> DeviceReader<F>
where
    F: FnMut() -> Result<S, DeviceError>,
    S: AsyncRead + Unpin,
{
    /// Create a reader which connects via `open`.
    pub fn new(open: F, policy: RetryPolicy) -> Self {
        Self { open, policy }
    }

    /// Run until the record receiver is dropped.
    ///
    /// Device faults and malformed lines never end the loop; they are
    /// logged and recovered.
    pub async fn run(mut self, records: mpsc::UnboundedSender<TelemetryRecord>) {
        let mut state = State::Connecting;

        loop {
            state = match state {
                State::Disconnected => {
                    debug!(backoff = ?self.policy.backoff, "Waiting before reconnecting");
                    sleep(self.policy.backoff).await;

                    State::Connecting
                }
                State::Connecting => match (self.open)() {
                    Ok(stream) => {
                        info!("Device connected");

                        State::Streaming(FramedRead::new(stream, LinesCodec::default()))
                    }
                    Err(e) => {
                        warn!("Could not open device: {e}");

                        State::Disconnected
                    }
                },
                State::Streaming(mut lines) => match self.stream(&mut lines, &records).await {
                    StreamEnd::Fault => State::Disconnected,
                    StreamEnd::ReceiverDropped => {
                        debug!("Record receiver dropped, reader done");
                        return;
                    }
                },
            };
        }
    }

    async fn stream(
        &self,
        lines: &mut FramedRead<S, LinesCodec>,
        records: &mpsc::UnboundedSender<TelemetryRecord>,
    ) -> StreamEnd {
        loop {
            let line = match timeout(self.policy.read_timeout, lines.next()).await {
                // No line within the timeout.
                Err(_elapsed) => continue,
                Ok(None) => {
                    warn!("Device stream ended");
                    return StreamEnd::Fault;
                }
                Ok(Some(Err(e))) => {
                    warn!("Device fault: {e}");
                    return StreamEnd::Fault;
                }
                Ok(Some(Ok(line))) => line,
            };

            match TelemetryRecord::decode(&line) {
                Ok(Some(record)) => {
                    trace!(%record, "Record from device");

                    if records.send(record).is_err() {
                        return StreamEnd::ReceiverDropped;
                    }
                }
                // Empty line; skip silently.
                Ok(None) => {}
                Err(e) => {
                    warn!("Discarding line: {e}");
                }
            }
        }
    }
}
