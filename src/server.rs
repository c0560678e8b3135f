use std::{
    io,
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use axum::{
    http::StatusCode,
    routing::{get, get_service},
    Extension, Router,
};
use tokio::sync::{mpsc, oneshot};
use tower_http::{cors::CorsLayer, services::ServeFile, trace::TraceLayer};
use tracing::{debug, info, info_span, Instrument};

use crate::{
    broadcast::Broadcaster,
    config::Config,
    device::{reader::serial_opener, DeviceReader},
    error::Error,
    record::TelemetryRecord,
    registry::SubscriberRegistry,
    snapshot, websocket,
};

/// The default port to run the relay on.
pub const DEFAULT_PORT: u16 = 8765;

fn spawn_device_reader(config: &Config) -> mpsc::UnboundedReceiver<TelemetryRecord> {
    let (record_sender, record_receiver) = mpsc::unbounded_channel();

    let reader = DeviceReader::new(
        serial_opener(config.device.clone(), config.baud),
        config.retry_policy(),
    );

    tokio::spawn(
        reader
            .run(record_sender)
            .instrument(info_span!("Device", device = %config.device)),
    );

    record_receiver
}

async fn run(
    config: Config,
    mut records: mpsc::UnboundedReceiver<TelemetryRecord>,
    port: Option<u16>,
    allocated_port: Option<oneshot::Sender<u16>>,
) -> Result<(), Error> {
    let host: IpAddr = config
        .host
        .parse()
        .map_err(|_| Error::InvalidHost(config.host.clone()))?;

    let registry = Arc::new(SubscriberRegistry::new());
    let broadcaster = Broadcaster::new(Arc::clone(&registry), config.send_timeout());

    // The relay loop. Awaiting each broadcast before taking the next
    // record keeps per-subscriber delivery in production order.
    tokio::spawn(
        async move {
            while let Some(record) = records.recv().await {
                broadcaster.broadcast(record).await;
            }

            debug!("Record source ended");
        }
        .instrument(info_span!("Relay")),
    );

    let app = Router::new()
        .route("/ws", get(websocket::ws_handler))
        .route("/sensor_data", get(snapshot::sensor_data))
        .route(
            "/",
            get_service(ServeFile::new(config.landing_page.clone())).handle_error(
                |e: io::Error| async move {
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        format!("Could not serve landing page: {e}"),
                    )
                },
            ),
        )
        // Each websocket needs to be able to reach the registry
        .layer(Extension(registry))
        // The snapshot endpoint needs the data file location
        .layer(Extension(config))
        // Dashboards are served from other origins
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from((host, port.unwrap_or(0)));

    // Failing to bind is the one fatal error: without the listening
    // endpoint there is no service to provide.
    let server = axum::Server::try_bind(&addr)
        .map_err(|e| Error::Bind {
            addr,
            reason: e.to_string(),
        })?
        .serve(app.into_make_service_with_connect_info::<SocketAddr>());
    let addr = server.local_addr();

    if let Some(port_reply) = allocated_port {
        port_reply
            .send(addr.port())
            .expect("The receiver of which port was allocated should not be dropped");
    }

    info!("listening on {}", addr);

    server.await.map_err(|e| Error::Server(e.to_string()))
}

/// Start the relay on the given port, reading from the configured
/// serial device.
pub async fn run_on_port(config: Config, port: u16) -> Result<(), Error> {
    let records = spawn_device_reader(&config);

    run(config, records, Some(port), None).await
}

/// Start the relay on an arbitrary available port.
/// The port allocated will be sent on the provided channel.
pub async fn run_any_port(config: Config, allocated_port: oneshot::Sender<u16>) -> Result<(), Error> {
    let records = spawn_device_reader(&config);

    run(config, records, None, Some(allocated_port)).await
}

/// Start the relay with records supplied by the caller instead of read
/// from a serial device. The port allocated will be sent on the
/// provided channel.
///
/// This is the seam tests use to drive broadcasts without hardware.
pub async fn run_with_source(
    config: Config,
    records: mpsc::UnboundedReceiver<TelemetryRecord>,
    allocated_port: oneshot::Sender<u16>,
) -> Result<(), Error> {
    run(config, records, None, Some(allocated_port)).await
}
