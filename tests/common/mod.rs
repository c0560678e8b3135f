#![allow(dead_code)]

use std::time::Duration;

use axum::http::StatusCode;
use color_eyre::Result;
use futures::StreamExt;
use telemetry_relay::{config::Config, record::TelemetryRecord, server};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::info;

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Start a relay fed by a caller-held record source.
/// Returns the port it listens on and the sender driving broadcasts.
pub async fn start_relay() -> (u16, mpsc::UnboundedSender<TelemetryRecord>) {
    start_relay_with_config(Config::default()).await
}

pub async fn start_relay_with_config(
    config: Config,
) -> (u16, mpsc::UnboundedSender<TelemetryRecord>) {
    let (record_tx, record_rx) = mpsc::unbounded_channel();
    let (port_tx, port_rx) = oneshot::channel();

    tokio::spawn(async move { server::run_with_source(config, record_rx, port_tx).await });

    let port = port_rx
        .await
        .expect("Server should reply with allocated port");

    (port, record_tx)
}

pub async fn connect(port: u16) -> Result<Client> {
    info!("Connecting to relay on port {port}");
    let (stream, http_response) =
        tokio_tungstenite::connect_async(format!("ws://127.0.0.1:{port}/ws")).await?;

    assert_eq!(http_response.status(), StatusCode::SWITCHING_PROTOCOLS);

    Ok(stream)
}

pub fn record(text: &str) -> TelemetryRecord {
    TelemetryRecord::decode(text.as_bytes())
        .expect("Test record should be valid")
        .expect("Test record should be non-empty")
}

/// Receive the next text message, with a timeout.
pub async fn receive(client: &mut Client) -> Result<String> {
    let message = timeout(Duration::from_secs(5), client.next())
        .await?
        .ok_or_else(|| color_eyre::eyre::eyre!("Stream closed"))??;

    Ok(message.to_text()?.to_string())
}

/// GET one of the relay's HTTP endpoints.
/// Returns the status code and the JSON body.
pub async fn http_get(port: u16, path: &str) -> Result<(u16, serde_json::Value)> {
    let response = reqwest::get(format!("http://127.0.0.1:{port}{path}")).await?;

    let status = response.status().as_u16();
    let body = response.json().await?;

    Ok((status, body))
}
