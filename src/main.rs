use clap::Parser;
use telemetry_relay::{cli, config::Config, error, logging, server};
use tracing::{debug, error, info};

#[tokio::main]
async fn main() -> Result<(), error::Error> {
    let cli = cli::Cli::parse();

    if let Some(command) = cli.command {
        cli::handle_command(command);

        return Ok(());
    }

    logging::init().await;

    let config = if let Some(config_path) = cli.config {
        debug!(?config_path, "Config from path");
        Config::new_from_path(config_path)
    } else {
        debug!("Default config");
        Config::default()
    };

    let port = config.port;

    // Shutdown is abrupt: open connections and the device handle are
    // simply abandoned.
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C, quitting");
        }
        result = server::run_on_port(config, port) => {
            error!("Server returned");
            result?;
        }
    }

    Ok(())
}
