use bfxdump::BfxError;
use bfxdump::config::fetch_config;
use bfxdump::websocket::ConnectionManager;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), BfxError> {
    // Initialize tracing subscriber for logging output.
    tracing_subscriber::fmt::init();

    let app_config = fetch_config()?;
    info!(
        dump_dir = %app_config.recorder.dump_dir.display(),
        channel_limit = app_config.bitfinex.channel_limit,
        "Starting recorder"
    );

    tokio::select! {
        () = ConnectionManager::new(app_config).run() => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Interrupted, shutting down");
        }
    }

    Ok(())
}
