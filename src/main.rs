use deconz_bridge::accessory::{AccessoryInfo, AdapterContext, PressConfigStore, Registry};
use deconz_bridge::config::{self, Config};
use deconz_bridge::error::{BridgeError, Result};
use deconz_bridge::gateway::GatewayClient;
use deconz_bridge::gateway::events::EventStream;
use deconz_bridge::gateway::rest::RestClient;
use deconz_bridge::storage::{self, KvStore};
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, mpsc};
use tokio_util::sync::CancellationToken;

/// Name the bridge registers under when requesting an API key.
const API_DEVICE_TYPE: &str = "deconz-bridge";
const LINK_BUTTON_RETRY: Duration = Duration::from_secs(15);
const EVENT_QUEUE_SIZE: usize = 64;

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    // Before the runtime starts: load_dotenv mutates the process environment
    config::load_dotenv();
    init_logger();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start async runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run()) {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    info!("Starting deCONZ bridge");

    let config = Config::from_env();
    config.validate()?;
    info!("Configuration loaded:");
    info!("  Gateway: {}", config.gateway.base_url());
    info!("  Storage: {}", config.storage.path.display());
    info!("  Devices: {}", config.presses.directory.display());

    let storage = KvStore::open(&config.storage.path)?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received Ctrl+C, shutting down...");
            }
            cancel.cancel();
        });
    }

    let Some(api_key) = obtain_api_key(&config, &storage, &cancel).await? else {
        return Ok(());
    };
    let client = Arc::new(RestClient::new(config.gateway.base_url(), api_key)?);

    info!("Connecting to deCONZ gateway...");
    let gateway = client.get_configuration().await?;
    let bridge = AccessoryInfo::for_bridge(&gateway);
    info!(
        "  {} ({} {}, firmware {})",
        bridge.name, gateway.device_name, gateway.bridge_id, gateway.sw_version
    );

    let presses = Arc::new(PressConfigStore::load_from_dir(&config.presses.directory));

    info!("Retrieving devices...");
    let devices = client.get_all_devices().await?;
    let ctx = AdapterContext::new(client.clone(), presses);
    let registry = Arc::new(Registry::build(&ctx, &devices).await);

    for accessory in registry.accessories() {
        info!(
            "  [{:016X}] {} ({} {}): {} endpoint(s)",
            accessory.id(),
            accessory.info().name,
            accessory.info().manufacturer,
            accessory.info().model,
            accessory.endpoints().len()
        );
    }

    // The accessory engine waits on this signal to publish changed values
    let changes = Arc::new(Notify::new());
    registry.attach_notifier(&changes);

    info!("Connecting to deCONZ event stream...");
    let stream = EventStream::connect(
        config.gateway.websocket_url(gateway.websocket_port),
        config.events.clone(),
    )
    .await?;

    let (tx, rx) = mpsc::channel(EVENT_QUEUE_SIZE);
    let stream_task = tokio::spawn(stream.run(tx, cancel.clone()));
    let dispatch_task = {
        let registry = registry.clone();
        tokio::spawn(async move { registry.run_dispatch(rx).await })
    };

    let code = storage.pairing_code()?;
    info!("deCONZ bridge is running");
    info!("  - {} accessories exposed", registry.len());
    info!("  - Pairing code: {}", storage::format_pairing_code(&code));
    info!("  - Press Ctrl+C to exit");

    // Runs until Ctrl+C cancels it or the dispatch side goes away
    let result = match stream_task.await {
        Ok(result) => result,
        Err(e) => {
            error!("Event stream task ended abnormally: {}", e);
            Err(BridgeError::EventStreamClosed)
        }
    };
    cancel.cancel();

    // The stream dropped its sender, so dispatch drains and stops
    if let Err(e) = dispatch_task.await {
        warn!("Dispatch task ended abnormally: {}", e);
    }

    info!("deCONZ bridge stopped");
    result
}

/// API key from the environment, then storage, then the gateway's link button.
///
/// Returns `None` if shut down while waiting for the link button.
async fn obtain_api_key(
    config: &Config,
    storage: &KvStore,
    cancel: &CancellationToken,
) -> Result<Option<String>> {
    if let Some(key) = &config.gateway.api_key {
        return Ok(Some(key.clone()));
    }
    if let Some(key) = storage.get(storage::API_KEY) {
        return Ok(Some(key));
    }

    let base_url = config.gateway.base_url();
    loop {
        match RestClient::request_api_key(&base_url, API_DEVICE_TYPE).await {
            Ok(key) => {
                storage.set(storage::API_KEY, &key)?;
                return Ok(Some(key));
            }
            Err(BridgeError::LinkButtonNotPressed) => {
                info!("Please unlock the gateway (link button or Phoscon app) to pair the bridge");
            }
            Err(e) => warn!("Failed to request an API key: {}", e),
        }

        tokio::select! {
            _ = cancel.cancelled() => return Ok(None),
            _ = tokio::time::sleep(LINK_BUTTON_RETRY) => {}
        }
    }
}
