//! Development tool for inspecting a deCONZ gateway and press descriptors.
//!
//! Usage:
//!   cargo run --bin deconz-probe -- id 00:17:88:01:02:03:04:05
//!   cargo run --bin deconz-probe -- devices
//!   cargo run --bin deconz-probe -- events --count 10
//!   cargo run --bin deconz-probe -- presses RWL021
//!   cargo run --bin deconz-probe -- generate-presses --out ./devices

use clap::{Parser, Subcommand};
use deconz_bridge::accessory::device::Capability;
use deconz_bridge::accessory::identifier::derive_id;
use deconz_bridge::accessory::press_config::PressConfigStore;
use deconz_bridge::accessory::press_generator::{self, BUTTON_MAPS_URL, ButtonMapFile};
use deconz_bridge::gateway::GatewayClient;
use deconz_bridge::gateway::events::decode;
use deconz_bridge::gateway::rest::RestClient;
use futures_util::StreamExt;
use std::path::PathBuf;
use tokio_tungstenite::{connect_async, tungstenite::Message};

#[derive(Parser)]
#[command(name = "deconz-probe")]
#[command(about = "Development tool for the deCONZ bridge")]
struct Cli {
    /// Gateway host or IP address
    #[arg(long, env = "DECONZ_IP")]
    host: Option<String>,

    /// Gateway REST port
    #[arg(long, env = "DECONZ_PORT", default_value_t = 80)]
    port: u16,

    /// Gateway API key
    #[arg(long, env = "DECONZ_API_KEY")]
    api_key: Option<String>,

    /// Directory of press descriptors
    #[arg(long, env = "DEVICES_DIR", default_value = "./devices")]
    devices_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the accessory id derived from a gateway unique id
    Id { unique_id: String },
    /// List gateway devices and how each subdevice would be exposed
    Devices,
    /// Print live gateway events
    Events {
        /// Stop after this many events
        #[arg(long)]
        count: Option<usize>,
    },
    /// Show the press descriptor for a remote model
    Presses { model: String },
    /// Generate press descriptors from the deCONZ button map table
    GeneratePresses {
        /// URL or local path of button_maps.json
        #[arg(long, default_value = BUTTON_MAPS_URL)]
        source: String,

        /// Output directory
        #[arg(long, default_value = "./devices")]
        out: PathBuf,
    },
}

type ProbeResult<T> = Result<T, Box<dyn std::error::Error>>;

impl Cli {
    fn base_url(&self) -> ProbeResult<String> {
        let host = self
            .host
            .as_deref()
            .ok_or("DECONZ_IP (or --host) is required for this command")?;
        Ok(format!("http://{}:{}", host, self.port))
    }

    fn client(&self) -> ProbeResult<RestClient> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or("DECONZ_API_KEY (or --api-key) is required for this command")?;
        Ok(RestClient::new(self.base_url()?, api_key)?)
    }
}

#[tokio::main]
async fn main() -> ProbeResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Id { unique_id } => {
            let id = derive_id(unique_id);
            println!("{} -> {} (0x{:016X})", unique_id, id, id);
        }
        Commands::Devices => list_devices(&cli).await?,
        Commands::Events { count } => watch_events(&cli, *count).await?,
        Commands::Presses { model } => {
            let store = PressConfigStore::load_from_dir(&cli.devices_dir);
            match store.get(model) {
                Some(config) => println!("{}", serde_json::to_string_pretty(config.as_ref())?),
                None => {
                    eprintln!(
                        "No press configuration for {} in {}",
                        model,
                        cli.devices_dir.display()
                    );
                    std::process::exit(1);
                }
            }
        }
        Commands::GeneratePresses { source, out } => {
            println!("Reading button maps from {}...", source);
            let maps: ButtonMapFile = if source.starts_with("http://") || source.starts_with("https://") {
                reqwest::get(source).await?.error_for_status()?.json().await?
            } else {
                serde_json::from_slice(&std::fs::read(source)?)?
            };
            let generated = maps.generate();
            let written = press_generator::write_all(&generated, out)?;
            println!("Wrote {} descriptors to {}", written, out.display());
        }
    }

    Ok(())
}

async fn list_devices(cli: &Cli) -> ProbeResult<()> {
    let client = cli.client()?;
    let presses = PressConfigStore::load_from_dir(&cli.devices_dir);

    for device in client.get_all_devices().await? {
        println!(
            "{} [{:016X}] {} / {}",
            device.display_name(),
            derive_id(&device.unique_id),
            device.manufacturer,
            device.model_id
        );
        for subdevice in &device.subdevices {
            let exposed = match Capability::for_tag(&subdevice.device_type) {
                Some(Capability::Switch) if presses.get(&device.model_id).is_none() => {
                    "switch (no press configuration)".to_string()
                }
                Some(capability) => format!("{:?}", capability),
                None => "not implemented".to_string(),
            };
            println!(
                "    {} {} -> {}",
                subdevice.unique_id, subdevice.device_type, exposed
            );
        }
    }
    Ok(())
}

async fn watch_events(cli: &Cli, count: Option<usize>) -> ProbeResult<()> {
    let config = cli.client()?.get_configuration().await?;
    let host = cli.host.as_deref().unwrap_or_default();
    let url = format!("ws://{}:{}", host, config.websocket_port);

    println!("Connecting to {}...", url);
    let (mut socket, _) = connect_async(url.as_str()).await?;
    println!("Connected!");

    let mut seen = 0usize;
    while let Some(frame) = socket.next().await {
        let Message::Text(text) = frame? else {
            continue;
        };
        match decode(text.as_str()) {
            Ok(event) => println!(
                "{:?} {:?} {} state={} config={}",
                event.event,
                event.resource,
                event.unique_id.as_deref().unwrap_or("-"),
                event
                    .state
                    .as_ref()
                    .map(|s| serde_json::to_string(s).unwrap_or_default())
                    .unwrap_or_default(),
                event
                    .config
                    .as_ref()
                    .map(|c| serde_json::to_string(c).unwrap_or_default())
                    .unwrap_or_default(),
            ),
            Err(e) => eprintln!("Malformed event: {} ({})", text.as_str(), e),
        }

        seen += 1;
        if count.is_some_and(|limit| seen >= limit) {
            break;
        }
    }
    Ok(())
}
