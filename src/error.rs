use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum BridgeError {
    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    #[error("Gateway rejected request: {0}")]
    GatewayRejected(String),

    #[error("Link button on the gateway has not been pressed")]
    LinkButtonNotPressed,

    #[error("Capability not implemented: {0}")]
    UnsupportedCapability(String),

    #[error("No press configuration for model {0}")]
    MissingPressConfiguration(String),

    #[error("Device {0} has no supported services")]
    NoServices(String),

    #[error("Command not supported by {service}: {command}")]
    UnsupportedCommand {
        service: &'static str,
        command: String,
    },

    #[error("Event stream closed")]
    EventStreamClosed,

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
