use thiserror::Error;

/// Crate error type.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Client HTTP error (4xx)
    #[error("Client error: status code: {status_code}, error code: {error_code:?}, error message: {error_message}, error data: {error_data:?}")]
    ClientRequest {
        status_code: u16,
        error_code: Option<u16>,
        error_message: String,
        error_data: Option<String>,
    },

    /// Server HTTP error (5xx)
    #[error("Server error: status code: {status_code}, error message: {error_message}")]
    ServerRequest {
        status_code: u16,
        error_message: String,
    },

    /// Generic request error
    #[error("Generic request error: {0}")]
    GenericRequest(String),

    /// JSON parse error
    #[error("Json parse error: {0}")]
    JsonParse(String),

    /// WebSocket connection error
    #[error("Websocket error: {0}")]
    Websocket(String),

    /// WebSocket send error
    #[error("WS send error: {0}")]
    WsSend(String),

    /// Wallet address parse error
    #[error("Invalid wallet address: {0}")]
    InvalidAddress(String),
}
