use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Bind error on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error during {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("WebSocket handshake failed: {source}")]
    Handshake {
        #[source]
        source: Box<tokio_tungstenite::tungstenite::Error>,
    },
    #[error("Invalid run request: {source}")]
    InvalidRunRequest {
        #[source]
        source: serde_json::Error,
    },
    #[error("Binary frame was not valid UTF-8: {source}")]
    BinaryNotUtf8 {
        #[source]
        source: std::str::Utf8Error,
    },
    #[error("Run request is missing 'page'.")]
    MissingPage,
    #[error("Unknown page '{page}'. Use captcha or nocaptcha.")]
    UnknownPage { page: String },
    #[error("Failed to serialize {context}: {source}")]
    Serialize {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
