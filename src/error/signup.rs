use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignupError {
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
    #[error("Failed to serialize response: {source}")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },
}
