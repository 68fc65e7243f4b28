use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Failed to build HTTP client: {source}")]
    BuildClientFailed {
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to build request: {source}")]
    BuildRequestFailed {
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to serialize request body: {source}")]
    SerializeBody {
        #[source]
        source: serde_json::Error,
    },
    #[error("Request worker failed: {source}")]
    WorkerFailed {
        #[source]
        source: tokio::task::JoinError,
    },
}
