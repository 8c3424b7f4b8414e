use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("invalid response payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("background load worker disconnected")]
    Disconnected,
}
