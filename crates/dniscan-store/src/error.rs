use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no row with id {0}")]
    NotFound(i64),

    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[cfg(feature = "http")]
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}
