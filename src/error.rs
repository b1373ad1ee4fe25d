use thiserror::Error;

/// Failures talking to the external catalog. Validation shortfalls (empty
/// query, missing price) are not errors; those operations short-circuit
/// instead, so everything here is a transport-layer condition.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog answered with a non-2xx status.
    #[error("catalog responded {status}: {body}")]
    Http { status: u16, body: String },

    /// The request never completed (connect, timeout, TLS, ...).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not the JSON shape we expect.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}
