//! Web server error types.

/// Errors raised while starting or running a server.
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The server stopped with an I/O error.
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),

    /// The stdio transport failed.
    #[error("stdio transport error: {0}")]
    Stdio(#[source] std::io::Error),
}
