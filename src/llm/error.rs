use std::fmt;

/// Errors that can occur while talking to the provider.
/// Variants carry enough info to tell configuration mistakes apart from
/// transient transport failures.
#[derive(Debug)]
pub enum ClientError {
    /// Client misconfigured (malformed endpoint, bad credential shape,
    /// transport setup failure). Construction fails with this.
    Config(String),
    /// Operation attempted before construction succeeded or after `close()`.
    NotInitialized,
    /// Network-level failure (timeout, DNS, connection refused, mid-stream drop).
    Network(String),
    /// The endpoint returned a non-success HTTP response.
    Api { status: u16, message: String },
    /// Failed to parse the provider's response.
    Parse(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Config(msg) => write!(f, "config error: {msg}"),
            ClientError::NotInitialized => write!(f, "client is not initialized"),
            ClientError::Network(msg) => write!(f, "network error: {msg}"),
            ClientError::Api { status, message } => {
                write!(f, "API error (HTTP {status}): {message}")
            }
            ClientError::Parse(msg) => write!(f, "parse error: {msg}"),
        }
    }
}

impl std::error::Error for ClientError {}
