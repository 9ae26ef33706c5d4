use thiserror::Error;

/// Failure talking to the remote REST service.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("Transport error: {0}")]
    Http(String),

    #[error("Authentication error ({status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("API error ({status}): {message}")]
    Status { status: u16, message: String },

    #[error("Invalid response body: {0}")]
    Decode(String),
}

impl GatewayError {
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Unauthorized { status, .. } | GatewayError::Status { status, .. } => Some(*status),
            GatewayError::Http(_) | GatewayError::Decode(_) => None,
        }
    }

    /// Message reported by the server, if the failure carried one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            GatewayError::Unauthorized { message, .. } | GatewayError::Status { message, .. }
                if !message.is_empty() => Some(message),
            _ => None,
        }
    }
}
