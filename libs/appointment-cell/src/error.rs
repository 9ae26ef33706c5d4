use thiserror::Error;

use shared_models::error::GatewayError;

use crate::models::AppointmentStatus;

pub const GENERIC_REMOTE_MESSAGE: &str = "Error al comunicarse con el servidor";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppointmentError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Appointment is {0} and can no longer be changed")]
    TerminalState(AppointmentStatus),

    #[error("Remote error: {message}")]
    Remote { status: Option<u16>, message: String },

    #[error("Unparseable appointment data: {0}")]
    Normalization(String),

    #[error("Appointment not found: {0}")]
    NotFound(String),
}

impl AppointmentError {
    /// Wrap a gateway failure, keeping the server's message when it sent one.
    pub fn remote(err: GatewayError, fallback: &str) -> Self {
        let message = err
            .server_message()
            .map(str::to_string)
            .unwrap_or_else(|| fallback.to_string());

        AppointmentError::Remote {
            status: err.status(),
            message,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, AppointmentError::Remote { .. })
    }
}

impl From<GatewayError> for AppointmentError {
    fn from(err: GatewayError) -> Self {
        AppointmentError::remote(err, GENERIC_REMOTE_MESSAGE)
    }
}
