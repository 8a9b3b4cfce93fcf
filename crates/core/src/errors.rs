use thiserror::Error;

/// Failures produced by the pricing engine and input validation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("products not found: {}", missing.join(", "))]
    UnresolvedItems { missing: Vec<String> },
    #[error("invalid quote input: {0}")]
    InvalidInput(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("storage failure: {0}")]
    Persistence(String),
    #[error("external service failure: {0}")]
    Integration(String),
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// What leaves the process boundary. Every interface error carries the
/// correlation id of the request that produced it so log lines and client
/// reports can be matched up.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl ApplicationError {
    /// Domain rejections are the caller's fault; persistence and integration
    /// failures are retryable; a configuration problem is ours alone.
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        match self {
            Self::Domain(domain) => {
                InterfaceError::BadRequest { message: domain.to_string(), correlation_id }
            }
            Self::Persistence(message) | Self::Integration(message) => {
                InterfaceError::ServiceUnavailable { message, correlation_id }
            }
            Self::Configuration(message) => {
                InterfaceError::Internal { message, correlation_id }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ApplicationError, DomainError, InterfaceError};

    #[test]
    fn unresolved_items_map_to_bad_request_with_identifiers() {
        let interface = ApplicationError::from(DomainError::UnresolvedItems {
            missing: vec!["SKU-404".to_owned(), "Tarima 2x1".to_owned()],
        })
        .into_interface("req-1");

        match interface {
            InterfaceError::BadRequest { message, correlation_id } => {
                assert!(message.contains("SKU-404"));
                assert!(message.contains("Tarima 2x1"));
                assert_eq!(correlation_id, "req-1");
            }
            other => panic!("expected bad request, got {other:?}"),
        }
    }

    #[test]
    fn persistence_error_maps_to_service_unavailable() {
        let interface =
            ApplicationError::Persistence("database lock timeout".to_owned()).into_interface("r-2");
        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
    }

    #[test]
    fn configuration_error_maps_to_internal() {
        let interface = ApplicationError::Configuration("missing signing secret".to_owned())
            .into_interface("r-3");
        assert!(matches!(interface, InterfaceError::Internal { .. }));
    }
}
