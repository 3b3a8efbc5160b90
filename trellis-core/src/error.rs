// Error types for the Trellis framework

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Fatal misconfiguration detected during bootstrap. Halts startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A scanned module could not be constructed. Recoverable; the module
    /// is skipped and bootstrap continues.
    #[error("Instantiation error: {0}")]
    Instantiation(String),

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("Route not found: {0}")]
    RouteNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::RouteNotFound(_) => 404,
            Error::Deserialization(_) => 400,
            _ => 500,
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::RouteNotFound("GET /x".into()).status_code(), 404);
        assert_eq!(Error::Deserialization("bad json".into()).status_code(), 400);
        assert_eq!(Error::Configuration("empty package list".into()).status_code(), 500);
        assert_eq!(Error::Instantiation("no constructor".into()).status_code(), 500);
    }

    #[test]
    fn test_error_classes() {
        assert!(Error::RouteNotFound("GET /x".into()).is_client_error());
        assert!(Error::Internal("boom".into()).is_server_error());
        assert!(!Error::Internal("boom".into()).is_client_error());
    }

    #[test]
    fn test_display() {
        let err = Error::Configuration("no url patterns declared for 'app::X'".into());
        assert!(err.to_string().contains("Configuration error"));
    }
}
