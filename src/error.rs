//! Unified error type for correlog.
//!
//! Only setup and outbound-call failures surface as [`CorrelogError`].
//! Request-time faults inside the middleware are turned into JSON
//! responses and never reach the caller as errors.

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CorrelogError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Logging already initialized: {0}")]
    LoggingInit(String),

    #[error("Invalid URI: {source}")]
    UriParse {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid correlation header value: {0}")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),

    #[error("HTTP request failed: {source}")]
    HttpRequest {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid address: {0}")]
    AddressParse(#[from] std::net::AddrParseError),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_configuration_names_the_problem() {
        let err = CorrelogError::InvalidConfiguration("service name must not be empty".into());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: service name must not be empty"
        );
    }

    #[test]
    fn http_request_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = CorrelogError::HttpRequest {
            source: Box::new(io),
        };
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.to_string(), "HTTP request failed: refused");
    }
}
