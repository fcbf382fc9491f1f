//! Error types for recipe and photo fetching

use std::fmt;

/// Failures talking to the recipe API or a photo host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    InvalidUrl(String),
    /// Non-2xx HTTP status
    BadStatus(u16),
    /// Connection, TLS, timeout or body transfer failure
    Transport(String),
    /// A response that carried no usable body
    InvalidResponse,
    /// Recipe JSON with missing or empty required fields
    MalformedData,
    Decoding(String),
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::InvalidUrl(url) => write!(f, "Invalid URL: {}", url),
            NetworkError::BadStatus(code) => write!(f, "Server error with status code: {}", code),
            NetworkError::Transport(msg) => write!(f, "Transport error: {}", msg),
            NetworkError::InvalidResponse => write!(f, "Invalid server response"),
            NetworkError::MalformedData => write!(f, "Recipe data is malformed"),
            NetworkError::Decoding(msg) => write!(f, "Decoding error: {}", msg),
        }
    }
}

impl std::error::Error for NetworkError {}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => NetworkError::BadStatus(status.as_u16()),
            None => NetworkError::Transport(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, NetworkError>;

/// User-visible failure of a photo load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    Network(NetworkError),
    /// Fetched bytes are not a decodable image
    InvalidData,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Network(err) => write!(f, "{}", err),
            LoadError::InvalidData => write!(f, "Invalid data received"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Network(err) => Some(err),
            LoadError::InvalidData => None,
        }
    }
}

impl From<NetworkError> for LoadError {
    fn from(err: NetworkError) -> Self {
        LoadError::Network(err)
    }
}

/// Top-level error for the `recipe-photos` binary
#[derive(Debug)]
pub enum AppError {
    Config(String),
    Network(NetworkError),
    Cache(recipe_image_cache::CacheError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Network(err) => write!(f, "Network error: {}", err),
            AppError::Cache(err) => write!(f, "Cache error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Network(err) => Some(err),
            AppError::Cache(err) => Some(err),
            AppError::Config(_) => None,
        }
    }
}

impl From<NetworkError> for AppError {
    fn from(err: NetworkError) -> Self {
        AppError::Network(err)
    }
}

impl From<recipe_image_cache::CacheError> for AppError {
    fn from(err: recipe_image_cache::CacheError) -> Self {
        AppError::Cache(err)
    }
}

impl From<tracing_subscriber::filter::ParseError> for AppError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        AppError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_status_display() {
        let err = NetworkError::BadStatus(503);
        assert_eq!(format!("{}", err), "Server error with status code: 503");
    }

    #[test]
    fn test_malformed_data_display() {
        assert_eq!(
            format!("{}", NetworkError::MalformedData),
            "Recipe data is malformed"
        );
    }

    #[test]
    fn test_load_error_wraps_network_error() {
        let err = LoadError::from(NetworkError::InvalidResponse);
        assert_eq!(format!("{}", err), "Invalid server response");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::Config("bad directive".to_string());
        assert_eq!(format!("{}", err), "Configuration error: bad directive");

        let err = AppError::from(NetworkError::BadStatus(500));
        assert_eq!(
            format!("{}", err),
            "Network error: Server error with status code: 500"
        );
    }

    #[test]
    fn test_invalid_data_display() {
        assert_eq!(format!("{}", LoadError::InvalidData), "Invalid data received");
    }
}
