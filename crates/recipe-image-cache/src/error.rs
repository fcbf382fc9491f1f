//! Error types for the image cache

use std::fmt;
use std::io;

#[derive(Debug)]
pub enum CacheError {
    /// No entry is stored under the requested key
    NotFound,
    DiskWriteFailed(Box<io::Error>),
    DiskReadFailed(Box<io::Error>),
    DirectoryCreationFailed(Box<io::Error>),
    /// Stored bytes could not be decoded into an image
    CorruptEntry,
    Encode(String),
}

impl CacheError {
    pub fn write(err: io::Error) -> Self {
        CacheError::DiskWriteFailed(Box::new(err))
    }

    /// Maps `NotFound` I/O errors to [`CacheError::NotFound`]
    pub fn read(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            CacheError::NotFound
        } else {
            CacheError::DiskReadFailed(Box::new(err))
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound)
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::NotFound => write!(f, "Cache entry not found"),
            CacheError::DiskWriteFailed(err) => write!(f, "Disk write failed: {}", err),
            CacheError::DiskReadFailed(err) => write!(f, "Disk read failed: {}", err),
            CacheError::DirectoryCreationFailed(err) => {
                write!(f, "Cache directory creation failed: {}", err)
            }
            CacheError::CorruptEntry => write!(f, "Corrupt cache entry"),
            CacheError::Encode(msg) => write!(f, "Image encoding failed: {}", msg),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::DiskWriteFailed(err)
            | CacheError::DiskReadFailed(err)
            | CacheError::DirectoryCreationFailed(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<::image::ImageError> for CacheError {
    fn from(err: ::image::ImageError) -> Self {
        CacheError::Encode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
