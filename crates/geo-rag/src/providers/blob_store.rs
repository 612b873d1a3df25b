//! Blob store provider trait for uploaded payloads

use async_trait::async_trait;
use crate::error::{Error, Result};

/// Trait for durable byte storage addressed by path
///
/// Implementations:
/// - `LocalBlobStore`: Local filesystem
/// - `MemoryBlobStore`: In-process map (tests, single-process demos)
#[async_trait]
pub trait BlobStoreProvider: Send + Sync {
    /// Store `data` at `path`, overwriting any existing object
    async fn put(&self, path: &str, data: &[u8], content_type: &str) -> Result<()>;

    /// Retrieve the object at `path`
    async fn get(&self, path: &str) -> Result<Vec<u8>>;

    /// Check if an object exists
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Check if the provider is healthy
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Reject object paths that could escape the store root.
///
/// Paths are relative, `/`-separated, and may not contain empty, `.` or `..`
/// segments.
pub fn validate_object_path(path: &str) -> Result<()> {
    if path.is_empty() || path.starts_with('/') || path.contains('\\') {
        return Err(Error::storage(format!("Invalid object path: {:?}", path)));
    }
    if path
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(Error::storage(format!("Invalid object path: {:?}", path)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_object_path() {
        assert!(validate_object_path("abc/x.tif").is_ok());
        assert!(validate_object_path("/etc/passwd").is_err());
        assert!(validate_object_path("abc/../x.tif").is_err());
        assert!(validate_object_path("abc//x.tif").is_err());
        assert!(validate_object_path("").is_err());
    }
}
