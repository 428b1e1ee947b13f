//! Error conversion helpers for key-value store operations

use std::io;

use crate::application::{ApplicationError, ApplicationResult};

/// Extension trait for converting `io::Result` to `ApplicationResult` with context.
pub trait IoResultExt<T> {
    /// Add the storage key to an I/O error.
    ///
    /// # Example
    /// ```ignore
    /// kv.get(&key).with_key_context("read", &key)?;
    /// ```
    fn with_key_context(self, action: &str, key: &str) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_key_context(self, action: &str, key: &str) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::OperationFailed {
            context: format!("{action} '{key}'"),
            source: Box::new(e),
        })
    }
}
