//! Scoped synchronous calls around asynchronous operations.
//!
//! I/O performed by the loaders is written as futures so an asynchronous
//! backend can be plugged in later, but every public loader blocks until the
//! operation has completed. [`wait`] is the single place where that happens;
//! no future ever escapes a component's public contract.

use std::future::IntoFuture;
use std::path::{Path, PathBuf};

/// Drives an asynchronous operation to completion on the current thread and
/// returns its output.
pub fn wait<F: IntoFuture>(operation: F) -> F::Output {
    pollster::block_on(operation.into_future())
}

/// Reads a whole file as an asynchronous operation.
///
/// The body is a plain blocking read today, so the future is ready on first
/// poll; the signature is where an asynchronous file backend would go.
pub async fn read_file(path: PathBuf) -> std::io::Result<Vec<u8>> {
    std::fs::read(&path)
}

/// Reads a whole file, blocking until the read has completed.
pub fn read_file_blocking(path: &Path) -> std::io::Result<Vec<u8>> {
    wait(read_file(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_wait_returns_output() {
        let value = wait(async { 40 + 2 });
        assert_eq!(value, 42);
    }

    #[test]
    fn test_wait_propagates_errors() {
        let result: Result<(), std::io::Error> = wait(async {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "boom"))
        });
        assert_eq!(result.unwrap_err().to_string(), "boom");
    }

    #[test]
    fn test_read_file_blocking() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "payload").unwrap();
        let bytes = read_file_blocking(file.path()).unwrap();
        assert_eq!(bytes, b"payload");
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_file_blocking(Path::new("/nonexistent/dir/file.bin")).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
