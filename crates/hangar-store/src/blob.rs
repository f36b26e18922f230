//! Readable handle returned by [`Backend::get_blob`](crate::Backend::get_blob).

use std::fmt;
use std::io::{self, Read};

use crate::error::{StoreError, StoreResult};

/// Reject keys no engine can address.
pub(crate) fn validate_key(key: &str) -> StoreResult<()> {
    if key.is_empty() {
        return Err(StoreError::InvalidBlobKey);
    }
    Ok(())
}

/// An open blob.
///
/// The handle owns whatever resource backs the stream (a file handle, a
/// shared buffer). Dropping it releases that resource on every path,
/// including early returns after a failed read; [`close`](Self::close) does
/// the same explicitly.
pub struct BlobData {
    key: String,
    reader: Box<dyn Read + Send>,
}

impl BlobData {
    pub fn new(key: impl Into<String>, reader: impl Read + Send + 'static) -> Self {
        Self {
            key: key.into(),
            reader: Box::new(reader),
        }
    }

    /// The key the blob was stored under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Release the underlying resource.
    pub fn close(self) {}

    /// Read the remaining bytes and release the handle.
    pub fn read_to_vec(mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.reader.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl Read for BlobData {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl fmt::Debug for BlobData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobData").field("key", &self.key).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct TrackedReader {
        inner: Cursor<Vec<u8>>,
        released: Arc<AtomicBool>,
    }

    impl Read for TrackedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl Drop for TrackedReader {
        fn drop(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    fn tracked(data: &[u8]) -> (BlobData, Arc<AtomicBool>) {
        let released = Arc::new(AtomicBool::new(false));
        let reader = TrackedReader {
            inner: Cursor::new(data.to_vec()),
            released: Arc::clone(&released),
        };
        (BlobData::new("k", reader), released)
    }

    #[test]
    fn read_to_vec_returns_contents_and_releases() {
        let (blob, released) = tracked(b"payload");
        assert_eq!(blob.read_to_vec().unwrap(), b"payload");
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn close_releases_unread_blob() {
        let (blob, released) = tracked(b"never read");
        assert!(!released.load(Ordering::SeqCst));
        blob.close();
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn drop_releases_after_partial_read() {
        let (mut blob, released) = tracked(b"abcdef");
        let mut buf = [0u8; 2];
        blob.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ab");
        drop(blob);
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn debug_shows_key() {
        let blob = BlobData::new("artifact.tar", io::empty());
        assert!(format!("{blob:?}").contains("artifact.tar"));
    }
}
