use sha2::{Digest, Sha256};
use std::io::Write;

/// Compute SHA256(SHA256(data))
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    second.into()
}

/// Compute SHA256(data)
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// HashWriter wraps a Sha256 hasher to implement the Write trait, so that
/// consensus structures can stream their wire encoding straight into the
/// digest without an intermediate buffer.
#[derive(Clone)]
pub struct HashWriter(Sha256);

impl HashWriter {
    pub fn new() -> Self {
        Self(Sha256::new())
    }

    /// Feed bytes into the digest
    pub fn update(&mut self, bytes: &[u8]) {
        self.0.update(bytes);
    }

    pub fn finalize(self) -> [u8; 32] {
        self.0.finalize().into()
    }

    /// Finalize the stream and hash the digest a second time (SHA256d).
    pub fn finalize_double(self) -> [u8; 32] {
        Sha256::digest(self.0.finalize()).into()
    }
}

impl Write for HashWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Default for HashWriter {
    fn default() -> Self {
        Self::new()
    }
}
