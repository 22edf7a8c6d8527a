//! Frame compression for upload.
//!
//! Captured frames are raw rasters; the recognition endpoint expects a
//! compressed image file. This module turns one into the other.

mod jpeg;

pub use jpeg::{EncodeError, FrameEncoder};

/// A compressed image ready to be attached to a multipart request.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    bytes: Vec<u8>,
    width: u32,
    height: u32,
    mime: &'static str,
}

impl EncodedImage {
    pub fn new(bytes: Vec<u8>, width: u32, height: u32, mime: &'static str) -> Self {
        Self {
            bytes,
            width,
            height,
            mime,
        }
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the image, returning the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// MIME type of the encoded bytes.
    #[inline]
    pub fn mime(&self) -> &'static str {
        self.mime
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("mime", &self.mime)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}
