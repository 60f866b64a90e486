//! Frame types and JPEG encoding

use crate::FrameError;
use image::codecs::jpeg::JpegEncoder;

/// JPEG quality used for frames sent to the classifier.
const JPEG_QUALITY: u8 = 80;

/// Raw RGB video frame as captured from the device
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
}

impl RawFrame {
    /// Create a new raw frame from RGB data
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
        }
    }

    /// Encode to JPEG for transport to the classifier
    pub fn encode(&self) -> Result<EncodedFrame, FrameError> {
        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY).encode(
            &self.data,
            self.width,
            self.height,
            image::ExtendedColorType::Rgb8,
        )?;

        Ok(EncodedFrame {
            jpeg,
            width: self.width,
            height: self.height,
        })
    }
}

/// JPEG-encoded frame plus its capture dimensions
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    /// JPEG bytes
    pub jpeg: Vec<u8>,
    /// Capture width
    pub width: u32,
    /// Capture height
    pub height: u32,
}
