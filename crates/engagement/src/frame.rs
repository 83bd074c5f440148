//! Decoded webcam frames

use thiserror::Error;

/// Frame construction errors
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Pixel buffer is {actual} bytes, expected {expected} for {width}x{height} RGB")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("Frame has zero area")]
    Empty,
}

/// Decoded RGB video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Receive timestamp (nanoseconds)
    pub timestamp_ns: u64,
    /// Per-connection frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Create a frame from raw RGB data, checking the buffer matches the dimensions
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        timestamp_ns: u64,
        sequence: u32,
    ) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::Empty);
        }
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(FrameError::BufferSize {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            data,
            width,
            height,
            timestamp_ns,
            sequence,
        })
    }

    /// Decode an encoded image (JPEG, PNG, ...) into an RGB frame
    pub fn decode(bytes: &[u8], timestamp_ns: u64, sequence: u32) -> Result<Self, FrameError> {
        let img = image::load_from_memory(bytes).map_err(|e| FrameError::Decode(e.to_string()))?;
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();

        Self::new(rgb.into_raw(), width, height, timestamp_ns, sequence)
    }

    /// Mean luminance (0-255)
    pub fn mean_luminance(&self) -> f32 {
        let pixels = (self.width * self.height) as f32;
        let total: f32 = self
            .data
            .chunks_exact(3)
            .map(|p| p[0] as f32 * 0.299 + p[1] as f32 * 0.587 + p[2] as f32 * 0.114)
            .sum();
        total / pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, ImageFormat, Rgb};
    use std::io::Cursor;

    #[test]
    fn test_new_rejects_short_buffer() {
        let err = VideoFrame::new(vec![0; 10], 2, 2, 0, 0).unwrap_err();
        assert!(matches!(err, FrameError::BufferSize { expected: 12, actual: 10, .. }));
    }

    #[test]
    fn test_new_rejects_empty_frame() {
        assert!(matches!(
            VideoFrame::new(Vec::new(), 0, 4, 0, 0),
            Err(FrameError::Empty)
        ));
    }

    #[test]
    fn test_decode_png() {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_fn(4, 3, |x, _| Rgb([x as u8 * 10, 0, 0]));
        let mut encoded = Vec::new();
        img.write_to(&mut Cursor::new(&mut encoded), ImageFormat::Png)
            .unwrap();

        let frame = VideoFrame::decode(&encoded, 42, 7).unwrap();
        assert_eq!(frame.width, 4);
        assert_eq!(frame.height, 3);
        assert_eq!(frame.sequence, 7);
        assert_eq!(frame.data.len(), 4 * 3 * 3);
        assert_eq!(&frame.data[9..12], &[30, 0, 0]);
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            VideoFrame::decode(b"not an image", 0, 0),
            Err(FrameError::Decode(_))
        ));
    }

    #[test]
    fn test_mean_luminance() {
        let frame = VideoFrame::new(vec![255; 12], 2, 2, 0, 0).unwrap();
        assert!((frame.mean_luminance() - 255.0).abs() < 0.1);
    }
}
