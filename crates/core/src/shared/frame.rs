use ndarray::ArrayView3;
use serde::{Deserialize, Serialize};

use crate::detection::domain::face_detector::DetectionError;

/// Order of the three colour channels inside a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

impl ChannelOrder {
    /// Source channel index feeding destination channel `c` when converting
    /// from `self` to `target`.
    pub fn source_index(self, target: ChannelOrder, c: usize) -> usize {
        if self == target {
            c
        } else {
            2 - c
        }
    }
}

/// A decoded image: contiguous 3-channel bytes in row-major order.
///
/// The channel order is part of the value, so consumers never guess whether
/// a buffer holds RGB or BGR.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    order: ChannelOrder,
}

impl Frame {
    pub const CHANNELS: usize = 3;

    /// Wraps a pixel buffer, rejecting zero-area images and buffers whose
    /// length disagrees with the dimensions.
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        order: ChannelOrder,
    ) -> Result<Self, DetectionError> {
        if width == 0 || height == 0 {
            return Err(DetectionError::InvalidInput(format!(
                "image must have a non-zero area, got {width}x{height}"
            )));
        }
        let expected = width as usize * height as usize * Self::CHANNELS;
        if data.len() != expected {
            return Err(DetectionError::InvalidInput(format!(
                "pixel buffer holds {} bytes, expected {expected} for {width}x{height}x3",
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
            order,
        })
    }

    /// Convenience constructor for RGB buffers.
    pub fn rgb(data: Vec<u8>, width: u32, height: u32) -> Result<Self, DetectionError> {
        Self::new(data, width, height, ChannelOrder::Rgb)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channel_order(&self) -> ChannelOrder {
        self.order
    }

    /// Pixel value at (`row`, `col`) in the requested channel order.
    pub fn pixel(&self, row: usize, col: usize, order: ChannelOrder) -> [u8; 3] {
        let offset = (row * self.width as usize + col) * Self::CHANNELS;
        let px = &self.data[offset..offset + Self::CHANNELS];
        [
            px[self.order.source_index(order, 0)],
            px[self.order.source_index(order, 1)],
            px[self.order.source_index(order, 2)],
        ]
    }

    /// Returns a copy of this frame with its channels reordered.
    pub fn to_order(&self, order: ChannelOrder) -> Frame {
        if order == self.order {
            return self.clone();
        }
        let mut data = self.data.clone();
        for px in data.chunks_exact_mut(Self::CHANNELS) {
            px.swap(0, 2);
        }
        Frame {
            data,
            width: self.width,
            height: self.height,
            order,
        }
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(
            (self.height as usize, self.width as usize, Self::CHANNELS),
            &self.data,
        )
        .expect("Frame data length must match dimensions")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::rgb(data.clone(), 2, 2).unwrap();
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channel_order(), ChannelOrder::Rgb);
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    fn test_zero_area_is_invalid_input() {
        let err = Frame::rgb(Vec::new(), 0, 10).unwrap_err();
        assert!(matches!(err, DetectionError::InvalidInput(_)));
    }

    #[test]
    fn test_mismatched_length_is_invalid_input() {
        let err = Frame::rgb(vec![0u8; 10], 2, 2).unwrap_err();
        assert!(matches!(err, DetectionError::InvalidInput(_)));
    }

    #[test]
    fn test_pixel_reads_in_requested_order() {
        // one BGR pixel: B=10, G=20, R=30
        let frame = Frame::new(vec![10, 20, 30], 1, 1, ChannelOrder::Bgr).unwrap();
        assert_eq!(frame.pixel(0, 0, ChannelOrder::Rgb), [30, 20, 10]);
        assert_eq!(frame.pixel(0, 0, ChannelOrder::Bgr), [10, 20, 30]);
    }

    #[test]
    fn test_to_order_swaps_red_and_blue() {
        let frame = Frame::new(vec![1, 2, 3, 4, 5, 6], 2, 1, ChannelOrder::Bgr).unwrap();
        let rgb = frame.to_order(ChannelOrder::Rgb);
        assert_eq!(rgb.data(), &[3, 2, 1, 6, 5, 4]);
        assert_eq!(rgb.channel_order(), ChannelOrder::Rgb);
        // original untouched
        assert_eq!(frame.data(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_as_ndarray_shape() {
        let frame = Frame::rgb(vec![0u8; 24], 4, 2).unwrap();
        assert_eq!(frame.as_ndarray().shape(), &[2, 4, 3]); // (height, width, channels)
    }
}
