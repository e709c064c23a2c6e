//! Fixed-size face crops for downstream recognition models.

use crate::detection::cascade::image_resampler::resize;
use crate::detection::domain::face_annotation::BoundingBox;
use crate::shared::config::AlignmentConfig;
use crate::shared::frame::{ChannelOrder, Frame};

/// A `size × size` RGB face crop as floats, row-major with interleaved
/// channels.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedFace {
    data: Vec<f32>,
    size: u32,
    whitened: bool,
}

impl AlignedFace {
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn is_whitened(&self) -> bool {
        self.whitened
    }

    /// Converts back to 8-bit pixels for viewing.
    ///
    /// Whitened values are stretched min-max onto 0..=255; raw values are
    /// rounded and clamped.
    pub fn to_frame(&self) -> Frame {
        let bytes: Vec<u8> = if self.whitened {
            let (lo, hi) = self
                .data
                .iter()
                .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                    (lo.min(v), hi.max(v))
                });
            let range = hi - lo;
            self.data
                .iter()
                .map(|&v| {
                    if range > 0.0 {
                        ((v - lo) / range * 255.0).round() as u8
                    } else {
                        0
                    }
                })
                .collect()
        } else {
            self.data
                .iter()
                .map(|&v| v.round().clamp(0.0, 255.0) as u8)
                .collect()
        };
        Frame::rgb(bytes, self.size, self.size).expect("aligned buffer matches its size")
    }
}

/// Crops `bbox` plus half the configured margin on each side (clamped to the
/// image), resizes to the configured square and optionally pre-whitens.
///
/// Returns `None` when the clamped crop has no area or the target size is
/// zero.
pub fn align_face(frame: &Frame, bbox: &BoundingBox, config: &AlignmentConfig) -> Option<AlignedFace> {
    let half = (config.margin / 2) as i32;
    let (w, h) = (frame.width() as i32, frame.height() as i32);
    let x1 = (bbox.x - half).max(0);
    let y1 = (bbox.y - half).max(0);
    let x2 = (bbox.x + bbox.w + half).min(w);
    let y2 = (bbox.y + bbox.h + half).min(h);
    if x2 <= x1 || y2 <= y1 || config.size == 0 {
        return None;
    }

    let crop = crop_rgb(frame, x1 as u32, y1 as u32, x2 as u32, y2 as u32)?;
    let scaled = resize(&crop, config.size, config.size);
    let mut data: Vec<f32> = scaled.data().iter().map(|&v| v as f32).collect();
    if config.pre_whitening {
        prewhiten(&mut data);
    }
    Some(AlignedFace {
        data,
        size: config.size,
        whitened: config.pre_whitening,
    })
}

/// Standardises `values` to zero mean and unit variance, with the standard
/// deviation floored at `1 / sqrt(n)`.
pub fn prewhiten(values: &mut [f32]) {
    if values.is_empty() {
        return;
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var = values
        .iter()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    let std_adj = var.sqrt().max(1.0 / n.sqrt());
    for v in values.iter_mut() {
        *v = ((*v as f64 - mean) / std_adj) as f32;
    }
}

fn crop_rgb(frame: &Frame, x1: u32, y1: u32, x2: u32, y2: u32) -> Option<Frame> {
    let rgb = frame.to_order(ChannelOrder::Rgb);
    let img = image::RgbImage::from_raw(rgb.width(), rgb.height(), rgb.data().to_vec())?;
    let crop = image::imageops::crop_imm(&img, x1, y1, x2 - x1, y2 - y1).to_image();
    let (w, h) = crop.dimensions();
    Frame::rgb(crop.into_raw(), w, h).ok()
}
