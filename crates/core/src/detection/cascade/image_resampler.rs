//! Pixel-to-tensor plumbing for the three networks.
//!
//! Frames are resized with the `image` crate's bilinear (triangle) filter,
//! reordered to the channel order the networks were trained on and mapped
//! to `[-1, 1)` with `(v - 127.5) / 128`.

use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::{concatenate, Array4, ArrayView4, Axis};

use crate::detection::domain::candidate_box::CandidateBox;
use crate::detection::domain::padding::{pad, PaddingDescriptor};
use crate::shared::config::InputLayout;
use crate::shared::constants::{PIXEL_MEAN, PIXEL_SCALE};
use crate::shared::frame::{ChannelOrder, Frame};

/// Bilinear resize to `width` × `height`, keeping the channel order.
pub fn resize(frame: &Frame, width: u32, height: u32) -> Frame {
    if frame.width() == width && frame.height() == height {
        return frame.clone();
    }
    let src = RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
        .expect("Frame data length must match dimensions");
    let dst = imageops::resize(&src, width, height, FilterType::Triangle);
    Frame::new(dst.into_raw(), width, height, frame.channel_order())
        .expect("resized buffer matches requested dimensions")
}

/// Normalised `(1, height, width, 3)` tensor with channels in `order`.
pub fn normalize(frame: &Frame, order: ChannelOrder) -> Array4<f32> {
    let h = frame.height() as usize;
    let w = frame.width() as usize;
    let src = frame.as_ndarray();
    let from = frame.channel_order();
    Array4::from_shape_fn((1, h, w, Frame::CHANNELS), |(_, y, x, c)| {
        (src[[y, x, from.source_index(order, c)]] as f32 - PIXEL_MEAN) * PIXEL_SCALE
    })
}

/// Copies the source window of `pad` into a zero-filled `tmph × tmpw` frame.
///
/// Returns `None` for an empty descriptor.
pub fn crop_padded(frame: &Frame, pad: &PaddingDescriptor) -> Option<Frame> {
    if pad.is_empty() {
        return None;
    }
    let tmpw = pad.tmpw as usize;
    let tmph = pad.tmph as usize;
    let src_w = frame.width() as usize;
    let stride = Frame::CHANNELS;

    let mut data = vec![0u8; tmpw * tmph * stride];
    let cols = pad.source_cols();
    let dst_cols = pad.target_cols();
    for (src_row, dst_row) in pad.source_rows().zip(pad.target_rows()) {
        let s = (src_row * src_w + cols.start) * stride;
        let d = (dst_row * tmpw + dst_cols.start) * stride;
        let n = cols.len() * stride;
        data[d..d + n].copy_from_slice(&frame.data()[s..s + n]);
    }
    Frame::new(data, tmpw as u32, tmph as u32, frame.channel_order()).ok()
}

/// Crops a candidate and rasterizes it as a normalised `size × size` tensor.
pub fn crop_to_tensor(
    frame: &Frame,
    pad: &PaddingDescriptor,
    size: u32,
    order: ChannelOrder,
) -> Option<Array4<f32>> {
    let crop = crop_padded(frame, pad)?;
    Some(normalize(&resize(&crop, size, size), order))
}

/// Crops every candidate at `size × size` and stacks the results.
///
/// Candidates whose padding descriptor is empty are dropped; the returned
/// boxes line up with the batch rows.
pub fn crop_batch(
    frame: &Frame,
    candidates: &[CandidateBox],
    size: u32,
    order: ChannelOrder,
) -> (Vec<CandidateBox>, Array4<f32>) {
    let pads = pad(candidates, frame.width(), frame.height());
    let mut kept = Vec::with_capacity(candidates.len());
    let mut crops = Vec::with_capacity(candidates.len());
    for (candidate, p) in candidates.iter().zip(&pads) {
        match crop_to_tensor(frame, p, size, order) {
            Some(t) => {
                kept.push(*candidate);
                crops.push(t);
            }
            None => log::debug!("dropping candidate with empty crop: {candidate:?}"),
        }
    }
    (kept, stack(&crops))
}

/// Stacks single-image tensors along the batch axis.
pub fn stack(tensors: &[Array4<f32>]) -> Array4<f32> {
    if tensors.is_empty() {
        return Array4::zeros((0, 0, 0, Frame::CHANNELS));
    }
    let views: Vec<ArrayView4<f32>> = tensors.iter().map(|t| t.view()).collect();
    concatenate(Axis(0), &views).expect("crops share one spatial size")
}

/// Rearranges a `(batch, height, width, channels)` tensor into `layout`.
pub fn to_layout(tensor: Array4<f32>, layout: InputLayout) -> Array4<f32> {
    match layout {
        InputLayout::Nhwc => tensor,
        InputLayout::Nwhc => tensor.permuted_axes([0, 2, 1, 3]).as_standard_layout().to_owned(),
    }
}
