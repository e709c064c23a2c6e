use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::detection::domain::face_annotation::{BoundingBox, FaceAnnotation};
use crate::shared::frame::{ChannelOrder, Frame};

const BOX_COLOR: [u8; 3] = [255, 0, 0];
const LANDMARK_COLOR: [u8; 3] = [0, 255, 0];
const DEFAULT_THICKNESS: u32 = 2;
const LANDMARK_RADIUS: i32 = 2;

/// Draws each face's bounding box outline and a filled dot per landmark.
///
/// Boxes and landmarks are clamped to the frame.
pub struct BoxAnnotator {
    thickness: u32,
    box_color: [u8; 3],
    landmark_color: [u8; 3],
}

impl BoxAnnotator {
    pub fn new(thickness: u32) -> Self {
        Self {
            thickness: thickness.max(1),
            box_color: BOX_COLOR,
            landmark_color: LANDMARK_COLOR,
        }
    }
}

impl Default for BoxAnnotator {
    fn default() -> Self {
        Self::new(DEFAULT_THICKNESS)
    }
}

impl FrameAnnotator for BoxAnnotator {
    fn annotate(&self, frame: &mut Frame, faces: &[FaceAnnotation]) {
        let (img_w, img_h) = (frame.width(), frame.height());
        if img_w == 0 || img_h == 0 || faces.is_empty() {
            return;
        }
        let order = frame.channel_order();
        // Pixels keep the frame's channel order, so colors are mapped into it.
        let Some(mut image) = RgbImage::from_raw(img_w, img_h, frame.data().to_vec()) else {
            return;
        };
        let rect_color = in_order(self.box_color, order);
        let landmark_color = in_order(self.landmark_color, order);

        for face in faces {
            let Some((x1, y1, x2, y2)) = clamp_bbox(&face.bbox(), img_w, img_h) else {
                continue;
            };
            for inset in 0..self.thickness as i32 {
                let (w, h) = (x2 - x1 + 1 - 2 * inset, y2 - y1 + 1 - 2 * inset);
                if w <= 0 || h <= 0 {
                    break;
                }
                let rect = Rect::at(x1 + inset, y1 + inset).of_size(w as u32, h as u32);
                draw_hollow_rect_mut(&mut image, rect, rect_color);
            }
            for lm in face.landmarks() {
                let cx = lm.position.x.clamp(0, img_w as i32 - 1);
                let cy = lm.position.y.clamp(0, img_h as i32 - 1);
                draw_filled_circle_mut(&mut image, (cx, cy), LANDMARK_RADIUS, landmark_color);
            }
        }

        frame.data_mut().copy_from_slice(image.as_raw());
    }
}

/// Inclusive corners of `bbox` clamped to the image, or `None` for an empty
/// box.
fn clamp_bbox(bbox: &BoundingBox, img_w: u32, img_h: u32) -> Option<(i32, i32, i32, i32)> {
    if bbox.w <= 0 || bbox.h <= 0 {
        return None;
    }
    let (max_x, max_y) = (img_w as i32 - 1, img_h as i32 - 1);
    let x1 = bbox.x.clamp(0, max_x);
    let y1 = bbox.y.clamp(0, max_y);
    let x2 = (bbox.x + bbox.w - 1).clamp(0, max_x);
    let y2 = (bbox.y + bbox.h - 1).clamp(0, max_y);
    Some((x1, y1, x2, y2))
}

fn in_order(rgb: [u8; 3], order: ChannelOrder) -> Rgb<u8> {
    Rgb([
        rgb[ChannelOrder::Rgb.source_index(order, 0)],
        rgb[ChannelOrder::Rgb.source_index(order, 1)],
        rgb[ChannelOrder::Rgb.source_index(order, 2)],
    ])
}
