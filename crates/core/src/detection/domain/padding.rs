//! Boundary-safe crop geometry.
//!
//! A candidate may extend past the image. Its padding descriptor says which
//! part of the source image it covers and where that part lands inside a
//! zero-filled `tmph × tmpw` buffer. All coordinates are 1-based and
//! inclusive, matching the integer box corners they are derived from.

use std::ops::Range;

use crate::detection::domain::candidate_box::CandidateBox;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaddingDescriptor {
    /// Destination window inside the crop buffer.
    pub dy: i64,
    pub edy: i64,
    pub dx: i64,
    pub edx: i64,
    /// Source window inside the image, clamped to `1..=W` / `1..=H`.
    pub y: i64,
    pub ey: i64,
    pub x: i64,
    pub ex: i64,
    /// Crop buffer size, the unclamped inclusive box size.
    pub tmpw: i64,
    pub tmph: i64,
}

impl PaddingDescriptor {
    /// Computes the descriptor for `candidate` against a `width` × `height`
    /// image. Corners are truncated to integers first.
    pub fn new(candidate: &CandidateBox, width: u32, height: u32) -> Self {
        let (w, h) = (width as i64, height as i64);
        let mut x = candidate.x1 as i64;
        let mut y = candidate.y1 as i64;
        let mut ex = candidate.x2 as i64;
        let mut ey = candidate.y2 as i64;
        let tmpw = ex - x + 1;
        let tmph = ey - y + 1;

        let (mut dx, mut dy) = (1, 1);
        let (mut edx, mut edy) = (tmpw, tmph);

        if ex > w {
            edx = w - ex + tmpw;
            ex = w;
        }
        if ey > h {
            edy = h - ey + tmph;
            ey = h;
        }
        if x < 1 {
            dx = 2 - x;
            x = 1;
        }
        if y < 1 {
            dy = 2 - y;
            y = 1;
        }

        Self {
            dy,
            edy,
            dx,
            edx,
            y,
            ey,
            x,
            ex,
            tmpw,
            tmph,
        }
    }

    /// True when the crop would hold no image pixels.
    pub fn is_empty(&self) -> bool {
        self.tmpw <= 0 || self.tmph <= 0 || self.ex < self.x || self.ey < self.y
    }

    /// Zero-based source rows.
    pub fn source_rows(&self) -> Range<usize> {
        (self.y - 1) as usize..self.ey as usize
    }

    /// Zero-based source columns.
    pub fn source_cols(&self) -> Range<usize> {
        (self.x - 1) as usize..self.ex as usize
    }

    /// Zero-based destination rows inside the crop buffer.
    pub fn target_rows(&self) -> Range<usize> {
        (self.dy - 1) as usize..self.edy as usize
    }

    /// Zero-based destination columns inside the crop buffer.
    pub fn target_cols(&self) -> Range<usize> {
        (self.dx - 1) as usize..self.edx as usize
    }
}

/// Descriptors for every box, in input order.
pub fn pad(boxes: &[CandidateBox], width: u32, height: u32) -> Vec<PaddingDescriptor> {
    boxes
        .iter()
        .map(|b| PaddingDescriptor::new(b, width, height))
        .collect()
}
