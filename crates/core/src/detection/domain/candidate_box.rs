/// A face candidate flowing through the cascade.
///
/// Corners are in original-image pixel space. The four deltas are the
/// regression offsets the last network produced for this box, relative to
/// its inclusive width and height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub score: f64,
    pub deltas: [f64; 4],
}

impl CandidateBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64, score: f64) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            score,
            deltas: [0.0; 4],
        }
    }

    pub fn with_deltas(mut self, deltas: [f64; 4]) -> Self {
        self.deltas = deltas;
        self
    }

    /// Inclusive pixel width, `x2 - x1 + 1`.
    pub fn width(&self) -> f64 {
        self.x2 - self.x1 + 1.0
    }

    /// Inclusive pixel height, `y2 - y1 + 1`.
    pub fn height(&self) -> f64 {
        self.y2 - self.y1 + 1.0
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Moves each corner by its delta scaled by the box width or height.
    pub fn regress(&mut self) {
        self.shift_corners(self.width(), self.height());
    }

    /// Like [`regress`](Self::regress) but scales by the corner distance,
    /// `x2 - x1` and `y2 - y1`, as the proposal stage does.
    pub fn regress_exclusive(&mut self) {
        self.shift_corners(self.x2 - self.x1, self.y2 - self.y1);
    }

    fn shift_corners(&mut self, w: f64, h: f64) {
        let [dx1, dy1, dx2, dy2] = self.deltas;
        self.x1 += dx1 * w;
        self.y1 += dy1 * h;
        self.x2 += dx2 * w;
        self.y2 += dy2 * h;
    }

    /// Grows the shorter side so the box becomes square around its centre.
    pub fn square(&mut self) {
        let w = self.x2 - self.x1;
        let h = self.y2 - self.y1;
        let l = w.max(h);
        self.x1 += w * 0.5 - l * 0.5;
        self.y1 += h * 0.5 - l * 0.5;
        self.x2 = self.x1 + l;
        self.y2 = self.y1 + l;
    }

    pub fn truncate(&mut self) {
        self.x1 = self.x1.trunc();
        self.y1 = self.y1.trunc();
        self.x2 = self.x2.trunc();
        self.y2 = self.y2.trunc();
    }

    pub fn floor(&mut self) {
        self.x1 = self.x1.floor();
        self.y1 = self.y1.floor();
        self.x2 = self.x2.floor();
        self.y2 = self.y2.floor();
    }
}

/// Applies each box's own regression deltas.
pub fn bbreg(boxes: &mut [CandidateBox]) {
    for b in boxes.iter_mut() {
        b.regress();
    }
}

/// Applies each box's deltas scaled by its corner distance.
pub fn bbreg_exclusive(boxes: &mut [CandidateBox]) {
    for b in boxes.iter_mut() {
        b.regress_exclusive();
    }
}

/// Converts every box to a square.
pub fn rerec(boxes: &mut [CandidateBox]) {
    for b in boxes.iter_mut() {
        b.square();
    }
}

/// Keeps the boxes at `indices`, in that order.
pub fn select(boxes: &[CandidateBox], indices: &[usize]) -> Vec<CandidateBox> {
    indices.iter().map(|&i| boxes[i]).collect()
}
