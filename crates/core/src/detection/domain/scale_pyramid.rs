use crate::shared::constants::CELL_SIZE;

/// Scales at which the proposal network scans an image.
///
/// The first scale maps `min_face_size` onto the 12-pixel proposal cell; each
/// following scale shrinks by `scale_factor` until the shorter image side
/// would fall below one cell. Strictly decreasing for factors in (0, 1).
pub fn compute_scale_pyramid(
    width: u32,
    height: u32,
    min_face_size: u32,
    scale_factor: f64,
) -> Vec<f64> {
    let cell = CELL_SIZE as f64;
    let m = cell / min_face_size as f64;
    let mut min_layer = width.min(height) as f64 * m;

    let mut scales = Vec::new();
    let mut factor = 1.0;
    while min_layer >= cell {
        scales.push(m * factor);
        min_layer *= scale_factor;
        factor *= scale_factor;
    }
    scales
}

/// Pixel size of the image resampled at `scale`.
pub fn scaled_size(width: u32, height: u32, scale: f64) -> (u32, u32) {
    let w = (width as f64 * scale).ceil() as u32;
    let h = (height as f64 * scale).ceil() as u32;
    (w, h)
}
