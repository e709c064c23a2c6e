use std::path::Path;

use crate::imaging::domain::image_io::{ImageIoError, ImageReader};
use crate::shared::frame::Frame;

/// Decodes image files with the `image` crate into RGB frames.
///
/// Any format the crate can sniff is accepted; alpha and grey channels are
/// expanded or dropped to three-channel RGB.
#[derive(Default)]
pub struct ImageFileReader;

impl ImageFileReader {
    pub fn new() -> Self {
        Self
    }
}

impl ImageReader for ImageFileReader {
    fn read(&self, path: &Path) -> Result<Frame, ImageIoError> {
        let img = image::open(path)
            .map_err(|source| ImageIoError::Decode {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgb8();
        let (width, height) = img.dimensions();
        Frame::rgb(img.into_raw(), width, height).map_err(|_| ImageIoError::Empty {
            path: path.to_path_buf(),
        })
    }
}
