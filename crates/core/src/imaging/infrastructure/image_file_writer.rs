use std::path::Path;

use crate::imaging::domain::image_io::{ImageIoError, ImageWriter};
use crate::shared::frame::{ChannelOrder, Frame};

/// Writes a single frame to an image file using the `image` crate.
///
/// The format follows the file extension. BGR frames are reordered first.
#[derive(Default)]
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(
        &self,
        path: &Path,
        frame: &Frame,
        size: Option<(u32, u32)>,
    ) -> Result<(), ImageIoError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ImageIoError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let rgb = frame.to_order(ChannelOrder::Rgb);
        let img = image::RgbImage::from_raw(rgb.width(), rgb.height(), rgb.data().to_vec())
            .ok_or_else(|| ImageIoError::Empty {
                path: path.to_path_buf(),
            })?;

        let img = if let Some((w, h)) = size {
            image::imageops::resize(&img, w, h, image::imageops::FilterType::Triangle)
        } else {
            img
        };

        img.save(path).map_err(|source| ImageIoError::Encode {
            path: path.to_path_buf(),
            source,
        })
    }
}
