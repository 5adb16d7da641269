//! QR code decoding.
//!
//! [`QrDecoder`] is the seam between receipt photos and the ticket calls.
//! [`RqrrDecoder`] is the default implementation backed by `rqrr`.

use image::DynamicImage;
use std::path::Path;
use tracing::debug;

use crate::error::QrError;

/// Turns an image into the payload string of the QR code it contains.
pub trait QrDecoder: Send + Sync {
    /// Decodes the first QR code found in `image`.
    fn decode(&self, image: &DynamicImage) -> Result<String, QrError>;
}

/// QR decoder using the `rqrr` crate on a grayscale copy of the image.
#[derive(Debug, Clone, Copy, Default)]
pub struct RqrrDecoder;

impl QrDecoder for RqrrDecoder {
    fn decode(&self, image: &DynamicImage) -> Result<String, QrError> {
        let luma = image.to_luma8();
        let (width, height) = luma.dimensions();

        #[allow(clippy::cast_possible_truncation)]
        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(width as usize, height as usize, |x, y| {
                luma.get_pixel(x as u32, y as u32).0[0]
            });

        let grids = prepared.detect_grids();
        debug!(count = grids.len(), "Detected QR grids");

        let grid = grids.first().ok_or(QrError::NotFound)?;
        let (_meta, content) = grid.decode().map_err(|e| QrError::Decode(e.to_string()))?;
        Ok(content)
    }
}

/// Opens and decodes an image file.
pub fn open_image(path: &Path) -> Result<DynamicImage, QrError> {
    debug!(path = %path.display(), "Opening image");
    Ok(image::open(path)?)
}
