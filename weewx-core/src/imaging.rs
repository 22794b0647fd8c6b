use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

use crate::{error::CacheError, model::Image};

/// Decode an image just to learn its size.
pub fn dimensions(bytes: &[u8]) -> Result<(u32, u32), CacheError> {
    let img = decode(bytes)?;
    Ok((img.width(), img.height()))
}

/// Turn a webcam capture a quarter to the left, re-encoded as JPEG.
///
/// The cameras these feeds come from are mounted on their side.
pub fn rotate_webcam(bytes: &[u8]) -> Result<Image, CacheError> {
    let rotated = decode(bytes)?.rotate270();

    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(rotated.to_rgb8())
        .write_to(&mut out, ImageFormat::Jpeg)
        .map_err(|e| CacheError::Image(e.to_string()))?;

    Ok(Image {
        width: rotated.width(),
        height: rotated.height(),
        bytes: out.into_inner(),
    })
}

fn decode(bytes: &[u8]) -> Result<DynamicImage, CacheError> {
    image::load_from_memory(bytes).map_err(|e| CacheError::Image(e.to_string()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::RgbImage;

    /// A small landscape JPEG.
    pub(crate) fn jpeg(width: u32, height: u32) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
            .write_to(&mut out, ImageFormat::Jpeg)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn dimensions_of_encoded_image() {
        assert_eq!(dimensions(&jpeg(8, 4)).unwrap(), (8, 4));
    }

    #[test]
    fn rotation_swaps_width_and_height() {
        let rotated = rotate_webcam(&jpeg(8, 4)).unwrap();

        assert_eq!((rotated.width, rotated.height), (4, 8));
        assert_eq!(dimensions(&rotated.bytes).unwrap(), (4, 8));
    }

    #[test]
    fn garbage_is_an_image_error() {
        assert!(matches!(
            rotate_webcam(b"<html>404</html>"),
            Err(CacheError::Image(_))
        ));
    }
}
