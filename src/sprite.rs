use image::imageops::FilterType;
use image::DynamicImage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpriteError {
    #[error("no sprite available")]
    NoSprite,
    #[error("failed to decode sprite: {0}")]
    Image(#[from] image::ImageError),
}

/// Decode sprite bytes and scale them to a `size` x `size` square
pub fn decode(bytes: &[u8], size: u32) -> Result<DynamicImage, SpriteError> {
    if bytes.is_empty() {
        return Err(SpriteError::NoSprite);
    }
    let image = image::load_from_memory(bytes)?;
    // Sprites are pixel art; nearest keeps the edges crisp when upscaling
    Ok(image.resize_exact(size, size, FilterType::Nearest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([1, 2, 3, 255])));
        let mut cursor = Cursor::new(Vec::new());
        img.write_to(&mut cursor, ImageFormat::Png).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_decode_scales_to_square() {
        let image = decode(&png_bytes(96, 96), 200).unwrap();
        assert_eq!((image.width(), image.height()), (200, 200));
    }

    #[test]
    fn test_malformed_bytes_are_an_error() {
        assert!(matches!(decode(b"garbage", 200), Err(SpriteError::Image(_))));
    }

    #[test]
    fn test_empty_bytes_mean_no_sprite() {
        assert!(matches!(decode(&[], 200), Err(SpriteError::NoSprite)));
    }
}
