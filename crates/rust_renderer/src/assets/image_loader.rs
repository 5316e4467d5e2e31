//! Image decoding for textures

use std::path::Path;

use super::AssetError;

/// Decoded RGBA8 pixels
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Row-major RGBA8 pixels
    pub data: Vec<u8>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl ImageData {
    /// Decode an image file of any format the `image` crate supports
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let img = image::open(path)
            .map_err(|e| AssetError::LoadFailed(format!("{}: {e}", path.display())))?;
        let image = Self::from_rgba(img.to_rgba8());
        log::info!("Loaded image {}x{} from {}", image.width, image.height, path.display());
        Ok(image)
    }

    /// Decode an in-memory encoded image
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AssetError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| AssetError::LoadFailed(format!("in-memory image: {e}")))?;
        Ok(Self::from_rgba(img.to_rgba8()))
    }

    /// Image filled with a single color
    #[must_use]
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixel_count = width as usize * height as usize;
        Self {
            data: color.repeat(pixel_count),
            width,
            height,
        }
    }

    fn from_rgba(rgba: image::RgbaImage) -> Self {
        let (width, height) = rgba.dimensions();
        Self {
            data: rgba.into_raw(),
            width,
            height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_color_image() {
        let img = ImageData::solid_color(4, 2, [255, 0, 0, 255]);
        assert_eq!(img.data.len(), 4 * 2 * 4);
        assert_eq!(&img.data[4..8], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_png_round_trip_through_memory() {
        let source = image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]));
        let mut encoded = Vec::new();
        source
            .write_to(&mut std::io::Cursor::new(&mut encoded), image::ImageFormat::Png)
            .unwrap();

        let decoded = ImageData::from_bytes(&encoded).unwrap();
        assert_eq!((decoded.width, decoded.height), (3, 2));
        assert_eq!(&decoded.data[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        assert!(matches!(ImageData::from_bytes(b"not an image"), Err(AssetError::LoadFailed(_))));
    }
}
