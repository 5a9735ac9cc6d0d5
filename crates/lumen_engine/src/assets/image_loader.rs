//! Image loading for textures

use super::AssetError;
use std::path::Path;

/// Decoded RGBA8 image ready for GPU upload
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Raw RGBA pixel data, row-major
    pub data: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl ImageData {
    /// Load an image from a file path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AssetError> {
        let path_ref = path.as_ref();
        if !path_ref.exists() {
            return Err(AssetError::NotFound(path_ref.display().to_string()));
        }

        let bytes = std::fs::read(path_ref)?;
        let image = Self::decode(&bytes)
            .map_err(|e| AssetError::LoadFailed(format!("Failed to load image {:?}: {}", path_ref, e)))?;

        log::info!("Loaded image {}x{} from {:?}", image.width, image.height, path_ref);
        Ok(image)
    }

    fn decode(bytes: &[u8]) -> image::ImageResult<Self> {
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = rgba.dimensions();

        Ok(Self {
            data: rgba.into_raw(),
            width,
            height,
        })
    }

    /// Solid colour image, used for the fallback texture
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let data = color.repeat((width * height) as usize);
        Self { data, width, height }
    }

    /// Size of the pixel data in bytes
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_color_image() {
        let img = ImageData::solid_color(2, 3, [255, 0, 0, 255]);
        assert_eq!(img.size_bytes(), 2 * 3 * 4);
        assert!(img.data.chunks(4).all(|px| px == [255, 0, 0, 255]));
    }

    #[test]
    fn test_png_round_trip_through_decoder() {
        let mut encoded = Vec::new();
        let pixels = image::RgbaImage::from_raw(1, 1, vec![10, 20, 30, 255]).expect("pixels");
        pixels
            .write_to(&mut std::io::Cursor::new(&mut encoded), image::ImageFormat::Png)
            .expect("encode");

        let decoded = ImageData::decode(&encoded).expect("decode");
        assert_eq!((decoded.width, decoded.height), (1, 1));
        assert_eq!(decoded.data, vec![10, 20, 30, 255]);
    }

    #[test]
    fn test_undecodable_file_fails_to_load() {
        let path = std::env::temp_dir().join(format!("lumen_not_a_png_{}.png", std::process::id()));
        std::fs::write(&path, b"plain text").expect("write");
        let result = ImageData::from_file(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(result, Err(AssetError::LoadFailed(_))));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        assert!(matches!(
            ImageData::from_file("does/not/exist.png"),
            Err(AssetError::NotFound(_))
        ));
    }
}
