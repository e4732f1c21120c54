// THEORY:
// `Image` is the in-memory form of one decoded test input. It is a "dumb" data
// container: dimensions, bit depth and a single owned byte buffer laid out
// row-major, top-to-bottom, with channels interleaved for truecolor.
//
// The buffer is owned outright and moved to whoever consumes the image. Exactly
// one analyzer reads each image, so there is nothing to share.
//
// Construction goes through `Image::new`, which refuses any buffer whose length
// disagrees with the declared geometry. An `Image` therefore always satisfies
// `data.len() == size()`.

use std::path::Path;

use image::{DynamicImage, GrayImage, ImageEncoder, RgbImage};

use crate::error::{Error, Result};

/// Bits per pixel for an 8-bit grayscale raster.
pub const DEPTH_GRAY: u8 = 8;
/// Bits per pixel for an interleaved 8-bit RGB raster.
pub const DEPTH_RGB: u8 = 24;

/// A decoded raster with its geometry.
///
/// Fields are private so the buffer can never drift out of step with the
/// dimensions after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: u16,
    height: u16,
    depth: u8,
    data: Vec<u8>,
}

impl Image {
    /// Wraps `data` as an image, checking depth and buffer length.
    pub fn new(width: u16, height: u16, depth: u8, data: Vec<u8>) -> Result<Self> {
        if depth != DEPTH_GRAY && depth != DEPTH_RGB {
            return Err(Error::InvalidImage(format!(
                "unsupported image depth {depth}, expected {DEPTH_GRAY} or {DEPTH_RGB}"
            )));
        }
        let expected = Self::size_for(width, height, depth);
        if data.len() != expected {
            return Err(Error::InvalidImage(format!(
                "pixel buffer holds {} bytes, {width}x{height}@{depth} needs {expected}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            depth,
            data,
        })
    }

    /// Byte size of a raster with the given geometry.
    pub fn size_for(width: u16, height: u16, depth: u8) -> usize {
        width as usize * height as usize * (depth as usize / 8)
    }

    /// Number of pixels horizontally.
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Number of pixels vertically.
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Bits per pixel, 8 or 24.
    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Size of the pixel buffer in bytes.
    pub fn size(&self) -> usize {
        Self::size_for(self.width, self.height, self.depth)
    }

    pub fn channels(&self) -> usize {
        self.depth as usize / 8
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Converts into an `image` crate buffer without copying the pixels.
    pub fn into_dynamic(self) -> Result<DynamicImage> {
        let (width, height) = (self.width as u32, self.height as u32);
        let len = self.data.len();
        let converted = match self.depth {
            DEPTH_GRAY => GrayImage::from_raw(width, height, self.data).map(DynamicImage::ImageLuma8),
            _ => RgbImage::from_raw(width, height, self.data).map(DynamicImage::ImageRgb8),
        };
        converted.ok_or_else(|| {
            Error::InvalidImage(format!("{len} bytes do not fill a {width}x{height} raster"))
        })
    }

    /// Writes the raster to `path` as PNG, for eyeballing what a worker received.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let color = match self.depth {
            DEPTH_GRAY => image::ExtendedColorType::L8,
            _ => image::ExtendedColorType::Rgb8,
        };

        let mut encoded = Vec::new();
        image::codecs::png::PngEncoder::new(&mut encoded)
            .write_image(&self.data, self.width as u32, self.height as u32, color)
            .map_err(|e| Error::io(path, std::io::Error::other(e)))?;

        std::fs::write(path, encoded).map_err(|e| Error::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u16, height: u16) -> Vec<u8> {
        let mut buffer = vec![0u8; Image::size_for(width, height, DEPTH_RGB)];
        let mut intensity = 0u8;
        for pixel in buffer.chunks_mut(3) {
            pixel[0] = intensity;
            pixel[1] = intensity;
            pixel[2] = 255 - intensity;
            intensity = intensity.wrapping_add(1);
        }
        buffer
    }

    #[test]
    fn size_follows_depth() {
        assert_eq!(Image::size_for(2, 2, DEPTH_RGB), 12);
        assert_eq!(Image::size_for(2, 2, DEPTH_GRAY), 4);
        assert_eq!(Image::size_for(0, 100, DEPTH_RGB), 0);
    }

    #[test]
    fn rejects_mismatched_buffer() {
        assert!(matches!(
            Image::new(2, 2, DEPTH_RGB, vec![0; 11]),
            Err(Error::InvalidImage(_))
        ));
        assert!(Image::new(2, 2, DEPTH_RGB, vec![0; 13]).is_err());
    }

    #[test]
    fn rejects_unknown_depth() {
        assert!(matches!(
            Image::new(1, 1, 16, vec![0; 2]),
            Err(Error::InvalidImage(_))
        ));
    }

    #[test]
    fn geometry_is_fixed_at_construction() {
        let raster = Image::new(2, 2, DEPTH_RGB, vec![9; 12]).expect("valid image");
        assert_eq!((raster.width(), raster.height(), raster.depth()), (2, 2, DEPTH_RGB));
        assert_eq!(raster.size(), raster.data().len());

        let dynamic = raster.into_dynamic().expect("buffer matches geometry");
        assert_eq!((dynamic.width(), dynamic.height()), (2, 2));
        assert!(dynamic.into_rgb8().into_raw().iter().all(|&b| b == 9));
    }

    #[test]
    fn converts_without_reordering_pixels() {
        let data = gradient(4, 3);
        let raster = Image::new(4, 3, DEPTH_RGB, data.clone()).expect("valid image");
        let dynamic = raster.into_dynamic().expect("buffer matches geometry");
        assert_eq!(dynamic.width(), 4);
        assert_eq!(dynamic.height(), 3);
        assert_eq!(dynamic.into_rgb8().into_raw(), data);
    }

    #[test]
    fn grayscale_converts_to_luma() {
        let raster = Image::new(2, 1, DEPTH_GRAY, vec![10, 20]).expect("valid image");
        assert_eq!(raster.channels(), 1);
        let dynamic = raster.into_dynamic().expect("buffer matches geometry");
        assert_eq!(dynamic.into_luma8().into_raw(), vec![10, 20]);
    }

    #[test]
    fn save_gradient_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("gradient_file.png");
        let raster = Image::new(50, 40, DEPTH_RGB, gradient(50, 40)).expect("valid image");

        raster.save_png(&path).expect("Error Saving File.");

        let reloaded = image::open(&path).expect("png readable").into_rgb8();
        assert_eq!(reloaded.dimensions(), (50, 40));
        assert_eq!(reloaded.into_raw(), raster.into_data());
    }
}
