//! Image decoding for texture upload.
//!
//! Images are stored top row first on disk while the mesh UVs use a
//! bottom-left origin, so every image is flipped vertically while decoding.

use std::path::Path;

use anyhow::{Context, Result, ensure};
use image::{DynamicImage, RgbImage, imageops::FilterType};

/// Tightly packed 8-bit RGB pixels, bottom row first.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedImage {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
}

/// One level of a mip chain.
#[derive(Clone, Debug, PartialEq)]
pub struct MipLevel {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    pub const CHANNELS: u32 = 3;

    /// Wrap raw RGB pixels that are already bottom row first.
    pub fn from_rgb(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        ensure!(width > 0 && height > 0, "image has zero size");
        ensure!(
            pixels.len() == (width * height * Self::CHANNELS) as usize,
            "pixel buffer has {} bytes, expected {} for {}x{} RGB",
            pixels.len(),
            width * height * Self::CHANNELS,
            width,
            height
        );
        Ok(Self {
            pixels,
            width,
            height,
        })
    }

    /// Decode an image file, converting to RGB and flipping vertically.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::info!("Loading texture from {:?}", path);

        let img = image::open(path).with_context(|| format!("Failed to open image {:?}", path))?;
        let decoded = Self::from_image(img)?;

        log::info!(
            "Loaded texture {}x{} with {} bytes",
            decoded.width,
            decoded.height,
            decoded.pixels.len()
        );
        Ok(decoded)
    }

    /// Flip an already-decoded top-down image into upload order.
    pub fn from_image(img: DynamicImage) -> Result<Self> {
        let rgb = img.flipv().into_rgb8();
        let (width, height) = rgb.dimensions();
        Self::from_rgb(width, height, rgb.into_raw())
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Expand to RGBA8 (opaque alpha), the narrowest 8-bit colour format GPUs sample.
    pub fn to_rgba8(&self) -> Vec<u8> {
        rgb_to_rgba(&self.pixels)
    }

    /// Number of levels in a full chain down to 1x1.
    pub fn mip_level_count(&self) -> u32 {
        32 - self.width.max(self.height).leading_zeros()
    }

    /// Full RGBA8 mip chain, level 0 first, each level box-filtered from the previous.
    pub fn rgba_mip_chain(&self) -> Result<Vec<MipLevel>> {
        let mut levels = Vec::with_capacity(self.mip_level_count() as usize);
        let mut current = RgbImage::from_raw(self.width, self.height, self.pixels.clone())
            .context("pixel buffer does not match image size")?;
        loop {
            let (w, h) = current.dimensions();
            levels.push(MipLevel {
                width: w,
                height: h,
                pixels: rgb_to_rgba(current.as_raw()),
            });
            if w == 1 && h == 1 {
                break;
            }
            let (nw, nh) = ((w / 2).max(1), (h / 2).max(1));
            current = image::imageops::resize(&current, nw, nh, FilterType::Triangle);
        }
        Ok(levels)
    }
}

fn rgb_to_rgba(rgb: &[u8]) -> Vec<u8> {
    rgb.chunks_exact(3)
        .flat_map(|px| [px[0], px[1], px[2], u8::MAX])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoding_flips_rows() {
        // 1x2 image: red on top, blue at the bottom.
        let mut img = RgbImage::new(1, 2);
        img.put_pixel(0, 0, image::Rgb([255, 0, 0]));
        img.put_pixel(0, 1, image::Rgb([0, 0, 255]));

        let decoded = DecodedImage::from_image(DynamicImage::ImageRgb8(img)).unwrap();
        assert_eq!(decoded.pixels(), &[0, 0, 255, 255, 0, 0]);
    }

    #[test]
    fn alpha_is_dropped_on_decode() {
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([10, 20, 30, 40]));
        let decoded = DecodedImage::from_image(DynamicImage::ImageRgba8(img)).unwrap();
        assert_eq!(decoded.pixels().len(), 12);
        assert_eq!(&decoded.to_rgba8()[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn rejects_wrong_buffer_size() {
        assert!(DecodedImage::from_rgb(2, 2, vec![0; 11]).is_err());
        assert!(DecodedImage::from_rgb(0, 2, vec![]).is_err());
    }

    #[test]
    fn mip_chain_halves_to_one_pixel() {
        let image = DecodedImage::from_rgb(8, 2, vec![200; 8 * 2 * 3]).unwrap();
        assert_eq!(image.mip_level_count(), 4);
        let chain = image.rgba_mip_chain().unwrap();
        let dims: Vec<_> = chain.iter().map(|l| (l.width, l.height)).collect();
        assert_eq!(dims, vec![(8, 2), (4, 1), (2, 1), (1, 1)]);
        for level in &chain {
            assert_eq!(level.pixels.len(), (level.width * level.height * 4) as usize);
        }
        // A flat colour stays flat through filtering.
        assert_eq!(&chain[3].pixels, &[200, 200, 200, 255]);
    }
}
