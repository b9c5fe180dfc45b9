//! Shared test utilities for the gina test suite.
//!
//! Synthetic images in every layout the scanner understands, built so that
//! each has a mix of transparent, translucent and opaque pixels where the
//! layout supports alpha.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! for source in all_layouts(5, 6) {
//!     let scanner = Scanner::new(&source);
//!     // ...
//! }
//! ```

use image::{DynamicImage, GrayImage, ImageBuffer, LumaA, Rgba, RgbaImage};

use crate::imaging::source::{
    Gray16Image, PalettedImage, PremultipliedImage, Rgba16Image, SourceImage, SubsampleRatio,
    YCbCrImage,
};

// =========================================================================
// Canonical builders
// =========================================================================

/// Deterministic RGBA test pattern.
///
/// Every fifth diagonal is fully transparent (with zero colour, so the
/// buffer is itself canonical); the rest have varying alpha.
pub fn gradient_rgba(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        if (x + y) % 5 == 0 {
            return Rgba([0, 0, 0, 0]);
        }
        let a = 255 - ((x * 13 + y * 7) % 200) as u8;
        Rgba([
            (x * 40 % 256) as u8,
            (y * 40 % 256) as u8,
            ((x + y) * 17 % 256) as u8,
            a,
        ])
    })
}

/// Fully opaque image of a single colour.
pub fn uniform_rgba(width: u32, height: u32, rgb: [u8; 3]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba([rgb[0], rgb[1], rgb[2], 255]))
}

/// Widen an 8-bit image to 16 bits per channel (`c * 257`).
pub fn widen(img: &RgbaImage) -> Rgba16Image {
    ImageBuffer::from_fn(img.width(), img.height(), |x, y| {
        let p = img.get_pixel(x, y).0;
        Rgba(p.map(|c| c as u16 * 257))
    })
}

// =========================================================================
// Every layout
// =========================================================================

/// One source image per layout (four for Y'CbCr, one per subsampling ratio).
pub fn all_layouts(width: u32, height: u32) -> Vec<SourceImage> {
    let rgba = gradient_rgba(width, height);
    let rgba16 = widen(&rgba);

    let mut layouts = vec![
        SourceImage::PremultipliedRgba8(PremultipliedImage::from_rgba(&rgba)),
        SourceImage::PremultipliedRgba16(PremultipliedImage::from_rgba16(&rgba16)),
        SourceImage::Rgba16(rgba16),
        SourceImage::Rgba8(rgba),
        SourceImage::Rgb8(image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x * 29) as u8, (y * 43) as u8, ((x + y) * 7) as u8])
        })),
        SourceImage::Gray8(GrayImage::from_fn(width, height, |x, y| {
            image::Luma([(x * 31 + y * 11) as u8])
        })),
        SourceImage::Gray16(Gray16Image::from_fn(width, height, |x, y| {
            image::Luma([(x * 3001 + y * 977) as u16])
        })),
    ];

    for ratio in [
        SubsampleRatio::Full,
        SubsampleRatio::HalfHorizontal,
        SubsampleRatio::HalfVertical,
        SubsampleRatio::HalfBoth,
    ] {
        let mut img = YCbCrImage::new(width, height, ratio);
        for (i, v) in img.y.iter_mut().enumerate() {
            *v = (i * 37 % 256) as u8;
        }
        for (i, v) in img.cb.iter_mut().enumerate() {
            *v = (i * 53 % 256) as u8;
        }
        for (i, v) in img.cr.iter_mut().enumerate() {
            *v = (255 - i * 29 % 256) as u8;
        }
        layouts.push(SourceImage::YCbCr(img));
    }

    let palette = vec![
        Rgba([255, 0, 0, 255]),
        Rgba([0, 255, 0, 128]),
        Rgba([9, 9, 9, 0]),
        Rgba([10, 20, 30, 255]),
    ];
    let indices = (0..width * height).map(|i| (i % 5) as u8).collect();
    if let Some(img) = PalettedImage::from_raw(width, height, indices, palette) {
        layouts.push(SourceImage::Paletted(img));
    }

    let luma_alpha = ImageBuffer::from_fn(width, height, |x, y| {
        LumaA([(x * 50 + y) as u8, if x == 0 { 0 } else { (y * 60 + 30) as u8 }])
    });
    layouts.push(SourceImage::from(DynamicImage::ImageLumaA8(luma_alpha)));

    layouts
}

// =========================================================================
// EXIF byte sequences
// =========================================================================

/// SOI + APP1 "Exif" segment with a single orientation tag, ending right
/// after the 2-byte orientation value.
///
/// Every strict prefix of the result must parse as unspecified.
pub fn exif_orientation_prefix(orientation: u16, big_endian: bool) -> Vec<u8> {
    let u16_bytes = |v: u16| if big_endian { v.to_be_bytes() } else { v.to_le_bytes() };
    let u32_bytes = |v: u32| if big_endian { v.to_be_bytes() } else { v.to_le_bytes() };

    let mut out = vec![0xff, 0xd8, 0xff, 0xe1, 0x00, 0x22];
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(if big_endian { b"MM" } else { b"II" });
    out.extend_from_slice(&u16_bytes(0x2a));
    out.extend_from_slice(&u32_bytes(8));
    out.extend_from_slice(&u16_bytes(1));
    out.extend_from_slice(&u16_bytes(0x0112));
    out.extend_from_slice(&u16_bytes(3));
    out.extend_from_slice(&u32_bytes(1));
    out.extend_from_slice(&u16_bytes(orientation));
    out
}
